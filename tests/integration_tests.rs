use gramspec::data::Value;
use gramspec::ir::{PlotModel, ResolvedFigure};
use gramspec::parser::Aes;
use gramspec::scale::Domain;
use gramspec::tooltip::LineKind;
use gramspec::{resolve_spec, PlotError, ResolveContext};
use proptest::prelude::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn resolve(spec: serde_json::Value) -> Result<ResolvedFigure, PlotError> {
    resolve_spec(&spec, &ResolveContext::default())
}

fn resolve_plot(spec: serde_json::Value) -> PlotModel {
    match resolve(spec) {
        Ok(ResolvedFigure::Plot(plot)) => *plot,
        other => panic!("expected a plot, got {:?}", other),
    }
}

fn tips_bar() -> serde_json::Value {
    json!({
        "data": {"time": ["Lunch", "Lunch", "Dinner", "Dinner", "Dinner"]},
        "layers": [{"geom": "bar", "stat": "count", "mapping": {"x": "time"}}]
    })
}

/// Write `content` to a fresh file under the system temp directory
fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gramspec-tests-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run_gramspec(args: &[&str]) -> Result<String, String> {
    let output = Command::new(env!("CARGO_BIN_EXE_gramspec"))
        .args(args)
        .output()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

// =============================================================================
// Library
// =============================================================================

#[test]
fn test_layer_mapping_overrides_plot_mapping() {
    let plot = resolve_plot(json!({
        "data": {"a": [1, 2, 3], "b": [3, 2, 1]},
        "mapping": {"x": "a", "y": "a"},
        "layers": [{"geom": "point", "mapping": {"x": "b"}}]
    }));
    assert_eq!(plot.layers[0].bindings[&Aes::X], "b");
    assert_eq!(plot.layers[0].bindings[&Aes::Y], "a");
}

#[test]
fn test_count_stat_drops_unused_variables() {
    let plot = resolve_plot(tips_bar());
    let data = &plot.layers[0].data;
    assert_eq!(
        data.get("time").unwrap().values,
        vec![Value::from("Lunch"), Value::from("Dinner")]
    );
    assert_eq!(
        data.get("..count..").unwrap().values,
        vec![Value::Num(2.0), Value::Num(3.0)]
    );
    assert!(!data.has("..x.."));
    assert!(!data.has("..group.."));
}

#[test]
fn test_ordering_conflict_names_both_values() {
    let err = resolve(json!({
        "data": {"bar": ["a", "b"], "foo": [1, 2]},
        "mapping": {"x": "bar", "color": "bar"},
        "data_meta": {"mapping_annotations": [
            {"aes": "color", "annotation": "as_discrete", "parameters": {"order_by": "foo"}}
        ]},
        "layers": [{
            "geom": "bar",
            "mapping": {"color": "bar"},
            "data_meta": {"mapping_annotations": [
                {"aes": "color", "annotation": "as_discrete", "parameters": {"order_by": "bar"}}
            ]}
        }]
    }))
    .unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, PlotError::OrderingConflict(_)));
    assert!(msg.contains("'foo'"), "{}", msg);
    assert!(msg.contains("'bar'"), "{}", msg);
}

#[test]
fn test_factor_levels_extended_with_data() {
    let plot = resolve_plot(json!({
        "data": {"v": ["a", "b", "c", "d"]},
        "data_meta": {"series_annotations": [
            {"column": "v", "type": "str", "factor_levels": ["a", "b"]}
        ]},
        "layers": [{"geom": "bar", "mapping": {"x": "v"}}]
    }));
    let expected: Vec<Value> = ["a", "b", "c", "d"].iter().map(|s| Value::from(*s)).collect();
    assert_eq!(plot.scales[&Aes::X].domain, Domain::Discrete { values: expected });
}

#[test]
fn test_bar_tooltip_shows_count_alone() {
    let ctx = ResolveContext::default();
    let plot = resolve_plot(tips_bar());
    let layer = &plot.layers[0];
    let tooltips = layer.tooltips.as_ref().unwrap();
    let general = tooltips
        .lines_for_row(&layer.data, 0, ctx.formatter.as_ref())
        .into_iter()
        .filter(|l| l.kind == LineKind::General)
        .collect::<Vec<_>>();
    assert_eq!(general.len(), 1);
    assert_eq!(general[0].label, None);
    assert_eq!(general[0].value, "2");
}

#[test]
fn test_bar_tooltip_skips_fill_duplicate_of_axis() {
    let plot = resolve_plot(json!({
        "data": {"time": ["Lunch", "Lunch", "Dinner", "Dinner", "Dinner"]},
        "layers": [{"geom": "bar", "mapping": {"x": "time", "fill": "time"}}]
    }));
    let tooltips = plot.layers[0].tooltips.as_ref().unwrap();
    assert_eq!(tooltips.lines_of(LineKind::General).count(), 1);
}

#[test]
fn test_facet_grid_end_to_end() {
    let plot = resolve_plot(json!({
        "data": {"a": [1, 2, 3, 4], "b": [1, 2, 3, 4], "g": ["x", "y", "x", "y"]},
        "mapping": {"x": "a", "y": "b"},
        "layers": [{"geom": "point"}],
        "facet": {"name": "grid", "x": "g"}
    }));
    assert_eq!((plot.facet.nrow, plot.facet.ncol), (1, 2));
    assert_eq!(plot.facet.panels[0].layer_rows[0], vec![0, 2]);
}

#[test]
fn test_unknown_geom_is_spec_error() {
    let err = resolve(json!({"layers": [{"geom": "blob"}]})).unwrap_err();
    assert!(matches!(err, PlotError::SpecStructure { .. }));
}

#[test]
fn test_serialized_model_has_kind_tag() {
    let figure = resolve(tips_bar()).unwrap();
    let value = serde_json::to_value(&figure).unwrap();
    assert_eq!(value["kind"], "plot");
    assert_eq!(value["layers"][0]["geom"], "bar");
}

proptest! {
    #[test]
    fn prop_ragged_data_fails_at_normalizer(a in 1usize..8, b in 1usize..8) {
        let result = resolve(json!({
            "data": {"p": vec![1.0; a], "q": vec![2.0; b]},
            "mapping": {"x": "p", "y": "q"},
            "layers": [{"geom": "point"}]
        }));
        if a == b {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(
                matches!(result, Err(PlotError::SpecStructure { .. })),
                "unexpected result {:?}",
                result
            );
        }
    }

    #[test]
    fn prop_resolution_is_idempotent(values in prop::collection::vec(-1000.0f64..1000.0, 3..40)) {
        let spec = json!({
            "data": {"v": values},
            "layers": [
                {"geom": "histogram", "mapping": {"x": "v"}},
                {"geom": "density", "mapping": {"x": "v"}}
            ]
        });
        let first = resolve(spec.clone()).unwrap();
        let second = resolve(spec).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_factor_levels_come_first(
        data in Just(vec!["a", "b", "c", "d", "e", "f"]).prop_shuffle(),
        declared in 0usize..=6,
    ) {
        let levels: Vec<&str> = ["a", "b", "c", "d", "e", "f"][..declared].to_vec();
        let plot = resolve_plot(json!({
            "data": {"v": data.clone()},
            "data_meta": {"series_annotations": [
                {"column": "v", "type": "str", "factor_levels": levels.clone()}
            ]},
            "layers": [{"geom": "bar", "mapping": {"x": "v"}}]
        }));
        let mut expected: Vec<Value> = levels.iter().map(|s| Value::from(*s)).collect();
        for v in &data {
            if !levels.contains(v) {
                expected.push(Value::from(*v));
            }
        }
        prop_assert_eq!(&plot.scales[&Aes::X].domain, &Domain::Discrete { values: expected });
    }
}

// =============================================================================
// Binary
// =============================================================================

#[test]
fn test_cli_resolves_spec_with_csv_data() {
    let spec = temp_file(
        "bar.json",
        r#"{"layers": [{"geom": "bar", "mapping": {"x": "time"}}]}"#,
    );
    let csv = temp_file("tips.csv", "time,tip\nLunch,1.5\nLunch,2\nDinner,3\n");
    let stdout = run_gramspec(&[spec.to_str().unwrap(), "--data", csv.to_str().unwrap()]).unwrap();
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["kind"], "plot");
    assert_eq!(value["layers"][0]["data"]["..count.."], json!([2.0, 1.0]));
    assert_eq!(value["layers"][0]["data"]["time"], json!(["Lunch", "Dinner"]));
}

#[test]
fn test_cli_reports_spec_errors() {
    let spec = temp_file("broken.json", r#"{"layers": [{"geom": "blob"}]}"#);
    let err = run_gramspec(&[spec.to_str().unwrap()]).unwrap_err();
    assert!(err.contains("blob"), "{}", err);
}

#[test]
fn test_cli_rejects_invalid_json() {
    let spec = temp_file("invalid.json", "{not json");
    let err = run_gramspec(&[spec.to_str().unwrap()]).unwrap_err();
    assert!(err.contains("not valid JSON"), "{}", err);
}

#[test]
fn test_cli_config_options() {
    let spec = temp_file(
        "hist.json",
        r#"{"data": {"v": [1, 2, 3, 4]}, "layers": [{"geom": "point", "mapping": {"x": "v", "y": "v"}}]}"#,
    );
    let config = temp_file("opts.json", r#"{"break_count": 3}"#);
    let stdout = run_gramspec(&[
        spec.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--pretty",
    ])
    .unwrap();
    assert!(stdout.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["scales"]["x"]["aes"], "x");
}
