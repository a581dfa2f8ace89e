// Normalization of the raw spec tree into typed plot specs

use super::aesthetics::Aes;
use super::ast::{
    DataMeta, FigureSpec, Labels, LayerSpec, MappingAnnotation, MappingSpec, MappingValue,
    PlotSpec, Position, SeriesAnnotation, SeriesType, SubplotsSpec,
};
use super::coord::parse_coord;
use super::facet::parse_facet;
use super::geom::GeomKind;
use super::options::Options;
use super::scale::parse_scales;
use super::stat::{parse_stat, STAT_PARAM_KEYS};
use super::theme::parse_theme;
use super::tooltip::parse_tooltips;
use crate::data::{DataFrame, Value};
use crate::error::{PlotError, Result};
use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

const PLOT_KEYS: &[&str] = &[
    "kind",
    "data",
    "mapping",
    "data_meta",
    "layers",
    "scales",
    "facet",
    "coord",
    "theme",
    "ggtitle",
    "caption",
    "ggsize",
];

const SUBPLOTS_KEYS: &[&str] = &["kind", "figures", "layout", "ggsize", "ggtitle", "caption", "theme"];

const LAYER_KEYS: &[&str] = &[
    "geom",
    "stat",
    "mapping",
    "data",
    "data_meta",
    "position",
    "tooltips",
    "inherit_aes",
    "show_legend",
    "orientation",
    "map",
    "map_join",
];

// =============================================================================
// Figures
// =============================================================================

/// Normalize a whole figure: a plot or a `subplots` composite
pub fn normalize_figure(value: &Json) -> Result<FigureSpec> {
    normalize_figure_at(value, "")
}

fn normalize_figure_at(value: &Json, path: &str) -> Result<FigureSpec> {
    let opts = Options::new(value, path)?;
    match opts.string("kind")?.as_deref() {
        None | Some("plot") => Ok(FigureSpec::Plot(Box::new(normalize_plot_at(&opts)?))),
        Some("subplots") => normalize_subplots(&opts).map(FigureSpec::Subplots),
        Some(other) => Err(opts.error("kind", format!("Unknown figure kind '{}'", other))),
    }
}

fn normalize_subplots(opts: &Options) -> Result<SubplotsSpec> {
    opts.warn_unknown(SUBPLOTS_KEYS, |_| false);
    let items = opts
        .list("figures")?
        .ok_or_else(|| opts.error("figures", "Subplots require a list of figures"))?;
    let mut figures = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", opts.child_path("figures"), i);
        figures.push(match item {
            Json::Null => None,
            _ => Some(normalize_figure_at(item, &path)?),
        });
    }
    let (ncol, nrow) = match opts.object("layout")? {
        Some(layout) => (layout.usize("ncol")?, layout.usize("nrow")?),
        None => (None, None),
    };
    Ok(SubplotsSpec { figures, ncol, nrow })
}

/// Normalize a single plot spec
pub fn normalize_plot(value: &Json) -> Result<PlotSpec> {
    let opts = Options::new(value, "")?;
    normalize_plot_at(&opts)
}

fn normalize_plot_at(opts: &Options) -> Result<PlotSpec> {
    opts.warn_unknown(PLOT_KEYS, |_| false);

    let data = parse_data(opts, "data")?;
    let mapping = match opts.get("mapping") {
        Some(m) => parse_mapping(m, &opts.child_path("mapping"))?,
        None => MappingSpec::default(),
    };
    let data_meta = match opts.get("data_meta") {
        Some(m) => parse_data_meta(m, &opts.child_path("data_meta"))?,
        None => DataMeta::default(),
    };

    let mut layers = Vec::new();
    if let Some(items) = opts.list("layers")? {
        for (index, item) in items.iter().enumerate() {
            let path = format!("{}[{}]", opts.child_path("layers"), index);
            layers.push(parse_layer(item, &path, index)?);
        }
    }

    check_literal_lengths(&mapping, rows_of(&data), &opts.child_path("mapping"))?;
    for layer in &layers {
        let rows = rows_of(&layer.data).or(rows_of(&data));
        let path = format!("{}[{}].mapping", opts.child_path("layers"), layer.index);
        check_literal_lengths(&layer.mapping, rows, &path)?;
    }

    let scales = match opts.get("scales") {
        Some(s) => parse_scales(s, &opts.child_path("scales"))?,
        None => Vec::new(),
    };
    let facet = match opts.get("facet") {
        Some(f) => Some(parse_facet(f, &opts.child_path("facet"))?),
        None => None,
    };
    let coord = match opts.get("coord") {
        Some(c) => parse_coord(c, &opts.child_path("coord"))?,
        None => Default::default(),
    };
    let theme = match opts.get("theme") {
        Some(t) => parse_theme(t, &opts.child_path("theme"))?,
        None => Default::default(),
    };

    let mut labels = Labels::default();
    if let Some(title) = opts.object("ggtitle")? {
        labels.title = title.string("text")?;
        labels.subtitle = title.string("subtitle")?;
    }
    if let Some(caption) = opts.object("caption")? {
        labels.caption = caption.string("text")?;
    }
    let size = match opts.object("ggsize")? {
        Some(size) => match (size.f64("width")?, size.f64("height")?) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => return Err(PlotError::spec(size.path(), "ggsize requires width and height")),
        },
        None => None,
    };

    debug!(
        layers = layers.len(),
        rows = data.row_count(),
        "normalized plot spec"
    );

    Ok(PlotSpec {
        data,
        mapping,
        data_meta,
        layers,
        scales,
        facet,
        coord,
        theme,
        labels,
        size,
    })
}

// =============================================================================
// Data, mapping, annotations
// =============================================================================

fn parse_data(opts: &Options, key: &str) -> Result<DataFrame> {
    match opts.get(key) {
        Some(value) => DataFrame::from_json(value).map_err(|e| e.at(&opts.child_path(key))),
        None => Ok(DataFrame::empty()),
    }
}

pub fn parse_mapping(value: &Json, path: &str) -> Result<MappingSpec> {
    let opts = Options::new(value, path)?;
    let mut mapping = MappingSpec::default();
    for key in opts.keys() {
        let Some(item) = opts.get(key) else { continue };
        if key == "group" {
            mapping.group = opts.string(key)?;
            continue;
        }
        let aes = Aes::from_name(key)
            .ok_or_else(|| opts.error(key, format!("Unknown aesthetic '{}'", key)))?;
        let value = match item {
            Json::String(var) => MappingValue::Variable(var.clone()),
            Json::Array(_) => MappingValue::Literal(opts.values(key)?.unwrap_or_default()),
            _ => return Err(opts.error(key, "Mapping must name a variable or list values")),
        };
        mapping.aes.insert(aes, value);
    }
    Ok(mapping)
}

fn rows_of(data: &DataFrame) -> Option<usize> {
    (!data.is_empty()).then(|| data.row_count())
}

/// Literal arrays become columns, so they must match the frame they join
fn check_literal_lengths(mapping: &MappingSpec, rows: Option<usize>, path: &str) -> Result<()> {
    let mut expected = rows;
    for (aes, value) in &mapping.aes {
        let MappingValue::Literal(values) = value else { continue };
        match expected {
            Some(n) if n != values.len() => {
                return Err(PlotError::spec(
                    format!("{}.{}", path, aes),
                    format!("Expected {} values but got {}", n, values.len()),
                ))
            }
            Some(_) => {}
            None => expected = Some(values.len()),
        }
    }
    Ok(())
}

fn parse_series_type(name: &str, path: &str) -> Result<SeriesType> {
    match name {
        "datetime" => Ok(SeriesType::DateTime),
        "date" => Ok(SeriesType::Date),
        "time" => Ok(SeriesType::Time),
        "int" => Ok(SeriesType::Int),
        "float" => Ok(SeriesType::Float),
        "str" => Ok(SeriesType::Str),
        "bool" => Ok(SeriesType::Bool),
        "unknown" => Ok(SeriesType::Unknown),
        _ => Err(PlotError::spec(path, format!("Unknown series type '{}'", name))),
    }
}

pub fn parse_data_meta(value: &Json, path: &str) -> Result<DataMeta> {
    let opts = Options::new(value, path)?;
    let mut meta = DataMeta::default();

    if let Some(items) = opts.list("series_annotations")? {
        for (i, item) in items.iter().enumerate() {
            let item = Options::new(item, &format!("{}[{}]", opts.child_path("series_annotations"), i))?;
            let column = item
                .string("column")?
                .ok_or_else(|| item.error("column", "Series annotation requires a column"))?;
            let series_type = match item.string("type")? {
                Some(t) => parse_series_type(&t, &item.child_path("type"))?,
                None => SeriesType::Unknown,
            };
            meta.series.push(SeriesAnnotation {
                column,
                series_type,
                factor_levels: item.values("factor_levels")?,
                order: item.i32("order")?,
            });
        }
    }

    if let Some(items) = opts.list("mapping_annotations")? {
        for (i, item) in items.iter().enumerate() {
            let item = Options::new(item, &format!("{}[{}]", opts.child_path("mapping_annotations"), i))?;
            let aes_name = item
                .string("aes")?
                .ok_or_else(|| item.error("aes", "Mapping annotation requires an aesthetic"))?;
            let aes = Aes::from_name(&aes_name)
                .ok_or_else(|| item.error("aes", format!("Unknown aesthetic '{}'", aes_name)))?;
            match item.string("annotation")?.as_deref() {
                Some("as_discrete") => {}
                other => {
                    return Err(item.error(
                        "annotation",
                        format!("Unsupported mapping annotation {:?}", other.unwrap_or("")),
                    ))
                }
            }
            let (label, order_by, order) = match item.object("parameters")? {
                Some(params) => (params.string("label")?, params.string("order_by")?, params.i32("order")?),
                None => (None, None, None),
            };
            if matches!(order, Some(o) if o != 1 && o != -1) {
                return Err(item.error("parameters", "order must be 1 or -1"));
            }
            meta.mappings.push(MappingAnnotation { aes, label, order_by, order });
        }
    }
    Ok(meta)
}

// =============================================================================
// Layers
// =============================================================================

fn parse_position(value: &Json, path: &str) -> Result<Position> {
    let name = match value {
        Json::String(s) => s.clone(),
        Json::Object(_) => Options::new(value, path)?
            .string("name")?
            .ok_or_else(|| PlotError::spec(path, "Position requires a name"))?,
        _ => return Err(PlotError::spec(path, "Expected a position name")),
    };
    match name.as_str() {
        "identity" => Ok(Position::Identity),
        "stack" => Ok(Position::Stack),
        "dodge" | "dodgev" => Ok(Position::Dodge),
        "fill" => Ok(Position::Fill),
        "jitter" => Ok(Position::Jitter),
        "jitterdodge" => Ok(Position::JitterDodge),
        "nudge" => Ok(Position::Nudge),
        _ => Err(PlotError::spec(path, format!("Unknown position '{}'", name))),
    }
}

fn default_position(geom: GeomKind) -> Position {
    match geom {
        GeomKind::Bar | GeomKind::Histogram | GeomKind::Area | GeomKind::Density => Position::Stack,
        GeomKind::Boxplot | GeomKind::Violin => Position::Dodge,
        GeomKind::Jitter => Position::Jitter,
        _ => Position::Identity,
    }
}

/// `map_join`: `["var", "map_var"]` or `[["a", "b"], ["ma", "mb"]]`
fn parse_map_join(opts: &Options) -> Result<Option<(Vec<String>, Vec<String>)>> {
    let Some(items) = opts.list("map_join")? else {
        return Ok(None);
    };
    let side = |v: &Json| -> Option<Vec<String>> {
        match v {
            Json::String(s) => Some(vec![s.clone()]),
            Json::Array(xs) => xs.iter().map(|x| x.as_str().map(str::to_string)).collect(),
            _ => None,
        }
    };
    match items.as_slice() {
        [data, map] => match (side(data), side(map)) {
            (Some(d), Some(m)) if d.len() == m.len() && !d.is_empty() => Ok(Some((d, m))),
            _ => Err(opts.error("map_join", "Data and map join keys must have the same length")),
        },
        _ => Err(opts.error("map_join", "Expected [data_keys, map_keys]")),
    }
}

fn parse_layer(value: &Json, path: &str, index: usize) -> Result<LayerSpec> {
    let opts = Options::new(value, path)?;
    opts.warn_unknown(LAYER_KEYS, |key| {
        STAT_PARAM_KEYS.contains(&key) || Aes::from_name(key).is_some()
    });

    let geom_name = opts
        .string("geom")?
        .ok_or_else(|| opts.error("geom", "Layer requires a geom"))?;
    let geom = GeomKind::from_name(&geom_name)
        .ok_or_else(|| opts.error("geom", format!("Unknown geom '{}'", geom_name)))?;

    let stat_name = opts
        .string("stat")?
        .unwrap_or_else(|| geom.default_stat().to_string());
    let stat = parse_stat(&stat_name, &opts)?;

    let mapping = match opts.get("mapping") {
        Some(m) => parse_mapping(m, &opts.child_path("mapping"))?,
        None => MappingSpec::default(),
    };
    let data_meta = match opts.get("data_meta") {
        Some(m) => parse_data_meta(m, &opts.child_path("data_meta"))?,
        None => DataMeta::default(),
    };
    let position = match opts.get("position") {
        Some(p) => parse_position(p, &opts.child_path("position"))?,
        None => default_position(geom),
    };
    let tooltips = match opts.get("tooltips") {
        Some(t) => parse_tooltips(t, &opts.child_path("tooltips"))?,
        None => Default::default(),
    };
    let orientation = match opts.string("orientation")?.as_deref() {
        None | Some("x") => None,
        Some("y") => Some(Aes::Y),
        Some(other) => return Err(opts.error("orientation", format!("Unknown orientation '{}'", other))),
    };

    let mut constants = IndexMap::new();
    for key in opts.keys() {
        let Some(aes) = Aes::from_name(key) else { continue };
        let Some(raw) = opts.get(key) else { continue };
        let value = Value::from_json(raw)
            .ok_or_else(|| opts.error(key, "Aesthetic constant must be a scalar value"))?;
        constants.insert(aes, value);
    }

    Ok(LayerSpec {
        index,
        geom,
        stat,
        mapping,
        data: parse_data(&opts, "data")?,
        data_meta,
        position,
        tooltips,
        inherit_aes: opts.bool("inherit_aes")?.unwrap_or(true),
        show_legend: opts.bool("show_legend")?.unwrap_or(true),
        orientation,
        constants,
        map: parse_data(&opts, "map")?,
        map_join: parse_map_join(&opts)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Stat, TooltipSpec};
    use serde_json::json;

    fn make_spec() -> Json {
        json!({
            "kind": "plot",
            "data": {"time": ["Lunch", "Lunch", "Dinner"], "tip": [1, 2, 3]},
            "mapping": {"x": "time"},
            "layers": [
                {"geom": "bar", "fill": "red", "tooltips": "none"},
                {"geom": "point", "mapping": {"y": "tip", "group": "time"}, "data_meta": {
                    "mapping_annotations": [{"aes": "color", "annotation": "as_discrete", "parameters": {"order_by": "tip"}}]
                }}
            ],
            "ggtitle": {"text": "Tips"},
            "ggsize": {"width": 400, "height": 300}
        })
    }

    #[test]
    fn test_normalize_plot() {
        let plot = normalize_plot(&make_spec()).unwrap();
        assert_eq!(plot.data.row_count(), 3);
        assert_eq!(plot.mapping.variable(Aes::X), Some("time"));
        assert_eq!(plot.layers.len(), 2);
        assert_eq!(plot.layers[0].geom, GeomKind::Bar);
        assert_eq!(plot.layers[0].stat, Stat::Count);
        assert_eq!(plot.layers[0].position, Position::Stack);
        assert_eq!(plot.layers[0].tooltips, TooltipSpec::Hidden);
        assert_eq!(plot.layers[0].constants.get(&Aes::Fill), Some(&Value::from("red")));
        assert_eq!(plot.layers[1].mapping.group.as_deref(), Some("time"));
        assert_eq!(plot.layers[1].data_meta.mappings[0].order_by.as_deref(), Some("tip"));
        assert_eq!(plot.labels.title.as_deref(), Some("Tips"));
        assert_eq!(plot.size, Some((400.0, 300.0)));
    }

    #[test]
    fn test_ragged_data_fails_at_normalizer() {
        let err = normalize_plot(&json!({"data": {"a": [1, 2], "b": [1]}})).unwrap_err();
        match err {
            PlotError::SpecStructure { path, .. } => assert_eq!(path, "data"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ragged_layer_data_path() {
        let err = normalize_plot(&json!({"layers": [{"geom": "point"}, {"geom": "point", "data": {"a": [1], "b": []}}]}))
            .unwrap_err();
        match err {
            PlotError::SpecStructure { path, .. } => assert_eq!(path, "layers[1].data"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_geom() {
        let err = normalize_plot(&json!({"layers": [{"geom": "blob"}]})).unwrap_err();
        assert_eq!(err, PlotError::spec("layers[0].geom", "Unknown geom 'blob'"));
    }

    #[test]
    fn test_missing_geom() {
        assert!(normalize_plot(&json!({"layers": [{"stat": "count"}]})).is_err());
    }

    #[test]
    fn test_literal_mapping() {
        let mapping = parse_mapping(&json!({"y": [1, 2, 3]}), "mapping").unwrap();
        assert_eq!(
            mapping.aes.get(&Aes::Y),
            Some(&MappingValue::Literal(vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)]))
        );
    }

    #[test]
    fn test_ragged_literal_mapping() {
        let err = normalize_plot(&json!({
            "data": {"a": [1, 2, 3]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": [1, 2]}}]
        }))
        .unwrap_err();
        assert_eq!(err, PlotError::spec("layers[0].mapping.y", "Expected 3 values but got 2"));

        let err = normalize_plot(&json!({"mapping": {"x": [1, 2], "y": [1]}})).unwrap_err();
        assert!(matches!(err, PlotError::SpecStructure { .. }));
    }

    #[test]
    fn test_subplots() {
        let figure = normalize_figure(&json!({
            "kind": "subplots",
            "figures": [make_spec(), null],
            "layout": {"ncol": 2, "nrow": 1}
        }))
        .unwrap();
        match figure {
            FigureSpec::Subplots(sub) => {
                assert_eq!(sub.figures.len(), 2);
                assert!(sub.figures[1].is_none());
                assert_eq!(sub.ncol, Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_map_join_forms() {
        let layer = parse_layer(
            &json!({"geom": "polygon", "map_join": ["state", "name"]}),
            "layers[0]",
            0,
        )
        .unwrap();
        assert_eq!(layer.map_join, Some((vec!["state".to_string()], vec!["name".to_string()])));
    }
}
