// Variable binding for one layer

use crate::data::{is_stat_var, Column, DataFrame, Value, VarKind};
use crate::error::{PlotError, Result};
use crate::ir::BoundLayer;
use crate::order::{resolve_order_options, OrderOption};
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{
    LayerSpec, MappingAnnotation, MappingValue, PlotSpec, SeriesAnnotation, SeriesType,
};
use crate::stat;
use crate::ResolveContext;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

// =============================================================================
// Geo join collaborator
// =============================================================================

/// Merges a layer's `map` table into its data.
pub trait GeoJoin: fmt::Debug + Send + Sync {
    fn join(
        &self,
        data: &DataFrame,
        map: &DataFrame,
        keys: Option<&(Vec<String>, Vec<String>)>,
    ) -> Result<DataFrame>;
}

/// Default join on key columns.
///
/// Without `map_join` the map is appended column-wise when the row counts
/// agree; with keys it is a left join producing one row per matching map
/// row.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyJoin;

impl GeoJoin for KeyJoin {
    fn join(
        &self,
        data: &DataFrame,
        map: &DataFrame,
        keys: Option<&(Vec<String>, Vec<String>)>,
    ) -> Result<DataFrame> {
        if map.is_empty() {
            return Ok(data.clone());
        }
        if data.is_empty() {
            return Ok(map.clone());
        }
        let Some((data_keys, map_keys)) = keys else {
            if data.row_count() != map.row_count() {
                return Err(PlotError::Binding(format!(
                    "Can't combine data ({} rows) with map ({} rows) without 'map_join'",
                    data.row_count(),
                    map.row_count()
                )));
            }
            return data.append_replace(map);
        };
        if data_keys.len() != map_keys.len() || data_keys.is_empty() {
            return Err(PlotError::Binding(
                "'map_join' needs the same number of data and map variables".to_string(),
            ));
        }

        let data_cols = data_keys
            .iter()
            .map(|k| data.get(k).map_err(|_| undefined("map_join", k, data)))
            .collect::<Result<Vec<_>>>()?;
        let map_cols = map_keys
            .iter()
            .map(|k| map.get(k).map_err(|_| undefined("map_join", k, map)))
            .collect::<Result<Vec<_>>>()?;

        let key_at = |cols: &[&Column], row: usize| -> Vec<String> {
            cols.iter().map(|c| c.values[row].to_string()).collect()
        };
        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for row in 0..map.row_count() {
            index.entry(key_at(&map_cols, row)).or_default().push(row);
        }

        let mut data_rows = Vec::new();
        let mut map_rows = Vec::new();
        for row in 0..data.row_count() {
            match index.get(&key_at(&data_cols, row)) {
                Some(matches) => {
                    for &m in matches {
                        data_rows.push(row);
                        map_rows.push(m);
                    }
                }
                // Unmatched rows keep null geometry
                None => {
                    data_rows.push(row);
                    map_rows.push(usize::MAX);
                }
            }
        }

        let shared: Vec<String> = map.names().filter(|n| data.has(n)).map(str::to_string).collect();
        let left = data.select_rows(&data_rows);
        let right = map.select_rows(&map_rows).drop_columns(&shared);
        left.append_replace(&right)
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Layer data merged with plot data: equal row counts merge column-wise,
/// otherwise the layer's own data wins when it has any.
pub fn combine_data(plot: &DataFrame, layer: &DataFrame) -> Result<DataFrame> {
    if !plot.is_empty() && !layer.is_empty() && plot.row_count() == layer.row_count() {
        plot.append_replace(layer)
    } else if !layer.is_empty() {
        Ok(layer.clone())
    } else {
        Ok(plot.clone())
    }
}

fn series_kind(series: &SeriesAnnotation, data: &DataFrame) -> Option<VarKind> {
    match series.series_type {
        SeriesType::DateTime => Some(VarKind::DateTime),
        SeriesType::Date => Some(VarKind::Date),
        SeriesType::Time => Some(VarKind::Time),
        SeriesType::Str | SeriesType::Bool => Some(VarKind::Discrete),
        SeriesType::Int | SeriesType::Float if data.is_numeric(&series.column) => {
            Some(VarKind::Continuous)
        }
        _ => None,
    }
}

fn undefined(role: &str, var: &str, data: &DataFrame) -> PlotError {
    let names: Vec<&str> = data.names().collect();
    PlotError::Binding(format!(
        "Undefined variable '{}' in {}. Variables in data frame: [{}]",
        var,
        role,
        names.join(", ")
    ))
}

/// Resolve every aesthetic of `layer` against the combined plot and layer data.
pub fn bind_layer(plot: &PlotSpec, layer: &LayerSpec, ctx: &ResolveContext) -> Result<BoundLayer> {
    let mut data = combine_data(&plot.data, &layer.data)?;
    if !layer.map.is_empty() {
        data = ctx.geo_join().join(&data, &layer.map, layer.map_join.as_ref())?;
    }

    let mut factor_levels: IndexMap<String, (Vec<Value>, i32)> = IndexMap::new();
    for series in plot.data_meta.series.iter().chain(&layer.data_meta.series) {
        if !data.has(&series.column) {
            continue;
        }
        if let Some(kind) = series_kind(series, &data) {
            data = data.with_kind(&series.column, kind)?;
        }
        if let Some(levels) = &series.factor_levels {
            factor_levels.insert(
                series.column.clone(),
                (levels.clone(), series.order.unwrap_or(1)),
            );
        }
    }

    let mut mapping: IndexMap<Aes, MappingValue> = IndexMap::new();
    if layer.inherit_aes {
        mapping.extend(plot.mapping.aes.iter().map(|(a, v)| (*a, v.clone())));
    }
    for (aes, value) in &layer.mapping.aes {
        mapping.insert(*aes, value.clone());
    }
    for aes in layer.constants.keys() {
        mapping.shift_remove(aes);
    }

    let layer_desc = format!("layer {} ({})", layer.index, layer.geom.name());
    let mut bindings: IndexMap<Aes, String> = IndexMap::new();
    for (aes, value) in &mapping {
        let var = match value {
            MappingValue::Variable(var) if is_stat_var(var) => {
                if !stat::produced_vars(&layer.stat).contains(&var.as_str()) {
                    return Err(PlotError::StatConfig(format!(
                        "Variable '{}' mapped to '{}' is not produced by stat '{}'",
                        var,
                        aes,
                        layer.stat.name()
                    )));
                }
                var.clone()
            }
            MappingValue::Variable(var) => {
                if !data.has(var) {
                    return Err(undefined(&format!("'{}' of {}", aes, layer_desc), var, &data));
                }
                var.clone()
            }
            MappingValue::Literal(values) => {
                let column = Column::new(aes.name(), values.clone());
                data = if data.is_empty() {
                    DataFrame::from_columns(vec![column])?
                } else {
                    data.with_column(column)
                        .map_err(|e| PlotError::Binding(format!("{} in {}", e, layer_desc)))?
                };
                aes.name().to_string()
            }
        };
        bindings.insert(*aes, var);
    }

    // Plot-level annotations yield to a plain layer mapping of the same aesthetic
    let mut annotations: Vec<(bool, &MappingAnnotation)> = Vec::new();
    if layer.inherit_aes {
        annotations.extend(
            plot.data_meta
                .mappings
                .iter()
                .filter(|a| {
                    !layer.mapping.aes.contains_key(&a.aes)
                        || layer.data_meta.as_discrete(a.aes).is_some()
                })
                .map(|a| (false, a)),
        );
    }
    annotations.extend(layer.data_meta.mappings.iter().map(|a| (true, a)));

    let mut discrete_sources: IndexMap<Aes, String> = IndexMap::new();
    let mut scale_names: IndexMap<Aes, String> = IndexMap::new();
    let mut plot_orders: Vec<OrderOption> = Vec::new();
    let mut layer_orders: Vec<OrderOption> = Vec::new();
    for (from_layer, annotation) in annotations {
        let aes = annotation.aes;
        let Some(bound) = bindings.get(&aes).cloned() else {
            continue;
        };
        let source = match discrete_sources.get(&aes) {
            Some(source) => source.clone(),
            None => {
                if !is_stat_var(&bound) {
                    let derived = format!("{}.{}", aes, bound);
                    let column = data.get(&bound)?.renamed(&derived);
                    // Temporal copies stay temporal so their labels keep date formatting
                    let kind = if column.kind.is_temporal() {
                        column.kind
                    } else {
                        VarKind::Discrete
                    };
                    let column = column.with_kind(kind);
                    data = data.with_column(column)?;
                    bindings.insert(aes, derived);
                }
                discrete_sources.insert(aes, bound.clone());
                bound
            }
        };
        if let Some(label) = &annotation.label {
            scale_names.insert(aes, label.clone());
        }
        if annotation.order_by.is_some() || annotation.order.is_some() {
            let option =
                OrderOption::new(aes, source, annotation.order_by.clone(), annotation.order);
            if from_layer {
                layer_orders.push(option);
            } else {
                plot_orders.push(option);
            }
        }
    }

    let bound: Vec<(Aes, String)> = bindings
        .iter()
        .map(|(aes, var)| (*aes, discrete_sources.get(aes).unwrap_or(var).clone()))
        .collect();
    let order_options = resolve_order_options(&plot_orders, &layer_orders, &bound)?;

    let group = layer
        .mapping
        .group
        .clone()
        .or_else(|| plot.mapping.group.clone().filter(|_| layer.inherit_aes));
    if let Some(group) = &group {
        if !data.has(group) && !is_stat_var(group) {
            return Err(undefined(&format!("'group' of {}", layer_desc), group, &data));
        }
    }

    debug!(
        layer = layer.index,
        geom = layer.geom.name(),
        bindings = bindings.len(),
        rows = data.row_count(),
        "bound layer"
    );

    Ok(BoundLayer {
        index: layer.index,
        geom: layer.geom,
        stat: layer.stat.clone(),
        position: layer.position,
        flipped: layer.orientation == Some(Aes::Y),
        data,
        bindings,
        group,
        constants: layer.constants.clone(),
        order_options,
        discrete_sources,
        factor_levels,
        scale_names,
        tooltips: layer.tooltips.clone(),
        show_legend: layer.show_legend,
        map_join: layer.map_join.clone(),
        own_vars: layer.data.names().map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize_plot;
    use serde_json::json;

    fn make_context() -> ResolveContext {
        ResolveContext::default()
    }

    fn bind(spec: serde_json::Value) -> Result<BoundLayer> {
        let plot = normalize_plot(&spec)?;
        bind_layer(&plot, &plot.layers[0], &make_context())
    }

    #[test]
    fn test_layer_mapping_overrides_plot() {
        let layer = bind(json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "mapping": {"x": "a", "y": "b"},
            "layers": [{"geom": "point", "mapping": {"x": "b"}}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::X), Some("b"));
        assert_eq!(layer.variable(Aes::Y), Some("b"));
    }

    #[test]
    fn test_inherit_aes_false() {
        let layer = bind(json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "mapping": {"x": "a", "y": "b"},
            "layers": [{"geom": "point", "inherit_aes": false, "mapping": {"x": "b", "y": "a"}}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::X), Some("b"));
        assert_eq!(layer.variable(Aes::Y), Some("a"));
    }

    #[test]
    fn test_undefined_variable() {
        let err = bind(json!({
            "data": {"a": [1, 2]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "nope"}}]
        }))
        .unwrap_err();
        match err {
            PlotError::Binding(msg) => {
                assert!(msg.contains("'nope'"));
                assert!(msg.contains("[a]"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_layer_data_without_plot_variable() {
        let err = bind(json!({
            "data": {"a": [1, 2, 3]},
            "mapping": {"x": "a"},
            "layers": [{"geom": "point", "data": {"b": [1, 2]}, "mapping": {"y": "b"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::Binding(_)));
    }

    #[test]
    fn test_layer_data_merges_with_equal_rows() {
        let layer = bind(json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "mapping": {"x": "a", "y": "b"},
            "layers": [{"geom": "point", "data": {"b": [5, 6]}}]
        }))
        .unwrap();
        assert_eq!(layer.data.get("b").unwrap().values, vec![Value::Num(5.0), Value::Num(6.0)]);
        assert_eq!(layer.own_vars, vec!["b".to_string()]);
    }

    #[test]
    fn test_literal_mapping_becomes_column() {
        let layer = bind(json!({
            "layers": [{"geom": "point", "mapping": {"x": [1, 2, 3], "y": [4, 5, 6]}}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::X), Some("x"));
        assert_eq!(layer.data.row_count(), 3);
    }

    #[test]
    fn test_constant_removes_mapping() {
        let layer = bind(json!({
            "data": {"a": [1, 2], "g": ["u", "v"]},
            "mapping": {"x": "a", "y": "a", "color": "g"},
            "layers": [{"geom": "point", "color": "red"}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::Color), None);
        assert_eq!(layer.constants.get(&Aes::Color), Some(&Value::from("red")));
    }

    #[test]
    fn test_stat_var_not_produced() {
        let err = bind(json!({
            "data": {"a": [1, 2]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "..density.."}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::StatConfig(_)));
    }

    #[test]
    fn test_as_discrete_derived_column() {
        let layer = bind(json!({
            "data": {"cyl": [4, 6, 8, 4]},
            "mapping": {"x": "cyl", "fill": "cyl"},
            "data_meta": {"mapping_annotations": [
                {"aes": "fill", "annotation": "as_discrete", "parameters": {"label": "Cylinders"}}
            ]},
            "layers": [{"geom": "bar"}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::Fill), Some("fill.cyl"));
        assert_eq!(layer.source_variable(Aes::Fill), Some("cyl"));
        assert_eq!(layer.variable(Aes::X), Some("cyl"));
        assert_eq!(layer.data.kind("fill.cyl"), Some(VarKind::Discrete));
        assert_eq!(layer.data.kind("cyl"), Some(VarKind::Continuous));
        assert_eq!(layer.scale_names.get(&Aes::Fill).map(String::as_str), Some("Cylinders"));
    }

    #[test]
    fn test_as_discrete_keeps_temporal_kind() {
        let layer = bind(json!({
            "data": {"t": [0, 3600000, 7200000], "y": [1, 2, 3]},
            "mapping": {"x": "t", "y": "y"},
            "data_meta": {
                "series_annotations": [{"column": "t", "type": "datetime"}],
                "mapping_annotations": [{"aes": "x", "annotation": "as_discrete", "parameters": {}}]
            },
            "layers": [{"geom": "point"}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::X), Some("x.t"));
        assert!(layer.is_as_discrete(Aes::X));
        assert_eq!(layer.data.kind("x.t"), Some(VarKind::DateTime));
    }

    #[test]
    fn test_simple_layer_mapping_drops_plot_annotation() {
        let layer = bind(json!({
            "data": {"cyl": [4, 6, 8, 4], "v": [1, 2, 3, 4]},
            "mapping": {"x": "v", "y": "v", "color": "cyl"},
            "data_meta": {"mapping_annotations": [
                {"aes": "color", "annotation": "as_discrete", "parameters": {}}
            ]},
            "layers": [{"geom": "point", "mapping": {"color": "v"}}]
        }))
        .unwrap();
        assert_eq!(layer.variable(Aes::Color), Some("v"));
        assert!(!layer.is_as_discrete(Aes::Color));
    }

    #[test]
    fn test_ordering_conflict_across_scopes() {
        let err = bind(json!({
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
        assert!(msg.contains("'foo'") && msg.contains("'bar'"));
    }

    #[test]
    fn test_series_annotations() {
        let layer = bind(json!({
            "data": {"d": [0, 86400000], "g": ["b", "a"]},
            "mapping": {"x": "d", "y": "d"},
            "data_meta": {"series_annotations": [
                {"column": "d", "type": "datetime"},
                {"column": "g", "type": "str", "factor_levels": ["a", "b"], "order": -1}
            ]},
            "layers": [{"geom": "point"}]
        }))
        .unwrap();
        assert_eq!(layer.data.kind("d"), Some(VarKind::DateTime));
        let (levels, order) = &layer.factor_levels["g"];
        assert_eq!(levels, &vec![Value::from("a"), Value::from("b")]);
        assert_eq!(*order, -1);
    }

    #[test]
    fn test_missing_group_variable() {
        let err = bind(json!({
            "data": {"a": [1, 2]},
            "layers": [{"geom": "line", "mapping": {"x": "a", "y": "a", "group": "g"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::Binding(_)));
    }

    #[test]
    fn test_key_join_left() {
        let data = DataFrame::from_json(&json!({"id": ["a", "b", "c"], "v": [1, 2, 3]})).unwrap();
        let map = DataFrame::from_json(&json!({
            "key": ["a", "a", "b"],
            "__x__": [0, 1, 5],
        }))
        .unwrap();
        let keys = (vec!["id".to_string()], vec!["key".to_string()]);
        let joined = KeyJoin.join(&data, &map, Some(&keys)).unwrap();
        assert_eq!(joined.row_count(), 4);
        assert_eq!(
            joined.get("__x__").unwrap().values,
            vec![Value::Num(0.0), Value::Num(1.0), Value::Num(5.0), Value::Null]
        );
        assert_eq!(joined.get("v").unwrap().values[3], Value::Num(3.0));
    }

    #[test]
    fn test_key_join_without_keys() {
        let data = DataFrame::from_json(&json!({"v": [1, 2]})).unwrap();
        let map = DataFrame::from_json(&json!({"__x__": [0, 1, 2]})).unwrap();
        assert!(KeyJoin.join(&data, &map, None).is_err());
        assert_eq!(KeyJoin.join(&DataFrame::empty(), &map, None).unwrap(), map);
    }
}
