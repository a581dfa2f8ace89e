use crate::data::{is_stat_var, Column, DataFrame, Value};
use crate::error::{PlotError, Result};
use crate::ir::BoundLayer;
use crate::order::{ordered_domain, OrderAggregate};
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{Position, Stat};
use crate::stat::{self, StatInput, GROUP};
use crate::ResolveContext;
use indexmap::IndexMap;
use tracing::debug;

fn push_unique(out: &mut Vec<String>, var: &str) {
    if !out.iter().any(|v| v == var) {
        out.push(var.to_string());
    }
}

/// Facet variables present in the layer data
fn layer_facets(layer: &BoundLayer, facet_vars: &[String]) -> Vec<String> {
    facet_vars
        .iter()
        .filter(|v| layer.data.has(v))
        .cloned()
        .collect()
}

/// Apply the layer's stat, then check the geom's required aesthetics.
pub fn apply_stat(
    layer: BoundLayer,
    facet_vars: &[String],
    ctx: &ResolveContext,
) -> Result<BoundLayer> {
    let rows_in = layer.data.row_count();
    let layer = if layer.stat.is_identity() {
        drop_unused(layer, facet_vars, ctx.options.drop_unused_data)
    } else {
        compute_layer_stat(layer, facet_vars, ctx)?
    };
    check_required_aes(&layer)?;

    debug!(
        layer = layer.index,
        stat = layer.stat.name(),
        rows_in,
        rows_out = layer.data.row_count(),
        "applied stat"
    );
    Ok(layer)
}

// =============================================================================
// Identity: data dropping
// =============================================================================

fn drop_unused(layer: BoundLayer, facet_vars: &[String], enabled: bool) -> BoundLayer {
    if !enabled {
        return layer;
    }
    let mut keep: Vec<String> = Vec::new();
    for var in layer.bindings.values() {
        push_unique(&mut keep, var);
    }
    for var in layer.extra_variables() {
        push_unique(&mut keep, &var);
    }
    for var in layer_facets(&layer, facet_vars) {
        push_unique(&mut keep, &var);
    }
    if let Some((_, map_keys)) = &layer.map_join {
        map_keys.iter().for_each(|k| push_unique(&mut keep, k));
    }
    // Geometry columns added by the geo join
    for name in layer.data.names().filter(|n| n.starts_with("__")) {
        push_unique(&mut keep, name);
    }

    let dropped: Vec<&str> = layer.data.names().filter(|n| !keep.iter().any(|k| k == n)).collect();
    if dropped.is_empty() {
        return layer;
    }
    debug!(layer = layer.index, dropped = ?dropped, "dropped unused variables");
    let data = layer.data.select_columns(&keep);
    BoundLayer { data, ..layer }
}

// =============================================================================
// Non-identity stats
// =============================================================================

/// First non-null value for discrete columns, the mean for continuous ones
fn group_constant(column: &Column) -> Value {
    if column.kind.is_discrete() || !column.is_numeric() {
        return column.values.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null);
    }
    let nums: Vec<f64> = column
        .values
        .iter()
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite())
        .collect();
    if nums.is_empty() {
        Value::Null
    } else {
        Value::Num(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

/// Shift `..group..` ids so paths from different groups never share an id
fn offset_groups(out: DataFrame, offset: &mut f64) -> Result<DataFrame> {
    let Some(column) = out.column(GROUP) else {
        return Ok(out);
    };
    let base = *offset;
    let values: Vec<Value> = column
        .values
        .iter()
        .map(|v| match v.as_f64() {
            Some(id) => {
                *offset = offset.max(base + id + 1.0);
                Value::Num(base + id)
            }
            None => Value::Null,
        })
        .collect();
    let column = Column { values, ..column.clone() };
    out.with_column(column)
}

fn compute_layer_stat(
    layer: BoundLayer,
    facet_vars: &[String],
    ctx: &ResolveContext,
) -> Result<BoundLayer> {
    let stat = &layer.stat;
    let flip = layer.flipped && stat::supports_orientation(stat);
    // Stat space and layer space differ only by the axis swap
    let swap = |aes: Aes| if flip { aes.flipped() } else { aes };

    let inputs: IndexMap<Aes, String> = layer
        .bindings
        .iter()
        .filter(|(_, var)| !is_stat_var(var))
        .map(|(aes, var)| (swap(*aes), var.clone()))
        .collect();
    let defaults: Vec<(Aes, &'static str)> = stat::default_mapping(stat)
        .into_iter()
        .map(|(aes, var)| (swap(aes), var))
        .collect();
    let series_for = |aes: Aes| defaults.iter().find(|(a, _)| *a == aes).map(|(_, v)| *v);

    // Consumed inputs without a series of their own lose their binding
    let mut bindings = layer.bindings.clone();
    let consumed: Vec<Aes> = stat::required_aes(stat)
        .iter()
        .chain([Aes::Weight, Aes::Z].iter())
        .map(|a| swap(*a))
        .filter(|a| series_for(*a).is_none())
        .collect();
    bindings.retain(|aes, _| !consumed.contains(aes));

    let facets = layer_facets(&layer, facet_vars);
    let mut group_vars = facets.clone();
    match &layer.group {
        Some(group) if !is_stat_var(group) => push_unique(&mut group_vars, group),
        Some(_) => {}
        None => {
            for (aes, var) in &layer.bindings {
                let discrete = layer.is_as_discrete(*aes)
                    || layer.data.kind(var).map(|k| k.is_discrete()).unwrap_or(false);
                if !aes.is_positional() && !is_stat_var(var) && discrete {
                    push_unique(&mut group_vars, var);
                }
            }
        }
    }

    let mut origin_needed: Vec<String> = Vec::new();
    for var in bindings.values() {
        push_unique(&mut origin_needed, var);
    }
    for var in layer.extra_variables() {
        push_unique(&mut origin_needed, &var);
    }
    for var in &facets {
        push_unique(&mut origin_needed, var);
    }
    origin_needed.retain(|v| !is_stat_var(v) && layer.data.has(v));

    let mut series: Vec<(String, &'static str)> = Vec::new();
    for (aes, var) in &bindings {
        if is_stat_var(var) || series.iter().any(|(v, _)| v == var) {
            continue;
        }
        if let Some(stat_var) = series_for(*aes) {
            series.push((var.clone(), stat_var));
        }
    }

    let attach = |out: DataFrame, rows: &DataFrame| -> Result<DataFrame> {
        let n = out.row_count();
        let mut columns = Vec::with_capacity(origin_needed.len());
        for var in &origin_needed {
            let Some(column) = rows.column(var) else { continue };
            let from_stat = series
                .iter()
                .find(|(v, _)| v == var)
                .and_then(|(_, stat_var)| out.column(stat_var));
            let values = match from_stat {
                Some(stat_column) => stat_column.values.clone(),
                None => vec![group_constant(column); n],
            };
            columns.push(Column { values, ..column.clone() });
        }
        DataFrame::from_columns(columns)?.append_replace(&out)
    };

    let sctx = ctx.stat_context();
    let mut frames = Vec::new();
    let mut group_offset = 0.0;
    for (_, rows) in layer.data.group_indices(&group_vars) {
        let sub = layer.data.select_rows(&rows);
        let mut out = stat::compute(stat, &StatInput::new(&sub, &inputs), &sctx)?;
        if stat::produces_paths(stat) {
            out = offset_groups(out, &mut group_offset)?;
        }
        frames.push(attach(out, &sub)?);
    }
    let mut data = if frames.is_empty() {
        attach(stat::empty_frame(stat)?, &layer.data.select_rows(&[]))?
    } else {
        DataFrame::concat(&frames)
    };

    for (aes, stat_var) in &defaults {
        let renders = layer.geom.renders().contains(aes);
        if renders && !bindings.contains_key(aes) && !layer.constants.contains_key(aes) {
            bindings.insert(*aes, stat_var.to_string());
        }
    }

    let group = if stat::produces_paths(stat) {
        Some(GROUP.to_string())
    } else {
        layer.group.clone()
    };

    if ctx.options.drop_unused_data {
        let mut keep = origin_needed.clone();
        for var in bindings.values() {
            push_unique(&mut keep, var);
        }
        for var in layer.extra_variables() {
            push_unique(&mut keep, &var);
        }
        if let Some(group) = &group {
            push_unique(&mut keep, group);
        }
        let dropped: Vec<&str> = data.names().filter(|n| !keep.iter().any(|k| k == n)).collect();
        if !dropped.is_empty() {
            debug!(layer = layer.index, dropped = ?dropped, "dropped unused stat variables");
        }
        data = data.select_columns(&keep);
    }

    let data = order_count_rows(&layer, stat, swap(Aes::X), &bindings, data)?;

    Ok(BoundLayer {
        data,
        bindings,
        group,
        ..layer
    })
}

/// Count-like stats emit one row per category; those rows follow the
/// category's ordered domain when the layer orders it.
fn order_count_rows(
    layer: &BoundLayer,
    stat: &Stat,
    axis: Aes,
    bindings: &IndexMap<Aes, String>,
    data: DataFrame,
) -> Result<DataFrame> {
    if !matches!(stat, Stat::Count | Stat::Count2d | Stat::Sum) {
        return Ok(data);
    }
    let Some(var) = bindings.get(&axis).filter(|v| data.has(v)) else {
        return Ok(data);
    };
    let option = layer.order_option(axis);
    let levels = layer
        .source_variable(axis)
        .and_then(|source| layer.factor_levels.get(source))
        .map(|(levels, dir)| (levels.as_slice(), *dir));
    if option.is_none() && levels.is_none() {
        return Ok(data);
    }
    let stacked = matches!(layer.position, Position::Stack | Position::Fill);
    let aggregate = option
        .and_then(|o| o.order_by.as_deref())
        .map(|by| OrderAggregate::for_variable(by, stacked))
        .unwrap_or(OrderAggregate::Mean);
    let domain = ordered_domain(&data, var, option, levels, aggregate)?;

    let values = &data.get(var)?.values;
    let mut rows: Vec<usize> = (0..data.row_count()).collect();
    rows.sort_by_key(|&i| domain.iter().position(|d| *d == values[i]).unwrap_or(usize::MAX));
    Ok(data.select_rows(&rows))
}

fn check_required_aes(layer: &BoundLayer) -> Result<()> {
    for aes in layer.geom.required_aes() {
        let aes = if layer.flipped { aes.flipped() } else { *aes };
        if !layer.provides(aes) {
            return Err(PlotError::Binding(format!(
                "Layer {} ({}) requires the '{}' aesthetic",
                layer.index,
                layer.geom.name(),
                aes
            )));
        }
    }
    Ok(())
}

/// Plot-level data reduced to the variables some layer reads from it.
/// A layer carrying its own column of the same name does not count.
pub fn prune_plot_data(plot_data: &DataFrame, layers: &[BoundLayer]) -> DataFrame {
    let keep: Vec<&str> = plot_data
        .names()
        .filter(|name| {
            layers
                .iter()
                .any(|l| l.data.has(name) && !l.own_vars.iter().any(|v| v == name))
        })
        .collect();
    plot_data.select_columns(&keep)
}
