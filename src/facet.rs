// Facet panel layout and coordinate resolution

use crate::data::{DataFrame, Value, VarKind};
use crate::error::{PlotError, Result};
use crate::format::ValueFormatter;
use crate::ir::BoundLayer;
use crate::order::extend_factor_levels;
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{CoordKind, CoordSpec, FacetScales, FacetSpec, WrapDirection};
use crate::scale::{Domain, Scale};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    None,
    Grid,
    Wrap,
}

/// One cell of the panel grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub row: usize,
    pub col: usize,
    /// Facet variable values selecting this panel's rows
    pub keys: IndexMap<String, Value>,
    pub labels: Vec<String>,
    /// Per-panel domains; the plot-wide domain unless the axis is free
    pub x_domain: Option<Domain>,
    pub y_domain: Option<Domain>,
    /// Row indices into each layer's data, by layer position
    pub layer_rows: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelGrid {
    pub kind: FacetKind,
    pub nrow: usize,
    pub ncol: usize,
    pub scales: FacetScales,
    pub panels: Vec<Panel>,
}

impl PanelGrid {
    pub fn panel_at(&self, row: usize, col: usize) -> Option<&Panel> {
        self.panels.iter().find(|p| p.row == row && p.col == col)
    }
}

/// Ordered levels of one facet variable across every layer carrying it
fn facet_levels(layers: &[BoundLayer], var: &str, order: i32) -> Result<Vec<Value>> {
    let carriers: Vec<&BoundLayer> = layers.iter().filter(|l| l.data.has(var)).collect();
    if carriers.is_empty() {
        return Err(PlotError::Binding(format!(
            "Undefined facet variable '{}': no layer data contains it",
            var
        )));
    }
    let mut seen: Vec<Value> = Vec::new();
    for layer in &carriers {
        for v in layer.data.distinct_values(var) {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
    }
    if let Some((levels, direction)) = carriers.iter().find_map(|l| l.factor_levels.get(var)) {
        let direction = if order != 0 { order } else { *direction };
        return Ok(extend_factor_levels(levels, &seen, direction));
    }
    match order {
        0 => {}
        o => {
            seen.sort_by(|a, b| a.cmp_natural(b));
            if o < 0 {
                seen.reverse();
            }
        }
    }
    Ok(seen)
}

fn facet_kind(layers: &[BoundLayer], var: &str) -> VarKind {
    layers
        .iter()
        .find_map(|l| l.data.kind(var))
        .unwrap_or(VarKind::Discrete)
}

/// Rows of `data` whose facet columns match `keys`; missing columns match everything
fn matching_rows(data: &DataFrame, keys: &IndexMap<String, Value>) -> Vec<usize> {
    let columns: Vec<(&Vec<Value>, &Value)> = keys
        .iter()
        .filter_map(|(var, key)| data.column(var).map(|c| (&c.values, key)))
        .collect();
    (0..data.row_count())
        .filter(|&i| columns.iter().all(|(values, key)| values[i] == **key))
        .collect()
}

/// Rows and columns for `n` wrapped panels
fn wrap_dimensions(n: usize, ncol: Option<usize>, nrow: Option<usize>) -> (usize, usize) {
    let n = n.max(1);
    match (ncol, nrow) {
        (Some(cols), Some(rows)) if cols * rows >= n => (rows, cols),
        (Some(cols), _) => (n.div_ceil(cols), cols),
        (None, Some(rows)) => (rows.min(n), n.div_ceil(rows.min(n))),
        (None, None) => {
            let cols = (n as f64).sqrt().ceil() as usize;
            (n.div_ceil(cols), cols)
        }
    }
}

struct PanelKey {
    row: usize,
    col: usize,
    keys: IndexMap<String, Value>,
    labels: Vec<String>,
}

fn grid_keys(
    x: &Option<String>,
    y: &Option<String>,
    orders: (i32, i32),
    formats: (&Option<String>, &Option<String>),
    layers: &[BoundLayer],
    formatter: &dyn ValueFormatter,
) -> Result<(Vec<PanelKey>, usize, usize)> {
    let levels = |var: &Option<String>, order: i32| -> Result<Vec<Option<Value>>> {
        match var {
            Some(v) => Ok(facet_levels(layers, v, order)?.into_iter().map(Some).collect()),
            None => Ok(vec![None]),
        }
    };
    let cols = levels(x, orders.0)?;
    let rows = levels(y, orders.1)?;

    let mut panels = Vec::with_capacity(cols.len() * rows.len());
    for (r, row_value) in rows.iter().enumerate() {
        for (c, col_value) in cols.iter().enumerate() {
            let mut keys = IndexMap::new();
            let mut labels = Vec::new();
            for (var, value, format) in [(x, col_value, formats.0), (y, row_value, formats.1)] {
                if let (Some(var), Some(value)) = (var, value) {
                    labels.push(formatter.format(value, facet_kind(layers, var), format.as_deref()));
                    keys.insert(var.clone(), value.clone());
                }
            }
            panels.push(PanelKey { row: r, col: c, keys, labels });
        }
    }
    Ok((panels, rows.len(), cols.len()))
}

fn wrap_keys(
    facets: &[String],
    orders: &[i32],
    formats: &[Option<String>],
    dims: (Option<usize>, Option<usize>, WrapDirection),
    layers: &[BoundLayer],
    formatter: &dyn ValueFormatter,
) -> Result<(Vec<PanelKey>, usize, usize)> {
    let levels = facets
        .iter()
        .enumerate()
        .map(|(i, var)| facet_levels(layers, var, orders.get(i).copied().unwrap_or(1)))
        .collect::<Result<Vec<_>>>()?;

    // Only combinations present in some layer get a panel
    let mut combos: Vec<Vec<Value>> = Vec::new();
    for layer in layers.iter().filter(|l| facets.iter().all(|f| l.data.has(f))) {
        for (key, _) in layer.data.group_indices(facets) {
            if !key.iter().any(Value::is_null) && !combos.contains(&key) {
                combos.push(key);
            }
        }
    }
    if combos.is_empty() && facets.len() == 1 {
        combos = levels[0].iter().map(|v| vec![v.clone()]).collect();
    }
    let rank = |combo: &Vec<Value>| -> Vec<usize> {
        combo
            .iter()
            .zip(&levels)
            .map(|(v, lv)| lv.iter().position(|l| l == v).unwrap_or(usize::MAX))
            .collect()
    };
    combos.sort_by_key(|c| rank(c));

    let (nrow, ncol, dir) = {
        let (rows, cols) = wrap_dimensions(combos.len(), dims.0, dims.1);
        (rows, cols, dims.2)
    };
    let panels = combos
        .into_iter()
        .enumerate()
        .map(|(i, combo)| {
            let (row, col) = match dir {
                WrapDirection::H => (i / ncol, i % ncol),
                WrapDirection::V => (i % nrow, i / nrow),
            };
            let labels = combo
                .iter()
                .zip(facets)
                .enumerate()
                .map(|(j, (v, var))| {
                    let format = formats.get(j).and_then(|f| f.as_deref());
                    formatter.format(v, facet_kind(layers, var), format)
                })
                .collect();
            let keys = facets.iter().cloned().zip(combo).collect();
            PanelKey { row, col, keys, labels }
        })
        .collect();
    Ok((panels, nrow, ncol))
}

fn panel_domain(
    scale: Option<&Scale>,
    free: bool,
    axis: Aes,
    layers: &[BoundLayer],
    layer_rows: &[Vec<usize>],
) -> Option<Domain> {
    let scale = scale?;
    if !free {
        return Some(scale.domain.clone());
    }
    let mut values: Vec<&Value> = Vec::new();
    for (layer, rows) in layers.iter().zip(layer_rows) {
        for (aes, var) in &layer.bindings {
            if aes.axis() != Some(axis) {
                continue;
            }
            if let Some(col) = layer.data.column(var) {
                values.extend(rows.iter().map(|&i| &col.values[i]));
            }
        }
    }
    Some(scale.restrict(values))
}

/// Lay out facet panels and the rows each layer contributes to them.
///
/// Layers without a facet variable are replicated into every panel along
/// that variable.
pub fn layout(
    facet: Option<&FacetSpec>,
    layers: &[BoundLayer],
    scales: &IndexMap<Aes, Scale>,
    formatter: &dyn ValueFormatter,
) -> Result<PanelGrid> {
    let (kind, (keys, nrow, ncol), facet_scales) = match facet {
        None => (
            FacetKind::None,
            (
                vec![PanelKey {
                    row: 0,
                    col: 0,
                    keys: IndexMap::new(),
                    labels: Vec::new(),
                }],
                1,
                1,
            ),
            FacetScales::Fixed,
        ),
        Some(FacetSpec::Grid {
            x,
            y,
            x_order,
            y_order,
            x_format,
            y_format,
            scales,
        }) => (
            FacetKind::Grid,
            grid_keys(x, y, (*x_order, *y_order), (x_format, y_format), layers, formatter)?,
            *scales,
        ),
        Some(FacetSpec::Wrap {
            facets,
            ncol,
            nrow,
            order,
            format,
            dir,
            scales,
        }) => (
            FacetKind::Wrap,
            wrap_keys(facets, order, format, (*ncol, *nrow, *dir), layers, formatter)?,
            *scales,
        ),
    };

    let panels: Vec<Panel> = keys
        .into_iter()
        .map(|key| {
            let layer_rows: Vec<Vec<usize>> = layers
                .iter()
                .map(|l| matching_rows(&l.data, &key.keys))
                .collect();
            let domain = |aes: Aes, free: bool| {
                panel_domain(scales.get(&aes), free, aes, layers, &layer_rows)
            };
            Panel {
                row: key.row,
                col: key.col,
                x_domain: domain(Aes::X, facet_scales.free_x()),
                y_domain: domain(Aes::Y, facet_scales.free_y()),
                keys: key.keys,
                labels: key.labels,
                layer_rows,
            }
        })
        .collect();

    debug!(kind = ?kind, panels = panels.len(), nrow, ncol, "facet layout");
    Ok(PanelGrid {
        kind,
        nrow,
        ncol,
        scales: facet_scales,
        panels,
    })
}

// =============================================================================
// Coordinates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordModel {
    pub kind: CoordKind,
    pub xlim: Option<(Option<f64>, Option<f64>)>,
    pub ylim: Option<(Option<f64>, Option<f64>)>,
    /// y/x aspect ratio of fixed coordinates
    pub ratio: Option<f64>,
    pub flip: bool,
    pub theta: Option<Aes>,
    /// Polar start offset in radians
    pub start: Option<f64>,
    /// 1 clockwise, -1 anticlockwise
    pub direction: Option<i32>,
    pub projection: Option<String>,
}

fn check_limits(limits: Option<(Option<f64>, Option<f64>)>, path: &str) -> Result<()> {
    if let Some((Some(lo), Some(hi))) = limits {
        if lo >= hi {
            return Err(PlotError::spec(
                path,
                format!("Lower limit {} must be below upper limit {}", lo, hi),
            ));
        }
    }
    Ok(())
}

/// Resolve the coordinate system of one plot.
pub fn resolve_coord(spec: &CoordSpec) -> Result<CoordModel> {
    check_limits(spec.xlim, "coord.xlim")?;
    check_limits(spec.ylim, "coord.ylim")?;

    let mut model = CoordModel {
        kind: spec.kind,
        xlim: spec.xlim,
        ylim: spec.ylim,
        ratio: None,
        flip: spec.flip,
        theta: None,
        start: None,
        direction: None,
        projection: None,
    };
    match spec.kind {
        CoordKind::Cartesian => {}
        CoordKind::Fixed => {
            let ratio = spec.ratio.unwrap_or(1.0);
            if !(ratio.is_finite() && ratio > 0.0) {
                return Err(PlotError::spec("coord.ratio", format!("Ratio must be positive, got {}", ratio)));
            }
            model.ratio = Some(ratio);
        }
        CoordKind::Flip => model.flip = true,
        CoordKind::Polar => {
            let theta = spec.theta.unwrap_or(Aes::X);
            if !matches!(theta, Aes::X | Aes::Y) {
                return Err(PlotError::spec("coord.theta", format!("Theta must be 'x' or 'y', got '{}'", theta)));
            }
            model.theta = Some(theta);
            model.start = Some(spec.start.unwrap_or(0.0));
            model.direction = Some(if spec.direction.unwrap_or(1) < 0 { -1 } else { 1 });
        }
        CoordKind::Map => {
            model.projection = Some(spec.projection.clone().unwrap_or_else(|| "mercator".to_string()));
        }
    }
    debug!(kind = ?model.kind, flip = model.flip, "resolved coordinates");
    Ok(model)
}
