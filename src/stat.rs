use crate::data::{Column, DataFrame, Value, VarSource};
use crate::density;
use crate::error::{PlotError, Result};
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{Distribution, SmoothMethod, Stat};
use indexmap::IndexMap;
use std::collections::HashMap;

pub const X: &str = "..x..";
pub const Y: &str = "..y..";
pub const COUNT: &str = "..count..";
pub const PROP: &str = "..prop..";
pub const N: &str = "..n..";
pub const DENSITY: &str = "..density..";
pub const SCALED: &str = "..scaled..";
pub const YMIN: &str = "..ymin..";
pub const YMAX: &str = "..ymax..";
pub const SE: &str = "..se..";
pub const LEVEL: &str = "..level..";
pub const LOWER: &str = "..lower..";
pub const MIDDLE: &str = "..middle..";
pub const UPPER: &str = "..upper..";
pub const WIDTH: &str = "..width..";
pub const HEIGHT: &str = "..height..";
pub const BINWIDTH: &str = "..binwidth..";
pub const VIOLINWIDTH: &str = "..violinwidth..";
pub const QUANTILE: &str = "..quantile..";
pub const THEORETICAL: &str = "..theoretical..";
pub const SAMPLE: &str = "..sample..";
pub const GROUP: &str = "..group..";

/// Tunables shared by every stat of one resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatContext {
    pub density_points: usize,
    pub smooth_points: usize,
    pub max_bins: usize,
}

impl Default for StatContext {
    fn default() -> Self {
        Self {
            density_points: 512,
            smooth_points: 80,
            max_bins: 10_000,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Aesthetics a stat reads; missing ones are a configuration error
pub fn required_aes(stat: &Stat) -> &'static [Aes] {
    match stat {
        Stat::Identity => &[],
        Stat::Count | Stat::Bin { .. } | Stat::Density(_) | Stat::Ecdf { .. } => &[Aes::X],
        Stat::Count2d
        | Stat::Sum
        | Stat::Bin2d { .. }
        | Stat::Density2d { .. }
        | Stat::Smooth { .. }
        | Stat::Summary { .. } => &[Aes::X, Aes::Y],
        Stat::Contour { .. } => &[Aes::X, Aes::Y, Aes::Z],
        Stat::Boxplot { .. } | Stat::Ydensity(_) => &[Aes::Y],
        Stat::Qq { .. } | Stat::QqLine { .. } => &[Aes::Sample],
    }
}

/// Every variable the stat can emit
pub fn produced_vars(stat: &Stat) -> &'static [&'static str] {
    match stat {
        Stat::Identity => &[],
        Stat::Count => &[X, COUNT, PROP],
        Stat::Count2d => &[X, Y, COUNT, PROP],
        Stat::Sum => &[X, Y, N, PROP],
        Stat::Bin { .. } => &[X, COUNT, DENSITY, BINWIDTH],
        Stat::Bin2d { .. } => &[X, Y, COUNT, DENSITY, WIDTH, HEIGHT],
        Stat::Density(_) => &[X, DENSITY, COUNT, SCALED, QUANTILE],
        Stat::Ydensity(_) => &[X, Y, DENSITY, COUNT, SCALED, N, VIOLINWIDTH, QUANTILE],
        Stat::Density2d { .. } | Stat::Contour { .. } => &[X, Y, LEVEL, GROUP],
        Stat::Smooth { .. } => &[X, Y, YMIN, YMAX, SE],
        Stat::Summary { .. } => &[X, Y, YMIN, YMAX],
        Stat::Ecdf { .. } => &[X, Y],
        Stat::Boxplot { .. } => &[X, Y, LOWER, MIDDLE, UPPER, YMIN, YMAX],
        Stat::Qq { .. } | Stat::QqLine { .. } => &[THEORETICAL, SAMPLE],
    }
}

/// Aesthetics the stat binds to its own variables unless the layer maps them
pub fn default_mapping(stat: &Stat) -> Vec<(Aes, &'static str)> {
    match stat {
        Stat::Identity => vec![],
        Stat::Count => vec![(Aes::X, X), (Aes::Y, COUNT)],
        Stat::Count2d => vec![(Aes::X, X), (Aes::Y, Y), (Aes::Size, COUNT)],
        Stat::Sum => vec![(Aes::X, X), (Aes::Y, Y), (Aes::Size, N)],
        Stat::Bin { .. } => vec![(Aes::X, X), (Aes::Y, COUNT)],
        Stat::Bin2d { .. } => vec![
            (Aes::X, X),
            (Aes::Y, Y),
            (Aes::Fill, COUNT),
            (Aes::Width, WIDTH),
            (Aes::Height, HEIGHT),
        ],
        Stat::Density(params) => {
            let mut mapping = vec![(Aes::X, X), (Aes::Y, DENSITY)];
            if params.quantile_lines {
                mapping.push((Aes::Quantile, QUANTILE));
            }
            mapping
        }
        Stat::Ydensity(params) => {
            let mut mapping = vec![(Aes::X, X), (Aes::Y, Y), (Aes::Violinwidth, VIOLINWIDTH)];
            if params.quantile_lines {
                mapping.push((Aes::Quantile, QUANTILE));
            }
            mapping
        }
        Stat::Density2d { .. } | Stat::Contour { .. } => vec![(Aes::X, X), (Aes::Y, Y), (Aes::Color, LEVEL)],
        Stat::Smooth { .. } | Stat::Summary { .. } => {
            vec![(Aes::X, X), (Aes::Y, Y), (Aes::Ymin, YMIN), (Aes::Ymax, YMAX)]
        }
        Stat::Ecdf { .. } => vec![(Aes::X, X), (Aes::Y, Y)],
        Stat::Boxplot { .. } => vec![
            (Aes::X, X),
            (Aes::Y, Y),
            (Aes::Lower, LOWER),
            (Aes::Middle, MIDDLE),
            (Aes::Upper, UPPER),
            (Aes::Ymin, YMIN),
            (Aes::Ymax, YMAX),
        ],
        Stat::Qq { .. } | Stat::QqLine { .. } => vec![(Aes::X, THEORETICAL), (Aes::Y, SAMPLE)],
    }
}

/// Stats emitting connected paths; their rows are grouped by `..group..`
pub fn produces_paths(stat: &Stat) -> bool {
    matches!(stat, Stat::Density2d { .. } | Stat::Contour { .. })
}

/// Stats that can run along the y axis (`orientation: y`)
pub fn supports_orientation(stat: &Stat) -> bool {
    matches!(
        stat,
        Stat::Count
            | Stat::Bin { .. }
            | Stat::Density(_)
            | Stat::Ydensity(_)
            | Stat::Boxplot { .. }
            | Stat::Smooth { .. }
            | Stat::Summary { .. }
            | Stat::Ecdf { .. }
    )
}

// =============================================================================
// Input view
// =============================================================================

/// Aesthetic view over the rows of one group
pub struct StatInput<'a> {
    data: &'a DataFrame,
    bindings: &'a IndexMap<Aes, String>,
}

impl<'a> StatInput<'a> {
    pub fn new(data: &'a DataFrame, bindings: &'a IndexMap<Aes, String>) -> Self {
        Self { data, bindings }
    }

    pub fn has(&self, aes: Aes) -> bool {
        self.values(aes).is_some()
    }

    pub fn values(&self, aes: Aes) -> Option<&'a [Value]> {
        let var = self.bindings.get(&aes)?;
        self.data.column(var).map(|c| c.values.as_slice())
    }

    pub fn numeric(&self, aes: Aes) -> Option<Vec<Option<f64>>> {
        self.values(aes)
            .map(|values| values.iter().map(|v| v.as_f64().filter(|n| n.is_finite())).collect())
    }

    pub(crate) fn require(&self, aes: Aes, stat: &str) -> Result<&'a [Value]> {
        self.values(aes).ok_or_else(|| {
            PlotError::StatConfig(format!("Stat '{}' requires the '{}' aesthetic", stat, aes))
        })
    }

    pub(crate) fn require_numeric(&self, aes: Aes, stat: &str) -> Result<Vec<Option<f64>>> {
        self.require(aes, stat)?;
        Ok(self.numeric(aes).unwrap_or_default())
    }

    /// Per-row weights: the `weight` aesthetic when bound, 1 otherwise
    pub fn weights(&self) -> Vec<f64> {
        match self.numeric(Aes::Weight) {
            Some(ws) => ws.into_iter().map(|w| w.unwrap_or(0.0)).collect(),
            None => vec![1.0; self.data.row_count()],
        }
    }
}

// =============================================================================
// Output helpers
// =============================================================================

pub(crate) fn nums(values: impl IntoIterator<Item = f64>) -> Vec<Value> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { Value::Num(v) } else { Value::Null })
        .collect()
}

pub(crate) fn stat_frame(columns: Vec<(&str, Vec<Value>)>) -> Result<DataFrame> {
    DataFrame::from_columns(
        columns
            .into_iter()
            .map(|(name, values)| Column::new(name, values).with_source(VarSource::Stat))
            .collect(),
    )
}

pub(crate) fn empty_frame(stat: &Stat) -> Result<DataFrame> {
    stat_frame(produced_vars(stat).iter().map(|name| (*name, Vec::new())).collect())
}

/// Evenly spaced values over `[lo, hi]`; a degenerate range is widened by 0.5 each way
pub(crate) fn step_values(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    if n < 2 {
        return vec![(lo + hi) / 2.0];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

/// Linear-interpolated percentile of sorted data
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted[lower_idx] * (1.0 - weight) + sorted[upper_idx] * weight
    }
}

pub(crate) fn sorted_finite(values: impl IntoIterator<Item = Option<f64>>) -> Vec<f64> {
    let mut out: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Distinct keys in first-seen order; numeric keys are sorted ascending
fn ordered_keys(keys: Vec<Value>) -> Vec<Value> {
    let mut keys = keys;
    if keys.iter().all(|k| matches!(k, Value::Num(_))) {
        keys.sort_by(|a, b| a.cmp_natural(b));
    }
    keys
}

/// Row indices per distinct non-null value of `values`
pub(crate) fn split_by(values: &[Value]) -> Vec<(Value, Vec<usize>)> {
    let mut order: Vec<Value> = Vec::new();
    let mut rows: HashMap<Value, Vec<usize>> = HashMap::new();
    for (i, v) in values.iter().enumerate() {
        if v.is_null() {
            continue;
        }
        rows.entry(v.clone())
            .or_insert_with(|| {
                order.push(v.clone());
                Vec::new()
            })
            .push(i);
    }
    ordered_keys(order)
        .into_iter()
        .map(|k| {
            let idx = rows.remove(&k).unwrap_or_default();
            (k, idx)
        })
        .collect()
}

/// Weighted totals per distinct key tuple, skipping rows with a null key part
fn tally(keys: Vec<Vec<Value>>, weights: &[f64]) -> (Vec<Vec<Value>>, Vec<f64>) {
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut totals: HashMap<Vec<Value>, f64> = HashMap::new();
    for (key, w) in keys.into_iter().zip(weights) {
        if key.iter().any(Value::is_null) {
            continue;
        }
        match totals.get_mut(&key) {
            Some(total) => *total += w,
            None => {
                order.push(key.clone());
                totals.insert(key, *w);
            }
        }
    }
    if order.iter().all(|k| k.iter().all(|v| matches!(v, Value::Num(_)))) {
        order.sort_by(|a, b| {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| x.cmp_natural(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    let counts = order.iter().map(|k| totals.get(k).copied().unwrap_or(0.0)).collect();
    (order, counts)
}

fn proportions(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    counts
        .iter()
        .map(|c| if total > 0.0 { c / total } else { 0.0 })
        .collect()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Run `stat` over the rows of one group
pub fn compute(stat: &Stat, input: &StatInput, ctx: &StatContext) -> Result<DataFrame> {
    for aes in required_aes(stat) {
        input.require(*aes, stat.name())?;
    }
    match stat {
        Stat::Identity => Ok(DataFrame::empty()),
        Stat::Count => count(input),
        Stat::Count2d => count2d(input, COUNT),
        Stat::Sum => count2d(input, N),
        Stat::Bin {
            bins,
            binwidth,
            center,
            boundary,
        } => bin(input, *bins, *binwidth, *center, *boundary, ctx),
        Stat::Bin2d { bins, binwidth } => bin2d(input, *bins, *binwidth, ctx),
        Stat::Density(params) => density::density(input, params, ctx),
        Stat::Ydensity(params) => density::ydensity(input, params, ctx),
        Stat::Density2d {
            bins,
            binwidth,
            n,
            adjust,
        } => density::density2d(input, *bins, *binwidth, *n, *adjust, ctx),
        Stat::Contour { bins, binwidth } => density::contour(input, *bins, *binwidth, ctx),
        Stat::Smooth {
            method,
            se,
            level,
            n,
            span,
        } => smooth(input, *method, *se, *level, n.unwrap_or(ctx.smooth_points), *span),
        Stat::Summary { fun, fun_min, fun_max } => summary(input, fun, fun_min, fun_max),
        Stat::Ecdf { n, pad } => ecdf(input, *n, *pad),
        Stat::Boxplot { coef } => boxplot(input, *coef),
        Stat::Qq { distribution } => qq(input, *distribution),
        Stat::QqLine { distribution } => qq_line(input, *distribution),
    }
}

// =============================================================================
// Counting
// =============================================================================

fn count(input: &StatInput) -> Result<DataFrame> {
    let xs = input.require(Aes::X, "count")?;
    let keys = xs.iter().map(|x| vec![x.clone()]).collect();
    let (keys, counts) = tally(keys, &input.weights());
    let prop = proportions(&counts);
    stat_frame(vec![
        (X, keys.into_iter().flat_map(|k| k.into_iter().take(1)).collect()),
        (COUNT, nums(counts)),
        (PROP, nums(prop)),
    ])
}

/// Occurrences of each (x, y) pair; `count2d` calls the total `..count..`, `sum` calls it `..n..`
fn count2d(input: &StatInput, total_var: &str) -> Result<DataFrame> {
    let xs = input.require(Aes::X, "count2d")?;
    let ys = input.require(Aes::Y, "count2d")?;
    let keys = xs.iter().zip(ys).map(|(x, y)| vec![x.clone(), y.clone()]).collect();
    let (keys, counts) = tally(keys, &input.weights());
    let prop = proportions(&counts);
    let (kx, ky): (Vec<Value>, Vec<Value>) = keys
        .into_iter()
        .map(|k| (k[0].clone(), k[1].clone()))
        .unzip();
    stat_frame(vec![(X, kx), (Y, ky), (total_var, nums(counts)), (PROP, nums(prop))])
}

// =============================================================================
// Binning
// =============================================================================

/// Regular bins covering a data range
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BinLayout {
    pub start: f64,
    pub width: f64,
    pub count: usize,
}

impl BinLayout {
    /// Without an explicit width, `bins` bins are laid out with the first
    /// centered on the minimum and the last on the maximum.
    pub fn new(
        range: (f64, f64),
        bins: usize,
        binwidth: Option<f64>,
        center: Option<f64>,
        boundary: Option<f64>,
        max_bins: usize,
    ) -> Result<Self> {
        let (lo, hi) = range;
        let span = hi - lo;
        let bins = bins.max(1);
        let width = match binwidth.filter(|w| *w > 0.0) {
            Some(w) => w,
            None if span <= 0.0 => 1.0,
            None if bins == 1 => span,
            None => span / (bins - 1) as f64,
        };
        let edge = match (boundary, center) {
            (Some(b), _) => b,
            (None, Some(c)) => c - width / 2.0,
            (None, None) if bins == 1 && binwidth.is_none() => lo,
            (None, None) => lo - width / 2.0,
        };
        let start = edge + ((lo - edge) / width).floor() * width;
        let mut count = ((hi - start) / width).floor() as usize + 1;
        if binwidth.is_none() {
            count = count.min(bins);
        }
        if count > max_bins {
            return Err(PlotError::StatConfig(format!(
                "Too many bins: {} (the limit is {}); increase 'binwidth' or decrease 'bins'",
                count, max_bins
            )));
        }
        Ok(Self { start, width, count })
    }

    pub fn index(&self, v: f64) -> usize {
        let idx = ((v - self.start) / self.width).floor();
        if idx < 0.0 {
            0
        } else {
            (idx as usize).min(self.count.saturating_sub(1))
        }
    }

    pub fn center(&self, i: usize) -> f64 {
        self.start + (i as f64 + 0.5) * self.width
    }
}

pub(crate) fn finite_range(values: &[Option<f64>]) -> Option<(f64, f64)> {
    values.iter().flatten().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn bin(
    input: &StatInput,
    bins: usize,
    binwidth: Option<f64>,
    center: Option<f64>,
    boundary: Option<f64>,
    ctx: &StatContext,
) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "bin")?;
    let Some(range) = finite_range(&xs) else {
        return empty_frame(&Stat::Bin { bins, binwidth, center, boundary });
    };
    let layout = BinLayout::new(range, bins, binwidth, center, boundary, ctx.max_bins)?;
    let weights = input.weights();

    let mut counts = vec![0.0; layout.count];
    for (x, w) in xs.iter().zip(&weights) {
        if let Some(x) = x {
            counts[layout.index(*x)] += w;
        }
    }
    let total: f64 = counts.iter().sum();
    let density = counts.iter().map(|c| if total > 0.0 { c / (total * layout.width) } else { 0.0 });

    stat_frame(vec![
        (X, nums((0..layout.count).map(|i| layout.center(i)))),
        (COUNT, nums(counts.iter().copied())),
        (DENSITY, nums(density)),
        (BINWIDTH, nums(std::iter::repeat(layout.width).take(layout.count))),
    ])
}

fn bin2d(
    input: &StatInput,
    bins: (usize, usize),
    binwidth: (Option<f64>, Option<f64>),
    ctx: &StatContext,
) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "bin2d")?;
    let ys = input.require_numeric(Aes::Y, "bin2d")?;
    let (Some(rx), Some(ry)) = (finite_range(&xs), finite_range(&ys)) else {
        return empty_frame(&Stat::Bin2d { bins, binwidth });
    };
    let lx = BinLayout::new(rx, bins.0, binwidth.0, None, None, ctx.max_bins)?;
    let ly = BinLayout::new(ry, bins.1, binwidth.1, None, None, ctx.max_bins)?;
    let weights = input.weights();

    let mut counts = vec![0.0; lx.count * ly.count];
    for ((x, y), w) in xs.iter().zip(&ys).zip(&weights) {
        if let (Some(x), Some(y)) = (x, y) {
            counts[ly.index(*y) * lx.count + lx.index(*x)] += w;
        }
    }
    let total: f64 = counts.iter().sum();
    let area = lx.width * ly.width;

    let (mut ox, mut oy, mut oc, mut od) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (i, c) in counts.iter().enumerate() {
        if *c <= 0.0 {
            continue;
        }
        ox.push(lx.center(i % lx.count));
        oy.push(ly.center(i / lx.count));
        oc.push(*c);
        od.push(c / (total * area));
    }
    let rows = ox.len();
    stat_frame(vec![
        (X, nums(ox)),
        (Y, nums(oy)),
        (COUNT, nums(oc)),
        (DENSITY, nums(od)),
        (WIDTH, nums(std::iter::repeat(lx.width).take(rows))),
        (HEIGHT, nums(std::iter::repeat(ly.width).take(rows))),
    ])
}

// =============================================================================
// Smoothing
// =============================================================================

fn points(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect()
}

/// Fitted value and its standard error at each grid point
fn linear_fit(pts: &[(f64, f64)], grid: &[f64]) -> Vec<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = pts.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = pts.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let rss: f64 = pts.iter().map(|p| (p.1 - intercept - slope * p.0).powi(2)).sum();
    let sigma2 = if pts.len() > 2 { rss / (n - 2.0) } else { f64::NAN };

    grid.iter()
        .map(|&x| {
            let se = (sigma2 * (1.0 / n + (x - mean_x).powi(2) / sxx)).sqrt();
            (intercept + slope * x, se)
        })
        .collect()
}

/// Local-linear smoother weights at `x0` with a tricube kernel over the
/// nearest `span` fraction of points
fn loess_weights(pts: &[(f64, f64)], x0: f64, span: f64) -> Vec<f64> {
    let n = pts.len();
    let k = ((span * n as f64).ceil() as usize).clamp(2.min(n), n);
    let mut dist: Vec<f64> = pts.iter().map(|p| (p.0 - x0).abs()).collect();
    dist.sort_by(|a, b| a.total_cmp(b));
    let mut h = dist[k - 1];
    if h <= 0.0 {
        h = dist[n - 1].max(f64::MIN_POSITIVE);
    }

    let w: Vec<f64> = pts
        .iter()
        .map(|p| {
            let u = (p.0 - x0).abs() / h;
            if u < 1.0 {
                (1.0 - u.powi(3)).powi(3)
            } else {
                0.0
            }
        })
        .collect();
    let sw: f64 = w.iter().sum();
    let sx: f64 = w.iter().zip(pts).map(|(w, p)| w * (p.0 - x0)).sum();
    let sxx: f64 = w.iter().zip(pts).map(|(w, p)| w * (p.0 - x0).powi(2)).sum();
    let denom = sw * sxx - sx * sx;

    if sw <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    if denom.abs() <= f64::EPSILON * sw * sxx.max(1.0) {
        return w.iter().map(|w| w / sw).collect();
    }
    w.iter()
        .zip(pts)
        .map(|(w, p)| w * (sxx - sx * (p.0 - x0)) / denom)
        .collect()
}

fn loess_fit(pts: &[(f64, f64)], grid: &[f64], span: f64) -> Vec<(f64, f64)> {
    let fitted = |x0: f64| -> (f64, Vec<f64>) {
        let l = loess_weights(pts, x0, span);
        let y = l.iter().zip(pts).map(|(l, p)| l * p.1).sum();
        (y, l)
    };
    let rss: f64 = pts.iter().map(|p| (p.1 - fitted(p.0).0).powi(2)).sum();
    let sigma = if pts.len() > 2 {
        (rss / (pts.len() - 2) as f64).sqrt()
    } else {
        f64::NAN
    };
    grid.iter()
        .map(|&x| {
            let (y, l) = fitted(x);
            (y, sigma * l.iter().map(|v| v * v).sum::<f64>().sqrt())
        })
        .collect()
}

fn smooth(
    input: &StatInput,
    method: SmoothMethod,
    se: bool,
    level: f64,
    n: usize,
    span: f64,
) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "smooth")?;
    let ys = input.require_numeric(Aes::Y, "smooth")?;
    let pts = points(&xs, &ys);
    let empty = || {
        empty_frame(&Stat::Smooth {
            method,
            se,
            level,
            n: Some(n),
            span,
        })
    };
    let lo = pts.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let hi = pts.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if pts.len() < 2 || lo >= hi {
        return empty();
    }

    let grid = step_values(lo, hi, n.max(2));
    let fits = match method {
        SmoothMethod::Lm => linear_fit(&pts, &grid),
        SmoothMethod::Loess => loess_fit(&pts, &grid, span),
    };
    let t = if pts.len() > 2 {
        t_quantile((1.0 + level) / 2.0, (pts.len() - 2) as f64)
    } else {
        f64::NAN
    };

    let band = |sign: f64| -> Vec<Value> {
        if se {
            nums(fits.iter().map(|(y, s)| y + sign * t * s))
        } else {
            vec![Value::Null; fits.len()]
        }
    };
    stat_frame(vec![
        (X, nums(grid.iter().copied())),
        (Y, nums(fits.iter().map(|f| f.0))),
        (YMIN, band(-1.0)),
        (YMAX, band(1.0)),
        (
            SE,
            if se {
                nums(fits.iter().map(|f| f.1))
            } else {
                vec![Value::Null; fits.len()]
            },
        ),
    ])
}

// =============================================================================
// Summaries
// =============================================================================

/// Apply a named reducer to sorted values
pub fn reduce(name: &str, sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    if sorted.is_empty() {
        return if name == "count" || name == "sum" { 0.0 } else { f64::NAN };
    }
    let mean = sorted.iter().sum::<f64>() / n;
    let var = if sorted.len() > 1 {
        sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        f64::NAN
    };
    match name {
        "count" => n,
        "sum" => sorted.iter().sum(),
        "mean" => mean,
        "median" | "mq" => percentile(sorted, 0.5),
        "min" => sorted[0],
        "max" => sorted[sorted.len() - 1],
        "lq" => percentile(sorted, 0.25),
        "uq" => percentile(sorted, 0.75),
        "sd" => var.sqrt(),
        "se" => var.sqrt() / n.sqrt(),
        "var" => var,
        _ => f64::NAN,
    }
}

fn summary(input: &StatInput, fun: &str, fun_min: &str, fun_max: &str) -> Result<DataFrame> {
    let xs = input.require(Aes::X, "summary")?;
    let ys = input.require_numeric(Aes::Y, "summary")?;

    let (mut ox, mut oy, mut omin, mut omax) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (x, rows) in split_by(xs) {
        let values = sorted_finite(rows.iter().map(|&i| ys[i]));
        ox.push(x);
        oy.push(reduce(fun, &values));
        omin.push(reduce(fun_min, &values));
        omax.push(reduce(fun_max, &values));
    }
    stat_frame(vec![(X, ox), (Y, nums(oy)), (YMIN, nums(omin)), (YMAX, nums(omax))])
}

fn ecdf(input: &StatInput, n: Option<usize>, pad: bool) -> Result<DataFrame> {
    let xs = sorted_finite(input.require_numeric(Aes::X, "ecdf")?);
    if xs.is_empty() {
        return empty_frame(&Stat::Ecdf { n, pad });
    }
    let total = xs.len() as f64;
    let (lo, hi) = (xs[0], xs[xs.len() - 1]);

    let mut at: Vec<f64> = match n {
        Some(n) => step_values(lo, hi, n),
        None => {
            let mut distinct = xs.clone();
            distinct.dedup();
            distinct
        }
    };
    let mut ys: Vec<f64> = at
        .iter()
        .map(|x| xs.partition_point(|v| v <= x) as f64 / total)
        .collect();
    if pad {
        at.insert(0, lo);
        ys.insert(0, 0.0);
    }
    stat_frame(vec![(X, nums(at)), (Y, nums(ys))])
}

fn boxplot(input: &StatInput, coef: f64) -> Result<DataFrame> {
    let ys = input.require_numeric(Aes::Y, "boxplot")?;
    let groups = match input.values(Aes::X) {
        Some(xs) => split_by(xs),
        None => vec![(Value::Num(0.0), (0..ys.len()).collect())],
    };

    let mut cols: [Vec<Value>; 7] = Default::default();
    for (x, rows) in groups {
        let values = sorted_finite(rows.iter().map(|&i| ys[i]));
        if values.is_empty() {
            continue;
        }
        let lower = percentile(&values, 0.25);
        let middle = percentile(&values, 0.5);
        let upper = percentile(&values, 0.75);
        let iqr = upper - lower;
        let (lower_fence, upper_fence) = (lower - coef * iqr, upper + coef * iqr);

        let ymin = values.iter().copied().find(|v| *v >= lower_fence).unwrap_or(lower);
        let ymax = values.iter().rev().copied().find(|v| *v <= upper_fence).unwrap_or(upper);

        let box_row = [
            x.clone(),
            Value::Null,
            Value::Num(lower),
            Value::Num(middle),
            Value::Num(upper),
            Value::Num(ymin),
            Value::Num(ymax),
        ];
        for (col, v) in cols.iter_mut().zip(box_row) {
            col.push(v);
        }
        for outlier in values.iter().filter(|v| **v < lower_fence || **v > upper_fence) {
            cols[0].push(x.clone());
            cols[1].push(Value::Num(*outlier));
            for col in cols.iter_mut().skip(2) {
                col.push(Value::Null);
            }
        }
    }
    let [cx, cy, cl, cm, cu, cmin, cmax] = cols;
    stat_frame(vec![
        (X, cx),
        (Y, cy),
        (LOWER, cl),
        (MIDDLE, cm),
        (UPPER, cu),
        (YMIN, cmin),
        (YMAX, cmax),
    ])
}

// =============================================================================
// Quantile-quantile
// =============================================================================

/// Plotting positions `(i - a) / (n + 1 - 2a)`
fn plotting_positions(n: usize) -> Vec<f64> {
    let a = if n <= 10 { 3.0 / 8.0 } else { 0.5 };
    (1..=n)
        .map(|i| (i as f64 - a) / (n as f64 + 1.0 - 2.0 * a))
        .collect()
}

pub fn distribution_quantile(distribution: Distribution, p: f64) -> f64 {
    match distribution {
        Distribution::Normal => normal_quantile(p),
        Distribution::Uniform => p,
        Distribution::Exponential => -(1.0 - p).ln(),
    }
}

fn qq(input: &StatInput, distribution: Distribution) -> Result<DataFrame> {
    let sample = sorted_finite(input.require_numeric(Aes::Sample, "qq")?);
    let theoretical = plotting_positions(sample.len())
        .into_iter()
        .map(|p| distribution_quantile(distribution, p));
    stat_frame(vec![(THEORETICAL, nums(theoretical)), (SAMPLE, nums(sample))])
}

/// Line through the first and third quartiles, drawn over the theoretical range
fn qq_line(input: &StatInput, distribution: Distribution) -> Result<DataFrame> {
    let sample = sorted_finite(input.require_numeric(Aes::Sample, "qq_line")?);
    if sample.len() < 2 {
        return empty_frame(&Stat::QqLine { distribution });
    }
    let (s1, s3) = (percentile(&sample, 0.25), percentile(&sample, 0.75));
    let (t1, t3) = (
        distribution_quantile(distribution, 0.25),
        distribution_quantile(distribution, 0.75),
    );
    let slope = (s3 - s1) / (t3 - t1);
    let intercept = s1 - slope * t1;

    let positions = plotting_positions(sample.len());
    let ends = [positions[0], positions[positions.len() - 1]].map(|p| distribution_quantile(distribution, p));
    stat_frame(vec![
        (THEORETICAL, nums(ends)),
        (SAMPLE, nums(ends.map(|t| intercept + slope * t))),
    ])
}

// =============================================================================
// Distribution quantiles
// =============================================================================

/// Inverse of the standard normal CDF (Acklam's rational approximation)
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Quantile of Student's t distribution: exact for 1 and 2 degrees of
/// freedom, Cornish-Fisher expansion otherwise.
pub fn t_quantile(p: f64, df: f64) -> f64 {
    if df <= 0.0 || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if df == 1.0 {
        return (std::f64::consts::PI * (p - 0.5)).tan();
    }
    if df == 2.0 {
        return (2.0 * p - 1.0) / (2.0 * p * (1.0 - p)).sqrt();
    }
    let z = normal_quantile(p);
    let (z3, z5, z7, z9) = (z.powi(3), z.powi(5), z.powi(7), z.powi(9));
    z + (z3 + z) / (4.0 * df)
        + (5.0 * z5 + 16.0 * z3 + 3.0 * z) / (96.0 * df.powi(2))
        + (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / (384.0 * df.powi(3))
        + (79.0 * z9 + 776.0 * z7 + 1482.0 * z5 - 1920.0 * z3 - 945.0 * z) / (92160.0 * df.powi(4))
}
