use crate::data::{DataFrame, Value};
use crate::error::Result;
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{Bandwidth, DensityParams, Kernel, Stat};
use crate::stat::{
    self, nums, percentile, sorted_finite, split_by, stat_frame, step_values, StatContext, StatInput,
};
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

const SQRT_2PI: f64 = 2.5066282746310002;

// =============================================================================
// Kernels and bandwidth
// =============================================================================

pub fn kernel_value(kernel: Kernel, u: f64) -> f64 {
    let inside = u.abs() <= 1.0;
    match kernel {
        Kernel::Gaussian => (-0.5 * u * u).exp() / SQRT_2PI,
        Kernel::Rectangular if inside => 0.5,
        Kernel::Triangular if inside => 1.0 - u.abs(),
        Kernel::Biweight if inside => 15.0 / 16.0 * (1.0 - u * u).powi(2),
        Kernel::Epanechikov if inside => 0.75 * (1.0 - u * u),
        Kernel::Optcosine if inside => PI / 4.0 * (PI * u / 2.0).cos(),
        Kernel::Cosine if inside => (1.0 + (PI * u).cos()) / 2.0,
        _ => 0.0,
    }
}

/// Bandwidth for sorted data
pub fn bandwidth(rule: &Bandwidth, sorted: &[f64]) -> f64 {
    match rule {
        Bandwidth::Fixed(bw) => *bw,
        Bandwidth::Nrd0 => rule_of_thumb(sorted, 0.9),
        Bandwidth::Nrd => rule_of_thumb(sorted, 1.06),
    }
}

/// `factor * min(sd, IQR / 1.34) * n^(-1/5)`
fn rule_of_thumb(sorted: &[f64], factor: f64) -> f64 {
    let n = sorted.len() as f64;
    if sorted.len() < 2 {
        return 1.0;
    }

    let mean = sorted.iter().sum::<f64>() / n;
    let sd = (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    let iqr = percentile(sorted, 0.75) - percentile(sorted, 0.25);

    let scale = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    if scale <= 0.0 {
        return 1.0;
    }
    factor * scale * n.powf(-0.2)
}

// =============================================================================
// One-dimensional estimate
// =============================================================================

/// Density curve over an evenly spaced grid
struct Curve {
    x: Vec<f64>,
    count: Vec<f64>,
    density: Vec<f64>,
    scaled: Vec<f64>,
    quantile: Vec<f64>,
}

impl Curve {
    /// `sample` holds (value, weight) pairs
    fn estimate(sample: &[(f64, f64)], params: &DensityParams, points: usize) -> Curve {
        let sorted = sorted_finite(sample.iter().map(|s| Some(s.0)));
        let (lo, hi) = (sorted[0], sorted[sorted.len() - 1]);
        let bw = bandwidth(&params.bw, &sorted);
        let h = bw * params.adjust;

        let x = if params.trim {
            step_values(lo, hi, points)
        } else {
            step_values(lo - 3.0 * bw, hi + 3.0 * bw, points)
        };
        let total: f64 = sample.iter().map(|s| s.1).sum();

        let count: Vec<f64> = x
            .iter()
            .map(|&at| {
                sample
                    .iter()
                    .map(|(v, w)| kernel_value(params.kernel, (at - v) / h) * w)
                    .sum::<f64>()
                    / h
            })
            .collect();
        let max = count.iter().copied().fold(0.0, f64::max);
        let density: Vec<f64> = count
            .iter()
            .map(|c| if total > 0.0 { c / total } else { 0.0 })
            .collect();
        let scaled = count.iter().map(|c| if max > 0.0 { c / max } else { 0.0 }).collect();
        let quantile = quantile_marks(&x, &density, &params.quantiles);

        Curve { x, count, density, scaled, quantile }
    }

    /// Row order for output. With quantile lines the row where the quantile
    /// changes is repeated so adjacent segments share an endpoint.
    fn rows(&self, quantile_lines: bool) -> Vec<(usize, f64)> {
        let mut rows = Vec::with_capacity(self.x.len());
        for (i, q) in self.quantile.iter().enumerate() {
            if quantile_lines && i > 0 && self.quantile[i - 1] != *q {
                rows.push((i, self.quantile[i - 1]));
            }
            rows.push((i, *q));
        }
        rows
    }
}

/// Upper quantile bound of the segment each grid point falls into; points
/// past the last quantile get 1.
fn quantile_marks(x: &[f64], density: &[f64], quantiles: &[f64]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(x.len());
    let mut acc = 0.0;
    for i in 0..x.len() {
        if i > 0 {
            acc += (density[i] + density[i - 1]) / 2.0 * (x[i] - x[i - 1]);
        }
        cumulative.push(acc);
    }
    let total = acc;

    let mut sorted: Vec<f64> = quantiles.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    cumulative
        .iter()
        .map(|c| {
            let f = if total > 0.0 { c / total } else { 0.0 };
            sorted.iter().copied().find(|q| f < *q).unwrap_or(1.0)
        })
        .collect()
}

fn weighted_sample(values: &[Option<f64>], weights: &[f64], rows: &[usize]) -> Vec<(f64, f64)> {
    rows.iter()
        .filter_map(|&i| values[i].map(|v| (v, weights[i])))
        .collect()
}

pub fn density(input: &StatInput, params: &DensityParams, ctx: &StatContext) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "density")?;
    let weights = input.weights();
    let all: Vec<usize> = (0..xs.len()).collect();
    let sample = weighted_sample(&xs, &weights, &all);
    if sample.is_empty() {
        return stat::empty_frame(&Stat::Density(params.clone()));
    }

    let curve = Curve::estimate(&sample, params, params.n.unwrap_or(ctx.density_points));
    let rows = curve.rows(params.quantile_lines);
    let pick = |values: &[f64]| nums(rows.iter().map(|(i, _)| values[*i]));
    stat_frame(vec![
        (stat::X, pick(&curve.x)),
        (stat::DENSITY, pick(&curve.density)),
        (stat::COUNT, pick(&curve.count)),
        (stat::SCALED, pick(&curve.scaled)),
        (stat::QUANTILE, nums(rows.iter().map(|(_, q)| *q))),
    ])
}

/// Violin densities of `y` per `x` category. `..violinwidth..` is the
/// density relative to the widest violin.
pub fn ydensity(input: &StatInput, params: &DensityParams, ctx: &StatContext) -> Result<DataFrame> {
    let ys = input.require_numeric(Aes::Y, "ydensity")?;
    let weights = input.weights();
    let groups = match input.values(Aes::X) {
        Some(xs) => split_by(xs),
        None => vec![(Value::Num(0.0), (0..ys.len()).collect())],
    };
    let points = params.n.unwrap_or(ctx.density_points);

    let mut curves: Vec<(Value, usize, Curve)> = Vec::new();
    for (x, rows) in groups {
        let sample = weighted_sample(&ys, &weights, &rows);
        if sample.is_empty() {
            continue;
        }
        curves.push((x, sample.len(), Curve::estimate(&sample, params, points)));
    }
    let widest = curves
        .iter()
        .flat_map(|(_, _, c)| c.density.iter().copied())
        .fold(0.0, f64::max);

    let mut cols: [Vec<Value>; 8] = Default::default();
    for (x, n, curve) in &curves {
        for (i, q) in curve.rows(params.quantile_lines) {
            let width = if widest > 0.0 { curve.density[i] / widest } else { 0.0 };
            let row = [
                x.clone(),
                Value::Num(curve.x[i]),
                Value::Num(curve.density[i]),
                Value::Num(curve.count[i]),
                Value::Num(curve.scaled[i]),
                Value::Num(*n as f64),
                Value::Num(width),
                Value::Num(q),
            ];
            for (col, v) in cols.iter_mut().zip(row) {
                col.push(v);
            }
        }
    }
    let [cx, cy, cd, cc, cs, cn, cw, cq] = cols;
    stat_frame(vec![
        (stat::X, cx),
        (stat::Y, cy),
        (stat::DENSITY, cd),
        (stat::COUNT, cc),
        (stat::SCALED, cs),
        (stat::N, cn),
        (stat::VIOLINWIDTH, cw),
        (stat::QUANTILE, cq),
    ])
}

// =============================================================================
// Two-dimensional estimate and contours
// =============================================================================

pub fn density2d(
    input: &StatInput,
    bins: usize,
    binwidth: Option<f64>,
    n: usize,
    adjust: f64,
    _ctx: &StatContext,
) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "density2d")?;
    let ys = input.require_numeric(Aes::Y, "density2d")?;
    let pts: Vec<(f64, f64)> = xs
        .iter()
        .zip(&ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    let empty = || {
        stat::empty_frame(&Stat::Density2d {
            bins,
            binwidth,
            n,
            adjust,
        })
    };
    if pts.len() < 2 {
        return empty();
    }

    let sx = sorted_finite(pts.iter().map(|p| Some(p.0)));
    let sy = sorted_finite(pts.iter().map(|p| Some(p.1)));
    let hx = rule_of_thumb(&sx, 1.06) * adjust;
    let hy = rule_of_thumb(&sy, 1.06) * adjust;
    let gx = step_values(sx[0], sx[sx.len() - 1], n.max(2));
    let gy = step_values(sy[0], sy[sy.len() - 1], n.max(2));

    let norm = pts.len() as f64 * hx * hy;
    let mut z = Vec::with_capacity(gx.len() * gy.len());
    for &y in &gy {
        for &x in &gx {
            let sum: f64 = pts
                .iter()
                .map(|(px, py)| {
                    kernel_value(Kernel::Gaussian, (x - px) / hx) * kernel_value(Kernel::Gaussian, (y - py) / hy)
                })
                .sum();
            z.push(sum / norm);
        }
    }
    contour_frame(&Grid { xs: gx, ys: gy, z }, bins, binwidth)
}

/// Contours of `z` sampled on a rectangular grid of `x` and `y` values.
/// Grid points without a finite `z` leave holes in the contours.
pub fn contour(
    input: &StatInput,
    bins: usize,
    binwidth: Option<f64>,
    _ctx: &StatContext,
) -> Result<DataFrame> {
    let xs = input.require_numeric(Aes::X, "contour")?;
    let ys = input.require_numeric(Aes::Y, "contour")?;
    let zs = input.require_numeric(Aes::Z, "contour")?;

    let mut cells: HashMap<(u64, u64), f64> = HashMap::new();
    for ((x, y), z) in xs.iter().zip(&ys).zip(&zs) {
        if let (Some(x), Some(y), Some(z)) = (x, y, z) {
            cells.insert((x.to_bits(), y.to_bits()), *z);
        }
    }
    let mut gx = sorted_finite(cells.keys().map(|k| Some(f64::from_bits(k.0))));
    let mut gy = sorted_finite(cells.keys().map(|k| Some(f64::from_bits(k.1))));
    gx.dedup();
    gy.dedup();
    if gx.len() < 2 || gy.len() < 2 {
        return stat::empty_frame(&Stat::Contour { bins, binwidth });
    }

    let mut z = Vec::with_capacity(gx.len() * gy.len());
    for y in &gy {
        for x in &gx {
            z.push(cells.get(&(x.to_bits(), y.to_bits())).copied().unwrap_or(f64::NAN));
        }
    }
    contour_frame(&Grid { xs: gx, ys: gy, z }, bins, binwidth)
}

/// Levels at bin centers across the `z` range
pub fn contour_levels(range: (f64, f64), bins: usize, binwidth: Option<f64>) -> Vec<f64> {
    let (lo, hi) = range;
    let span = hi - lo;
    if !(span > 0.0) {
        return Vec::new();
    }
    let (width, count) = match binwidth.filter(|w| *w > 0.0) {
        Some(w) => (w, (span / w).ceil() as usize),
        None => (span / bins.max(1) as f64, bins.max(1)),
    };
    (0..count).map(|i| lo + width * i as f64 + width / 2.0).collect()
}

fn contour_frame(grid: &Grid, bins: usize, binwidth: Option<f64>) -> Result<DataFrame> {
    let range = grid
        .z
        .iter()
        .filter(|z| z.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &z| match acc {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        });

    let (mut ox, mut oy, mut olevel, mut ogroup) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let mut path_id = 0usize;
    if let Some(range) = range {
        for level in contour_levels(range, bins, binwidth) {
            for path in grid.isolines(level) {
                for (x, y) in path {
                    ox.push(x);
                    oy.push(y);
                    olevel.push(level);
                    ogroup.push(path_id as f64);
                }
                path_id += 1;
            }
        }
    }
    stat_frame(vec![
        (stat::X, nums(ox)),
        (stat::Y, nums(oy)),
        (stat::LEVEL, nums(olevel)),
        (stat::GROUP, nums(ogroup)),
    ])
}

/// Grid node in doubled coordinates; odd (col, row) pairs are cell centers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Vertex {
    col: usize,
    row: usize,
}

type Edge = (Vertex, Vertex);

fn edge(a: Vertex, b: Vertex) -> Edge {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// `z` values in row-major order, one row per `ys` entry
struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    z: Vec<f64>,
}

impl Grid {
    fn corner(&self, col: usize, row: usize) -> f64 {
        self.z[row * self.xs.len() + col]
    }

    fn value(&self, v: Vertex) -> f64 {
        if v.col % 2 == 0 {
            return self.corner(v.col / 2, v.row / 2);
        }
        let (c, r) = (v.col / 2, v.row / 2);
        let corners = [
            self.corner(c, r),
            self.corner(c + 1, r),
            self.corner(c + 1, r + 1),
            self.corner(c, r + 1),
        ];
        center_value(&corners)
    }

    fn position(&self, v: Vertex) -> (f64, f64) {
        let along = |axis: &[f64], doubled: usize| {
            if doubled % 2 == 0 {
                axis[doubled / 2]
            } else {
                (axis[doubled / 2] + axis[doubled / 2 + 1]) / 2.0
            }
        };
        (along(&self.xs, v.col), along(&self.ys, v.row))
    }

    fn crossing(&self, e: Edge, level: f64) -> (f64, f64) {
        let (za, zb) = (self.value(e.0), self.value(e.1));
        let (pa, pb) = (self.position(e.0), self.position(e.1));
        let t = if zb == za { 0.5 } else { (level - za) / (zb - za) };
        (pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1))
    }

    /// Each cell is split into four triangles around its center; segments
    /// keep the higher side on the right, so they chain end to start.
    fn isolines(&self, level: f64) -> Vec<Vec<(f64, f64)>> {
        let mut segments: Vec<(Edge, Edge)> = Vec::new();
        for r in 0..self.ys.len().saturating_sub(1) {
            for c in 0..self.xs.len().saturating_sub(1) {
                let corners = [
                    self.corner(c, r),
                    self.corner(c + 1, r),
                    self.corner(c + 1, r + 1),
                    self.corner(c, r + 1),
                ];
                if corners.iter().any(|z| !z.is_finite()) {
                    continue;
                }
                let min = corners.iter().copied().fold(f64::INFINITY, f64::min);
                let max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if min == max || !(level > min && level <= max) {
                    continue;
                }

                let ring = [
                    Vertex { col: 2 * c, row: 2 * r },
                    Vertex { col: 2 * c + 2, row: 2 * r },
                    Vertex { col: 2 * c + 2, row: 2 * r + 2 },
                    Vertex { col: 2 * c, row: 2 * r + 2 },
                ];
                let center = Vertex { col: 2 * c + 1, row: 2 * r + 1 };
                let zc = center_value(&corners);
                for k in 0..4 {
                    let tri = [ring[k], ring[(k + 1) % 4], center];
                    let zs = [corners[k], corners[(k + 1) % 4], zc];
                    if let Some(seg) = triangle_segment(tri, zs, level) {
                        segments.push(seg);
                    }
                }
            }
        }

        join_segments(&segments)
            .into_iter()
            .map(|edges| {
                let mut path: Vec<(f64, f64)> = edges.into_iter().map(|e| self.crossing(e, level)).collect();
                path.dedup();
                path
            })
            .filter(|path| path.len() > 1)
            .collect()
    }
}

fn center_value(corners: &[f64; 4]) -> f64 {
    let sum: f64 = corners.iter().sum();
    let min = corners.iter().copied().fold(f64::INFINITY, f64::min);
    let max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (sum - min - max) / 2.0
}

/// Directed crossing of a counter-clockwise triangle
fn triangle_segment(v: [Vertex; 3], z: [f64; 3], level: f64) -> Option<(Edge, Edge)> {
    let above = |i: usize| z[i] >= level;
    match (above(0), above(1), above(2)) {
        (true, false, false) => Some((edge(v[2], v[0]), edge(v[0], v[1]))),
        (false, true, false) => Some((edge(v[0], v[1]), edge(v[1], v[2]))),
        (false, false, true) => Some((edge(v[1], v[2]), edge(v[2], v[0]))),
        (true, true, false) => Some((edge(v[0], v[2]), edge(v[2], v[1]))),
        (true, false, true) => Some((edge(v[2], v[1]), edge(v[1], v[0]))),
        (false, true, true) => Some((edge(v[1], v[0]), edge(v[0], v[2]))),
        _ => None,
    }
}

/// Chain segments into paths. Open paths start where no segment ends;
/// what remains forms closed rings.
fn join_segments(segments: &[(Edge, Edge)]) -> Vec<Vec<Edge>> {
    let mut by_start: HashMap<Edge, usize> = HashMap::new();
    let mut ends: HashSet<Edge> = HashSet::new();
    for (i, (start, end)) in segments.iter().enumerate() {
        by_start.entry(*start).or_insert(i);
        ends.insert(*end);
    }

    let open = (0..segments.len()).filter(|i| !ends.contains(&segments[*i].0));
    let starts: Vec<usize> = open.chain(0..segments.len()).collect();

    let mut used = vec![false; segments.len()];
    let mut paths = Vec::new();
    for first in starts {
        if used[first] {
            continue;
        }
        let mut path = vec![segments[first].0];
        let mut cur = first;
        loop {
            used[cur] = true;
            let end = segments[cur].1;
            path.push(end);
            match by_start.get(&end) {
                Some(&next) if !used[next] => cur = next,
                _ => break,
            }
        }
        paths.push(path);
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use indexmap::IndexMap;

    fn make_bindings(pairs: &[(Aes, &str)]) -> IndexMap<Aes, String> {
        pairs.iter().map(|(a, v)| (*a, v.to_string())).collect()
    }

    fn make_cone(n: usize) -> DataFrame {
        let (mut xs, mut ys, mut zs) = (Vec::new(), Vec::new(), Vec::new());
        for r in 0..n {
            for c in 0..n {
                let (x, y) = (c as f64, r as f64);
                let mid = (n - 1) as f64 / 2.0;
                xs.push(x);
                ys.push(y);
                zs.push(10.0 - ((x - mid).powi(2) + (y - mid).powi(2)).sqrt());
            }
        }
        DataFrame::from_columns(vec![
            Column::numeric("x", xs),
            Column::numeric("y", ys),
            Column::numeric("z", zs),
        ])
        .unwrap()
    }

    #[test]
    fn test_kernels_integrate_to_one() {
        let kernels = [
            Kernel::Gaussian,
            Kernel::Rectangular,
            Kernel::Triangular,
            Kernel::Biweight,
            Kernel::Epanechikov,
            Kernel::Optcosine,
            Kernel::Cosine,
        ];
        let step = 0.001;
        for kernel in kernels {
            let area: f64 = (-6000..=6000).map(|i| kernel_value(kernel, i as f64 * step) * step).sum();
            assert!((area - 1.0).abs() < 1e-2, "{:?} integrates to {}", kernel, area);
        }
    }

    #[test]
    fn test_rule_of_thumb() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        // population sd = sqrt(2) is below IQR / 1.34 = 1.49
        let expected = 0.9 * 2f64.sqrt() * 5f64.powf(-0.2);
        assert!((bandwidth(&Bandwidth::Nrd0, &sorted) - expected).abs() < 1e-12);
        assert_eq!(bandwidth(&Bandwidth::Fixed(0.3), &sorted), 0.3);
        assert_eq!(bandwidth(&Bandwidth::Nrd, &[2.0, 2.0]), 1.0);
    }

    #[test]
    fn test_density_area_and_scaling() {
        let df = DataFrame::from_columns(vec![Column::numeric("v", vec![1.0, 2.0, 2.5, 4.0, 7.0])]).unwrap();
        let bindings = make_bindings(&[(Aes::X, "v")]);
        let params = DensityParams::default();
        let out = density(&StatInput::new(&df, &bindings), &params, &StatContext::default()).unwrap();
        assert_eq!(out.row_count(), 512);

        let x: Vec<f64> = out.numeric(stat::X).unwrap().into_iter().flatten().collect();
        let d: Vec<f64> = out.numeric(stat::DENSITY).unwrap().into_iter().flatten().collect();
        let area: f64 = (1..x.len()).map(|i| (d[i] + d[i - 1]) / 2.0 * (x[i] - x[i - 1])).sum();
        assert!((area - 1.0).abs() < 0.01);

        let scaled = out.numeric(stat::SCALED).unwrap();
        let max = scaled.iter().flatten().copied().fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_density_quantile_lines_repeat_boundaries() {
        let df = DataFrame::from_columns(vec![Column::numeric("v", vec![1.0, 2.0, 3.0, 4.0, 5.0])]).unwrap();
        let bindings = make_bindings(&[(Aes::X, "v")]);
        let ctx = StatContext::default();
        let params = DensityParams { n: Some(50), quantile_lines: true, ..Default::default() };
        let out = density(&StatInput::new(&df, &bindings), &params, &ctx).unwrap();
        // one extra row per quantile boundary
        assert_eq!(out.row_count(), 53);

        let q = out.numeric(stat::QUANTILE).unwrap();
        assert_eq!(q[0], Some(0.25));
        assert_eq!(q[q.len() - 1], Some(1.0));
    }

    #[test]
    fn test_ydensity_per_category() {
        let df = DataFrame::from_columns(vec![
            Column::new("g", vec!["a".into(), "a".into(), "a".into(), "b".into(), "b".into()]),
            Column::numeric("v", vec![1.0, 2.0, 3.0, 10.0, 12.0]),
        ])
        .unwrap();
        let bindings = make_bindings(&[(Aes::X, "g"), (Aes::Y, "v")]);
        let params = DensityParams { n: Some(20), ..Default::default() };
        let out = ydensity(&StatInput::new(&df, &bindings), &params, &StatContext::default()).unwrap();
        assert_eq!(out.row_count(), 40);
        assert_eq!(out.get(stat::X).unwrap().values[0], Value::from("a"));
        assert_eq!(out.get(stat::N).unwrap().values[39], Value::Num(2.0));

        let widths = out.numeric(stat::VIOLINWIDTH).unwrap();
        let max = widths.iter().flatten().copied().fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_contour_levels() {
        assert_eq!(contour_levels((0.0, 10.0), 5, None), vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(contour_levels((0.0, 10.0), 5, Some(4.0)), vec![2.0, 6.0, 10.0]);
        assert!(contour_levels((3.0, 3.0), 5, None).is_empty());
    }

    #[test]
    fn test_cone_gives_closed_rings() {
        let df = make_cone(9);
        let bindings = make_bindings(&[(Aes::X, "x"), (Aes::Y, "y"), (Aes::Z, "z")]);
        let out = contour(&StatInput::new(&df, &bindings), 3, None, &StatContext::default()).unwrap();
        assert!(out.row_count() > 0);

        let groups = out.numeric(stat::GROUP).unwrap();
        let xs = out.numeric(stat::X).unwrap();
        let ys = out.numeric(stat::Y).unwrap();
        // innermost ring: last path, first and last points coincide
        let last = groups[groups.len() - 1];
        let rows: Vec<usize> = (0..groups.len()).filter(|i| groups[*i] == last).collect();
        let (a, b) = (rows[0], rows[rows.len() - 1]);
        assert!((xs[a].unwrap() - xs[b].unwrap()).abs() < 1e-9);
        assert!((ys[a].unwrap() - ys[b].unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_contour_needs_a_grid() {
        let df = DataFrame::from_columns(vec![
            Column::numeric("x", vec![1.0, 1.0]),
            Column::numeric("y", vec![1.0, 2.0]),
            Column::numeric("z", vec![1.0, 2.0]),
        ])
        .unwrap();
        let bindings = make_bindings(&[(Aes::X, "x"), (Aes::Y, "y"), (Aes::Z, "z")]);
        let out = contour(&StatInput::new(&df, &bindings), 10, None, &StatContext::default()).unwrap();
        assert_eq!(out.row_count(), 0);
        assert!(out.has(stat::LEVEL));
    }

    #[test]
    fn test_density2d_levels_within_range() {
        let df = DataFrame::from_columns(vec![
            Column::numeric("x", vec![0.0, 1.0, 1.5, 2.0, 3.0, 1.2]),
            Column::numeric("y", vec![0.0, 1.0, 0.5, 2.0, 1.0, 1.1]),
        ])
        .unwrap();
        let bindings = make_bindings(&[(Aes::X, "x"), (Aes::Y, "y")]);
        let out = density2d(&StatInput::new(&df, &bindings), 5, None, 25, 1.0, &StatContext::default()).unwrap();
        assert!(out.row_count() > 0);
        for x in out.numeric(stat::X).unwrap().into_iter().flatten() {
            assert!((0.0..=3.0).contains(&x));
        }
    }
}
