use crate::breaks::{continuous_breaks, temporal_breaks, temporal_pattern};
use crate::data::{Value, VarKind};
use crate::error::{PlotError, Result};
use crate::format::{precision_for_step, ValueFormatter};
use crate::ir::BoundLayer;
use crate::order::{ordered_domain, resolve_discreteness, union_domains, OrderAggregate};
use crate::palette::{interpolate, to_hex, Palettes};
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{MapperKind, Position, ScaleSpec, TransformKind};
use crate::ResolveContext;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Fallback patterns for temporal labels, coarsest first
const TEMPORAL_PATTERNS: &[&str] = &[
    "%Y",
    "%Y-%m",
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    Discrete { values: Vec<Value> },
    /// `None` when no layer supplies a finite value
    Continuous { range: Option<(f64, f64)> },
}

/// Domain value to visual value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mapper {
    /// Domain values are already visual values
    Identity,
    /// Positions in transformed data space (discrete values map to their index)
    Position,
    /// One output per discrete domain value, cycled when short
    Palette { values: Vec<Value>, na_value: Value },
    /// Colors interpolated along evenly spaced stops
    Gradient {
        stops: Vec<String>,
        midpoint: Option<f64>,
        na_value: Value,
    },
    /// Linear (or area-proportional) numeric range
    Range {
        low: f64,
        high: f64,
        area: bool,
        na_value: Value,
    },
}

/// One plot-wide scale, shared by every layer binding its aesthetic family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scale {
    pub aes: Aes,
    pub name: Option<String>,
    pub discrete: bool,
    /// Kind of the data behind the scale, temporal kinds drive break labels
    pub kind: VarKind,
    pub trans: TransformKind,
    pub domain: Domain,
    pub breaks: Vec<Value>,
    pub labels: Vec<String>,
    pub format: Option<String>,
    pub mapper_kind: Option<MapperKind>,
    pub mapper: Mapper,
    pub expand: Option<Vec<f64>>,
}

// =============================================================================
// Transforms
// =============================================================================

/// Forward transform; `None` outside the transform's domain
pub fn forward(trans: TransformKind, v: f64) -> Option<f64> {
    let out = match trans {
        TransformKind::Identity => v,
        TransformKind::Reverse => -v,
        TransformKind::Log10 if v > 0.0 => v.log10(),
        TransformKind::Log2 if v > 0.0 => v.log2(),
        TransformKind::Sqrt if v >= 0.0 => v.sqrt(),
        TransformKind::Symlog => v.signum() * (1.0 + v.abs()).log10(),
        _ => return None,
    };
    out.is_finite().then_some(out)
}

pub fn inverse(trans: TransformKind, v: f64) -> f64 {
    match trans {
        TransformKind::Identity => v,
        TransformKind::Reverse => -v,
        TransformKind::Log10 => 10f64.powf(v),
        TransformKind::Log2 => 2f64.powf(v),
        TransformKind::Sqrt => v * v,
        TransformKind::Symlog => v.signum() * (10f64.powf(v.abs()) - 1.0),
    }
}

impl Scale {
    fn domain_index(&self, value: &Value) -> Option<usize> {
        match &self.domain {
            Domain::Discrete { values } => values.iter().position(|v| v == value),
            Domain::Continuous { .. } => None,
        }
    }

    /// Position of `v` within the continuous domain in transformed space, in [0, 1]
    pub fn rescale(&self, v: f64) -> Option<f64> {
        let Domain::Continuous { range: Some((lo, hi)) } = self.domain else {
            return None;
        };
        let (lo, hi, v) = (
            forward(self.trans, lo)?,
            forward(self.trans, hi)?,
            forward(self.trans, v)?,
        );
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if hi == lo {
            return Some(0.5);
        }
        Some(((v - lo) / (hi - lo)).clamp(0.0, 1.0))
    }

    /// Visual value for one domain value
    pub fn map(&self, value: &Value) -> Value {
        match &self.mapper {
            Mapper::Identity => value.clone(),
            Mapper::Position => {
                let pos = if self.discrete {
                    self.domain_index(value).map(|i| i as f64)
                } else {
                    value.as_f64().and_then(|v| forward(self.trans, v))
                };
                pos.map(Value::Num).unwrap_or(Value::Null)
            }
            Mapper::Palette { values, na_value } => self
                .domain_index(value)
                .filter(|_| !values.is_empty())
                .map(|i| values[i % values.len()].clone())
                .unwrap_or_else(|| na_value.clone()),
            Mapper::Gradient {
                stops,
                midpoint,
                na_value,
            } => {
                let t = match (self.discrete, value.as_f64()) {
                    (true, _) => self.discrete_fraction(value),
                    (false, Some(v)) => match midpoint {
                        Some(m) => self.rescale_mid(v, *m),
                        None => self.rescale(v),
                    },
                    (false, None) => None,
                };
                t.and_then(|t| interpolate(stops, t).ok())
                    .map(Value::Str)
                    .unwrap_or_else(|| na_value.clone())
            }
            Mapper::Range {
                low,
                high,
                area,
                na_value,
            } => {
                let t = if self.discrete {
                    self.discrete_fraction(value)
                } else {
                    value.as_f64().and_then(|v| self.rescale(v))
                };
                match t {
                    Some(t) => {
                        let t = if *area { t.sqrt() } else { t };
                        Value::Num(low + (high - low) * t)
                    }
                    None => na_value.clone(),
                }
            }
        }
    }

    fn discrete_fraction(&self, value: &Value) -> Option<f64> {
        let n = match &self.domain {
            Domain::Discrete { values } => values.len(),
            Domain::Continuous { .. } => return None,
        };
        let i = self.domain_index(value)?;
        Some(if n <= 1 { 0.5 } else { i as f64 / (n - 1) as f64 })
    }

    /// Two-sided rescale with `mid` mapped to 0.5
    fn rescale_mid(&self, v: f64, mid: f64) -> Option<f64> {
        let Domain::Continuous { range: Some((lo, hi)) } = self.domain else {
            return None;
        };
        let (lo, hi, mid, v) = (
            forward(self.trans, lo)?,
            forward(self.trans, hi)?,
            forward(self.trans, mid)?,
            forward(self.trans, v)?,
        );
        let half_span = (mid - lo).abs().max((hi - mid).abs());
        if half_span == 0.0 {
            return Some(0.5);
        }
        Some((0.5 + (v - mid) / (2.0 * half_span)).clamp(0.0, 1.0))
    }

    /// Domain of the scale restricted to the values of one panel
    pub fn restrict<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> Domain {
        match &self.domain {
            Domain::Discrete { values: domain } => {
                let present: Vec<&Value> = values.into_iter().collect();
                Domain::Discrete {
                    values: domain.iter().filter(|v| present.contains(v)).cloned().collect(),
                }
            }
            Domain::Continuous { .. } => {
                let mut range: Option<(f64, f64)> = None;
                for v in values.into_iter().filter_map(Value::as_f64).filter(|v| v.is_finite()) {
                    range = Some(match range {
                        None => (v, v),
                        Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    });
                }
                Domain::Continuous { range }
            }
        }
    }
}

// =============================================================================
// Spec merging
// =============================================================================

fn merge_specs(aes: Aes, specs: &[&ScaleSpec]) -> Result<ScaleSpec> {
    let mut merged = ScaleSpec {
        aes: Some(aes),
        ..ScaleSpec::default()
    };
    for spec in specs {
        if let (Some(a), Some(b)) = (merged.discrete, spec.discrete) {
            if a != b {
                return Err(PlotError::ScaleConfig(format!(
                    "Conflicting 'discrete' settings for the '{}' scale",
                    aes
                )));
            }
        }
        if let (Some(a), Some(b)) = (merged.mapper_kind, spec.mapper_kind) {
            if a != b {
                return Err(PlotError::ScaleConfig(format!(
                    "Conflicting scale mapper kinds for the '{}' scale: '{:?}' and '{:?}'",
                    aes, a, b
                )));
            }
        }
        let s = (*spec).clone();
        merged = ScaleSpec {
            aes: Some(aes),
            name: s.name.or(merged.name),
            breaks: s.breaks.or(merged.breaks),
            labels: s.labels.or(merged.labels),
            limits: s.limits.or(merged.limits),
            trans: s.trans.or(merged.trans),
            discrete: s.discrete.or(merged.discrete),
            reverse: s.reverse || merged.reverse,
            format: s.format.or(merged.format),
            mapper_kind: s.mapper_kind.or(merged.mapper_kind),
            palette: s.palette.or(merged.palette),
            values: s.values.or(merged.values),
            low: s.low.or(merged.low),
            mid: s.mid.or(merged.mid),
            high: s.high.or(merged.high),
            na_value: s.na_value.or(merged.na_value),
            range: s.range.or(merged.range),
            expand: s.expand.or(merged.expand),
        };
    }
    if merged.discrete == Some(true) {
        if let Some(trans) = merged.trans.filter(|t| *t != TransformKind::Identity) {
            return Err(PlotError::ScaleConfig(format!(
                "Discrete scale for '{}' cannot use the '{}' transform",
                aes,
                trans.name()
            )));
        }
    }
    Ok(merged)
}

// =============================================================================
// Building
// =============================================================================

/// A layer binding served by one scale
struct Use<'a> {
    layer: &'a BoundLayer,
    aes: Aes,
    var: &'a str,
}

fn collect_uses(layers: &[BoundLayer]) -> IndexMap<Aes, Vec<Use<'_>>> {
    let mut uses: IndexMap<Aes, Vec<Use<'_>>> = IndexMap::new();
    for layer in layers {
        for (aes, var) in &layer.bindings {
            if !aes.has_scale() || !layer.data.has(var) {
                continue;
            }
            uses.entry(aes.scale_aes()).or_default().push(Use {
                layer,
                aes: *aes,
                var,
            });
        }
    }
    uses
}

/// Build one scale per aesthetic family bound by any layer.
pub fn build_scales(
    layers: &[BoundLayer],
    specs: &[ScaleSpec],
    ctx: &ResolveContext,
) -> Result<IndexMap<Aes, Scale>> {
    let mut scales = IndexMap::new();
    for (aes, uses) in collect_uses(layers) {
        let matching: Vec<&ScaleSpec> = specs
            .iter()
            .filter(|s| s.aes.map(|a| a.scale_aes()) == Some(aes))
            .collect();
        let spec = merge_specs(aes, &matching)?;
        let scale = build_scale(aes, &uses, &spec, ctx)?;
        debug!(
            aes = %aes,
            discrete = scale.discrete,
            breaks = scale.breaks.len(),
            "built scale"
        );
        scales.insert(aes, scale);
    }
    for spec in specs {
        if let Some(aes) = spec.aes {
            if !scales.contains_key(&aes.scale_aes()) {
                debug!(aes = %aes, "scale spec ignored: aesthetic not bound by any layer");
            }
        }
    }
    Ok(scales)
}

fn build_scale(
    aes: Aes,
    uses: &[Use<'_>],
    spec: &ScaleSpec,
    ctx: &ResolveContext,
) -> Result<Scale> {
    let kinds: Vec<VarKind> = uses
        .iter()
        .filter_map(|u| u.layer.data.kind(u.var))
        .collect();
    let intrinsic = if kinds.iter().any(VarKind::is_discrete) {
        Some(VarKind::Discrete)
    } else {
        kinds.first().copied()
    };
    let as_discrete = uses.iter().any(|u| u.layer.is_as_discrete(u.aes));
    let explicit = spec
        .discrete
        .or_else(|| (spec.mapper_kind == Some(MapperKind::Discrete)).then_some(true));
    let discrete = resolve_discreteness(explicit, as_discrete, intrinsic);

    // Temporal kind of the source columns, looking through as_discrete copies
    let kind = uses
        .iter()
        .filter_map(|u| {
            let source = u.layer.source_variable(u.aes).unwrap_or(u.var);
            u.layer.data.kind(source).or_else(|| u.layer.data.kind(u.var))
        })
        .find(VarKind::is_temporal)
        .unwrap_or(if discrete { VarKind::Discrete } else { VarKind::Continuous });

    let trans = match (spec.trans, spec.reverse, discrete) {
        (Some(t), _, _) => t,
        (None, true, false) => TransformKind::Reverse,
        _ => TransformKind::Identity,
    };

    let name = spec.name.clone().or_else(|| scale_name(aes, uses));

    let (domain, breaks, labels) = if discrete {
        let mut values = discrete_domain(uses)?;
        if let Some(limits) = &spec.limits {
            values = limits.iter().filter(|v| !v.is_null()).cloned().collect();
        }
        if spec.reverse {
            values.reverse();
        }
        let breaks = spec.breaks.clone().unwrap_or_else(|| values.clone());
        let labels = discrete_labels(&breaks, kind, spec, ctx.formatter.as_ref());
        (Domain::Discrete { values }, breaks, labels)
    } else {
        let range = continuous_range(uses, spec);
        let n = ctx.options.break_count;
        let breaks: Vec<Value> = match (&spec.breaks, range) {
            (Some(explicit), _) => explicit.clone(),
            (None, Some((lo, hi))) if kind.is_temporal() => {
                temporal_breaks(lo, hi, n).into_iter().map(Value::Num).collect()
            }
            (None, Some((lo, hi))) => continuous_breaks(lo, hi, n, trans)
                .into_iter()
                .map(Value::Num)
                .collect(),
            (None, None) => Vec::new(),
        };
        let labels = continuous_labels(&breaks, kind, trans, spec, ctx.formatter.as_ref());
        (Domain::Continuous { range }, breaks, labels)
    };

    let mapper = build_mapper(aes, discrete, &domain, spec, &ctx.palettes)?;

    Ok(Scale {
        aes,
        name,
        discrete,
        kind,
        trans,
        domain,
        breaks,
        labels,
        format: spec.format.clone(),
        mapper_kind: spec.mapper_kind,
        mapper,
        expand: spec.expand.clone(),
    })
}

/// `as_discrete` label first, then the variable bound to the family's main aesthetic
fn scale_name(aes: Aes, uses: &[Use<'_>]) -> Option<String> {
    uses.iter()
        .find_map(|u| u.layer.scale_names.get(&u.aes).cloned())
        .or_else(|| {
            uses.iter()
                .find(|u| u.aes == aes)
                .or_else(|| uses.first())
                .map(|u| u.layer.source_variable(u.aes).unwrap_or(u.var).to_string())
        })
}

fn discrete_domain(uses: &[Use<'_>]) -> Result<Vec<Value>> {
    let mut domains = Vec::with_capacity(uses.len());
    for u in uses {
        let layer = u.layer;
        let option = layer.order_option(u.aes);
        let levels = layer
            .source_variable(u.aes)
            .and_then(|source| layer.factor_levels.get(source))
            .map(|(levels, dir)| (levels.as_slice(), *dir));
        let stacked = matches!(layer.position, Position::Stack | Position::Fill);
        let aggregate = option
            .and_then(|o| o.order_by.as_deref())
            .map(|by| OrderAggregate::for_variable(by, stacked))
            .unwrap_or(OrderAggregate::Mean);
        let mut domain = ordered_domain(&layer.data, u.var, option, levels, aggregate)?;
        let unordered = levels.is_none()
            && option.map_or(true, |o| o.order.is_none() && o.order_by.is_none());
        if unordered && layer.data.is_numeric(u.var) {
            domain.sort_by(|a, b| a.cmp_natural(b));
        }
        domains.push(domain);
    }
    Ok(union_domains(domains.iter()))
}

fn continuous_range(uses: &[Use<'_>], spec: &ScaleSpec) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for u in uses {
        if let Some((lo, hi)) = u.layer.data.range(u.var) {
            range = Some(match range {
                None => (lo, hi),
                Some((a, b)) => (a.min(lo), b.max(hi)),
            });
        }
    }
    match spec.limits.as_deref() {
        Some([lo, hi]) => {
            let (data_lo, data_hi) = match range {
                Some(r) => (Some(r.0), Some(r.1)),
                None => (None, None),
            };
            match (lo.as_f64().or(data_lo), hi.as_f64().or(data_hi)) {
                (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
                _ => None,
            }
        }
        _ => range,
    }
}

// =============================================================================
// Labels
// =============================================================================

fn all_unique(labels: &[String]) -> bool {
    labels
        .iter()
        .enumerate()
        .all(|(i, l)| !labels[..i].contains(l))
}

/// Labels for temporal breaks: the pattern of the matching break step
/// first, then [`TEMPORAL_PATTERNS`] in turn until every label is unique
fn temporal_labels(breaks: &[Value], kind: VarKind, formatter: &dyn ValueFormatter) -> Vec<String> {
    let numbers: Vec<f64> = breaks.iter().filter_map(Value::as_f64).collect();
    let step_pattern = numbers
        .iter()
        .copied()
        .reduce(f64::min)
        .zip(numbers.iter().copied().reduce(f64::max))
        .and_then(|(lo, hi)| temporal_pattern(lo, hi, breaks.len()));

    let mut last = Vec::new();
    for pattern in step_pattern.into_iter().chain(TEMPORAL_PATTERNS.iter().copied()) {
        last = breaks
            .iter()
            .map(|b| formatter.format(b, kind, Some(pattern)))
            .collect::<Vec<_>>();
        if all_unique(&last) {
            break;
        }
    }
    last
}

fn with_explicit_labels(spec: &ScaleSpec, generated: Vec<String>) -> Vec<String> {
    match &spec.labels {
        Some(explicit) => generated
            .into_iter()
            .enumerate()
            .map(|(i, g)| explicit.get(i).cloned().unwrap_or(g))
            .collect(),
        None => generated,
    }
}

fn discrete_labels(
    breaks: &[Value],
    kind: VarKind,
    spec: &ScaleSpec,
    formatter: &dyn ValueFormatter,
) -> Vec<String> {
    let format_all = |kind: VarKind, pattern: Option<&str>| -> Vec<String> {
        breaks.iter().map(|b| formatter.format(b, kind, pattern)).collect()
    };
    let generated = if kind.is_temporal() {
        match spec.format.as_deref() {
            Some(pattern) => {
                let labels = format_all(kind, Some(pattern));
                if all_unique(&labels) {
                    labels
                } else {
                    temporal_labels(breaks, kind, formatter)
                }
            }
            None => temporal_labels(breaks, kind, formatter),
        }
    } else {
        let numeric = breaks.iter().all(|b| matches!(b, Value::Num(_) | Value::Null));
        let value_kind = if numeric { VarKind::Continuous } else { VarKind::Discrete };
        let labels = format_all(value_kind, spec.format.as_deref());
        // A lossy number format must not merge distinct categories
        if numeric && !all_unique(&labels) {
            format_all(value_kind, None)
        } else {
            labels
        }
    };
    with_explicit_labels(spec, generated)
}

fn continuous_labels(
    breaks: &[Value],
    kind: VarKind,
    trans: TransformKind,
    spec: &ScaleSpec,
    formatter: &dyn ValueFormatter,
) -> Vec<String> {
    let generated = match (spec.format.as_deref(), kind.is_temporal()) {
        (Some(pattern), _) => breaks
            .iter()
            .map(|b| formatter.format(b, kind, Some(pattern)))
            .collect(),
        (None, true) => temporal_labels(breaks, kind, formatter),
        (None, false) => {
            let numbers: Vec<f64> = breaks.iter().filter_map(Value::as_f64).collect();
            let linear = matches!(trans, TransformKind::Identity | TransformKind::Reverse);
            let pattern = match numbers.as_slice() {
                [a, b, ..] if linear => Some(format!(".{}f", precision_for_step((b - a).abs()))),
                _ => None,
            };
            breaks
                .iter()
                .map(|b| formatter.format(b, kind, pattern.as_deref()))
                .collect()
        }
    };
    with_explicit_labels(spec, generated)
}

// =============================================================================
// Mappers
// =============================================================================

fn color(spec_value: &Option<String>, default: &str) -> Result<String> {
    to_hex(spec_value.as_deref().unwrap_or(default))
}

fn color_values(values: &[Value]) -> Result<Vec<Value>> {
    values
        .iter()
        .map(|v| match v {
            Value::Str(s) => to_hex(s).map(Value::Str),
            other => Err(PlotError::ScaleConfig(format!("Invalid color '{}'", other))),
        })
        .collect()
}

fn domain_len(domain: &Domain) -> usize {
    match domain {
        Domain::Discrete { values } => values.len(),
        Domain::Continuous { .. } => 0,
    }
}

fn build_mapper(
    aes: Aes,
    discrete: bool,
    domain: &Domain,
    spec: &ScaleSpec,
    palettes: &Palettes,
) -> Result<Mapper> {
    if spec.mapper_kind == Some(MapperKind::Identity) {
        return Ok(Mapper::Identity);
    }
    if aes.is_positional() {
        return Ok(Mapper::Position);
    }
    let n = domain_len(domain);
    match aes {
        Aes::Color | Aes::Fill => color_mapper(discrete, n, spec, palettes),
        Aes::Size | Aes::Alpha | Aes::Stroke => {
            let default = match aes {
                Aes::Size => palettes.size_range,
                Aes::Alpha => palettes.alpha_range,
                _ => palettes.stroke_range,
            };
            let area = spec.mapper_kind == Some(MapperKind::SizeArea);
            let (low, high) = match (spec.range, area) {
                (Some(range), _) => range,
                (None, true) => (0.0, default.1),
                (None, false) => default,
            };
            let na_value = spec.na_value.clone().unwrap_or(Value::Null);
            match (&spec.values, discrete) {
                (Some(values), true) => Ok(Mapper::Palette {
                    values: values.clone(),
                    na_value,
                }),
                (None, true) => Ok(Mapper::Palette {
                    values: Palettes::spread((low, high), n).into_iter().map(Value::Num).collect(),
                    na_value,
                }),
                (_, false) => Ok(Mapper::Range {
                    low,
                    high,
                    area,
                    na_value,
                }),
            }
        }
        Aes::Shape | Aes::Linetype => {
            if !discrete {
                return Err(PlotError::ScaleConfig(format!(
                    "A continuous variable cannot be mapped to '{}'",
                    aes
                )));
            }
            let values = match &spec.values {
                Some(values) => values.clone(),
                None if aes == Aes::Shape => palettes.shapes.iter().map(|s| Value::Num(*s)).collect(),
                None => palettes.linetypes.iter().map(|s| Value::from(s.as_str())).collect(),
            };
            Ok(Mapper::Palette {
                values,
                na_value: spec.na_value.clone().unwrap_or(Value::Null),
            })
        }
        _ => Ok(Mapper::Identity),
    }
}

fn color_mapper(discrete: bool, n: usize, spec: &ScaleSpec, palettes: &Palettes) -> Result<Mapper> {
    let na_value = match &spec.na_value {
        Some(Value::Str(s)) => Value::Str(to_hex(s)?),
        Some(other) => other.clone(),
        None => Value::Str(palettes.na_color.clone()),
    };
    let default_kind = if discrete {
        MapperKind::ColorHue
    } else {
        MapperKind::ColorGradient
    };
    let kind = match spec.mapper_kind {
        Some(MapperKind::Discrete) | Some(MapperKind::SizeArea) | None => default_kind,
        Some(kind) => kind,
    };

    let stops: Vec<String> = match kind {
        MapperKind::ColorGradient => vec![
            color(&spec.low, &palettes.gradient.0)?,
            color(&spec.high, &palettes.gradient.1)?,
        ],
        MapperKind::ColorGradient2 => vec![
            color(&spec.low, &palettes.gradient2.0)?,
            color(&spec.mid, &palettes.gradient2.1)?,
            color(&spec.high, &palettes.gradient2.2)?,
        ],
        MapperKind::ColorGrey => vec![
            color(&spec.low, &palettes.grey.0)?,
            color(&spec.high, &palettes.grey.1)?,
        ],
        MapperKind::ColorBrewer => {
            let default = if discrete {
                &palettes.brewer_qualitative
            } else {
                &palettes.brewer_sequential
            };
            let name = spec.palette.as_deref().unwrap_or(default);
            if discrete {
                let values = palettes.brewer(name, n)?;
                return Ok(Mapper::Palette {
                    values: values.into_iter().map(Value::Str).collect(),
                    na_value,
                });
            }
            palettes.brewer(name, 9)?
        }
        MapperKind::ColorManual => {
            let values = spec.values.as_deref().ok_or_else(|| {
                PlotError::ScaleConfig("Manual color scale requires 'values'".to_string())
            })?;
            let values = color_values(values)?;
            if discrete {
                return Ok(Mapper::Palette { values, na_value });
            }
            values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        }
        _ => {
            let values = palettes.hue(if discrete { n } else { 6 });
            if discrete {
                return Ok(Mapper::Palette {
                    values: values.into_iter().map(Value::Str).collect(),
                    na_value,
                });
            }
            values
        }
    };

    if discrete {
        // Gradient kinds on discrete data sample the gradient once per level
        let values = (0..n)
            .map(|i| interpolate(&stops, if n <= 1 { 0.5 } else { i as f64 / (n - 1) as f64 }))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Mapper::Palette {
            values: values.into_iter().map(Value::Str).collect(),
            na_value,
        });
    }
    let midpoint = (kind == MapperKind::ColorGradient2).then_some(0.0);
    Ok(Mapper::Gradient {
        stops,
        midpoint,
        na_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize_plot;
    use crate::resolve::bind_layer;
    use crate::transform::apply_stat;
    use serde_json::json;

    fn make_scales(spec: serde_json::Value) -> Result<IndexMap<Aes, Scale>> {
        let ctx = ResolveContext::default();
        let plot = normalize_plot(&spec)?;
        let mut layers = Vec::new();
        for layer in &plot.layers {
            layers.push(apply_stat(bind_layer(&plot, layer, &ctx)?, &[], &ctx)?);
        }
        build_scales(&layers, &plot.scales, &ctx)
    }

    fn strs(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn test_one_scale_per_family() {
        let scales = make_scales(json!({
            "data": {"a": [1, 2, 3], "lo": [0, 1, 2], "hi": [2, 3, 4]},
            "layers": [
                {"geom": "point", "mapping": {"x": "a", "y": "a"}},
                {"geom": "errorbar", "mapping": {"x": "a", "ymin": "lo", "ymax": "hi"}}
            ]
        }))
        .unwrap();
        let keys: Vec<Aes> = scales.keys().copied().collect();
        assert_eq!(keys, vec![Aes::X, Aes::Y]);
        assert_eq!(scales[&Aes::Y].domain, Domain::Continuous { range: Some((0.0, 4.0)) });
        assert_eq!(scales[&Aes::Y].name.as_deref(), Some("a"));
    }

    #[test]
    fn test_discrete_domain_in_data_order() {
        let scales = make_scales(json!({
            "data": {"time": ["Lunch", "Lunch", "Dinner"]},
            "layers": [{"geom": "bar", "mapping": {"x": "time"}}]
        }))
        .unwrap();
        let x = &scales[&Aes::X];
        assert!(x.discrete);
        assert_eq!(x.domain, Domain::Discrete { values: strs(&["Lunch", "Dinner"]) });
        assert_eq!(x.labels, vec!["Lunch", "Dinner"]);
        assert_eq!(x.map(&Value::from("Dinner")), Value::Num(1.0));
        assert!(!scales[&Aes::Y].discrete);
    }

    #[test]
    fn test_factor_levels_extend_domain() {
        let scales = make_scales(json!({
            "data": {"v": ["d", "c", "b", "a"], "y": [1, 2, 3, 4]},
            "data_meta": {"series_annotations": [{"column": "v", "factor_levels": ["a", "b"]}]},
            "layers": [{"geom": "point", "mapping": {"x": "v", "y": "y"}}]
        }))
        .unwrap();
        assert_eq!(
            scales[&Aes::X].domain,
            Domain::Discrete { values: strs(&["a", "b", "d", "c"]) }
        );
    }

    #[test]
    fn test_explicit_discrete_wins() {
        let scales = make_scales(json!({
            "data": {"n": [3, 1, 2, 1], "y": [1, 2, 3, 4]},
            "scales": [{"aesthetic": "x", "discrete": true}],
            "layers": [{"geom": "point", "mapping": {"x": "n", "y": "y"}}]
        }))
        .unwrap();
        let x = &scales[&Aes::X];
        assert!(x.discrete);
        assert_eq!(
            x.domain,
            Domain::Discrete { values: vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)] }
        );
        assert_eq!(x.labels, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_lossy_discrete_format_keeps_distinct_labels() {
        let scales = make_scales(json!({
            "data": {"n": [1.01, 1.02, 1.03], "y": [1, 2, 3]},
            "scales": [{"aesthetic": "x", "discrete": true, "format": ".1f"}],
            "layers": [{"geom": "point", "mapping": {"x": "n", "y": "y"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::X].labels, vec!["1.01", "1.02", "1.03"]);
    }

    #[test]
    fn test_conflicting_specs() {
        let err = make_scales(json!({
            "data": {"a": [1, 2]},
            "scales": [
                {"aesthetic": "x", "discrete": true},
                {"aesthetic": "x", "discrete": false}
            ],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::ScaleConfig(_)));

        let err = make_scales(json!({
            "data": {"a": [1, 2]},
            "scales": [{"aesthetic": "x", "discrete": true, "trans": "log10"}],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::ScaleConfig(_)));

        let err = make_scales(json!({
            "data": {"a": [1, 2], "c": [1, 2]},
            "scales": [
                {"aesthetic": "color", "scale_mapper_kind": "color_hue"},
                {"aesthetic": "color", "scale_mapper_kind": "color_grey"}
            ],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "color": "c"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::ScaleConfig(_)));
    }

    #[test]
    fn test_continuous_breaks_and_labels() {
        let scales = make_scales(json!({
            "data": {"a": [0, 100], "b": [1, 3]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::X].labels, vec!["0", "20", "40", "60", "80", "100"]);
        assert_eq!(scales[&Aes::Y].labels, vec!["1.0", "1.5", "2.0", "2.5", "3.0"]);
    }

    #[test]
    fn test_log_transform_keeps_values() {
        let scales = make_scales(json!({
            "data": {"a": [1, 1000]},
            "scales": [{"aesthetic": "x", "trans": "log10"}],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a"}}]
        }))
        .unwrap();
        let x = &scales[&Aes::X];
        assert_eq!(x.domain, Domain::Continuous { range: Some((1.0, 1000.0)) });
        assert_eq!(x.labels, vec!["1", "10", "100", "1000"]);
        assert_eq!(x.map(&Value::Num(100.0)), Value::Num(2.0));
    }

    #[test]
    fn test_limits_override_domain() {
        let scales = make_scales(json!({
            "data": {"a": [2, 3], "v": ["p", "q"]},
            "scales": [
                {"aesthetic": "x", "limits": [0, null]},
                {"aesthetic": "color", "limits": ["q", "p", "r"]}
            ],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "color": "v"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::X].domain, Domain::Continuous { range: Some((0.0, 3.0)) });
        assert_eq!(
            scales[&Aes::Color].domain,
            Domain::Discrete { values: strs(&["q", "p", "r"]) }
        );
    }

    #[test]
    fn test_identity_mapper_passes_through() {
        let scales = make_scales(json!({
            "data": {"a": [1, 2], "c": ["red", "blue"]},
            "scales": [{"aesthetic": "color", "scale_mapper_kind": "identity"}],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "color": "c"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::Color].map(&Value::from("red")), Value::from("red"));
    }

    #[test]
    fn test_default_color_mappers() {
        let scales = make_scales(json!({
            "data": {"a": [1, 2, 3], "g": ["u", "v", "w"]},
            "layers": [
                {"geom": "point", "mapping": {"x": "a", "y": "a", "color": "g", "fill": "a"}}
            ]
        }))
        .unwrap();
        let color = &scales[&Aes::Color];
        assert!(matches!(&color.mapper, Mapper::Palette { values, .. } if values.len() == 3));
        assert_ne!(color.map(&Value::from("u")), color.map(&Value::from("v")));
        assert_eq!(color.map(&Value::from("zzz")), Value::from("#808080"));

        let fill = &scales[&Aes::Fill];
        assert_eq!(fill.map(&Value::Num(1.0)), Value::from("#132b43"));
        assert_eq!(fill.map(&Value::Num(3.0)), Value::from("#56b1f7"));
    }

    #[test]
    fn test_size_range_and_continuous_shape() {
        let scales = make_scales(json!({
            "data": {"a": [0, 10]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "size": "a"}}]
        }))
        .unwrap();
        let size = &scales[&Aes::Size];
        assert_eq!(size.map(&Value::Num(0.0)), Value::Num(2.0));
        assert_eq!(size.map(&Value::Num(10.0)), Value::Num(5.5));

        let err = make_scales(json!({
            "data": {"a": [0, 10]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "shape": "a"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlotError::ScaleConfig(_)));
    }

    #[test]
    fn test_manual_colors_and_brewer() {
        let scales = make_scales(json!({
            "data": {"a": [1, 2], "g": ["u", "v"]},
            "scales": [
                {"aesthetic": "color", "scale_mapper_kind": "color_manual", "values": ["red", "blue"]},
                {"aesthetic": "fill", "scale_mapper_kind": "color_brewer", "palette": "Set1"}
            ],
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a", "color": "g", "fill": "g"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::Color].map(&Value::from("v")), Value::from("#0000ff"));
        assert_eq!(scales[&Aes::Fill].map(&Value::from("u")), Value::from("#e41a1c"));
    }

    #[test]
    fn test_as_discrete_label_names_scale() {
        let scales = make_scales(json!({
            "data": {"cyl": [4, 6, 8], "a": [1, 2, 3]},
            "data_meta": {"mapping_annotations": [
                {"aes": "color", "annotation": "as_discrete", "parameters": {"label": "Cylinders"}}
            ]},
            "mapping": {"color": "cyl"},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "a"}}]
        }))
        .unwrap();
        let color = &scales[&Aes::Color];
        assert!(color.discrete);
        assert_eq!(color.name.as_deref(), Some("Cylinders"));
    }

    #[test]
    fn test_temporal_discrete_labels_follow_break_step() {
        let day = 86_400_000.0;
        let jan1 = 1_577_836_800_000.0;
        let scales = make_scales(json!({
            "data": {"t": [jan1, jan1 + day, jan1 + 2.0 * day], "y": [1, 2, 3]},
            "data_meta": {"series_annotations": [{"column": "t", "type": "datetime"}]},
            "scales": [{"aesthetic": "x", "discrete": true}],
            "layers": [{"geom": "point", "mapping": {"x": "t", "y": "y"}}]
        }))
        .unwrap();
        assert_eq!(scales[&Aes::X].labels, vec!["Jan 01", "Jan 02", "Jan 03"]);
    }

    #[test]
    fn test_temporal_discrete_labels_fall_back_until_unique() {
        let day = 86_400_000.0;
        let jan1_2020 = 1_577_836_800_000.0;
        let jan1_2021 = jan1_2020 + 366.0 * day;
        let scales = make_scales(json!({
            "data": {"t": [jan1_2020, jan1_2021, jan1_2021 + day], "y": [1, 2, 3]},
            "data_meta": {"series_annotations": [{"column": "t", "type": "datetime"}]},
            "scales": [{"aesthetic": "x", "discrete": true}],
            "layers": [{"geom": "point", "mapping": {"x": "t", "y": "y"}}]
        }))
        .unwrap();
        assert_eq!(
            scales[&Aes::X].labels,
            vec!["2020-01-01", "2021-01-01", "2021-01-02"]
        );
    }

    #[test]
    fn test_as_discrete_datetime_keeps_temporal_labels() {
        let hour = 3_600_000.0;
        let ten = 1_704_103_200_000.0;
        let scales = make_scales(json!({
            "data": {"t": [ten, ten + hour, ten + 2.0 * hour, ten + 3.0 * hour], "y": [1, 2, 3, 4]},
            "data_meta": {
                "series_annotations": [{"column": "t", "type": "datetime"}],
                "mapping_annotations": [{"aes": "x", "annotation": "as_discrete", "parameters": {}}]
            },
            "mapping": {"x": "t", "y": "y"},
            "layers": [{"geom": "point"}]
        }))
        .unwrap();
        let x = &scales[&Aes::X];
        assert!(x.discrete);
        assert_eq!(x.kind, VarKind::DateTime);
        assert_eq!(x.labels, vec!["10:00", "11:00", "12:00", "13:00"]);
    }

    #[test]
    fn test_restrict_domain() {
        let scales = make_scales(json!({
            "data": {"g": ["a", "b", "c"], "y": [1, 5, 9]},
            "layers": [{"geom": "point", "mapping": {"x": "g", "y": "y"}}]
        }))
        .unwrap();
        let panel = [Value::from("c"), Value::from("a")];
        assert_eq!(
            scales[&Aes::X].restrict(panel.iter()),
            Domain::Discrete { values: strs(&["a", "c"]) }
        );
        let ys = [Value::Num(5.0), Value::Num(9.0)];
        assert_eq!(
            scales[&Aes::Y].restrict(ys.iter()),
            Domain::Continuous { range: Some((5.0, 9.0)) }
        );
    }
}
