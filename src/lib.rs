// Library exports for gramspec

pub mod data;
pub mod error;
pub mod palette;
pub mod parser;
pub mod preprocessor;

// Pipeline stages
pub mod breaks;
pub mod density;
pub mod facet;
pub mod format;
pub mod ir;
pub mod order;
pub mod resolve;
pub mod scale;
pub mod stat;
pub mod theme_resolve;
pub mod tooltip;
pub mod transform;

use crate::error::Result;
use crate::format::{DefaultFormatter, ValueFormatter};
use crate::ir::{BoundLayer, GeomLayer, PlotModel, ResolvedFigure};
use crate::palette::Palettes;
use crate::parser::ast::{FigureSpec, PlotSpec};
use crate::resolve::{GeoJoin, KeyJoin};
use crate::stat::StatContext;
use crate::theme_resolve::ThemeResolver;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, info};

pub use crate::error::PlotError;

/// Tunables of one resolution, loadable from JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolveOptions {
    /// Target number of breaks on continuous scales
    #[serde(default = "default_break_count")]
    pub break_count: usize,
    #[serde(default = "default_min_factors")]
    pub min_factors_to_show_tooltips: usize,
    #[serde(default = "default_true")]
    pub drop_unused_data: bool,
    #[serde(default = "default_density_points")]
    pub density_points: usize,
    #[serde(default = "default_smooth_points")]
    pub smooth_points: usize,
    #[serde(default = "default_max_bins")]
    pub max_bins: usize,
}

fn default_break_count() -> usize { 5 }
fn default_min_factors() -> usize { 5 }
fn default_true() -> bool { true }
fn default_density_points() -> usize { 512 }
fn default_smooth_points() -> usize { 80 }
fn default_max_bins() -> usize { 10_000 }

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            break_count: default_break_count(),
            min_factors_to_show_tooltips: default_min_factors(),
            drop_unused_data: true,
            density_points: default_density_points(),
            smooth_points: default_smooth_points(),
            max_bins: default_max_bins(),
        }
    }
}

/// Everything a resolution reads besides the spec itself.
///
/// Built once by the caller and passed down by reference.
pub struct ResolveContext {
    pub options: ResolveOptions,
    pub formatter: Box<dyn ValueFormatter>,
    pub palettes: Palettes,
    pub geo_join: Option<Box<dyn GeoJoin>>,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(ResolveOptions::default())
    }
}

impl ResolveContext {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            formatter: Box::new(DefaultFormatter),
            palettes: Palettes::default(),
            geo_join: None,
        }
    }

    pub fn with_geo_join(mut self, join: Box<dyn GeoJoin>) -> Self {
        self.geo_join = Some(join);
        self
    }

    pub fn stat_context(&self) -> StatContext {
        StatContext {
            density_points: self.options.density_points,
            smooth_points: self.options.smooth_points,
            max_bins: self.options.max_bins,
        }
    }

    pub fn geo_join(&self) -> &dyn GeoJoin {
        self.geo_join.as_deref().unwrap_or(&KeyJoin)
    }
}

/// Resolve a raw spec tree into a renderer-ready figure
pub fn resolve_spec(spec: &Json, ctx: &ResolveContext) -> Result<ResolvedFigure> {
    let canonical = preprocessor::canonicalize(spec);
    let figure = parser::normalize_figure(&canonical)?;
    resolve_figure(&figure, ctx)
}

pub fn resolve_figure(figure: &FigureSpec, ctx: &ResolveContext) -> Result<ResolvedFigure> {
    match figure {
        FigureSpec::Plot(plot) => Ok(ResolvedFigure::Plot(Box::new(resolve_plot(plot, ctx)?))),
        FigureSpec::Subplots(subplots) => {
            info!("Resolving {} sub-figures", subplots.figures.len());
            let figures = subplots
                .figures
                .iter()
                .map(|f| f.as_ref().map(|f| resolve_figure(f, ctx)).transpose())
                .collect::<Result<Vec<_>>>()?;
            Ok(ResolvedFigure::Subplots {
                figures,
                ncol: subplots.ncol,
                nrow: subplots.nrow,
            })
        }
    }
}

/// Run every stage on one normalized plot
pub fn resolve_plot(plot: &PlotSpec, ctx: &ResolveContext) -> Result<PlotModel> {
    let facet_vars = plot.facet.as_ref().map(|f| f.variables()).unwrap_or_default();

    let mut layers: Vec<BoundLayer> = Vec::with_capacity(plot.layers.len());
    for spec in &plot.layers {
        let bound = resolve::bind_layer(plot, spec, ctx)?;
        layers.push(transform::apply_stat(bound, &facet_vars, ctx)?);
    }
    info!("Bound {} layers", layers.len());

    let data = if ctx.options.drop_unused_data {
        transform::prune_plot_data(&plot.data, &layers)
    } else {
        plot.data.clone()
    };

    let scales = scale::build_scales(&layers, &plot.scales, ctx)?;
    debug!(scales = ?scales.keys().collect::<Vec<_>>(), "scales built");

    let facet = facet::layout(plot.facet.as_ref(), &layers, &scales, ctx.formatter.as_ref())?;
    let coord = facet::resolve_coord(&plot.coord)?;
    let theme = ThemeResolver::new(&plot.theme);

    let mut geom_layers = Vec::with_capacity(layers.len());
    for layer in layers {
        let tooltips = tooltip::assemble(&layer, &layer.tooltips, &theme, &scales, ctx)?;
        let layer_scales: IndexMap<_, _> = layer
            .bindings
            .keys()
            .map(|aes| (*aes, aes.scale_aes()))
            .filter(|(_, scale_aes)| scales.contains_key(scale_aes))
            .collect();
        geom_layers.push(GeomLayer {
            index: layer.index,
            geom: layer.geom,
            stat: layer.stat.name(),
            position: layer.position,
            flipped: layer.flipped,
            data: layer.data,
            bindings: layer.bindings,
            constants: layer.constants,
            group: layer.group,
            scales: layer_scales,
            order_options: layer.order_options,
            tooltips,
            show_legend: layer.show_legend,
        });
    }

    Ok(PlotModel {
        data,
        layers: geom_layers,
        scales,
        facet,
        coord,
        labels: plot.labels.clone(),
        size: plot.size,
        theme: plot.theme.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_defaults_from_empty_json() {
        let options: ResolveOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, ResolveOptions::default());
        let options: ResolveOptions = serde_json::from_value(json!({"break_count": 8})).unwrap();
        assert_eq!(options.break_count, 8);
        assert_eq!(options.max_bins, 10_000);
    }

    #[test]
    fn test_stat_context_follows_options() {
        let ctx = ResolveContext::new(ResolveOptions {
            density_points: 64,
            ..ResolveOptions::default()
        });
        assert_eq!(ctx.stat_context().density_points, 64);
        assert_eq!(ctx.stat_context().smooth_points, 80);
    }

    #[test]
    fn test_resolve_single_plot() {
        let figure = resolve_spec(
            &json!({
                "kind": "plot",
                "data": {"a": [1, 2, 3], "b": [4, 5, 6], "unused": [0, 0, 0]},
                "mapping": {"x": "a", "y": "b"},
                "layers": [{"geom": "point"}],
                "ggtitle": {"text": "Points"}
            }),
            &ResolveContext::default(),
        )
        .unwrap();
        let plot = figure.as_plot().unwrap();
        assert_eq!(plot.layers.len(), 1);
        assert_eq!(plot.layers[0].scales[&parser::Aes::X], parser::Aes::X);
        assert!(!plot.data.has("unused"));
        assert_eq!(plot.labels.title.as_deref(), Some("Points"));
    }

    #[test]
    fn test_resolve_subplots_with_placeholder() {
        let figure = resolve_spec(
            &json!({
                "kind": "subplots",
                "figures": [
                    {"data": {"a": [1, 2]}, "mapping": {"x": "a", "y": "a"}, "layers": [{"geom": "point"}]},
                    null
                ],
                "layout": {"ncol": 2, "nrow": 1}
            }),
            &ResolveContext::default(),
        )
        .unwrap();
        match figure {
            ResolvedFigure::Subplots { figures, ncol, nrow } => {
                assert_eq!(figures.len(), 2);
                assert!(figures[0].is_some());
                assert!(figures[1].is_none());
                assert_eq!((ncol, nrow), (Some(2), Some(1)));
            }
            other => panic!("expected subplots, got {:?}", other),
        }
    }
}
