use crate::data::{is_stat_var, DataFrame, Value};
use crate::facet::{CoordModel, PanelGrid};
use crate::order::OrderOption;
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{Labels, Position, Stat, TooltipSpec};
use crate::parser::geom::GeomKind;
use crate::scale::Scale;
use crate::tooltip::ContextualMapping;
use indexmap::IndexMap;
use serde::Serialize;

// =============================================================================
// Phase 1: Binding
// =============================================================================

/// A layer whose aesthetics all resolve to columns of its own data frame.
/// Produced by the binder and rewritten by the stat engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundLayer {
    pub index: usize,
    pub geom: GeomKind,
    pub stat: Stat,
    pub position: Position,
    /// `orientation: y`
    pub flipped: bool,
    pub data: DataFrame,
    pub bindings: IndexMap<Aes, String>,
    pub group: Option<String>,
    pub constants: IndexMap<Aes, Value>,
    pub order_options: Vec<OrderOption>,
    /// `as_discrete` aesthetics and the variable each copy was made from
    pub discrete_sources: IndexMap<Aes, String>,
    /// Declared factor levels and their direction, by source variable
    pub factor_levels: IndexMap<String, (Vec<Value>, i32)>,
    pub scale_names: IndexMap<Aes, String>,
    pub tooltips: TooltipSpec,
    pub show_legend: bool,
    pub map_join: Option<(Vec<String>, Vec<String>)>,
    /// Variables supplied by the layer's own `data`
    pub own_vars: Vec<String>,
}

impl BoundLayer {
    pub fn variable(&self, aes: Aes) -> Option<&str> {
        self.bindings.get(&aes).map(String::as_str)
    }

    /// Variable behind a binding, looking through `as_discrete` copies
    pub fn source_variable(&self, aes: Aes) -> Option<&str> {
        self.discrete_sources
            .get(&aes)
            .or_else(|| self.bindings.get(&aes))
            .map(String::as_str)
    }

    pub fn is_as_discrete(&self, aes: Aes) -> bool {
        self.discrete_sources.contains_key(&aes)
    }

    pub fn order_option(&self, aes: Aes) -> Option<&OrderOption> {
        let var = self.source_variable(aes)?;
        self.order_options
            .iter()
            .find(|o| o.aes == aes && o.variable == var)
    }

    /// Bound, set as a constant, or defaulted by the geom
    pub fn provides(&self, aes: Aes) -> bool {
        self.bindings.contains_key(&aes)
            || self.constants.contains_key(&aes)
            || self.geom.default_constant(aes).is_some()
    }

    /// Variables that must survive in the layer data besides the bindings:
    /// the grouping variable, `order_by` targets, join keys and tooltip
    /// references.
    pub fn extra_variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |v: &str| {
            if !out.iter().any(|o| o == v) {
                out.push(v.to_string());
            }
        };
        if let Some(group) = &self.group {
            push(group);
        }
        for option in &self.order_options {
            if let Some(by) = &option.order_by {
                push(by);
            }
        }
        if let Some((keys, _)) = &self.map_join {
            keys.iter().for_each(|k| push(k));
        }
        for var in self.tooltips.variables() {
            push(&var);
        }
        out
    }

    /// Stat variables the layer refers to outside its bindings
    pub fn referenced_stat_vars(&self) -> Vec<String> {
        self.extra_variables()
            .into_iter()
            .filter(|v| is_stat_var(v))
            .collect()
    }
}

// =============================================================================
// Phase 2: Resolved model
// =============================================================================

/// One geometry layer ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeomLayer {
    pub index: usize,
    pub geom: GeomKind,
    pub stat: &'static str,
    pub position: Position,
    pub flipped: bool,
    pub data: DataFrame,
    pub bindings: IndexMap<Aes, String>,
    pub constants: IndexMap<Aes, Value>,
    pub group: Option<String>,
    /// Plot scale serving each bound aesthetic
    pub scales: IndexMap<Aes, Aes>,
    pub order_options: Vec<OrderOption>,
    /// `None` when tooltips are disabled
    pub tooltips: Option<ContextualMapping>,
    pub show_legend: bool,
}

/// A fully resolved plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotModel {
    /// Plot-level data reduced to what some layer reads from it
    pub data: DataFrame,
    pub layers: Vec<GeomLayer>,
    pub scales: IndexMap<Aes, Scale>,
    pub facet: PanelGrid,
    pub coord: CoordModel,
    pub labels: Labels,
    pub size: Option<(f64, f64)>,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedFigure {
    Plot(Box<PlotModel>),
    Subplots {
        figures: Vec<Option<ResolvedFigure>>,
        ncol: Option<usize>,
        nrow: Option<usize>,
    },
}

impl ResolvedFigure {
    pub fn as_plot(&self) -> Option<&PlotModel> {
        match self {
            ResolvedFigure::Plot(plot) => Some(plot),
            ResolvedFigure::Subplots { .. } => None,
        }
    }
}
