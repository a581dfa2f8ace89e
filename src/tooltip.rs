// Tooltip assembly for one layer

use crate::data::{DataFrame, Value, VarKind};
use crate::error::{PlotError, Result};
use crate::format::{ValueFormatter, NA_TEXT};
use crate::ir::BoundLayer;
use crate::parser::aesthetics::Aes;
use crate::parser::ast::{
    Anchor, FormatField, LineLabel, LinePart, LinePattern, TooltipOptions, TooltipSpec,
};
use crate::parser::geom::{GeomKind, TooltipSetup};
use crate::scale::{Domain, Scale};
use crate::theme_resolve::ThemeResolver;
use crate::ResolveContext;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Axis,
    General,
    Side,
}

/// Where a piece of a tooltip line gets its text from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueSource {
    Text { text: String },
    /// A column of the layer data, read per row
    Field {
        variable: String,
        kind: VarKind,
        format: Option<String>,
    },
    Constant { value: Value, format: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipLine {
    pub kind: LineKind,
    /// `None` shows the value alone
    pub label: Option<String>,
    pub parts: Vec<ValueSource>,
    /// Aesthetic the line was generated for, if any
    pub aes: Option<Aes>,
}

/// A tooltip line rendered for one data row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedLine {
    pub kind: LineKind,
    pub label: Option<String>,
    pub value: String,
}

/// Per-layer tooltip content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualMapping {
    pub lines: Vec<TooltipLine>,
    pub title: Option<TooltipLine>,
    pub anchor: Option<Anchor>,
    pub min_width: Option<f64>,
    pub color: Option<String>,
}

impl ContextualMapping {
    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &TooltipLine> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }

    pub fn lines_for_row(
        &self,
        data: &DataFrame,
        row: usize,
        formatter: &dyn ValueFormatter,
    ) -> Vec<RenderedLine> {
        self.lines
            .iter()
            .map(|line| RenderedLine {
                kind: line.kind,
                label: line.label.clone(),
                value: render_parts(&line.parts, data, row, formatter),
            })
            .collect()
    }

    pub fn title_for_row(
        &self,
        data: &DataFrame,
        row: usize,
        formatter: &dyn ValueFormatter,
    ) -> Option<String> {
        self.title
            .as_ref()
            .map(|t| render_parts(&t.parts, data, row, formatter))
    }
}

fn render_parts(
    parts: &[ValueSource],
    data: &DataFrame,
    row: usize,
    formatter: &dyn ValueFormatter,
) -> String {
    parts
        .iter()
        .map(|part| match part {
            ValueSource::Text { text } => text.clone(),
            ValueSource::Field {
                variable,
                kind,
                format,
            } => data
                .column(variable)
                .and_then(|c| c.values.get(row))
                .map(|v| formatter.format(v, *kind, format.as_deref()))
                .unwrap_or_else(|| NA_TEXT.to_string()),
            ValueSource::Constant { value, format } => {
                let kind = match value {
                    Value::Num(_) => VarKind::Continuous,
                    _ => VarKind::Discrete,
                };
                formatter.format(value, kind, format.as_deref())
            }
        })
        .collect()
}

/// Variable name as shown to the reader, `..count..` becomes `count`
pub fn display_name(variable: &str) -> &str {
    if crate::data::is_stat_var(variable) {
        &variable[2..variable.len() - 2]
    } else {
        variable
    }
}

/// Build the contextual mapping of one layer; `None` when the layer shows no tooltip
pub fn assemble(
    layer: &BoundLayer,
    spec: &TooltipSpec,
    theme: &ThemeResolver<'_>,
    scales: &IndexMap<Aes, Scale>,
    ctx: &ResolveContext,
) -> Result<Option<ContextualMapping>> {
    let default_options = TooltipOptions::default();
    let options = match spec {
        TooltipSpec::Hidden => return Ok(None),
        TooltipSpec::Default => &default_options,
        TooltipSpec::Custom(options) => options,
    };
    if layer.geom.tooltip_setup() == TooltipSetup::NoTooltips {
        return Ok(None);
    }

    let assembler = Assembler {
        layer,
        options,
        scales,
    };
    let mapping = assembler.build(theme, ctx.options.min_factors_to_show_tooltips)?;
    debug!(
        "Layer {} tooltip: {} axis, {} general, {} side lines",
        layer.index,
        mapping.lines_of(LineKind::Axis).count(),
        mapping.lines_of(LineKind::General).count(),
        mapping.lines_of(LineKind::Side).count()
    );
    Ok(Some(mapping))
}

struct Assembler<'a> {
    layer: &'a BoundLayer,
    options: &'a TooltipOptions,
    scales: &'a IndexMap<Aes, Scale>,
}

impl<'a> Assembler<'a> {
    fn orient(&self, aes: impl IntoIterator<Item = Aes>) -> Vec<Aes> {
        aes.into_iter()
            .map(|a| if self.layer.flipped { a.flipped() } else { a })
            .collect()
    }

    fn scale(&self, aes: Aes) -> Option<&Scale> {
        self.scales.get(&aes.scale_aes())
    }

    fn is_continuous(&self, aes: Aes) -> bool {
        self.scale(aes).map(|s| !s.discrete).unwrap_or(false)
    }

    /// Axes reported by the tooltip setup, before theme filtering
    fn function_axes(&self) -> Vec<Aes> {
        let geom = self.layer.geom;
        if geom == GeomKind::Errorbar {
            let defines = |a: Aes| self.layer.provides(a);
            return if defines(Aes::Ymin) && defines(Aes::Ymax) {
                vec![Aes::X]
            } else if defines(Aes::Xmin) && defines(Aes::Xmax) {
                vec![Aes::Y]
            } else {
                Vec::new()
            };
        }
        let axes = match geom.tooltip_setup() {
            TooltipSetup::XUnivariate => vec![Aes::X],
            TooltipSetup::Bivariate => vec![Aes::X, Aes::Y],
            TooltipSetup::NoTooltips => Vec::new(),
        };
        self.orient(axes)
    }

    fn hidden_aes(&self, function_axes: &[Aes]) -> Vec<Aes> {
        let geom = self.layer.geom;
        match geom {
            GeomKind::Errorbar => match function_axes {
                [Aes::X] => vec![Aes::Y],
                [Aes::Y] => vec![Aes::X],
                _ => Vec::new(),
            },
            GeomKind::Text | GeomKind::Label => {
                let custom = self.options.lines.as_ref().is_some_and(|l| !l.is_empty());
                geom.renders()
                    .iter()
                    .copied()
                    .filter(|a| !(custom && function_axes.contains(a)))
                    .collect()
            }
            _ => self.orient(geom.hidden_tooltip_aes().iter().copied()),
        }
    }

    fn build(&self, theme: &ThemeResolver<'_>, min_factors: usize) -> Result<ContextualMapping> {
        let function_axes = self.function_axes();
        let mut hidden = self.hidden_aes(&function_axes);
        for axis in [Aes::X, Aes::Y] {
            if !theme.axis_tooltip_shown(axis) {
                hidden.push(axis);
            }
        }

        let axis_aes: Vec<Aes> = function_axes
            .iter()
            .copied()
            .filter(|a| !hidden.contains(a) && theme.axis_labels_shown(*a))
            .collect();
        let side_aes: Vec<Aes> = self
            .orient(self.layer.geom.side_tooltip_aes().iter().copied())
            .into_iter()
            .filter(|a| self.layer.variable(*a).is_some())
            .collect();

        let mut lines: Vec<TooltipLine> = axis_aes
            .iter()
            .filter_map(|aes| self.axis_line(*aes))
            .collect();

        let split = !self.options.disable_splitting;
        match &self.options.lines {
            Some(patterns) => {
                for (i, pattern) in patterns.iter().enumerate() {
                    lines.push(self.pattern_line(pattern, LineKind::General, i)?);
                }
            }
            None => {
                let general = self.default_general_aes(&axis_aes, &hidden, min_factors);
                let merged_side: &[Aes] = if split { &[] } else { &side_aes };
                let mut general_lines: Vec<TooltipLine> = general
                    .iter()
                    .filter(|a| !side_aes.contains(a))
                    .chain(merged_side)
                    .filter_map(|aes| self.aes_line(*aes, LineKind::General, true))
                    .collect();
                general_lines.extend(self.constant_lines());
                if general_lines.len() == 1 {
                    general_lines[0].label = None;
                }
                lines.extend(general_lines);
            }
        }
        if split {
            lines.extend(
                side_aes
                    .iter()
                    .filter_map(|aes| self.aes_line(*aes, LineKind::Side, false)),
            );
        }

        let title = match &self.options.title {
            Some(pattern) => {
                let mut line = self.pattern_line(pattern, LineKind::General, 0)?;
                line.label = None;
                Some(line)
            }
            None => None,
        };

        Ok(ContextualMapping {
            lines,
            title,
            anchor: self.options.anchor,
            min_width: self.options.min_width,
            color: self.options.color.clone(),
        })
    }

    /// Aesthetics listed in the default general tooltip, deduplicated by variable
    fn default_general_aes(
        &self,
        axis_aes: &[Aes],
        hidden: &[Aes],
        min_factors: usize,
    ) -> Vec<Aes> {
        let axis_vars: Vec<&str> = axis_aes
            .iter()
            .filter_map(|a| self.layer.variable(*a))
            .collect();
        let rendered = self.orient(self.layer.geom.renders().iter().copied());

        let mut shown: IndexMap<&str, Aes> = IndexMap::new();
        for aes in rendered {
            if axis_aes.contains(&aes) || hidden.contains(&aes) {
                continue;
            }
            let Some(var) = self.layer.variable(aes) else {
                continue;
            };
            if axis_vars.contains(&var) || !self.informative(aes, min_factors) {
                continue;
            }
            match shown.get(var) {
                None => {
                    shown.insert(var, aes);
                }
                Some(prev) if !self.is_continuous(*prev) && self.is_continuous(aes) => {
                    shown.insert(var, aes);
                }
                Some(_) => {}
            }
        }
        shown.into_values().collect()
    }

    /// Continuous aesthetics always qualify; discrete ones need enough levels
    fn informative(&self, aes: Aes, min_factors: usize) -> bool {
        match self.scale(aes) {
            Some(scale) if !scale.discrete => true,
            Some(scale) => match &scale.domain {
                Domain::Discrete { values } => values.len() >= min_factors,
                Domain::Continuous { .. } => true,
            },
            None => false,
        }
    }

    fn axis_line(&self, aes: Aes) -> Option<TooltipLine> {
        let variable = self.layer.variable(aes)?;
        Some(TooltipLine {
            kind: LineKind::Axis,
            label: None,
            parts: vec![self.field(variable, Some(aes))],
            aes: Some(aes),
        })
    }

    fn aes_line(&self, aes: Aes, kind: LineKind, labelled: bool) -> Option<TooltipLine> {
        let variable = self.layer.variable(aes)?;
        let label = labelled.then(|| self.aes_label(aes, variable));
        Some(TooltipLine {
            kind,
            label,
            parts: vec![self.field(variable, Some(aes))],
            aes: Some(aes),
        })
    }

    /// Positional constants of reference lines (`yintercept: 3`)
    fn constant_lines(&self) -> Vec<TooltipLine> {
        if !matches!(self.layer.geom, GeomKind::Hline | GeomKind::Vline) {
            return Vec::new();
        }
        self.layer
            .constants
            .iter()
            .filter(|(aes, _)| aes.is_positional())
            .map(|(aes, value)| TooltipLine {
                kind: LineKind::General,
                label: Some(aes.to_string()),
                parts: vec![ValueSource::Constant {
                    value: value.clone(),
                    format: self.explicit_aes_format(*aes),
                }],
                aes: Some(*aes),
            })
            .collect()
    }

    fn aes_label(&self, aes: Aes, variable: &str) -> String {
        let name = self
            .layer
            .scale_names
            .get(&aes)
            .map(String::as_str)
            .or_else(|| self.scale(aes).and_then(|s| s.name.as_deref()))
            .unwrap_or(variable);
        display_name(name).to_string()
    }

    fn pattern_line(
        &self,
        pattern: &LinePattern,
        kind: LineKind,
        index: usize,
    ) -> Result<TooltipLine> {
        let mut parts = Vec::with_capacity(pattern.parts.len());
        for part in &pattern.parts {
            parts.push(match part {
                LinePart::Text(text) => ValueSource::Text { text: text.clone() },
                LinePart::Variable(var) => {
                    if !self.layer.data.has(var) {
                        return Err(PlotError::Binding(format!(
                            "Tooltip line {} refers to undefined variable '@{}'",
                            index, var
                        )));
                    }
                    self.field(var, None)
                }
                LinePart::Aes(aes) => self.aes_source(*aes, index)?,
            });
        }

        let default_label = || match pattern.single_value() {
            Some(LinePart::Variable(var)) => Some(display_name(var).to_string()),
            Some(LinePart::Aes(aes)) => Some(match self.layer.variable(*aes) {
                Some(var) => self.aes_label(*aes, var),
                None => aes.to_string(),
            }),
            _ => None,
        };
        let label = match &pattern.label {
            LineLabel::Text(text) if text.is_empty() => None,
            LineLabel::Text(text) => Some(text.clone()),
            LineLabel::Default | LineLabel::Unspecified => default_label(),
        };

        Ok(TooltipLine {
            kind,
            label,
            parts,
            aes: None,
        })
    }

    /// `^aes` reads the bound column, or the layer constant
    fn aes_source(&self, aes: Aes, index: usize) -> Result<ValueSource> {
        if let Some(var) = self.layer.variable(aes) {
            return Ok(self.field(var, Some(aes)));
        }
        let constant = self
            .layer
            .constants
            .get(&aes)
            .cloned()
            .or_else(|| self.layer.geom.default_constant(aes).map(Value::Num));
        match constant {
            Some(value) => Ok(ValueSource::Constant {
                value,
                format: self.explicit_aes_format(aes),
            }),
            None => Err(PlotError::Binding(format!(
                "Tooltip line {} refers to '^{}' which is not mapped",
                index, aes
            ))),
        }
    }

    fn field(&self, variable: &str, aes: Option<Aes>) -> ValueSource {
        let column = self.layer.data.column(variable);
        ValueSource::Field {
            variable: variable.to_string(),
            kind: column.map(|c| c.kind).unwrap_or(VarKind::Continuous),
            format: self
                .format_for(variable, aes)
                .or_else(|| column.and_then(|c| c.format.clone())),
        }
    }

    fn explicit_aes_format(&self, aes: Aes) -> Option<String> {
        let formats = &self.options.formats;
        formats
            .iter()
            .find(|f| f.field == FormatField::Aes(aes))
            .or_else(|| {
                let axis = aes.axis()?;
                formats.iter().find(|f| f.field == FormatField::AxisFamily(axis))
            })
            .map(|f| f.format.clone())
    }

    /// Explicit variable format, then the aesthetic's own format, then the
    /// alphabetically first aesthetic bound to the variable
    fn format_for(&self, variable: &str, aes: Option<Aes>) -> Option<String> {
        let by_variable = self
            .options
            .formats
            .iter()
            .find(|f| matches!(&f.field, FormatField::Variable(v) if v == variable));
        if let Some(spec) = by_variable {
            return Some(spec.format.clone());
        }
        if let Some(aes) = aes {
            return self
                .explicit_aes_format(aes)
                .or_else(|| self.scale(aes).and_then(|s| s.format.clone()));
        }

        let mut bound: Vec<Aes> = self
            .layer
            .bindings
            .iter()
            .filter(|(_, v)| v.as_str() == variable)
            .map(|(a, _)| *a)
            .collect();
        bound.sort_by_key(|a| a.name());
        if let Some(format) = bound.iter().find_map(|a| self.explicit_aes_format(*a)) {
            return Some(format);
        }
        bound
            .first()
            .and_then(|a| self.scale(*a))
            .and_then(|s| s.format.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DefaultFormatter;
    use crate::parser::normalize_plot;
    use crate::resolve::bind_layer;
    use crate::scale::build_scales;
    use crate::transform::apply_stat;
    use serde_json::json;

    fn make_layers(spec: &serde_json::Value) -> (Vec<BoundLayer>, IndexMap<Aes, Scale>, crate::parser::ast::ThemeSpec) {
        let ctx = ResolveContext::default();
        let plot = normalize_plot(spec).unwrap();
        let layers: Vec<BoundLayer> = plot
            .layers
            .iter()
            .map(|l| apply_stat(bind_layer(&plot, l, &ctx).unwrap(), &[], &ctx).unwrap())
            .collect();
        let scales = build_scales(&layers, &plot.scales, &ctx).unwrap();
        (layers, scales, plot.theme)
    }

    fn make_mapping(spec: serde_json::Value) -> Result<Option<ContextualMapping>> {
        let ctx = ResolveContext::default();
        let (layers, scales, theme) = make_layers(&spec);
        let layer = &layers[0];
        assemble(layer, &layer.tooltips, &ThemeResolver::new(&theme), &scales, &ctx)
    }

    fn general_rows(mapping: &ContextualMapping, data: &DataFrame, row: usize) -> Vec<(Option<String>, String)> {
        mapping
            .lines_for_row(data, row, &DefaultFormatter)
            .into_iter()
            .filter(|l| l.kind == LineKind::General)
            .map(|l| (l.label, l.value))
            .collect()
    }

    fn tips_spec() -> serde_json::Value {
        json!({
            "data": {"time": ["Lunch", "Lunch", "Dinner", "Dinner", "Dinner"]},
            "layers": [{"geom": "bar", "mapping": {"x": "time"}}]
        })
    }

    #[test]
    fn test_bar_count_single_unlabelled_line() {
        let (layers, _, _) = make_layers(&tips_spec());
        let mapping = make_mapping(tips_spec()).unwrap().unwrap();
        let general: Vec<&TooltipLine> = mapping.lines_of(LineKind::General).collect();
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].label, None);
        assert_eq!(general_rows(&mapping, &layers[0].data, 1), vec![(None, "3".to_string())]);
        assert_eq!(mapping.lines_of(LineKind::Axis).count(), 1);
    }

    #[test]
    fn test_fill_on_axis_variable_is_not_repeated() {
        let spec = json!({
            "data": {"time": ["Lunch", "Lunch", "Dinner", "Dinner", "Dinner"]},
            "layers": [{"geom": "bar", "mapping": {"x": "time", "fill": "time"}}]
        });
        let mapping = make_mapping(spec).unwrap().unwrap();
        let general: Vec<&TooltipLine> = mapping.lines_of(LineKind::General).collect();
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].aes, Some(Aes::Y));
    }

    #[test]
    fn test_point_axes_and_labelled_lines() {
        let spec = json!({
            "data": {"a": [1, 2, 3], "b": [4, 5, 6], "c": [0.5, 1.5, 2.5], "d": [7, 8, 9]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b", "color": "c", "size": "d"}}]
        });
        let mapping = make_mapping(spec).unwrap().unwrap();
        let axes: Vec<Option<Aes>> = mapping.lines_of(LineKind::Axis).map(|l| l.aes).collect();
        assert_eq!(axes, vec![Some(Aes::X), Some(Aes::Y)]);
        let labels: Vec<Option<String>> = mapping.lines_of(LineKind::General).map(|l| l.label.clone()).collect();
        assert_eq!(labels, vec![Some("d".to_string()), Some("c".to_string())]);
    }

    #[test]
    fn test_discrete_needs_enough_factors() {
        let few = json!({
            "data": {"a": [1, 2, 3], "b": [4, 5, 6], "g": ["p", "q", "r"]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b", "color": "g"}}]
        });
        let mapping = make_mapping(few).unwrap().unwrap();
        assert_eq!(mapping.lines_of(LineKind::General).count(), 0);

        let many = json!({
            "data": {"a": [1, 2, 3, 4, 5], "b": [1, 2, 3, 4, 5], "g": ["p", "q", "r", "s", "t"]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b", "color": "g"}}]
        });
        let mapping = make_mapping(many).unwrap().unwrap();
        assert_eq!(mapping.lines_of(LineKind::General).count(), 1);
    }

    #[test]
    fn test_hidden_tooltips() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b"}, "tooltips": "none"}]
        });
        assert_eq!(make_mapping(spec).unwrap(), None);
    }

    #[test]
    fn test_theme_blanks_axis_tooltip() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b"}}],
            "theme": {"axis_tooltip_y": "blank"}
        });
        let mapping = make_mapping(spec).unwrap().unwrap();
        let axes: Vec<Option<Aes>> = mapping.lines_of(LineKind::Axis).map(|l| l.aes).collect();
        assert_eq!(axes, vec![Some(Aes::X)]);
    }

    #[test]
    fn test_custom_lines_and_labels() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4], "model name": ["m1", "m2"]},
            "layers": [{
                "geom": "point",
                "mapping": {"x": "a", "y": "b"},
                "tooltips": {
                    "lines": ["@{model name}", "Value|^y", "|@a", "@a and @b"],
                    "formats": [{"field": "^y", "format": ".1f"}]
                }
            }]
        });
        let (layers, _, _) = make_layers(&spec);
        let mapping = make_mapping(spec).unwrap().unwrap();
        assert_eq!(
            general_rows(&mapping, &layers[0].data, 0),
            vec![
                (Some("model name".to_string()), "m1".to_string()),
                (Some("Value".to_string()), "3.0".to_string()),
                (None, "1".to_string()),
                // `b` has no format of its own and borrows the `^y` format it is mapped to
                (None, "1 and 3.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_undefined_variable_in_line() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b"},
                        "tooltips": {"lines": ["^color"]}}]
        });
        assert!(matches!(make_mapping(spec), Err(PlotError::Binding(_))));
    }

    #[test]
    fn test_boxplot_side_lines_and_splitting() {
        let spec = json!({
            "data": {"g": ["a", "a", "a", "b", "b", "b"], "v": [1, 2, 3, 4, 5, 6]},
            "layers": [{"geom": "boxplot", "mapping": {"x": "g", "y": "v"}}]
        });
        let mapping = make_mapping(spec).unwrap().unwrap();
        assert_eq!(mapping.lines_of(LineKind::Side).count(), 5);
        assert_eq!(mapping.lines_of(LineKind::General).count(), 0);

        let merged = json!({
            "data": {"g": ["a", "a", "a", "b", "b", "b"], "v": [1, 2, 3, 4, 5, 6]},
            "layers": [{"geom": "boxplot", "mapping": {"x": "g", "y": "v"},
                        "tooltips": {"disable_splitting": true}}]
        });
        let mapping = make_mapping(merged).unwrap().unwrap();
        assert_eq!(mapping.lines_of(LineKind::Side).count(), 0);
        assert_eq!(mapping.lines_of(LineKind::General).count(), 5);

        let custom = json!({
            "data": {"g": ["a", "a", "a", "b", "b", "b"], "v": [1, 2, 3, 4, 5, 6]},
            "layers": [{"geom": "boxplot", "mapping": {"x": "g", "y": "v"},
                        "tooltips": {"disable_splitting": true, "lines": ["@g"]}}]
        });
        let mapping = make_mapping(custom).unwrap().unwrap();
        assert_eq!(mapping.lines_of(LineKind::Side).count(), 0);
        assert_eq!(mapping.lines_of(LineKind::General).count(), 1);
    }

    #[test]
    fn test_alphabetically_first_aes_format_wins() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4], "v": [0.25, 0.5]},
            "layers": [{
                "geom": "point",
                "mapping": {"x": "a", "y": "b", "size": "v", "color": "v"},
                "tooltips": {
                    "lines": ["@v"],
                    "formats": [{"field": "^size", "format": ".2f"}, {"field": "^color", "format": ".0%"}]
                }
            }]
        });
        let (layers, _, _) = make_layers(&spec);
        let mapping = make_mapping(spec).unwrap().unwrap();
        assert_eq!(
            general_rows(&mapping, &layers[0].data, 0),
            vec![(Some("v".to_string()), "25%".to_string())]
        );
    }

    #[test]
    fn test_title_anchor_and_min_width() {
        let spec = json!({
            "data": {"a": [1, 2], "b": [3, 4], "name": ["p", "q"]},
            "layers": [{"geom": "point", "mapping": {"x": "a", "y": "b"},
                        "tooltips": {"title": "Item @name", "anchor": "top_right", "min_width": 120}}]
        });
        let (layers, _, _) = make_layers(&spec);
        let mapping = make_mapping(spec).unwrap().unwrap();
        assert_eq!(mapping.anchor, Some(Anchor::TopRight));
        assert_eq!(mapping.min_width, Some(120.0));
        assert_eq!(
            mapping.title_for_row(&layers[0].data, 1, &DefaultFormatter),
            Some("Item q".to_string())
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("..count.."), "count");
        assert_eq!(display_name("count"), "count");
    }
}
