//! Theme Resolution Engine
//!
//! Answers "is this element blank?" for hierarchical theme elements.
//! A child element set explicitly wins; otherwise it inherits from its parents.
//!
//! Inheritance hierarchy:
//! ```text
//! axis ─┬─ axis_x ─┐
//!       │          ├── axis_text_x, axis_tooltip_x, axis_line_x, ...
//!       └─ axis_text / axis_tooltip / axis_line / axis_ticks / axis_title
//!
//! text ── axis_text, axis_title, plot_title, legend_text
//! line ── axis_line, axis_ticks, panel_grid ── panel_grid_major / panel_grid_minor
//! ```

use crate::parser::aesthetics::Aes;
use crate::parser::ast::{ThemeElement, ThemeSpec};

/// Elements blanked by the decoration-free base themes
const VOID_BLANKS: &[&str] = &["axis", "panel_grid", "panel_border", "panel_background"];

/// Direct parents of a theme element key
fn parents(key: &str) -> Vec<String> {
    if let Some(base) = key.strip_suffix("_x").or_else(|| key.strip_suffix("_y")) {
        let axis_side = if key.ends_with("_x") { "axis_x" } else { "axis_y" };
        let mut out = vec![base.to_string()];
        if base.starts_with("axis_") {
            out.push(axis_side.to_string());
        } else if base == "axis" {
            out.clear();
            out.push("axis".to_string());
        }
        return out;
    }
    let out: &[&str] = match key {
        "axis_text" => &["axis", "text"],
        "axis_title" => &["axis", "title"],
        "axis_line" | "axis_ticks" => &["axis", "line"],
        "axis_tooltip" => &["axis"],
        "panel_grid_major" | "panel_grid_minor" => &["panel_grid"],
        "panel_grid" => &["line"],
        "plot_title" | "plot_subtitle" | "plot_caption" => &["title"],
        "title" | "legend_text" | "legend_title" => &["text"],
        _ => &[],
    };
    out.iter().map(|s| s.to_string()).collect()
}

/// Read-only view of a theme with inheritance applied
#[derive(Debug, Clone, Copy)]
pub struct ThemeResolver<'a> {
    spec: &'a ThemeSpec,
}

impl<'a> ThemeResolver<'a> {
    pub fn new(spec: &'a ThemeSpec) -> Self {
        Self { spec }
    }

    fn is_void(&self) -> bool {
        matches!(self.spec.name.as_deref(), Some("void") | Some("none"))
    }

    /// True when `key` or the nearest explicitly set ancestor is blank
    pub fn is_blank(&self, key: &str) -> bool {
        match self.spec.elements.get(key) {
            Some(ThemeElement::Blank) => return true,
            Some(ThemeElement::Element(_)) => return false,
            None => {}
        }
        if self.is_void() && VOID_BLANKS.contains(&key) {
            return true;
        }
        parents(key).iter().any(|p| self.is_blank(p))
    }

    fn axis_suffix(axis: Aes) -> &'static str {
        match axis.axis() {
            Some(Aes::Y) => "y",
            _ => "x",
        }
    }

    /// The axis tooltip element of the axis serving `axis` is not blank
    pub fn axis_tooltip_shown(&self, axis: Aes) -> bool {
        !self.is_blank(&format!("axis_tooltip_{}", Self::axis_suffix(axis)))
    }

    /// Tick labels of the axis serving `axis` are drawn
    pub fn axis_labels_shown(&self, axis: Aes) -> bool {
        !self.is_blank(&format!("axis_text_{}", Self::axis_suffix(axis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::theme::parse_theme;
    use serde_json::json;

    fn make_theme(value: serde_json::Value) -> ThemeSpec {
        parse_theme(&value, "theme").unwrap()
    }

    #[test]
    fn test_default_theme_shows_everything() {
        let spec = ThemeSpec::default();
        let theme = ThemeResolver::new(&spec);
        assert!(!theme.is_blank("axis_text_x"));
        assert!(theme.axis_tooltip_shown(Aes::X));
        assert!(theme.axis_labels_shown(Aes::Ymax));
    }

    #[test]
    fn test_blank_inherited_from_parent() {
        let spec = make_theme(json!({"axis_text": "blank"}));
        let theme = ThemeResolver::new(&spec);
        assert!(theme.is_blank("axis_text_x"));
        assert!(theme.is_blank("axis_text_y"));
        assert!(!theme.axis_labels_shown(Aes::Y));
        assert!(theme.axis_tooltip_shown(Aes::Y));
        assert!(!theme.is_blank("axis_line_x"));
    }

    #[test]
    fn test_single_axis_blank() {
        let spec = make_theme(json!({"axis_tooltip_y": "blank"}));
        let theme = ThemeResolver::new(&spec);
        assert!(theme.axis_tooltip_shown(Aes::X));
        assert!(!theme.axis_tooltip_shown(Aes::Ymin));
    }

    #[test]
    fn test_explicit_child_overrides_blank_parent() {
        let spec = make_theme(json!({"axis": "blank", "axis_text_x": {"color": "red"}}));
        let theme = ThemeResolver::new(&spec);
        assert!(!theme.is_blank("axis_text_x"));
        assert!(theme.is_blank("axis_text_y"));
        assert!(theme.is_blank("axis_tooltip_x"));
    }

    #[test]
    fn test_void_base_theme() {
        let spec = make_theme(json!({"name": "void"}));
        let theme = ThemeResolver::new(&spec);
        assert!(theme.is_blank("axis_text_x"));
        assert!(theme.is_blank("panel_grid_minor"));
        assert!(!theme.axis_tooltip_shown(Aes::X));
        assert!(!theme.axis_labels_shown(Aes::X));
        assert!(!theme.is_blank("plot_title"));
    }

    #[test]
    fn test_text_root_blank() {
        let spec = make_theme(json!({"text": "blank"}));
        let theme = ThemeResolver::new(&spec);
        assert!(theme.is_blank("plot_title"));
        assert!(theme.is_blank("axis_text_y"));
    }
}
