// Theme spec parsing

use super::ast::{ThemeElement, ThemeSpec};
use super::options::Options;
use crate::error::Result;
use serde_json::{Map, Value as Json};

/// Known named base themes
pub const THEME_NAMES: &[&str] = &["grey", "light", "classic", "minimal", "minimal2", "bw", "none", "void"];

/// `"blank"`, `{"blank": true}` or `{"name": "blank"}` mark an element as blank;
/// any other object is kept as element properties.
fn parse_element(value: &Json) -> ThemeElement {
    match value {
        Json::String(s) if s == "blank" => ThemeElement::Blank,
        Json::Object(map) => {
            let blank = map.get("blank").and_then(Json::as_bool).unwrap_or(false)
                || map.get("name").and_then(Json::as_str) == Some("blank");
            if blank {
                ThemeElement::Blank
            } else {
                ThemeElement::Element(map.clone())
            }
        }
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            ThemeElement::Element(map)
        }
    }
}

pub fn parse_theme(value: &Json, path: &str) -> Result<ThemeSpec> {
    let opts = Options::new(value, path)?;
    let name = opts.string("name")?;
    if let Some(name) = &name {
        if !THEME_NAMES.contains(&name.as_str()) {
            return Err(opts.error("name", format!("Unknown theme '{}'", name)));
        }
    }
    let elements = opts
        .keys()
        .filter(|key| key.as_str() != "name")
        .filter_map(|key| opts.get(key).map(|v| (key.clone(), parse_element(v))))
        .collect();
    Ok(ThemeSpec { name, elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_forms() {
        let theme = parse_theme(
            &json!({
                "name": "minimal",
                "axis_tooltip": "blank",
                "axis_text_x": {"blank": true},
                "axis_line": {"name": "blank"},
                "axis_title": {"color": "red"}
            }),
            "theme",
        )
        .unwrap();
        assert_eq!(theme.name.as_deref(), Some("minimal"));
        assert_eq!(theme.elements["axis_tooltip"], ThemeElement::Blank);
        assert_eq!(theme.elements["axis_text_x"], ThemeElement::Blank);
        assert_eq!(theme.elements["axis_line"], ThemeElement::Blank);
        assert!(matches!(theme.elements["axis_title"], ThemeElement::Element(_)));
    }

    #[test]
    fn test_unknown_theme_name() {
        assert!(parse_theme(&json!({"name": "fancy"}), "theme").is_err());
    }
}
