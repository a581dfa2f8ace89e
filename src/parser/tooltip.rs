// Tooltip line patterns and tooltip options

use super::aesthetics::Aes;
use super::ast::{
    Anchor, FormatField, FormatSpec, LineLabel, LinePart, LinePattern, TooltipOptions, TooltipSpec,
};
use super::lexer::{identifier, word};
use super::options::Options;
use crate::error::{PlotError, Result};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take},
    character::complete::char,
    combinator::{all_consuming, map},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde_json::Value as Json;

#[derive(Debug, PartialEq)]
enum RawPart<'a> {
    Text(&'a str),
    Variable(&'a str),
    Aes(&'a str),
}

fn escaped(input: &str) -> IResult<&str, RawPart<'_>> {
    map(preceded(char('\\'), alt((tag("@"), tag("^")))), RawPart::Text)(input)
}

fn braced_variable(input: &str) -> IResult<&str, RawPart<'_>> {
    map(
        preceded(char('@'), delimited(char('{'), is_not("}"), char('}'))),
        RawPart::Variable,
    )(input)
}

fn variable(input: &str) -> IResult<&str, RawPart<'_>> {
    map(preceded(char('@'), identifier), RawPart::Variable)(input)
}

fn aes_ref(input: &str) -> IResult<&str, RawPart<'_>> {
    map(preceded(char('^'), word), RawPart::Aes)(input)
}

fn text(input: &str) -> IResult<&str, RawPart<'_>> {
    map(is_not("@^\\"), RawPart::Text)(input)
}

/// A special character that does not start a reference is plain text
fn stray(input: &str) -> IResult<&str, RawPart<'_>> {
    map(take(1usize), RawPart::Text)(input)
}

fn line_parts(input: &str) -> IResult<&str, Vec<RawPart<'_>>> {
    all_consuming(many0(alt((
        escaped,
        braced_variable,
        variable,
        aes_ref,
        text,
        stray,
    ))))(input)
}

/// Parse the value side of a line into parts, merging adjacent text
fn parse_parts(value: &str, path: &str) -> Result<Vec<LinePart>> {
    let (_, raw) = line_parts(value)
        .map_err(|e| PlotError::spec(path, format!("Invalid tooltip line '{}': {}", value, e)))?;

    let mut parts: Vec<LinePart> = Vec::new();
    for part in raw {
        let next = match part {
            RawPart::Text(t) => LinePart::Text(t.to_string()),
            RawPart::Variable(v) => LinePart::Variable(v.to_string()),
            RawPart::Aes(name) => LinePart::Aes(
                Aes::from_name(name)
                    .ok_or_else(|| PlotError::spec(path, format!("Unknown aesthetic '^{}'", name)))?,
            ),
        };
        match (parts.last_mut(), next) {
            (Some(LinePart::Text(prev)), LinePart::Text(t)) => prev.push_str(&t),
            (_, next) => parts.push(next),
        }
    }
    Ok(parts)
}

/// Parse one tooltip line: `[label|]value`
pub fn parse_line_pattern(line: &str, path: &str) -> Result<LinePattern> {
    let (label, value) = match line.split_once('|') {
        None => (LineLabel::Unspecified, line),
        Some((label, value)) => {
            let label = label.trim();
            let label = if label == "@" {
                LineLabel::Default
            } else {
                LineLabel::Text(label.to_string())
            };
            (label, value)
        }
    };
    Ok(LinePattern { label, parts: parse_parts(value, path)? })
}

/// Parse the `field` of a format spec: `^aes`, `^X`/`^Y`, `@var`, `@{var}` or a bare name
pub fn parse_format_field(field: &str, path: &str) -> Result<FormatField> {
    let field = field.trim();
    if let Some(name) = field.strip_prefix('^') {
        return match name {
            "X" => Ok(FormatField::AxisFamily(Aes::X)),
            "Y" => Ok(FormatField::AxisFamily(Aes::Y)),
            _ => Aes::from_name(name)
                .map(FormatField::Aes)
                .ok_or_else(|| PlotError::spec(path, format!("Unknown aesthetic '^{}'", name))),
        };
    }
    let name = field
        .strip_prefix("@{")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| field.strip_prefix('@'))
        .unwrap_or(field);
    if name.is_empty() {
        return Err(PlotError::spec(path, "Empty format field"));
    }
    Ok(FormatField::Variable(name.to_string()))
}

fn parse_anchor(name: &str, path: &str) -> Result<Anchor> {
    let anchor = match name {
        "top_left" => Anchor::TopLeft,
        "top_center" => Anchor::TopCenter,
        "top_right" => Anchor::TopRight,
        "middle_left" => Anchor::MiddleLeft,
        "middle_center" => Anchor::MiddleCenter,
        "middle_right" => Anchor::MiddleRight,
        "bottom_left" => Anchor::BottomLeft,
        "bottom_center" => Anchor::BottomCenter,
        "bottom_right" => Anchor::BottomRight,
        _ => return Err(PlotError::spec(path, format!("Unknown tooltip anchor '{}'", name))),
    };
    Ok(anchor)
}

const TOOLTIP_KEYS: &[&str] = &[
    "lines",
    "formats",
    "variables",
    "anchor",
    "min_width",
    "title",
    "color",
    "disable_splitting",
];

/// Parse a layer's `tooltips` value: `"none"` or an options object
pub fn parse_tooltips(value: &Json, path: &str) -> Result<TooltipSpec> {
    match value {
        Json::Null => Ok(TooltipSpec::Default),
        Json::String(s) if s == "none" => Ok(TooltipSpec::Hidden),
        Json::String(s) => Err(PlotError::spec(path, format!("Unknown tooltips value '{}'", s))),
        Json::Object(_) => {
            let opts = Options::new(value, path)?;
            opts.warn_unknown(TOOLTIP_KEYS, |_| false);
            parse_tooltip_options(&opts).map(TooltipSpec::Custom)
        }
        _ => Err(PlotError::spec(path, "Expected \"none\" or a tooltip options object")),
    }
}

fn parse_tooltip_options(opts: &Options) -> Result<TooltipOptions> {
    let mut lines: Option<Vec<LinePattern>> = None;

    // `variables` is shorthand for one `@|@var` line each, listed before `lines`
    if let Some(variables) = opts.strings("variables")? {
        let parsed = variables
            .iter()
            .map(|var| LinePattern {
                label: LineLabel::Default,
                parts: vec![LinePart::Variable(strip_at(var).to_string())],
            })
            .collect();
        lines = Some(parsed);
    }

    if let Some(raw) = opts.strings("lines")? {
        let path = opts.child_path("lines");
        let mut parsed = lines.take().unwrap_or_default();
        for (i, line) in raw.iter().enumerate() {
            parsed.push(parse_line_pattern(line, &format!("{}[{}]", path, i))?);
        }
        lines = Some(parsed);
    }

    let mut formats = Vec::new();
    if let Some(items) = opts.list("formats")? {
        for (i, item) in items.iter().enumerate() {
            let item_opts = Options::new(item, &format!("{}[{}]", opts.child_path("formats"), i))?;
            let field = item_opts
                .string("field")?
                .ok_or_else(|| item_opts.error("field", "Missing format field"))?;
            let format = item_opts
                .string("format")?
                .ok_or_else(|| item_opts.error("format", "Missing format pattern"))?;
            formats.push(FormatSpec {
                field: parse_format_field(&field, &item_opts.child_path("field"))?,
                format,
            });
        }
    }

    let anchor = match opts.string("anchor")? {
        Some(name) => Some(parse_anchor(&name, &opts.child_path("anchor"))?),
        None => None,
    };

    let title = match opts.string("title")? {
        Some(title) => Some(parse_line_pattern(&title, &opts.child_path("title"))?),
        None => None,
    };

    Ok(TooltipOptions {
        lines,
        formats,
        anchor,
        min_width: opts.f64("min_width")?,
        title,
        color: opts.string("color")?,
        disable_splitting: opts.bool("disable_splitting")?.unwrap_or(false),
    })
}

fn strip_at(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(line: &str) -> LinePattern {
        parse_line_pattern(line, "tooltips.lines[0]").unwrap()
    }

    #[test]
    fn test_single_variable() {
        let p = parse("@cty");
        assert_eq!(p.label, LineLabel::Unspecified);
        assert_eq!(p.parts, vec![LinePart::Variable("cty".to_string())]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(parse("@|@cty").label, LineLabel::Default);
        assert_eq!(parse("|@cty").label, LineLabel::Text(String::new()));
        assert_eq!(parse("city mpg|@cty").label, LineLabel::Text("city mpg".to_string()));
    }

    #[test]
    fn test_mixed_text_and_references() {
        let p = parse("@{model name} (^color) @..count..");
        assert_eq!(
            p.parts,
            vec![
                LinePart::Variable("model name".to_string()),
                LinePart::Text(" (".to_string()),
                LinePart::Aes(Aes::Color),
                LinePart::Text(") ".to_string()),
                LinePart::Variable("..count..".to_string()),
            ]
        );
    }

    #[test]
    fn test_escapes_merge_into_text() {
        let p = parse("mail\\@host \\^up");
        assert_eq!(p.parts, vec![LinePart::Text("mail@host ^up".to_string())]);
    }

    #[test]
    fn test_stray_at_is_text() {
        let p = parse("50 @ 3");
        assert_eq!(p.parts, vec![LinePart::Text("50 @ 3".to_string())]);
    }

    #[test]
    fn test_unknown_aes_is_error() {
        assert!(parse_line_pattern("^nope", "t").is_err());
    }

    #[test]
    fn test_format_fields() {
        assert_eq!(parse_format_field("^X", "f").unwrap(), FormatField::AxisFamily(Aes::X));
        assert_eq!(parse_format_field("^fill", "f").unwrap(), FormatField::Aes(Aes::Fill));
        assert_eq!(
            parse_format_field("@{a b}", "f").unwrap(),
            FormatField::Variable("a b".to_string())
        );
        assert_eq!(parse_format_field("cty", "f").unwrap(), FormatField::Variable("cty".to_string()));
    }

    #[test]
    fn test_parse_none() {
        assert_eq!(parse_tooltips(&json!("none"), "t").unwrap(), TooltipSpec::Hidden);
        assert_eq!(parse_tooltips(&Json::Null, "t").unwrap(), TooltipSpec::Default);
    }

    #[test]
    fn test_parse_options() {
        let spec = parse_tooltips(
            &json!({
                "variables": ["cty"],
                "lines": ["^x"],
                "formats": [{"field": "@cty", "format": ".1f"}],
                "anchor": "top_right",
                "disable_splitting": true
            }),
            "layers[0].tooltips",
        )
        .unwrap();
        match spec {
            TooltipSpec::Custom(opts) => {
                let lines = opts.lines.unwrap();
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0].label, LineLabel::Default);
                assert_eq!(opts.formats[0].format, ".1f");
                assert_eq!(opts.anchor, Some(Anchor::TopRight));
                assert!(opts.disable_splitting);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_anchor_reports_path() {
        let err = parse_tooltips(&json!({"anchor": "left"}), "layers[0].tooltips").unwrap_err();
        match err {
            PlotError::SpecStructure { path, .. } => assert_eq!(path, "layers[0].tooltips.anchor"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
