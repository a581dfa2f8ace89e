// Value formatting for scale labels and tooltip lines.
// Temporal values are epoch milliseconds (times of day: milliseconds since midnight).

use crate::data::{Value, VarKind};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res, opt},
    sequence::{preceded, tuple},
    IResult,
};
use std::fmt::{self, Write};

/// Text shown for missing values
pub const NA_TEXT: &str = "n/a";

const DEFAULT_SIGNIFICANT: usize = 6;

/// Turns typed values into display strings.
pub trait ValueFormatter: fmt::Debug + Send + Sync {
    /// Format `value` of a variable of `kind`, with an optional pattern.
    fn format(&self, value: &Value, kind: VarKind, pattern: Option<&str>) -> String;
}

/// Number specs (`d`, `.2f`, `,.0f`, `.1%`), strftime patterns and `{}` templates
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl ValueFormatter for DefaultFormatter {
    fn format(&self, value: &Value, kind: VarKind, pattern: Option<&str>) -> String {
        if value.is_null() {
            return NA_TEXT.to_string();
        }
        match pattern.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if p.contains('{') => format_template(value, kind, p),
            Some(p) => format_with(value, kind, p),
            None => format_plain(value, kind),
        }
    }
}

// =============================================================================
// Number specs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberType {
    Integer,
    Fixed,
    Exponent,
    General,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberSpec {
    comma: bool,
    precision: Option<usize>,
    ty: Option<NumberType>,
}

fn number_type(input: &str) -> IResult<&str, NumberType> {
    let (rest, c) = one_of("dfeg%")(input)?;
    let ty = match c {
        'd' => NumberType::Integer,
        'f' => NumberType::Fixed,
        'e' => NumberType::Exponent,
        'g' => NumberType::General,
        _ => NumberType::Percent,
    };
    Ok((rest, ty))
}

fn number_spec(input: &str) -> IResult<&str, NumberSpec> {
    let (rest, (comma, precision, ty)) = all_consuming(tuple((
        opt(char(',')),
        opt(preceded(char('.'), map_res(digit1, str::parse::<usize>))),
        opt(number_type),
    )))(input)?;
    Ok((
        rest,
        NumberSpec {
            comma: comma.is_some(),
            precision,
            ty,
        },
    ))
}

fn parse_number_spec(pattern: &str) -> Option<NumberSpec> {
    number_spec(pattern).ok().map(|(_, spec)| spec)
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let (int_part, frac_part) = match digits.find('.') {
        Some(i) => digits.split_at(i),
        None => (digits, ""),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, frac_part)
}

fn trim_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn format_exponent(n: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, n);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// `digits` significant digits, switching to exponent notation for very
/// large or very small magnitudes; trailing zeros are trimmed.
fn format_significant(n: f64, digits: usize) -> String {
    if n == 0.0 || !n.is_finite() {
        return format!("{}", n);
    }
    let digits = digits.max(1);
    let exp = n.abs().log10().floor() as i32;
    if !(-5..15).contains(&exp) {
        let s = format_exponent(n, digits - 1);
        return match s.split_once('e') {
            Some((mantissa, e)) => format!("{}e{}", trim_zeros(mantissa.to_string()), e),
            None => s,
        };
    }
    let decimals = (digits as i32 - 1 - exp).max(0) as usize;
    let s = trim_zeros(format!("{:.*}", decimals, n));
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

fn format_number(n: f64, spec: NumberSpec) -> String {
    if !n.is_finite() {
        return format!("{}", n);
    }
    let text = match spec.ty {
        Some(NumberType::Integer) => format!("{}", n.round() as i64),
        Some(NumberType::Fixed) => format!("{:.*}", spec.precision.unwrap_or(6), n),
        Some(NumberType::Exponent) => format_exponent(n, spec.precision.unwrap_or(6)),
        Some(NumberType::Percent) => {
            format!("{:.*}", spec.precision.unwrap_or(0), n * 100.0)
        }
        Some(NumberType::General) | None => {
            format_significant(n, spec.precision.unwrap_or(DEFAULT_SIGNIFICANT))
        }
    };
    let text = if spec.comma && !text.contains('e') {
        group_thousands(&text)
    } else {
        text
    };
    if spec.ty == Some(NumberType::Percent) {
        format!("{}%", text)
    } else {
        text
    }
}

// =============================================================================
// Temporal values
// =============================================================================

fn datetime_of(ms: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms.round() as i64).map(|dt| dt.naive_utc())
}

fn time_of(ms: f64) -> Option<NaiveTime> {
    let ms = ms.round() as i64;
    let secs = ms.div_euclid(1000).rem_euclid(86_400) as u32;
    let nanos = (ms.rem_euclid(1000) as u32) * 1_000_000;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

/// strftime rendering that falls back to `None` on malformed patterns
fn strftime<T: fmt::Display>(formatted: T) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}

fn format_temporal(ms: f64, kind: VarKind, pattern: Option<&str>) -> Option<String> {
    match kind {
        VarKind::Time => {
            let t = time_of(ms)?;
            let pattern = pattern.unwrap_or(if t.second() == 0 { "%H:%M" } else { "%H:%M:%S" });
            strftime(t.format(pattern))
        }
        _ => {
            let dt = datetime_of(ms)?;
            let pattern = pattern.unwrap_or_else(|| {
                if kind == VarKind::Date || dt.time() == NaiveTime::MIN {
                    "%Y-%m-%d"
                } else {
                    "%Y-%m-%d %H:%M:%S"
                }
            });
            strftime(dt.format(pattern))
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

fn format_plain(value: &Value, kind: VarKind) -> String {
    match value {
        Value::Num(n) if kind.is_temporal() => {
            format_temporal(*n, kind, None).unwrap_or_else(|| value.to_string())
        }
        Value::Num(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => value.to_string(),
        Value::Num(n) => format_significant(*n, DEFAULT_SIGNIFICANT),
        other => other.to_string(),
    }
}

fn format_with(value: &Value, kind: VarKind, pattern: &str) -> String {
    if let Value::Num(n) = value {
        if kind.is_temporal() || (pattern.contains('%') && parse_number_spec(pattern).is_none()) {
            if let Some(text) = format_temporal(*n, kind, Some(pattern)) {
                return text;
            }
        }
        if let Some(spec) = parse_number_spec(pattern) {
            return format_number(*n, spec);
        }
    }
    format_plain(value, kind)
}

/// Replace every `{spec}` in `template`; `{{`/`}}` are literal braces
fn format_template(value: &Value, kind: VarKind, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => match template[i + 1..].find('}') {
                Some(len) => {
                    let spec = &template[i + 1..i + 1 + len];
                    let text = if spec.trim().is_empty() {
                        format_plain(value, kind)
                    } else {
                        format_with(value, kind, spec.trim())
                    };
                    out.push_str(&text);
                    while let Some((j, _)) = chars.next() {
                        if j == i + 1 + len {
                            break;
                        }
                    }
                }
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Number of decimals needed to tell apart values spaced `step` apart
pub fn precision_for_step(step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 {
        return 0;
    }
    let decimals = (-step.log10() - 1e-9).ceil();
    if decimals <= 0.0 {
        return 0;
    }
    let d = decimals as usize;
    // 0.25 needs two decimals although its magnitude suggests one
    let scaled = step * 10f64.powi(d as i32);
    if (scaled - scaled.round()).abs() > 1e-9 {
        d + 1
    } else {
        d
    }
}
