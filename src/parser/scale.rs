// Scale spec parsing

use super::aesthetics::Aes;
use super::ast::{MapperKind, ScaleSpec, TransformKind};
use super::options::Options;
use crate::data::Value;
use crate::error::{PlotError, Result};
use serde_json::Value as Json;

const SCALE_KEYS: &[&str] = &[
    "aesthetic",
    "name",
    "breaks",
    "labels",
    "limits",
    "trans",
    "discrete",
    "reverse",
    "format",
    "scale_mapper_kind",
    "palette",
    "values",
    "low",
    "mid",
    "high",
    "na_value",
    "range",
    "expand",
];

pub fn parse_transform(name: &str, path: &str) -> Result<TransformKind> {
    match name {
        "identity" => Ok(TransformKind::Identity),
        "log10" => Ok(TransformKind::Log10),
        "log2" => Ok(TransformKind::Log2),
        "sqrt" => Ok(TransformKind::Sqrt),
        "symlog" => Ok(TransformKind::Symlog),
        "reverse" => Ok(TransformKind::Reverse),
        _ => Err(PlotError::spec(path, format!("Unknown scale transform '{}'", name))),
    }
}

pub fn parse_mapper_kind(name: &str, path: &str) -> Result<MapperKind> {
    match name {
        "identity" => Ok(MapperKind::Identity),
        "color_gradient" => Ok(MapperKind::ColorGradient),
        "color_gradient2" => Ok(MapperKind::ColorGradient2),
        "color_hue" => Ok(MapperKind::ColorHue),
        "color_grey" => Ok(MapperKind::ColorGrey),
        "color_brewer" => Ok(MapperKind::ColorBrewer),
        "color_manual" => Ok(MapperKind::ColorManual),
        "size_area" => Ok(MapperKind::SizeArea),
        "discrete" => Ok(MapperKind::Discrete),
        _ => Err(PlotError::spec(path, format!("Unknown scale mapper kind '{}'", name))),
    }
}

/// Parse the `scales` list. A spec naming several aesthetics yields one
/// `ScaleSpec` per aesthetic.
pub fn parse_scales(value: &Json, path: &str) -> Result<Vec<ScaleSpec>> {
    let items = value
        .as_array()
        .ok_or_else(|| PlotError::spec(path, "Expected a list of scale specs"))?;
    let mut scales = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let opts = Options::new(item, &format!("{}[{}]", path, i))?;
        scales.extend(parse_scale(&opts)?);
    }
    Ok(scales)
}

fn parse_scale(opts: &Options) -> Result<Vec<ScaleSpec>> {
    opts.warn_unknown(SCALE_KEYS, |_| false);

    let aesthetics = opts
        .strings("aesthetic")?
        .ok_or_else(|| opts.error("aesthetic", "Scale spec requires an aesthetic"))?;

    let trans = match opts.string("trans")? {
        Some(name) => Some(parse_transform(&name, &opts.child_path("trans"))?),
        None => None,
    };
    let mapper_kind = match opts.string("scale_mapper_kind")? {
        Some(name) => Some(parse_mapper_kind(&name, &opts.child_path("scale_mapper_kind"))?),
        None => None,
    };
    let labels = match opts.values("labels")? {
        Some(values) => Some(values.iter().map(Value::to_string).collect()),
        None => None,
    };
    let range = match opts.numbers("range")?.as_deref() {
        None => None,
        Some([lo, hi]) => Some((*lo, *hi)),
        Some(_) => return Err(opts.error("range", "Expected a list of two numbers")),
    };
    let na_value = match opts.get("na_value") {
        Some(v) => Value::from_json(v),
        None => None,
    };
    let palette = match opts.get("palette") {
        None => None,
        Some(Json::String(s)) => Some(s.clone()),
        Some(Json::Number(n)) => Some(n.to_string()),
        Some(_) => return Err(opts.error("palette", "Expected a palette name")),
    };

    let base = ScaleSpec {
        aes: None,
        name: opts.string("name")?,
        breaks: opts.values("breaks")?,
        labels,
        limits: opts.values("limits")?,
        trans,
        discrete: opts.bool("discrete")?,
        reverse: opts.bool("reverse")?.unwrap_or(false),
        format: opts.string("format")?,
        mapper_kind,
        palette,
        values: opts.values("values")?,
        low: opts.string("low")?,
        mid: opts.string("mid")?,
        high: opts.string("high")?,
        na_value,
        range,
        expand: opts.numbers("expand")?,
    };

    aesthetics
        .iter()
        .map(|name| {
            let aes = Aes::from_name(name)
                .ok_or_else(|| opts.error("aesthetic", format!("Unknown aesthetic '{}'", name)))?;
            Ok(ScaleSpec { aes: Some(aes), ..base.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scale() {
        let scales = parse_scales(
            &json!([{"aesthetic": "x", "trans": "log10", "name": "Price", "breaks": [1, 10, 100]}]),
            "scales",
        )
        .unwrap();
        assert_eq!(scales.len(), 1);
        assert_eq!(scales[0].aes, Some(Aes::X));
        assert_eq!(scales[0].trans, Some(TransformKind::Log10));
        assert_eq!(scales[0].breaks.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_multiple_aesthetics() {
        let scales = parse_scales(
            &json!([{"aesthetic": ["color", "fill"], "scale_mapper_kind": "color_brewer", "palette": "Set1"}]),
            "scales",
        )
        .unwrap();
        assert_eq!(scales.len(), 2);
        assert_eq!(scales[1].aes, Some(Aes::Fill));
        assert_eq!(scales[1].mapper_kind, Some(MapperKind::ColorBrewer));
    }

    #[test]
    fn test_missing_aesthetic() {
        let err = parse_scales(&json!([{"name": "x"}]), "scales").unwrap_err();
        assert_eq!(err, PlotError::spec("scales[0].aesthetic", "Scale spec requires an aesthetic"));
    }

    #[test]
    fn test_unknown_transform() {
        assert!(parse_scales(&json!([{"aesthetic": "y", "trans": "exp"}]), "scales").is_err());
    }
}
