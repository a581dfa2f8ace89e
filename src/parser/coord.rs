// Coordinate system parsing

use super::aesthetics::Aes;
use super::ast::{CoordKind, CoordSpec};
use super::options::Options;
use crate::error::Result;
use serde_json::Value as Json;

const COORD_KEYS: &[&str] = &[
    "name",
    "xlim",
    "ylim",
    "ratio",
    "flip",
    "theta",
    "start",
    "direction",
    "projection",
];

/// `[lo, hi]` where either end may be null
fn parse_limits(opts: &Options, key: &str) -> Result<Option<(Option<f64>, Option<f64>)>> {
    match opts.list(key)? {
        None => Ok(None),
        Some(items) if items.len() == 2 => {
            let end = |v: &Json| match v {
                Json::Null => Ok(None),
                Json::Number(n) => Ok(n.as_f64()),
                _ => Err(opts.error(key, "Limits must be numbers or null")),
            };
            Ok(Some((end(&items[0])?, end(&items[1])?)))
        }
        Some(_) => Err(opts.error(key, "Expected a list of two limits")),
    }
}

pub fn parse_coord(value: &Json, path: &str) -> Result<CoordSpec> {
    let opts = Options::new(value, path)?;
    opts.warn_unknown(COORD_KEYS, |_| false);

    let kind = match opts.string("name")?.as_deref() {
        None | Some("cartesian") => CoordKind::Cartesian,
        Some("fixed") => CoordKind::Fixed,
        Some("flip") => CoordKind::Flip,
        Some("polar") => CoordKind::Polar,
        Some("map") | Some("quickmap") => CoordKind::Map,
        Some(other) => return Err(opts.error("name", format!("Unknown coordinate system '{}'", other))),
    };

    let theta = match opts.string("theta")?.as_deref() {
        None => None,
        Some("x") => Some(Aes::X),
        Some("y") => Some(Aes::Y),
        Some(other) => return Err(opts.error("theta", format!("theta must be 'x' or 'y', got '{}'", other))),
    };

    let direction = match opts.i32("direction")? {
        None => None,
        Some(d) if d == 1 || d == -1 => Some(d),
        Some(d) => return Err(opts.error("direction", format!("direction must be 1 or -1, got {}", d))),
    };

    let ratio = opts.f64("ratio")?;
    if matches!(ratio, Some(r) if r <= 0.0) {
        return Err(opts.error("ratio", "ratio must be positive"));
    }

    Ok(CoordSpec {
        kind,
        xlim: parse_limits(&opts, "xlim")?,
        ylim: parse_limits(&opts, "ylim")?,
        ratio,
        flip: kind == CoordKind::Flip || opts.bool("flip")?.unwrap_or(false),
        theta,
        start: opts.f64("start")?,
        direction,
        projection: opts.string("projection")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cartesian_limits() {
        let coord = parse_coord(&json!({"name": "cartesian", "xlim": [0, null]}), "coord").unwrap();
        assert_eq!(coord.kind, CoordKind::Cartesian);
        assert_eq!(coord.xlim, Some((Some(0.0), None)));
        assert!(!coord.flip);
    }

    #[test]
    fn test_flip_sets_flag() {
        let coord = parse_coord(&json!({"name": "flip"}), "coord").unwrap();
        assert!(coord.flip);
    }

    #[test]
    fn test_polar_params() {
        let coord = parse_coord(&json!({"name": "polar", "theta": "y", "direction": -1}), "coord").unwrap();
        assert_eq!(coord.theta, Some(Aes::Y));
        assert_eq!(coord.direction, Some(-1));
    }

    #[test]
    fn test_bad_ratio() {
        assert!(parse_coord(&json!({"name": "fixed", "ratio": 0}), "coord").is_err());
    }
}
