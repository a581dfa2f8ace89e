// Facet spec parsing

use super::ast::{FacetScales, FacetSpec, WrapDirection};
use super::options::Options;
use crate::error::{PlotError, Result};
use serde_json::Value as Json;

const GRID_KEYS: &[&str] = &["name", "x", "y", "x_order", "y_order", "x_format", "y_format", "scales"];
const WRAP_KEYS: &[&str] = &["name", "facets", "ncol", "nrow", "order", "format", "dir", "scales"];

fn parse_facet_scales(opts: &Options) -> Result<FacetScales> {
    match opts.string("scales")?.as_deref() {
        None | Some("fixed") => Ok(FacetScales::Fixed),
        Some("free") => Ok(FacetScales::Free),
        Some("free_x") => Ok(FacetScales::FreeX),
        Some("free_y") => Ok(FacetScales::FreeY),
        Some(other) => Err(opts.error("scales", format!("Unknown facet scales mode '{}'", other))),
    }
}

fn parse_order(opts: &Options, key: &str) -> Result<i32> {
    match opts.i32(key)? {
        None => Ok(1),
        Some(o) if (-1..=1).contains(&o) => Ok(o),
        Some(o) => Err(opts.error(key, format!("Facet order must be 1, -1 or 0, got {}", o))),
    }
}

pub fn parse_facet(value: &Json, path: &str) -> Result<FacetSpec> {
    let opts = Options::new(value, path)?;
    let name = opts
        .string("name")?
        .ok_or_else(|| opts.error("name", "Facet spec requires a name (grid or wrap)"))?;
    match name.as_str() {
        "grid" => {
            opts.warn_unknown(GRID_KEYS, |_| false);
            let x = opts.string("x")?;
            let y = opts.string("y")?;
            if x.is_none() && y.is_none() {
                return Err(PlotError::spec(opts.path(), "facet_grid requires x or y"));
            }
            Ok(FacetSpec::Grid {
                x,
                y,
                x_order: parse_order(&opts, "x_order")?,
                y_order: parse_order(&opts, "y_order")?,
                x_format: opts.string("x_format")?,
                y_format: opts.string("y_format")?,
                scales: parse_facet_scales(&opts)?,
            })
        }
        "wrap" => {
            opts.warn_unknown(WRAP_KEYS, |_| false);
            let facets = opts
                .strings("facets")?
                .filter(|f| !f.is_empty())
                .ok_or_else(|| opts.error("facets", "facet_wrap requires at least one variable"))?;
            let order = match opts.get("order") {
                None => vec![1; facets.len()],
                Some(Json::Array(items)) => items
                    .iter()
                    .map(|o| o.as_i64().map(|v| v as i32).unwrap_or(1))
                    .chain(std::iter::repeat(1))
                    .take(facets.len())
                    .collect(),
                Some(_) => vec![parse_order(&opts, "order")?; facets.len()],
            };
            let format = match opts.get("format") {
                None => vec![None; facets.len()],
                Some(Json::Array(items)) => items
                    .iter()
                    .map(|f| f.as_str().map(str::to_string))
                    .chain(std::iter::repeat(None))
                    .take(facets.len())
                    .collect(),
                Some(_) => vec![opts.string("format")?; facets.len()],
            };
            let dir = match opts.string("dir")?.as_deref() {
                None | Some("h") => WrapDirection::H,
                Some("v") => WrapDirection::V,
                Some(other) => {
                    return Err(opts.error("dir", format!("Unknown facet direction '{}'", other)))
                }
            };
            Ok(FacetSpec::Wrap {
                facets,
                ncol: opts.usize("ncol")?.filter(|n| *n > 0),
                nrow: opts.usize("nrow")?.filter(|n| *n > 0),
                order,
                format,
                dir,
                scales: parse_facet_scales(&opts)?,
            })
        }
        other => Err(opts.error("name", format!("Unknown facet '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_grid() {
        let facet = parse_facet(&json!({"name": "grid", "x": "sex", "y_order": -1, "scales": "free_y"}), "facet").unwrap();
        match facet {
            FacetSpec::Grid { x, y, y_order, scales, .. } => {
                assert_eq!(x.as_deref(), Some("sex"));
                assert_eq!(y, None);
                assert_eq!(y_order, -1);
                assert_eq!(scales, FacetScales::FreeY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_wrap() {
        let facet = parse_facet(
            &json!({"name": "wrap", "facets": ["a", "b"], "ncol": 3, "order": [-1], "dir": "v"}),
            "facet",
        )
        .unwrap();
        match facet {
            FacetSpec::Wrap { facets, ncol, order, dir, .. } => {
                assert_eq!(facets.len(), 2);
                assert_eq!(ncol, Some(3));
                assert_eq!(order, vec![-1, 1]);
                assert_eq!(dir, WrapDirection::V);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_grid_without_variables() {
        assert!(parse_facet(&json!({"name": "grid"}), "facet").is_err());
    }
}
