// Stat name and parameter parsing

use super::ast::{Bandwidth, DensityParams, Distribution, Kernel, SmoothMethod, Stat};
use super::options::Options;
use crate::error::Result;
use serde_json::Value as Json;

/// Layer keys consumed as stat parameters
pub const STAT_PARAM_KEYS: &[&str] = &[
    "bins",
    "binwidth",
    "center",
    "boundary",
    "method",
    "se",
    "level",
    "n",
    "span",
    "kernel",
    "bw",
    "adjust",
    "trim",
    "fun",
    "fun_min",
    "fun_max",
    "quantiles",
    "quantile_lines",
    "coef",
    "distribution",
    "pad",
];

pub const DEFAULT_BINS: usize = 30;
pub const DEFAULT_CONTOUR_BINS: usize = 10;
pub const DEFAULT_BOXPLOT_COEF: f64 = 1.5;
pub const DEFAULT_LEVEL: f64 = 0.95;
pub const DEFAULT_SPAN: f64 = 0.5;
pub const DEFAULT_DENSITY2D_POINTS: usize = 100;

/// Build a `Stat` from its name and the parameters found on the layer
pub fn parse_stat(name: &str, opts: &Options) -> Result<Stat> {
    let stat = match name {
        "identity" => Stat::Identity,
        "count" => Stat::Count,
        "count2d" => Stat::Count2d,
        "sum" => Stat::Sum,
        "bin" => Stat::Bin {
            bins: opts.usize("bins")?.unwrap_or(DEFAULT_BINS),
            binwidth: opts.f64("binwidth")?,
            center: opts.f64("center")?,
            boundary: opts.f64("boundary")?,
        },
        "bin2d" => {
            let (bx, by) = pair_usize(opts, "bins")?.unwrap_or((DEFAULT_BINS, DEFAULT_BINS));
            let (wx, wy) = pair_f64(opts, "binwidth")?.unwrap_or((None, None));
            Stat::Bin2d { bins: (bx, by), binwidth: (wx, wy) }
        }
        "density" => Stat::Density(parse_density_params(opts)?),
        "ydensity" => Stat::Ydensity(parse_density_params(opts)?),
        "density2d" => Stat::Density2d {
            bins: opts.usize("bins")?.unwrap_or(DEFAULT_CONTOUR_BINS),
            binwidth: opts.f64("binwidth")?,
            n: opts.usize("n")?.unwrap_or(DEFAULT_DENSITY2D_POINTS),
            adjust: opts.f64("adjust")?.unwrap_or(1.0),
        },
        "smooth" => Stat::Smooth {
            method: match opts.string("method")?.as_deref() {
                None | Some("lm") => SmoothMethod::Lm,
                Some("loess") | Some("lowess") => SmoothMethod::Loess,
                Some(other) => {
                    return Err(opts.error("method", format!("Unknown smoothing method '{}'", other)))
                }
            },
            se: opts.bool("se")?.unwrap_or(true),
            level: opts.f64("level")?.unwrap_or(DEFAULT_LEVEL),
            n: opts.usize("n")?,
            span: opts.f64("span")?.unwrap_or(DEFAULT_SPAN),
        },
        "summary" => Stat::Summary {
            fun: reducer(opts, "fun", "mean")?,
            fun_min: reducer(opts, "fun_min", "min")?,
            fun_max: reducer(opts, "fun_max", "max")?,
        },
        "ecdf" => Stat::Ecdf {
            n: opts.usize("n")?,
            pad: opts.bool("pad")?.unwrap_or(true),
        },
        "contour" => Stat::Contour {
            bins: opts.usize("bins")?.unwrap_or(DEFAULT_CONTOUR_BINS),
            binwidth: opts.f64("binwidth")?,
        },
        "boxplot" => Stat::Boxplot {
            coef: opts.f64("coef")?.unwrap_or(DEFAULT_BOXPLOT_COEF),
        },
        "qq" => Stat::Qq { distribution: distribution(opts)? },
        "qq_line" => Stat::QqLine { distribution: distribution(opts)? },
        other => return Err(opts.error("stat", format!("Unknown stat '{}'", other))),
    };
    Ok(stat)
}

pub const REDUCERS: &[&str] = &[
    "count", "sum", "mean", "median", "min", "max", "lq", "mq", "uq", "sd", "se", "var",
];

fn reducer(opts: &Options, key: &str, default: &str) -> Result<String> {
    let name = opts.string(key)?.unwrap_or_else(|| default.to_string());
    if !REDUCERS.contains(&name.as_str()) {
        return Err(opts.error(key, format!("Unknown summary function '{}'", name)));
    }
    Ok(name)
}

fn distribution(opts: &Options) -> Result<Distribution> {
    match opts.string("distribution")?.as_deref() {
        None | Some("norm") | Some("normal") => Ok(Distribution::Normal),
        Some("unif") | Some("uniform") => Ok(Distribution::Uniform),
        Some("exp") | Some("exponential") => Ok(Distribution::Exponential),
        Some(other) => Err(opts.error("distribution", format!("Unknown distribution '{}'", other))),
    }
}

fn parse_density_params(opts: &Options) -> Result<DensityParams> {
    let defaults = DensityParams::default();
    let kernel = match opts.string("kernel")?.as_deref() {
        None | Some("gaussian") => Kernel::Gaussian,
        Some("rectangular") | Some("uniform") => Kernel::Rectangular,
        Some("triangular") => Kernel::Triangular,
        Some("biweight") | Some("quartic") => Kernel::Biweight,
        Some("epanechikov") | Some("parabolic") => Kernel::Epanechikov,
        Some("optcosine") => Kernel::Optcosine,
        Some("cosine") => Kernel::Cosine,
        Some(other) => return Err(opts.error("kernel", format!("Unknown kernel '{}'", other))),
    };
    let bw = match opts.get("bw") {
        None => Bandwidth::Nrd0,
        Some(Json::String(s)) if s == "nrd0" => Bandwidth::Nrd0,
        Some(Json::String(s)) if s == "nrd" => Bandwidth::Nrd,
        Some(Json::Number(n)) => match n.as_f64() {
            Some(v) if v > 0.0 => Bandwidth::Fixed(v),
            _ => return Err(opts.error("bw", "Bandwidth must be positive")),
        },
        Some(other) => return Err(opts.error("bw", format!("Unknown bandwidth rule {}", other))),
    };
    let quantiles = match opts.numbers("quantiles")? {
        Some(qs) => {
            if qs.iter().any(|q| !(0.0..=1.0).contains(q)) {
                return Err(opts.error("quantiles", "Quantiles must lie in [0, 1]"));
            }
            qs
        }
        None => defaults.quantiles,
    };
    Ok(DensityParams {
        kernel,
        bw,
        adjust: opts.f64("adjust")?.unwrap_or(defaults.adjust),
        n: opts.usize("n")?,
        trim: opts.bool("trim")?.unwrap_or(false),
        quantiles,
        quantile_lines: opts.bool("quantile_lines")?.unwrap_or(false),
    })
}

/// A number applied to both axes, or a two-element list
fn pair_f64(opts: &Options, key: &str) -> Result<Option<(Option<f64>, Option<f64>)>> {
    match opts.get(key) {
        None => Ok(None),
        Some(Json::Number(n)) => Ok(Some((n.as_f64(), n.as_f64()))),
        Some(Json::Array(items)) if items.len() == 2 => Ok(Some((items[0].as_f64(), items[1].as_f64()))),
        Some(_) => Err(opts.error(key, "Expected a number or a list of two numbers")),
    }
}

fn pair_usize(opts: &Options, key: &str) -> Result<Option<(usize, usize)>> {
    match pair_f64(opts, key)? {
        None => Ok(None),
        Some((Some(x), Some(y))) if x >= 1.0 && y >= 1.0 => Ok(Some((x as usize, y as usize))),
        Some(_) => Err(opts.error(key, "Bin counts must be positive integers")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(name: &str, params: Json) -> Result<Stat> {
        let opts = Options::new(&params, "layers[0]").unwrap();
        parse_stat(name, &opts)
    }

    #[test]
    fn test_bin_defaults() {
        match parse("bin", json!({})).unwrap() {
            Stat::Bin { bins, binwidth, .. } => {
                assert_eq!(bins, 30);
                assert_eq!(binwidth, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_density_params() {
        match parse("density", json!({"kernel": "epanechikov", "bw": 0.5, "quantiles": [0.5]})).unwrap() {
            Stat::Density(p) => {
                assert_eq!(p.kernel, Kernel::Epanechikov);
                assert_eq!(p.bw, Bandwidth::Fixed(0.5));
                assert_eq!(p.quantiles, vec![0.5]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_summary_reducers() {
        assert!(parse("summary", json!({"fun": "median"})).is_ok());
        assert!(parse("summary", json!({"fun": "mode"})).is_err());
    }

    #[test]
    fn test_bin2d_pairs() {
        match parse("bin2d", json!({"bins": [10, 20], "binwidth": 2})).unwrap() {
            Stat::Bin2d { bins, binwidth } => {
                assert_eq!(bins, (10, 20));
                assert_eq!(binwidth, (Some(2.0), Some(2.0)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_stat() {
        assert!(parse("magic", json!({})).is_err());
    }
}
