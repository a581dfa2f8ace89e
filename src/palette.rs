use crate::error::{PlotError, Result};
use ::palette::{FromColor, IntoColor, LinSrgb, Lchuv, Mix, Oklab, Srgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrewerKind {
    Sequential,
    Diverging,
    Qualitative,
}

const BREWER: &[(&str, BrewerKind, &[&str])] = &[
    ("BuGn", BrewerKind::Sequential, &["#f7fcfd", "#e5f5f9", "#ccece6", "#99d8c9", "#66c2a4", "#41ae76", "#238b45", "#006d2c", "#00441b"]),
    ("BuPu", BrewerKind::Sequential, &["#f7fcfd", "#e0ecf4", "#bfd3e6", "#9ebcda", "#8c96c6", "#8c6bb1", "#88419d", "#810f7c", "#4d004b"]),
    ("GnBu", BrewerKind::Sequential, &["#f7fcf0", "#e0f3db", "#ccebc5", "#a8ddb5", "#7bccc4", "#4eb3d3", "#2b8cbe", "#0868ac", "#084081"]),
    ("OrRd", BrewerKind::Sequential, &["#fff7ec", "#fee8c8", "#fdd49e", "#fdbb84", "#fc8d59", "#ef6548", "#d7301f", "#b30000", "#7f0000"]),
    ("PuBu", BrewerKind::Sequential, &["#fff7fb", "#ece7f2", "#d0d1e6", "#a6bddb", "#74a9cf", "#3690c0", "#0570b0", "#045a8d", "#023858"]),
    ("PuBuGn", BrewerKind::Sequential, &["#fff7fb", "#ece2f0", "#d0d1e6", "#a6bddb", "#67a9cf", "#3690c0", "#02818a", "#016c59", "#014636"]),
    ("PuRd", BrewerKind::Sequential, &["#f7f4f9", "#e7e1ef", "#d4b9da", "#c994c7", "#df65b0", "#e7298a", "#ce1256", "#980043", "#67001f"]),
    ("RdPu", BrewerKind::Sequential, &["#fff7f3", "#fde0dd", "#fcc5c0", "#fa9fb5", "#f768a1", "#dd3497", "#ae017e", "#7a0177", "#49006a"]),
    ("YlGn", BrewerKind::Sequential, &["#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679", "#41ab5d", "#238443", "#006837", "#004529"]),
    ("YlGnBu", BrewerKind::Sequential, &["#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8", "#253494", "#081d58"]),
    ("YlOrBr", BrewerKind::Sequential, &["#ffffe5", "#fff7bc", "#fee391", "#fec44f", "#fe9929", "#ec7014", "#cc4c02", "#993404", "#662506"]),
    ("YlOrRd", BrewerKind::Sequential, &["#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c", "#bd0026", "#800026"]),
    ("Blues", BrewerKind::Sequential, &["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b"]),
    ("Greens", BrewerKind::Sequential, &["#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b"]),
    ("Greys", BrewerKind::Sequential, &["#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252", "#252525", "#000000"]),
    ("Oranges", BrewerKind::Sequential, &["#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801", "#a63603", "#7f2704"]),
    ("Purples", BrewerKind::Sequential, &["#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#807dba", "#6a51a3", "#54278f", "#3f007d"]),
    ("Reds", BrewerKind::Sequential, &["#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d"]),
    ("BrBG", BrewerKind::Diverging, &["#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5", "#80cdc1", "#35978f", "#01665e", "#003c30"]),
    ("PiYG", BrewerKind::Diverging, &["#8e0152", "#c51b7d", "#de77ae", "#f1b6da", "#fde0ef", "#f7f7f7", "#e6f5d0", "#b8e186", "#7fbc41", "#4d9221", "#276419"]),
    ("PRGn", BrewerKind::Diverging, &["#40004b", "#762a83", "#9970ab", "#c2a5cf", "#e7d4e8", "#f7f7f7", "#d9f0d3", "#a6dba0", "#5aae61", "#1b7837", "#00441b"]),
    ("PuOr", BrewerKind::Diverging, &["#7f3b08", "#b35806", "#e08214", "#fdb863", "#fee0b6", "#f7f7f7", "#d8daeb", "#b2abd2", "#8073ac", "#542788", "#2d004b"]),
    ("RdBu", BrewerKind::Diverging, &["#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#f7f7f7", "#d1e5f0", "#92c5de", "#4393c3", "#2166ac", "#053061"]),
    ("RdGy", BrewerKind::Diverging, &["#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#ffffff", "#e0e0e0", "#bababa", "#878787", "#4d4d4d", "#1a1a1a"]),
    ("RdYlBu", BrewerKind::Diverging, &["#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090", "#ffffbf", "#e0f3f8", "#abd9e9", "#74add1", "#4575b4", "#313695"]),
    ("RdYlGn", BrewerKind::Diverging, &["#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a", "#66bd63", "#1a9850", "#006837"]),
    ("Spectral", BrewerKind::Diverging, &["#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598", "#abdda4", "#66c2a5", "#3288bd", "#5e4fa2"]),
    ("Accent", BrewerKind::Qualitative, &["#7fc97f", "#beaed4", "#fdc086", "#ffff99", "#386cb0", "#f0027f", "#bf5b17", "#666666"]),
    ("Dark2", BrewerKind::Qualitative, &["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02", "#a6761d", "#666666"]),
    ("Paired", BrewerKind::Qualitative, &["#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99", "#e31a1c", "#fdbf6f", "#ff7f00", "#cab2d6", "#6a3d9a", "#ffff99", "#b15928"]),
    ("Pastel1", BrewerKind::Qualitative, &["#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4", "#fed9a6", "#ffffcc", "#e5d8bd", "#fddaec", "#f2f2f2"]),
    ("Pastel2", BrewerKind::Qualitative, &["#b3e2cd", "#fdcdac", "#cbd5e8", "#f4cae4", "#e6f5c9", "#fff2ae", "#f1e2cc", "#cccccc"]),
    ("Set1", BrewerKind::Qualitative, &["#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33", "#a65628", "#f781bf", "#999999"]),
    ("Set2", BrewerKind::Qualitative, &["#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3"]),
    ("Set3", BrewerKind::Qualitative, &["#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5", "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f"]),
];

/// Largest variant of a named ColorBrewer palette
pub fn brewer_palette(name: &str) -> Option<(BrewerKind, &'static [&'static str])> {
    BREWER
        .iter()
        .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, kind, colors)| (*kind, *colors))
}

/// Default palettes shared by every scale
#[derive(Debug, Clone, PartialEq)]
pub struct Palettes {
    pub gradient: (String, String),
    pub gradient2: (String, String, String),
    pub grey: (String, String),
    pub brewer_qualitative: String,
    pub brewer_sequential: String,
    pub shapes: Vec<f64>,
    pub linetypes: Vec<String>,
    pub size_range: (f64, f64),
    pub alpha_range: (f64, f64),
    pub stroke_range: (f64, f64),
    pub na_color: String,
}

impl Default for Palettes {
    fn default() -> Self {
        Self {
            gradient: ("#132B43".to_string(), "#56B1F7".to_string()),
            gradient2: ("#832424".to_string(), "#FFFFFF".to_string(), "#3A3A98".to_string()),
            grey: ("#333333".to_string(), "#E6E6E6".to_string()),
            brewer_qualitative: "Set2".to_string(),
            brewer_sequential: "Blues".to_string(),
            shapes: vec![16.0, 17.0, 15.0, 3.0, 7.0, 8.0],
            linetypes: ["solid", "dashed", "dotted", "dotdash", "longdash", "twodash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            size_range: (2.0, 5.5),
            alpha_range: (0.1, 1.0),
            stroke_range: (0.5, 2.0),
            na_color: "#808080".to_string(),
        }
    }
}

impl Palettes {
    /// `n` colors evenly spaced around the HCL hue wheel (chroma 100, luminance 65)
    pub fn hue(&self, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }
        (0..n)
            .map(|i| {
                let h = 15.0 + 360.0 * i as f32 / n as f32;
                let color: Srgb<f32> = Srgb::from_color(Lchuv::new(65.0, 100.0, h));
                srgb_to_hex(&color)
            })
            .collect()
    }

    /// `n` colors from a brewer palette. Qualitative palettes repeat when
    /// exhausted; ordered ones are resampled along the full ramp.
    pub fn brewer(&self, name: &str, n: usize) -> Result<Vec<String>> {
        let (kind, colors) = brewer_palette(name)
            .ok_or_else(|| PlotError::ScaleConfig(format!("Unknown brewer palette '{}'", name)))?;
        if n == 0 {
            return Ok(Vec::new());
        }
        match kind {
            BrewerKind::Qualitative => Ok((0..n).map(|i| colors[i % colors.len()].to_string()).collect()),
            BrewerKind::Sequential | BrewerKind::Diverging if n <= colors.len() => {
                if n == 1 {
                    return Ok(vec![colors[colors.len() / 2].to_string()]);
                }
                let step = (colors.len() - 1) as f64 / (n - 1) as f64;
                Ok((0..n)
                    .map(|i| colors[(i as f64 * step).round() as usize].to_string())
                    .collect())
            }
            _ => (0..n)
                .map(|i| interpolate(colors, i as f64 / (n - 1).max(1) as f64))
                .collect(),
        }
    }

    /// `n` evenly spaced values over a numeric range
    pub fn spread(range: (f64, f64), n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![range.1],
            _ => (0..n)
                .map(|i| range.0 + (range.1 - range.0) * i as f64 / (n - 1) as f64)
                .collect(),
        }
    }
}

// =============================================================================
// Color utilities
// =============================================================================

fn parse_to_srgb(color: &str) -> Result<Srgb<f32>> {
    let parsed = csscolorparser::parse(color)
        .map_err(|e| PlotError::ScaleConfig(format!("Invalid color '{}': {}", color, e)))?;
    Ok(Srgb::new(parsed.r as f32, parsed.g as f32, parsed.b as f32))
}

fn srgb_to_hex(color: &Srgb<f32>) -> String {
    let r = (color.red.clamp(0.0, 1.0) * 255.0).round() as u8;
    let g = (color.green.clamp(0.0, 1.0) * 255.0).round() as u8;
    let b = (color.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Validate a color and normalize it to `#rrggbb`
pub fn to_hex(color: &str) -> Result<String> {
    parse_to_srgb(color).map(|c| srgb_to_hex(&c))
}

/// Color at `t` in [0, 1] along evenly spaced stops, mixed in Oklab
pub fn interpolate<S: AsRef<str>>(stops: &[S], t: f64) -> Result<String> {
    let colors = stops
        .iter()
        .map(|s| parse_to_srgb(s.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    match colors.as_slice() {
        [] => Err(PlotError::ScaleConfig("At least one color is required".to_string())),
        [only] => Ok(srgb_to_hex(only)),
        _ => {
            let oklab: Vec<Oklab<f32>> = colors
                .iter()
                .map(|c| Oklab::from_color(LinSrgb::from(*c)))
                .collect();
            let segments = oklab.len() - 1;
            let pos = (t.clamp(0.0, 1.0) * segments as f64) as f32;
            let segment = (pos.floor() as usize).min(segments - 1);
            let mixed = oklab[segment].mix(oklab[segment + 1], pos - segment as f32);
            let lin: LinSrgb<f32> = mixed.into_color();
            Ok(srgb_to_hex(&Srgb::from(lin)))
        }
    }
}
