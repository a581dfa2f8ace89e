// Geometry registry: default stat, required and rendered aesthetics per geom

use super::aesthetics::Aes;
use serde::Serialize;

/// Closed set of supported geometries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeomKind {
    Point,
    Jitter,
    Line,
    Path,
    Step,
    Area,
    Bar,
    Histogram,
    Density,
    Freqpoly,
    Tile,
    Bin2d,
    Rect,
    Segment,
    Text,
    Label,
    Boxplot,
    Violin,
    Ribbon,
    Errorbar,
    Crossbar,
    Linerange,
    Pointrange,
    Smooth,
    Contour,
    Density2d,
    Polygon,
    Hline,
    Vline,
    Abline,
    Qq,
    QqLine,
    Count,
    Lollipop,
}

/// How the default tooltip is laid out for a geom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipSetup {
    /// Axis tooltip on X only, e.g. bars and areas
    XUnivariate,
    /// Axis tooltips on X and Y, e.g. points and tiles
    Bivariate,
    /// No tooltips at all
    NoTooltips,
}

const GEOMS: &[(GeomKind, &str)] = &[
    (GeomKind::Point, "point"),
    (GeomKind::Jitter, "jitter"),
    (GeomKind::Line, "line"),
    (GeomKind::Path, "path"),
    (GeomKind::Step, "step"),
    (GeomKind::Area, "area"),
    (GeomKind::Bar, "bar"),
    (GeomKind::Histogram, "histogram"),
    (GeomKind::Density, "density"),
    (GeomKind::Freqpoly, "freqpoly"),
    (GeomKind::Tile, "tile"),
    (GeomKind::Bin2d, "bin2d"),
    (GeomKind::Rect, "rect"),
    (GeomKind::Segment, "segment"),
    (GeomKind::Text, "text"),
    (GeomKind::Label, "label"),
    (GeomKind::Boxplot, "boxplot"),
    (GeomKind::Violin, "violin"),
    (GeomKind::Ribbon, "ribbon"),
    (GeomKind::Errorbar, "errorbar"),
    (GeomKind::Crossbar, "crossbar"),
    (GeomKind::Linerange, "linerange"),
    (GeomKind::Pointrange, "pointrange"),
    (GeomKind::Smooth, "smooth"),
    (GeomKind::Contour, "contour"),
    (GeomKind::Density2d, "density2d"),
    (GeomKind::Polygon, "polygon"),
    (GeomKind::Hline, "hline"),
    (GeomKind::Vline, "vline"),
    (GeomKind::Abline, "abline"),
    (GeomKind::Qq, "qq"),
    (GeomKind::QqLine, "qq_line"),
    (GeomKind::Count, "count"),
    (GeomKind::Lollipop, "lollipop"),
];

const POINT_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Size, Aes::Shape, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Stroke];
const PATH_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Size, Aes::Linetype, Aes::Color, Aes::Alpha];
const AREA_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Size, Aes::Linetype, Aes::Color, Aes::Fill, Aes::Alpha];
const BAR_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Width, Aes::Size];
const TILE_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Width, Aes::Height, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const RECT_AES: &[Aes] = &[Aes::Xmin, Aes::Xmax, Aes::Ymin, Aes::Ymax, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const SEGMENT_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Xend, Aes::Yend, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const TEXT_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Label, Aes::Color, Aes::Alpha, Aes::Size, Aes::Family, Aes::Fontface, Aes::Hjust, Aes::Vjust, Aes::Angle];
const BOXPLOT_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Lower, Aes::Middle, Aes::Upper, Aes::Ymin, Aes::Ymax, Aes::Width, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Shape, Aes::Linetype, Aes::Size];
const VIOLIN_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Violinwidth, Aes::Width, Aes::Quantile, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const RANGE_AES: &[Aes] = &[Aes::X, Aes::Ymin, Aes::Ymax, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const ERRORBAR_AES: &[Aes] = &[Aes::X, Aes::Ymin, Aes::Ymax, Aes::Xmin, Aes::Xmax, Aes::Y, Aes::Width, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const CROSSBAR_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Ymin, Aes::Ymax, Aes::Width, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const POINTRANGE_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Ymin, Aes::Ymax, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Shape, Aes::Linetype, Aes::Size];
const RIBBON_AES: &[Aes] = &[Aes::X, Aes::Ymin, Aes::Ymax, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const SMOOTH_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Ymin, Aes::Ymax, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype, Aes::Size];
const HLINE_AES: &[Aes] = &[Aes::Yintercept, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const VLINE_AES: &[Aes] = &[Aes::Xintercept, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const ABLINE_AES: &[Aes] = &[Aes::Slope, Aes::Intercept, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const QQ_AES: &[Aes] = &[Aes::Sample, Aes::X, Aes::Y, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Shape, Aes::Size];
const QQ_LINE_AES: &[Aes] = &[Aes::Sample, Aes::X, Aes::Y, Aes::Color, Aes::Alpha, Aes::Linetype, Aes::Size];
const LOLLIPOP_AES: &[Aes] = &[Aes::X, Aes::Y, Aes::Size, Aes::Shape, Aes::Color, Aes::Fill, Aes::Alpha, Aes::Linetype];

impl GeomKind {
    pub fn from_name(name: &str) -> Option<GeomKind> {
        GEOMS.iter().find(|(_, n)| *n == name).map(|(g, _)| *g)
    }

    pub fn name(&self) -> &'static str {
        GEOMS
            .iter()
            .find(|(g, _)| g == self)
            .map(|(_, n)| *n)
            .unwrap_or("unknown")
    }

    /// Name of the stat used when the layer does not set one
    pub fn default_stat(&self) -> &'static str {
        match self {
            GeomKind::Bar => "count",
            GeomKind::Histogram | GeomKind::Freqpoly => "bin",
            GeomKind::Density => "density",
            GeomKind::Bin2d => "bin2d",
            GeomKind::Boxplot => "boxplot",
            GeomKind::Violin => "ydensity",
            GeomKind::Smooth => "smooth",
            GeomKind::Contour => "contour",
            GeomKind::Density2d => "density2d",
            GeomKind::Qq => "qq",
            GeomKind::QqLine => "qq_line",
            GeomKind::Count => "sum",
            _ => "identity",
        }
    }

    /// Aesthetics that must be bound once stat defaults are applied
    pub fn required_aes(&self) -> &'static [Aes] {
        match self {
            GeomKind::Rect => &[Aes::Xmin, Aes::Xmax, Aes::Ymin, Aes::Ymax],
            GeomKind::Segment => &[Aes::X, Aes::Y, Aes::Xend, Aes::Yend],
            GeomKind::Boxplot => &[Aes::Lower, Aes::Middle, Aes::Upper, Aes::Ymin, Aes::Ymax],
            GeomKind::Violin => &[Aes::X, Aes::Y, Aes::Violinwidth],
            GeomKind::Ribbon | GeomKind::Errorbar | GeomKind::Linerange => &[Aes::X, Aes::Ymin, Aes::Ymax],
            GeomKind::Crossbar | GeomKind::Pointrange => &[Aes::X, Aes::Y, Aes::Ymin, Aes::Ymax],
            GeomKind::Hline => &[Aes::Yintercept],
            GeomKind::Vline => &[Aes::Xintercept],
            GeomKind::Abline => &[],
            _ => &[Aes::X, Aes::Y],
        }
    }

    /// Aesthetics the renderer draws for this geom
    pub fn renders(&self) -> &'static [Aes] {
        match self {
            GeomKind::Point | GeomKind::Jitter => POINT_AES,
            GeomKind::Line | GeomKind::Path | GeomKind::Step | GeomKind::Freqpoly => PATH_AES,
            GeomKind::Contour | GeomKind::Density2d | GeomKind::Polygon => AREA_AES,
            GeomKind::Area | GeomKind::Density => AREA_AES,
            GeomKind::Bar | GeomKind::Histogram => BAR_AES,
            GeomKind::Tile | GeomKind::Bin2d => TILE_AES,
            GeomKind::Rect => RECT_AES,
            GeomKind::Segment => SEGMENT_AES,
            GeomKind::Text | GeomKind::Label => TEXT_AES,
            GeomKind::Boxplot => BOXPLOT_AES,
            GeomKind::Violin => VIOLIN_AES,
            GeomKind::Linerange => RANGE_AES,
            GeomKind::Errorbar => ERRORBAR_AES,
            GeomKind::Crossbar => CROSSBAR_AES,
            GeomKind::Pointrange => POINTRANGE_AES,
            GeomKind::Ribbon => RIBBON_AES,
            GeomKind::Smooth => SMOOTH_AES,
            GeomKind::Hline => HLINE_AES,
            GeomKind::Vline => VLINE_AES,
            GeomKind::Abline => ABLINE_AES,
            GeomKind::Qq => QQ_AES,
            GeomKind::QqLine => QQ_LINE_AES,
            GeomKind::Count => POINT_AES,
            GeomKind::Lollipop => LOLLIPOP_AES,
        }
    }

    pub fn tooltip_setup(&self) -> TooltipSetup {
        match self {
            GeomKind::Bar
            | GeomKind::Histogram
            | GeomKind::Line
            | GeomKind::Area
            | GeomKind::Density
            | GeomKind::Freqpoly
            | GeomKind::Step
            | GeomKind::Boxplot
            | GeomKind::Errorbar
            | GeomKind::Crossbar
            | GeomKind::Linerange
            | GeomKind::Pointrange
            | GeomKind::Ribbon
            | GeomKind::Smooth
            | GeomKind::Lollipop => TooltipSetup::XUnivariate,
            GeomKind::Abline => TooltipSetup::NoTooltips,
            _ => TooltipSetup::Bivariate,
        }
    }

    /// Aesthetics never listed in the general tooltip
    pub fn hidden_tooltip_aes(&self) -> &'static [Aes] {
        match self {
            GeomKind::Boxplot => &[Aes::Y],
            GeomKind::Rect => &[Aes::Xmin, Aes::Ymin, Aes::Xmax, Aes::Ymax],
            GeomKind::Segment => &[Aes::X, Aes::Y, Aes::Xend, Aes::Yend],
            GeomKind::Density | GeomKind::Area | GeomKind::Violin => &[Aes::Quantile],
            _ => &[],
        }
    }

    /// Aesthetics shown in side tooltips next to the geometry
    pub fn side_tooltip_aes(&self) -> &'static [Aes] {
        match self {
            GeomKind::Crossbar | GeomKind::Linerange | GeomKind::Pointrange | GeomKind::Ribbon => {
                &[Aes::Ymax, Aes::Ymin]
            }
            GeomKind::Errorbar => &[Aes::Ymax, Aes::Ymin, Aes::Xmax, Aes::Xmin],
            GeomKind::Boxplot => &[Aes::Ymax, Aes::Upper, Aes::Middle, Aes::Lower, Aes::Ymin],
            GeomKind::Smooth => &[Aes::Ymax, Aes::Ymin, Aes::Y],
            _ => &[],
        }
    }

    /// Default value for an aesthetic the geom can draw without data
    pub fn default_constant(&self, aes: Aes) -> Option<f64> {
        match (self, aes) {
            (GeomKind::Abline, Aes::Slope) => Some(1.0),
            (GeomKind::Abline, Aes::Intercept) => Some(0.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(GeomKind::from_name("bar"), Some(GeomKind::Bar));
        assert_eq!(GeomKind::from_name("qq_line"), Some(GeomKind::QqLine));
        assert_eq!(GeomKind::from_name("blob"), None);
        assert_eq!(GeomKind::Histogram.name(), "histogram");
    }

    #[test]
    fn test_default_stats() {
        assert_eq!(GeomKind::Bar.default_stat(), "count");
        assert_eq!(GeomKind::Violin.default_stat(), "ydensity");
        assert_eq!(GeomKind::Point.default_stat(), "identity");
    }

    #[test]
    fn test_tooltip_tables() {
        assert_eq!(GeomKind::Bar.tooltip_setup(), TooltipSetup::XUnivariate);
        assert_eq!(GeomKind::Point.tooltip_setup(), TooltipSetup::Bivariate);
        assert_eq!(GeomKind::Boxplot.hidden_tooltip_aes(), &[Aes::Y]);
        assert_eq!(GeomKind::Boxplot.side_tooltip_aes().len(), 5);
        assert!(GeomKind::Point.side_tooltip_aes().is_empty());
    }

    #[test]
    fn test_rendered_aes_contains_required() {
        for (geom, _) in GEOMS {
            for aes in geom.required_aes() {
                assert!(geom.renders().contains(aes), "{:?} does not render {:?}", geom, aes);
            }
        }
    }
}
