// Typed plot specification produced by the normalizer

use super::aesthetics::Aes;
use super::geom::GeomKind;
use crate::data::{DataFrame, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// A top-level figure: a single plot or a composite of sub-figures
#[derive(Debug, Clone, PartialEq)]
pub enum FigureSpec {
    Plot(Box<PlotSpec>),
    Subplots(SubplotsSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubplotsSpec {
    /// `None` entries are empty placeholders in the layout
    pub figures: Vec<Option<FigureSpec>>,
    pub ncol: Option<usize>,
    pub nrow: Option<usize>,
}

/// Complete plot specification
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotSpec {
    pub data: DataFrame,
    pub mapping: MappingSpec,
    pub data_meta: DataMeta,
    pub layers: Vec<LayerSpec>,
    pub scales: Vec<ScaleSpec>,
    pub facet: Option<FacetSpec>,
    pub coord: CoordSpec,
    pub theme: ThemeSpec,
    pub labels: Labels,
    pub size: Option<(f64, f64)>,
}

/// Plot labels (title, subtitle, caption)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Labels {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub caption: Option<String>,
}

// =============================================================================
// Mapping & data annotations
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MappingValue {
    /// Name of a data variable
    Variable(String),
    /// Inline values; materialized as a column named after the aesthetic
    Literal(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingSpec {
    pub aes: IndexMap<Aes, MappingValue>,
    /// Explicit grouping variable (`group` key)
    pub group: Option<String>,
}

impl MappingSpec {
    pub fn variable(&self, aes: Aes) -> Option<&str> {
        match self.aes.get(&aes) {
            Some(MappingValue::Variable(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aes.is_empty() && self.group.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesType {
    DateTime,
    Date,
    Time,
    Int,
    Float,
    Str,
    Bool,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesAnnotation {
    pub column: String,
    pub series_type: SeriesType,
    pub factor_levels: Option<Vec<Value>>,
    pub order: Option<i32>,
}

/// `as_discrete` annotation attached to an aesthetic mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MappingAnnotation {
    pub aes: Aes,
    pub label: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataMeta {
    pub series: Vec<SeriesAnnotation>,
    pub mappings: Vec<MappingAnnotation>,
}

impl DataMeta {
    pub fn series_for(&self, column: &str) -> Option<&SeriesAnnotation> {
        self.series.iter().find(|s| s.column == column)
    }

    pub fn as_discrete(&self, aes: Aes) -> Option<&MappingAnnotation> {
        self.mappings.iter().find(|m| m.aes == aes)
    }
}

// =============================================================================
// Layers
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub index: usize,
    pub geom: GeomKind,
    pub stat: Stat,
    pub mapping: MappingSpec,
    pub data: DataFrame,
    pub data_meta: DataMeta,
    pub position: Position,
    pub tooltips: TooltipSpec,
    pub inherit_aes: bool,
    pub show_legend: bool,
    pub orientation: Option<Aes>,
    /// Aesthetics set to a fixed value at layer level (e.g. `color: "red"`)
    pub constants: IndexMap<Aes, Value>,
    /// Geometry table supplied under `map`
    pub map: DataFrame,
    /// `map_join`: (data variables, map variables)
    pub map_join: Option<(Vec<String>, Vec<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Identity,
    Stack,
    Dodge,
    Fill,
    Jitter,
    JitterDodge,
    Nudge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    Gaussian,
    Rectangular,
    Triangular,
    Biweight,
    Epanechikov,
    Optcosine,
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    Nrd0,
    Nrd,
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityParams {
    pub kernel: Kernel,
    pub bw: Bandwidth,
    pub adjust: f64,
    pub n: Option<usize>,
    pub trim: bool,
    pub quantiles: Vec<f64>,
    pub quantile_lines: bool,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            kernel: Kernel::Gaussian,
            bw: Bandwidth::Nrd0,
            adjust: 1.0,
            n: None,
            trim: false,
            quantiles: vec![0.25, 0.5, 0.75],
            quantile_lines: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothMethod {
    Lm,
    Loess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Normal,
    Uniform,
    Exponential,
}

/// Statistical transform with its parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Stat {
    Identity,
    Count,
    Count2d,
    Bin {
        bins: usize,
        binwidth: Option<f64>,
        center: Option<f64>,
        boundary: Option<f64>,
    },
    Bin2d {
        bins: (usize, usize),
        binwidth: (Option<f64>, Option<f64>),
    },
    Density(DensityParams),
    Density2d {
        bins: usize,
        binwidth: Option<f64>,
        n: usize,
        adjust: f64,
    },
    Smooth {
        method: SmoothMethod,
        se: bool,
        level: f64,
        n: Option<usize>,
        span: f64,
    },
    Summary {
        fun: String,
        fun_min: String,
        fun_max: String,
    },
    Ecdf {
        n: Option<usize>,
        pad: bool,
    },
    Contour {
        bins: usize,
        binwidth: Option<f64>,
    },
    Boxplot {
        coef: f64,
    },
    Ydensity(DensityParams),
    Qq {
        distribution: Distribution,
    },
    QqLine {
        distribution: Distribution,
    },
    Sum,
}

impl Stat {
    pub fn name(&self) -> &'static str {
        match self {
            Stat::Identity => "identity",
            Stat::Count => "count",
            Stat::Count2d => "count2d",
            Stat::Bin { .. } => "bin",
            Stat::Bin2d { .. } => "bin2d",
            Stat::Density(_) => "density",
            Stat::Density2d { .. } => "density2d",
            Stat::Smooth { .. } => "smooth",
            Stat::Summary { .. } => "summary",
            Stat::Ecdf { .. } => "ecdf",
            Stat::Contour { .. } => "contour",
            Stat::Boxplot { .. } => "boxplot",
            Stat::Ydensity(_) => "ydensity",
            Stat::Qq { .. } => "qq",
            Stat::QqLine { .. } => "qq_line",
            Stat::Sum => "sum",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Stat::Identity)
    }
}

// =============================================================================
// Tooltips
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TooltipSpec {
    #[default]
    Default,
    /// `tooltips: "none"`
    Hidden,
    Custom(TooltipOptions),
}

impl TooltipSpec {
    /// Variables referenced with `@var` in lines or the title
    pub fn variables(&self) -> Vec<String> {
        let TooltipSpec::Custom(opts) = self else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        let patterns = opts.lines.iter().flatten().chain(opts.title.iter());
        for var in patterns.flat_map(LinePattern::variables) {
            if !out.iter().any(|v| v == var) {
                out.push(var.to_string());
            }
        }
        out
    }
}

/// One piece of a tooltip line pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LinePart {
    Text(String),
    Variable(String),
    Aes(Aes),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLabel {
    /// No separator in the pattern
    Unspecified,
    /// `@|`: use the default label of the single value in the line
    Default,
    /// `text|`; an empty text removes the label
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinePattern {
    pub label: LineLabel,
    pub parts: Vec<LinePart>,
}

impl LinePattern {
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            LinePart::Variable(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn aesthetics(&self) -> impl Iterator<Item = Aes> + '_ {
        self.parts.iter().filter_map(|p| match p {
            LinePart::Aes(a) => Some(*a),
            _ => None,
        })
    }

    /// A line made of exactly one value reference and nothing else
    pub fn single_value(&self) -> Option<&LinePart> {
        match self.parts.as_slice() {
            [part @ (LinePart::Variable(_) | LinePart::Aes(_))] => Some(part),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatField {
    Aes(Aes),
    /// `^X` / `^Y`: every positional aesthetic of that axis
    AxisFamily(Aes),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    pub field: FormatField,
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TooltipOptions {
    pub lines: Option<Vec<LinePattern>>,
    pub formats: Vec<FormatSpec>,
    pub anchor: Option<Anchor>,
    pub min_width: Option<f64>,
    pub title: Option<LinePattern>,
    pub color: Option<String>,
    pub disable_splitting: bool,
}

// =============================================================================
// Scales
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Identity,
    Log10,
    Log2,
    Sqrt,
    Symlog,
    Reverse,
}

impl TransformKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Identity => "identity",
            TransformKind::Log10 => "log10",
            TransformKind::Log2 => "log2",
            TransformKind::Sqrt => "sqrt",
            TransformKind::Symlog => "symlog",
            TransformKind::Reverse => "reverse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperKind {
    Identity,
    ColorGradient,
    ColorGradient2,
    ColorHue,
    ColorGrey,
    ColorBrewer,
    ColorManual,
    SizeArea,
    Discrete,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleSpec {
    pub aes: Option<Aes>,
    pub name: Option<String>,
    pub breaks: Option<Vec<Value>>,
    pub labels: Option<Vec<String>>,
    pub limits: Option<Vec<Value>>,
    pub trans: Option<TransformKind>,
    pub discrete: Option<bool>,
    pub reverse: bool,
    pub format: Option<String>,
    pub mapper_kind: Option<MapperKind>,
    pub palette: Option<String>,
    pub values: Option<Vec<Value>>,
    pub low: Option<String>,
    pub mid: Option<String>,
    pub high: Option<String>,
    pub na_value: Option<Value>,
    pub range: Option<(f64, f64)>,
    pub expand: Option<Vec<f64>>,
}

// =============================================================================
// Facets, coordinates, theme
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetScales {
    #[default]
    Fixed,
    Free,
    FreeX,
    FreeY,
}

impl FacetScales {
    pub fn free_x(&self) -> bool {
        matches!(self, FacetScales::Free | FacetScales::FreeX)
    }

    pub fn free_y(&self) -> bool {
        matches!(self, FacetScales::Free | FacetScales::FreeY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapDirection {
    /// Row-major
    H,
    /// Column-major
    V,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetSpec {
    Grid {
        x: Option<String>,
        y: Option<String>,
        x_order: i32,
        y_order: i32,
        x_format: Option<String>,
        y_format: Option<String>,
        scales: FacetScales,
    },
    Wrap {
        facets: Vec<String>,
        ncol: Option<usize>,
        nrow: Option<usize>,
        order: Vec<i32>,
        format: Vec<Option<String>>,
        dir: WrapDirection,
        scales: FacetScales,
    },
}

impl FacetSpec {
    pub fn variables(&self) -> Vec<String> {
        match self {
            FacetSpec::Grid { x, y, .. } => x.iter().chain(y.iter()).cloned().collect(),
            FacetSpec::Wrap { facets, .. } => facets.clone(),
        }
    }

    pub fn scales(&self) -> FacetScales {
        match self {
            FacetSpec::Grid { scales, .. } | FacetSpec::Wrap { scales, .. } => *scales,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordKind {
    #[default]
    Cartesian,
    Fixed,
    Flip,
    Polar,
    Map,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordSpec {
    pub kind: CoordKind,
    pub xlim: Option<(Option<f64>, Option<f64>)>,
    pub ylim: Option<(Option<f64>, Option<f64>)>,
    pub ratio: Option<f64>,
    pub flip: bool,
    pub theta: Option<Aes>,
    pub start: Option<f64>,
    pub direction: Option<i32>,
    pub projection: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeElement {
    Blank,
    Element(serde_json::Map<String, serde_json::Value>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThemeSpec {
    /// Named base theme (`minimal`, `classic`, `void`, ...)
    pub name: Option<String>,
    pub elements: IndexMap<String, ThemeElement>,
}
