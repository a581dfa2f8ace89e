// Spec normalizer: raw spec tree to typed plot specs

pub mod aesthetics;
pub mod ast;
pub mod coord;
pub mod facet;
pub mod geom;
pub mod lexer;
pub mod options;
pub mod scale;
pub mod spec;
pub mod stat;
pub mod theme;
pub mod tooltip;

// Public API re-exports
pub use aesthetics::Aes;
pub use ast::{FigureSpec, LayerSpec, PlotSpec};
pub use geom::GeomKind;
pub use spec::{normalize_figure, normalize_plot};
