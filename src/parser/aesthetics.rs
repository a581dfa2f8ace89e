// Aesthetic identifiers

use serde::Serialize;
use std::fmt;

/// A named visual channel a geom can bind to data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aes {
    X,
    Y,
    Z,
    Xmin,
    Xmax,
    Ymin,
    Ymax,
    Xend,
    Yend,
    Xintercept,
    Yintercept,
    Slope,
    Intercept,
    Lower,
    Middle,
    Upper,
    Width,
    Height,
    Violinwidth,
    Sample,
    Quantile,
    Color,
    Fill,
    Alpha,
    Size,
    Shape,
    Linetype,
    Stroke,
    Weight,
    Label,
    Angle,
    Family,
    Fontface,
    Hjust,
    Vjust,
    MapId,
}

const ALL: &[Aes] = &[
    Aes::X,
    Aes::Y,
    Aes::Z,
    Aes::Xmin,
    Aes::Xmax,
    Aes::Ymin,
    Aes::Ymax,
    Aes::Xend,
    Aes::Yend,
    Aes::Xintercept,
    Aes::Yintercept,
    Aes::Slope,
    Aes::Intercept,
    Aes::Lower,
    Aes::Middle,
    Aes::Upper,
    Aes::Width,
    Aes::Height,
    Aes::Violinwidth,
    Aes::Sample,
    Aes::Quantile,
    Aes::Color,
    Aes::Fill,
    Aes::Alpha,
    Aes::Size,
    Aes::Shape,
    Aes::Linetype,
    Aes::Stroke,
    Aes::Weight,
    Aes::Label,
    Aes::Angle,
    Aes::Family,
    Aes::Fontface,
    Aes::Hjust,
    Aes::Vjust,
    Aes::MapId,
];

impl Aes {
    pub fn all() -> &'static [Aes] {
        ALL
    }

    pub fn name(&self) -> &'static str {
        match self {
            Aes::X => "x",
            Aes::Y => "y",
            Aes::Z => "z",
            Aes::Xmin => "xmin",
            Aes::Xmax => "xmax",
            Aes::Ymin => "ymin",
            Aes::Ymax => "ymax",
            Aes::Xend => "xend",
            Aes::Yend => "yend",
            Aes::Xintercept => "xintercept",
            Aes::Yintercept => "yintercept",
            Aes::Slope => "slope",
            Aes::Intercept => "intercept",
            Aes::Lower => "lower",
            Aes::Middle => "middle",
            Aes::Upper => "upper",
            Aes::Width => "width",
            Aes::Height => "height",
            Aes::Violinwidth => "violinwidth",
            Aes::Sample => "sample",
            Aes::Quantile => "quantile",
            Aes::Color => "color",
            Aes::Fill => "fill",
            Aes::Alpha => "alpha",
            Aes::Size => "size",
            Aes::Shape => "shape",
            Aes::Linetype => "linetype",
            Aes::Stroke => "stroke",
            Aes::Weight => "weight",
            Aes::Label => "label",
            Aes::Angle => "angle",
            Aes::Family => "family",
            Aes::Fontface => "fontface",
            Aes::Hjust => "hjust",
            Aes::Vjust => "vjust",
            Aes::MapId => "map_id",
        }
    }

    /// Look up an aesthetic by name. Aliases are handled by the preprocessor,
    /// but `colour` is accepted here too for specs built by hand.
    pub fn from_name(name: &str) -> Option<Aes> {
        match name {
            "colour" => Some(Aes::Color),
            _ => ALL.iter().copied().find(|a| a.name() == name),
        }
    }

    pub fn is_positional_x(&self) -> bool {
        matches!(
            self,
            Aes::X | Aes::Xmin | Aes::Xmax | Aes::Xend | Aes::Xintercept
        )
    }

    pub fn is_positional_y(&self) -> bool {
        matches!(
            self,
            Aes::Y
                | Aes::Ymin
                | Aes::Ymax
                | Aes::Yend
                | Aes::Yintercept
                | Aes::Lower
                | Aes::Middle
                | Aes::Upper
        )
    }

    pub fn is_positional(&self) -> bool {
        self.is_positional_x() || self.is_positional_y()
    }

    /// The axis aesthetic whose scale this aesthetic shares, if positional
    pub fn axis(&self) -> Option<Aes> {
        if self.is_positional_x() {
            Some(Aes::X)
        } else if self.is_positional_y() {
            Some(Aes::Y)
        } else {
            None
        }
    }

    /// The aesthetic owning the scale used by this one
    pub fn scale_aes(&self) -> Aes {
        self.axis().unwrap_or(*self)
    }

    /// Aesthetics that never get a scale of their own
    pub fn has_scale(&self) -> bool {
        !matches!(
            self,
            Aes::Weight
                | Aes::Label
                | Aes::Family
                | Aes::Fontface
                | Aes::Hjust
                | Aes::Vjust
                | Aes::Angle
                | Aes::MapId
                | Aes::Sample
                | Aes::Quantile
                | Aes::Violinwidth
                | Aes::Width
                | Aes::Height
                | Aes::Slope
                | Aes::Intercept
                | Aes::Z
        )
    }

    pub fn is_color(&self) -> bool {
        matches!(self, Aes::Color | Aes::Fill)
    }

    /// Counterpart on the other axis, for `orientation: y` layers
    pub fn flipped(&self) -> Aes {
        match self {
            Aes::X => Aes::Y,
            Aes::Y => Aes::X,
            Aes::Xmin => Aes::Ymin,
            Aes::Ymin => Aes::Xmin,
            Aes::Xmax => Aes::Ymax,
            Aes::Ymax => Aes::Xmax,
            Aes::Xend => Aes::Yend,
            Aes::Yend => Aes::Xend,
            Aes::Xintercept => Aes::Yintercept,
            Aes::Yintercept => Aes::Xintercept,
            Aes::Width => Aes::Height,
            Aes::Height => Aes::Width,
            other => *other,
        }
    }
}

impl fmt::Display for Aes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for aes in Aes::all() {
            assert_eq!(Aes::from_name(aes.name()), Some(*aes));
        }
    }

    #[test]
    fn test_colour_alias() {
        assert_eq!(Aes::from_name("colour"), Some(Aes::Color));
        assert_eq!(Aes::from_name("nope"), None);
    }

    #[test]
    fn test_positional_families() {
        assert_eq!(Aes::Xend.axis(), Some(Aes::X));
        assert_eq!(Aes::Middle.axis(), Some(Aes::Y));
        assert_eq!(Aes::Fill.axis(), None);
        assert_eq!(Aes::Ymax.scale_aes(), Aes::Y);
        assert_eq!(Aes::Size.scale_aes(), Aes::Size);
    }

    #[test]
    fn test_flipped_is_involution() {
        for aes in Aes::all() {
            assert_eq!(aes.flipped().flipped(), *aes);
        }
        assert_eq!(Aes::Xmin.flipped(), Aes::Ymin);
        assert_eq!(Aes::Color.flipped(), Aes::Color);
    }

    #[test]
    fn test_unscaled_aesthetics() {
        assert!(!Aes::Label.has_scale());
        assert!(Aes::Color.has_scale());
    }
}
