// Error taxonomy for plot resolution

/// Main error type. Every variant is terminal for the whole plot.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    /// Malformed or missing spec keys, reported with the path of the offending node
    #[error("Spec error at '{path}': {message}")]
    SpecStructure { path: String, message: String },

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("{0}")]
    OrderingConflict(String),

    #[error("Stat error: {0}")]
    StatConfig(String),

    #[error("Scale error: {0}")]
    ScaleConfig(String),

    /// Violation of a DataFrame invariant (ragged columns, unknown variable)
    #[error("Data frame error: {0}")]
    Frame(String),
}

impl PlotError {
    pub fn spec(path: impl Into<String>, message: impl Into<String>) -> Self {
        PlotError::SpecStructure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-raise a frame error as a spec error located at `path`.
    pub fn at(self, path: &str) -> Self {
        match self {
            PlotError::Frame(message) => PlotError::spec(path, message),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_error_message_has_path() {
        let err = PlotError::spec("layers[0].geom", "Unknown geom 'blob'");
        assert_eq!(err.to_string(), "Spec error at 'layers[0].geom': Unknown geom 'blob'");
    }

    #[test]
    fn test_frame_error_relocated() {
        let err = PlotError::Frame("ragged".to_string()).at("data");
        assert!(matches!(err, PlotError::SpecStructure { ref path, .. } if path == "data"));

        let err = PlotError::Binding("x".to_string()).at("data");
        assert!(matches!(err, PlotError::Binding(_)));
    }

    #[test]
    fn test_ordering_message_verbatim() {
        let err = PlotError::OrderingConflict("Multiple ordering options".to_string());
        assert_eq!(err.to_string(), "Multiple ordering options");
    }
}
