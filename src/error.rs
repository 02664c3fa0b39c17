use thiserror::Error;

/// Scope engine error types
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not add target \"{target}\": {source}")]
    InvalidTarget {
        target: String,
        source: Box<ScopeError>,
    },

    #[error("Invalid entry kind: {0}")]
    InvalidKind(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScopeError {
    /// Wrap a failure with the target that caused it.
    pub(crate) fn invalid_target(target: impl Into<String>, source: ScopeError) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if this error (or the error it wraps) is a validation failure.
    pub fn is_validation(&self) -> bool {
        match self {
            ScopeError::Validation(_) => true,
            ScopeError::InvalidTarget { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScopeError>;
