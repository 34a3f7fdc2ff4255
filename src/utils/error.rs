use std::fmt;

/// Error type for the numeric and domain layer of the tools
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Unknown pooling method, classifier name or similar misconfiguration
    ConfigError(String),
    /// Malformed numeric or JSON fields, missing columns, ragged vectors
    ParseError(String),
    /// Feature matrix empty or containing NaN/Inf
    ValidationError(String),
    /// Data that is well-formed but unusable (unexpected genre, empty join)
    DomainError(String),
    /// A delegated learner, projection or renderer failed
    ModelError(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::ConfigError(msg) => write!(f, "ConfigError: {}", msg),
            ToolError::ParseError(msg) => write!(f, "ParseError: {}", msg),
            ToolError::ValidationError(msg) => write!(f, "ValidationError: {}", msg),
            ToolError::DomainError(msg) => write!(f, "DomainError: {}", msg),
            ToolError::ModelError(msg) => write!(f, "ModelError: {}", msg),
        }
    }
}

impl std::error::Error for ToolError {}
