/// Utility modules for error handling and output formatting
pub mod error;
pub mod format;

// Re-export commonly used types
pub use error::ToolError;
pub use format::{format_float, format_vector};
