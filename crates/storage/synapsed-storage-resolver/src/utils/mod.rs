//! Utility modules for storage resolution

pub mod path;

// Re-export commonly used utilities
pub use path::{join_namespace, sanitize_path};
