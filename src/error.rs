//! Bundler error types.
//!
//! Closed taxonomy: every fatal condition maps to one stable code that the
//! CLI and external tooling can match on. Lint findings are not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("No {config_path} found in {directory}")]
    ConfigNotFound {
        directory: String,
        config_path: String,
    },

    #[error("Failed to parse {config_path}: {underlying}")]
    ConfigParseError {
        config_path: String,
        underlying: String,
    },

    #[error("Invalid config {}:\n  - {}", .config_path, .errors.join("\n  - "))]
    InvalidConfig {
        config_path: String,
        errors: Vec<String>,
    },

    #[error("Module '{module_name}' not found (required by {required_by}:{line})")]
    ModuleNotFound {
        module_name: String,
        required_by: String,
        line: u32,
    },

    #[error("Circular dependency detected:\n  {}", format_cycles(.cycles))]
    CircularDependency { cycles: Vec<Vec<String>> },
}

impl BundleError {
    /// Stable machine-readable tag for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BundleError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            BundleError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            BundleError::InvalidConfig { .. } => "INVALID_CONFIG",
            BundleError::ModuleNotFound { .. } => "MODULE_NOT_FOUND",
            BundleError::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
        }
    }
}

/// Render each cycle as `a → b → a`, one per line.
fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut nodes: Vec<&str> = cycle.iter().map(String::as_str).collect();
            if let Some(first) = nodes.first().copied() {
                nodes.push(first);
            }
            nodes.join(" → ")
        })
        .collect::<Vec<_>>()
        .join("\n  ")
}
