//! Skin Shortcuts Compiler
//!
//! A batch compiler turning declarative skin menu configuration (menus,
//! widgets, backgrounds, properties, templates, views) plus a user
//! customization overlay into a single runtime include XML document.

// ============================================================================
// PUBLIC API - High-Level Interface
// ============================================================================

/// Build pipeline: hash gate, loading, merging, assembly, output.
pub mod pipeline;

/// Configuration system (compile-time constants + runtime preferences)
pub mod config;

// ============================================================================
// PUBLIC API - Core Types (Re-exports)
// ============================================================================

pub use pipeline::{build, clear_custom_widget, reset_all, reset_menus, reset_views};
pub use pipeline::{BuildError, BuildOptions, BuildOutcome, SkinConfig};

// ============================================================================
// PUBLIC API - Stage Access
// ============================================================================

/// Condition evaluation over property maps
pub mod conditions;

/// $MATH / $IF / $PROPERTY expression forms
pub mod expressions;

/// Typed configuration models
pub mod models;

/// XML loaders and the suffix transformer
pub mod loaders;

/// User-data overlay and menu merging
pub mod userdata;

/// Rebuild fingerprints
pub mod hashing;

/// Output builders (includes, templates, view expressions)
pub mod builders;

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub mod error {
    pub use crate::builders::TemplateError;
    pub use crate::loaders::ConfigError;
    pub use crate::pipeline::BuildError;
}

// ============================================================================
// INTERNAL MODULES
// ============================================================================

pub mod logging;

pub(crate) mod utils;

// ============================================================================
// LIBRARY INFORMATION
// ============================================================================

/// Compiler implementation version
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library capability information
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub compiler_version: &'static str,
    pub config_files: usize,
    pub supports_multi_output_templates: bool,
}

/// Get library information
pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        compiler_version: COMPILER_VERSION,
        config_files: 6,
        supports_multi_output_templates: true,
    }
}

impl LibraryInfo {
    pub fn summary(&self) -> String {
        format!(
            "Skin Shortcuts Compiler v{}\n\
             Config files: {}, Multi-output templates: {}",
            self.compiler_version, self.config_files, self.supports_multi_output_templates
        )
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize the compiler library.
///
/// Call once at startup to initialize global logging.
pub fn init() -> Result<(), String> {
    logging::init_global_logging()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_info() {
        let info = get_library_info();
        assert_eq!(info.config_files, 6);
        assert!(info.summary().contains(info.compiler_version));
    }
}
