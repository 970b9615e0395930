//! Consolidated error codes and classification system
//!
//! Single source of truth for all error and success codes emitted by the
//! build pipeline, together with their behavioral metadata.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct CodeMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Configuration loading error codes
pub mod config {
    use super::Code;

    pub const MENU_CONFIG_ERROR: Code = Code::new("E101");
    pub const WIDGET_CONFIG_ERROR: Code = Code::new("E102");
    pub const BACKGROUND_CONFIG_ERROR: Code = Code::new("E103");
    pub const PROPERTY_CONFIG_ERROR: Code = Code::new("E104");
    pub const TEMPLATE_CONFIG_ERROR: Code = Code::new("E105");
    pub const VIEW_CONFIG_ERROR: Code = Code::new("E106");
    pub const IO_ERROR: Code = Code::new("E111");
}

/// Condition and expression evaluation codes
pub mod expression {
    use super::Code;

    pub const MATH_EVALUATION_FAILED: Code = Code::new("E201");
    pub const CONDITION_DEPTH_EXCEEDED: Code = Code::new("E202");
    pub const EXPRESSION_DEPTH_EXCEEDED: Code = Code::new("E203");
}

/// User-data merge codes
pub mod merge {
    use super::Code;

    pub const USERDATA_UNREADABLE: Code = Code::new("E301");
    pub const OVERRIDE_ENTRY_INVALID: Code = Code::new("E302");
}

/// Template processing codes
pub mod template {
    use super::Code;

    pub const INCLUDE_DEPTH_EXCEEDED: Code = Code::new("E401");
    pub const MISSING_INCLUDE_DEFINITION: Code = Code::new("E402");
    pub const MISSING_PRESET: Code = Code::new("E403");
    pub const MISSING_VARIABLE_GROUP: Code = Code::new("E404");
    pub const ORPHAN_SUBMENU: Code = Code::new("E405");
}

/// Build-level codes
pub mod build {
    use super::Code;

    pub const OUTPUT_WRITE_FAILED: Code = Code::new("E501");
    pub const HASH_WRITE_FAILED: Code = Code::new("E502");
    pub const NO_OUTPUT_PATHS: Code = Code::new("E503");
}

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("S000");
    pub const BUILD_COMPLETE: Code = Code::new("S001");
    pub const CONFIG_LOADED: Code = Code::new("S002");
    pub const MERGE_COMPLETE: Code = Code::new("S003");
    pub const TEMPLATES_BUILT: Code = Code::new("S004");
    pub const OUTPUT_WRITTEN: Code = Code::new("S005");
    pub const FINGERPRINTS_STORED: Code = Code::new("S006");
    pub const UP_TO_DATE: Code = Code::new("S007");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

static METADATA: OnceLock<HashMap<&'static str, CodeMetadata>> = OnceLock::new();

fn metadata_registry() -> &'static HashMap<&'static str, CodeMetadata> {
    METADATA.get_or_init(|| {
        let entries = [
            CodeMetadata {
                code: "ERR001",
                category: "System",
                severity: Severity::Critical,
                recoverable: false,
                requires_halt: true,
                description: "Internal error",
            },
            CodeMetadata {
                code: "ERR002",
                category: "System",
                severity: Severity::Critical,
                recoverable: false,
                requires_halt: true,
                description: "Initialization failure",
            },
            CodeMetadata {
                code: "E101",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "menus.xml is invalid",
            },
            CodeMetadata {
                code: "E102",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "widgets.xml is invalid",
            },
            CodeMetadata {
                code: "E103",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "backgrounds.xml is invalid",
            },
            CodeMetadata {
                code: "E104",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "properties.xml is invalid",
            },
            CodeMetadata {
                code: "E105",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "templates.xml is invalid",
            },
            CodeMetadata {
                code: "E106",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "views.xml is invalid",
            },
            CodeMetadata {
                code: "E111",
                category: "Config",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "Configuration file could not be read",
            },
            CodeMetadata {
                code: "E201",
                category: "Expression",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "$MATH expression did not evaluate; original text kept",
            },
            CodeMetadata {
                code: "E202",
                category: "Expression",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Condition nesting exceeded the depth limit",
            },
            CodeMetadata {
                code: "E203",
                category: "Expression",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "$EXP expansion exceeded the depth limit",
            },
            CodeMetadata {
                code: "E301",
                category: "Merge",
                severity: Severity::Medium,
                recoverable: true,
                requires_halt: false,
                description: "User data file unreadable; defaults used",
            },
            CodeMetadata {
                code: "E302",
                category: "Merge",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Invalid override entry skipped",
            },
            CodeMetadata {
                code: "E401",
                category: "Template",
                severity: Severity::Medium,
                recoverable: true,
                requires_halt: false,
                description: "Include splice exceeded the depth limit",
            },
            CodeMetadata {
                code: "E402",
                category: "Template",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Referenced include definition does not exist",
            },
            CodeMetadata {
                code: "E403",
                category: "Template",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Referenced preset does not exist",
            },
            CodeMetadata {
                code: "E404",
                category: "Template",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Referenced variable group does not exist",
            },
            CodeMetadata {
                code: "E405",
                category: "Template",
                severity: Severity::Low,
                recoverable: true,
                requires_halt: false,
                description: "Submenu is not referenced by any item",
            },
            CodeMetadata {
                code: "E501",
                category: "Build",
                severity: Severity::Critical,
                recoverable: false,
                requires_halt: true,
                description: "Output file could not be written",
            },
            CodeMetadata {
                code: "E502",
                category: "Build",
                severity: Severity::Medium,
                recoverable: true,
                requires_halt: false,
                description: "Fingerprint file could not be written",
            },
            CodeMetadata {
                code: "E503",
                category: "Build",
                severity: Severity::High,
                recoverable: false,
                requires_halt: true,
                description: "No output paths configured",
            },
        ];

        let mut map = HashMap::new();
        for entry in entries {
            map.insert(entry.code, entry);
        }
        map
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_description(code: &str) -> &'static str {
    metadata_registry()
        .get(code)
        .map(|m| m.description)
        .unwrap_or("Unknown error")
}

pub fn get_category(code: &str) -> &'static str {
    if code.starts_with('S') {
        return "Success";
    }
    metadata_registry()
        .get(code)
        .map(|m| m.category)
        .unwrap_or("Unknown")
}

pub fn get_severity(code: &str) -> Severity {
    metadata_registry()
        .get(code)
        .map(|m| m.severity)
        .unwrap_or(Severity::Low)
}

pub fn is_recoverable(code: &str) -> bool {
    metadata_registry()
        .get(code)
        .map(|m| m.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    metadata_registry()
        .get(code)
        .map(|m| m.requires_halt)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(config::MENU_CONFIG_ERROR.to_string(), "E101");
        assert_eq!(success::BUILD_COMPLETE.as_str(), "S001");
    }

    #[test]
    fn test_metadata_lookup() {
        assert_eq!(get_category("E101"), "Config");
        assert!(requires_halt("E101"));
        assert!(!requires_halt("E302"));
        assert!(is_recoverable("E201"));
        assert_eq!(get_severity("ERR001"), Severity::Critical);
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_description("E999"), "Unknown error");
        assert_eq!(get_category("E999"), "Unknown");
        assert!(!requires_halt("E999"));
    }

    #[test]
    fn test_success_category() {
        assert_eq!(get_category("S001"), "Success");
    }
}
