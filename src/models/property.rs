//! Property schema models.

use indexmap::IndexMap;

/// Icon with optional condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IconVariant {
    pub path: String,
    pub condition: String,
}

/// Option for a schema property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaOption {
    pub value: String,
    pub label: String,
    pub condition: String,
    pub icons: Vec<IconVariant>,
}

/// Button to property mapping from the buttons section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ButtonMapping {
    pub button_id: i64,
    pub property_name: String,
    /// When true, the active widget-slot suffix is appended at runtime.
    pub suffix: bool,
    pub title: String,
    pub show_none: bool,
    pub show_icons: bool,
    pub property_type: String,
    pub requires: String,
}

/// Property definition from the schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    /// Consumed by templates only; excluded from emitted item properties.
    pub template_only: bool,
    pub requires: String,
    pub options: Vec<SchemaOption>,
    pub property_type: String,
}

/// A single fallback rule with condition. Empty condition means default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackRule {
    pub value: String,
    pub condition: String,
}

/// Fallback configuration for a property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFallback {
    pub property_name: String,
    pub rules: Vec<FallbackRule>,
}

/// Complete property schema.
#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    pub properties: IndexMap<String, SchemaProperty>,
    pub fallbacks: IndexMap<String, PropertyFallback>,
    pub buttons: IndexMap<i64, ButtonMapping>,
}

impl PropertySchema {
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    pub fn get_button(&self, button_id: i64) -> Option<&ButtonMapping> {
        self.buttons.get(&button_id)
    }

    /// Whether a property name is marked template-only.
    pub fn is_template_only(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .map(|p| p.template_only)
            .unwrap_or(false)
    }
}
