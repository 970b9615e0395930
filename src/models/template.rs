//! Template schema models for templates.xml.

use indexmap::IndexMap;
use xmltree::Element;

use super::PropertyMap;

/// Template iteration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Iterate menu items (default).
    #[default]
    Menu,
    /// Iterate the template's own <list> rows.
    List,
    /// Emit once with no item.
    Raw,
}

/// Include-file emission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateOnly {
    /// Always emit the include.
    #[default]
    No,
    /// Never emit the include; variables still run.
    Always,
    /// Emit only when some item property assigns the template.
    Auto,
}

/// Parameter for raw-mode templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParam {
    pub name: String,
    pub default: String,
}

/// One declared output of a template. A template without explicit outputs
/// has a single implicit output with no suffix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOutput {
    pub include: String,
    pub id_prefix: String,
    pub suffix: String,
}

/// Property assignment in a template.
///
/// Exactly one of `value` (literal) or `from` (source lookup) is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateProperty {
    pub name: String,
    pub value: String,
    pub from: String,
    pub condition: String,
}

/// One (condition, value) pair of a var.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarValue {
    pub condition: String,
    pub value: String,
}

/// Multi-conditional property; the first matching value wins and a trailing
/// empty-condition pair is the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateVar {
    pub name: String,
    pub values: Vec<VarValue>,
}

/// A single row in a preset lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetValues {
    pub condition: String,
    pub values: PropertyMap,
}

/// Lookup table returning multiple values based on conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preset {
    pub name: String,
    pub rows: Vec<PresetValues>,
}

/// A child of a presetGroup: either a preset reference or inline values.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetGroupChild {
    Preset { name: String, condition: String },
    Values { condition: String, values: PropertyMap },
}

/// Conditional preset selection; children evaluated in document order,
/// first match wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetGroup {
    pub name: String,
    pub children: Vec<PresetGroupChild>,
}

/// Reusable property group definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyGroup {
    pub name: String,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
}

/// Reference to a named group/preset, with suffix and condition tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupReference {
    pub name: String,
    pub suffix: String,
    pub condition: String,
}

/// Reusable control fragment spliced via <skinshortcuts include="..."/>.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDefinition {
    pub name: String,
    pub controls: Option<Element>,
}

/// Item in a <list> for list-mode templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListItem {
    pub attributes: PropertyMap,
}

/// A host variable definition with $PROPERTY placeholders in its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub condition: String,
    /// Output name pattern; the definition name is used when empty.
    pub output: String,
    pub content: Option<Element>,
}

/// Reference to a variable definition within a variableGroup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableReference {
    pub name: String,
    pub condition: String,
}

/// Group of variable references, possibly nesting other groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableGroup {
    pub name: String,
    pub references: Vec<VariableReference>,
    pub group_refs: Vec<String>,
}

/// A named expression usable as $EXP[name] inside conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionDefinition {
    pub value: String,
    /// When true, the expansion is protected from suffix transforms.
    pub nosuffix: bool,
}

/// Main template definition.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub include: String,
    pub build: BuildMode,
    pub id_prefix: String,
    pub template_only: TemplateOnly,
    /// Restrict menu-mode iteration to a single menu when set.
    pub menu_filter: String,
    /// ANDed conditions gating each iteration.
    pub conditions: Vec<String>,
    /// Explicit multi-output declarations.
    pub outputs: Vec<TemplateOutput>,
    pub params: Vec<TemplateParam>,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub property_groups: Vec<GroupReference>,
    pub preset_refs: Vec<GroupReference>,
    pub preset_group_refs: Vec<GroupReference>,
    pub list_items: Vec<ListItem>,
    pub controls: Option<Element>,
    pub variables: Vec<VariableDefinition>,
    pub variable_groups: Vec<GroupReference>,
}

impl Template {
    /// The outputs this template produces: the explicit list, or a single
    /// implicit output built from the template's own attributes.
    pub fn effective_outputs(&self) -> Vec<TemplateOutput> {
        if self.outputs.is_empty() {
            vec![TemplateOutput {
                include: self.include.clone(),
                id_prefix: self.id_prefix.clone(),
                suffix: String::new(),
            }]
        } else {
            self.outputs.clone()
        }
    }
}

/// Submenu template definition.
#[derive(Debug, Clone, Default)]
pub struct SubmenuTemplate {
    pub include: String,
    pub level: i64,
    pub name: String,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub property_groups: Vec<GroupReference>,
    pub controls: Option<Element>,
}

/// Complete template schema from templates.xml.
#[derive(Debug, Clone, Default)]
pub struct TemplateSchema {
    pub expressions: IndexMap<String, ExpressionDefinition>,
    pub property_groups: IndexMap<String, PropertyGroup>,
    pub includes: IndexMap<String, IncludeDefinition>,
    pub presets: IndexMap<String, Preset>,
    pub preset_groups: IndexMap<String, PresetGroup>,
    pub variable_definitions: IndexMap<String, VariableDefinition>,
    pub variable_groups: IndexMap<String, VariableGroup>,
    pub templates: Vec<Template>,
    pub submenus: Vec<SubmenuTemplate>,
}

impl TemplateSchema {
    pub fn get_expression(&self, name: &str) -> Option<&ExpressionDefinition> {
        self.expressions.get(name)
    }

    pub fn get_property_group(&self, name: &str) -> Option<&PropertyGroup> {
        self.property_groups.get(name)
    }

    pub fn get_include(&self, name: &str) -> Option<&IncludeDefinition> {
        self.includes.get(name)
    }

    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn get_preset_group(&self, name: &str) -> Option<&PresetGroup> {
        self.preset_groups.get(name)
    }

    pub fn get_variable_definition(&self, name: &str) -> Option<&VariableDefinition> {
        self.variable_definitions.get(name)
    }

    pub fn get_variable_group(&self, name: &str) -> Option<&VariableGroup> {
        self.variable_groups.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
            && self.variable_definitions.is_empty()
            && self.variable_groups.is_empty()
    }
}
