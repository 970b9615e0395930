//! Domain models for the skin shortcuts compiler.

pub mod background;
pub mod menu;
pub mod property;
pub mod template;
pub mod views;
pub mod widget;

/// Insertion-ordered string-to-string map used for every observable
/// property dictionary in the pipeline.
pub type PropertyMap = indexmap::IndexMap<String, String>;

pub use background::{
    Background, BackgroundConfig, BackgroundGroup, BackgroundGroupEntry, BackgroundType,
    BrowseSource, PlaylistSource,
};
pub use menu::{
    Action, ActionOverride, ActionPosition, Content, DefaultAction, GroupEntry, IconSource,
    IncludePosition, ItemInclude, Menu, MenuAllow, MenuConfig, MenuDefaults, MenuItem, Protection,
    Shortcut, ShortcutGroup, SubDialog,
};
pub use property::{
    ButtonMapping, FallbackRule, IconVariant, PropertyFallback, PropertySchema, SchemaOption,
    SchemaProperty,
};
pub use template::{
    BuildMode, ExpressionDefinition, GroupReference, IncludeDefinition, ListItem, Preset,
    PresetGroup, PresetGroupChild, PresetValues, PropertyGroup, SubmenuTemplate, Template,
    TemplateOnly, TemplateOutput, TemplateParam, TemplateProperty, TemplateSchema, TemplateVar,
    VarValue, VariableDefinition, VariableGroup, VariableReference,
};
pub use views::{View, ViewConfig, ViewContent};
pub use widget::{Widget, WidgetConfig, WidgetGroup, WidgetGroupEntry};
