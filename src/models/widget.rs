//! Widget model.

use super::menu::Content;
use super::PropertyMap;

/// A widget that can be assigned to menu items.
///
/// Custom widgets (`type="custom"`) reference a user-editable item list; the
/// `slot` names which widget property slot they apply to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub name: String,
    pub label: String,
    pub path: String,
    pub widget_type: String,
    pub target: String,
    pub icon: String,
    /// Property condition evaluated against item properties.
    pub condition: String,
    /// Host-runtime visibility condition, passed through.
    pub visible: String,
    pub sort_by: String,
    pub sort_order: String,
    pub limit: Option<i64>,
    pub source: String,
    pub slot: String,
}

impl Widget {
    pub fn is_custom(&self) -> bool {
        self.widget_type == "custom"
    }

    /// Convert to the fixed property map exposed to skins.
    pub fn to_properties(&self, prefix: &str) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert(prefix.to_string(), self.name.clone());
        props.insert(format!("{}Label", prefix), self.label.clone());
        props.insert(format!("{}Path", prefix), self.path.clone());
        props.insert(format!("{}Target", prefix), self.target.clone());
        if !self.widget_type.is_empty() {
            props.insert(format!("{}Type", prefix), self.widget_type.clone());
        }
        if !self.source.is_empty() {
            props.insert(format!("{}Source", prefix), self.source.clone());
        }
        props
    }
}

/// A grouping entry in the widget picker.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetGroupEntry {
    Widget(Widget),
    Group(WidgetGroup),
    Content(Content),
}

/// A group/category of widgets in groupings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetGroup {
    pub name: String,
    pub label: String,
    pub condition: String,
    pub visible: String,
    pub icon: String,
    pub items: Vec<WidgetGroupEntry>,
}

/// Widget configuration including widgets, groupings, and settings.
#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    pub widgets: Vec<Widget>,
    pub groupings: Vec<WidgetGroupEntry>,
    pub show_get_more: bool,
}

impl WidgetConfig {
    pub fn get_widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }
}
