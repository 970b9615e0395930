//! Menu graph models: menus, items, actions, groupings.

use serde::{Deserialize, Serialize};

use super::PropertyMap;

/// A single click action with an optional host-runtime condition.
///
/// Serialized into user data as `{"action": ..., "condition"?: ...}`;
/// a bare string is accepted for older documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionRepr")]
pub struct Action {
    pub action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

impl Action {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            condition: String::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionRepr {
    Full {
        action: String,
        #[serde(default)]
        condition: String,
    },
    Plain(String),
}

impl From<ActionRepr> for Action {
    fn from(repr: ActionRepr) -> Self {
        match repr {
            ActionRepr::Full { action, condition } => Action { action, condition },
            ActionRepr::Plain(action) => Action {
                action,
                condition: String::new(),
            },
        }
    }
}

/// When a menu-level default action fires relative to the item's own actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionPosition {
    #[default]
    Before,
    After,
}

/// A default action declared on the menu and applied to every item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultAction {
    pub action: String,
    pub condition: String,
    pub when: ActionPosition,
}

/// Where an include reference is emitted relative to the onclick block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludePosition {
    #[default]
    BeforeOnClick,
    AfterOnClick,
}

/// A named include emitted inside an item element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInclude {
    pub name: String,
    pub condition: String,
    pub position: IncludePosition,
}

/// Protection record carried for the external management dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protection {
    pub condition: String,
    pub message: String,
}

/// The atomic menu unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItem {
    pub name: String,
    pub label: String,
    pub actions: Vec<Action>,
    pub label2: String,
    pub icon: String,
    pub thumb: String,
    /// Host-runtime visibility string emitted into the output.
    pub visible: String,
    /// Host-runtime visibility string consumed only by the external dialog.
    pub dialog_visible: String,
    pub disabled: bool,
    /// Deletion-forbidden: removals in user data are ignored for this item.
    pub required: bool,
    pub protection: Option<Protection>,
    /// Submenu reference by name; empty means "use the item's own name".
    pub submenu: String,
    pub properties: PropertyMap,
    /// The default action before any user override, kept for protection checks.
    pub original_action: String,
    pub includes: Vec<ItemInclude>,
}

impl MenuItem {
    /// The action string emitted as the item's `path` property.
    pub fn primary_action(&self) -> &str {
        self.actions
            .iter()
            .find(|a| a.condition.is_empty())
            .or_else(|| self.actions.first())
            .map(|a| a.action.as_str())
            .unwrap_or("")
    }
}

/// Menu-level defaults applied to every item of the menu.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuDefaults {
    pub properties: PropertyMap,
    pub actions: Vec<DefaultAction>,
    pub includes: Vec<ItemInclude>,
}

/// Feature flags the management dialog honors per menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuAllow {
    pub add: bool,
    pub remove: bool,
    pub reorder: bool,
}

impl Default for MenuAllow {
    fn default() -> Self {
        Self {
            add: true,
            remove: true,
            reorder: true,
        }
    }
}

/// A named ordered list of menu items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Menu {
    pub name: String,
    pub items: Vec<MenuItem>,
    pub defaults: MenuDefaults,
    /// Container id for visibility predicates; empty means unset.
    pub container: String,
    pub allow: MenuAllow,
    /// Submenus are emitted only when referenced by an item.
    pub is_submenu: bool,
    /// When set, items are emitted as `<control type=...>` elements.
    pub controltype: String,
    /// Starting id for control-mode emission.
    pub startid: i64,
}

impl Menu {
    pub fn get_item(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Dynamic content reference resolved by an external provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub source: String,
    pub target: String,
    pub path: String,
    pub condition: String,
    pub visible: String,
    pub icon: String,
    pub label: String,
    pub folder: String,
}

/// Static shortcut offered by the management dialog's groupings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shortcut {
    pub label: String,
    pub action: String,
    pub icon: String,
    pub condition: String,
    pub visible: String,
}

/// A shortcut grouping entry: nested group, static shortcut, or content ref.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupEntry {
    Shortcut(Shortcut),
    Group(ShortcutGroup),
    Content(Content),
}

/// A named grouping of shortcuts in the picker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortcutGroup {
    pub name: String,
    pub label: String,
    pub condition: String,
    pub visible: String,
    pub icon: String,
    pub items: Vec<GroupEntry>,
}

/// Icon browse source offered by the dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IconSource {
    pub label: String,
    pub path: String,
}

/// Descriptor of a skin-defined subdialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubDialog {
    pub name: String,
    pub title: String,
    pub menu: String,
}

/// Action rewrite rule: any action equal to `replace` (case-insensitive)
/// becomes `action`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOverride {
    pub replace: String,
    pub action: String,
}

/// Everything parsed from menus.xml.
#[derive(Debug, Clone, Default)]
pub struct MenuConfig {
    pub menus: Vec<Menu>,
    pub groups: Vec<ShortcutGroup>,
    pub icon_sources: Vec<IconSource>,
    pub subdialogs: Vec<SubDialog>,
    pub action_overrides: Vec<ActionOverride>,
    pub context_menu: bool,
}

impl MenuConfig {
    pub fn get_menu(&self, name: &str) -> Option<&Menu> {
        self.menus.iter().find(|m| m.name == name)
    }
}
