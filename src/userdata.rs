//! User-data storage and menu merging.
//!
//! The overlay is a JSON document keyed by menu name. A malformed document
//! degrades to the empty overlay; a malformed entry is skipped. The default
//! menu list is never mutated: merging always builds a fresh list so
//! reset-to-defaults stays available.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::constants::compile_time::menus::{DEFAULT_ACTION, DEFAULT_ICON};
use crate::logging::codes;
use crate::models::{Action, ActionOverride, Menu, MenuItem, PropertyMap};
use crate::{log_debug, log_error, log_warning};

/// User override for a menu item. `None` fields inherit the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemOverride {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

/// User overrides for a menu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuOverride {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItemOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl MenuOverride {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.removed.is_empty()
    }
}

/// All user customizations for a skin.
///
/// `views` maps source -> content -> view id, where source is `library`,
/// `plugins`, or a concrete add-on identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub menus: IndexMap<String, MenuOverride>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub views: IndexMap<String, IndexMap<String, String>>,
}

impl UserData {
    pub fn get_view(&self, source: &str, content: &str) -> Option<&str> {
        self.views
            .get(source)
            .and_then(|selections| selections.get(content))
            .map(String::as_str)
    }

    pub fn set_view(&mut self, source: &str, content: &str, view_id: &str) {
        self.views
            .entry(source.to_string())
            .or_insert_with(IndexMap::new)
            .insert(content.to_string(), view_id.to_string());
    }

    pub fn clear_view(&mut self, source: &str, content: &str) {
        if let Some(selections) = self.views.get_mut(source) {
            selections.shift_remove(content);
            if selections.is_empty() {
                self.views.shift_remove(source);
            }
        }
    }

    pub fn clear_all_views(&mut self) {
        self.views.clear();
    }

    /// Plugin-specific view overrides for a content type: every source that
    /// is not `library` or `plugins` with a selection for this content.
    pub fn get_plugin_overrides(&self, content: &str) -> IndexMap<String, String> {
        let mut overrides = IndexMap::new();
        for (source, selections) in &self.views {
            if source == "library" || source == "plugins" {
                continue;
            }
            if let Some(view_id) = selections.get(content) {
                overrides.insert(source.clone(), view_id.clone());
            }
        }
        overrides
    }

    /// Build from a parsed JSON document, recovering from bad entries.
    ///
    /// A menu entry or item entry that fails to deserialize is skipped with
    /// a logged warning; it never aborts the build.
    pub fn from_json(document: serde_json::Value) -> UserData {
        let mut userdata = UserData::default();

        if let Some(menus) = document.get("menus").and_then(|v| v.as_object()) {
            for (menu_name, menu_value) in menus {
                match parse_menu_override(menu_value) {
                    Ok(override_entry) => {
                        userdata.menus.insert(menu_name.clone(), override_entry);
                    }
                    Err(e) => {
                        log_error!(codes::merge::OVERRIDE_ENTRY_INVALID,
                            "Skipping invalid menu override",
                            "menu" => menu_name,
                            "error" => e
                        );
                    }
                }
            }
        }

        if let Some(views) = document.get("views") {
            match serde_json::from_value(views.clone()) {
                Ok(parsed) => userdata.views = parsed,
                Err(e) => {
                    log_error!(codes::merge::OVERRIDE_ENTRY_INVALID,
                        "Skipping invalid view selections",
                        "error" => e
                    );
                }
            }
        }

        userdata
    }
}

fn parse_menu_override(value: &serde_json::Value) -> Result<MenuOverride, serde_json::Error> {
    let mut override_entry = MenuOverride::default();

    if let Some(removed) = value.get("removed") {
        override_entry.removed = serde_json::from_value(removed.clone())?;
    }

    if let Some(items) = value.get("items").and_then(|v| v.as_array()) {
        for item_value in items {
            match serde_json::from_value::<MenuItemOverride>(item_value.clone()) {
                Ok(item) => override_entry.items.push(item),
                Err(e) => {
                    log_error!(codes::merge::OVERRIDE_ENTRY_INVALID,
                        "Skipping invalid item override",
                        "error" => e
                    );
                }
            }
        }
    }

    Ok(override_entry)
}

/// Load user data from a JSON file. Failures yield the empty overlay.
pub fn load_userdata(path: &Path) -> UserData {
    if !path.exists() {
        log_debug!("User data file not found", "path" => path.display());
        return UserData::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log_warning!("Failed to read user data; using defaults",
                "path" => path.display(),
                "error" => e
            );
            return UserData::default();
        }
    };

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(document) => UserData::from_json(document),
        Err(e) => {
            log_error!(codes::merge::USERDATA_UNREADABLE,
                "User data is not valid JSON; using defaults",
                "path" => path.display(),
                "error" => e
            );
            UserData::default()
        }
    }
}

/// Save user data atomically, omitting unset fields.
pub fn save_userdata(userdata: &UserData, path: &Path) -> std::io::Result<()> {
    let mut payload = serde_json::to_vec_pretty(userdata)?;
    payload.push(b'\n');
    crate::utils::xml::atomic_write(path, &payload)
}

// ============================================================================
// MERGE
// ============================================================================

/// Produce the effective menu list: defaults overlaid with user data, then
/// action-override rules applied. The default list is left untouched.
pub fn merge_menus(
    defaults: &[Menu],
    userdata: &UserData,
    action_overrides: &[ActionOverride],
) -> Vec<Menu> {
    let mut merged: Vec<Menu> = defaults
        .iter()
        .map(|menu| merge_menu(menu, userdata.menus.get(&menu.name)))
        .collect();

    // User-only menus (typically custom widget lists) exist purely to be
    // referenced, so they never become root includes.
    for (menu_name, override_entry) in &userdata.menus {
        if defaults.iter().any(|m| &m.name == menu_name) {
            continue;
        }
        let items: Vec<MenuItem> = override_entry
            .items
            .iter()
            .filter(|o| o.is_new)
            .map(create_item_from_override)
            .collect();
        if items.is_empty() {
            continue;
        }
        merged.push(Menu {
            name: menu_name.clone(),
            items,
            is_submenu: true,
            ..Default::default()
        });
    }

    apply_action_overrides(&mut merged, action_overrides);

    merged
}

/// Merge one default menu with its override.
pub fn merge_menu(default_menu: &Menu, override_entry: Option<&MenuOverride>) -> Menu {
    let Some(override_entry) = override_entry else {
        return default_menu.clone();
    };

    let mut items: Vec<MenuItem> = Vec::with_capacity(default_menu.items.len());
    for item in &default_menu.items {
        if override_entry.removed.contains(&item.name) && !item.required {
            continue;
        }
        items.push(item.clone());
    }

    let override_map: IndexMap<&str, &MenuItemOverride> = override_entry
        .items
        .iter()
        .map(|o| (o.name.as_str(), o))
        .collect();

    for item in items.iter_mut() {
        if let Some(item_override) = override_map.get(item.name.as_str()).copied() {
            apply_override(item, item_override);
        }
    }

    for item_override in &override_entry.items {
        if item_override.is_new && !items.iter().any(|i| i.name == item_override.name) {
            items.push(create_item_from_override(item_override));
        }
    }

    Menu {
        name: default_menu.name.clone(),
        items: reorder(items, &override_map),
        defaults: default_menu.defaults.clone(),
        container: default_menu.container.clone(),
        allow: default_menu.allow.clone(),
        is_submenu: default_menu.is_submenu,
        controltype: default_menu.controltype.clone(),
        startid: default_menu.startid,
    }
}

/// Place positioned items at their requested index, keeping the remaining
/// items stable. Positions past the end append in ascending order.
fn reorder(items: Vec<MenuItem>, override_map: &IndexMap<&str, &MenuItemOverride>) -> Vec<MenuItem> {
    let total = items.len();
    let mut positioned: std::collections::BTreeMap<usize, MenuItem> =
        std::collections::BTreeMap::new();
    let mut unpositioned: Vec<MenuItem> = Vec::new();

    for item in items {
        let position = override_map
            .get(item.name.as_str())
            .and_then(|o| o.position);
        match position {
            Some(position) if !positioned.contains_key(&position) => {
                positioned.insert(position, item);
            }
            _ => unpositioned.push(item),
        }
    }

    let mut final_items: Vec<MenuItem> = Vec::with_capacity(total);
    let mut rest = unpositioned.into_iter();

    for index in 0..total {
        if let Some(item) = positioned.remove(&index) {
            final_items.push(item);
        } else if let Some(item) = rest.next() {
            final_items.push(item);
        } else {
            break;
        }
    }

    final_items.extend(rest);
    final_items.extend(positioned.into_values());

    final_items
}

fn apply_override(item: &mut MenuItem, override_entry: &MenuItemOverride) {
    item.original_action = item.primary_action().to_string();

    if let Some(label) = &override_entry.label {
        item.label = label.clone();
    }
    if let Some(actions) = &override_entry.actions {
        item.actions = actions.clone();
    }
    if let Some(icon) = &override_entry.icon {
        item.icon = icon.clone();
    }
    if let Some(disabled) = override_entry.disabled {
        item.disabled = disabled;
    }
    for (key, value) in &override_entry.properties {
        item.properties.insert(key.clone(), value.clone());
    }
}

fn create_item_from_override(override_entry: &MenuItemOverride) -> MenuItem {
    let actions = override_entry
        .actions
        .clone()
        .unwrap_or_else(|| vec![Action::new(DEFAULT_ACTION)]);

    let mut item = MenuItem {
        name: override_entry.name.clone(),
        label: override_entry.label.clone().unwrap_or_default(),
        actions,
        icon: override_entry
            .icon
            .clone()
            .unwrap_or_else(|| DEFAULT_ICON.to_string()),
        disabled: override_entry.disabled.unwrap_or(false),
        properties: override_entry.properties.clone(),
        ..Default::default()
    };
    item.original_action = item.primary_action().to_string();
    item
}

/// Apply menus.xml action-override rules across every merged item.
fn apply_action_overrides(menus: &mut [Menu], rules: &[ActionOverride]) {
    if rules.is_empty() {
        return;
    }

    for menu in menus.iter_mut() {
        for item in menu.items.iter_mut() {
            for action in item.actions.iter_mut() {
                for rule in rules {
                    if action.action.eq_ignore_ascii_case(&rule.replace) {
                        action.action = rule.action.clone();
                        break;
                    }
                }
            }
        }
    }
}
