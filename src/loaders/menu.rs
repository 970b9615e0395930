//! Menu loader for menus.xml.

use roxmltree::{Document, Node};
use std::path::Path;

use super::base::{
    attr, attr_bool, child, child_elements, child_text, children, node_line, text,
};
use super::error::ConfigError;
use super::read_optional_file;
use crate::models::{
    Action, ActionOverride, ActionPosition, Content, DefaultAction, GroupEntry, IconSource,
    IncludePosition, ItemInclude, Menu, MenuAllow, MenuConfig, MenuDefaults, MenuItem, Protection,
    Shortcut, ShortcutGroup, SubDialog,
};

/// Load menu configuration from menus.xml.
///
/// A missing file yields the empty configuration.
pub fn load_menus(path: &Path) -> Result<MenuConfig, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::menu(&file, msg))? else {
        return Ok(MenuConfig::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::menu(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "menus" {
        return Err(ConfigError::menu(
            &file,
            format!("Expected <menus>, got <{}>", root.tag_name().name()),
        ));
    }

    let mut config = MenuConfig {
        context_menu: attr_bool(root, "contextmenu", false),
        ..Default::default()
    };

    for node in child_elements(root) {
        match node.tag_name().name() {
            "menu" => config.menus.push(parse_menu(&doc, node, &file, false)?),
            "submenu" => config.menus.push(parse_menu(&doc, node, &file, true)?),
            "groups" => {
                for group_node in children(node, "group") {
                    if let Some(group) = parse_group(group_node) {
                        config.groups.push(group);
                    }
                }
            }
            "icons" => {
                for source_node in children(node, "source") {
                    config.icon_sources.push(IconSource {
                        label: attr(source_node, "label"),
                        path: attr(source_node, "path"),
                    });
                }
            }
            "subdialogs" => {
                for dialog_node in children(node, "subdialog") {
                    config.subdialogs.push(SubDialog {
                        name: attr(dialog_node, "name"),
                        title: attr(dialog_node, "title"),
                        menu: attr(dialog_node, "menu"),
                    });
                }
            }
            "actionoverrides" => {
                for override_node in children(node, "override") {
                    let replace = attr(override_node, "replace");
                    if replace.is_empty() {
                        continue;
                    }
                    config.action_overrides.push(ActionOverride {
                        replace,
                        action: text(override_node),
                    });
                }
            }
            "contextmenu" => {
                config.context_menu = attr_bool(node, "enabled", true);
            }
            _ => {}
        }
    }

    validate_unique_menu_names(&config, &file)?;

    Ok(config)
}

fn validate_unique_menu_names(config: &MenuConfig, file: &str) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for menu in &config.menus {
        if !seen.insert(menu.name.as_str()) {
            return Err(ConfigError::menu(
                file,
                format!("Duplicate menu name '{}'", menu.name),
            ));
        }
    }
    Ok(())
}

fn parse_menu(
    doc: &Document,
    node: Node,
    file: &str,
    is_submenu: bool,
) -> Result<Menu, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::menu(file, "Menu missing 'name' attribute")
            .with_line(node_line(doc, node)));
    }

    let mut menu = Menu {
        name,
        container: attr(node, "container"),
        is_submenu,
        controltype: attr(node, "controltype"),
        startid: attr(node, "id").parse().unwrap_or(1),
        ..Default::default()
    };

    if let Some(defaults_node) = child(node, "defaults") {
        menu.defaults = parse_defaults(defaults_node);
    }

    // Menu-level widget/background attributes seed every item's properties
    // through the defaults map.
    let menu_widget = attr(node, "widget");
    if !menu_widget.is_empty() {
        menu.defaults
            .properties
            .insert("widget".to_string(), menu_widget);
    }
    let menu_background = attr(node, "background");
    if !menu_background.is_empty() {
        menu.defaults
            .properties
            .insert("background".to_string(), menu_background);
    }

    if let Some(allow_node) = child(node, "allow") {
        menu.allow = MenuAllow {
            add: attr_bool(allow_node, "add", true),
            remove: attr_bool(allow_node, "remove", true),
            reorder: attr_bool(allow_node, "reorder", true),
        };
    }

    let mut seen = std::collections::HashSet::new();
    for item_node in children(node, "item") {
        let item = parse_item(doc, item_node, file)?;
        if !seen.insert(item.name.clone()) {
            return Err(ConfigError::menu(
                file,
                format!("Duplicate item name '{}' in menu '{}'", item.name, menu.name),
            )
            .with_line(node_line(doc, item_node)));
        }
        menu.items.push(item);
    }

    Ok(menu)
}

fn parse_defaults(node: Node) -> MenuDefaults {
    let mut defaults = MenuDefaults::default();

    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "property" => {
                let name = attr(child_node, "name");
                if !name.is_empty() {
                    defaults.properties.insert(name, text(child_node));
                }
            }
            "onclick" => {
                let when = if attr(child_node, "when") == "after" {
                    ActionPosition::After
                } else {
                    ActionPosition::Before
                };
                defaults.actions.push(DefaultAction {
                    action: text(child_node),
                    condition: attr(child_node, "condition"),
                    when,
                });
            }
            "include" => {
                defaults.includes.push(parse_item_include(child_node));
            }
            _ => {}
        }
    }

    defaults
}

fn parse_item_include(node: Node) -> ItemInclude {
    let position = if attr(node, "position") == "after-onclick" {
        IncludePosition::AfterOnClick
    } else {
        IncludePosition::BeforeOnClick
    };
    ItemInclude {
        name: text(node),
        condition: attr(node, "condition"),
        position,
    }
}

fn parse_item(doc: &Document, node: Node, file: &str) -> Result<MenuItem, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::menu(file, "Item missing 'name' attribute")
            .with_line(node_line(doc, node)));
    }

    let label = attr(node, "label");
    if label.is_empty() {
        return Err(ConfigError::menu(
            file,
            format!("Item '{}' missing 'label' attribute", name),
        )
        .with_line(node_line(doc, node)));
    }

    let mut item = MenuItem {
        name,
        label,
        label2: child_text(node, "label2"),
        icon: attr_text_or_child(node, "icon"),
        thumb: attr_text_or_child(node, "thumb"),
        visible: child_text(node, "visible"),
        dialog_visible: child_text(node, "dialogvisible"),
        disabled: attr_bool(node, "disabled", false),
        required: attr_bool(node, "required", false),
        submenu: attr_text_or_child(node, "submenu"),
        ..Default::default()
    };

    for action_node in children(node, "onclick") {
        item.actions.push(Action {
            action: text(action_node),
            condition: attr(action_node, "condition"),
        });
    }

    for property_node in children(node, "property") {
        let prop_name = attr(property_node, "name");
        if !prop_name.is_empty() {
            item.properties.insert(prop_name, text(property_node));
        }
    }

    for include_node in children(node, "include") {
        item.includes.push(parse_item_include(include_node));
    }

    if let Some(protection_node) = child(node, "protection") {
        item.protection = Some(Protection {
            condition: attr(protection_node, "condition"),
            message: attr(protection_node, "message"),
        });
    }

    item.original_action = item.primary_action().to_string();

    Ok(item)
}

/// Read a value that may be given as an attribute or a child element.
fn attr_text_or_child(node: Node, name: &str) -> String {
    let value = attr(node, name);
    if !value.is_empty() {
        value
    } else {
        child_text(node, name)
    }
}

fn parse_group(node: Node) -> Option<ShortcutGroup> {
    let name = attr(node, "name");
    let label = attr(node, "label");
    if name.is_empty() || label.is_empty() {
        return None;
    }

    let mut items = Vec::new();
    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "shortcut" => items.push(GroupEntry::Shortcut(Shortcut {
                label: attr(child_node, "label"),
                action: text(child_node),
                icon: attr(child_node, "icon"),
                condition: attr(child_node, "condition"),
                visible: attr(child_node, "visible"),
            })),
            "group" => {
                if let Some(nested) = parse_group(child_node) {
                    items.push(GroupEntry::Group(nested));
                }
            }
            "content" => {
                if let Some(content) = parse_content(child_node) {
                    items.push(GroupEntry::Content(content));
                }
            }
            _ => {}
        }
    }

    Some(ShortcutGroup {
        name,
        label,
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        icon: attr(node, "icon"),
        items,
    })
}

/// Parse a dynamic content reference element. Returns None without a source.
pub(super) fn parse_content(node: Node) -> Option<Content> {
    let source = attr(node, "source");
    if source.is_empty() {
        return None;
    }

    Some(Content {
        source,
        target: attr(node, "target"),
        path: attr(node, "path"),
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        icon: attr(node, "icon"),
        label: attr(node, "label"),
        folder: attr(node, "folder"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::testutil::{tempdir, TempDirGuard};

    fn write_config(content: &str) -> (TempDirGuard, std::path::PathBuf) {
        let dir = tempdir("menus");
        let path = dir.write_file("menus.xml", content);
        (dir, path)
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let config = load_menus(Path::new("/nonexistent/menus.xml")).unwrap();
        assert!(config.menus.is_empty());
    }

    #[test]
    fn test_parse_basic_menu() {
        let (_dir, path) = write_config(
            r#"<menus>
                <menu name="mainmenu" container="9000">
                    <defaults>
                        <property name="widgetStyle">panel</property>
                        <onclick when="after" condition="x">SetFocus(9000)</onclick>
                    </defaults>
                    <item name="movies" label="Movies" icon="m.png">
                        <onclick>ActivateWindow(Videos,videodb://movies/,return)</onclick>
                        <property name="widget">recentmovies</property>
                    </item>
                    <item name="settings" label="Settings" required="true">
                        <onclick>ActivateWindow(Settings)</onclick>
                    </item>
                </menu>
                <submenu name="movies">
                    <item name="recent" label="Recent">
                        <onclick>Go()</onclick>
                    </item>
                </submenu>
            </menus>"#,
        );

        let config = load_menus(&path).unwrap();
        assert_eq!(config.menus.len(), 2);

        let main = &config.menus[0];
        assert_eq!(main.name, "mainmenu");
        assert_eq!(main.container, "9000");
        assert!(!main.is_submenu);
        assert_eq!(main.defaults.properties.get("widgetStyle").unwrap(), "panel");
        assert_eq!(main.defaults.actions.len(), 1);
        assert_eq!(main.defaults.actions[0].when, ActionPosition::After);

        let movies = &main.items[0];
        assert_eq!(movies.label, "Movies");
        assert_eq!(movies.icon, "m.png");
        assert_eq!(movies.properties.get("widget").unwrap(), "recentmovies");
        assert_eq!(
            movies.original_action,
            "ActivateWindow(Videos,videodb://movies/,return)"
        );
        assert!(main.items[1].required);

        assert!(config.menus[1].is_submenu);
    }

    #[test]
    fn test_menu_level_widget_desugars_to_defaults() {
        let (_dir, path) = write_config(
            r#"<menus>
                <menu name="main" widget="landscape" background="fanart">
                    <item name="a" label="A"><onclick>X()</onclick></item>
                </menu>
            </menus>"#,
        );

        let config = load_menus(&path).unwrap();
        let menu = &config.menus[0];
        assert_eq!(menu.defaults.properties.get("widget").unwrap(), "landscape");
        assert_eq!(menu.defaults.properties.get("background").unwrap(), "fanart");
    }

    #[test]
    fn test_visibility_sinks_are_separate() {
        let (_dir, path) = write_config(
            r#"<menus>
                <menu name="main">
                    <item name="a" label="A">
                        <onclick>X()</onclick>
                        <visible>Library.HasContent(movies)</visible>
                        <dialogvisible>System.HasAddon(foo)</dialogvisible>
                    </item>
                </menu>
            </menus>"#,
        );

        let item = &load_menus(&path).unwrap().menus[0].items[0];
        assert_eq!(item.visible, "Library.HasContent(movies)");
        assert_eq!(item.dialog_visible, "System.HasAddon(foo)");
    }

    #[test]
    fn test_action_overrides_and_groups() {
        let (_dir, path) = write_config(
            r#"<menus>
                <menu name="main">
                    <item name="a" label="A"><onclick>X()</onclick></item>
                </menu>
                <actionoverrides>
                    <override replace="ActivateWindow(MyVideos)">ActivateWindow(Videos)</override>
                </actionoverrides>
                <groups>
                    <group name="common" label="Common">
                        <shortcut label="Favourites" icon="f.png">ActivateWindow(Favourites)</shortcut>
                        <content source="library" target="videos"/>
                        <group name="nested" label="Nested"/>
                    </group>
                </groups>
                <icons>
                    <source label="Skin icons" path="special://skin/icons/"/>
                </icons>
            </menus>"#,
        );

        let config = load_menus(&path).unwrap();
        assert_eq!(config.action_overrides.len(), 1);
        assert_eq!(
            config.action_overrides[0].action,
            "ActivateWindow(Videos)"
        );
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].items.len(), 3);
        assert_eq!(config.icon_sources.len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (_dir, path) = write_config(
            r#"<menus>
                <menu name="main"><item name="a" label="A"><onclick>X()</onclick></item></menu>
                <menu name="main"/>
            </menus>"#,
        );
        let err = load_menus(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate menu name"));
    }

    #[test]
    fn test_missing_label_is_error_with_line() {
        let (_dir, path) = write_config(
            "<menus>\n<menu name=\"main\">\n<item name=\"a\"/>\n</menu>\n</menus>",
        );
        let err = load_menus(&path).unwrap_err();
        match err {
            ConfigError::Menu { line, message, .. } => {
                assert!(message.contains("missing 'label'"));
                assert_eq!(line, Some(3));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
