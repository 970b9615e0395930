//! Widget loader for widgets.xml.

use roxmltree::{Document, Node};
use std::path::Path;

use super::base::{attr, attr_bool, attr_or, child_elements, child_int, child_text};
use super::error::ConfigError;
use super::menu::parse_content;
use super::read_optional_file;
use crate::config::constants::compile_time::menus::DEFAULT_TARGET;
use crate::models::{Widget, WidgetConfig, WidgetGroup, WidgetGroupEntry};

/// Aliases accepted for widget targets.
fn normalize_target(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "video" | "videos" => "videos".to_string(),
        "music" | "audio" => "music".to_string(),
        "pictures" | "images" => "pictures".to_string(),
        "programs" | "executable" => "programs".to_string(),
        _ => raw.to_string(),
    }
}

/// Load widget configuration from widgets.xml.
///
/// Widgets at root level appear flat in the picker; groups create nested
/// navigation. A missing file yields the empty configuration.
pub fn load_widgets(path: &Path) -> Result<WidgetConfig, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::widget(&file, msg))? else {
        return Ok(WidgetConfig::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::widget(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "widgets" {
        return Err(ConfigError::widget(
            &file,
            format!("Expected <widgets>, got <{}>", root.tag_name().name()),
        ));
    }

    let mut config = WidgetConfig {
        show_get_more: attr_bool(root, "showGetMore", true),
        ..Default::default()
    };

    for node in child_elements(root) {
        match node.tag_name().name() {
            "widget" => {
                let widget = parse_widget(node, &file, "")?;
                config.widgets.push(widget.clone());
                config.groupings.push(WidgetGroupEntry::Widget(widget));
            }
            "group" => {
                if let Some(group) = parse_widget_group(node, &file, "")? {
                    config.groupings.push(WidgetGroupEntry::Group(group));
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_widget(node: Node, file: &str, default_source: &str) -> Result<Widget, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::widget(file, "Widget missing 'name' attribute"));
    }

    let label = attr(node, "label");
    if label.is_empty() {
        return Err(ConfigError::widget(
            file,
            format!("Widget '{}' missing 'label' attribute", name),
        ));
    }

    let widget_type = attr(node, "type");
    let widget_path = child_text(node, "path");

    if widget_path.is_empty() && widget_type != "custom" {
        return Err(ConfigError::widget(
            file,
            format!("Widget '{}' missing <path>", name),
        ));
    }

    let source = {
        let own = attr(node, "source");
        if own.is_empty() {
            default_source.to_string()
        } else {
            own
        }
    };

    Ok(Widget {
        name,
        label,
        path: widget_path,
        widget_type,
        target: normalize_target(&attr_or(node, "target", DEFAULT_TARGET)),
        icon: attr(node, "icon"),
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        sort_by: child_text(node, "sortby"),
        sort_order: child_text(node, "sortorder"),
        limit: child_int(node, "limit"),
        source,
        slot: attr(node, "slot"),
    })
}

fn parse_widget_group(
    node: Node,
    file: &str,
    default_source: &str,
) -> Result<Option<WidgetGroup>, ConfigError> {
    let name = attr(node, "name");
    let label = attr(node, "label");
    if name.is_empty() || label.is_empty() {
        return Ok(None);
    }

    let source = {
        let own = attr(node, "source");
        if own.is_empty() {
            default_source.to_string()
        } else {
            own
        }
    };

    let mut items = Vec::new();
    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "widget" => items.push(WidgetGroupEntry::Widget(parse_widget(
                child_node, file, &source,
            )?)),
            "group" => {
                if let Some(nested) = parse_widget_group(child_node, file, &source)? {
                    items.push(WidgetGroupEntry::Group(nested));
                }
            }
            "content" => {
                if let Some(content) = parse_content(child_node) {
                    items.push(WidgetGroupEntry::Content(content));
                }
            }
            _ => {}
        }
    }

    Ok(Some(WidgetGroup {
        name,
        label,
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        icon: attr(node, "icon"),
        items,
    }))
}
