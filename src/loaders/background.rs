//! Background loader for backgrounds.xml.

use roxmltree::{Document, Node};
use std::path::Path;

use super::base::{attr, attr_or, child_elements, child_text, children, text};
use super::error::ConfigError;
use super::menu::parse_content;
use super::read_optional_file;
use crate::models::{
    Background, BackgroundConfig, BackgroundGroup, BackgroundGroupEntry, BackgroundType,
    BrowseSource, PlaylistSource,
};

/// Load background configuration from backgrounds.xml.
///
/// A missing file yields the empty configuration.
pub fn load_backgrounds(path: &Path) -> Result<BackgroundConfig, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::background(&file, msg))? else {
        return Ok(BackgroundConfig::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::background(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "backgrounds" {
        return Err(ConfigError::background(
            &file,
            format!("Expected <backgrounds>, got <{}>", root.tag_name().name()),
        ));
    }

    let mut config = BackgroundConfig::default();

    for node in child_elements(root) {
        match node.tag_name().name() {
            "background" => {
                let background = parse_background(node, &file)?;
                config.backgrounds.push(background.clone());
                config
                    .groupings
                    .push(BackgroundGroupEntry::Background(background));
            }
            "group" => {
                if let Some(group) = parse_background_group(node, &file)? {
                    config.groupings.push(BackgroundGroupEntry::Group(group));
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_background(node: Node, file: &str) -> Result<Background, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::background(
            file,
            "Background missing 'name' attribute",
        ));
    }

    let label = attr(node, "label");
    if label.is_empty() {
        return Err(ConfigError::background(
            file,
            format!("Background '{}' missing 'label' attribute", name),
        ));
    }

    let background_path = child_text(node, "path");
    let type_attr = attr_or(node, "type", "static");
    let background_type =
        BackgroundType::parse(&type_attr.to_ascii_lowercase()).unwrap_or(BackgroundType::Static);

    if background_path.is_empty() && !background_type.path_optional() {
        return Err(ConfigError::background(
            file,
            format!("Background '{}' missing <path>", name),
        ));
    }

    let mut sources = Vec::new();
    let mut browse_sources = Vec::new();

    for source_node in children(node, "source") {
        let source_path = text(source_node);
        if source_path.is_empty() {
            continue;
        }

        if matches!(
            background_type,
            BackgroundType::Browse | BackgroundType::Multi
        ) {
            browse_sources.push(BrowseSource {
                label: attr(source_node, "label"),
                path: source_path,
                condition: attr(source_node, "condition"),
                visible: attr(source_node, "visible"),
                icon: attr(source_node, "icon"),
            });
        } else {
            sources.push(PlaylistSource {
                label: attr(source_node, "label"),
                path: source_path,
                icon: attr_or(source_node, "icon", "DefaultPlaylist.png"),
            });
        }
    }

    Ok(Background {
        name,
        label,
        path: background_path,
        background_type,
        icon: child_text(node, "icon"),
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        sources,
        browse_sources,
    })
}

fn parse_background_group(
    node: Node,
    file: &str,
) -> Result<Option<BackgroundGroup>, ConfigError> {
    let name = attr(node, "name");
    let label = attr(node, "label");
    if name.is_empty() || label.is_empty() {
        return Ok(None);
    }

    let mut items = Vec::new();
    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "background" => items.push(BackgroundGroupEntry::Background(parse_background(
                child_node, file,
            )?)),
            "group" => {
                if let Some(nested) = parse_background_group(child_node, file)? {
                    items.push(BackgroundGroupEntry::Group(nested));
                }
            }
            "content" => {
                if let Some(content) = parse_content(child_node) {
                    items.push(BackgroundGroupEntry::Content(content));
                }
            }
            _ => {}
        }
    }

    Ok(Some(BackgroundGroup {
        name,
        label,
        condition: attr(node, "condition"),
        visible: attr(node, "visible"),
        icon: attr(node, "icon"),
        items,
    }))
}
