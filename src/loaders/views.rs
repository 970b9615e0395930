//! View loader for views.xml.

use roxmltree::{Document, Node};
use std::collections::HashSet;
use std::path::Path;

use super::base::{attr, attr_or, child, child_text, children};
use super::error::ConfigError;
use super::read_optional_file;
use crate::config::constants::compile_time::views::DEFAULT_VIEW_PREFIX;
use crate::models::{View, ViewConfig, ViewContent};

/// Load view configuration from views.xml.
///
/// A missing file yields the empty configuration.
pub fn load_views(path: &Path) -> Result<ViewConfig, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::view(&file, msg))? else {
        return Ok(ViewConfig::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::view(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "views" {
        return Err(ConfigError::view(
            &file,
            format!("Expected <views>, got <{}>", root.tag_name().name()),
        ));
    }

    let prefix = attr_or(root, "prefix", DEFAULT_VIEW_PREFIX);
    let views = parse_views(root, &file)?;
    let content_rules = parse_rules(root, &file, &views)?;

    Ok(ViewConfig {
        views,
        content_rules,
        prefix,
    })
}

fn parse_views(root: Node, file: &str) -> Result<Vec<View>, ConfigError> {
    let mut views = Vec::new();

    for node in children(root, "view") {
        let view_id = attr(node, "id");
        if view_id.is_empty() {
            return Err(ConfigError::view(file, "View missing 'id' attribute"));
        }

        let label = attr(node, "label");
        if label.is_empty() {
            return Err(ConfigError::view(
                file,
                format!("View '{}' missing 'label' attribute", view_id),
            ));
        }

        views.push(View {
            id: view_id,
            label,
            icon: attr(node, "icon"),
        });
    }

    Ok(views)
}

fn parse_rules(root: Node, file: &str, views: &[View]) -> Result<Vec<ViewContent>, ConfigError> {
    let Some(rules_node) = child(root, "rules") else {
        return Ok(Vec::new());
    };

    let view_ids: HashSet<&str> = views.iter().map(|v| v.id.as_str()).collect();
    let mut content_rules = Vec::new();

    for node in children(rules_node, "content") {
        content_rules.push(parse_content_rule(node, file, &view_ids)?);
    }

    Ok(content_rules)
}

fn parse_content_rule(
    node: Node,
    file: &str,
    valid_view_ids: &HashSet<&str>,
) -> Result<ViewContent, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::view(file, "Content rule missing 'name' attribute"));
    }

    let label = attr(node, "label");
    if label.is_empty() {
        return Err(ConfigError::view(
            file,
            format!("Content '{}' missing 'label' attribute", name),
        ));
    }

    let library_default = attr(node, "library");
    if library_default.is_empty() {
        return Err(ConfigError::view(
            file,
            format!("Content '{}' missing 'library' attribute", name),
        ));
    }

    let visible = child_text(node, "visible");
    if visible.is_empty() {
        return Err(ConfigError::view(
            file,
            format!("Content '{}' missing <visible> element", name),
        ));
    }

    let views_text = child_text(node, "views");
    if views_text.is_empty() {
        return Err(ConfigError::view(
            file,
            format!("Content '{}' missing <views> element", name),
        ));
    }

    let view_ids: Vec<String> = views_text
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && valid_view_ids.contains(v))
        .map(str::to_string)
        .collect();

    if view_ids.is_empty() {
        return Err(ConfigError::view(
            file,
            format!("Content '{}' has no valid view IDs", name),
        ));
    }

    if !valid_view_ids.contains(library_default.as_str()) {
        return Err(ConfigError::view(
            file,
            format!(
                "Content '{}' library default '{}' is not a defined view",
                name, library_default
            ),
        ));
    }

    let plugin_default = attr(node, "plugin");
    if !plugin_default.is_empty() && !valid_view_ids.contains(plugin_default.as_str()) {
        return Err(ConfigError::view(
            file,
            format!(
                "Content '{}' plugin default '{}' is not a defined view",
                name, plugin_default
            ),
        ));
    }

    Ok(ViewContent {
        name,
        label,
        visible,
        views: view_ids,
        library_default,
        plugin_default,
        icon: attr(node, "icon"),
    })
}
