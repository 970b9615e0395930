//! Property schema loader for properties.xml.
//!
//! Supports reusable `<includes>` fragments referenced with
//! `<include content="..." suffix="..."/>`; a suffix reference expands to a
//! copy of the fragment with the suffix transform applied to every
//! `condition` attribute.

use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::Path;

use super::base::{apply_suffix_to_condition, attr, attr_bool, child_elements, children, text};
use super::error::ConfigError;
use super::read_optional_file;
use crate::models::{
    ButtonMapping, FallbackRule, IconVariant, PropertyFallback, PropertySchema, SchemaOption,
    SchemaProperty,
};

/// Load property schema from properties.xml.
///
/// A missing file yields the empty schema.
pub fn load_properties(path: &Path) -> Result<PropertySchema, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::property(&file, msg))? else {
        return Ok(PropertySchema::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::property(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "properties" {
        return Err(ConfigError::property(
            &file,
            format!("Expected <properties>, got <{}>", root.tag_name().name()),
        ));
    }

    let includes = collect_includes(root);
    let mut schema = PropertySchema::default();

    for property_node in children(root, "property") {
        let property = parse_property(property_node, &file, &includes)?;
        schema.properties.insert(property.name.clone(), property);
    }

    if let Some(fallbacks_node) = super::base::child(root, "fallbacks") {
        for fallback_node in children(fallbacks_node, "fallback") {
            let fallback = parse_fallback(fallback_node, &file, &includes)?;
            schema
                .fallbacks
                .insert(fallback.property_name.clone(), fallback);
        }
    }

    if let Some(buttons_node) = super::base::child(root, "buttons") {
        let default_suffix = attr_bool(buttons_node, "suffix", false);
        for child_node in child_elements(buttons_node) {
            match child_node.tag_name().name() {
                "button" => {
                    if let Some(button) = parse_button(child_node, &file, default_suffix)? {
                        schema.buttons.insert(button.button_id, button);
                    }
                }
                "group" => {
                    let group_suffix = attr_bool(child_node, "suffix", default_suffix);
                    for button_node in children(child_node, "button") {
                        if let Some(button) = parse_button(button_node, &file, group_suffix)? {
                            schema.buttons.insert(button.button_id, button);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok(schema)
}

/// A resolved include child: the node plus the suffix to apply on expansion.
struct ExpandedChild<'a, 'input> {
    node: Node<'a, 'input>,
    suffix: String,
}

fn collect_includes<'a, 'input>(
    root: Node<'a, 'input>,
) -> HashMap<String, Vec<Node<'a, 'input>>> {
    let mut includes = HashMap::new();
    if let Some(section) = super::base::child(root, "includes") {
        for include_node in children(section, "include") {
            let name = attr(include_node, "name");
            if name.is_empty() {
                continue;
            }
            includes.insert(name, child_elements(include_node).collect());
        }
    }
    includes
}

/// Expand direct children of `node`, splicing include references in place.
fn expand_children<'a, 'input>(
    node: Node<'a, 'input>,
    includes: &HashMap<String, Vec<Node<'a, 'input>>>,
) -> Vec<ExpandedChild<'a, 'input>> {
    let mut result = Vec::new();
    for child_node in child_elements(node) {
        if child_node.tag_name().name() == "include" {
            let content = attr(child_node, "content");
            let suffix = attr(child_node, "suffix");
            if let Some(fragment) = includes.get(&content) {
                for &fragment_node in fragment {
                    result.push(ExpandedChild {
                        node: fragment_node,
                        suffix: suffix.clone(),
                    });
                }
            }
        } else {
            result.push(ExpandedChild {
                node: child_node,
                suffix: String::new(),
            });
        }
    }
    result
}

/// Read a condition attribute, applying the expansion suffix when present.
fn expanded_condition(expanded: &ExpandedChild, name: &str) -> String {
    let condition = attr(expanded.node, name);
    if expanded.suffix.is_empty() {
        condition
    } else {
        apply_suffix_to_condition(&condition, &expanded.suffix)
    }
}

fn parse_property(
    node: Node,
    file: &str,
    includes: &HashMap<String, Vec<Node>>,
) -> Result<SchemaProperty, ConfigError> {
    let name = attr(node, "name");
    if name.is_empty() {
        return Err(ConfigError::property(
            file,
            "Property missing 'name' attribute",
        ));
    }

    let requires = {
        let own = attr(node, "requires");
        if !own.is_empty() {
            own
        } else {
            super::base::child(node, "requires")
                .map(|n| attr(n, "property"))
                .unwrap_or_default()
        }
    };

    let mut options = Vec::new();
    if let Some(options_node) = super::base::child(node, "options") {
        for expanded in expand_children(options_node, includes) {
            if expanded.node.tag_name().name() == "option" {
                options.push(parse_option(&expanded));
            }
        }
    }

    Ok(SchemaProperty {
        name,
        template_only: attr_bool(node, "templateonly", false),
        requires,
        options,
        property_type: attr(node, "type"),
    })
}

fn parse_option(expanded: &ExpandedChild) -> SchemaOption {
    let node = expanded.node;
    let mut icons = Vec::new();
    for icon_node in children(node, "icon") {
        let icon_path = text(icon_node);
        if !icon_path.is_empty() {
            icons.push(IconVariant {
                path: icon_path,
                condition: attr(icon_node, "condition"),
            });
        }
    }

    SchemaOption {
        value: attr(node, "value"),
        label: attr(node, "label"),
        condition: expanded_condition(expanded, "condition"),
        icons,
    }
}

fn parse_fallback(
    node: Node,
    file: &str,
    includes: &HashMap<String, Vec<Node>>,
) -> Result<PropertyFallback, ConfigError> {
    let property_name = attr(node, "property");
    if property_name.is_empty() {
        return Err(ConfigError::property(
            file,
            "Fallback missing 'property' attribute",
        ));
    }

    let mut rules = Vec::new();
    for expanded in expand_children(node, includes) {
        match expanded.node.tag_name().name() {
            "when" => rules.push(FallbackRule {
                value: text(expanded.node),
                condition: expanded_condition(&expanded, "condition"),
            }),
            "default" => rules.push(FallbackRule {
                value: text(expanded.node),
                condition: String::new(),
            }),
            _ => {}
        }
    }

    Ok(PropertyFallback {
        property_name,
        rules,
    })
}

fn parse_button(
    node: Node,
    file: &str,
    default_suffix: bool,
) -> Result<Option<ButtonMapping>, ConfigError> {
    let id_attr = attr(node, "id");
    if id_attr.is_empty() {
        return Ok(None);
    }

    let button_id: i64 = id_attr.parse().map_err(|_| {
        ConfigError::property(file, format!("Invalid button id '{}'", id_attr))
    })?;

    let property_name = attr(node, "property");
    if property_name.is_empty() {
        return Err(ConfigError::property(
            file,
            format!("Button {} missing 'property' attribute", button_id),
        ));
    }

    Ok(Some(ButtonMapping {
        button_id,
        property_name,
        suffix: attr_bool(node, "suffix", default_suffix),
        title: attr(node, "title"),
        show_none: attr_bool(node, "showNone", true),
        show_icons: attr_bool(node, "showIcons", true),
        property_type: attr(node, "type"),
        requires: attr(node, "requires"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::testutil::tempdir;

    #[test]
    fn test_missing_file() {
        let schema = load_properties(Path::new("/nonexistent/properties.xml")).unwrap();
        assert!(schema.properties.is_empty());
    }

    #[test]
    fn test_parse_properties_and_buttons() {
        let dir = tempdir("properties");
        let path = dir.write_file(
            "properties.xml",
            r#"<properties>
                <property name="widgetStyle" templateonly="true">
                    <options>
                        <option value="panel" label="Panel"/>
                        <option value="list" label="List" condition="widgetType=movies">
                            <icon condition="widgetArt=Poster">poster.png</icon>
                        </option>
                    </options>
                </property>
                <buttons suffix="true">
                    <button id="309" property="widget" type="widget" title="Choose widget"/>
                    <group suffix="false">
                        <button id="310" property="background" type="background"/>
                    </group>
                </buttons>
            </properties>"#,
        );

        let schema = load_properties(&path).unwrap();
        let prop = schema.get_property("widgetStyle").unwrap();
        assert!(prop.template_only);
        assert_eq!(prop.options.len(), 2);
        assert_eq!(prop.options[1].icons.len(), 1);

        let widget_button = schema.get_button(309).unwrap();
        assert!(widget_button.suffix);
        assert_eq!(widget_button.property_type, "widget");

        let background_button = schema.get_button(310).unwrap();
        assert!(!background_button.suffix);
    }

    #[test]
    fn test_include_expansion_with_suffix() {
        let dir = tempdir("properties");
        let path = dir.write_file(
            "properties.xml",
            r#"<properties>
                <includes>
                    <include name="artRules">
                        <when condition="widgetType=movies">Poster</when>
                        <default>Landscape</default>
                    </include>
                </includes>
                <fallbacks>
                    <fallback property="widgetArt">
                        <include content="artRules"/>
                    </fallback>
                    <fallback property="widgetArt.2">
                        <include content="artRules" suffix=".2"/>
                    </fallback>
                </fallbacks>
            </properties>"#,
        );

        let schema = load_properties(&path).unwrap();

        let plain = schema.fallbacks.get("widgetArt").unwrap();
        assert_eq!(plain.rules.len(), 2);
        assert_eq!(plain.rules[0].condition, "widgetType=movies");
        assert_eq!(plain.rules[1].condition, "");

        let suffixed = schema.fallbacks.get("widgetArt.2").unwrap();
        assert_eq!(suffixed.rules[0].condition, "widgetType.2=movies");
        assert_eq!(suffixed.rules[0].value, "Poster");
    }

    #[test]
    fn test_invalid_button_id_is_error() {
        let dir = tempdir("properties");
        let path = dir.write_file(
            "properties.xml",
            r#"<properties><buttons><button id="abc" property="x"/></buttons></properties>"#,
        );
        assert!(load_properties(&path).is_err());
    }
}
