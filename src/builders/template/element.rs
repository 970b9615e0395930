//! Element processing: rewrite a deep copy of a template's controls for one
//! iteration context.
//!
//! Directive elements under the `skinshortcuts` tag are expanded
//! (`visibility`, `include=`, `items=`); everything else has placeholders
//! substituted in its text and attribute values, and `$INCLUDE[...]` text is
//! converted into child `<include>` elements.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use xmltree::{Element, XMLNode};

use super::context::eval_condition;
use crate::config::constants::compile_time::templates::{
    MAX_ELEMENT_DEPTH, MAX_INCLUDE_DEPTH,
};
use crate::expressions;
use crate::log_debug;
use crate::logging::codes;
use crate::models::{Menu, MenuItem, PropertyMap, TemplateSchema};

static INCLUDE_RE: OnceLock<Regex> = OnceLock::new();

fn include_re() -> &'static Regex {
    INCLUDE_RE.get_or_init(|| Regex::new(r"\$INCLUDE\[([^\]]+)\]").expect("valid pattern"))
}

/// Everything one iteration needs while rewriting elements.
pub(super) struct Scope<'a> {
    pub schema: &'a TemplateSchema,
    pub menus: &'a HashMap<String, &'a Menu>,
    pub context: &'a PropertyMap,
    pub item: &'a MenuItem,
    /// Parent iteration context for $PARENT during sub-item expansion.
    pub parent_context: Option<&'a PropertyMap>,
    /// Raw-mode parameters for $PARAM.
    pub params: Option<&'a PropertyMap>,
    pub container: &'a str,
}

#[derive(Clone, Copy, Default)]
struct Depth {
    element: usize,
    include: usize,
}

enum ElementAction {
    Keep,
    Remove,
    Replace(Vec<XMLNode>),
}

/// Process a deep copy of a controls payload, returning its rewritten
/// children ready to append to the output include.
pub(super) fn process_controls(controls: &Element, scope: &Scope) -> Vec<XMLNode> {
    let mut copy = controls.clone();
    process_children(&mut copy, scope, Depth::default());
    copy.children
}

fn process_children(elem: &mut Element, scope: &Scope, depth: Depth) {
    let mut index = 0;
    while index < elem.children.len() {
        match &elem.children[index] {
            XMLNode::Element(_) => {
                let XMLNode::Element(mut child) = elem.children.remove(index) else {
                    continue;
                };
                let action = process_element(&mut child, scope, depth);
                match action {
                    ElementAction::Keep => {
                        elem.children.insert(index, XMLNode::Element(child));
                        index += 1;
                    }
                    ElementAction::Remove => {}
                    ElementAction::Replace(nodes) => {
                        let count = nodes.len();
                        for (offset, node) in nodes.into_iter().enumerate() {
                            elem.children.insert(index + offset, node);
                        }
                        index += count;
                    }
                }
            }
            XMLNode::Text(text) => {
                let substituted = substitute_text(text, scope);
                let nodes = convert_text_includes(&substituted);
                if nodes.len() == 1 {
                    elem.children[index] = nodes.into_iter().next().expect("one node");
                    index += 1;
                } else {
                    elem.children.remove(index);
                    let count = nodes.len();
                    for (offset, node) in nodes.into_iter().enumerate() {
                        elem.children.insert(index + offset, node);
                    }
                    index += count;
                }
            }
            _ => index += 1,
        }
    }
}

fn process_element(elem: &mut Element, scope: &Scope, depth: Depth) -> ElementAction {
    if depth.element > MAX_ELEMENT_DEPTH {
        log_debug!("Element nesting exceeded depth limit", "tag" => elem.name);
        return ElementAction::Remove;
    }
    let depth = Depth {
        element: depth.element + 1,
        include: depth.include,
    };

    if elem.name == "skinshortcuts" {
        if let Some(action) = process_directive(elem, scope, depth) {
            return action;
        }
    }

    process_children(elem, scope, depth);

    for (name, value) in elem.attributes.iter_mut() {
        let substituted = if name.as_str() == "condition" {
            let expanded = super::context::expand_expressions(scope.schema, value);
            substitute_text(
                &crate::loaders::strip_nosuffix_markers(&expanded),
                scope,
            )
        } else {
            substitute_text(value, scope)
        };
        *value = substituted;
    }

    ElementAction::Keep
}

/// Handle the `skinshortcuts` directive forms. Returns None when the element
/// carries none of them and should be processed generically.
fn process_directive(elem: &mut Element, scope: &Scope, depth: Depth) -> Option<ElementAction> {
    // <skinshortcuts>visibility</skinshortcuts>
    let is_visibility = elem
        .get_text()
        .map(|t| t.trim() == "visibility")
        .unwrap_or(false);
    if is_visibility && elem.attributes.is_empty() {
        elem.name = "visible".to_string();
        elem.children = vec![XMLNode::Text(format!(
            "String.IsEqual(Container({}).ListItem.Property(name),{})",
            scope.container, scope.item.name
        ))];
        return Some(ElementAction::Keep);
    }

    // <skinshortcuts include="NAME" [condition=...] [wrap="true"]/>
    if let Some(include_name) = elem.attributes.get("include").cloned() {
        let condition = elem.attributes.get("condition").cloned().unwrap_or_default();
        if !eval_condition(scope.schema, &condition, scope.item, scope.context) {
            return Some(ElementAction::Remove);
        }

        if depth.include >= MAX_INCLUDE_DEPTH {
            crate::log_error!(codes::template::INCLUDE_DEPTH_EXCEEDED,
                "Include splice exceeded depth limit",
                "include" => include_name
            );
            return Some(ElementAction::Remove);
        }

        let Some(definition) = scope.schema.get_include(&include_name) else {
            crate::log_error!(codes::template::MISSING_INCLUDE_DEFINITION,
                "Referenced include definition does not exist",
                "include" => include_name
            );
            return Some(ElementAction::Remove);
        };
        let Some(controls) = &definition.controls else {
            return Some(ElementAction::Remove);
        };

        let mut copy = controls.clone();
        process_children(
            &mut copy,
            scope,
            Depth {
                element: depth.element,
                include: depth.include + 1,
            },
        );

        let wrap = elem
            .attributes
            .get("wrap")
            .map(|w| w.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if wrap {
            let mut include_elem = Element::new("include");
            include_elem
                .attributes
                .insert("name".to_string(), include_name);
            include_elem.children = copy.children;
            return Some(ElementAction::Replace(vec![XMLNode::Element(include_elem)]));
        }
        return Some(ElementAction::Replace(copy.children));
    }

    // <skinshortcuts items="SUBKEY" [condition=...] [filter=...]>...</skinshortcuts>
    if let Some(subkey) = elem.attributes.get("items").cloned() {
        let condition = elem.attributes.get("condition").cloned().unwrap_or_default();
        if !eval_condition(scope.schema, &condition, scope.item, scope.context) {
            return Some(ElementAction::Remove);
        }

        let submenu_name = format!("{}.{}", scope.item.name, subkey);
        let Some(submenu) = scope.menus.get(&submenu_name).copied() else {
            return Some(ElementAction::Remove);
        };

        let filter = elem.attributes.get("filter").cloned().unwrap_or_default();
        let mut nodes = Vec::new();

        for (offset, sub_item) in submenu.items.iter().enumerate() {
            if sub_item.disabled {
                continue;
            }
            let sub_index = offset + 1;

            let mut nested_context = submenu.defaults.properties.clone();
            for (key, value) in &sub_item.properties {
                nested_context.insert(key.clone(), value.clone());
            }
            nested_context.insert("index".to_string(), sub_index.to_string());
            nested_context.insert("name".to_string(), sub_item.name.clone());
            nested_context.insert("menu".to_string(), submenu.name.clone());

            if !filter.is_empty()
                && !eval_condition(scope.schema, &filter, sub_item, &nested_context)
            {
                continue;
            }

            let nested_scope = Scope {
                schema: scope.schema,
                menus: scope.menus,
                context: &nested_context,
                item: sub_item,
                parent_context: Some(scope.context),
                params: scope.params,
                container: scope.container,
            };

            for child in &elem.children {
                match child {
                    XMLNode::Element(child_elem) => {
                        let mut copy = child_elem.clone();
                        match process_element(&mut copy, &nested_scope, depth) {
                            ElementAction::Keep => nodes.push(XMLNode::Element(copy)),
                            ElementAction::Remove => {}
                            ElementAction::Replace(replacement) => nodes.extend(replacement),
                        }
                    }
                    XMLNode::Text(text) => {
                        let substituted = substitute_text(text, &nested_scope);
                        nodes.extend(convert_text_includes(&substituted));
                    }
                    _ => {}
                }
            }
        }

        return Some(ElementAction::Replace(nodes));
    }

    None
}

/// Run the placeholder substitution order over one text or attribute value.
pub(super) fn substitute_text(text: &str, scope: &Scope) -> String {
    if !text.contains('$') {
        return text.to_string();
    }

    let mut result = expressions::process_text(text, scope.context, &scope.item.properties);

    if let Some(parent_context) = scope.parent_context {
        result = expressions::substitute_parent(&result, parent_context);
    }
    if let Some(params) = scope.params {
        result = expressions::substitute_params(&result, params);
    }

    result
}

/// Convert `$INCLUDE[name]` occurrences in a text into child `<include>`
/// elements, preserving surrounding text.
fn convert_text_includes(text: &str) -> Vec<XMLNode> {
    if !text.contains("$INCLUDE[") {
        return vec![XMLNode::Text(text.to_string())];
    }

    let mut nodes = Vec::new();
    let mut last_end = 0usize;

    for caps in include_re().captures_iter(text) {
        let whole = caps.get(0).expect("match");
        let before = &text[last_end..whole.start()];
        if !before.trim().is_empty() {
            nodes.push(XMLNode::Text(before.to_string()));
        }

        let mut include_elem = Element::new("include");
        include_elem
            .children
            .push(XMLNode::Text(caps[1].to_string()));
        nodes.push(XMLNode::Element(include_elem));

        last_end = whole.end();
    }

    let tail = &text[last_end..];
    if !tail.trim().is_empty() {
        nodes.push(XMLNode::Text(tail.to_string()));
    }

    if nodes.is_empty() {
        nodes.push(XMLNode::Text(String::new()));
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncludeDefinition;

    fn basic_scope_parts() -> (TemplateSchema, MenuItem, PropertyMap) {
        let schema = TemplateSchema::default();
        let item = MenuItem {
            name: "movies".to_string(),
            label: "Movies".to_string(),
            ..Default::default()
        };
        let mut context = PropertyMap::new();
        context.insert("id".to_string(), "8011".to_string());
        context.insert("widgetPath".to_string(), "videodb://".to_string());
        (schema, item, context)
    }

    fn parse(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    fn render(nodes: &[XMLNode]) -> String {
        let mut wrapper = Element::new("wrapper");
        wrapper.children = nodes.to_vec();
        let mut buffer = Vec::new();
        wrapper
            .write_with_config(
                &mut buffer,
                xmltree::EmitterConfig::new().write_document_declaration(false),
            )
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_placeholder_substitution_in_text_and_attributes() {
        let (schema, item, context) = basic_scope_parts();
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls = parse(
            r#"<controls><control id="$PROPERTY[id]"><label>$PROPERTY[widgetPath]</label></control></controls>"#,
        );
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        assert!(output.contains("id=\"8011\""));
        assert!(output.contains("videodb://"));
    }

    #[test]
    fn test_visibility_directive() {
        let (schema, item, context) = basic_scope_parts();
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls = parse("<controls><skinshortcuts>visibility</skinshortcuts></controls>");
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        assert!(output.contains(
            "<visible>String.IsEqual(Container(9000).ListItem.Property(name),movies)</visible>"
        ));
    }

    #[test]
    fn test_include_directive_unwrapped_and_wrapped() {
        let (mut schema, item, context) = basic_scope_parts();
        schema.includes.insert(
            "Header".to_string(),
            IncludeDefinition {
                name: "Header".to_string(),
                controls: Some(parse(
                    "<include name=\"Header\"><control type=\"label\"><label>$PROPERTY[id]</label></control></include>",
                )),
            },
        );
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls =
            parse(r#"<controls><skinshortcuts include="Header"/></controls>"#);
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        // Unwrapped: the include's children are spliced in directly.
        assert!(output.contains("<control type=\"label\""));
        assert!(output.contains("<label>8011</label>"));
        assert!(!output.contains("skinshortcuts"));

        let controls =
            parse(r#"<controls><skinshortcuts include="Header" wrap="true"/></controls>"#);
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        assert!(output.contains("<include name=\"Header\">"));
    }

    #[test]
    fn test_include_directive_condition_removes() {
        let (mut schema, item, context) = basic_scope_parts();
        schema.includes.insert(
            "Header".to_string(),
            IncludeDefinition {
                name: "Header".to_string(),
                controls: Some(parse("<include name=\"Header\"><control/></include>")),
            },
        );
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls = parse(
            r#"<controls><skinshortcuts include="Header" condition="missingProp"/></controls>"#,
        );
        let nodes = process_controls(&controls, &scope);
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_text_include_conversion() {
        let (schema, item, context) = basic_scope_parts();
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls =
            parse("<controls><content>$INCLUDE[skinshortcuts-template-widget]</content></controls>");
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        assert!(output.contains("<include>skinshortcuts-template-widget</include>"));
    }

    #[test]
    fn test_items_directive_iterates_submenu() {
        let (schema, item, context) = basic_scope_parts();

        let submenu = Menu {
            name: "movies.widgets".to_string(),
            items: vec![
                MenuItem {
                    name: "w1".to_string(),
                    label: "W1".to_string(),
                    properties: [("path".to_string(), "p1".to_string())].into_iter().collect(),
                    ..Default::default()
                },
                MenuItem {
                    name: "w2".to_string(),
                    label: "W2".to_string(),
                    disabled: true,
                    ..Default::default()
                },
                MenuItem {
                    name: "w3".to_string(),
                    label: "W3".to_string(),
                    properties: [("path".to_string(), "p3".to_string())].into_iter().collect(),
                    ..Default::default()
                },
            ],
            is_submenu: true,
            ..Default::default()
        };
        let mut menus: HashMap<String, &Menu> = HashMap::new();
        menus.insert(submenu.name.clone(), &submenu);

        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls = parse(
            r#"<controls><skinshortcuts items="widgets"><slot name="$PROPERTY[name]" parent="$PARENT[id]">$PROPERTY[path]</slot></skinshortcuts></controls>"#,
        );
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);

        // Disabled w2 is skipped; $PROPERTY reads the sub item, $PARENT the parent.
        assert!(output.contains("<slot name=\"w1\" parent=\"8011\">p1</slot>"));
        assert!(output.contains("<slot name=\"w3\" parent=\"8011\">p3</slot>"));
        assert!(!output.contains("w2"));
    }

    #[test]
    fn test_items_directive_missing_submenu_produces_nothing() {
        let (schema, item, context) = basic_scope_parts();
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls =
            parse(r#"<controls><skinshortcuts items="widgets"><x/></skinshortcuts></controls>"#);
        let nodes = process_controls(&controls, &scope);
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_math_and_if_in_attributes() {
        let (schema, item, mut context) = basic_scope_parts();
        context.insert("index".to_string(), "3".to_string());
        context.insert("widgetType".to_string(), "music".to_string());
        let menus = HashMap::new();
        let scope = Scope {
            schema: &schema,
            menus: &menus,
            context: &context,
            item: &item,
            parent_context: None,
            params: None,
            container: "9000",
        };

        let controls = parse(
            r#"<controls><control top="$MATH[index * 100 + 50]" target="$IF[widgetType IN movies,tvshows THEN videos ELSE music]"/></controls>"#,
        );
        let nodes = process_controls(&controls, &scope);
        let output = render(&nodes);
        assert!(output.contains("top=\"350\""));
        assert!(output.contains("target=\"music\""));
    }
}
