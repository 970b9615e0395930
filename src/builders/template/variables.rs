//! Host variable emission.
//!
//! Variables are produced per iteration context from a template's inline
//! definitions and its variableGroup references, and land as root-level
//! siblings of the includes.

use xmltree::{Element, XMLNode};

use super::context::eval_condition;
use crate::config::constants::compile_time::templates::MAX_VARIABLE_GROUP_DEPTH;
use crate::expressions;
use crate::loaders::apply_suffix_to_condition;
use crate::logging::codes;
use crate::models::{MenuItem, PropertyMap, TemplateSchema, VariableDefinition};

/// Build one `<variable>` element from a definition under the iteration
/// context. Returns None when the definition's condition fails or it has no
/// payload.
pub(super) fn build_variable(
    schema: &TemplateSchema,
    definition: &VariableDefinition,
    context: &PropertyMap,
    item: &MenuItem,
) -> Option<Element> {
    if !eval_condition(schema, &definition.condition, item, context) {
        return None;
    }

    let content = definition.content.as_ref()?;
    let mut element = content.clone();

    let output_name = if definition.output.is_empty() {
        let original = element
            .attributes
            .get("name")
            .cloned()
            .unwrap_or_else(|| definition.name.clone());
        expressions::substitute_properties(&original, context, &item.properties)
    } else {
        expressions::substitute_properties(&definition.output, context, &item.properties)
    };
    element
        .attributes
        .insert("name".to_string(), output_name);

    substitute_content(&mut element, context, item);

    Some(element)
}

/// Substitute $PROPERTY placeholders through a variable payload: text,
/// attributes, and children, recursively.
fn substitute_content(element: &mut Element, context: &PropertyMap, item: &MenuItem) {
    for value in element.attributes.values_mut() {
        *value = expressions::substitute_properties(value, context, &item.properties);
    }

    for node in element.children.iter_mut() {
        match node {
            XMLNode::Text(text) => {
                *text = expressions::substitute_properties(text, context, &item.properties);
            }
            XMLNode::Element(child) => {
                // The payload's name attribute is data, not the output name.
                substitute_content(child, context, item);
            }
            _ => {}
        }
    }
}

/// Build every variable a group reference selects, recursing through nested
/// group references depth-first.
#[allow(clippy::too_many_arguments)]
pub(super) fn build_variable_group(
    schema: &TemplateSchema,
    group_name: &str,
    group_condition: &str,
    suffix: &str,
    context: &PropertyMap,
    item: &MenuItem,
    output: &mut Vec<Element>,
    depth: usize,
) {
    if depth > MAX_VARIABLE_GROUP_DEPTH {
        crate::log_error!(codes::template::MISSING_VARIABLE_GROUP,
            "Nested variableGroup references exceeded depth limit",
            "group" => group_name
        );
        return;
    }

    if !eval_condition(schema, group_condition, item, context) {
        return;
    }

    let Some(group) = schema.get_variable_group(group_name) else {
        crate::log_error!(codes::template::MISSING_VARIABLE_GROUP,
            "Referenced variableGroup does not exist",
            "group" => group_name
        );
        return;
    };

    for nested_name in &group.group_refs {
        build_variable_group(schema, nested_name, "", suffix, context, item, output, depth + 1);
    }

    for reference in &group.references {
        let mut condition = reference.condition.clone();
        if !suffix.is_empty() && !condition.is_empty() {
            condition = apply_suffix_to_condition(&condition, suffix);
        }

        if !eval_condition(schema, &condition, item, context) {
            continue;
        }

        let Some(definition) = schema.get_variable_definition(&reference.name) else {
            continue;
        };

        if let Some(element) = build_variable(schema, definition, context, item) {
            output.push(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VariableGroup, VariableReference};

    fn definition(name: &str, condition: &str, output: &str) -> VariableDefinition {
        let mut content = Element::new("variable");
        let mut value = Element::new("value");
        value
            .attributes
            .insert("condition".to_string(), "String.IsEmpty(x)".to_string());
        value
            .children
            .push(XMLNode::Text("$PROPERTY[widgetPath]".to_string()));
        content.children.push(XMLNode::Element(value));

        VariableDefinition {
            name: name.to_string(),
            condition: condition.to_string(),
            output: output.to_string(),
            content: Some(content),
        }
    }

    fn item() -> MenuItem {
        MenuItem {
            name: "movies".to_string(),
            properties: [("widgetPath".to_string(), "videodb://".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    fn context() -> PropertyMap {
        [("id".to_string(), "8011".to_string())].into_iter().collect()
    }

    #[test]
    fn test_build_variable_substitutes_payload_and_name() {
        let schema = TemplateSchema::default();
        let definition = definition("PosterVar", "", "Poster_$PROPERTY[id]");

        let element = build_variable(&schema, &definition, &context(), &item()).unwrap();
        assert_eq!(element.attributes.get("name").unwrap(), "Poster_8011");

        let value = element.children[0].as_element().unwrap();
        assert_eq!(value.children[0].as_text().unwrap(), "videodb://");
        // Host-runtime conditions inside the payload pass through.
        assert_eq!(
            value.attributes.get("condition").unwrap(),
            "String.IsEmpty(x)"
        );
    }

    #[test]
    fn test_variable_condition_gates() {
        let schema = TemplateSchema::default();
        let definition = definition("V", "widgetArt=Poster", "");
        assert!(build_variable(&schema, &definition, &context(), &item()).is_none());
    }

    #[test]
    fn test_default_output_name_is_definition_name() {
        let schema = TemplateSchema::default();
        let definition = definition("PlainVar", "", "");
        let element = build_variable(&schema, &definition, &context(), &item()).unwrap();
        assert_eq!(element.attributes.get("name").unwrap(), "PlainVar");
    }

    #[test]
    fn test_variable_group_with_suffix_and_nesting() {
        let mut schema = TemplateSchema::default();
        schema
            .variable_definitions
            .insert("V1".to_string(), definition("V1", "", ""));
        schema
            .variable_definitions
            .insert("V2".to_string(), definition("V2", "", ""));

        schema.variable_groups.insert(
            "inner".to_string(),
            VariableGroup {
                name: "inner".to_string(),
                references: vec![VariableReference {
                    name: "V2".to_string(),
                    condition: String::new(),
                }],
                group_refs: vec![],
            },
        );
        schema.variable_groups.insert(
            "outer".to_string(),
            VariableGroup {
                name: "outer".to_string(),
                references: vec![VariableReference {
                    name: "V1".to_string(),
                    condition: "widgetArt=Poster".to_string(),
                }],
                group_refs: vec!["inner".to_string()],
            },
        );

        // Item has the suffixed property only; the suffixed reference
        // condition selects it.
        let item = MenuItem {
            name: "movies".to_string(),
            properties: [("widgetArt.2".to_string(), "Poster".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        let mut output = Vec::new();
        build_variable_group(
            &schema,
            "outer",
            "",
            ".2",
            &context(),
            &item,
            &mut output,
            0,
        );

        // Nested group first (depth-first), then the group's own reference.
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].attributes.get("name").unwrap(), "V2");
        assert_eq!(output[1].attributes.get("name").unwrap(), "V1");

        // Without the matching suffixed property nothing is emitted for V1.
        let mut output = Vec::new();
        build_variable_group(
            &schema,
            "outer",
            "",
            "",
            &context(),
            &item,
            &mut output,
            0,
        );
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].attributes.get("name").unwrap(), "V2");
    }

    #[test]
    fn test_missing_group_is_skipped() {
        let schema = TemplateSchema::default();
        let mut output = Vec::new();
        build_variable_group(
            &schema,
            "nope",
            "",
            "",
            &context(),
            &item(),
            &mut output,
            0,
        );
        assert!(output.is_empty());
    }
}
