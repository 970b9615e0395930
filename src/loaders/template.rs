//! Template schema loader for templates.xml.
//!
//! The file is sectioned: `<expressions>`, `<presets>`, `<propertyGroups>`,
//! `<variables>`, `<includes>`, then `<template>` and `<submenu>` records.

use roxmltree::{Document, Node};
use std::path::Path;

use super::base::{
    attr, attr_bool, child_elements, children, node_line, text, to_xml_element,
};
use super::error::ConfigError;
use super::read_optional_file;
use crate::models::{
    BuildMode, ExpressionDefinition, GroupReference, IncludeDefinition, ListItem, Preset,
    PresetGroup, PresetGroupChild, PresetValues, PropertyGroup, PropertyMap, SubmenuTemplate,
    Template, TemplateOnly, TemplateOutput, TemplateParam, TemplateProperty, TemplateSchema,
    TemplateVar, VarValue, VariableDefinition, VariableGroup, VariableReference,
};

/// Load the template schema from templates.xml.
///
/// A missing file yields the empty schema.
pub fn load_templates(path: &Path) -> Result<TemplateSchema, ConfigError> {
    let file = path.display().to_string();
    let Some(source) = read_optional_file(path, |msg| ConfigError::template(&file, msg))? else {
        return Ok(TemplateSchema::default());
    };

    let doc = Document::parse(&source).map_err(|e| {
        ConfigError::template(&file, format!("XML parse error: {}", e)).with_line(e.pos().row)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "templates" {
        return Err(ConfigError::template(
            &file,
            format!("Expected <templates>, got <{}>", root.tag_name().name()),
        ));
    }

    let mut schema = TemplateSchema::default();

    for section in child_elements(root) {
        match section.tag_name().name() {
            "expressions" => parse_expressions(section, &mut schema),
            "presets" => parse_presets(section, &mut schema),
            "propertyGroups" => parse_property_groups(section, &mut schema),
            "variables" => parse_variables_section(section, &mut schema),
            "includes" => parse_includes(section, &mut schema),
            "template" => {
                let template = parse_template(&doc, section, &file)?;
                schema.templates.push(template);
            }
            "submenu" => {
                let submenu = parse_submenu(section);
                schema.submenus.push(submenu);
            }
            _ => {}
        }
    }

    Ok(schema)
}

fn parse_expressions(section: Node, schema: &mut TemplateSchema) {
    for node in children(section, "expression") {
        let name = attr(node, "name");
        if name.is_empty() {
            continue;
        }
        schema.expressions.insert(
            name,
            ExpressionDefinition {
                value: text(node),
                nosuffix: attr_bool(node, "nosuffix", false),
            },
        );
    }
}

fn attribute_values(node: Node) -> PropertyMap {
    node.attributes()
        .filter(|a| a.name() != "condition")
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

fn parse_presets(section: Node, schema: &mut TemplateSchema) {
    for node in child_elements(section) {
        match node.tag_name().name() {
            "preset" => {
                let name = attr(node, "name");
                if name.is_empty() {
                    continue;
                }
                let rows = children(node, "values")
                    .map(|row| PresetValues {
                        condition: attr(row, "condition"),
                        values: attribute_values(row),
                    })
                    .collect();
                schema.presets.insert(name.clone(), Preset { name, rows });
            }
            "presetGroup" => {
                let name = attr(node, "name");
                if name.is_empty() {
                    continue;
                }
                let mut group_children = Vec::new();
                for child_node in child_elements(node) {
                    match child_node.tag_name().name() {
                        "preset" => group_children.push(PresetGroupChild::Preset {
                            name: attr(child_node, "name"),
                            condition: attr(child_node, "condition"),
                        }),
                        "values" => group_children.push(PresetGroupChild::Values {
                            condition: attr(child_node, "condition"),
                            values: attribute_values(child_node),
                        }),
                        _ => {}
                    }
                }
                schema.preset_groups.insert(
                    name.clone(),
                    PresetGroup {
                        name,
                        children: group_children,
                    },
                );
            }
            _ => {}
        }
    }
}

fn parse_template_property(node: Node) -> Option<TemplateProperty> {
    let name = attr(node, "name");
    if name.is_empty() {
        return None;
    }

    let value = {
        let attr_value = attr(node, "value");
        if attr_value.is_empty() {
            text(node)
        } else {
            attr_value
        }
    };

    Some(TemplateProperty {
        name,
        value,
        from: attr(node, "from"),
        condition: attr(node, "condition"),
    })
}

fn parse_var(node: Node) -> Option<TemplateVar> {
    let name = attr(node, "name");
    if name.is_empty() {
        return None;
    }

    let values = children(node, "value")
        .map(|value_node| VarValue {
            condition: attr(value_node, "condition"),
            value: text(value_node),
        })
        .collect();

    Some(TemplateVar { name, values })
}

fn parse_property_groups(section: Node, schema: &mut TemplateSchema) {
    for node in children(section, "propertyGroup") {
        let name = attr(node, "name");
        if name.is_empty() {
            continue;
        }

        let mut group = PropertyGroup {
            name: name.clone(),
            ..Default::default()
        };
        for child_node in child_elements(node) {
            match child_node.tag_name().name() {
                "property" => {
                    if let Some(property) = parse_template_property(child_node) {
                        group.properties.push(property);
                    }
                }
                "var" => {
                    if let Some(var) = parse_var(child_node) {
                        group.vars.push(var);
                    }
                }
                _ => {}
            }
        }
        schema.property_groups.insert(name, group);
    }
}

fn parse_variable_definition(node: Node) -> Option<VariableDefinition> {
    let name = attr(node, "name");
    if name.is_empty() {
        return None;
    }

    // The payload is the <variable> element the processor deep-copies;
    // definition metadata attributes stay off of it.
    let mut content = xmltree::Element::new("variable");
    for child_node in child_elements(node) {
        content
            .children
            .push(xmltree::XMLNode::Element(to_xml_element(child_node)));
    }

    Some(VariableDefinition {
        name,
        condition: attr(node, "condition"),
        output: attr(node, "output"),
        content: Some(content),
    })
}

fn parse_variables_section(section: Node, schema: &mut TemplateSchema) {
    for node in child_elements(section) {
        match node.tag_name().name() {
            "variable" => {
                if let Some(definition) = parse_variable_definition(node) {
                    schema
                        .variable_definitions
                        .insert(definition.name.clone(), definition);
                }
            }
            "variableGroup" => {
                let name = attr(node, "name");
                if name.is_empty() {
                    continue;
                }
                let mut group = VariableGroup {
                    name: name.clone(),
                    ..Default::default()
                };
                for child_node in child_elements(node) {
                    match child_node.tag_name().name() {
                        "use" => group.references.push(VariableReference {
                            name: attr(child_node, "name"),
                            condition: attr(child_node, "condition"),
                        }),
                        "group" => {
                            let nested = attr(child_node, "name");
                            if !nested.is_empty() {
                                group.group_refs.push(nested);
                            }
                        }
                        _ => {}
                    }
                }
                schema.variable_groups.insert(name, group);
            }
            _ => {}
        }
    }
}

fn parse_includes(section: Node, schema: &mut TemplateSchema) {
    for node in children(section, "include") {
        let name = attr(node, "name");
        if name.is_empty() {
            continue;
        }
        schema.includes.insert(
            name.clone(),
            IncludeDefinition {
                name,
                controls: Some(to_xml_element(node)),
            },
        );
    }
}

fn parse_group_reference(node: Node) -> GroupReference {
    GroupReference {
        name: attr(node, "name"),
        suffix: attr(node, "suffix"),
        condition: attr(node, "condition"),
    }
}

fn parse_template(doc: &Document, node: Node, file: &str) -> Result<Template, ConfigError> {
    let include = attr(node, "include");
    if include.is_empty() {
        return Err(
            ConfigError::template(file, "Template missing 'include' attribute")
                .with_line(node_line(doc, node)),
        );
    }

    let build = match attr(node, "build").to_ascii_lowercase().as_str() {
        "list" => BuildMode::List,
        "true" | "raw" => BuildMode::Raw,
        _ => BuildMode::Menu,
    };

    let template_only = match attr(node, "templateonly").to_ascii_lowercase().as_str() {
        "true" => TemplateOnly::Always,
        "auto" => TemplateOnly::Auto,
        _ => TemplateOnly::No,
    };

    let mut template = Template {
        include,
        build,
        id_prefix: attr(node, "idprefix"),
        template_only,
        menu_filter: attr(node, "menu"),
        ..Default::default()
    };

    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "condition" => {
                let condition = text(child_node);
                if !condition.is_empty() {
                    template.conditions.push(condition);
                }
            }
            "output" => template.outputs.push(TemplateOutput {
                include: attr(child_node, "include"),
                id_prefix: attr(child_node, "idprefix"),
                suffix: attr(child_node, "suffix"),
            }),
            "param" => {
                let name = attr(child_node, "name");
                if !name.is_empty() {
                    template.params.push(TemplateParam {
                        name,
                        default: attr(child_node, "default"),
                    });
                }
            }
            "property" => {
                if let Some(property) = parse_template_property(child_node) {
                    template.properties.push(property);
                }
            }
            "var" => {
                if let Some(var) = parse_var(child_node) {
                    template.vars.push(var);
                }
            }
            "propertyGroup" => template.property_groups.push(parse_group_reference(child_node)),
            "preset" => template.preset_refs.push(parse_group_reference(child_node)),
            "presetGroup" => template
                .preset_group_refs
                .push(parse_group_reference(child_node)),
            "variableGroup" => template
                .variable_groups
                .push(parse_group_reference(child_node)),
            "list" => {
                for item_node in children(child_node, "item") {
                    template.list_items.push(ListItem {
                        attributes: item_node
                            .attributes()
                            .map(|a| (a.name().to_string(), a.value().to_string()))
                            .collect(),
                    });
                }
            }
            "controls" => {
                template.controls = Some(to_xml_element(child_node));
            }
            "variables" => {
                for variable_node in children(child_node, "variable") {
                    if let Some(definition) = parse_variable_definition(variable_node) {
                        template.variables.push(definition);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(template)
}

fn parse_submenu(node: Node) -> SubmenuTemplate {
    let mut submenu = SubmenuTemplate {
        include: attr(node, "include"),
        level: attr(node, "level").parse().unwrap_or(0),
        name: attr(node, "name"),
        ..Default::default()
    };

    for child_node in child_elements(node) {
        match child_node.tag_name().name() {
            "property" => {
                if let Some(property) = parse_template_property(child_node) {
                    submenu.properties.push(property);
                }
            }
            "var" => {
                if let Some(var) = parse_var(child_node) {
                    submenu.vars.push(var);
                }
            }
            "propertyGroup" => submenu.property_groups.push(parse_group_reference(child_node)),
            "controls" => submenu.controls = Some(to_xml_element(child_node)),
            _ => {}
        }
    }

    submenu
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::testutil::tempdir;

    #[test]
    fn test_missing_file() {
        let schema = load_templates(Path::new("/nonexistent/templates.xml")).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let dir = tempdir("templates");
        let path = dir.write_file(
            "templates.xml",
            r#"<templates>
                <expressions>
                    <expression name="HasWidget" nosuffix="true">widgetPath</expression>
                </expressions>
                <presets>
                    <preset name="dim">
                        <values condition="widgetArt=Poster" top="70" height="460"/>
                        <values top="471" height="200"/>
                    </preset>
                    <presetGroup name="layout">
                        <preset name="dim" condition="widgetStyle=panel"/>
                        <values top="0"/>
                    </presetGroup>
                </presets>
                <propertyGroups>
                    <propertyGroup name="common">
                        <property name="left" value="245"/>
                        <property name="content" from="widgetPath"/>
                        <var name="rows">
                            <value condition="widgetArt=Poster">2</value>
                            <value>3</value>
                        </var>
                    </propertyGroup>
                </propertyGroups>
                <variables>
                    <variable name="PosterVar" condition="widgetArt=Poster" output="Poster_$PROPERTY[id]">
                        <value condition="String.IsEmpty(x)">fallback.jpg</value>
                    </variable>
                    <variableGroup name="widgetVars">
                        <use name="PosterVar" condition="widgetPath"/>
                        <group name="moreVars"/>
                    </variableGroup>
                </variables>
                <includes>
                    <include name="WidgetHeader">
                        <control type="label"><label>$PROPERTY[widgetLabel]</label></control>
                    </include>
                </includes>
                <template include="widget" idprefix="801" templateonly="auto" menu="mainmenu">
                    <condition>widgetPath</condition>
                    <output include="widget1" idprefix="8011"/>
                    <output include="widget2" idprefix="8021" suffix=".2"/>
                    <property name="style" value="panel"/>
                    <propertyGroup name="common" suffix=".2"/>
                    <preset name="dim"/>
                    <presetGroup name="layout" condition="widgetStyle"/>
                    <variableGroup name="widgetVars"/>
                    <controls>
                        <control type="list" id="$PROPERTY[id]"/>
                    </controls>
                </template>
                <template include="static" build="list">
                    <list>
                        <item label="row1" kind="a"/>
                        <item label="row2" kind="b"/>
                    </list>
                </template>
                <template include="frame" build="true">
                    <param name="width" default="400"/>
                </template>
                <submenu include="submenu" level="1"/>
            </templates>"#,
        );

        let schema = load_templates(&path).unwrap();

        let expr = schema.get_expression("HasWidget").unwrap();
        assert!(expr.nosuffix);
        assert_eq!(expr.value, "widgetPath");

        let preset = schema.get_preset("dim").unwrap();
        assert_eq!(preset.rows.len(), 2);
        assert_eq!(preset.rows[0].condition, "widgetArt=Poster");
        assert_eq!(preset.rows[0].values.get("top").unwrap(), "70");
        assert!(!preset.rows[0].values.contains_key("condition"));

        let group = schema.get_preset_group("layout").unwrap();
        assert_eq!(group.children.len(), 2);

        let property_group = schema.get_property_group("common").unwrap();
        assert_eq!(property_group.properties.len(), 2);
        assert_eq!(property_group.properties[1].from, "widgetPath");
        assert_eq!(property_group.vars[0].values.len(), 2);

        let variable = schema.get_variable_definition("PosterVar").unwrap();
        assert_eq!(variable.output, "Poster_$PROPERTY[id]");
        assert!(variable.content.is_some());

        let variable_group = schema.get_variable_group("widgetVars").unwrap();
        assert_eq!(variable_group.references.len(), 1);
        assert_eq!(variable_group.group_refs, vec!["moreVars".to_string()]);

        assert!(schema.get_include("WidgetHeader").is_some());

        assert_eq!(schema.templates.len(), 3);
        let template = &schema.templates[0];
        assert_eq!(template.build, BuildMode::Menu);
        assert_eq!(template.template_only, TemplateOnly::Auto);
        assert_eq!(template.menu_filter, "mainmenu");
        assert_eq!(template.conditions, vec!["widgetPath".to_string()]);
        assert_eq!(template.outputs.len(), 2);
        assert_eq!(template.outputs[1].suffix, ".2");
        assert_eq!(template.property_groups[0].suffix, ".2");
        assert!(template.controls.is_some());

        let list_template = &schema.templates[1];
        assert_eq!(list_template.build, BuildMode::List);
        assert_eq!(list_template.list_items.len(), 2);

        let raw_template = &schema.templates[2];
        assert_eq!(raw_template.build, BuildMode::Raw);
        assert_eq!(raw_template.params[0].default, "400");

        assert_eq!(schema.submenus.len(), 1);
        assert_eq!(schema.submenus[0].level, 1);
    }

    #[test]
    fn test_template_without_include_is_error() {
        let dir = tempdir("templates");
        let path = dir.write_file("templates.xml", "<templates>\n<template/>\n</templates>");
        let err = load_templates(&path).unwrap_err();
        assert!(err.to_string().contains("missing 'include'"));
    }

    #[test]
    fn test_inline_template_variables() {
        let dir = tempdir("templates");
        let path = dir.write_file(
            "templates.xml",
            r#"<templates>
                <template include="w">
                    <variables>
                        <variable name="V1"><value>x</value></variable>
                    </variables>
                </template>
            </templates>"#,
        );
        let schema = load_templates(&path).unwrap();
        assert_eq!(schema.templates[0].variables.len(), 1);
        assert_eq!(schema.templates[0].variables[0].name, "V1");
    }
}
