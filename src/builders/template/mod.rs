//! Template processor: turns the template schema plus the effective menu
//! list into output includes and variables.

mod context;
mod element;
mod variables;

use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use xmltree::{Element, XMLNode};

use crate::config::constants::compile_time::menus::DEFAULT_CONTAINER;
use crate::log_debug;
use crate::models::{
    BuildMode, Menu, MenuItem, PropertyMap, PropertySchema, Template, TemplateOnly,
    TemplateOutput, TemplateSchema,
};

static ASSIGNED_TEMPLATE_RE: OnceLock<Regex> = OnceLock::new();

fn assigned_template_re() -> &'static Regex {
    ASSIGNED_TEMPLATE_RE.get_or_init(|| {
        Regex::new(r"\$INCLUDE\[skinshortcuts-template-([^\]]+)\]").expect("valid pattern")
    })
}

/// Builds template includes and variables from the schema and menu list.
pub struct TemplateBuilder<'a> {
    schema: &'a TemplateSchema,
    menus: &'a [Menu],
    property_schema: Option<&'a PropertySchema>,
    menu_map: HashMap<String, &'a Menu>,
    assigned_templates: HashSet<String>,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(
        schema: &'a TemplateSchema,
        menus: &'a [Menu],
        property_schema: Option<&'a PropertySchema>,
    ) -> Self {
        let menu_map = menus.iter().map(|m| (m.name.clone(), m)).collect();
        let assigned_templates = collect_assigned_templates(menus);
        Self {
            schema,
            menus,
            property_schema,
            menu_map,
            assigned_templates,
        }
    }

    /// Build all templates. Returns root-level variables and the include
    /// elements, both in deterministic declaration/encounter order.
    pub fn build(&self) -> (Vec<Element>, Vec<Element>) {
        let mut include_map: IndexMap<String, Element> = IndexMap::new();
        let mut variables: Vec<Element> = Vec::new();
        let mut template_only_settings: HashMap<String, TemplateOnly> = HashMap::new();

        for template in &self.schema.templates {
            for output in template.effective_outputs() {
                let include_name = format!("skinshortcuts-template-{}", output.include);

                if template.template_only != TemplateOnly::No {
                    template_only_settings.insert(include_name.clone(), template.template_only);
                }

                let accumulator = include_map.entry(include_name.clone()).or_insert_with(|| {
                    let mut element = Element::new("include");
                    element
                        .attributes
                        .insert("name".to_string(), include_name.clone());
                    element
                });

                // Split borrows: the accumulator cannot stay borrowed while
                // variables are collected, so gather controls first.
                let (nodes, mut emitted_variables) = self.build_template_output(template, &output);
                accumulator.children.extend(nodes);
                variables.append(&mut emitted_variables);
            }
        }

        let mut includes = Vec::new();
        for (include_name, mut element) in include_map {
            match template_only_settings.get(&include_name) {
                Some(TemplateOnly::Always) => continue,
                Some(TemplateOnly::Auto) if !self.assigned_templates.contains(&include_name) => {
                    log_debug!("Skipping unassigned auto template", "include" => include_name);
                    continue;
                }
                _ => {}
            }

            if element.children.is_empty() {
                let mut description = Element::new("description");
                description.children.push(XMLNode::Text(
                    "Automatically generated - no menu items matched this template".to_string(),
                ));
                element.children.push(XMLNode::Element(description));
            }
            includes.push(element);
        }

        (variables, includes)
    }

    /// Run one template for one declared output over its iteration domain.
    fn build_template_output(
        &self,
        template: &Template,
        output: &TemplateOutput,
    ) -> (Vec<XMLNode>, Vec<Element>) {
        let mut nodes = Vec::new();
        let mut variables = Vec::new();

        match template.build {
            BuildMode::Menu => {
                for menu in self.menus {
                    if !template.menu_filter.is_empty() && menu.name != template.menu_filter {
                        continue;
                    }
                    for (offset, item) in menu.items.iter().enumerate() {
                        if item.disabled {
                            continue;
                        }
                        let index = offset + 1;
                        if !context::check_conditions(
                            self.schema,
                            &template.conditions,
                            item,
                            &output.suffix,
                        ) {
                            continue;
                        }
                        self.run_iteration(
                            template,
                            output,
                            item,
                            index,
                            &menu.name,
                            &menu.defaults.properties,
                            container_of(menu),
                            None,
                            &mut nodes,
                            &mut variables,
                        );
                    }
                }
            }
            BuildMode::List => {
                for (row_index, row) in template.list_items.iter().enumerate() {
                    let item = synthetic_item(&row.attributes);
                    if !context::check_conditions(
                        self.schema,
                        &template.conditions,
                        &item,
                        &output.suffix,
                    ) {
                        continue;
                    }
                    self.run_iteration(
                        template,
                        output,
                        &item,
                        row_index + 1,
                        "",
                        &PropertyMap::new(),
                        DEFAULT_CONTAINER,
                        None,
                        &mut nodes,
                        &mut variables,
                    );
                }
            }
            BuildMode::Raw => {
                let item = MenuItem::default();
                if context::check_conditions(
                    self.schema,
                    &template.conditions,
                    &item,
                    &output.suffix,
                ) {
                    let params: PropertyMap = template
                        .params
                        .iter()
                        .map(|p| (p.name.clone(), p.default.clone()))
                        .collect();
                    self.run_iteration(
                        template,
                        output,
                        &item,
                        0,
                        "",
                        &PropertyMap::new(),
                        DEFAULT_CONTAINER,
                        Some(&params),
                        &mut nodes,
                        &mut variables,
                    );
                }
            }
        }

        (nodes, variables)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_iteration(
        &self,
        template: &Template,
        output: &TemplateOutput,
        item: &MenuItem,
        index: usize,
        menu_name: &str,
        menu_defaults: &PropertyMap,
        container: &str,
        params: Option<&PropertyMap>,
        nodes: &mut Vec<XMLNode>,
        variables: &mut Vec<Element>,
    ) {
        let mut iteration_context = context::build_context(
            self.schema,
            self.property_schema,
            template,
            output,
            item,
            index,
            menu_name,
            menu_defaults,
        );
        if template.build == BuildMode::Raw {
            // Raw output has no item and no menu; these built-ins stay empty.
            iteration_context.insert("index".to_string(), String::new());
            iteration_context.insert("name".to_string(), String::new());
            iteration_context.insert("menu".to_string(), String::new());
            iteration_context.insert("id".to_string(), output.id_prefix.clone());
        }

        if let Some(controls) = &template.controls {
            let scope = element::Scope {
                schema: self.schema,
                menus: &self.menu_map,
                context: &iteration_context,
                item,
                parent_context: None,
                params,
                container,
            };
            nodes.extend(element::process_controls(controls, &scope));
        }

        for definition in &template.variables {
            if let Some(element) =
                variables::build_variable(self.schema, definition, &iteration_context, item)
            {
                variables.push(element);
            }
        }

        for reference in &template.variable_groups {
            let suffix = context::combine_suffixes(&output.suffix, &reference.suffix);
            variables::build_variable_group(
                self.schema,
                &reference.name,
                &reference.condition,
                suffix,
                &iteration_context,
                item,
                variables,
                0,
            );
        }
    }
}

fn container_of(menu: &Menu) -> &str {
    if menu.container.is_empty() {
        DEFAULT_CONTAINER
    } else {
        &menu.container
    }
}

/// A list row acts as an item whose property map is the row's attributes.
fn synthetic_item(attributes: &PropertyMap) -> MenuItem {
    MenuItem {
        name: attributes.get("name").cloned().unwrap_or_default(),
        label: attributes.get("label").cloned().unwrap_or_default(),
        properties: attributes.clone(),
        ..Default::default()
    }
}

/// Scan every item property value for template assignments, the trigger
/// surface for `templateonly="auto"`.
fn collect_assigned_templates(menus: &[Menu]) -> HashSet<String> {
    let mut assigned = HashSet::new();
    for menu in menus {
        for item in &menu.items {
            for value in item.properties.values() {
                if value.is_empty() {
                    continue;
                }
                for caps in assigned_template_re().captures_iter(value) {
                    assigned.insert(format!("skinshortcuts-template-{}", &caps[1]));
                }
            }
        }
    }
    assigned
}
