//! Includes document assembler.
//!
//! Walks the effective menu list and emits one include per root menu, a
//! combined submenu include, and custom-widget includes, then appends the
//! template output and view expressions into a single `<includes>` document.

use std::collections::HashMap;
use xmltree::{Element, XMLNode};

use super::template::TemplateBuilder;
use super::views::ViewExpressionBuilder;
use crate::config::constants::compile_time::menus::CUSTOM_WIDGET_SLOTS;
use crate::log_debug;
use crate::models::{
    ActionPosition, IncludePosition, ItemInclude, Menu, MenuItem, PropertySchema, TemplateSchema,
    ViewConfig,
};
use crate::userdata::UserData;

/// Builds the output document from the effective menu list.
pub struct IncludesBuilder<'a> {
    menus: &'a [Menu],
    templates: Option<&'a TemplateSchema>,
    property_schema: Option<&'a PropertySchema>,
    view_config: Option<&'a ViewConfig>,
    userdata: Option<&'a UserData>,
    menu_map: HashMap<String, &'a Menu>,
}

impl<'a> IncludesBuilder<'a> {
    pub fn new(
        menus: &'a [Menu],
        templates: Option<&'a TemplateSchema>,
        property_schema: Option<&'a PropertySchema>,
        view_config: Option<&'a ViewConfig>,
        userdata: Option<&'a UserData>,
    ) -> Self {
        let menu_map = menus.iter().map(|m| (m.name.clone(), m)).collect();
        Self {
            menus,
            templates,
            property_schema,
            view_config,
            userdata,
            menu_map,
        }
    }

    /// Build the full `<includes>` document: variables first, then includes,
    /// then view expressions.
    pub fn build(&self) -> Element {
        let mut root = Element::new("includes");

        let mut menu_includes: Vec<Element> = Vec::new();
        for menu in self.menus {
            if menu.is_submenu {
                if !self.is_referenced(menu) {
                    log_debug!("Skipping orphan submenu", "submenu" => menu.name);
                }
                continue;
            }

            menu_includes.push(self.build_menu_include(menu));

            if let Some(submenu_include) = self.build_submenu_include(menu) {
                menu_includes.push(submenu_include);
            }

            menu_includes.extend(self.build_custom_widget_includes(menu));
        }

        let mut variables: Vec<Element> = Vec::new();
        let mut template_includes: Vec<Element> = Vec::new();
        if let Some(templates) = self.templates {
            if !templates.is_empty() {
                let builder = TemplateBuilder::new(templates, self.menus, self.property_schema);
                let (template_variables, includes) = builder.build();
                variables = template_variables;
                template_includes = includes;
            }
        }

        let mut expressions: Vec<Element> = Vec::new();
        if let (Some(view_config), Some(userdata)) = (self.view_config, self.userdata) {
            if !view_config.content_rules.is_empty() {
                expressions = ViewExpressionBuilder::new(view_config, userdata).build();
            }
        }

        for element in variables {
            root.children.push(XMLNode::Element(element));
        }
        for element in menu_includes
            .into_iter()
            .chain(template_includes.into_iter())
        {
            root.children.push(XMLNode::Element(element));
        }
        for element in expressions {
            root.children.push(XMLNode::Element(element));
        }

        root
    }

    fn is_referenced(&self, submenu: &Menu) -> bool {
        self.menus.iter().any(|menu| {
            menu.items.iter().any(|item| {
                let reference = if item.submenu.is_empty() {
                    &item.name
                } else {
                    &item.submenu
                };
                reference == &submenu.name
            })
        })
    }

    fn build_menu_include(&self, menu: &Menu) -> Element {
        let mut include = Element::new("include");
        include
            .attributes
            .insert("name".to_string(), format!("skinshortcuts-{}", menu.name));

        let start = if menu.controltype.is_empty() {
            1
        } else {
            menu.startid
        };
        // Disabled items still consume an id so enabling one later does not
        // renumber its neighbors.
        for (offset, item) in menu.items.iter().enumerate() {
            if item.disabled {
                continue;
            }
            let element = self.build_item(item, start + offset as i64, menu);
            include.children.push(XMLNode::Element(element));
        }

        include
    }

    /// Combined submenu include: every enabled item of every referenced
    /// submenu, linked to its parent item.
    fn build_submenu_include(&self, parent_menu: &Menu) -> Option<Element> {
        let mut entries: Vec<(&MenuItem, &MenuItem, &Menu)> = Vec::new();

        for parent_item in &parent_menu.items {
            if parent_item.disabled {
                continue;
            }
            let submenu_name = if parent_item.submenu.is_empty() {
                &parent_item.name
            } else {
                &parent_item.submenu
            };
            let Some(submenu) = self.menu_map.get(submenu_name).copied() else {
                continue;
            };
            for sub_item in &submenu.items {
                if !sub_item.disabled {
                    entries.push((parent_item, sub_item, submenu));
                }
            }
        }

        if entries.is_empty() {
            return None;
        }

        let mut include = Element::new("include");
        include.attributes.insert(
            "name".to_string(),
            format!("skinshortcuts-{}-submenu", parent_menu.name),
        );

        for (global_index, (parent_item, sub_item, submenu)) in entries.iter().enumerate() {
            let element = self.build_submenu_item(
                sub_item,
                global_index as i64 + 1,
                parent_item,
                submenu,
                &parent_menu.container,
            );
            include.children.push(XMLNode::Element(element));
        }

        Some(include)
    }

    fn build_submenu_item(
        &self,
        item: &MenuItem,
        index: i64,
        parent_item: &MenuItem,
        menu: &Menu,
        container: &str,
    ) -> Element {
        let mut element = self.build_item(item, index, menu);
        add_property(&mut element, "parent", &parent_item.name);

        if !container.is_empty() {
            let visibility = format!(
                "String.IsEqual(Container({}).ListItem.Property(name),{})",
                container, parent_item.name
            );

            let existing = element.children.iter_mut().find_map(|node| match node {
                XMLNode::Element(child) if child.name == "visible" => Some(child),
                _ => None,
            });

            match existing {
                Some(visible) => {
                    let current = visible.get_text().unwrap_or_default().into_owned();
                    visible.children = vec![XMLNode::Text(if current.is_empty() {
                        visibility
                    } else {
                        format!("[{}] + [{}]", current, visibility)
                    })];
                }
                None => {
                    let mut visible = Element::new("visible");
                    visible.children.push(XMLNode::Text(visibility));
                    element.children.push(XMLNode::Element(visible));
                }
            }
        }

        element
    }

    /// Custom widget includes referenced through `customWidget` item
    /// properties, one include per filled slot.
    fn build_custom_widget_includes(&self, parent_menu: &Menu) -> Vec<Element> {
        let mut includes = Vec::new();

        for parent_item in &parent_menu.items {
            if parent_item.disabled {
                continue;
            }

            for slot in 1..=CUSTOM_WIDGET_SLOTS {
                let suffix = if slot == 1 {
                    String::new()
                } else {
                    format!(".{}", slot)
                };
                let property_name = format!("customWidget{}", suffix);
                let Some(menu_reference) = parent_item.properties.get(&property_name) else {
                    continue;
                };
                if menu_reference.is_empty() {
                    continue;
                }

                let Some(widget_menu) = self.menu_map.get(menu_reference).copied() else {
                    continue;
                };
                if widget_menu.items.is_empty() {
                    continue;
                }

                let slot_name = if slot == 1 {
                    String::new()
                } else {
                    slot.to_string()
                };
                let mut include = Element::new("include");
                include.attributes.insert(
                    "name".to_string(),
                    format!(
                        "skinshortcuts-{}-customwidget{}",
                        parent_item.name, slot_name
                    ),
                );

                for (offset, widget_item) in widget_menu.items.iter().enumerate() {
                    if widget_item.disabled {
                        continue;
                    }
                    let element = self.build_item(widget_item, offset as i64 + 1, widget_menu);
                    include.children.push(XMLNode::Element(element));
                }

                includes.push(include);
            }
        }

        includes
    }

    /// Emit one item (or control) element with labels, actions, includes,
    /// visibility, and property children.
    fn build_item(&self, item: &MenuItem, id: i64, menu: &Menu) -> Element {
        let mut element = if menu.controltype.is_empty() {
            Element::new("item")
        } else {
            let mut control = Element::new("control");
            control
                .attributes
                .insert("type".to_string(), menu.controltype.clone());
            control
        };
        element.attributes.insert("id".to_string(), id.to_string());

        add_text_child(&mut element, "label", &item.label);
        if !item.label2.is_empty() {
            add_text_child(&mut element, "label2", &item.label2);
        }
        add_text_child(&mut element, "icon", &item.icon);
        if !item.thumb.is_empty() {
            add_text_child(&mut element, "thumb", &item.thumb);
        }

        let all_includes: Vec<&ItemInclude> = menu
            .defaults
            .includes
            .iter()
            .chain(item.includes.iter())
            .collect();

        for include in all_includes
            .iter()
            .filter(|i| i.position == IncludePosition::BeforeOnClick)
        {
            add_include_child(&mut element, include);
        }

        let before_defaults = menu
            .defaults
            .actions
            .iter()
            .filter(|a| a.when == ActionPosition::Before);
        for action in before_defaults {
            add_onclick_child(&mut element, &action.action, &action.condition);
        }

        let conditional = item.actions.iter().filter(|a| !a.condition.is_empty());
        let unconditional = item.actions.iter().filter(|a| a.condition.is_empty());
        for action in conditional.chain(unconditional) {
            add_onclick_child(&mut element, &action.action, &action.condition);
        }

        let after_defaults = menu
            .defaults
            .actions
            .iter()
            .filter(|a| a.when == ActionPosition::After);
        for action in after_defaults {
            add_onclick_child(&mut element, &action.action, &action.condition);
        }

        for include in all_includes
            .iter()
            .filter(|i| i.position == IncludePosition::AfterOnClick)
        {
            add_include_child(&mut element, include);
        }

        if !item.visible.is_empty() {
            add_text_child(&mut element, "visible", &item.visible);
        }

        if menu.controltype.is_empty() {
            add_property(&mut element, "id", &id.to_string());
            add_property(&mut element, "name", &item.name);
            add_property(&mut element, "menu", &menu.name);
            add_property(&mut element, "path", item.primary_action());

            let submenu_name = if item.submenu.is_empty() {
                &item.name
            } else {
                &item.submenu
            };
            if let Some(submenu) = self.menu_map.get(submenu_name).copied() {
                if !submenu.items.is_empty() {
                    add_property(&mut element, "submenuVisibility", submenu_name);
                    add_property(&mut element, "hasSubmenu", "True");
                }
            }

            let mut all_properties = menu.defaults.properties.clone();
            for (key, value) in &item.properties {
                all_properties.insert(key.clone(), value.clone());
            }
            for (key, value) in &all_properties {
                if self.is_template_only(key) {
                    continue;
                }
                add_property(&mut element, key, value);
            }
        }

        element
    }

    fn is_template_only(&self, property_name: &str) -> bool {
        self.property_schema
            .map(|schema| schema.is_template_only(property_name))
            .unwrap_or(false)
    }
}

fn add_text_child(parent: &mut Element, name: &str, value: &str) {
    let mut child = Element::new(name);
    if !value.is_empty() {
        child.children.push(XMLNode::Text(value.to_string()));
    }
    parent.children.push(XMLNode::Element(child));
}

fn add_onclick_child(parent: &mut Element, action: &str, condition: &str) {
    let mut child = Element::new("onclick");
    child.children.push(XMLNode::Text(action.to_string()));
    if !condition.is_empty() {
        child
            .attributes
            .insert("condition".to_string(), condition.to_string());
    }
    parent.children.push(XMLNode::Element(child));
}

fn add_include_child(parent: &mut Element, include: &ItemInclude) {
    let mut child = Element::new("include");
    child.children.push(XMLNode::Text(include.name.clone()));
    if !include.condition.is_empty() {
        child
            .attributes
            .insert("condition".to_string(), include.condition.clone());
    }
    parent.children.push(XMLNode::Element(child));
}

/// Property children are skipped for empty values.
fn add_property(parent: &mut Element, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let mut property = Element::new("property");
    property
        .attributes
        .insert("name".to_string(), name.to_string());
    property.children.push(XMLNode::Text(value.to_string()));
    parent.children.push(XMLNode::Element(property));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, DefaultAction, MenuDefaults};

    fn render(element: &Element) -> String {
        let mut buffer = Vec::new();
        element
            .write_with_config(
                &mut buffer,
                xmltree::EmitterConfig::new().write_document_declaration(false),
            )
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn simple_menu() -> Menu {
        Menu {
            name: "main".to_string(),
            container: "9000".to_string(),
            items: vec![MenuItem {
                name: "movies".to_string(),
                label: "Movies".to_string(),
                icon: "m.png".to_string(),
                actions: vec![Action::new("Go()")],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_item_emission() {
        // Spec scenario S1.
        let menus = vec![simple_menu()];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let root = builder.build();
        let output = render(&root);

        assert!(output.contains("<include name=\"skinshortcuts-main\">"));
        assert!(output.contains("<item id=\"1\">"));
        assert!(output.contains("<label>Movies</label>"));
        assert!(output.contains("<icon>m.png</icon>"));
        assert!(output.contains("<onclick>Go()</onclick>"));
        assert!(output.contains("<property name=\"id\">1</property>"));
        assert!(output.contains("<property name=\"name\">movies</property>"));
        assert!(output.contains("<property name=\"menu\">main</property>"));
        assert!(output.contains("<property name=\"path\">Go()</property>"));
    }

    #[test]
    fn test_disabled_items_skipped() {
        let mut menu = simple_menu();
        menu.items.push(MenuItem {
            name: "hidden".to_string(),
            label: "Hidden".to_string(),
            disabled: true,
            ..Default::default()
        });
        let menus = vec![menu];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());
        assert!(!output.contains("Hidden"));
    }

    #[test]
    fn test_action_ordering() {
        let mut menu = simple_menu();
        menu.defaults = MenuDefaults {
            actions: vec![
                DefaultAction {
                    action: "Before()".to_string(),
                    condition: String::new(),
                    when: ActionPosition::Before,
                },
                DefaultAction {
                    action: "After()".to_string(),
                    condition: "cond".to_string(),
                    when: ActionPosition::After,
                },
            ],
            ..Default::default()
        };
        menu.items[0].actions = vec![
            Action::new("Plain()"),
            Action {
                action: "Conditional()".to_string(),
                condition: "x".to_string(),
            },
        ];

        let menus = vec![menu];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());

        let before = output.find("<onclick>Before()</onclick>").unwrap();
        let conditional = output
            .find("<onclick condition=\"x\">Conditional()</onclick>")
            .unwrap();
        let plain = output.find("<onclick>Plain()</onclick>").unwrap();
        let after = output
            .find("<onclick condition=\"cond\">After()</onclick>")
            .unwrap();

        assert!(before < conditional);
        assert!(conditional < plain);
        assert!(plain < after);
    }

    #[test]
    fn test_submenu_include_with_visibility_and_parent() {
        let mut menus = vec![simple_menu()];
        menus.push(Menu {
            name: "movies".to_string(),
            is_submenu: true,
            items: vec![MenuItem {
                name: "recent".to_string(),
                label: "Recent".to_string(),
                actions: vec![Action::new("GoRecent()")],
                visible: "HasMovies".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });

        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());

        assert!(output.contains("<include name=\"skinshortcuts-main-submenu\">"));
        assert!(output.contains("<property name=\"parent\">movies</property>"));
        // Existing visibility is ANDed with the container predicate.
        assert!(output.contains(
            "<visible>[HasMovies] + [String.IsEqual(Container(9000).ListItem.Property(name),movies)]</visible>"
        ));
        // The submenu is not emitted as a root include.
        assert!(!output.contains("<include name=\"skinshortcuts-movies\">"));
        // Parent item advertises its submenu.
        assert!(output.contains("<property name=\"submenuVisibility\">movies</property>"));
        assert!(output.contains("<property name=\"hasSubmenu\">True</property>"));
    }

    #[test]
    fn test_custom_widget_includes() {
        let mut main = simple_menu();
        main.items[0]
            .properties
            .insert("customWidget".to_string(), "movies.customwidget".to_string());
        main.items[0]
            .properties
            .insert("customWidget.2".to_string(), "movies.customwidget.2".to_string());

        let cw1 = Menu {
            name: "movies.customwidget".to_string(),
            is_submenu: true,
            items: vec![MenuItem {
                name: "cw1".to_string(),
                label: "CW1".to_string(),
                actions: vec![Action::new("X()")],
                ..Default::default()
            }],
            ..Default::default()
        };
        let cw2 = Menu {
            name: "movies.customwidget.2".to_string(),
            is_submenu: true,
            items: vec![MenuItem {
                name: "cw2".to_string(),
                label: "CW2".to_string(),
                actions: vec![Action::new("Y()")],
                ..Default::default()
            }],
            ..Default::default()
        };

        let menus = vec![main, cw1, cw2];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());

        assert!(output.contains("<include name=\"skinshortcuts-movies-customwidget\">"));
        assert!(output.contains("<include name=\"skinshortcuts-movies-customwidget2\">"));
        assert!(output.contains("CW1"));
        assert!(output.contains("CW2"));
    }

    #[test]
    fn test_control_mode_emission() {
        let mut menu = simple_menu();
        menu.controltype = "button".to_string();
        menu.startid = 300;
        menu.items.push(MenuItem {
            name: "second".to_string(),
            label: "Second".to_string(),
            actions: vec![Action::new("S()")],
            ..Default::default()
        });

        let menus = vec![menu];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());

        assert!(output.contains("<control type=\"button\" id=\"300\">"));
        assert!(output.contains("<control type=\"button\" id=\"301\">"));
        // Control mode emits no property children.
        assert!(!output.contains("<property"));
    }

    #[test]
    fn test_template_only_properties_excluded() {
        use crate::models::SchemaProperty;

        let mut property_schema = PropertySchema::default();
        property_schema.properties.insert(
            "widgetStyle".to_string(),
            SchemaProperty {
                name: "widgetStyle".to_string(),
                template_only: true,
                ..Default::default()
            },
        );

        let mut menu = simple_menu();
        menu.items[0]
            .properties
            .insert("widgetStyle".to_string(), "panel".to_string());
        menu.items[0]
            .properties
            .insert("widget".to_string(), "recent".to_string());

        let menus = vec![menu];
        let builder = IncludesBuilder::new(&menus, None, Some(&property_schema), None, None);
        let output = render(&builder.build());

        assert!(!output.contains("widgetStyle"));
        assert!(output.contains("<property name=\"widget\">recent</property>"));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let mut first = simple_menu();
        first.name = "alpha".to_string();
        let mut second = simple_menu();
        second.name = "beta".to_string();

        let menus = vec![first, second];
        let builder = IncludesBuilder::new(&menus, None, None, None, None);
        let output = render(&builder.build());

        let alpha = output.find("skinshortcuts-alpha").unwrap();
        let beta = output.find("skinshortcuts-beta").unwrap();
        assert!(alpha < beta);
    }
}
