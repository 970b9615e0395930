//! View-locking expression builder.
//!
//! Emits host boolean expressions gating which view control is active per
//! content type, honoring the user's view selections and plugin-specific
//! overrides:
//! - `{prefix}{ViewId}` - combined visibility per view
//! - `{prefix}{ViewId}_Include` - whether the view is used at all
//! - `{prefix}{Content}_HasPluginOverride` - only when overrides exist
//! - `{prefix}{Content}_IsGenericPlugin` - only when overrides exist

use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;
use xmltree::{Element, XMLNode};

use crate::models::{ViewConfig, ViewContent};
use crate::userdata::UserData;

static SANITIZE_RE: OnceLock<Regex> = OnceLock::new();

fn sanitize_re() -> &'static Regex {
    SANITIZE_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_]").expect("valid pattern"))
}

pub struct ViewExpressionBuilder<'a> {
    config: &'a ViewConfig,
    userdata: &'a UserData,
    view_conditions: IndexMap<String, Vec<String>>,
}

impl<'a> ViewExpressionBuilder<'a> {
    pub fn new(config: &'a ViewConfig, userdata: &'a UserData) -> Self {
        Self {
            config,
            userdata,
            view_conditions: IndexMap::new(),
        }
    }

    /// Build all view expressions.
    pub fn build(mut self) -> Vec<Element> {
        if self.config.content_rules.is_empty() {
            return Vec::new();
        }

        self.view_conditions = self
            .config
            .views
            .iter()
            .map(|view| (view.id.clone(), Vec::new()))
            .collect();

        let mut expressions: Vec<Element> = Vec::new();

        for content in &self.config.content_rules {
            let plugin_overrides = self.effective_plugin_overrides(content);
            if !plugin_overrides.is_empty() {
                let content_name = sanitize_name(&content.name);
                expressions.extend(self.build_plugin_helpers(&content_name, &plugin_overrides));
            }

            self.collect_view_conditions(content, &plugin_overrides);
        }

        for view in &self.config.views {
            expressions.push(self.build_view_expression(&view.id));
        }

        for view in &self.config.views {
            expressions.push(self.build_include_expression(&view.id));
        }

        expressions
    }

    fn build_plugin_helpers(
        &self,
        content_name: &str,
        overrides: &IndexMap<String, String>,
    ) -> Vec<Element> {
        let mut expressions = Vec::new();

        let mut plugin_ids: Vec<&String> = overrides.keys().collect();
        plugin_ids.sort();

        let conditions: Vec<String> = plugin_ids
            .iter()
            .map(|plugin_id| format!("String.IsEqual(Container.PluginName,{})", plugin_id))
            .collect();
        expressions.push(expression_element(
            &format!("{}{}_HasPluginOverride", self.config.prefix, content_name),
            &conditions.join(" | "),
        ));

        expressions.push(expression_element(
            &format!("{}{}_IsGenericPlugin", self.config.prefix, content_name),
            &format!(
                "!String.IsEmpty(Container.PluginName) + !$EXP[{}{}_HasPluginOverride]",
                self.config.prefix, content_name
            ),
        ));

        expressions
    }

    /// Collect the visibility terms each view gains from this content rule.
    fn collect_view_conditions(
        &mut self,
        content: &ViewContent,
        plugin_overrides: &IndexMap<String, String>,
    ) {
        let content_name = sanitize_name(&content.name);
        let visible = &content.visible;

        let library_view = self.effective_library_view(content).to_string();
        let generic_plugin_view = self.effective_generic_plugin_view(content).to_string();
        let same_view = library_view == generic_plugin_view && plugin_overrides.is_empty();

        if self.view_conditions.contains_key(&library_view) {
            let term = if same_view {
                format!("[{}]", visible)
            } else {
                format!("[{} + String.IsEmpty(Container.PluginName)]", visible)
            };
            if let Some(terms) = self.view_conditions.get_mut(&library_view) {
                terms.push(term);
            }
        }

        if self.view_conditions.contains_key(&generic_plugin_view) && !same_view {
            let term = if plugin_overrides.is_empty() {
                format!("[{} + !String.IsEmpty(Container.PluginName)]", visible)
            } else {
                format!(
                    "[{} + $EXP[{}{}_IsGenericPlugin]]",
                    visible, self.config.prefix, content_name
                )
            };
            if let Some(terms) = self.view_conditions.get_mut(&generic_plugin_view) {
                terms.push(term);
            }
        }

        for (plugin_id, view_id) in plugin_overrides {
            if let Some(terms) = self.view_conditions.get_mut(view_id) {
                terms.push(format!(
                    "[{} + String.IsEqual(Container.PluginName,{})]",
                    visible, plugin_id
                ));
            }
        }
    }

    fn build_view_expression(&self, view_id: &str) -> Element {
        let terms = self
            .view_conditions
            .get(view_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let value = if terms.is_empty() {
            "False".to_string()
        } else {
            terms.join(" | ")
        };
        expression_element(&format!("{}{}", self.config.prefix, view_id), &value)
    }

    fn build_include_expression(&self, view_id: &str) -> Element {
        let used = self
            .view_conditions
            .get(view_id)
            .map(|terms| !terms.is_empty())
            .unwrap_or(false);
        expression_element(
            &format!("{}{}_Include", self.config.prefix, view_id),
            if used { "True" } else { "False" },
        )
    }

    /// Effective library view: the user's valid selection or the library
    /// default.
    fn effective_library_view<'b>(&self, content: &'b ViewContent) -> &'b str where 'a: 'b {
        if let Some(user_view) = self.userdata.get_view("library", &content.name) {
            if content.views.iter().any(|v| v == user_view) {
                return user_view;
            }
        }
        &content.library_default
    }

    /// Effective generic-plugin view: user selection, plugin default, then
    /// library default.
    fn effective_generic_plugin_view<'b>(&self, content: &'b ViewContent) -> &'b str where 'a: 'b {
        if let Some(user_view) = self.userdata.get_view("plugins", &content.name) {
            if content.views.iter().any(|v| v == user_view) {
                return user_view;
            }
        }
        if !content.plugin_default.is_empty() {
            return &content.plugin_default;
        }
        &content.library_default
    }

    /// Plugin-specific overrides filtered to this content's valid views.
    fn effective_plugin_overrides(&self, content: &ViewContent) -> IndexMap<String, String> {
        self.userdata
            .get_plugin_overrides(&content.name)
            .into_iter()
            .filter(|(_, view_id)| content.views.iter().any(|v| v == view_id))
            .collect()
    }
}

fn expression_element(name: &str, value: &str) -> Element {
    let mut element = Element::new("expression");
    element.attributes.insert("name".to_string(), name.to_string());
    element.children.push(XMLNode::Text(value.to_string()));
    element
}

/// Sanitize a content name for use in expression names.
fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let sanitized = sanitize_re().replace_all(name, "_").into_owned();
    let mut chars = sanitized.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => sanitized,
    }
}
