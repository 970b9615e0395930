//! Per-iteration property context assembly.
//!
//! The context is built in a fixed order: menu defaults, item properties,
//! built-ins, schema fallbacks, template properties, template vars, presets,
//! preset groups, property groups. From the template-property step onward
//! every write is write-if-absent, so earlier steps always win.

use regex::Regex;
use std::sync::OnceLock;

use crate::conditions;
use crate::config::constants::compile_time::expressions::MAX_EXPRESSION_DEPTH;
use crate::expressions;
use crate::loaders::{apply_suffix_to_condition, apply_suffix_to_from, strip_nosuffix_markers};
use crate::log_debug;
use crate::models::{
    MenuItem, Preset, PresetGroupChild, PropertyGroup, PropertyMap, PropertySchema, Template,
    TemplateOutput, TemplateProperty, TemplateSchema, TemplateVar,
};

static EXP_RE: OnceLock<Regex> = OnceLock::new();

fn exp_re() -> &'static Regex {
    EXP_RE.get_or_init(|| Regex::new(r"\$EXP\[([^\]]+)\]").expect("valid pattern"))
}

/// Inline $EXP[name] references from the schema's expression table.
/// `nosuffix` expressions are wrapped in {NOSUFFIX:...} markers which the
/// suffix transform preserves and evaluation strips.
pub(super) fn expand_expressions(schema: &TemplateSchema, condition: &str) -> String {
    expand_expressions_depth(schema, condition, 0)
}

fn expand_expressions_depth(schema: &TemplateSchema, condition: &str, depth: usize) -> String {
    if !condition.contains("$EXP[") {
        return condition.to_string();
    }
    if depth > MAX_EXPRESSION_DEPTH {
        log_debug!("$EXP expansion exceeded depth limit", "condition" => condition);
        return condition.to_string();
    }

    exp_re()
        .replace_all(condition, |caps: &regex::Captures| {
            match schema.get_expression(&caps[1]) {
                Some(expression) => {
                    let expanded =
                        expand_expressions_depth(schema, &expression.value, depth + 1);
                    if expression.nosuffix {
                        format!("{{NOSUFFIX:{}}}", expanded)
                    } else {
                        expanded
                    }
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Evaluate a condition against the item properties overlaid with the
/// current context. $EXP references are expanded first.
pub(super) fn eval_condition(
    schema: &TemplateSchema,
    condition: &str,
    item: &MenuItem,
    context: &PropertyMap,
) -> bool {
    if condition.is_empty() {
        return true;
    }
    let condition = expand_expressions(schema, condition);
    let condition = strip_nosuffix_markers(&condition);

    let mut properties = item.properties.clone();
    for (key, value) in context {
        properties.insert(key.clone(), value.clone());
    }

    conditions::evaluate(&condition, &properties)
}

/// Expand, suffix-transform, and evaluate a reference-level condition.
fn eval_suffixed_condition(
    schema: &TemplateSchema,
    condition: &str,
    suffix: &str,
    item: &MenuItem,
    context: &PropertyMap,
) -> bool {
    if condition.is_empty() {
        return true;
    }
    let condition = expand_expressions(schema, condition);
    let condition = apply_suffix_to_condition(&condition, suffix);
    let condition = strip_nosuffix_markers(&condition);

    let mut properties = item.properties.clone();
    for (key, value) in context {
        properties.insert(key.clone(), value.clone());
    }

    conditions::evaluate(&condition, &properties)
}

/// Check a template's ANDed iteration conditions for one item.
pub(super) fn check_conditions(
    schema: &TemplateSchema,
    conditions_list: &[String],
    item: &MenuItem,
    suffix: &str,
) -> bool {
    let empty = PropertyMap::new();
    conditions_list
        .iter()
        .all(|condition| eval_suffixed_condition(schema, condition, suffix, item, &empty))
}

/// An explicit reference suffix overrides the output's suffix.
pub(super) fn combine_suffixes<'a>(base_suffix: &'a str, ref_suffix: &'a str) -> &'a str {
    if ref_suffix.is_empty() {
        base_suffix
    } else {
        ref_suffix
    }
}

/// Build the full property context for one (template, output, item) triple.
pub(super) fn build_context(
    schema: &TemplateSchema,
    property_schema: Option<&PropertySchema>,
    template: &Template,
    output: &TemplateOutput,
    item: &MenuItem,
    index: usize,
    menu_name: &str,
    menu_defaults: &PropertyMap,
) -> PropertyMap {
    let mut context = menu_defaults.clone();
    for (key, value) in &item.properties {
        context.insert(key.clone(), value.clone());
    }

    context.insert("index".to_string(), index.to_string());
    context.insert("name".to_string(), item.name.clone());
    context.insert("menu".to_string(), menu_name.to_string());
    context.insert("idprefix".to_string(), output.id_prefix.clone());
    let id = if output.id_prefix.is_empty() {
        index.to_string()
    } else {
        format!("{}{}", output.id_prefix, index)
    };
    context.insert("id".to_string(), id);
    context.insert("suffix".to_string(), output.suffix.clone());

    if let Some(property_schema) = property_schema {
        apply_fallbacks(schema, property_schema, item, &mut context);
    }

    for property in &template.properties {
        if context.contains_key(&property.name) {
            continue;
        }
        if let Some(value) = resolve_property(schema, property, item, &context, &output.suffix) {
            context.insert(property.name.clone(), value);
        }
    }

    for var in &template.vars {
        if context.contains_key(&var.name) {
            continue;
        }
        if let Some(value) = resolve_var(schema, var, item, &context, &output.suffix) {
            context.insert(var.name.clone(), value);
        }
    }

    for reference in &template.preset_refs {
        let suffix = combine_suffixes(&output.suffix, &reference.suffix);
        if !eval_suffixed_condition(schema, &reference.condition, suffix, item, &context) {
            continue;
        }
        apply_preset(schema, &reference.name, suffix, item, &mut context);
    }

    for reference in &template.preset_group_refs {
        let suffix = combine_suffixes(&output.suffix, &reference.suffix);
        if !eval_suffixed_condition(schema, &reference.condition, suffix, item, &context) {
            continue;
        }
        apply_preset_group(schema, &reference.name, suffix, item, &mut context);
    }

    for reference in &template.property_groups {
        let suffix = combine_suffixes(&output.suffix, &reference.suffix);
        if !eval_suffixed_condition(schema, &reference.condition, suffix, item, &context) {
            continue;
        }
        if let Some(group) = schema.get_property_group(&reference.name) {
            apply_property_group(schema, group, suffix, item, &mut context);
        }
    }

    context
}

/// Apply schema fallbacks for properties with no value yet, once per widget
/// slot suffix observed among the item's property names.
fn apply_fallbacks(
    schema: &TemplateSchema,
    property_schema: &PropertySchema,
    item: &MenuItem,
    context: &mut PropertyMap,
) {
    let mut suffixes_in_use: Vec<String> = vec![String::new()];
    for property_name in item.properties.keys() {
        if let Some((_, digits)) = property_name.rsplit_once('.') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let suffix = format!(".{}", digits);
                if !suffixes_in_use.contains(&suffix) {
                    suffixes_in_use.push(suffix);
                }
            }
        }
    }

    for (property_name, fallback) in &property_schema.fallbacks {
        for suffix in &suffixes_in_use {
            let suffixed_name = format!("{}{}", property_name, suffix);
            if context.contains_key(&suffixed_name) || item.properties.contains_key(&suffixed_name)
            {
                continue;
            }

            for rule in &fallback.rules {
                if rule.condition.is_empty() {
                    context.insert(suffixed_name.clone(), rule.value.clone());
                    break;
                }
                let condition = apply_suffix_to_condition(&rule.condition, suffix);
                if eval_condition(schema, &condition, item, context) {
                    context.insert(suffixed_name.clone(), rule.value.clone());
                    break;
                }
            }
        }
    }
}

/// Resolve one template property. Returns None when its condition fails.
pub(super) fn resolve_property(
    schema: &TemplateSchema,
    property: &TemplateProperty,
    item: &MenuItem,
    context: &PropertyMap,
    suffix: &str,
) -> Option<String> {
    if !eval_suffixed_condition(schema, &property.condition, suffix, item, context) {
        return None;
    }

    if !property.from.is_empty() {
        return Some(resolve_from_source(
            schema,
            &property.from,
            item,
            context,
            suffix,
        ));
    }

    let mut value = property.value.clone();
    if value.contains("$PROPERTY[") {
        value = expressions::substitute_properties(&value, context, &item.properties);
    }
    Some(value)
}

/// Resolve a var: the first value whose condition matches wins; a pair with
/// no condition is the default.
pub(super) fn resolve_var(
    schema: &TemplateSchema,
    var: &TemplateVar,
    item: &MenuItem,
    context: &PropertyMap,
    suffix: &str,
) -> Option<String> {
    for value in &var.values {
        if value.condition.is_empty() {
            return Some(value.value.clone());
        }
        if eval_suffixed_condition(schema, &value.condition, suffix, item, context) {
            return Some(value.value.clone());
        }
    }
    None
}

/// Resolve a `from` source, first hit wins:
/// preset attribute lookup, built-in, context, item property, empty.
pub(super) fn resolve_from_source(
    schema: &TemplateSchema,
    source: &str,
    item: &MenuItem,
    context: &PropertyMap,
    suffix: &str,
) -> String {
    if let Some((preset_name, attribute)) = parse_preset_attribute(source) {
        if let Some(preset) = schema.get_preset(preset_name) {
            if let Some(values) = matching_preset_values(schema, preset, suffix, item, context) {
                return values.get(attribute).cloned().unwrap_or_default();
            }
            return String::new();
        }
    }

    let source = apply_suffix_to_from(source, suffix);

    if matches!(source.as_str(), "index" | "name" | "menu" | "id" | "idprefix") {
        return context.get(&source).cloned().unwrap_or_default();
    }
    if let Some(value) = context.get(&source) {
        return value.clone();
    }
    item.properties.get(&source).cloned().unwrap_or_default()
}

/// Parse `preset[attr]` or `preset.attr` reference syntax.
fn parse_preset_attribute(source: &str) -> Option<(&str, &str)> {
    if let Some(open) = source.find('[') {
        if let Some(stripped) = source[open + 1..].strip_suffix(']') {
            return Some((&source[..open], stripped));
        }
        return None;
    }
    source.split_once('.')
}

/// First preset row whose suffix-transformed condition matches.
fn matching_preset_values<'a>(
    schema: &TemplateSchema,
    preset: &'a Preset,
    suffix: &str,
    item: &MenuItem,
    context: &PropertyMap,
) -> Option<&'a PropertyMap> {
    for row in &preset.rows {
        if row.condition.is_empty() {
            return Some(&row.values);
        }
        if eval_suffixed_condition(schema, &row.condition, suffix, item, context) {
            return Some(&row.values);
        }
    }
    None
}

/// Apply a preset: the first matching row writes every attribute,
/// write-if-absent.
pub(super) fn apply_preset(
    schema: &TemplateSchema,
    preset_name: &str,
    suffix: &str,
    item: &MenuItem,
    context: &mut PropertyMap,
) {
    let Some(preset) = schema.get_preset(preset_name) else {
        log_debug!("Referenced preset does not exist", "preset" => preset_name);
        return;
    };

    if let Some(values) = matching_preset_values(schema, preset, suffix, item, context) {
        let values = values.clone();
        for (key, value) in values {
            if !context.contains_key(&key) {
                context.insert(key, value);
            }
        }
    }
}

/// Apply a presetGroup: children in document order, first match wins.
pub(super) fn apply_preset_group(
    schema: &TemplateSchema,
    group_name: &str,
    suffix: &str,
    item: &MenuItem,
    context: &mut PropertyMap,
) {
    let Some(group) = schema.get_preset_group(group_name) else {
        log_debug!("Referenced presetGroup does not exist", "group" => group_name);
        return;
    };

    for child in &group.children {
        match child {
            PresetGroupChild::Preset { name, condition } => {
                if !eval_suffixed_condition(schema, condition, suffix, item, context) {
                    continue;
                }
                let Some(preset) = schema.get_preset(name) else {
                    continue;
                };
                if let Some(values) =
                    matching_preset_values(schema, preset, suffix, item, context)
                {
                    let values = values.clone();
                    for (key, value) in values {
                        if !context.contains_key(&key) {
                            context.insert(key, value);
                        }
                    }
                    return;
                }
            }
            PresetGroupChild::Values { condition, values } => {
                if !eval_suffixed_condition(schema, condition, suffix, item, context) {
                    continue;
                }
                for (key, value) in values {
                    if !context.contains_key(key) {
                        context.insert(key.clone(), value.clone());
                    }
                }
                return;
            }
        }
    }
}

/// Apply a property group's properties and vars, suffix-transformed,
/// write-if-absent.
pub(super) fn apply_property_group(
    schema: &TemplateSchema,
    group: &PropertyGroup,
    suffix: &str,
    item: &MenuItem,
    context: &mut PropertyMap,
) {
    for property in &group.properties {
        if context.contains_key(&property.name) {
            continue;
        }
        if let Some(value) = resolve_property(schema, property, item, context, suffix) {
            context.insert(property.name.clone(), value);
        }
    }

    for var in &group.vars {
        if context.contains_key(&var.name) {
            continue;
        }
        if let Some(value) = resolve_var(schema, var, item, context, suffix) {
            context.insert(var.name.clone(), value);
        }
    }
}
