//! Embedded expression forms for template text.
//!
//! A single text node is processed in a fixed order: `$MATH[...]` first,
//! then `$IF[...]`, then `$PROPERTY[...]`. `$INCLUDE[...]` is handled
//! structurally by the template processor, never by string substitution.
//!
//! Evaluation is total: a form that fails to evaluate is left in the text
//! verbatim.

pub mod math;

use regex::Regex;
use std::sync::OnceLock;

use crate::conditions;
use crate::models::PropertyMap;

static PROPERTY_RE: OnceLock<Regex> = OnceLock::new();
static PARENT_RE: OnceLock<Regex> = OnceLock::new();
static PARAM_RE: OnceLock<Regex> = OnceLock::new();

fn property_re() -> &'static Regex {
    PROPERTY_RE.get_or_init(|| Regex::new(r"\$PROPERTY\[([^\]]+)\]").expect("valid pattern"))
}

fn parent_re() -> &'static Regex {
    PARENT_RE.get_or_init(|| Regex::new(r"\$PARENT\[([^\]]+)\]").expect("valid pattern"))
}

fn param_re() -> &'static Regex {
    PARAM_RE.get_or_init(|| Regex::new(r"\$PARAM\[([^\]]+)\]").expect("valid pattern"))
}

/// Run the full substitution order over a text.
pub fn process_text(text: &str, context: &PropertyMap, item_properties: &PropertyMap) -> String {
    let text = substitute_math_joined(text, context, item_properties);
    let text = substitute_if_joined(&text, context, item_properties);
    substitute_properties(&text, context, item_properties)
}

/// Replace every `$PROPERTY[name]` with the context value, falling back to
/// the item property, falling back to the empty string.
pub fn substitute_properties(
    text: &str,
    context: &PropertyMap,
    item_properties: &PropertyMap,
) -> String {
    if !text.contains("$PROPERTY[") {
        return text.to_string();
    }
    property_re()
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            context
                .get(name)
                .or_else(|| item_properties.get(name))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Replace every `$PARENT[name]` with the parent item's property value.
pub fn substitute_parent(text: &str, parent_properties: &PropertyMap) -> String {
    if !text.contains("$PARENT[") {
        return text.to_string();
    }
    parent_re()
        .replace_all(text, |caps: &regex::Captures| {
            parent_properties.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Replace every `$PARAM[name]` with the declared parameter value.
pub fn substitute_params(text: &str, params: &PropertyMap) -> String {
    if !text.contains("$PARAM[") {
        return text.to_string();
    }
    param_re()
        .replace_all(text, |caps: &regex::Captures| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn substitute_math_joined(
    text: &str,
    context: &PropertyMap,
    item_properties: &PropertyMap,
) -> String {
    substitute_form(text, "$MATH[", |body| {
        let env = merged_env(context, item_properties);
        math::evaluate(body, &env).ok()
    })
}

fn substitute_if_joined(
    text: &str,
    context: &PropertyMap,
    item_properties: &PropertyMap,
) -> String {
    substitute_form(text, "$IF[", |body| {
        let env = merged_env(context, item_properties);
        evaluate_if(body, &env)
    })
}

/// Substitute `$MATH[expr]` forms against the given environment.
pub fn substitute_math(text: &str, properties: &PropertyMap) -> String {
    substitute_form(text, "$MATH[", |body| math::evaluate(body, properties).ok())
}

/// Substitute `$IF[...]` forms against the given environment.
pub fn substitute_if(text: &str, properties: &PropertyMap) -> String {
    substitute_form(text, "$IF[", |body| evaluate_if(body, properties))
}

fn merged_env(context: &PropertyMap, item_properties: &PropertyMap) -> PropertyMap {
    let mut env = item_properties.clone();
    for (key, value) in context {
        env.insert(key.clone(), value.clone());
    }
    env
}

/// Scan for `marker` ... matching `]` occurrences, replacing each body via
/// `eval`. `None` keeps the original form verbatim.
fn substitute_form<F>(text: &str, marker: &str, eval: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !text.contains(marker) {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(marker) {
        result.push_str(&rest[..start]);
        let body_start = start + marker.len();

        match find_matching_bracket(&rest[body_start..]) {
            Some(body_len) => {
                let body = &rest[body_start..body_start + body_len];
                match eval(body) {
                    Some(replacement) => result.push_str(&replacement),
                    None => {
                        result.push_str(&rest[start..body_start + body_len + 1]);
                    }
                }
                rest = &rest[body_start + body_len + 1..];
            }
            None => {
                // Unterminated form: keep the remainder untouched.
                result.push_str(&rest[start..]);
                return result;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Byte length of the bracket body, assuming the opening `[` was consumed.
fn find_matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return Some(idx);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Evaluate an `$IF` body: `cond THEN value (ELIF cond THEN value)* (ELSE value)?`.
///
/// Returns `None` for malformed bodies so the caller keeps the original text.
fn evaluate_if(body: &str, properties: &PropertyMap) -> Option<String> {
    let mut rest = body;

    loop {
        let then_pos = find_keyword(rest, "THEN")?;
        let cond = &rest[..then_pos];
        let after = &rest[then_pos + "THEN".len()..];

        let next = find_keyword(after, "ELIF")
            .map(|p| (p, "ELIF"))
            .into_iter()
            .chain(find_keyword(after, "ELSE").map(|p| (p, "ELSE")))
            .min_by_key(|(p, _)| *p);

        let (value, continuation) = match next {
            Some((pos, keyword)) => (&after[..pos], Some((keyword, &after[pos + 4..]))),
            None => (after, None),
        };

        if conditions::evaluate(cond, properties) {
            return Some(value.trim().to_string());
        }

        match continuation {
            Some(("ELIF", remainder)) => {
                rest = remainder;
            }
            Some(("ELSE", remainder)) => {
                return Some(remainder.trim().to_string());
            }
            _ => return Some(String::new()),
        }
    }
}

/// Find a case-sensitive keyword surrounded by whitespace at bracket depth 0.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let kw = keyword.as_bytes();
    let mut depth = 0usize;
    let mut idx = 0usize;

    while idx < bytes.len() {
        match bytes[idx] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            _ => {
                if depth == 0
                    && bytes[idx..].starts_with(kw)
                    && idx > 0
                    && bytes[idx - 1].is_ascii_whitespace()
                {
                    let end = idx + kw.len();
                    if end < bytes.len() && bytes[end].is_ascii_whitespace() {
                        return Some(idx);
                    }
                }
            }
        }
        idx += 1;
    }

    None
}
