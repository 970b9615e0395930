//! Condition evaluation over property maps.
//!
//! Evaluates property conditions using a small expression language:
//! - Equality: `propertyName=value` (empty value tests for unset)
//! - Contains: `propertyName~value`
//! - Membership: `propertyName IN value1,value2`
//! - Emptiness: `propertyName EMPTY`
//! - AND: `condition1 + condition2`
//! - OR: `condition1 | condition2`
//! - NOT: `!condition` or `![grouped condition]`
//! - Grouping: `[condition1 | condition2]`
//! - Compact OR: `propertyName=value1 | value2 | value3`
//!
//! Keyword spellings `AND`, `OR`, `NOT`, `EQUALS`, `CONTAINS` are normalized
//! to the symbol forms before parsing.
//!
//! Negation applies to the adjacent condition only: `!a + b` is `(!a) + b`.
//! Group negation requires brackets: `![a | b]`.
//!
//! The evaluator is total. Malformed input evaluates to false; missing
//! properties read as empty strings.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::constants::compile_time::conditions::MAX_CONDITION_DEPTH;
use crate::models::PropertyMap;

static CONDITION_MATCH_RE: OnceLock<Regex> = OnceLock::new();
static KEYWORD_NOT_RE: OnceLock<Regex> = OnceLock::new();
static KEYWORD_AND_RE: OnceLock<Regex> = OnceLock::new();
static KEYWORD_OR_RE: OnceLock<Regex> = OnceLock::new();
static KEYWORD_EQUALS_RE: OnceLock<Regex> = OnceLock::new();
static KEYWORD_CONTAINS_RE: OnceLock<Regex> = OnceLock::new();
static IN_SPLIT_RE: OnceLock<Regex> = OnceLock::new();
static EMPTY_RE: OnceLock<Regex> = OnceLock::new();

fn condition_match_re() -> &'static Regex {
    CONDITION_MATCH_RE.get_or_init(|| {
        Regex::new(r"^(!?)([a-zA-Z_][a-zA-Z0-9_\.]*)(=|~)(.*)$").expect("valid pattern")
    })
}

/// Evaluate a condition against property values.
///
/// Empty or whitespace-only conditions return true.
pub fn evaluate(condition: &str, properties: &PropertyMap) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    let condition = normalize_keywords(condition);
    let condition = if condition.contains('|') {
        expand_compact_or(&condition)
    } else {
        condition
    };

    evaluate_expanded(&condition, properties, 0)
}

/// Rewrite keyword operators to their symbol forms with word-boundary-aware
/// substitution, so keywords inside property values survive.
fn normalize_keywords(condition: &str) -> String {
    if !condition.contains("AND")
        && !condition.contains("OR")
        && !condition.contains("NOT")
        && !condition.contains("EQUALS")
        && !condition.contains("CONTAINS")
    {
        return condition.to_string();
    }

    let not_re =
        KEYWORD_NOT_RE.get_or_init(|| Regex::new(r"\bNOT\s+").expect("valid pattern"));
    let and_re =
        KEYWORD_AND_RE.get_or_init(|| Regex::new(r"\s+AND\s+").expect("valid pattern"));
    let or_re = KEYWORD_OR_RE.get_or_init(|| Regex::new(r"\s+OR\s+").expect("valid pattern"));
    let equals_re = KEYWORD_EQUALS_RE
        .get_or_init(|| Regex::new(r"\s*\bEQUALS\b\s*").expect("valid pattern"));
    let contains_re = KEYWORD_CONTAINS_RE
        .get_or_init(|| Regex::new(r"\s*\bCONTAINS\b\s*").expect("valid pattern"));

    let result = equals_re.replace_all(condition, "=");
    let result = contains_re.replace_all(&result, "~");
    let result = and_re.replace_all(&result, " + ");
    let result = or_re.replace_all(&result, " | ");
    let result = not_re.replace_all(&result, "!");
    result.into_owned()
}

/// Expand compact OR syntax to full form.
///
/// `widgetType=movies | episodes | tvshows` becomes
/// `widgetType=movies | widgetType=episodes | widgetType=tvshows`.
/// The property name cascades from the most recent full comparison.
pub fn expand_compact_or(condition: &str) -> String {
    if condition.is_empty() {
        return String::new();
    }

    let mut result_parts: Vec<String> = Vec::new();

    for and_part in split_preserving_brackets(condition, '+') {
        let mut and_part = and_part.trim();
        if and_part.is_empty() {
            continue;
        }

        let is_negated = and_part.starts_with('!');
        if is_negated {
            and_part = and_part[1..].trim_start();
        }

        if and_part.starts_with('[') && and_part.ends_with(']') {
            let inner = and_part[1..and_part.len() - 1].trim();
            let expanded = expand_or_segment(inner);
            if is_negated {
                result_parts.push(format!("![{}]", expanded));
            } else {
                result_parts.push(format!("[{}]", expanded));
            }
        } else {
            let expanded = expand_or_segment(and_part);
            if is_negated {
                result_parts.push(format!("!{}", expanded));
            } else {
                result_parts.push(expanded);
            }
        }
    }

    result_parts.join(" + ")
}

/// Split text by a delimiter, preserving content inside brackets.
fn split_preserving_brackets(text: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in text.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth -= 1;
                current.push(ch);
            }
            c if c == delimiter && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Expand a single OR segment.
fn expand_or_segment(segment: &str) -> String {
    let parts = split_preserving_brackets(segment, '|');
    if parts.len() <= 1 {
        return segment.to_string();
    }

    let mut result_parts: Vec<String> = Vec::new();
    let mut current_property = String::new();
    let mut current_operator = String::new();

    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some(caps) = condition_match_re().captures(part) {
            let negation = &caps[1];
            current_property = caps[2].to_string();
            current_operator = caps[3].to_string();
            let value = &caps[4];
            result_parts.push(format!(
                "{}{}{}{}",
                negation, current_property, current_operator, value
            ));
        } else if !current_property.is_empty() {
            result_parts.push(format!("{}{}{}", current_property, current_operator, part));
        } else {
            result_parts.push(part.to_string());
        }
    }

    result_parts.join(" | ")
}

/// Check if text is wrapped in one matching bracket pair.
fn is_wrapped_in_brackets(text: &str) -> bool {
    if !text.starts_with('[') || !text.ends_with(']') {
        return false;
    }
    let mut depth: i32 = 0;
    let char_count = text.chars().count();
    for (i, ch) in text.chars().enumerate() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 && i < char_count - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn strip_brackets(text: &str) -> &str {
    &text[1..text.len() - 1]
}

fn evaluate_expanded(condition: &str, properties: &PropertyMap, depth: usize) -> bool {
    if depth > MAX_CONDITION_DEPTH {
        crate::log_warning!("Condition nesting exceeded depth limit",
            "condition" => condition
        );
        return false;
    }

    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    if is_wrapped_in_brackets(condition) {
        return evaluate_expanded(strip_brackets(condition), properties, depth + 1);
    }

    // OR binds loosest, so it splits first; AND groups bind tighter.
    // Splitting happens before negation: !a + b is (!a) + b, not !(a + b).
    let or_parts = split_preserving_brackets(condition, '|');
    if or_parts.len() > 1 {
        return or_parts
            .iter()
            .any(|part| evaluate_expanded(part.trim(), properties, depth + 1));
    }

    let and_parts = split_preserving_brackets(condition, '+');
    if and_parts.len() > 1 {
        return and_parts
            .iter()
            .all(|part| evaluate_expanded(part.trim(), properties, depth + 1));
    }

    if let Some(inner) = condition.strip_prefix('!') {
        let inner = inner.trim();
        if is_wrapped_in_brackets(inner) {
            return !evaluate_expanded(strip_brackets(inner), properties, depth + 1);
        }
        return !evaluate_single(inner, properties, depth);
    }

    evaluate_single(condition, properties, depth)
}

/// Evaluate a single comparison or property test.
fn evaluate_single(condition: &str, properties: &PropertyMap, depth: usize) -> bool {
    let mut condition = condition.trim();

    let mut negated = false;
    if let Some(inner) = condition.strip_prefix('!') {
        negated = true;
        condition = inner.trim();
    }

    if is_wrapped_in_brackets(condition) {
        let result = evaluate_expanded(strip_brackets(condition), properties, depth + 1);
        return result != negated;
    }

    if let Some((prop_name, value)) = condition.split_once('=') {
        let actual = lookup(properties, prop_name.trim());
        let result = actual == value.trim();
        return result != negated;
    }

    if let Some((prop_name, value)) = condition.split_once('~') {
        let actual = lookup(properties, prop_name.trim());
        let result = actual.contains(value.trim());
        return result != negated;
    }

    let in_re = IN_SPLIT_RE
        .get_or_init(|| Regex::new(r"^(\S+)\s+IN\s+(.*)$").expect("valid pattern"));
    if let Some(caps) = in_re.captures(condition) {
        let actual = lookup(properties, caps[1].trim());
        let result = caps[2].split(',').any(|v| actual == v.trim());
        return result != negated;
    }

    let empty_re =
        EMPTY_RE.get_or_init(|| Regex::new(r"^(\S+)\s+EMPTY$").expect("valid pattern"));
    if let Some(caps) = empty_re.captures(condition) {
        let result = lookup(properties, caps[1].trim()).is_empty();
        return result != negated;
    }

    // Property name only: truthy if non-empty
    let result = !lookup(properties, condition).is_empty();
    result != negated
}

fn lookup<'a>(properties: &'a PropertyMap, name: &str) -> &'a str {
    properties.get(name).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_condition_is_true() {
        let p = props(&[]);
        assert!(evaluate("", &p));
        assert!(evaluate("   ", &p));
    }

    #[test]
    fn test_equality() {
        let p = props(&[("widgetType", "movies")]);
        assert!(evaluate("widgetType=movies", &p));
        assert!(!evaluate("widgetType=tvshows", &p));
        assert!(!evaluate("other=movies", &p));
    }

    #[test]
    fn test_empty_value_equality_matches_unset() {
        let p = props(&[("set", "x"), ("blank", "")]);
        assert!(evaluate("missing=", &p));
        assert!(evaluate("blank=", &p));
        assert!(!evaluate("set=", &p));
    }

    #[test]
    fn test_contains() {
        let p = props(&[("widgetPath", "videodb://movies/titles/")]);
        assert!(evaluate("widgetPath~movies", &p));
        assert!(!evaluate("widgetPath~music", &p));
    }

    #[test]
    fn test_truthiness() {
        let p = props(&[("widget", "recent"), ("empty", "")]);
        assert!(evaluate("widget", &p));
        assert!(!evaluate("empty", &p));
        assert!(!evaluate("missing", &p));
        assert!(evaluate("!empty", &p));
        assert!(evaluate("!missing", &p));
    }

    #[test]
    fn test_and_or_precedence() {
        let p = props(&[("a", "1"), ("b", "1")]);
        assert!(evaluate("a + b", &p));
        assert!(!evaluate("a + c", &p));
        assert!(evaluate("a | c", &p));
        // AND binds tighter than OR: (a AND c) OR b.
        assert!(evaluate("a + c | b", &p));
        assert!(!evaluate("c + [a | b]", &p));
        assert!(evaluate("a + [c | b]", &p));
    }

    #[test]
    fn test_negation_binds_to_single_term() {
        let p = props(&[("a", ""), ("b", "1")]);
        // (!a) AND b
        assert!(evaluate("!a + b", &p));
        // !(a OR b)
        assert!(!evaluate("![a | b]", &p));
    }

    #[test]
    fn test_compact_or() {
        let p = props(&[("widgetType", "episodes")]);
        assert!(evaluate("widgetType=movies | tvshows | episodes", &p));
        let p2 = props(&[("widgetType", "music")]);
        assert!(!evaluate("widgetType=movies | tvshows | episodes", &p2));
    }

    #[test]
    fn test_compact_or_cascade_resets() {
        // prop=a | other=b | c  ->  prop=a | other=b | other=c
        let p = props(&[("other", "c")]);
        assert!(evaluate("prop=a | other=b | c", &p));
        let p2 = props(&[("prop", "c")]);
        assert!(!evaluate("prop=a | other=b | c", &p2));
    }

    #[test]
    fn test_expand_compact_or_text() {
        assert_eq!(
            expand_compact_or("widgetType=movies | episodes"),
            "widgetType=movies | widgetType=episodes"
        );
        assert_eq!(
            expand_compact_or("![widgetType=movies | episodes]"),
            "![widgetType=movies | widgetType=episodes]"
        );
    }

    #[test]
    fn test_compact_or_equivalence() {
        // Expansion never changes the result where it is defined.
        let cases = [
            "widgetType=movies | episodes",
            "a=1 | 2 | 3 + b=x",
            "[a=1 | 2] + b~y",
        ];
        let p = props(&[("widgetType", "episodes"), ("a", "2"), ("b", "xy")]);
        for case in cases {
            assert_eq!(
                evaluate(case, &p),
                evaluate(&expand_compact_or(case), &p),
                "diverged for {case}"
            );
        }
    }

    #[test]
    fn test_in_operator() {
        let p = props(&[("prop", "y")]);
        assert!(evaluate("prop IN x,y,z", &p));
        assert!(!evaluate("prop IN x,z", &p));
        assert!(evaluate("!prop IN x,z", &p));
    }

    #[test]
    fn test_empty_operator() {
        let p = props(&[("set", "v")]);
        assert!(evaluate("missing EMPTY", &p));
        assert!(!evaluate("set EMPTY", &p));
    }

    #[test]
    fn test_keyword_forms() {
        let p = props(&[("a", "1"), ("b", "1"), ("kind", "widget list")]);
        assert!(evaluate("a AND b", &p));
        assert!(evaluate("a OR c", &p));
        assert!(evaluate("NOT c", &p));
        assert!(evaluate("kind EQUALS widget list", &p));
        assert!(evaluate("kind CONTAINS list", &p));
    }

    #[test]
    fn test_nested_groups() {
        let p = props(&[("a", "1"), ("c", "1")]);
        assert!(evaluate("[a + [b | c]]", &p));
        assert!(!evaluate("[a + [b | d]]", &p));
    }

    #[test]
    fn test_malformed_is_false_not_panic() {
        let p = props(&[]);
        assert!(!evaluate("[unclosed", &p));
        assert!(!evaluate("]", &p));
    }

    #[test]
    fn test_spec_scenarios() {
        let p = props(&[("widgetType", "episodes")]);
        assert!(evaluate("widgetType=movies | tvshows | episodes", &p));

        let p = props(&[("a", ""), ("b", "1")]);
        assert!(evaluate("!a + b", &p));
        assert!(!evaluate("![a | b]", &p));

        let p = props(&[("prop", "y")]);
        assert!(evaluate("prop IN x,y,z", &p));
    }
}
