//! Shared loader functionality: parse helpers over roxmltree nodes, the
//! suffix transformer, and conversion of control payloads into mutable
//! XML trees.

use regex::Regex;
use roxmltree::{Document, Node};
use std::sync::OnceLock;
use xmltree::{Element, XMLNode};

/// Identifiers the suffix transformer never rewrites.
pub const NO_SUFFIX_PROPERTIES: [&str; 7] =
    ["name", "default", "menu", "index", "id", "idprefix", "suffix"];

static SUFFIX_PROPERTY_RE: OnceLock<Regex> = OnceLock::new();
static NOSUFFIX_MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn suffix_property_re() -> &'static Regex {
    SUFFIX_PROPERTY_RE
        .get_or_init(|| Regex::new(r"([a-zA-Z_][a-zA-Z0-9_\.]*)([=~])").expect("valid pattern"))
}

fn nosuffix_marker_re() -> &'static Regex {
    NOSUFFIX_MARKER_RE.get_or_init(|| Regex::new(r"\{NOSUFFIX:([^}]+)\}").expect("valid pattern"))
}

fn is_reserved(name: &str) -> bool {
    NO_SUFFIX_PROPERTIES.contains(&name)
}

/// Append a suffix to property identifiers preceding `=` or `~` inside a
/// condition. Values after the operator are preserved, as is anything inside
/// `{NOSUFFIX:...}` markers.
pub fn apply_suffix_to_condition(condition: &str, suffix: &str) -> String {
    if suffix.is_empty() || condition.is_empty() {
        return condition.to_string();
    }

    // Protect nosuffix spans behind placeholders before rewriting.
    let mut preserved: Vec<String> = Vec::new();
    let protected = nosuffix_marker_re()
        .replace_all(condition, |caps: &regex::Captures| {
            preserved.push(caps[1].to_string());
            format!("__NOSUFFIX_{}__", preserved.len() - 1)
        })
        .into_owned();

    let transformed = suffix_property_re()
        .replace_all(&protected, |caps: &regex::Captures| {
            let name = &caps[1];
            let operator = &caps[2];
            if is_reserved(name) || name.starts_with("__NOSUFFIX_") {
                format!("{}{}", name, operator)
            } else {
                format!("{}{}{}", name, suffix, operator)
            }
        })
        .into_owned();

    let mut result = transformed;
    for (i, content) in preserved.iter().enumerate() {
        result = result.replace(&format!("__NOSUFFIX_{}__", i), content);
    }
    result
}

/// Strip `{NOSUFFIX:...}` markers, keeping only the content.
pub fn strip_nosuffix_markers(condition: &str) -> String {
    if !condition.contains("{NOSUFFIX:") {
        return condition.to_string();
    }
    nosuffix_marker_re()
        .replace_all(condition, |caps: &regex::Captures| caps[1].to_string())
        .into_owned()
}

/// Apply a suffix to a `from` attribute value.
///
/// Reserved identifiers are unchanged; `preset[attr]` syntax gets the suffix
/// before the bracket; anything else gets it appended.
pub fn apply_suffix_to_from(from_value: &str, suffix: &str) -> String {
    if suffix.is_empty() || from_value.is_empty() {
        return from_value.to_string();
    }

    if is_reserved(from_value) {
        return from_value.to_string();
    }

    if let Some(bracket) = from_value.find('[') {
        return format!(
            "{}{}{}",
            &from_value[..bracket],
            suffix,
            &from_value[bracket..]
        );
    }

    format!("{}{}", from_value, suffix)
}

// ============================================================================
// NODE HELPERS
// ============================================================================

/// Get a trimmed attribute value, empty when absent.
pub fn attr(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or("").trim().to_string()
}

/// Get a trimmed attribute value with a default.
pub fn attr_or(node: Node, name: &str, default: &str) -> String {
    let value = attr(node, name);
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Get a boolean attribute: `true` (any case) is true.
pub fn attr_bool(node: Node, name: &str, default: bool) -> bool {
    match node.attribute(name) {
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}

/// Get the trimmed text of the node itself.
pub fn text(node: Node) -> String {
    node.text().unwrap_or("").trim().to_string()
}

/// Find the first child element with the given tag name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Get trimmed text content of a named child element.
pub fn child_text(node: Node, name: &str) -> String {
    child(node, name).map(text).unwrap_or_default()
}

/// Get integer content of a named child element.
pub fn child_int(node: Node, name: &str) -> Option<i64> {
    let value = child_text(node, name);
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

/// Iterate child elements with the given tag name.
pub fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// Iterate all child elements.
pub fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(|c| c.is_element())
}

/// 1-based source line of a node.
pub fn node_line(doc: &Document, node: Node) -> u32 {
    doc.text_pos_at(node.range().start).row
}

// ============================================================================
// CONTROL PAYLOAD CONVERSION
// ============================================================================

/// Convert a parsed subtree into a mutable XML element for later deep-copy
/// and rewriting. Comments and whitespace-only text are dropped; the output
/// serializer re-indents.
pub fn to_xml_element(node: Node) -> Element {
    let mut elem = Element::new(node.tag_name().name());
    for attribute in node.attributes() {
        elem.attributes
            .insert(attribute.name().to_string(), attribute.value().to_string());
    }
    for node_child in node.children() {
        if node_child.is_element() {
            elem.children
                .push(XMLNode::Element(to_xml_element(node_child)));
        } else if node_child.is_text() {
            if let Some(content) = node_child.text() {
                if !content.trim().is_empty() {
                    elem.children
                        .push(XMLNode::Text(content.trim().to_string()));
                }
            }
        }
    }
    elem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_to_condition() {
        assert_eq!(
            apply_suffix_to_condition("widgetArt=Poster", ".2"),
            "widgetArt.2=Poster"
        );
        assert_eq!(
            apply_suffix_to_condition("widgetArt=Poster + widgetType~movie", ".2"),
            "widgetArt.2=Poster + widgetType.2~movie"
        );
    }

    #[test]
    fn test_suffix_skips_reserved() {
        assert_eq!(apply_suffix_to_condition("name=movies", ".2"), "name=movies");
        assert_eq!(
            apply_suffix_to_condition("menu=main + widget=x", ".2"),
            "menu=main + widget.2=x"
        );
    }

    #[test]
    fn test_suffix_preserves_values() {
        // The value after the operator must not be rewritten.
        assert_eq!(
            apply_suffix_to_condition("widget=name", ".2"),
            "widget.2=name"
        );
    }

    #[test]
    fn test_empty_suffix_is_identity() {
        let cond = "widgetArt=Poster + widget~x";
        assert_eq!(apply_suffix_to_condition(cond, ""), cond);
        assert_eq!(apply_suffix_to_from("widgetPath", ""), "widgetPath");
    }

    #[test]
    fn test_nosuffix_markers() {
        let cond = "{NOSUFFIX:widgetArt=Poster} + widgetType=movies";
        assert_eq!(
            apply_suffix_to_condition(cond, ".2"),
            "widgetArt=Poster + widgetType.2=movies"
        );
        assert_eq!(
            strip_nosuffix_markers("{NOSUFFIX:a=b} + c=d"),
            "a=b + c=d"
        );
    }

    #[test]
    fn test_suffix_to_from() {
        assert_eq!(apply_suffix_to_from("widgetPath", ".2"), "widgetPath.2");
        assert_eq!(apply_suffix_to_from("index", ".2"), "index");
        assert_eq!(apply_suffix_to_from("dim[top]", ".2"), "dim.2[top]");
    }

    #[test]
    fn test_node_helpers() {
        let doc = Document::parse(
            r#"<root a=" x "><label>  hello </label><count>5</count><flag enabled="True"/></root>"#,
        )
        .unwrap();
        let root = doc.root_element();

        assert_eq!(attr(root, "a"), "x");
        assert_eq!(attr(root, "missing"), "");
        assert_eq!(attr_or(root, "missing", "d"), "d");
        assert_eq!(child_text(root, "label"), "hello");
        assert_eq!(child_int(root, "count"), Some(5));
        assert_eq!(child_int(root, "label"), None);
        assert!(attr_bool(child(root, "flag").unwrap(), "enabled", false));
    }

    #[test]
    fn test_to_xml_element() {
        let doc = Document::parse(
            "<controls><control type=\"list\" id=\"50\"><label>hi</label></control></controls>",
        )
        .unwrap();
        let elem = to_xml_element(doc.root_element());

        assert_eq!(elem.name, "controls");
        assert_eq!(elem.children.len(), 1);
        let control = elem.children[0].as_element().unwrap();
        assert_eq!(control.attributes.get("type").unwrap(), "list");
        let label = control.children[0].as_element().unwrap();
        assert_eq!(label.children[0].as_text().unwrap(), "hi");
    }
}
