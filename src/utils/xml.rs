//! Output XML serialization and atomic file writes.

use std::io;
use std::path::Path;
use xmltree::{Element, EmitterConfig};

/// Emitter settings for the output document: UTF-8 declaration, two-space
/// indentation, text-only leaves inline.
pub fn emitter_config() -> EmitterConfig {
    EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ")
}

/// Serialize a document root to bytes.
pub fn serialize_document(root: &Element) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    root.write_with_config(&mut buffer, emitter_config())
        .map_err(|e| e.to_string())?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Write bytes to a path atomically: write a sibling temp file, then rename.
/// Parent directories are created on demand.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmltree::XMLNode;

    #[test]
    fn test_serialize_has_declaration_and_indent() {
        let mut root = Element::new("includes");
        let mut include = Element::new("include");
        include
            .attributes
            .insert("name".to_string(), "skinshortcuts-main".to_string());
        let mut label = Element::new("label");
        label.children.push(XMLNode::Text("Movies".to_string()));
        include.children.push(XMLNode::Element(label));
        root.children.push(XMLNode::Element(include));

        let bytes = serialize_document(&root).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("<?xml"));
        assert!(text.contains("\n  <include name=\"skinshortcuts-main\">"));
        // Text-only leaf stays inline.
        assert!(text.contains("<label>Movies</label>"));
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = crate::loaders::testutil::tempdir("xmlwrite");
        let path = dir.path().join("nested/dir/out.xml");

        atomic_write(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        // Overwrite goes through the same temp-and-rename path.
        atomic_write(&path, b"world").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"world");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut root = Element::new("includes");
        let mut control = Element::new("control");
        control
            .attributes
            .insert("type".to_string(), "list".to_string());
        control.attributes.insert("id".to_string(), "50".to_string());
        root.children.push(XMLNode::Element(control));

        let first = serialize_document(&root).unwrap();
        let second = serialize_document(&root).unwrap();
        assert_eq!(first, second);
    }
}
