//! Shallow XML documents.
//!
//! The metadata API answers with documents whose root element holds one child
//! element per field. Only that first level is modelled: a child's value is
//! its whole text content, nested markup included.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Errors raised while reading a shallow document.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("malformed XML: {0}")]
    Syntax(String),
    /// The document has no root element.
    #[error("document has no root element")]
    MissingRoot,
    /// The document ended inside an element.
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

impl XmlError {
    fn syntax(err: impl std::fmt::Display) -> Self {
        Self::Syntax(err.to_string())
    }
}

fn element_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Parses the direct children of the root element into a name → text map.
///
/// Repeated names keep the last value.
pub fn parse_flat(document: &[u8]) -> Result<BTreeMap<String, String>, XmlError> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();

    let mut fields = BTreeMap::new();
    let mut open: Vec<String> = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(XmlError::syntax)? {
            Event::Start(start) => {
                let name = element_name(start.name().as_ref());
                seen_root = true;
                if open.len() == 1 {
                    current = Some((name.clone(), String::new()));
                }
                open.push(name);
            }
            Event::Empty(empty) => {
                seen_root = true;
                if open.len() == 1 {
                    fields.insert(element_name(empty.name().as_ref()), String::new());
                }
            }
            Event::Text(text) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&text.unescape().map_err(XmlError::syntax)?);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::End(_) => {
                open.pop();
                if open.len() == 1
                    && let Some((name, value)) = current.take()
                {
                    fields.insert(name, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(name) = open.pop() {
        return Err(XmlError::Unclosed(name));
    }
    if !seen_root {
        return Err(XmlError::MissingRoot);
    }

    Ok(fields)
}

/// Returns the text of the first element with the given name, at any depth.
///
/// Anything that is not well-formed XML yields `None`.
pub fn find_element_text(document: &[u8], name: &str) -> Option<String> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(start) => {
                if text.is_some() {
                    depth += 1;
                } else if start.name().as_ref() == name.as_bytes() {
                    text = Some(String::new());
                }
            }
            Event::Empty(empty) => {
                if text.is_none() && empty.name().as_ref() == name.as_bytes() {
                    return Some(String::new());
                }
            }
            Event::Text(content) => {
                if let Some(text) = text.as_mut() {
                    text.push_str(&content.unescape().ok()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(text) = text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::End(_) if text.is_some() => {
                if depth == 0 {
                    return text;
                }
                depth -= 1;
            }
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "<upload><policy>P</policy><prefix>pre/</prefix>\
        <accesskeyid>AK</accesskeyid><signature>SIG</signature><acl>public-read</acl></upload>";

    #[test]
    fn test_parse_flat() {
        let fields = parse_flat(POLICY.as_bytes()).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["policy"], "P");
        assert_eq!(fields["prefix"], "pre/");
        assert_eq!(fields["accesskeyid"], "AK");
        assert_eq!(fields["signature"], "SIG");
        assert_eq!(fields["acl"], "public-read");
    }

    #[test]
    fn test_parse_flat_with_declaration_and_whitespace() {
        let document = "<?xml version=\"1.0\"?>\n<hash>\n  <policy>a+b/c=</policy>\n  <acl/>\n</hash>\n";
        let fields = parse_flat(document.as_bytes()).unwrap();
        assert_eq!(fields["policy"], "a+b/c=");
        assert_eq!(fields["acl"], "");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_parse_flat_takes_text_content_of_nested_markup() {
        let document = "<root><note>one <b>two</b> three</note><x>&amp;</x></root>";
        let fields = parse_flat(document.as_bytes()).unwrap();
        assert_eq!(fields["note"], "one two three");
        assert_eq!(fields["x"], "&");
        assert!(!fields.contains_key("b"));
    }

    #[test]
    fn test_parse_flat_empty_root() {
        assert!(parse_flat(b"<root/>").unwrap().is_empty());
        assert!(parse_flat(b"<root></root>").unwrap().is_empty());
    }

    #[test]
    fn test_parse_flat_rejects_garbage() {
        assert!(matches!(parse_flat(b""), Err(XmlError::MissingRoot)));
        assert!(matches!(parse_flat(b"just text"), Err(XmlError::MissingRoot)));
        assert!(parse_flat(b"<root><a>1</b></root>").is_err());
        assert!(parse_flat(b"<root><a>1</a>").is_err());
    }

    #[test]
    fn test_find_element_text() {
        let document = b"<response><errors><error>Bad credentials</error></errors></response>";
        assert_eq!(
            find_element_text(document, "error").as_deref(),
            Some("Bad credentials")
        );
        assert_eq!(find_element_text(document, "missing"), None);
        assert_eq!(find_element_text(b"<html><p>nope", "error"), None);
    }
}
