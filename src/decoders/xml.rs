//! Small helpers over `roxmltree` shared by the KML and GPX decoders.
//!
//! Element lookups compare local names only, so namespaced documents (`kml:Placemark`,
//! GPX 1.0 vs 1.1) behave the same as plain ones.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{DecodeError, DecodeResult};

pub(crate) fn parse_document(text: &str) -> DecodeResult<Document<'_>> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Ok(Document::parse_with_options(text, options)?)
}

pub(crate) fn expect_root<'a, 'input>(
    doc: &'a Document<'input>,
    name: &str,
    format: &'static str,
) -> DecodeResult<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() != name {
        return Err(DecodeError::Document {
            format,
            message: format!("expected <{name}> root element, found <{}>", root.tag_name().name()),
        });
    }
    Ok(root)
}

pub(crate) fn is(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

pub(crate) fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is(n, name))
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(n, name))
}

pub(crate) fn descendants<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants().filter(move |n| is(n, name))
}

/// Trimmed text of a direct child element, if present and non-empty.
pub(crate) fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).and_then(text_of)
}

/// Trimmed concatenated text content of an element, if non-empty.
pub(crate) fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
