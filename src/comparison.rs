//! XML equivalence for round-trip testing
//!
//! Two documents are equivalent when their element trees match by
//! expanded name, attribute set and trimmed text. Prefixes, namespace
//! declaration placement, attribute order and whitespace-only text are
//! ignored.

use roxmltree::{Document, Node};

use crate::error::{Error, Result};

/// Check whether two XML documents are equivalent
pub fn xml_equivalent(left: &str, right: &str) -> Result<bool> {
    Ok(first_difference(left, right)?.is_none())
}

/// Describe the first difference between two XML documents, if any
pub fn first_difference(left: &str, right: &str) -> Result<Option<String>> {
    let left = parse(left)?;
    let right = parse(right)?;
    Ok(compare(left.root_element(), right.root_element(), &mut Vec::new()))
}

fn parse(xml: &str) -> Result<Document<'_>> {
    Document::parse(xml).map_err(|e| Error::malformed(e.to_string(), 0))
}

fn expanded(node: &Node<'_, '_>) -> String {
    match node.tag_name().namespace() {
        Some(ns) => format!("{{{}}}{}", ns, node.tag_name().name()),
        None => node.tag_name().name().to_string(),
    }
}

fn attributes(node: &Node<'_, '_>) -> Vec<(String, String)> {
    let mut attributes: Vec<_> = node
        .attributes()
        .map(|a| {
            let name = match a.namespace() {
                Some(ns) => format!("{{{}}}{}", ns, a.name()),
                None => a.name().to_string(),
            };
            (name, a.value().to_string())
        })
        .collect();
    attributes.sort();
    attributes
}

fn text(node: &Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn compare(left: Node<'_, '_>, right: Node<'_, '_>, path: &mut Vec<String>) -> Option<String> {
    let (left_name, right_name) = (expanded(&left), expanded(&right));
    path.push(left.tag_name().name().to_string());
    let at = format!("/{}", path.join("/"));

    if left_name != right_name {
        return Some(format!("{}: element '{}' differs from '{}'", at, left_name, right_name));
    }
    let (left_attributes, right_attributes) = (attributes(&left), attributes(&right));
    if left_attributes != right_attributes {
        return Some(format!(
            "{}: attributes {:?} differ from {:?}",
            at, left_attributes, right_attributes
        ));
    }
    let (left_text, right_text) = (text(&left), text(&right));
    if left_text != right_text {
        return Some(format!("{}: text '{}' differs from '{}'", at, left_text, right_text));
    }

    let left_children: Vec<_> = left.children().filter(Node::is_element).collect();
    let right_children: Vec<_> = right.children().filter(Node::is_element).collect();
    if left_children.len() != right_children.len() {
        return Some(format!(
            "{}: {} child elements versus {}",
            at,
            left_children.len(),
            right_children.len()
        ));
    }
    for (l, r) in left_children.into_iter().zip(right_children) {
        if let Some(difference) = compare(l, r, path) {
            return Some(difference);
        }
    }
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_and_whitespace_are_ignored() {
        let left = r#"<a:Dataset xmlns:a="urn:x" a:id="D"><a:name>Cork Hole</a:name></a:Dataset>"#;
        let right = r#"<?xml version="1.0"?>
            <b:Dataset xmlns:b="urn:x" b:id="D">
              <b:name>Cork Hole</b:name>
            </b:Dataset>"#;
        assert!(xml_equivalent(left, right).unwrap());
    }

    #[test]
    fn test_attribute_order_is_ignored() {
        let left = r#"<p x="1" y="2"/>"#;
        let right = r#"<p y="2" x="1"></p>"#;
        assert!(xml_equivalent(left, right).unwrap());
    }

    #[test]
    fn test_differences_are_located() {
        let left = r#"<a xmlns="urn:x"><b>1</b><c/></a>"#;
        let right = r#"<a xmlns="urn:x"><b>2</b><c/></a>"#;
        let difference = first_difference(left, right).unwrap().unwrap();
        assert!(difference.starts_with("/a/b"));

        let right = r#"<a xmlns="urn:y"><b>1</b><c/></a>"#;
        assert!(!xml_equivalent(left, right).unwrap());

        let right = r#"<a xmlns="urn:x"><b>1</b></a>"#;
        assert!(first_difference(left, right).unwrap().unwrap().contains("child elements"));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(xml_equivalent("<a>", "<a/>"), Err(Error::MalformedXml { .. })));
    }
}
