//! Namespace-resolving XML event reader
//!
//! Thin layer over `quick_xml::NsReader` producing owned events with fully
//! resolved names and one event of lookahead, which is all the decoder's
//! recursive descent needs.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::io::BufRead;

use crate::error::{Error, Result};
use crate::namespaces::QName;

/// A start tag with resolved element and attribute names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Element name
    pub name: QName,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<(QName, String)>,
    /// Byte offset of the tag
    pub position: usize,
}

impl StartTag {
    /// Get an attribute value
    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Owned XML events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start of an element (empty elements are reported as start + end)
    Start(StartTag),
    /// End of the current element
    End,
    /// Character data, unescaped
    Text(String),
    /// End of input
    Eof,
}

/// Streaming reader with one event of lookahead
pub struct XmlReader<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    peeked: Option<XmlEvent>,
    depth: usize,
}

impl<'a> XmlReader<&'a [u8]> {
    /// Read from an in-memory string
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlReader<R> {
    /// Create a reader over any buffered source
    pub fn new(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        reader.expand_empty_elements(true);
        Self {
            reader,
            buf: Vec::new(),
            peeked: None,
            depth: 0,
        }
    }

    /// Byte offset of the reader in the input
    pub fn position(&self) -> usize {
        self.reader.buffer_position()
    }

    /// Look at the next event without consuming it
    pub fn peek(&mut self) -> Result<&XmlEvent> {
        if self.peeked.is_none() {
            let event = self.read_event()?;
            self.peeked = Some(event);
        }
        match &self.peeked {
            Some(event) => Ok(event),
            None => Err(Error::malformed("lookahead lost", self.position())),
        }
    }

    /// Consume the next event
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        match self.peeked.take() {
            Some(event) => Ok(event),
            None => self.read_event(),
        }
    }

    fn read_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position();
            let (resolved, event) = self
                .reader
                .read_resolved_event_into(&mut self.buf)
                .map_err(|e| Error::malformed(e.to_string(), position))?;
            let namespace = owned_namespace(resolved, position)?;

            return match event {
                Event::Start(start) => {
                    let name = QName::new(namespace, utf8(start.local_name().as_ref(), position)?);
                    let attributes = resolve_attributes(&self.reader, &start, position)?;
                    self.depth += 1;
                    Ok(XmlEvent::Start(StartTag {
                        name,
                        attributes,
                        position,
                    }))
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    Ok(XmlEvent::End)
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::malformed(e.to_string(), position))?;
                    if self.depth == 0 {
                        if text.trim().is_empty() {
                            continue;
                        }
                        return Err(Error::malformed("text outside the root element", position));
                    }
                    Ok(XmlEvent::Text(text.into_owned()))
                }
                Event::CData(data) => {
                    let text = utf8(&data.into_inner(), position)?;
                    Ok(XmlEvent::Text(text))
                }
                Event::Eof => Ok(XmlEvent::Eof),
                // Declarations, comments, processing instructions, doctype
                _ => continue,
            };
        }
    }
}

fn utf8(bytes: &[u8], position: usize) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::malformed(format!("invalid UTF-8: {}", e), position))
}

fn owned_namespace(resolved: ResolveResult<'_>, position: usize) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(namespace) => utf8(namespace.as_ref(), position).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::malformed(
            format!("unknown namespace prefix '{}'", String::from_utf8_lossy(&prefix)),
            position,
        )),
    }
}

fn resolve_attributes<R>(
    reader: &NsReader<R>,
    start: &BytesStart<'_>,
    position: usize,
) -> Result<Vec<(QName, String)>> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::malformed(e.to_string(), position))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let namespace = owned_namespace(reader.resolve_attribute(attr.key).0, position)?;
        let local = utf8(attr.key.local_name().as_ref(), position)?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::malformed(e.to_string(), position))?;
        attributes.push((QName::new(namespace, local), value.into_owned()));
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{GML_NAMESPACE, XLINK_NAMESPACE};

    fn start(event: XmlEvent) -> StartTag {
        match event {
            XmlEvent::Start(tag) => tag,
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_resolves_names() {
        let xml = r##"<?xml version="1.0"?>
            <gml:Point xmlns:gml="http://www.opengis.net/gml/3.2" gml:id="P1" srsDimension="2">
              <gml:pos>51.89 1.42</gml:pos>
            </gml:Point>"##;
        let mut reader = XmlReader::from_str(xml);

        let point = start(reader.next_event().unwrap());
        assert_eq!(point.name, QName::namespaced(GML_NAMESPACE, "Point"));
        assert_eq!(point.attributes.len(), 2);
        assert_eq!(point.attribute(&QName::namespaced(GML_NAMESPACE, "id")), Some("P1"));
        assert_eq!(point.attribute(&QName::local("srsDimension")), Some("2"));

        assert!(matches!(reader.next_event().unwrap(), XmlEvent::Text(ref t) if t.trim().is_empty()));
        let pos = start(reader.next_event().unwrap());
        assert_eq!(pos.name.local_name, "pos");
        assert_eq!(reader.next_event().unwrap(), XmlEvent::Text("51.89 1.42".into()));
        assert_eq!(reader.next_event().unwrap(), XmlEvent::End);
    }

    #[test]
    fn test_empty_element_expands_and_peek() {
        let xml = r##"<peer xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="#A1"/>"##;
        let mut reader = XmlReader::from_str(xml);

        assert!(matches!(reader.peek().unwrap(), XmlEvent::Start(_)));
        let peer = start(reader.next_event().unwrap());
        assert_eq!(peer.attribute(&QName::namespaced(XLINK_NAMESPACE, "href")), Some("#A1"));
        assert_eq!(reader.next_event().unwrap(), XmlEvent::End);
        assert_eq!(reader.next_event().unwrap(), XmlEvent::Eof);
    }

    #[test]
    fn test_unescapes_text() {
        let mut reader = XmlReader::from_str("<name>Fish &amp; Chips<![CDATA[ <raw>]]></name>");
        reader.next_event().unwrap();
        assert_eq!(reader.next_event().unwrap(), XmlEvent::Text("Fish & Chips".into()));
        assert_eq!(reader.next_event().unwrap(), XmlEvent::Text(" <raw>".into()));
    }

    #[test]
    fn test_malformed_input() {
        let mut reader = XmlReader::from_str("<a><b></a>");
        reader.next_event().unwrap();
        reader.next_event().unwrap();
        assert!(matches!(reader.next_event(), Err(Error::MalformedXml { .. })));

        let mut reader = XmlReader::from_str("<x:a/>");
        assert!(matches!(reader.next_event(), Err(Error::MalformedXml { .. })));
    }
}
