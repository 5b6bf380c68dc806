//! XML to instance decoding
//!
//! A streaming recursive descent over [`XmlReader`] events. Each element is
//! matched against the members of its parent's type (ancestors' members
//! first), its attributes and text are coerced through [`values`], and
//! complex children become instances in the document arena. Links are
//! resolved in a second pass once every id is known.

use std::io::BufRead;
use tracing::{debug, trace};

use super::options::DecodeOptions;
use super::reader::{StartTag, XmlEvent, XmlReader};
use crate::documents::{Document, Instance, Link, NodeId, Property};
use crate::error::{ElementPath, Error, FacetKind, Result};
use crate::geometry;
use crate::namespaces::{QName, XLINK_NAMESPACE, XML_NAMESPACE, XSI_NAMESPACE};
use crate::references::LinkResolver;
use crate::schema::model::{MemberDecl, MemberKind, Primitive, SchemaType};
use crate::schema::registry::TypeRegistry;
use crate::values::{self, Value};

/// Decodes XML documents against a type registry
#[derive(Debug, Clone)]
pub struct Decoder<'r> {
    registry: &'r TypeRegistry,
    options: DecodeOptions,
}

impl<'r> Decoder<'r> {
    /// Create a decoder with default options
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            options: DecodeOptions::default(),
        }
    }

    /// Set the decode options
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The decode options
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a document held in memory
    pub fn decode_str(&self, xml: &str) -> Result<Document> {
        self.options.limits.check_xml_size(xml.len())?;
        self.decode(xml.as_bytes())
    }

    /// Decode a document from a buffered reader
    pub fn decode<R: BufRead>(&self, source: R) -> Result<Document> {
        let mut state = DecodeState {
            registry: self.registry,
            options: &self.options,
            reader: XmlReader::new(source),
            document: Document::new(),
            path: ElementPath::new(),
        };
        let root = state.root()?;
        let mut document = state.document;
        document.set_root(root);

        let report = LinkResolver::new(self.registry, self.options.reference_policy).resolve(&mut document)?;
        if self.options.check_geometry {
            geometry::check(&document, self.registry)?;
        }

        debug!(
            instances = document.len(),
            resolved = report.resolved,
            external = report.external,
            dangling = report.dangling,
            "decoded document"
        );
        Ok(document)
    }
}

/// Per-document decoding state
struct DecodeState<'r, 'o, R: BufRead> {
    registry: &'r TypeRegistry,
    options: &'o DecodeOptions,
    reader: XmlReader<R>,
    document: Document,
    path: ElementPath,
}

impl<'r, 'o, R: BufRead> DecodeState<'r, 'o, R> {
    fn root(&mut self) -> Result<NodeId> {
        let tag = match self.reader.next_event()? {
            XmlEvent::Start(tag) => tag,
            XmlEvent::Eof => {
                return Err(Error::malformed("document has no root element", self.reader.position()))
            }
            _ => {
                return Err(Error::malformed(
                    "unexpected content before the root element",
                    self.reader.position(),
                ))
            }
        };
        self.path.push(tag.name.local_name.clone());
        debug!(root = %tag.name, "decoding document");

        let registry = self.registry;
        let decl = registry
            .resolve_element(&tag.name)
            .map_err(|e| e.at_path(&self.path))?;
        if decl.is_abstract {
            return Err(Error::Abstract {
                name: decl.name.clone(),
                path: self.path.clone(),
            });
        }
        let root = self.instance(tag, &decl.type_name)?;

        match self.reader.next_event()? {
            XmlEvent::Eof => Ok(root),
            _ => Err(Error::malformed(
                "content after the root element",
                self.reader.position(),
            )),
        }
    }

    /// Decode an element into a new instance of `type_name`
    fn instance(&mut self, tag: StartTag, type_name: &'r QName) -> Result<NodeId> {
        self.options.limits.check_xml_depth(self.path.depth())?;
        self.options.limits.check_attributes(tag.attributes.len())?;
        let registry = self.registry;

        if registry.is_abstract(type_name)? {
            return Err(Error::Abstract {
                name: type_name.clone(),
                path: self.path.clone(),
            });
        }
        trace!(element = %tag.name, path = %self.path, "decoding instance");

        let mut instance = Instance::new(tag.name.clone(), type_name.clone());
        self.attributes(&tag, type_name, &mut instance)?;
        match registry.text_type(type_name)? {
            Some(text_type) => {
                let text = self.read_text()?;
                let value = values::parse(&text, text_type).map_err(|e| e.at_path(&self.path))?;
                instance.text = Some(value);
            }
            None => self.content(type_name, &mut instance)?,
        }

        self.options.limits.check_instances(self.document.len() + 1)?;
        self.document.add(instance).map_err(|e| e.at_path(&self.path))
    }

    fn attributes(&mut self, tag: &StartTag, type_name: &QName, instance: &mut Instance) -> Result<()> {
        let registry = self.registry;
        let declared = registry.attribute_members(type_name)?;

        for (name, raw) in &tag.attributes {
            let Some(member) = declared.iter().find(|m| &m.name == name) else {
                if is_ignorable(name) {
                    continue;
                }
                return Err(Error::UnexpectedAttribute {
                    name: name.clone(),
                    path: self.path.clone(),
                });
            };
            let attr_type = registry.resolve(declared_type(member)?)?;
            let value = values::parse(raw, attr_type).map_err(|e| e.at_path(&self.path))?;
            self.check_fixed(member, attr_type, &value, raw)?;
            match (attr_type.primitive(), value) {
                (Some(Primitive::Id), Value::String(id)) => instance.id = Some(id),
                (_, value) => instance.push(member.key(), value),
            }
        }

        for member in declared {
            if tag.attributes.iter().any(|(name, _)| name == &member.name) {
                continue;
            }
            if member.occurs.is_required() {
                return Err(Error::MissingRequiredElement {
                    member: member.display_name(),
                    parent: type_name.clone(),
                    path: self.path.clone(),
                });
            }
            if self.options.fill_defaults {
                if let Some(default) = member.default.as_ref().or(member.fixed.as_ref()) {
                    let attr_type = registry.resolve(declared_type(member)?)?;
                    let value = values::parse(default, attr_type).map_err(|e| e.at_path(&self.path))?;
                    instance.push(member.key(), value);
                }
            }
        }
        Ok(())
    }

    /// Decode element-only content against the type's members
    fn content(&mut self, type_name: &'r QName, instance: &mut Instance) -> Result<()> {
        let registry = self.registry;
        let members = registry.content_members(type_name)?;
        let mut counts = vec![0u32; members.len()];
        let mut cursor = 0;

        loop {
            match self.reader.next_event()? {
                XmlEvent::Text(text) => {
                    if !text.trim().is_empty() {
                        return Err(Error::UnexpectedText {
                            text: text.trim().to_string(),
                            path: self.path.clone(),
                        });
                    }
                }
                XmlEvent::End => break,
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of input", self.reader.position()))
                }
                XmlEvent::Start(tag) => {
                    let index = self.match_member(&members, &counts, cursor, &tag, type_name)?;
                    cursor = index;
                    counts[index] += 1;
                    let member = members[index];

                    self.path.push(tag.name.local_name.clone());
                    let property = self.occurrence(tag, member)?;
                    self.path.pop();
                    instance.push(member.key(), property);
                }
            }
        }

        for (member, count) in members.iter().zip(&counts).skip(cursor) {
            if member.occurs.is_missing(*count) {
                return Err(Error::MissingRequiredElement {
                    member: member.display_name(),
                    parent: type_name.clone(),
                    path: self.path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find the member a child element belongs to, at or after the cursor
    fn match_member(
        &self,
        members: &[&'r MemberDecl],
        counts: &[u32],
        cursor: usize,
        tag: &StartTag,
        parent: &QName,
    ) -> Result<usize> {
        let mut exhausted = None;
        for index in cursor..members.len() {
            let member = members[index];
            if !self.accepts(member, &tag.name) {
                continue;
            }
            if member.occurs.is_over(counts[index]) {
                exhausted.get_or_insert(index);
                continue;
            }
            if let Some(skipped) = (cursor..index).find(|&j| members[j].occurs.is_missing(counts[j])) {
                return Err(Error::MissingRequiredElement {
                    member: members[skipped].display_name(),
                    parent: parent.clone(),
                    path: self.path.clone(),
                });
            }
            return Ok(index);
        }

        let path = self.path.child(tag.name.local_name.clone());
        match exhausted {
            Some(index) => Err(Error::TooManyOccurrences {
                member: members[index].display_name(),
                max: members[index].occurs.max.unwrap_or(0),
                path,
            }),
            None => Err(Error::UnexpectedElement {
                name: tag.name.clone(),
                path,
            }),
        }
    }

    fn accepts(&self, member: &MemberDecl, name: &QName) -> bool {
        match member.kind {
            MemberKind::Element => &member.name == name || self.registry.is_substitutable(name, &member.name),
            MemberKind::Wildcard => {
                self.registry.element(name).is_some()
                    && member.name.namespace().map_or(true, |ns| name.is_in(ns))
            }
            MemberKind::Attribute => false,
        }
    }

    /// Decode one occurrence of a member
    fn occurrence(&mut self, tag: StartTag, member: &'r MemberDecl) -> Result<Property> {
        if is_nil(&tag) {
            if !member.nillable {
                return Err(Error::NotNillable {
                    member: member.display_name(),
                    path: self.path.clone(),
                });
            }
            self.expect_empty()?;
            return Ok(Property::Nil);
        }

        if member.by_reference {
            if let Some(link) = link_from(&tag) {
                self.expect_empty()?;
                return Ok(Property::Link(link));
            }
        }

        let registry = self.registry;
        let type_name = self.occurrence_type(&tag, member)?;
        let schema_type = registry.resolve(type_name).map_err(|e| e.at_path(&self.path))?;

        if schema_type.is_simple() {
            let value = self.simple_value(&tag, member, schema_type)?;
            if tag.name == member.name {
                return Ok(Property::Value(value));
            }
            // A substitute keeps its own element name as a text-only instance
            self.options.limits.check_instances(self.document.len() + 1)?;
            let instance = Instance::new(tag.name, type_name.clone()).with_text(value);
            return self
                .document
                .add(instance)
                .map(Property::Node)
                .map_err(|e| e.at_path(&self.path));
        }
        self.instance(tag, type_name).map(Property::Node)
    }

    /// The type of a member occurrence: the member's declared type, or the
    /// global element's type when a substitute or wildcard match appears
    fn occurrence_type(&self, tag: &StartTag, member: &'r MemberDecl) -> Result<&'r QName> {
        let registry = self.registry;
        if member.kind == MemberKind::Element && tag.name == member.name {
            if registry.element(&member.name).map_or(false, |e| e.is_abstract) {
                return Err(Error::Abstract {
                    name: member.name.clone(),
                    path: self.path.clone(),
                });
            }
            return declared_type(member);
        }
        let decl = registry
            .resolve_element(&tag.name)
            .map_err(|e| e.at_path(&self.path))?;
        if decl.is_abstract {
            return Err(Error::Abstract {
                name: decl.name.clone(),
                path: self.path.clone(),
            });
        }
        Ok(&decl.type_name)
    }

    fn simple_value(&mut self, tag: &StartTag, member: &MemberDecl, schema_type: &SchemaType) -> Result<Value> {
        if let Some((name, _)) = tag.attributes.iter().find(|(name, _)| !is_ignorable(name)) {
            return Err(Error::UnexpectedAttribute {
                name: name.clone(),
                path: self.path.clone(),
            });
        }
        let text = self.read_text()?;
        let value = values::parse(&text, schema_type).map_err(|e| e.at_path(&self.path))?;
        self.check_fixed(member, schema_type, &value, &text)?;
        Ok(value)
    }

    fn check_fixed(&self, member: &MemberDecl, schema_type: &SchemaType, value: &Value, lexical: &str) -> Result<()> {
        let Some(fixed) = &member.fixed else {
            return Ok(());
        };
        let expected = values::parse(fixed, schema_type).map_err(|e| e.at_path(&self.path))?;
        if &expected != value {
            return Err(Error::FacetViolation {
                facet: FacetKind::Fixed,
                value: lexical.trim().to_string(),
                constraint: fixed.clone(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Collect the text of a simple element up to its end tag
    fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.reader.next_event()? {
                XmlEvent::Text(chunk) => text.push_str(&chunk),
                XmlEvent::End => return Ok(text),
                XmlEvent::Start(tag) => {
                    return Err(Error::UnexpectedElement {
                        path: self.path.child(tag.name.local_name.clone()),
                        name: tag.name,
                    })
                }
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of input", self.reader.position()))
                }
            }
        }
    }

    /// Consume the content of an element that must be empty
    fn expect_empty(&mut self) -> Result<()> {
        loop {
            match self.reader.next_event()? {
                XmlEvent::Text(text) if text.trim().is_empty() => {}
                XmlEvent::Text(text) => {
                    return Err(Error::UnexpectedText {
                        text: text.trim().to_string(),
                        path: self.path.clone(),
                    })
                }
                XmlEvent::End => return Ok(()),
                XmlEvent::Start(tag) => {
                    return Err(Error::UnexpectedElement {
                        path: self.path.child(tag.name.local_name.clone()),
                        name: tag.name,
                    })
                }
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of input", self.reader.position()))
                }
            }
        }
    }
}

fn declared_type(member: &MemberDecl) -> Result<&QName> {
    member
        .type_name
        .as_ref()
        .ok_or_else(|| Error::Schema(format!("member '{}' has no declared type", member.key())))
}

/// Attributes that never need a declaration
fn is_ignorable(name: &QName) -> bool {
    name.is_in(XSI_NAMESPACE) || name.is_in(XLINK_NAMESPACE) || name.is_in(XML_NAMESPACE)
}

fn is_nil(tag: &StartTag) -> bool {
    matches!(
        tag.attribute(&QName::namespaced(XSI_NAMESPACE, "nil")).map(str::trim),
        Some("true") | Some("1")
    )
}

fn link_from(tag: &StartTag) -> Option<Link> {
    let xlink = |local: &str| {
        tag.attribute(&QName::namespaced(XLINK_NAMESPACE, local))
            .map(str::to_string)
    };
    Some(Link {
        href: xlink("href")?,
        role: xlink("role"),
        arcrole: xlink("arcrole"),
        title: xlink("title"),
        show: xlink("show"),
        actuate: xlink("actuate"),
        target: None,
    })
}
