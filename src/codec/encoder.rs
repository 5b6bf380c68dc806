//! Instance to XML encoding
//!
//! Writes a [`Document`] back out in schema order: attributes first, then
//! the members of every ancestor type before the derived type's own, one
//! element per property in insertion order. Links are written as XLink
//! attributes and never followed. Every namespace in use is declared once,
//! on the root element, with prefixes from a fixed [`PrefixMap`].

use indexmap::IndexSet;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use tracing::{debug, trace};

use super::options::EncodeOptions;
use crate::documents::{Document, Instance, Link, NodeId, Property};
use crate::error::{ElementPath, Error, Result};
use crate::geometry;
use crate::namespaces::{PrefixMap, QName, XLINK_NAMESPACE, XSI_NAMESPACE};
use crate::schema::model::{MemberDecl, MemberKind, Primitive, SchemaType};
use crate::schema::registry::TypeRegistry;
use crate::values;

/// Encodes documents against a type registry
#[derive(Debug, Clone)]
pub struct Encoder<'r> {
    registry: &'r TypeRegistry,
    options: EncodeOptions,
}

impl<'r> Encoder<'r> {
    /// Create an encoder with default options
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            options: EncodeOptions::default(),
        }
    }

    /// Set the encode options
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The encode options
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encode a document to a string
    pub fn encode(&self, document: &Document) -> Result<String> {
        let mut buffer = Vec::new();
        self.encode_to_writer(document, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::encode(e.to_string()))
    }

    /// Encode a document to any writer
    pub fn encode_to_writer<W: Write>(&self, document: &Document, sink: W) -> Result<()> {
        let root = document
            .root()
            .ok_or_else(|| Error::encode("document has no root element"))?;
        let root_element = &document
            .get(root)
            .ok_or_else(|| Error::encode(format!("root node {} is not part of the document", root.index())))?
            .element;
        if self.registry.element(root_element).is_none() {
            return Err(Error::encode(format!("'{}' is not a global element", root_element)));
        }
        if self.options.check_geometry {
            geometry::check(document, self.registry).map_err(|e| match e {
                Error::Geometry { reason, path } => Error::Encode { reason, path },
                other => other,
            })?;
        }
        debug!(root = %root_element, instances = document.len(), "encoding document");

        let mut prefixes = self.options.prefixes.clone();
        prefixes.merge(self.registry.prefixes());
        prefixes.merge(&PrefixMap::well_known());

        let writer = match self.options.indent {
            Some(width) => Writer::new_with_indent(sink, b' ', width),
            None => Writer::new(sink),
        };
        let mut state = EncodeState {
            registry: self.registry,
            document,
            writer,
            prefixes,
            declarations: None,
            path: ElementPath::new(),
        };
        state.declarations = Some(state.namespace_declarations(root)?);

        if self.options.xml_declaration {
            state.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        state.instance(root)?;
        debug!(root = %root_element, "encoded document");
        Ok(())
    }
}

/// Per-document encoding state
struct EncodeState<'r, 'd, W: Write> {
    registry: &'r TypeRegistry,
    document: &'d Document,
    writer: Writer<W>,
    prefixes: PrefixMap,
    /// `xmlns` attributes still to be written on the root element
    declarations: Option<Vec<(String, String)>>,
    path: ElementPath,
}

impl<'r, 'd, W: Write> EncodeState<'r, 'd, W> {
    /// Namespaces used anywhere below the root, in order of first use
    fn namespace_declarations(&mut self, root: NodeId) -> Result<Vec<(String, String)>> {
        let registry = self.registry;
        let mut used = IndexSet::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            let instance = self.lookup(node)?;
            used.extend(instance.element.namespace().map(str::to_string));
            let members = registry
                .effective_members(&instance.type_name)
                .map_err(|e| e.into_encode(&self.path))?;

            for member in &members {
                let properties = instance.get(member.key());
                let written = !properties.is_empty()
                    || (member.is_attribute() && instance.id.is_some() && is_id(registry, member))
                    || (member.occurs.is_required() && member.fixed.is_some());
                if !written {
                    continue;
                }
                let mut own_element = member.is_attribute();
                for property in properties {
                    match property {
                        Property::Node(_) => {}
                        Property::Link(_) => {
                            used.insert(XLINK_NAMESPACE.to_string());
                            own_element = true;
                        }
                        Property::Nil => {
                            used.insert(XSI_NAMESPACE.to_string());
                            own_element = true;
                        }
                        Property::Value(_) => own_element = true,
                    }
                }
                if own_element || properties.is_empty() {
                    used.extend(member.name.namespace().map(str::to_string));
                }
            }

            let children: Vec<NodeId> = instance
                .members
                .values()
                .flatten()
                .filter_map(Property::as_node)
                .collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(used
            .into_iter()
            .map(|namespace| {
                let prefix = self.prefixes.prefix_for(&namespace);
                (format!("xmlns:{}", prefix), namespace)
            })
            .collect())
    }

    fn lookup(&self, node: NodeId) -> Result<&'d Instance> {
        let document = self.document;
        document.get(node).ok_or_else(|| Error::Encode {
            reason: format!("node {} is not part of the document", node.index()),
            path: self.path.clone(),
        })
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(|e| Error::Encode {
            reason: e.to_string(),
            path: self.path.clone(),
        })
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::Encode {
            reason: reason.into(),
            path: self.path.clone(),
        }
    }

    /// Write one instance as an element named after its `element`
    ///
    /// Instances of simple types (substitutes for simple elements) have no
    /// members and are written as a text element.
    fn instance(&mut self, node: NodeId) -> Result<()> {
        let registry = self.registry;
        let instance = self.lookup(node)?;
        self.path.push(instance.element.local_name.clone());
        trace!(element = %instance.element, path = %self.path, "encoding instance");

        let members = registry
            .effective_members(&instance.type_name)
            .map_err(|e| e.into_encode(&self.path))?;
        self.check_members(instance, &members)?;

        let name = self.prefixes.qualify(&instance.element);
        let mut start = BytesStart::new(name.clone());
        if let Some(declarations) = self.declarations.take() {
            for (attribute, namespace) in &declarations {
                start.push_attribute((attribute.as_str(), namespace.as_str()));
            }
        }
        for member in members.iter().filter(|m| m.is_attribute()) {
            if let Some(value) = self.attribute_value(instance, member)? {
                let attribute = self.prefixes.qualify(&member.name);
                start.push_attribute((attribute.as_str(), value.as_str()));
            }
        }

        let text = match registry
            .text_type(&instance.type_name)
            .map_err(|e| e.into_encode(&self.path))?
        {
            Some(text_type) => {
                let value = instance
                    .text
                    .as_ref()
                    .ok_or_else(|| self.fail("simple content has no text"))?;
                Some(values::format(value, text_type).map_err(|e| e.into_encode(&self.path))?)
            }
            None => None,
        };

        let content: Vec<&MemberDecl> = members.into_iter().filter(|m| !m.is_attribute()).collect();
        let has_content = content
            .iter()
            .any(|m| instance.has(m.key()) || (m.occurs.is_required() && m.fixed.is_some()));

        match text {
            Some(text) => {
                self.write(Event::Start(start))?;
                self.write(Event::Text(BytesText::new(&text)))?;
                self.write(Event::End(BytesEnd::new(name)))?;
            }
            None if !has_content => self.write(Event::Empty(start))?,
            None => {
                self.write(Event::Start(start))?;
                for member in content {
                    self.member(instance, member)?;
                }
                self.write(Event::End(BytesEnd::new(name)))?;
            }
        }
        self.path.pop();
        Ok(())
    }

    /// Reject undeclared keys and occurrence counts outside the declared bounds
    fn check_members(&self, instance: &Instance, members: &[&MemberDecl]) -> Result<()> {
        for key in instance.members.keys() {
            if !members.iter().any(|m| m.key() == key) {
                return Err(self.fail(format!("'{}' declares no member '{}'", instance.type_name, key)));
            }
        }
        for member in members {
            let count = instance.get(member.key()).len() as u32;
            if member.is_attribute() {
                if count > 1 {
                    return Err(self.fail(format!("attribute '{}' has {} values", member.key(), count)));
                }
                continue;
            }
            if member.occurs.is_missing(count) && member.fixed.is_none() {
                return Err(self.fail(format!("missing required member '{}'", member.display_name())));
            }
            if member.occurs.is_exceeded(count) {
                return Err(self.fail(format!(
                    "member '{}' has {} occurrences, at most {} allowed",
                    member.display_name(),
                    count,
                    member.occurs.max.unwrap_or(0)
                )));
            }
        }
        Ok(())
    }

    /// Lexical value of an attribute, or None when it is omitted
    fn attribute_value(&self, instance: &Instance, member: &MemberDecl) -> Result<Option<String>> {
        let attr_type = self.member_type(member)?;
        if attr_type.primitive() == Some(Primitive::Id) && !instance.has(member.key()) {
            if let Some(id) = &instance.id {
                return Ok(Some(id.clone()));
            }
        }
        match instance.get(member.key()).first() {
            Some(Property::Value(value)) => values::format(value, attr_type)
                .map(Some)
                .map_err(|e| e.into_encode(&self.path.child(member.display_name()))),
            Some(_) => Err(self.fail(format!("attribute '{}' must hold a value", member.key()))),
            None if member.occurs.is_required() => match &member.fixed {
                Some(fixed) => Ok(Some(fixed.clone())),
                None => Err(self.fail(format!("missing required member '{}'", member.display_name()))),
            },
            None => Ok(None),
        }
    }

    fn member_type(&self, member: &MemberDecl) -> Result<&'r SchemaType> {
        let registry = self.registry;
        let type_name = member
            .type_name
            .as_ref()
            .ok_or_else(|| self.fail(format!("member '{}' has no declared type", member.key())))?;
        registry.resolve(type_name).map_err(|e| e.into_encode(&self.path))
    }

    /// Write every occurrence of a content member
    fn member(&mut self, instance: &'d Instance, member: &MemberDecl) -> Result<()> {
        let properties = instance.get(member.key());
        if properties.is_empty() {
            if let (true, Some(fixed)) = (member.occurs.is_required(), &member.fixed) {
                return self.text_element(&member.name, fixed);
            }
            return Ok(());
        }

        for property in properties {
            match property {
                Property::Node(child) => {
                    let element = &self.lookup(*child)?.element;
                    if !self.accepts(member, element) {
                        return Err(self.fail(format!(
                            "'{}' cannot appear as member '{}'",
                            element,
                            member.display_name()
                        )));
                    }
                    self.instance(*child)?;
                }
                Property::Value(value) => {
                    let schema_type = self.member_type(member)?;
                    let text = values::format(value, schema_type)
                        .map_err(|e| e.into_encode(&self.path.child(member.key())))?;
                    self.text_element(&member.name, &text)?;
                }
                Property::Link(link) => {
                    if !member.by_reference {
                        return Err(self.fail(format!(
                            "member '{}' cannot be given by reference",
                            member.display_name()
                        )));
                    }
                    self.link(&member.name, link)?;
                }
                Property::Nil => {
                    if !member.nillable {
                        return Err(self.fail(format!("member '{}' is not nillable", member.display_name())));
                    }
                    let name = self.prefixes.qualify(&member.name);
                    let nil = self.prefixes.qualify(&QName::namespaced(XSI_NAMESPACE, "nil"));
                    let mut start = BytesStart::new(name);
                    start.push_attribute((nil.as_str(), "true"));
                    self.write(Event::Empty(start))?;
                }
            }
        }
        Ok(())
    }

    fn accepts(&self, member: &MemberDecl, element: &QName) -> bool {
        match member.kind {
            MemberKind::Element => &member.name == element || self.registry.is_substitutable(element, &member.name),
            MemberKind::Wildcard => member.name.namespace().map_or(true, |ns| element.is_in(ns)),
            MemberKind::Attribute => false,
        }
    }

    fn text_element(&mut self, name: &QName, text: &str) -> Result<()> {
        let name = self.prefixes.qualify(name);
        self.write(Event::Start(BytesStart::new(name.clone())))?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn link(&mut self, name: &QName, link: &Link) -> Result<()> {
        let name = self.prefixes.qualify(name);
        let mut start = BytesStart::new(name);
        let attributes = [
            ("href", Some(&link.href)),
            ("role", link.role.as_ref()),
            ("arcrole", link.arcrole.as_ref()),
            ("title", link.title.as_ref()),
            ("show", link.show.as_ref()),
            ("actuate", link.actuate.as_ref()),
        ];
        for (local, value) in attributes {
            if let Some(value) = value {
                let attribute = self.prefixes.qualify(&QName::namespaced(XLINK_NAMESPACE, local));
                start.push_attribute((attribute.as_str(), value.as_str()));
            }
        }
        self.write(Event::Empty(start))
    }
}

fn is_id(registry: &TypeRegistry, member: &MemberDecl) -> bool {
    member
        .type_name
        .as_ref()
        .and_then(|name| registry.get_type(name))
        .and_then(SchemaType::primitive)
        == Some(Primitive::Id)
}
