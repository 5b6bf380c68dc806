//! Decoded documents
//!
//! A [`Document`] is an arena of typed [`Instance`]s. Inline children are
//! owned by their parent through [`Property::Node`]; by-reference
//! associations are [`Link`]s holding a non-owning [`NodeId`] once
//! resolved, so reference cycles never create ownership cycles.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::ops::Index;

use crate::error::{DanglingReference, ElementPath, Error, Result};
use crate::namespaces::QName;
use crate::values::Value;

/// Index of an instance in its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An XLink simple link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// `xlink:href`
    pub href: String,
    /// `xlink:role`
    pub role: Option<String>,
    /// `xlink:arcrole`
    pub arcrole: Option<String>,
    /// `xlink:title`
    pub title: Option<String>,
    /// `xlink:show`
    pub show: Option<String>,
    /// `xlink:actuate`
    pub actuate: Option<String>,
    /// Resolved same-document target
    pub target: Option<NodeId>,
}

impl Link {
    /// Create an unresolved link
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Create a link to an id in the same document (`#id`)
    pub fn to_id(id: &str) -> Self {
        Self::new(format!("#{}", id))
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the arcrole
    pub fn with_arcrole(mut self, arcrole: impl Into<String>) -> Self {
        self.arcrole = Some(arcrole.into());
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The id a same-document link points at
    pub fn fragment(&self) -> Option<&str> {
        self.href.strip_prefix('#').filter(|id| !id.is_empty())
    }

    /// Check if the link points into the same document
    pub fn is_local(&self) -> bool {
        self.fragment().is_some()
    }

    /// Check if the link has been resolved
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    /// Compare everything except the resolved target
    fn same_reference(&self, other: &Link) -> bool {
        self.href == other.href
            && self.role == other.role
            && self.arcrole == other.arcrole
            && self.title == other.title
            && self.show == other.show
            && self.actuate == other.actuate
    }
}

/// One occurrence of a member in an instance
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// A simple value (attribute or simple-typed element)
    Value(Value),
    /// An owned inline child instance
    Node(NodeId),
    /// A by-reference association
    Link(Link),
    /// An explicit `xsi:nil`
    Nil,
}

impl Property {
    /// Get the value, if this is a simple value
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Get the child node, if this is an inline child
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Property::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the link, if this is a reference
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Property::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Check if this is an explicit nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Property::Nil)
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<Link> for Property {
    fn from(link: Link) -> Self {
        Property::Link(link)
    }
}

impl From<NodeId> for Property {
    fn from(id: NodeId) -> Self {
        Property::Node(id)
    }
}

/// A typed instance of a schema type
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Element name the instance was read from or is written as
    pub element: QName,
    /// Schema type of the instance
    pub type_name: QName,
    /// Document-unique identifier (the value of its `ID` attribute)
    pub id: Option<String>,
    /// Text content for simple-content types
    pub text: Option<Value>,
    /// Member key to properties, in document order
    pub members: IndexMap<String, Vec<Property>>,
}

impl Instance {
    /// Create an empty instance
    pub fn new(element: QName, type_name: QName) -> Self {
        Self {
            element,
            type_name,
            id: None,
            text: None,
            members: IndexMap::new(),
        }
    }

    /// Set the identifier
    ///
    /// The identifier is also the value of the type's `ID` attribute and
    /// does not need to be pushed as a member.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: Value) -> Self {
        self.text = Some(text);
        self
    }

    /// Append a property to a member
    pub fn with(mut self, key: &str, property: impl Into<Property>) -> Self {
        self.push(key, property);
        self
    }

    /// Append a property to a member
    pub fn push(&mut self, key: &str, property: impl Into<Property>) {
        self.members
            .entry(key.to_string())
            .or_default()
            .push(property.into());
    }

    /// All properties of a member
    pub fn get(&self, key: &str) -> &[Property] {
        self.members.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a member
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).iter().find_map(Property::as_value)
    }

    /// All values of a member
    pub fn values(&self, key: &str) -> Vec<&Value> {
        self.get(key).iter().filter_map(Property::as_value).collect()
    }

    /// Inline children of a member
    pub fn nodes(&self, key: &str) -> Vec<NodeId> {
        self.get(key).iter().filter_map(Property::as_node).collect()
    }

    /// Links of a member
    pub fn links(&self, key: &str) -> Vec<&Link> {
        self.get(key).iter().filter_map(Property::as_link).collect()
    }

    /// Check if a member has at least one property
    pub fn has(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }
}

/// An arena of instances with an id table
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Instance>,
    root: Option<NodeId>,
    ids: HashMap<String, NodeId>,
    dangling: Vec<DanglingReference>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance, registering its id
    pub fn add(&mut self, instance: Instance) -> Result<NodeId> {
        let node = NodeId(self.nodes.len());
        if let Some(id) = &instance.id {
            if self.ids.contains_key(id) {
                return Err(Error::DuplicateId {
                    id: id.clone(),
                    path: ElementPath::new(),
                });
            }
            self.ids.insert(id.clone(), node);
        }
        self.nodes.push(instance);
        Ok(node)
    }

    /// Set the root instance
    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    /// The root instance id
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The root instance
    pub fn root_instance(&self) -> Option<&Instance> {
        self.root.and_then(|node| self.get(node))
    }

    /// Get an instance
    pub fn get(&self, node: NodeId) -> Option<&Instance> {
        self.nodes.get(node.0)
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Option<&mut Instance> {
        self.nodes.get_mut(node.0)
    }

    /// Look up an instance by id
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Follow a link to its target instance
    pub fn follow(&self, link: &Link) -> Option<&Instance> {
        let node = link.target.or_else(|| link.fragment().and_then(|id| self.by_id(id)))?;
        self.get(node)
    }

    /// First inline child of a member
    pub fn child(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.get(node)?.nodes(key).into_iter().next()
    }

    /// Walk member keys from an instance, taking the first inline child at each step
    pub fn select(&self, from: NodeId, keys: &[&str]) -> Option<NodeId> {
        keys.iter().try_fold(from, |node, key| self.child(node, key))
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the document has no instances
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all instances in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Instance)> {
        self.nodes.iter().enumerate().map(|(i, instance)| (NodeId(i), instance))
    }

    /// Same-document links left unresolved by a recording decode
    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }

    pub(crate) fn set_dangling(&mut self, dangling: Vec<DanglingReference>) {
        self.dangling = dangling;
    }

    fn same_tree(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let (Some(left), Some(right)) = (self.get(a), other.get(b)) else {
            return false;
        };
        if left.element != right.element
            || left.type_name != right.type_name
            || left.id != right.id
            || left.text != right.text
            || left.members.len() != right.members.len()
        {
            return false;
        }
        left.members.iter().zip(right.members.iter()).all(|((lk, lp), (rk, rp))| {
            lk == rk
                && lp.len() == rp.len()
                && lp.iter().zip(rp.iter()).all(|pair| match pair {
                    (Property::Value(l), Property::Value(r)) => l == r,
                    (Property::Nil, Property::Nil) => true,
                    (Property::Link(l), Property::Link(r)) => l.same_reference(r),
                    (Property::Node(l), Property::Node(r)) => self.same_tree(*l, other, *r),
                    _ => false,
                })
        })
    }
}

impl Index<NodeId> for Document {
    type Output = Instance;

    fn index(&self, node: NodeId) -> &Instance {
        &self.nodes[node.0]
    }
}

/// Structural equality: same tree of instances from the root, links
/// compared by their XLink attributes, arena positions ignored
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (Some(a), Some(b)) => self.same_tree(a, other, b),
            (None, None) => true,
            _ => false,
        }
    }
}
