//! Schema model components
//!
//! In-memory representation of the simplified XSD used by GML application
//! schemas: named simple, enumeration and complex types, their member
//! declarations, and global element declarations with substitution groups.

use serde::{Deserialize, Serialize};

use super::facets::Facets;
use crate::namespaces::QName;

/// Occurrence bounds for a member (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this member may be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if the member is required (minOccurs >= 1)
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Check if member has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Check if occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count > max,
            None => false,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Primitive value spaces of simple types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    /// xs:string (whitespace preserved)
    String,
    /// xs:token (whitespace collapsed)
    Token,
    /// xs:boolean
    Boolean,
    /// xs:integer and its derived types
    Integer,
    /// xs:decimal
    Decimal,
    /// xs:double
    Double,
    /// xs:date
    Date,
    /// xs:dateTime
    DateTime,
    /// xs:anyURI
    #[serde(rename = "anyURI")]
    AnyUri,
    /// xs:ID, the identity of the enclosing instance
    #[serde(rename = "ID")]
    Id,
    /// Whitespace separated list of tokens
    TokenList,
    /// Whitespace separated list of doubles (gml:doubleList)
    DoubleList,
}

impl Primitive {
    /// XSD name of the primitive
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Token => "token",
            Primitive::Boolean => "boolean",
            Primitive::Integer => "integer",
            Primitive::Decimal => "decimal",
            Primitive::Double => "double",
            Primitive::Date => "date",
            Primitive::DateTime => "dateTime",
            Primitive::AnyUri => "anyURI",
            Primitive::Id => "ID",
            Primitive::TokenList => "token list",
            Primitive::DoubleList => "double list",
        }
    }

    /// Whether lexical values are whitespace-collapsed before parsing
    pub fn collapses_whitespace(&self) -> bool {
        !matches!(self, Primitive::String)
    }

    /// Whether the value space is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Primitive::TokenList | Primitive::DoubleList)
    }
}

/// A simple type: a primitive restricted by facets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleType {
    /// Underlying primitive
    pub primitive: Primitive,
    /// Constraining facets
    #[serde(default)]
    pub facets: Facets,
}

impl SimpleType {
    /// Create an unrestricted simple type
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            facets: Facets::default(),
        }
    }

    /// Set the facets
    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }
}

/// One (literal-token, value) pair of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumLiteral {
    /// Token as it appears in XML
    pub literal: String,
    /// Symbolic value
    pub value: String,
}

impl EnumLiteral {
    /// Create a literal with an explicit symbolic value
    pub fn new(literal: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            value: value.into(),
        }
    }

    /// Create a literal whose value is the UpperCamelCase form of the token,
    /// e.g. `Port-Hand Lateral Mark` becomes `PortHandLateralMark`
    pub fn from_literal(literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let value = literal
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect();
        Self { literal, value }
    }
}

/// An enumeration: an ordered set of literals
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumerationType {
    /// Declared literals in declaration order
    pub literals: Vec<EnumLiteral>,
}

impl EnumerationType {
    /// Create an enumeration from literal tokens
    pub fn from_literals<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            literals: literals.into_iter().map(EnumLiteral::from_literal).collect(),
        }
    }

    /// Look up a literal by its XML token
    pub fn by_literal(&self, token: &str) -> Option<&EnumLiteral> {
        self.literals.iter().find(|l| l.literal == token)
    }

    /// Look up a literal by its symbolic value
    pub fn by_value(&self, value: &str) -> Option<&EnumLiteral> {
        self.literals.iter().find(|l| l.value == value)
    }
}

/// Kind of a complex type member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    /// A child element
    #[default]
    Element,
    /// An attribute
    Attribute,
    /// Any globally declared element, optionally limited to one namespace
    Wildcard,
}

/// Member declaration of a complex type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    /// Element or attribute name; for wildcards the local name is the member
    /// key and the namespace restricts the accepted elements
    pub name: QName,
    /// Kind of member
    #[serde(default)]
    pub kind: MemberKind,
    /// Declared type (None only for wildcards)
    #[serde(default)]
    pub type_name: Option<QName>,
    /// Occurrence bounds
    #[serde(default)]
    pub occurs: Occurs,
    /// Whether `xsi:nil` is allowed
    #[serde(default)]
    pub nillable: bool,
    /// Whether the member may be given as an `xlink:href` link
    #[serde(default)]
    pub by_reference: bool,
    /// Required type of link targets (None accepts any identified instance)
    #[serde(default)]
    pub target: Option<QName>,
    /// Default value for absent attributes
    #[serde(default)]
    pub default: Option<String>,
    /// Constant value the member must carry
    #[serde(default)]
    pub fixed: Option<String>,
}

impl MemberDecl {
    fn with_kind(kind: MemberKind, name: QName, type_name: Option<QName>, occurs: Occurs) -> Self {
        Self {
            name,
            kind,
            type_name,
            occurs,
            nillable: false,
            by_reference: false,
            target: None,
            default: None,
            fixed: None,
        }
    }

    /// Declare a required single child element
    pub fn element(name: QName, type_name: QName) -> Self {
        Self::with_kind(MemberKind::Element, name, Some(type_name), Occurs::once())
    }

    /// Declare an optional attribute
    pub fn attribute(name: QName, type_name: QName) -> Self {
        Self::with_kind(MemberKind::Attribute, name, Some(type_name), Occurs::optional())
    }

    /// Declare a wildcard accepting any global element of `namespace`
    /// (any namespace when None), stored under `key`
    pub fn wildcard(key: impl Into<String>, namespace: Option<&str>) -> Self {
        Self::with_kind(
            MemberKind::Wildcard,
            QName::new(namespace, key),
            None,
            Occurs::zero_or_more(),
        )
    }

    /// Set the occurrence bounds
    pub fn occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Make the member optional (0..1)
    pub fn optional(self) -> Self {
        self.occurs(Occurs::optional())
    }

    /// Make the member required (for attributes)
    pub fn required(mut self) -> Self {
        self.occurs.min = self.occurs.min.max(1);
        self
    }

    /// Allow any number of occurrences (0..unbounded)
    pub fn many(self) -> Self {
        self.occurs(Occurs::zero_or_more())
    }

    /// Allow `xsi:nil`
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    /// Allow the member to be given by reference to an instance of `target`
    pub fn by_reference(mut self, target: Option<QName>) -> Self {
        self.by_reference = true;
        self.target = target;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the fixed value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.fixed = Some(value.into());
        self
    }

    /// Key under which instances store this member's properties
    pub fn key(&self) -> &str {
        &self.name.local_name
    }

    /// Whether this member is an attribute
    pub fn is_attribute(&self) -> bool {
        self.kind == MemberKind::Attribute
    }

    /// Display name used in diagnostics (`@name` for attributes)
    pub fn display_name(&self) -> String {
        match self.kind {
            MemberKind::Attribute => format!("@{}", self.name.local_name),
            _ => self.name.local_name.clone(),
        }
    }
}

/// A complex type: ordered members with an optional extension base
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplexType {
    /// Base type this type extends
    #[serde(default)]
    pub base: Option<QName>,
    /// Abstract types cannot be instantiated
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Members declared by this type (inherited members excluded)
    #[serde(default)]
    pub members: Vec<MemberDecl>,
    /// Simple type of the text content, for complex types with simple content
    #[serde(default)]
    pub simple_content: Option<QName>,
}

impl ComplexType {
    /// Create an empty complex type
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extension base
    pub fn extends(mut self, base: QName) -> Self {
        self.base = Some(base);
        self
    }

    /// Mark the type abstract
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Append a member declaration
    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    /// Give the type simple content of the named simple type
    pub fn with_simple_content(mut self, type_name: QName) -> Self {
        self.simple_content = Some(type_name);
        self
    }
}

/// The three kinds of schema types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeKind {
    /// Primitive restricted by facets
    Simple(SimpleType),
    /// Closed set of literals
    Enumeration(EnumerationType),
    /// Record of members
    Complex(ComplexType),
}

/// A named schema type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaType {
    /// Qualified type name
    pub name: QName,
    /// Kind-specific definition
    #[serde(flatten)]
    pub kind: TypeKind,
}

impl SchemaType {
    /// Create a simple type
    pub fn simple(name: QName, simple: SimpleType) -> Self {
        Self {
            name,
            kind: TypeKind::Simple(simple),
        }
    }

    /// Create an enumeration type
    pub fn enumeration(name: QName, enumeration: EnumerationType) -> Self {
        Self {
            name,
            kind: TypeKind::Enumeration(enumeration),
        }
    }

    /// Create a complex type
    pub fn complex(name: QName, complex: ComplexType) -> Self {
        Self {
            name,
            kind: TypeKind::Complex(complex),
        }
    }

    /// Get the complex definition, if any
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match &self.kind {
            TypeKind::Complex(complex) => Some(complex),
            _ => None,
        }
    }

    /// Get the simple definition, if any
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match &self.kind {
            TypeKind::Simple(simple) => Some(simple),
            _ => None,
        }
    }

    /// Get the enumeration definition, if any
    pub fn as_enumeration(&self) -> Option<&EnumerationType> {
        match &self.kind {
            TypeKind::Enumeration(enumeration) => Some(enumeration),
            _ => None,
        }
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, TypeKind::Complex(_))
    }

    /// Simple and enumeration types carry their value as text
    pub fn is_simple(&self) -> bool {
        !self.is_complex()
    }

    /// Primitive of a simple type (`Token` for enumerations)
    pub fn primitive(&self) -> Option<Primitive> {
        match &self.kind {
            TypeKind::Simple(simple) => Some(simple.primitive),
            TypeKind::Enumeration(_) => Some(Primitive::Token),
            TypeKind::Complex(_) => None,
        }
    }
}

/// A global element declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDecl {
    /// Element name
    pub name: QName,
    /// Element type
    pub type_name: QName,
    /// Head of the substitution group this element belongs to
    #[serde(default)]
    pub substitution_group: Option<QName>,
    /// Abstract elements only appear through substitution
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Whether `xsi:nil` is allowed
    #[serde(default)]
    pub nillable: bool,
}

impl ElementDecl {
    /// Declare a global element
    pub fn new(name: QName, type_name: QName) -> Self {
        Self {
            name,
            type_name,
            substitution_group: None,
            is_abstract: false,
            nillable: false,
        }
    }

    /// Make the element a member of `head`'s substitution group
    pub fn substitutes(mut self, head: QName) -> Self {
        self.substitution_group = Some(head);
        self
    }

    /// Mark the element abstract
    pub fn abstract_element(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs() {
        let once = Occurs::once();
        assert!(once.is_required());
        assert!(once.is_missing(0));
        assert!(once.is_over(1));
        assert!(!once.is_exceeded(1));
        assert!(once.is_exceeded(2));

        let many = Occurs::zero_or_more();
        assert!(many.is_emptiable());
        assert!(!many.is_over(1000));
    }

    #[test]
    fn test_enum_literal_value_derivation() {
        let literal = EnumLiteral::from_literal("Port-Hand Lateral Mark");
        assert_eq!(literal.literal, "Port-Hand Lateral Mark");
        assert_eq!(literal.value, "PortHandLateralMark");

        assert_eq!(EnumLiteral::from_literal("oceans").value, "Oceans");
        assert_eq!(EnumLiteral::from_literal("Can (Cylindrical)").value, "CanCylindrical");
    }

    #[test]
    fn test_enumeration_lookup() {
        let colours = EnumerationType::from_literals(["White", "Black", "Red"]);
        assert!(colours.by_literal("Red").is_some());
        assert!(colours.by_literal("Puce").is_none());
        assert_eq!(colours.by_value("Black").unwrap().literal, "Black");
    }

    #[test]
    fn test_member_builders() {
        let member = MemberDecl::element(QName::local("peer"), QName::local("ReferenceType"))
            .many()
            .by_reference(Some(QName::local("AidsToNavigationType")));
        assert!(member.by_reference);
        assert_eq!(member.occurs, Occurs::zero_or_more());
        assert_eq!(member.key(), "peer");

        let attr = MemberDecl::attribute(QName::local("uom"), QName::local("string")).required();
        assert!(attr.is_attribute());
        assert_eq!(attr.occurs, Occurs::once());
        assert_eq!(attr.display_name(), "@uom");
    }

    #[test]
    fn test_schema_type_kinds() {
        let simple = SchemaType::simple(QName::local("s"), SimpleType::new(Primitive::Double));
        assert!(simple.is_simple());
        assert_eq!(simple.primitive(), Some(Primitive::Double));

        let complex = SchemaType::complex(QName::local("c"), ComplexType::new().abstract_type());
        assert!(complex.is_complex());
        assert!(complex.as_complex().unwrap().is_abstract);
        assert_eq!(complex.primitive(), None);
    }
}
