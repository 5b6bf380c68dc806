//! Error types for s100gml
//!
//! This module defines the error taxonomy shared by the schema registry,
//! value coercion, the decoder, the encoder and reference resolution.
//! Structural errors carry the [`ElementPath`] of the offending element.

use std::fmt;
use thiserror::Error;

use crate::namespaces::QName;

/// Result type alias using the s100gml [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Sequence of element names from the document root to the current element
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementPath(Vec<String>);

impl ElementPath {
    /// Create an empty path (the document itself)
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an element name
    pub fn push(&mut self, name: impl Into<String>) {
        self.0.push(name.into());
    }

    /// Remove the last element name
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// Return a copy of this path extended by one element name
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(name);
        path
    }

    /// Number of elements in the path
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The element names, root first
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ElementPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The constraining facet that rejected a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    /// Regular expression over the lexical form
    Pattern,
    /// Inclusive lower bound
    MinInclusive,
    /// Inclusive upper bound
    MaxInclusive,
    /// Maximum number of fraction digits
    FractionDigits,
    /// Minimum length (characters, or items for lists)
    MinLength,
    /// Maximum length (characters, or items for lists)
    MaxLength,
    /// The value must not be empty
    Required,
    /// The value must equal the declared constant
    Fixed,
}

impl FacetKind {
    /// XSD name of the facet
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Pattern => "pattern",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::FractionDigits => "fractionDigits",
            FacetKind::MinLength => "minLength",
            FacetKind::MaxLength => "maxLength",
            FacetKind::Required => "required",
            FacetKind::Fixed => "fixed",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A by-reference link whose target is not in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// The raw `xlink:href` value
    pub href: String,
    /// The fragment identifier the link points at
    pub id: String,
    /// Path of the referencing element
    pub path: ElementPath,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at {}", self.id, self.path)
    }
}

fn list_dangling(references: &[DanglingReference]) -> String {
    references
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Main error type for s100gml operations
#[derive(Error, Debug)]
pub enum Error {
    /// A type name is not registered
    #[error("unknown type '{0}'")]
    UnknownType(QName),

    /// A root or substituted element has no global declaration
    #[error("unknown element '{name}' at {path}")]
    UnknownElement {
        /// Element name
        name: QName,
        /// Element path
        path: ElementPath,
    },

    /// An abstract element or type appeared in an instance
    #[error("abstract component '{name}' cannot be instantiated at {path}")]
    Abstract {
        /// Element or type name
        name: QName,
        /// Element path
        path: ElementPath,
    },

    /// A value violates a constraining facet
    #[error("value '{value}' violates the {facet} facet ({constraint}) at {path}")]
    FacetViolation {
        /// The violated facet
        facet: FacetKind,
        /// The offending lexical value
        value: String,
        /// Human readable constraint, e.g. `<= 360`
        constraint: String,
        /// Element path
        path: ElementPath,
    },

    /// A lexical value does not belong to the primitive's lexical space
    #[error("invalid {expected} value '{value}' at {path}")]
    InvalidValue {
        /// The offending lexical value
        value: String,
        /// Name of the expected primitive
        expected: String,
        /// Element path
        path: ElementPath,
    },

    /// An enumeration token matches no declared literal
    #[error("'{literal}' is not a literal of enumeration '{type_name}' at {path}")]
    UnknownEnumerationLiteral {
        /// The offending token
        literal: String,
        /// The enumeration type
        type_name: QName,
        /// Element path
        path: ElementPath,
    },

    /// A required member is absent
    #[error("missing required member '{member}' of '{parent}' at {path}")]
    MissingRequiredElement {
        /// Member name (attributes are prefixed with `@`)
        member: String,
        /// Type declaring the member
        parent: QName,
        /// Element path
        path: ElementPath,
    },

    /// A member occurs more often than its occurs-max
    #[error("member '{member}' occurs more than {max} times at {path}")]
    TooManyOccurrences {
        /// Member name
        member: String,
        /// Declared maximum
        max: u32,
        /// Element path
        path: ElementPath,
    },

    /// A child element matches no declared member at this position
    #[error("unexpected element '{name}' at {path}")]
    UnexpectedElement {
        /// Element name
        name: QName,
        /// Element path
        path: ElementPath,
    },

    /// An attribute is not declared by the element's type
    #[error("unexpected attribute '{name}' at {path}")]
    UnexpectedAttribute {
        /// Attribute name
        name: QName,
        /// Element path
        path: ElementPath,
    },

    /// Character data inside element-only content
    #[error("unexpected text '{text}' at {path}")]
    UnexpectedText {
        /// The text (trimmed)
        text: String,
        /// Element path
        path: ElementPath,
    },

    /// `xsi:nil` on a member that is not nillable
    #[error("member '{member}' is not nillable at {path}")]
    NotNillable {
        /// Member name
        member: String,
        /// Element path
        path: ElementPath,
    },

    /// Two instances carry the same id
    #[error("duplicate id '{id}' at {path}")]
    DuplicateId {
        /// The repeated id
        id: String,
        /// Element path
        path: ElementPath,
    },

    /// One or more same-document links point at missing ids
    #[error("unresolved reference(s): {}", list_dangling(.0))]
    DanglingReference(Vec<DanglingReference>),

    /// A link resolves to an instance of an incompatible type
    #[error("reference '{href}' resolves to '{found}' but '{expected}' is required at {path}")]
    IncompatibleReference {
        /// The raw href
        href: String,
        /// Required target type
        expected: QName,
        /// Actual type of the target
        found: QName,
        /// Element path
        path: ElementPath,
    },

    /// Syntax error reported by the XML tokenizer
    #[error("malformed XML at byte {position}: {message}")]
    MalformedXml {
        /// Tokenizer message
        message: String,
        /// Byte offset in the input
        position: usize,
    },

    /// A resource limit was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A type's extension chain loops back on itself
    #[error("circular derivation through type '{0}'")]
    CircularDerivation(QName),

    /// The schema model itself is inconsistent
    #[error("schema error: {0}")]
    Schema(String),

    /// A geometry violates a GML structural invariant
    #[error("geometry error: {reason} at {path}")]
    Geometry {
        /// What is wrong
        reason: String,
        /// Element path
        path: ElementPath,
    },

    /// An instance cannot be encoded
    #[error("encoding error: {reason} at {path}")]
    Encode {
        /// What is wrong
        reason: String,
        /// Element path
        path: ElementPath,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON schema document error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::MalformedXml`]
    pub fn malformed(message: impl Into<String>, position: usize) -> Self {
        Error::MalformedXml {
            message: message.into(),
            position,
        }
    }

    /// Build an [`Error::Encode`] without a path
    pub fn encode(reason: impl Into<String>) -> Self {
        Error::Encode {
            reason: reason.into(),
            path: ElementPath::new(),
        }
    }

    /// Attach an element path to errors that do not have one yet
    pub fn at_path(mut self, at: &ElementPath) -> Self {
        match &mut self {
            Error::UnknownElement { path, .. }
            | Error::Abstract { path, .. }
            | Error::FacetViolation { path, .. }
            | Error::InvalidValue { path, .. }
            | Error::UnknownEnumerationLiteral { path, .. }
            | Error::MissingRequiredElement { path, .. }
            | Error::TooManyOccurrences { path, .. }
            | Error::UnexpectedElement { path, .. }
            | Error::UnexpectedAttribute { path, .. }
            | Error::UnexpectedText { path, .. }
            | Error::NotNillable { path, .. }
            | Error::DuplicateId { path, .. }
            | Error::IncompatibleReference { path, .. }
            | Error::Geometry { path, .. }
            | Error::Encode { path, .. } => {
                if path.is_empty() {
                    *path = at.clone();
                }
            }
            _ => {}
        }
        self
    }

    /// The element path carried by this error, if any
    pub fn path(&self) -> Option<&ElementPath> {
        match self {
            Error::UnknownElement { path, .. }
            | Error::Abstract { path, .. }
            | Error::FacetViolation { path, .. }
            | Error::InvalidValue { path, .. }
            | Error::UnknownEnumerationLiteral { path, .. }
            | Error::MissingRequiredElement { path, .. }
            | Error::TooManyOccurrences { path, .. }
            | Error::UnexpectedElement { path, .. }
            | Error::UnexpectedAttribute { path, .. }
            | Error::UnexpectedText { path, .. }
            | Error::NotNillable { path, .. }
            | Error::DuplicateId { path, .. }
            | Error::IncompatibleReference { path, .. }
            | Error::Geometry { path, .. }
            | Error::Encode { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Turn a decoding error into an encoding error, keeping the message
    pub(crate) fn into_encode(self, at: &ElementPath) -> Self {
        match self {
            Error::Encode { .. } => self.at_path(at),
            other => Error::Encode {
                reason: other.to_string(),
                path: at.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_path_display() {
        let mut path = ElementPath::new();
        assert_eq!(path.to_string(), "/");

        path.push("Dataset");
        path.push("members");
        assert_eq!(path.to_string(), "/Dataset/members");
        assert_eq!(path.child("LateralBuoy").to_string(), "/Dataset/members/LateralBuoy");
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn test_at_path_fills_only_empty_paths() {
        let err = Error::DuplicateId {
            id: "X".to_string(),
            path: ElementPath::new(),
        };
        let located = err.at_path(&["Dataset", "Point"].into_iter().collect());
        assert_eq!(located.path().unwrap().to_string(), "/Dataset/Point");

        let again = located.at_path(&["Other"].into_iter().collect());
        assert_eq!(again.path().unwrap().to_string(), "/Dataset/Point");
    }

    #[test]
    fn test_dangling_reference_display() {
        let err = Error::DanglingReference(vec![DanglingReference {
            href: "#missing".to_string(),
            id: "missing".to_string(),
            path: ["Dataset", "peer"].into_iter().collect(),
        }]);
        let msg = err.to_string();
        assert!(msg.contains("'missing'"));
        assert!(msg.contains("/Dataset/peer"));
    }

    #[test]
    fn test_facet_violation_display() {
        let err = Error::FacetViolation {
            facet: FacetKind::MaxInclusive,
            value: "400.0".to_string(),
            constraint: "<= 360".to_string(),
            path: ElementPath::new(),
        };
        assert!(err.to_string().contains("maxInclusive"));
    }
}
