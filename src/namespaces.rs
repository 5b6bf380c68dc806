//! XML namespace handling
//!
//! This module provides qualified names (QNames), prefix resolution for
//! schema documents, and the prefix map used when encoding.

use crate::error::{Error, Result};
use crate::names::is_valid_ncname;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// GML 3.2 namespace
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";

/// XLink namespace
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace, home of the built-in datatypes
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// S-100 GML profile namespace (Part 10b, edition 5.0)
pub const S100_NAMESPACE: &str = "http://www.iho.int/s100gml/5.0";

/// S-125 Marine Aids to Navigation namespace
pub const S125_NAMESPACE: &str = "http://www.iho.int/S125/gml/cs0/1.0";

/// S-201 Aids to Navigation Information namespace
pub const S201_NAMESPACE: &str = "http://www.iala-aism.org/S-201/gml/1.0";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
///
/// Displays and serializes in Clark notation: `{namespace}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Namespace URI as a string slice
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check if the name belongs to the given namespace
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

impl FromStr for QName {
    type Err = Error;

    /// Parse Clark notation (`{uri}local`) or a bare local name
    fn from_str(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix('{') {
            let (namespace, local) = rest
                .split_once('}')
                .ok_or_else(|| Error::Schema(format!("unterminated namespace in '{}'", s)))?;
            if !is_valid_ncname(local) {
                return Err(Error::Schema(format!("invalid local name in '{}'", s)));
            }
            let namespace = (!namespace.is_empty()).then(|| namespace.to_string());
            Ok(QName::new(namespace, local))
        } else if is_valid_ncname(s) {
            Ok(QName::local(s))
        } else {
            Err(Error::Schema(format!("invalid qualified name '{}'", s)))
        }
    }
}

impl TryFrom<String> for QName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<QName> for String {
    fn from(qname: QName) -> Self {
        qname.to_string()
    }
}

/// Namespace context for resolving prefixed names in schema documents
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Resolve `prefix:local`, Clark notation or a bare name to a QName
    pub fn resolve(&self, name: &str) -> Result<QName> {
        if name.starts_with('{') {
            return name.parse();
        }
        if let Some((prefix, local)) = name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Schema(format!("unknown prefix '{}' in '{}'", prefix, name)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.default_namespace.clone(), name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Namespace URI to prefix assignments used by the encoder
///
/// Prefixes are fixed per namespace; namespaces without an assignment get
/// generated `ns1`, `ns2`, ... prefixes on first use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    by_namespace: IndexMap<NamespaceUri, Prefix>,
    generated: usize,
}

impl PrefixMap {
    /// Create an empty prefix map
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix map with the customary GML, XLink, XSI and S-100 family prefixes
    pub fn well_known() -> Self {
        let mut map = Self::new();
        for (prefix, namespace) in [
            ("gml", GML_NAMESPACE),
            ("xlink", XLINK_NAMESPACE),
            ("xsi", XSI_NAMESPACE),
            ("S100", S100_NAMESPACE),
            ("S125", S125_NAMESPACE),
            ("S201", S201_NAMESPACE),
        ] {
            map.by_namespace.insert(namespace.to_string(), prefix.to_string());
        }
        map
    }

    /// Assign a prefix to a namespace, replacing any earlier assignment
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Result<()> {
        let prefix = prefix.into();
        let namespace = namespace.into();
        if !is_valid_ncname(&prefix) || prefix.to_ascii_lowercase().starts_with("xml") {
            return Err(Error::Schema(format!("invalid namespace prefix '{}'", prefix)));
        }
        if let Some(owner) = self.namespace_of(&prefix) {
            if owner != namespace {
                return Err(Error::Schema(format!(
                    "prefix '{}' is already bound to '{}'",
                    prefix, owner
                )));
            }
        }
        self.by_namespace.insert(namespace, prefix);
        Ok(())
    }

    /// Get the prefix assigned to a namespace
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.by_namespace.get(namespace).map(|s| s.as_str())
    }

    /// Get the namespace bound to a prefix
    pub fn namespace_of(&self, prefix: &str) -> Option<&str> {
        self.by_namespace
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(ns, _)| ns.as_str())
    }

    /// Get the prefix for a namespace, generating one if none is assigned
    pub fn prefix_for(&mut self, namespace: &str) -> String {
        if let Some(prefix) = self.get(namespace) {
            return prefix.to_string();
        }
        let prefix = loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if self.namespace_of(&candidate).is_none() {
                break candidate;
            }
        };
        self.by_namespace.insert(namespace.to_string(), prefix.clone());
        prefix
    }

    /// Merge assignments from another map; existing assignments win
    pub fn merge(&mut self, other: &PrefixMap) {
        for (namespace, prefix) in other.iter() {
            if self.get(namespace).is_none() && self.namespace_of(prefix).is_none() {
                self.by_namespace.insert(namespace.to_string(), prefix.to_string());
            }
        }
    }

    /// Iterate over (namespace, prefix) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_namespace.iter().map(|(ns, p)| (ns.as_str(), p.as_str()))
    }

    /// Format a QName as `prefix:local` (unprefixed when it has no namespace)
    pub fn qualify(&mut self, qname: &QName) -> String {
        match qname.namespace() {
            Some(ns) => format!("{}:{}", self.prefix_for(ns), qname.local_name),
            None => qname.local_name.clone(),
        }
    }
}
