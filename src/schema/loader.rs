//! Declarative schema loading
//!
//! A schema set can be described as a JSON document instead of code:
//!
//! ```json
//! {
//!   "namespaces": { "S201": "http://www.iala-aism.org/S-201/gml/1.0" },
//!   "types": [
//!     { "name": "S201:colourType", "kind": "enumeration", "literals": ["White", "Red"] },
//!     { "name": "S201:AtoNType", "kind": "complex", "base": "gml:AbstractFeatureType",
//!       "members": [ { "name": "S201:colour", "type_name": "S201:colourType" } ] }
//!   ],
//!   "elements": [ { "name": "S201:AtoN", "type_name": "S201:AtoNType" } ]
//! }
//! ```
//!
//! Names may be written as `prefix:local` using the declared namespaces,
//! the well-known prefixes (`gml`, `xlink`, `S100`, `S125`, ...), Clark
//! notation, or bare local names. Enumeration literals may be plain
//! strings, in which case the symbolic value is derived from the token.

use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::io::Read;

use super::model::{ElementDecl, EnumLiteral, SchemaType};
use super::registry::TypeRegistry;
use crate::error::Result;
use crate::namespaces::{NamespaceContext, PrefixMap, XS_NAMESPACE};

/// Keys whose string values are qualified names
const QNAME_KEYS: &[&str] = &[
    "name",
    "type_name",
    "base",
    "simple_content",
    "substitution_group",
    "target",
];

/// A schema set described declaratively
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    /// Prefix to namespace bindings used by names in this document
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    /// Namespace of unprefixed names
    #[serde(default)]
    pub default_namespace: Option<String>,
    /// Type definitions
    #[serde(default)]
    pub types: Vec<SchemaType>,
    /// Global element declarations
    #[serde(default)]
    pub elements: Vec<ElementDecl>,
}

impl SchemaDocument {
    /// Parse a schema document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Json = serde_json::from_str(json)?;
        Self::from_value(raw)
    }

    /// Parse a schema document from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: Json = serde_json::from_reader(reader)?;
        Self::from_value(raw)
    }

    fn from_value(mut raw: Json) -> Result<Self> {
        let context = namespace_context(&raw);
        expand(&mut raw, &context)?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Add the document's prefixes, types and elements to a registry
    pub fn install(self, registry: &mut TypeRegistry) -> Result<()> {
        for (prefix, namespace) in &self.namespaces {
            if registry.prefixes().get(namespace).is_none() {
                registry.declare_prefix(prefix, namespace)?;
            }
        }
        for schema_type in self.types {
            registry.register(schema_type)?;
        }
        for element in self.elements {
            registry.register_element(element)?;
        }
        Ok(())
    }
}

impl TypeRegistry {
    /// Build a registry from a JSON schema document and check its integrity
    pub fn from_json(json: &str) -> Result<Self> {
        let mut registry = TypeRegistry::new();
        registry.load_json(json)?;
        Ok(registry)
    }

    /// Extend this registry with a JSON schema document and re-check it
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let document = SchemaDocument::from_json(json)?;
        tracing::debug!(
            types = document.types.len(),
            elements = document.elements.len(),
            "loading schema document"
        );
        document.install(self)?;
        self.check()
    }
}

fn namespace_context(raw: &Json) -> NamespaceContext {
    let mut context = NamespaceContext::new();
    for (namespace, prefix) in PrefixMap::well_known().iter() {
        context.add_prefix(prefix, namespace);
    }
    context.add_prefix("xs", XS_NAMESPACE);
    if let Some(Json::Object(bindings)) = raw.get("namespaces") {
        for (prefix, namespace) in bindings {
            if let Json::String(namespace) = namespace {
                context.add_prefix(prefix.as_str(), namespace.as_str());
            }
        }
    }
    if let Some(Json::String(namespace)) = raw.get("default_namespace") {
        context.set_default_namespace(namespace.as_str());
    }
    context
}

/// Rewrite qualified names to Clark notation and literal shorthands to objects
fn expand(node: &mut Json, context: &NamespaceContext) -> Result<()> {
    match node {
        Json::Object(map) => {
            for (key, value) in map.iter_mut() {
                if QNAME_KEYS.contains(&key.as_str()) {
                    if let Json::String(name) = value {
                        let resolved = context.resolve(name)?;
                        *name = resolved.to_string();
                        continue;
                    }
                }
                if key == "literals" {
                    if let Json::Array(items) = value {
                        for item in items.iter_mut() {
                            let literal = match item {
                                Json::String(token) => EnumLiteral::from_literal(token.as_str()),
                                _ => continue,
                            };
                            *item = serde_json::to_value(literal)?;
                        }
                        continue;
                    }
                }
                expand(value, context)?;
            }
        }
        Json::Array(items) => {
            for item in items {
                expand(item, context)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::namespaces::{QName, GML_NAMESPACE};
    use crate::schema::model::{MemberKind, Occurs, Primitive};

    const SCHEMA: &str = r#"{
        "namespaces": { "ex": "http://example.com/ex" },
        "types": [
            { "name": "ex:string", "kind": "simple", "primitive": "string" },
            { "name": "ex:mmsi", "kind": "simple", "primitive": "token",
              "facets": { "pattern": "[0-9]{9}" } },
            { "name": "ex:colour", "kind": "enumeration",
              "literals": ["White", { "literal": "Light Grey", "value": "LightGrey" }] },
            { "name": "ex:BuoyType", "kind": "complex",
              "members": [
                { "name": "gml:id", "kind": "attribute", "type_name": "ex:string",
                  "occurs": { "min": 1, "max": 1 } },
                { "name": "ex:colour", "type_name": "ex:colour",
                  "occurs": { "min": 1, "max": null } },
                { "name": "ex:mmsi", "type_name": "ex:mmsi",
                  "occurs": { "min": 0, "max": 1 } }
              ] }
        ],
        "elements": [ { "name": "ex:Buoy", "type_name": "ex:BuoyType" } ]
    }"#;

    #[test]
    fn test_load_registry_from_json() {
        let registry = TypeRegistry::from_json(SCHEMA).unwrap();
        assert_eq!(registry.type_count(), 4);
        assert_eq!(registry.element_count(), 1);
        assert_eq!(registry.prefixes().get("http://example.com/ex"), Some("ex"));

        let buoy = QName::namespaced("http://example.com/ex", "BuoyType");
        let members = registry.effective_members(&buoy).unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].kind, MemberKind::Attribute);
        assert_eq!(members[0].name, QName::namespaced(GML_NAMESPACE, "id"));
        assert_eq!(members[1].occurs, Occurs::one_or_more());

        let mmsi = registry
            .resolve(&QName::namespaced("http://example.com/ex", "mmsi"))
            .unwrap();
        assert_eq!(mmsi.primitive(), Some(Primitive::Token));
    }

    #[test]
    fn test_literal_shorthand() {
        let registry = TypeRegistry::from_json(SCHEMA).unwrap();
        let colour = registry
            .resolve(&QName::namespaced("http://example.com/ex", "colour"))
            .unwrap()
            .as_enumeration()
            .unwrap();
        assert_eq!(colour.literals[0], EnumLiteral::new("White", "White"));
        assert_eq!(colour.by_literal("Light Grey").unwrap().value, "LightGrey");
    }

    #[test]
    fn test_unknown_prefix_fails() {
        let json = r#"{ "types": [ { "name": "nope:T", "kind": "complex" } ] }"#;
        assert!(matches!(TypeRegistry::from_json(json), Err(Error::Schema(_))));
    }

    #[test]
    fn test_dangling_type_reference_fails_check() {
        let json = r#"{ "elements": [ { "name": "Root", "type_name": "Missing" } ] }"#;
        assert!(matches!(TypeRegistry::from_json(json), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(TypeRegistry::from_json("{"), Err(Error::Json(_))));
    }
}
