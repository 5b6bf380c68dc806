//! Type registry
//!
//! The registry holds every named type and global element of a schema set.
//! It is built once (programmatically, from bundled profiles or from JSON)
//! and then shared read-only by any number of decoders and encoders.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::model::{ElementDecl, MemberDecl, MemberKind, SchemaType, TypeKind};
use crate::error::{ElementPath, Error, Result};
use crate::names::validate_ncname;
use crate::namespaces::{PrefixMap, QName};

/// Registry of schema types and global element declarations
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// Types by qualified name, in registration order
    types: IndexMap<QName, SchemaType>,
    /// Global elements by qualified name, in registration order
    elements: IndexMap<QName, ElementDecl>,
    /// Preferred prefixes for the namespaces of this schema set
    prefixes: PrefixMap,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a name can only be registered once
    pub fn register(&mut self, schema_type: SchemaType) -> Result<()> {
        validate_ncname(&schema_type.name.local_name)?;
        if self.types.contains_key(&schema_type.name) {
            return Err(Error::Schema(format!(
                "type '{}' is already registered",
                schema_type.name
            )));
        }
        tracing::trace!(name = %schema_type.name, "registering type");
        self.types.insert(schema_type.name.clone(), schema_type);
        Ok(())
    }

    /// Register a global element declaration
    pub fn register_element(&mut self, element: ElementDecl) -> Result<()> {
        validate_ncname(&element.name.local_name)?;
        if self.elements.contains_key(&element.name) {
            return Err(Error::Schema(format!(
                "element '{}' is already declared",
                element.name
            )));
        }
        tracing::trace!(name = %element.name, "registering element");
        self.elements.insert(element.name.clone(), element);
        Ok(())
    }

    /// Record the preferred prefix of a namespace
    pub fn declare_prefix(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.prefixes.insert(prefix, namespace)
    }

    /// Preferred prefixes declared for this schema set
    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// Look up a type by name
    pub fn get_type(&self, name: &QName) -> Option<&SchemaType> {
        self.types.get(name)
    }

    /// Resolve a type by name
    pub fn resolve(&self, name: &QName) -> Result<&SchemaType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.clone()))
    }

    /// Look up a global element by name
    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Resolve a global element by name
    pub fn resolve_element(&self, name: &QName) -> Result<&ElementDecl> {
        self.elements.get(name).ok_or_else(|| Error::UnknownElement {
            name: name.clone(),
            path: ElementPath::new(),
        })
    }

    /// Iterate over registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.values()
    }

    /// Iterate over global elements in registration order
    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }

    /// Number of registered types
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of global elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// The extension chain of a type, root ancestor first, the type itself last
    pub fn base_chain(&self, name: &QName) -> Result<Vec<&SchemaType>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);

        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                return Err(Error::CircularDerivation(type_name.clone()));
            }
            let schema_type = self.resolve(type_name)?;
            chain.push(schema_type);
            current = schema_type.as_complex().and_then(|c| c.base.as_ref());
        }

        chain.reverse();
        Ok(chain)
    }

    /// All members of a type, ancestors' members first, each in declaration order
    ///
    /// Simple and enumeration types have no members.
    pub fn effective_members(&self, name: &QName) -> Result<Vec<&MemberDecl>> {
        Ok(self
            .base_chain(name)?
            .into_iter()
            .filter_map(|t| t.as_complex())
            .flat_map(|c| c.members.iter())
            .collect())
    }

    /// Element-like members (elements and wildcards) in effective order
    pub fn content_members(&self, name: &QName) -> Result<Vec<&MemberDecl>> {
        Ok(self
            .effective_members(name)?
            .into_iter()
            .filter(|m| m.kind != MemberKind::Attribute)
            .collect())
    }

    /// Attribute members in effective order
    pub fn attribute_members(&self, name: &QName) -> Result<Vec<&MemberDecl>> {
        Ok(self
            .effective_members(name)?
            .into_iter()
            .filter(|m| m.kind == MemberKind::Attribute)
            .collect())
    }

    /// The simple type carried as text by a type
    ///
    /// Simple and enumeration types carry themselves; complex types carry the
    /// nearest declared simple content along their extension chain, if any.
    pub fn text_type(&self, name: &QName) -> Result<Option<&SchemaType>> {
        let chain = self.base_chain(name)?;
        let Some(last) = chain.last() else {
            return Ok(None);
        };
        if last.is_simple() {
            return Ok(Some(last));
        }
        match chain
            .iter()
            .rev()
            .find_map(|t| t.as_complex().and_then(|c| c.simple_content.as_ref()))
        {
            Some(content) => self.resolve(content).map(Some),
            None => Ok(None),
        }
    }

    /// Check if a type is declared abstract
    pub fn is_abstract(&self, name: &QName) -> Result<bool> {
        Ok(self
            .resolve(name)?
            .as_complex()
            .map(|c| c.is_abstract)
            .unwrap_or(false))
    }

    /// Elements that may stand in for `head`, transitively, in registration order
    ///
    /// The head itself is not included.
    pub fn substitution_group_members(&self, head: &QName) -> Vec<&ElementDecl> {
        self.elements
            .values()
            .filter(|e| &e.name != head && self.is_substitutable(&e.name, head))
            .collect()
    }

    /// Check if `element` is `head` or a (transitive) member of its substitution group
    pub fn is_substitutable(&self, element: &QName, head: &QName) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(element);
        while let Some(name) = current {
            if name == head {
                return true;
            }
            if !seen.insert(name) {
                return false;
            }
            current = self
                .elements
                .get(name)
                .and_then(|e| e.substitution_group.as_ref());
        }
        false
    }

    /// Check if `derived` is `base` or extends it (transitively)
    pub fn derives_from(&self, derived: &QName, base: &QName) -> bool {
        match self.base_chain(derived) {
            Ok(chain) => chain.iter().any(|t| &t.name == base),
            Err(_) => false,
        }
    }

    /// Check the integrity of the registry
    ///
    /// Every referenced type, base, target and substitution-group head must
    /// exist, attributes and simple content must be simple types, and no
    /// extension or substitution chain may loop. Instances store members
    /// by local name, so the members a type inherits and declares must have
    /// distinct local names.
    pub fn check(&self) -> Result<()> {
        for schema_type in self.types.values() {
            let TypeKind::Complex(complex) = &schema_type.kind else {
                continue;
            };
            self.base_chain(&schema_type.name)?;
            if let Some(base) = &complex.base {
                if !self.resolve(base)?.is_complex() {
                    return Err(Error::Schema(format!(
                        "'{}' extends simple type '{}'",
                        schema_type.name, base
                    )));
                }
            }
            if let Some(content) = &complex.simple_content {
                if !self.resolve(content)?.is_simple() {
                    return Err(Error::Schema(format!(
                        "simple content of '{}' is not a simple type",
                        schema_type.name
                    )));
                }
            }
            for member in &complex.members {
                self.check_member(&schema_type.name, member)?;
            }
            self.check_member_keys(&schema_type.name)?;
        }

        for element in self.elements.values() {
            self.resolve(&element.type_name)?;
            if let Some(head) = &element.substitution_group {
                let head_decl = self.elements.get(head).ok_or_else(|| {
                    Error::Schema(format!(
                        "substitution group head '{}' of '{}' is not declared",
                        head, element.name
                    ))
                })?;
                if self.is_substitutable(&head_decl.name, &element.name) {
                    return Err(Error::Schema(format!(
                        "circular substitution group through '{}'",
                        element.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_member_keys(&self, owner: &QName) -> Result<()> {
        let mut seen: HashMap<&str, &QName> = HashMap::new();
        for member in self.effective_members(owner)? {
            if let Some(previous) = seen.insert(member.key(), &member.name) {
                return Err(Error::Schema(format!(
                    "members '{}' and '{}' of '{}' share the local name '{}'",
                    previous,
                    member.name,
                    owner,
                    member.key()
                )));
            }
        }
        Ok(())
    }

    fn check_member(&self, owner: &QName, member: &MemberDecl) -> Result<()> {
        match member.kind {
            MemberKind::Wildcard => {}
            MemberKind::Attribute => {
                let type_name = member.type_name.as_ref().ok_or_else(|| {
                    Error::Schema(format!("attribute '{}' of '{}' has no type", member.key(), owner))
                })?;
                if !self.resolve(type_name)?.is_simple() {
                    return Err(Error::Schema(format!(
                        "attribute '{}' of '{}' has complex type '{}'",
                        member.key(),
                        owner,
                        type_name
                    )));
                }
            }
            MemberKind::Element => {
                let type_name = member.type_name.as_ref().ok_or_else(|| {
                    Error::Schema(format!("element '{}' of '{}' has no type", member.key(), owner))
                })?;
                self.resolve(type_name)?;
            }
        }
        if let Some(target) = &member.target {
            self.resolve(target)?;
        }
        if let Some(max) = member.occurs.max {
            if max < member.occurs.min {
                return Err(Error::Schema(format!(
                    "member '{}' of '{}' has maxOccurs {} below minOccurs {}",
                    member.key(),
                    owner,
                    max,
                    member.occurs.min
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{ComplexType, EnumerationType, Primitive, SimpleType};

    fn name(local: &str) -> QName {
        QName::namespaced("http://example.com/test", local)
    }

    fn sample() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(SchemaType::simple(name("string"), SimpleType::new(Primitive::String)))
            .unwrap();
        registry
            .register(SchemaType::enumeration(
                name("ColourType"),
                EnumerationType::from_literals(["White", "Red"]),
            ))
            .unwrap();
        registry
            .register(SchemaType::complex(
                name("BaseType"),
                ComplexType::new()
                    .abstract_type()
                    .member(MemberDecl::attribute(name("id"), name("string")))
                    .member(MemberDecl::element(name("a"), name("string"))),
            ))
            .unwrap();
        registry
            .register(SchemaType::complex(
                name("MiddleType"),
                ComplexType::new()
                    .extends(name("BaseType"))
                    .member(MemberDecl::element(name("b"), name("string"))),
            ))
            .unwrap();
        registry
            .register(SchemaType::complex(
                name("LeafType"),
                ComplexType::new()
                    .extends(name("MiddleType"))
                    .member(MemberDecl::element(name("colour"), name("ColourType")).many()),
            ))
            .unwrap();
        registry
            .register_element(ElementDecl::new(name("Base"), name("BaseType")).abstract_element())
            .unwrap();
        registry
            .register_element(ElementDecl::new(name("Middle"), name("MiddleType")).substitutes(name("Base")))
            .unwrap();
        registry
            .register_element(ElementDecl::new(name("Leaf"), name("LeafType")).substitutes(name("Middle")))
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = sample();
        let err = registry
            .register(SchemaType::simple(name("string"), SimpleType::new(Primitive::Token)))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));

        let err = registry
            .register(SchemaType::simple(name("1stType"), SimpleType::new(Primitive::Token)))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(ref message) if message.contains("NCName")));
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = sample();
        assert!(registry.resolve(&name("LeafType")).is_ok());
        assert!(matches!(
            registry.resolve(&name("Nope")),
            Err(Error::UnknownType(ref n)) if n == &name("Nope")
        ));
    }

    #[test]
    fn test_base_chain_root_first() {
        let registry = sample();
        let chain: Vec<_> = registry
            .base_chain(&name("LeafType"))
            .unwrap()
            .iter()
            .map(|t| t.name.local_name.clone())
            .collect();
        assert_eq!(chain, vec!["BaseType", "MiddleType", "LeafType"]);
    }

    #[test]
    fn test_effective_members_order() {
        let registry = sample();
        let members: Vec<_> = registry
            .effective_members(&name("LeafType"))
            .unwrap()
            .iter()
            .map(|m| m.key().to_string())
            .collect();
        assert_eq!(members, vec!["id", "a", "b", "colour"]);

        let content: Vec<_> = registry
            .content_members(&name("LeafType"))
            .unwrap()
            .iter()
            .map(|m| m.key().to_string())
            .collect();
        assert_eq!(content, vec!["a", "b", "colour"]);
    }

    #[test]
    fn test_circular_derivation() {
        let mut registry = TypeRegistry::new();
        registry
            .register(SchemaType::complex(name("A"), ComplexType::new().extends(name("B"))))
            .unwrap();
        registry
            .register(SchemaType::complex(name("B"), ComplexType::new().extends(name("A"))))
            .unwrap();
        assert!(matches!(
            registry.base_chain(&name("A")),
            Err(Error::CircularDerivation(_))
        ));
        assert!(registry.check().is_err());
    }

    #[test]
    fn test_substitution_group_is_transitive() {
        let registry = sample();
        let members: Vec<_> = registry
            .substitution_group_members(&name("Base"))
            .iter()
            .map(|e| e.name.local_name.clone())
            .collect();
        assert_eq!(members, vec!["Middle", "Leaf"]);
        assert!(registry.is_substitutable(&name("Leaf"), &name("Base")));
        assert!(!registry.is_substitutable(&name("Base"), &name("Leaf")));
    }

    #[test]
    fn test_derives_from() {
        let registry = sample();
        assert!(registry.derives_from(&name("LeafType"), &name("BaseType")));
        assert!(registry.derives_from(&name("LeafType"), &name("LeafType")));
        assert!(!registry.derives_from(&name("BaseType"), &name("LeafType")));
        assert!(!registry.derives_from(&name("Nope"), &name("BaseType")));
    }

    #[test]
    fn test_text_type() {
        let registry = sample();
        assert_eq!(
            registry.text_type(&name("ColourType")).unwrap().unwrap().name,
            name("ColourType")
        );
        assert!(registry.text_type(&name("LeafType")).unwrap().is_none());
    }

    #[test]
    fn test_check_detects_missing_types() {
        assert!(sample().check().is_ok());

        let mut registry = sample();
        registry
            .register(SchemaType::complex(
                name("Broken"),
                ComplexType::new().member(MemberDecl::element(name("x"), name("Missing"))),
            ))
            .unwrap();
        assert!(matches!(registry.check(), Err(Error::UnknownType(_))));

        let mut registry = sample();
        registry
            .register_element(ElementDecl::new(name("Orphan"), name("LeafType")).substitutes(name("Nowhere")))
            .unwrap();
        assert!(matches!(registry.check(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_check_rejects_shared_local_names() {
        let other = |local: &str| QName::namespaced("http://example.com/other", local);
        let mut registry = sample();
        registry
            .register(SchemaType::complex(
                name("NamedType"),
                ComplexType::new().member(MemberDecl::element(name("label"), name("string"))),
            ))
            .unwrap();
        registry
            .register(SchemaType::complex(
                other("RenamedType"),
                ComplexType::new()
                    .extends(name("NamedType"))
                    .member(MemberDecl::element(other("label"), name("string"))),
            ))
            .unwrap();
        assert!(matches!(
            registry.check(),
            Err(Error::Schema(ref message)) if message.contains("share the local name 'label'")
        ));

        let mut registry = sample();
        registry
            .register(SchemaType::complex(
                name("TaggedType"),
                ComplexType::new()
                    .member(MemberDecl::attribute(QName::local("tag"), name("string")))
                    .member(MemberDecl::element(name("tag"), name("string"))),
            ))
            .unwrap();
        assert!(matches!(registry.check(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
    }
}
