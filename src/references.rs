//! Reference and link resolution
//!
//! Decoding keeps by-reference members as unresolved [`Link`]s. Once the
//! whole document is in the arena, the [`LinkResolver`] walks it from the
//! root, looks every same-document `#id` up in the id table, checks the
//! target type against the member's declared target, and stores the
//! target's [`NodeId`] in the link.

use tracing::{debug, warn};

use crate::documents::{Document, Link, NodeId, Property};
use crate::error::{DanglingReference, ElementPath, Error, Result};
use crate::namespaces::QName;
use crate::schema::registry::TypeRegistry;

/// How unresolved same-document links are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Fail on the first dangling link
    FailFast,
    /// Fail with every dangling link listed in one error
    #[default]
    Collect,
    /// Keep the document and record dangling links on it
    Record,
}

/// Outcome of a resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Links resolved to an instance of this document
    pub resolved: usize,
    /// Links pointing outside the document, left unresolved
    pub external: usize,
    /// Same-document links whose id does not exist
    pub dangling: usize,
}

/// Resolves the links of a document against its id table
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'r> {
    registry: &'r TypeRegistry,
    policy: ReferencePolicy,
}

struct Resolution {
    node: NodeId,
    key: String,
    index: usize,
    target: NodeId,
}

impl<'r> LinkResolver<'r> {
    /// Create a resolver
    pub fn new(registry: &'r TypeRegistry, policy: ReferencePolicy) -> Self {
        Self { registry, policy }
    }

    /// Resolve every link reachable from the document root
    pub fn resolve(&self, document: &mut Document) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::default();
        let mut resolutions = Vec::new();
        let mut dangling = Vec::new();

        let Some(root) = document.root() else {
            return Ok(report);
        };
        let mut stack = vec![(root, ElementPath::new())];

        while let Some((node, parent_path)) = stack.pop() {
            let Some(instance) = document.get(node) else {
                continue;
            };
            let path = parent_path.child(instance.element.local_name.clone());
            let mut children = Vec::new();

            for (key, properties) in &instance.members {
                for (index, property) in properties.iter().enumerate() {
                    match property {
                        Property::Node(child) => children.push(*child),
                        Property::Link(link) => {
                            let link_path = path.child(key.clone());
                            match self.lookup(document, &instance.type_name, key, link, &link_path)? {
                                Lookup::Found(target) => {
                                    report.resolved += 1;
                                    resolutions.push(Resolution {
                                        node,
                                        key: key.clone(),
                                        index,
                                        target,
                                    });
                                }
                                Lookup::External => {
                                    report.external += 1;
                                    debug!(href = %link.href, path = %link_path, "leaving external reference unresolved");
                                }
                                Lookup::Missing(id) => {
                                    let reference = DanglingReference {
                                        href: link.href.clone(),
                                        id,
                                        path: link_path,
                                    };
                                    if self.policy == ReferencePolicy::FailFast {
                                        return Err(Error::DanglingReference(vec![reference]));
                                    }
                                    dangling.push(reference);
                                }
                            }
                        }
                        Property::Value(_) | Property::Nil => {}
                    }
                }
            }
            // Visit children in document order
            stack.extend(children.into_iter().rev().map(|child| (child, path.clone())));
        }

        for resolution in resolutions {
            if let Some(Property::Link(link)) = document
                .get_mut(resolution.node)
                .and_then(|instance| instance.members.get_mut(&resolution.key))
                .and_then(|properties| properties.get_mut(resolution.index))
            {
                link.target = Some(resolution.target);
            }
        }

        report.dangling = dangling.len();
        if dangling.is_empty() {
            return Ok(report);
        }
        match self.policy {
            ReferencePolicy::Record => {
                for reference in &dangling {
                    warn!(id = %reference.id, path = %reference.path, "dangling reference");
                }
                document.set_dangling(dangling);
                Ok(report)
            }
            _ => Err(Error::DanglingReference(dangling)),
        }
    }

    fn lookup(
        &self,
        document: &Document,
        owner_type: &QName,
        key: &str,
        link: &Link,
        path: &ElementPath,
    ) -> Result<Lookup> {
        let Some(id) = link.fragment() else {
            return Ok(Lookup::External);
        };
        let Some(target) = document.by_id(id) else {
            return Ok(Lookup::Missing(id.to_string()));
        };

        let expected = self
            .registry
            .effective_members(owner_type)?
            .into_iter()
            .find(|m| m.key() == key)
            .and_then(|m| m.target.as_ref());
        if let (Some(expected), Some(found)) = (expected, document.get(target)) {
            if !self.registry.derives_from(&found.type_name, expected) {
                return Err(Error::IncompatibleReference {
                    href: link.href.clone(),
                    expected: expected.clone(),
                    found: found.type_name.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(Lookup::Found(target))
    }
}

enum Lookup {
    Found(NodeId),
    External,
    Missing(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Instance;
    use crate::schema::model::{ComplexType, MemberDecl, SchemaType};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(SchemaType::complex(
                QName::local("NodeType"),
                ComplexType::new().member(
                    MemberDecl::element(QName::local("peer"), QName::local("NodeType"))
                        .many()
                        .by_reference(Some(QName::local("NodeType"))),
                ),
            ))
            .unwrap();
        registry
            .register(SchemaType::complex(QName::local("OtherType"), ComplexType::new()))
            .unwrap();
        registry
            .register(SchemaType::complex(
                QName::local("RootType"),
                ComplexType::new().member(MemberDecl::wildcard("item", None)),
            ))
            .unwrap();
        registry
    }

    fn node(id: &str, peers: &[&str]) -> Instance {
        peers.iter().fold(
            Instance::new(QName::local("Node"), QName::local("NodeType")).with_id(id),
            |instance, peer| instance.with("peer", Link::to_id(peer)),
        )
    }

    fn document(items: Vec<Instance>) -> Document {
        let mut doc = Document::new();
        let mut root = Instance::new(QName::local("Root"), QName::local("RootType"));
        for item in items {
            let id = doc.add(item).unwrap();
            root.push("item", id);
        }
        let root = doc.add(root).unwrap();
        doc.set_root(root);
        doc
    }

    #[test]
    fn test_resolves_cycles() {
        let registry = registry();
        let mut doc = document(vec![node("A", &["B"]), node("B", &["A"])]);
        let report = LinkResolver::new(&registry, ReferencePolicy::Collect)
            .resolve(&mut doc)
            .unwrap();
        assert_eq!(report.resolved, 2);

        let a = doc.by_id("A").unwrap();
        let b = doc.by_id("B").unwrap();
        assert_eq!(doc[a].links("peer")[0].target, Some(b));
        assert_eq!(doc[b].links("peer")[0].target, Some(a));
    }

    #[test]
    fn test_collect_reports_all_dangling() {
        let registry = registry();
        let mut doc = document(vec![node("A", &["missing", "gone"])]);
        let err = LinkResolver::new(&registry, ReferencePolicy::Collect)
            .resolve(&mut doc)
            .unwrap_err();
        match err {
            Error::DanglingReference(references) => {
                let ids: Vec<_> = references.iter().map(|r| r.id.as_str()).collect();
                assert_eq!(ids, vec!["missing", "gone"]);
                assert_eq!(references[0].path.to_string(), "/Root/Node/peer");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_fail_fast_reports_first() {
        let registry = registry();
        let mut doc = document(vec![node("A", &["missing", "gone"])]);
        let err = LinkResolver::new(&registry, ReferencePolicy::FailFast)
            .resolve(&mut doc)
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference(ref r) if r.len() == 1 && r[0].id == "missing"));
    }

    #[test]
    fn test_record_keeps_document() {
        let registry = registry();
        let mut doc = document(vec![node("A", &["missing"])]);
        let report = LinkResolver::new(&registry, ReferencePolicy::Record)
            .resolve(&mut doc)
            .unwrap();
        assert_eq!(report.dangling, 1);
        assert_eq!(doc.dangling()[0].id, "missing");
    }

    #[test]
    fn test_external_links_left_unresolved() {
        let registry = registry();
        let mut doc = document(vec![
            Instance::new(QName::local("Node"), QName::local("NodeType"))
                .with_id("A")
                .with("peer", Link::new("http://example.com/other.gml#X")),
        ]);
        let report = LinkResolver::new(&registry, ReferencePolicy::FailFast)
            .resolve(&mut doc)
            .unwrap();
        assert_eq!(report.external, 1);
        let a = doc.by_id("A").unwrap();
        assert!(!doc[a].links("peer")[0].is_resolved());
    }

    #[test]
    fn test_incompatible_target() {
        let registry = registry();
        let mut doc = document(vec![
            node("A", &["O"]),
            Instance::new(QName::local("Other"), QName::local("OtherType")).with_id("O"),
        ]);
        let err = LinkResolver::new(&registry, ReferencePolicy::Collect)
            .resolve(&mut doc)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IncompatibleReference { ref found, .. } if found.local_name == "OtherType"
        ));
    }
}
