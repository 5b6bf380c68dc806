//! Schema model and type registry
//!
//! Schema components describe what a conformant document looks like:
//! simple types with facets, enumerations, complex types with ordered
//! members and single-parent extension, and global elements with
//! substitution groups. The [`TypeRegistry`] indexes them by qualified name.

pub mod facets;
pub mod loader;
pub mod model;
pub mod registry;

pub use facets::{Facets, PatternFacet, WhiteSpace};
pub use loader::SchemaDocument;
pub use model::{
    ComplexType, ElementDecl, EnumLiteral, EnumerationType, MemberDecl, MemberKind, Occurs,
    Primitive, SchemaType, SimpleType, TypeKind,
};
pub use registry::TypeRegistry;
