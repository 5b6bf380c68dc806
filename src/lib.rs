//! # s100gml
//!
//! A schema-driven XML/GML codec for IHO S-100 product data.
//!
//! Schemas are described as data: simple, enumeration and complex types,
//! global elements and substitution groups, held in a [`TypeRegistry`].
//! Conformant XML decodes into a [`Document`] of typed instances, with
//! cardinality, facets, enumerations, identity and references enforced,
//! and encodes back out in schema order.
//!
//! ## Features
//!
//! - Streaming decoder over any `BufRead`
//! - Deterministic encoder with fixed namespace prefixes
//! - `gml:id` identity and `xlink:href` association links, resolved after decoding
//! - Facet enforcement (pattern, ranges, fraction digits, lengths)
//! - Bundled GML 3.2, S-100 and S-125 profiles
//! - Additional product schemas loaded from JSON
//! - Ring closure and curve contiguity checks for GML geometry
//! - Limits on depth, size and attribute count
//!
//! ## Example
//!
//! ```rust,ignore
//! use s100gml::{profiles, Decoder, Encoder};
//!
//! let registry = profiles::s125_registry()?;
//! let document = Decoder::new(&registry).decode_str(&xml)?;
//! let xml = Encoder::new(&registry).encode(&document)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and namespaces
pub mod names;
pub mod namespaces;

// Schema model and values
pub mod schema;
pub mod values;

// Instances and links
pub mod documents;
pub mod references;

// XML codec
pub mod codec;

// GML structure
pub mod geometry;

// Bundled schemas
pub mod profiles;

// Testing support
pub mod comparison;

// Re-exports for convenience
pub use codec::{DecodeOptions, Decoder, EncodeOptions, Encoder};
pub use documents::{Document, Instance, Link, NodeId, Property};
pub use error::{ElementPath, Error, FacetKind, Result};
pub use limits::Limits;
pub use namespaces::{PrefixMap, QName};
pub use references::{LinkResolver, ReferencePolicy, ResolutionReport};
pub use schema::{SchemaDocument, TypeRegistry};
pub use values::Value;

/// Version of the s100gml library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
        assert_send_sync::<Document>();
    }
}
