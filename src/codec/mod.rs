//! XML codec
//!
//! [`Decoder`] turns XML into a [`Document`] of typed instances and
//! [`Encoder`] writes one back out, both driven by a shared
//! [`TypeRegistry`].

pub mod decoder;
pub mod encoder;
pub mod options;
pub mod reader;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use options::{DecodeOptions, EncodeOptions};
pub use reader::{StartTag, XmlEvent, XmlReader};

use crate::documents::Document;
use crate::error::Result;
use crate::schema::registry::TypeRegistry;

/// Decode a document with default options
pub fn decode_str(registry: &TypeRegistry, xml: &str) -> Result<Document> {
    Decoder::new(registry).decode_str(xml)
}

/// Encode a document with default options
pub fn encode(registry: &TypeRegistry, document: &Document) -> Result<String> {
    Encoder::new(registry).encode(document)
}
