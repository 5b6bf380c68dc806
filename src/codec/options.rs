//! Decoder and encoder configuration

use crate::error::Result;
use crate::limits::Limits;
use crate::namespaces::PrefixMap;
use crate::references::ReferencePolicy;

/// Options controlling how documents are decoded
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Resource limits
    pub limits: Limits,
    /// How unresolved same-document links are reported
    pub reference_policy: ReferencePolicy,
    /// Add absent attributes that declare a default or fixed value
    pub fill_defaults: bool,
    /// Check ring closure and curve segment contiguity after decoding
    pub check_geometry: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            reference_policy: ReferencePolicy::default(),
            fill_defaults: false,
            check_geometry: true,
        }
    }
}

impl DecodeOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the reference policy
    pub fn with_reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    /// Enable or disable default filling
    pub fn fill_defaults(mut self, enabled: bool) -> Self {
        self.fill_defaults = enabled;
        self
    }

    /// Enable or disable geometry checks (enabled by default)
    pub fn check_geometry(mut self, enabled: bool) -> Self {
        self.check_geometry = enabled;
        self
    }
}

/// Options controlling how documents are written
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Indentation width; None writes everything on one line
    pub indent: Option<usize>,
    /// Write the `<?xml version="1.0" encoding="UTF-8"?>` declaration
    pub xml_declaration: bool,
    /// Prefix assignments taking precedence over the schema's and the well-known ones
    pub prefixes: PrefixMap,
    /// Check ring closure and curve segment contiguity before writing
    pub check_geometry: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            xml_declaration: true,
            prefixes: PrefixMap::new(),
            check_geometry: true,
        }
    }
}

impl EncodeOptions {
    /// Create default options (two-space indentation, with declaration)
    pub fn new() -> Self {
        Self::default()
    }

    /// Write compact output without indentation
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    /// Set the indentation width
    pub fn with_indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    /// Omit the XML declaration
    pub fn without_declaration(mut self) -> Self {
        self.xml_declaration = false;
        self
    }

    /// Enable or disable geometry checks (enabled by default)
    pub fn check_geometry(mut self, enabled: bool) -> Self {
        self.check_geometry = enabled;
        self
    }

    /// Assign a prefix to a namespace
    pub fn with_prefix(mut self, prefix: &str, namespace: &str) -> Result<Self> {
        self.prefixes.insert(prefix, namespace)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_options_builder() {
        let options = DecodeOptions::new()
            .with_limits(Limits::strict())
            .with_reference_policy(ReferencePolicy::Record)
            .fill_defaults(true)
            .check_geometry(false);
        assert_eq!(options.limits, Limits::strict());
        assert_eq!(options.reference_policy, ReferencePolicy::Record);
        assert!(options.fill_defaults);
        assert!(!options.check_geometry);

        let defaults = DecodeOptions::default();
        assert_eq!(defaults.reference_policy, ReferencePolicy::Collect);
        assert!(!defaults.fill_defaults);
        assert!(defaults.check_geometry);
    }

    #[test]
    fn test_encode_options_builder() {
        let options = EncodeOptions::new().compact().without_declaration();
        assert_eq!(options.indent, None);
        assert!(!options.xml_declaration);
        assert!(options.check_geometry);
        assert!(!options.check_geometry(false).check_geometry);

        let options = EncodeOptions::new().with_prefix("aton", "http://example.com/aton").unwrap();
        assert_eq!(options.prefixes.get("http://example.com/aton"), Some("aton"));
        assert!(EncodeOptions::new().with_prefix("1bad", "http://example.com").is_err());
    }
}
