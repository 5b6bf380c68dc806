//! Constraining facets
//!
//! This module implements the facets that restrict simple types: pattern,
//! min/max inclusive, fraction digits, min/max length and required.

use crate::error::{ElementPath, Error, FacetKind, Result};
use crate::values::Value;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Pattern facet using regular expressions
///
/// XSD patterns match the whole lexical value, so the expression is
/// compiled anchored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatternFacet {
    /// Regular expression pattern as declared
    pub pattern: String,
    /// Compiled, anchored regex
    regex: Regex,
}

impl PatternFacet {
    /// Create a new pattern facet
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::Schema(format!("invalid pattern '{}': {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Check a lexical value against this pattern
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for PatternFacet {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl TryFrom<String> for PatternFacet {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        PatternFacet::new(&value)
    }
}

impl From<PatternFacet> for String {
    fn from(facet: PatternFacet) -> Self {
        facet.pattern
    }
}

/// The facets restricting one simple type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facets {
    /// Regular expression over the lexical form
    pub pattern: Option<PatternFacet>,
    /// Inclusive lower bound for numeric values
    pub min_inclusive: Option<Decimal>,
    /// Inclusive upper bound for numeric values
    pub max_inclusive: Option<Decimal>,
    /// Maximum number of significant fraction digits for decimals
    pub fraction_digits: Option<u32>,
    /// Minimum length in characters (items for lists)
    pub min_length: Option<usize>,
    /// Maximum length in characters (items for lists)
    pub max_length: Option<usize>,
    /// The lexical value must not be empty
    pub required: bool,
}

fn violation(facet: FacetKind, value: &str, constraint: String) -> Error {
    Error::FacetViolation {
        facet,
        value: value.to_string(),
        constraint,
        path: ElementPath::new(),
    }
}

fn compare_to_bound(value: &Value, bound: &Decimal) -> Option<Ordering> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i).cmp(bound)),
        Value::Decimal(d) => Some(d.cmp(bound)),
        Value::Double(f) => f.partial_cmp(&bound.to_f64()?),
        _ => None,
    }
}

impl Facets {
    /// Create an empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pattern facet
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(PatternFacet::new(pattern)?);
        Ok(self)
    }

    /// Set the inclusive range; either bound may be omitted
    pub fn with_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_inclusive = min;
        self.max_inclusive = max;
        self
    }

    /// Set the fraction digits facet
    pub fn with_fraction_digits(mut self, digits: u32) -> Self {
        self.fraction_digits = Some(digits);
        self
    }

    /// Set the minimum length
    pub fn with_min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    /// Set the maximum length
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Require a non-empty value
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check facets that apply to the (normalized) lexical form
    pub fn check_lexical(&self, lexical: &str) -> Result<()> {
        if self.required && lexical.is_empty() {
            return Err(violation(FacetKind::Required, lexical, "non-empty".to_string()));
        }
        if let Some(ref pattern) = self.pattern {
            if !pattern.is_match(lexical) {
                return Err(violation(FacetKind::Pattern, lexical, pattern.pattern.clone()));
            }
        }
        Ok(())
    }

    /// Check facets that apply to the parsed value
    pub fn check_value(&self, value: &Value, lexical: &str) -> Result<()> {
        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::TokenList(items) => Some(items.len()),
            Value::DoubleList(items) => Some(items.len()),
            _ => None,
        };
        if let Some(length) = length {
            if let Some(min) = self.min_length {
                if length < min {
                    return Err(violation(FacetKind::MinLength, lexical, format!(">= {}", min)));
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    return Err(violation(FacetKind::MaxLength, lexical, format!("<= {}", max)));
                }
            }
        }

        if let Some(ref min) = self.min_inclusive {
            if compare_to_bound(value, min) == Some(Ordering::Less) {
                return Err(violation(FacetKind::MinInclusive, lexical, format!(">= {}", min)));
            }
        }
        if let Some(ref max) = self.max_inclusive {
            if compare_to_bound(value, max) == Some(Ordering::Greater) {
                return Err(violation(FacetKind::MaxInclusive, lexical, format!("<= {}", max)));
            }
        }

        if let (Some(digits), Value::Decimal(d)) = (self.fraction_digits, value) {
            if d.normalize().scale() > digits {
                return Err(violation(
                    FacetKind::FractionDigits,
                    lexical,
                    format!("at most {} fraction digits", digits),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Preserve.normalize(" a\tb "), " a\tb ");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  51.89 \n 1.42  "), "51.89 1.42");
    }

    #[test]
    fn test_pattern_is_anchored() {
        let facet = PatternFacet::new("[0-9]{9}").unwrap();
        assert!(facet.is_match("992359598"));
        assert!(!facet.is_match("x992359598"));
        assert!(!facet.is_match("9923595981"));
        assert!(PatternFacet::new("[unclosed").is_err());
    }

    #[test]
    fn test_max_inclusive_on_double() {
        let facets = Facets::new().with_range(Some(dec("0")), Some(dec("360")));
        assert!(facets.check_value(&Value::Double(360.0), "360.0").is_ok());

        let err = facets.check_value(&Value::Double(400.0), "400.0").unwrap_err();
        assert!(matches!(
            err,
            Error::FacetViolation { facet: FacetKind::MaxInclusive, ref value, .. } if value == "400.0"
        ));

        let err = facets.check_value(&Value::Double(-1.0), "-1.0").unwrap_err();
        assert!(matches!(err, Error::FacetViolation { facet: FacetKind::MinInclusive, .. }));
    }

    #[test]
    fn test_fraction_digits() {
        let facets = Facets::new().with_fraction_digits(2);
        assert!(facets.check_value(&Value::Decimal(dec("1.25")), "1.25").is_ok());
        assert!(facets.check_value(&Value::Decimal(dec("1.500")), "1.500").is_ok());
        assert!(facets.check_value(&Value::Decimal(dec("1.125")), "1.125").is_err());
    }

    #[test]
    fn test_lengths_and_required() {
        let facets = Facets::new().with_min_length(2).with_max_length(3).required();
        assert!(facets.check_lexical("").is_err());
        assert!(facets.check_value(&Value::String("a".into()), "a").is_err());
        assert!(facets.check_value(&Value::String("abc".into()), "abc").is_ok());
        assert!(facets
            .check_value(&Value::DoubleList(vec![1.0, 2.0, 3.0, 4.0]), "1 2 3 4")
            .is_err());
    }

    #[test]
    fn test_facets_serde() {
        let json = r#"{"pattern": "[a-z]{3}", "max_inclusive": "360"}"#;
        let facets: Facets = serde_json::from_str(json).unwrap();
        assert!(facets.check_lexical("eng").is_ok());
        assert!(facets.check_lexical("english").is_err());
        assert_eq!(facets.max_inclusive, Some(dec("360")));
    }
}
