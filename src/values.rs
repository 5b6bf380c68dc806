//! Value coercion
//!
//! Conversion between the lexical forms found in XML text and attributes
//! and typed [`Value`]s, with facet enforcement in both directions.
//! [`parse`] and [`format`] form a round-trip pair: for every valid value
//! `v` of a simple type `T`, `parse(&format(&v, T)?, T)? == v`.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{ElementPath, Error, Result};
use crate::names::is_valid_ncname;
use crate::schema::facets::WhiteSpace;
use crate::schema::model::{EnumLiteral, Primitive, SchemaType, SimpleType, TypeKind};

static DECIMAL_LEXICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid decimal regex"));

static DOUBLE_LEXICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid double regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// An xs:dateTime value with an optional timezone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    /// Local date and time
    pub local: NaiveDateTime,
    /// Timezone offset, if the lexical form carried one
    pub offset: Option<FixedOffset>,
}

impl DateTimeValue {
    /// Create a date-time without a timezone
    pub fn new(local: NaiveDateTime) -> Self {
        Self { local, offset: None }
    }

    /// Set the timezone offset
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format(DATE_TIME_FORMAT))?;
        match self.offset {
            Some(offset) if offset.local_minus_utc() == 0 => f.write_str("Z"),
            Some(offset) => write!(f, "{}", offset),
            None => Ok(()),
        }
    }
}

/// A typed simple value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// string, token, anyURI and ID values
    String(String),
    /// xs:boolean
    Boolean(bool),
    /// xs:integer
    Integer(i64),
    /// xs:decimal
    Decimal(Decimal),
    /// xs:double
    Double(f64),
    /// xs:date
    Date(NaiveDate),
    /// xs:dateTime
    DateTime(DateTimeValue),
    /// List of tokens
    TokenList(Vec<String>),
    /// List of doubles, e.g. `gml:pos` and `gml:posList`
    DoubleList(Vec<f64>),
    /// Enumeration literal
    Enum(EnumLiteral),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create an enumeration value from its XML token
    pub fn literal(token: impl Into<String>) -> Self {
        Value::Enum(EnumLiteral::from_literal(token))
    }

    /// Get the string content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Enum(literal) => Some(&literal.literal),
            _ => None,
        }
    }

    /// Get a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get a list of doubles
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Value::DoubleList(items) => Some(items),
            _ => None,
        }
    }

    /// Get an enumeration literal
    pub fn as_enum(&self) -> Option<&EnumLiteral> {
        match self {
            Value::Enum(literal) => Some(literal),
            _ => None,
        }
    }

    /// Name of the value's kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::Date(_) => "date",
            Value::DateTime(_) => "dateTime",
            Value::TokenList(_) => "token list",
            Value::DoubleList(_) => "double list",
            Value::Enum(_) => "enumeration literal",
        }
    }
}

fn invalid(value: &str, expected: &str) -> Error {
    Error::InvalidValue {
        value: value.to_string(),
        expected: expected.to_string(),
        path: ElementPath::new(),
    }
}

fn not_simple(schema_type: &SchemaType) -> Error {
    Error::Schema(format!("'{}' is not a simple type", schema_type.name))
}

/// Parse a lexical value against a simple or enumeration type
pub fn parse(text: &str, schema_type: &SchemaType) -> Result<Value> {
    match &schema_type.kind {
        TypeKind::Enumeration(enumeration) => {
            let token = WhiteSpace::Collapse.normalize(text);
            enumeration
                .by_literal(&token)
                .cloned()
                .map(Value::Enum)
                .ok_or_else(|| Error::UnknownEnumerationLiteral {
                    literal: token,
                    type_name: schema_type.name.clone(),
                    path: ElementPath::new(),
                })
        }
        TypeKind::Simple(simple) => parse_simple(text, simple),
        TypeKind::Complex(_) => Err(not_simple(schema_type)),
    }
}

fn parse_simple(text: &str, simple: &SimpleType) -> Result<Value> {
    let lexical = if simple.primitive.collapses_whitespace() {
        WhiteSpace::Collapse.normalize(text)
    } else {
        text.to_string()
    };
    simple.facets.check_lexical(&lexical)?;
    let value = parse_primitive(&lexical, simple.primitive)?;
    simple.facets.check_value(&value, &lexical)?;
    Ok(value)
}

fn parse_primitive(lexical: &str, primitive: Primitive) -> Result<Value> {
    let expected = primitive.as_str();
    match primitive {
        Primitive::String | Primitive::Token | Primitive::AnyUri => Ok(Value::String(lexical.to_string())),
        Primitive::Id => {
            if is_valid_ncname(lexical) {
                Ok(Value::String(lexical.to_string()))
            } else {
                Err(invalid(lexical, expected))
            }
        }
        Primitive::Boolean => match lexical {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(invalid(lexical, expected)),
        },
        Primitive::Integer => lexical
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid(lexical, expected)),
        Primitive::Decimal => {
            if !DECIMAL_LEXICAL.is_match(lexical) {
                return Err(invalid(lexical, expected));
            }
            Decimal::from_str(lexical)
                .map(Value::Decimal)
                .map_err(|_| invalid(lexical, expected))
        }
        Primitive::Double => parse_double(lexical).map(Value::Double),
        Primitive::Date => NaiveDate::parse_from_str(lexical, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| invalid(lexical, expected)),
        Primitive::DateTime => parse_date_time(lexical).map(Value::DateTime),
        Primitive::TokenList => Ok(Value::TokenList(
            lexical.split_whitespace().map(str::to_string).collect(),
        )),
        Primitive::DoubleList => lexical
            .split_whitespace()
            .map(parse_double)
            .collect::<Result<Vec<_>>>()
            .map(Value::DoubleList),
    }
}

fn parse_double(lexical: &str) -> Result<f64> {
    match lexical {
        "INF" | "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ if DOUBLE_LEXICAL.is_match(lexical) => lexical
            .parse::<f64>()
            .map_err(|_| invalid(lexical, Primitive::Double.as_str())),
        _ => Err(invalid(lexical, Primitive::Double.as_str())),
    }
}

fn parse_date_time(lexical: &str) -> Result<DateTimeValue> {
    let err = || invalid(lexical, Primitive::DateTime.as_str());

    let (local, offset) = if let Some(local) = lexical.strip_suffix('Z') {
        (local, FixedOffset::east_opt(0))
    } else if lexical.len() > 6 && lexical.is_char_boundary(lexical.len() - 6) {
        let (local, zone) = lexical.split_at(lexical.len() - 6);
        match parse_offset(zone) {
            Some(offset) => (local, Some(offset)),
            None => (lexical, None),
        }
    } else {
        (lexical, None)
    };

    let local = NaiveDateTime::parse_from_str(local, DATE_TIME_FORMAT).map_err(|_| err())?;
    Ok(DateTimeValue { local, offset })
}

/// Parse a `+hh:mm` / `-hh:mm` timezone designator
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let (hours, minutes) = zone[1..].split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Format a value as the lexical form of a simple or enumeration type
///
/// The value must belong to the type's value space and satisfy its facets.
pub fn format(value: &Value, schema_type: &SchemaType) -> Result<String> {
    match &schema_type.kind {
        TypeKind::Enumeration(enumeration) => {
            let literal = value.as_enum().ok_or_else(|| mismatch(value, "enumeration literal"))?;
            enumeration
                .by_value(&literal.value)
                .or_else(|| enumeration.by_literal(&literal.literal))
                .map(|declared| declared.literal.clone())
                .ok_or_else(|| Error::UnknownEnumerationLiteral {
                    literal: literal.literal.clone(),
                    type_name: schema_type.name.clone(),
                    path: ElementPath::new(),
                })
        }
        TypeKind::Simple(simple) => {
            let lexical = format_primitive(value, simple.primitive)?;
            simple.facets.check_lexical(&lexical)?;
            simple.facets.check_value(value, &lexical)?;
            Ok(lexical)
        }
        TypeKind::Complex(_) => Err(not_simple(schema_type)),
    }
}

fn mismatch(value: &Value, expected: &str) -> Error {
    invalid(&format!("<{}>", value.kind()), expected)
}

fn format_primitive(value: &Value, primitive: Primitive) -> Result<String> {
    let expected = primitive.as_str();
    let lexical = match (primitive, value) {
        (Primitive::String | Primitive::Token | Primitive::AnyUri, Value::String(s)) => s.clone(),
        (Primitive::Id, Value::String(s)) => {
            if !is_valid_ncname(s) {
                return Err(invalid(s, expected));
            }
            s.clone()
        }
        (Primitive::Boolean, Value::Boolean(b)) => b.to_string(),
        (Primitive::Integer, Value::Integer(i)) => i.to_string(),
        (Primitive::Decimal, Value::Decimal(d)) => d.to_string(),
        (Primitive::Decimal, Value::Integer(i)) => i.to_string(),
        (Primitive::Double, Value::Double(f)) => format_double(*f),
        (Primitive::Double, Value::Integer(i)) => format_double(*i as f64),
        (Primitive::Date, Value::Date(d)) => d.format(DATE_FORMAT).to_string(),
        (Primitive::DateTime, Value::DateTime(dt)) => dt.to_string(),
        (Primitive::TokenList, Value::TokenList(items)) => {
            if items.iter().any(|t| t.is_empty() || t.contains(char::is_whitespace)) {
                return Err(invalid(&items.join(" "), expected));
            }
            items.join(" ")
        }
        (Primitive::DoubleList, Value::DoubleList(items)) => items
            .iter()
            .map(|f| format_double(*f))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return Err(mismatch(value, expected)),
    };
    Ok(lexical)
}

/// Shortest lexical form of a double that parses back to the same value
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FacetKind;
    use crate::namespaces::QName;
    use crate::schema::facets::Facets;
    use crate::schema::model::EnumerationType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn simple(primitive: Primitive) -> SchemaType {
        SchemaType::simple(QName::local("T"), SimpleType::new(primitive))
    }

    fn colour() -> SchemaType {
        SchemaType::enumeration(
            QName::local("ColourType"),
            EnumerationType::from_literals(["White", "Black", "Red", "Green"]),
        )
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse(" true ", &simple(Primitive::Boolean)).unwrap(), Value::Boolean(true));
        assert_eq!(parse("0", &simple(Primitive::Boolean)).unwrap(), Value::Boolean(false));
        assert_eq!(parse("+42", &simple(Primitive::Integer)).unwrap(), Value::Integer(42));
        assert_eq!(
            parse("1.50", &simple(Primitive::Decimal)).unwrap(),
            Value::Decimal(Decimal::from_str("1.50").unwrap())
        );
        assert_eq!(parse("1e3", &simple(Primitive::Double)).unwrap(), Value::Double(1000.0));
        assert_eq!(parse("-INF", &simple(Primitive::Double)).unwrap(), Value::Double(f64::NEG_INFINITY));
        assert_eq!(
            parse("  51.89\n 1.42 ", &simple(Primitive::DoubleList)).unwrap(),
            Value::DoubleList(vec![51.89, 1.42])
        );
        assert_eq!(
            parse("a  b", &simple(Primitive::TokenList)).unwrap(),
            Value::TokenList(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_string_preserves_whitespace() {
        assert_eq!(
            parse("  Harwich  Buoy ", &simple(Primitive::String)).unwrap(),
            Value::string("  Harwich  Buoy ")
        );
        assert_eq!(
            parse("  Harwich  Buoy ", &simple(Primitive::Token)).unwrap(),
            Value::string("Harwich Buoy")
        );
    }

    #[test]
    fn test_invalid_lexical_values() {
        assert!(matches!(
            parse("abc", &simple(Primitive::Decimal)),
            Err(Error::InvalidValue { ref value, .. }) if value == "abc"
        ));
        assert!(parse("1e5", &simple(Primitive::Decimal)).is_err());
        assert!(parse("inf", &simple(Primitive::Double)).is_err());
        assert!(parse("yes", &simple(Primitive::Boolean)).is_err());
        assert!(parse("2024-13-01", &simple(Primitive::Date)).is_err());
        assert!(parse("1abc", &simple(Primitive::Id)).is_err());
        assert!(parse("51.89 north", &simple(Primitive::DoubleList)).is_err());
    }

    #[test]
    fn test_dates() {
        let date = parse("2024-01-31", &simple(Primitive::Date)).unwrap();
        assert_eq!(date, Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));

        let dt_type = simple(Primitive::DateTime);
        let utc = parse("2024-01-31T12:30:00Z", &dt_type).unwrap();
        assert_eq!(format(&utc, &dt_type).unwrap(), "2024-01-31T12:30:00Z");

        let offset = parse("2024-01-31T12:30:00.5+01:00", &dt_type).unwrap();
        assert_eq!(format(&offset, &dt_type).unwrap(), "2024-01-31T12:30:00.500+01:00");

        let local = parse("2024-01-31T12:30:00", &dt_type).unwrap();
        assert!(matches!(local, Value::DateTime(DateTimeValue { offset: None, .. })));
    }

    #[test]
    fn test_enumeration_strictness() {
        let colour = colour();
        let red = parse("Red", &colour).unwrap();
        assert_eq!(red, Value::Enum(EnumLiteral::new("Red", "Red")));

        let err = parse("Puce", &colour).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownEnumerationLiteral { ref literal, ref type_name, .. }
                if literal == "Puce" && type_name.local_name == "ColourType"
        ));
        assert!(format(&Value::literal("Puce"), &colour).is_err());
    }

    #[test]
    fn test_facets_apply_on_parse_and_format() {
        let angle = SchemaType::simple(
            QName::local("AngleType"),
            SimpleType::new(Primitive::Double)
                .with_facets(Facets::new().with_range(Some(Decimal::ZERO), Some(Decimal::from(360)))),
        );
        assert!(parse("359.5", &angle).is_ok());
        let err = parse("400", &angle).unwrap_err();
        assert!(matches!(err, Error::FacetViolation { facet: FacetKind::MaxInclusive, .. }));
        assert!(format(&Value::Double(400.0), &angle).is_err());
    }

    #[test]
    fn test_format_rejects_mismatched_value() {
        assert!(matches!(
            format(&Value::Boolean(true), &simple(Primitive::Double)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(format(&Value::string("x"), &colour()).is_err());
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(51.89), "51.89");
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(f64::INFINITY), "INF");
        assert_eq!(format_double(f64::NAN), "NaN");
    }

    proptest! {
        #[test]
        fn test_double_round_trip(x in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let t = simple(Primitive::Double);
            let lexical = format(&Value::Double(x), &t).unwrap();
            prop_assert_eq!(parse(&lexical, &t).unwrap(), Value::Double(x));
        }

        #[test]
        fn test_integer_round_trip(i in any::<i64>()) {
            let t = simple(Primitive::Integer);
            let lexical = format(&Value::Integer(i), &t).unwrap();
            prop_assert_eq!(parse(&lexical, &t).unwrap(), Value::Integer(i));
        }

        #[test]
        fn test_token_list_round_trip(items in proptest::collection::vec("[A-Za-z0-9_.-]{1,8}", 0..6)) {
            let t = simple(Primitive::TokenList);
            let value = Value::TokenList(items);
            let lexical = format(&value, &t).unwrap();
            prop_assert_eq!(parse(&lexical, &t).unwrap(), value);
        }

        #[test]
        fn test_decimal_round_trip(mantissa in -1_000_000_000i64..1_000_000_000, scale in 0u32..8) {
            let t = simple(Primitive::Decimal);
            let value = Value::Decimal(Decimal::new(mantissa, scale));
            let lexical = format(&value, &t).unwrap();
            prop_assert_eq!(parse(&lexical, &t).unwrap(), value);
        }
    }
}
