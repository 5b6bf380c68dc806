//! Bundled schema profiles
//!
//! Ready-made registries for the XML Schema built-in datatypes, the GML 3.2
//! subset used by S-100, the S-100 GML profile and a subset of the S-125
//! Marine Aids to Navigation product. Other products can be layered on top
//! of these with [`TypeRegistry::load_json`].

pub mod gml;
pub mod s100;
pub mod s125;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::namespaces::{QName, XS_NAMESPACE};
use crate::schema::facets::Facets;
use crate::schema::model::{Primitive, SchemaType, SimpleType};
use crate::schema::registry::TypeRegistry;

/// Qualified name in the XML Schema namespace
pub fn xs(local: &str) -> QName {
    QName::namespaced(XS_NAMESPACE, local)
}

/// Register the XML Schema built-in datatypes
pub fn builtins(registry: &mut TypeRegistry) -> Result<()> {
    let plain = [
        ("string", Primitive::String),
        ("normalizedString", Primitive::Token),
        ("token", Primitive::Token),
        ("NCName", Primitive::Id),
        ("ID", Primitive::Id),
        ("boolean", Primitive::Boolean),
        ("integer", Primitive::Integer),
        ("decimal", Primitive::Decimal),
        ("double", Primitive::Double),
        ("date", Primitive::Date),
        ("dateTime", Primitive::DateTime),
        ("anyURI", Primitive::AnyUri),
        ("NMTOKENS", Primitive::TokenList),
    ];
    for (local, primitive) in plain {
        registry.register(SchemaType::simple(xs(local), SimpleType::new(primitive)))?;
    }

    registry.register(SchemaType::simple(
        xs("nonNegativeInteger"),
        SimpleType::new(Primitive::Integer).with_facets(Facets::new().with_range(Some(Decimal::ZERO), None)),
    ))?;
    registry.register(SchemaType::simple(
        xs("positiveInteger"),
        SimpleType::new(Primitive::Integer).with_facets(Facets::new().with_range(Some(Decimal::ONE), None)),
    ))?;
    Ok(())
}

/// Registry with the built-ins and the GML 3.2 subset
pub fn gml_registry() -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    builtins(&mut registry)?;
    gml::register(&mut registry)?;
    registry.check()?;
    Ok(registry)
}

/// Registry with the built-ins, GML and the S-100 GML profile
pub fn s100_registry() -> Result<TypeRegistry> {
    let mut registry = gml_registry()?;
    s100::register(&mut registry)?;
    registry.check()?;
    Ok(registry)
}

/// Registry with the built-ins, GML, S-100 and the S-125 subset
pub fn s125_registry() -> Result<TypeRegistry> {
    let mut registry = s100_registry()?;
    s125::register(&mut registry)?;
    registry.check()?;
    Ok(registry)
}
