//! S-100 GML profile (Part 10b)
//!
//! Geometry types extended with information associations, the dataset
//! identification block every S-100 GML dataset starts with, and the
//! abstract feature and information types product schemas derive from.

use super::gml::gml;
use super::xs;
use crate::error::{Error, Result};
use crate::namespaces::{QName, S100_NAMESPACE};
use crate::schema::facets::Facets;
use crate::schema::model::{
    ComplexType, ElementDecl, EnumerationType, MemberDecl, Occurs, Primitive, SchemaType, SimpleType,
};
use crate::schema::registry::TypeRegistry;

/// Encoding specification every S-100 GML dataset declares
pub const ENCODING_SPECIFICATION: &str = "S-100 Part 10b";

/// Qualified name in the S-100 namespace
pub fn s100(local: &str) -> QName {
    QName::namespaced(S100_NAMESPACE, local)
}

/// ISO 19115 topic categories
pub const TOPIC_CATEGORIES: &[&str] = &[
    "farming",
    "biota",
    "boundaries",
    "climatologyMeteorologyAtmosphere",
    "economy",
    "elevation",
    "environment",
    "geoscientificInformation",
    "health",
    "imageryBaseMapsEarthCover",
    "intelligenceMilitary",
    "inlandWaters",
    "location",
    "oceans",
    "planningCadastre",
    "society",
    "structure",
    "transportation",
    "utilitiesCommunication",
];

/// Register the S-100 types and elements (requires the GML subset)
pub fn register(registry: &mut TypeRegistry) -> Result<()> {
    registry.declare_prefix("S100", S100_NAMESPACE)?;

    registry.register(SchemaType::simple(
        s100("ISO-639-2"),
        SimpleType::new(Primitive::Token).with_facets(Facets::new().with_pattern("[a-z]{3}")?),
    ))?;
    registry.register(SchemaType::enumeration(
        s100("MD_TopicCategoryCode"),
        EnumerationType::from_literals(TOPIC_CATEGORIES.iter().copied()),
    ))?;
    registry.register(SchemaType::enumeration(
        s100("datasetPurposeType"),
        EnumerationType::from_literals(["base", "update"]),
    ))?;

    register_geometry(registry)?;
    register_dataset_identification(registry)?;

    registry.register(SchemaType::complex(
        s100("AbstractFeatureType"),
        ComplexType::new()
            .extends(gml("AbstractFeatureType"))
            .abstract_type(),
    ))?;
    registry.register(SchemaType::complex(
        s100("AbstractInformationType"),
        ComplexType::new()
            .extends(gml("AbstractGMLType"))
            .abstract_type(),
    ))?;
    Ok(())
}

fn information_association() -> MemberDecl {
    MemberDecl::element(s100("informationAssociation"), gml("ReferenceType"))
        .many()
        .by_reference(Some(s100("AbstractInformationType")))
}

fn register_geometry(registry: &mut TypeRegistry) -> Result<()> {
    for (local, base, head) in [
        ("Point", "PointType", "Point"),
        ("MultiPoint", "MultiPointType", "MultiPoint"),
        ("Curve", "CurveType", "Curve"),
        ("Surface", "SurfaceType", "Surface"),
    ] {
        let type_name = s100(&format!("{}Type", local));
        registry.register(SchemaType::complex(
            type_name.clone(),
            ComplexType::new()
                .extends(gml(base))
                .member(information_association()),
        ))?;
        registry.register_element(ElementDecl::new(s100(local), type_name).substitutes(gml(head)))?;
    }

    // Property types carry the GML head so both gml:Point and S100:Point are accepted
    for (local, head, head_type) in [
        ("PointPropertyType", "Point", "PointType"),
        ("MultiPointPropertyType", "MultiPoint", "MultiPointType"),
        ("CurvePropertyType", "AbstractCurve", "AbstractCurveType"),
        ("SurfacePropertyType", "AbstractSurface", "AbstractSurfaceType"),
    ] {
        registry.register(SchemaType::complex(
            s100(local),
            ComplexType::new().member(MemberDecl::element(gml(head), gml(head_type))),
        ))?;
    }

    for (local, property, _) in GEOMETRY_PROPERTIES {
        registry.register_element(ElementDecl::new(s100(local), s100(property)))?;
    }
    Ok(())
}

/// Geometry property elements: (element, property type, GML target type)
const GEOMETRY_PROPERTIES: [(&str, &str, &str); 4] = [
    ("pointProperty", "PointPropertyType", "PointType"),
    ("multiPointProperty", "MultiPointPropertyType", "MultiPointType"),
    ("curveProperty", "CurvePropertyType", "AbstractCurveType"),
    ("surfaceProperty", "SurfacePropertyType", "AbstractSurfaceType"),
];

/// Property member referring to a geometry either inline or by `xlink:href`
pub fn geometry_property(local: &str) -> Result<MemberDecl> {
    let Some((_, property, target)) = GEOMETRY_PROPERTIES.iter().find(|(name, _, _)| *name == local) else {
        return Err(Error::Schema(format!("'{}' is not an S-100 geometry property", local)));
    };
    Ok(MemberDecl::element(s100(local), s100(property)).by_reference(Some(gml(target))))
}

fn register_dataset_identification(registry: &mut TypeRegistry) -> Result<()> {
    let string = |local: &str| MemberDecl::element(s100(local), xs("string"));
    registry.register(SchemaType::complex(
        s100("DataSetIdentificationType"),
        ComplexType::new()
            .member(string("encodingSpecification").with_fixed(ENCODING_SPECIFICATION))
            .member(string("encodingSpecificationEdition"))
            .member(string("productIdentifier"))
            .member(string("productEdition"))
            .member(string("applicationProfile"))
            .member(string("datasetFileIdentifier"))
            .member(string("datasetTitle"))
            .member(MemberDecl::element(s100("datasetReferenceDate"), xs("date")))
            .member(MemberDecl::element(s100("datasetLanguage"), s100("ISO-639-2")))
            .member(string("datasetAbstract").optional())
            .member(
                MemberDecl::element(s100("datasetTopicCategory"), s100("MD_TopicCategoryCode"))
                    .occurs(Occurs::one_or_more()),
            )
            .member(MemberDecl::element(s100("datasetPurpose"), s100("datasetPurposeType")))
            .member(MemberDecl::element(s100("updateNumber"), xs("nonNegativeInteger"))),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::s100_registry;

    #[test]
    fn test_s100_point_substitutes_gml_point() {
        let registry = s100_registry().unwrap();
        assert!(registry.is_substitutable(&s100("Point"), &gml("Point")));
        assert!(registry.derives_from(&s100("PointType"), &gml("PointType")));

        let members: Vec<_> = registry
            .content_members(&s100("PointType"))
            .unwrap()
            .iter()
            .map(|m| m.key().to_string())
            .collect();
        assert_eq!(members.last().map(String::as_str), Some("informationAssociation"));
    }

    #[test]
    fn test_topic_category_values() {
        let registry = s100_registry().unwrap();
        let topics = registry
            .resolve(&s100("MD_TopicCategoryCode"))
            .unwrap()
            .as_enumeration()
            .unwrap();
        assert_eq!(topics.literals.len(), TOPIC_CATEGORIES.len());
        assert_eq!(topics.by_literal("oceans").unwrap().value, "Oceans");
    }

    #[test]
    fn test_encoding_specification_is_fixed() {
        let registry = s100_registry().unwrap();
        let members = registry
            .effective_members(&s100("DataSetIdentificationType"))
            .unwrap();
        assert_eq!(members[0].fixed.as_deref(), Some(ENCODING_SPECIFICATION));
    }

    #[test]
    fn test_geometry_property() {
        let member = geometry_property("pointProperty").unwrap();
        assert!(member.by_reference);
        assert_eq!(member.target, Some(gml("PointType")));
        assert!(geometry_property("lineProperty").is_err());
    }
}
