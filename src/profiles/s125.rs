//! S-125 Marine Aids to Navigation (subset)
//!
//! Enough of the product schema to carry datasets of lateral and cardinal
//! buoys and virtual AIS aids to navigation, with their point geometry.

use super::gml::gml;
use super::s100::{geometry_property, s100};
use super::xs;
use crate::error::Result;
use crate::namespaces::{QName, S125_NAMESPACE};
use crate::schema::facets::Facets;
use crate::schema::model::{
    ComplexType, ElementDecl, EnumerationType, MemberDecl, Occurs, Primitive, SchemaType, SimpleType,
};
use crate::schema::registry::TypeRegistry;

/// Qualified name in the S-125 namespace
pub fn s125(local: &str) -> QName {
    QName::namespaced(S125_NAMESPACE, local)
}

fn element(local: &str, type_name: QName) -> MemberDecl {
    MemberDecl::element(s125(local), type_name)
}

fn complex(registry: &mut TypeRegistry, local: &str, complex: ComplexType) -> Result<()> {
    registry.register(SchemaType::complex(s125(local), complex))
}

fn enumeration(registry: &mut TypeRegistry, local: &str, literals: &[&str]) -> Result<()> {
    registry.register(SchemaType::enumeration(
        s125(local),
        EnumerationType::from_literals(literals.iter().copied()),
    ))
}

/// Register the S-125 types and elements (requires the S-100 profile)
pub fn register(registry: &mut TypeRegistry) -> Result<()> {
    registry.declare_prefix("S125", S125_NAMESPACE)?;
    register_code_lists(registry)?;
    register_features(registry)?;
    register_dataset(registry)?;
    Ok(())
}

fn register_code_lists(registry: &mut TypeRegistry) -> Result<()> {
    enumeration(
        registry,
        "categoryOfLateralMarkType",
        &[
            "Port-Hand Lateral Mark",
            "Starboard-Hand Lateral Mark",
            "Preferred Channel To Starboard Lateral Mark",
            "Preferred Channel To Port Lateral Mark",
        ],
    )?;
    enumeration(
        registry,
        "categoryOfCardinalMarkType",
        &[
            "North Cardinal Mark",
            "East Cardinal Mark",
            "South Cardinal Mark",
            "West Cardinal Mark",
        ],
    )?;
    enumeration(
        registry,
        "ColourType",
        &[
            "White", "Black", "Red", "Green", "Blue", "Yellow", "Grey", "Brown", "Amber", "Violet",
            "Orange", "Magenta", "Pink",
        ],
    )?;
    enumeration(
        registry,
        "buoyShapeType",
        &[
            "Conical (Nun, Ogival)",
            "Can (Cylindrical)",
            "Spherical",
            "Pillar",
            "Spar (Spindle)",
            "Barrel (Tun)",
            "Super-Buoy",
            "Ice Buoy",
        ],
    )?;
    enumeration(
        registry,
        "virtualAISAidToNavigationTypeType",
        &[
            "North Cardinal",
            "East Cardinal",
            "South Cardinal",
            "West Cardinal",
            "Port Lateral",
            "Starboard Lateral",
            "Preferred Channel to Port",
            "Preferred Channel to Starboard",
            "Isolated Danger",
            "Safe Water",
            "Special Purpose",
            "New Danger Marking",
        ],
    )?;
    registry.register(SchemaType::simple(
        s125("MMSICodeType"),
        SimpleType::new(Primitive::Token).with_facets(Facets::new().with_pattern("[0-9]{9}")?),
    ))?;
    Ok(())
}

fn register_features(registry: &mut TypeRegistry) -> Result<()> {
    complex(
        registry,
        "FeatureNameType",
        ComplexType::new()
            .member(element("displayName", xs("boolean")).optional())
            .member(element("language", s100("ISO-639-2")).optional())
            .member(element("name", xs("string"))),
    )?;
    complex(
        registry,
        "PointGeometryType",
        ComplexType::new().member(geometry_property("pointProperty")?),
    )?;

    complex(
        registry,
        "AidsToNavigationType",
        ComplexType::new()
            .extends(s100("AbstractFeatureType"))
            .abstract_type()
            .member(element("featureName", s125("FeatureNameType")).many())
            .member(element("idCode", xs("string")).optional())
            .member(element("dateStart", xs("date")).optional())
            .member(element("dateEnd", xs("date")).optional())
            .member(element("source", xs("string")).optional())
            .member(element("sourceDate", xs("date")).optional())
            .member(
                element("peer", gml("ReferenceType"))
                    .many()
                    .by_reference(Some(s125("AidsToNavigationType"))),
            ),
    )?;
    registry.register_element(ElementDecl::new(s125("AidsToNavigation"), s125("AidsToNavigationType")).abstract_element())?;

    complex(
        registry,
        "StructureObjectType",
        ComplexType::new()
            .extends(s125("AidsToNavigationType"))
            .abstract_type(),
    )?;
    complex(
        registry,
        "GenericBuoyType",
        ComplexType::new()
            .extends(s125("StructureObjectType"))
            .abstract_type()
            .member(element("buoyShape", s125("buoyShapeType")).optional())
            .member(element("colour", s125("ColourType")).occurs(Occurs::one_or_more()))
            .member(element("geometry", s125("PointGeometryType")).occurs(Occurs::one_or_more())),
    )?;

    for (local, category) in [
        ("LateralBuoy", "categoryOfLateralMark"),
        ("CardinalBuoy", "categoryOfCardinalMark"),
    ] {
        let type_name = format!("{}Type", local);
        complex(
            registry,
            &type_name,
            ComplexType::new()
                .extends(s125("GenericBuoyType"))
                .member(element(category, s125(&format!("{}Type", category)))),
        )?;
        registry.register_element(
            ElementDecl::new(s125(local), s125(&type_name)).substitutes(s125("AidsToNavigation")),
        )?;
    }

    complex(
        registry,
        "VirtualAISAidToNavigationType",
        ComplexType::new()
            .extends(s125("AidsToNavigationType"))
            .member(element("mMSICode", s125("MMSICodeType")))
            .member(element("installationDate", xs("date")).optional())
            .member(
                element("virtualAISAidToNavigationType", s125("virtualAISAidToNavigationTypeType"))
                    .optional(),
            )
            .member(element("geometry", s125("PointGeometryType")).occurs(Occurs::one_or_more())),
    )?;
    registry.register_element(
        ElementDecl::new(s125("VirtualAISAidToNavigation"), s125("VirtualAISAidToNavigationType"))
            .substitutes(s125("AidsToNavigation")),
    )?;
    Ok(())
}

fn register_dataset(registry: &mut TypeRegistry) -> Result<()> {
    complex(
        registry,
        "MembersType",
        ComplexType::new().member(element("AidsToNavigation", s125("AidsToNavigationType")).many()),
    )?;
    complex(
        registry,
        "DatasetType",
        ComplexType::new()
            .extends(gml("AbstractFeatureType"))
            .member(
                MemberDecl::element(
                    s125("DatasetIdentificationInformation"),
                    s100("DataSetIdentificationType"),
                )
                .optional(),
            )
            .member(element("members", s125("MembersType")).optional()),
    )?;
    registry.register_element(
        ElementDecl::new(s125("Dataset"), s125("DatasetType")).substitutes(gml("AbstractFeature")),
    )?;
    Ok(())
}
