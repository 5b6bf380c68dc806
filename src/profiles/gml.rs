//! GML 3.2 subset
//!
//! The part of GML 3.2 the S-100 product specifications build on: the
//! abstract GML object and feature, points, multi-points, curves with line
//! string, geodesic, arc and B-spline segments, surfaces and polygons
//! bounded by linear rings, envelopes, measures and code lists.

use rust_decimal::Decimal;

use super::xs;
use crate::error::Result;
use crate::namespaces::{QName, GML_NAMESPACE};
use crate::schema::facets::Facets;
use crate::schema::model::{
    ComplexType, ElementDecl, MemberDecl, Occurs, Primitive, SchemaType, SimpleType,
};
use crate::schema::registry::TypeRegistry;

/// Qualified name in the GML namespace
pub fn gml(local: &str) -> QName {
    QName::namespaced(GML_NAMESPACE, local)
}

fn element(local: &str, type_local: &str) -> MemberDecl {
    MemberDecl::element(gml(local), gml(type_local))
}

fn complex(registry: &mut TypeRegistry, local: &str, complex: ComplexType) -> Result<()> {
    registry.register(SchemaType::complex(gml(local), complex))
}

fn global(registry: &mut TypeRegistry, local: &str, type_local: &str, head: Option<&str>) -> Result<()> {
    let mut decl = ElementDecl::new(gml(local), gml(type_local));
    if let Some(head) = head {
        decl = decl.substitutes(gml(head));
    }
    registry.register_element(decl)
}

fn abstract_global(registry: &mut TypeRegistry, local: &str, type_local: &str, head: Option<&str>) -> Result<()> {
    let mut decl = ElementDecl::new(gml(local), gml(type_local)).abstract_element();
    if let Some(head) = head {
        decl = decl.substitutes(gml(head));
    }
    registry.register_element(decl)
}

/// Register the GML types and elements
pub fn register(registry: &mut TypeRegistry) -> Result<()> {
    registry.declare_prefix("gml", GML_NAMESPACE)?;
    register_values(registry)?;
    register_objects(registry)?;
    register_points(registry)?;
    register_curves(registry)?;
    register_surfaces(registry)?;
    Ok(())
}

fn register_values(registry: &mut TypeRegistry) -> Result<()> {
    registry.register(SchemaType::simple(gml("doubleList"), SimpleType::new(Primitive::DoubleList)))?;
    registry.register(SchemaType::simple(
        gml("DirectPositionType"),
        SimpleType::new(Primitive::DoubleList).with_facets(Facets::new().with_min_length(1)),
    ))?;
    registry.register(SchemaType::simple(
        gml("DirectPositionListType"),
        SimpleType::new(Primitive::DoubleList),
    ))?;
    registry.register(SchemaType::simple(
        gml("UomIdentifier"),
        SimpleType::new(Primitive::Token).with_facets(Facets::new().with_pattern(r"[^: \n\r\t]+|[a-zA-Z][a-zA-Z0-9+\-.]*:[^\s]+")?),
    ))?;
    registry.register(SchemaType::simple(
        gml("angleValue"),
        SimpleType::new(Primitive::Double)
            .with_facets(Facets::new().with_range(Some(Decimal::ZERO), Some(Decimal::from(360)))),
    ))?;

    complex(
        registry,
        "MeasureType",
        ComplexType::new()
            .with_simple_content(xs("double"))
            .member(MemberDecl::attribute(QName::local("uom"), gml("UomIdentifier")).required()),
    )?;
    complex(registry, "LengthType", ComplexType::new().extends(gml("MeasureType")))?;
    complex(
        registry,
        "AngleType",
        ComplexType::new()
            .extends(gml("MeasureType"))
            .with_simple_content(gml("angleValue")),
    )?;
    complex(
        registry,
        "CodeType",
        ComplexType::new()
            .with_simple_content(xs("string"))
            .member(MemberDecl::attribute(QName::local("codeSpace"), xs("anyURI"))),
    )?;
    // Target of by-reference associations; the link lives on the property element
    complex(registry, "ReferenceType", ComplexType::new())?;
    Ok(())
}

fn register_objects(registry: &mut TypeRegistry) -> Result<()> {
    complex(
        registry,
        "AbstractGMLType",
        ComplexType::new()
            .abstract_type()
            .member(MemberDecl::attribute(gml("id"), xs("ID")).required())
            .member(element("description", "CodeType").optional())
            .member(element("identifier", "CodeType").optional())
            .member(element("name", "CodeType").many()),
    )?;

    complex(
        registry,
        "AbstractGeometryType",
        ComplexType::new()
            .extends(gml("AbstractGMLType"))
            .abstract_type()
            .member(MemberDecl::attribute(QName::local("srsName"), xs("anyURI")))
            .member(MemberDecl::attribute(QName::local("srsDimension"), xs("positiveInteger"))),
    )?;
    abstract_global(registry, "AbstractGeometry", "AbstractGeometryType", None)?;

    complex(
        registry,
        "EnvelopeType",
        ComplexType::new()
            .member(MemberDecl::attribute(QName::local("srsName"), xs("anyURI")))
            .member(MemberDecl::attribute(QName::local("srsDimension"), xs("positiveInteger")))
            .member(element("lowerCorner", "DirectPositionType"))
            .member(element("upperCorner", "DirectPositionType")),
    )?;
    global(registry, "Envelope", "EnvelopeType", None)?;

    complex(
        registry,
        "BoundingShapeType",
        ComplexType::new().member(element("Envelope", "EnvelopeType")),
    )?;

    complex(
        registry,
        "AbstractFeatureType",
        ComplexType::new()
            .extends(gml("AbstractGMLType"))
            .abstract_type()
            .member(element("boundedBy", "BoundingShapeType").optional().nillable()),
    )?;
    abstract_global(registry, "AbstractFeature", "AbstractFeatureType", None)?;
    Ok(())
}

fn register_points(registry: &mut TypeRegistry) -> Result<()> {
    complex(
        registry,
        "PointType",
        ComplexType::new()
            .extends(gml("AbstractGeometryType"))
            .member(element("pos", "DirectPositionType")),
    )?;
    global(registry, "Point", "PointType", Some("AbstractGeometry"))?;

    complex(
        registry,
        "PointPropertyType",
        ComplexType::new().member(element("Point", "PointType")),
    )?;

    complex(
        registry,
        "MultiPointType",
        ComplexType::new()
            .extends(gml("AbstractGeometryType"))
            .member(
                element("pointMember", "PointPropertyType")
                    .many()
                    .by_reference(Some(gml("PointType"))),
            ),
    )?;
    global(registry, "MultiPoint", "MultiPointType", Some("AbstractGeometry"))?;
    Ok(())
}

fn register_curves(registry: &mut TypeRegistry) -> Result<()> {
    complex(
        registry,
        "AbstractCurveType",
        ComplexType::new()
            .extends(gml("AbstractGeometryType"))
            .abstract_type(),
    )?;
    abstract_global(registry, "AbstractCurve", "AbstractCurveType", Some("AbstractGeometry"))?;

    complex(
        registry,
        "AbstractCurveSegmentType",
        ComplexType::new().abstract_type(),
    )?;
    abstract_global(registry, "AbstractCurveSegment", "AbstractCurveSegmentType", None)?;

    for (local, type_local, interpolation) in [
        ("LineStringSegment", "LineStringSegmentType", "linear"),
        ("GeodesicString", "GeodesicStringType", "geodesic"),
    ] {
        complex(
            registry,
            type_local,
            ComplexType::new()
                .extends(gml("AbstractCurveSegmentType"))
                .member(
                    MemberDecl::attribute(QName::local("interpolation"), xs("string"))
                        .with_fixed(interpolation),
                )
                .member(element("pos", "DirectPositionType").many())
                .member(element("posList", "DirectPositionListType").optional()),
        )?;
        global(registry, local, type_local, Some("AbstractCurveSegment"))?;
    }

    complex(
        registry,
        "ArcByCenterPointType",
        ComplexType::new()
            .extends(gml("AbstractCurveSegmentType"))
            .member(
                MemberDecl::attribute(QName::local("interpolation"), xs("string"))
                    .with_fixed("circularArcCenterPointWithRadius"),
            )
            .member(MemberDecl::attribute(QName::local("numArc"), xs("integer")).with_fixed("1"))
            .member(element("pos", "DirectPositionType").optional())
            .member(element("posList", "DirectPositionListType").optional())
            .member(element("radius", "LengthType"))
            .member(element("startAngle", "AngleType").optional())
            .member(element("endAngle", "AngleType").optional()),
    )?;
    global(registry, "ArcByCenterPoint", "ArcByCenterPointType", Some("AbstractCurveSegment"))?;

    complex(
        registry,
        "KnotType",
        ComplexType::new()
            .member(element("value", "doubleList"))
            .member(MemberDecl::element(gml("multiplicity"), xs("nonNegativeInteger")))
            .member(MemberDecl::element(gml("weight"), xs("double"))),
    )?;
    complex(
        registry,
        "KnotPropertyType",
        ComplexType::new().member(element("Knot", "KnotType")),
    )?;
    complex(
        registry,
        "BSplineType",
        ComplexType::new()
            .extends(gml("AbstractCurveSegmentType"))
            .member(
                MemberDecl::attribute(QName::local("interpolation"), xs("string"))
                    .with_default("polynomialSpline"),
            )
            .member(element("pos", "DirectPositionType").many())
            .member(element("posList", "DirectPositionListType").optional())
            .member(MemberDecl::element(gml("degree"), xs("nonNegativeInteger")))
            .member(element("knot", "KnotPropertyType").occurs(Occurs::new(2, None))),
    )?;
    global(registry, "BSpline", "BSplineType", Some("AbstractCurveSegment"))?;

    complex(
        registry,
        "CurveSegmentArrayPropertyType",
        ComplexType::new().member(element("AbstractCurveSegment", "AbstractCurveSegmentType").many()),
    )?;
    complex(
        registry,
        "CurveType",
        ComplexType::new()
            .extends(gml("AbstractCurveType"))
            .member(element("segments", "CurveSegmentArrayPropertyType")),
    )?;
    global(registry, "Curve", "CurveType", Some("AbstractCurve"))?;

    complex(
        registry,
        "CurvePropertyType",
        ComplexType::new().member(element("AbstractCurve", "AbstractCurveType")),
    )?;
    Ok(())
}

fn register_surfaces(registry: &mut TypeRegistry) -> Result<()> {
    complex(registry, "AbstractRingType", ComplexType::new().abstract_type())?;
    abstract_global(registry, "AbstractRing", "AbstractRingType", None)?;

    complex(
        registry,
        "LinearRingType",
        ComplexType::new()
            .extends(gml("AbstractRingType"))
            .member(element("pos", "DirectPositionType").many())
            .member(element("posList", "DirectPositionListType").optional()),
    )?;
    global(registry, "LinearRing", "LinearRingType", Some("AbstractRing"))?;

    complex(
        registry,
        "AbstractRingPropertyType",
        ComplexType::new().member(element("AbstractRing", "AbstractRingType")),
    )?;

    complex(registry, "AbstractSurfacePatchType", ComplexType::new().abstract_type())?;
    abstract_global(registry, "AbstractSurfacePatch", "AbstractSurfacePatchType", None)?;

    complex(
        registry,
        "PolygonPatchType",
        ComplexType::new()
            .extends(gml("AbstractSurfacePatchType"))
            .member(MemberDecl::attribute(QName::local("interpolation"), xs("string")).with_fixed("planar"))
            .member(element("exterior", "AbstractRingPropertyType").optional())
            .member(element("interior", "AbstractRingPropertyType").many()),
    )?;
    global(registry, "PolygonPatch", "PolygonPatchType", Some("AbstractSurfacePatch"))?;

    complex(
        registry,
        "SurfacePatchArrayPropertyType",
        ComplexType::new().member(element("AbstractSurfacePatch", "AbstractSurfacePatchType").many()),
    )?;

    complex(
        registry,
        "AbstractSurfaceType",
        ComplexType::new()
            .extends(gml("AbstractGeometryType"))
            .abstract_type(),
    )?;
    abstract_global(registry, "AbstractSurface", "AbstractSurfaceType", Some("AbstractGeometry"))?;

    complex(
        registry,
        "SurfaceType",
        ComplexType::new()
            .extends(gml("AbstractSurfaceType"))
            .member(element("patches", "SurfacePatchArrayPropertyType")),
    )?;
    global(registry, "Surface", "SurfaceType", Some("AbstractSurface"))?;

    complex(
        registry,
        "PolygonType",
        ComplexType::new()
            .extends(gml("AbstractSurfaceType"))
            .member(element("exterior", "AbstractRingPropertyType").optional())
            .member(element("interior", "AbstractRingPropertyType").many()),
    )?;
    global(registry, "Polygon", "PolygonType", Some("AbstractSurface"))?;

    complex(
        registry,
        "SurfacePropertyType",
        ComplexType::new().member(element("AbstractSurface", "AbstractSurfaceType")),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::builtins;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        builtins(&mut registry).unwrap();
        register(&mut registry).unwrap();
        registry
    }

    #[test]
    fn test_gml_registry_is_consistent() {
        registry().check().unwrap();
    }

    #[test]
    fn test_point_members_inherit_gml_id() {
        let registry = registry();
        let members: Vec<_> = registry
            .effective_members(&gml("PointType"))
            .unwrap()
            .iter()
            .map(|m| m.display_name())
            .collect();
        assert_eq!(
            members,
            vec!["@id", "description", "identifier", "name", "@srsName", "@srsDimension", "pos"]
        );
    }

    #[test]
    fn test_segment_substitution_group() {
        let registry = registry();
        let segments: Vec<_> = registry
            .substitution_group_members(&gml("AbstractCurveSegment"))
            .iter()
            .map(|e| e.name.local_name.clone())
            .collect();
        assert_eq!(
            segments,
            vec!["LineStringSegment", "GeodesicString", "ArcByCenterPoint", "BSpline"]
        );
    }

    #[test]
    fn test_angle_type_restricts_text() {
        let registry = registry();
        let text = registry.text_type(&gml("AngleType")).unwrap().unwrap();
        assert_eq!(text.name, gml("angleValue"));
        let length = registry.text_type(&gml("LengthType")).unwrap().unwrap();
        assert_eq!(length.name, xs("double"));
    }
}
