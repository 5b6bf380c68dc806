//! GML geometry invariants
//!
//! Structural checks the schema alone cannot express: linear rings must be
//! closed (first position equals last, at least four positions) and the
//! segments of a curve must be contiguous (each segment starts where the
//! previous one ends). Arc segments are given by centre and angles, so
//! contiguity is only checked between segments with explicit positions.

use crate::documents::{Document, Instance, NodeId};
use crate::error::{ElementPath, Error, Result};
use crate::namespaces::{QName, GML_NAMESPACE};
use crate::schema::registry::TypeRegistry;
use crate::values::Value;

/// Coordinate tolerance when comparing positions
pub const POSITION_TOLERANCE: f64 = 1e-9;

/// Dimension assumed when no `srsDimension` is given
pub const DEFAULT_DIMENSION: usize = 2;

fn gml(local: &str) -> QName {
    QName::namespaced(GML_NAMESPACE, local)
}

/// Positions of a geometry: its `posList`, or its `pos` values in order
pub fn positions(instance: &Instance, dimension: usize) -> Result<Vec<Vec<f64>>> {
    let mut coordinates = Vec::new();
    for value in instance.values("posList").into_iter().chain(instance.values("pos")) {
        if let Value::DoubleList(items) = value {
            coordinates.extend_from_slice(items);
        }
    }
    if dimension == 0 || coordinates.len() % dimension != 0 {
        return Err(Error::Geometry {
            reason: format!(
                "{} coordinates do not form positions of dimension {}",
                coordinates.len(),
                dimension
            ),
            path: ElementPath::new(),
        });
    }
    Ok(coordinates.chunks(dimension).map(<[f64]>::to_vec).collect())
}

fn same_position(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= POSITION_TOLERANCE)
}

fn lookup<'d>(document: &'d Document, node: NodeId, path: &ElementPath) -> Result<&'d Instance> {
    document.get(node).ok_or_else(|| Error::Geometry {
        reason: format!("node {} is not part of the document", node.index()),
        path: path.clone(),
    })
}

fn declared_dimension(instance: &Instance) -> Option<usize> {
    instance
        .value("srsDimension")
        .and_then(Value::as_i64)
        .and_then(|d| usize::try_from(d).ok())
}

/// Check that a ring's positions are closed
pub fn check_ring(positions: &[Vec<f64>]) -> std::result::Result<(), String> {
    if positions.len() < 4 {
        return Err(format!("ring has {} positions, at least 4 required", positions.len()));
    }
    let (first, last) = (&positions[0], &positions[positions.len() - 1]);
    if !same_position(first, last) {
        return Err(format!("ring is not closed: starts at {:?}, ends at {:?}", first, last));
    }
    Ok(())
}

/// Check the geometry invariants of every instance reachable from the root
pub fn check(document: &Document, registry: &TypeRegistry) -> Result<()> {
    let Some(root) = document.root() else {
        return Ok(());
    };
    let ring = gml("LinearRingType");
    let curve = gml("CurveType");

    let mut stack = vec![(root, ElementPath::new(), DEFAULT_DIMENSION)];
    while let Some((node, parent_path, inherited)) = stack.pop() {
        let instance = lookup(document, node, &parent_path)?;
        let path = parent_path.child(instance.element.local_name.clone());
        let dimension = declared_dimension(instance).unwrap_or(inherited);

        if registry.derives_from(&instance.type_name, &ring) {
            let points = positions(instance, dimension).map_err(|e| e.at_path(&path))?;
            check_ring(&points).map_err(|reason| Error::Geometry {
                reason,
                path: path.clone(),
            })?;
        }
        if registry.derives_from(&instance.type_name, &curve) {
            check_segments(document, registry, node, dimension, &path)?;
        }

        let children: Vec<NodeId> = instance
            .members
            .values()
            .flatten()
            .filter_map(|p| p.as_node())
            .collect();
        stack.extend(children.into_iter().rev().map(|child| (child, path.clone(), dimension)));
    }
    Ok(())
}

fn check_segments(
    document: &Document,
    registry: &TypeRegistry,
    curve: NodeId,
    dimension: usize,
    path: &ElementPath,
) -> Result<()> {
    let arc = gml("ArcByCenterPointType");
    let Some(array) = document.child(curve, "segments") else {
        return Ok(());
    };
    let segments = lookup(document, array, path)?.nodes("AbstractCurveSegment");

    let mut previous: Option<(usize, Vec<f64>)> = None;
    for (index, segment) in segments.into_iter().enumerate() {
        let instance = lookup(document, segment, path)?;
        if registry.derives_from(&instance.type_name, &arc) {
            previous = None;
            continue;
        }
        let points = positions(instance, dimension).map_err(|e| e.at_path(path))?;
        let (Some(start), Some(end)) = (points.first(), points.last()) else {
            previous = None;
            continue;
        };
        if let Some((previous_index, previous_end)) = &previous {
            if !same_position(previous_end, start) {
                return Err(Error::Geometry {
                    reason: format!(
                        "segment {} ends at {:?} but segment {} starts at {:?}",
                        previous_index, previous_end, index, start
                    ),
                    path: path.clone(),
                });
            }
        }
        previous = Some((index, end.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(coordinates: Vec<f64>) -> Instance {
        Instance::new(gml("LinearRing"), gml("LinearRingType"))
            .with("posList", Value::DoubleList(coordinates))
    }

    #[test]
    fn test_positions_split_by_dimension() {
        let instance = ring(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]);
        assert_eq!(positions(&instance, 2).unwrap().len(), 3);
        assert_eq!(positions(&instance, 3).unwrap().len(), 2);
        assert!(positions(&instance, 4).is_err());
    }

    #[test]
    fn test_check_ring() {
        let closed = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]];
        assert!(check_ring(&closed).is_ok());

        let open = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]];
        assert!(check_ring(&open).unwrap_err().contains("not closed"));

        let short = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.0]];
        assert!(check_ring(&short).is_err());
    }

    #[test]
    fn test_foreign_node_is_an_error() {
        let mut other = Document::new();
        other.add(ring(vec![])).unwrap();
        let foreign = other.add(ring(vec![])).unwrap();

        let mut document = Document::new();
        let root = document
            .add(Instance::new(gml("Polygon"), gml("PolygonType")).with("exterior", foreign))
            .unwrap();
        document.set_root(root);
        let err = check(&document, &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::Geometry { ref path, .. } if path.to_string() == "/Polygon"));
    }

    #[test]
    fn test_same_position_tolerance() {
        assert!(same_position(&[51.89, 1.42], &[51.89 + 1e-12, 1.42]));
        assert!(!same_position(&[51.89, 1.42], &[51.89, 1.43]));
        assert!(!same_position(&[51.89, 1.42], &[51.89, 1.42, 0.0]));
    }
}
