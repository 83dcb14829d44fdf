//! Geometry assembly for retained nodes, ways and relations.
//!
//! Relations are assembled by resolving member ways through an
//! [`ItemLookup`], stitching the fragments into rings, and rendering the
//! result as WKT together with a bounding-box area and a representative
//! point.

mod stitch;
mod wkt;

use std::collections::HashSet;

use geo::{BoundingRect, Coord, Geometry, LineString, MultiPolygon, Point, Polygon};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::element::ElementId;
use crate::record::OsmRecord;
use crate::store::{ItemLookup, StoreError};

pub use stitch::{ClosurePolicy, Fragment, StitchEvent, Stitched, Vertex, stitch_rings};
pub use wkt::to_wkt;

/// A finished shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    /// WKT rendering with `lon lat` pairs.
    pub wkt: String,
    /// Bounding-box area in square degrees.
    pub area: f64,
    /// Representative point.
    pub center: Coord,
}

/// Why a relation produced no geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidGeometry {
    /// The relation has no way members.
    NoWays,
    /// None of the member ways could be resolved to coordinates.
    NoResolvedWays,
    /// A linear relation left fragments that never connect.
    Unconnected,
    /// Every ring was degenerate.
    NoRings,
}

/// Outcome of [`assemble_relation`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelationGeometry {
    /// Assembly succeeded.
    Resolved {
        /// The shape.
        geometry: ResolvedGeometry,
        /// Member ways that could not be resolved.
        missing_ways: usize,
    },
    /// Assembly failed.
    Invalid {
        /// Reason code.
        reason: InvalidGeometry,
        /// Member ways that could not be resolved.
        missing_ways: usize,
    },
}

impl RelationGeometry {
    /// Number of member ways absent from the store.
    #[must_use]
    pub const fn missing_ways(&self) -> usize {
        match self {
            Self::Resolved { missing_ways, .. } | Self::Invalid { missing_ways, .. } => {
                *missing_ways
            }
        }
    }

    /// The shape, if assembly succeeded.
    #[must_use]
    pub fn into_geometry(self) -> Option<ResolvedGeometry> {
        match self {
            Self::Resolved { geometry, .. } => Some(geometry),
            Self::Invalid { .. } => None,
        }
    }
}

/// Assemble the outline of a retained relation.
///
/// Relation members are not followed. Relations typed `multipolygon` or
/// `boundary` have open chains force-closed; other relations may fall back
/// to a single linestring.
///
/// # Errors
///
/// Propagates store failures from `lookup`.
pub fn assemble_relation<L>(
    relation: &OsmRecord,
    lookup: &L,
    diagnostics: &dyn DiagnosticSink,
) -> Result<RelationGeometry, StoreError>
where
    L: ItemLookup + ?Sized,
{
    let name = relation.display_name();
    if !relation.relation_ids.is_empty() {
        diagnostics.record(&Diagnostic::IgnoredRelationMembers {
            relation: relation.id,
            members: relation.relation_ids.clone(),
        });
    }
    if relation.way_ids.is_empty() {
        diagnostics.record(&Diagnostic::NoWays {
            relation: relation.id,
            name: name.to_owned(),
            relation_members: relation.relation_ids.clone(),
        });
        return Ok(RelationGeometry::Invalid {
            reason: InvalidGeometry::NoWays,
            missing_ways: 0,
        });
    }

    let mut fragments = Vec::with_capacity(relation.way_ids.len());
    let mut missing = Vec::new();
    for &way in &relation.way_ids {
        let vertices = match lookup.retrieve(ElementId::way(way))? {
            Some(record) => resolve_vertices(&record.node_ids, lookup)?,
            None => Vec::new(),
        };
        if vertices.is_empty() {
            missing.push(way);
        } else {
            fragments.push(Fragment { way, vertices });
        }
    }
    let missing_ways = missing.len();
    if !missing.is_empty() {
        diagnostics.record(&Diagnostic::MissingWays {
            relation: relation.id,
            name: name.to_owned(),
            missing,
        });
    }
    let invalid = |reason| RelationGeometry::Invalid {
        reason,
        missing_ways,
    };
    if fragments.is_empty() {
        return Ok(invalid(InvalidGeometry::NoResolvedWays));
    }

    let declared_type = relation.declared_type().unwrap_or_default();
    let policy = if matches!(declared_type, "multipolygon" | "boundary") {
        ClosurePolicy::ForceClose
    } else {
        ClosurePolicy::LinearFallback
    };
    let stitched = stitch_rings(fragments, policy, |event| {
        let diagnostic = match event {
            StitchEvent::ForcedPatch { way } => Diagnostic::ForcedPatch {
                relation: relation.id,
                name: name.to_owned(),
                way,
                declared_type: declared_type.to_owned(),
            },
            StitchEvent::TooFewPoints { way, points } => Diagnostic::TooFewPoints {
                relation: relation.id,
                way,
                points,
            },
        };
        diagnostics.record(&diagnostic);
    });

    let geometry: Geometry = match stitched {
        Stitched::Rings(mut rings) => match rings.len() {
            0 => return Ok(invalid(InvalidGeometry::NoRings)),
            1 => polygon(&rings.remove(0)).into(),
            _ => MultiPolygon::new(rings.iter().map(|ring| polygon(ring)).collect()).into(),
        },
        Stitched::LineString(chain) => line(&chain).into(),
        Stitched::Unconnected { way, first, last } => {
            diagnostics.record(&Diagnostic::UnconnectedFragment {
                relation: relation.id,
                name: name.to_owned(),
                way,
                first,
                last,
                declared_type: declared_type.to_owned(),
            });
            return Ok(invalid(InvalidGeometry::Unconnected));
        }
    };

    let admin_centre = match relation.admin_centre {
        Some(node) => {
            let location = lookup
                .retrieve(ElementId::node(node))?
                .and_then(|record| record.location);
            if location.is_none() {
                diagnostics.record(&Diagnostic::MissingAdminCentre {
                    relation: relation.id,
                    node,
                });
            }
            location
        }
        None => None,
    };

    Ok(match finish(&geometry, admin_centre) {
        Some(geometry) => RelationGeometry::Resolved {
            geometry,
            missing_ways,
        },
        None => invalid(InvalidGeometry::NoRings),
    })
}

/// Assemble a retained way as a polygon when closed, else a linestring.
///
/// Nodes missing from the store are skipped. Returns `Ok(None)` when fewer
/// than two nodes resolve.
///
/// # Errors
///
/// Propagates store failures from `lookup`.
pub fn assemble_way<L>(way: &OsmRecord, lookup: &L) -> Result<Option<ResolvedGeometry>, StoreError>
where
    L: ItemLookup + ?Sized,
{
    let vertices = resolve_vertices(&way.node_ids, lookup)?;
    let (Some(first), Some(last)) = (vertices.first(), vertices.last()) else {
        return Ok(None);
    };
    if vertices.len() < 2 {
        return Ok(None);
    }
    let distinct = vertices.iter().map(|v| v.id).collect::<HashSet<_>>().len();
    let geometry: Geometry = if first.id == last.id && distinct >= 3 {
        polygon(&vertices).into()
    } else {
        line(&vertices).into()
    };
    Ok(finish(&geometry, None))
}

/// Point geometry for a retained node, if it has a location.
#[must_use]
pub fn node_geometry(node: &OsmRecord) -> Option<ResolvedGeometry> {
    let center = node.location?;
    Some(ResolvedGeometry {
        wkt: to_wkt(&Point::from(center).into())?,
        area: 0.0,
        center,
    })
}

fn resolve_vertices<L>(node_ids: &[u64], lookup: &L) -> Result<Vec<Vertex>, StoreError>
where
    L: ItemLookup + ?Sized,
{
    let mut vertices = Vec::with_capacity(node_ids.len());
    for &id in node_ids {
        if let Some(coord) = lookup
            .retrieve(ElementId::node(id))?
            .and_then(|record| record.location)
        {
            vertices.push(Vertex { id, coord });
        }
    }
    Ok(vertices)
}

fn line(vertices: &[Vertex]) -> LineString {
    vertices.iter().map(|v| v.coord).collect()
}

fn polygon(ring: &[Vertex]) -> Polygon {
    Polygon::new(line(ring), Vec::new())
}

#[expect(
    clippy::float_arithmetic,
    reason = "bounding-box area is width times height"
)]
fn finish(geometry: &Geometry, center: Option<Coord>) -> Option<ResolvedGeometry> {
    let bounds = geometry.bounding_rect()?;
    Some(ResolvedGeometry {
        wkt: to_wkt(geometry)?,
        area: bounds.width() * bounds.height(),
        center: center.unwrap_or_else(|| bounds.center()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tags;
    use crate::store::{ItemStore, MemoryItemStore};
    use crate::test_support::RecordingDiagnostics;
    use rstest::{fixture, rstest};

    fn node(id: u64, lon: f64, lat: f64) -> OsmRecord {
        let mut record = OsmRecord::new(ElementId::node(id));
        record.location = Some(Coord { x: lon, y: lat });
        record
    }

    fn way(id: u64, nodes: &[u64]) -> OsmRecord {
        let mut record = OsmRecord::new(ElementId::way(id));
        record.node_ids = nodes.to_vec();
        record
    }

    fn relation(kind: &str, ways: &[u64]) -> OsmRecord {
        let mut record = OsmRecord::new(ElementId::relation(1));
        record.name = Some("Sample".into());
        record.tags = Some(Tags::from([("type".to_owned(), kind.to_owned())]));
        record.way_ids = ways.to_vec();
        record
    }

    #[fixture]
    fn square() -> MemoryItemStore {
        let mut store = MemoryItemStore::default();
        store
            .store(vec![
                node(1, 0.0, 0.0),
                node(2, 2.0, 0.0),
                node(3, 2.0, 1.0),
                node(4, 0.0, 1.0),
                way(10, &[1, 2, 3]),
                way(11, &[1, 4, 3]),
                way(12, &[1, 2, 3, 4, 1]),
            ])
            .expect("seed store");
        store
    }

    #[rstest]
    fn multipolygon_from_two_halves(square: MemoryItemStore) {
        let diagnostics = RecordingDiagnostics::default();
        let outcome = assemble_relation(&relation("multipolygon", &[10, 11]), &square, &diagnostics)
            .expect("assemble");

        let geometry = outcome.into_geometry().expect("resolved");
        assert_eq!(geometry.wkt, "POLYGON ((0 0, 2 0, 2 1, 0 1, 0 0))");
        assert!((geometry.area - 2.0).abs() < f64::EPSILON);
        assert_eq!(geometry.center, Coord { x: 1.0, y: 0.5 });
        assert!(diagnostics.events().is_empty());
    }

    #[rstest]
    fn admin_centre_overrides_the_bbox_midpoint(square: MemoryItemStore) {
        let mut boundary = relation("boundary", &[12]);
        boundary.admin_centre = Some(4);

        let geometry = assemble_relation(&boundary, &square, &RecordingDiagnostics::default())
            .expect("assemble")
            .into_geometry()
            .expect("resolved");

        assert_eq!(geometry.center, Coord { x: 0.0, y: 1.0 });
    }

    #[rstest]
    fn missing_ways_are_reported_but_not_fatal(square: MemoryItemStore) {
        let diagnostics = RecordingDiagnostics::default();
        let outcome = assemble_relation(&relation("multipolygon", &[12, 99]), &square, &diagnostics)
            .expect("assemble");

        assert_eq!(outcome.missing_ways(), 1);
        assert!(matches!(outcome, RelationGeometry::Resolved { .. }));
        assert!(matches!(
            diagnostics.events().as_slice(),
            [Diagnostic::MissingWays { missing, .. }] if missing == &[99]
        ));
    }

    #[rstest]
    fn relations_without_ways_are_invalid(square: MemoryItemStore) {
        let diagnostics = RecordingDiagnostics::default();
        let outcome =
            assemble_relation(&relation("multipolygon", &[]), &square, &diagnostics).expect("assemble");

        assert_eq!(
            outcome,
            RelationGeometry::Invalid {
                reason: InvalidGeometry::NoWays,
                missing_ways: 0
            }
        );
        assert_eq!(diagnostics.events().len(), 1);
    }

    #[rstest]
    fn open_route_becomes_a_linestring(square: MemoryItemStore) {
        let geometry = assemble_relation(&relation("route", &[10]), &square, &RecordingDiagnostics::default())
            .expect("assemble")
            .into_geometry()
            .expect("resolved");
        assert_eq!(geometry.wkt, "LINESTRING (0 0, 2 0, 2 1)");
    }

    #[rstest]
    #[case(&[1, 2, 3, 4, 1], Some("POLYGON ((0 0, 2 0, 2 1, 0 1, 0 0))"))]
    #[case(&[1, 2, 3], Some("LINESTRING (0 0, 2 0, 2 1)"))]
    #[case(&[1, 2, 1], Some("LINESTRING (0 0, 2 0, 0 0)"))]
    #[case(&[1, 77], None)]
    fn way_shapes(square: MemoryItemStore, #[case] nodes: &[u64], #[case] expected: Option<&str>) {
        let geometry = assemble_way(&way(50, nodes), &square).expect("assemble");
        assert_eq!(geometry.map(|g| g.wkt).as_deref(), expected);
    }

    #[rstest]
    fn node_geometry_is_a_point() {
        let geometry = node_geometry(&node(5, 13.4, 52.5)).expect("located");
        assert_eq!(geometry.wkt, "POINT (13.4 52.5)");
        assert!(geometry.area.abs() < f64::EPSILON);
        assert_eq!(node_geometry(&OsmRecord::new(ElementId::node(6))), None);
    }
}
