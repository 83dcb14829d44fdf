//! Well-Known Text rendering for the shapes the assembler produces.

use std::fmt::Write as _;

use geo::{Coord, Geometry, LineString, Polygon};

/// Render `geometry` as WKT with `lon lat` coordinate pairs.
///
/// Returns `None` for geometry kinds the indexer never emits.
#[must_use]
pub fn to_wkt(geometry: &Geometry) -> Option<String> {
    let mut out = String::new();
    match geometry {
        Geometry::Point(point) => {
            out.push_str("POINT (");
            push_coord(&mut out, point.0);
            out.push(')');
        }
        Geometry::LineString(line) => {
            out.push_str("LINESTRING ");
            push_ring(&mut out, line);
        }
        Geometry::Polygon(polygon) => {
            out.push_str("POLYGON ");
            push_polygon(&mut out, polygon);
        }
        Geometry::MultiPolygon(multi) => {
            out.push_str("MULTIPOLYGON (");
            for (index, polygon) in multi.0.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                push_polygon(&mut out, polygon);
            }
            out.push(')');
        }
        _ => return None,
    }
    Some(out)
}

fn push_polygon(out: &mut String, polygon: &Polygon) {
    out.push('(');
    push_ring(out, polygon.exterior());
    for interior in polygon.interiors() {
        out.push_str(", ");
        push_ring(out, interior);
    }
    out.push(')');
}

fn push_ring(out: &mut String, line: &LineString) {
    out.push('(');
    for (index, coord) in line.coords().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        push_coord(out, *coord);
    }
    out.push(')');
}

fn push_coord(out: &mut String, coord: Coord) {
    // Writing into a String cannot fail.
    let _ = write!(out, "{} {}", coord.x, coord.y);
}
