use crate::utils::bbox::BoundingBox;
use crate::Errors;
use anyhow::Result;
use geo::{Area, Coord, Intersects, LineString, Polygon, Rect};
use itertools::Itertools;

/// Builds a closed polygon from the ordered vertices.
///
/// The polygon is rejected when it has less than three distinct vertices, any of the coordinates
/// is not finite, or it encloses no area (all the vertices are collinear).
///
pub fn polygon_from_vertices(name: &str, vertices: &[(f32, f32)]) -> Result<Polygon<f64>> {
    if vertices.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(Errors::InvalidZone(name.to_string()).into());
    }

    let coords = vertices
        .iter()
        .map(|(x, y)| Coord {
            x: *x as f64,
            y: *y as f64,
        })
        .dedup()
        .collect::<Vec<_>>();

    let distinct = coords
        .iter()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .unique()
        .count();

    if distinct < 3 {
        return Err(Errors::InvalidZone(name.to_string()).into());
    }

    let polygon = Polygon::new(LineString::new(coords), vec![]);
    if polygon.unsigned_area() <= 0.0 {
        return Err(Errors::InvalidZone(name.to_string()).into());
    }

    Ok(polygon)
}

/// Intersection test between an axis-aligned box and a polygon.
///
/// Both edge overlap and full containment (either way) count as intersection.
///
pub fn intersects(bbox: &BoundingBox, polygon: &Polygon<f64>) -> bool {
    if !bbox.is_finite() {
        return false;
    }
    let rect = Rect::from(bbox);
    polygon.intersects(&rect)
}
