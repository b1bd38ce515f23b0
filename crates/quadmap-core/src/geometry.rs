//! GeoJSON geometries for `geo` predicates.

use serde::{Deserialize, Serialize};

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

/// Geometry values in GeoJSON interchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// True when the geometry carries no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(_) => false,
            Self::MultiPoint(p) | Self::LineString(p) => p.is_empty(),
            Self::MultiLineString(l) | Self::Polygon(l) => l.iter().all(Vec::is_empty),
            Self::MultiPolygon(p) => p.iter().flatten().all(Vec::is_empty),
        }
    }

    /// Check the invariants the store enforces on geometries.
    ///
    /// Coordinates must be finite, line strings need two positions and
    /// polygon rings must be closed with at least four positions.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Point(p) => check_position(p),
            Self::MultiPoint(points) => points.iter().try_for_each(check_position),
            Self::LineString(line) => check_line(line),
            Self::MultiLineString(lines) => lines.iter().try_for_each(|l| check_line(l)),
            Self::Polygon(rings) => rings.iter().try_for_each(|r| check_ring(r)),
            Self::MultiPolygon(polys) => polys
                .iter()
                .flatten()
                .try_for_each(|r| check_ring(r)),
        }
    }
}

fn check_position(p: &Position) -> Result<(), String> {
    if p.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(format!("non-finite coordinate {p:?}"))
    }
}

fn check_line(line: &[Position]) -> Result<(), String> {
    if line.len() < 2 {
        return Err(format!("line string needs 2 positions, got {}", line.len()));
    }
    line.iter().try_for_each(check_position)
}

fn check_ring(ring: &[Position]) -> Result<(), String> {
    if ring.len() < 4 {
        return Err(format!("polygon ring needs 4 positions, got {}", ring.len()));
    }
    if ring.first() != ring.last() {
        return Err("polygon ring is not closed".to_string());
    }
    ring.iter().try_for_each(check_position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_serializes_as_geojson() {
        let g = Geometry::Point([13.4, 52.5]);
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"type":"Point","coordinates":[13.4,52.5]}"#);
    }

    #[test]
    fn open_ring_is_rejected() {
        let g = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        assert!(g.validate().is_err());
    }

    #[test]
    fn closed_ring_is_accepted() {
        let g = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn nan_coordinate_is_rejected() {
        assert!(Geometry::Point([f64::NAN, 1.0]).validate().is_err());
    }

    #[test]
    fn empty_line_is_empty() {
        assert!(Geometry::LineString(vec![]).is_empty());
        assert!(!Geometry::Point([0.0, 0.0]).is_empty());
    }
}
