use geo::{Coord, MultiPolygon, Point, Polygon, Rect};
use serde::Serialize;

/// A populated place carrying the metric value. Snapshots are immutable for
/// the duration of one render.
#[derive(Debug, Clone)]
pub struct City {
    pub name: String,
    pub display: String,
    pub location: Point<f64>,
    pub population: f64,
    pub rate: f64,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub label: String,
    pub boundary: MultiPolygon<f64>,
}

/// Axis-aligned render window in projected coordinates, given as two
/// opposite corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub upper_left: Coord<f64>,
    pub lower_right: Coord<f64>,
}

impl Viewport {
    pub fn new(upper_left: Coord<f64>, lower_right: Coord<f64>) -> Self {
        Viewport {
            upper_left,
            lower_right,
        }
    }

    /// The clipping frame as a polygon.
    pub fn frame(&self) -> Polygon<f64> {
        Rect::new(self.upper_left, self.lower_right).to_polygon()
    }

    pub fn width(&self) -> f64 {
        (self.lower_right.x - self.upper_left.x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.upper_left.y - self.lower_right.y).abs()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// One unit of render output: a labelled, rated piece of a region. Either a
/// box carved around a city or a piece of the partitioned remainder.
#[derive(Debug, Clone)]
pub struct Cell {
    pub geometry: MultiPolygon<f64>,
    pub label: String,
    pub rate: f64,
}

/// One row of the companion city table shown next to the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointRow {
    pub display: String,
    pub formatted_rate: String,
}
