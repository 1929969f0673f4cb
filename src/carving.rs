use crate::error::EngineError;
use crate::geometry;
use crate::types::City;
use geo::{Coord, MultiPolygon, Rect};

/// The result of carving one region: one (possibly empty) box per city, in
/// the order the cities were supplied, and whatever of the region is left.
#[derive(Debug, Clone)]
pub struct CarvedRegion {
    pub boxes: Vec<MultiPolygon<f64>>,
    pub remainder: MultiPolygon<f64>,
}

/// Carves a fixed-size box out of the region around each city, sequentially.
/// Each box is clipped to the frame and then to the *current* remainder, and
/// subtracted from it, so later boxes can never overlap earlier ones. The
/// remainder threading makes the loop inherently order-dependent; callers
/// supply cities population-descending so the largest claim ground first.
///
/// Inputs are never mutated; every step produces fresh geometry.
pub fn carve_city_boxes(
    frame: &MultiPolygon<f64>,
    box_height: f64,
    box_width: f64,
    cities: &[City],
    region: &MultiPolygon<f64>,
) -> Result<CarvedRegion, EngineError> {
    if box_height <= 0.0 || box_width <= 0.0 {
        return Err(EngineError::InvalidConfiguration(format!(
            "city box dimensions must be positive, got {box_width}x{box_height}"
        )));
    }

    let seed = CarvedRegion {
        boxes: Vec::with_capacity(cities.len()),
        remainder: region.clone(),
    };
    cities.iter().try_fold(seed, |mut carved, city| {
        let raw = box_around(city.location.0, box_height, box_width);
        let framed = geometry::intersection(&raw, frame)?;
        let boxed = geometry::intersection(&framed, &carved.remainder)?;
        carved.remainder = geometry::difference(&carved.remainder, &boxed)?;
        carved.boxes.push(boxed);
        Ok(carved)
    })
}

fn box_around(center: Coord<f64>, height: f64, width: f64) -> MultiPolygon<f64> {
    let rect = Rect::new(
        Coord {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
        },
        Coord {
            x: center.x + width / 2.0,
            y: center.y + height / 2.0,
        },
    );
    MultiPolygon::new(vec![rect.to_polygon()])
}
