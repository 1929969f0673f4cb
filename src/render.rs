use crate::aggregate::{mean_rate, PopulationBands};
use crate::carving::carve_city_boxes;
use crate::error::EngineError;
use crate::geometry::{self, partition, unroll};
use crate::types::{Cell, City, PointRow, Region, Viewport};
use geo::algorithm::contains::Contains;
use geo::intersects::Intersects;
use geo::MultiPolygon;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Divisor of the frame area giving the remainder-cell size threshold.
    pub box_factor: f64,
    /// City box height/width as a fraction of the frame height/width.
    pub city_box_proportion: f64,
    pub bands: PopulationBands,
}

impl RenderOptions {
    fn validate(&self) -> Result<(), EngineError> {
        if self.box_factor <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "box_factor must be positive, got {}",
                self.box_factor
            )));
        }
        if self.city_box_proportion <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "city_box_proportion must be positive, got {}",
                self.city_box_proportion
            )));
        }
        if self.bands.0.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "population band table is empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub cells: Vec<Cell>,
    pub point_table: Vec<PointRow>,
}

/// Cell geometry flattened into the nested per-polygon coordinate lists the
/// front end's multi-polygon glyph consumes.
#[derive(Debug, Clone, Serialize)]
pub struct CellOutput {
    pub x: Vec<Vec<Vec<f64>>>,
    pub y: Vec<Vec<Vec<f64>>>,
    pub name: String,
    pub rate: f64,
}

impl From<&Cell> for CellOutput {
    fn from(cell: &Cell) -> Self {
        let (x, y) = unroll(&cell.geometry);
        CellOutput {
            x,
            y,
            name: cell.label.clone(),
            rate: cell.rate,
        }
    }
}

/// Turns one viewport over the region and city snapshots into the cell list
/// and the companion city table.
///
/// Pure function of its inputs: nothing is retained between calls, inputs
/// are never mutated, and identical inputs produce identical output. Cells
/// come out per region in iteration order, each region's carved boxes first
/// (city order) and its remainder pieces after (partition order).
pub fn render_map<'a>(
    viewport: &Viewport,
    regions: impl IntoIterator<Item = &'a Region>,
    cities: &[City],
    options: &RenderOptions,
) -> Result<RenderOutput, EngineError> {
    options.validate()?;
    if viewport.area() <= 0.0 {
        return Err(EngineError::InvalidConfiguration(
            "viewport has no area".into(),
        ));
    }

    let (low_pop, high_pop) = options.bands.thresholds_for_span(viewport.width());
    let frame = MultiPolygon::new(vec![viewport.frame()]);

    // Cities visible in this window, largest first so the most important
    // ones carve their box before smaller neighbours.
    let mut visible: Vec<City> = cities
        .iter()
        .filter(|c| c.population >= low_pop && frame.contains(&c.location))
        .cloned()
        .collect();
    visible.sort_by(|a, b| {
        b.population
            .partial_cmp(&a.population)
            .unwrap_or(Ordering::Equal)
    });

    let point_table = visible
        .iter()
        .map(|c| PointRow {
            display: c.display.clone(),
            formatted_rate: format!("{:.2}", c.rate),
        })
        .collect();

    let box_height = options.city_box_proportion * viewport.height();
    let box_width = options.city_box_proportion * viewport.width();
    let cell_threshold = viewport.area() / options.box_factor;

    let mut cells = Vec::new();
    for region in regions {
        if !region.boundary.intersects(&frame) {
            continue;
        }
        let clipped = geometry::intersection(&region.boundary, &frame)?;
        if clipped.0.is_empty() {
            continue;
        }

        let boxed_cities: Vec<City> = visible
            .iter()
            .filter(|c| c.population >= high_pop && clipped.contains(&c.location))
            .cloned()
            .collect();

        let carved = carve_city_boxes(&frame, box_height, box_width, &boxed_cities, &clipped)?;
        for geometry in carved.boxes {
            if geometry.0.is_empty() {
                continue;
            }
            cells.push(Cell {
                rate: mean_rate(&geometry, &visible),
                label: region.label.clone(),
                geometry,
            });
        }
        for geometry in partition(carved.remainder, cell_threshold)? {
            cells.push(Cell {
                rate: mean_rate(&geometry, &visible),
                label: region.label.clone(),
                geometry,
            });
        }
    }

    Ok(RenderOutput { cells, point_table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Coord, Point};

    fn square_region(label: &str, origin: f64, side: f64) -> Region {
        let o = origin;
        let s = origin + side;
        Region {
            label: label.into(),
            boundary: MultiPolygon::new(vec![polygon![
                (x: o, y: o), (x: s, y: o), (x: s, y: s), (x: o, y: s), (x: o, y: o),
            ]]),
        }
    }

    fn city(name: &str, x: f64, y: f64, population: f64, rate: f64) -> City {
        City {
            name: name.into(),
            display: name.into(),
            location: Point::new(x, y),
            population,
            rate,
        }
    }

    fn viewport(side: f64) -> Viewport {
        Viewport::new(Coord { x: 0.0, y: side }, Coord { x: side, y: 0.0 })
    }

    fn options(box_factor: f64, proportion: f64) -> RenderOptions {
        RenderOptions {
            box_factor,
            city_box_proportion: proportion,
            bands: PopulationBands::default(),
        }
    }

    fn total_area(cells: &[Cell]) -> f64 {
        cells.iter().map(|c| c.geometry.unsigned_area()).sum()
    }

    #[test]
    fn square_region_without_cities_partitions_into_quarters() {
        // Frame area 400, box_factor 4: threshold 100.
        let regions = [square_region("Square", 0.0, 20.0)];
        let out = render_map(&viewport(20.0), &regions, &[], &options(4.0, 0.2)).unwrap();

        assert_eq!(out.cells.len(), 4);
        for cell in &out.cells {
            assert_eq!(cell.label, "Square");
            assert_eq!(cell.rate, 0.0);
            assert!((cell.geometry.unsigned_area() - 100.0).abs() < 1e-6);
        }
        assert!((total_area(&out.cells) - 400.0).abs() < 1e-6);
        assert!(out.point_table.is_empty());
    }

    #[test]
    fn qualifying_city_gets_a_box_cell_and_a_table_row() {
        // Span 20 degrees: thresholds (7e3, 7e5). One city over both.
        let regions = [square_region("Square", 0.0, 20.0)];
        let cities = [city("Metropolis", 10.0, 10.0, 1e6, 2.5)];
        let out = render_map(&viewport(20.0), &regions, &cities, &options(4.0, 0.2)).unwrap();

        // Box cell leads: 0.2 * 20 = 4 on each side.
        let first = &out.cells[0];
        assert!((first.geometry.unsigned_area() - 16.0).abs() < 1e-6);
        assert!((first.rate - 2.5).abs() < 1e-12);

        // Boxes plus remainder pieces still tile the region.
        assert!((total_area(&out.cells) - 400.0).abs() < 1e-6);

        assert_eq!(
            out.point_table,
            vec![PointRow {
                display: "Metropolis".into(),
                formatted_rate: "2.50".into(),
            }]
        );
    }

    #[test]
    fn small_city_feeds_rates_but_carves_no_box() {
        // Population clears the low threshold (7e3) but not the high (7e5):
        // listed in the table, rates aggregated, no carved box.
        let regions = [square_region("Square", 0.0, 20.0)];
        let cities = [city("Smallville", 5.0, 5.0, 1e4, 8.0)];
        let out = render_map(&viewport(20.0), &regions, &cities, &options(4.0, 0.2)).unwrap();

        assert_eq!(out.cells.len(), 4);
        assert_eq!(out.point_table.len(), 1);
        // The quarter containing the city picked up its rate.
        let rated: Vec<f64> = out.cells.iter().map(|c| c.rate).filter(|r| *r > 0.0).collect();
        assert_eq!(rated, vec![8.0]);
    }

    #[test]
    fn disjoint_viewport_renders_nothing() {
        let regions = [square_region("Far", 1000.0, 20.0)];
        let cities = [city("Atlantis", 1010.0, 1010.0, 1e6, 1.0)];
        let out = render_map(&viewport(20.0), &regions, &cities, &options(4.0, 0.2)).unwrap();
        assert!(out.cells.is_empty());
        assert!(out.point_table.is_empty());
    }

    #[test]
    fn cells_stay_inside_the_clipped_region() {
        // Region pokes out of the viewport; every cell must lie within the
        // clipped part, so the areas sum to the overlap.
        let regions = [square_region("Half", 10.0, 20.0)];
        let out = render_map(&viewport(20.0), &regions, &[], &options(4.0, 0.2)).unwrap();
        assert!((total_area(&out.cells) - 100.0).abs() < 1e-6);
        for cell in &out.cells {
            let inside = geometry::intersection(&cell.geometry, &regions[0].boundary).unwrap();
            assert!(
                (inside.unsigned_area() - cell.geometry.unsigned_area()).abs() < 1e-6,
                "cell leaked outside its region"
            );
        }
    }

    #[test]
    fn render_is_idempotent() {
        let regions = [
            square_region("A", 0.0, 12.0),
            square_region("B", 12.0, 8.0),
        ];
        let cities = [
            city("One", 6.0, 6.0, 1e6, 3.0),
            city("Two", 16.0, 16.0, 2e6, 5.0),
        ];
        let vp = viewport(20.0);
        let opts = options(8.0, 0.1);
        let first = render_map(&vp, &regions, &cities, &opts).unwrap();
        let second = render_map(&vp, &regions, &cities, &opts).unwrap();

        assert_eq!(first.point_table, second.point_table);
        assert_eq!(first.cells.len(), second.cells.len());
        for (a, b) in first.cells.iter().zip(&second.cells) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.rate, b.rate);
            assert!((a.geometry.unsigned_area() - b.geometry.unsigned_area()).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_bad_options_before_any_geometry_work() {
        let regions = [square_region("Square", 0.0, 20.0)];
        let err = render_map(&viewport(20.0), &regions, &[], &options(0.0, 0.2)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));

        let err =
            render_map(&viewport(20.0), &regions, &[], &options(4.0, -1.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));

        let zero_area = Viewport::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 });
        let err = render_map(&zero_area, &regions, &[], &options(4.0, 0.2)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }
}
