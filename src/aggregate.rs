use crate::types::City;
use geo::algorithm::contains::Contains;
use geo::MultiPolygon;
use serde::Deserialize;

/// The rate assigned to a cell: arithmetic mean of the rates of the cities
/// strictly inside its geometry. Zero when no city qualifies, by policy.
pub fn mean_rate(geometry: &MultiPolygon<f64>, cities: &[City]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u32;
    for city in cities {
        if geometry.contains(&city.location) {
            sum += city.rate;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

/// One row of the zoom-to-population table: viewports spanning more than
/// `span_above` use these population cutoffs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PopulationBand {
    pub span_above: f64,
    pub low: f64,
    pub high: f64,
}

/// Monotonic step table mapping viewport span to the `(low, high)`
/// population thresholds: `low` gates the city table and box candidates,
/// `high` gates which cities get their own carved box. Rows are evaluated
/// top-down; the last row is the fallback for the narrowest windows.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationBands(pub Vec<PopulationBand>);

impl Default for PopulationBands {
    /// Spans in degrees of longitude: the wider the window, the larger a
    /// city must be to matter.
    fn default() -> Self {
        let rows = [
            (180.0, 5e4, 5e6),
            (120.0, 3e4, 3e6),
            (100.0, 2.5e4, 2.5e6),
            (80.0, 2e4, 2e6),
            (60.0, 1.5e4, 1.5e6),
            (50.0, 1e4, 1e6),
            (40.0, 9e3, 9e5),
            (30.0, 8e3, 8e5),
            (20.0, 7e3, 7e5),
            (15.0, 6.5e3, 6.5e5),
            (10.0, 6e3, 6e5),
            (7.5, 5.5e3, 5.5e5),
            (5.0, 5e3, 5e5),
            (0.0, 4e3, 4e5),
        ];
        PopulationBands(
            rows.iter()
                .map(|&(span_above, low, high)| PopulationBand {
                    span_above,
                    low,
                    high,
                })
                .collect(),
        )
    }
}

impl PopulationBands {
    pub fn thresholds_for_span(&self, span: f64) -> (f64, f64) {
        self.0
            .iter()
            .find(|band| span > band.span_above)
            .or_else(|| self.0.last())
            .map(|band| (band.low, band.high))
            .unwrap_or((0.0, 0.0))
    }

    /// Rescales the span column, e.g. to compare against spans measured in
    /// projected meters instead of degrees.
    pub fn scaled(mut self, factor: f64) -> Self {
        for band in &mut self.0 {
            band.span_above *= factor;
        }
        self
    }
}
