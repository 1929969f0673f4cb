use crate::aggregate::PopulationBands;
use crate::render::RenderOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// GeoJSON FeatureCollection of region boundaries.
    pub regions: PathBuf,
    /// GeoJSON FeatureCollection of city points.
    pub cities: PathBuf,
    /// Optional CSV with one rate per city, joined by name.
    pub rates_csv: Option<PathBuf>,
    pub region_label_property: String,
    pub city_name_property: String,
    pub city_population_property: String,
    /// Property to read rates from when no CSV is configured.
    pub city_rate_property: Option<String>,
    pub join_column_csv: Option<String>,
    pub rate_column_csv: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    pub box_factor: f64,
    pub city_box_proportion: f64,
    /// Multiplier taking the population-band spans (degrees by default)
    /// into the units of the projected input coordinates.
    pub span_scale: Option<f64>,
    pub population_bands: Option<PopulationBands>,
}

impl RenderConfig {
    pub fn to_options(&self) -> RenderOptions {
        let bands = self.population_bands.clone().unwrap_or_default();
        RenderOptions {
            box_factor: self.box_factor,
            city_box_proportion: self.city_box_proportion,
            bands: bands.scaled(self.span_scale.unwrap_or(1.0)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
