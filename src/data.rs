use crate::config::AppConfig;
use crate::geometry::wrap_geometry;
use crate::types::{City, Region};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geojson::{FeatureCollection, GeoJson};
use std::collections::HashMap;
use std::convert::TryInto;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn load_regions(config: &AppConfig) -> Result<Vec<Region>> {
    println!("Loading regions from {:?}...", config.input.regions);
    let collection = read_feature_collection(&config.input.regions)?;

    let mut regions = Vec::new();
    for feature in collection.features {
        let label = match property_string(&feature, &config.input.region_label_property) {
            Some(label) => label,
            None => continue,
        };
        let Some(geom) = feature.geometry else {
            continue;
        };
        let geometry: geo::Geometry<f64> = geom
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert region geometry: {:?}", e))?;
        let boundary = wrap_geometry(geometry);
        if boundary.0.is_empty() {
            // Point/line features carry no area to render.
            continue;
        }
        regions.push(Region { label, boundary });
    }

    println!("Loaded {} regions", regions.len());
    Ok(regions)
}

pub fn load_cities(config: &AppConfig) -> Result<Vec<City>> {
    println!("Loading cities from {:?}...", config.input.cities);
    let collection = read_feature_collection(&config.input.cities)?;

    let rates = match (&config.input.rates_csv, &config.input.join_column_csv) {
        (Some(path), Some(join_column)) => {
            let rate_column = config
                .input
                .rate_column_csv
                .as_deref()
                .ok_or_else(|| anyhow!("rates_csv configured without rate_column_csv"))?;
            Some(load_rates_csv(path, join_column, rate_column)?)
        }
        (Some(_), None) => {
            return Err(anyhow!("rates_csv configured without join_column_csv"))
        }
        _ => None,
    };

    let mut cities = Vec::new();
    for feature in collection.features {
        let name = match property_string(&feature, &config.input.city_name_property) {
            Some(name) => name,
            None => continue,
        };
        let population = property_number(&feature, &config.input.city_population_property)
            .unwrap_or(0.0);
        let rate = match &rates {
            Some(table) => table.get(&name).copied().unwrap_or(0.0),
            None => config
                .input
                .city_rate_property
                .as_deref()
                .and_then(|prop| property_number(&feature, prop))
                .unwrap_or(0.0),
        };

        let Some(geom) = feature.geometry else {
            continue;
        };
        let geometry: geo::Geometry<f64> = geom
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert city geometry: {:?}", e))?;
        let location = match geometry {
            geo::Geometry::Point(p) => p,
            _ => continue, // Cities must be point features
        };

        let display = format!("{} ({:.2}, {:.2})", name, location.x(), location.y());
        cities.push(City {
            name,
            display,
            location,
            population,
            rate,
        });
    }

    println!("Loaded {} cities", cities.len());
    Ok(cities)
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let file =
        File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson =
        GeoJson::from_reader(reader).with_context(|| format!("Failed to parse {:?}", path))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(anyhow!("{:?} must be a FeatureCollection", path)),
    }
}

fn property_string(feature: &geojson::Feature, key: &str) -> Option<String> {
    match feature.properties.as_ref()?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_number(feature: &geojson::Feature, key: &str) -> Option<f64> {
    match feature.properties.as_ref()?.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn load_rates_csv(path: &Path, join_column: &str, rate_column: &str) -> Result<HashMap<String, f64>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let join_idx = headers
        .iter()
        .position(|h| h == join_column)
        .ok_or_else(|| anyhow!("Join column '{}' not found in CSV", join_column))?;
    let rate_idx = headers
        .iter()
        .position(|h| h == rate_column)
        .ok_or_else(|| anyhow!("Rate column '{}' not found in CSV", rate_column))?;

    let mut rates = HashMap::new();
    for result in rdr.records() {
        let record = result?;
        let name = record.get(join_idx).unwrap_or("").to_string();
        if name.is_empty() {
            continue;
        }
        let rate: f64 = record.get(rate_idx).unwrap_or("0").parse().unwrap_or(0.0);
        rates.insert(name, rate);
    }

    Ok(rates)
}
