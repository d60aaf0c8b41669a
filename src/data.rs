use crate::config::InputConfig;
use crate::types::RegionGeometry;
use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::path::Path;

/// Loads county boundaries. Any failure here is fatal for the dashboard.
pub fn load_geometry(input: &InputConfig) -> Result<Vec<RegionGeometry>> {
    let extension = input.geometry.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile(&input.geometry, &input.name_field)?,
        "json" | "geojson" => load_geojson(&input.geometry, &input.name_field)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    tracing::info!("Loaded geometry for {} regions from {:?}", regions.len(), input.geometry);

    Ok(regions)
}

fn load_shapefile(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name_value = record.get(name_field)
            .ok_or_else(|| anyhow!("Name column '{}' not found in Shapefile", name_field))?;

        let name = match name_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.clone(),
            shapefile::dbase::FieldValue::Character(None) => continue,
            _ => return Err(anyhow!("Shapefile name column must be a string")),
        };

        let boundary: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon for {}: {:?}", name, e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM for {}: {:?}", name, e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ for {}: {:?}", name, e))?,
            _ => continue,
        };

        regions.push(RegionGeometry { name, boundary });
    }

    Ok(regions)
}

fn load_geojson(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    use std::io::BufReader;
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let name = match feature.properties.as_ref().and_then(|props| props.get(name_field)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => continue,
        };

        let boundary = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry for {}: {:?}", name, e))?;

                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(RegionGeometry { name, boundary });
    }

    Ok(regions)
}
