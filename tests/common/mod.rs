#![allow(dead_code)]

use iive_map::config::AppConfig;
use std::io::Write;
use wiremock::MockServer;

pub const API_PATH: &str = "/api/v1/et/stat/RV032";

const HEADER: &str = "Aasta,Maakond,Mehed Elussünnid,Naised Elussünnid,Mehed Surmad,Naised Surmad,Mehed Loomulik iive,Naised Loomulik iive";

pub const COUNTIES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "MNIMI": "Harju maakond" },
      "geometry": { "type": "Polygon", "coordinates": [[[24.0, 59.0], [25.5, 59.0], [25.5, 59.6], [24.0, 59.6], [24.0, 59.0]]] }
    },
    {
      "type": "Feature",
      "properties": { "MNIMI": "Tartu maakond" },
      "geometry": { "type": "Polygon", "coordinates": [[[26.2, 58.1], [27.2, 58.1], [27.2, 58.7], [26.2, 58.7], [26.2, 58.1]]] }
    }
  ]
}"#;

/// RV032-shaped CSV with a BOM. Ida-Viru has no geometry in [`COUNTIES`].
pub fn csv_body() -> Vec<u8> {
    let mut body = String::from("\u{feff}");
    body.push_str(HEADER);
    body.push('\n');
    body.push_str("2023,Harju maakond,1000,950,900,850,100,100\n");
    body.push_str("2023,Tartu maakond,700,680,750,720,-50,-40\n");
    body.push_str("2023,Ida-Viru maakond,500,480,1100,1000,-600,-520\n");
    body.push_str("2014,Harju maakond,1200,1150,880,860,320,290\n");
    body.push_str("2014,Tartu maakond,820,790,760,730,60,60\n");
    body.into_bytes()
}

pub fn geometry_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".geojson").tempfile().unwrap();
    file.write_all(COUNTIES.as_bytes()).unwrap();
    file
}

pub fn config(server: &MockServer, geometry: &tempfile::NamedTempFile) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.url = format!("{}{}", server.uri(), API_PATH);
    config.api.request_timeout_secs = 5;
    config.input.geometry = geometry.path().to_path_buf();
    config.map.width = 200;
    config.map.height = 140;
    config
}
