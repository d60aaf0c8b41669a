use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// County boundaries, `.geojson`/`.json` or `.shp`.
    #[serde(default = "default_geometry")]
    pub geometry: PathBuf,
    /// Attribute holding the county name in the geometry file.
    #[serde(default = "default_name_field")]
    pub name_field: String,
}

fn default_geometry() -> PathBuf {
    PathBuf::from("maakonnad.geojson")
}

fn default_name_field() -> String {
    "MNIMI".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geometry: default_geometry(),
            name_field: default_name_field(),
        }
    }
}

/// Statistics Estonia PxWeb query for table RV032.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_years")]
    pub years: Vec<i32>,
    #[serde(default = "default_region_codes")]
    pub region_codes: Vec<String>,
    #[serde(default = "default_sex_codes")]
    pub sex_codes: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://andmed.stat.ee/api/v1/et/stat/RV032".to_string()
}

fn default_years() -> Vec<i32> {
    (2014..=2023).collect()
}

fn default_region_codes() -> Vec<String> {
    ["39", "44", "49", "51", "57", "59", "65", "67", "70", "74", "78", "82", "84", "86"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_sex_codes() -> Vec<String> {
    vec!["2".to_string(), "3".to_string()]
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            years: default_years(),
            region_codes: default_region_codes(),
            sex_codes: default_sex_codes(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Latest configured year; the selector defaults to it.
    pub fn latest_year(&self) -> Option<i32> {
        self.years.iter().copied().max()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    960
}

fn default_height() -> u32 {
    640
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Falls back to defaults (plus environment) when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from_file(path);
        }
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// `IIVE_*` overrides read through `lookup`. An unparseable port is ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("IIVE_API_URL") {
            self.api.url = url;
        }
        if let Some(geometry) = lookup("IIVE_GEOMETRY") {
            self.input.geometry = PathBuf::from(geometry);
        }
        if let Some(host) = lookup("IIVE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("IIVE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(level) = lookup("IIVE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}
