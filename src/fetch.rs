//! Statistics Estonia client
//!
//! Issues the RV032 PxWeb query and parses the CSV answer into
//! [`StatRecord`]s.

use crate::config::ApiConfig;
use crate::types::StatRecord;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error calling {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("response body is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed CSV response: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// PxWeb query body.
#[derive(Debug, Clone, Serialize)]
pub struct StatQuery {
    pub query: Vec<QueryFilter>,
    pub response: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryFilter {
    pub code: String,
    pub selection: Selection,
}

#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub filter: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    pub format: String,
}

impl StatQuery {
    pub fn from_config(api: &ApiConfig) -> Self {
        let item = |code: &str, values: Vec<String>| QueryFilter {
            code: code.to_string(),
            selection: Selection {
                filter: "item".to_string(),
                values,
            },
        };

        Self {
            query: vec![
                item("Aasta", api.years.iter().map(|y| y.to_string()).collect()),
                item("Maakond", api.region_codes.clone()),
                item("Sugu", api.sex_codes.clone()),
            ],
            response: ResponseFormat {
                format: "csv".to_string(),
            },
        }
    }
}

/// What one fetch produced. A non-200 answer is not an error: the table is
/// empty and `error` carries the message shown to the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTable {
    pub records: Vec<StatRecord>,
    pub error: Option<String>,
}

impl StatTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct StatFetcher {
    client: Client,
    url: String,
    query: StatQuery,
}

impl StatFetcher {
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            url: api.url.clone(),
            query: StatQuery::from_config(api),
        })
    }

    /// URL plus serialized payload; identifies the result in the cache.
    pub fn cache_key(&self) -> String {
        let payload = serde_json::to_string(&self.query).unwrap_or_default();
        format!("{} {}", self.url, payload)
    }

    pub async fn fetch(&self) -> Result<StatTable, FetchError> {
        tracing::info!("Fetching statistics from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&self.query)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!("Statistics API answered {}", status);
            return Ok(StatTable {
                records: Vec::new(),
                error: Some(format!("API error: {}", status.as_u16())),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Http {
            url: self.url.clone(),
            source,
        })?;

        let records = parse_csv(&body)?;
        tracing::info!("Loaded {} statistics rows", records.len());

        Ok(StatTable {
            records,
            error: None,
        })
    }
}

/// Strips an optional UTF-8 BOM and decodes the rest.
pub fn decode_utf8_sig(bytes: &[u8]) -> Result<&str, FetchError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?)
}

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<StatRecord>, FetchError> {
    let text = decode_utf8_sig(bytes)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: StatRecord = result?;
        records.push(record);
    }
    Ok(records)
}
