//! Births, deaths and natural population change by Estonian county.
//!
//! Statistics come from the Statistics Estonia RV032 table, boundaries from a
//! local county file; the two are joined per year and served as a choropleth
//! dashboard.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod fetch;
pub mod page;
pub mod processing;
pub mod render;
pub mod server;
pub mod spatial;
pub mod types;

pub use config::AppConfig;
pub use dashboard::{Dashboard, DashboardView, LoadedData};
pub use fetch::{FetchError, StatFetcher, StatTable};
pub use types::{ColorScaleBounds, DerivedStatRecord, MergedRow, RegionGeometry, StatRecord, TableRow};
