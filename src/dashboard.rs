//! Load → filter/join → view pipeline behind every page request.

use crate::cache::{Memo, MemoStats};
use crate::config::AppConfig;
use crate::data;
use crate::fetch::{FetchError, StatFetcher, StatTable};
use crate::processing;
use crate::types::{ColorScaleBounds, MergedRow, RegionGeometry};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything that is computed once per process.
#[derive(Clone)]
pub struct LoadedData {
    pub stats: Arc<StatTable>,
    pub geometry: Arc<Vec<RegionGeometry>>,
    pub bounds: Option<ColorScaleBounds>,
}

/// What the presentation layer should show for one year selection.
#[derive(Debug, Clone)]
pub enum DashboardView {
    /// The statistics table is empty, usually because the API call failed.
    NoData { error: Option<String> },
    /// Data exists, but nothing for this year survived the join.
    EmptyYear { year: i32 },
    Ready {
        year: i32,
        rows: Vec<MergedRow>,
        bounds: ColorScaleBounds,
    },
}

pub struct Dashboard {
    config: AppConfig,
    fetcher: StatFetcher,
    stats: Memo<String, StatTable>,
    geometry: Memo<(PathBuf, String), Vec<RegionGeometry>>,
    bounds: Memo<String, Option<ColorScaleBounds>>,
}

impl Dashboard {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = StatFetcher::new(&config.api)?;
        Ok(Self {
            config,
            fetcher,
            stats: Memo::new("statistics"),
            geometry: Memo::new("geometry"),
            bounds: Memo::new("bounds"),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn years(&self) -> &[i32] {
        &self.config.api.years
    }

    pub fn default_year(&self) -> Option<i32> {
        self.config.api.latest_year()
    }

    pub fn is_supported_year(&self, year: i32) -> bool {
        self.years().contains(&year)
    }

    pub async fn load(&self) -> Result<LoadedData> {
        let key = self.fetcher.cache_key();

        let stats = self
            .stats
            .get_or_try_insert_with(key.clone(), || self.fetcher.fetch())
            .await?;

        let input = self.config.input.clone();
        let geometry = self
            .geometry
            .get_or_try_insert_with((input.geometry.clone(), input.name_field.clone()), || async move {
                tokio::task::spawn_blocking(move || data::load_geometry(&input))
                    .await
                    .map_err(|e| anyhow::anyhow!("geometry load task failed: {}", e))?
            })
            .await?;

        let bounds = self
            .bounds
            .get_or_try_insert_with(key, || async {
                Ok::<_, anyhow::Error>(processing::color_scale_bounds(&stats.records))
            })
            .await?;

        Ok(LoadedData {
            stats,
            geometry,
            bounds: *bounds,
        })
    }

    /// Pre-fills the caches before serving. A statistics fetch that fails
    /// in transport is logged and left uncached so the first page view
    /// retries it; geometry failures stay fatal.
    pub async fn warm_up(&self) -> Result<()> {
        match self.load().await {
            Ok(_) => Ok(()),
            Err(e) if e.downcast_ref::<FetchError>().is_some() => {
                tracing::warn!("Statistics not available at startup, will retry on request: {:#}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn view(&self, year: i32) -> Result<DashboardView> {
        let loaded = self.load().await?;
        Ok(build_view(&loaded, year))
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            statistics: self.stats.stats(),
            geometry: self.geometry.stats(),
            bounds: self.bounds.stats(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub statistics: MemoStats,
    pub geometry: MemoStats,
    pub bounds: MemoStats,
}

pub fn build_view(loaded: &LoadedData, year: i32) -> DashboardView {
    let bounds = match loaded.bounds {
        Some(bounds) if !loaded.stats.is_empty() => bounds,
        _ => {
            return DashboardView::NoData {
                error: loaded.stats.error.clone(),
            }
        }
    };

    let rows = processing::filter_join(&loaded.stats.records, &loaded.geometry, year);
    if rows.is_empty() {
        return DashboardView::EmptyYear { year };
    }

    DashboardView::Ready { year, rows, bounds }
}
