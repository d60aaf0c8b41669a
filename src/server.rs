use crate::dashboard::{Dashboard, DashboardView};
use crate::page;
use crate::processing;
use crate::render;
use crate::spatial::RegionIndex;
use crate::types::{ColorScaleBounds, TableRow};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unsupported year {0}")]
    UnsupportedYear(i32),

    #[error("no years configured")]
    NoYears,

    #[error("no data for year {0}")]
    NoData(i32),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnsupportedYear(_) => StatusCode::BAD_REQUEST,
            AppError::NoData(_) => StatusCode::NOT_FOUND,
            AppError::NoYears | AppError::Internal(_) => {
                tracing::error!("Request failed: {:#}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": format!("{:#}", self) }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct YearParams {
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PointParams {
    lat: f64,
    lon: f64,
    year: Option<i32>,
}

#[derive(Serialize)]
pub struct DataResponse {
    year: i32,
    rows: Vec<TableRow>,
    bounds: Option<ColorScaleBounds>,
    error: Option<String>,
}

pub fn build_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/map.svg", get(svg_handler))
        .route("/map.png", get(png_handler))
        .route("/api/data", get(data_handler))
        .route("/api/query", get(query_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(dashboard)
}

pub async fn start_server(dashboard: Dashboard) -> Result<()> {
    let server = &dashboard.config().server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    tracing::info!("Starting server on http://{}", addr);

    let app = build_router(Arc::new(dashboard));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn resolve_year(dashboard: &Dashboard, requested: Option<i32>) -> Result<i32, AppError> {
    match requested {
        Some(year) if dashboard.is_supported_year(year) => Ok(year),
        Some(year) => Err(AppError::UnsupportedYear(year)),
        None => dashboard.default_year().ok_or(AppError::NoYears),
    }
}

async fn page_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<YearParams>,
) -> Result<Html<String>, AppError> {
    let year = resolve_year(&dashboard, params.year)?;
    let view = dashboard.view(year).await?;
    Ok(Html(page::render_page(&view, dashboard.years(), year, &dashboard.config().map)))
}

async fn svg_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<YearParams>,
) -> Result<Response, AppError> {
    let year = resolve_year(&dashboard, params.year)?;
    match dashboard.view(year).await? {
        DashboardView::Ready { year, rows, bounds } => {
            let svg = render::render_map_svg(&rows, bounds, year, &dashboard.config().map);
            Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
        }
        _ => Err(AppError::NoData(year)),
    }
}

async fn png_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<YearParams>,
) -> Result<Response, AppError> {
    let year = resolve_year(&dashboard, params.year)?;
    match dashboard.view(year).await? {
        DashboardView::Ready { rows, bounds, .. } => {
            let map = dashboard.config().map.clone();
            let png = tokio::task::spawn_blocking(move || {
                render::render_map_png(&rows, bounds, &map).and_then(|img| render::encode_png(&img))
            })
            .await
            .map_err(|e| anyhow::anyhow!("render task failed: {}", e))??;
            Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
        }
        _ => Err(AppError::NoData(year)),
    }
}

async fn data_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<YearParams>,
) -> Result<Json<DataResponse>, AppError> {
    let year = resolve_year(&dashboard, params.year)?;
    let loaded = dashboard.load().await?;
    let rows = processing::filter_join(&loaded.stats.records, &loaded.geometry, year)
        .iter()
        .map(|row| row.table_row())
        .collect();

    Ok(Json(DataResponse {
        year,
        rows,
        bounds: loaded.bounds,
        error: loaded.stats.error.clone(),
    }))
}

async fn query_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<PointParams>,
) -> Result<Json<Option<TableRow>>, AppError> {
    let year = resolve_year(&dashboard, params.year)?;
    let loaded = dashboard.load().await?;
    let rows = processing::filter_join(&loaded.stats.records, &loaded.geometry, year);

    let index = RegionIndex::new(rows.iter().map(|r| &r.geometry));
    let hit = index.locate(params.lon, params.lat).map(|i| rows[i].table_row());

    Ok(Json(hit))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}
