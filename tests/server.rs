mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{csv_body, geometry_file, API_PATH};
use iive_map::dashboard::Dashboard;
use iive_map::page::NO_DATA_WARNING;
use iive_map::server::build_router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    _server: MockServer,
    _geometry: tempfile::NamedTempFile,
    app: Router,
}

async fn harness(status: u16) -> Harness {
    let server = MockServer::start().await;
    let geometry = geometry_file();

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(csv_body()))
        .expect(..=1)
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(common::config(&server, &geometry)).unwrap();
    Harness {
        app: build_router(Arc::new(dashboard)),
        _server: server,
        _geometry: geometry,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

#[tokio::test]
async fn page_defaults_to_latest_year() {
    let h = harness(200).await;
    let (status, content_type, body) = get(&h.app, "/").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(html.contains(r#"<option value="2023" selected>2023</option>"#));
    assert!(html.contains("Loomulik iive maakonniti aastal 2023"));
    assert!(html.contains("<td>Harju maakond</td>"));
    assert!(!html.contains("Ida-Viru maakond"));
}

#[tokio::test]
async fn switching_year_reuses_fetched_data() {
    // The mock allows at most one POST across both page views.
    let h = harness(200).await;

    let (status, _, body) = get(&h.app, "/?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("aastal 2023"));

    let (status, _, body) = get(&h.app, "/?year=2014").await;
    let html = String::from_utf8(body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("aastal 2014"));
    assert!(html.contains(r#"<td class="num">2350</td>"#));
}

#[tokio::test]
async fn failed_fetch_shows_warning_only() {
    let h = harness(500).await;
    let (status, _, body) = get(&h.app, "/").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("API error: 500"));
    assert!(html.contains(NO_DATA_WARNING));
    assert!(!html.contains("<table>"));
    assert!(!html.contains("<svg"));
}

#[tokio::test]
async fn unsupported_year_is_bad_request() {
    let h = harness(200).await;
    let (status, _, body) = get(&h.app, "/?year=1999").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "unsupported year 1999");
}

#[tokio::test]
async fn data_endpoint_returns_joined_rows_and_bounds() {
    let h = harness(200).await;
    let (status, _, body) = get(&h.app, "/api/data?year=2023").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["year"], 2023);
    assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["rows"][0]["region"], "Harju maakond");
    assert_eq!(json["rows"][0]["births"], 1950);
    assert_eq!(json["rows"][0]["deaths"], 1750);
    assert_eq!(json["rows"][0]["natural_change"], 200);
    assert_eq!(json["bounds"]["min"], -1120);
    assert_eq!(json["bounds"]["max"], 610);
}

#[tokio::test]
async fn point_query_finds_county() {
    let h = harness(200).await;

    let (_, _, body) = get(&h.app, "/api/query?lat=59.3&lon=24.7&year=2023").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["region"], "Harju maakond");
    assert_eq!(json["natural_change"], 200);

    let (_, _, body) = get(&h.app, "/api/query?lat=57.0&lon=21.0").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.is_null());
}

#[tokio::test]
async fn map_endpoints_serve_images() {
    let h = harness(200).await;

    let (status, content_type, body) = get(&h.app, "/map.svg?year=2014").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/svg+xml"));
    assert!(String::from_utf8(body).unwrap().starts_with("<svg"));

    let (status, content_type, body) = get(&h.app, "/map.png?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&body[1..4], b"PNG");
}

#[tokio::test]
async fn map_for_year_without_data_is_not_found() {
    let h = harness(200).await;
    let (status, _, _) = get(&h.app, "/map.svg?year=2019").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_does_not_touch_the_api() {
    let server = MockServer::start().await;
    let geometry = geometry_file();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = build_router(Arc::new(Dashboard::new(common::config(&server, &geometry)).unwrap()));
    let (status, _, body) = get(&app, "/health").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn startup_survives_unreachable_api_and_retries_on_first_view() {
    let server = MockServer::start().await;
    let geometry = geometry_file();

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(csv_body())
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(csv_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = common::config(&server, &geometry);
    config.api.request_timeout_secs = 1;
    let dashboard = Dashboard::new(config).unwrap();
    dashboard.warm_up().await.unwrap();

    let app = build_router(Arc::new(dashboard));
    let (status, _, body) = get(&app, "/").await;
    let html = String::from_utf8(body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<td>Harju maakond</td>"));
}

#[tokio::test]
async fn startup_fails_without_geometry() {
    let server = MockServer::start().await;
    let geometry = geometry_file();
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(csv_body()))
        .mount(&server)
        .await;

    let mut config = common::config(&server, &geometry);
    config.input.geometry = "/nonexistent/maakonnad.geojson".into();
    let dashboard = Dashboard::new(config).unwrap();
    assert!(dashboard.warm_up().await.is_err());
}
