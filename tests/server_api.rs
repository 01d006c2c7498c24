//! HTTP boundary tests driven through the router with oneshot requests:
//! no sockets, same code path as a live server.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use saferoute::graph::undirected_arcs;
use saferoute::server::{build_router, AppState};
use saferoute::{Projection, RoadNetwork, RouteEngine};

const EPSG: u32 = 32610;

fn loaded_state() -> Arc<AppState> {
    let nodes = vec![
        (1, (500_000.0, 0.0)),
        (2, (500_100.0, 0.0)),
        (3, (500_100.0, 100.0)),
        (4, (500_000.0, 100.0)),
    ];
    let arcs = undirected_arcs(
        &nodes,
        &[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (4, 1, 1.0)],
    );
    let net = RoadNetwork::from_parts(EPSG, nodes, arcs).unwrap();
    let state = Arc::new(AppState::default());
    state.publish(Arc::new(RouteEngine::new(net).unwrap()));
    state
}

fn geo(x: f64, y: f64) -> (f64, f64) {
    Projection::new(EPSG).unwrap().to_geo(x, y)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn point(x: f64, y: f64) -> serde_json::Value {
    let (lon, lat) = geo(x, y);
    serde_json::json!({ "longitude": lon, "latitude": lat })
}

#[tokio::test]
async fn requests_before_load_get_service_unavailable() {
    let app = build_router(Arc::new(AppState::default()), Duration::from_secs(5));
    let req = post_json(
        "/find_path",
        serde_json::json!({
            "start_point": { "longitude": -123.0, "latitude": 0.0 },
            "end_point": { "longitude": -123.0, "latitude": 0.001 },
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("not loaded"));
}

#[tokio::test]
async fn health_reports_readiness() {
    let idle = build_router(Arc::new(AppState::default()), Duration::from_secs(5));
    let response = idle
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ready"], serde_json::json!(false));

    let ready = build_router(loaded_state(), Duration::from_secs(5));
    let response = ready
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["ready"], serde_json::json!(true));
    assert_eq!(body["nodes"], serde_json::json!(4));
}

#[tokio::test]
async fn find_path_happy_path() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    let req = post_json(
        "/find_path",
        serde_json::json!({
            "start_point": point(499_997.0, -3.0),
            "end_point": point(500_103.0, 103.0),
            "polygons": [],
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["path_found"], serde_json::json!(true));
    assert_eq!(body["path_coordinates"].as_array().unwrap().len(), 3);
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn find_path_no_route_is_still_ok() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    // Exclude both intermediate corners; the far corner is unreachable.
    let zone = |x: f64, y: f64| {
        let ring: Vec<[f64; 2]> = [
            (x - 30.0, y - 30.0),
            (x + 30.0, y - 30.0),
            (x + 30.0, y + 30.0),
            (x - 30.0, y + 30.0),
        ]
        .iter()
        .map(|&(mx, my)| {
            let (lon, lat) = geo(mx, my);
            [lon, lat]
        })
        .collect();
        serde_json::json!({ "coordinates": ring })
    };
    let req = post_json(
        "/find_path",
        serde_json::json!({
            "start_point": point(499_997.0, -3.0),
            "end_point": point(500_103.0, 103.0),
            "polygons": [zone(500_100.0, 0.0), zone(500_000.0, 100.0)],
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "no-path is not an error");

    let body = json_body(response).await;
    assert_eq!(body["path_found"], serde_json::json!(false));
    assert!(body.get("path_coordinates").is_none());
}

#[tokio::test]
async fn find_safe_path_happy_path() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    let ring: Vec<[f64; 2]> = [
        (500_080.0, -20.0),
        (500_120.0, -20.0),
        (500_120.0, 20.0),
        (500_080.0, 20.0),
    ]
    .iter()
    .map(|&(mx, my)| {
        let (lon, lat) = geo(mx, my);
        [lon, lat]
    })
    .collect();
    let req = post_json(
        "/find_safe_path",
        serde_json::json!({
            "start_point": point(499_997.0, -3.0),
            "safe_zones": [{ "coordinates": ring }],
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["path_found"], serde_json::json!(true));
    assert_eq!(body["path"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn find_safe_path_requires_a_zone() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    let req = post_json(
        "/find_safe_path",
        serde_json::json!({
            "start_point": point(499_997.0, -3.0),
            "safe_zones": [],
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    let req = post_json("/find_path", serde_json::json!({ "start_point": {} }));
    let response = app.oneshot(req).await.unwrap();
    assert!(
        response.status().is_client_error(),
        "got {}",
        response.status()
    );
}

#[tokio::test]
async fn bad_coordinates_are_rejected() {
    let app = build_router(loaded_state(), Duration::from_secs(5));
    let req = post_json(
        "/find_path",
        serde_json::json!({
            "start_point": { "longitude": 721.5, "latitude": 12.0 },
            "end_point": { "longitude": -123.0, "latitude": 0.0 },
        }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
