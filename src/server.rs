//! HTTP boundary with Axum and Utoipa.
//!
//! Two POST endpoints (fixed-destination routing and nearest-safe-zone
//! routing) plus a health probe and Swagger UI. The handlers are thin:
//! decode, check readiness, hand the query to the engine on a blocking
//! task, translate the outcome. The artifact loads in the background after
//! the listener binds, so early requests get an honest 503 instead of a
//! connection refusal; a failed load aborts the process.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::engine::{PathQuery, RouteEngine, RouteOutcome, SafePathQuery};
use crate::error::EngineError;
use crate::zones::TargetPolicy;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(find_path, find_safe_path, health),
    components(schemas(
        PointInput,
        PolygonInput,
        PathRequest,
        PathResponse,
        SafePathRequest,
        SafePathResponse,
        HealthResponse,
        ErrorResponse
    )),
    info(
        title = "Saferoute API",
        version = "1.0.0",
        description = "Shortest paths over a road network, avoiding caller-supplied polygonal zones"
    )
)]
struct ApiDoc;

/// Shared handler state. The engine slot is empty until the background load
/// publishes it; handlers treat an empty slot as "not ready".
#[derive(Default)]
pub struct AppState {
    engine: OnceLock<Arc<RouteEngine>>,
}

impl AppState {
    pub fn engine(&self) -> Option<Arc<RouteEngine>> {
        self.engine.get().cloned()
    }

    /// Publish the loaded engine. Later calls are ignored; the first load
    /// wins.
    pub fn publish(&self, engine: Arc<RouteEngine>) {
        let _ = self.engine.set(engine);
    }
}

// ============ Request / response DTOs ============

#[derive(Debug, Deserialize, ToSchema)]
pub struct PointInput {
    /// Geographic longitude (WGS84)
    #[schema(example = -123.1)]
    pub longitude: f64,
    /// Geographic latitude (WGS84)
    #[schema(example = 49.26)]
    pub latitude: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PolygonInput {
    /// Ring vertices as [lon, lat] pairs
    #[schema(example = json!([[-123.11, 49.25], [-123.09, 49.25], [-123.10, 49.27]]))]
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PathRequest {
    pub start_point: PointInput,
    pub end_point: PointInput,
    /// Polygonal areas the path must not enter
    #[serde(default)]
    pub polygons: Vec<PolygonInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PathResponse {
    pub path_found: bool,
    /// Path as [lon, lat] pairs, present when a path was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_coordinates: Option<Vec<[f64; 2]>>,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SafePathRequest {
    pub start_point: PointInput,
    /// Acceptable destination regions; at least one is required
    pub safe_zones: Vec<PolygonInput>,
    /// Polygonal areas the path must not enter
    #[serde(default)]
    pub polygons: Vec<PolygonInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SafePathResponse {
    pub path_found: bool,
    /// Path as [lon, lat] pairs, present when a path was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<[f64; 2]>>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the road network has finished loading
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arcs: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// ============ Handlers ============

/// Shortest path between two points, avoiding the given polygons
#[utoipa::path(
    post,
    path = "/find_path",
    request_body = PathRequest,
    responses(
        (status = 200, description = "Request computed; path_found=false is a normal outcome", body = PathResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 503, description = "Road network not loaded yet", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse),
    )
)]
async fn find_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Response {
    let Some(engine) = state.engine() else {
        return not_ready();
    };

    let query = PathQuery {
        start: (req.start_point.longitude, req.start_point.latitude),
        end: (req.end_point.longitude, req.end_point.latitude),
        exclusions: rings(req.polygons),
    };

    match run_query(engine, move |e| e.find_path(&query)).await {
        Ok(RouteOutcome::Found { path, message, .. }) => Json(PathResponse {
            path_found: true,
            path_coordinates: Some(pairs(path)),
            message,
        })
        .into_response(),
        Ok(RouteOutcome::NotFound { message }) => Json(PathResponse {
            path_found: false,
            path_coordinates: None,
            message,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Shortest path from a start point to the nearest reachable safe zone
#[utoipa::path(
    post,
    path = "/find_safe_path",
    request_body = SafePathRequest,
    responses(
        (status = 200, description = "Request computed; path_found=false is a normal outcome", body = SafePathResponse),
        (status = 400, description = "Malformed request or zero safe zones", body = ErrorResponse),
        (status = 503, description = "Road network not loaded yet", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse),
    )
)]
async fn find_safe_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SafePathRequest>,
) -> Response {
    let Some(engine) = state.engine() else {
        return not_ready();
    };

    let query = SafePathQuery {
        start: (req.start_point.longitude, req.start_point.latitude),
        safe_zones: rings(req.safe_zones),
        exclusions: rings(req.polygons),
        policy: TargetPolicy::default(),
    };

    match run_query(engine, move |e| e.find_safe_path(&query)).await {
        Ok(RouteOutcome::Found { path, message, .. }) => Json(SafePathResponse {
            path_found: true,
            path: Some(pairs(path)),
            message,
        })
        .into_response(),
        Ok(RouteOutcome::NotFound { message }) => Json(SafePathResponse {
            path_found: false,
            path: None,
            message,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Liveness and readiness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    match state.engine() {
        Some(engine) => Json(HealthResponse {
            status: "ok".into(),
            ready: true,
            nodes: Some(engine.graph().node_count()),
            arcs: Some(engine.graph().arc_count()),
        }),
        None => Json(HealthResponse {
            status: "loading".into(),
            ready: false,
            nodes: None,
            arcs: None,
        }),
    }
}

/// Run a routing query off the async runtime. The engine is CPU-bound and a
/// large graph can hold a worker for a while; a panic in the query becomes a
/// generic internal error instead of tearing the connection down.
async fn run_query<F>(engine: Arc<RouteEngine>, f: F) -> Result<RouteOutcome, EngineError>
where
    F: FnOnce(&RouteEngine) -> Result<RouteOutcome, EngineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&engine)).await {
        Ok(result) => result,
        Err(join_err) => {
            tracing::error!(error = %join_err, "routing task aborted");
            Err(EngineError::Internal("routing task aborted".into()))
        }
    }
}

fn rings(polygons: Vec<PolygonInput>) -> Vec<Vec<(f64, f64)>> {
    polygons
        .into_iter()
        .map(|p| p.coordinates.iter().map(|&[lon, lat]| (lon, lat)).collect())
        .collect()
}

fn pairs(path: Vec<(f64, f64)>) -> Vec<[f64; 2]> {
    path.into_iter().map(|(lon, lat)| [lon, lat]).collect()
}

fn not_ready() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "road network not loaded yet".into(),
        }),
    )
        .into_response()
}

fn error_response(err: EngineError) -> Response {
    match err {
        EngineError::InvalidRequest(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: msg }),
        )
            .into_response(),
        EngineError::Internal(msg) => {
            tracing::error!(error = %msg, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".into(),
                }),
            )
                .into_response()
        }
    }
}

// ============ Router and startup ============

/// Build the Axum router.
pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/find_path", post(find_path))
        .route("/find_safe_path", post(find_safe_path))
        .route("/health", get(health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind, kick off the artifact load, and serve until shutdown.
pub async fn serve(
    artifact: PathBuf,
    addr: SocketAddr,
    request_timeout: Duration,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::default());

    // Load in the background so the listener answers (with 503) during the
    // load window. A bad artifact means the process must not serve at all.
    let load_state = state.clone();
    tokio::task::spawn_blocking(move || match RouteEngine::load(&artifact) {
        Ok(engine) => {
            tracing::info!(
                nodes = engine.graph().node_count(),
                arcs = engine.graph().arc_count(),
                crs = engine.graph().crs_epsg(),
                "road network loaded"
            );
            load_state.publish(Arc::new(engine));
        }
        Err(e) => {
            tracing::error!(error = %e, path = %artifact.display(), "failed to load road network");
            std::process::exit(1);
        }
    });

    let app = build_router(state, request_timeout);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    tracing::info!("swagger ui at http://{addr}/swagger-ui/");
    axum::serve(listener, app).await?;

    Ok(())
}
