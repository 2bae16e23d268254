//! REST API for the load planner.
//!
//! Provides HTTP endpoints for solving, manual overrides and standalone metrics.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, SolverSettings};
use crate::metrics::{self, SolutionMetrics};
use crate::model::{Container, ItemInstance, Placement, Sku, Solution, ValidationError};
use crate::optimizer::{solve_with_config, solve_with_progress};
use crate::types::Vec3;

#[derive(Clone)]
struct ApiState {
    solver_settings: SolverSettings,
}

/// Upper bound for the summed SKU quantities of a single request.
const MAX_INSTANCES_PER_REQUEST: u64 = 100_000;

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>cubemaster API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the solve endpoints.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": {"L": 1200.0, "W": 1000.0, "H": 1200.0, "maxWeight": 1000.0, "clearance": 5.0},
        "skus": [
            {"id": "a", "name": "Box A", "L": 400.0, "W": 300.0, "H": 300.0, "weight": 10.0, "qty": 4},
            {"id": "c", "name": "Fragile C", "L": 300.0, "W": 300.0, "H": 200.0, "weight": 6.0, "qty": 4, "fragile": true}
        ]
    })
)]
pub struct SolveRequest {
    pub container: Container,
    pub skus: Vec<Sku>,
}

#[derive(Debug)]
struct ValidatedSolveRequest {
    container: Container,
    skus: Vec<Sku>,
}

impl ValidatedSolveRequest {
    fn item_count(&self) -> u64 {
        self.skus.iter().map(|s| u64::from(s.qty)).sum()
    }

    fn into_parts(self) -> (Container, Vec<Sku>) {
        (self.container, self.skus)
    }
}

#[derive(Debug)]
enum RequestValidationError {
    InvalidContainer(ValidationError),
    InvalidSku(ValidationError),
}

impl SolveRequest {
    fn into_validated(self) -> Result<ValidatedSolveRequest, RequestValidationError> {
        self.container
            .validate()
            .map_err(RequestValidationError::InvalidContainer)?;
        Sku::validate_all(&self.skus).map_err(RequestValidationError::InvalidSku)?;

        let instances: u64 = self.skus.iter().map(|s| u64::from(s.qty)).sum();
        if instances > MAX_INSTANCES_PER_REQUEST {
            return Err(RequestValidationError::InvalidSku(
                ValidationError::InvalidConfiguration(format!(
                    "request expands to {} instances, at most {} are allowed",
                    instances, MAX_INSTANCES_PER_REQUEST
                )),
            ));
        }

        Ok(ValidatedSolveRequest {
            container: self.container,
            skus: self.skus,
        })
    }
}

/// Request structure for a manual move from the viewer.
#[derive(Deserialize, ToSchema)]
pub struct OverrideRequest {
    pub container: Container,
    pub solution: Solution,
    pub candidate: Placement,
}

/// Outcome of a manual move; `solution` is unchanged when not accepted.
#[derive(Serialize, ToSchema)]
pub struct OverrideResponse {
    pub accepted: bool,
    pub solution: Solution,
}

/// Request structure for standalone metrics.
#[derive(Deserialize, ToSchema)]
pub struct MetricsRequest {
    pub container: Container,
    pub placements: Vec<Placement>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn parse_solve_request(
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Result<ValidatedSolveRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated() {
        Ok(validated) => Ok(validated),
        Err(RequestValidationError::InvalidContainer(err)) => {
            Err(container_config_error(err.to_string()))
        }
        Err(RequestValidationError::InvalidSku(err)) => Err(validation_error(err.to_string())),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_solve, handle_solve_stream, handle_override, handle_metrics),
    components(
        schemas(
            SolveRequest,
            OverrideRequest,
            OverrideResponse,
            MetricsRequest,
            ErrorResponse,
            Container,
            Sku,
            ItemInstance,
            Placement,
            Solution,
            SolutionMetrics,
            Vec3
        )
    ),
    tags((name = "planning", description = "Endpoints for container load planning"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // API endpoints
        .route("/solve", post(handle_solve))
        .route("/solve_stream", post(handle_solve_stream))
        .route("/override", post(handle_override))
        .route("/metrics", post(handle_metrics))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the viewer.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, solver_settings: SolverSettings) {
    let app = router(ApiState { solver_settings });

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    let display_host = config.display_host().to_string();
    log::info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        log::info!("💡 Local access: http://localhost:{}", config.port());
    }
    log::info!("📦 API Endpoints:");
    log::info!("   - POST /solve");
    log::info!("   - POST /solve_stream");
    log::info!("   - POST /override");
    log::info!("   - POST /metrics");
    log::info!("📑 Documentation:");
    log::info!("   - GET /docs");
    log::info!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        log::error!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /solve endpoint.
///
/// Expands the SKUs into item instances and loads them into the container.
#[utoipa::path(
    post,
    path = "/solve",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "Load plan computed", body = Solution),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_solve(
    State(state): State<ApiState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_solve_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let sku_count = request.skus.len();
    let item_count = request.item_count();
    let (container, skus) = request.into_parts();

    log::info!(
        "📥 New solve request: {} SKUs, {} items",
        sku_count,
        item_count
    );
    let solution = solve_with_config(&container, &skus, state.solver_settings.solver_config());
    log::info!(
        "📦 Result: {} placed, {} unplaced, {:.1}% volume",
        solution.placements.len(),
        solution.unplaced.len(),
        solution.utilization
    );

    (StatusCode::OK, Json(solution)).into_response()
}

/// Handler for POST /solve_stream endpoint (SSE).
///
/// Streams solver events in real-time as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/solve_stream",
    request_body = SolveRequest,
    responses(
        (
            status = 200,
            description = "Streams solver events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_solve_stream(
    State(state): State<ApiState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_solve_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (container, skus) = request.into_parts();
    let solver_config = state.solver_settings.solver_config();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let solution = solve_with_progress(&container, &skus, solver_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away; remaining events are dropped.
                let _ = tx.blocking_send(json);
            }
        });
        log::info!(
            "📦 Stream finished: {} placed, {} unplaced",
            solution.placements.len(),
            solution.unplaced.len()
        );
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /override endpoint.
///
/// Validates a manual move and applies it to the given solution.
#[utoipa::path(
    post,
    path = "/override",
    request_body = OverrideRequest,
    responses(
        (status = 200, description = "Override checked", body = OverrideResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_override(payload: Result<Json<OverrideRequest>, JsonRejection>) -> Response {
    let Json(OverrideRequest {
        container,
        mut solution,
        candidate,
    }) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    if let Err(err) = container.validate() {
        return container_config_error(err.to_string());
    }

    let instance_id = candidate.instance_id.clone();
    let accepted = solution.apply_override(candidate, &container);
    log::info!(
        "✋ Override for {}: {}",
        instance_id,
        if accepted { "accepted" } else { "rejected" }
    );

    (StatusCode::OK, Json(OverrideResponse { accepted, solution })).into_response()
}

/// Handler for POST /metrics endpoint.
///
/// Computes utilization, weight and center of gravity without solving.
#[utoipa::path(
    post,
    path = "/metrics",
    request_body = MetricsRequest,
    responses(
        (status = 200, description = "Metrics computed", body = SolutionMetrics),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_metrics(payload: Result<Json<MetricsRequest>, JsonRejection>) -> Response {
    let Json(MetricsRequest {
        container,
        placements,
    }) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    if let Err(err) = container.validate() {
        return container_config_error(err.to_string());
    }

    let summary = metrics::summarize(&container, &placements);
    (StatusCode::OK, Json(summary)).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApiState {
        ApiState {
            solver_settings: SolverSettings::default(),
        }
    }

    fn sample_request() -> SolveRequest {
        let json = r#"{
            "container": {"L": 30.0, "W": 10.0, "H": 10.0, "maxWeight": 100.0},
            "skus": [{"id": "cube", "name": "Cube", "L": 10.0, "W": 10.0, "H": 10.0, "weight": 5.0, "qty": 2}]
        }"#;
        serde_json::from_str(json).expect("Should parse valid JSON")
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/solve", "/solve_stream", "/override", "/metrics"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["SolveRequest", "Solution", "Placement", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn solve_request_parses_optional_fields() {
        let json = r#"{
            "container": {"L": 10.0, "W": 10.0, "H": 10.0, "maxWeight": 100.0, "clearance": 1.0},
            "skus": [{"id": "a", "name": "A", "L": 5.0, "W": 5.0, "H": 5.0, "weight": 1.0,
                      "qty": 3, "uprightOnly": true, "fragile": true, "stackLimit": 2}]
        }"#;
        let request: SolveRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.container.clearance, 1.0);
        assert!(request.skus[0].upright_only);
        assert!(request.skus[0].fragile);
        assert_eq!(request.skus[0].stack_limit, Some(2));

        let validated = request.into_validated().expect("Should validate");
        assert_eq!(validated.item_count(), 3);
    }

    #[test]
    fn invalid_container_is_reported() {
        let mut request = sample_request();
        request.container.height = 0.0;
        assert!(matches!(
            request.into_validated(),
            Err(RequestValidationError::InvalidContainer(_))
        ));
    }

    #[test]
    fn duplicate_skus_are_reported() {
        let mut request = sample_request();
        let copy = request.skus[0].clone();
        request.skus.push(copy);
        assert!(matches!(
            request.into_validated(),
            Err(RequestValidationError::InvalidSku(ValidationError::DuplicateSku(_)))
        ));
    }

    #[tokio::test]
    async fn solve_handler_returns_solution() {
        let response = handle_solve(State(state()), Ok(Json(sample_request())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn solve_handler_rejects_invalid_sku() {
        let mut request = sample_request();
        request.skus[0].weight = -1.0;
        let response = handle_solve(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Body should be readable");
        serde_json::from_slice(&bytes).expect("Body should be JSON")
    }

    #[test]
    fn oversized_quantities_are_reported() {
        let mut request = sample_request();
        request.skus[0].qty = 4_000_000_000;
        assert!(matches!(
            request.into_validated(),
            Err(RequestValidationError::InvalidSku(
                ValidationError::InvalidConfiguration(_)
            ))
        ));

        let mut at_limit = sample_request();
        at_limit.skus[0].qty = MAX_INSTANCES_PER_REQUEST as u32;
        assert!(at_limit.into_validated().is_ok());
    }

    #[tokio::test]
    async fn solve_handler_rejects_oversized_quantity() {
        let mut request = sample_request();
        request.skus[0].qty = u32::MAX;
        let response = handle_solve(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn override_handler_reports_rejection() {
        let request = sample_request();
        let solution = crate::optimizer::solve(&request.container, &request.skus);
        let candidate = solution.placements[0].with_x(5.0);

        let response = handle_override(Ok(Json(OverrideRequest {
            container: request.container,
            solution: solution.clone(),
            candidate,
        })))
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["accepted"], false);
        let returned: Solution =
            serde_json::from_value(body["solution"].clone()).expect("Should parse solution");
        assert_eq!(returned, solution);
    }

    #[tokio::test]
    async fn override_handler_applies_valid_move() {
        let request = sample_request();
        let solution = crate::optimizer::solve(&request.container, &request.skus);
        assert_eq!(solution.placements[1].pos.x, 10.0);
        let candidate = solution.placements[1].with_x(20.0);

        let response = handle_override(Ok(Json(OverrideRequest {
            container: request.container,
            solution,
            candidate,
        })))
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["accepted"], true);
        let returned: Solution =
            serde_json::from_value(body["solution"].clone()).expect("Should parse solution");
        assert!(returned.placements[1].locked);
        assert!(!returned.placements[0].locked);
        assert_eq!(returned.placements[1].pos.x, 20.0);
        // Equal weights with centroids at x = 5 and x = 25.
        let cog = returned.center_of_gravity.expect("Solution has weight");
        assert_eq!(cog.x, 15.0);
        assert_eq!(returned.total_weight, 10.0);
    }

    #[tokio::test]
    async fn metrics_handler_accepts_empty_placements() {
        let response = handle_metrics(Ok(Json(MetricsRequest {
            container: sample_request().container,
            placements: Vec::new(),
        })))
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["utilization"], 0.0);
        assert!(body["centerOfGravity"].is_null());
    }

    #[tokio::test]
    async fn metrics_handler_rejects_invalid_container() {
        let mut container = sample_request().container;
        container.length = -1.0;
        let response = handle_metrics(Ok(Json(MetricsRequest {
            container,
            placements: Vec::new(),
        })))
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
