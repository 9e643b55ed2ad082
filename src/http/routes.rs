//! HTTP route definitions

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::store::{NewPlayerRecord, PlayerRecord, PlayerRecordUpdate, PlayerStatus, RecordError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.client_origins);

    let player_routes = Router::new()
        .route("/players", get(list_players_handler).post(create_player_handler))
        .route(
            "/players/:id",
            get(get_player_handler)
                .put(update_player_handler)
                .delete(delete_player_handler),
        )
        .route("/players/:id/result", post(record_result_handler))
        .route("/players/by-name/:handle_name", get(player_by_name_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .merge(player_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS from the CLIENT_ORIGIN allow-list; any origin when the list is empty
fn build_cors(client_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    participants: usize,
    open_connections: usize,
    total_connections: u64,
    match_state: &'static str,
    roster: Vec<RosterEntry>,
}

#[derive(Serialize)]
struct RosterEntry {
    slot: i32,
    display_name: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let roster: Vec<RosterEntry> = state
        .hub
        .participants()
        .into_iter()
        .map(|p| RosterEntry {
            slot: p.slot.into(),
            display_name: p.display_name,
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        participants: roster.len(),
        open_connections: state.hub.open_connections(),
        total_connections: state.hub.total_connections(),
        match_state: state.hub.match_state(),
        roster,
    })
}

// ============================================================================
// Player record endpoints
// ============================================================================

#[derive(Deserialize)]
struct ListPlayersQuery {
    status: Option<PlayerStatus>,
}

async fn list_players_handler(
    State(state): State<AppState>,
    Query(query): Query<ListPlayersQuery>,
) -> Json<Vec<PlayerRecord>> {
    let records = match query.status {
        Some(status) => state.records.list_by_status(status),
        None => state.records.list(),
    };
    Json(records)
}

async fn create_player_handler(
    State(state): State<AppState>,
    Json(req): Json<NewPlayerRecord>,
) -> Result<(StatusCode, Json<PlayerRecord>), AppError> {
    let record = state.records.create(req)?;
    info!(player_id = record.id, handle_name = %record.handle_name, "Player record created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_player_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PlayerRecord>, AppError> {
    state
        .records
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::player_not_found(id))
}

async fn player_by_name_handler(
    State(state): State<AppState>,
    Path(handle_name): Path<String>,
) -> Result<Json<PlayerRecord>, AppError> {
    state
        .records
        .find_by_handle_name(&handle_name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Player '{}' not found", handle_name)))
}

async fn update_player_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<PlayerRecordUpdate>,
) -> Result<Json<PlayerRecord>, AppError> {
    state
        .records
        .update(id, req)?
        .map(Json)
        .ok_or_else(|| AppError::player_not_found(id))
}

async fn delete_player_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    if state.records.delete(id) {
        info!(player_id = id, "Player record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::player_not_found(id))
    }
}

#[derive(Deserialize)]
struct RecordResultRequest {
    won: bool,
}

async fn record_result_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<RecordResultRequest>,
) -> Result<Json<PlayerRecord>, AppError> {
    state
        .records
        .record_result(id, req.won)
        .map(Json)
        .ok_or_else(|| AppError::player_not_found(id))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn player_not_found(id: u64) -> Self {
        AppError::NotFound(format!("Player {} not found", id))
    }
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::new(Config::default());
        (build_router(state.clone()), state)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_roster() {
        let (router, state) = app();

        let (status, body) = call(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participants"], 0);
        assert_eq!(body["match_state"], "stopped");

        let (tx, _rx) = mpsc::channel(8);
        let id = state.hub.connect();
        state
            .hub
            .on_join(id, "alpha".to_string(), tx)
            .unwrap();

        let (_, body) = call(&router, "GET", "/health", None).await;
        assert_eq!(body["participants"], 1);
        assert_eq!(body["open_connections"], 1);
        assert_eq!(body["total_connections"], 1);
        assert_eq!(body["roster"], json!([{ "slot": 1, "display_name": "alpha" }]));
    }

    #[tokio::test]
    async fn test_player_crud() {
        let (router, _) = app();

        let (status, created) =
            call(&router, "POST", "/players", Some(json!({ "handle_name": "tanker" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "active");
        let id = created["id"].as_u64().unwrap();

        let (status, fetched) = call(&router, "GET", &format!("/players/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["handle_name"], "tanker");

        let (status, by_name) = call(&router, "GET", "/players/by-name/tanker", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_name["id"], id);

        let (status, updated) = call(
            &router,
            "PUT",
            &format!("/players/{}", id),
            Some(json!({ "status": "suspended" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "suspended");

        let (_, suspended) = call(&router, "GET", "/players?status=suspended", None).await;
        assert_eq!(suspended.as_array().unwrap().len(), 1);
        let (_, active) = call(&router, "GET", "/players?status=active", None).await;
        assert!(active.as_array().unwrap().is_empty());

        let (status, _) = call(&router, "DELETE", &format!("/players/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&router, "GET", &format!("/players/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_record_result_and_validation() {
        let (router, _) = app();

        let (status, body) =
            call(&router, "POST", "/players", Some(json!({ "handle_name": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, created) =
            call(&router, "POST", "/players", Some(json!({ "handle_name": "gunner" }))).await;
        let id = created["id"].as_u64().unwrap();

        call(&router, "POST", &format!("/players/{}/result", id), Some(json!({ "won": true }))).await;
        let (status, record) = call(
            &router,
            "POST",
            &format!("/players/{}/result", id),
            Some(json!({ "won": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["win_count"], 1);
        assert_eq!(record["lose_count"], 1);

        let (status, _) =
            call(&router, "POST", "/players/999/result", Some(json!({ "won": true }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        call(
            &router,
            "PUT",
            &format!("/players/{}", id),
            Some(json!({ "win_count": u32::MAX })),
        )
        .await;
        let (status, record) =
            call(&router, "POST", &format!("/players/{}/result", id), Some(json!({ "won": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["win_count"], u32::MAX);
    }
}
