use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use p2g_core::config::{ConfigError, MAX_NUM_WORKOUTS};
use p2g_core::db::{LibSqlSyncStatusRepository, SyncStatusStore};
use p2g_core::pipeline::{command_sync_service, CommandSyncService};
use p2g_core::{SyncResult, SyncStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;

type StatusStore = Arc<LibSqlSyncStatusRepository>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    store: StatusStore,
    // Runs share one status row, so they are serialized here.
    sync: Arc<Mutex<CommandSyncService<StatusStore>>>,
}

impl AppState {
    pub fn from_config(config: Arc<ApiConfig>, store: StatusStore) -> Result<Self, ConfigError> {
        let service = command_sync_service(&config.app, store.clone())?;
        Ok(Self {
            config,
            store,
            sync: Arc::new(Mutex::new(service)),
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new().route("/sync", get(sync_status).post(run_sync));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn sync_status(State(state): State<AppState>) -> Result<Json<SyncStatus>, AppError> {
    Ok(Json(state.store.read_status().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    num_workouts: Option<i64>,
}

async fn run_sync(
    State(state): State<AppState>,
    request: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResult>, AppError> {
    let requested = request.and_then(|Json(request)| request.num_workouts);
    let num_workouts = resolve_num_workouts(requested, state.config.app.default_num_workouts)?;

    let service = state.sync.lock().await;
    let result = service.run_sync(num_workouts).await;
    tracing::info!(
        endpoint = "sync",
        num_workouts,
        success = result.overall_success,
        "Sync request finished"
    );
    Ok(Json(result))
}

fn resolve_num_workouts(requested: Option<i64>, default: u32) -> Result<u32, AppError> {
    let Some(requested) = requested else {
        return Ok(default);
    };
    if requested <= 0 {
        return Err(AppError::bad_request("numWorkouts must be greater than 0"));
    }
    u32::try_from(requested)
        .ok()
        .filter(|count| *count <= MAX_NUM_WORKOUTS)
        .ok_or_else(|| {
            AppError::bad_request(format!("numWorkouts must be at most {MAX_NUM_WORKOUTS}"))
        })
}
