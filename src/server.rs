use crate::color;
use crate::config::AppConfig;
use crate::error::{DataError, NavError};
use crate::navigation::NavigationController;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// The presenter boundary: the map frontend consumes denormalized view
/// models over HTTP and performs no joins of its own. Navigation events
/// serialize through one controller lock, so input arriving while a state
/// load is pending waits behind it rather than racing it.
pub struct AppState {
    pub nav: Mutex<NavigationController>,
}

pub async fn start_server(config: AppConfig, nav: NavigationController) -> Result<()> {
    let state = Arc::new(AppState {
        nav: Mutex::new(nav),
    });

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/view", get(view_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/select/state/:id", post(select_state_handler))
        .route("/api/select/county/:id", post(select_county_handler))
        .route("/api/back", post(back_handler));

    if let Some(static_dir) = &config.server.static_dir {
        app = app.nest_service("/static", ServeDir::new(static_dir));
    }

    let app = app.layer(CorsLayer::permissive()).with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    println!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_ready() -> Self {
        ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "nation view not bootstrapped".to_string(),
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<NavError> for ApiError {
    fn from(err: NavError) -> Self {
        let status = match &err {
            NavError::InvalidTransition { .. } => StatusCode::CONFLICT,
            NavError::Data(DataError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            NavError::Data(DataError::UnknownRegion(_)) => StatusCode::NOT_FOUND,
            NavError::Data(DataError::FetchFailure { .. }) => StatusCode::BAD_GATEWAY,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn legend_handler() -> Json<serde_json::Value> {
    Json(json!({ "legend": color::legend() }))
}

async fn view_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let nav = state.nav.lock().await;
    let view = nav.active_view().ok_or_else(ApiError::not_ready)?;
    Ok(Json(serde_json::to_value(&view).map_err(ApiError::internal)?))
}

async fn select_state_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut nav = state.nav.lock().await;
    let view = nav.select_state(&id).await?;
    Ok(Json(serde_json::to_value(&*view).map_err(ApiError::internal)?))
}

async fn select_county_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut nav = state.nav.lock().await;
    let view = nav.select_county(&id)?;
    Ok(Json(serde_json::to_value(&*view).map_err(ApiError::internal)?))
}

async fn back_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut nav = state.nav.lock().await;
    nav.back().await?;
    let view = nav.active_view().ok_or_else(ApiError::not_ready)?;
    Ok(Json(serde_json::to_value(&view).map_err(ApiError::internal)?))
}
