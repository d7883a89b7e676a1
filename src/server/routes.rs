//! Axum route handlers for the startup ideas service.
//!
//! # Routes
//!
//! - `GET  /`               — Returns a welcome message
//! - `GET  /health`         — Returns `{"status": "ok", "version": ..., "service": ...}`
//! - `POST /generate-ideas` — Accepts `IdeaGenerationRequest`, returns `IdeasResponse`
//! - `POST /validate-idea`  — Accepts `ValidationRequest`, returns `ValidationResponse`

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::models::{IdeaGenerationRequest, IdeasResponse, ValidationRequest, ValidationResponse};
use crate::ideas::{IdeasError, StartupIdeas};
use crate::llm::LlmFactory;
use crate::utilities::config::Settings;

pub const SERVICE_NAME: &str = "startup-ideas";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Hands out one LLM client per request.
    pub llm_factory: Arc<dyn LlmFactory>,
    pub ideas: Arc<StartupIdeas>,
}

impl AppState {
    pub fn new(settings: Settings, llm_factory: Arc<dyn LlmFactory>) -> Result<Self, IdeasError> {
        let ideas = StartupIdeas::load()?.with_max_iter(settings.agent_max_iter);
        Ok(Self {
            settings: Arc::new(settings),
            llm_factory,
            ideas: Arc::new(ideas),
        })
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_allowed_origins);
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/generate-ideas", post(generate_ideas_handler))
        .route("/validate-idea", post(validate_idea_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured origins, mirroring requested
/// methods and headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                tracing::warn!("Ignoring wildcard CORS origin, credentials need explicit origins");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// GET / — welcome message.
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the CrewAI Startup Ideas API",
    }))
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": SERVICE_NAME,
    }))
}

/// POST /generate-ideas — run the idea generation crew.
async fn generate_ideas_handler(
    State(state): State<AppState>,
    Json(request): Json<IdeaGenerationRequest>,
) -> Result<Json<IdeasResponse>, ApiError> {
    const CONTEXT: &str = "Error generating ideas";

    tracing::info!(
        industry = request.industry.as_deref().unwrap_or(""),
        technology_focus = request.technology_focus.as_deref().unwrap_or(""),
        "Generating startup ideas"
    );

    let llm = state
        .llm_factory
        .create()
        .map_err(|e| ApiError::internal(CONTEXT, e))?;
    let ideas = state
        .ideas
        .generate_ideas(llm, &request)
        .await
        .map_err(|e| ApiError::internal(CONTEXT, e))?;

    tracing::info!(ideas = ideas.len(), "Generated startup ideas");
    Ok(Json(IdeasResponse { ideas }))
}

/// POST /validate-idea — run the idea validation crew.
async fn validate_idea_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidationRequest>,
) -> Result<Json<ValidationResponse>, ApiError> {
    const CONTEXT: &str = "Error validating idea";

    let idea = request.idea.trim();
    if idea.is_empty() {
        return Err(ApiError::BadRequest("Idea is required".to_string()));
    }
    tracing::info!(idea = %idea, "Validating startup idea");

    let llm = state
        .llm_factory
        .create()
        .map_err(|e| ApiError::internal(CONTEXT, e))?;
    let report = state
        .ideas
        .validate_idea(llm, idea)
        .await
        .map_err(|e| match e {
            IdeasError::EmptyIdea => ApiError::BadRequest(e.to_string()),
            other => ApiError::internal(CONTEXT, other),
        })?;

    Ok(Json(report.into()))
}
