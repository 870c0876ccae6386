//! HTTP API for the BizMate backend: authentication, per-owner resource
//! stores and generation endpoints.

pub mod auth;
pub mod business;
pub mod chatbot;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod generation;
pub mod marketing;
pub mod middleware;
pub mod scheduler;
pub mod token;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Build the full router. Everything except `/`, `/health` and the two auth
/// entry points sits behind [`require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/business/profile",
            get(business::get_profile)
                .post(business::upsert_profile)
                .put(business::upsert_profile),
        )
        .route(
            "/scheduler/posts",
            get(scheduler::list_posts).post(scheduler::create_post),
        )
        .route(
            "/scheduler/posts/{post_id}",
            get(scheduler::get_post)
                .put(scheduler::update_post)
                .delete(scheduler::delete_post),
        )
        .route("/marketing/generate", post(marketing::generate_content))
        .route("/chatbot/send", post(chatbot::send_message))
        .route(
            "/chatbot/conversations",
            get(chatbot::list_conversations).post(chatbot::create_conversation),
        )
        .route(
            "/chatbot/conversations/{conversation_id}",
            get(chatbot::get_conversation)
                .put(chatbot::update_conversation)
                .delete(chatbot::delete_conversation),
        )
        .route(
            "/chatbot/conversations/{conversation_id}/messages",
            get(chatbot::list_messages),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to BizMate API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run blocking work (SQLite, Argon2) off the async runtime.
pub(crate) async fn blocking<F, T, E>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(Into::into)
}
