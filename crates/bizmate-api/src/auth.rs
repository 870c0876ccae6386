use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use bizmate_db::Database;
use bizmate_types::api::{LoginForm, SignupRequest, SignupResponse, TokenResponse, UserResponse};

use crate::blocking;
use crate::credentials;
use crate::error::ApiError;
use crate::extract::{ApiForm, ApiJson};
use crate::generation::GenerationAdapter;
use crate::generation::stub::StubGenerationProvider;
use crate::middleware::CurrentUser;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    /// Chat replies; may be running without a provider.
    pub generation: GenerationAdapter,
    /// Template picker behind marketing content.
    pub templates: StubGenerationProvider,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = blocking(move || credentials::register(&db.db, &req.email, &req.password)).await?;

    let access_token = state.tokens.issue(user.id, &user.email)?;
    info!("Registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            access_token,
            token_type: "bearer".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let db = state.clone();
    let user =
        blocking(move || credentials::verify(&db.db, &form.username, &form.password)).await?;

    let access_token = state.tokens.issue(user.id, &user.email)?;
    Ok(Json(TokenResponse::bearer(access_token)))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let db = state.clone();
    let row = blocking(move || db.db.get_user_by_id(user.id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse {
        id: row.id,
        email: row.email,
        is_active: row.is_active,
    }))
}
