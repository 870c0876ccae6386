use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, AuthFailure};

/// The authenticated caller. Every protected handler scopes its store calls
/// to `id`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

/// Verify the bearer token and resolve it to an active user row before the
/// request reaches any handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::Unauthenticated(AuthFailure::MissingToken))?;

    let claims = state.tokens.verify(token).inspect_err(|e| {
        debug!("Rejected bearer token: {}", e);
    })?;

    let db = state.clone();
    let user = blocking(move || db.db.get_user_by_id(claims.sub))
        .await?
        .ok_or(ApiError::Unauthenticated(AuthFailure::UnknownUser))?;

    if !user.is_active {
        return Err(ApiError::Unauthenticated(AuthFailure::InactiveUser));
    }

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
    });
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
