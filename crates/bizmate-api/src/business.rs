use axum::{Extension, Json, extract::State};
use tracing::info;

use bizmate_db::models::{ProfileFields, ProfileRow};
use bizmate_types::api::{ProfileRequest, ProfileResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let db = state.clone();
    let row = blocking(move || db.db.get_profile(user.id))
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    Ok(Json(profile_response(row)))
}

/// Create the caller's profile or overwrite it; there is never more than one.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let fields = ProfileFields {
        business_name: req.business_name,
        niche: req.niche,
        products: req.products,
        tone_of_voice: req.tone_of_voice,
        location: req.location,
    };

    let db = state.clone();
    let row = blocking(move || db.db.upsert_profile(user.id, &fields)).await?;
    info!("Saved business profile {} for user {}", row.id, row.user_id);

    Ok(Json(profile_response(row)))
}

fn profile_response(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: row.id,
        user_id: row.user_id,
        business_name: row.business_name,
        niche: row.niche,
        products: row.products,
        tone_of_voice: row.tone_of_voice,
        location: row.location,
    }
}
