//! Scheduled-post store. "Scheduled" is only a label here: nothing publishes
//! a post when its `scheduled_time` arrives.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use bizmate_db::models::{PostFields, PostRow};
use bizmate_types::api::{DeletedResponse, PostRequest, PostResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let db = state.clone();
    let rows = blocking(move || db.db.list_posts(user.id)).await?;

    Ok(Json(rows.into_iter().map(post_response).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = post_fields(req);

    let db = state.clone();
    let row = blocking(move || db.db.create_post(user.id, &fields)).await?;

    Ok((StatusCode::CREATED, Json(post_response(row))))
}

pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<PostResponse>, ApiError> {
    let db = state.clone();
    let row = blocking(move || db.db.get_post(user.id, post_id))
        .await
        .map_err(|e| e.named("Post"))?;

    Ok(Json(post_response(row)))
}

pub async fn update_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let fields = post_fields(req);

    let db = state.clone();
    let row = blocking(move || db.db.update_post(user.id, post_id, &fields))
        .await
        .map_err(|e| e.named("Post"))?;

    Ok(Json(post_response(row)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.clone();
    blocking(move || db.db.delete_post(user.id, post_id))
        .await
        .map_err(|e| e.named("Post"))?;

    Ok(Json(DeletedResponse {
        message: "Post deleted".to_string(),
    }))
}

fn post_fields(req: PostRequest) -> PostFields {
    PostFields {
        title: req.title,
        content: req.content,
        platform: req.platform,
        status: req.status,
        image_prompt: req.image_prompt,
        scheduled_time: req.scheduled_time,
    }
}

fn post_response(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        content: row.content,
        platform: row.platform,
        status: row.status,
        scheduled_time: row.scheduled_time,
        image_prompt: row.image_prompt,
        created_at: row.created_at,
    }
}
