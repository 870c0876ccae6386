use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use bizmate_db::models::{ConversationFields, ConversationRow, MessageRow};
use bizmate_types::api::{
    ChatRequest, ChatResponse, ConversationRequest, ConversationResponse, DeletedResponse,
    MessageResponse,
};
use bizmate_types::models::Sender;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::generation::PromptInputs;
use crate::middleware::CurrentUser;

pub const BOT_AUTHOR: &str = "BizMate Bot";

/// Record the caller's message, ask the generation adapter for a reply in the
/// business's voice, and record that too.
///
/// Without `conversation_id` a new conversation is opened. The provider call
/// happens between two store calls and holds no lock.
///
/// The customer's turn is committed before generation starts. If the client
/// goes away mid-generation the conversation keeps that message with no bot
/// reply; the next send simply continues after it.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Message content must not be empty".to_string()));
    }

    let owner = user.id;
    let db = state.clone();
    let text = content.clone();
    let (conversation_id, profile) = blocking(move || {
        let conversation_id = match req.conversation_id {
            Some(id) => id,
            None => {
                let fields = ConversationFields {
                    customer_name: req.customer_name.unwrap_or_else(|| "Guest".to_string()),
                    platform: req.platform,
                };
                db.db.create_conversation(owner, &fields)?.id
            }
        };
        db.db.append_message(owner, conversation_id, Sender::User, &text)?;
        let profile = db.db.get_profile(owner)?;
        Ok::<_, bizmate_db::DbError>((conversation_id, profile))
    })
    .await
    .map_err(|e| e.named("Conversation"))?;

    let reply = state
        .generation
        .reply(&PromptInputs::from_profile(profile.as_ref(), &content))
        .await;

    let db = state.clone();
    let stored = reply.clone();
    blocking(move || db.db.append_message(owner, conversation_id, Sender::Bot, &stored))
        .await
        .map_err(|e| e.named("Conversation"))?;

    Ok(Json(ChatResponse {
        reply,
        author: BOT_AUTHOR.to_string(),
        conversation_id,
    }))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let db = state.clone();
    let rows = blocking(move || db.db.list_conversations(user.id)).await?;

    Ok(Json(rows.into_iter().map(conversation_response).collect()))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = ConversationFields {
        customer_name: req.customer_name,
        platform: req.platform,
    };

    let db = state.clone();
    let row = blocking(move || db.db.create_conversation(user.id, &fields)).await?;
    info!("Opened conversation {} for user {}", row.id, row.user_id);

    Ok((StatusCode::CREATED, Json(conversation_response(row))))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    ApiPath(conversation_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let db = state.clone();
    let row = blocking(move || db.db.get_conversation(user.id, conversation_id))
        .await
        .map_err(|e| e.named("Conversation"))?;

    Ok(Json(conversation_response(row)))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    ApiPath(conversation_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let fields = ConversationFields {
        customer_name: req.customer_name,
        platform: req.platform,
    };

    let db = state.clone();
    let row = blocking(move || db.db.update_conversation(user.id, conversation_id, &fields))
        .await
        .map_err(|e| e.named("Conversation"))?;

    Ok(Json(conversation_response(row)))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    ApiPath(conversation_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.clone();
    blocking(move || db.db.delete_conversation(user.id, conversation_id))
        .await
        .map_err(|e| e.named("Conversation"))?;

    Ok(Json(DeletedResponse {
        message: "Conversation deleted".to_string(),
    }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    ApiPath(conversation_id): ApiPath<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let db = state.clone();
    let rows = blocking(move || db.db.list_messages(user.id, conversation_id))
        .await
        .map_err(|e| e.named("Conversation"))?;

    Ok(Json(rows.into_iter().map(message_response).collect()))
}

fn conversation_response(row: ConversationRow) -> ConversationResponse {
    ConversationResponse {
        id: row.id,
        user_id: row.user_id,
        customer_name: row.customer_name,
        platform: row.platform,
        last_message: row.last_message,
        updated_at: row.updated_at,
    }
}

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        conversation_id: row.conversation_id,
        sender: row.sender,
        content: row.content,
        timestamp: row.timestamp,
    }
}
