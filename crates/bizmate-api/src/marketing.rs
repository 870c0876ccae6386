use axum::{Extension, Json, extract::State};
use tracing::debug;

use bizmate_db::models::ProfileRow;
use bizmate_types::api::{ContentRequest, GeneratedContent};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::generation::stub::StubGenerationProvider;
use crate::middleware::CurrentUser;

/// Marketing copy for a topic, assembled from templates picked by the stub
/// provider. No model is involved.
pub async fn generate_content(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<Json<GeneratedContent>, ApiError> {
    let topic = req.topic.trim().to_string();
    if topic.is_empty() {
        return Err(ApiError::BadRequest("Topic must not be empty".to_string()));
    }
    let tone = req.tone.as_deref().unwrap_or("Professional");
    debug!("Generating marketing content on {:?} in a {} tone", topic, tone);

    let db = state.clone();
    let profile = blocking(move || db.db.get_profile(user.id)).await?;

    Ok(Json(compose(&state.templates, &topic, profile.as_ref())))
}

pub fn compose(
    picker: &StubGenerationProvider,
    topic: &str,
    profile: Option<&ProfileRow>,
) -> GeneratedContent {
    let context = profile
        .map(|p| format!(" for {} ({})", p.business_name, p.niche))
        .unwrap_or_default();

    let titles = [
        format!("Amazing {topic} Offer!"),
        format!("Discover {topic}"),
        format!("Why {topic} Matters"),
    ];
    let contents = [
        format!("Get ready for the best {topic}{context}. Don't miss out!"),
        format!("We are excited to announce {topic}. Visit us today!"),
        format!("Have you tried {topic}? It's a game changer{context}."),
    ];
    let niche_tag = profile
        .map(|p| hashtag(&p.niche))
        .unwrap_or_else(|| "#business".to_string());
    let hashtag_sets = [
        vec!["#bizmate".to_string(), "#growth".to_string(), hashtag(topic)],
        vec!["#offer".to_string(), "#sale".to_string(), niche_tag],
    ];

    GeneratedContent {
        title: picker.choose(&titles).cloned().unwrap_or_default(),
        content: picker.choose(&contents).cloned().unwrap_or_default(),
        hashtags: picker.choose(&hashtag_sets).cloned().unwrap_or_default(),
        image_prompt: format!(
            "A professional photo representing {topic}{context}, high quality, realistic"
        ),
    }
}

fn hashtag(text: &str) -> String {
    let tag: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    format!("#{tag}")
}
