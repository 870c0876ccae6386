//! Text generation behind the chat endpoint.
//!
//! Providers are injected once at start-up. The adapter never fails: a
//! missing provider, a provider error or a crash inside the provider all
//! turn into a fixed fallback reply, and the cause is only logged.

pub mod gemini;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use bizmate_db::models::ProfileRow;

pub const UNAVAILABLE_REPLY: &str =
    "AI is currently unavailable. Please check backend configuration.";
pub const FAILURE_REPLY: &str = "I'm having trouble thinking right now. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no generation provider configured")]
    NotConfigured,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider rejected the prompt: {0}")]
    Rejected(String),
    #[error("unexpected provider response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Business context and the caller's message, filled into the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInputs {
    pub business_name: String,
    pub niche: String,
    pub products: String,
    pub tone: String,
    pub message: String,
}

impl PromptInputs {
    pub fn from_profile(profile: Option<&ProfileRow>, message: &str) -> Self {
        match profile {
            Some(p) => Self {
                business_name: p.business_name.clone(),
                niche: p.niche.clone(),
                products: p.products.clone(),
                tone: p.tone_of_voice.clone(),
                message: message.to_string(),
            },
            None => Self {
                business_name: "our business".to_string(),
                niche: "service".to_string(),
                products: "various services".to_string(),
                tone: "professional".to_string(),
                message: message.to_string(),
            },
        }
    }

    pub fn chat_prompt(&self) -> String {
        format!(
            "You are an AI Sales Agent for a business called '{name}'.\n\
             Industry: {niche}\n\
             Products/Services: {products}\n\
             Tone of Voice: {tone}\n\
             \n\
             Your goal is to be helpful, friendly, and convert inquiries into sales or leads.\n\
             \n\
             User Message: \"{message}\"\n\
             \n\
             Reply as the agent:",
            name = self.business_name,
            niche = self.niche,
            products = self.products,
            tone = self.tone,
            message = self.message,
        )
    }
}

#[derive(Clone)]
pub struct GenerationAdapter {
    provider: Option<Arc<dyn GenerationProvider>>,
}

impl GenerationAdapter {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    /// No provider: every reply is [`UNAVAILABLE_REPLY`].
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    /// One best-effort call. Always returns a non-empty reply.
    pub async fn reply(&self, inputs: &PromptInputs) -> String {
        let Some(provider) = self.provider.clone() else {
            warn!("Generation requested but no provider is configured");
            return UNAVAILABLE_REPLY.to_string();
        };

        let name = provider.name().to_string();
        let prompt = inputs.chat_prompt();
        debug!("Sending {} byte prompt to {}", prompt.len(), name);

        // Own task so a panicking provider surfaces as a JoinError here.
        let outcome = tokio::spawn(async move { provider.generate(&prompt).await }).await;

        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!("{} returned an empty reply", name);
                FAILURE_REPLY.to_string()
            }
            Ok(Err(GenerationError::NotConfigured)) => {
                warn!("{} reports it is not configured", name);
                UNAVAILABLE_REPLY.to_string()
            }
            Ok(Err(e)) => {
                error!("{} generation failed: {}", name, e);
                FAILURE_REPLY.to_string()
            }
            Err(e) => {
                error!("{} generation task crashed: {}", name, e);
                FAILURE_REPLY.to_string()
            }
        }
    }
}
