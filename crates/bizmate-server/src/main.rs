mod config;

use std::sync::Arc;

use tracing::{info, warn};

use bizmate_api::auth::{AppState, AppStateInner};
use bizmate_api::generation::GenerationAdapter;
use bizmate_api::generation::gemini::{DEFAULT_MODEL, GeminiProvider};
use bizmate_api::generation::stub::StubGenerationProvider;
use bizmate_api::token::TokenService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bizmate=debug,bizmate_api=debug,bizmate_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = bizmate_db::Database::open(&config.db_path)?;

    let tokens = TokenService::new(
        &config.jwt_secret,
        chrono::Duration::minutes(config.token_ttl_minutes),
    );

    let generation = build_generation(&config).await;

    let templates = match config.content_seed {
        Some(seed) => {
            info!("Marketing templates seeded with {}", seed);
            StubGenerationProvider::seeded(seed)
        }
        None => StubGenerationProvider::from_os_rng(),
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens,
        generation,
        templates,
    });

    let app = bizmate_api::router(state);

    info!("BizMate API listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// The provider is chosen once here and injected; a missing key leaves the
/// chat endpoint running on its fallback reply.
async fn build_generation(config: &Config) -> GenerationAdapter {
    let Some(api_key) = config.gemini_api_key.clone() else {
        warn!("GEMINI_API_KEY not set; chat replies will use the fallback message");
        return GenerationAdapter::disabled();
    };

    let mut provider =
        GeminiProvider::new(api_key, config.gemini_base_url.clone(), config.gemini_model.clone());

    if config.gemini_model.is_none() {
        let discovered = provider.discover_model().await;
        match discovered {
            Ok(model) => provider = provider.with_model(model),
            Err(e) => warn!("Gemini model discovery failed ({}); using {}", e, DEFAULT_MODEL),
        }
    }

    info!("Generation provider: gemini, model {}", provider.model());
    GenerationAdapter::new(Arc::new(provider))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
