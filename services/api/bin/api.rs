//! Main Entrypoint for the Talkativ API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Choosing the session store (Postgres when configured, memory otherwise).
//! 3. Initializing the LLM client and the session orchestrator.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use talkativ_api::{
    config::{Config, Provider},
    db::Db,
    router::create_router,
    state::AppState,
};
use talkativ_core::{
    dialogue::DialogueGateway,
    llm_client::{LLMClient, OpenAICompatibleClient},
    orchestrator::SessionOrchestrator,
    persona::PersonaCatalog,
    store::{InMemorySessionStore, SessionStore},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn llm_config(config: &Config) -> anyhow::Result<OpenAIConfig> {
    match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            Ok(OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://api.openai.com/v1/"))
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .as_ref()
                .context("GEMINI_API_KEY is required for the gemini provider")?;
            Ok(OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai"))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Session Store ---
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to database")?;
            let db = Db::new(pool);
            db.run_migrations().await?;
            info!("Database connection established and migrations are up-to-date.");
            Arc::new(db)
        }
        None => {
            warn!("DATABASE_URL not set. Sessions will not survive a restart.");
            Arc::new(InMemorySessionStore::new())
        }
    };

    // --- 4. Initialize Shared Services ---
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        llm_config(&config)?,
        config.chat_model.clone(),
    ));
    let catalog = Arc::new(PersonaCatalog::builtin());
    let gateway = DialogueGateway::new(llm_client, config.reply_policy());
    let orchestrator = SessionOrchestrator::new(catalog.clone(), gateway, store);
    let app_state = Arc::new(AppState::new(catalog, orchestrator));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        reply_timeout_ms = config.reply_timeout.as_millis() as u64,
        history_window = config.history_window_turns,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
