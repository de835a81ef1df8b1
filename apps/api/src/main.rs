mod coach;
mod config;
mod errors;
mod llm_client;
mod routes;
mod scan;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::coach::session::CoachSession;
use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::scan::store::FileSessionStore;
use crate::scan::vision::GeminiVisionScorer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hairiva API v{}", env!("CARGO_PKG_VERSION"));

    if !config.is_gemini_configured() {
        warn!("GEMINI_API_KEY is not set; coach and scan requests will report Unconfigured");
    }

    // Initialize LLM client
    let llm = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_base_url.clone())?;
    info!(
        "LLM client initialized (chat model: {}, vision model: {})",
        llm_client::CHAT_MODEL,
        llm_client::VISION_MODEL
    );

    // One conversation per process, threaded through AppState
    let coach_config = config.coach_config();
    info!(
        "Coach config: history={}, context_window={}, bubble_delay={:?}",
        coach_config.max_history, coach_config.context_window, coach_config.bubble_delay
    );
    let coach = CoachSession::new(coach_config, Arc::new(llm.clone()));

    let sessions = Arc::new(FileSessionStore::new(config.session_file.clone()));
    info!("Scan sessions stored at {}", sessions.path().display());

    let vision = Arc::new(GeminiVisionScorer::new(llm));

    let state = AppState::new(coach, sessions, vision);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the mobile client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
