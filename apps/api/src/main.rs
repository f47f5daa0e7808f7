mod config;
mod errors;
mod layout;
mod letters;
mod models;
mod routes;
mod state;
mod textgen;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::{FontSet, LetterEngine};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Letter API v{}", env!("CARGO_PKG_VERSION"));

    // Fonts are resolved once; every render shares the same set.
    let fonts = Arc::new(FontSet::resolve(
        config.font_dir.as_deref(),
        config.load_system_fonts,
    ));
    let engine = LetterEngine::new(fonts, config.fallback_city.clone(), env!("CARGO_PKG_NAME"));
    info!(
        family = engine.fonts().family(),
        builtin = engine.fonts().is_builtin(),
        "Letter font resolved"
    );

    let state = AppState::new(engine);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
