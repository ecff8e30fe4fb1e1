//! Sheetbase server. Reads settings from the environment (and `.env`), prepares the
//! store and serves the page router.

use sheetbase::{app, bootstrap, builtin_pages, open_store, validate, AppState, Settings, TracingNotifier};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sheetbase=info,sheetbase_server=info")),
        )
        .init();

    let settings = Settings::from_env();
    let model = builtin_pages();
    validate(&model)?;

    let store = open_store(&settings).await?;
    let bind = settings.bind.clone();
    let state = AppState::new(store, model, settings, Arc::new(TracingNotifier));
    bootstrap(&state).await?;

    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("sheetbase listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
