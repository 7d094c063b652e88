//! HTTP API server for the front end and other services.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server::{router, AppState};
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info(&preflight::hint(&settings));
        return Err(e.into());
    }

    let state = Arc::new(AppState::from_settings(&settings)?);
    let app = router(state);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lectern API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    for note in preflight::missing_optional(&settings) {
        Output::warning(&note);
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /");
    Output::kv("Dialogue", "POST /generate-dialogue");
    Output::kv("Audio", "POST /generate-audio");
    Output::kv("Summary", "POST /summarize_pages");
    Output::kv("Doubts", "POST /doubt_clear");
    Output::kv("Topics", "POST /extract_topics");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
