use std::env;

use quizforge::prelude::*;
use tracing_subscriber::EnvFilter;

/// Built-in catalogue served when `QUIZFORGE_QUIZZES` is not set.
const BUILTIN_QUIZZES: &str = include_str!("../quizzes.json");

const DEFAULT_BIND: &str = "0.0.0.0:8080";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Loads the quiz catalogue from `path`, or the built-in one.
fn load_quizzes(path: Option<&str>) -> Result<InMemoryQuizStore, Box<dyn std::error::Error>> {
    let catalogue = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read quiz catalogue {path}: {e}"))?,
        None => BUILTIN_QUIZZES.to_string(),
    };
    let store = InMemoryQuizStore::from_json(&catalogue)?;
    Ok(store)
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=quizforge=debug for per-message routing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = env::var("QUIZFORGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let catalogue = env::var("QUIZFORGE_QUIZZES").ok();

    let quizzes = load_quizzes(catalogue.as_deref())?;
    tracing::info!(
        quizzes = quizzes.len(),
        source = catalogue.as_deref().unwrap_or("built-in"),
        "quiz catalogue loaded"
    );

    let server = QuizforgeServerBuilder::new()
        .bind(&bind)
        .build(quizzes)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "lan-quiz listening");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
