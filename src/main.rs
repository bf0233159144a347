//! Reads one JSON command from stdin and writes the JSON result to stdout.
//!
//! ```text
//! echo '{"command":"create","userId":"u1","learningPath":"DSA only","weeklyHours":10,"preferredDays":["Monday"]}' | studyplan
//! ```

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use studyplan_lib::config::load_engine_config;
use studyplan_lib::handlers::{dispatch, Command};
use studyplan_lib::logging::init_logging;
use studyplan_lib::models::GeminiClient;
use studyplan_lib::pipelines::orchestrator::PlanEngine;

async fn run() -> anyhow::Result<bool> {
    let config = load_engine_config();
    let client = GeminiClient::new(&config).context("Failed to build Gemini client")?;
    let engine = PlanEngine::new(Arc::new(client), &config);

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read command from stdin")?;
    let command: Command =
        serde_json::from_str(&input).context("Failed to parse command JSON")?;

    let (output, ok) = match dispatch(&engine, command).await {
        Ok(response) => (serde_json::to_string_pretty(&response)?, true),
        Err(e) => {
            tracing::error!(status = e.status(), error = %e, "Command failed");
            (serde_json::to_string_pretty(&e.to_body())?, false)
        }
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    if let Err(e) = init_logging() {
        eprintln!("{:#}", e);
    }

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "studyplan failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
