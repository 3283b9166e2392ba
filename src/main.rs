use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use typingmind_assist::{AssistError, AssistRequest, AssistService, Config};

/// Arguments for the prompt idea generator
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePromptsArgs {
    topic: String,
    #[serde(default)]
    use_case: String,
    max_results: Option<usize>,
}

/// One stdin line
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Line {
    Assist(AssistRequest),
    GeneratePrompts {
        #[serde(rename = "generatePrompts")]
        generate_prompts: GeneratePromptsArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let service = Arc::new(AssistService::new(&config));
    let sweeper = service.spawn_cache_sweeper();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    tracing::info!(
        online = service.is_online(),
        "Reading requests from stdin, one JSON object per line"
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let parsed: Line = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping unparsable request: {}", e);
                let _ = out_tx.send(json!({ "error": format!("invalid request: {e}") }).to_string());
                continue;
            }
        };

        let service = Arc::clone(&service);
        let out_tx = out_tx.clone();
        in_flight.push(tokio::spawn(async move {
            let output = match parsed {
                Line::Assist(request) => {
                    let mode = request.mode();
                    match service.execute(request).await {
                        Ok(response) => serde_json::to_value(&response),
                        Err(AssistError::Superseded) => {
                            Ok(json!({ "mode": mode, "error": "superseded" }))
                        }
                        Err(e) => Ok(json!({ "mode": mode, "error": e.to_string() })),
                    }
                }
                Line::GeneratePrompts { generate_prompts } => {
                    let prompts = service
                        .generate_prompts(
                            &generate_prompts.topic,
                            &generate_prompts.use_case,
                            generate_prompts.max_results,
                        )
                        .await;
                    serde_json::to_value(json!({ "prompts": prompts }))
                }
            };
            match output {
                Ok(value) => {
                    let _ = out_tx.send(value.to_string());
                }
                Err(e) => tracing::error!("Failed to serialize response: {}", e),
            }
        }));
    }

    for handle in in_flight {
        if let Err(e) = handle.await {
            tracing::error!("Request task failed: {}", e);
        }
    }

    drop(out_tx);
    writer.await.context("stdout writer panicked")??;
    sweeper.abort();

    let stats = service.cache_stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        expirations = stats.expirations,
        "stdin closed, shutting down"
    );
    Ok(())
}
