use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::{RegistrySource, Settings};
use crate::extract::SourceDocument;

/// Outcome of fetching one registry.
struct FetchOutcome {
    source: RegistrySource,
    body: Result<String>,
    latency_ms: u128,
}

pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch all registries concurrently, at most `fetch_concurrency` at a time.
///
/// Failed registries are logged and left out; the rest are returned as
/// documents ready for extraction.
pub async fn fetch_registries(
    settings: &Settings,
    registries: Vec<RegistrySource>,
) -> Result<Vec<SourceDocument>> {
    let client = build_client(settings)?;
    let semaphore = Arc::new(Semaphore::new(settings.fetch_concurrency.max(1)));
    let total = registries.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchOutcome>(total.max(1));

    for source in registries {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let start = Instant::now();
            let body = fetch_one(&client, &source.url).await;
            let latency_ms = start.elapsed().as_millis();
            let _ = tx
                .send(FetchOutcome {
                    source,
                    body,
                    latency_ms,
                })
                .await;
        });
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    let mut documents = Vec::with_capacity(total);
    let mut errors = 0usize;

    while let Some(outcome) = rx.recv().await {
        pb.set_message(outcome.source.name.clone());
        match outcome.body {
            Ok(body) => {
                info!(
                    "{}: fetched {} bytes in {}ms",
                    outcome.source.name,
                    body.len(),
                    outcome.latency_ms
                );
                documents.push(SourceDocument {
                    source_id: outcome.source.name,
                    kind: outcome.source.kind,
                    location: outcome.source.url,
                    body,
                });
            }
            Err(e) => {
                errors += 1;
                warn!("{}: fetch failed, skipping: {:#}", outcome.source.name, e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} registries ({} ok, {} errors)", total, documents.len(), errors);

    // completion order is arbitrary
    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    Ok(documents)
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("{} returned an error status", url))?;
    response
        .text()
        .await
        .with_context(|| format!("Failed to read body from {}", url))
}
