// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Multi-owner fan-out example - queue digests for several owners at once
//! and show per-owner deduplication of concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use jobtrack_core::engine::TrackerEngine;
use jobtrack_core::persistence::SqliteStore;

use jobtrack_example::handlers::DigestHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jobtrack_core=info".parse().unwrap()),
        )
        .init();

    let store = Arc::new(SqliteStore::from_path(".data/jobtrack-example.db").await?);

    let engine = TrackerEngine::builder()
        .store(store)
        .handler(Arc::new(DigestHandler))
        .workers(4)
        .build()?
        .start();

    // Queue one digest per owner
    let mut queued = Vec::new();
    for i in 0..8 {
        let owner = format!("tenant-{i}");
        let payload = serde_json::json!({"data": format!("document-{i}")});
        let id = engine.queue(&owner, "digest", payload).await?;

        // A second call while the job is still in flight returns the same id
        let dup = engine.queue(&owner, "digest", serde_json::json!({})).await?;
        if dup == id {
            println!("{owner}: deduplicated into {id}");
        }

        queued.push((owner, id));
    }

    let health = engine.health().await;
    println!(
        "engine v{} healthy={} active_jobs={}",
        health.version, health.healthy, health.active_jobs
    );

    // Poll each owner's job to its terminal state
    for (owner, id) in queued {
        let record = loop {
            match engine.get_result(&owner, "digest", &id).await? {
                Some(record) if record.is_terminal() => break record,
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        };
        println!(
            "{owner}: {} {}",
            record.status,
            record
                .response_payload
                .as_ref()
                .and_then(|p| p.get("digest"))
                .and_then(|d| d.as_str())
                .unwrap_or("-")
        );
    }

    engine.shutdown().await?;
    Ok(())
}
