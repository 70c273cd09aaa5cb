// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embedded engine example - queue a few jobs over SQLite and poll them.

use std::sync::Arc;
use std::time::Duration;

use jobtrack_core::engine::TrackerEngine;
use jobtrack_core::persistence::{SqliteStore, TrackerRecord};

use jobtrack_example::handlers::{DigestHandler, EchoHandler, FlakyHandler};

async fn poll_until_terminal(
    engine: &TrackerEngine,
    owner_id: &str,
    kind: &str,
    tracker_id: &str,
) -> anyhow::Result<TrackerRecord> {
    loop {
        let record = engine
            .get_result(owner_id, kind, tracker_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("tracker {tracker_id} not found"))?;
        if record.is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

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
        .handler(Arc::new(EchoHandler))
        .handler(Arc::new(DigestHandler))
        .handler(Arc::new(FlakyHandler))
        .build()?
        .start();

    println!("Echo job:");
    let id = engine
        .queue("demo", "echo", serde_json::json!({"msg": "hi"}))
        .await?;
    let record = poll_until_terminal(&engine, "demo", "echo", &id).await?;
    println!("  {} -> {:?}\n", record.status, record.response_payload);

    println!("Digest job:");
    let id = engine
        .queue("demo", "digest", serde_json::json!({"data": "hello"}))
        .await?;
    let record = poll_until_terminal(&engine, "demo", "digest", &id).await?;
    println!("  {} -> {:?}\n", record.status, record.response_payload);

    println!("Flaky job (asked to fail):");
    let id = engine
        .queue("demo", "flaky", serde_json::json!({"fail": true}))
        .await?;
    let record = poll_until_terminal(&engine, "demo", "flaky", &id).await?;
    let detail = record.error_detail().expect("error detail");
    println!("  {} -> {}: {}\n", record.status, detail.code, detail.message);

    engine.shutdown().await?;
    Ok(())
}
