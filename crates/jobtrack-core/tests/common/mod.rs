// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for jobtrack-core integration tests.
//!
//! Provides a TestContext that sets up a SQLite-backed store in a temporary
//! directory, plus the job handlers the suites exercise.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use jobtrack_core::engine::{TrackerEngine, TrackerEngineBuilder};
use jobtrack_core::error::JobFailure;
use jobtrack_core::handler::{JobContext, JobHandler};
use jobtrack_core::persistence::{SqliteStore, TrackerRecord};

/// Test context owning the temporary database directory and the store.
pub struct TestContext {
    pub store: Arc<SqliteStore>,
    _tmp: TempDir,
}

impl TestContext {
    /// Create a fresh SQLite store in a temporary directory.
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let store = SqliteStore::from_path(tmp.path().join("jobtrack.db"))
            .await
            .expect("create sqlite store");
        Self {
            store: Arc::new(store),
            _tmp: tmp,
        }
    }

    /// Builder preconfigured with this context's store.
    pub fn engine_builder(&self) -> TrackerEngineBuilder {
        TrackerEngine::builder().store(self.store.clone())
    }
}

/// Poll `get_result` until the record reaches a terminal status.
pub async fn wait_terminal(
    engine: &TrackerEngine,
    owner_id: &str,
    kind: &str,
    tracker_id: &str,
) -> TrackerRecord {
    for _ in 0..500 {
        let record = engine
            .get_result(owner_id, kind, tracker_id)
            .await
            .expect("get_result")
            .expect("record should exist");
        if record.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job never reached a terminal status");
}

/// Returns the request payload unchanged.
pub struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    fn kind(&self) -> &str {
        "echo"
    }

    async fn process(
        &self,
        _ctx: &JobContext,
        request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(request)
    }
}

/// Always fails with a plain error.
pub struct FailHandler;

#[async_trait]
impl JobHandler for FailHandler {
    fn kind(&self) -> &str {
        "fail"
    }

    async fn process(
        &self,
        _ctx: &JobContext,
        _request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        Err(anyhow::anyhow!("boom"))
    }
}

/// Always fails with a typed failure carrying a stable error code.
pub struct UpstreamFailHandler;

#[async_trait]
impl JobHandler for UpstreamFailHandler {
    fn kind(&self) -> &str {
        "upstream"
    }

    async fn process(
        &self,
        _ctx: &JobContext,
        _request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        Err(JobFailure::new("UPSTREAM_UNAVAILABLE", "upstream service down").into())
    }
}

/// Echoes the request once the gate opens; holds the record in `processing`
/// until then.
pub struct GatedEchoHandler {
    gate: watch::Receiver<bool>,
}

impl GatedEchoHandler {
    pub fn with_gate() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { gate: rx })
    }
}

#[async_trait]
impl JobHandler for GatedEchoHandler {
    fn kind(&self) -> &str {
        "gated-echo"
    }

    async fn process(
        &self,
        _ctx: &JobContext,
        request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let mut gate = self.gate.clone();
        let _ = gate.wait_for(|open| *open).await;
        Ok(request)
    }
}
