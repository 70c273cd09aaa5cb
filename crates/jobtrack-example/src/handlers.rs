// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Example job handlers.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use jobtrack_core::error::JobFailure;
use jobtrack_core::handler::{JobContext, JobHandler};

/// Returns the request payload unchanged. The smallest possible handler.
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

/// Hashes the `data` field of the request with SHA-256.
///
/// Fails with `INVALID_REQUEST` when the field is missing, demonstrating a
/// typed failure with a stable error code.
pub struct DigestHandler;

#[async_trait]
impl JobHandler for DigestHandler {
    fn kind(&self) -> &str {
        "digest"
    }

    async fn process(
        &self,
        ctx: &JobContext,
        request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let data = request
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JobFailure::new("INVALID_REQUEST", "missing string field 'data'"))?;

        tracing::debug!(owner_id = %ctx.owner_id, bytes = data.len(), "hashing payload");

        let digest = Sha256::digest(data.as_bytes());
        Ok(serde_json::json!({
            "algorithm": "sha256",
            "digest": format!("{:x}", digest),
        }))
    }
}

/// Fails on demand: a request with `"fail": true` is rejected with
/// `UPSTREAM_UNAVAILABLE`, anything else succeeds.
pub struct FlakyHandler;

#[async_trait]
impl JobHandler for FlakyHandler {
    fn kind(&self) -> &str {
        "flaky"
    }

    async fn process(
        &self,
        _ctx: &JobContext,
        request: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        if request.get("fail").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(JobFailure::new("UPSTREAM_UNAVAILABLE", "upstream service down").into());
        }
        Ok(serde_json::json!({"status": "ok"}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(kind: &str) -> JobContext {
        JobContext {
            owner_id: "acct1".to_string(),
            tracker_id: "t-1".to_string(),
            kind: kind.to_string(),
        }
    }

    #[tokio::test]
    async fn test_echo_returns_request() {
        let request = serde_json::json!({"msg": "hi"});
        let result = EchoHandler
            .process(&ctx("echo"), request.clone())
            .await
            .unwrap();
        assert_eq!(result, request);
    }

    #[tokio::test]
    async fn test_digest_hashes_data() {
        let result = DigestHandler
            .process(&ctx("digest"), serde_json::json!({"data": "hello"}))
            .await
            .unwrap();
        assert_eq!(result["algorithm"], "sha256");
        // sha256("hello")
        assert_eq!(
            result["digest"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_digest_rejects_missing_data() {
        let err = DigestHandler
            .process(&ctx("digest"), serde_json::json!({}))
            .await
            .unwrap_err();
        let failure = err.downcast_ref::<JobFailure>().expect("typed failure");
        assert_eq!(failure.code, "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_flaky_fails_on_demand() {
        let ok = FlakyHandler
            .process(&ctx("flaky"), serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(ok["status"], "ok");

        let err = FlakyHandler
            .process(&ctx("flaky"), serde_json::json!({"fail": true}))
            .await
            .unwrap_err();
        let failure = err.downcast_ref::<JobFailure>().expect("typed failure");
        assert_eq!(failure.code, "UPSTREAM_UNAVAILABLE");
    }
}
