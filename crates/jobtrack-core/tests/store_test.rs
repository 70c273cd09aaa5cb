// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite store tests: record CRUD, the guarded terminal update, listing.

mod common;

use jobtrack_core::persistence::{ListFilter, NewTrackerRecord, TrackerStore};
use jobtrack_core::status::TrackerStatus;

use common::TestContext;

fn new_record(owner_id: &str, kind: &str) -> NewTrackerRecord {
    NewTrackerRecord {
        owner_id: owner_id.to_string(),
        kind: kind.to_string(),
        request_payload: serde_json::json!({"msg": "hi"}),
    }
}

#[tokio::test]
async fn test_insert_and_find() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();

    let record = ctx
        .store
        .find_record(&tracker_id, "acct1", "echo")
        .await
        .unwrap()
        .expect("record should exist");

    assert_eq!(record.tracker_id, tracker_id);
    assert_eq!(record.owner_id, "acct1");
    assert_eq!(record.kind, "echo");
    assert_eq!(record.status, "processing");
    assert_eq!(record.request_payload, serde_json::json!({"msg": "hi"}));
    assert!(record.response_payload.is_none());
    assert!(record.finished_at.is_none());
}

#[tokio::test]
async fn test_find_requires_full_tuple() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();

    assert!(
        ctx.store
            .find_record(&tracker_id, "acct2", "echo")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        ctx.store
            .find_record(&tracker_id, "acct1", "digest")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        ctx.store
            .find_record("no-such-id", "acct1", "echo")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_terminal_update_applies_once() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();

    let first = ctx
        .store
        .complete_record(
            &tracker_id,
            "acct1",
            TrackerStatus::Done,
            &serde_json::json!({"result": 1}),
        )
        .await
        .unwrap();
    assert!(first);

    // A second terminal transition is refused and changes nothing
    let second = ctx
        .store
        .complete_record(
            &tracker_id,
            "acct1",
            TrackerStatus::Error,
            &serde_json::json!({"code": "X", "message": "y"}),
        )
        .await
        .unwrap();
    assert!(!second);

    let record = ctx
        .store
        .find_record(&tracker_id, "acct1", "echo")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, "done");
    assert_eq!(record.response_payload, Some(serde_json::json!({"result": 1})));
    assert!(record.finished_at.is_some());
}

#[tokio::test]
async fn test_terminal_update_scoped_by_owner() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();

    let applied = ctx
        .store
        .complete_record(
            &tracker_id,
            "acct2",
            TrackerStatus::Done,
            &serde_json::json!({}),
        )
        .await
        .unwrap();
    assert!(!applied);

    let record = ctx
        .store
        .find_record(&tracker_id, "acct1", "echo")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, "processing");
}

#[tokio::test]
async fn test_delete_record() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();

    ctx.store.delete_record(&tracker_id).await.unwrap();

    assert!(
        ctx.store
            .find_record(&tracker_id, "acct1", "echo")
            .await
            .unwrap()
            .is_none()
    );

    // Deleting a missing record is not an error
    ctx.store.delete_record(&tracker_id).await.unwrap();
}

#[tokio::test]
async fn test_list_records_filters() {
    let ctx = TestContext::new().await;

    let a = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();
    let _b = ctx
        .store
        .insert_record(&new_record("acct1", "digest"))
        .await
        .unwrap();
    let _c = ctx
        .store
        .insert_record(&new_record("acct2", "echo"))
        .await
        .unwrap();

    ctx.store
        .complete_record(&a, "acct1", TrackerStatus::Done, &serde_json::json!({}))
        .await
        .unwrap();

    let all = ctx
        .store
        .list_records(&ListFilter::default(), 10, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let acct1 = ctx
        .store
        .list_records(
            &ListFilter {
                owner_id: Some("acct1".to_string()),
                ..Default::default()
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(acct1.len(), 2);
    assert!(acct1.iter().all(|r| r.owner_id == "acct1"));

    let echoes = ctx
        .store
        .list_records(
            &ListFilter {
                kind: Some("echo".to_string()),
                ..Default::default()
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(echoes.len(), 2);

    let processing = ctx
        .store
        .list_records(
            &ListFilter {
                status: Some(TrackerStatus::Processing),
                ..Default::default()
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(processing.len(), 2);

    let done_for_acct1 = ctx
        .store
        .list_records(
            &ListFilter {
                owner_id: Some("acct1".to_string()),
                status: Some(TrackerStatus::Done),
                ..Default::default()
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(done_for_acct1.len(), 1);
    assert_eq!(done_for_acct1[0].tracker_id, a);
}

#[tokio::test]
async fn test_list_records_pagination() {
    let ctx = TestContext::new().await;

    for _ in 0..5 {
        ctx.store
            .insert_record(&new_record("acct1", "echo"))
            .await
            .unwrap();
    }

    let page1 = ctx
        .store
        .list_records(&ListFilter::default(), 2, 0)
        .await
        .unwrap();
    assert_eq!(page1.len(), 2);

    let page3 = ctx
        .store
        .list_records(&ListFilter::default(), 2, 4)
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
}

#[tokio::test]
async fn test_count_processing() {
    let ctx = TestContext::new().await;

    assert_eq!(ctx.store.count_processing().await.unwrap(), 0);

    let a = ctx
        .store
        .insert_record(&new_record("acct1", "echo"))
        .await
        .unwrap();
    let _b = ctx
        .store
        .insert_record(&new_record("acct2", "echo"))
        .await
        .unwrap();
    assert_eq!(ctx.store.count_processing().await.unwrap(), 2);

    ctx.store
        .complete_record(&a, "acct1", TrackerStatus::Done, &serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(ctx.store.count_processing().await.unwrap(), 1);
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;
    assert!(ctx.store.health_check().await.unwrap());
}

#[tokio::test]
async fn test_error_payload_round_trips() {
    let ctx = TestContext::new().await;

    let tracker_id = ctx
        .store
        .insert_record(&new_record("acct1", "fail"))
        .await
        .unwrap();

    ctx.store
        .complete_record(
            &tracker_id,
            "acct1",
            TrackerStatus::Error,
            &serde_json::json!({"code": "JOB_FAILED", "message": "boom"}),
        )
        .await
        .unwrap();

    let record = ctx
        .store
        .find_record(&tracker_id, "acct1", "fail")
        .await
        .unwrap()
        .unwrap();
    let detail = record.error_detail().expect("error detail");
    assert_eq!(detail.code, "JOB_FAILED");
    assert_eq!(detail.message, "boom");
}
