//! Reconciliation and outbox tests

mod helpers;

use serde_json::json;
use sqlx::{Row, SqlitePool};

use helpers::*;
use placement_common::{Error, InterviewStatus};
use placement_server::db::profiles;
use placement_server::services::reconcile::{submit, AMBIGUOUS_MATCH_MESSAGE};
use placement_server::services::SubmissionOutcome;
use placement_server::submission::normalize_registration_number;

async fn outbox_kinds(pool: &SqlitePool) -> Vec<(String, String)> {
    sqlx::query("SELECT kind, unique_id FROM notification_outbox ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get("kind"), row.get("unique_id")))
        .collect()
}

#[tokio::test]
async fn test_create_sets_defaults_and_queues_notification() {
    let pool = memory_pool().await;
    let outcome = submit(&pool, &submission(valid_body()), "NCE-").await.unwrap();

    let profile = match outcome {
        SubmissionOutcome::Created(p) => p,
        other => panic!("expected create, got {:?}", other),
    };
    assert!(!profile.is_present);
    assert_eq!(profile.interview_status, InterviewStatus::Pending);
    assert_eq!(profile.created_at, profile.updated_at);

    assert_eq!(
        outbox_kinds(&pool).await,
        vec![("registered".to_string(), profile.unique_id.clone())]
    );

    let stored = profiles::get_by_id(&pool, profile.id).await.unwrap().unwrap();
    assert_eq!(stored, profile);
}

#[tokio::test]
async fn test_update_matches_on_any_identifier() {
    let pool = memory_pool().await;
    let created = submit(&pool, &submission(valid_body()), "NCE-")
        .await
        .unwrap()
        .into_profile();

    // Only the national ID still matches
    let mut body = valid_body();
    body["registrationNumber"] = json!("21105128999");
    body["email"] = json!("asha.new@example.com");
    let outcome = submit(&pool, &submission(body), "NCE-").await.unwrap();

    let updated = match outcome {
        SubmissionOutcome::Updated(p) => p,
        other => panic!("expected update, got {:?}", other),
    };
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.unique_id, created.unique_id);
    assert_eq!(updated.registration_number, "21105128999");
    assert_eq!(updated.email, "asha.new@example.com");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let kinds: Vec<String> = outbox_kinds(&pool).await.into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec!["registered", "updated"]);
}

#[tokio::test]
async fn test_ambiguous_match_changes_nothing() {
    let pool = memory_pool().await;
    let a = submit(&pool, &submission(valid_body()), "NCE-").await.unwrap().into_profile();
    let b = submit(&pool, &submission(other_body()), "NCE-").await.unwrap().into_profile();

    let mut body = other_body();
    body["nationalId"] = json!("123412341234");
    let err = submit(&pool, &submission(body), "NCE-").await.unwrap_err();
    assert!(matches!(&err, Error::Conflict(msg) if msg == AMBIGUOUS_MATCH_MESSAGE));

    assert_eq!(profiles::get_by_id(&pool, a.id).await.unwrap().unwrap(), a);
    assert_eq!(profiles::get_by_id(&pool, b.id).await.unwrap().unwrap(), b);
    assert_eq!(outbox_kinds(&pool).await.len(), 2);
}

#[tokio::test]
async fn test_registration_lookup_is_normalized() {
    let pool = memory_pool().await;
    let mut body = valid_body();
    body["registrationNumber"] = json!("  21bce1234");
    let created = submit(&pool, &submission(body), "NCE-").await.unwrap().into_profile();

    let key = normalize_registration_number("21BcE1234 ");
    let fetched = profiles::get_by_registration_number(&pool, &key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_unique_ids_are_distinct() {
    let pool = memory_pool().await;
    let a = submit(&pool, &submission(valid_body()), "NCE-").await.unwrap().into_profile();
    let b = submit(&pool, &submission(other_body()), "NCE-").await.unwrap().into_profile();
    assert_ne!(a.unique_id, b.unique_id);
    assert!(profiles::unique_id_exists(&pool, &a.unique_id).await.unwrap());
    assert!(!profiles::unique_id_exists(&pool, "NCE-NOTREAL").await.unwrap());
}
