//! Integration tests for the Postgres repository.
//!
//! These need a live database and are skipped unless `DATABASE_URL` is set:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/enx_test cargo test -p enx-store --test postgres_tests
//! ```
//!
//! Tests share one table and may run in parallel, so each uses its own key
//! data and clears only those rows before it starts.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use enx_core::temporal::SECONDS_PER_HOUR;
use enx_core::{DiagnosisKey, FixedClock, KeyData, SubmissionType};
use enx_store::postgres::connect;
use enx_store::{DiagnosisKeyRepository, DiagnosisKeyService, PgDiagnosisKeyRepository};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn hours(instant: DateTime<Utc>) -> i64 {
    instant.timestamp() / SECONDS_PER_HOUR
}

fn key_at(tag: u8, submission_type: SubmissionType, submission_hour: i64) -> DiagnosisKey {
    DiagnosisKey::builder(KeyData::new(vec![tag; 16]).unwrap(), 2_900_000)
        .submission_type(submission_type)
        .submission_timestamp(submission_hour)
        .build()
}

/// Connect and clear the rows for `tags`, or `None` without a database.
async fn service_at(
    instant: DateTime<Utc>,
    tags: &[u8],
) -> Option<DiagnosisKeyService<PgDiagnosisKeyRepository>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres test");
        return None;
    };
    let repository = PgDiagnosisKeyRepository::new(connect(&url).await.unwrap());
    for &tag in tags {
        sqlx::query("DELETE FROM diagnosis_key WHERE key_data = $1")
            .bind(vec![tag; 16])
            .execute(repository.pool())
            .await
            .unwrap();
    }
    Some(DiagnosisKeyService::new(repository, Arc::new(FixedClock::at(instant))))
}

async fn stored_submission_type(
    svc: &DiagnosisKeyService<PgDiagnosisKeyRepository>,
    tag: u8,
) -> Option<String> {
    sqlx::query_scalar("SELECT submission_type FROM diagnosis_key WHERE key_data = $1")
        .bind(vec![tag; 16])
        .fetch_optional(svc.repository().pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn pcr_record_is_not_replaced_by_rapid_test() {
    let Some(svc) = service_at(now(), &[0xA1]).await else {
        return;
    };
    let hour = hours(now()) - 1;

    let pcr_keys = [key_at(0xA1, SubmissionType::PcrTest, hour)];
    let pcr = svc.save_diagnosis_keys(&pcr_keys);
    assert_eq!(pcr.await.unwrap(), 1);
    let rapid_keys = [key_at(0xA1, SubmissionType::RapidTest, hour)];
    let rapid = svc.save_diagnosis_keys(&rapid_keys);
    assert_eq!(rapid.await.unwrap(), 0);

    assert_eq!(
        stored_submission_type(&svc, 0xA1).await.as_deref(),
        Some("SUBMISSION_TYPE_PCR_TEST")
    );
}

#[tokio::test]
async fn rapid_record_is_kept_on_conflict() {
    let Some(svc) = service_at(now(), &[0xA2]).await else {
        return;
    };
    let hour = hours(now()) - 1;

    let rapid_keys = [key_at(0xA2, SubmissionType::RapidTest, hour)];
    let rapid = svc.save_diagnosis_keys(&rapid_keys);
    assert_eq!(rapid.await.unwrap(), 1);
    let pcr_keys = [key_at(0xA2, SubmissionType::PcrTest, hour)];
    let pcr = svc.save_diagnosis_keys(&pcr_keys);
    assert_eq!(pcr.await.unwrap(), 0);

    assert_eq!(
        stored_submission_type(&svc, 0xA2).await.as_deref(),
        Some("SUBMISSION_TYPE_RAPID_TEST")
    );
}

#[tokio::test]
async fn same_key_twice_in_one_batch_is_inserted_once() {
    let Some(svc) = service_at(now(), &[0xA3, 0xA4]).await else {
        return;
    };
    let hour = hours(now()) - 1;

    let batch = [
        key_at(0xA3, SubmissionType::RapidTest, hour),
        key_at(0xA3, SubmissionType::RapidTest, hour),
        key_at(0xA4, SubmissionType::PcrTest, hour),
        key_at(0xA4, SubmissionType::PcrTest, hour),
    ];
    assert_eq!(svc.save_diagnosis_keys(&batch).await.unwrap(), 2);

    assert_eq!(
        stored_submission_type(&svc, 0xA3).await.as_deref(),
        Some("SUBMISSION_TYPE_RAPID_TEST")
    );
    assert_eq!(
        stored_submission_type(&svc, 0xA4).await.as_deref(),
        Some("SUBMISSION_TYPE_PCR_TEST")
    );
}

#[tokio::test]
async fn stored_keys_read_back_unchanged() {
    let Some(svc) = service_at(now(), &[0xA5]).await else {
        return;
    };
    let key = key_at(0xA5, SubmissionType::RapidTest, hours(now()) - 2);
    svc.save_diagnosis_keys(std::slice::from_ref(&key)).await.unwrap();

    let all = svc.repository().find_all().await.unwrap();
    let found = all.iter().find(|k| k.key_data() == key.key_data()).unwrap();
    assert_eq!(found, &key);
}

#[tokio::test]
async fn retention_deletes_only_keys_past_the_threshold() {
    // Far from the other tests' timestamps, so their rows stay clear of the
    // threshold.
    let instant = Utc.with_ymd_and_hms(2001, 3, 1, 12, 0, 0).unwrap();
    let Some(svc) = service_at(instant, &[0xB1]).await else {
        return;
    };
    let ten_days_ago = hours(instant - Duration::days(10));
    svc.save_diagnosis_keys(&[key_at(0xB1, SubmissionType::PcrTest, ten_days_ago)])
        .await
        .unwrap();

    assert_eq!(svc.apply_retention_policy(11).await.unwrap(), 0);
    assert_eq!(svc.apply_retention_policy(10).await.unwrap(), 0);
    assert!(stored_submission_type(&svc, 0xB1).await.is_some());

    assert_eq!(svc.apply_retention_policy(9).await.unwrap(), 1);
    assert!(stored_submission_type(&svc, 0xB1).await.is_none());
    assert_eq!(svc.apply_retention_policy(9).await.unwrap(), 0);
}

#[tokio::test]
async fn negative_retention_deletes_nothing() {
    let instant = Utc.with_ymd_and_hms(2001, 6, 1, 12, 0, 0).unwrap();
    let Some(svc) = service_at(instant, &[0xB2]).await else {
        return;
    };
    svc.save_diagnosis_keys(&[key_at(0xB2, SubmissionType::PcrTest, hours(instant) - 1)])
        .await
        .unwrap();

    assert!(svc.apply_retention_policy(-1).await.is_err());
    assert!(stored_submission_type(&svc, 0xB2).await.is_some());
}
