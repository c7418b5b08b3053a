//! # In-Memory Repository
//!
//! A `parking_lot::Mutex` guarded map keyed by key data. Every operation
//! takes the lock once, so a batch save or a retention purge is atomic with
//! respect to concurrent callers, matching the transactional behaviour of
//! the Postgres backend.

use std::collections::BTreeMap;

use enx_core::{DiagnosisKey, KeyData};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::repository::DiagnosisKeyRepository;

/// Diagnosis key repository backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryDiagnosisKeyRepository {
    keys: Mutex<BTreeMap<KeyData, DiagnosisKey>>,
}

impl InMemoryDiagnosisKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    /// The stored record for `key_data`, if any.
    pub fn get(&self, key_data: &KeyData) -> Option<DiagnosisKey> {
        self.keys.lock().get(key_data).cloned()
    }
}

fn sorted_by_submission(mut keys: Vec<DiagnosisKey>) -> Vec<DiagnosisKey> {
    // Stable sort: ties keep key-data order from the map.
    keys.sort_by_key(DiagnosisKey::submission_timestamp);
    keys
}

impl DiagnosisKeyRepository for InMemoryDiagnosisKeyRepository {
    async fn save_all(&self, keys: &[DiagnosisKey]) -> Result<usize, StoreError> {
        let mut stored = self.keys.lock();
        let mut inserted = 0;
        for key in keys {
            // Any stored record with the same key data wins, so a PCR-backed
            // record is never replaced.
            if stored.contains_key(key.key_data()) {
                continue;
            }
            stored.insert(key.key_data().clone(), key.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_all(&self) -> Result<Vec<DiagnosisKey>, StoreError> {
        let keys = self.keys.lock().values().cloned().collect();
        Ok(sorted_by_submission(keys))
    }

    async fn find_with_min_trl(
        &self,
        min_trl: i32,
        min_submission_timestamp: i64,
    ) -> Result<Vec<DiagnosisKey>, StoreError> {
        let keys = self
            .keys
            .lock()
            .values()
            .filter(|k| k.transmission_risk_level() >= min_trl)
            .filter(|k| k.submission_timestamp() >= min_submission_timestamp)
            .cloned()
            .collect();
        Ok(sorted_by_submission(keys))
    }

    async fn delete_older_than<F>(&self, threshold: i64, before_delete: F) -> Result<u64, StoreError>
    where
        F: FnOnce(u64) + Send,
    {
        let mut stored = self.keys.lock();
        let doomed = stored
            .values()
            .filter(|k| k.submission_timestamp() < threshold)
            .count() as u64;
        before_delete(doomed);
        stored.retain(|_, k| k.submission_timestamp() >= threshold);
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enx_core::SubmissionType;

    fn key(tag: u8, submission_type: SubmissionType, ts: i64) -> DiagnosisKey {
        DiagnosisKey::builder(KeyData::new(vec![tag; 16]).unwrap(), 1)
            .submission_type(submission_type)
            .submission_timestamp(ts)
            .build()
    }

    #[tokio::test]
    async fn pcr_record_is_never_replaced() {
        let repo = InMemoryDiagnosisKeyRepository::new();
        repo.save_all(&[key(1, SubmissionType::PcrTest, 10)]).await.unwrap();
        let inserted = repo
            .save_all(&[key(1, SubmissionType::RapidTest, 20)])
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        let stored = repo.get(&KeyData::new(vec![1; 16]).unwrap()).unwrap();
        assert_eq!(stored.submission_type(), SubmissionType::PcrTest);
        assert_eq!(stored.submission_timestamp(), 10);
    }

    #[tokio::test]
    async fn duplicates_within_one_batch_insert_once() {
        let repo = InMemoryDiagnosisKeyRepository::new();
        let batch = [
            key(2, SubmissionType::RapidTest, 1),
            key(2, SubmissionType::PcrTest, 2),
        ];
        assert_eq!(repo.save_all(&batch).await.unwrap(), 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn find_all_is_ascending_by_submission() {
        let repo = InMemoryDiagnosisKeyRepository::new();
        repo.save_all(&[
            key(1, SubmissionType::PcrTest, 30),
            key(2, SubmissionType::PcrTest, 10),
            key(3, SubmissionType::PcrTest, 20),
        ])
        .await
        .unwrap();
        let ts: Vec<i64> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(DiagnosisKey::submission_timestamp)
            .collect();
        assert_eq!(ts, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn delete_reports_count_before_removal() {
        let repo = InMemoryDiagnosisKeyRepository::new();
        repo.save_all(&[
            key(1, SubmissionType::PcrTest, 5),
            key(2, SubmissionType::PcrTest, 15),
        ])
        .await
        .unwrap();
        let mut seen = None;
        let deleted = repo.delete_older_than(10, |n| seen = Some(n)).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(seen, Some(1));
        assert_eq!(repo.len(), 1);
    }
}
