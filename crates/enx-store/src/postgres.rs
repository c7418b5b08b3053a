//! # Postgres Repository
//!
//! SQLx over a `PgPool`, with the schema in `migrations/` embedded at build
//! time. Queries are runtime-checked (`sqlx::query`), so building the crate
//! does not need a live database.
//!
//! ## Conflict handling
//!
//! Each key is written with one conditional statement: the insert only
//! happens if no PCR-backed row exists for the key data, and `ON CONFLICT DO
//! NOTHING` covers every other existing row. A key counts as inserted iff the
//! statement affected exactly one row. The batch shares one transaction.

use std::time::Duration;

use enx_core::{CountryCode, DiagnosisKey, KeyData, ReportType, SubmissionType};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StoreError;
use crate::repository::DiagnosisKeyRepository;

const INSERT_IF_NOT_PCR: &str = "INSERT INTO diagnosis_key (
        key_data, rolling_start_interval_number, rolling_period, submission_timestamp,
        transmission_risk_level, origin_country, visited_countries, report_type,
        days_since_onset_of_symptoms, consent_to_federation, submission_type)
     SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
     WHERE NOT EXISTS (
        SELECT 1 FROM diagnosis_key
        WHERE key_data = $1 AND submission_type = 'SUBMISSION_TYPE_PCR_TEST')
     ON CONFLICT DO NOTHING";

const SELECT_COLUMNS: &str = "SELECT key_data, rolling_start_interval_number, rolling_period,
        submission_timestamp, transmission_risk_level, origin_country, visited_countries,
        report_type, days_since_onset_of_symptoms, consent_to_federation, submission_type
     FROM diagnosis_key";

/// Connect to the database named by `DATABASE_URL` and apply migrations.
///
/// Unlike an API server, the distribution job cannot run without its key
/// store, so a missing URL is an error rather than an in-memory fallback.
pub async fn init_pool() -> Result<PgPool, StoreError> {
    let url = std::env::var("DATABASE_URL").map_err(|_| StoreError::MissingDatabaseUrl)?;
    connect(&url).await
}

/// Connect to `url` and apply migrations.
pub async fn connect(url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Diagnosis key repository on Postgres.
#[derive(Debug, Clone)]
pub struct PgDiagnosisKeyRepository {
    pool: PgPool,
}

impl PgDiagnosisKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect via `DATABASE_URL`, migrate, and wrap the pool.
    pub async fn from_env() -> Result<Self, StoreError> {
        Ok(Self::new(init_pool().await?))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DiagnosisKeyRepository for PgDiagnosisKeyRepository {
    async fn save_all(&self, keys: &[DiagnosisKey]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for key in keys {
            let visited: Vec<String> = key
                .visited_countries()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect();
            let result = sqlx::query(INSERT_IF_NOT_PCR)
                .bind(key.key_data().as_bytes())
                .bind(key.rolling_start_interval_number())
                .bind(key.rolling_period())
                .bind(key.submission_timestamp())
                .bind(key.transmission_risk_level())
                .bind(key.origin_country().as_str())
                .bind(&visited)
                .bind(key.report_type().as_str())
                .bind(key.days_since_onset_of_symptoms())
                .bind(key.is_consent_to_federation())
                .bind(key.submission_type().as_str())
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 1 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_all(&self) -> Result<Vec<DiagnosisKey>, StoreError> {
        let rows = sqlx::query_as::<_, DiagnosisKeyRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY submission_timestamp ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DiagnosisKeyRow::into_key).collect()
    }

    async fn find_with_min_trl(
        &self,
        min_trl: i32,
        min_submission_timestamp: i64,
    ) -> Result<Vec<DiagnosisKey>, StoreError> {
        let rows = sqlx::query_as::<_, DiagnosisKeyRow>(&format!(
            "{SELECT_COLUMNS}
             WHERE transmission_risk_level >= $1 AND submission_timestamp >= $2
             ORDER BY submission_timestamp ASC"
        ))
        .bind(min_trl)
        .bind(min_submission_timestamp)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DiagnosisKeyRow::into_key).collect()
    }

    async fn delete_older_than<F>(&self, threshold: i64, before_delete: F) -> Result<u64, StoreError>
    where
        F: FnOnce(u64) + Send,
    {
        let mut tx = self.pool.begin().await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM diagnosis_key WHERE submission_timestamp < $1")
                .bind(threshold)
                .fetch_one(&mut *tx)
                .await?;
        before_delete(u64::try_from(count).unwrap_or(0));

        let result = sqlx::query("DELETE FROM diagnosis_key WHERE submission_timestamp < $1")
            .bind(threshold)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DiagnosisKeyRow {
    key_data: Vec<u8>,
    rolling_start_interval_number: i32,
    rolling_period: i32,
    submission_timestamp: i64,
    transmission_risk_level: i32,
    origin_country: String,
    visited_countries: Vec<String>,
    report_type: String,
    days_since_onset_of_symptoms: i32,
    consent_to_federation: bool,
    submission_type: String,
}

impl DiagnosisKeyRow {
    fn into_key(self) -> Result<DiagnosisKey, StoreError> {
        let corrupt = |e: enx_core::EnxError| StoreError::CorruptRow(e.to_string());

        let key_data = KeyData::new(self.key_data).map_err(corrupt)?;
        let origin_country = CountryCode::new(&self.origin_country).map_err(corrupt)?;
        let visited_countries = self
            .visited_countries
            .iter()
            .map(|c| CountryCode::new(c))
            .collect::<Result<Vec<_>, _>>()
            .map_err(corrupt)?;
        let report_type: ReportType = self.report_type.parse().map_err(corrupt)?;
        let submission_type: SubmissionType = self.submission_type.parse().map_err(corrupt)?;

        Ok(
            DiagnosisKey::builder(key_data, self.rolling_start_interval_number)
                .rolling_period(self.rolling_period)
                .submission_timestamp(self.submission_timestamp)
                .transmission_risk_level(self.transmission_risk_level)
                .origin_country(origin_country)
                .visited_countries(visited_countries)
                .report_type(report_type)
                .days_since_onset_of_symptoms(self.days_since_onset_of_symptoms)
                .consent_to_federation(self.consent_to_federation)
                .submission_type(submission_type)
                .build(),
        )
    }
}
