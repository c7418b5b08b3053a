//! # Structure Assembler
//!
//! Composes one distribution bundle:
//!
//! ```text
//! <root>/
//!   <dgc>/
//!     <language>/value-sets/export.{bin,sig}     one per configured language
//!     <category>/export.{bin,sig}                one per rule category
//!   dscs/export.{bin,sig}
//!   diagnosis-keys/<region>/date/
//!     index                                      ["2026-10-16", ...]
//!     <YYYY-MM-DD>/hour/
//!       index                                    [0, 1, ...]
//!       <H>/export.{bin,sig}
//! ```
//!
//! Remote content is fetched concurrently on a bounded pool. The tree is
//! built by a single writer once every fetch has returned, then prepared
//! (all signatures computed) and only then materialized. A failed category
//! is left out of the tree and reported; signing, structure and store
//! failures abort the run before the sink sees a single write.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Timelike};
use enx_core::temporal::SECONDS_PER_HOUR;
use enx_core::{Clock, DiagnosisKey};
use enx_crypto::CryptoProvider;
use enx_remote::{RemoteArtifact, RemoteSourceClient, RemoteSourceError, SourceKind};
use enx_store::{DiagnosisKeyRepository, DiagnosisKeyService};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DistributionConfig;
use crate::error::AssemblyError;
use crate::mapping::{encode_category, encode_index, encode_key_export, encode_value_sets, KeyExportMetadata};
use crate::signing::{signature_info, SignedArchive};
use crate::sink::OutputSink;
use crate::tree::{Archive, Directory};

/// Name of the top-level directory holding key exports.
pub const DIAGNOSIS_KEYS_DIRECTORY: &str = "diagnosis-keys";

/// Name of the unsigned listing archive in date and hour directories.
pub const INDEX_ARCHIVE: &str = "index";

/// Archive name of the per-language value sets.
pub const VALUE_SETS_ARCHIVE: &str = "value-sets";

/// Outcome severity of a run, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStatus {
    Success,
    CompletedWithFailures,
    Fatal,
}

impl RunStatus {
    /// Process exit code: 0 success, 2 completed with failures, 1 fatal.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CompletedWithFailures => 2,
            Self::Fatal => 1,
        }
    }
}

/// A category (or one language of value sets) that was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFailure {
    pub kind: SourceKind,
    /// Path of the archive that was not published, relative to the root.
    pub target: String,
    pub reason: String,
}

/// Summary of an assembly run.
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    pub failures: Vec<CategoryFailure>,
    pub archives_signed: usize,
    pub keys_published: usize,
    /// Files written to the sink. Zero until the tree is materialized.
    pub files_written: usize,
}

impl AssemblyReport {
    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::CompletedWithFailures
        }
    }

    fn log_summary(&self) {
        if self.failures.is_empty() {
            tracing::info!(
                archives_signed = self.archives_signed,
                keys_published = self.keys_published,
                files_written = self.files_written,
                "Distribution assembled"
            );
            return;
        }
        let skipped: Vec<&str> = self.failures.iter().map(|f| f.target.as_str()).collect();
        tracing::warn!(
            archives_signed = self.archives_signed,
            keys_published = self.keys_published,
            files_written = self.files_written,
            "Distribution assembled with {} failed archive(s): {}",
            self.failures.len(),
            skipped.join(", ")
        );
    }
}

/// A composed but not yet prepared bundle.
#[derive(Debug)]
pub struct Assembly {
    pub root: Directory,
    pub report: AssemblyReport,
}

type Fetched = BTreeMap<SourceKind, Result<RemoteArtifact, RemoteSourceError>>;

/// Builds the distribution tree from the key store and a remote source.
pub struct StructureAssembler<R, C> {
    config: DistributionConfig,
    keys: DiagnosisKeyService<R>,
    client: Arc<C>,
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
}

impl<R, C> StructureAssembler<R, C>
where
    R: DiagnosisKeyRepository,
    C: RemoteSourceClient + 'static,
{
    /// Fails if `config` does not pass [`DistributionConfig::validate`].
    pub fn new(
        config: DistributionConfig,
        keys: DiagnosisKeyService<R>,
        client: Arc<C>,
        crypto: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AssemblyError> {
        config.validate()?;
        Ok(Self {
            config,
            keys,
            client,
            crypto,
            clock,
        })
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Assemble, prepare and materialize into `sink`.
    pub async fn run(&self, sink: &mut dyn OutputSink) -> Result<AssemblyReport, AssemblyError> {
        let Assembly { root, mut report } = self.assemble().await?;
        let prepared = root.prepare(Path::new(""))?;
        report.files_written = prepared.materialize(sink)?;
        report.log_summary();
        Ok(report)
    }

    /// Fetch everything and compose the tree without signing or writing.
    pub async fn assemble(&self) -> Result<Assembly, AssemblyError> {
        tracing::info!(
            root = %self.config.root_name,
            at = %self.clock.now(),
            "Assembling distribution"
        );
        let mut report = AssemblyReport::default();
        let mut fetched = self.fetch_all().await?;

        let mut root = Directory::new(&self.config.root_name)?;
        let dgc = self.certificate_directory(&mut fetched, &mut report)?;
        root.add_writable(dgc)?;

        if self.config.publish_signing_certificates {
            let kind = SourceKind::SigningCertificates;
            if let Some(bytes) = self.encode(kind, kind.as_str(), fetched.remove(&kind), &mut report)? {
                root.add_writable(self.signed(kind.as_str(), bytes, &mut report)?)?;
            }
        }

        root.add_writable(self.diagnosis_keys_directory(&mut report).await?)?;
        Ok(Assembly { root, report })
    }

    fn kinds_to_fetch(&self) -> Vec<SourceKind> {
        let mut kinds = Vec::with_capacity(self.config.categories.len() + 2);
        if !self.config.languages.is_empty() {
            kinds.push(SourceKind::ValueSets);
        }
        kinds.extend(self.config.categories.iter().copied());
        if self.config.publish_signing_certificates {
            kinds.push(SourceKind::SigningCertificates);
        }
        kinds.sort();
        kinds.dedup();
        kinds
    }

    async fn fetch_all(&self) -> Result<Fetched, AssemblyError> {
        let permits = Arc::new(Semaphore::new(self.config.fetch_concurrency));
        let mut tasks = JoinSet::new();
        for kind in self.kinds_to_fetch() {
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (kind, client.fetch(kind).await)
            });
        }

        let mut fetched = Fetched::new();
        while let Some(joined) = tasks.join_next().await {
            let (kind, result) = joined.map_err(|e| AssemblyError::Task(e.to_string()))?;
            tracing::debug!(category = %kind, ok = result.is_ok(), "Fetch finished");
            fetched.insert(kind, result);
        }
        Ok(fetched)
    }

    fn certificate_directory(
        &self,
        fetched: &mut Fetched,
        report: &mut AssemblyReport,
    ) -> Result<Directory, AssemblyError> {
        let dgc_name = &self.config.dgc_directory;
        let mut dgc = Directory::new(dgc_name)?;

        if !self.config.languages.is_empty() {
            let value_sets = fetched.remove(&SourceKind::ValueSets);
            for language in &self.config.languages {
                let target = format!("{dgc_name}/{language}/{VALUE_SETS_ARCHIVE}");
                let encoded = match &value_sets {
                    Some(Ok(artifact)) => {
                        encode_value_sets(artifact, language).map_err(|e| e.to_string())
                    }
                    Some(Err(e)) => Err(describe(e)),
                    None => Err("not fetched".to_string()),
                };
                match encoded {
                    Ok(bytes) => {
                        let mut language_dir = Directory::new(language)?;
                        language_dir.add_writable(self.signed(VALUE_SETS_ARCHIVE, bytes, report)?)?;
                        dgc.add_writable(language_dir)?;
                    }
                    Err(reason) => self.skip(SourceKind::ValueSets, target, reason, report)?,
                }
            }
        }

        for &kind in &self.config.categories {
            let name = self.config.archive_name(kind);
            let target = format!("{dgc_name}/{name}");
            if let Some(bytes) = self.encode(kind, &target, fetched.remove(&kind), report)? {
                dgc.add_writable(self.signed(name, bytes, report)?)?;
            }
        }
        Ok(dgc)
    }

    /// Map a fetch result to archive bytes, or record the category as
    /// skipped.
    fn encode(
        &self,
        kind: SourceKind,
        target: &str,
        fetched: Option<Result<RemoteArtifact, RemoteSourceError>>,
        report: &mut AssemblyReport,
    ) -> Result<Option<Vec<u8>>, AssemblyError> {
        let reason = match fetched {
            Some(Ok(artifact)) => match encode_category(&artifact) {
                Ok(bytes) => return Ok(Some(bytes)),
                Err(e) => e.to_string(),
            },
            Some(Err(e)) => describe(&e),
            None => "not fetched".to_string(),
        };
        self.skip(kind, target.to_string(), reason, report)?;
        Ok(None)
    }

    fn skip(
        &self,
        kind: SourceKind,
        target: String,
        reason: String,
        report: &mut AssemblyReport,
    ) -> Result<(), AssemblyError> {
        if self.config.is_fatal(kind) {
            tracing::error!(category = %kind, %target, %reason, "Fatal category failed");
            return Err(AssemblyError::FatalCategory { kind, reason });
        }
        tracing::warn!(category = %kind, %target, %reason, "Skipping archive");
        report.failures.push(CategoryFailure {
            kind,
            target,
            reason,
        });
        Ok(())
    }

    fn signed(
        &self,
        name: &str,
        payload: Vec<u8>,
        report: &mut AssemblyReport,
    ) -> Result<SignedArchive, AssemblyError> {
        let archive = Archive::new(name, payload)?;
        report.archives_signed += 1;
        Ok(SignedArchive::new(archive, Arc::clone(&self.crypto)))
    }

    async fn diagnosis_keys_directory(
        &self,
        report: &mut AssemblyReport,
    ) -> Result<Directory, AssemblyError> {
        let keys = self
            .keys
            .get_diagnosis_keys_with_min_trl(self.config.min_trl, self.config.days_to_fetch)
            .await?;
        let current_hour = self.clock.now().timestamp() / SECONDS_PER_HOUR;
        let groups = group_by_submission_hour(keys, current_hour);
        report.keys_published = groups.values().flat_map(BTreeMap::values).map(Vec::len).sum();
        let region = self.config.region.to_ascii_uppercase();

        let mut date_dir = Directory::new("date")?;
        let dates: Vec<String> = groups.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect();
        date_dir.add_writable(Archive::new(INDEX_ARCHIVE, encode_index(&dates)?)?)?;

        if !groups.is_empty() {
            let info = signature_info(self.crypto.as_ref()).map_err(AssemblyError::Signing)?;
            for ((date, hours), date_name) in groups.into_iter().zip(dates) {
                let mut hour_dir = Directory::new("hour")?;
                let hour_names: Vec<u32> = hours.keys().copied().collect();
                hour_dir.add_writable(Archive::new(INDEX_ARCHIVE, encode_index(&hour_names)?)?)?;

                let day_start = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or_default();
                for (hour, keys) in hours {
                    let start = day_start + i64::from(hour) * SECONDS_PER_HOUR;
                    let metadata = KeyExportMetadata {
                        region: region.clone(),
                        start_timestamp: u64::try_from(start).unwrap_or_default(),
                        end_timestamp: u64::try_from(start + SECONDS_PER_HOUR).unwrap_or_default(),
                        signature_info: info.clone(),
                    };
                    let payload = encode_key_export(&keys, &metadata);
                    hour_dir.add_writable(self.signed(&hour.to_string(), payload, report)?)?;
                }

                let mut day_dir = Directory::new(date_name)?;
                day_dir.add_writable(hour_dir)?;
                date_dir.add_writable(day_dir)?;
            }
        }

        let mut region_dir = Directory::new(region)?;
        region_dir.add_writable(date_dir)?;
        let mut keys_dir = Directory::new(DIAGNOSIS_KEYS_DIRECTORY)?;
        keys_dir.add_writable(region_dir)?;
        Ok(keys_dir)
    }
}

fn describe(err: &RemoteSourceError) -> String {
    match err.reason() {
        Some(reason) => format!("{err}: {reason}"),
        None => err.to_string(),
    }
}

/// Group keys by UTC day and hour of their submission timestamp.
///
/// Keys submitted in `current_hour` or later are held back: an hour archive
/// is published once, after the hour has closed.
fn group_by_submission_hour(
    keys: Vec<DiagnosisKey>,
    current_hour: i64,
) -> BTreeMap<NaiveDate, BTreeMap<u32, Vec<DiagnosisKey>>> {
    let mut groups: BTreeMap<NaiveDate, BTreeMap<u32, Vec<DiagnosisKey>>> = BTreeMap::new();
    for key in keys {
        if key.submission_timestamp() >= current_hour {
            continue;
        }
        let Some(at) = key
            .submission_timestamp()
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            tracing::warn!(
                submission_timestamp = key.submission_timestamp(),
                "Skipping key with unrepresentable submission timestamp"
            );
            continue;
        };
        groups
            .entry(at.date_naive())
            .or_default()
            .entry(at.hour())
            .or_default()
            .push(key);
    }
    groups
}
