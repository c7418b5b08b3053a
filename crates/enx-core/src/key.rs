//! # Diagnosis Keys
//!
//! A diagnosis key is a temporary exposure key uploaded by a user who tested
//! positive, plus the submission metadata the server attaches to it.
//!
//! ## Trust Tiers
//!
//! [`SubmissionType`] records how the positive result was established. PCR
//! results are authoritative: once a PCR-backed key is stored, no later
//! submission of the same key data may replace it. That rule is enforced by
//! the store, not here.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EnxError;
use crate::identity::{CountryCode, KeyData};
use crate::temporal::{retention_interval_threshold, Clock};

/// Rolling period of a full-day key (144 ten-minute intervals).
pub const DEFAULT_ROLLING_PERIOD: i32 = 144;

/// Sentinel for "days since onset of symptoms is unknown".
pub const DAYS_SINCE_ONSET_UNKNOWN: i32 = i32::MIN;

/// Provenance / trust tier of a submitted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubmissionType {
    /// Laboratory PCR test result. Authoritative.
    #[serde(rename = "SUBMISSION_TYPE_PCR_TEST")]
    PcrTest,
    /// Rapid antigen test result.
    #[serde(rename = "SUBMISSION_TYPE_RAPID_TEST")]
    RapidTest,
    /// Keys collected on behalf of a host (event check-in warnings).
    #[serde(rename = "SUBMISSION_TYPE_HOST_COLLECTED")]
    HostCollected,
    /// Self-reported result without verification.
    #[serde(rename = "SUBMISSION_TYPE_SELF_REPORT")]
    SelfReport,
}

impl SubmissionType {
    /// All variants, in declaration order.
    pub const ALL: [SubmissionType; 4] = [
        Self::PcrTest,
        Self::RapidTest,
        Self::HostCollected,
        Self::SelfReport,
    ];

    /// The persisted name, e.g. `SUBMISSION_TYPE_PCR_TEST`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PcrTest => "SUBMISSION_TYPE_PCR_TEST",
            Self::RapidTest => "SUBMISSION_TYPE_RAPID_TEST",
            Self::HostCollected => "SUBMISSION_TYPE_HOST_COLLECTED",
            Self::SelfReport => "SUBMISSION_TYPE_SELF_REPORT",
        }
    }

    /// Whether a stored key of this type may never be replaced.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::PcrTest)
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionType {
    type Err = EnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnxError::InvalidArgument(format!("unknown submission type {s:?}")))
    }
}

/// Exposure Notification report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Unknown,
    ConfirmedTest,
    ConfirmedClinicalDiagnosis,
    SelfReport,
    Recursive,
    Revoked,
}

impl ReportType {
    /// All variants, in protocol order.
    pub const ALL: [ReportType; 6] = [
        Self::Unknown,
        Self::ConfirmedTest,
        Self::ConfirmedClinicalDiagnosis,
        Self::SelfReport,
        Self::Recursive,
        Self::Revoked,
    ];

    /// The persisted name, e.g. `CONFIRMED_TEST`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::ConfirmedTest => "CONFIRMED_TEST",
            Self::ConfirmedClinicalDiagnosis => "CONFIRMED_CLINICAL_DIAGNOSIS",
            Self::SelfReport => "SELF_REPORT",
            Self::Recursive => "RECURSIVE",
            Self::Revoked => "REVOKED",
        }
    }

    /// Numeric value used in the key export protocol.
    pub fn protocol_value(&self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::ConfirmedTest => 1,
            Self::ConfirmedClinicalDiagnosis => 2,
            Self::SelfReport => 3,
            Self::Recursive => 4,
            Self::Revoked => 5,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = EnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnxError::InvalidArgument(format!("unknown report type {s:?}")))
    }
}

/// A temporary exposure key plus its submission metadata.
///
/// Equality and hashing cover every field; two keys with different key data
/// are never equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisKey {
    key_data: KeyData,
    submission_type: SubmissionType,
    rolling_start_interval_number: i32,
    rolling_period: i32,
    transmission_risk_level: i32,
    submission_timestamp: i64,
    consent_to_federation: bool,
    origin_country: CountryCode,
    visited_countries: BTreeSet<CountryCode>,
    report_type: ReportType,
    days_since_onset_of_symptoms: i32,
}

impl DiagnosisKey {
    /// Start building a key. Only the key data and the rolling start interval
    /// are mandatory; see [`DiagnosisKeyBuilder`] for the defaults.
    pub fn builder(key_data: KeyData, rolling_start_interval_number: i32) -> DiagnosisKeyBuilder {
        DiagnosisKeyBuilder::new(key_data, rolling_start_interval_number)
    }

    pub fn key_data(&self) -> &KeyData {
        &self.key_data
    }

    pub fn submission_type(&self) -> SubmissionType {
        self.submission_type
    }

    pub fn rolling_start_interval_number(&self) -> i32 {
        self.rolling_start_interval_number
    }

    pub fn rolling_period(&self) -> i32 {
        self.rolling_period
    }

    pub fn transmission_risk_level(&self) -> i32 {
        self.transmission_risk_level
    }

    /// Hours since the Unix epoch (UTC) at which the key was submitted.
    pub fn submission_timestamp(&self) -> i64 {
        self.submission_timestamp
    }

    pub fn is_consent_to_federation(&self) -> bool {
        self.consent_to_federation
    }

    pub fn origin_country(&self) -> &CountryCode {
        &self.origin_country
    }

    pub fn visited_countries(&self) -> &BTreeSet<CountryCode> {
        &self.visited_countries
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn days_since_onset_of_symptoms(&self) -> i32 {
        self.days_since_onset_of_symptoms
    }

    // Setters exist for pre-persistence adjustment (defaulting the risk level
    // or report type of a submission). The store only ever hands out copies.

    pub fn set_transmission_risk_level(&mut self, transmission_risk_level: i32) {
        self.transmission_risk_level = transmission_risk_level;
    }

    pub fn set_report_type(&mut self, report_type: ReportType) {
        self.report_type = report_type;
    }

    pub fn set_days_since_onset_of_symptoms(&mut self, days_since_onset_of_symptoms: i32) {
        self.days_since_onset_of_symptoms = days_since_onset_of_symptoms;
    }

    /// Whether the key's rolling start lies on or after the UTC midnight
    /// `days_to_retain` days ago.
    ///
    /// # Errors
    ///
    /// Returns `EnxError::InvalidArgument` if `days_to_retain` is negative.
    pub fn is_younger_than_retention_threshold(
        &self,
        days_to_retain: i32,
        clock: &dyn Clock,
    ) -> Result<bool, EnxError> {
        let threshold = retention_interval_threshold(days_to_retain, clock)?;
        Ok(i64::from(self.rolling_start_interval_number) >= threshold)
    }
}

/// Builder for [`DiagnosisKey`].
///
/// Defaults: PCR submission, rolling period 144, transmission risk level 1,
/// submission timestamp 0, origin country `DE`, no visited countries,
/// `CONFIRMED_TEST`, zero days since onset, no federation consent.
#[derive(Debug, Clone)]
pub struct DiagnosisKeyBuilder {
    key: DiagnosisKey,
}

impl DiagnosisKeyBuilder {
    fn new(key_data: KeyData, rolling_start_interval_number: i32) -> Self {
        Self {
            key: DiagnosisKey {
                key_data,
                submission_type: SubmissionType::PcrTest,
                rolling_start_interval_number,
                rolling_period: DEFAULT_ROLLING_PERIOD,
                transmission_risk_level: 1,
                submission_timestamp: 0,
                consent_to_federation: false,
                origin_country: CountryCode::germany(),
                visited_countries: BTreeSet::new(),
                report_type: ReportType::ConfirmedTest,
                days_since_onset_of_symptoms: 0,
            },
        }
    }

    pub fn submission_type(mut self, submission_type: SubmissionType) -> Self {
        self.key.submission_type = submission_type;
        self
    }

    pub fn rolling_period(mut self, rolling_period: i32) -> Self {
        self.key.rolling_period = rolling_period;
        self
    }

    pub fn transmission_risk_level(mut self, transmission_risk_level: i32) -> Self {
        self.key.transmission_risk_level = transmission_risk_level;
        self
    }

    pub fn submission_timestamp(mut self, hours_since_epoch: i64) -> Self {
        self.key.submission_timestamp = hours_since_epoch;
        self
    }

    pub fn consent_to_federation(mut self, consent: bool) -> Self {
        self.key.consent_to_federation = consent;
        self
    }

    pub fn origin_country(mut self, origin_country: CountryCode) -> Self {
        self.key.origin_country = origin_country;
        self
    }

    pub fn visited_countries(mut self, countries: impl IntoIterator<Item = CountryCode>) -> Self {
        self.key.visited_countries = countries.into_iter().collect();
        self
    }

    pub fn report_type(mut self, report_type: ReportType) -> Self {
        self.key.report_type = report_type;
        self
    }

    pub fn days_since_onset_of_symptoms(mut self, days: i32) -> Self {
        self.key.days_since_onset_of_symptoms = days;
        self
    }

    pub fn build(self) -> DiagnosisKey {
        self.key
    }
}
