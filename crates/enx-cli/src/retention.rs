//! # Retention Subcommand
//!
//! Applies the key retention policy against the Postgres store.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use enx_core::{days_to_hours, SystemClock};
use enx_store::{DiagnosisKeyService, PgDiagnosisKeyRepository};

/// Arguments for `enx retention`.
#[derive(Args, Debug)]
pub struct RetentionArgs {
    /// Keys submitted more than this many days ago are deleted.
    #[arg(long, allow_negative_numbers = true)]
    pub days: i32,
}

/// Execute `enx retention`.
pub fn run_retention(args: &RetentionArgs) -> Result<u8> {
    let days = args.days;
    days_to_hours(days, &SystemClock).context("invalid retention period")?;

    let deleted = crate::runtime()?.block_on(async {
        let repository = PgDiagnosisKeyRepository::from_env()
            .await
            .context("failed to connect to the key store")?;
        let service = DiagnosisKeyService::new(repository, Arc::new(SystemClock));
        service
            .apply_retention_policy(days)
            .await
            .context("retention failed")
    })?;

    println!("  retention days: {days}");
    println!("  deleted keys:   {deleted}");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_days_fail_before_connecting() {
        let err = run_retention(&RetentionArgs { days: -1 }).unwrap_err();
        assert_eq!(err.to_string(), "invalid retention period");
        assert!(format!("{err:#}").contains("greater or equal to 0"));
    }
}
