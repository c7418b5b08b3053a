//! # Assemble Subcommand
//!
//! Builds the distribution bundle into an output directory.
//!
//! Online runs read keys from Postgres (`DATABASE_URL`) and fetch content
//! through the HTTP remote source client. Offline runs use an empty
//! in-memory key store and the built-in sample content, which is enough to
//! inspect the bundle layout without any infrastructure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use enx_core::{Clock, SystemClock};
use enx_crypto::{CryptoProvider, EnvCryptoProvider, LocalCryptoProvider};
use enx_pack::{AssemblyReport, DistributionConfig, FsSink, StructureAssembler};
use enx_remote::{HttpRemoteSourceClient, RemoteSourceClient, StaticRemoteSourceClient};
use enx_store::{
    DiagnosisKeyRepository, DiagnosisKeyService, InMemoryDiagnosisKeyRepository,
    PgDiagnosisKeyRepository,
};

/// Arguments for `enx assemble`.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Distribution config (YAML). Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the bundle is written into. Created if missing.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Use sample content and an empty in-memory key store.
    #[arg(long)]
    pub offline: bool,

    /// Environment variable holding the hex signing seed.
    #[arg(long, default_value = EnvCryptoProvider::DEFAULT_VAR)]
    pub signing_key_var: String,
}

/// Execute `enx assemble`.
pub fn run_assemble(args: &AssembleArgs) -> Result<u8> {
    let config = match &args.config {
        Some(path) => DistributionConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DistributionConfig::default(),
    };
    let crypto = signing_provider(&args.signing_key_var, args.offline)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    crate::runtime()?.block_on(async {
        if args.offline {
            let keys = DiagnosisKeyService::new(InMemoryDiagnosisKeyRepository::new(), Arc::clone(&clock));
            let client = Arc::new(StaticRemoteSourceClient::sample());
            let assembler = StructureAssembler::new(config, keys, client, crypto, clock)
                .context("invalid distribution configuration")?;
            publish(assembler, &args.output_dir).await
        } else {
            let repository = PgDiagnosisKeyRepository::from_env()
                .await
                .context("failed to connect to the key store")?;
            let keys = DiagnosisKeyService::new(repository, Arc::clone(&clock));
            let client = HttpRemoteSourceClient::new(config.remote.clone())
                .context("invalid remote source configuration")?;
            let assembler = StructureAssembler::new(config, keys, Arc::new(client), crypto, clock)
                .context("invalid distribution configuration")?;
            publish(assembler, &args.output_dir).await
        }
    })
}

fn signing_provider(var: &str, offline: bool) -> Result<Arc<dyn CryptoProvider>> {
    match EnvCryptoProvider::from_env(var) {
        Ok(provider) => Ok(Arc::new(provider)),
        Err(e) if offline => {
            tracing::warn!(var, error = %e, "No signing key configured; signing with an ephemeral key");
            Ok(Arc::new(LocalCryptoProvider::generate()))
        }
        Err(e) => Err(e).with_context(|| format!("failed to load signing key from {var}")),
    }
}

async fn publish<R, C>(assembler: StructureAssembler<R, C>, output_dir: &Path) -> Result<u8>
where
    R: DiagnosisKeyRepository,
    C: RemoteSourceClient + 'static,
{
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
    let mut sink = FsSink::new(output_dir);
    let report = assembler.run(&mut sink).await.context("assembly failed")?;
    print_report(&report, output_dir);
    Ok(report.status().exit_code())
}

fn print_report(report: &AssemblyReport, output_dir: &Path) {
    println!("  output:          {}", output_dir.display());
    println!("  archives signed: {}", report.archives_signed);
    println!("  keys published:  {}", report.keys_published);
    println!("  files written:   {}", report.files_written);
    if !report.failures.is_empty() {
        println!();
        println!("Skipped {} archive(s):", report.failures.len());
        for failure in &report.failures {
            println!("  {:<40} {}", failure.target, failure.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_run_writes_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let args = AssembleArgs {
            config: None,
            output_dir: dir.path().join("out"),
            offline: true,
            signing_key_var: "ENX_TEST_ASSEMBLE_KEY_UNSET".to_string(),
        };
        assert_eq!(run_assemble(&args).unwrap(), 0);

        let out = dir.path().join("out/v1");
        assert!(out.join("ehn-dgc/acceptance-rules/export.bin").is_file());
        assert!(out.join("ehn-dgc/de/value-sets/export.sig").is_file());
        assert!(out.join("dscs/export.bin").is_file());
        assert_eq!(
            std::fs::read(out.join("diagnosis-keys/DE/date/index")).unwrap(),
            b"[]"
        );
    }

    #[test]
    fn offline_run_honours_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("distribution.yaml");
        std::fs::write(&config, "root_name: v2\nlanguages: [en]\npublish_signing_certificates: false\n").unwrap();
        let args = AssembleArgs {
            config: Some(config),
            output_dir: dir.path().join("out"),
            offline: true,
            signing_key_var: "ENX_TEST_ASSEMBLE_KEY_UNSET".to_string(),
        };
        assert_eq!(run_assemble(&args).unwrap(), 0);
        assert!(dir.path().join("out/v2/ehn-dgc/en/value-sets/export.bin").is_file());
        assert!(!dir.path().join("out/v2/dscs").exists());
    }

    #[test]
    fn online_run_requires_signing_key() {
        assert!(signing_provider("ENX_TEST_ASSEMBLE_KEY_UNSET", false).is_err());
        assert!(signing_provider("ENX_TEST_ASSEMBLE_KEY_UNSET", true).is_ok());
    }

    #[test]
    fn bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("distribution.yaml");
        std::fs::write(&config, "min_trl: 42\n").unwrap();
        let args = AssembleArgs {
            config: Some(config),
            output_dir: dir.path().join("out"),
            offline: true,
            signing_key_var: "ENX_TEST_ASSEMBLE_KEY_UNSET".to_string(),
        };
        assert!(run_assemble(&args).is_err());
    }
}
