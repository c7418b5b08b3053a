//! # Keygen Subcommand
//!
//! Generates the Ed25519 key used to sign distribution archives. The seed
//! is printed once and never stored.

use anyhow::Result;
use clap::Args;

use enx_crypto::{Ed25519KeyPair, EnvCryptoProvider};

/// Arguments for `enx keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Print only `ENX_SIGNING_KEY=<seed>`, for piping into an env file.
    #[arg(long)]
    pub env: bool,
}

/// Execute `enx keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = Ed25519KeyPair::generate();
    for line in render(&key, args.env) {
        println!("{line}");
    }
    Ok(0)
}

fn render(key: &Ed25519KeyPair, env: bool) -> Vec<String> {
    if env {
        return vec![format!("{}={}", EnvCryptoProvider::DEFAULT_VAR, key.seed_hex())];
    }
    let public_key = key.public_key();
    vec![
        format!("  seed:       {}", key.seed_hex()),
        format!("  public key: {public_key}"),
        format!("  key id:     {}", public_key.fingerprint()),
    ]
}
