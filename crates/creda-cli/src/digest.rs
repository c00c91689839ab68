//! # digest — Canonical Payload Digest
//!
//! Reads a JSON payload file, canonicalizes it, and prints the
//! `sha256:<hex>` digest. Lets auditors recompute a credential's
//! commitment from exported data without running the service.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use creda_registry::LifecycleManager;

/// Arguments for `creda digest`.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Path to the JSON payload file.
    pub payload: PathBuf,
}

/// Compute and print the digest.
pub fn run(args: DigestArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("reading {}", args.payload.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", args.payload.display()))?;

    let digest = LifecycleManager::preview_digest(&value)
        .context("canonicalizing payload (floats must be strings)")?;
    println!("{digest}");
    Ok(())
}
