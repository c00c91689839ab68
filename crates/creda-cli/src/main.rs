//! # creda CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// Creda registry toolchain.
///
/// Runs the credential registry API, computes canonical payload digests,
/// and mints verification codes.
#[derive(Parser, Debug)]
#[command(name = "creda", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the registry API service.
    Serve(creda_cli::serve::ServeArgs),
    /// Canonicalize a JSON payload file and print its digest.
    Digest(creda_cli::digest::DigestArgs),
    /// Mint a verification code.
    Code(creda_cli::code::CodeArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => creda_cli::serve::run(args),
        Commands::Digest(args) => creda_cli::digest::run(args),
        Commands::Code(args) => creda_cli::code::run(args),
    }
}
