//! # code — Mint Verification Codes
//!
//! Operator tooling for pre-printed document batches: mints one or more
//! verification codes from OS randomness.

use clap::Args;

use creda_core::VerificationCode;

/// Arguments for `creda code`.
#[derive(Args, Debug)]
pub struct CodeArgs {
    /// How many codes to mint.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

/// Mint and print codes, one per line.
pub fn run(args: CodeArgs) -> anyhow::Result<()> {
    for _ in 0..args.count {
        println!("{}", VerificationCode::mint());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_requested_count_without_error() {
        run(CodeArgs { count: 3 }).unwrap();
    }
}
