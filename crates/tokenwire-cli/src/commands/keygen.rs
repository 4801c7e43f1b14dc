//! `tokenwire keygen`

use std::path::PathBuf;

use clap::Args;
use tokenwire_crypto::{Ed25519Signer, Signer};
use tracing::info;

use super::Report;
use crate::error::{CliError, CliResult};
use crate::files::{self, KeyFile};

#[derive(Debug, Args)]
pub struct KeygenArgs {
    /// Where to write the key file
    #[arg(long)]
    pub out: PathBuf,

    /// Replace an existing key file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: KeygenArgs) -> CliResult<Report> {
    if args.out.exists() && !args.force {
        return Err(CliError::file(
            &args.out,
            "already exists (pass --force to replace it)",
        ));
    }
    let signer = Ed25519Signer::generate();
    files::write_json(&args.out, &KeyFile::from_signer(&signer))?;

    info!(path = %args.out.display(), public_key = %signer.public_key(), "Key generated");
    println!("{}", signer.public_key());
    Ok(Report::Done)
}
