//! `tokenwire receive`

use std::path::PathBuf;

use clap::Args;
use tokenwire_crypto::Signer;
use tokenwire_transfer::{EnvelopeReceiver, TransferEnvelope, TransitionPipeline};
use tokio_util::sync::CancellationToken;

use super::{print_outcome, Network, Report};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::files;

#[derive(Debug, Args)]
pub struct ReceiveArgs {
    /// Key file of the recipient
    #[arg(long)]
    pub key: PathBuf,

    /// Envelope received from the sender
    #[arg(long)]
    pub envelope: PathBuf,

    /// Where to write the received token
    #[arg(long)]
    pub out: PathBuf,
}

pub async fn execute(
    args: ReceiveArgs,
    config: &CliConfig,
    cancel: &CancellationToken,
) -> CliResult<Report> {
    let signer = files::read_signer(&args.key)?;
    let json =
        std::fs::read_to_string(&args.envelope).map_err(|e| CliError::file(&args.envelope, e))?;
    let envelope = TransferEnvelope::from_json(&json)?;

    let network = Network::connect(config)?;
    let pipeline = TransitionPipeline::new(&network.aggregator, &network.validator, &config.poller);
    let receiver = EnvelopeReceiver::new(pipeline).expect_recipient(signer.public_key());
    let (token, outcome) = receiver.receive(envelope, cancel).await?;

    files::write_json(&args.out, &token)?;
    print_outcome(&token, &outcome);
    Ok(Report::Transition(outcome))
}
