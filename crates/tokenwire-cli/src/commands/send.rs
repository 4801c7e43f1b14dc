//! `tokenwire send`

use std::path::PathBuf;

use clap::Args;
use tokenwire_commitment::CommitmentBuilder;
use tokenwire_transfer::{PendingTransition, Token, TransferEnvelope, TransitionPipeline};
use tokenwire_types::PublicKey;
use tracing::info;

use super::{print_outcome, recipient_predicate, Network, Report};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::files;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Key file of the current owner
    #[arg(long)]
    pub key: PathBuf,

    /// Token file; updated in place with the pending transfer
    #[arg(long)]
    pub token: PathBuf,

    /// Recipient public key (hex)
    #[arg(long)]
    pub recipient: PublicKey,

    /// Hide the recipient key behind a random nonce
    #[arg(long)]
    pub masked: bool,

    /// Free-form data bound into the transfer
    #[arg(long)]
    pub message: Option<String>,

    /// Where to write the envelope
    #[arg(long)]
    pub out: PathBuf,

    /// Submit the commitment before handing over the envelope
    #[arg(long)]
    pub submit: bool,
}

pub async fn execute(args: SendArgs, config: &CliConfig) -> CliResult<Report> {
    let signer = files::read_signer(&args.key)?;
    let mut token: Token = files::read_json(&args.token)?;

    let recipient = recipient_predicate(args.recipient, args.masked);
    let builder = CommitmentBuilder::transfer(*token.id(), token.prior_state()?, recipient.clone())
        .message(args.message.unwrap_or_default().into_bytes());
    token.begin_transition(PendingTransition {
        commitment: builder.build(&signer)?,
        recipient,
        salt: *builder.salt_value(),
        message: builder.message_value().clone(),
    })?;

    if args.submit {
        let network = Network::connect(config)?;
        let pipeline =
            TransitionPipeline::new(&network.aggregator, &network.validator, &config.poller);
        let submitted = pipeline.submit(&mut token).await;
        files::write_json(&args.token, &token)?;
        if let Some(outcome) = submitted? {
            print_outcome(&token, &outcome);
            return Ok(Report::Transition(outcome));
        }
    } else {
        files::write_json(&args.token, &token)?;
    }

    let envelope = TransferEnvelope::from_token(&token, None)?;
    files::write_text(&args.out, &envelope.to_json()?)?;
    info!(
        token_id = %token.id(),
        recipient = %args.recipient,
        submitted = args.submit,
        "Envelope written"
    );
    println!("{}", args.out.display());
    Ok(Report::Done)
}
