//! `tokenwire mint`

use std::path::PathBuf;

use clap::Args;
use tokenwire_commitment::CommitmentBuilder;
use tokenwire_crypto::Signer;
use tokenwire_transfer::{PendingTransition, Token, TransitionPipeline};
use tokenwire_types::TokenId;
use tokio_util::sync::CancellationToken;

use super::{print_outcome, recipient_predicate, Network, Report};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::files;

#[derive(Debug, Args)]
pub struct MintArgs {
    /// Key file of the first owner
    #[arg(long)]
    pub key: PathBuf,

    /// Where to write the token
    #[arg(long)]
    pub out: PathBuf,

    /// Free-form data bound into the mint
    #[arg(long)]
    pub message: Option<String>,

    /// Hide the owner key behind a random nonce
    #[arg(long)]
    pub masked: bool,
}

pub async fn execute(
    args: MintArgs,
    config: &CliConfig,
    cancel: &CancellationToken,
) -> CliResult<Report> {
    let signer = files::read_signer(&args.key)?;
    let network = Network::connect(config)?;

    let id = TokenId::random();
    let recipient = recipient_predicate(signer.public_key(), args.masked);
    let builder = CommitmentBuilder::mint(id, recipient.clone())
        .message(args.message.unwrap_or_default().into_bytes());
    let mut token = Token::new_mint(
        id,
        PendingTransition {
            commitment: builder.build(&signer)?,
            recipient,
            salt: *builder.salt_value(),
            message: builder.message_value().clone(),
        },
    )?;

    let pipeline = TransitionPipeline::new(&network.aggregator, &network.validator, &config.poller);
    let result = pipeline.run(&mut token, cancel).await;
    // the token file is kept whatever happened so the transition can be inspected or resumed
    files::write_json(&args.out, &token)?;

    let outcome = result?;
    print_outcome(&token, &outcome);
    Ok(Report::Transition(outcome))
}
