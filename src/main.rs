#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

mod cli;
mod config;
mod irc;
mod mapping;
mod relay;
mod slack;
mod transform;
mod utils;

use config::Config;
use relay::{Relay, RelayIdentity, RelayRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = Config::load_from_file(&args.config)?;
    utils::logging::init_tracing(&config.logging);

    if args.check {
        // load_from_file already validated; exercise the mapping table too.
        mapping::ChannelMapping::build(&config.relay.channel_mapping)?;
        info!("configuration ok: {}", args.config.display());
        return Ok(());
    }

    info!("slack-irc relay starting up");

    let (events_tx, events_rx) = mpsc::channel(256);

    let slack_client = Arc::new(slack::SlackClient::new(&config.slack));
    let slack_identity = slack_client.connect(events_tx.clone()).await?;
    let irc_handle = Arc::new(irc::connect(&config.irc, events_tx.clone()).await?);
    drop(events_tx);

    let identity = RelayIdentity {
        bot_name: config
            .relay
            .bot_name
            .clone()
            .unwrap_or_else(|| slack_identity.name.clone()),
        slack_user_id: slack_identity.id,
        irc_nick: config.irc.nickname.clone(),
    };
    let relay = Relay::new(&config, identity)?;

    let runtime = RelayRuntime::new(
        relay,
        slack_client.clone(),
        irc_handle,
        slack_client,
        events_rx,
    );
    runtime.run().await?;

    info!("slack-irc relay shutting down");
    Ok(())
}
