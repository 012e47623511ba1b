use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "slack-irc-relay", about = "Bidirectional Slack <-> IRC message relay")]
pub struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Validate the configuration and exit without connecting.
    #[arg(long)]
    pub check: bool,
}
