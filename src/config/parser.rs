use std::collections::BTreeMap;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub slack: SlackConfig,
    pub irc: IrcConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub token: SecretString,
    // Avatar URL template for forwarded IRC authors; `:nick` is substituted.
    #[serde(default = "default_avatar_url_pattern")]
    pub avatar_url_pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    pub nickname: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub use_tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    // Slack channel name -> IRC channel name, optionally followed by a
    // whitespace-separated channel key ("#chan key").
    pub channel_mapping: BTreeMap<String, String>,
    // Defaults to the Slack bot's own name.
    #[serde(default)]
    pub bot_name: Option<String>,
    // Leading characters marking a message as an instruction for the IRC
    // side rather than chat content.
    #[serde(default)]
    pub command_characters: Vec<String>,
    // Leading character marking a message as a command for the relay itself.
    #[serde(default = "default_relay_trigger")]
    pub relay_trigger: String,
    #[serde(default)]
    pub auto_send_commands: Vec<Vec<String>>,
    #[serde(default)]
    pub emoji: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.token.expose_secret().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "slack.token cannot be empty".to_string(),
            ));
        }

        if self.irc.server.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "irc.server cannot be empty".to_string(),
            ));
        }

        if self.irc.nickname.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "irc.nickname cannot be empty".to_string(),
            ));
        }

        if self.irc.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "irc.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.relay.channel_mapping.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "relay.channel_mapping cannot be empty".to_string(),
            ));
        }

        if self.relay.relay_trigger.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "relay.relay_trigger cannot be empty".to_string(),
            ));
        }

        // The relay trigger claims messages for the relay itself; sharing it
        // with the command characters would make those messages ambiguous.
        if self
            .relay
            .command_characters
            .contains(&self.relay.relay_trigger)
        {
            return Err(ConfigError::InvalidConfig(
                "relay.relay_trigger must differ from relay.command_characters".to_string(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("SLACK_IRC_SLACK_TOKEN") {
            self.slack.token = SecretString::from(value);
        }
        if let Ok(value) = std::env::var("SLACK_IRC_IRC_PASSWORD") {
            self.irc.password = Some(SecretString::from(value));
        }
    }
}

fn default_avatar_url_pattern() -> String {
    "https://robohash.org/:nick.png".to_string()
}

fn default_irc_port() -> u16 {
    6667
}

fn default_relay_trigger() -> String {
    "@".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
