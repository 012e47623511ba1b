use std::collections::{BTreeMap, HashMap};

use crate::config::ConfigError;

// Slack names are matched exactly; IRC names are lowercased on both
// insertion and lookup, since IRC channel names are case-insensitive.
#[derive(Debug, Clone)]
pub struct ChannelMapping {
    forward: HashMap<String, String>,
    inverse: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub channel: String,
    pub key: Option<String>,
}

impl ChannelMapping {
    // Raw values may carry a trailing whitespace-separated channel key
    // ("#secret-chan somekey"); only the first token is kept as the IRC
    // channel name, the key is never retained here.
    pub fn build(raw: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "channel_mapping cannot be empty".to_string(),
            ));
        }

        let mut forward = HashMap::new();
        let mut inverse = HashMap::new();

        for (slack_channel, value) in raw {
            let slack_channel = slack_channel.trim();
            let Some(irc_channel) = value.split_whitespace().next() else {
                return Err(ConfigError::InvalidConfig(format!(
                    "channel_mapping entry for {slack_channel:?} has an empty IRC channel"
                )));
            };
            if slack_channel.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "channel_mapping contains an empty Slack channel name".to_string(),
                ));
            }

            let irc_channel = irc_channel.to_lowercase();
            if inverse
                .insert(irc_channel.clone(), slack_channel.to_string())
                .is_some()
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "channel_mapping maps more than one Slack channel to {irc_channel:?}"
                )));
            }
            forward.insert(slack_channel.to_string(), irc_channel);
        }

        Ok(Self { forward, inverse })
    }

    pub fn resolve_to_irc(&self, slack_channel: &str) -> Option<&str> {
        self.forward.get(slack_channel).map(String::as_str)
    }

    pub fn resolve_to_slack(&self, irc_channel: &str) -> Option<&str> {
        self.inverse
            .get(&irc_channel.to_lowercase())
            .map(String::as_str)
    }
}

// The (channel, optional key) pairs the IRC connection must join.
pub fn join_specs(raw: &BTreeMap<String, String>) -> Vec<JoinSpec> {
    raw.values()
        .filter_map(|value| {
            let mut parts = value.split_whitespace();
            let channel = parts.next()?.to_lowercase();
            let key = parts.next().map(ToOwned::to_owned);
            Some(JoinSpec { channel, key })
        })
        .collect()
}
