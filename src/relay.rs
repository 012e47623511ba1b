use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigError};
use crate::irc::IrcEvent;
use crate::mapping::{self, ChannelMapping, JoinSpec};
use crate::slack::SlackEvent;
use crate::transform::{EmojiTable, EntityResolver, SlackToIrcRenderer, irc_to_slack};
use crate::utils::formatting::apply_pattern_string;

pub mod roster;

use self::roster::RosterTracker;

// The only message subtype still relayed as chat content.
const ACTION_SUBTYPE: &str = "me_message";
const ROSTER_COMMAND: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Slack(SlackEvent),
    Irc(IrcEvent),
}

// The relay's own identity on both networks, used to drop echoes of our own
// traffic and to sign relay-originated Slack posts.
#[derive(Debug, Clone)]
pub struct RelayIdentity {
    pub bot_name: String,
    pub slack_user_id: String,
    pub irc_nick: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    IrcSay {
        channel: String,
        lines: Vec<String>,
    },
    IrcRaw {
        command: String,
        args: Vec<String>,
    },
    IrcJoin {
        channel: String,
        key: Option<String>,
    },
    SlackMessage {
        channel: String,
        username: String,
        icon_url: Option<String>,
        text: String,
    },
}

#[async_trait]
pub trait SlackSink: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        username: &str,
        icon_url: Option<&str>,
        text: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait IrcSink: Send + Sync {
    async fn say(&self, channel: &str, lines: &[String]) -> Result<()>;
    async fn send_raw(&self, command: &str, args: &[String]) -> Result<()>;
    async fn join(&self, channel: &str, key: Option<&str>) -> Result<()>;
}

// Pairs each inbound event with zero or more outbound sends; does no I/O of
// its own.
pub struct Relay {
    mapping: ChannelMapping,
    roster: RosterTracker,
    identity: RelayIdentity,
    renderer: SlackToIrcRenderer,
    command_characters: Vec<String>,
    relay_trigger: String,
    auto_send_commands: Vec<Vec<String>>,
    join_specs: Vec<JoinSpec>,
    avatar_url_pattern: String,
}

impl Relay {
    pub fn new(config: &Config, identity: RelayIdentity) -> Result<Self, ConfigError> {
        let mapping = ChannelMapping::build(&config.relay.channel_mapping)?;
        let join_specs = mapping::join_specs(&config.relay.channel_mapping);
        Ok(Self {
            mapping,
            roster: RosterTracker::new(),
            identity,
            renderer: SlackToIrcRenderer::new(EmojiTable::with_overrides(&config.relay.emoji)),
            command_characters: config.relay.command_characters.clone(),
            relay_trigger: config.relay.relay_trigger.clone(),
            auto_send_commands: config.relay.auto_send_commands.clone(),
            join_specs,
            avatar_url_pattern: config.slack.avatar_url_pattern.clone(),
        })
    }

    pub fn handle_slack_event(
        &mut self,
        event: &SlackEvent,
        resolver: &dyn EntityResolver,
    ) -> Vec<Outbound> {
        match event {
            SlackEvent::Hello => {
                info!("slack rtm session established");
                Vec::new()
            }
            SlackEvent::Goodbye => {
                info!("slack rtm session closing");
                Vec::new()
            }
            SlackEvent::Error { code, message } => {
                error!("slack error {code}: {message}");
                Vec::new()
            }
            SlackEvent::Message {
                channel,
                user,
                text,
                subtype,
            } => self.handle_slack_message(channel, user, text, subtype.as_deref(), resolver),
        }
    }

    fn handle_slack_message(
        &mut self,
        channel_id: &str,
        user_id: &str,
        text: &str,
        subtype: Option<&str>,
        resolver: &dyn EntityResolver,
    ) -> Vec<Outbound> {
        if user_id == self.identity.slack_user_id {
            debug!("ignoring echo of our own slack message");
            return Vec::new();
        }
        match subtype {
            None | Some(ACTION_SUBTYPE) => {}
            Some(other) => {
                debug!("ignoring slack message subtype {other}");
                return Vec::new();
            }
        }

        let Some(channel_name) = resolver
            .channel_name(channel_id)
            .map(|name| format!("#{name}"))
        else {
            warn!("slack message from unknown channel id {channel_id}");
            return Vec::new();
        };

        if let Some(rest) = text.strip_prefix(&self.relay_trigger) {
            if rest.trim().eq_ignore_ascii_case(ROSTER_COMMAND) {
                return self.issue_roster_query(&channel_name);
            }
        }

        let Some(irc_channel) = self.mapping.resolve_to_irc(&channel_name) else {
            info!("ignoring slack message to unmapped channel {channel_name}");
            return Vec::new();
        };
        let irc_channel = irc_channel.to_string();

        let author = resolver
            .user_name(user_id)
            .unwrap_or_else(|| user_id.to_string());
        let body = self.renderer.render(text, resolver);

        let is_command = self
            .command_characters
            .iter()
            .any(|character| body.starts_with(character.as_str()));
        let lines = if is_command {
            // Flags the next line as an instruction for IRC-side operators.
            vec![format!("Command sent from Slack by {author}:"), body]
        } else if subtype == Some(ACTION_SUBTYPE) {
            vec![format!("Action: {author} {body}")]
        } else {
            vec![format!("<{author}> {body}")]
        };

        vec![Outbound::IrcSay {
            channel: irc_channel,
            lines,
        }]
    }

    fn issue_roster_query(&mut self, channel_name: &str) -> Vec<Outbound> {
        let Some(irc_channel) = self.mapping.resolve_to_irc(channel_name) else {
            info!("ignoring roster command for unmapped channel {channel_name}");
            return Vec::new();
        };
        let irc_channel = irc_channel.to_string();
        // Incremented only when the query actually goes out.
        self.roster.issue();
        vec![Outbound::IrcRaw {
            command: "NAMES".to_string(),
            args: vec![irc_channel],
        }]
    }

    pub fn handle_irc_event(&mut self, event: &IrcEvent) -> Vec<Outbound> {
        match event {
            IrcEvent::Registered => self.on_registered(),
            IrcEvent::Message {
                nick,
                channel,
                text,
            } => self.forward_irc_text(nick, channel, irc_to_slack::format_message(text)),
            IrcEvent::Notice {
                nick,
                channel,
                text,
            } => self.forward_irc_text(nick, channel, irc_to_slack::format_notice(text)),
            IrcEvent::Action {
                nick,
                channel,
                text,
            } => self.forward_irc_text(nick, channel, irc_to_slack::format_action(text)),
            IrcEvent::Join { nick, channel } => self.announce_join(nick, channel),
            IrcEvent::Invite { nick, channel } => self.accept_invite(nick, channel),
            IrcEvent::Names { channel, names } => self.forward_roster(channel, names),
            IrcEvent::Error { message } => {
                error!("irc error: {message}");
                Vec::new()
            }
        }
    }

    fn on_registered(&self) -> Vec<Outbound> {
        info!(
            "irc registered; joining {} mapped channels",
            self.join_specs.len()
        );
        let mut outbound = Vec::new();
        for command in &self.auto_send_commands {
            let Some((name, args)) = command.split_first() else {
                continue;
            };
            outbound.push(Outbound::IrcRaw {
                command: name.clone(),
                args: args.to_vec(),
            });
        }
        for spec in &self.join_specs {
            outbound.push(Outbound::IrcJoin {
                channel: spec.channel.clone(),
                key: spec.key.clone(),
            });
        }
        outbound
    }

    fn forward_irc_text(&self, nick: &str, channel: &str, text: String) -> Vec<Outbound> {
        if nick == self.identity.irc_nick {
            return Vec::new();
        }
        let Some(slack_channel) = self.mapping.resolve_to_slack(channel) else {
            debug!("ignoring irc traffic on unmapped channel {channel}");
            return Vec::new();
        };
        vec![Outbound::SlackMessage {
            channel: slack_channel.to_string(),
            username: nick.to_string(),
            icon_url: Some(self.avatar_url(nick)),
            text,
        }]
    }

    fn announce_join(&self, nick: &str, channel: &str) -> Vec<Outbound> {
        if nick == self.identity.irc_nick {
            debug!("not announcing our own join to {channel}");
            return Vec::new();
        }
        let Some(slack_channel) = self.mapping.resolve_to_slack(channel) else {
            debug!("ignoring join on unmapped channel {channel}");
            return Vec::new();
        };
        vec![Outbound::SlackMessage {
            channel: slack_channel.to_string(),
            username: self.identity.bot_name.clone(),
            icon_url: None,
            text: irc_to_slack::format_join(nick),
        }]
    }

    fn accept_invite(&self, nick: &str, channel: &str) -> Vec<Outbound> {
        if self.mapping.resolve_to_slack(channel).is_none() {
            info!("ignoring invite from {nick} to unmapped channel {channel}");
            return Vec::new();
        }
        let key = self
            .join_specs
            .iter()
            .find(|spec| spec.channel.eq_ignore_ascii_case(channel))
            .and_then(|spec| spec.key.clone());
        vec![Outbound::IrcJoin {
            channel: channel.to_string(),
            key,
        }]
    }

    fn forward_roster(&mut self, channel: &str, names: &[String]) -> Vec<Outbound> {
        if !self.roster.consume() {
            debug!("dropping unsolicited roster reply for {channel}");
            return Vec::new();
        }
        let Some(slack_channel) = self.mapping.resolve_to_slack(channel) else {
            info!("roster reply for unmapped channel {channel}");
            return Vec::new();
        };
        vec![Outbound::SlackMessage {
            channel: slack_channel.to_string(),
            username: self.identity.bot_name.clone(),
            icon_url: None,
            text: irc_to_slack::format_names(channel, names),
        }]
    }

    fn avatar_url(&self, nick: &str) -> String {
        apply_pattern_string(&self.avatar_url_pattern, &[("nick", nick)])
    }
}

// One event at a time, handled to completion before the next is taken from
// either network. A failed send is logged and never stops the loop.
pub struct RelayRuntime {
    relay: Relay,
    slack: Arc<dyn SlackSink>,
    irc: Arc<dyn IrcSink>,
    resolver: Arc<dyn EntityResolver + Send + Sync>,
    events: mpsc::Receiver<InboundEvent>,
}

impl RelayRuntime {
    pub fn new(
        relay: Relay,
        slack: Arc<dyn SlackSink>,
        irc: Arc<dyn IrcSink>,
        resolver: Arc<dyn EntityResolver + Send + Sync>,
        events: mpsc::Receiver<InboundEvent>,
    ) -> Self {
        Self {
            relay,
            slack,
            irc,
            resolver,
            events,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("relay loop started");
        while let Some(event) = self.events.recv().await {
            let outbound = match &event {
                InboundEvent::Slack(event) => {
                    self.relay.handle_slack_event(event, self.resolver.as_ref())
                }
                InboundEvent::Irc(event) => self.relay.handle_irc_event(event),
            };
            for action in outbound {
                if let Err(err) = self.execute(action).await {
                    error!("outbound send failed: {err}");
                }
            }
        }
        info!("relay loop finished: all event sources closed");
        Ok(())
    }

    async fn execute(&self, action: Outbound) -> Result<()> {
        match action {
            Outbound::IrcSay { channel, lines } => self.irc.say(&channel, &lines).await,
            Outbound::IrcRaw { command, args } => self.irc.send_raw(&command, &args).await,
            Outbound::IrcJoin { channel, key } => self.irc.join(&channel, key.as_deref()).await,
            Outbound::SlackMessage {
                channel,
                username,
                icon_url,
                text,
            } => {
                self.slack
                    .post_message(&channel, &username, icon_url.as_deref(), &text)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use secrecy::SecretString;
    use tokio::sync::mpsc;

    use super::{
        InboundEvent, IrcSink, Outbound, Relay, RelayIdentity, RelayRuntime, SlackSink,
    };
    use crate::config::{Config, IrcConfig, LoggingConfig, RelayConfig, SlackConfig};
    use crate::irc::IrcEvent;
    use crate::slack::SlackEvent;
    use crate::transform::EntityResolver;

    #[derive(Default)]
    struct StubResolver {
        channels: HashMap<String, String>,
        users: HashMap<String, String>,
    }

    impl StubResolver {
        fn bridge_defaults() -> Self {
            let mut resolver = Self::default();
            resolver
                .channels
                .insert("C0".to_string(), "general".to_string());
            resolver.channels.insert("C1".to_string(), "dev".to_string());
            resolver.users.insert("U1".to_string(), "alice".to_string());
            resolver
        }
    }

    impl EntityResolver for StubResolver {
        fn channel_name(&self, id: &str) -> Option<String> {
            self.channels.get(id).cloned()
        }

        fn user_name(&self, id: &str) -> Option<String> {
            self.users.get(id).cloned()
        }
    }

    fn test_config() -> Config {
        Config {
            slack: SlackConfig {
                token: SecretString::from("xoxb-test"),
                avatar_url_pattern: "https://robohash.org/:nick.png".to_string(),
            },
            irc: IrcConfig {
                server: "irc.example.org".to_string(),
                port: 6667,
                nickname: "relaybot".to_string(),
                username: None,
                realname: None,
                password: None,
                use_tls: false,
            },
            relay: RelayConfig {
                channel_mapping: BTreeMap::from([(
                    "#general".to_string(),
                    "#linked-general secretpass".to_string(),
                )]),
                bot_name: Some("relay".to_string()),
                command_characters: vec!["!".to_string()],
                relay_trigger: "@".to_string(),
                auto_send_commands: vec![vec![
                    "MODE".to_string(),
                    "relaybot".to_string(),
                    "+x".to_string(),
                ]],
                emoji: BTreeMap::new(),
            },
            logging: LoggingConfig::default(),
        }
    }

    fn test_relay() -> Relay {
        Relay::new(
            &test_config(),
            RelayIdentity {
                bot_name: "relay".to_string(),
                slack_user_id: "USELF".to_string(),
                irc_nick: "relaybot".to_string(),
            },
        )
        .expect("test relay should build")
    }

    fn slack_message(channel: &str, user: &str, text: &str, subtype: Option<&str>) -> SlackEvent {
        SlackEvent::Message {
            channel: channel.to_string(),
            user: user.to_string(),
            text: text.to_string(),
            subtype: subtype.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn plain_slack_message_is_forwarded_with_author_prefix() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(
            &slack_message("C0", "U1", "hello <#C1|dev> :smile:", None),
            &resolver,
        );
        assert_eq!(
            out,
            vec![Outbound::IrcSay {
                channel: "#linked-general".to_string(),
                lines: vec!["<alice> hello #dev 😄".to_string()],
            }]
        );
    }

    #[test]
    fn me_message_is_forwarded_as_action() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(
            &slack_message("C0", "U1", "waves", Some("me_message")),
            &resolver,
        );
        assert_eq!(
            out,
            vec![Outbound::IrcSay {
                channel: "#linked-general".to_string(),
                lines: vec!["Action: alice waves".to_string()],
            }]
        );
    }

    #[test]
    fn other_subtypes_are_dropped_silently() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(
            &slack_message("C0", "U1", "edited", Some("message_changed")),
            &resolver,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn our_own_slack_messages_are_dropped() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out =
            relay.handle_slack_event(&slack_message("C0", "USELF", "echo", None), &resolver);
        assert!(out.is_empty());
    }

    #[test]
    fn unmapped_slack_channel_produces_no_sends() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(&slack_message("C1", "U1", "hello", None), &resolver);
        assert!(out.is_empty());
    }

    #[test]
    fn command_character_message_gets_the_operator_prefix() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out =
            relay.handle_slack_event(&slack_message("C0", "U1", "!restart", None), &resolver);
        assert_eq!(
            out,
            vec![Outbound::IrcSay {
                channel: "#linked-general".to_string(),
                lines: vec![
                    "Command sent from Slack by alice:".to_string(),
                    "!restart".to_string(),
                ],
            }]
        );
    }

    #[test]
    fn roster_command_issues_a_names_query() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(&slack_message("C0", "U1", "@users", None), &resolver);
        assert_eq!(
            out,
            vec![Outbound::IrcRaw {
                command: "NAMES".to_string(),
                args: vec!["#linked-general".to_string()],
            }]
        );
        assert_eq!(relay.roster.pending(), 1);
    }

    #[test]
    fn roster_command_is_case_insensitive() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(&slack_message("C0", "U1", "@USERS", None), &resolver);
        assert_eq!(out.len(), 1);
        assert_eq!(relay.roster.pending(), 1);
    }

    #[test]
    fn roster_command_for_unmapped_channel_does_not_issue() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        let out = relay.handle_slack_event(&slack_message("C1", "U1", "@users", None), &resolver);
        assert!(out.is_empty());
        assert_eq!(relay.roster.pending(), 0);
    }

    #[test]
    fn roster_reply_is_forwarded_once_per_query() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        relay.handle_slack_event(&slack_message("C0", "U1", "@users", None), &resolver);

        let names = vec!["alice".to_string(), "bob".to_string()];
        let out = relay.handle_irc_event(&IrcEvent::Names {
            channel: "#linked-general".to_string(),
            names: names.clone(),
        });
        assert_eq!(
            out,
            vec![Outbound::SlackMessage {
                channel: "#general".to_string(),
                username: "relay".to_string(),
                icon_url: None,
                text: "```\nUsers in #linked-general: alice bob\n```".to_string(),
            }]
        );

        // A second reply has no matching request and is dropped.
        let out = relay.handle_irc_event(&IrcEvent::Names {
            channel: "#linked-general".to_string(),
            names,
        });
        assert!(out.is_empty());
    }

    #[test]
    fn unsolicited_roster_reply_is_dropped() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Names {
            channel: "#linked-general".to_string(),
            names: vec!["alice".to_string()],
        });
        assert!(out.is_empty());
    }

    #[test]
    fn irc_message_is_forwarded_under_the_original_nick() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Message {
            nick: "bob".to_string(),
            channel: "#linked-general".to_string(),
            text: "hi all".to_string(),
        });
        assert_eq!(
            out,
            vec![Outbound::SlackMessage {
                channel: "#general".to_string(),
                username: "bob".to_string(),
                icon_url: Some("https://robohash.org/bob.png".to_string()),
                text: "hi all".to_string(),
            }]
        );
    }

    #[test]
    fn irc_notice_is_wrapped_in_asterisks() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Notice {
            nick: "bob".to_string(),
            channel: "#Linked-General".to_string(),
            text: "back soon".to_string(),
        });
        match &out[..] {
            [Outbound::SlackMessage {
                channel,
                username,
                text,
                ..
            }] => {
                assert_eq!(channel, "#general");
                assert_eq!(username, "bob");
                assert_eq!(text, "*back soon*");
            }
            other => panic!("unexpected outbound: {other:?}"),
        }
    }

    #[test]
    fn irc_action_is_wrapped_in_underscores() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Action {
            nick: "bob".to_string(),
            channel: "#linked-general".to_string(),
            text: "waves".to_string(),
        });
        match &out[..] {
            [Outbound::SlackMessage { text, .. }] => assert_eq!(text, "_waves_"),
            other => panic!("unexpected outbound: {other:?}"),
        }
    }

    #[test]
    fn irc_traffic_on_unmapped_channel_is_dropped() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Message {
            nick: "bob".to_string(),
            channel: "#elsewhere".to_string(),
            text: "hi".to_string(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn our_own_irc_messages_are_dropped() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Message {
            nick: "relaybot".to_string(),
            channel: "#linked-general".to_string(),
            text: "echo".to_string(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn join_is_announced_under_the_relay_identity() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Join {
            nick: "bob".to_string(),
            channel: "#linked-general".to_string(),
        });
        assert_eq!(
            out,
            vec![Outbound::SlackMessage {
                channel: "#general".to_string(),
                username: "relay".to_string(),
                icon_url: None,
                text: "*bob* has joined the IRC channel 🎉".to_string(),
            }]
        );
    }

    #[test]
    fn our_own_join_is_not_announced() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Join {
            nick: "relaybot".to_string(),
            channel: "#linked-general".to_string(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn invite_to_mapped_channel_is_accepted_with_its_key() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Invite {
            nick: "bob".to_string(),
            channel: "#linked-general".to_string(),
        });
        assert_eq!(
            out,
            vec![Outbound::IrcJoin {
                channel: "#linked-general".to_string(),
                key: Some("secretpass".to_string()),
            }]
        );
    }

    #[test]
    fn invite_to_unmapped_channel_is_ignored() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Invite {
            nick: "bob".to_string(),
            channel: "#elsewhere".to_string(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn registration_sends_auto_commands_then_joins() {
        let mut relay = test_relay();
        let out = relay.handle_irc_event(&IrcEvent::Registered);
        assert_eq!(
            out,
            vec![
                Outbound::IrcRaw {
                    command: "MODE".to_string(),
                    args: vec!["relaybot".to_string(), "+x".to_string()],
                },
                Outbound::IrcJoin {
                    channel: "#linked-general".to_string(),
                    key: Some("secretpass".to_string()),
                },
            ]
        );
    }

    #[test]
    fn lifecycle_and_error_events_produce_no_sends() {
        let mut relay = test_relay();
        let resolver = StubResolver::bridge_defaults();
        assert!(relay.handle_slack_event(&SlackEvent::Hello, &resolver).is_empty());
        assert!(
            relay
                .handle_slack_event(
                    &SlackEvent::Error {
                        code: 1,
                        message: "bad".to_string()
                    },
                    &resolver
                )
                .is_empty()
        );
        assert!(
            relay
                .handle_irc_event(&IrcEvent::Error {
                    message: "closed".to_string()
                })
                .is_empty()
        );
    }

    #[derive(Default)]
    struct RecordingSlack {
        posts: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl SlackSink for RecordingSlack {
        async fn post_message(
            &self,
            channel: &str,
            username: &str,
            _icon_url: Option<&str>,
            text: &str,
        ) -> anyhow::Result<()> {
            self.posts.lock().push((
                channel.to_string(),
                username.to_string(),
                text.to_string(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingIrc {
        says: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl IrcSink for RecordingIrc {
        async fn say(&self, channel: &str, lines: &[String]) -> anyhow::Result<()> {
            self.says.lock().push((channel.to_string(), lines.to_vec()));
            Ok(())
        }

        async fn send_raw(&self, _command: &str, _args: &[String]) -> anyhow::Result<()> {
            Ok(())
        }

        async fn join(&self, _channel: &str, _key: Option<&str>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn runtime_routes_events_in_both_directions() {
        let slack = Arc::new(RecordingSlack::default());
        let irc = Arc::new(RecordingIrc::default());
        let resolver = Arc::new(StubResolver::bridge_defaults());
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundEvent::Slack(slack_message("C0", "U1", "hello", None)))
            .await
            .expect("send");
        tx.send(InboundEvent::Irc(IrcEvent::Notice {
            nick: "bob".to_string(),
            channel: "#linked-general".to_string(),
            text: "back soon".to_string(),
        }))
        .await
        .expect("send");
        drop(tx);

        let runtime = RelayRuntime::new(test_relay(), slack.clone(), irc.clone(), resolver, rx);
        runtime.run().await.expect("runtime should finish cleanly");

        assert_eq!(
            irc.says.lock().as_slice(),
            &[(
                "#linked-general".to_string(),
                vec!["<alice> hello".to_string()]
            )]
        );
        assert_eq!(
            slack.posts.lock().as_slice(),
            &[(
                "#general".to_string(),
                "bob".to_string(),
                "*back soon*".to_string()
            )]
        );
    }
}
