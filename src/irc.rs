use std::collections::HashMap;

use ::irc::client::Client;
use ::irc::client::Sender;
use ::irc::proto::{Command, Message, Response};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::IrcConfig;
use crate::relay::{InboundEvent, IrcSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    Registered,
    Message {
        nick: String,
        channel: String,
        text: String,
    },
    Notice {
        nick: String,
        channel: String,
        text: String,
    },
    Action {
        nick: String,
        channel: String,
        text: String,
    },
    Join {
        nick: String,
        channel: String,
    },
    Invite {
        nick: String,
        channel: String,
    },
    Names {
        channel: String,
        names: Vec<String>,
    },
    Error {
        message: String,
    },
}

pub struct IrcHandle {
    sender: Sender,
}

pub async fn connect(
    config: &IrcConfig,
    events: mpsc::Sender<InboundEvent>,
) -> Result<IrcHandle> {
    let irc_config = ::irc::client::prelude::Config {
        nickname: Some(config.nickname.clone()),
        username: config.username.clone(),
        realname: config.realname.clone(),
        server: Some(config.server.clone()),
        port: Some(config.port),
        use_tls: Some(config.use_tls),
        password: config
            .password
            .as_ref()
            .map(|password| password.expose_secret().to_string()),
        ..Default::default()
    };

    let client = Client::from_config(irc_config)
        .await
        .with_context(|| format!("failed to connect to irc server {}", config.server))?;
    client.identify().context("irc registration failed")?;
    info!("irc connecting to {} as {}", config.server, config.nickname);

    let sender = client.sender();
    tokio::spawn(async move {
        if let Err(err) = drive(client, events).await {
            error!("irc connection task ended: {err}");
        }
    });

    Ok(IrcHandle { sender })
}

async fn drive(mut client: Client, events: mpsc::Sender<InboundEvent>) -> Result<()> {
    let mut stream = client.stream()?;
    let mut translator = IrcEventTranslator::default();
    while let Some(message) = stream.next().await.transpose()? {
        if let Some(event) = translator.translate(&message) {
            if events.send(InboundEvent::Irc(event)).await.is_err() {
                break;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl IrcSink for IrcHandle {
    async fn say(&self, channel: &str, lines: &[String]) -> Result<()> {
        for line in lines {
            self.sender
                .send(Command::PRIVMSG(channel.to_string(), line.clone()))?;
        }
        Ok(())
    }

    async fn send_raw(&self, command: &str, args: &[String]) -> Result<()> {
        self.sender
            .send(Command::Raw(command.to_string(), args.to_vec()))?;
        Ok(())
    }

    async fn join(&self, channel: &str, key: Option<&str>) -> Result<()> {
        self.sender.send(Command::JOIN(
            channel.to_string(),
            key.map(ToOwned::to_owned),
            None,
        ))?;
        Ok(())
    }
}

// Stateful only for NAMES replies, which arrive as any number of 353 lines
// terminated by a 366.
#[derive(Debug, Default)]
pub struct IrcEventTranslator {
    names: HashMap<String, Vec<String>>,
}

impl IrcEventTranslator {
    pub fn translate(&mut self, message: &Message) -> Option<IrcEvent> {
        let nick = message.source_nickname().map(ToOwned::to_owned);
        match &message.command {
            Command::Response(Response::RPL_WELCOME, _) => Some(IrcEvent::Registered),
            Command::PRIVMSG(target, text) => {
                let nick = nick?;
                match ctcp_action(text) {
                    Some(action) => Some(IrcEvent::Action {
                        nick,
                        channel: target.clone(),
                        text: action.to_string(),
                    }),
                    None => Some(IrcEvent::Message {
                        nick,
                        channel: target.clone(),
                        text: text.clone(),
                    }),
                }
            }
            Command::NOTICE(target, text) => Some(IrcEvent::Notice {
                nick: nick?,
                channel: target.clone(),
                text: text.clone(),
            }),
            Command::JOIN(chanlist, _, _) => Some(IrcEvent::Join {
                nick: nick?,
                channel: chanlist.clone(),
            }),
            Command::INVITE(_, channel) => Some(IrcEvent::Invite {
                nick: nick?,
                channel: channel.clone(),
            }),
            Command::Response(Response::RPL_NAMREPLY, args) => {
                // [us, visibility symbol, channel, space-separated names]
                if args.len() >= 4 {
                    let channel = args[2].to_lowercase();
                    let names = args[3]
                        .split_whitespace()
                        .map(|name| name.trim_start_matches(['@', '+', '%', '&', '~']))
                        .map(ToOwned::to_owned);
                    self.names.entry(channel).or_default().extend(names);
                }
                None
            }
            Command::Response(Response::RPL_ENDOFNAMES, args) => {
                let channel = args.get(1)?.clone();
                let names = self.names.remove(&channel.to_lowercase()).unwrap_or_default();
                Some(IrcEvent::Names { channel, names })
            }
            Command::ERROR(reason) => Some(IrcEvent::Error {
                message: reason.clone(),
            }),
            _ => None,
        }
    }
}

fn ctcp_action(text: &str) -> Option<&str> {
    let body = text.strip_prefix('\u{1}')?;
    let body = body.strip_suffix('\u{1}').unwrap_or(body);
    body.strip_prefix("ACTION ")
}
