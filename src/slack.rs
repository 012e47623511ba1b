use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::config::SlackConfig;
use crate::relay::{InboundEvent, SlackSink};
use crate::transform::EntityResolver;

const API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackEvent {
    Hello,
    Message {
        channel: String,
        user: String,
        text: String,
        subtype: Option<String>,
    },
    Goodbye,
    Error {
        code: i64,
        message: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackIdentity {
    pub id: String,
    pub name: String,
}

// RTM websocket for inbound events, web API for outbound sends, id-to-name
// caches backing the EntityResolver.
pub struct SlackClient {
    http: reqwest::Client,
    token: SecretString,
    users: RwLock<HashMap<String, String>>,
    channels: RwLock<HashMap<String, String>>,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: config.token.clone(),
            users: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn connect(
        self: &Arc<Self>,
        events: mpsc::Sender<InboundEvent>,
    ) -> Result<SlackIdentity> {
        let response: RtmConnectResponse = self.call_form("rtm.connect", &[]).await?;
        if !response.ok {
            return Err(anyhow!(
                "rtm.connect failed: {}",
                response.error.unwrap_or_default()
            ));
        }
        let url = response
            .url
            .ok_or_else(|| anyhow!("rtm.connect response is missing the socket url"))?;
        let identity = response
            .identity
            .ok_or_else(|| anyhow!("rtm.connect response is missing our identity"))?;

        self.load_directory().await?;

        let (socket, _) = connect_async(url.as_str())
            .await
            .context("failed to open slack rtm socket")?;
        info!("slack rtm connected as {} ({})", identity.name, identity.id);

        let client = self.clone();
        tokio::spawn(async move {
            client.read_socket(socket, events).await;
        });

        Ok(identity)
    }

    async fn read_socket(
        self: Arc<Self>,
        socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
        events: mpsc::Sender<InboundEvent>,
    ) {
        let (mut write, mut read) = socket.split();
        while let Some(frame) = read.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    let value: Value = match serde_json::from_str(&text) {
                        Ok(value) => value,
                        Err(err) => {
                            debug!("discarding unparseable rtm frame: {err}");
                            continue;
                        }
                    };
                    self.absorb_directory_event(&value);
                    if let Some(event) = parse_rtm_event(&value) {
                        if events.send(InboundEvent::Slack(event)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(WsMessage::Ping(payload)) => {
                    let _ = write.send(WsMessage::Pong(payload)).await;
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    error!("slack socket error: {err}");
                    break;
                }
            }
        }
        let _ = events.send(InboundEvent::Slack(SlackEvent::Goodbye)).await;
    }

    async fn load_directory(&self) -> Result<()> {
        let mut cursor = String::new();
        loop {
            let mut params = vec![("limit", "200".to_string())];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }
            let response: UsersListResponse = self.call_form("users.list", &params).await?;
            if !response.ok {
                return Err(anyhow!(
                    "users.list failed: {}",
                    response.error.unwrap_or_default()
                ));
            }
            cursor = response.next_cursor();
            {
                let mut users = self.users.write();
                for member in response.members {
                    let display_name = member.display_name();
                    users.insert(member.id, display_name);
                }
            }
            if cursor.is_empty() {
                break;
            }
        }

        let mut cursor = String::new();
        loop {
            let mut params = vec![
                ("limit", "200".to_string()),
                ("types", "public_channel,private_channel".to_string()),
            ];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }
            let response: ConversationsListResponse =
                self.call_form("conversations.list", &params).await?;
            if !response.ok {
                return Err(anyhow!(
                    "conversations.list failed: {}",
                    response.error.unwrap_or_default()
                ));
            }
            cursor = response.next_cursor();
            {
                let mut channels = self.channels.write();
                for channel in response.channels {
                    channels.insert(channel.id, channel.name);
                }
            }
            if cursor.is_empty() {
                break;
            }
        }

        info!(
            "slack directory loaded: {} users, {} channels",
            self.users.read().len(),
            self.channels.read().len()
        );
        Ok(())
    }

    // Directory-change frames keep the caches fresh; they never reach the
    // relay dispatcher.
    fn absorb_directory_event(&self, value: &Value) {
        match value.get("type").and_then(Value::as_str) {
            Some("user_change") | Some("team_join") => {
                let Some(user) = value.get("user") else {
                    return;
                };
                let (Some(id), Some(name)) = (
                    user.get("id").and_then(Value::as_str),
                    preferred_user_name(user),
                ) else {
                    return;
                };
                self.users.write().insert(id.to_string(), name);
            }
            Some("channel_created") | Some("channel_rename") => {
                let Some(channel) = value.get("channel") else {
                    return;
                };
                let (Some(id), Some(name)) = (
                    channel.get("id").and_then(Value::as_str),
                    channel.get("name").and_then(Value::as_str),
                ) else {
                    return;
                };
                self.channels
                    .write()
                    .insert(id.to_string(), name.to_string());
            }
            _ => {}
        }
    }

    async fn call_form<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{API_BASE}/{method}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .form(params)
            .send()
            .await
            .with_context(|| format!("slack api call {method} failed"))?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("slack api {method} returned an unexpected body"))
    }
}

#[async_trait]
impl SlackSink for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        username: &str,
        icon_url: Option<&str>,
        text: &str,
    ) -> Result<()> {
        let body = message_body(channel, username, icon_url, text);
        let response = self
            .http
            .post(format!("{API_BASE}/chat.postMessage"))
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .context("chat.postMessage request failed")?;
        let envelope: ApiEnvelope = response
            .json()
            .await
            .context("chat.postMessage returned an unexpected body")?;
        if !envelope.ok {
            warn!(
                "chat.postMessage to {channel} rejected: {}",
                envelope.error.clone().unwrap_or_default()
            );
            return Err(anyhow!(
                "chat.postMessage failed: {}",
                envelope.error.unwrap_or_default()
            ));
        }
        Ok(())
    }
}

impl EntityResolver for SlackClient {
    fn channel_name(&self, id: &str) -> Option<String> {
        self.channels.read().get(id).cloned()
    }

    fn user_name(&self, id: &str) -> Option<String> {
        self.users.read().get(id).cloned()
    }
}

pub fn parse_rtm_event(value: &Value) -> Option<SlackEvent> {
    match value.get("type").and_then(Value::as_str)? {
        "hello" => Some(SlackEvent::Hello),
        "goodbye" => Some(SlackEvent::Goodbye),
        "message" => {
            let channel = value.get("channel")?.as_str()?.to_string();
            let user = value.get("user")?.as_str()?.to_string();
            let text = value.get("text")?.as_str()?.to_string();
            let subtype = value
                .get("subtype")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);
            Some(SlackEvent::Message {
                channel,
                user,
                text,
                subtype,
            })
        }
        "error" => {
            let code = value
                .pointer("/error/code")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let message = value
                .pointer("/error/msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(SlackEvent::Error { code, message })
        }
        _ => None,
    }
}

// "parse": "full" asks Slack to linkify channel and user mentions in the
// forwarded text instead of rendering them as plain words.
fn message_body(channel: &str, username: &str, icon_url: Option<&str>, text: &str) -> Value {
    let mut body = serde_json::json!({
        "channel": channel,
        "text": text,
        "username": username,
        "parse": "full",
    });
    if let Some(icon) = icon_url {
        body["icon_url"] = Value::String(icon.to_string());
    }
    body
}

fn preferred_user_name(user: &Value) -> Option<String> {
    let display_name = user
        .pointer("/profile/display_name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    display_name
        .or_else(|| user.get("name").and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RtmConnectResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "self", default)]
    identity: Option<SlackIdentity>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<UserEntry>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

impl UsersListResponse {
    fn next_cursor(&self) -> String {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    profile: Option<UserProfile>,
}

impl UserEntry {
    fn display_name(&self) -> String {
        self.profile
            .as_ref()
            .map(|profile| profile.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<ChannelEntry>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

impl ConversationsListResponse {
    fn next_cursor(&self) -> String {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    id: String,
    name: String,
}
