//! Minimal Telegram Bot API client: long-poll updates, send messages,
//! register the command list.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use mcwatch_core::config::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod types;

pub use types::{Chat, Message, Update, User};

pub use crate::commands::TelegramCommandSpec;

const TELEGRAM_PARSE_MODE: &str = "Markdown";

pub struct TelegramSettings {
    pub bot_token: String,
    pub api_base: String,
    pub channel_chat_id: i64,
}

impl TelegramSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .telegram
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var("MCWATCH_TELEGRAM_BOT_TOKEN")
                    .ok()
                    .map(|token| token.trim().to_string())
                    .filter(|token| !token.is_empty())
            })
            .unwrap_or_default();
        if token.is_empty() {
            bail!("telegram.bot_token or MCWATCH_TELEGRAM_BOT_TOKEN is required");
        }

        if config.telegram.channel_chat_id == 0 {
            bail!("telegram.channel_chat_id must be set to the notification chat");
        }

        Ok(Self {
            bot_token: token,
            api_base: config.telegram.api_base.clone(),
            channel_chat_id: config.telegram.channel_chat_id,
        })
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token,
        }
    }

    /// Points the client at a different API base (tests, proxies).
    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: Some(vec!["message"]),
        };
        self.post("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id,
            allow_sending_without_reply: Some(true),
            parse_mode: Some(TELEGRAM_PARSE_MODE),
        };
        let _: Message = self.post("sendMessage", &request).await?;
        Ok(())
    }

    /// Registers the command list shown in the Telegram client UI.
    pub async fn set_my_commands(&self, specs: &[TelegramCommandSpec]) -> Result<()> {
        let request = SetMyCommandsRequest {
            commands: specs
                .iter()
                .map(|spec| BotCommandBody {
                    command: spec.command,
                    description: spec.description,
                })
                .collect(),
        };
        let _: bool = self.post("setMyCommands", &request).await?;
        Ok(())
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, method: &str, body: &B) -> Result<T> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|_| anyhow!("Telegram request failed"))?;

        let payload: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|_| anyhow!("Failed to decode Telegram response"))?;

        if !payload.ok {
            let description = payload
                .description
                .unwrap_or_else(|| "Telegram API error".to_string());
            bail!("{}", description);
        }

        payload
            .result
            .ok_or_else(|| anyhow!("Telegram response missing result"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_updates: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_sending_without_reply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SetMyCommandsRequest {
    commands: Vec<BotCommandBody>,
}

#[derive(Debug, Serialize)]
struct BotCommandBody {
    command: &'static str,
    description: &'static str,
}
