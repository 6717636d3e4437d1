//! Notification sink that posts session events to the configured chat.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcwatch_core::notifier::{NotificationSink, PopulationEvent};

use crate::telegram::TelegramClient;

pub(crate) struct ChannelSink {
    client: TelegramClient,
    chat_id: i64,
    address_label: String,
}

impl ChannelSink {
    pub(crate) fn new(client: TelegramClient, chat_id: i64, address_label: String) -> Self {
        Self {
            client,
            chat_id,
            address_label,
        }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn notify(&self, event: &PopulationEvent) -> Result<()> {
        let text = render_event(event, &self.address_label, Utc::now());
        self.client.send_message(self.chat_id, &text, None).await
    }
}

fn render_event(event: &PopulationEvent, address: &str, at: DateTime<Utc>) -> String {
    match event {
        PopulationEvent::Started(snapshot) => format!(
            "🔥 *Game on!* {online} players are on *{address}* — hop in before it fills up!\n🕐 {stamp} UTC",
            online = snapshot.online,
            stamp = at.format("%Y-%m-%d %H:%M"),
        ),
        PopulationEvent::Ended(_) => "💤 The session has ended. GG everyone!".to_string(),
    }
}
