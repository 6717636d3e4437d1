//! Per-message handling: parse a command, resolve the view, reply.

use anyhow::Result;
use mcwatch_core::resolver::StatusView;

use crate::commands::{self, BotCommand};
use crate::context::BotContext;
use crate::telegram::Message;

const SEEN_USAGE: &str = "Usage: /seen <player name>";

pub(crate) async fn handle_message(context: &BotContext, message: Message) -> Result<()> {
    // Other bots' messages are ignored to avoid reply loops.
    if message.from.as_ref().is_some_and(|user| user.is_bot) {
        return Ok(());
    }

    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let Some(command) = commands::parse_command(text) else {
        return Ok(());
    };

    tracing::debug!(chat = message.chat.id, ?command, "handling command");

    let view = match command {
        BotCommand::Status => StatusView::Summary,
        BotCommand::Players => StatusView::Roster,
        BotCommand::Seen {
            player: Some(player),
        } => StatusView::Membership { player },
        BotCommand::Seen { player: None } => {
            return context
                .client()
                .send_message(message.chat.id, SEEN_USAGE, Some(message.message_id))
                .await;
        }
    };

    let reply = context.resolver().render(view).await;
    if !reply.ok {
        tracing::warn!(chat = message.chat.id, "replying with unreachable notice");
    }

    context
        .client()
        .send_message(message.chat.id, &reply.text, Some(message.message_id))
        .await
}
