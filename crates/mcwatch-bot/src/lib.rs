//! mcwatch Telegram bot: population watch task plus command long-polling.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use mcwatch_core::config::{Config, paths};
use mcwatch_core::notifier::ThresholdNotifier;
use mcwatch_core::ping::{PingSource, ServerAddress};
use mcwatch_core::resolver::StatusResolver;
use tokio_util::sync::CancellationToken;

use crate::context::BotContext;
use crate::sink::ChannelSink;
use crate::telegram::{TelegramClient, TelegramSettings};

mod commands;
mod context;
mod handlers;
mod sink;
pub mod telegram;

pub async fn run() -> Result<()> {
    if Config::write_template_if_missing()? {
        tracing::info!(
            "Wrote default config to {}; fill it in and restart",
            paths::config_path().display()
        );
    }

    let config = Config::load()?;
    ensure!(config.watch.threshold >= 1, "watch.threshold must be at least 1");
    ensure!(
        config.watch.poll_interval_secs >= 1,
        "watch.poll_interval_secs must be at least 1"
    );
    let settings = TelegramSettings::from_config(&config)?;
    let address = ServerAddress::parse(&config.server.address)
        .context("server.address must be set in config.toml")?;
    run_bot(config, settings, address).await
}

async fn run_bot(
    config: Config,
    settings: TelegramSettings,
    address: ServerAddress,
) -> Result<()> {
    let client = TelegramClient::new(settings.bot_token).with_api_base(settings.api_base);

    // Best-effort, like the rest of the Telegram surface: a failed
    // registration still leaves the commands usable by typing them.
    if let Err(err) = client
        .set_my_commands(commands::telegram_command_specs())
        .await
    {
        tracing::warn!("Failed to register commands: {err:#}");
    }

    let source = PingSource::new(address.clone(), config.ping_timeout());
    let sink = ChannelSink::new(
        client.clone(),
        settings.channel_chat_id,
        address.to_string(),
    );
    let notifier = ThresholdNotifier::new(source.clone(), sink, config.watch.threshold);

    let cancel = CancellationToken::new();
    let watch_handle = tokio::spawn(notifier.run(config.poll_interval(), cancel.clone()));

    let context = Arc::new(BotContext::new(
        client.clone(),
        StatusResolver::new(source, address.to_string()),
    ));

    let mut offset: Option<i64> = None;
    let poll_timeout = Duration::from_secs(30);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(
        "mcwatch-bot started. Watching {address} (threshold {}). Polling for updates...",
        config.watch.threshold
    );

    loop {
        let current_offset = offset;
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down.");
                break;
            }
            updates = client.get_updates(current_offset, poll_timeout) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        tracing::warn!("Telegram polling error: {err:#}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = update.message {
                        // Each command runs on its own task so a slow query
                        // never blocks the update loop or the watch task.
                        let context = Arc::clone(&context);
                        tokio::spawn(async move {
                            if let Err(err) = handlers::handle_message(context.as_ref(), message).await {
                                tracing::warn!("Message handling error: {err:#}");
                            }
                        });
                    }
                }
            }
        }
    }

    cancel.cancel();
    let _ = watch_handle.await;
    Ok(())
}
