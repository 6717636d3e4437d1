use mcwatch_core::ping::PingSource;
use mcwatch_core::resolver::StatusResolver;

use crate::telegram::TelegramClient;

pub(crate) struct BotContext {
    client: TelegramClient,
    resolver: StatusResolver<PingSource>,
}

impl BotContext {
    pub(crate) fn new(client: TelegramClient, resolver: StatusResolver<PingSource>) -> Self {
        Self { client, resolver }
    }

    pub(crate) fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub(crate) fn resolver(&self) -> &StatusResolver<PingSource> {
        &self.resolver
    }
}
