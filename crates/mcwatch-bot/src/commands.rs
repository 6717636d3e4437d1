//! The bot's command surface: `/status`, `/players`, `/seen <name>`.

/// A parsed command, arguments included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BotCommand {
    /// Full server summary.
    Status,
    /// Online player list.
    Players,
    /// Membership check; `player` is None when the argument was omitted.
    Seen { player: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramCommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[TelegramCommandSpec] = &[
    TelegramCommandSpec {
        command: "status",
        description: "Current server status",
    },
    TelegramCommandSpec {
        command: "players",
        description: "Who is online right now",
    },
    TelegramCommandSpec {
        command: "seen",
        description: "Check if a player is online: /seen <name>",
    },
];

pub(crate) fn telegram_command_specs() -> &'static [TelegramCommandSpec] {
    COMMAND_SPECS
}

/// Parses `/command`, `/command@bot`, and the `/seen` argument form.
/// Non-commands and unknown commands return None.
pub(crate) fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    let name = command_name(head)?;

    match name {
        "status" if rest.is_empty() => Some(BotCommand::Status),
        "players" if rest.is_empty() => Some(BotCommand::Players),
        // Player names never contain whitespace; anything past the first
        // token is ignored.
        "seen" => Some(BotCommand::Seen {
            player: rest.split_whitespace().next().map(str::to_string),
        }),
        _ => None,
    }
}

/// "/status@some_bot" -> "status". Anything not starting with '/' is not
/// a command.
fn command_name(head: &str) -> Option<&str> {
    let without_slash = head.strip_prefix('/')?;
    let name = without_slash
        .split_once('@')
        .map_or(without_slash, |(name, _)| name);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{BotCommand, parse_command, telegram_command_specs};

    #[test]
    fn parse_zero_argument_commands() {
        assert_eq!(parse_command("/status"), Some(BotCommand::Status));
        assert_eq!(parse_command(" /status "), Some(BotCommand::Status));
        assert_eq!(parse_command("/players"), Some(BotCommand::Players));
        assert_eq!(
            parse_command("/status@mcwatch_bot"),
            Some(BotCommand::Status)
        );
        assert_eq!(
            parse_command("/players@mcwatch_bot"),
            Some(BotCommand::Players)
        );
    }

    #[test]
    fn zero_argument_commands_reject_trailing_text() {
        assert_eq!(parse_command("/status please"), None);
        assert_eq!(parse_command("/players now"), None);
    }

    #[test]
    fn parse_seen_with_argument() {
        assert_eq!(
            parse_command("/seen Steve"),
            Some(BotCommand::Seen {
                player: Some("Steve".to_string())
            })
        );
        assert_eq!(
            parse_command("/seen@mcwatch_bot Steve"),
            Some(BotCommand::Seen {
                player: Some("Steve".to_string())
            })
        );
        // Extra tokens after the name are ignored.
        assert_eq!(
            parse_command("/seen Steve today"),
            Some(BotCommand::Seen {
                player: Some("Steve".to_string())
            })
        );
    }

    #[test]
    fn seen_without_argument_still_parses() {
        assert_eq!(parse_command("/seen"), Some(BotCommand::Seen { player: None }));
        assert_eq!(
            parse_command("/seen@mcwatch_bot"),
            Some(BotCommand::Seen { player: None })
        );
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/uptime"), None);
        assert_eq!(parse_command("status"), None);
    }

    #[test]
    fn telegram_command_specs_are_unique_and_non_empty() {
        let specs = telegram_command_specs();
        assert!(!specs.is_empty());

        let mut names = HashSet::new();
        for spec in specs {
            assert!(!spec.command.trim().is_empty());
            assert!(!spec.description.trim().is_empty());
            assert!(names.insert(spec.command));
        }
    }
}
