//! Status query resolver.
//!
//! Each render call takes one fresh snapshot and maps it into the requested
//! view. No caching and no shared state: concurrent calls are fully
//! independent, and an unreachable server becomes a fixed failure reply for
//! that call only.

use crate::ping::{StatusSnapshot, StatusSource};

/// Fixed reply text when the status query fails.
pub const UNREACHABLE_REPLY: &str =
    "❌ The server might be offline or unreachable. Try again later.";

const NO_MOTD_PLACEHOLDER: &str = "No MOTD";
const NO_PLAYERS_PLACEHOLDER: &str = "No players online";

/// Requested shape of a status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusView {
    /// Full summary: population, version, MOTD, roster.
    Summary,
    /// Player-name list only.
    Roster,
    /// Is this exact name in the sample right now?
    Membership { player: String },
}

/// A rendered reply, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// False when the upstream query failed and `text` is the fixed
    /// unreachable message.
    pub ok: bool,
}

/// Resolves status views against a snapshot source.
pub struct StatusResolver<S> {
    source: S,
    address_label: String,
}

impl<S> StatusResolver<S>
where
    S: StatusSource,
{
    pub fn new(source: S, address_label: impl Into<String>) -> Self {
        Self {
            source,
            address_label: address_label.into(),
        }
    }

    /// Renders one view from one fresh snapshot.
    pub async fn render(&self, view: StatusView) -> Reply {
        let snapshot = match self.source.query().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("status query failed: {err:#}");
                return Reply {
                    text: UNREACHABLE_REPLY.to_string(),
                    ok: false,
                };
            }
        };

        let text = match view {
            StatusView::Summary => render_summary(&self.address_label, &snapshot),
            StatusView::Roster => render_roster(&snapshot),
            StatusView::Membership { player } => render_membership(&snapshot, &player),
        };
        Reply { text, ok: true }
    }
}

fn render_summary(address: &str, snapshot: &StatusSnapshot) -> String {
    let motd = if snapshot.motd_clean.is_empty() {
        NO_MOTD_PLACEHOLDER
    } else {
        snapshot.motd_clean.as_str()
    };

    format!(
        "🎮 {address}\n👥 Players: {online}/{max}\n🧩 Version: {version}\n💬 MOTD: {motd}\n📜 Online:\n{roster}",
        online = snapshot.online,
        max = snapshot.max,
        version = snapshot.version_name,
        roster = roster_lines(snapshot),
    )
}

fn render_roster(snapshot: &StatusSnapshot) -> String {
    format!("📜 Online:\n{}", roster_lines(snapshot))
}

fn render_membership(snapshot: &StatusSnapshot, player: &str) -> String {
    if snapshot.has_player(player) {
        format!("✅ {player} is online.")
    } else {
        format!("💤 {player} is not online right now.")
    }
}

/// An absent sample and an empty sample render alike for display; only
/// membership checks care about the difference upstream.
fn roster_lines(snapshot: &StatusSnapshot) -> String {
    match snapshot.sample.as_deref() {
        Some(sample) if !sample.is_empty() => sample
            .iter()
            .map(|player| format!("• {}", player.name))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => NO_PLAYERS_PLACEHOLDER.to_string(),
    }
}
