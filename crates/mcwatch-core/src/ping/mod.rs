//! Server List Ping accessor.
//!
//! One synchronous-looking exchange per call: connect, handshake, status
//! request, decode the JSON response into a [`StatusSnapshot`]. No retry —
//! callers decide what a failed query means. The whole exchange runs under
//! an explicit deadline so a hung server cannot stall the caller.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpStream;

mod wire;

const DEFAULT_PORT: u16 = 25565;

/// Handshake/status packets both use id 0.
const PACKET_ID_STATUS: i32 = 0x00;

/// Protocol number sent in the handshake; -1 means "status only".
const PROTOCOL_STATUS_ONLY: i32 = -1;

/// Handshake next-state field selecting the status flow.
const NEXT_STATE_STATUS: i32 = 1;

/// Section-sign formatting prefix in MOTD text.
const FORMATTING_PREFIX: char = '§';

/// A watched server's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Parses "host" or "host:port"; the port defaults to 25565.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            bail!("Server address must not be empty");
        }

        match trimmed.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    bail!("Server address {trimmed:?} has no host");
                }
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port in server address {trimmed:?}"))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self {
                host: trimmed.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_PORT {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One player entry from the status sample.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerRef {
    pub name: String,
}

/// One point-in-time read of the server's population and status.
///
/// `sample: None` means the server omitted the sample field entirely,
/// which is distinct from reporting an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub online: u32,
    pub max: u32,
    pub version_name: String,
    /// MOTD with § formatting codes intact.
    pub motd: String,
    /// MOTD with § formatting codes stripped.
    pub motd_clean: String,
    pub sample: Option<Vec<PlayerRef>>,
}

impl StatusSnapshot {
    /// Case-sensitive exact membership check against the sample.
    ///
    /// An absent sample answers false: the server reported nothing, so
    /// nobody can be confirmed present.
    pub fn has_player(&self, name: &str) -> bool {
        self.sample
            .as_deref()
            .is_some_and(|sample| sample.iter().any(|player| player.name == name))
    }
}

/// Source of status snapshots. The seam between the network accessor and
/// the notifier/resolver, so tests can script responses.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn query(&self) -> Result<StatusSnapshot>;
}

/// The real accessor: one Server List Ping per query.
#[derive(Debug, Clone)]
pub struct PingSource {
    address: ServerAddress,
    timeout: Duration,
}

impl PingSource {
    pub fn new(address: ServerAddress, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }
}

#[async_trait]
impl StatusSource for PingSource {
    async fn query(&self) -> Result<StatusSnapshot> {
        query(&self.address, self.timeout).await
    }
}

/// Performs one status query against `address`, bounded by `deadline`.
pub async fn query(address: &ServerAddress, deadline: Duration) -> Result<StatusSnapshot> {
    tokio::time::timeout(deadline, exchange(address))
        .await
        .map_err(|_| anyhow!("Status query to {address} timed out"))?
}

async fn exchange(address: &ServerAddress) -> Result<StatusSnapshot> {
    let mut stream = TcpStream::connect((address.host.as_str(), address.port))
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;

    let mut handshake = Vec::new();
    wire::put_varint(&mut handshake, PROTOCOL_STATUS_ONLY);
    wire::put_string(&mut handshake, &address.host);
    handshake.extend_from_slice(&address.port.to_be_bytes());
    wire::put_varint(&mut handshake, NEXT_STATE_STATUS);
    wire::write_packet(&mut stream, PACKET_ID_STATUS, &handshake).await?;

    wire::write_packet(&mut stream, PACKET_ID_STATUS, &[]).await?;

    let (id, body) = wire::read_packet(&mut stream).await?;
    if id != PACKET_ID_STATUS {
        bail!("Unexpected packet id {id:#04x} in status response");
    }
    let json = wire::read_string(&mut std::io::Cursor::new(body)).await?;
    decode_status(&json)
}

/// Decodes the status response JSON into a snapshot.
pub(crate) fn decode_status(json: &str) -> Result<StatusSnapshot> {
    let raw: RawStatus = serde_json::from_str(json).context("Malformed status response JSON")?;

    let motd = raw
        .description
        .map(|description| description.flatten())
        .unwrap_or_default();
    let motd_clean = strip_formatting(&motd);

    Ok(StatusSnapshot {
        online: raw.players.online,
        max: raw.players.max,
        version_name: raw.version.name,
        motd,
        motd_clean,
        sample: raw.players.sample,
    })
}

/// Removes § formatting sequences (the sign plus its one-char code).
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == FORMATTING_PREFIX {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    version: RawVersion,
    players: RawPlayers,
    #[serde(default)]
    description: Option<Description>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    online: u32,
    max: u32,
    #[serde(default)]
    sample: Option<Vec<PlayerRef>>,
}

/// The MOTD arrives either as a bare string or as a chat component tree.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Plain(String),
    Component(Component),
}

impl Description {
    fn flatten(self) -> String {
        match self {
            Description::Plain(text) => text,
            Description::Component(component) => {
                let mut out = String::new();
                component.collect_into(&mut out);
                out
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Component {
    #[serde(default)]
    text: String,
    #[serde(default)]
    extra: Vec<Component>,
}

impl Component {
    fn collect_into(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.extra {
            child.collect_into(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_without_port_uses_default() {
        let address = ServerAddress::parse("mc.example.net").unwrap();
        assert_eq!(address.host, "mc.example.net");
        assert_eq!(address.port, 25565);
        assert_eq!(address.to_string(), "mc.example.net");
    }

    #[test]
    fn address_with_port() {
        let address = ServerAddress::parse("mc.example.net:25566").unwrap();
        assert_eq!(address.port, 25566);
        assert_eq!(address.to_string(), "mc.example.net:25566");
    }

    #[test]
    fn bad_addresses_are_rejected() {
        assert!(ServerAddress::parse("").is_err());
        assert!(ServerAddress::parse("   ").is_err());
        assert!(ServerAddress::parse(":25565").is_err());
        assert!(ServerAddress::parse("mc.example.net:http").is_err());
        assert!(ServerAddress::parse("mc.example.net:70000").is_err());
    }

    #[test]
    fn decodes_plain_description() {
        let snapshot = decode_status(
            r#"{"version":{"name":"1.20.4","protocol":765},
                "players":{"online":3,"max":100,
                    "sample":[{"name":"Alex","id":"00000000-0000-0000-0000-000000000001"}]},
                "description":"§aHello §lworld"}"#,
        )
        .unwrap();

        assert_eq!(snapshot.online, 3);
        assert_eq!(snapshot.max, 100);
        assert_eq!(snapshot.version_name, "1.20.4");
        assert_eq!(snapshot.motd, "§aHello §lworld");
        assert_eq!(snapshot.motd_clean, "Hello world");
        assert_eq!(snapshot.sample.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn decodes_component_description() {
        let snapshot = decode_status(
            r#"{"version":{"name":"Paper 1.21"},
                "players":{"online":0,"max":64},
                "description":{"text":"Welcome ","extra":[{"text":"to "},{"text":"the server","extra":[{"text":"!"}]}]}}"#,
        )
        .unwrap();

        assert_eq!(snapshot.motd_clean, "Welcome to the server!");
        assert!(snapshot.sample.is_none());
    }

    #[test]
    fn missing_description_yields_empty_motd() {
        let snapshot = decode_status(
            r#"{"version":{"name":"1.8.9"},"players":{"online":0,"max":20}}"#,
        )
        .unwrap();
        assert!(snapshot.motd.is_empty());
        assert!(snapshot.motd_clean.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode_status("not json").is_err());
        assert!(decode_status(r#"{"players":{"online":1,"max":2}}"#).is_err());
    }

    #[test]
    fn membership_is_exact_and_absence_safe() {
        let mut snapshot = decode_status(
            r#"{"version":{"name":"1.20"},
                "players":{"online":1,"max":10,"sample":[{"name":"Steve"}]}}"#,
        )
        .unwrap();

        assert!(snapshot.has_player("Steve"));
        assert!(!snapshot.has_player("steve"));
        assert!(!snapshot.has_player("Alex"));

        snapshot.sample = Some(Vec::new());
        assert!(!snapshot.has_player("Steve"));

        snapshot.sample = None;
        assert!(!snapshot.has_player("Steve"));
    }

    #[test]
    fn formatting_strip_handles_trailing_sign() {
        assert_eq!(strip_formatting("plain"), "plain");
        assert_eq!(strip_formatting("§"), "");
        assert_eq!(strip_formatting("a§xb§"), "ab");
    }
}
