//! Packet framing for the Server List Ping exchange.
//!
//! Everything on the wire is `VarInt length ‖ VarInt packet-id ‖ payload`.
//! VarInts are little-endian groups of 7 bits, at most 5 bytes, with
//! negative values in two's complement (the handshake's protocol field
//! is -1 for a status-only client).

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// VarInts longer than this are malformed.
const MAX_VARINT_BYTES: u32 = 5;

/// Upper bound on a single packet body. Status responses carry the full
/// JSON payload including an optional base64 favicon.
const MAX_PACKET_BYTES: usize = 2 * 1024 * 1024;

/// Appends `value` to `out` as a VarInt.
pub fn put_varint(out: &mut Vec<u8>, value: i32) {
    let mut raw = value as u32;
    loop {
        let byte = (raw & 0x7f) as u8;
        raw >>= 7;
        if raw == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Appends a length-prefixed UTF-8 string to `out`.
pub fn put_string(out: &mut Vec<u8>, value: &str) {
    put_varint(out, value.len() as i32);
    out.extend_from_slice(value.as_bytes());
}

/// Reads one VarInt from the stream.
pub async fn read_varint<R>(reader: &mut R) -> Result<i32>
where
    R: AsyncRead + Unpin,
{
    let mut raw: u32 = 0;
    for group in 0..MAX_VARINT_BYTES {
        let byte = reader
            .read_u8()
            .await
            .context("Connection closed mid-VarInt")?;
        raw |= u32::from(byte & 0x7f) << (7 * group);
        if byte & 0x80 == 0 {
            return Ok(raw as i32);
        }
    }
    bail!("VarInt exceeds {} bytes", MAX_VARINT_BYTES)
}

/// Reads one length-prefixed UTF-8 string from the stream.
pub async fn read_string<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let length = read_varint(reader).await.context("Missing string length")?;
    if length < 0 {
        bail!("Negative string length {length}");
    }
    let length = length as usize;
    if length > MAX_PACKET_BYTES {
        bail!("String length {length} exceeds packet cap");
    }
    let mut bytes = vec![0u8; length];
    reader
        .read_exact(&mut bytes)
        .await
        .context("Connection closed mid-string")?;
    String::from_utf8(bytes).context("String is not valid UTF-8")
}

/// Frames a packet id + body with the outer length prefix.
pub fn frame_packet(id: i32, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(body.len() + 1);
    put_varint(&mut payload, id);
    payload.extend_from_slice(body);

    let mut packet = Vec::with_capacity(payload.len() + 5);
    put_varint(&mut packet, payload.len() as i32);
    packet.extend_from_slice(&payload);
    packet
}

/// Writes a framed packet to the stream.
pub async fn write_packet<W>(writer: &mut W, id: i32, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame_packet(id, body))
        .await
        .context("Failed to write packet")?;
    writer.flush().await.context("Failed to flush packet")?;
    Ok(())
}

/// Reads one framed packet, returning its id and body.
pub async fn read_packet<R>(reader: &mut R) -> Result<(i32, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    let length = read_varint(reader).await.context("Missing packet length")?;
    if length < 0 {
        bail!("Negative packet length {length}");
    }
    let length = length as usize;
    if length > MAX_PACKET_BYTES {
        bail!("Packet length {length} exceeds cap");
    }

    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .await
        .context("Connection closed mid-packet")?;

    let mut cursor = std::io::Cursor::new(payload);
    let id = read_varint(&mut cursor).await.context("Missing packet id")?;
    let consumed = cursor.position() as usize;
    let mut body = cursor.into_inner();
    body.drain(..consumed);
    Ok((id, body))
}
