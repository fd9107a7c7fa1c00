//! Console wire protocol and transport-facing messages.
//!
//! The transport itself lives outside this crate. It hands received packets
//! over as [`NetIncoming`] messages, takes packets to send as [`NetOutgoing`]
//! messages, and reports connection changes as [`LinkEvent`]s.
//!
//! Payloads are immutable [`Bytes`]. Every consumer reads through its own
//! [`PacketReader`], so no consumer can move another one's read position.
//!
//! # Encoding
//!
//! - Byte 0 is the [`NetMessage`] tag.
//! - `u16` is little-endian.
//! - Strings are a 7-bit varint byte length followed by UTF-8.

use bevy::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Message tags relevant to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NetMessage {
    /// Chat line: `u8` channel, string text.
    ChatMessage = 0x0A,
    /// Client to server: raw command line.
    ConsoleCommand = 0x1E,
    /// Server to client: one line of command output.
    ConsoleCommandReply = 0x1F,
    /// Client to server: empty request for the command list.
    /// Server to client: `u16` count, then count (name, help, description).
    ConsoleCommandRegister = 0x20,
}

impl NetMessage {
    /// Decode a tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0A => Some(NetMessage::ChatMessage),
            0x1E => Some(NetMessage::ConsoleCommand),
            0x1F => Some(NetMessage::ConsoleCommandReply),
            0x20 => Some(NetMessage::ConsoleCommandRegister),
            _ => None,
        }
    }

    /// The tag byte.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Chat channel byte written after a [`NetMessage::ChatMessage`] tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChatChannel {
    /// Server announcements.
    Server = 0,
    /// Said by a player.
    Player = 1,
}

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub enum DeliveryMethod {
    /// Fire and forget.
    Unreliable,
    /// Delivered, in any order relative to other messages.
    #[default]
    ReliableUnordered,
    /// Delivered in send order.
    ReliableOrdered,
}

/// Delivery for forwarded lines, command list traffic and chat.
///
/// A lost list request would leave the client unsynced for the whole
/// connection, so these packets are never sent unreliably.
pub const CONSOLE_DELIVERY: DeliveryMethod = DeliveryMethod::ReliableUnordered;

/// Category of a received packet, as classified by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageCategory {
    /// Application payload.
    #[default]
    Data,
    /// Connection status notification.
    StatusChanged,
    /// Transport-level diagnostics.
    Diagnostic,
}

/// Identifier of a client connection, assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// The other end of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    /// The server (as seen from a client).
    Server,
    /// One client (as seen from the server).
    Client(ClientId),
}

/// A fully received packet.
///
/// Any number of systems may read the same message; each gets a fresh
/// [`PacketReader`] from [`NetIncoming::reader`].
#[derive(Message, Debug, Clone)]
pub struct NetIncoming {
    /// Who sent it.
    pub sender: Peer,
    /// Transport classification.
    pub category: MessageCategory,
    payload: Bytes,
}

impl NetIncoming {
    /// Create an incoming message.
    pub fn new(sender: Peer, category: MessageCategory, payload: impl Into<Bytes>) -> Self {
        Self {
            sender,
            category,
            payload: payload.into(),
        }
    }

    /// Create an application data message.
    pub fn data(sender: Peer, payload: impl Into<Bytes>) -> Self {
        Self::new(sender, MessageCategory::Data, payload)
    }

    /// The raw payload.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// A reader positioned at the start of the payload.
    #[inline]
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.payload)
    }
}

/// A packet for the transport to send.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct NetOutgoing {
    /// Destination.
    pub target: Peer,
    /// Requested delivery guarantee.
    pub delivery: DeliveryMethod,
    /// Encoded packet, tag first.
    pub payload: Bytes,
}

impl NetOutgoing {
    /// The tag of this packet, if it is one the console knows.
    pub fn tag(&self) -> Option<NetMessage> {
        self.payload.first().copied().and_then(NetMessage::from_byte)
    }

    /// A reader positioned at the start of the payload.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.payload)
    }
}

/// Connection state change reported by the transport.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The remote side became reachable.
    Connected,
    /// The remote side is gone.
    Disconnected,
}

/// Errors raised while decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes left than the field needs.
    #[error("truncated packet: needed {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    /// String length prefix does not fit in 32 bits.
    #[error("malformed length prefix at offset {0}")]
    BadLength(usize),
    /// String bytes are not UTF-8.
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

/// Builds one outgoing packet.
///
/// ```
/// use bevy_netconsole::core::{NetMessage, PacketBuilder};
///
/// let payload = PacketBuilder::new(NetMessage::ConsoleCommand)
///     .write_string("kick bob")
///     .finish();
/// assert_eq!(payload[0], NetMessage::ConsoleCommand.as_byte());
/// ```
#[derive(Debug)]
pub struct PacketBuilder {
    buf: BytesMut,
}

impl PacketBuilder {
    /// Start a packet with the given tag.
    pub fn new(tag: NetMessage) -> Self {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u8(tag.as_byte());
        Self { buf }
    }

    /// Append a byte.
    pub fn write_u8(mut self, value: u8) -> Self {
        self.buf.put_u8(value);
        self
    }

    /// Append a little-endian `u16`.
    pub fn write_u16(mut self, value: u16) -> Self {
        self.buf.put_u16_le(value);
        self
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn write_string(mut self, value: &str) -> Self {
        let mut len = value.len() as u64;
        loop {
            let byte = (len & 0x7F) as u8;
            len >>= 7;
            if len == 0 {
                self.buf.put_u8(byte);
                break;
            }
            self.buf.put_u8(byte | 0x80);
        }
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// Freeze into an immutable payload.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Freeze and address the packet.
    pub fn send_to(self, target: Peer, delivery: DeliveryMethod) -> NetOutgoing {
        NetOutgoing {
            target,
            delivery,
            payload: self.finish(),
        }
    }
}

/// A read cursor over one payload.
///
/// Cheap to create; take a new one instead of sharing one between consumers.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Create a reader at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Move back to offset 0.
    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < needed {
            return Err(ProtocolError::Truncated {
                offset: self.pos,
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Look at the next byte as a tag without consuming it.
    pub fn peek_tag(&self) -> Option<NetMessage> {
        self.peek_u8().and_then(NetMessage::from_byte)
    }

    /// Read a byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let start = self.pos;
        let mut len: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            len |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(ProtocolError::BadLength(start));
            }
        }
        if len > u64::from(u32::MAX) {
            return Err(ProtocolError::BadLength(start));
        }

        let text_start = self.pos;
        let bytes = self.take(len as usize)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8(text_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bytes() {
        for tag in [
            NetMessage::ChatMessage,
            NetMessage::ConsoleCommand,
            NetMessage::ConsoleCommandReply,
            NetMessage::ConsoleCommandRegister,
        ] {
            assert_eq!(NetMessage::from_byte(tag.as_byte()), Some(tag));
        }
        assert_eq!(NetMessage::from_byte(0xFF), None);
    }

    #[test]
    fn test_string_layout() {
        let payload = PacketBuilder::new(NetMessage::ConsoleCommandReply)
            .write_string("ok")
            .finish();
        assert_eq!(&payload[..], &[0x1F, 2, b'o', b'k']);
    }

    #[test]
    fn test_long_string_uses_multibyte_length() {
        let text = "x".repeat(300);
        let payload = PacketBuilder::new(NetMessage::ConsoleCommand)
            .write_string(&text)
            .finish();
        // 300 = 0b10_0101100 -> 0xAC 0x02
        assert_eq!(&payload[1..3], &[0xAC, 0x02]);

        let mut reader = PacketReader::new(&payload);
        reader.read_u8().unwrap();
        assert_eq!(reader.read_string().unwrap(), text);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_u16_little_endian() {
        let payload = PacketBuilder::new(NetMessage::ConsoleCommandRegister)
            .write_u16(0x0102)
            .finish();
        assert_eq!(&payload[1..], &[0x02, 0x01]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let msg = NetIncoming::data(Peer::Server, vec![0x1Fu8, 0]);
        let mut reader = msg.reader();
        assert_eq!(reader.peek_tag(), Some(NetMessage::ConsoleCommandReply));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8().unwrap(), 0x1F);
        assert_eq!(reader.position(), 1);
        reader.reset();
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_each_reader_starts_at_zero() {
        let msg = NetIncoming::data(
            Peer::Server,
            PacketBuilder::new(NetMessage::ConsoleCommandReply)
                .write_string("pong")
                .finish(),
        );

        let mut first = msg.reader();
        first.read_u8().unwrap();
        first.read_string().unwrap();
        assert_eq!(first.remaining(), 0);

        let mut second = msg.reader();
        assert_eq!(second.position(), 0);
        assert_eq!(second.read_u8().unwrap(), NetMessage::ConsoleCommandReply.as_byte());
        assert_eq!(second.read_string().unwrap(), "pong");
    }

    #[test]
    fn test_truncated_string() {
        let mut reader = PacketReader::new(&[5, b'a', b'b']);
        assert_eq!(
            reader.read_string(),
            Err(ProtocolError::Truncated { offset: 1, needed: 5, remaining: 2 })
        );
    }

    #[test]
    fn test_truncated_u16() {
        let mut reader = PacketReader::new(&[1]);
        assert!(matches!(reader.read_u16(), Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn test_overlong_length_prefix() {
        let mut reader = PacketReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(reader.read_string(), Err(ProtocolError::BadLength(0)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = PacketReader::new(&[2, 0xC3, 0x28]);
        assert_eq!(reader.read_string(), Err(ProtocolError::InvalidUtf8(1)));
    }

    #[test]
    fn test_outgoing_tag() {
        let out = PacketBuilder::new(NetMessage::ConsoleCommandRegister)
            .send_to(Peer::Server, DeliveryMethod::ReliableUnordered);
        assert_eq!(out.tag(), Some(NetMessage::ConsoleCommandRegister));
        assert_eq!(out.payload.len(), 1);
    }
}
