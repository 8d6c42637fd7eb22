// src/core/protocol/envelope.rs

//! Implements the CQL native protocol's frame envelope: the 9-byte header
//! (version, flags, stream id, opcode, body length) that every v3+ frame
//! carries, encoded/decoded via `tokio_util::codec` exactly the way the
//! teacher crate's `RespFrameCodec` frames RESP. The header layout is public,
//! stable protocol knowledge; only the body's encoding is a simplification
//! (see `message.rs`), since the full CQL type system sits outside this
//! core's scope per SPEC_FULL.md.

use super::message::Message;
use crate::core::errors::CoreError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const HEADER_LEN: usize = 9;
const MAX_BODY_LEN: usize = 256 * 1024 * 1024;

/// Request/response opcode, as carried in byte 4 of the envelope header. Only
/// the opcodes this simulator understands are enumerated; anything else
/// decodes to `Opcode::Other` and is ignored per the "unknown message kind is
/// ignored" error policy in SPEC_FULL.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Error,
    Startup,
    Ready,
    Options,
    Supported,
    Query,
    Register,
    Execute,
    Prepare,
    Batch,
    /// The generic `RESULT` opcode; `Void`/`Rows`/`SetKeyspace`/`Prepared` are
    /// sub-kinds distinguished by the `Message` variant itself, matching the
    /// real protocol's layering.
    Result,
    Other(u8),
}

impl Opcode {
    fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Opcode::Error,
            0x01 => Opcode::Startup,
            0x02 => Opcode::Ready,
            0x05 => Opcode::Options,
            0x06 => Opcode::Supported,
            0x07 => Opcode::Query,
            0x08 => Opcode::Result,
            0x09 => Opcode::Prepare,
            0x0A => Opcode::Execute,
            0x0B => Opcode::Register,
            0x0D => Opcode::Batch,
            other => Opcode::Other(other),
        }
    }

    fn for_message(msg: &Message) -> u8 {
        match msg {
            Message::Startup { .. } => 0x01,
            Message::Register { .. } => 0x0B,
            Message::Options => 0x05,
            Message::Query { .. } => 0x07,
            Message::Prepare { .. } => 0x09,
            Message::Execute { .. } => 0x0A,
            Message::Batch { .. } => 0x0D,
            Message::Ready => 0x02,
            Message::Supported { .. } => 0x06,
            Message::SetKeyspace(_)
            | Message::Void
            | Message::Rows { .. }
            | Message::Prepared { .. } => 0x08,
            Message::Error(_) => 0x00,
        }
    }
}

/// One complete frame: the decoded header fields plus its typed body.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub version: u8,
    pub stream: i16,
    pub message: Message,
}

impl Envelope {
    pub fn new(stream: i16, message: Message) -> Self {
        Self {
            version: 4,
            stream,
            message,
        }
    }

    pub fn reply(&self, message: Message) -> Self {
        Self {
            version: self.version,
            stream: self.stream,
            message,
        }
    }
}

/// A `tokio_util::codec` implementation for the CQL envelope. The body is
/// carried as length-prefixed JSON rather than the real CQL binary type
/// system; see the module doc comment for why that boundary was drawn here.
#[derive(Debug, Default)]
pub struct CqlFrameCodec;

impl Encoder<Envelope> for CqlFrameCodec {
    type Error = CoreError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item.message)
            .map_err(|e| CoreError::Internal(format!("failed to encode frame body: {e}")))?;
        if body.len() > MAX_BODY_LEN {
            return Err(CoreError::Internal("frame body too large".into()));
        }
        dst.reserve(HEADER_LEN + body.len());
        dst.put_u8(item.version | 0x80); // high bit marks a response per protocol convention
        dst.put_u8(0); // flags: unused by this simulator
        dst.put_i16(item.stream);
        dst.put_u8(Opcode::for_message(&item.message));
        dst.put_u32(body.len() as u32);
        dst.extend_from_slice(&body);
        Ok(())
    }
}

impl Decoder for CqlFrameCodec {
    type Item = Envelope;
    type Error = CoreError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let body_len = u32::from_be_bytes(src[5..9].try_into().unwrap()) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(CoreError::CodecError(format!(
                "frame body of {body_len} bytes exceeds the {MAX_BODY_LEN} byte limit"
            )));
        }
        if src.len() < HEADER_LEN + body_len {
            src.reserve(HEADER_LEN + body_len - src.len());
            return Ok(None);
        }

        let version = src[0] & 0x7F;
        let stream = i16::from_be_bytes(src[2..4].try_into().unwrap());
        let _opcode = Opcode::from_byte(src[4]);

        let body: Bytes = src[HEADER_LEN..HEADER_LEN + body_len].to_vec().into();
        src.advance(HEADER_LEN + body_len);

        let message: Message = serde_json::from_slice(&body)
            .map_err(|e| CoreError::CodecError(format!("malformed frame body: {e}")))?;

        Ok(Some(Envelope {
            version,
            stream,
            message,
        }))
    }
}
