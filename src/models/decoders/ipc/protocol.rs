//! Arrow IPC Message Framer
//!
//! Reads one length-prefixed metadata message at a time out of a fully
//! resident buffer and classifies it as Schema, RecordBatch or DictionaryBatch.
//!
//! # Framing
//!
//! ```text
//! [0xFFFFFFFF]? [int32 metadata length] [flatbuffer Message] [body bytes]
//! ```
//!
//! - The continuation marker is optional. Legacy writers emit the bare length.
//! - A metadata length of 0 ends the stream, with or without a marker.
//! - The body length comes from the message itself, and the next message
//!   starts straight after the body.
//!
//! The framer works the same for both container layouts. The stream reader
//! runs it sequentially; the file reader seeks it to each footer block.

use std::ops::Range;

use arrow_ipc as fb;
use log::trace;

use crate::constants::{CONTINUATION_MARKER_LEN, CONTINUATION_SENTINEL, METADATA_SIZE_PREFIX};
use crate::error::{IpcError, IpcResult};
use crate::models::decoders::ipc::parser::{
    parse_dictionary_batch, parse_record_batch, parse_schema_message,
};
use crate::models::frames::ipc_message::FramedMessage;
use crate::utils::{checked_range, read_i32_le, read_u32_le};

/// Sequential message cursor over an in-memory buffer.
#[derive(Debug)]
pub struct MessageFramer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MessageFramer<'a> {
    /// Cursor positioned at `pos`.
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Frames the message at the cursor and advances past its body.
    ///
    /// Reaching the end of the buffer reads as end of stream.
    pub fn next_message(&mut self) -> IpcResult<FramedMessage> {
        if self.pos >= self.buf.len() {
            return Ok(FramedMessage::EndOfStream);
        }
        let (message, next) = frame_at(self.buf, self.pos)?;
        self.pos = next;
        Ok(message)
    }
}

/// Frames the message starting at `pos`, returning it with the offset of the
/// byte after its body.
pub fn frame_at(buf: &[u8], pos: usize) -> IpcResult<(FramedMessage, usize)> {
    let (meta_len, prefix_len) = read_length_prefix(buf, pos)?;
    if meta_len == 0 {
        return Ok((FramedMessage::EndOfStream, pos + prefix_len));
    }

    let meta = checked_range(
        (pos + prefix_len) as i64,
        meta_len as i64,
        buf.len(),
        "message metadata",
    )?;
    let message = fb::root_as_message(&buf[meta.clone()])
        .map_err(|e| IpcError::format(format!("invalid message metadata at {pos}: {e}")))?;
    let body = checked_range(meta.end as i64, message.bodyLength(), buf.len(), "message body")?;
    trace!(
        "Framed {:?} at {pos}: metadata {} bytes, body {} bytes",
        message.header_type(),
        meta_len,
        body.len()
    );

    let framed = decode_header(&message, body.clone())?;
    Ok((framed, body.end))
}

fn decode_header(message: &fb::Message, body: Range<usize>) -> IpcResult<FramedMessage> {
    match message.header_type() {
        fb::MessageHeader::Schema => Ok(FramedMessage::Schema(parse_schema_message(message)?)),
        fb::MessageHeader::RecordBatch => {
            let rb = message
                .header_as_record_batch()
                .ok_or_else(|| IpcError::format("RecordBatch message has no header"))?;
            Ok(FramedMessage::RecordBatch(parse_record_batch(&rb, body)?))
        }
        fb::MessageHeader::DictionaryBatch => {
            let db = message
                .header_as_dictionary_batch()
                .ok_or_else(|| IpcError::format("DictionaryBatch message has no header"))?;
            Ok(FramedMessage::DictionaryBatch(parse_dictionary_batch(&db, body)?))
        }
        other => Err(IpcError::format(format!(
            "unexpected message header {:?}",
            other
        ))),
    }
}

/// Returns `(metadata length, prefix length)` for the prefix at `pos`.
fn read_length_prefix(buf: &[u8], pos: usize) -> IpcResult<(usize, usize)> {
    let truncated = || IpcError::format(format!("truncated message length prefix at {pos}"));
    let first = read_u32_le(buf, pos).ok_or_else(truncated)?;
    let (len, prefix_len) = if first == CONTINUATION_SENTINEL {
        let len = read_i32_le(buf, pos + CONTINUATION_MARKER_LEN).ok_or_else(truncated)?;
        (len, CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX)
    } else {
        (first as i32, METADATA_SIZE_PREFIX)
    };
    let len = usize::try_from(len)
        .map_err(|_| IpcError::format(format!("negative message length {len} at {pos}")))?;
    Ok((len, prefix_len))
}
