//! # Stream layout
//!
//! A Schema message followed by dictionary and record batch messages, ended by
//! a zero length prefix or the end of the buffer.

use log::debug;

use crate::enums::{IPCMessageProtocol, MessageType};
use crate::error::{IpcError, IpcResult};
use crate::models::decoders::ipc::protocol::MessageFramer;
use crate::models::frames::ipc_message::{FramedMessage, IpcContents};

/// Walks every message of a stream layout buffer.
pub fn read_stream(buf: &[u8]) -> IpcResult<IpcContents> {
    let mut framer = MessageFramer::new(buf, 0);
    let fields = match framer.next_message()? {
        FramedMessage::Schema(fields) => fields,
        FramedMessage::EndOfStream => {
            return Err(IpcError::format("stream ends before its schema message"));
        }
        other => {
            return Err(IpcError::format(format!(
                "stream must open with a Schema message, found {:?}",
                other.message_type()
            )));
        }
    };

    let mut dictionaries = Vec::new();
    let mut batches = Vec::new();
    loop {
        match framer.next_message()? {
            FramedMessage::RecordBatch(batch) => batches.push(batch),
            FramedMessage::DictionaryBatch(dict) => dictionaries.push(dict),
            FramedMessage::EndOfStream => break,
            FramedMessage::Schema(_) => {
                return Err(IpcError::format(format!(
                    "unexpected {:?} message at offset {}",
                    MessageType::Schema,
                    framer.position()
                )));
            }
        }
    }
    debug!(
        "Stream layout: {} fields, {} dictionary batches, {} record batches",
        fields.len(),
        dictionaries.len(),
        batches.len()
    );

    Ok(IpcContents {
        protocol: IPCMessageProtocol::Stream,
        fields,
        dictionaries,
        batches,
    })
}
