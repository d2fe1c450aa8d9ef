//! # IPC Frame Structures
//!
//! Owned, already validated metadata for one framed IPC message.
//!
//! - [`FramedMessage`] is what the message framer yields for each
//!   length-prefixed message.
//! - [`RecordBatchData`] holds one batch's field nodes and buffer descriptors,
//!   with every descriptor rebased to an absolute position in the input buffer
//!   and bounds-checked.
//! - [`IpcContents`] is everything a reader needs after the container has
//!   been walked: fields, dictionary batches and record batches in order.

use std::sync::Arc;

use crate::enums::{IPCMessageProtocol, MessageType};
use crate::models::types::field::FieldDesc;

/// Shape of one vector within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNodeDesc {
    pub length: usize,
    pub null_count: usize,
}

/// Absolute byte window of one buffer inside the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub offset: usize,
    pub length: usize,
}

/// Decoded record batch metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatchData {
    /// Declared row count.
    pub length: usize,
    /// One node per vector, in preorder.
    pub nodes: Vec<FieldNodeDesc>,
    /// Buffers in preorder, several per vector.
    pub buffers: Vec<BufferDescriptor>,
}

/// Decoded dictionary batch metadata: one vector's worth of nodes and buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryBatchData {
    pub id: i64,
    pub batch: RecordBatchData,
}

/// One framed message.
#[derive(Debug, Clone)]
pub enum FramedMessage {
    Schema(Vec<Arc<FieldDesc>>),
    RecordBatch(RecordBatchData),
    DictionaryBatch(DictionaryBatchData),
    /// Zero length prefix, or the end of the buffer.
    EndOfStream,
}

impl FramedMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            FramedMessage::Schema(_) => MessageType::Schema,
            FramedMessage::RecordBatch(_) => MessageType::RecordBatch,
            FramedMessage::DictionaryBatch(_) => MessageType::DictionaryBatch,
            FramedMessage::EndOfStream => MessageType::Unknown,
        }
    }
}

/// Everything located in a container, in container order.
#[derive(Debug, Clone)]
pub struct IpcContents {
    pub protocol: IPCMessageProtocol,
    pub fields: Vec<Arc<FieldDesc>>,
    pub dictionaries: Vec<DictionaryBatchData>,
    pub batches: Vec<RecordBatchData>,
}
