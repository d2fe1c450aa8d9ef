use std::fmt;

/// Arrow framing protocol.
///
/// There are two variants: one for footer-indexed files and one for
/// sequential streams. Detection is by the opening magic alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IPCMessageProtocol {
    /// Sequential length-prefixed messages, schema first.
    Stream,

    /// `MAGIC | stream | FOOTER | footer length | MAGIC`.
    File,
}

/// Arrow message types.
///
/// Maps directly to the message header union of the IPC metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Schema definition message.
    Schema,

    /// Record batch payload.
    RecordBatch,

    /// Dictionary batch payload.
    DictionaryBatch,

    /// Any other header (tensors, sparse tensors, `NONE`).
    Unknown,
}

/// Role of one buffer within a vector's own buffer list.
///
/// A vector consumes its buffers in the order its layout lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Int32 offsets with one trailing sentinel entry.
    Offset,

    /// Fixed-width values or raw bytes.
    Data,

    /// Validity bitmap, one bit per row.
    Validity,

    /// Union type ids.
    Type,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BufferKind::Offset => "OFFSET",
            BufferKind::Data => "DATA",
            BufferKind::Validity => "VALIDITY",
            BufferKind::Type => "TYPE",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a [`Reader`](crate::Reader).
///
/// Schema and dictionaries are loaded while opening, so a constructed reader
/// is always `Ready`. `Exhausted` is terminal until the batch index is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// `batch_index` points at a batch that can still be loaded.
    Ready(usize),

    /// Every batch has been served; `load_next_batch` returns 0.
    Exhausted,
}
