//! # File layout
//!
//! ```text
//! MAGIC | messages ... | FOOTER | int32 footer length | MAGIC
//! ```
//!
//! The footer lists the schema and a block `{offset, metaDataLength,
//! bodyLength}` per dictionary batch and per record batch. Each block is framed
//! by seeking the message framer straight to its offset.

use std::ops::Range;
use std::sync::Arc;

use arrow_ipc as fb;
use log::debug;

use crate::constants::{FOOTER_SIZE_PREFIX, MAGIC_LEN, MIN_FILE_LEN};
use crate::enums::{IPCMessageProtocol, MessageType};
use crate::error::{IpcError, IpcResult};
use crate::models::decoders::ipc::protocol::frame_at;
use crate::models::frames::ipc_message::{FramedMessage, IpcContents};
use crate::models::types::field::{FieldDesc, fields_from_fb_schema};
use crate::utils::{checked_range, has_magic, read_i32_le};

/// One footer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDesc {
    pub offset: usize,
    /// Length prefix plus flatbuffer metadata, padding included.
    pub metadata_length: usize,
    pub body_length: usize,
}

/// Decoded footer.
#[derive(Debug, Clone)]
pub struct FileFooter {
    pub fields: Vec<Arc<FieldDesc>>,
    pub dictionaries: Vec<BlockDesc>,
    pub record_batches: Vec<BlockDesc>,
}

/// True when the buffer opens with the file magic.
#[inline]
pub fn is_file_layout(buf: &[u8]) -> bool {
    has_magic(buf, 0)
}

/// Validates both magics and the footer length, returning the footer's byte range.
pub fn locate_footer(buf: &[u8]) -> IpcResult<Range<usize>> {
    let len = buf.len();
    if len < MIN_FILE_LEN {
        return Err(IpcError::format(format!(
            "file of {len} bytes is shorter than the {MIN_FILE_LEN} byte minimum"
        )));
    }
    if !has_magic(buf, 0) {
        return Err(IpcError::format("missing opening magic"));
    }
    if !has_magic(buf, len - MAGIC_LEN) {
        return Err(IpcError::format("missing closing magic"));
    }

    let len_pos = len - MAGIC_LEN - FOOTER_SIZE_PREFIX;
    let footer_len = read_i32_le(buf, len_pos)
        .ok_or_else(|| IpcError::format("truncated footer length"))?;
    if footer_len <= 0 {
        return Err(IpcError::format(format!("footer length {footer_len} is not positive")));
    }
    let footer_len = footer_len as usize;
    if footer_len + MIN_FILE_LEN > len {
        return Err(IpcError::format(format!(
            "footer length {footer_len} does not fit in a {len} byte file"
        )));
    }
    let start = len_pos - footer_len;
    Ok(start..len_pos)
}

/// Parses the footer of a file layout buffer.
pub fn parse_footer(buf: &[u8]) -> IpcResult<FileFooter> {
    let range = locate_footer(buf)?;
    let footer = fb::root_as_footer(&buf[range])
        .map_err(|e| IpcError::format(format!("invalid footer: {e}")))?;
    let schema = footer
        .schema()
        .ok_or_else(|| IpcError::format("footer has no schema"))?;
    let fields = fields_from_fb_schema(&schema)?;

    let dictionaries = match footer.dictionaries() {
        Some(blocks) => blocks.iter().map(block_desc).collect::<IpcResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    let record_batches = match footer.recordBatches() {
        Some(blocks) => blocks.iter().map(block_desc).collect::<IpcResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(FileFooter {
        fields,
        dictionaries,
        record_batches,
    })
}

/// Walks a file layout buffer: footer, then every dictionary and record batch block.
pub fn read_file(buf: &[u8]) -> IpcResult<IpcContents> {
    let footer = parse_footer(buf)?;
    debug!(
        "File layout: {} fields, {} dictionary blocks, {} record batch blocks",
        footer.fields.len(),
        footer.dictionaries.len(),
        footer.record_batches.len()
    );

    let mut dictionaries = Vec::with_capacity(footer.dictionaries.len());
    for block in &footer.dictionaries {
        match frame_block(buf, block)? {
            FramedMessage::DictionaryBatch(d) => dictionaries.push(d),
            other => return Err(block_mismatch(block, MessageType::DictionaryBatch, &other)),
        }
    }
    let mut batches = Vec::with_capacity(footer.record_batches.len());
    for block in &footer.record_batches {
        match frame_block(buf, block)? {
            FramedMessage::RecordBatch(b) => batches.push(b),
            other => return Err(block_mismatch(block, MessageType::RecordBatch, &other)),
        }
    }

    Ok(IpcContents {
        protocol: IPCMessageProtocol::File,
        fields: footer.fields,
        dictionaries,
        batches,
    })
}

fn block_desc(block: &fb::Block) -> IpcResult<BlockDesc> {
    let offset = usize::try_from(block.offset())
        .map_err(|_| IpcError::format(format!("negative block offset {}", block.offset())))?;
    let metadata_length = usize::try_from(block.metaDataLength()).map_err(|_| {
        IpcError::format(format!("negative block metadata length {}", block.metaDataLength()))
    })?;
    let body_length = usize::try_from(block.bodyLength())
        .map_err(|_| IpcError::format(format!("negative block body length {}", block.bodyLength())))?;
    Ok(BlockDesc {
        offset,
        metadata_length,
        body_length,
    })
}

fn frame_block(buf: &[u8], block: &BlockDesc) -> IpcResult<FramedMessage> {
    checked_range(
        block.offset as i64,
        (block.metadata_length + block.body_length) as i64,
        buf.len(),
        "footer block",
    )?;
    let (message, _) = frame_at(buf, block.offset)?;
    Ok(message)
}

fn block_mismatch(block: &BlockDesc, expected: MessageType, found: &FramedMessage) -> IpcError {
    IpcError::format(format!(
        "block at offset {} should hold a {:?} message, found {:?}",
        block.offset,
        expected,
        found.message_type()
    ))
}
