//! Decodes IPC message headers into owned batch metadata.
//!
//! Field nodes are copied out verbatim. Buffer descriptors are checked against
//! their batch body and rebased to absolute positions, so the loader can slice
//! the input buffer without further arithmetic.

use std::ops::Range;
use std::sync::Arc;

use arrow_ipc as fb;
use log::trace;

use crate::error::{IpcError, IpcResult};
use crate::models::frames::ipc_message::{
    BufferDescriptor, DictionaryBatchData, FieldNodeDesc, RecordBatchData,
};
use crate::models::types::field::{FieldDesc, fields_from_fb_schema};
use crate::utils::checked_range;

/// Parses the field trees out of a Schema message.
pub fn parse_schema_message(message: &fb::Message) -> IpcResult<Vec<Arc<FieldDesc>>> {
    let schema = message
        .header_as_schema()
        .ok_or_else(|| IpcError::format("Schema message has no schema header"))?;
    fields_from_fb_schema(&schema)
}

/// Decodes a RecordBatch header whose body occupies `body` in the input buffer.
pub fn parse_record_batch(rb: &fb::RecordBatch, body: Range<usize>) -> IpcResult<RecordBatchData> {
    if rb.compression().is_some() {
        return Err(IpcError::UnsupportedFeature(
            "compressed record batch bodies".into(),
        ));
    }
    let length = non_negative(rb.length(), "record batch length")?;

    let nodes = match rb.nodes() {
        Some(fb_nodes) => fb_nodes
            .iter()
            .map(|n| {
                Ok(FieldNodeDesc {
                    length: non_negative(n.length(), "field node length")?,
                    null_count: non_negative(n.null_count(), "field node null count")?,
                })
            })
            .collect::<IpcResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let body_len = body.end - body.start;
    let buffers = match rb.buffers() {
        Some(fb_buffers) => fb_buffers
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let range = checked_range(b.offset(), b.length(), body_len, &format!("buffer {i}"))?;
                Ok(BufferDescriptor {
                    offset: body.start + range.start,
                    length: range.end - range.start,
                })
            })
            .collect::<IpcResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    trace!(
        "Record batch: {} rows, {} nodes, {} buffers, body {:?}",
        length,
        nodes.len(),
        buffers.len(),
        body
    );
    Ok(RecordBatchData {
        length,
        nodes,
        buffers,
    })
}

/// Decodes a DictionaryBatch header. Delta batches are rejected.
pub fn parse_dictionary_batch(
    db: &fb::DictionaryBatch,
    body: Range<usize>,
) -> IpcResult<DictionaryBatchData> {
    if db.isDelta() {
        return Err(IpcError::UnsupportedFeature(format!(
            "delta dictionary batch for id {}",
            db.id()
        )));
    }
    let rb = db
        .data()
        .ok_or_else(|| IpcError::format(format!("dictionary batch {} has no data", db.id())))?;
    Ok(DictionaryBatchData {
        id: db.id(),
        batch: parse_record_batch(&rb, body)?,
    })
}

fn non_negative(v: i64, what: &str) -> IpcResult<usize> {
    usize::try_from(v).map_err(|_| IpcError::format(format!("negative {what}: {v}")))
}
