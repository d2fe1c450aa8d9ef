//! # Vector loader
//!
//! Binds one batch's field nodes and buffers to a vector tree.
//!
//! The tree is walked in the same preorder it was built in. Each vector pops
//! one field node, then one buffer per entry of its layout, then recurses into
//! its children. Dictionary vectors delegate their slot to their index vector.
//! Both cursors are explicit iterators owned by the loader, so a recursive call
//! can never rewind or skip the other's position.
//!
//! Every bound view is checked against the node's declared length before the
//! load returns, so reads after a successful load never run past a buffer.
//! String slots must hold valid UTF-8 and dictionary keys must name an entry
//! of the loaded dictionary.

use std::slice;
use std::sync::PoisonError;

use log::{debug, trace, warn};
use minarrow::SharedBuffer;

use crate::enums::BufferKind;
use crate::error::{IpcError, IpcResult};
use crate::models::bitarray::BitArray;
use crate::models::buffer::{ByteView, OffsetView};
use crate::models::frames::ipc_message::{
    BufferDescriptor, DictionaryBatchData, FieldNodeDesc, RecordBatchData,
};
use crate::models::types::field::DateUnit;
use crate::models::vectors::dictionary::DictionaryRegistry;
use crate::models::vectors::{Vector, VectorKind};

pub struct VectorLoader<'a> {
    data: &'a SharedBuffer,
    nodes: slice::Iter<'a, FieldNodeDesc>,
    buffers: slice::Iter<'a, BufferDescriptor>,
}

impl<'a> VectorLoader<'a> {
    pub fn new(data: &'a SharedBuffer, batch: &'a RecordBatchData) -> Self {
        Self {
            data,
            nodes: batch.nodes.iter(),
            buffers: batch.buffers.iter(),
        }
    }

    /// Loads `vector` and its subtree from the cursors.
    pub fn load(&mut self, vector: &mut Vector) -> IpcResult<()> {
        if let VectorKind::Dictionary { indices, .. } = &mut vector.kind {
            self.load(indices)?;
            vector.len = indices.len;
            vector.null_count = indices.null_count;
            return check_dictionary_keys(vector);
        }

        let node = *self.nodes.next().ok_or_else(|| {
            IpcError::format(format!("batch has no field node left for '{}'", vector.name()))
        })?;
        vector.len = node.length;
        vector.null_count = node.null_count;

        for i in 0..vector.layout.len() {
            let kind = vector.layout[i];
            let desc = *self.buffers.next().ok_or_else(|| {
                IpcError::format(format!(
                    "batch has no {kind} buffer left for '{}'",
                    vector.name()
                ))
            })?;
            let view = ByteView::new(self.data, desc.offset, desc.length)?;
            bind_buffer(&mut vector.kind, kind, view, &vector.field.name)?;
        }
        trace!(
            "Bound '{}': {} rows, {} nulls, {} buffers",
            vector.name(),
            vector.len,
            vector.null_count,
            vector.layout.len()
        );

        match &mut vector.kind {
            VectorKind::List { child, .. } | VectorKind::FixedSizeList { child, .. } => {
                self.load(child)?
            }
            VectorKind::Struct { children, .. } => {
                for child in children.iter_mut() {
                    self.load(child)?;
                }
            }
            _ => {}
        }

        check_extents(vector)
    }

    /// Handles leftover nodes or buffers once the whole tree is loaded.
    pub fn finish(self, strict: bool) -> IpcResult<()> {
        let nodes_left = self.nodes.len();
        let buffers_left = self.buffers.len();
        if nodes_left == 0 && buffers_left == 0 {
            return Ok(());
        }
        if strict {
            return Err(IpcError::format(format!(
                "batch has {nodes_left} unused field nodes and {buffers_left} unused buffers"
            )));
        }
        warn!("Ignoring {nodes_left} unused field nodes and {buffers_left} unused buffers in batch");
        Ok(())
    }
}

/// Loads one record batch into the top-level vectors. Returns its row count.
///
/// On error the vectors are left partly rebound; callers load into a staged
/// copy.
pub fn load_record_batch(
    vectors: &mut [Vector],
    batch: &RecordBatchData,
    data: &SharedBuffer,
    strict: bool,
) -> IpcResult<usize> {
    let mut loader = VectorLoader::new(data, batch);
    for vector in vectors.iter_mut() {
        loader.load(vector)?;
    }
    loader.finish(strict)?;
    Ok(batch.length)
}

/// Loads every batch into a scratch copy of `vectors`, so that a batch which
/// would fail to bind is reported before any batch is served.
pub fn check_record_batches(
    vectors: &[Vector],
    batches: &[RecordBatchData],
    data: &SharedBuffer,
    strict: bool,
) -> IpcResult<()> {
    let mut scratch = vectors.to_vec();
    for (i, batch) in batches.iter().enumerate() {
        if let Err(e) = load_record_batch(&mut scratch, batch, data, strict) {
            debug!("Record batch {i} does not bind: {e}");
            return Err(e);
        }
    }
    Ok(())
}

/// Loads a dictionary batch into the registry vector for its id.
pub fn load_dictionary_batch(
    registry: &mut DictionaryRegistry,
    batch: &DictionaryBatchData,
    data: &SharedBuffer,
    strict: bool,
) -> IpcResult<()> {
    let shared = registry.get(batch.id).ok_or_else(|| {
        IpcError::format(format!(
            "dictionary batch for id {} that no field references",
            batch.id
        ))
    })?;
    registry.mark_loaded(batch.id)?;

    let mut vector = shared.write().unwrap_or_else(PoisonError::into_inner);
    let mut staged = vector.clone();
    let mut loader = VectorLoader::new(data, &batch.batch);
    loader.load(&mut staged)?;
    loader.finish(strict)?;
    *vector = staged;
    trace!("Loaded dictionary {} with {} values", batch.id, vector.len);
    Ok(())
}

fn bind_buffer(kind: &mut VectorKind, buffer: BufferKind, view: ByteView, name: &str) -> IpcResult<()> {
    match (kind, buffer) {
        (
            VectorKind::Primitive { validity, .. }
            | VectorKind::Date { validity, .. }
            | VectorKind::Utf8 { validity, .. }
            | VectorKind::List { validity, .. }
            | VectorKind::FixedSizeList { validity, .. }
            | VectorKind::Struct { validity, .. },
            BufferKind::Validity,
        ) => *validity = BitArray::from_view(&view),
        (
            VectorKind::Primitive { data, .. }
            | VectorKind::Date { data, .. }
            | VectorKind::Utf8 { data, .. },
            BufferKind::Data,
        ) => *data = view,
        (VectorKind::Utf8 { offsets, .. } | VectorKind::List { offsets, .. }, BufferKind::Offset) => {
            *offsets = OffsetView::new(view)
        }
        (_, other) => {
            return Err(IpcError::format(format!(
                "'{name}' has no slot for a {other} buffer"
            )));
        }
    }
    Ok(())
}

/// Bytes needed for `len` elements of `width` bytes.
fn span(len: usize, width: usize, name: &str) -> IpcResult<usize> {
    len.checked_mul(width).ok_or_else(|| {
        IpcError::out_of_bounds(format!("'{name}' declares {len} rows, too many to address"))
    })
}

/// Verifies that the bound views can serve `len` rows.
fn check_extents(vector: &Vector) -> IpcResult<()> {
    let len = vector.len;
    let name = vector.name();
    let short = |what: &str, have: usize, need: usize| {
        IpcError::out_of_bounds(format!(
            "'{name}' {what} holds {have} bytes, {need} needed for {len} rows"
        ))
    };

    if let Some(validity) = vector.validity() {
        let bytes = validity.as_bytes().len();
        if !validity.is_empty() && bytes < len.div_ceil(8) {
            return Err(short("validity bitmap", bytes, len.div_ceil(8)));
        }
    }

    match &vector.kind {
        VectorKind::Primitive { ptype, data, .. } => {
            let need = span(len, ptype.byte_width(), name)?;
            if data.len() < need {
                return Err(short("data buffer", data.len(), need));
            }
        }
        VectorKind::Date { unit, data, .. } => {
            let width = match unit {
                DateUnit::Day => 4,
                DateUnit::Millisecond => 8,
            };
            let need = span(len, width, name)?;
            if data.len() < need {
                return Err(short("data buffer", data.len(), need));
            }
        }
        VectorKind::Utf8 { offsets, data, .. } => {
            let end = offsets_end(offsets, len, name)?;
            if data.len() < end {
                return Err(short("data buffer", data.len(), end));
            }
            check_utf8(vector, offsets, data)?;
        }
        VectorKind::List { offsets, child, .. } => {
            let end = offsets_end(offsets, len, name)?;
            if child.len < end {
                return Err(IpcError::out_of_bounds(format!(
                    "'{name}' offsets reach {end} but its child has {} rows",
                    child.len
                )));
            }
        }
        VectorKind::FixedSizeList { size, child, .. } => {
            let need = span(len, *size, name)?;
            if child.len < need {
                return Err(IpcError::out_of_bounds(format!(
                    "'{name}' needs {need} child rows, child has {}",
                    child.len
                )));
            }
        }
        VectorKind::Struct { children, .. } => {
            if let Some(c) = children.iter().find(|c| c.len < len) {
                return Err(IpcError::out_of_bounds(format!(
                    "'{name}' has {len} rows but child '{}' has {}",
                    c.name(),
                    c.len
                )));
            }
        }
        VectorKind::Dictionary { .. } => {}
    }
    Ok(())
}

/// Checks the `rows + 1` offsets invariant and returns the last offset.
fn offsets_end(offsets: &OffsetView, rows: usize, name: &str) -> IpcResult<usize> {
    if rows == 0 {
        return Ok(0);
    }
    if offsets.len() <= rows {
        return Err(IpcError::format(format!(
            "'{name}' has {rows} rows but only {} offsets",
            offsets.len()
        )));
    }
    let mut prev = 0i32;
    for i in 0..=rows {
        let o = offsets.get(i).unwrap_or(-1);
        if o < prev {
            return Err(IpcError::format(format!(
                "'{name}' offset {i} is {o}, offsets must be non-negative and non-decreasing"
            )));
        }
        prev = o;
    }
    Ok(prev as usize)
}

/// Every non-null string slot must decode as UTF-8.
fn check_utf8(vector: &Vector, offsets: &OffsetView, data: &ByteView) -> IpcResult<()> {
    for i in (0..vector.len).filter(|&i| vector.is_valid(i)) {
        let bytes = offsets
            .range(i)
            .and_then(|(start, end)| data.as_slice().get(start..end))
            .unwrap_or_default();
        if let Err(e) = std::str::from_utf8(bytes) {
            return Err(IpcError::format(format!(
                "'{}' row {i} is not valid UTF-8: {e}",
                vector.name()
            )));
        }
    }
    Ok(())
}

/// Every non-null key of a dictionary vector must index the loaded dictionary.
fn check_dictionary_keys(vector: &Vector) -> IpcResult<()> {
    let VectorKind::Dictionary { indices, dictionary } = &vector.kind else {
        return Ok(());
    };
    let size = dictionary.read().unwrap_or_else(PoisonError::into_inner).len;
    for i in (0..indices.len).filter(|&i| indices.is_valid(i)) {
        let key = indices.get(i).and_then(|v| v.as_i64());
        let in_range = key
            .and_then(|k| usize::try_from(k).ok())
            .is_some_and(|k| k < size);
        if !in_range {
            return Err(IpcError::out_of_bounds(format!(
                "'{}' row {i} has key {key:?}, dictionary holds {size} values",
                vector.name()
            )));
        }
    }
    Ok(())
}
