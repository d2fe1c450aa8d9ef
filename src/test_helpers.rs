//! # Test Helpers - *IPC Buffer Builders*
//!
//! Builds stream and file layout buffers in memory from a small field and
//! batch description, using the generated flatbuffer builders. Bodies are
//! laid out with 8-byte aligned buffers, the way Arrow writers emit them.
//!
//! Fixtures can also produce deliberately malformed layouts: a stream with no
//! schema, file blocks listed under the wrong kind, delta or compressed
//! batches.

use arrow_ipc as fb;
use flatbuffers::{FlatBufferBuilder, UnionWIPOffset, WIPOffset};

use crate::constants::{ARROW_MAGIC_NUMBER, ARROW_MAGIC_NUMBER_PADDED, CONTINUATION_SENTINEL};

/// Padding needed to bring `n` up to an 8-byte boundary.
#[inline]
pub(crate) fn align_8(n: usize) -> usize {
    let rem = n % 8;
    if rem == 0 { 0 } else { 8 - rem }
}

/// Packs a sequence of bools into an LSB-first bitmap.
pub(crate) fn pack_bits<I>(iter: I, len: usize) -> Vec<u8>
where
    I: Iterator<Item = bool>,
{
    let mut buf = vec![0u8; len.div_ceil(8)];
    for (i, v) in iter.enumerate().take(len) {
        if v {
            buf[i / 8] |= 1 << (i % 8);
        }
    }
    buf
}

// -------------------- Field descriptions -------------------- //

/// Length prefix style used when framing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Bare 4-byte length.
    Legacy,
    /// `0xFFFFFFFF` then the 4-byte length.
    Continuation,
}

#[derive(Debug, Clone)]
pub(crate) enum TypeSpec {
    Int { bit_width: i32, signed: bool },
    Float(fb::Precision),
    Utf8,
    Bool,
    Date(fb::DateUnit),
    Timestamp,
    List,
    FixedSizeList(i32),
    Struct,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldSpec {
    name: String,
    nullable: bool,
    ty: TypeSpec,
    children: Vec<FieldSpec>,
    /// Dictionary id and optional index type `(bit_width, signed)`.
    dictionary: Option<(i64, Option<(i32, bool)>)>,
}

impl FieldSpec {
    pub(crate) fn new(name: &str, ty: TypeSpec, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            nullable,
            ty,
            children: Vec::new(),
            dictionary: None,
        }
    }

    pub(crate) fn int(name: &str, bit_width: i32, signed: bool, nullable: bool) -> Self {
        Self::new(name, TypeSpec::Int { bit_width, signed }, nullable)
    }

    pub(crate) fn int32(name: &str, nullable: bool) -> Self {
        Self::int(name, 32, true, nullable)
    }

    pub(crate) fn float64(name: &str, nullable: bool) -> Self {
        Self::new(name, TypeSpec::Float(fb::Precision::DOUBLE), nullable)
    }

    pub(crate) fn utf8(name: &str, nullable: bool) -> Self {
        Self::new(name, TypeSpec::Utf8, nullable)
    }

    pub(crate) fn date(name: &str, unit: fb::DateUnit, nullable: bool) -> Self {
        Self::new(name, TypeSpec::Date(unit), nullable)
    }

    pub(crate) fn list(name: &str, nullable: bool, item: FieldSpec) -> Self {
        Self::new(name, TypeSpec::List, nullable).with_children(vec![item])
    }

    pub(crate) fn fixed_size_list(name: &str, size: i32, nullable: bool, item: FieldSpec) -> Self {
        Self::new(name, TypeSpec::FixedSizeList(size), nullable).with_children(vec![item])
    }

    pub(crate) fn structure(name: &str, nullable: bool, children: Vec<FieldSpec>) -> Self {
        Self::new(name, TypeSpec::Struct, nullable).with_children(children)
    }

    pub(crate) fn with_children(mut self, children: Vec<FieldSpec>) -> Self {
        self.children = children;
        self
    }

    /// Dictionary-encoded with the index type left unset.
    pub(crate) fn dictionary(mut self, id: i64) -> Self {
        self.dictionary = Some((id, None));
        self
    }

    pub(crate) fn dictionary_with_index(mut self, id: i64, bit_width: i32, signed: bool) -> Self {
        self.dictionary = Some((id, Some((bit_width, signed))));
        self
    }
}

fn write_type<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    ty: &TypeSpec,
) -> (fb::Type, WIPOffset<UnionWIPOffset>) {
    match ty {
        TypeSpec::Int { bit_width, signed } => (
            fb::Type::Int,
            fb::Int::create(
                fbb,
                &fb::IntArgs {
                    bitWidth: *bit_width,
                    is_signed: *signed,
                },
            )
            .as_union_value(),
        ),
        TypeSpec::Float(precision) => (
            fb::Type::FloatingPoint,
            fb::FloatingPoint::create(fbb, &fb::FloatingPointArgs { precision: *precision })
                .as_union_value(),
        ),
        TypeSpec::Utf8 => (
            fb::Type::Utf8,
            fb::Utf8::create(fbb, &fb::Utf8Args {}).as_union_value(),
        ),
        TypeSpec::Bool => (
            fb::Type::Bool,
            fb::Bool::create(fbb, &fb::BoolArgs {}).as_union_value(),
        ),
        TypeSpec::Date(unit) => (
            fb::Type::Date,
            fb::Date::create(fbb, &fb::DateArgs { unit: *unit }).as_union_value(),
        ),
        TypeSpec::Timestamp => (
            fb::Type::Timestamp,
            fb::Timestamp::create(
                fbb,
                &fb::TimestampArgs {
                    unit: fb::TimeUnit::MILLISECOND,
                    timezone: None,
                },
            )
            .as_union_value(),
        ),
        TypeSpec::List => (
            fb::Type::List,
            fb::List::create(fbb, &fb::ListArgs {}).as_union_value(),
        ),
        TypeSpec::FixedSizeList(size) => (
            fb::Type::FixedSizeList,
            fb::FixedSizeList::create(fbb, &fb::FixedSizeListArgs { listSize: *size })
                .as_union_value(),
        ),
        TypeSpec::Struct => (
            fb::Type::Struct_,
            fb::Struct_::create(fbb, &fb::Struct_Args {}).as_union_value(),
        ),
    }
}

fn write_field<'a>(fbb: &mut FlatBufferBuilder<'a>, spec: &FieldSpec) -> WIPOffset<fb::Field<'a>> {
    let children: Vec<_> = spec.children.iter().map(|c| write_field(fbb, c)).collect();
    let children = fbb.create_vector(&children);
    let name = fbb.create_string(&spec.name);
    let (type_type, type_) = write_type(fbb, &spec.ty);
    let dictionary = spec.dictionary.map(|(id, index)| {
        let index_type = index.map(|(bit_width, signed)| {
            fb::Int::create(
                fbb,
                &fb::IntArgs {
                    bitWidth: bit_width,
                    is_signed: signed,
                },
            )
        });
        fb::DictionaryEncoding::create(
            fbb,
            &fb::DictionaryEncodingArgs {
                id,
                indexType: index_type,
                isOrdered: false,
                dictionaryKind: fb::DictionaryKind::DenseArray,
            },
        )
    });
    fb::Field::create(
        fbb,
        &fb::FieldArgs {
            name: Some(name),
            nullable: spec.nullable,
            type_type,
            type_: Some(type_),
            dictionary,
            children: Some(children),
            custom_metadata: None,
        },
    )
}

fn write_schema<'a>(fbb: &mut FlatBufferBuilder<'a>, fields: &[FieldSpec]) -> WIPOffset<fb::Schema<'a>> {
    let fb_fields: Vec<_> = fields.iter().map(|f| write_field(fbb, f)).collect();
    let fields_vec = fbb.create_vector(&fb_fields);
    fb::Schema::create(
        fbb,
        &fb::SchemaArgs {
            endianness: fb::Endianness::Little,
            fields: Some(fields_vec),
            custom_metadata: None,
            features: None,
        },
    )
}

// -------------------- Batches -------------------- //

/// One batch's nodes, buffer descriptors and body bytes.
#[derive(Debug, Clone, Default)]
pub(crate) struct BatchSpec {
    length: i64,
    nodes: Vec<(i64, i64)>,
    buffers: Vec<(i64, i64)>,
    body: Vec<u8>,
    compressed: bool,
}

impl BatchSpec {
    pub(crate) fn new(length: usize) -> Self {
        Self {
            length: length as i64,
            ..Default::default()
        }
    }

    pub(crate) fn node(mut self, length: usize, null_count: usize) -> Self {
        self.nodes.push((length as i64, null_count as i64));
        self
    }

    /// Raw descriptor, relative to the body start. The body is zero-filled to cover it.
    pub(crate) fn buffer(mut self, offset: usize, length: usize) -> Self {
        self.buffers.push((offset as i64, length as i64));
        self
    }

    /// Appends `bytes` at the next 8-byte boundary and records its descriptor.
    pub(crate) fn push(mut self, bytes: &[u8]) -> Self {
        let pad = align_8(self.body.len());
        self.body.extend(std::iter::repeat_n(0u8, pad));
        self.buffers.push((self.body.len() as i64, bytes.len() as i64));
        self.body.extend_from_slice(bytes);
        self
    }

    pub(crate) fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    pub(crate) fn body_len(&self) -> usize {
        let described = self
            .buffers
            .iter()
            .map(|&(o, l)| (o + l) as usize)
            .max()
            .unwrap_or(0);
        let len = described.max(self.body.len());
        len + align_8(len)
    }

    pub(crate) fn body(&self) -> Vec<u8> {
        let mut body = self.body.clone();
        body.resize(self.body_len(), 0);
        body
    }
}

fn write_record_batch<'a>(fbb: &mut FlatBufferBuilder<'a>, spec: &BatchSpec) -> WIPOffset<fb::RecordBatch<'a>> {
    let nodes: Vec<_> = spec.nodes.iter().map(|&(l, n)| fb::FieldNode::new(l, n)).collect();
    let buffers: Vec<_> = spec.buffers.iter().map(|&(o, l)| fb::Buffer::new(o, l)).collect();
    let nodes = fbb.create_vector(&nodes);
    let buffers = fbb.create_vector(&buffers);
    let compression = spec.compressed.then(|| {
        fb::BodyCompression::create(
            fbb,
            &fb::BodyCompressionArgs {
                codec: fb::CompressionType::LZ4_FRAME,
                method: fb::BodyCompressionMethod::BUFFER,
            },
        )
    });
    fb::RecordBatch::create(
        fbb,
        &fb::RecordBatchArgs {
            length: spec.length,
            nodes: Some(nodes),
            buffers: Some(buffers),
            compression,
            variadicBufferCounts: None,
        },
    )
}

fn finish_message(
    mut fbb: FlatBufferBuilder<'_>,
    header_type: fb::MessageHeader,
    header: WIPOffset<UnionWIPOffset>,
    body_len: usize,
) -> Vec<u8> {
    let msg = fb::Message::create(
        &mut fbb,
        &fb::MessageArgs {
            version: fb::MetadataVersion::V5,
            header_type,
            header: Some(header),
            bodyLength: body_len as i64,
            custom_metadata: None,
        },
    );
    fbb.finish(msg, None);
    fbb.finished_data().to_vec()
}

pub(crate) fn build_schema_message(fields: &[FieldSpec]) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let schema = write_schema(&mut fbb, fields);
    finish_message(fbb, fb::MessageHeader::Schema, schema.as_union_value(), 0)
}

pub(crate) fn build_record_batch_message(spec: &BatchSpec) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let rb = write_record_batch(&mut fbb, spec);
    finish_message(fbb, fb::MessageHeader::RecordBatch, rb.as_union_value(), spec.body_len())
}

pub(crate) fn build_dictionary_batch_message(id: i64, spec: &BatchSpec, is_delta: bool) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let rb = write_record_batch(&mut fbb, spec);
    let db = fb::DictionaryBatch::create(
        &mut fbb,
        &fb::DictionaryBatchArgs {
            id,
            data: Some(rb),
            isDelta: is_delta,
        },
    );
    finish_message(fbb, fb::MessageHeader::DictionaryBatch, db.as_union_value(), spec.body_len())
}

/// Prefix, metadata padded so the body starts 8-byte aligned, then the body.
pub(crate) fn frame_message(meta: &[u8], body: &[u8], framing: Framing) -> Vec<u8> {
    let prefix_len = match framing {
        Framing::Legacy => 4,
        Framing::Continuation => 8,
    };
    let padded = meta.len() + align_8(prefix_len + meta.len());
    let mut out = Vec::with_capacity(prefix_len + padded + body.len());
    if framing == Framing::Continuation {
        out.extend_from_slice(&CONTINUATION_SENTINEL.to_le_bytes());
    }
    out.extend_from_slice(&(padded as i32).to_le_bytes());
    out.extend_from_slice(meta);
    out.resize(prefix_len + padded, 0);
    out.extend_from_slice(body);
    out
}

fn end_of_stream(framing: Framing) -> Vec<u8> {
    match framing {
        Framing::Legacy => 0u32.to_le_bytes().to_vec(),
        Framing::Continuation => {
            let mut eos = CONTINUATION_SENTINEL.to_le_bytes().to_vec();
            eos.extend_from_slice(&0u32.to_le_bytes());
            eos
        }
    }
}

// -------------------- Whole buffers -------------------- //

/// Schema, dictionaries and batches of one fixture buffer.
#[derive(Debug, Clone)]
pub(crate) struct IpcFixture {
    fields: Vec<FieldSpec>,
    dictionaries: Vec<(i64, BatchSpec, bool)>,
    batches: Vec<BatchSpec>,
}

impl IpcFixture {
    pub(crate) fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            dictionaries: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub(crate) fn dictionary(mut self, id: i64, spec: BatchSpec) -> Self {
        self.dictionaries.push((id, spec, false));
        self
    }

    pub(crate) fn delta_dictionary(mut self, id: i64, spec: BatchSpec) -> Self {
        self.dictionaries.push((id, spec, true));
        self
    }

    pub(crate) fn batch(mut self, spec: BatchSpec) -> Self {
        self.batches.push(spec);
        self
    }

    fn dictionary_frames(&self, framing: Framing) -> Vec<Vec<u8>> {
        self.dictionaries
            .iter()
            .map(|(id, spec, delta)| {
                frame_message(&build_dictionary_batch_message(*id, spec, *delta), &spec.body(), framing)
            })
            .collect()
    }

    fn batch_frames(&self, framing: Framing) -> Vec<Vec<u8>> {
        self.batches
            .iter()
            .map(|spec| frame_message(&build_record_batch_message(spec), &spec.body(), framing))
            .collect()
    }

    /// Stream layout: schema, dictionaries, batches, end-of-stream marker.
    pub(crate) fn stream(&self, framing: Framing) -> Vec<u8> {
        let mut out = frame_message(&build_schema_message(&self.fields), &[], framing);
        out.extend(self.stream_without_schema(framing));
        out
    }

    pub(crate) fn stream_without_schema(&self, framing: Framing) -> Vec<u8> {
        let mut out = Vec::new();
        for frame in self.dictionary_frames(framing) {
            out.extend_from_slice(&frame);
        }
        for frame in self.batch_frames(framing) {
            out.extend_from_slice(&frame);
        }
        out.extend_from_slice(&end_of_stream(framing));
        out
    }

    /// File layout with a footer indexing every dictionary and batch.
    pub(crate) fn file(&self) -> Vec<u8> {
        self.file_impl(false)
    }

    /// File layout whose footer lists record batches as dictionaries and vice versa.
    pub(crate) fn file_with_swapped_blocks(&self) -> Vec<u8> {
        self.file_impl(true)
    }

    fn file_impl(&self, swap_blocks: bool) -> Vec<u8> {
        let mut out = ARROW_MAGIC_NUMBER_PADDED.to_vec();
        out.extend(frame_message(&build_schema_message(&self.fields), &[], Framing::Continuation));

        let dict_frames = self
            .dictionary_frames(Framing::Continuation)
            .into_iter()
            .zip(self.dictionaries.iter().map(|(_, spec, _)| spec.body_len()))
            .collect();
        let batch_frames = self
            .batch_frames(Framing::Continuation)
            .into_iter()
            .zip(self.batches.iter().map(BatchSpec::body_len))
            .collect();
        let mut dict_blocks = place_blocks(dict_frames, &mut out);
        let mut batch_blocks = place_blocks(batch_frames, &mut out);
        out.extend(end_of_stream(Framing::Continuation));
        if swap_blocks {
            std::mem::swap(&mut dict_blocks, &mut batch_blocks);
        }

        let mut fbb = FlatBufferBuilder::new();
        let schema = write_schema(&mut fbb, &self.fields);
        let dictionaries = fbb.create_vector(&dict_blocks);
        let record_batches = fbb.create_vector(&batch_blocks);
        let footer = fb::Footer::create(
            &mut fbb,
            &fb::FooterArgs {
                version: fb::MetadataVersion::V5,
                schema: Some(schema),
                dictionaries: Some(dictionaries),
                recordBatches: Some(record_batches),
                custom_metadata: None,
            },
        );
        fbb.finish(footer, None);
        let footer = fbb.finished_data();

        out.extend_from_slice(footer);
        out.extend_from_slice(&(footer.len() as i32).to_le_bytes());
        out.extend_from_slice(ARROW_MAGIC_NUMBER);
        out
    }
}

/// Appends each frame to `out` and returns its footer block.
fn place_blocks(frames: Vec<(Vec<u8>, usize)>, out: &mut Vec<u8>) -> Vec<fb::Block> {
    frames
        .into_iter()
        .map(|(frame, body_len)| {
            let offset = out.len();
            out.extend_from_slice(&frame);
            fb::Block::new(offset as i64, (frame.len() - body_len) as i32, body_len as i64)
        })
        .collect()
}

// -------------------- Buffer contents -------------------- //

pub(crate) fn i32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn i64_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn f64_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn offsets_bytes(offsets: &[i32]) -> Vec<u8> {
    i32_bytes(offsets)
}

pub(crate) fn validity_bytes(valid: &[bool]) -> Vec<u8> {
    pack_bits(valid.iter().copied(), valid.len())
}

/// Offsets and data buffers for a list of strings.
pub(crate) fn utf8_buffers(values: &[&str]) -> (Vec<u8>, Vec<u8>) {
    let mut offsets = vec![0i32];
    let mut data = Vec::new();
    for v in values {
        data.extend_from_slice(v.as_bytes());
        offsets.push(data.len() as i32);
    }
    (offsets_bytes(&offsets), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_bits_lsb_first() {
        assert_eq!(pack_bits([true, false, true].into_iter(), 3), vec![0b0000_0101]);
        assert_eq!(validity_bytes(&[false; 9]), vec![0, 0]);
        assert_eq!(align_8(13), 3);
        assert_eq!(align_8(16), 0);
    }
}
