//! # Reader
//!
//! Facade over a fully resident IPC buffer.
//!
//! Opening a reader detects the container layout, parses the schema, builds
//! the vector tree, loads every dictionary and checks that every record batch
//! binds cleanly. Record batches are then bound one at a time with
//! [`Reader::load_next_batch`]. All vectors view the same shared input
//! buffer; no payload bytes are copied.
//!
//! ## Example
//! ```no_run
//! use columnar_ipc::{BatchState, open_reader};
//!
//! # fn main() -> Result<(), columnar_ipc::IpcError> {
//! let bytes = std::fs::read("data.arrow")?;
//! let mut reader = open_reader(bytes)?;
//! while reader.state() != BatchState::Exhausted {
//!     reader.load_next_batch()?;
//!     if let Some(v) = reader.vector("price") {
//!         println!("{:?}", v.get(0));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use minarrow::SharedBuffer;

use crate::enums::{BatchState, IPCMessageProtocol};
use crate::error::{IpcError, IpcResult};
use crate::models::decoders::ipc::loader::{
    check_record_batches, load_dictionary_batch, load_record_batch,
};
use crate::models::decoders::ipc::protocol::MessageFramer;
use crate::models::frames::ipc_message::{FramedMessage, IpcContents, RecordBatchData};
use crate::models::readers::ipc::file_reader::{is_file_layout, parse_footer, read_file};
use crate::models::readers::ipc::stream_reader::read_stream;
use crate::models::types::field::FieldDesc;
use crate::models::types::schema::SchemaField;
use crate::models::vectors::Vector;
use crate::models::vectors::dictionary::DictionaryRegistry;
use crate::models::vectors::factory::build_vectors;

/// Reader settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Treat field nodes or buffers left over after a batch load as a format
    /// error instead of logging a warning.
    pub strict_buffer_accounting: bool,
}

/// Random-access reader over one IPC buffer.
pub struct Reader {
    data: SharedBuffer,
    protocol: IPCMessageProtocol,
    options: ReaderOptions,
    fields: Vec<Arc<FieldDesc>>,
    vectors: Vec<Vector>,
    registry: DictionaryRegistry,
    batches: Vec<RecordBatchData>,
    batch_index: usize,
}

/// Opens a reader with default options, detecting the container layout.
///
/// Accepts anything convertible to a `minarrow::SharedBuffer`, such as a
/// `Vec<u8>`. Wrap other owners (an `Arc<[u8]>`, a memory map) with
/// `SharedBuffer::from_owner`.
pub fn open_reader(buffer: impl Into<SharedBuffer>) -> IpcResult<Reader> {
    Reader::open(buffer)
}

/// Opens a reader with explicit options.
pub fn open_reader_with(buffer: impl Into<SharedBuffer>, options: ReaderOptions) -> IpcResult<Reader> {
    Reader::open_with(buffer, options)
}

/// Parses only the schema of a buffer. No batch metadata or data is touched.
pub fn parse_schema(buf: &[u8]) -> IpcResult<Vec<SchemaField>> {
    let fields = if is_file_layout(buf) {
        parse_footer(buf)?.fields
    } else {
        match MessageFramer::new(buf, 0).next_message()? {
            FramedMessage::Schema(fields) => fields,
            other => {
                return Err(IpcError::format(format!(
                    "stream must open with a Schema message, found {:?}",
                    other.message_type()
                )));
            }
        }
    };
    Ok(fields.iter().map(|f| SchemaField::from(f.as_ref())).collect())
}

impl Reader {
    pub fn open(buffer: impl Into<SharedBuffer>) -> IpcResult<Self> {
        Self::open_with(buffer, ReaderOptions::default())
    }

    pub fn open_with(buffer: impl Into<SharedBuffer>, options: ReaderOptions) -> IpcResult<Self> {
        let data: SharedBuffer = buffer.into();
        let contents = if is_file_layout(&data) {
            debug!("Opening {} byte buffer as file layout", data.len());
            read_file(&data)?
        } else {
            debug!("Opening {} byte buffer as stream layout", data.len());
            read_stream(&data)?
        };
        let IpcContents {
            protocol,
            fields,
            dictionaries,
            batches,
        } = contents;

        let mut registry = DictionaryRegistry::new();
        let vectors = build_vectors(&fields, &mut registry)?;
        for dict in &dictionaries {
            load_dictionary_batch(&mut registry, dict, &data, options.strict_buffer_accounting)?;
        }
        check_record_batches(&vectors, &batches, &data, options.strict_buffer_accounting)?;
        debug!(
            "Reader ready: {} columns, {} dictionaries, {} batches",
            vectors.len(),
            registry.len(),
            batches.len()
        );

        Ok(Self {
            data,
            protocol,
            options,
            fields,
            vectors,
            registry,
            batches,
            batch_index: 0,
        })
    }

    /// Reads a whole file into memory and opens it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> IpcResult<Self> {
        let mut file = File::open(&path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Self::open(SharedBuffer::from_vec(buf))
    }

    /// Binds the next batch to the vectors and returns its row count.
    ///
    /// Returns 0 once every batch has been served, without touching the
    /// vectors. Calling again after that keeps returning 0. A zero-row batch
    /// also returns 0 but advances the cursor; use [`Reader::state`] to tell
    /// the two apart.
    ///
    /// The batch is bound into a copy of the vector tree that replaces the
    /// current one only once the whole batch has bound.
    pub fn load_next_batch(&mut self) -> IpcResult<usize> {
        let Some(batch) = self.batches.get(self.batch_index) else {
            return Ok(0);
        };
        let mut staged = self.vectors.clone();
        let rows = load_record_batch(
            &mut staged,
            batch,
            &self.data,
            self.options.strict_buffer_accounting,
        )?;
        self.vectors = staged;
        debug!("Loaded batch {} ({} rows)", self.batch_index, rows);
        self.batch_index += 1;
        Ok(rows)
    }

    /// Schema summary, in column order.
    pub fn schema(&self) -> Vec<SchemaField> {
        self.fields.iter().map(|f| SchemaField::from(f.as_ref())).collect()
    }

    /// Field trees, in column order.
    pub fn fields(&self) -> &[Arc<FieldDesc>] {
        &self.fields
    }

    /// Top-level vector for the column named `name`.
    pub fn vector(&self, name: &str) -> Option<&Vector> {
        self.vectors.iter().find(|v| v.name() == name)
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    pub fn dictionaries(&self) -> &DictionaryRegistry {
        &self.registry
    }

    #[inline]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Index of the batch the next `load_next_batch` call will load.
    #[inline]
    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    /// Moves the cursor so the next load reads batch `index`. Setting it to
    /// `batch_count()` exhausts the reader.
    pub fn set_batch_index(&mut self, index: usize) -> IpcResult<()> {
        if index > self.batches.len() {
            return Err(IpcError::out_of_bounds(format!(
                "batch index {index} past {} batches",
                self.batches.len()
            )));
        }
        self.batch_index = index;
        Ok(())
    }

    pub fn state(&self) -> BatchState {
        if self.batch_index < self.batches.len() {
            BatchState::Ready(self.batch_index)
        } else {
            BatchState::Exhausted
        }
    }

    pub fn protocol(&self) -> IPCMessageProtocol {
        self.protocol
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// Copies the most recently loaded batch into a `minarrow::Table`.
    #[cfg(feature = "table")]
    pub fn to_table(&self) -> IpcResult<minarrow::Table> {
        let n_rows = self.vectors.first().map_or(0, Vector::len);
        crate::models::sinks::table_sink::vectors_to_table(&self.vectors, n_rows, "batch")
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("bytes", &self.data.len())
            .field("protocol", &self.protocol)
            .field("options", &self.options)
            .field("columns", &self.vectors.len())
            .field("dictionaries", &self.registry.len())
            .field("batches", &self.batches.len())
            .field("batch_index", &self.batch_index)
            .finish()
    }
}
