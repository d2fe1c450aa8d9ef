//! # columnar-ipc
//!
//! Zero-copy decoding of Arrow IPC buffers into typed, randomly accessible
//! column vectors.
//!
//! Both container layouts are supported and detected automatically:
//! sequential *stream* buffers and footer-indexed *file* buffers. Opening a
//! [`Reader`] parses the schema, builds one [`Vector`] per column and loads
//! every dictionary. Record batches are then bound on demand with
//! [`Reader::load_next_batch`].
//!
//! ```no_run
//! # fn main() -> Result<(), columnar_ipc::IpcError> {
//! use columnar_ipc::{BatchState, Reader};
//!
//! let mut reader = Reader::from_path("trades.arrow")?;
//! while reader.state() != BatchState::Exhausted {
//!     reader.load_next_batch()?;
//!     let price = reader.vector("price").expect("price column");
//!     println!("{:?}", price.slice(0, 5));
//! }
//! # Ok(())
//! # }
//! ```

pub mod models {
    pub mod decoders {
        pub mod ipc {
            pub mod loader;
            pub mod parser;
            pub mod protocol;
        }
    }
    pub mod frames {
        pub mod ipc_message;
    }
    pub mod readers {
        pub mod ipc {
            pub mod file_reader;
            pub mod reader;
            pub mod stream_reader;
        }
    }
    #[cfg(feature = "table")]
    pub mod sinks {
        pub mod table_sink;
    }
    pub mod types {
        pub mod field;
        pub mod schema;
    }
    pub mod vectors;
    pub mod bitarray;
    pub mod buffer;
}

pub mod constants;
pub mod enums;
pub mod error;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use minarrow::SharedBuffer;

pub use crate::enums::{BatchState, BufferKind, IPCMessageProtocol};
pub use crate::error::{IpcError, IpcResult};
pub use crate::models::bitarray::BitArray;
pub use crate::models::readers::ipc::reader::{
    Reader, ReaderOptions, open_reader, open_reader_with, parse_schema,
};
pub use crate::models::types::field::{DataType, FieldDesc};
pub use crate::models::types::schema::SchemaField;
pub use crate::models::vectors::{Value, Vector, VectorKind};
