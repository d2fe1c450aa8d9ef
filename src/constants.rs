// --- Constants for IPC format ---

pub const ARROW_MAGIC_NUMBER: &[u8] = b"ARROW1"; // opening and closing magic
pub const ARROW_MAGIC_NUMBER_PADDED: &[u8] = b"ARROW1\0\0"; // opening magic as written by modern writers
pub const MAGIC_LEN: usize = 6;
pub const FOOTER_SIZE_PREFIX: usize = 4; // 4 bytes - <footer_size: int32>
pub const METADATA_SIZE_PREFIX: usize = 4; // 4 bytes - <metadata_size: int32>
pub const CONTINUATION_MARKER_LEN: usize = 4; // 4 bytes - <continuation: 0xFFFFFFFF>
pub const CONTINUATION_SENTINEL: u32 = 0xFFFF_FFFF;

/// Smallest buffer that can hold a file layout: both magics plus the footer size.
pub const MIN_FILE_LEN: usize = MAGIC_LEN * 2 + FOOTER_SIZE_PREFIX;

/// Dictionary index type when a `DictionaryEncoding` omits one.
pub const DEFAULT_DICTIONARY_INDEX_BIT_WIDTH: i32 = 32;

pub const MILLIS_PER_DAY: i64 = 86_400_000;
