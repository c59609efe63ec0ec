use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error at offset 0x{offset:X} ({context}): {source}")]
    IoAtOffset {
        offset: u64,
        context: &'static str,
        source: std::io::Error,
    },

    #[error("read past end of file at offset 0x{offset:X}: requested {len} bytes, file is {file_size} bytes")]
    ReadPastEof {
        offset: u64,
        len: u64,
        file_size: u64,
    },

    #[error("bad magic at offset 0: expected \"EM_DataFile\" or \"EM_DataFile2\", got {got:?}")]
    BadMagic { got: [u8; 12] },

    #[error("goods_num {got} exceeds the maximum instrument table size ({max})")]
    GoodsNumOutOfRange { got: u32, max: u32 },

    #[error("header is truncated: expected {expected} bytes, got {got}")]
    ShortHeader { expected: usize, got: usize },

    #[error("{kind} record has the wrong length: expected {expected} bytes, got {got}")]
    ShortRecord {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("instrument {id} not found")]
    NotFound { id: u32 },

    #[error("chain for instrument {id} terminated early at sentinel: expected {expected} records, walked {walked}")]
    CorruptChain {
        id: u32,
        expected: u32,
        walked: u32,
    },

    #[error("record stream for instrument {id} ended with {residue} leftover byte(s) (expected a clean multiple of the record size)")]
    ResidualBytes { id: u32, residue: usize },

    #[error("value {value} has no XInt32 representation (magnitude too large for a 29-bit mantissa at any of the 8 exponents)")]
    Encode { value: i64 },

    #[error("{operation} is not supported: on-disk block allocation semantics for this format are not specified")]
    Unsupported { operation: &'static str },
}

pub type Result<T> = std::result::Result<T, StoreError>;
