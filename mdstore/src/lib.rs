//! Reader for a proprietary per-instrument market-data block-chain file
//! format: a fixed-size header (instrument table) followed by singly-linked
//! chains of fixed-size blocks, each chain holding one instrument's
//! sequence of fixed-width records (`Day`, `Minute`, `HisMin`, `Bargain`).
//!
//! [`Store`] is the entry point: open a file, look up an instrument by id,
//! and pull its decoded records lazily off a [`RecordStream`].

pub mod block;
pub mod chain;
pub mod error;
pub mod header;
pub mod record;
pub mod store;
pub mod stream;
pub mod xint32;

pub use error::{Result, StoreError};
pub use header::FormatVersion;
pub use record::{Bargain, Day, HisMin, Minute, OrderCounts, RecordCodec};
pub use store::{InstrumentInfo, Store};
pub use stream::RecordStream;
pub use xint32::XInt32Field;
