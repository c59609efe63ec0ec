//! Walks the singly-linked chain of fixed-size blocks that backs one
//! instrument's records.
//!
//! Each block begins with a 4-byte little-endian `next_block_id`; the chain
//! ends when that field exceeds the instrument's `block_last`. The walker
//! yields raw payload byte ranges (one per block) lazily, one `read_at` per
//! `next()` call, so a caller scanning many instruments never has to hold
//! more than one block in memory at a time.

use std::sync::Arc;

use crate::block::BlockIo;
use crate::error::Result;
use crate::error::StoreError;
use crate::header::InstrumentEntry;

pub struct ChainWalker {
    io: Arc<BlockIo>,
    block_size: u64,
    record_size: u64,
    records_per_block: u64,
    total_blocks: u64,
    block_last: u32,
    data_num: u32,
    id: u32,
    current_block: u32,
    index: u64,
    bytes_yielded: u64,
    stopped_early: bool,
    error_emitted: bool,
}

impl ChainWalker {
    pub fn new(
        io: Arc<BlockIo>,
        block_size: u64,
        record_size: u64,
        id: u32,
        entry: &InstrumentEntry,
    ) -> Self {
        let records_per_block = (block_size - 4) / record_size;
        let total_blocks = if entry.data_num == 0 {
            0
        } else {
            let n = entry.data_num as u64;
            (n + records_per_block - 1) / records_per_block
        };

        log::debug!(
            "walking chain for instrument {id}: data_num={}, block_first={}, block_last={}, total_blocks={total_blocks}",
            entry.data_num,
            entry.block_first,
            entry.block_last,
        );

        ChainWalker {
            io,
            block_size,
            record_size,
            records_per_block,
            total_blocks,
            block_last: entry.block_last,
            data_num: entry.data_num,
            id,
            current_block: entry.block_first,
            index: 0,
            bytes_yielded: 0,
            stopped_early: false,
            error_emitted: false,
        }
    }

    fn stop_early(&mut self) -> Option<Result<Vec<u8>>> {
        self.stopped_early = true;
        self.index = self.total_blocks;
        if self.error_emitted {
            return None;
        }
        self.error_emitted = true;
        let walked = (self.bytes_yielded / self.record_size) as u32;
        log::debug!(
            "chain for instrument {} terminated early at block {}: expected {} records, walked {walked}",
            self.id,
            self.current_block,
            self.data_num,
        );
        Some(Err(StoreError::CorruptChain {
            id: self.id,
            expected: self.data_num,
            walked,
        }))
    }
}

impl Iterator for ChainWalker {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total_blocks {
            return None;
        }

        let offset = self.current_block as u64 * self.block_size;
        let file_size = match self.io.file_size() {
            Ok(s) => s,
            Err(e) => {
                self.index = self.total_blocks;
                return Some(Err(e));
            }
        };
        if offset >= file_size {
            return self.stop_early();
        }

        let next_id_bytes = match self.io.read_at(offset, 4) {
            Ok(b) => b,
            Err(e) => {
                self.index = self.total_blocks;
                return Some(Err(e));
            }
        };
        let next_id = u32::from_le_bytes(next_id_bytes.try_into().unwrap());
        let is_last = self.index + 1 == self.total_blocks;

        // A block's own next_block_id exceeding block_last is the normal
        // termination convention on the final block, not corruption. Only
        // a block before the last one ending the chain early is an error.
        if !is_last && next_id > self.block_last {
            return self.stop_early();
        }

        let payload_records = if is_last {
            let rem = (self.data_num as u64) % self.records_per_block;
            if rem == 0 {
                self.records_per_block
            } else {
                rem
            }
        } else {
            self.records_per_block
        };
        let payload_len = (payload_records * self.record_size) as usize;

        log::trace!(
            "instrument {} block {}/{}: block_id={}, next_block_id={next_id}, payload_len={payload_len}",
            self.id,
            self.index + 1,
            self.total_blocks,
            self.current_block,
        );

        let payload = match self.io.read_at(offset + 4, payload_len) {
            Ok(p) => p,
            Err(e) => {
                self.index = self.total_blocks;
                return Some(Err(e));
            }
        };

        self.bytes_yielded += payload.len() as u64;
        self.current_block = next_id;
        self.index += 1;
        Some(Ok(payload))
    }
}
