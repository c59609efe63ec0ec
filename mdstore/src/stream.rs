//! Reassembles the byte chunks a block-chain walker yields into decoded
//! records, carrying the tail of one chunk over into the next when a
//! record straddles a block boundary (`block_size - 4` is not in general a
//! multiple of the record size).
//!
//! Generic over the chunk source so the reassembly logic can be tested
//! against a plain `Vec` iterator without standing up a real block-chain
//! file, and so [`ChainWalker`](crate::chain::ChainWalker) stays a thin,
//! single-purpose producer.

use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::error::{Result, StoreError};
use crate::record::RecordCodec;

pub struct RecordStream<R: RecordCodec, I: Iterator<Item = Result<Vec<u8>>>> {
    chunks: I,
    carry: Vec<u8>,
    pending: VecDeque<R>,
    id: u32,
    done: bool,
    _marker: PhantomData<R>,
}

impl<R: RecordCodec, I: Iterator<Item = Result<Vec<u8>>>> RecordStream<R, I> {
    pub fn new(chunks: I, id: u32) -> Self {
        RecordStream {
            chunks,
            carry: Vec::new(),
            pending: VecDeque::new(),
            id,
            done: false,
            _marker: PhantomData,
        }
    }

    fn consume_chunk(&mut self, chunk: Vec<u8>) {
        let size = R::SIZE;
        let mut offset = 0usize;

        if !self.carry.is_empty() {
            let need = size - self.carry.len();
            let take = need.min(chunk.len());
            self.carry.extend_from_slice(&chunk[..take]);
            offset = take;
            if self.carry.len() == size {
                let record = R::decode(&self.carry)
                    .expect("carry buffer is always exactly one record long");
                self.pending.push_back(record);
                self.carry.clear();
            }
        }

        while offset + size <= chunk.len() {
            let record = R::decode(&chunk[offset..offset + size])
                .expect("chunk slice is always exactly one record long");
            self.pending.push_back(record);
            offset += size;
        }

        if offset < chunk.len() {
            self.carry.extend_from_slice(&chunk[offset..]);
        }
    }
}

impl<R: RecordCodec, I: Iterator<Item = Result<Vec<u8>>>> Iterator for RecordStream<R, I> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            match self.chunks.next() {
                None => {
                    self.done = true;
                    if !self.carry.is_empty() {
                        let residue = self.carry.len();
                        self.carry.clear();
                        log::debug!(
                            "instrument {} ended with {residue} leftover carry byte(s)",
                            self.id
                        );
                        return Some(Err(StoreError::ResidualBytes { id: self.id, residue }));
                    }
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(chunk)) => self.consume_chunk(chunk),
            }
        }
    }
}
