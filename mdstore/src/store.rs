//! The top-level facade: open a file, look up instruments, and stream
//! their records. `Store<R>` is generic over the record kind so the
//! block-chain walking and reassembly logic is written once and
//! monomorphized per [`RecordCodec`](crate::record::RecordCodec), rather
//! than dispatched at runtime through an enum of record kinds.

use std::path::Path;
use std::sync::Arc;

use crate::block::BlockIo;
use crate::chain::ChainWalker;
use crate::error::{Result, StoreError};
use crate::header::{FormatVersion, Header, InstrumentEntry};
use crate::record::RecordCodec;
use crate::stream::RecordStream;

/// A handle on one instrument's slot in the header table.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentInfo {
    pub id: u32,
    pub data_num: u32,
    pub block_first: u32,
    pub block_last: u32,
}

impl From<(u32, &InstrumentEntry)> for InstrumentInfo {
    fn from((id, e): (u32, &InstrumentEntry)) -> Self {
        InstrumentInfo {
            id,
            data_num: e.data_num,
            block_first: e.block_first,
            block_last: e.block_last,
        }
    }
}

pub struct Store<R: RecordCodec> {
    io: Arc<BlockIo>,
    header: Header,
    _marker: std::marker::PhantomData<R>,
}

impl<R: RecordCodec> Store<R> {
    /// Open an existing file read-only (or read-write if `writable`) and
    /// parse its header.
    pub fn open(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
        let io = BlockIo::open(path.as_ref(), writable)?;
        let header_bytes = io.read_at(0, crate::header::HEADER_SIZE)?;
        let header = Header::decode(&header_bytes)?;
        Ok(Store {
            io: Arc::new(io),
            header,
            _marker: std::marker::PhantomData,
        })
    }

    /// Create a new, empty file with a zeroed header of the given format
    /// version.
    pub fn create(path: impl AsRef<Path>, version: FormatVersion) -> Result<Self> {
        let io = BlockIo::open(path.as_ref(), true)?;
        let header = Header::zeroed(version);
        io.write_at(0, &header.encode())?;
        Ok(Store {
            io: Arc::new(io),
            header,
            _marker: std::marker::PhantomData,
        })
    }

    /// Number of instruments with a non-zero `goods_id` in the table.
    pub fn len(&self) -> usize {
        self.header.goods_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: u32) -> bool {
        self.header.goods_index().iter().any(|(gid, _)| *gid == id)
    }

    /// All instrument ids present in the table, in table order.
    pub fn ids(&self) -> Vec<u32> {
        self.header.goods_index().into_iter().map(|(id, _)| id).collect()
    }

    fn entry_for(&self, id: u32) -> Result<&InstrumentEntry> {
        self.header
            .goods_index()
            .into_iter()
            .find(|(gid, _)| *gid == id)
            .map(|(_, idx)| &self.header.table[idx])
            .ok_or(StoreError::NotFound { id })
    }

    pub fn info(&self, id: u32) -> Result<InstrumentInfo> {
        self.entry_for(id).map(|e| InstrumentInfo::from((id, e)))
    }

    /// A lazy stream of this instrument's records, walking the block chain
    /// on demand.
    pub fn get(&self, id: u32) -> Result<RecordStream<R, ChainWalker>> {
        let entry = self.entry_for(id)?;
        let walker = ChainWalker::new(
            Arc::clone(&self.io),
            self.header.block_size(),
            R::SIZE as u64,
            id,
            entry,
        );
        Ok(RecordStream::new(walker, id))
    }

    /// Every instrument's records, as `(id, stream)` pairs in table order.
    pub fn items(&self) -> Vec<(u32, RecordStream<R, ChainWalker>)> {
        self.header
            .goods_index()
            .into_iter()
            .map(|(id, idx)| {
                let entry = &self.header.table[idx];
                let walker = ChainWalker::new(
                    Arc::clone(&self.io),
                    self.header.block_size(),
                    R::SIZE as u64,
                    id,
                    entry,
                );
                (id, RecordStream::new(walker, id))
            })
            .collect()
    }

    pub fn append(&mut self, _id: u32, _record: &R) -> Result<()> {
        Err(StoreError::Unsupported { operation: "append" })
    }

    pub fn set(&mut self, _id: u32, _index: usize, _record: &R) -> Result<()> {
        Err(StoreError::Unsupported { operation: "set" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Day;
    use crate::xint32::XInt32Field;
    use tempfile::NamedTempFile;

    fn sample_day(time: u32) -> Day {
        Day {
            time,
            open: 100,
            high: 110,
            low: 90,
            close: 105,
            tradenum: 42,
            volume: XInt32Field::from_value(1000).unwrap(),
            amount: XInt32Field::from_value(50_000).unwrap(),
            neipan: XInt32Field::from_value(0).unwrap(),
            buy: 1,
            sell: 1,
            volbuy: [XInt32Field::from_value(0).unwrap(); 3],
            volsell: [XInt32Field::from_value(0).unwrap(); 3],
            amtbuy: [XInt32Field::from_value(0).unwrap(); 3],
            amtsell: [XInt32Field::from_value(0).unwrap(); 3],
            rise: 1,
            fall: 0,
            reserve: 0,
        }
    }

    fn write_block(io: &BlockIo, block_size: u64, block_id: u32, next_id: u32, payload: &[u8]) {
        let offset = block_id as u64 * block_size;
        let mut buf = vec![0u8; block_size as usize];
        buf[0..4].copy_from_slice(&next_id.to_le_bytes());
        buf[4..4 + payload.len()].copy_from_slice(payload);
        io.write_at(offset, &buf).unwrap();
    }

    #[test]
    fn create_yields_an_empty_store() {
        let tmp = NamedTempFile::new().unwrap();
        let store: Store<Day> = Store::create(tmp.path(), FormatVersion::V1).unwrap();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(!store.contains(1));
    }

    #[test]
    fn open_reads_back_a_created_file() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let _store: Store<Day> = Store::create(tmp.path(), FormatVersion::V1).unwrap();
        }
        let store: Store<Day> = Store::open(tmp.path(), false).unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn opening_a_nonexistent_instrument_errors() {
        let tmp = NamedTempFile::new().unwrap();
        let store: Store<Day> = Store::create(tmp.path(), FormatVersion::V1).unwrap();
        assert!(matches!(store.get(99), Err(StoreError::NotFound { id: 99 })));
    }

    #[test]
    fn single_instrument_end_to_end() {
        let tmp = NamedTempFile::new().unwrap();
        let block_size = 8192u64;
        let records: Vec<Day> = (0..5).map(sample_day).collect();
        let mut bytes = Vec::new();
        for r in &records {
            bytes.extend_from_slice(&r.encode());
        }

        let mut header = Header::zeroed(FormatVersion::V1);
        header.info.goods_num = 1;
        // Blocks 0..127 are the header's own address space (1,048,576 / 8192
        // = 128); real data starts at block 128.
        let first_data_block = 128u32;
        header.table[0] = InstrumentEntry {
            goods_id: 7,
            data_num: records.len() as u32,
            block_first: first_data_block,
            block_data: first_data_block,
            block_last: first_data_block,
            data_last_idx: records.len() as u32 - 1,
            code: *b"600000.SH\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
        };

        let io = BlockIo::open(tmp.path(), true).unwrap();
        io.write_at(0, &header.encode()).unwrap();
        // sentinel: next_block_id (129) > block_last (128) ends the chain.
        write_block(&io, block_size, first_data_block, first_data_block + 1, &bytes);

        let store: Store<Day> = Store::open(tmp.path(), false).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains(7));
        let got: Vec<Day> = store.get(7).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(got, records);
    }

    #[test]
    fn append_and_set_are_unsupported() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store: Store<Day> = Store::create(tmp.path(), FormatVersion::V1).unwrap();
        let record = sample_day(1);
        assert!(matches!(
            store.append(1, &record),
            Err(StoreError::Unsupported { .. })
        ));
        assert!(matches!(
            store.set(1, 0, &record),
            Err(StoreError::Unsupported { .. })
        ));
    }
}
