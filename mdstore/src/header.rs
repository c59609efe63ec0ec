//! The fixed-size file header: a 256-byte info segment followed by a
//! 48-byte-per-slot instrument table with room for [`MAX_GOODS`] entries.

use crate::error::{Result, StoreError};

/// Magic bytes for the 8192-byte-block format.
pub const MAGIC_V1: &[u8] = b"EM_DataFile";
/// Magic bytes for the 65536-byte-block format.
pub const MAGIC_V2: &[u8] = b"EM_DataFile2";

const MAGIC_FIELD_LEN: usize = 32;
const MAGIC_COMPARE_LEN: usize = 12;
const INFO_SIZE: usize = 256;
const INFO_RESERVED_LEN: usize = 208;
const GOODS_SIZE: usize = 48;
const CODE_LEN: usize = 24;

/// Maximum number of instrument-table slots.
pub const MAX_GOODS: usize = 21_840;

/// Total header size in bytes: `256 + 48 * 21840`.
pub const HEADER_SIZE: usize = INFO_SIZE + GOODS_SIZE * MAX_GOODS;

/// Block size selected by the header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1,
    V2,
}

impl FormatVersion {
    pub fn block_size(self) -> u64 {
        match self {
            FormatVersion::V1 => 8192,
            FormatVersion::V2 => 65536,
        }
    }

    pub fn magic(self) -> &'static [u8] {
        match self {
            FormatVersion::V1 => MAGIC_V1,
            FormatVersion::V2 => MAGIC_V2,
        }
    }

    fn from_magic(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(MAGIC_V2) {
            Ok(FormatVersion::V2)
        } else if bytes.starts_with(MAGIC_V1) {
            Ok(FormatVersion::V1)
        } else {
            let mut got = [0u8; MAGIC_COMPARE_LEN];
            got.copy_from_slice(&bytes[..MAGIC_COMPARE_LEN]);
            Err(StoreError::BadMagic { got })
        }
    }
}

/// The 256-byte info segment.
#[derive(Debug, Clone)]
pub struct Info {
    pub header: [u8; MAGIC_FIELD_LEN],
    pub version: u32,
    pub blocks_total: u32,
    pub blocks_use: u32,
    pub goods_num: u32,
    pub reserved: [u8; INFO_RESERVED_LEN],
}

impl Info {
    fn decode(bytes: &[u8]) -> Self {
        let mut header = [0u8; MAGIC_FIELD_LEN];
        header.copy_from_slice(&bytes[0..32]);
        let version = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        let blocks_total = u32::from_le_bytes(bytes[36..40].try_into().unwrap());
        let blocks_use = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        let goods_num = u32::from_le_bytes(bytes[44..48].try_into().unwrap());
        let mut reserved = [0u8; INFO_RESERVED_LEN];
        reserved.copy_from_slice(&bytes[48..256]);
        Info {
            header,
            version,
            blocks_total,
            blocks_use,
            goods_num,
            reserved,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.blocks_total.to_le_bytes());
        out.extend_from_slice(&self.blocks_use.to_le_bytes());
        out.extend_from_slice(&self.goods_num.to_le_bytes());
        out.extend_from_slice(&self.reserved);
    }

    fn zeroed(version: FormatVersion) -> Self {
        let mut header = [0u8; MAGIC_FIELD_LEN];
        let magic = version.magic();
        header[..magic.len()].copy_from_slice(magic);
        Info {
            header,
            version: 0,
            blocks_total: 0,
            blocks_use: 0,
            goods_num: 0,
            reserved: [0u8; INFO_RESERVED_LEN],
        }
    }
}

/// One 48-byte instrument-table slot.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentEntry {
    pub goods_id: u32,
    pub data_num: u32,
    pub block_first: u32,
    pub block_data: u32,
    pub block_last: u32,
    pub data_last_idx: u32,
    pub code: [u8; CODE_LEN],
}

impl InstrumentEntry {
    fn decode(bytes: &[u8]) -> Self {
        let mut code = [0u8; CODE_LEN];
        code.copy_from_slice(&bytes[24..48]);
        InstrumentEntry {
            goods_id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            data_num: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            block_first: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            block_data: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
            block_last: u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            data_last_idx: u32::from_le_bytes(bytes[20..24].try_into().unwrap()),
            code,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.goods_id.to_le_bytes());
        out.extend_from_slice(&self.data_num.to_le_bytes());
        out.extend_from_slice(&self.block_first.to_le_bytes());
        out.extend_from_slice(&self.block_data.to_le_bytes());
        out.extend_from_slice(&self.block_last.to_le_bytes());
        out.extend_from_slice(&self.data_last_idx.to_le_bytes());
        out.extend_from_slice(&self.code);
    }

    fn zeroed() -> Self {
        InstrumentEntry {
            goods_id: 0,
            data_num: 0,
            block_first: 0,
            block_data: 0,
            block_last: 0,
            data_last_idx: 0,
            code: [0u8; CODE_LEN],
        }
    }
}

/// The full 1,048,576-byte header: info segment plus instrument table.
#[derive(Debug, Clone)]
pub struct Header {
    pub info: Info,
    pub table: Vec<InstrumentEntry>,
    pub version: FormatVersion,
}

impl Header {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_SIZE {
            return Err(StoreError::ShortHeader {
                expected: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let version = FormatVersion::from_magic(&bytes[..MAGIC_COMPARE_LEN])?;
        let info = Info::decode(&bytes[..INFO_SIZE]);

        if info.goods_num as usize > MAX_GOODS {
            return Err(StoreError::GoodsNumOutOfRange {
                got: info.goods_num,
                max: MAX_GOODS as u32,
            });
        }

        let mut table = Vec::with_capacity(MAX_GOODS);
        let mut pos = INFO_SIZE;
        for _ in 0..MAX_GOODS {
            table.push(InstrumentEntry::decode(&bytes[pos..pos + GOODS_SIZE]));
            pos += GOODS_SIZE;
        }

        log::debug!(
            "parsed header: version={version:?}, block_size={}, goods_num={}",
            version.block_size(),
            info.goods_num,
        );

        Ok(Header {
            info,
            table,
            version,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        self.info.encode(&mut out);
        for entry in &self.table {
            entry.encode(&mut out);
        }
        out
    }

    /// An all-zero header with only the magic initialized, as written when
    /// a new file is created.
    pub fn zeroed(version: FormatVersion) -> Self {
        Header {
            info: Info::zeroed(version),
            table: vec![InstrumentEntry::zeroed(); MAX_GOODS],
            version,
        }
    }

    pub fn block_size(&self) -> u64 {
        self.version.block_size()
    }

    /// `goods_id -> table index`, skipping slots with `goods_id == 0`, in
    /// table order (and only within the first `goods_num` slots, since
    /// `goods_num` may overstate the real instrument count but never
    /// understate it).
    pub fn goods_index(&self) -> Vec<(u32, usize)> {
        let limit = (self.info.goods_num as usize).min(self.table.len());
        self.table[..limit]
            .iter()
            .enumerate()
            .filter(|(_, e)| e.goods_id > 0)
            .map(|(i, e)| (e.goods_id, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed_bytes(version: FormatVersion) -> Vec<u8> {
        Header::zeroed(version).encode()
    }

    #[test]
    fn decodes_v1_magic() {
        let bytes = zeroed_bytes(FormatVersion::V1);
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.block_size(), 8192);
        assert_eq!(header.goods_index().len(), 0);
    }

    #[test]
    fn decodes_v2_magic() {
        let bytes = zeroed_bytes(FormatVersion::V2);
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.block_size(), 65536);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = zeroed_bytes(FormatVersion::V1);
        bytes[0] = b'X';
        assert!(matches!(
            Header::decode(&bytes),
            Err(StoreError::BadMagic { .. })
        ));
    }

    #[test]
    fn rejects_short_header() {
        let bytes = vec![0u8; HEADER_SIZE - 1];
        assert!(matches!(
            Header::decode(&bytes),
            Err(StoreError::ShortHeader { .. })
        ));
    }

    #[test]
    fn rejects_goods_num_out_of_range() {
        let mut bytes = zeroed_bytes(FormatVersion::V1);
        bytes[44..48].copy_from_slice(&(MAX_GOODS as u32 + 1).to_le_bytes());
        assert!(matches!(
            Header::decode(&bytes),
            Err(StoreError::GoodsNumOutOfRange { .. })
        ));
    }

    #[test]
    fn goods_num_overstatement_skips_zero_ids() {
        let mut header = Header::zeroed(FormatVersion::V1);
        header.info.goods_num = 10;
        for i in 0..5 {
            header.table[i].goods_id = (i as u32) + 1;
        }
        // slots 5..9 stay goods_id == 0, simulating an overstated goods_num.
        let index = header.goods_index();
        assert_eq!(index.len(), 5);
        assert_eq!(
            index.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let mut header = Header::zeroed(FormatVersion::V2);
        header.info.goods_num = 1;
        header.info.blocks_total = 64;
        header.table[0] = InstrumentEntry {
            goods_id: 42,
            data_num: 7,
            block_first: 128,
            block_data: 1,
            block_last: 128,
            data_last_idx: 6,
            code: *b"600000.SH\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
        };
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded.info.goods_num, 1);
        assert_eq!(decoded.table[0].goods_id, 42);
        assert_eq!(decoded.table[0].data_num, 7);
    }
}
