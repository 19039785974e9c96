//! Segment inode decoding.
//!
//! A segment inode is the 192-byte descriptor of one allocation segment (one
//! B+Tree level of one index). Inode pages hold a tight array of up to 85 of
//! them starting at byte 50, after the list node that chains inode pages
//! together. An inode slot is live only when its id is non-zero and its magic
//! number matches FSEG_MAGIC_N_VALUE; anything else is skipped by callers.

use byteorder::{BigEndian, ByteOrder};

use crate::innodb::constants::*;

/// Parsed segment inode (192 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInode {
    /// Segment id, 0 when the slot is unused.
    pub id: u64,
    /// Pages in use within the NOT_FULL extent list.
    pub not_full_n_used: u32,
    /// Number of extents in the FREE list (fully available).
    pub free_list_len: u32,
    /// Number of extents in the NOT_FULL list (partly used).
    pub not_full_list_len: u32,
    /// Number of extents in the FULL list (completely used).
    pub full_list_len: u32,
    /// Validation magic, FSEG_MAGIC_N_VALUE when initialized.
    pub magic: u32,
    /// Page numbers of individually allocated fragment pages.
    pub frag_pages: Vec<u32>,
}

impl SegmentInode {
    /// Parse a segment inode from a byte slice (at least 192 bytes).
    ///
    /// Only the length field of each embedded extent-list base is read; the
    /// fragment array is scanned for non-FIL_NULL slots.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FSEG_INODE_SIZE {
            return None;
        }

        let mut frag_pages = Vec::with_capacity(FSEG_FRAG_ARR_N_SLOTS);
        for slot in 0..FSEG_FRAG_ARR_N_SLOTS {
            let page = BigEndian::read_u32(&data[FSEG_FRAG_ARR + slot * 4..]);
            if page != FIL_NULL {
                frag_pages.push(page);
            }
        }

        Some(SegmentInode {
            id: BigEndian::read_u64(&data[FSEG_ID..]),
            not_full_n_used: BigEndian::read_u32(&data[FSEG_NOT_FULL_N_USED..]),
            free_list_len: BigEndian::read_u32(&data[FSEG_FREE..]),
            not_full_list_len: BigEndian::read_u32(&data[FSEG_NOT_FULL..]),
            full_list_len: BigEndian::read_u32(&data[FSEG_FULL..]),
            magic: BigEndian::read_u32(&data[FSEG_MAGIC_N..]),
            frag_pages,
        })
    }

    /// Returns true for an initialized inode: non-zero id and matching magic.
    pub fn is_valid(&self) -> bool {
        self.id != 0 && self.magic == FSEG_MAGIC_N_VALUE
    }

    /// Number of individually allocated fragment pages.
    pub fn frag_count(&self) -> usize {
        self.frag_pages.len()
    }

    /// Total pages reserved by this segment.
    ///
    /// Every extent list counts extents of FSP_EXTENT_SIZE pages; fragment
    /// pages are allocated one at a time outside any extent. Mirrors the
    /// server's fseg_n_reserved_pages_low().
    pub fn allocated_pages(&self) -> u64 {
        u64::from(self.free_list_len + self.not_full_list_len + self.full_list_len)
            * FSP_EXTENT_SIZE
            + self.frag_pages.len() as u64
    }
}
