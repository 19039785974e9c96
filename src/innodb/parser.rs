//! InnoDB tablespace usage parsing.
//!
//! [`InnoDbParser`] reproduces the `DATA_LENGTH` / `INDEX_LENGTH` /
//! `DATA_FREE` numbers a live server reports for one file-per-table
//! tablespace, by walking the on-disk allocator metadata instead of the data
//! itself: it resolves the page size from the FSP flags, pulls the clustered
//! index's segment ids from the root page, walks both segment-inode page
//! lists, sums each valid inode's reserved pages, and finally derives the
//! free-space figure from the FSP free list and free limit.

use std::collections::HashSet;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::innodb::constants::*;
use crate::innodb::inode::SegmentInode;
use crate::innodb::list::{FileAddr, ListBaseNode, ListNode};
use crate::innodb::page::{page_size_from_flags, FsegHeader, FspHeader};
use crate::innodb::reader::PageReader;
use crate::monitor::{IoRateLimiter, IoWaitBrake};
use crate::UsageError;

/// Per-file InnoDB usage analyzer.
///
/// Constructed per file, run to completion, then discarded; the page cache,
/// visited set and counters live only for one run.
pub struct InnoDbParser {
    reader: PageReader,
    page_size: u64,

    data_length: u64,
    index_length: u64,
    data_free: u64,

    /// Segment id of the clustered-index leaf segment, 0 until found.
    cluster_leaf_id: u64,
    /// Segment id of the clustered-index non-leaf segment, 0 until found.
    cluster_top_id: u64,

    visited: HashSet<u32>,
}

impl InnoDbParser {
    /// Open a tablespace with the default governor configuration.
    pub fn open(
        path: &Path,
        io_wait_threshold: f64,
        max_io_ops_per_sec: f64,
    ) -> Result<Self, UsageError> {
        Self::with_governor(
            path,
            IoRateLimiter::new(max_io_ops_per_sec),
            IoWaitBrake::new(io_wait_threshold),
        )
    }

    /// Open a tablespace with an explicit rate limiter and iowait brake.
    pub fn with_governor(
        path: &Path,
        limiter: IoRateLimiter,
        brake: IoWaitBrake,
    ) -> Result<Self, UsageError> {
        let reader = PageReader::open(path, limiter, brake)?;
        let page_size = reader.page_size();
        Ok(InnoDbParser {
            reader,
            page_size,
            data_length: 0,
            index_length: 0,
            data_free: 0,
            cluster_leaf_id: 0,
            cluster_top_id: 0,
            visited: HashSet::new(),
        })
    }

    /// Run the analysis to completion.
    pub fn run(&mut self) -> Result<(), UsageError> {
        self.detect_page_size()?;

        let fsp = {
            let page0 = self.reader.read_page(0)?;
            FspHeader::parse(page0).ok_or_else(|| {
                UsageError::InvalidFormat("page 0 too short for an FSP header".into())
            })?
        };

        let (leaf_inode_page, top_inode_page) = self.find_clustered_index()?;

        self.traverse_inodes(&fsp.seg_inodes_full)?;
        self.traverse_inodes(&fsp.seg_inodes_free)?;

        // Corner case: the clustered-index inode page may not be linked into
        // either list at parse time.
        self.check_inode_page(leaf_inode_page)?;
        self.check_inode_page(top_inode_page)?;

        // Empty tables still hold their index root.
        if self.data_length == 0 && self.reader.file_size() >= 4 * self.page_size {
            self.data_length = self.page_size;
        }

        self.data_free =
            free_space_bytes(fsp.size, fsp.free_limit, fsp.free.length, self.page_size);

        Ok(())
    }

    /// The (data_length, index_length, data_free) triple, in bytes.
    ///
    /// Only meaningful after [`InnoDbParser::run`] completes.
    pub fn stats(&self) -> (u64, u64, u64) {
        (self.data_length, self.index_length, self.data_free)
    }

    /// Number of reads that reached the file during this run.
    pub fn pages_read(&self) -> u64 {
        self.reader.physical_reads()
    }

    /// Resolve the real page size from the FSP flags on page 0.
    ///
    /// Page 0 always occupies the first 16 KiB of the file regardless of the
    /// configured page size, so the prefix can be read before the size is
    /// known; once it is, the prefix doubles as the cached page 0.
    fn detect_page_size(&mut self) -> Result<(), UsageError> {
        let prefix_len = (PAGE0_PREFIX_SIZE as u64).min(self.reader.file_size()) as usize;
        if prefix_len < FSP_HEADER_OFFSET + FSP_SPACE_FLAGS + 4 {
            return Err(UsageError::InvalidFormat(format!(
                "file too small to hold the FSP flags: {} bytes",
                prefix_len
            )));
        }

        let prefix = self.reader.read_prefix(prefix_len)?;
        let flags =
            BigEndian::read_u32(&prefix.as_slice()[FSP_HEADER_OFFSET + FSP_SPACE_FLAGS..]);

        self.page_size = u64::from(page_size_from_flags(flags));
        self.reader.set_page_size(self.page_size);
        self.reader.seed_page0(prefix);
        Ok(())
    }

    /// Read the clustered-index root (page 3) and record the segment ids of
    /// its leaf and non-leaf segments.
    ///
    /// Returns the inode page numbers named by the two FSEG headers
    /// (FIL_NULL when unset) so the caller can run the safety-net scan.
    fn find_clustered_index(&mut self) -> Result<(u32, u32), UsageError> {
        let (leaf, top) = {
            let page3 = self.reader.read_page(CLUSTER_ROOT_PAGE)?;
            (FsegHeader::parse_leaf(page3), FsegHeader::parse_top(page3))
        };

        let mut leaf_inode_page = FIL_NULL;
        if let Some(header) = leaf {
            if header.is_set() {
                leaf_inode_page = header.inode_page;
                self.cluster_leaf_id =
                    self.segment_id_at(header.inode_page, header.inode_offset)?;
            }
        }

        let mut top_inode_page = FIL_NULL;
        if let Some(header) = top {
            if header.is_set() {
                top_inode_page = header.inode_page;
                self.cluster_top_id =
                    self.segment_id_at(header.inode_page, header.inode_offset)?;
            }
        }

        Ok((leaf_inode_page, top_inode_page))
    }

    /// Read the segment id of the inode at the given page/offset, 0 when the
    /// inode does not fit in the page.
    fn segment_id_at(&mut self, page_no: u32, offset: u16) -> Result<u64, UsageError> {
        let page = self.reader.read_page(page_no)?;
        let offset = offset as usize;
        if offset + FSEG_INODE_SIZE > page.len() {
            return Ok(0);
        }
        Ok(SegmentInode::parse(&page[offset..offset + FSEG_INODE_SIZE])
            .map(|inode| inode.id)
            .unwrap_or(0))
    }

    /// Walk one linked list of inode pages, scanning every inode slot.
    ///
    /// The visited set breaks traversal if corruption ever links the list
    /// into a cycle; no repair is attempted.
    fn traverse_inodes(&mut self, list: &ListBaseNode) -> Result<(), UsageError> {
        if list.length == 0 {
            return Ok(());
        }

        let mut cur = list.first;
        while !cur.is_null() {
            if !self.visited.insert(cur.page) {
                break;
            }

            let page = self.reader.read_page(cur.page)?;
            let (data, index) =
                scan_inode_page(page, self.page_size, self.cluster_leaf_id, self.cluster_top_id);

            // Follow the in-page list node; when the node does not fit in the
            // page (malformed offset) fall back to the re-reading helper.
            let node_offset = cur.offset as usize;
            let in_page_next = if node_offset + FLST_NODE_SIZE <= page.len() {
                ListNode::parse(&page[node_offset..]).map(|node| node.next)
            } else {
                None
            };

            self.data_length += data;
            self.index_length += index;

            cur = match in_page_next {
                Some(next) => next,
                None => self.next_node(cur)?,
            };
        }
        Ok(())
    }

    /// Re-read a node's page and decode its next pointer, terminating the
    /// walk when the node lies outside the page.
    fn next_node(&mut self, addr: FileAddr) -> Result<FileAddr, UsageError> {
        if addr.is_null() {
            return Ok(FileAddr::NULL);
        }
        let page = self.reader.read_page(addr.page)?;
        let offset = addr.offset as usize;
        if offset + FLST_NODE_SIZE > page.len() {
            return Ok(FileAddr::NULL);
        }
        Ok(ListNode::parse(&page[offset..])
            .map(|node| node.next)
            .unwrap_or(FileAddr::NULL))
    }

    /// Scan an inode page missed by the list walks, once.
    fn check_inode_page(&mut self, page_no: u32) -> Result<(), UsageError> {
        if page_no == FIL_NULL || self.visited.contains(&page_no) {
            return Ok(());
        }
        if u64::from(page_no) * self.page_size >= self.reader.file_size() {
            // A truncated copy can point past the end of the file.
            return Ok(());
        }
        self.visited.insert(page_no);

        let page = self.reader.read_page(page_no)?;
        let (data, index) =
            scan_inode_page(page, self.page_size, self.cluster_leaf_id, self.cluster_top_id);
        self.data_length += data;
        self.index_length += index;
        Ok(())
    }
}

/// Sum the allocation of every valid inode on an inode page, split into
/// clustered-index bytes and everything-else bytes.
///
/// Slots whose id is zero or whose magic number mismatches contribute
/// nothing. The slot loop is bounded by the page length, so pages smaller
/// than the default never index out of bounds.
fn scan_inode_page(page: &[u8], page_size: u64, leaf_id: u64, top_id: u64) -> (u64, u64) {
    let mut data = 0u64;
    let mut index = 0u64;

    for slot in 0..FSEG_INODES_PER_PAGE {
        let offset = FSEG_ARR_OFFSET + slot * FSEG_INODE_SIZE;
        if offset + FSEG_INODE_SIZE > page.len() {
            break;
        }
        let inode = match SegmentInode::parse(&page[offset..offset + FSEG_INODE_SIZE]) {
            Some(inode) => inode,
            None => break,
        };
        if !inode.is_valid() {
            continue;
        }

        let bytes = inode.allocated_pages() * page_size;
        if inode.id == leaf_id || inode.id == top_id {
            data += bytes;
        } else {
            index += bytes;
        }
    }

    (data, index)
}

/// Compute DATA_FREE from the FSP header fields.
///
/// Free space is the FSP_FREE extents plus never-initialized extents above
/// the free limit, minus descriptor-page overhead and the engine's reserve of
/// `2 + size_in_extents * 2 / 200` extents. The reserve formula is taken
/// verbatim from fsp_reserve_free_extents(); matching the server's reported
/// figure is the point, so it is not "corrected" here.
pub(crate) fn free_space_bytes(
    size: u32,
    free_limit: u32,
    free_list_len: u32,
    page_size: u64,
) -> u64 {
    let mut n_free_up = if size > free_limit {
        u64::from(size - free_limit) / FSP_EXTENT_SIZE
    } else {
        0
    };

    // Every 256 extents one extent's worth of pages goes to XDES descriptors.
    if n_free_up > 0 {
        n_free_up -= 1;
        n_free_up -= n_free_up / 256;
    }

    let size_in_extents = u64::from(size) / FSP_EXTENT_SIZE;
    let reserve = 2 + size_in_extents * 2 / 200;
    let n_free = u64::from(free_list_len) + n_free_up;

    if n_free > reserve {
        (n_free - reserve) * FSP_EXTENT_SIZE * page_size
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_space_small_tablespace() {
        // 1024 pages, free limit 512, 4 free extents:
        // n_free_up = 512/64 = 8, minus 1 descriptor extent, minus 7/256 = 7
        // reserve = 2 + (16 * 2) / 200 = 2
        // data_free = (4 + 7 - 2) * 64 * 16384
        assert_eq!(
            free_space_bytes(1024, 512, 4, 16384),
            9 * 64 * 16384
        );
    }

    #[test]
    fn test_free_space_nothing_above_limit() {
        assert_eq!(free_space_bytes(1024, 1024, 0, 16384), 0);
        // Free list alone, below the reserve
        assert_eq!(free_space_bytes(1024, 1024, 2, 16384), 0);
        // Free list alone, above the reserve
        assert_eq!(free_space_bytes(1024, 1024, 5, 16384), 3 * 64 * 16384);
    }

    #[test]
    fn test_free_space_reserve_grows_with_size() {
        // 100_000 extents: reserve = 2 + 200_000/200 = 1002
        let size = 100_000u32 * 64;
        assert_eq!(free_space_bytes(size, size, 1002, 16384), 0);
        assert_eq!(free_space_bytes(size, size, 1003, 16384), 64 * 16384);
    }

    #[test]
    fn test_free_space_no_underflow_when_limit_exceeds_size() {
        assert_eq!(free_space_bytes(100, 200, 0, 16384), 0);
    }

    #[test]
    fn test_free_space_xdes_overhead() {
        // 300 uninitialized extents: 300 - 1 = 299, 299 - 299/256 = 298
        let size = 400u32 * 64;
        let free_limit = 100u32 * 64;
        let reserve = 2 + (400 * 2) / 200; // 6
        assert_eq!(
            free_space_bytes(size, free_limit, 0, 16384),
            (298 - reserve) * 64 * 16384
        );
    }

    #[test]
    fn test_scan_inode_page_routes_by_segment_id() {
        let mut page = vec![0u8; 16384];
        // Fragment arrays must read as empty, not page 0.
        for slot_base in [FSEG_ARR_OFFSET, FSEG_ARR_OFFSET + FSEG_INODE_SIZE] {
            for frag in 0..FSEG_FRAG_ARR_N_SLOTS {
                BigEndian::write_u32(
                    &mut page[slot_base + FSEG_FRAG_ARR + frag * 4..],
                    FIL_NULL,
                );
            }
        }

        // Slot 0: clustered leaf segment, 2 full extents.
        let base = FSEG_ARR_OFFSET;
        BigEndian::write_u64(&mut page[base + FSEG_ID..], 1);
        BigEndian::write_u32(&mut page[base + FSEG_FULL..], 2);
        BigEndian::write_u32(&mut page[base + FSEG_MAGIC_N..], FSEG_MAGIC_N_VALUE);

        // Slot 1: secondary index, 1 full extent + 1 fragment page.
        let base = FSEG_ARR_OFFSET + FSEG_INODE_SIZE;
        BigEndian::write_u64(&mut page[base + FSEG_ID..], 2);
        BigEndian::write_u32(&mut page[base + FSEG_FULL..], 1);
        BigEndian::write_u32(&mut page[base + FSEG_MAGIC_N..], FSEG_MAGIC_N_VALUE);
        BigEndian::write_u32(&mut page[base + FSEG_FRAG_ARR..], 17);

        let (data, index) = scan_inode_page(&page, 16384, 1, 0);
        assert_eq!(data, 2 * 64 * 16384);
        assert_eq!(index, 65 * 16384);
    }

    #[test]
    fn test_scan_inode_page_skips_bad_magic() {
        let mut page = vec![0u8; 16384];
        let base = FSEG_ARR_OFFSET;
        BigEndian::write_u64(&mut page[base + FSEG_ID..], 9);
        BigEndian::write_u32(&mut page[base + FSEG_FULL..], 5);
        BigEndian::write_u32(&mut page[base + FSEG_MAGIC_N..], 0xBAD0BAD0);
        for frag in 0..FSEG_FRAG_ARR_N_SLOTS {
            BigEndian::write_u32(&mut page[base + FSEG_FRAG_ARR + frag * 4..], FIL_NULL);
        }

        assert_eq!(scan_inode_page(&page, 16384, 0, 0), (0, 0));
    }

    #[test]
    fn test_scan_inode_page_bounded_by_page_length() {
        // A 4 KiB page holds only 21 inode slots; the scan must stop there.
        let page = vec![0u8; 4096];
        assert_eq!(scan_inode_page(&page, 4096, 0, 0), (0, 0));
    }
}
