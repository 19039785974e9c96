/// InnoDB space-management structure constants.
///
/// These values are derived from the MySQL/MariaDB source code headers:
/// - fsp0fsp.h / fsp0types.h (FSP header, segment inodes, tablespace flags)
/// - fut0lst.h (file-based lists)
/// - page0page.h (index page header)
// Page sizes
pub const SIZE_PAGE_DEFAULT: u32 = 16384;
pub const SIZE_PAGE_MIN: u32 = 1024;
pub const SIZE_PAGE_MAX: u32 = 65536;

/// Page 0 always occupies the first 16 KiB of the file regardless of the real
/// page size, so the FSP header can be read before the size is known.
pub const PAGE0_PREFIX_SIZE: usize = 16384;

/// Alignment required for direct-I/O buffers on most targets.
pub const IO_ALIGN: usize = 4096;

/// "Null" page reference (0xFFFFFFFF) terminating any on-disk traversal.
pub const FIL_NULL: u32 = 0xFFFFFFFF;

/// Number of pages in one extent, the unit of bulk allocation.
pub const FSP_EXTENT_SIZE: u64 = 64;

// FSP header (starts at byte 38 of page 0, after the FIL header)
pub const FSP_HEADER_OFFSET: usize = 38;
pub const FSP_SPACE_ID: usize = 0; // 4 bytes - space id
pub const FSP_NOT_USED: usize = 4; // 4 bytes - unused
pub const FSP_SIZE: usize = 8; // 4 bytes - tablespace size in pages
pub const FSP_FREE_LIMIT: usize = 12; // 4 bytes - first page not yet initialized
pub const FSP_SPACE_FLAGS: usize = 16; // 4 bytes - page size, compression, ...
pub const FSP_FRAG_N_USED: usize = 20; // 4 bytes - used pages in FSP_FREE_FRAG
pub const FSP_FREE: usize = 24; // 16 bytes - list base of wholly free extents
pub const FSP_SEG_INODES_FULL: usize = 80; // 16 bytes - inode pages with no free slot
pub const FSP_SEG_INODES_FREE: usize = 96; // 16 bytes - inode pages with a free slot
pub const FSP_HEADER_SIZE: usize = 112;

// FSP_SPACE_FLAGS bit layout
pub const FSP_FLAGS_MASK_POST_ANTELOPE: u32 = 0x1; // bit 0
pub const FSP_FLAGS_POS_ZIP_SSIZE: u32 = 1;
pub const FSP_FLAGS_MASK_ZIP_SSIZE: u32 = 0x1E; // bits 1-4, compressed page size
pub const FSP_FLAGS_POS_PAGE_SSIZE: u32 = 6;
pub const FSP_FLAGS_MASK_PAGE_SSIZE: u32 = 0x3C0; // bits 6-9, uncompressed page size

// File-based list (FLST) layout
pub const FLST_PREV: usize = 0; // 6 bytes - file address of previous node
pub const FLST_NEXT: usize = 6; // 6 bytes - file address of next node
pub const FLST_NODE_SIZE: usize = 12;
pub const FLST_LEN: usize = 0; // 4 bytes - number of nodes in the list
pub const FLST_FIRST: usize = 4; // 6 bytes - file address of first node
pub const FLST_LAST: usize = 10; // 6 bytes - file address of last node
pub const FLST_BASE_NODE_SIZE: usize = 16;

/// Size of a 6-byte on-disk file address (page number + byte offset).
pub const FIL_ADDR_SIZE: usize = 6;

// Index page header (starts at byte 38 of an INDEX page)
pub const PAGE_HEADER: usize = 38;
pub const PAGE_BTR_SEG_LEAF: usize = 36; // 10 bytes - leaf segment header
pub const PAGE_BTR_SEG_TOP: usize = 46; // 10 bytes - non-leaf segment header
pub const FSEG_HEADER_SIZE: usize = 10;

/// Clustered-index root page number in the file-per-table layout.
pub const CLUSTER_ROOT_PAGE: u32 = 3;

// Segment inode page layout
pub const FSEG_INODE_PAGE_NODE: usize = 38; // 12 bytes - node chaining inode pages
pub const FSEG_ARR_OFFSET: usize = FSEG_INODE_PAGE_NODE + FLST_NODE_SIZE; // 50
pub const FSEG_INODE_SIZE: usize = 192;
/// Inodes per page for the default 16 KiB page: (16384 - 50) / 192.
pub const FSEG_INODES_PER_PAGE: usize = 85;

// Segment inode layout (offsets within one 192-byte inode)
pub const FSEG_ID: usize = 0; // 8 bytes - segment id, 0 when the slot is unused
pub const FSEG_NOT_FULL_N_USED: usize = 8; // 4 bytes - pages used in NOT_FULL extents
pub const FSEG_FREE: usize = 12; // 16 bytes - list base of free extents
pub const FSEG_NOT_FULL: usize = 28; // 16 bytes - list base of partly used extents
pub const FSEG_FULL: usize = 44; // 16 bytes - list base of full extents
pub const FSEG_MAGIC_N: usize = 60; // 4 bytes - validation magic
pub const FSEG_FRAG_ARR: usize = 64; // 32 x 4 bytes - fragment page numbers
pub const FSEG_FRAG_ARR_N_SLOTS: usize = (FSP_EXTENT_SIZE / 2) as usize;

/// Expected FSEG_MAGIC_N value for an initialized inode (0x05D669D2).
pub const FSEG_MAGIC_N_VALUE: u32 = 97937874;
