//! File-based list decoding.
//!
//! InnoDB chains on-disk structures with doubly-linked lists whose pointers
//! are 6-byte file addresses ([`FileAddr`]): a big-endian page number followed
//! by a big-endian byte offset into that page. A list is headed by a 16-byte
//! [`ListBaseNode`] and its members carry a 12-byte [`ListNode`] embedded in
//! whatever page the list links together.

use byteorder::{BigEndian, ByteOrder};

use crate::innodb::constants::*;

/// 6-byte on-disk pointer: page number + byte offset within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAddr {
    pub page: u32,
    pub offset: u16,
}

impl FileAddr {
    /// The null address: page FIL_NULL, used to terminate traversals.
    pub const NULL: FileAddr = FileAddr {
        page: FIL_NULL,
        offset: 0,
    };

    /// Parse a file address from a byte slice (at least 6 bytes).
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FIL_ADDR_SIZE {
            return None;
        }
        Some(FileAddr {
            page: BigEndian::read_u32(&data[0..]),
            offset: BigEndian::read_u16(&data[4..]),
        })
    }

    /// Returns true if this address is the list terminator.
    pub fn is_null(&self) -> bool {
        self.page == FIL_NULL
    }
}

/// 12-byte list node: previous and next file addresses.
#[derive(Debug, Clone, Copy)]
pub struct ListNode {
    pub prev: FileAddr,
    pub next: FileAddr,
}

impl ListNode {
    /// Parse a list node from a byte slice (at least 12 bytes).
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FLST_NODE_SIZE {
            return None;
        }
        Some(ListNode {
            prev: FileAddr::parse(&data[FLST_PREV..])?,
            next: FileAddr::parse(&data[FLST_NEXT..])?,
        })
    }
}

/// 16-byte list base node: length plus first/last member addresses.
#[derive(Debug, Clone, Copy)]
pub struct ListBaseNode {
    /// Number of nodes in the list.
    pub length: u32,
    pub first: FileAddr,
    pub last: FileAddr,
}

impl ListBaseNode {
    /// Parse a list base node from a byte slice (at least 16 bytes).
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FLST_BASE_NODE_SIZE {
            return None;
        }
        Some(ListBaseNode {
            length: BigEndian::read_u32(&data[FLST_LEN..]),
            first: FileAddr::parse(&data[FLST_FIRST..])?,
            last: FileAddr::parse(&data[FLST_LAST..])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_addr_bytes(page: u32, offset: u16) -> Vec<u8> {
        let mut buf = vec![0u8; FIL_ADDR_SIZE];
        BigEndian::write_u32(&mut buf[0..], page);
        BigEndian::write_u16(&mut buf[4..], offset);
        buf
    }

    #[test]
    fn test_file_addr_parse() {
        let data = make_addr_bytes(7, 50);
        let addr = FileAddr::parse(&data).unwrap();
        assert_eq!(addr.page, 7);
        assert_eq!(addr.offset, 50);
        assert!(!addr.is_null());
    }

    #[test]
    fn test_file_addr_null() {
        let data = make_addr_bytes(FIL_NULL, 0);
        let addr = FileAddr::parse(&data).unwrap();
        assert!(addr.is_null());
        assert_eq!(addr, FileAddr::NULL);
    }

    #[test]
    fn test_file_addr_too_short() {
        assert!(FileAddr::parse(&[0u8; 5]).is_none());
    }

    #[test]
    fn test_list_node_parse() {
        let mut data = vec![0u8; FLST_NODE_SIZE];
        data[..6].copy_from_slice(&make_addr_bytes(1, 38));
        data[6..].copy_from_slice(&make_addr_bytes(2, 38));
        let node = ListNode::parse(&data).unwrap();
        assert_eq!(node.prev.page, 1);
        assert_eq!(node.next.page, 2);
        assert_eq!(node.next.offset, 38);
    }

    #[test]
    fn test_list_base_node_parse() {
        let mut data = vec![0u8; FLST_BASE_NODE_SIZE];
        BigEndian::write_u32(&mut data[FLST_LEN..], 3);
        data[FLST_FIRST..FLST_FIRST + 6].copy_from_slice(&make_addr_bytes(4, 38));
        data[FLST_LAST..].copy_from_slice(&make_addr_bytes(9, 38));
        let base = ListBaseNode::parse(&data).unwrap();
        assert_eq!(base.length, 3);
        assert_eq!(base.first.page, 4);
        assert_eq!(base.last.page, 9);
    }

    #[test]
    fn test_list_base_node_too_short() {
        assert!(ListBaseNode::parse(&[0u8; 15]).is_none());
    }
}
