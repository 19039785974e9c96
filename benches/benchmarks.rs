//! Criterion benchmarks for the hot decode paths.
//!
//! The walker spends nearly all of its CPU time decoding segment inodes (85
//! per inode page) and list nodes, so those decoders are benchmarked against
//! realistic on-disk bytes.

use byteorder::{BigEndian, ByteOrder};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use ibd_usage::innodb::constants::*;
use ibd_usage::innodb::inode::SegmentInode;
use ibd_usage::innodb::list::ListBaseNode;
use ibd_usage::innodb::page::{page_size_from_flags, FspHeader};

/// Build one initialized 192-byte inode with a half-full fragment array.
fn build_inode_bytes() -> Vec<u8> {
    let mut buf = vec![0u8; FSEG_INODE_SIZE];
    BigEndian::write_u64(&mut buf[FSEG_ID..], 42);
    BigEndian::write_u32(&mut buf[FSEG_NOT_FULL_N_USED..], 17);
    BigEndian::write_u32(&mut buf[FSEG_FREE..], 1);
    BigEndian::write_u32(&mut buf[FSEG_NOT_FULL..], 2);
    BigEndian::write_u32(&mut buf[FSEG_FULL..], 3);
    BigEndian::write_u32(&mut buf[FSEG_MAGIC_N..], FSEG_MAGIC_N_VALUE);
    for slot in 0..FSEG_FRAG_ARR_N_SLOTS {
        let page = if slot % 2 == 0 { slot as u32 + 100 } else { FIL_NULL };
        BigEndian::write_u32(&mut buf[FSEG_FRAG_ARR + slot * 4..], page);
    }
    buf
}

/// Build a minimal page 0 with plausible FSP header values.
fn build_fsp_page_bytes() -> Vec<u8> {
    let mut page = vec![0u8; 16384];
    let base = FSP_HEADER_OFFSET;
    BigEndian::write_u32(&mut page[base + FSP_SIZE..], 65536);
    BigEndian::write_u32(&mut page[base + FSP_FREE_LIMIT..], 32768);
    BigEndian::write_u32(&mut page[base + FSP_SPACE_FLAGS..], 0x1 | (3 << 6));
    BigEndian::write_u32(&mut page[base + FSP_FREE..], 12);
    BigEndian::write_u32(&mut page[base + FSP_SEG_INODES_FULL..], 2);
    BigEndian::write_u32(&mut page[base + FSP_SEG_INODES_FREE..], 1);
    page
}

fn bench_inode_decode(c: &mut Criterion) {
    let bytes = build_inode_bytes();
    let mut group = c.benchmark_group("inode_decode");
    group.throughput(Throughput::Bytes(FSEG_INODE_SIZE as u64));
    group.bench_function("segment_inode_parse", |b| {
        b.iter(|| SegmentInode::parse(black_box(&bytes)))
    });
    group.finish();
}

fn bench_fsp_header_decode(c: &mut Criterion) {
    let page = build_fsp_page_bytes();
    c.bench_function("fsp_header_parse", |b| {
        b.iter(|| FspHeader::parse(black_box(&page)))
    });
}

fn bench_list_base_decode(c: &mut Criterion) {
    let page = build_fsp_page_bytes();
    let slice = &page[FSP_HEADER_OFFSET + FSP_FREE..];
    c.bench_function("list_base_parse", |b| {
        b.iter(|| ListBaseNode::parse(black_box(slice)))
    });
}

fn bench_page_size_flags(c: &mut Criterion) {
    c.bench_function("page_size_from_flags", |b| {
        b.iter(|| {
            for flags in [0u32, 0x1 | (1 << 1), 0x1 | (4 << 6), 0x1 | (5 << 6)] {
                black_box(page_size_from_flags(black_box(flags)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_inode_decode,
    bench_fsp_header_decode,
    bench_list_base_decode,
    bench_page_size_flags
);
criterion_main!(benches);
