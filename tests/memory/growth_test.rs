/*!
 * Heap Growth Tests
 */

use crate::support::{assert_coherent, manager};
use pretty_assertions::assert_eq;
use tagged_heap::{
    AllocationPolicy, BlockInfo, BlockStatus, DataSegment, HeapConfig, HeapError, MemoryManager,
    WORD_SIZE,
};

#[test]
fn test_growth_merges_with_trailing_free_block() {
    let mut mm = manager(AllocationPolicy::FirstFit);
    for _ in 0..3 {
        mm.malloc(1000);
    }
    let (_, end_before) = mm.heap_bounds();
    assert_eq!(end_before, 4064);

    let p = mm.malloc(5000);
    let (_, end_after) = mm.heap_bounds();

    assert_eq!((end_after - end_before) % mm.chunk_size(), 0);
    assert_eq!(end_after, 8160);
    assert_eq!(p, 3112);
    assert_eq!(mm.block(p - WORD_SIZE).unwrap().size, 5024);

    let tail: Vec<BlockInfo> = mm.blocks().skip_while(|b| b.address != 3104).collect();
    assert_eq!(
        tail,
        vec![
            BlockInfo {
                address: 3104,
                size: 5024,
                status: BlockStatus::Allocated
            },
            BlockInfo {
                address: 8128,
                size: 32,
                status: BlockStatus::Free
            },
        ]
    );
    assert_eq!(mm.stats().grow_count, 1);
    assert_coherent(&mm);
}

#[test]
fn test_growth_rounds_to_whole_chunks() {
    let mut mm = manager(AllocationPolicy::NextFit);

    // 20032 byte block, 4032 bytes already free at the end: 16384 more
    mm.malloc(20000);
    assert_eq!(mm.heap_bounds(), (32, 4064 + 16384));
    assert_eq!(mm.segment_extent(), (0, 4096 + 16384));
    assert_eq!(mm.stats().grow_count, 1);
    assert_coherent(&mm);
}

#[test]
fn test_growth_behind_allocated_tail() {
    let mut mm = manager(AllocationPolicy::BestFit);
    mm.malloc(4000); // fills the initial heap exactly
    assert_eq!(mm.stats().free_blocks, 0);

    let p = mm.malloc(100);
    assert_eq!(p, 4064 + WORD_SIZE);
    assert_eq!(mm.heap_bounds().1, 8160);
    assert_coherent(&mm);
}

#[test]
fn test_chunk_pages_config() {
    let config = HeapConfig {
        chunk_pages: 4,
        ..Default::default()
    };
    let mut mm = MemoryManager::with_config(DataSegment::new(1 << 20), config);
    mm.init(AllocationPolicy::FirstFit);

    assert_eq!(mm.chunk_size(), 16384);
    assert_eq!(mm.heap_bounds(), (32, 16352));

    mm.malloc(17000);
    assert_eq!(mm.heap_bounds().1, 16352 + 16384);
    assert_coherent(&mm);
}

#[test]
fn test_unaligned_segment_base() {
    let mut mm = MemoryManager::new(DataSegment::new(1 << 20).with_base(0x10_0008));
    mm.init(AllocationPolicy::FirstFit);

    assert_eq!(mm.heap_bounds(), (0x10_0020, 0x10_1000));
    let p = mm.malloc(5000);
    assert_eq!((p - WORD_SIZE) % 32, 0);
    assert_coherent(&mm);
}

#[test]
fn test_try_malloc_reports_exhaustion_without_side_effects() {
    let mut mm = MemoryManager::new(DataSegment::new(8192));
    mm.init(AllocationPolicy::FirstFit);
    let p = mm.malloc(500);
    let stats = mm.stats();

    let err = mm.try_malloc(10_000).unwrap_err();
    assert!(matches!(err, HeapError::OutOfMemory { requested: 8192, .. }));
    assert!(err.is_fatal());

    assert_eq!(mm.stats(), stats);
    assert_eq!(mm.segment_extent(), (0, 4096));
    assert_coherent(&mm);

    // the heap stays usable
    mm.free(p);
    assert_eq!(mm.try_malloc(3000).unwrap(), p);
}
