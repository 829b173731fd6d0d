/*!
 * Allocation Scenario Tests
 * Basic malloc/free/calloc behavior on a fresh heap
 */

use crate::support::{assert_coherent, manager, verified_manager};
use pretty_assertions::assert_eq;
use tagged_heap::{AllocationPolicy, BlockInfo, BlockStatus, HeapError, GRANULARITY, WORD_SIZE};

#[test]
fn test_initial_heap_is_one_free_block() {
    let mm = manager(AllocationPolicy::FirstFit);

    assert_eq!(mm.heap_bounds(), (32, 4064));
    assert_eq!(mm.segment_extent(), (0, 4096));
    assert_eq!(mm.chunk_size(), 4096);

    let blocks: Vec<BlockInfo> = mm.blocks().collect();
    assert_eq!(
        blocks,
        vec![BlockInfo {
            address: 32,
            size: 4032,
            status: BlockStatus::Free
        }]
    );

    let report = mm.check();
    assert!(report.is_coherent());
    assert_eq!(report.initial_sentinel, 1);
    assert_eq!(report.end_sentinel, 1);
}

#[test]
fn test_freed_block_between_allocations_is_not_merged() {
    let mut mm = manager(AllocationPolicy::FirstFit);

    let p0 = mm.malloc(1000);
    let p1 = mm.malloc(1000);
    let p2 = mm.malloc(1000);
    assert_eq!((p0, p1, p2), (40, 1064, 2088));

    mm.free(p1);
    assert_coherent(&mm);

    assert_eq!(
        mm.block(p1 - WORD_SIZE).unwrap(),
        BlockInfo {
            address: 1056,
            size: 1024,
            status: BlockStatus::Free
        }
    );
    assert_eq!(mm.block(32).unwrap().status, BlockStatus::Allocated);
    assert_eq!(mm.block(2080).unwrap().status, BlockStatus::Allocated);

    let stats = mm.stats();
    assert_eq!(stats.free_blocks, 2);
    assert_eq!(stats.allocated_blocks, 2);
}

#[test]
fn test_freeing_neighbors_low_to_high_merges() {
    let mut mm = manager(AllocationPolicy::FirstFit);

    let a = mm.malloc(1000);
    let b = mm.malloc(1000);
    let c = mm.malloc(1000);
    let guard = mm.malloc(900);
    assert_eq!(guard, 3112);

    mm.free(a);
    assert_eq!(mm.stats().free_blocks, 2);

    mm.free(b);
    assert_coherent(&mm);
    assert_eq!(
        mm.block(32).unwrap(),
        BlockInfo {
            address: 32,
            size: 2048,
            status: BlockStatus::Free
        }
    );

    mm.free(c);
    assert_coherent(&mm);
    let blocks: Vec<BlockInfo> = mm.blocks().collect();
    assert_eq!(blocks.len(), 3);
    assert_eq!(
        blocks[0],
        BlockInfo {
            address: 32,
            size: 3072,
            status: BlockStatus::Free
        }
    );
    assert_eq!(blocks[1].status, BlockStatus::Allocated);
    assert_eq!(blocks[2].size, 32);
}

#[test]
fn test_freeing_everything_restores_single_block() {
    let mut mm = manager(AllocationPolicy::BestFit);

    let ptrs: Vec<_> = [100, 1, 700, 32, 2000].iter().map(|&n| mm.malloc(n)).collect();
    for &p in ptrs.iter().rev() {
        mm.free(p);
        assert_coherent(&mm);
    }

    let stats = mm.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.allocated_blocks, 0);
    assert_eq!(stats.largest_free_block, stats.heap_size);
}

#[test]
fn test_malloc_alignment_and_usable_size() {
    let mut mm = manager(AllocationPolicy::FirstFit);

    for n in [0, 1, 15, 16, 17, 31, 32, 33, 47, 48, 49, 100, 1024, 5000] {
        let p = mm.malloc(n);
        assert_eq!((p - WORD_SIZE) % GRANULARITY, 0, "malloc({})", n);
        assert_eq!(p % WORD_SIZE, 0);
        assert!(mm.usable_size(p).unwrap() >= n);
        assert!(mm.payload(p).unwrap().len() >= n);
    }
    assert_coherent(&mm);
}

#[test]
fn test_calloc_zero_fills_reused_block() {
    let mut mm = manager(AllocationPolicy::FirstFit);

    let dirty = mm.malloc(4096);
    mm.payload_mut(dirty).unwrap().fill(0xAA);
    mm.free(dirty);

    let p = mm.calloc(4, 1024).unwrap();
    assert_eq!(p, dirty);
    assert!(mm.usable_size(p).unwrap() >= 4096);
    assert!(mm.payload(p).unwrap()[..4096].iter().all(|&b| b == 0));
    assert_coherent(&mm);
}

#[test]
fn test_calloc_overflow_is_reported() {
    let mut mm = manager(AllocationPolicy::FirstFit);
    let before = mm.stats();

    let err = mm.calloc(usize::MAX, 2).unwrap_err();
    assert_eq!(
        err,
        HeapError::SizeOverflow {
            count: usize::MAX,
            size: 2
        }
    );
    assert!(!err.is_fatal());
    assert_eq!(mm.stats(), before);
}

#[test]
fn test_payload_rejects_freed_and_foreign_addresses() {
    let mut mm = manager(AllocationPolicy::FirstFit);

    let p = mm.malloc(64);
    let q = mm.malloc(64);
    mm.free(p);

    assert!(mm.payload(p).is_err());
    assert!(mm.payload(q + 8).is_err());
    assert!(mm.usable_size(12345).is_err());
    assert_eq!(mm.usable_size(q).unwrap(), 96 - 16);
}

#[test]
fn test_free_then_smaller_malloc_reuses_block() {
    for policy in [AllocationPolicy::FirstFit, AllocationPolicy::BestFit] {
        let mut mm = manager(policy);
        let _guard = mm.malloc(10);

        for (n, smaller) in [(1000, 1000), (1000, 10), (3000, 2999), (200, 1)] {
            let p = mm.malloc(n);
            let extent = mm.segment_extent();
            let grown = mm.stats().grow_count;

            mm.free(p);
            let q = mm.malloc(smaller);

            assert_eq!(q, p, "{} reused free({}) for malloc({})", policy, n, smaller);
            assert_eq!(mm.segment_extent(), extent);
            assert_eq!(mm.stats().grow_count, grown);
            mm.free(q);
        }
        assert_coherent(&mm);
    }
}

#[test]
fn test_report_display_mentions_coherence() {
    let mut mm = manager(AllocationPolicy::NextFit);
    mm.malloc(10);

    let text = mm.check().to_string();
    assert!(text.contains("Block structure coherent."));
    assert!(text.contains("0x20: size:     20, status: allocated"));
}

#[test]
fn test_reference_session_under_verification() {
    for policy in AllocationPolicy::ALL {
        let mut mm = verified_manager(policy);

        let p = mm.malloc(1000);
        let p1 = mm.malloc(1000);
        let _p2 = mm.malloc(1000);
        let p3 = mm.malloc(100);
        mm.free(p1);
        mm.free(p3);
        mm.free(p);
        mm.malloc(20);
        mm.malloc(5000);
        for _ in 0..3 {
            mm.malloc(1000);
        }

        assert_coherent(&mm);
        assert!(mm.stats().grow_count >= 1, "{}", policy);
    }
}
