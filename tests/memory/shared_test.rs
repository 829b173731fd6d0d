/*!
 * Shared Memory Manager Tests
 */

use crate::support::manager;
use tagged_heap::{AllocationPolicy, SharedMemoryManager};
use std::thread;

#[test]
fn test_concurrent_callers_keep_heap_coherent() {
    let shared = SharedMemoryManager::new(manager(AllocationPolicy::NextFit));

    let handles: Vec<_> = (0..4u8)
        .map(|id| {
            let heap = shared.clone();
            thread::spawn(move || {
                let mut ptrs = Vec::new();
                for round in 0..50usize {
                    let size = 16 + (round * 37 + id as usize * 101) % 700;
                    let ptr = heap.malloc(size);
                    heap.with(|mm| mm.payload_mut(ptr).unwrap()[..size].fill(id + 1));
                    ptrs.push((ptr, size));
                    if round % 3 == 0 {
                        let (old, _) = ptrs.remove(0);
                        heap.free(old);
                    }
                }
                for (ptr, size) in &ptrs {
                    heap.with(|mm| {
                        assert!(mm.payload(*ptr).unwrap()[..*size].iter().all(|&b| b == id + 1));
                    });
                }
                for (ptr, _) in ptrs {
                    heap.free(ptr);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let report = shared.check();
    assert!(report.is_coherent(), "{}", report);
    let stats = shared.stats();
    assert_eq!(stats.allocated_blocks, 0);
    assert_eq!(stats.free_blocks, 1);
}

#[test]
fn test_shared_calloc_and_realloc() {
    let shared = SharedMemoryManager::new(manager(AllocationPolicy::FirstFit));

    let p = shared.calloc(8, 8).unwrap();
    let q = shared.realloc(Some(p), 500).unwrap();
    assert!(shared.with(|mm| mm.payload(q).unwrap()[..64].iter().all(|&b| b == 0)));
    assert_eq!(shared.realloc(Some(q), 0), None);
    assert!(shared.try_malloc(16).is_ok());
}
