/*!
 * memmgr - Heap Manager Demo Driver
 *
 * Replays a scripted allocation session against a fresh data segment and
 * prints the heap check after every step.
 *
 * Environment variables:
 * - HEAP_POLICY: first-fit, next-fit or best-fit (default: next-fit)
 * - HEAP_SEGMENT_MB: data segment capacity in MB (default: 32)
 * - HEAP_CHUNK_PAGES / HEAP_VERIFY: see `HeapConfig::from_env`
 * - HEAP_REPORT_JSON: print the final statistics as JSON
 */

use miette::{miette, IntoDiagnostic, WrapErr};
use tracing::info;

use tagged_heap::core::limits::DEFAULT_SEGMENT_CAPACITY;
use tagged_heap::{
    init_tracing, Address, AllocationPolicy, DataSegment, HeapConfig, MemoryManager,
};

fn step(mm: &MemoryManager, label: &str) {
    info!(step = label, "heap state");
    println!("\n>>> {}\n{}", label, mm.check());
}

/// Segment capacity in bytes from a `HEAP_SEGMENT_MB` value
fn segment_capacity(mb: Option<&str>) -> miette::Result<usize> {
    let Some(mb) = mb else {
        return Ok(DEFAULT_SEGMENT_CAPACITY);
    };
    mb.trim()
        .parse::<usize>()
        .into_diagnostic()
        .wrap_err("HEAP_SEGMENT_MB")?
        .checked_mul(1024 * 1024)
        .ok_or_else(|| miette!("HEAP_SEGMENT_MB={} overflows the address space", mb))
}

fn main() -> miette::Result<()> {
    init_tracing();

    let policy: AllocationPolicy = std::env::var("HEAP_POLICY")
        .unwrap_or_else(|_| "next-fit".to_string())
        .parse()
        .into_diagnostic()
        .wrap_err("HEAP_POLICY")?;
    let capacity = segment_capacity(std::env::var("HEAP_SEGMENT_MB").ok().as_deref())?;
    let config = HeapConfig::from_env();

    info!(%policy, capacity, ?config, "Starting heap manager session");

    let mut mm = MemoryManager::with_config(DataSegment::new(capacity), config);
    mm.init(policy);
    step(&mm, "init");

    // Basic allocation and coalescing
    let p = mm.malloc(1000);
    step(&mm, "malloc(1000)");
    let p1 = mm.malloc(1000);
    step(&mm, "malloc(1000)");
    let _p2 = mm.malloc(1000);
    step(&mm, "malloc(1000)");
    let p3 = mm.malloc(100);
    step(&mm, "malloc(100)");

    mm.free(p1);
    step(&mm, "free(p1)");
    mm.free(p3);
    step(&mm, "free(p3)");
    mm.free(p);
    step(&mm, "free(p)");

    mm.malloc(20);
    step(&mm, "malloc(20)");
    mm.malloc(5000);
    step(&mm, "malloc(5000)");
    for _ in 0..3 {
        mm.malloc(1000);
        step(&mm, "malloc(1000)");
    }

    // Size ladder
    let sizes: [usize; 19] = [
        1, 15, 16, 17, 31, 32, 33, 47, 48, 49, 100, 200, 400, 1024, 0x1000, 0x2000, 0x4000,
        0x8000, 0x10000,
    ];
    let mut ptrs: Vec<Address> = Vec::with_capacity(sizes.len());
    for size in sizes {
        ptrs.push(mm.malloc(size));
        step(&mm, &format!("malloc({})", size));
    }

    for idx in [0, 1, 3, 2, 7, 6, 5, 4, 10] {
        mm.free(ptrs[idx]);
        step(&mm, &format!("free(ptr[{}])", idx));
    }

    // Reallocation
    let mut q = ptrs[9];
    for size in [50, 60, 48, 220] {
        q = mm.realloc(Some(q), size).unwrap_or(q);
        step(&mm, &format!("realloc(ptr[9], {})", size));
    }

    let stats = mm.stats();
    let json = std::env::var("HEAP_REPORT_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).into_diagnostic()?
        );
    } else {
        info!(
            heap_size = stats.heap_size,
            allocated_blocks = stats.allocated_blocks,
            free_blocks = stats.free_blocks,
            largest_free_block = stats.largest_free_block,
            grow_count = stats.grow_count,
            fragmentation = stats.fragmentation(),
            "Session complete"
        );
    }

    Ok(())
}
