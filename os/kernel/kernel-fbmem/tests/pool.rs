use kernel_fbmem::{BackingStore, FbMemError, IdentityTranslator, PagePool, pages_for};
use kernel_info::memory::PAGE_SIZE;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn page_helpers_round_up() {
    assert_eq!(pages_for(0), Some(0));
    assert_eq!(pages_for(1), Some(1));
    assert_eq!(pages_for(PAGE_SIZE), Some(1));
    assert_eq!(pages_for(PAGE_SIZE + 1), Some(2));
    assert_eq!(pages_for(usize::MAX), None);
}

#[test]
fn concurrent_allocations_never_exceed_budget() {
    const THREADS: usize = 8;
    const BUDGET: usize = 10;

    let pool = Arc::new(PagePool::new(BUDGET));
    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                BackingStore::allocate(&pool, 3 * PAGE_SIZE)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let granted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, BUDGET / 3);
    assert_eq!(pool.in_use(), granted * 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == FbMemError::OutOfMemory)
    );

    drop(results);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn shared_handle_keeps_pages_pinned() {
    let pool = Arc::new(PagePool::new(4));
    let store = Arc::new(BackingStore::allocate(&pool, 2 * PAGE_SIZE).unwrap());
    let consumer = Arc::clone(&store);

    drop(store);
    assert_eq!(pool.in_use(), 2);
    assert!(consumer.export_page(1, &IdentityTranslator).is_ok());
    assert!(consumer.page(1).unwrap().exported());

    drop(consumer);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn disjoint_ranges_can_be_filled_from_other_threads() {
    let pool = Arc::new(PagePool::new(4));
    let store = Arc::new(BackingStore::allocate(&pool, 2 * PAGE_SIZE).unwrap());

    let writers: Vec<_> = [(0, 0x5A_u8), (PAGE_SIZE, 0xA5)]
        .into_iter()
        .map(|(offset, byte)| {
            let store = Arc::clone(&store);
            // SAFETY: each thread owns its own page of the store.
            thread::spawn(move || unsafe { store.write_at(offset, &[byte; 16]).unwrap() })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    let mut first = [0u8; 16];
    let mut second = [0u8; 16];
    // SAFETY: the writers have been joined.
    unsafe {
        store.read_at(0, &mut first).unwrap();
        store.read_at(PAGE_SIZE, &mut second).unwrap();
    }
    assert_eq!(first, [0x5A; 16]);
    assert_eq!(second, [0xA5; 16]);
}

#[test]
fn out_of_range_copies_are_refused() {
    let pool = Arc::new(PagePool::new(2));
    let store = BackingStore::allocate(&pool, 100).unwrap();
    let mut buf = [0u8; 8];

    // SAFETY: the store is not shared.
    unsafe {
        assert_eq!(
            store.read_at(PAGE_SIZE - 4, &mut buf),
            Err(FbMemError::RangeOutOfBounds {
                offset: PAGE_SIZE - 4,
                len: 8,
                store_len: PAGE_SIZE,
            })
        );
        assert!(store.write_at(PAGE_SIZE, &[1]).is_err());
        assert!(store.write_at(PAGE_SIZE, &[]).is_ok());
    }
}
