use kernel_vfb::{
    Descriptor, DeviceId, Framebuffers, Geometry, Mode, Presence, VfbConfig, VfbError, Visual,
};
use std::sync::{Arc, Barrier};
use std::thread;

const MODES: [Mode; 2] = [
    Mode::new(640, 480, 8, Visual::PseudoColor),
    Mode::new(800, 600, 16, Visual::TrueColor),
];
const BACKING: u32 = 800 * 600 * 2;

#[test]
fn register_publishes_mode_zero() {
    let fbs = Framebuffers::default();
    let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();

    assert_eq!(fbs.presence(id), Ok(Presence::Present));
    assert_eq!(fbs.current_mode(id), Ok(0));
    assert_eq!(fbs.modes(id).unwrap(), MODES);

    let info = fbs.display_info(id).unwrap();
    assert_eq!(info.node, id.slot());
    assert_eq!(info.fixed.id, "vfb");
    assert_eq!(info.fixed.smem_len, 962_560); // 235 pages
    assert_eq!(info.fixed.line_length, 640);
    assert_eq!(info.fixed.visual, Visual::PseudoColor);
    assert_eq!(info.screen.xres, 640);

    let store = fbs.backing_store(id).unwrap();
    assert_eq!(store.len(), info.fixed.smem_len);
    let mut tail = [0xAA_u8; 64];
    // SAFETY: nothing else touches the fresh store.
    unsafe { store.read_at(store.len() - 64, &mut tail).unwrap() };
    assert_eq!(tail, [0; 64]);
}

#[test]
fn register_validates_descriptor() {
    let fbs = Framebuffers::default();
    assert_eq!(
        fbs.register(Descriptor::new(0, &MODES)),
        Err(VfbError::InvalidArgument)
    );
    assert_eq!(
        fbs.register(Descriptor::new(BACKING, &[])),
        Err(VfbError::InvalidArgument)
    );
    assert_eq!(
        fbs.register(Descriptor::new(BACKING, &[Mode::END])),
        Err(VfbError::InvalidArgument)
    );
    assert_eq!(fbs.stats().occupied, 0);
}

#[test]
fn failed_register_unwinds_its_allocation() {
    let fbs = Framebuffers::new(VfbConfig::default().with_memory_budget_pages(256));

    // mode 0 needs more than the store holds
    let big = [Mode::new(800, 600, 32, Visual::TrueColor)];
    assert_eq!(
        fbs.register(Descriptor::new(4096, &big)),
        Err(VfbError::InsufficientBackingStore {
            required: 1_920_000,
            available: 4096,
        })
    );
    assert_eq!(fbs.pool().in_use(), 0);

    let odd = [Mode::new(16, 16, 12, Visual::TrueColor)];
    assert_eq!(
        fbs.register(Descriptor::new(4096, &odd)),
        Err(VfbError::Unsupported(12))
    );
    assert_eq!(fbs.pool().in_use(), 0);

    // 257 pages do not fit into a 256 page budget
    assert_eq!(
        fbs.register(Descriptor::new(257 * 4096, &MODES)),
        Err(VfbError::OutOfMemory)
    );
    assert_eq!(fbs.pool().in_use(), 0);
    assert_eq!(fbs.stats().occupied, 0);
}

#[test]
fn table_full_is_busy_and_harmless() {
    let fbs = Framebuffers::new(VfbConfig::default().with_capacity(3));
    let ids: Vec<_> = (0..3)
        .map(|_| fbs.register(Descriptor::new(BACKING, &MODES)).unwrap())
        .collect();
    // give the devices distinct state to compare against
    fbs.open(ids[0]).unwrap();
    fbs.open(ids[0]).unwrap();
    fbs.open(ids[2]).unwrap();
    fbs.set_geometry(ids[2], Geometry::new(800, 600, 16)).unwrap();

    let snapshot = |id: DeviceId| {
        (
            fbs.modes(id).unwrap(),
            fbs.current_mode(id).unwrap(),
            fbs.open_count(id).unwrap(),
            fbs.display_info(id).unwrap(),
        )
    };
    let before: Vec<_> = ids.iter().map(|&id| snapshot(id)).collect();
    let in_use = fbs.pool().in_use();

    assert_eq!(
        fbs.register(Descriptor::new(BACKING, &MODES)),
        Err(VfbError::Busy)
    );
    assert_eq!(fbs.pool().in_use(), in_use, "busy register leaks no memory");
    assert_eq!(fbs.stats().occupied, 3);

    let after: Vec<_> = ids.iter().map(|&id| snapshot(id)).collect();
    assert_eq!(after, before);
    assert_eq!(
        after.iter().map(|s| (s.1, s.2)).collect::<Vec<_>>(),
        [(0, 2), (0, 0), (1, 1)]
    );
    for id in &ids {
        assert_eq!(fbs.presence(*id), Ok(Presence::Present));
    }
    fbs.open(ids[1]).unwrap();

    // a freed slot is usable again
    fbs.release(ids[1]).unwrap();
    fbs.unregister(ids[1]).unwrap();
    let again = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    assert_eq!(again.slot(), ids[1].slot());
    assert_ne!(again, ids[1]);
}

#[test]
fn unregister_without_opens_destroys_immediately() {
    let fbs = Framebuffers::default();
    let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();

    fbs.unregister(id).unwrap();
    assert_eq!(fbs.presence(id), Err(VfbError::NotFound));
    assert_eq!(fbs.stats().destroyed, 1);
    assert_eq!(fbs.pool().in_use(), 0);
}

#[test]
fn unregister_defers_teardown_to_last_release() {
    let fbs = Framebuffers::default();
    let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    fbs.open(id).unwrap();
    fbs.open(id).unwrap();

    fbs.unregister(id).unwrap();
    assert_eq!(fbs.presence(id), Ok(Presence::Absent));
    assert_eq!(fbs.open(id), Err(VfbError::NotFound));
    assert_eq!(fbs.current_mode(id), Err(VfbError::NotFound));
    assert_eq!(fbs.stats().destroyed, 0);

    fbs.release(id).unwrap();
    assert_eq!(fbs.open_count(id), Ok(1));
    assert_eq!(fbs.stats().destroyed, 0);

    fbs.release(id).unwrap();
    assert_eq!(fbs.stats().destroyed, 1);
    assert_eq!(fbs.presence(id), Err(VfbError::NotFound));
}

#[test]
fn release_of_present_device_never_destroys() {
    let fbs = Framebuffers::default();
    let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    fbs.open(id).unwrap();
    fbs.release(id).unwrap();

    assert_eq!(fbs.presence(id), Ok(Presence::Present));
    assert_eq!(fbs.stats().destroyed, 0);
}

#[test]
fn misuse_is_refused_without_side_effects() {
    let fbs = Framebuffers::default();
    let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();

    assert_eq!(
        fbs.release(id),
        Err(VfbError::LifecycleViolation("release without open"))
    );
    assert_eq!(fbs.open_count(id), Ok(0));

    fbs.open(id).unwrap();
    fbs.unregister(id).unwrap();
    assert_eq!(
        fbs.unregister(id),
        Err(VfbError::LifecycleViolation("unregister called twice"))
    );
    assert_eq!(fbs.open_count(id), Ok(1));

    fbs.release(id).unwrap();
    assert_eq!(fbs.unregister(id), Err(VfbError::NotFound));
    assert_eq!(fbs.release(id), Err(VfbError::NotFound));
    assert_eq!(fbs.stats().destroyed, 1);
}

#[test]
fn stale_identity_does_not_reach_new_device() {
    let fbs = Framebuffers::new(VfbConfig::default().with_capacity(1));
    let old = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    fbs.unregister(old).unwrap();
    let new = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();

    assert_eq!(old.slot(), new.slot());
    assert_eq!(fbs.open(old), Err(VfbError::NotFound));
    assert_eq!(fbs.unregister(old), Err(VfbError::NotFound));
    assert_eq!(fbs.presence(new), Ok(Presence::Present));
}

#[test]
fn concurrent_opens_then_releases_destroy_once() {
    const THREADS: usize = 8;

    for _ in 0..20 {
        let fbs = Arc::new(Framebuffers::default());
        let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();

        let opened = Arc::new(Barrier::new(THREADS + 1));
        let unregistered = Arc::new(Barrier::new(THREADS + 1));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let fbs = Arc::clone(&fbs);
                let opened = Arc::clone(&opened);
                let unregistered = Arc::clone(&unregistered);
                thread::spawn(move || {
                    fbs.open(id).unwrap();
                    opened.wait();
                    unregistered.wait();
                    fbs.release(id).unwrap();
                })
            })
            .collect();

        opened.wait();
        fbs.unregister(id).unwrap();
        unregistered.wait();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fbs.stats().destroyed, 1);
        assert_eq!(fbs.pool().in_use(), 0);
    }
}

#[test]
fn unregister_racing_releases_destroys_once() {
    const THREADS: usize = 6;

    for _ in 0..50 {
        let fbs = Arc::new(Framebuffers::default());
        let id = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
        for _ in 0..THREADS {
            fbs.open(id).unwrap();
        }

        let start = Arc::new(Barrier::new(THREADS + 1));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let fbs = Arc::clone(&fbs);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    fbs.release(id).unwrap();
                })
            })
            .collect();

        start.wait();
        fbs.unregister(id).unwrap();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fbs.stats().destroyed, 1);
        assert_eq!(fbs.presence(id), Err(VfbError::NotFound));
    }
}

#[test]
fn concurrent_registration_fills_table_exactly() {
    const CAPACITY: usize = 4;
    const THREADS: usize = 10;

    let fbs = Arc::new(Framebuffers::new(
        VfbConfig::default().with_capacity(CAPACITY),
    ));
    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let fbs = Arc::clone(&fbs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                fbs.register(Descriptor::new(4096, &[Mode::new(32, 32, 8, Visual::PseudoColor)]))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let mut slots: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|id| id.slot()))
        .collect();
    slots.sort_unstable();

    assert_eq!(slots, (0..CAPACITY).collect::<Vec<_>>());
    assert_eq!(
        results.iter().filter(|r| **r == Err(VfbError::Busy)).count(),
        THREADS - CAPACITY
    );
}

#[test]
fn shutdown_unregisters_everything() {
    let fbs = Framebuffers::default();
    let idle = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    let busy = fbs.register(Descriptor::new(BACKING, &MODES)).unwrap();
    fbs.open(busy).unwrap();

    let report = fbs.shutdown();
    assert_eq!(report.unregistered, 2);
    assert_eq!(report.pending, 1);
    assert_eq!(fbs.presence(idle), Err(VfbError::NotFound));
    assert_eq!(fbs.presence(busy), Ok(Presence::Absent));

    fbs.release(busy).unwrap();
    assert_eq!(fbs.stats().occupied, 0);
    assert_eq!(fbs.stats().destroyed, 2);
}

#[test]
fn context_and_store_outlive_queries() {
    let fbs = Framebuffers::default();
    let ctx: Arc<kernel_vfb::DriverContext> = Arc::new(String::from("panel-0"));
    let id = fbs
        .register(Descriptor::new(BACKING, &MODES).with_context(ctx))
        .unwrap();

    let got = fbs.private_context(id).unwrap().unwrap();
    assert_eq!(got.downcast_ref::<String>().unwrap(), "panel-0");

    let store = fbs.backing_store(id).unwrap();
    fbs.unregister(id).unwrap();
    assert_eq!(fbs.private_context(id).err(), Some(VfbError::NotFound));

    // the consumer's handle keeps the memory until it goes away
    assert_ne!(fbs.pool().in_use(), 0);
    drop(store);
    assert_eq!(fbs.pool().in_use(), 0);
}
