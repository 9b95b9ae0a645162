use kernel_vfb::{Descriptor, Mode, VfbConfig, VfbError, Visual, service};

const MODES: [Mode; 1] = [Mode::new(64, 64, 8, Visual::PseudoColor)];

// One test per binary: the service is process-global.
#[test]
fn start_use_stop() {
    assert_eq!(service::instance().err(), Some(VfbError::NotFound));
    assert!(service::stop().is_none());

    let fbs = service::start(VfbConfig::default().with_capacity(4)).unwrap();
    assert_eq!(
        service::start(VfbConfig::default()).err(),
        Some(VfbError::Busy)
    );

    let shared = service::instance().unwrap();
    assert_eq!(shared.capacity(), 4);
    let idle = shared.register(Descriptor::new(4096, &MODES)).unwrap();
    let held = fbs.register(Descriptor::new(4096, &MODES)).unwrap();
    fbs.open(held).unwrap();

    let report = service::stop().unwrap();
    assert_eq!(report.unregistered, 2);
    assert_eq!(report.pending, 1);
    assert_eq!(service::instance().err(), Some(VfbError::NotFound));
    assert_eq!(fbs.open(idle), Err(VfbError::NotFound));

    // the last release still tears the held device down
    fbs.release(held).unwrap();
    assert_eq!(fbs.stats().destroyed, 2);

    // and the service can come back
    let again = service::start(VfbConfig::default()).unwrap();
    assert_eq!(again.stats().registered, 0);
    assert!(service::stop().is_some());
}
