use kehricht::{GcError, GcOptions, Handle, HeapNode, Manager, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry count agrees with both walk directions, and the ends line up
fn assert_registry_integrity(manager: &Manager) {
    let heap = manager.heap();
    let forward: Vec<Handle> = heap.handles().collect();
    let mut backward: Vec<Handle> = heap.handles_rev().collect();
    backward.reverse();
    assert_eq!(forward.len(), manager.len());
    assert_eq!(forward, backward);
    assert_eq!(heap.head().is_none(), manager.is_empty());
    assert_eq!(heap.tail().is_none(), manager.is_empty());
    assert!(
        forward
            .iter()
            .all(|&h| heap.node(h).is_some_and(|node| !node.color().is_marked()))
    );
}

fn bytes(manager: &Manager, handle: Handle) -> Option<&[u8]> {
    manager.get(handle).and_then(Value::as_bytes)
}

fn integer(manager: &Manager, handle: Handle) -> Option<i32> {
    manager.get(handle).and_then(Value::as_integer)
}

#[test]
fn hello_array_scenario() {
    init_tracing();
    let mut manager = Manager::new();
    let root = manager.allocate_array(10).unwrap();
    for i in 0..5 {
        let n = manager.allocate_integer(i as i32 + 1).unwrap();
        manager.set_element(root, i * 2, Some(n)).unwrap();
        let s = manager.allocate_string(b"Hello").unwrap();
        manager.set_element(root, i * 2 + 1, Some(s)).unwrap();
    }
    for i in (0..10).step_by(3) {
        manager.set_element(root, i, None).unwrap();
    }
    manager.set_root(Some(root));

    let stats = manager.collect();
    assert_eq!(stats.freed, 4);

    let survivors: Vec<_> = (0..10)
        .filter_map(|i| manager.element(root, i).map(|h| (i, h)))
        .collect();
    assert_eq!(survivors.len(), 6);
    assert_eq!(bytes(&manager, survivors[0].1), Some(&b"Hello"[..]));
    let expected_ints = [(2, 2), (4, 3), (8, 5)];
    for (index, value) in expected_ints {
        let handle = manager.element(root, index).unwrap();
        assert_eq!(integer(&manager, handle), Some(value));
    }
    for index in [1, 5, 7] {
        let handle = manager.element(root, index).unwrap();
        assert_eq!(bytes(&manager, handle), Some(&b"Hello"[..]));
    }
    // the six elements plus the root array itself
    assert_eq!(manager.len(), 7);
    assert_registry_integrity(&manager);
}

#[test]
fn unreachable_values_freed_exactly_once() {
    let mut manager = Manager::new();
    let root = manager.allocate_array(3).unwrap();
    manager.set_root(Some(root));
    let garbage: Vec<_> = (0..20).map(|i| manager.allocate_integer(i).unwrap()).collect();
    let kept = manager.allocate_float(1.25).unwrap();
    manager.set_element(root, 1, Some(kept)).unwrap();

    let first = manager.collect();
    assert_eq!(first.freed, 20);
    let second = manager.collect();
    assert_eq!(second.freed, 0);
    assert_eq!(manager.stats().objects_freed, 20);
    assert!(garbage.iter().all(|&h| !manager.is_live(h)));
    assert_registry_integrity(&manager);
}

#[test]
fn freed_handles_never_resurrect() {
    let mut manager = Manager::new();
    let gone = manager.allocate_integer(7).unwrap();
    manager.collect();
    let fresh = manager.allocate_integer(8).unwrap();
    assert_eq!(fresh.index(), gone.index());
    assert_eq!(manager.get(gone), None);

    // a stale handle stored in a reachable array is skipped, not revived
    let root = manager.allocate_array_from(&[Some(gone), Some(fresh)]).unwrap();
    manager.set_root(Some(root));
    let stats = manager.collect();
    assert_eq!(stats.marked, 2);
    assert!(!manager.is_live(gone));
    assert!(manager.is_live(fresh));
}

#[test]
fn repeated_collections_are_stable() {
    let mut manager = Manager::new();
    let root = manager.allocate_array(4).unwrap();
    for i in 0..4 {
        let child = manager.allocate_array_from(&[Some(root)]).unwrap();
        manager.set_element(root, i, Some(child)).unwrap();
    }
    manager.set_root(Some(root));
    let first = manager.collect();
    for _ in 0..5 {
        assert_eq!(manager.collect(), first);
        assert_registry_integrity(&manager);
    }
    assert_eq!(first.marked, 5);
    assert_eq!(first.freed, 0);
}

#[test]
fn self_referencing_root_survives() {
    let mut manager = Manager::new();
    let root = manager.allocate_array(1).unwrap();
    manager.set_element(root, 0, Some(root)).unwrap();
    manager.set_root(Some(root));
    let stats = manager.collect();
    assert_eq!(stats.marked, 1);
    assert!(manager.is_live(root));
}

#[test]
fn unreachable_cycle_is_reclaimed() {
    let mut manager = Manager::new();
    let ring: Vec<_> = (0..8).map(|_| manager.allocate_array(1).unwrap()).collect();
    for (i, &node) in ring.iter().enumerate() {
        let next = ring[(i + 1) % ring.len()];
        manager.set_element(node, 0, Some(next)).unwrap();
    }

    manager.set_root(Some(ring[3]));
    assert_eq!(manager.collect().freed, 0);

    manager.set_root(None);
    let stats = manager.collect();
    assert_eq!(stats.freed, 8);
    assert!(manager.is_empty());
    assert_registry_integrity(&manager);
}

#[test]
fn deep_chain_does_not_overflow_stack() {
    let mut manager = Manager::with_options(GcOptions::DEFAULT.with_initial_threshold(usize::MAX));
    let mut prev = None;
    for _ in 0..200_000 {
        prev = Some(manager.allocate_array_from(&[prev]).unwrap());
    }
    manager.set_root(prev);
    let stats = manager.collect();
    assert_eq!(stats.marked, 200_000);
    assert_eq!(stats.freed, 0);
}

#[test]
fn registry_integrity_across_mixed_workload() {
    init_tracing();
    let mut manager = Manager::with_options(GcOptions::DEFAULT.with_initial_threshold(8));
    let root = manager.allocate_array(16).unwrap();
    manager.set_root(Some(root));
    for round in 0..50usize {
        let value = match round % 3 {
            0 => manager.allocate_integer(round as i32),
            1 => manager.allocate_float(round as f64),
            _ => manager.allocate_string(format!("value {round}").as_bytes()),
        }
        .unwrap();
        if round % 4 == 0 {
            manager.set_element(root, round % 16, Some(value)).unwrap();
        }
        if round % 7 == 0 {
            manager.collect();
        }
        assert_registry_integrity(&manager);
    }
}

#[test]
fn threshold_doubles_on_each_triggered_collection() {
    let mut manager = Manager::with_options(GcOptions::DEFAULT.with_initial_threshold(2));
    let root = manager.allocate_array(64).unwrap();
    manager.set_root(Some(root));

    let mut seen = vec![manager.threshold()];
    for i in 0..64 {
        let value = manager.allocate_integer(i as i32).unwrap();
        // everything stays reachable, so collections reclaim nothing
        manager.set_element(root, i, Some(value)).unwrap();
        if manager.threshold() != *seen.last().unwrap() {
            seen.push(manager.threshold());
        }
    }
    assert_eq!(seen, vec![2, 4, 8, 16, 32, 64]);
    assert_eq!(manager.stats().threshold_collections, 5);
    assert_eq!(manager.stats().objects_freed, 0);
}

#[test]
fn exhaustion_recovers_by_collecting() {
    init_tracing();
    let limit = 4 * HeapNode::SIZE;
    let mut manager = Manager::with_options(GcOptions::DEFAULT.with_memory_limit(limit));
    for i in 0..4 {
        manager.allocate_integer(i).unwrap();
    }
    assert_eq!(manager.bytes_allocated(), limit);

    let next = manager.allocate_integer(99).unwrap();
    assert_eq!(manager.stats().failure_collections, 1);
    assert_eq!(manager.len(), 1);
    assert_eq!(integer(&manager, next), Some(99));
}

#[test]
fn exhaustion_without_garbage_fails() {
    let limit = 2 * HeapNode::SIZE + size_of::<Option<Handle>>();
    let mut manager = Manager::with_options(GcOptions::DEFAULT.with_memory_limit(limit));
    let root = manager.allocate_array(1).unwrap();
    manager.set_root(Some(root));
    let value = manager.allocate_integer(1).unwrap();
    manager.set_element(root, 0, Some(value)).unwrap();
    assert_eq!(manager.bytes_allocated(), limit);

    let err = manager.allocate_integer(2).unwrap_err();
    assert_eq!(
        err,
        GcError::AllocationFailure {
            requested: HeapNode::SIZE
        }
    );
    assert_eq!(manager.stats().failure_collections, 1);
    assert_eq!(manager.len(), 2);
    assert_registry_integrity(&manager);
}

#[test]
fn teardown_frees_shared_children_once() {
    let mut manager = Manager::new();
    let shared = manager.allocate_string(b"shared").unwrap();
    let a = manager.allocate_array_from(&[Some(shared)]).unwrap();
    let b = manager.allocate_array_from(&[Some(shared), Some(a)]).unwrap();
    let outer = manager.allocate_array_from(&[Some(a), Some(b), None]).unwrap();
    manager.set_element(outer, 2, Some(outer)).unwrap();
    manager.set_root(Some(outer));
    assert_eq!(manager.len(), 4);

    manager.reset();
    assert_eq!(manager.len(), 0);
    assert_eq!(manager.bytes_allocated(), 0);
    assert_eq!(manager.root(), None);
    for handle in [shared, a, b, outer] {
        assert!(!manager.is_live(handle));
    }
    assert_registry_integrity(&manager);

    // the same manager is usable again after teardown
    let again = manager.allocate_string(b"shared").unwrap();
    assert!(manager.is_live(again));
    manager.destroy();
}

#[test]
fn handles_are_bound_to_their_manager() {
    let mut a = Manager::new();
    let mut b = Manager::new();
    let ha = a.allocate_integer(1).unwrap();
    let hb = b.allocate_integer(2).unwrap();
    assert_eq!(ha.index(), hb.index());

    assert_eq!(b.get(ha), None);
    assert!(!b.is_live(ha));
    assert_eq!(b.set_element(ha, 0, None), Err(GcError::StaleHandle));

    // a foreign handle in a root array is not followed
    let root = b.allocate_array_from(&[Some(ha)]).unwrap();
    b.set_root(Some(root));
    assert_eq!(b.collect().marked, 1);
    assert_eq!(integer(&a, ha), Some(1));
}

#[test]
fn oversized_array_reports_overflow() {
    let mut manager = Manager::new();
    let len = usize::MAX / 2;
    assert_eq!(
        manager.allocate_array(len),
        Err(GcError::CapacityOverflow { len })
    );
    assert_eq!(manager.len(), 0);
    assert_eq!(manager.bytes_allocated(), 0);
    assert_eq!(manager.stats().failure_collections, 0);
    assert_registry_integrity(&manager);
}
