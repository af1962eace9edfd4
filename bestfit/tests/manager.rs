use bestfit::*;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn map(m: &MemoryManager) -> Vec<(ByteSteps, ByteSteps, bool)> {
    m.segments()
        .map(|s| (s.left, s.right, s.free))
        .collect()
}

// What best-fit-leftmost must pick, computed straight from the
// partition without looking at the heap.
fn expected_offset(m: &MemoryManager, size: ByteSteps) -> Option<ByteSteps> {
    m.segments()
        .filter(|s| s.free)
        .max_by(|a, b| a.size().cmp(&b.size()).then_with(|| b.left.cmp(&a.left)))
        .filter(|s| s.size() >= size)
        .map(|s| s.left)
}

#[test]
fn fresh_manager() {
    let m = MemoryManager::new(10);
    assert_eq!(m.total_size(), 10);
    assert_eq!(m.largest_free(), 10);
    assert_eq!(map(&m), vec![(0, 10, true)]);
    assert!(m.check_invariants().is_ok());
}

#[test]
fn three_allocations_then_reuse() {
    let mut m = MemoryManager::new(10);
    let a = m.allocate(3).unwrap();
    let b = m.allocate(3).unwrap();
    let c = m.allocate(3).unwrap();
    assert_eq!((a.offset(), b.offset(), c.offset()), (0, 3, 6));
    m.free(b).unwrap();
    assert_eq!(map(&m), vec![(0, 3, false), (3, 6, true), (6, 9, false), (9, 10, true)]);
    // [3, 6) is now the largest free segment and an exact fit.
    let d = m.allocate(3).unwrap();
    assert_eq!(d.offset(), 3);
    assert_eq!(d.id(), b.id());
    assert!(m.check_invariants().is_ok());
}

#[test]
fn oversized_request_fails_without_side_effects() {
    let mut m = MemoryManager::new(5);
    let before = map(&m);
    assert_eq!(
        m.allocate(6),
        Err(AllocError::Exhausted { requested: 6, largest_free: 5 })
    );
    assert_eq!(map(&m), before);
}

#[test]
fn free_coalesces_back_to_whole_range() {
    let mut m = MemoryManager::new(10);
    let a = m.allocate(4).unwrap();
    m.free(a).unwrap();
    assert_eq!(map(&m), vec![(0, 10, true)]);
    let b = m.allocate(4).unwrap();
    assert_eq!(b.offset(), 0);
}

#[test]
fn largest_segment_wins_over_leftmost() {
    let mut m = MemoryManager::new(20);
    let a = m.allocate(2).unwrap();
    let _b = m.allocate(2).unwrap();
    let c = m.allocate(5).unwrap();
    let _d = m.allocate(1).unwrap();
    m.free(a).unwrap();
    m.free(c).unwrap();
    // Free: [0, 2), [4, 9), [10, 20). The biggest one is picked.
    assert_eq!(m.allocate(2).unwrap().offset(), 10);
    // Free: [0, 2), [4, 9), [12, 20). Sizes 2, 5, 8.
    assert_eq!(m.allocate(4).unwrap().offset(), 12);
    // Free: [0, 2), [4, 9), [16, 20). Sizes 2, 5, 4.
    assert_eq!(m.allocate(1).unwrap().offset(), 4);
    assert!(m.check_invariants().is_ok());
}

#[test]
fn ties_go_to_the_leftmost_segment() {
    let mut m = MemoryManager::new(9);
    let a = m.allocate(3).unwrap();
    let _b = m.allocate(3).unwrap();
    let c = m.allocate(3).unwrap();
    m.free(c).unwrap();
    m.free(a).unwrap();
    assert_eq!(m.allocate(3).unwrap().offset(), 0);
    assert_eq!(m.allocate(3).unwrap().offset(), 6);
}

#[test]
fn merge_with_both_neighbours() {
    let mut m = MemoryManager::new(12);
    let a = m.allocate(4).unwrap();
    let b = m.allocate(4).unwrap();
    let c = m.allocate(4).unwrap();
    m.free(a).unwrap();
    m.free(c).unwrap();
    assert_eq!(map(&m), vec![(0, 4, true), (4, 8, false), (8, 12, true)]);
    m.free(b).unwrap();
    assert_eq!(map(&m), vec![(0, 12, true)]);
    assert_eq!(m.stats(), Stats {
        total:              12,
        free_bytes:         12,
        allocated_bytes:    0,
        free_segments:      1,
        allocated_segments: 0,
        largest_free:       12,
    });
    assert!(m.check_invariants().is_ok());
}

#[test]
fn zero_sized_requests() {
    let mut m = MemoryManager::new(4);
    let z = m.allocate(0).unwrap();
    assert_eq!((z.offset(), z.size()), (0, 0));
    assert_eq!(map(&m), vec![(0, 0, false), (0, 4, true)]);
    assert!(m.check_invariants().is_ok());
    let full = m.allocate(4).unwrap();
    assert_eq!(full.offset(), 0);
    // Nothing free at all: even an empty request is refused.
    assert_eq!(
        m.allocate(0),
        Err(AllocError::Exhausted { requested: 0, largest_free: 0 })
    );
    m.free(z).unwrap();
    assert!(m.check_invariants().is_ok());
    m.free(full).unwrap();
    assert_eq!(map(&m), vec![(0, 4, true)]);
}

#[test]
fn empty_range() {
    let mut m = MemoryManager::new(0);
    let z = m.allocate(0).unwrap();
    assert_eq!(z.offset(), 0);
    assert!(m.allocate(1).is_err());
    m.free(z).unwrap();
    assert_eq!(map(&m), vec![(0, 0, true)]);
}

#[test]
fn double_free_is_rejected() {
    let mut m = MemoryManager::new(10);
    let a = m.allocate(5).unwrap();
    m.free(a).unwrap();
    assert!(!m.is_live(&a));
    assert!(matches!(m.free(a), Err(FreeError::StaleHandle { .. })));
    assert_eq!(map(&m), vec![(0, 10, true)]);
}

#[test]
fn handle_merged_away_is_rejected() {
    let mut m = MemoryManager::new(10);
    let a = m.allocate(2).unwrap();
    let b = m.allocate(2).unwrap();
    m.free(b).unwrap();
    m.free(a).unwrap();
    // `b`'s record has been swallowed by `a`'s.
    assert!(matches!(m.free(b), Err(FreeError::StaleHandle { .. })));
    assert!(m.check_invariants().is_ok());
}

#[test]
fn recycled_record_does_not_revive_old_handle() {
    let mut m = MemoryManager::new(6);
    let a = m.allocate(3).unwrap();
    let b = m.allocate(3).unwrap();
    m.free(a).unwrap();
    // Exact fit: the very record `a` pointed at is handed out again.
    let c = m.allocate(3).unwrap();
    assert_eq!(c.id(), a.id());
    assert_eq!(c.offset(), a.offset());
    assert_eq!(
        m.free(a),
        Err(FreeError::StaleHandle {
            slot:       a.id().index(),
            generation: a.generation(),
            current:    c.generation(),
        })
    );
    assert!(m.is_live(&c));
    m.free(c).unwrap();
    m.free(b).unwrap();
    assert_eq!(map(&m), vec![(0, 6, true)]);
}

#[test]
fn foreign_handle_is_rejected() {
    let mut big = MemoryManager::new(100);
    let mut handles = vec![];
    for _ in 0..10 {
        handles.push(big.allocate(1).unwrap());
    }
    let mut small = MemoryManager::new(100);
    assert_eq!(
        small.free(handles[9]),
        Err(FreeError::UnknownSlot { slot: handles[9].id().index() })
    );
}

#[test]
fn foreign_ids_do_not_panic_the_partition() {
    let mut big = MemoryManager::new(100);
    let last = (0..10)
        .map(|_| big.allocate(1).unwrap())
        .last()
        .unwrap();
    let p = SegmentPartition::new(100);
    assert_eq!(p.generation(last.id()), None);
    assert_eq!(p.prev(last.id()), None);
    assert_eq!(p.next(last.id()), None);
    assert!(p.get(last.id()).is_none());
    assert_eq!(p.generation(p.first()), Some(0));
}

#[test]
fn round_trip_restores_partition() {
    let mut m = MemoryManager::new(64);
    let mut live = vec![];
    for size in [5, 9, 3, 12, 7] {
        live.push(m.allocate(size).unwrap());
    }
    m.free(live.remove(1)).unwrap();
    m.free(live.remove(2)).unwrap();
    for size in [0, 1, 3, 9, 12, 20, 36] {
        let before = map(&m);
        if let Ok(a) = m.allocate(size) {
            m.free(a).unwrap();
        }
        assert_eq!(map(&m), before, "round trip of {} changed the map", size);
    }
}

#[test]
fn randomized_against_invariants() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut m = MemoryManager::new(1_000);
    let mut live: Vec<Allocation> = vec![];
    let mut dead: Vec<Allocation> = vec![];
    for _ in 0..4_000 {
        if rng.gen_bool(0.55) || live.is_empty() {
            let size = rng.gen_range(0..120);
            let expected = expected_offset(&m, size);
            match m.allocate(size) {
                Ok(a)   => {
                    assert_eq!(Some(a.offset()), expected);
                    assert_eq!(a.size(), size);
                    live.push(a);
                },
                Err(AllocError::Exhausted { largest_free, .. }) => {
                    assert_eq!(expected, None);
                    assert!(largest_free < size || m.stats().free_segments == 0);
                }
            }
        } else {
            let a = live.swap_remove(rng.gen_range(0..live.len()));
            m.free(a).unwrap();
            dead.push(a);
        }
        assert!(m.check_invariants().is_ok(), "{:?}", m);
    }
    for a in &dead {
        assert!(m.free(*a).is_err());
    }
    let allocated: ByteSteps = live.iter().map(|a| a.size()).sum();
    assert_eq!(m.stats().allocated_bytes, allocated);
}

proptest! {
    #[test]
    fn placements_follow_best_fit_leftmost(
        ops in prop::collection::vec((any::<bool>(), 0usize..40, any::<prop::sample::Index>()), 1..200)
    ) {
        let mut m = MemoryManager::new(256);
        let mut live: Vec<Allocation> = vec![];
        for (is_alloc, size, pick) in ops {
            if is_alloc || live.is_empty() {
                let expected = expected_offset(&m, size);
                let largest = m.largest_free();
                match m.allocate(size) {
                    Ok(a)   => {
                        prop_assert_eq!(Some(a.offset()), expected);
                        live.push(a);
                    },
                    Err(_)  => {
                        prop_assert!(size > largest || m.stats().free_segments == 0);
                        prop_assert_eq!(expected, None);
                    }
                }
            } else {
                let a = live.swap_remove(pick.index(live.len()));
                prop_assert!(m.free(a).is_ok());
                prop_assert!(m.free(a).is_err());
            }
            prop_assert_eq!(m.check_invariants(), Ok(()));
            let covered: ByteSteps = m.segments().map(|s| s.size()).sum();
            prop_assert_eq!(covered, 256);
        }
    }
}
