#![cfg(not(loom))]

use core::alloc::Layout;
use proptest::prelude::*;
use quarry::{Arena, ArenaVec};

#[derive(Debug, Clone)]
enum Operation {
    Push(u32),
    Pop,
    Append(Vec<u32>),
}

fn layout_strategy() -> impl Strategy<Value = Layout> {
    (0usize..48, 0u32..6).prop_map(|(size, shift)| {
        Layout::from_size_align(size, 1 << shift).unwrap()
    })
}

proptest! {
    #[test]
    fn allocations_are_aligned_contained_and_disjoint(
        layouts in proptest::collection::vec(layout_strategy(), 1..200)
    ) {
        let arena = Arena::new(128);
        let mut ranges = Vec::new();

        for layout in layouts {
            let ptr = arena.alloc_layout(layout).as_ptr();
            prop_assert_eq!(ptr as usize % layout.align(), 0, "misaligned for {:?}", layout);
            if layout.size() > 0 {
                prop_assert!(arena.contains(ptr.cast_const()));
                prop_assert!(arena.contains(ptr.wrapping_add(layout.size() - 1).cast_const()));
                ranges.push((ptr as usize, ptr as usize + layout.size()));
            }
        }

        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn arena_vec_matches_std_vec(ops in proptest::collection::vec(
        prop_oneof![
            any::<u32>().prop_map(Operation::Push),
            Just(Operation::Pop),
            proptest::collection::vec(any::<u32>(), 0..16).prop_map(Operation::Append),
        ],
        1..100
    )) {
        let arena = Arena::new(64 * 1024);
        let mut model = Vec::new();
        let mut vec = ArenaVec::new_in(&arena);

        for op in ops {
            match op {
                Operation::Push(v) => {
                    model.push(v);
                    vec.push(v);
                }
                Operation::Pop => {
                    prop_assert_eq!(vec.pop(), model.pop());
                }
                Operation::Append(items) => {
                    model.extend_from_slice(&items);
                    vec.append_slice(&items);
                }
            }
            prop_assert!(vec.len() <= vec.capacity());
        }

        prop_assert_eq!(vec.as_slice(), model.as_slice());
    }
}
