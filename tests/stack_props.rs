// FixedStack property tests.
//
// Property 1: pure LIFO: N pushes then N pops reverse the sequence.
//
// Property 2: model equivalence under interleaved ops.
//  - Model: a plain Vec driven by the same push/pop/peek sequence.
//  - Invariants after every step: entries() matches the model length,
//    pop/peek agree with the model, capacity is a power of two, at least
//    the minimum (4), and never below the live element count.

use fixed_adts::FixedStack;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_push_then_pop_reverses(values in proptest::collection::vec(any::<u64>(), 0..300)) {
        let mut s = FixedStack::new();
        for &v in &values {
            s.push(v).unwrap();
        }
        prop_assert_eq!(s.entries(), values.len());

        for &v in values.iter().rev() {
            prop_assert_eq!(s.pop(), Some(v));
        }
        prop_assert_eq!(s.pop(), None);
        prop_assert!(s.is_empty());
    }

    #[test]
    fn prop_interleaved_ops_match_vec_model(
        ops in proptest::collection::vec((0u8..=2u8, any::<i32>()), 1..400)
    ) {
        let mut s = FixedStack::new();
        let mut model: Vec<i32> = Vec::new();

        for (op, v) in ops {
            match op {
                0 => {
                    s.push(v).unwrap();
                    model.push(v);
                }
                1 => {
                    prop_assert_eq!(s.pop(), model.pop());
                }
                2 => {
                    match model.last() {
                        Some(top) => prop_assert_eq!(s.peek(), top),
                        None => prop_assert!(s.is_empty()),
                    }
                }
                _ => unreachable!(),
            }

            // Structural invariants hold after every step.
            prop_assert_eq!(s.entries(), model.len());
            prop_assert_eq!(s.is_empty(), model.is_empty());
            prop_assert!(s.capacity().is_power_of_two());
            prop_assert!(s.capacity() >= 4);
            prop_assert!(s.capacity() >= s.entries());
        }

        // Drain and compare the full remaining sequence.
        while let Some(expected) = model.pop() {
            prop_assert_eq!(s.pop(), Some(expected));
        }
        prop_assert!(s.is_empty());
    }
}
