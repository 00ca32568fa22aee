//! Property-based tests for the odometer
//!
//! Tests:
//! - Tuple count is the product of the sizes
//! - Tuples come out in strictly increasing lexicographic order
//! - Reset restarts the same sequence

use finmx_core::{DomainElement, Odometer, Tuples};
use proptest::prelude::*;

proptest! {
    /// The number of tuples is the product of the position sizes
    #[test]
    fn count_is_product(sizes in prop::collection::vec(0usize..4, 0..4)) {
        let expected: usize = sizes.iter().product();
        prop_assert_eq!(Odometer::new(sizes).count(), expected);
    }

    /// Rightmost position fastest means lexicographic order
    #[test]
    fn lexicographic_order(sizes in prop::collection::vec(1usize..4, 1..4)) {
        let tuples: Vec<Vec<usize>> = Odometer::new(sizes.clone()).collect();
        for pair in tuples.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for tuple in &tuples {
            for (index, size) in tuple.iter().zip(&sizes) {
                prop_assert!(index < size);
            }
        }
    }

    /// Reset yields the same sequence again
    #[test]
    fn reset_restarts(sizes in prop::collection::vec(0usize..3, 0..4)) {
        let mut odometer = Odometer::new(sizes);
        let first: Vec<Vec<usize>> = odometer.by_ref().collect();
        odometer.reset();
        let second: Vec<Vec<usize>> = odometer.collect();
        prop_assert_eq!(first, second);
    }

    /// Element tuples follow index tuples
    #[test]
    fn element_tuples_match_indices(n in 0i64..4, m in 0i64..4) {
        let left: Vec<DomainElement> = (0..n).map(DomainElement::int).collect();
        let right: Vec<DomainElement> = (10..10 + m).map(DomainElement::int).collect();
        let tuples: Vec<_> = Tuples::new(vec![&left, &right]).collect();
        prop_assert_eq!(tuples.len() as i64, n * m);
        for (tuple, indices) in tuples.iter().zip(Odometer::new(vec![left.len(), right.len()])) {
            prop_assert_eq!(&tuple[0], &left[indices[0]]);
            prop_assert_eq!(&tuple[1], &right[indices[1]]);
        }
    }
}
