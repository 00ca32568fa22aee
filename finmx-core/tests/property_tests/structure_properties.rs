//! Property-based tests for three-valued structures
//!
//! Tests:
//! - Known values never flip
//! - A predicate becomes two-valued once every tuple is decided

use finmx_core::{DomainElement, SortTable, Structure, TruthValue, Vocabulary};
use proptest::prelude::*;
use std::sync::Arc;

fn unary_structure(size: i64) -> (Structure, finmx_core::SymbolId) {
    let mut voc = Vocabulary::new();
    let s = voc.add_sort("S", &[]);
    let p = voc.add_predicate("P", &[s]);
    let mut structure = Structure::new(Arc::new(voc));
    structure.set_domain(s, SortTable::range(0, size - 1));
    (structure, p)
}

proptest! {
    /// Writing the same value twice is a no-op, the opposite value fails
    #[test]
    fn values_are_monotone(size in 1i64..6, assignments in prop::collection::vec((0i64..6, any::<bool>()), 0..12)) {
        let (mut structure, p) = unary_structure(size);
        for (element, value) in assignments {
            let tuple = [DomainElement::int(element % size)];
            let before = structure.value(p, &tuple);
            let result = structure.set_value(p, &tuple, value);
            match before {
                TruthValue::Unknown => prop_assert!(result.unwrap()),
                known if known.as_bool() == Some(value) => prop_assert!(!result.unwrap()),
                _ => prop_assert!(result.is_err()),
            }
            prop_assert_eq!(structure.value(p, &tuple), before.as_bool().map_or(TruthValue::from_bool(value), TruthValue::from_bool));
        }
    }

    /// Deciding every tuple makes the predicate two-valued
    #[test]
    fn deciding_all_is_two_valued(values in prop::collection::vec(any::<bool>(), 1..6)) {
        let (mut structure, p) = unary_structure(values.len() as i64);
        for (i, &value) in values.iter().enumerate() {
            prop_assert!(!structure.is_two_valued(p).unwrap());
            structure.set_value(p, &[DomainElement::int(i as i64)], value).unwrap();
        }
        prop_assert!(structure.is_two_valued(p).unwrap());
        prop_assert!(structure.is_total().unwrap());
    }
}
