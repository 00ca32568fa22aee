//! Property-based tests for the grounder
//!
//! Tests:
//! - A quantifier over k variables has one instance per domain tuple
//! - Instances follow odometer order
//! - Grounding a ground formula is the identity

use finmx_core::{DomainElement, Formula, SortTable, Structure, Term, Variable, Vocabulary};
use finmx_solver::Grounder;
use proptest::prelude::*;
use std::sync::Arc;

fn setup(sizes: &[usize]) -> (Structure, Vec<Variable>, finmx_core::SymbolId) {
    let mut voc = Vocabulary::new();
    let sorts: Vec<_> = (0..sizes.len())
        .map(|i| voc.add_sort(&format!("S{}", i), &[]))
        .collect();
    let r = voc.add_predicate("R", &sorts);
    let voc = Arc::new(voc);
    let mut structure = Structure::new(voc);
    for (i, (&sort, &size)) in sorts.iter().zip(sizes).enumerate() {
        let elements = (0..size as i64).map(|v| DomainElement::int(10 * i as i64 + v));
        structure.set_domain(sort, SortTable::finite(elements));
    }
    let vars = sorts
        .iter()
        .enumerate()
        .map(|(i, &s)| Variable::new(i as u32, &format!("x{}", i), s))
        .collect();
    (structure, vars, r)
}

proptest! {
    #[test]
    fn quantifier_has_one_instance_per_tuple(sizes in prop::collection::vec(0usize..4, 1..4), universal in any::<bool>()) {
        let (structure, vars, r) = setup(&sizes);
        let body = Formula::atom(r, vars.iter().map(Term::var).collect());
        let formula = if universal {
            Formula::forall(vars.clone(), body)
        } else {
            Formula::exists(vars.clone(), body)
        };
        let ground = Grounder::new(&structure).ground_formula(&formula).unwrap();
        let Formula::Boolean { conjunction, children, .. } = &ground else {
            panic!("expected a Boolean formula");
        };
        prop_assert_eq!(*conjunction, universal);
        prop_assert_eq!(children.len(), sizes.iter().product::<usize>());

        let tuples: Vec<Vec<DomainElement>> = children
            .iter()
            .map(|c| match c {
                Formula::Atomic { args, .. } => args.iter().filter_map(|t| t.as_domain().cloned()).collect(),
                other => panic!("unexpected instance {:?}", other),
            })
            .collect();
        let mut sorted = tuples.clone();
        sorted.sort();
        // elements increase with the sort index, so odometer order is lexicographic
        prop_assert_eq!(tuples, sorted);
    }

    #[test]
    fn ground_formulas_are_fixed_points(sizes in prop::collection::vec(1usize..4, 1..3)) {
        let (structure, vars, r) = setup(&sizes);
        let formula = Formula::forall(vars.clone(), Formula::atom(r, vars.iter().map(Term::var).collect()));
        let grounder = Grounder::new(&structure);
        let once = grounder.ground_formula(&formula).unwrap();
        prop_assert!(once.is_ground());
        let twice = grounder.ground_formula(&once).unwrap();
        prop_assert_eq!(once, twice);
    }
}
