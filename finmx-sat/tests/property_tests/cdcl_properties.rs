//! Property-based tests for the CDCL solver
//!
//! Tests:
//! - Satisfiability agrees with brute force
//! - Returned models satisfy every clause
//! - Blocking-clause enumeration finds every model exactly once

use finmx_sat::{Lit, Solver, SolverResult, Var};
use proptest::prelude::*;

const NUM_VARS: u32 = 5;

fn clause_strategy() -> impl Strategy<Value = Vec<(u32, bool)>> {
    prop::collection::vec((0..NUM_VARS, any::<bool>()), 1..4)
}

fn formula_strategy() -> impl Strategy<Value = Vec<Vec<(u32, bool)>>> {
    prop::collection::vec(clause_strategy(), 0..14)
}

fn to_lits(clause: &[(u32, bool)]) -> Vec<Lit> {
    clause.iter().map(|&(v, p)| Lit::new(Var::new(v), p)).collect()
}

fn satisfies(assignment: u32, clause: &[(u32, bool)]) -> bool {
    clause
        .iter()
        .any(|&(v, p)| ((assignment >> v) & 1 == 1) == p)
}

fn brute_force_count(formula: &[Vec<(u32, bool)>]) -> usize {
    (0..(1u32 << NUM_VARS))
        .filter(|&a| formula.iter().all(|c| satisfies(a, c)))
        .count()
}

fn load(formula: &[Vec<(u32, bool)>]) -> Solver<'static> {
    let mut solver = Solver::new();
    for _ in 0..NUM_VARS {
        solver.new_var();
    }
    for clause in formula {
        solver.add_clause(&to_lits(clause));
    }
    solver
}

proptest! {
    /// Sat/Unsat matches exhaustive search and models are genuine
    #[test]
    fn agrees_with_brute_force(formula in formula_strategy()) {
        let mut solver = load(&formula);
        let expected = brute_force_count(&formula) > 0;
        match solver.solve() {
            SolverResult::Sat => {
                prop_assert!(expected);
                let model = solver.model().unwrap();
                let assignment = (0..NUM_VARS)
                    .filter(|&v| model.value(Var::new(v)))
                    .fold(0u32, |acc, v| acc | (1 << v));
                for clause in &formula {
                    prop_assert!(satisfies(assignment, clause));
                }
            }
            SolverResult::Unsat => prop_assert!(!expected),
            SolverResult::Unknown => prop_assert!(false, "no budget was set"),
        }
    }

    /// Enumerating with blocking clauses counts every model once
    #[test]
    fn enumeration_counts_models(formula in formula_strategy()) {
        let mut solver = load(&formula);
        let mut found = 0usize;
        while solver.solve() == SolverResult::Sat {
            found += 1;
            let block: Vec<Lit> = {
                let model = solver.model().unwrap();
                (0..NUM_VARS)
                    .map(|v| Lit::new(Var::new(v), !model.value(Var::new(v))))
                    .collect()
            };
            solver.add_clause(&block);
            prop_assert!(found <= 1 << NUM_VARS);
        }
        prop_assert_eq!(found, brute_force_count(&formula));
    }
}
