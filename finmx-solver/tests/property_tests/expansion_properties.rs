//! Property-based tests for model expansion
//!
//! Tests:
//! - Every returned model satisfies the theory
//! - Symmetry breaking keeps at least one model of a satisfiable theory and
//!   never adds models
//! - With relations, functions and partial input, every model is a
//!   permutation of a model kept by symmetry breaking

use finmx_core::{
    AggregateKind, Comparator, DomainElement, ExpansionConfig, Formula, SetExpr, SortTable,
    Structure, SymbolId, SymmetryBreaking, Term, Theory, TruthValue, Tuple, Variable, Vocabulary,
};
use finmx_solver::{Grounder, eval_formula, expand};
use proptest::prelude::*;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Sentences over unary P and Q, picked by index.
fn sentence(kind: u8, x: &Variable, p: finmx_core::SymbolId, q: finmx_core::SymbolId) -> Formula {
    let px = Formula::atom(p, vec![Term::var(x)]);
    let qx = Formula::atom(q, vec![Term::var(x)]);
    let vars = vec![x.clone()];
    match kind % 6 {
        0 => Formula::exists(vars, px),
        1 => Formula::forall(vars, Formula::or(vec![px, qx])),
        2 => Formula::forall(vars, Formula::or(vec![px.negate(), qx.negate()])),
        3 => Formula::exists(vars, Formula::and(vec![qx, px.negate()])),
        4 => Formula::forall(vars, Formula::implies(px, qx)),
        _ => {
            let count = Term::aggregate(
                AggregateKind::Card,
                SetExpr::quantified(vars, qx, Term::var(x)),
            );
            Formula::compare(count, Comparator::Le, Term::domain(DomainElement::int(1)))
        }
    }
}

fn problem(size: usize, kinds: &[u8]) -> (Theory, Structure) {
    let mut voc = Vocabulary::new();
    let s = voc.add_sort("S", &[]);
    let p = voc.add_predicate("P", &[s]);
    let q = voc.add_predicate("Q", &[s]);
    let voc = Arc::new(voc);
    let x = Variable::new(0, "x", s);
    let mut theory = Theory::new(voc.clone());
    for &kind in kinds {
        theory.add_sentence(sentence(kind, &x, p, q));
    }
    let mut structure = Structure::new(voc);
    structure.set_domain(
        s,
        SortTable::finite((0..size).map(|i| DomainElement::name(&format!("e{}", i)))),
    );
    (theory, structure)
}

fn satisfies(theory: &Theory, model: &Structure) -> bool {
    let grounder = Grounder::new(model);
    theory.sentences.iter().all(|s| {
        let ground = grounder.ground_formula(s).unwrap();
        eval_formula(model, &ground).unwrap() == TruthValue::True
    })
}

/// P unary, R binary and f: S -> S, where R is the graph of f.
struct Mixed {
    theory: Theory,
    structure: Structure,
    elements: Vec<DomainElement>,
    symbols: [SymbolId; 3],
}

fn mixed(size: usize, kinds: &[u8], known: &[Option<bool>]) -> Mixed {
    let mut voc = Vocabulary::new();
    let s = voc.add_sort("S", &[]);
    let p = voc.add_predicate("P", &[s]);
    let r = voc.add_predicate("R", &[s, s]);
    let f = voc.add_function("f", &[s], s);
    let voc = Arc::new(voc);
    let x = Variable::new(0, "x", s);
    let y = Variable::new(1, "y", s);
    let px = Formula::atom(p, vec![Term::var(&x)]);
    let fx = Term::apply(f, vec![Term::var(&x)]);

    let mut theory = Theory::new(voc.clone());
    theory.add_sentence(Formula::forall(
        vec![x.clone(), y.clone()],
        Formula::iff(
            Formula::atom(r, vec![Term::var(&x), Term::var(&y)]),
            Formula::compare(fx.clone(), Comparator::Eq, Term::var(&y)),
        ),
    ));
    for &kind in kinds {
        let sentence = match kind % 4 {
            0 => Formula::forall(
                vec![x.clone()],
                Formula::atom(r, vec![Term::var(&x), Term::var(&x)]).negate(),
            ),
            1 => Formula::forall(
                vec![x.clone()],
                Formula::implies(px.clone(), Formula::atom(p, vec![fx.clone()])),
            ),
            2 => Formula::exists(vec![x.clone()], px.clone()),
            _ => {
                let count = Term::aggregate(
                    AggregateKind::Card,
                    SetExpr::quantified(vec![x.clone()], px.clone(), Term::var(&x)),
                );
                Formula::compare(count, Comparator::Le, Term::domain(DomainElement::int(1)))
            }
        };
        theory.add_sentence(sentence);
    }

    let elements: Vec<DomainElement> =
        (0..size).map(|i| DomainElement::name(&format!("e{}", i))).collect();
    let mut structure = Structure::new(voc);
    structure.set_domain(s, SortTable::finite(elements.iter().cloned()));
    for (element, value) in elements.iter().zip(known) {
        if let Some(value) = value {
            structure.set_value(p, &[element.clone()], *value).unwrap();
        }
    }
    Mixed {
        theory,
        structure,
        elements,
        symbols: [p, r, f],
    }
}

type Key = Vec<Vec<Tuple>>;

/// True tuples of every symbol with elements renamed by `rename`.
fn key(mixed: &Mixed, model: &Structure, rename: &[usize]) -> Key {
    mixed
        .symbols
        .iter()
        .map(|&symbol| {
            let mut tuples: Vec<Tuple> = model
                .true_tuples(symbol)
                .unwrap()
                .into_iter()
                .map(|tuple| {
                    tuple
                        .iter()
                        .map(|e| {
                            let i = mixed.elements.iter().position(|d| d == e).unwrap();
                            mixed.elements[rename[i]].clone()
                        })
                        .collect()
                })
                .collect();
            tuples.sort();
            tuples
        })
        .collect()
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for shorter in permutations(n - 1) {
        for slot in 0..n {
            let mut perm = shorter.clone();
            perm.insert(slot, n - 1);
            out.push(perm);
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn models_satisfy_the_theory(size in 1usize..4, kinds in prop::collection::vec(0u8..6, 1..4)) {
        let (theory, structure) = problem(size, &kinds);
        let models = expand(&theory, &structure, &ExpansionConfig::default().with_models(0), None).unwrap();
        for model in &models {
            prop_assert!(model.is_total().unwrap());
            prop_assert!(satisfies(&theory, model));
        }
    }

    #[test]
    fn symmetry_breaking_is_sound(size in 1usize..4, kinds in prop::collection::vec(0u8..6, 1..4)) {
        let (theory, structure) = problem(size, &kinds);
        let config = ExpansionConfig::default().with_models(0);
        let all = expand(&theory, &structure, &config, None).unwrap();
        let broken = expand(
            &theory,
            &structure,
            &config.with_symmetry_breaking(SymmetryBreaking::Static),
            None,
        )
        .unwrap();
        prop_assert!(broken.len() <= all.len());
        prop_assert_eq!(all.is_empty(), broken.is_empty());
        for model in &broken {
            prop_assert!(satisfies(&theory, model));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn symmetry_breaking_covers_every_orbit(
        size in 2usize..4,
        kinds in prop::collection::vec(0u8..4, 0..3),
        known in prop::collection::vec(prop::option::of(any::<bool>()), 3),
    ) {
        let mixed = mixed(size, &kinds, &known);
        let config = ExpansionConfig::default().with_models(0);
        let all = expand(&mixed.theory, &mixed.structure, &config, None).unwrap();
        let broken = expand(
            &mixed.theory,
            &mixed.structure,
            &config.with_symmetry_breaking(SymmetryBreaking::Static),
            None,
        )
        .unwrap();

        let identity: Vec<usize> = (0..size).collect();
        let all_keys: FxHashSet<Key> = all.iter().map(|m| key(&mixed, m, &identity)).collect();
        let kept: FxHashSet<Key> = broken.iter().map(|m| key(&mixed, m, &identity)).collect();
        prop_assert_eq!(all_keys.len(), all.len());
        prop_assert!(kept.is_subset(&all_keys));

        // permutations that keep the known P values in place
        let automorphisms: Vec<Vec<usize>> = permutations(size)
            .into_iter()
            .filter(|perm| perm.iter().enumerate().all(|(i, &j)| known[i] == known[j]))
            .collect();
        for model in &all {
            let covered = automorphisms
                .iter()
                .any(|perm| kept.contains(&key(&mixed, model, perm)));
            prop_assert!(covered, "model without a kept representative");
        }
    }
}
