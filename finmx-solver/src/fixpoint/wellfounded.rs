//! Well-founded and nested fixpoint semantics over ground rules.

use crate::eval::{Valuation, eval_formula, function_from_graph};
use finmx_core::{
    DomainElement, FinmxError, FixpointDefinition, Result, Rule, SortId, Structure, SymbolId,
    Tuple, TruthValue, Vocabulary,
};
use rustc_hash::FxHashSet;

/// A set of ground atoms.
pub type AtomSet = FxHashSet<(SymbolId, Tuple)>;

fn head_atom(rule: &Rule) -> Result<(SymbolId, Tuple)> {
    let args = rule
        .ground_head()
        .ok_or_else(|| FinmxError::not_ground("rule head"))?;
    Ok((rule.head, args.into_iter().collect()))
}

/// Reads the defined atoms from explicit atom sets and everything else from
/// a base structure. Positive occurrences read `positive`, negative ones read
/// `negative`.
struct Staged<'a> {
    base: &'a Structure,
    defined: &'a FxHashSet<SymbolId>,
    positive: &'a AtomSet,
    negative: &'a AtomSet,
}

impl Valuation for Staged<'_> {
    fn vocabulary(&self) -> &Vocabulary {
        self.base.vocabulary()
    }

    fn domain(&self, sort: SortId) -> Result<&[DomainElement]> {
        self.base.domain(sort)
    }

    fn atom(&self, symbol: SymbolId, tuple: &[DomainElement]) -> TruthValue {
        self.atom_at(symbol, tuple, true)
    }

    fn atom_at(&self, symbol: SymbolId, tuple: &[DomainElement], positive: bool) -> TruthValue {
        if !self.defined.contains(&symbol) {
            return self.base.value(symbol, tuple);
        }
        let set = if positive { self.positive } else { self.negative };
        let key: (SymbolId, Tuple) = (symbol, tuple.iter().cloned().collect());
        TruthValue::from_bool(set.contains(&key))
    }

    fn function(&self, symbol: SymbolId, args: &[DomainElement]) -> Result<Option<DomainElement>> {
        if self.defined.contains(&symbol) {
            function_from_graph(self, symbol, args)
        } else {
            self.base.function_value(symbol, args)
        }
    }
}

/// Least model of the rules when negative occurrences of defined atoms are
/// read from `fixed`.
fn least_model(
    rules: &[Rule],
    defined: &FxHashSet<SymbolId>,
    base: &Structure,
    fixed: &AtomSet,
) -> Result<AtomSet> {
    let mut current = AtomSet::default();
    loop {
        let mut derived = Vec::new();
        {
            let stage = Staged {
                base,
                defined,
                positive: &current,
                negative: fixed,
            };
            for rule in rules {
                let head = head_atom(rule)?;
                if current.contains(&head) {
                    continue;
                }
                if eval_formula(&stage, &rule.body)? == TruthValue::True {
                    derived.push(head);
                }
            }
        }
        if derived.is_empty() {
            return Ok(current);
        }
        current.extend(derived);
    }
}

/// Well-founded model of a ground definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellFoundedModel {
    /// Atoms that are true.
    pub certainly_true: AtomSet,
    /// Atoms that are not false (true or undefined).
    pub possibly_true: AtomSet,
}

impl WellFoundedModel {
    /// Check if no atom is undefined.
    #[must_use]
    pub fn is_total(&self) -> bool {
        self.certainly_true.len() == self.possibly_true.len()
    }

    /// Undefined atoms, sorted.
    #[must_use]
    pub fn undefined(&self) -> Vec<(SymbolId, Tuple)> {
        let mut out: Vec<_> = self
            .possibly_true
            .difference(&self.certainly_true)
            .cloned()
            .collect();
        out.sort();
        out
    }
}

/// Alternating fixpoint computation of the well-founded model.
///
/// Open symbols are read from `base`; atoms of `defined` symbols start out
/// false.
pub fn well_founded_model(
    rules: &[Rule],
    defined: &FxHashSet<SymbolId>,
    base: &Structure,
) -> Result<WellFoundedModel> {
    let mut lower = AtomSet::default();
    loop {
        let upper = least_model(rules, defined, base, &lower)?;
        let next = least_model(rules, defined, base, &upper)?;
        if next == lower {
            return Ok(WellFoundedModel {
                certainly_true: lower,
                possibly_true: upper,
            });
        }
        lower = next;
    }
}

/// Value of a nested fixpoint definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixpointValue {
    /// The iteration converged to these true atoms.
    Converged(AtomSet),
    /// The iteration did not settle; this atom kept changing.
    Oscillating {
        /// Symbol of the atom.
        symbol: SymbolId,
        /// Tuple of the atom.
        tuple: Tuple,
    },
}

fn collect_defined(fixpoint: &FixpointDefinition) -> FxHashSet<SymbolId> {
    fixpoint.defined_symbols().into_iter().collect()
}

/// Evaluate a ground fixpoint definition over a structure whose open
/// symbols are two-valued.
pub fn fixpoint_model(fixpoint: &FixpointDefinition, base: &Structure) -> Result<FixpointValue> {
    let defined = collect_defined(fixpoint);
    solve_level(fixpoint, base, &defined, &AtomSet::default())
}

fn solve_level(
    level: &FixpointDefinition,
    base: &Structure,
    defined: &FxHashSet<SymbolId>,
    outer: &AtomSet,
) -> Result<FixpointValue> {
    let heads = level
        .rules
        .iter()
        .map(head_atom)
        .collect::<Result<AtomSet>>()?;
    let mut own = if level.least {
        AtomSet::default()
    } else {
        heads.clone()
    };

    // A monotone operator settles within one step per head atom
    for _ in 0..heads.len() + 2 {
        let mut context = outer.clone();
        context.extend(own.iter().cloned());
        for nested in &level.nested {
            match solve_level(nested, base, defined, &context)? {
                FixpointValue::Converged(inner) => context.extend(inner),
                oscillating => return Ok(oscillating),
            }
        }

        let mut next = AtomSet::default();
        {
            let stage = Staged {
                base,
                defined,
                positive: &context,
                negative: &context,
            };
            for rule in &level.rules {
                if eval_formula(&stage, &rule.body)? == TruthValue::True {
                    next.insert(head_atom(rule)?);
                }
            }
        }

        if next == own {
            let computed = context.difference(outer).cloned().collect();
            return Ok(FixpointValue::Converged(computed));
        }
        own = next;
    }

    let mut changing: Vec<_> = heads.into_iter().collect();
    changing.sort();
    match changing.into_iter().next() {
        Some((symbol, tuple)) => Ok(FixpointValue::Oscillating { symbol, tuple }),
        None => Ok(FixpointValue::Converged(AtomSet::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmx_core::{Formula, SortTable, Term};
    use std::sync::Arc;

    fn el(n: &str) -> DomainElement {
        DomainElement::name(n)
    }

    fn atom(symbol: SymbolId, n: &str) -> Formula {
        Formula::atom(symbol, vec![Term::domain(el(n))])
    }

    fn setup() -> (Structure, SymbolId, SymbolId) {
        let mut voc = Vocabulary::new();
        let s = voc.add_sort("S", &[]);
        let p = voc.add_predicate("P", &[s]);
        let q = voc.add_predicate("Q", &[s]);
        let mut structure = Structure::new(Arc::new(voc));
        structure.set_domain(s, SortTable::finite(["a", "b"].map(DomainElement::from)));
        (structure, p, q)
    }

    fn key(symbol: SymbolId, n: &str) -> (SymbolId, Tuple) {
        (symbol, [el(n)].into_iter().collect())
    }

    fn rule(head: SymbolId, n: &str, body: Formula) -> Rule {
        Rule::fact(head, vec![Term::domain(el(n))], body)
    }

    #[test]
    fn test_stratified_negation() {
        let (structure, p, q) = setup();
        // P(a). Q(b) <- ¬P(b). Q(a) <- ¬P(a).
        let rules = vec![
            rule(p, "a", Formula::truth(true)),
            rule(q, "b", atom(p, "b").negate()),
            rule(q, "a", atom(p, "a").negate()),
        ];
        let defined = [p, q].into_iter().collect();
        let wfm = well_founded_model(&rules, &defined, &structure).unwrap();
        assert!(wfm.is_total());
        assert!(wfm.certainly_true.contains(&key(q, "b")));
        assert!(!wfm.certainly_true.contains(&key(q, "a")));
    }

    #[test]
    fn test_negative_loop_is_undefined() {
        let (structure, p, _) = setup();
        let rules = vec![rule(p, "a", atom(p, "a").negate())];
        let defined = [p].into_iter().collect();
        let wfm = well_founded_model(&rules, &defined, &structure).unwrap();
        assert!(!wfm.is_total());
        assert_eq!(wfm.undefined(), vec![key(p, "a")]);
    }

    #[test]
    fn test_positive_loop_is_false() {
        let (structure, p, _) = setup();
        let rules = vec![rule(p, "a", atom(p, "a"))];
        let defined = [p].into_iter().collect();
        let wfm = well_founded_model(&rules, &defined, &structure).unwrap();
        assert!(wfm.is_total());
        assert!(wfm.certainly_true.is_empty());
    }

    #[test]
    fn test_least_and_greatest_fixpoints() {
        let (structure, p, _) = setup();
        let loop_rules = vec![rule(p, "a", atom(p, "a"))];
        let least = FixpointDefinition::least(loop_rules.clone(), Vec::new());
        let greatest = FixpointDefinition::greatest(loop_rules, Vec::new());
        assert_eq!(
            fixpoint_model(&least, &structure).unwrap(),
            FixpointValue::Converged(AtomSet::default())
        );
        let FixpointValue::Converged(atoms) = fixpoint_model(&greatest, &structure).unwrap() else {
            panic!("expected convergence");
        };
        assert_eq!(atoms.len(), 1);
    }

    #[test]
    fn test_nested_level_sees_outer_atoms() {
        let (structure, p, q) = setup();
        // lfp { P(a) <- Q(a).  gfp { Q(a) <- Q(a) } }
        let inner = FixpointDefinition::greatest(vec![rule(q, "a", atom(q, "a"))], Vec::new());
        let outer = FixpointDefinition::least(vec![rule(p, "a", atom(q, "a"))], vec![inner]);
        let FixpointValue::Converged(atoms) = fixpoint_model(&outer, &structure).unwrap() else {
            panic!("expected convergence");
        };
        assert!(atoms.contains(&key(p, "a")));
        assert!(atoms.contains(&key(q, "a")));
    }

    #[test]
    fn test_oscillation_is_reported() {
        let (structure, p, _) = setup();
        let rules = vec![rule(p, "a", atom(p, "a").negate())];
        let least = FixpointDefinition::least(rules, Vec::new());
        assert!(matches!(
            fixpoint_model(&least, &structure).unwrap(),
            FixpointValue::Oscillating { .. }
        ));
    }
}
