//! Detection and breaking of interchangeable domain elements.
//!
//! An [`IvSet`] is a set of elements of one sort that can be permuted freely:
//! every permutation of them maps the structure onto itself and leaves the
//! theory unchanged. Candidates start as whole sorts and are refined by
//! occurrence counts, then by testing pairwise swaps directly.

use crate::ground::atom_formula;
use finmx_core::{
    DomainElement, FinmxError, Formula, Result, SetExpr, SortId, Structure, SymbolId, Term,
    Theory, Tuple, TruthValue,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// A set of interchangeable domain elements.
#[derive(Debug, Clone)]
pub struct IvSet<'a> {
    structure: &'a Structure,
    elements: Vec<DomainElement>,
    sorts: Vec<SortId>,
    symbols: Vec<SymbolId>,
}

impl<'a> IvSet<'a> {
    /// The permuted elements, sorted.
    #[must_use]
    pub fn elements(&self) -> &[DomainElement] {
        &self.elements
    }

    /// The sorts containing the elements: the youngest one and its ancestors.
    #[must_use]
    pub fn sorts(&self) -> &[SortId] {
        &self.sorts
    }

    /// Symbols with an argument or result in one of [`IvSet::sorts`].
    #[must_use]
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// The structure the set was found in.
    #[must_use]
    pub fn structure(&self) -> &'a Structure {
        self.structure
    }

    /// Number of elements (at least two).
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always `false`: an IVSet has at least two elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Consecutive transpositions of the sorted elements; they generate
    /// every permutation of the set.
    pub fn transpositions(&self) -> impl Iterator<Item = (&DomainElement, &DomainElement)> + '_ {
        self.elements.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Ground formulas that keep only lex-leader models under each
    /// transposition.
    ///
    /// For a transposition σ with support atoms x1, x2, ... (the unknown atoms
    /// it moves, in global atom order) the constraint for position k is
    /// `(x1 ⇔ σx1) ∧ ... ∧ (xk-1 ⇔ σxk-1) ⇒ (xk ⇒ σxk)`. `chain_length`
    /// bounds k (0 = unbounded).
    pub fn breaking_formulas(&self, chain_length: usize) -> Result<Vec<Formula>> {
        let vocabulary = self.structure.vocabulary();
        let mut formulas = Vec::new();
        for (a, b) in self.transpositions() {
            let support = self.support(a, b, chain_length)?;
            let mut prefix: Vec<Formula> = Vec::with_capacity(support.len());
            for (symbol, tuple, image) in &support {
                let x = atom_formula(vocabulary, *symbol, tuple)?;
                let sx = atom_formula(vocabulary, *symbol, image)?;
                let mut clause = prefix.clone();
                clause.push(x.clone().negate());
                clause.push(sx.clone());
                formulas.push(Formula::or(clause));
                prefix.push(Formula::iff(x, sx).negate());
            }
        }
        Ok(formulas)
    }

    /// Unknown atoms moved by swapping `a` and `b`, with their images.
    fn support(
        &self,
        a: &DomainElement,
        b: &DomainElement,
        chain_length: usize,
    ) -> Result<Vec<(SymbolId, Tuple, Tuple)>> {
        let mut support = Vec::new();
        for &symbol in &self.symbols {
            for tuple in self.structure.tuples(symbol)? {
                if chain_length > 0 && support.len() >= chain_length {
                    return Ok(support);
                }
                let image = swap(&tuple, a, b);
                if image != tuple && self.structure.value(symbol, &tuple) == TruthValue::Unknown {
                    support.push((symbol, tuple, image));
                }
            }
        }
        Ok(support)
    }
}

fn swap(tuple: &[DomainElement], a: &DomainElement, b: &DomainElement) -> Tuple {
    tuple
        .iter()
        .map(|e| {
            if e == a {
                b.clone()
            } else if e == b {
                a.clone()
            } else {
                e.clone()
            }
        })
        .collect()
}

/// Sorts whose elements carry arithmetic meaning in `theory`.
fn arithmetic_sorts(theory: &Theory) -> FxHashSet<SortId> {
    let mut out = FxHashSet::default();
    let collector = ArithmeticSorts { theory };
    for sentence in &theory.sentences {
        collector.formula(sentence, &mut out);
    }
    for rule in theory.rules() {
        for arg in &rule.args {
            collector.term(arg, &mut out);
        }
        collector.formula(&rule.body, &mut out);
    }
    out
}

struct ArithmeticSorts<'t> {
    theory: &'t Theory,
}

impl ArithmeticSorts<'_> {
    fn formula(&self, formula: &Formula, out: &mut FxHashSet<SortId>) {
        match formula {
            Formula::Atomic { args, .. } => args.iter().for_each(|t| self.term(t, out)),
            Formula::Boolean { children, .. } => children.iter().for_each(|c| self.formula(c, out)),
            Formula::Quantified { body, .. } => self.formula(body, out),
            Formula::Equivalence { left, right, .. } => {
                self.formula(left, out);
                self.formula(right, out);
            }
            Formula::Comparison {
                terms, comparators, ..
            } => {
                let ordered = comparators.iter().any(|c| c.is_order());
                let with_aggregate = terms.iter().any(|t| matches!(t, Term::Aggregate { .. }));
                if ordered || with_aggregate {
                    out.extend(terms.iter().filter_map(|t| t.sort(&self.theory.vocabulary)));
                }
                terms.iter().for_each(|t| self.term(t, out));
            }
        }
    }

    fn term(&self, term: &Term, out: &mut FxHashSet<SortId>) {
        match term {
            Term::Var(_) | Term::Domain(_) => {}
            Term::Function { args, .. } => args.iter().for_each(|t| self.term(t, out)),
            Term::Aggregate { kind, set } => match &**set {
                SetExpr::Enumerated(members) => {
                    for (cond, weight) in members {
                        if kind.uses_weights() {
                            out.extend(weight.sort(&self.theory.vocabulary));
                        }
                        self.formula(cond, out);
                        self.term(weight, out);
                    }
                }
                SetExpr::Quantified { vars, body, weight } => {
                    if kind.uses_weights() {
                        // Grounding takes the weight from the first variable
                        match vars.first() {
                            Some(v) => {
                                out.insert(v.sort);
                            }
                            None => out.extend(weight.sort(&self.theory.vocabulary)),
                        }
                    }
                    self.formula(body, out);
                    self.term(weight, out);
                }
            },
        }
    }
}

/// Finds IVSets of a theory over a structure.
#[derive(Debug, Clone, Copy)]
pub struct SymmetryFinder<'a> {
    theory: &'a Theory,
    structure: &'a Structure,
}

impl<'a> SymmetryFinder<'a> {
    /// Create a finder.
    #[must_use]
    pub fn new(theory: &'a Theory, structure: &'a Structure) -> Self {
        Self { theory, structure }
    }

    /// Detect every IVSet.
    pub fn find_iv_sets(&self) -> Result<Vec<IvSet<'a>>> {
        let vocabulary = self.structure.vocabulary();
        let arithmetic = arithmetic_sorts(self.theory);
        let signatures = self.occurrence_signatures()?;
        let mut seen: FxHashSet<Vec<DomainElement>> = FxHashSet::default();
        let mut found = Vec::new();

        for sort in vocabulary.sorts() {
            let elements = match self.structure.domain(sort) {
                Ok(elements) => elements,
                Err(FinmxError::InfiniteDomain { .. }) => continue,
                Err(err) => return Err(err),
            };
            let ancestors = vocabulary.ancestors(sort);
            let related: FxHashSet<SortId> = ancestors
                .iter()
                .copied()
                .chain(vocabulary.descendants(sort))
                .collect();
            if !related.is_disjoint(&arithmetic) {
                trace!(sort = %vocabulary.sort_name(sort), "sort has arithmetic meaning");
                continue;
            }
            let touching = vocabulary
                .symbols()
                .filter(|&s| vocabulary.symbol(s).map(|sym| sym.touches(&ancestors)).unwrap_or(false))
                .count();
            if elements.len() <= 1 || touching == 0 {
                continue;
            }

            for class in occurrence_classes(elements, &signatures) {
                for group in self.binary_split(&class)? {
                    if group.len() < 2 || !seen.insert(group.clone()) {
                        continue;
                    }
                    found.push(self.make_iv_set(group)?);
                }
            }
        }

        debug!(iv_sets = found.len(), "symmetry detection finished");
        Ok(found)
    }

    /// Signature of every element: sort membership, occurrence counts per
    /// symbol position in the certainly true and certainly false tuples, and
    /// a unique marker for elements the theory mentions.
    fn occurrence_signatures(&self) -> Result<FxHashMap<DomainElement, Vec<usize>>> {
        let vocabulary = self.structure.vocabulary();
        let sorts: Vec<SortId> = vocabulary.sorts().collect();
        let mut signatures: FxHashMap<DomainElement, Vec<usize>> = FxHashMap::default();

        let mut width = sorts.len();
        let mut offsets = Vec::with_capacity(vocabulary.num_symbols());
        for symbol in vocabulary.symbols() {
            offsets.push(width);
            width += 2 * vocabulary.symbol(symbol)?.graph_sorts().len();
        }

        for &sort in &sorts {
            let Some(elements) = self.structure.table(sort)?.elements() else {
                continue;
            };
            for element in elements {
                signatures.entry(element.clone()).or_insert_with(|| {
                    let mut sig = vec![0; width + 1];
                    for (i, &s) in sorts.iter().enumerate() {
                        if self.structure.table(s).map(|t| t.contains(element)).unwrap_or(false) {
                            sig[i] = 1;
                        }
                    }
                    sig
                });
            }
        }

        for (index, symbol) in vocabulary.symbols().enumerate() {
            let interp = self.structure.interpretation(symbol)?;
            for (kind, tuples) in [interp.certainly_true(), interp.certainly_false()].into_iter().enumerate() {
                for tuple in tuples {
                    for (pos, element) in tuple.iter().enumerate() {
                        if let Some(sig) = signatures.get_mut(element) {
                            sig[offsets[index] + 2 * pos + kind] += 1;
                        }
                    }
                }
            }
        }

        let mut mentioned: Vec<DomainElement> = self.theory.mentioned_elements().into_iter().collect();
        mentioned.sort();
        for (i, element) in mentioned.iter().enumerate() {
            if let Some(sig) = signatures.get_mut(element) {
                sig[width] = i + 1;
            }
        }
        Ok(signatures)
    }

    /// Split a class of same-signature elements into groups of pairwise
    /// interchangeable elements.
    fn binary_split(&self, class: &[DomainElement]) -> Result<Vec<Vec<DomainElement>>> {
        let mut groups: Vec<Vec<DomainElement>> = Vec::new();
        'elements: for element in class {
            for group in &mut groups {
                // Interchangeability is transitive: one representative suffices
                if self.swap_invariant(&group[0], element)? {
                    group.push(element.clone());
                    continue 'elements;
                }
            }
            groups.push(vec![element.clone()]);
        }
        if groups.len() > 1 {
            trace!(class = class.len(), groups = groups.len(), "binary split");
        }
        Ok(groups)
    }

    /// Check if swapping `a` and `b` maps the known part of every symbol onto itself.
    fn swap_invariant(&self, a: &DomainElement, b: &DomainElement) -> Result<bool> {
        for symbol in self.structure.vocabulary().symbols() {
            let interp = self.structure.interpretation(symbol)?;
            for tuples in [interp.certainly_true(), interp.certainly_false()] {
                for tuple in tuples {
                    if !tuple.contains(a) && !tuple.contains(b) {
                        continue;
                    }
                    if !tuples.contains(&swap(tuple, a, b)) {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    fn make_iv_set(&self, mut elements: Vec<DomainElement>) -> Result<IvSet<'a>> {
        let vocabulary = self.structure.vocabulary();
        elements.sort();
        let mut sorts = Vec::new();
        for sort in vocabulary.sorts() {
            if self.structure.table(sort)?.contains(&elements[0]) {
                sorts.push(sort);
            }
        }
        let sort_set: FxHashSet<SortId> = sorts.iter().copied().collect();
        let mut symbols = Vec::new();
        for symbol in vocabulary.symbols() {
            if vocabulary.symbol(symbol)?.touches(&sort_set) {
                symbols.push(symbol);
            }
        }
        Ok(IvSet {
            structure: self.structure,
            elements,
            sorts,
            symbols,
        })
    }
}

/// Group elements by signature, keeping first-appearance order.
fn occurrence_classes(
    elements: &[DomainElement],
    signatures: &FxHashMap<DomainElement, Vec<usize>>,
) -> Vec<Vec<DomainElement>> {
    let mut index: FxHashMap<&Vec<usize>, usize> = FxHashMap::default();
    let mut classes: Vec<Vec<DomainElement>> = Vec::new();
    for element in elements {
        let Some(sig) = signatures.get(element) else {
            continue;
        };
        match index.get(sig) {
            Some(&i) => classes[i].push(element.clone()),
            None => {
                index.insert(sig, classes.len());
                classes.push(vec![element.clone()]);
            }
        }
    }
    classes.retain(|c| c.len() > 1);
    classes
}
