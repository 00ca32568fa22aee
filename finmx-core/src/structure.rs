//! Three-valued structures.
//!
//! A [`Structure`] gives every sort a [`SortTable`] and every symbol an
//! [`Interpretation`]: the tuples that are certainly true and those that are
//! certainly false. Everything else is unknown. Functions are interpreted by
//! their graph, so a function `f: A -> B` stores tuples `(a, b)`.

use crate::element::{DomainElement, Tuple, format_tuple};
use crate::error::{FinmxError, Result};
use crate::odometer::Tuples;
use crate::sort::{SortId, SortTable};
use crate::truth::TruthValue;
use crate::vocabulary::{SymbolId, Vocabulary};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

/// Three-valued interpretation of one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    certainly_true: FxHashSet<Tuple>,
    certainly_false: FxHashSet<Tuple>,
}

impl Interpretation {
    /// Create an interpretation where everything is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly stored truth value of a tuple.
    #[must_use]
    pub fn value(&self, tuple: &[DomainElement]) -> TruthValue {
        if self.certainly_true.contains(tuple) {
            TruthValue::True
        } else if self.certainly_false.contains(tuple) {
            TruthValue::False
        } else {
            TruthValue::Unknown
        }
    }

    /// Certainly true tuples.
    #[must_use]
    pub fn certainly_true(&self) -> &FxHashSet<Tuple> {
        &self.certainly_true
    }

    /// Certainly false tuples.
    #[must_use]
    pub fn certainly_false(&self) -> &FxHashSet<Tuple> {
        &self.certainly_false
    }

    /// Number of decided tuples.
    #[must_use]
    pub fn num_known(&self) -> usize {
        self.certainly_true.len() + self.certainly_false.len()
    }
}

/// A (possibly partial) structure over a vocabulary.
#[derive(Debug, Clone)]
pub struct Structure {
    vocabulary: Arc<Vocabulary>,
    tables: Vec<SortTable>,
    interpretations: Vec<Interpretation>,
}

impl Structure {
    /// Create a structure with empty domains and nothing known.
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        let tables = vec![SortTable::empty(); vocabulary.num_sorts()];
        let interpretations = vec![Interpretation::new(); vocabulary.num_symbols()];
        Self {
            vocabulary,
            tables,
            interpretations,
        }
    }

    /// The shared vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Set the domain of a sort.
    pub fn set_domain(&mut self, sort: SortId, table: SortTable) {
        if let Some(slot) = self.tables.get_mut(sort.index()) {
            *slot = table;
        }
    }

    /// The table of a sort.
    pub fn table(&self, sort: SortId) -> Result<&SortTable> {
        self.tables
            .get(sort.index())
            .ok_or_else(|| FinmxError::UnknownSort(sort.to_string()))
    }

    /// The elements of a sort; fails for infinite domains.
    pub fn domain(&self, sort: SortId) -> Result<&[DomainElement]> {
        self.table(sort)?
            .elements()
            .ok_or_else(|| FinmxError::infinite_domain(self.vocabulary.sort_name(sort)))
    }

    /// The interpretation of a symbol.
    pub fn interpretation(&self, symbol: SymbolId) -> Result<&Interpretation> {
        self.interpretations
            .get(symbol.index())
            .ok_or_else(|| FinmxError::UnknownSymbol(symbol.to_string()))
    }

    /// Domains of the stored tuples of a symbol (arguments, then result).
    pub fn graph_domains(&self, symbol: SymbolId) -> Result<Vec<&[DomainElement]>> {
        let sorts = self.vocabulary.symbol(symbol)?.graph_sorts();
        sorts.iter().map(|&s| self.domain(s)).collect()
    }

    /// Every tuple a symbol can be applied to (its graph for functions).
    pub fn tuples(&self, symbol: SymbolId) -> Result<Tuples<'_>> {
        Ok(Tuples::new(self.graph_domains(symbol)?))
    }

    /// Truth value of `symbol(tuple)`.
    ///
    /// For a function, `tuple` is the graph tuple `(args, value)`; a known
    /// different value makes the tuple false.
    #[must_use]
    pub fn value(&self, symbol: SymbolId, tuple: &[DomainElement]) -> TruthValue {
        let Some(interp) = self.interpretations.get(symbol.index()) else {
            return TruthValue::Unknown;
        };
        let stored = interp.value(tuple);
        if stored.is_known() {
            return stored;
        }
        let is_function = self
            .vocabulary
            .symbol(symbol)
            .map(|s| s.is_function())
            .unwrap_or(false);
        if is_function {
            if let Some((value, args)) = tuple.split_last() {
                if let Ok(Some(known)) = self.function_value(symbol, args) {
                    return TruthValue::from_bool(&known == value);
                }
            }
        }
        TruthValue::Unknown
    }

    /// Value of function `symbol` at `args`, if determined.
    ///
    /// A value is determined when its graph tuple is certainly true, or when
    /// every other value is certainly false.
    pub fn function_value(
        &self,
        symbol: SymbolId,
        args: &[DomainElement],
    ) -> Result<Option<DomainElement>> {
        let result = self
            .vocabulary
            .symbol(symbol)?
            .result()
            .ok_or_else(|| FinmxError::UnknownSymbol(self.vocabulary.symbol_name(symbol)))?;
        let interp = self.interpretation(symbol)?;
        let mut candidate = None;
        let mut open = 0usize;
        let mut tuple: Tuple = args.iter().cloned().collect();
        for value in self.domain(result)? {
            tuple.push(value.clone());
            match interp.value(&tuple) {
                TruthValue::True => return Ok(Some(value.clone())),
                TruthValue::Unknown => {
                    open += 1;
                    candidate = Some(value.clone());
                }
                TruthValue::False => {}
            }
            tuple.pop();
        }
        Ok(if open == 1 { candidate } else { None })
    }

    /// Assign a truth value to a tuple.
    ///
    /// Returns whether anything changed; assigning the opposite of a known
    /// value is an [`FinmxError::Inconsistent`] error.
    pub fn set_value(
        &mut self,
        symbol: SymbolId,
        tuple: &[DomainElement],
        value: bool,
    ) -> Result<bool> {
        self.check_tuple(symbol, tuple)?;
        let current = self.interpretation(symbol)?.value(tuple);
        match (current.as_bool(), value) {
            (Some(known), _) if known == value => Ok(false),
            (Some(_), _) => Err(FinmxError::inconsistent(
                self.vocabulary.symbol_name(symbol),
                format_tuple(tuple),
            )),
            (None, _) => {
                let interp = &mut self.interpretations[symbol.index()];
                let key: Tuple = tuple.iter().cloned().collect();
                if value {
                    interp.certainly_true.insert(key);
                } else {
                    interp.certainly_false.insert(key);
                }
                Ok(true)
            }
        }
    }

    /// Check that `tuple` fits the graph sorts of `symbol`.
    fn check_tuple(&self, symbol: SymbolId, tuple: &[DomainElement]) -> Result<()> {
        let sorts = self.vocabulary.symbol(symbol)?.graph_sorts();
        if sorts.len() != tuple.len() {
            return Err(FinmxError::ArityMismatch {
                symbol: self.vocabulary.symbol_name(symbol),
                expected: sorts.len(),
                found: tuple.len(),
            });
        }
        for (position, (&sort, element)) in sorts.iter().zip(tuple).enumerate() {
            if !self.table(sort)?.contains(element) {
                return Err(FinmxError::OutOfDomain {
                    symbol: self.vocabulary.symbol_name(symbol),
                    position,
                    sort: self.vocabulary.sort_name(sort),
                    element: element.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Make a tuple certainly true.
    pub fn make_true(&mut self, symbol: SymbolId, tuple: &[DomainElement]) -> Result<bool> {
        self.set_value(symbol, tuple, true)
    }

    /// Make a tuple certainly false.
    pub fn make_false(&mut self, symbol: SymbolId, tuple: &[DomainElement]) -> Result<bool> {
        self.set_value(symbol, tuple, false)
    }

    /// Fix the value of function `symbol` at `args`; every other value becomes false.
    pub fn set_function(
        &mut self,
        symbol: SymbolId,
        args: &[DomainElement],
        value: &DomainElement,
    ) -> Result<()> {
        let result = self
            .vocabulary
            .symbol(symbol)?
            .result()
            .ok_or_else(|| FinmxError::UnknownSymbol(self.vocabulary.symbol_name(symbol)))?;
        let values = self.domain(result)?.to_vec();
        let mut tuple: Tuple = args.iter().cloned().collect();
        for candidate in values {
            tuple.push(candidate.clone());
            self.set_value(symbol, &tuple, &candidate == value)?;
            tuple.pop();
        }
        Ok(())
    }

    /// Drop every known tuple of a symbol.
    pub fn clear(&mut self, symbol: SymbolId) {
        if let Some(interp) = self.interpretations.get_mut(symbol.index()) {
            *interp = Interpretation::new();
        }
    }

    /// Check if every tuple of a symbol is decided.
    pub fn is_two_valued(&self, symbol: SymbolId) -> Result<bool> {
        let sym = self.vocabulary.symbol(symbol)?;
        if sym.is_function() {
            let arg_domains: Vec<&[DomainElement]> =
                sym.args.iter().map(|&s| self.domain(s)).collect::<Result<_>>()?;
            for args in Tuples::new(arg_domains) {
                if self.function_value(symbol, &args)?.is_none() {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        let interp = self.interpretation(symbol)?;
        for tuple in self.tuples(symbol)? {
            if !interp.value(&tuple).is_known() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check if every symbol is two-valued.
    pub fn is_total(&self) -> Result<bool> {
        for symbol in self.vocabulary.symbols() {
            if !self.is_two_valued(symbol)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Certainly true tuples of a symbol, sorted.
    pub fn true_tuples(&self, symbol: SymbolId) -> Result<Vec<Tuple>> {
        let mut tuples: Vec<Tuple> = self
            .interpretation(symbol)?
            .certainly_true()
            .iter()
            .cloned()
            .collect();
        tuples.sort();
        Ok(tuples)
    }

    /// Known tuples of every symbol: `(symbol, tuple, value)`.
    #[must_use]
    pub fn certain_facts(&self) -> Vec<(SymbolId, Tuple, bool)> {
        let mut facts = Vec::new();
        for (index, interp) in self.interpretations.iter().enumerate() {
            let symbol = SymbolId::new(index as u32);
            let mut known: Vec<(Tuple, bool)> = interp
                .certainly_true
                .iter()
                .map(|t| (t.clone(), true))
                .chain(interp.certainly_false.iter().map(|t| (t.clone(), false)))
                .collect();
            known.sort();
            facts.extend(known.into_iter().map(|(t, v)| (symbol, t, v)));
        }
        facts
    }
}

impl PartialEq for Structure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.vocabulary, &other.vocabulary)
            && self.tables == other.tables
            && self.interpretations == other.interpretations
    }
}

impl Eq for Structure {}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sort in self.vocabulary.sorts() {
            let name = self.vocabulary.sort_name(sort);
            match &self.tables[sort.index()] {
                SortTable::Finite(elements) => {
                    let parts: Vec<String> = elements.iter().map(ToString::to_string).collect();
                    writeln!(f, "{} = {{{}}}", name, parts.join(", "))?;
                }
                SortTable::Infinite => writeln!(f, "{} = <infinite>", name)?,
            }
        }
        for symbol in self.vocabulary.symbols() {
            let mut tuples: Vec<&Tuple> =
                self.interpretations[symbol.index()].certainly_true.iter().collect();
            tuples.sort();
            let parts: Vec<String> = tuples.iter().map(|t| format_tuple(t)).collect();
            writeln!(
                f,
                "{} = {{{}}}",
                self.vocabulary.symbol_name(symbol),
                parts.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Structure, SortId, SymbolId, SymbolId) {
        let mut voc = Vocabulary::new();
        let s = voc.add_sort("S", &[]);
        let p = voc.add_predicate("P", &[s]);
        let f = voc.add_function("f", &[s], s);
        let mut structure = Structure::new(Arc::new(voc));
        structure.set_domain(s, SortTable::finite(["a", "b"].map(DomainElement::from)));
        (structure, s, p, f)
    }

    fn el(name: &str) -> DomainElement {
        DomainElement::name(name)
    }

    #[test]
    fn test_make_true_and_conflict() {
        let (mut structure, _, p, _) = setup();
        assert_eq!(structure.value(p, &[el("a")]), TruthValue::Unknown);
        assert!(structure.make_true(p, &[el("a")]).unwrap());
        assert!(!structure.make_true(p, &[el("a")]).unwrap());
        assert!(matches!(
            structure.make_false(p, &[el("a")]),
            Err(FinmxError::Inconsistent { .. })
        ));
        assert_eq!(structure.value(p, &[el("a")]), TruthValue::True);
    }

    #[test]
    fn test_two_valued_predicate() {
        let (mut structure, _, p, _) = setup();
        structure.make_true(p, &[el("a")]).unwrap();
        assert!(!structure.is_two_valued(p).unwrap());
        structure.make_false(p, &[el("b")]).unwrap();
        assert!(structure.is_two_valued(p).unwrap());
    }

    #[test]
    fn test_tuple_outside_domain_is_rejected() {
        let (mut structure, _, p, f) = setup();
        assert!(matches!(
            structure.make_true(p, &[el("z")]),
            Err(FinmxError::OutOfDomain { position: 0, .. })
        ));
        assert!(matches!(
            structure.make_false(f, &[el("a"), el("z")]),
            Err(FinmxError::OutOfDomain { position: 1, .. })
        ));
        assert!(matches!(
            structure.make_true(p, &[el("a"), el("b")]),
            Err(FinmxError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert_eq!(structure.interpretation(p).unwrap().num_known(), 0);
        assert!(structure.certain_facts().is_empty());

        // one decided tuple out of two is still partial
        structure.make_true(p, &[el("a")]).unwrap();
        assert!(!structure.is_two_valued(p).unwrap());
    }

    #[test]
    fn test_function_values() {
        let (mut structure, _, _, f) = setup();
        structure.make_true(f, &[el("a"), el("b")]).unwrap();
        assert_eq!(structure.function_value(f, &[el("a")]).unwrap(), Some(el("b")));
        assert_eq!(structure.value(f, &[el("a"), el("a")]), TruthValue::False);
        assert!(!structure.is_two_valued(f).unwrap());

        // a single open value is implied
        structure.make_false(f, &[el("b"), el("a")]).unwrap();
        assert_eq!(structure.function_value(f, &[el("b")]).unwrap(), Some(el("b")));
        assert!(structure.is_two_valued(f).unwrap());
    }

    #[test]
    fn test_set_function() {
        let (mut structure, _, _, f) = setup();
        structure.set_function(f, &[el("a")], &el("a")).unwrap();
        assert_eq!(structure.value(f, &[el("a"), el("b")]), TruthValue::False);
        assert_eq!(structure.interpretation(f).unwrap().num_known(), 2);
    }

    #[test]
    fn test_infinite_domain_error() {
        let (mut structure, s, p, _) = setup();
        structure.set_domain(s, SortTable::Infinite);
        assert!(matches!(
            structure.domain(s),
            Err(FinmxError::InfiniteDomain { .. })
        ));
        assert!(structure.tuples(p).is_err());
    }

    #[test]
    fn test_certain_facts_sorted() {
        let (mut structure, _, p, _) = setup();
        structure.make_false(p, &[el("b")]).unwrap();
        structure.make_true(p, &[el("a")]).unwrap();
        let facts = structure.certain_facts();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].1[0], el("a"));
        assert!(facts[0].2);
        assert!(!facts[1].2);
    }
}
