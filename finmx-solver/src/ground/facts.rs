//! Structure-to-theory conversion.
//!
//! The certain part of a structure is handed to the solver as ground
//! formulas: one signed atom per certainly true or certainly false tuple.

use finmx_core::{Comparator, DomainElement, Formula, Result, Structure, SymbolId, Term, Vocabulary};

/// The formula stating that `symbol(tuple)` holds.
///
/// For a function the tuple is its graph tuple and the formula is the
/// equality `f(args) = value`.
pub fn atom_formula(
    vocabulary: &Vocabulary,
    symbol: SymbolId,
    tuple: &[DomainElement],
) -> Result<Formula> {
    let sym = vocabulary.symbol(symbol)?;
    if sym.is_function() {
        if let Some((value, args)) = tuple.split_last() {
            let app = Term::apply(symbol, args.iter().cloned().map(Term::Domain).collect());
            return Ok(Formula::compare(app, Comparator::Eq, Term::Domain(value.clone())));
        }
    }
    Ok(Formula::atom(
        symbol,
        tuple.iter().cloned().map(Term::Domain).collect(),
    ))
}

/// Ground formulas fixing every certain fact of the structure.
pub fn certain_facts(structure: &Structure) -> Result<Vec<Formula>> {
    let vocabulary = structure.vocabulary();
    structure
        .certain_facts()
        .into_iter()
        .map(|(symbol, tuple, value)| {
            Ok(atom_formula(vocabulary, symbol, &tuple)?.with_sign(value))
        })
        .collect()
}
