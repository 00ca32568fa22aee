//! Evaluation of definitions into a structure before grounding.
//!
//! A definition is calculable when all of its open symbols are two-valued
//! and every domain it ranges over is finite. Its well-founded model is then
//! computed and written into the structure, so later stages see its defined
//! symbols as fixed facts.

pub mod wellfounded;

use crate::ground::Grounder;
use finmx_core::{
    Definition, FinmxError, FixpointDefinition, Result, Structure, SymbolId, Theory, Tuple,
    format_tuple,
};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

pub use wellfounded::{AtomSet, FixpointValue, WellFoundedModel, fixpoint_model, well_founded_model};

/// Definitions whose symbols were written into the structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculatedDefinitions {
    /// Indices into [`Theory::definitions`].
    pub definitions: Vec<usize>,
    /// Indices into [`Theory::fixpoints`].
    pub fixpoints: Vec<usize>,
}

impl CalculatedDefinitions {
    /// Total number of calculated definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len() + self.fixpoints.len()
    }

    /// Check if nothing was calculated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of [`calculate_known_definitions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixpointOutcome {
    /// The structure was refined without contradiction.
    Consistent {
        /// What was calculated.
        calculated: CalculatedDefinitions,
    },
    /// A definition gives no consistent two-valued value to this atom.
    Inconsistent {
        /// Symbol of the atom.
        symbol: SymbolId,
        /// Tuple of the atom.
        tuple: Tuple,
    },
}

impl FixpointOutcome {
    /// Check if the outcome is consistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent { .. })
    }
}

/// `Ok(false)` for domain problems that only make a definition non-calculable.
fn soft(result: Result<bool>) -> Result<bool> {
    match result {
        Err(FinmxError::InfiniteDomain { .. }) => Ok(false),
        other => other,
    }
}

fn is_calculable(
    open: &FxHashSet<SymbolId>,
    defined: &[SymbolId],
    structure: &Structure,
) -> Result<bool> {
    for &symbol in open {
        if !soft(structure.is_two_valued(symbol))? {
            return Ok(false);
        }
    }
    for &symbol in defined {
        if !soft(structure.tuples(symbol).map(|_| true))? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Write the value of every tuple of the defined symbols.
///
/// Returns the first atom whose value contradicts the structure.
fn write_back(
    structure: &mut Structure,
    defined: &[SymbolId],
    true_atoms: &AtomSet,
) -> Result<Option<(SymbolId, Tuple)>> {
    for &symbol in defined {
        let tuples: Vec<Tuple> = structure.tuples(symbol)?.collect();
        for tuple in tuples {
            let key = (symbol, tuple);
            let value = true_atoms.contains(&key);
            match structure.set_value(symbol, &key.1, value) {
                Ok(_) => {}
                Err(FinmxError::Inconsistent { .. }) => return Ok(Some(key)),
                Err(err) => return Err(err),
            }
        }
    }
    Ok(None)
}

/// What happened to one definition in one pass.
enum Step {
    Skipped,
    Calculated,
    Inconsistent(SymbolId, Tuple),
}

/// Ground a definition if its domains allow it.
fn try_ground<T>(ground: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
    match ground() {
        Ok(value) => Ok(Some(value)),
        Err(FinmxError::InfiniteDomain { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn calculate_definition(
    definition: &Definition,
    structure: &mut Structure,
) -> Result<Step> {
    let defined = definition.defined_symbols();
    if !is_calculable(&definition.open_symbols(), &defined, structure)? {
        return Ok(Step::Skipped);
    }
    let Some(ground) = try_ground(|| Grounder::new(structure).ground_definition(definition))? else {
        return Ok(Step::Skipped);
    };
    let defined_set: FxHashSet<SymbolId> = defined.iter().copied().collect();
    let wfm = well_founded_model(&ground.rules, &defined_set, structure)?;
    if let Some((symbol, tuple)) = wfm.undefined().into_iter().next() {
        return Ok(Step::Inconsistent(symbol, tuple));
    }
    if let Some((symbol, tuple)) = write_back(structure, &defined, &wfm.certainly_true)? {
        return Ok(Step::Inconsistent(symbol, tuple));
    }
    Ok(Step::Calculated)
}

fn calculate_fixpoint(
    fixpoint: &FixpointDefinition,
    structure: &mut Structure,
) -> Result<Step> {
    let defined = fixpoint.defined_symbols();
    if !is_calculable(&fixpoint.open_symbols(), &defined, structure)? {
        return Ok(Step::Skipped);
    }
    let Some(ground) = try_ground(|| Grounder::new(structure).ground_fixpoint(fixpoint))? else {
        return Ok(Step::Skipped);
    };
    let atoms = match fixpoint_model(&ground, structure)? {
        FixpointValue::Converged(atoms) => atoms,
        FixpointValue::Oscillating { symbol, tuple } => {
            return Ok(Step::Inconsistent(symbol, tuple));
        }
    };
    if let Some((symbol, tuple)) = write_back(structure, &defined, &atoms)? {
        return Ok(Step::Inconsistent(symbol, tuple));
    }
    Ok(Step::Calculated)
}

/// Evaluate every calculable definition of `theory` into `structure`.
///
/// Definitions are retried in theory order until a pass calculates nothing,
/// so a definition becomes calculable once the definitions it depends on
/// have been. The structure is refined in place; on an inconsistent outcome
/// it may already hold some of the calculated facts.
pub fn calculate_known_definitions(
    theory: &Theory,
    structure: &mut Structure,
) -> Result<FixpointOutcome> {
    let mut calculated = CalculatedDefinitions::default();
    let mut done_definitions = vec![false; theory.definitions.len()];
    let mut done_fixpoints = vec![false; theory.fixpoints.len()];

    loop {
        let mut progress = false;

        for (index, definition) in theory.definitions.iter().enumerate() {
            if done_definitions[index] {
                continue;
            }
            match calculate_definition(definition, structure)? {
                Step::Skipped => {}
                Step::Calculated => {
                    debug!(definition = index, "calculated definition");
                    done_definitions[index] = true;
                    calculated.definitions.push(index);
                    progress = true;
                }
                Step::Inconsistent(symbol, tuple) => {
                    return Ok(report(structure, symbol, tuple));
                }
            }
        }

        for (index, fixpoint) in theory.fixpoints.iter().enumerate() {
            if done_fixpoints[index] {
                continue;
            }
            match calculate_fixpoint(fixpoint, structure)? {
                Step::Skipped => {}
                Step::Calculated => {
                    debug!(fixpoint = index, "calculated fixpoint definition");
                    done_fixpoints[index] = true;
                    calculated.fixpoints.push(index);
                    progress = true;
                }
                Step::Inconsistent(symbol, tuple) => {
                    return Ok(report(structure, symbol, tuple));
                }
            }
        }

        if !progress {
            break;
        }
    }

    debug!(calculated = calculated.len(), "definition calculation finished");
    Ok(FixpointOutcome::Consistent { calculated })
}

fn report(structure: &Structure, symbol: SymbolId, tuple: Tuple) -> FixpointOutcome {
    info!(
        symbol = %structure.vocabulary().symbol_name(symbol),
        tuple = %format_tuple(&tuple),
        "definition is inconsistent with the structure"
    );
    FixpointOutcome::Inconsistent { symbol, tuple }
}

/// Check a total structure against a ground definition: the well-founded
/// model must be two-valued and agree with every defined atom.
pub fn satisfies_definition(definition: &Definition, model: &Structure) -> Result<bool> {
    let defined = definition.defined_symbols();
    let defined_set: FxHashSet<SymbolId> = defined.iter().copied().collect();
    let wfm = well_founded_model(&definition.rules, &defined_set, model)?;
    if !wfm.is_total() {
        return Ok(false);
    }
    agrees(model, &defined, &wfm.certainly_true)
}

/// Check a total structure against a ground fixpoint definition.
pub fn satisfies_fixpoint(fixpoint: &FixpointDefinition, model: &Structure) -> Result<bool> {
    match fixpoint_model(fixpoint, model)? {
        FixpointValue::Converged(atoms) => agrees(model, &fixpoint.defined_symbols(), &atoms),
        FixpointValue::Oscillating { .. } => Ok(false),
    }
}

fn agrees(model: &Structure, defined: &[SymbolId], true_atoms: &AtomSet) -> Result<bool> {
    for &symbol in defined {
        for tuple in model.tuples(symbol)? {
            let expected = true_atoms.contains(&(symbol, tuple.clone()));
            if model.value(symbol, &tuple).as_bool() != Some(expected) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
