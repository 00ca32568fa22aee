//! Three-valued evaluation of ground formulas and terms.
//!
//! Evaluation is Kleene-style: a value is known only when every way of
//! completing the unknown atoms agrees. A [`Valuation`] may answer an atom
//! differently depending on whether it occurs positively or negatively,
//! which is how the well-founded computation reads lower and upper bounds
//! through the same evaluator.

use finmx_core::{
    DomainElement, FinmxError, Formula, Result, SetExpr, SortId, Structure, SymbolId, Term,
    TruthValue, Vocabulary,
};
use smallvec::SmallVec;

/// Source of atom values for evaluation.
pub trait Valuation {
    /// Vocabulary the atoms belong to.
    fn vocabulary(&self) -> &Vocabulary;

    /// Elements of a sort.
    fn domain(&self, sort: SortId) -> Result<&[DomainElement]>;

    /// Value of `symbol(tuple)` (graph tuple for functions).
    fn atom(&self, symbol: SymbolId, tuple: &[DomainElement]) -> TruthValue;

    /// Value of an atom occurring with the given polarity.
    fn atom_at(&self, symbol: SymbolId, tuple: &[DomainElement], positive: bool) -> TruthValue {
        let _ = positive;
        self.atom(symbol, tuple)
    }

    /// Value of function `symbol` at `args`, if determined.
    fn function(&self, symbol: SymbolId, args: &[DomainElement]) -> Result<Option<DomainElement>> {
        function_from_graph(self, symbol, args)
    }
}

/// Read a function value off its graph atoms: a true graph atom, or a single
/// value that is not false.
pub fn function_from_graph<V: Valuation + ?Sized>(
    valuation: &V,
    symbol: SymbolId,
    args: &[DomainElement],
) -> Result<Option<DomainElement>> {
    let vocabulary = valuation.vocabulary();
    let result = vocabulary
        .symbol(symbol)?
        .result()
        .ok_or_else(|| FinmxError::UnknownSymbol(vocabulary.symbol_name(symbol)))?;
    let mut tuple: SmallVec<[DomainElement; 4]> = args.iter().cloned().collect();
    let mut open = Vec::new();
    for value in valuation.domain(result)? {
        tuple.push(value.clone());
        match valuation.atom(symbol, &tuple) {
            TruthValue::True => return Ok(Some(value.clone())),
            TruthValue::Unknown => open.push(value.clone()),
            TruthValue::False => {}
        }
        tuple.pop();
    }
    Ok(if open.len() == 1 { open.pop() } else { None })
}

impl Valuation for Structure {
    fn vocabulary(&self) -> &Vocabulary {
        Structure::vocabulary(self)
    }

    fn domain(&self, sort: SortId) -> Result<&[DomainElement]> {
        Structure::domain(self, sort)
    }

    fn atom(&self, symbol: SymbolId, tuple: &[DomainElement]) -> TruthValue {
        self.value(symbol, tuple)
    }

    fn function(&self, symbol: SymbolId, args: &[DomainElement]) -> Result<Option<DomainElement>> {
        self.function_value(symbol, args)
    }
}

/// Evaluate a ground formula.
pub fn eval_formula<V: Valuation + ?Sized>(valuation: &V, formula: &Formula) -> Result<TruthValue> {
    eval_formula_at(valuation, formula, true)
}

/// Evaluate a ground formula occurring with the given polarity.
pub fn eval_formula_at<V: Valuation + ?Sized>(
    valuation: &V,
    formula: &Formula,
    positive: bool,
) -> Result<TruthValue> {
    let sign = formula.sign();
    // Polarity of the subformulas and atoms below a negation flips
    let inner = positive == sign;
    let value = match formula {
        Formula::Atomic { symbol, args, .. } => match eval_args(valuation, args, inner)? {
            Args::Known(tuple) => valuation.atom_at(*symbol, &tuple, inner),
            Args::Undefined => TruthValue::False,
            Args::Unknown => TruthValue::Unknown,
        },
        Formula::Boolean {
            conjunction,
            children,
            ..
        } => {
            let mut acc = TruthValue::from_bool(*conjunction);
            for child in children {
                let v = eval_formula_at(valuation, child, inner)?;
                acc = if *conjunction { acc.and(v) } else { acc.or(v) };
                if acc.as_bool() == Some(!*conjunction) {
                    break;
                }
            }
            acc
        }
        Formula::Quantified { .. } => {
            return Err(FinmxError::not_ground("quantified formula in evaluation"));
        }
        Formula::Equivalence { left, right, .. } => {
            // (l ∧ r) ∨ (¬l ∧ ¬r): each side occurs once in each polarity
            let both = eval_formula_at(valuation, left, inner)?
                .and(eval_formula_at(valuation, right, inner)?);
            let neither = (!eval_formula_at(valuation, left, !inner)?)
                .and(!eval_formula_at(valuation, right, !inner)?);
            both.or(neither)
        }
        Formula::Comparison {
            terms, comparators, ..
        } => {
            if comparators.len() + 1 != terms.len() {
                return Err(FinmxError::InvalidFormula(format!(
                    "{} comparators between {} terms",
                    comparators.len(),
                    terms.len()
                )));
            }
            let mut values = Vec::with_capacity(terms.len());
            for term in terms {
                values.push(eval_term_at(valuation, term, inner)?);
            }
            let mut acc = TruthValue::True;
            for (pair, op) in values.windows(2).zip(comparators) {
                let v = match (&pair[0], &pair[1]) {
                    (TermValue::Known(l), TermValue::Known(r)) => {
                        TruthValue::from_bool(op.holds(l, r))
                    }
                    // An undefined side has no value that could satisfy the link
                    (TermValue::Undefined, _) | (_, TermValue::Undefined) => TruthValue::False,
                    _ => TruthValue::Unknown,
                };
                acc = acc.and(v);
            }
            acc
        }
    };
    Ok(value.with_sign(sign))
}

/// Value of a ground term under a three-valued valuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermValue {
    /// The same element in every completion.
    Known(DomainElement),
    /// No value in any completion, e.g. the minimum of an empty set.
    Undefined,
    /// Depends on how the unknown atoms are completed.
    Unknown,
}

impl TermValue {
    /// The element, when known.
    #[must_use]
    pub fn known(self) -> Option<DomainElement> {
        match self {
            Self::Known(element) => Some(element),
            Self::Undefined | Self::Unknown => None,
        }
    }
}

enum Args {
    Known(SmallVec<[DomainElement; 4]>),
    Undefined,
    Unknown,
}

fn eval_args<V: Valuation + ?Sized>(valuation: &V, args: &[Term], positive: bool) -> Result<Args> {
    let mut tuple = SmallVec::with_capacity(args.len());
    let mut unknown = false;
    for arg in args {
        match eval_term_at(valuation, arg, positive)? {
            TermValue::Known(element) => tuple.push(element),
            TermValue::Undefined => return Ok(Args::Undefined),
            TermValue::Unknown => unknown = true,
        }
    }
    Ok(if unknown { Args::Unknown } else { Args::Known(tuple) })
}

/// Evaluate a ground term; `None` when its value is not determined.
pub fn eval_term<V: Valuation + ?Sized>(valuation: &V, term: &Term) -> Result<Option<DomainElement>> {
    Ok(eval_term_at(valuation, term, true)?.known())
}

/// Evaluate a ground term whose conditions occur with the given polarity.
pub fn eval_term_at<V: Valuation + ?Sized>(
    valuation: &V,
    term: &Term,
    positive: bool,
) -> Result<TermValue> {
    match term {
        Term::Var(v) => Err(FinmxError::not_ground(format!("variable `{}`", v.name))),
        Term::Domain(element) => Ok(TermValue::Known(element.clone())),
        Term::Function { symbol, args } => match eval_args(valuation, args, positive)? {
            Args::Known(tuple) => Ok(valuation
                .function(*symbol, &tuple)?
                .map_or(TermValue::Unknown, TermValue::Known)),
            Args::Undefined => Ok(TermValue::Undefined),
            Args::Unknown => Ok(TermValue::Unknown),
        },
        Term::Aggregate { kind, set } => {
            let SetExpr::Enumerated(members) = &**set else {
                return Err(FinmxError::not_ground("quantified set in evaluation"));
            };
            let mut acc = kind.identity();
            let mut unknown = false;
            for (cond, weight) in members {
                match eval_formula_at(valuation, cond, positive)? {
                    TruthValue::False => continue,
                    TruthValue::Unknown => {
                        unknown = true;
                        continue;
                    }
                    TruthValue::True => {}
                }
                let w = if kind.uses_weights() {
                    match eval_term_at(valuation, weight, positive)? {
                        TermValue::Known(element) => element.as_int().ok_or_else(|| {
                            FinmxError::InvalidAggregate(format!(
                                "{} over non-integer weight {}",
                                kind, element
                            ))
                        })?,
                        // A certain member without a weight leaves the aggregate without a value
                        TermValue::Undefined => return Ok(TermValue::Undefined),
                        TermValue::Unknown => {
                            unknown = true;
                            continue;
                        }
                    }
                } else {
                    0
                };
                acc = kind.combine(acc, w);
            }
            Ok(match acc {
                _ if unknown => TermValue::Unknown,
                Some(v) => TermValue::Known(DomainElement::int(v)),
                None => TermValue::Undefined,
            })
        }
    }
}
