//! Formulas and set expressions.
//!
//! Every formula carries a sign (`true` = positive). Negation flips the sign
//! instead of wrapping the node, so the shape of a formula is preserved by
//! grounding and by negation alike.

use crate::element::DomainElement;
use crate::term::{Term, Variable};
use crate::vocabulary::SymbolId;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a chained comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `≠`
    Ne,
    /// `<`
    Lt,
    /// `≤`
    Le,
    /// `>`
    Gt,
    /// `≥`
    Ge,
}

impl Comparator {
    /// Check whether `left op right` holds.
    #[must_use]
    pub fn holds(self, left: &DomainElement, right: &DomainElement) -> bool {
        let ord = left.cmp(right);
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }

    /// Check if the comparator depends on the order of elements.
    #[must_use]
    pub fn is_order(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "=",
            Self::Ne => "~=",
            Self::Lt => "<",
            Self::Le => "=<",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        write!(f, "{}", op)
    }
}

/// A first-order formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// `P(t1, ..., tn)`
    Atomic {
        /// Polarity.
        sign: bool,
        /// Predicate symbol.
        symbol: SymbolId,
        /// Arguments.
        args: Vec<Term>,
    },
    /// Conjunction or disjunction of subformulas.
    Boolean {
        /// Polarity.
        sign: bool,
        /// `true` for a conjunction, `false` for a disjunction.
        conjunction: bool,
        /// Subformulas.
        children: Vec<Formula>,
    },
    /// `∀x̄ φ` or `∃x̄ φ`.
    Quantified {
        /// Polarity.
        sign: bool,
        /// `true` for a universal quantifier.
        universal: bool,
        /// Quantified variables.
        vars: Vec<Variable>,
        /// Quantified subformula.
        body: Box<Formula>,
    },
    /// `φ ⇔ ψ`
    Equivalence {
        /// Polarity.
        sign: bool,
        /// Left-hand side.
        left: Box<Formula>,
        /// Right-hand side.
        right: Box<Formula>,
    },
    /// `t1 op1 t2 op2 ... tn`
    Comparison {
        /// Polarity.
        sign: bool,
        /// Compared terms (one more than comparators).
        terms: Vec<Term>,
        /// Comparators between consecutive terms.
        comparators: Vec<Comparator>,
    },
}

impl Formula {
    /// Positive atom.
    #[must_use]
    pub fn atom(symbol: SymbolId, args: Vec<Term>) -> Self {
        Self::Atomic {
            sign: true,
            symbol,
            args,
        }
    }

    /// Conjunction.
    #[must_use]
    pub fn and(children: Vec<Formula>) -> Self {
        Self::Boolean {
            sign: true,
            conjunction: true,
            children,
        }
    }

    /// Disjunction.
    #[must_use]
    pub fn or(children: Vec<Formula>) -> Self {
        Self::Boolean {
            sign: true,
            conjunction: false,
            children,
        }
    }

    /// `φ ⇒ ψ`, written as `¬φ ∨ ψ`.
    #[must_use]
    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Self::or(vec![premise.negate(), conclusion])
    }

    /// `φ ⇔ ψ`.
    #[must_use]
    pub fn iff(left: Formula, right: Formula) -> Self {
        Self::Equivalence {
            sign: true,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Universal quantification.
    #[must_use]
    pub fn forall(vars: Vec<Variable>, body: Formula) -> Self {
        Self::Quantified {
            sign: true,
            universal: true,
            vars,
            body: Box::new(body),
        }
    }

    /// Existential quantification.
    #[must_use]
    pub fn exists(vars: Vec<Variable>, body: Formula) -> Self {
        Self::Quantified {
            sign: true,
            universal: false,
            vars,
            body: Box::new(body),
        }
    }

    /// Single comparison `left op right`.
    #[must_use]
    pub fn compare(left: Term, op: Comparator, right: Term) -> Self {
        Self::Comparison {
            sign: true,
            terms: vec![left, right],
            comparators: vec![op],
        }
    }

    /// Chained comparison `t1 op1 t2 op2 ... tn`.
    #[must_use]
    pub fn chain(terms: Vec<Term>, comparators: Vec<Comparator>) -> Self {
        Self::Comparison {
            sign: true,
            terms,
            comparators,
        }
    }

    /// The formula `true` (empty conjunction) or `false` (empty disjunction).
    #[must_use]
    pub fn truth(value: bool) -> Self {
        Self::Boolean {
            sign: true,
            conjunction: value,
            children: Vec::new(),
        }
    }

    /// Polarity of the formula.
    #[must_use]
    pub fn sign(&self) -> bool {
        match self {
            Self::Atomic { sign, .. }
            | Self::Boolean { sign, .. }
            | Self::Quantified { sign, .. }
            | Self::Equivalence { sign, .. }
            | Self::Comparison { sign, .. } => *sign,
        }
    }

    fn sign_mut(&mut self) -> &mut bool {
        match self {
            Self::Atomic { sign, .. }
            | Self::Boolean { sign, .. }
            | Self::Quantified { sign, .. }
            | Self::Equivalence { sign, .. }
            | Self::Comparison { sign, .. } => sign,
        }
    }

    /// Negation (flips the sign).
    #[must_use]
    pub fn negate(mut self) -> Self {
        let sign = self.sign_mut();
        *sign = !*sign;
        self
    }

    /// Replace the sign.
    #[must_use]
    pub fn with_sign(mut self, sign: bool) -> Self {
        *self.sign_mut() = sign;
        self
    }

    /// Value of a childless Boolean formula (`true`, `false` and their negations).
    #[must_use]
    pub fn constant_value(&self) -> Option<bool> {
        match self {
            Self::Boolean {
                sign,
                conjunction,
                children,
            } if children.is_empty() => Some(*conjunction == *sign),
            _ => None,
        }
    }

    /// Free variables, deduplicated.
    #[must_use]
    pub fn free_vars(&self) -> FxHashSet<Variable> {
        match self {
            Self::Atomic { args, .. } => args.iter().flat_map(Term::free_vars).collect(),
            Self::Boolean { children, .. } => {
                children.iter().flat_map(Formula::free_vars).collect()
            }
            Self::Quantified { vars, body, .. } => {
                let mut free = body.free_vars();
                for v in vars {
                    free.remove(v);
                }
                free
            }
            Self::Equivalence { left, right, .. } => {
                let mut free = left.free_vars();
                free.extend(right.free_vars());
                free
            }
            Self::Comparison { terms, .. } => terms.iter().flat_map(Term::free_vars).collect(),
        }
    }

    /// Check if the formula contains no variables and no quantifiers.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Atomic { args, .. } => args.iter().all(Term::is_ground),
            Self::Boolean { children, .. } => children.iter().all(Formula::is_ground),
            Self::Quantified { .. } => false,
            Self::Equivalence { left, right, .. } => left.is_ground() && right.is_ground(),
            Self::Comparison { terms, .. } => terms.iter().all(Term::is_ground),
        }
    }

    /// Symbols used by this formula (predicates and functions).
    pub fn collect_symbols(&self, out: &mut FxHashSet<SymbolId>) {
        match self {
            Self::Atomic { symbol, args, .. } => {
                out.insert(*symbol);
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
            Self::Boolean { children, .. } => {
                for child in children {
                    child.collect_symbols(out);
                }
            }
            Self::Quantified { body, .. } => body.collect_symbols(out),
            Self::Equivalence { left, right, .. } => {
                left.collect_symbols(out);
                right.collect_symbols(out);
            }
            Self::Comparison { terms, .. } => {
                for term in terms {
                    term.collect_symbols(out);
                }
            }
        }
    }

    /// Symbols used by this formula.
    #[must_use]
    pub fn symbols(&self) -> FxHashSet<SymbolId> {
        let mut out = FxHashSet::default();
        self.collect_symbols(&mut out);
        out
    }

    /// Literal domain elements mentioned by this formula.
    pub fn collect_elements(&self, out: &mut FxHashSet<DomainElement>) {
        match self {
            Self::Atomic { args, .. } => {
                for arg in args {
                    arg.collect_elements(out);
                }
            }
            Self::Boolean { children, .. } => {
                for child in children {
                    child.collect_elements(out);
                }
            }
            Self::Quantified { body, .. } => body.collect_elements(out),
            Self::Equivalence { left, right, .. } => {
                left.collect_elements(out);
                right.collect_elements(out);
            }
            Self::Comparison { terms, .. } => {
                for term in terms {
                    term.collect_elements(out);
                }
            }
        }
    }

    /// Number of nodes (used for grounding statistics).
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Atomic { .. } | Self::Comparison { .. } => 1,
            Self::Boolean { children, .. } => 1 + children.iter().map(Formula::size).sum::<usize>(),
            Self::Quantified { body, .. } => 1 + body.size(),
            Self::Equivalence { left, right, .. } => 1 + left.size() + right.size(),
        }
    }
}

/// A set expression inside an aggregate term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetExpr {
    /// Explicit list of `(condition, weight)` members.
    Enumerated(Vec<(Formula, Term)>),
    /// `{ x̄ : φ : t }`: one member per tuple of the variables' domains.
    Quantified {
        /// Quantified variables.
        vars: Vec<Variable>,
        /// Membership condition.
        body: Formula,
        /// Weight term.
        weight: Term,
    },
}

impl SetExpr {
    /// Quantified set.
    #[must_use]
    pub fn quantified(vars: Vec<Variable>, body: Formula, weight: Term) -> Self {
        Self::Quantified { vars, body, weight }
    }

    /// Free variables, deduplicated.
    #[must_use]
    pub fn free_vars(&self) -> FxHashSet<Variable> {
        match self {
            Self::Enumerated(members) => members
                .iter()
                .flat_map(|(cond, weight)| {
                    let mut free = cond.free_vars();
                    free.extend(weight.free_vars());
                    free
                })
                .collect(),
            Self::Quantified { vars, body, weight } => {
                let mut free = body.free_vars();
                free.extend(weight.free_vars());
                for v in vars {
                    free.remove(v);
                }
                free
            }
        }
    }

    /// Check if the set is enumerated with ground members.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Enumerated(members) => members
                .iter()
                .all(|(cond, weight)| cond.is_ground() && weight.is_ground()),
            Self::Quantified { .. } => false,
        }
    }

    /// Symbols used by this set.
    pub fn collect_symbols(&self, out: &mut FxHashSet<SymbolId>) {
        match self {
            Self::Enumerated(members) => {
                for (cond, weight) in members {
                    cond.collect_symbols(out);
                    weight.collect_symbols(out);
                }
            }
            Self::Quantified { body, weight, .. } => {
                body.collect_symbols(out);
                weight.collect_symbols(out);
            }
        }
    }

    /// Literal domain elements mentioned by this set.
    pub fn collect_elements(&self, out: &mut FxHashSet<DomainElement>) {
        match self {
            Self::Enumerated(members) => {
                for (cond, weight) in members {
                    cond.collect_elements(out);
                    weight.collect_elements(out);
                }
            }
            Self::Quantified { body, weight, .. } => {
                body.collect_elements(out);
                weight.collect_elements(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortId;

    fn setup() -> (Variable, Variable, SymbolId) {
        let s = SortId::new(0);
        (
            Variable::new(0, "x", s),
            Variable::new(1, "y", s),
            SymbolId::new(0),
        )
    }

    #[test]
    fn test_quantifier_removes_bound_vars() {
        let (x, y, p) = setup();
        let body = Formula::atom(p, vec![Term::var(&x), Term::var(&y)]);
        let formula = Formula::forall(vec![x.clone()], body);
        let free = formula.free_vars();
        assert_eq!(free.len(), 1);
        assert!(free.contains(&y));
        assert!(!formula.is_ground());
    }

    #[test]
    fn test_free_vars_order_insignificant() {
        let (x, y, p) = setup();
        let a = Formula::and(vec![
            Formula::atom(p, vec![Term::var(&x)]),
            Formula::atom(p, vec![Term::var(&y)]),
        ]);
        let b = Formula::and(vec![
            Formula::atom(p, vec![Term::var(&y)]),
            Formula::atom(p, vec![Term::var(&x)]),
            Formula::atom(p, vec![Term::var(&y)]),
        ]);
        assert_eq!(a.free_vars(), b.free_vars());
    }

    #[test]
    fn test_negation_flips_sign_only() {
        let (_, _, p) = setup();
        let atom = Formula::atom(p, vec![Term::domain("a")]);
        let neg = atom.clone().negate();
        assert!(!neg.sign());
        assert_eq!(neg.negate(), atom);
    }

    #[test]
    fn test_truth_constants() {
        assert_eq!(Formula::truth(true).constant_value(), Some(true));
        assert_eq!(Formula::truth(false).constant_value(), Some(false));
        assert_eq!(Formula::truth(true).negate().constant_value(), Some(false));
        assert_eq!(Formula::and(vec![Formula::truth(true)]).constant_value(), None);
    }

    #[test]
    fn test_comparator_semantics() {
        let one = DomainElement::int(1);
        let two = DomainElement::int(2);
        assert!(Comparator::Lt.holds(&one, &two));
        assert!(Comparator::Le.holds(&two, &two));
        assert!(!Comparator::Gt.holds(&one, &two));
        assert!(Comparator::Ne.holds(&one, &two));
        assert!(!Comparator::Eq.is_order() && Comparator::Ge.is_order());
    }

    #[test]
    fn test_collect_elements() {
        let (x, _, p) = setup();
        let formula = Formula::forall(
            vec![x.clone()],
            Formula::or(vec![
                Formula::atom(p, vec![Term::var(&x), Term::domain("a")]),
                Formula::compare(Term::var(&x), Comparator::Eq, Term::domain("b")),
            ]),
        );
        let mut elements = FxHashSet::default();
        formula.collect_elements(&mut elements);
        assert_eq!(elements.len(), 2);
    }
}
