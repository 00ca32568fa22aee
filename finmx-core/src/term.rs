//! Terms and variables.

use crate::element::DomainElement;
use crate::formula::SetExpr;
use crate::sort::SortId;
use crate::vocabulary::{SymbolId, Vocabulary};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

/// Identity of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

/// A typed variable, bound by an enclosing quantifier, set or rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Identity; two variables are the same iff their ids are equal.
    pub id: VarId,
    /// Display name.
    pub name: Arc<str>,
    /// Sort the variable ranges over.
    pub sort: SortId,
}

impl Variable {
    /// Create a variable.
    #[must_use]
    pub fn new(id: u32, name: &str, sort: SortId) -> Self {
        Self {
            id: VarId(id),
            name: Arc::from(name),
            sort,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Kind of an aggregate term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    /// Number of true members.
    Card,
    /// Sum of the weights of true members.
    Sum,
    /// Product of the weights of true members.
    Prod,
    /// Least weight of a true member.
    Min,
    /// Greatest weight of a true member.
    Max,
}

impl AggregateKind {
    /// Value of the aggregate over the empty set (`None` when undefined).
    #[must_use]
    pub fn identity(self) -> Option<i64> {
        match self {
            Self::Card | Self::Sum => Some(0),
            Self::Prod => Some(1),
            Self::Min | Self::Max => None,
        }
    }

    /// Fold one more true member with weight `weight` into `acc`.
    #[must_use]
    pub fn combine(self, acc: Option<i64>, weight: i64) -> Option<i64> {
        match self {
            Self::Card => Some(acc.unwrap_or(0).saturating_add(1)),
            Self::Sum => Some(acc.unwrap_or(0).saturating_add(weight)),
            Self::Prod => Some(acc.unwrap_or(1).saturating_mul(weight)),
            Self::Min => Some(acc.map_or(weight, |a| a.min(weight))),
            Self::Max => Some(acc.map_or(weight, |a| a.max(weight))),
        }
    }

    /// Whether the weights of the members matter.
    #[must_use]
    pub fn uses_weights(self) -> bool {
        !matches!(self, Self::Card)
    }

    /// Fold a whole list of weights.
    #[must_use]
    pub fn fold(self, weights: impl IntoIterator<Item = i64>) -> Option<i64> {
        weights
            .into_iter()
            .fold(self.identity(), |acc, w| self.combine(acc, w))
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Card => "card",
            Self::Sum => "sum",
            Self::Prod => "prod",
            Self::Min => "min",
            Self::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// A term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable occurrence.
    Var(Variable),
    /// A literal domain element.
    Domain(DomainElement),
    /// A function application.
    Function {
        /// Function symbol.
        symbol: SymbolId,
        /// Arguments.
        args: Vec<Term>,
    },
    /// An aggregate over a set expression.
    Aggregate {
        /// Aggregate kind.
        kind: AggregateKind,
        /// The aggregated set.
        set: Box<SetExpr>,
    },
}

impl Term {
    /// Variable occurrence.
    #[must_use]
    pub fn var(variable: &Variable) -> Self {
        Self::Var(variable.clone())
    }

    /// Literal domain element.
    pub fn domain(element: impl Into<DomainElement>) -> Self {
        Self::Domain(element.into())
    }

    /// Function application.
    #[must_use]
    pub fn apply(symbol: SymbolId, args: Vec<Term>) -> Self {
        Self::Function { symbol, args }
    }

    /// Aggregate term.
    #[must_use]
    pub fn aggregate(kind: AggregateKind, set: SetExpr) -> Self {
        Self::Aggregate {
            kind,
            set: Box::new(set),
        }
    }

    /// The element of a literal domain term.
    #[must_use]
    pub fn as_domain(&self) -> Option<&DomainElement> {
        match self {
            Self::Domain(element) => Some(element),
            _ => None,
        }
    }

    /// Free variables, deduplicated.
    #[must_use]
    pub fn free_vars(&self) -> FxHashSet<Variable> {
        match self {
            Self::Var(v) => std::iter::once(v.clone()).collect(),
            Self::Domain(_) => FxHashSet::default(),
            Self::Function { args, .. } => args.iter().flat_map(Term::free_vars).collect(),
            Self::Aggregate { set, .. } => set.free_vars(),
        }
    }

    /// Check if the term contains no variables and no quantified sets.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Var(_) => false,
            Self::Domain(_) => true,
            Self::Function { args, .. } => args.iter().all(Term::is_ground),
            Self::Aggregate { set, .. } => set.is_ground(),
        }
    }

    /// Symbols used by this term.
    pub fn collect_symbols(&self, out: &mut FxHashSet<SymbolId>) {
        match self {
            Self::Var(_) | Self::Domain(_) => {}
            Self::Function { symbol, args } => {
                out.insert(*symbol);
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
            Self::Aggregate { set, .. } => set.collect_symbols(out),
        }
    }

    /// Literal domain elements mentioned by this term.
    pub fn collect_elements(&self, out: &mut FxHashSet<DomainElement>) {
        match self {
            Self::Var(_) => {}
            Self::Domain(element) => {
                out.insert(element.clone());
            }
            Self::Function { args, .. } => {
                for arg in args {
                    arg.collect_elements(out);
                }
            }
            Self::Aggregate { set, .. } => set.collect_elements(out),
        }
    }

    /// Sort of the term's value, when it can be read off the term.
    ///
    /// Literal elements and aggregates carry no declared sort.
    #[must_use]
    pub fn sort(&self, vocabulary: &Vocabulary) -> Option<SortId> {
        match self {
            Self::Var(v) => Some(v.sort),
            Self::Function { symbol, .. } => {
                vocabulary.symbol(*symbol).ok().and_then(|s| s.result())
            }
            Self::Domain(_) | Self::Aggregate { .. } => None,
        }
    }
}

impl From<DomainElement> for Term {
    fn from(element: DomainElement) -> Self {
        Self::Domain(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;

    #[test]
    fn test_aggregate_fold() {
        assert_eq!(AggregateKind::Card.fold([5, 7, 9]), Some(3));
        assert_eq!(AggregateKind::Sum.fold([5, 7, -2]), Some(10));
        assert_eq!(AggregateKind::Prod.fold([]), Some(1));
        assert_eq!(AggregateKind::Min.fold([4, 2, 8]), Some(2));
        assert_eq!(AggregateKind::Max.fold([]), None);
    }

    #[test]
    fn test_free_vars_deduplicated() {
        let s = SortId::new(0);
        let x = Variable::new(0, "x", s);
        let y = Variable::new(1, "y", s);
        let f = SymbolId::new(0);
        let term = Term::apply(f, vec![Term::var(&x), Term::var(&y), Term::var(&x)]);
        let free = term.free_vars();
        assert_eq!(free.len(), 2);
        assert!(free.contains(&x) && free.contains(&y));
        assert!(!term.is_ground());
    }

    #[test]
    fn test_aggregate_binds_set_variables() {
        let s = SortId::new(0);
        let x = Variable::new(0, "x", s);
        let y = Variable::new(1, "y", s);
        let p = SymbolId::new(0);
        let set = SetExpr::quantified(
            vec![x.clone()],
            Formula::atom(p, vec![Term::var(&x), Term::var(&y)]),
            Term::var(&x),
        );
        let term = Term::aggregate(AggregateKind::Card, set);
        let free = term.free_vars();
        assert_eq!(free.len(), 1);
        assert!(free.contains(&y));
    }

    #[test]
    fn test_ground_domain_term() {
        let term = Term::domain("a");
        assert!(term.is_ground());
        assert!(term.free_vars().is_empty());
        assert_eq!(term.as_domain(), Some(&DomainElement::name("a")));
    }
}
