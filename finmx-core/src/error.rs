//! Error types for finmx.
//!
//! Every stage of the pipeline reports failures through [`FinmxError`].
//! Inconsistent definitions are deliberately absent: the fixpoint evaluator
//! reports them as a regular outcome, not as an error.

use thiserror::Error;

/// Result alias used throughout finmx.
pub type Result<T> = std::result::Result<T, FinmxError>;

/// Errors raised while grounding, evaluating or solving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinmxError {
    /// A quantifier, set or rule ranges over a sort without a finite table.
    #[error("cannot enumerate the infinite domain of sort `{sort}`")]
    InfiniteDomain {
        /// Name of the offending sort.
        sort: String,
    },

    /// A sort id or name that the vocabulary does not know.
    #[error("unknown sort `{0}`")]
    UnknownSort(String),

    /// A symbol id or name that the vocabulary does not know.
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    /// A symbol applied to the wrong number of arguments.
    #[error("`{symbol}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        /// Symbol name.
        symbol: String,
        /// Declared arity.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A tuple element outside the domain of the sort at its position.
    #[error("`{element}` is not in the domain of sort `{sort}` (argument {position} of `{symbol}`)")]
    OutOfDomain {
        /// Symbol name.
        symbol: String,
        /// Zero-based position in the graph tuple.
        position: usize,
        /// Sort expected at that position.
        sort: String,
        /// Rendered element.
        element: String,
    },

    /// A formula whose shape is malformed, such as a comparison chain with
    /// the wrong number of comparators.
    #[error("malformed formula: {0}")]
    InvalidFormula(String),

    /// A node that should have been ground still contains variables or quantifiers.
    #[error("expected a ground node: {0}")]
    NotGround(String),

    /// An aggregate that cannot be computed (e.g. a non-integer weight in a sum).
    #[error("invalid aggregate: {0}")]
    InvalidAggregate(String),

    /// A tuple was asked to become both certainly true and certainly false.
    #[error("inconsistent interpretation of `{symbol}` at {tuple}")]
    Inconsistent {
        /// Symbol name.
        symbol: String,
        /// Rendered tuple.
        tuple: String,
    },

    /// The propositional engine failed.
    #[error("solver error: {0}")]
    Solver(String),

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FinmxError {
    /// Create an infinite-domain error.
    pub fn infinite_domain(sort: impl Into<String>) -> Self {
        Self::InfiniteDomain { sort: sort.into() }
    }

    /// Create a not-ground error.
    pub fn not_ground(what: impl Into<String>) -> Self {
        Self::NotGround(what.into())
    }

    /// Create an inconsistency error.
    pub fn inconsistent(symbol: impl Into<String>, tuple: impl Into<String>) -> Self {
        Self::Inconsistent {
            symbol: symbol.into(),
            tuple: tuple.into(),
        }
    }

    /// Errors caused by malformed input rather than by the search itself.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InfiniteDomain { .. }
                | Self::UnknownSort(_)
                | Self::UnknownSymbol(_)
                | Self::ArityMismatch { .. }
                | Self::OutOfDomain { .. }
                | Self::InvalidFormula(_)
        )
    }
}
