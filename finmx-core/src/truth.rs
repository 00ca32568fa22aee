//! Three-valued truth.

use std::fmt;
use std::ops::Not;

/// Kleene truth value: certainly true, certainly false or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TruthValue {
    /// Certainly true.
    True,
    /// Certainly false.
    False,
    /// Not (yet) decided.
    #[default]
    Unknown,
}

impl TruthValue {
    /// Lift a Boolean.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }

    /// Check if certainly true.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Check if certainly false.
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Check if decided.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The Boolean value, if decided.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Unknown => None,
        }
    }

    /// Kleene conjunction.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// Kleene disjunction.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }

    /// Kleene equivalence.
    #[must_use]
    pub fn iff(self, other: Self) -> Self {
        match (self.as_bool(), other.as_bool()) {
            (Some(a), Some(b)) => Self::from_bool(a == b),
            _ => Self::Unknown,
        }
    }

    /// Apply a sign: a negative sign negates.
    #[must_use]
    pub fn with_sign(self, sign: bool) -> Self {
        if sign { self } else { !self }
    }
}

impl Not for TruthValue {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<bool> for TruthValue {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
