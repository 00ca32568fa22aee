//! Boolean variables, literals and lifted Booleans.

use std::fmt;
use std::ops::Not;

/// A Boolean variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    /// Create a variable from its index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Index of the variable.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A literal (signed Boolean variable).
///
/// The positive literal of variable `v` has code `2v`, the negative one `2v + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(u32);

impl Lit {
    /// Positive literal of a variable.
    #[must_use]
    pub const fn pos(var: Var) -> Self {
        Self(var.0 << 1)
    }

    /// Negative literal of a variable.
    #[must_use]
    pub const fn neg(var: Var) -> Self {
        Self((var.0 << 1) | 1)
    }

    /// Literal of a variable with the given polarity.
    #[must_use]
    pub const fn new(var: Var, positive: bool) -> Self {
        if positive { Self::pos(var) } else { Self::neg(var) }
    }

    /// Variable of this literal.
    #[must_use]
    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Check if this literal is positive.
    #[must_use]
    pub const fn is_pos(self) -> bool {
        (self.0 & 1) == 0
    }

    /// Check if this literal is negative.
    #[must_use]
    pub const fn is_neg(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Negation of this literal.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Dense code, usable as an index into per-literal tables.
    #[must_use]
    pub const fn code(self) -> usize {
        self.0 as usize
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self {
        self.negate()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pos() {
            write!(f, "{}", self.var().0)
        } else {
            write!(f, "-{}", self.var().0)
        }
    }
}

/// Lifted Boolean: a variable may be unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LBool {
    /// Assigned true
    True,
    /// Assigned false
    False,
    /// Unassigned
    #[default]
    Undef,
}

impl LBool {
    /// Lift a Boolean.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }

    /// Flip the value when `negate` is set; `Undef` stays `Undef`.
    #[must_use]
    pub const fn xor(self, negate: bool) -> Self {
        match (self, negate) {
            (Self::True, true) => Self::False,
            (Self::False, true) => Self::True,
            (value, _) => value,
        }
    }

    /// Check if the value is assigned.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        !matches!(self, Self::Undef)
    }
}
