//! Domain elements and tuples.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// An element of a sort's domain.
///
/// Integers order before names, names order lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainElement {
    /// Numeric element.
    Int(i64),
    /// Named (symbolic) element.
    Str(Arc<str>),
}

impl DomainElement {
    /// Create a numeric element.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Create a named element.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Str(Arc::from(name))
    }

    /// The numeric value, if this is a numeric element.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(_) => None,
        }
    }

    /// Check if this is a numeric element.
    #[must_use]
    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl From<i64> for DomainElement {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for DomainElement {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl fmt::Display for DomainElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Str(name) => write!(f, "{}", name),
        }
    }
}

/// A tuple of domain elements, e.g. the arguments of an atom.
pub type Tuple = SmallVec<[DomainElement; 4]>;

/// Render a tuple as `(a,b,c)`.
#[must_use]
pub fn format_tuple(tuple: &[DomainElement]) -> String {
    let parts: Vec<String> = tuple.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ints_order_before_names() {
        let mut elems = vec![
            DomainElement::name("b"),
            DomainElement::int(3),
            DomainElement::name("a"),
            DomainElement::int(-1),
        ];
        elems.sort();
        assert_eq!(
            elems,
            vec![
                DomainElement::int(-1),
                DomainElement::int(3),
                DomainElement::name("a"),
                DomainElement::name("b"),
            ]
        );
    }

    #[test]
    fn test_format_tuple() {
        let tuple: Tuple = [DomainElement::name("a"), DomainElement::int(2)]
            .into_iter()
            .collect();
        assert_eq!(format_tuple(&tuple), "(a,2)");
        assert_eq!(format_tuple(&[]), "()");
    }
}
