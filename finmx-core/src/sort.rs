//! Sort identifiers and domain tables.

use crate::element::DomainElement;
use std::fmt;

/// Index of a sort in a [`crate::Vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortId(pub u32);

impl SortId {
    /// Create a sort id from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of this sort in vocabulary tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort#{}", self.0)
    }
}

/// The domain of a sort in a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTable {
    /// A finite, sorted, duplicate-free list of elements.
    Finite(Vec<DomainElement>),
    /// An unbounded domain; it can be mentioned but never enumerated.
    Infinite,
}

impl SortTable {
    /// Build a finite table; elements are sorted and deduplicated.
    pub fn finite(elements: impl IntoIterator<Item = DomainElement>) -> Self {
        let mut elements: Vec<DomainElement> = elements.into_iter().collect();
        elements.sort();
        elements.dedup();
        Self::Finite(elements)
    }

    /// Build the integer range `lo..=hi`.
    #[must_use]
    pub fn range(lo: i64, hi: i64) -> Self {
        Self::Finite((lo..=hi).map(DomainElement::Int).collect())
    }

    /// The empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::Finite(Vec::new())
    }

    /// The elements, or `None` for an infinite table.
    #[must_use]
    pub fn elements(&self) -> Option<&[DomainElement]> {
        match self {
            Self::Finite(elements) => Some(elements),
            Self::Infinite => None,
        }
    }

    /// Number of elements, or `None` for an infinite table.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        self.elements().map(<[DomainElement]>::len)
    }

    /// Check if the table is finite and empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Check if the table is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// Membership test. Infinite tables contain everything.
    #[must_use]
    pub fn contains(&self, element: &DomainElement) -> bool {
        match self {
            Self::Finite(elements) => elements.binary_search(element).is_ok(),
            Self::Infinite => true,
        }
    }

    /// Position of an element in a finite table.
    #[must_use]
    pub fn index_of(&self, element: &DomainElement) -> Option<usize> {
        match self {
            Self::Finite(elements) => elements.binary_search(element).ok(),
            Self::Infinite => None,
        }
    }
}

impl Default for SortTable {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_table_sorted_and_deduplicated() {
        let table = SortTable::finite(["c", "a", "b", "a"].map(DomainElement::from));
        assert_eq!(table.len(), Some(3));
        assert_eq!(table.index_of(&DomainElement::name("b")), Some(1));
        assert!(table.contains(&DomainElement::name("c")));
        assert!(!table.contains(&DomainElement::name("d")));
    }

    #[test]
    fn test_range_table() {
        let table = SortTable::range(1, 3);
        assert_eq!(
            table.elements().map(|e| e.to_vec()),
            Some(vec![
                DomainElement::int(1),
                DomainElement::int(2),
                DomainElement::int(3)
            ])
        );
    }

    #[test]
    fn test_infinite_table() {
        let table = SortTable::Infinite;
        assert!(!table.is_finite());
        assert_eq!(table.len(), None);
        assert!(table.elements().is_none());
        assert!(table.contains(&DomainElement::int(42)));
    }
}
