//! Odometer-style tuple enumeration.
//!
//! An [`Odometer`] walks the cartesian product of `n` index ranges with the
//! rightmost position moving fastest. Grounding, symmetry detection, the
//! propositional encoder and the fixpoint evaluator all enumerate tuples
//! through it, so they agree on one global tuple order.

use crate::element::{DomainElement, Tuple};

/// Enumerator over index tuples of `sizes[0] x ... x sizes[n-1]`.
///
/// With zero positions it yields exactly one empty tuple. If any position has
/// size zero it yields nothing.
#[derive(Debug, Clone)]
pub struct Odometer {
    sizes: Vec<usize>,
    current: Vec<usize>,
    exhausted: bool,
}

impl Odometer {
    /// Create an odometer over the given position sizes.
    #[must_use]
    pub fn new(sizes: Vec<usize>) -> Self {
        let exhausted = sizes.contains(&0);
        let current = vec![0; sizes.len()];
        Self {
            sizes,
            current,
            exhausted,
        }
    }

    /// Restart the enumeration from the first tuple.
    pub fn reset(&mut self) {
        self.current.iter_mut().for_each(|i| *i = 0);
        self.exhausted = self.sizes.contains(&0);
    }

    /// Number of positions.
    #[must_use]
    pub fn width(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of tuples (saturating).
    #[must_use]
    pub fn total(&self) -> usize {
        self.sizes.iter().fold(1usize, |acc, &s| acc.saturating_mul(s))
    }

    /// The tuple the odometer currently points at, if not exhausted.
    #[must_use]
    pub fn current(&self) -> Option<&[usize]> {
        (!self.exhausted).then_some(self.current.as_slice())
    }

    /// Move to the next tuple. Returns `false` once the enumeration is over.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        for pos in (0..self.sizes.len()).rev() {
            self.current[pos] += 1;
            if self.current[pos] < self.sizes[pos] {
                return true;
            }
            self.current[pos] = 0;
        }
        // Carry out of the leftmost position
        self.exhausted = true;
        false
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current()?.to_vec();
        self.advance();
        Some(item)
    }
}

/// Element tuples over a list of finite domains, in odometer order.
#[derive(Debug, Clone)]
pub struct Tuples<'d> {
    domains: Vec<&'d [DomainElement]>,
    odometer: Odometer,
}

impl<'d> Tuples<'d> {
    /// Enumerate `domains[0] x ... x domains[n-1]`.
    #[must_use]
    pub fn new(domains: Vec<&'d [DomainElement]>) -> Self {
        let odometer = Odometer::new(domains.iter().map(|d| d.len()).collect());
        Self { domains, odometer }
    }

    /// Restart from the first tuple.
    pub fn reset(&mut self) {
        self.odometer.reset();
    }

    /// Total number of tuples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.odometer.total()
    }
}

impl Iterator for Tuples<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.odometer.current()?;
        let tuple = indices
            .iter()
            .zip(&self.domains)
            .map(|(&i, d)| d[i].clone())
            .collect();
        self.odometer.advance();
        Some(tuple)
    }
}
