//! Vocabularies: sorts, predicates and functions.
//!
//! Names are interned once; every other part of finmx refers to sorts and
//! symbols by their dense ids ([`SortId`], [`SymbolId`]).

use crate::error::{FinmxError, Result};
use crate::sort::SortId;
use lasso::{Rodeo, Spur};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;

/// Index of a predicate or function symbol in a [`Vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Create a symbol id from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of this symbol in vocabulary tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// A declared sort.
#[derive(Debug, Clone)]
pub struct Sort {
    /// Interned name.
    pub name: Spur,
    /// Direct parent sorts (this sort is a subsort of each of them).
    pub parents: SmallVec<[SortId; 2]>,
}

/// Whether a symbol is a predicate or a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Predicate symbol.
    Predicate,
    /// Function symbol with its result sort.
    Function {
        /// Result sort.
        result: SortId,
    },
}

/// A declared predicate or function symbol.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Interned name.
    pub name: Spur,
    /// Argument sorts.
    pub args: SmallVec<[SortId; 4]>,
    /// Predicate or function.
    pub kind: SymbolKind,
}

impl Symbol {
    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Check if this is a function symbol.
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    /// Result sort of a function symbol.
    #[must_use]
    pub fn result(&self) -> Option<SortId> {
        match self.kind {
            SymbolKind::Function { result } => Some(result),
            SymbolKind::Predicate => None,
        }
    }

    /// Sorts of the stored tuples: the arguments, followed by the result
    /// sort for functions (functions are interpreted by their graph).
    #[must_use]
    pub fn graph_sorts(&self) -> SmallVec<[SortId; 4]> {
        let mut sorts = self.args.clone();
        if let Some(result) = self.result() {
            sorts.push(result);
        }
        sorts
    }

    /// Check if any argument (or the result) ranges over one of `sorts`.
    #[must_use]
    pub fn touches(&self, sorts: &FxHashSet<SortId>) -> bool {
        self.graph_sorts().iter().any(|s| sorts.contains(s))
    }
}

/// Sorts and symbols of a theory.
#[derive(Debug, Default)]
pub struct Vocabulary {
    names: Rodeo,
    sorts: Vec<Sort>,
    symbols: Vec<Symbol>,
    sort_index: FxHashMap<Spur, SortId>,
    symbol_index: FxHashMap<Spur, SymbolId>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a sort with the given parent sorts.
    pub fn add_sort(&mut self, name: &str, parents: &[SortId]) -> SortId {
        let name = self.names.get_or_intern(name);
        let id = SortId::new(self.sorts.len() as u32);
        self.sorts.push(Sort {
            name,
            parents: parents.iter().copied().collect(),
        });
        self.sort_index.insert(name, id);
        id
    }

    /// Declare a predicate symbol.
    pub fn add_predicate(&mut self, name: &str, args: &[SortId]) -> SymbolId {
        self.add_symbol(name, args, SymbolKind::Predicate)
    }

    /// Declare a function symbol.
    pub fn add_function(&mut self, name: &str, args: &[SortId], result: SortId) -> SymbolId {
        self.add_symbol(name, args, SymbolKind::Function { result })
    }

    fn add_symbol(&mut self, name: &str, args: &[SortId], kind: SymbolKind) -> SymbolId {
        let name = self.names.get_or_intern(name);
        let id = SymbolId::new(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name,
            args: args.iter().copied().collect(),
            kind,
        });
        self.symbol_index.insert(name, id);
        id
    }

    /// Look up a sort.
    pub fn sort(&self, id: SortId) -> Result<&Sort> {
        self.sorts
            .get(id.index())
            .ok_or_else(|| FinmxError::UnknownSort(id.to_string()))
    }

    /// Look up a symbol.
    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol> {
        self.symbols
            .get(id.index())
            .ok_or_else(|| FinmxError::UnknownSymbol(id.to_string()))
    }

    /// Name of a sort (or its id when unknown).
    #[must_use]
    pub fn sort_name(&self, id: SortId) -> String {
        self.sorts
            .get(id.index())
            .map_or_else(|| id.to_string(), |s| self.names.resolve(&s.name).to_string())
    }

    /// Name of a symbol (or its id when unknown).
    #[must_use]
    pub fn symbol_name(&self, id: SymbolId) -> String {
        self.symbols
            .get(id.index())
            .map_or_else(|| id.to_string(), |s| self.names.resolve(&s.name).to_string())
    }

    /// Find a sort by name.
    #[must_use]
    pub fn sort_by_name(&self, name: &str) -> Option<SortId> {
        self.names
            .get(name)
            .and_then(|spur| self.sort_index.get(&spur).copied())
    }

    /// Find a symbol by name.
    #[must_use]
    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.names
            .get(name)
            .and_then(|spur| self.symbol_index.get(&spur).copied())
    }

    /// All sort ids in declaration order.
    pub fn sorts(&self) -> impl Iterator<Item = SortId> + '_ {
        (0..self.sorts.len()).map(|i| SortId::new(i as u32))
    }

    /// All symbol ids in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len()).map(|i| SymbolId::new(i as u32))
    }

    /// Number of sorts.
    #[must_use]
    pub fn num_sorts(&self) -> usize {
        self.sorts.len()
    }

    /// Number of symbols.
    #[must_use]
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// The sort together with all of its ancestors (closure under "has parent").
    #[must_use]
    pub fn ancestors(&self, sort: SortId) -> FxHashSet<SortId> {
        let mut closure = FxHashSet::default();
        let mut stack = vec![sort];
        while let Some(current) = stack.pop() {
            if !closure.insert(current) {
                continue;
            }
            if let Some(s) = self.sorts.get(current.index()) {
                stack.extend(s.parents.iter().copied());
            }
        }
        closure
    }

    /// The sort together with all of its descendants.
    #[must_use]
    pub fn descendants(&self, sort: SortId) -> FxHashSet<SortId> {
        self.sorts()
            .filter(|&s| self.ancestors(s).contains(&sort))
            .collect()
    }
}
