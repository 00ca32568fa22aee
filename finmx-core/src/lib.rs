//! finmx Core - Vocabularies, Theories and Three-Valued Structures
//!
//! This crate provides the data model shared by the finmx model expansion
//! pipeline:
//! - A [`Vocabulary`] of sorts (with a subsort hierarchy), predicates and functions
//! - Finite [`SortTable`]s of [`DomainElement`]s
//! - Sum-typed [`Term`]s, [`Formula`]s and [`SetExpr`]s with free-variable analysis
//! - Inductive [`Definition`]s, nested [`FixpointDefinition`]s and [`Theory`]s
//! - Three-valued [`Structure`]s (certainly true / certainly false / unknown)
//! - The [`Odometer`] tuple enumerator used by every grounding-style traversal
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use finmx_core::{DomainElement, Formula, SortTable, Structure, Term, Theory, Variable, Vocabulary};
//!
//! let mut voc = Vocabulary::new();
//! let node = voc.add_sort("Node", &[]);
//! let p = voc.add_predicate("P", &[node]);
//! let voc = Arc::new(voc);
//!
//! let x = Variable::new(0, "x", node);
//! let mut theory = Theory::new(voc.clone());
//! theory.add_sentence(Formula::forall(vec![x.clone()], Formula::atom(p, vec![Term::var(&x)])));
//!
//! let mut structure = Structure::new(voc);
//! structure.set_domain(node, SortTable::finite(["a", "b"].map(DomainElement::from)));
//! assert_eq!(structure.domain(node).unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod element;
pub mod error;
pub mod formula;
pub mod odometer;
pub mod sort;
pub mod structure;
pub mod term;
pub mod theory;
pub mod truth;
pub mod vocabulary;

pub use config::{ExpansionConfig, SymmetryBreaking};
pub use element::{DomainElement, Tuple, format_tuple};
pub use error::{FinmxError, Result};
pub use formula::{Comparator, Formula, SetExpr};
pub use odometer::{Odometer, Tuples};
pub use sort::{SortId, SortTable};
pub use structure::{Interpretation, Structure};
pub use term::{AggregateKind, Term, VarId, Variable};
pub use theory::{Definition, FixpointDefinition, Rule, Theory};
pub use truth::TruthValue;
pub use vocabulary::{Sort, Symbol, SymbolId, SymbolKind, Vocabulary};
