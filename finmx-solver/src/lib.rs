//! finmx Solver - Grounding and Model Expansion
//!
//! Given a theory and a partial structure over finite domains, this crate
//! finds structures that satisfy the theory:
//! - [`fixpoint`]: evaluates calculable definitions into the structure
//!   (well-founded and nested least/greatest fixpoint semantics)
//! - [`symmetry`]: detects interchangeable domain elements and derives
//!   lex-leader constraints
//! - [`ground`]: instantiates quantifiers, sets and rules over the domains
//! - [`encode`]: translates ground theories to clauses and decodes models
//! - [`mx`]: the model expansion pipeline driving all of the above
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use finmx_core::{DomainElement, ExpansionConfig, Formula, SortTable, Structure, Term, Theory, Variable, Vocabulary};
//! use finmx_solver::expand;
//!
//! let mut voc = Vocabulary::new();
//! let node = voc.add_sort("Node", &[]);
//! let p = voc.add_predicate("P", &[node]);
//! let voc = Arc::new(voc);
//!
//! // exactly the nodes that are not `a` satisfy P
//! let x = Variable::new(0, "x", node);
//! let a = Term::domain(DomainElement::name("a"));
//! let mut theory = Theory::new(voc.clone());
//! theory.add_sentence(Formula::forall(
//!     vec![x.clone()],
//!     Formula::iff(
//!         Formula::atom(p, vec![Term::var(&x)]),
//!         Formula::compare(Term::var(&x), finmx_core::Comparator::Ne, a),
//!     ),
//! ));
//!
//! let mut structure = Structure::new(voc);
//! structure.set_domain(node, SortTable::finite(["a", "b"].map(DomainElement::from)));
//!
//! let models = expand(&theory, &structure, &ExpansionConfig::default(), None).unwrap();
//! assert_eq!(models.len(), 1);
//! assert!(models[0].value(p, &[DomainElement::name("b")]).is_true());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod encode;
pub mod eval;
pub mod fixpoint;
pub mod ground;
pub mod mx;
pub mod symmetry;

pub use encode::{Cases, EncodeStats, Encoder};
pub use eval::{TermValue, Valuation, eval_formula, eval_term};
pub use fixpoint::{CalculatedDefinitions, FixpointOutcome, calculate_known_definitions};
pub use ground::{Bindings, Grounder, atom_formula, certain_facts};
pub use mx::{Expander, Expansion, ExpansionStats, ExpansionStatus, expand, expand_with_status};
pub use symmetry::{IvSet, SymmetryFinder};
