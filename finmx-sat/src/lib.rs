//! finmx SAT - Propositional Engine
//!
//! A compact CDCL solver used as the back end of model expansion:
//! - Two-watched-literal unit propagation
//! - First-UIP clause learning with non-chronological backjumping
//! - Activity-based branching with phase saving and Luby restarts
//! - Incremental clause addition between solve calls (model enumeration)
//! - Timeout, conflict budget and interrupt flag
//! - [`TraceMonitor`] hooks for observing propagation and backtracking
//!
//! # Examples
//!
//! ```
//! use finmx_sat::{Lit, Solver, SolverResult};
//!
//! let mut solver = Solver::new();
//! let a = solver.new_var();
//! let b = solver.new_var();
//! solver.add_clause(&[Lit::pos(a), Lit::pos(b)]);
//! solver.add_clause(&[Lit::neg(a)]);
//! assert_eq!(solver.solve(), SolverResult::Sat);
//! assert!(solver.model().unwrap().value(b));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod literal;
pub mod monitor;
pub mod solver;

pub use literal::{LBool, Lit, Var};
pub use monitor::{RecordingMonitor, TraceEvent, TraceMonitor};
pub use solver::{Model, Solver, SolverConfig, SolverResult, SolverStats};
