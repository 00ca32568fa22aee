//! Property-based tests for finmx-solver
//!
//! Grounding shape and the model expansion pipeline on small random theories.

mod expansion_properties;
mod grounding_properties;
