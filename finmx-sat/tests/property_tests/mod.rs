//! Property-based tests for finmx-sat
//!
//! Compares the CDCL search against exhaustive enumeration on small formulas.

mod cdcl_properties;
