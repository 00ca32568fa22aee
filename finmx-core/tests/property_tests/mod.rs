//! Property-based tests for finmx-core
//!
//! Covers tuple enumeration order and three-valued structure updates.

mod odometer_properties;
mod structure_properties;
