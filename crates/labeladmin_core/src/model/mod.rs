//! Domain model for maintenance operations.
//!
//! # Responsibility
//! - Name deletion targets by the keys operators use.
//! - Carry read-only record summaries and operation results.
//!
//! # Invariants
//! - Records here are projections of existing rows; this crate never
//!   creates platform records.

pub mod deletion;
pub mod records;
pub mod schema_change;
pub mod target;
