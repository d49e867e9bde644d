//! Domain model for keywords, contexts and their definitions.
//!
//! # Responsibility
//! - Define the records the store persists and the resolver reasons about.
//! - Own name normalization shared by lookups and writes.
//!
//! # Invariants
//! - Note and context identity is the normalized name (trimmed, lowercase).
//! - At most one definition exists per (note, context) pair, where "no
//!   context" counts as one pair.

pub mod context;
pub mod name;
pub mod note;
