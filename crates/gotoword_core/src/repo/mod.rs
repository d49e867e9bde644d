//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the keyword store contract the resolver and services run against.
//! - Isolate SQLite query details from save resolution and listing services.
//!
//! # Invariants
//! - Repository APIs accept raw names and normalize them before any query.
//! - Unique-name violations surface as `RepoError::Duplicate`, never as a raw
//!   SQLite error, so callers can recover by reusing the existing row.

pub mod note_repo;
