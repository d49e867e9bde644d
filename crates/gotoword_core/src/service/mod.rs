//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod cursor;
pub mod note_service;
pub mod panel;
pub mod save_service;
