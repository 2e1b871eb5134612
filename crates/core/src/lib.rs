//! Domain models and sync primitives for the promptdeck local-first catalog.
//!
//! This crate is storage- and transport-agnostic: it defines the entities,
//! the pending-mutation and sync-metadata records, the sync status state
//! machine, and the decoded delta shapes the rest of the workspace moves
//! around.

pub mod models;
pub mod sync;
pub mod time;
