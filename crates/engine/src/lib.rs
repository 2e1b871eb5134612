//! Projected view and background sync engine for the promptdeck catalog.
//!
//! The [`CatalogView`] serves reads and accepts optimistic writes from the
//! presentation layer; the [`SyncEngine`] keeps the local replica coherent
//! with the remote authority by pulling deltas against a monotonic cursor
//! and draining the pending-mutation queue.

mod engine;
mod errors;
mod hooks;
mod runtime;
mod view;

pub use engine::{PushOutcome, SyncEngine};
pub use errors::{EngineError, Result};
pub use hooks::SyncHooks;
pub use runtime::{current_engine, install_engine, shutdown_engine};
pub use view::CatalogView;
