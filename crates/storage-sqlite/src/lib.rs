//! SQLite durable store for the promptdeck catalog.
//!
//! Holds five namespaces: the three entity kinds, the pending-mutation
//! queue, and the sync metadata singleton. All writes funnel through a
//! single-writer actor so every mutating operation is one immediate
//! transaction; reads go through an r2d2 pool.

pub mod db;
pub mod errors;
pub mod schema;
pub mod store;

pub use db::{create_pool, get_connection, init, run_migrations, DbPool, WriteHandle};
pub use errors::{Result, StoreError};
pub use store::CatalogStore;
