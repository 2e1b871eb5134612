//! Wire protocol and HTTP client for the promptdeck sync endpoints.
//!
//! Two endpoints: `POST {base}/sync` returns a delta packet since a cursor,
//! `POST {base}/mutations` pushes a batch of queued mutations and returns
//! per-mutation results.

mod client;
mod error;
mod types;

pub use client::SyncApiClient;
pub use error::{Result, SyncApiError};
pub use types::{
    ChangeSet, DeltaChanges, DeltaPacket, MutationEnvelope, MutationResult, PushRequest,
    PushResponse, SyncRequest,
};
