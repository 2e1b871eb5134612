//! Scheduler constants for the sync engine.

/// Pull batch cap sent with every sync request.
pub const DEFAULT_PULL_LIMIT: i64 = 100;

/// Oldest pending mutations drained per push.
pub const DEFAULT_PUSH_BATCH: i64 = 10;

/// Delay before the next push when the queue still holds mutations.
pub const PUSH_DRAIN_DELAY_MS: u64 = 100;

/// Maximum jitter added to periodic pull ticks.
pub const PULL_TICK_JITTER_MS: u64 = 250;
