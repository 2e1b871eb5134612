//! Retry pacing for transport failures.

/// Exponential backoff in milliseconds with a capped exponent.
///
/// The first retry (zero prior consecutive failures) waits exactly
/// `initial_delay_ms`; each further consecutive failure multiplies the wait
/// by `multiplier`.
pub fn backoff_delay_ms(initial_delay_ms: u64, multiplier: u32, consecutive_failures: u32) -> u64 {
    const MAX_EXPONENT: u32 = 8;

    let exponent = consecutive_failures.min(MAX_EXPONENT);
    initial_delay_ms.saturating_mul(u64::from(multiplier).saturating_pow(exponent))
}
