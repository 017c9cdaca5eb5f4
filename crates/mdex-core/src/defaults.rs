//! Shared default values and tuning constants.
//!
//! Every tunable that more than one crate reads lives here so the API,
//! worker, and stores agree on a single source of truth.

/// Default job priority (lower value = more urgent).
pub const JOB_PRIORITY_DEFAULT: i32 = 5;

/// Minimum accepted job priority.
pub const JOB_PRIORITY_MIN: i32 = 0;

/// Maximum accepted job priority.
pub const JOB_PRIORITY_MAX: i32 = 10;

/// Maximum length of a caller-supplied idempotency key.
pub const IDEMPOTENCY_KEY_MAX_LEN: usize = 128;

/// Default polling interval for the job worker (milliseconds).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Default number of concurrent worker slots.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Ceiling for the intake handler's bounded completion wait (seconds).
pub const INTAKE_WAIT_MAX_SECS: u64 = 30;

/// Poll interval used by the intake handler's bounded wait (milliseconds).
pub const INTAKE_WAIT_POLL_MS: u64 = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds_ordered() {
        assert!(JOB_PRIORITY_MIN <= JOB_PRIORITY_DEFAULT);
        assert!(JOB_PRIORITY_DEFAULT <= JOB_PRIORITY_MAX);
    }

    #[test]
    fn test_intake_wait_bounded() {
        assert!(INTAKE_WAIT_MAX_SECS <= 30);
        assert!(INTAKE_WAIT_POLL_MS > 0);
    }
}
