// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job-type retry policy.
//!
//! Every handler declares how many retries its job type gets and the
//! backoff before each. The pipeline default retries three times, 1, 5,
//! and 15 minutes after the failing attempt; periodic sweeps never retry
//! since their next scheduled run covers them.

use chrono::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: i64,
    /// Minutes of backoff before retry 1, 2, ... Same length as
    /// `max_retries`.
    backoff_minutes: &'static [i64],
}

/// Three retries at +1, +5, +15 minutes.
pub const PIPELINE: RetryPolicy = RetryPolicy {
    max_retries: 3,
    backoff_minutes: &[1, 5, 15],
};

/// No retries; recurring jobs reschedule themselves instead.
pub const SWEEP: RetryPolicy = RetryPolicy {
    max_retries: 0,
    backoff_minutes: &[],
};

impl RetryPolicy {
    /// Backoff before the next attempt, given how many attempts have
    /// already run. `None` when the retry budget is exhausted.
    pub fn backoff_after(&self, attempts_made: i64) -> Option<Duration> {
        if attempts_made < 1 || attempts_made > self.max_retries {
            return None;
        }
        self.backoff_minutes
            .get(attempts_made as usize - 1)
            .map(|minutes| Duration::minutes(*minutes))
    }

    /// Total executions a job row gets, for the `max_attempts` column.
    pub fn total_attempts(&self) -> i64 {
        self.max_retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_backs_off_1_5_15_then_stops() {
        assert_eq!(PIPELINE.backoff_after(1), Some(Duration::minutes(1)));
        assert_eq!(PIPELINE.backoff_after(2), Some(Duration::minutes(5)));
        assert_eq!(PIPELINE.backoff_after(3), Some(Duration::minutes(15)));
        assert_eq!(PIPELINE.backoff_after(4), None);
        assert_eq!(PIPELINE.total_attempts(), 4);
    }

    #[test]
    fn sweep_policy_never_retries() {
        assert_eq!(SWEEP.backoff_after(1), None);
        assert_eq!(SWEEP.total_attempts(), 1);
    }
}
