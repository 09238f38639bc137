//! Advisory countdown to an attempt's due date.
//!
//! Display only: an expired countdown does not block submission.

use std::fmt;

use chrono::{DateTime, Utc};

/// Time left before `due_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining {
        hours: i64,
        minutes: i64,
        seconds: i64,
    },
    Expired,
}

impl Countdown {
    /// Countdown from `now` to `due_at`, truncated to whole seconds.
    pub fn at(due_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let millis = (due_at - now).num_milliseconds();
        if millis <= 0 {
            return Countdown::Expired;
        }
        let total = millis / 1000;
        Countdown::Remaining {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Countdown::Expired)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Remaining {
                hours,
                minutes,
                seconds,
            } => write!(f, "{hours}h {minutes}m {seconds}s"),
            Countdown::Expired => write!(f, "Time expired!"),
        }
    }
}
