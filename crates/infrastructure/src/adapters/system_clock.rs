//! Wall clock adapter

use application::ports::ClockPort;
use chrono::{DateTime, Utc};

/// `ClockPort` backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
