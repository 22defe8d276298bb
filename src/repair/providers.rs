use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::config::get_self_name;

pub type JobIdProvider = Box<dyn Fn() -> u64 + Send + Sync>;
pub type TimestampProvider = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;
pub type ServerIdProvider = Box<dyn Fn() -> String + Send + Sync>;

// Seeded from the clock so ids keep growing across restarts. A collision with
// another coordinator is caught by the empty precondition on Target/ToDo/<id>.
static NEXT_JOB_ID: Lazy<AtomicU64> =
    Lazy::new(|| AtomicU64::new(Utc::now().timestamp_micros().max(1) as u64));

pub fn next_job_id() -> u64 {
    NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn self_name() -> String {
    get_self_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_job_id_is_unique() {
        let a = next_job_id();
        let b = next_job_id();
        assert!(b > a);
    }
}
