//! Upstream usage telemetry.
//!
//! A bounded ring buffer of call outcomes. Observability only: nothing reads
//! it to make a control decision.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::types::UsageStats;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Days used for the naive monthly projection.
const DAYS_PER_MONTH: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct UsageLogEntry {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub success: bool,
}

pub struct UsageLog {
    entries: Mutex<VecDeque<UsageLogEntry>>,
    capacity: usize,
}

impl UsageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, endpoint: &str, success: bool) {
        self.record_at(endpoint, success, Utc::now());
    }

    pub fn record_at(&self, endpoint: &str, success: bool, timestamp: DateTime<Utc>) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(UsageLogEntry {
            timestamp,
            endpoint: endpoint.to_string(),
            success,
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> UsageStats {
        self.stats_at(Utc::now())
    }

    /// Counts over the trailing hour and day, as seen from `now`.
    pub fn stats_at(&self, now: DateTime<Utc>) -> UsageStats {
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        let entries = self.lock();
        let last_hour = entries.iter().filter(|e| e.timestamp > hour_ago).count();
        let (last_24_hours, successes) = entries
            .iter()
            .filter(|e| e.timestamp > day_ago)
            .fold((0, 0), |(total, ok), e| (total + 1, ok + usize::from(e.success)));

        let success_rate = if last_24_hours == 0 {
            100.0
        } else {
            successes as f64 / last_24_hours as f64 * 100.0
        };

        UsageStats {
            last_hour,
            last_24_hours,
            projected_monthly: last_24_hours * DAYS_PER_MONTH,
            success_rate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<UsageLogEntry>> {
        // Entries are plain data; a panic mid-push cannot leave them inconsistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for UsageLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = UsageLog::new(3);
        let now = Utc::now();
        for i in 0..5 {
            log.record_at(&format!("call-{}", i), true, now);
        }
        assert_eq!(log.len(), 3);
        let entries = log.lock();
        assert_eq!(entries.front().unwrap().endpoint, "call-2");
        assert_eq!(entries.back().unwrap().endpoint, "call-4");
    }

    #[test]
    fn test_rolling_windows() {
        let log = UsageLog::default();
        let now = Utc::now();
        log.record_at("quotes/latest", true, now - Duration::minutes(10));
        log.record_at("quotes/latest", false, now - Duration::minutes(30));
        log.record_at("quotes/latest", true, now - Duration::hours(5));
        log.record_at("quotes/latest", true, now - Duration::hours(30));

        let stats = log.stats_at(now);
        assert_eq!(stats.last_hour, 2);
        assert_eq!(stats.last_24_hours, 3);
        assert_eq!(stats.projected_monthly, 90);
        assert!((stats.success_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_log_reports_full_success() {
        let stats = UsageLog::default().stats();
        assert_eq!(stats.last_24_hours, 0);
        assert_eq!(stats.success_rate, 100.0);
    }
}
