use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::report::ReportStatus;

pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(60 * 60);

/// Result of [`DeliveryLog::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// First delivery of the key. The caller must [`DeliveryLog::complete`]
    /// or [`DeliveryLog::release`] it.
    Fresh,
    /// Another delivery of the key is still being handled.
    InFlight,
    /// The key was handled successfully within the TTL.
    Handled,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handled: bool,
    at: Instant,
}

/// Remembers which `(report_id, status)` deliveries are being handled or
/// were handled.
///
/// The service delivers at least once and retries slow acknowledgments, so
/// the same notification can arrive several times, possibly concurrently.
/// Only a successful run marks a key handled; a failed run forgets it.
/// Entries are forgotten `ttl` after they were last updated.
#[derive(Debug)]
pub struct DeliveryLog {
    ttl: Duration,
    seen: Mutex<HashMap<(String, ReportStatus), Entry>>,
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_TTL)
    }
}

impl DeliveryLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Concurrent callers racing on one key see exactly one [`Claim::Fresh`].
    pub fn claim(&self, report_id: &str, status: &ReportStatus) -> Claim {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, entry| now.duration_since(entry.at) < self.ttl);

        let key = (report_id.to_string(), status.clone());
        match seen.get(&key) {
            Some(entry) if entry.handled => Claim::Handled,
            Some(_) => Claim::InFlight,
            None => {
                seen.insert(
                    key,
                    Entry {
                        handled: false,
                        at: now,
                    },
                );
                Claim::Fresh
            }
        }
    }

    /// Marks a claimed key handled, so redeliveries are acknowledged as-is.
    pub fn complete(&self, report_id: &str, status: &ReportStatus) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(
            (report_id.to_string(), status.clone()),
            Entry {
                handled: true,
                at: Instant::now(),
            },
        );
    }

    /// Forgets a claim so a redelivery is processed again.
    pub fn release(&self, report_id: &str, status: &ReportStatus) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.remove(&(report_id.to_string(), status.clone()));
    }

    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
