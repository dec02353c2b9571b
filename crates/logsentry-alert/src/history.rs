//! Bounded in-memory alert history

use chrono::{DateTime, Utc};
use logsentry_core::Alert;
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub alert: Alert,
}

// oldest entries are evicted first once capacity is reached
#[derive(Debug)]
pub struct AlertHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, alerts: &[Alert]) {
        if self.capacity == 0 {
            return;
        }
        let now = Utc::now();
        for alert in alerts {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(HistoryEntry {
                id: Uuid::new_v4(),
                recorded_at: now,
                alert: alert.clone(),
            });
        }
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    // newest `n`, newest first
    pub fn latest(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
