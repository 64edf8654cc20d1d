use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::magnitude::Magnitude;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub magnitude: Magnitude,
    pub samples_used: usize,
}

impl AlertRecord {
    pub fn new(magnitude: Magnitude, samples_used: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            magnitude,
            samples_used,
        }
    }
}

/// In-memory ring of the most recent alerts, served to the dashboard on
/// connect so a fresh page can show what it missed. Nothing is persisted.
pub struct AlertHistory {
    events: VecDeque<AlertRecord>,
    capacity: usize,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
        }
    }

    pub fn shared(capacity: usize) -> SharedHistory {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn add(&mut self, record: AlertRecord) {
        self.events.push_back(record);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn get_events(&self) -> Vec<AlertRecord> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub type SharedHistory = Arc<Mutex<AlertHistory>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut history = AlertHistory::new(3);
        for i in 0..5 {
            history.add(AlertRecord::new(Magnitude::from_samples(&[i as f64]), 1));
        }
        let events = history.get_events();
        assert_eq!(events.len(), 3);
        // Oldest two were evicted; remaining records keep arrival order.
        assert!(events[0].timestamp <= events[1].timestamp);
        assert!(events[1].timestamp <= events[2].timestamp);
    }

    #[test]
    fn test_records_are_unique() {
        let a = AlertRecord::new(Magnitude::from_samples(&[]), 0);
        let b = AlertRecord::new(Magnitude::from_samples(&[]), 0);
        assert_ne!(a.id, b.id);
    }
}
