//! Short-lived attribute value cache
//!
//! Entries are never evicted; freshness is decided when a value is read,
//! against the maximum age the caller is willing to accept.

use crate::attribute::AttributeValue;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Latest known value per attribute id
#[derive(Debug, Default)]
pub struct AttributeCache {
    entries: DashMap<u16, AttributeValue>,
}

impl AttributeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one; returns the replaced value
    pub fn insert(&self, attr_id: u16, value: AttributeValue) -> Option<AttributeValue> {
        self.entries.insert(attr_id, value)
    }

    /// Latest value regardless of age
    #[must_use]
    pub fn get(&self, attr_id: u16) -> Option<AttributeValue> {
        self.entries.get(&attr_id).map(|entry| entry.value().clone())
    }

    /// Latest value if it is no older than `max_age`
    #[must_use]
    pub fn get_valid(&self, attr_id: u16, max_age: Duration) -> Option<AttributeValue> {
        self.get_valid_at(attr_id, max_age, Instant::now())
    }

    /// Latest value if it is no older than `max_age` at `now`
    #[must_use]
    pub fn get_valid_at(&self, attr_id: u16, max_age: Duration, now: Instant) -> Option<AttributeValue> {
        self.entries
            .get(&attr_id)
            .filter(|entry| entry.value().is_fresh_at(max_age, now))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, attr_id: u16) -> Option<AttributeValue> {
        self.entries.remove(&attr_id).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
