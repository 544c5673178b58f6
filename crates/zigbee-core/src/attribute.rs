//! Attribute descriptors, values and request context

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use zcl_protocol::{ZclDataType, ZclValue};

/// Static description of one attribute of a concrete cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute identifier
    pub id: u16,
    /// Name used by the application layer
    pub name: &'static str,
    /// Wire type of the attribute
    pub data_type: ZclDataType,
    /// Whether the attribute can be configured for reporting
    pub reportable: bool,
}

impl AttributeDescriptor {
    #[must_use]
    pub const fn new(id: u16, name: &'static str, data_type: ZclDataType, reportable: bool) -> Self {
        Self {
            id,
            name,
            data_type,
            reportable,
        }
    }
}

/// An attribute value together with the moment it was captured
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub value: ZclValue,
    pub timestamp: Instant,
}

impl AttributeValue {
    /// Capture `value` now
    #[must_use]
    pub fn new(value: ZclValue) -> Self {
        Self::with_timestamp(value, Instant::now())
    }

    #[must_use]
    pub fn with_timestamp(value: ZclValue, timestamp: Instant) -> Self {
        Self { value, timestamp }
    }

    /// Check if the value is no older than `max_age` at `now`
    #[must_use]
    pub fn is_fresh_at(&self, max_age: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) <= max_age
    }
}

/// Reporting configuration for one attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParameters {
    /// Minimum reporting interval in seconds
    pub min_reporting_interval: u16,
    /// Maximum reporting interval in seconds
    pub max_reporting_interval: u16,
    /// Change that triggers a report (analog types only)
    #[serde(default)]
    pub reportable_change: f64,
}

impl SubscriptionParameters {
    #[must_use]
    pub fn new(min_reporting_interval: u16, max_reporting_interval: u16, reportable_change: f64) -> Self {
        Self {
            min_reporting_interval,
            max_reporting_interval,
            reportable_change,
        }
    }
}

/// Caller preferences attached to an outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Wait for the device to confirm; when false the frame is posted
    pub confirmation_required: bool,
    /// Accept cached attribute values up to this age
    pub max_age: Option<Duration>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            confirmation_required: true,
            max_age: None,
        }
    }
}

impl RequestContext {
    /// Fire-and-forget context
    #[must_use]
    pub fn unconfirmed() -> Self {
        Self {
            confirmation_required: false,
            max_age: None,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}
