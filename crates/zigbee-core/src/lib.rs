//! ZCL service cluster engine
//!
//! This crate drives the general command set of one ZigBee cluster on
//! top of the wire types in `zcl-protocol`: attribute reads and writes,
//! reporting configuration, incoming report handling and the replies a
//! cluster owes its peer.

pub mod attribute;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod correlator;
pub mod direction;
pub mod dispatcher;
pub mod hooks;
pub mod request;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use attribute::{AttributeDescriptor, AttributeValue, RequestContext, SubscriptionParameters};
pub use cache::AttributeCache;
pub use cluster::{ClusterEvent, ServiceCluster, INITIAL_SEQUENCE};
pub use config::{load_config, load_configs, save_configs, ClusterConfig, ConfigError};
pub use dispatcher::default_response;
pub use hooks::{append_attribute_value, ClusterHooks, HookError, UnsupportedHooks};
pub use request::{ReadAttributeRecord, ReadOutcome};
pub use status::{check_status, error_for_status};
