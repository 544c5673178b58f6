//! ZigBee Cluster Library wire protocol
//!
//! This crate implements ZCL framing, the general command set identifiers,
//! status codes and data types, plus the device interfaces the cluster
//! engine in `zigbee-core` talks through.

pub mod commands;
pub mod data_type;
pub mod device;
pub mod frame;
pub mod transport;
pub mod types;

pub use commands::{Direction, FrameType, GeneralCommand, Side};
pub use data_type::ZclDataType;
pub use device::{ZclFrameListener, ZigbeeDevice};
pub use frame::ZclFrame;
pub use transport::{ChannelTransport, OutgoingFrame};
pub use types::*;
