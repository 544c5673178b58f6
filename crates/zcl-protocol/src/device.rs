//! Interfaces between the ZCL engine and the device transport

use crate::commands::Side;
use crate::frame::ZclFrame;
use crate::types::ZclError;
use async_trait::async_trait;
use std::sync::Arc;

/// A remote ZigBee device reachable over an established link
///
/// The transport owns timeouts: `invoke` resolves with `Ok(None)` when no
/// correlated reply arrived in time, and with `Err(ZclError::Transport)`
/// when the frame could not be handed to the radio at all.
#[async_trait]
pub trait ZigbeeDevice: Send + Sync {
    /// Send a frame and wait for the correlated reply
    async fn invoke(
        &self,
        profile_id: Option<u16>,
        cluster_id: u16,
        frame: ZclFrame,
    ) -> Result<Option<ZclFrame>, ZclError>;

    /// Send a frame without waiting; returns whether the transport accepted it
    async fn post(&self, profile_id: Option<u16>, cluster_id: u16, frame: ZclFrame) -> bool;

    /// Make `listener` the receiver of incoming frames for (cluster, side)
    fn set_listener(&self, cluster_id: u16, side: Side, listener: Arc<dyn ZclFrameListener>);

    /// Drop the receiver registered for (cluster, side)
    fn remove_listener(&self, cluster_id: u16, side: Side);
}

/// Receiver of frames the device did not correlate to a pending request
#[async_trait]
pub trait ZclFrameListener: Send + Sync {
    /// Returns `Ok(false)` when the frame was left for someone else to handle
    async fn notify_zcl_frame(&self, cluster_id: u16, frame: ZclFrame) -> Result<bool, ZclError>;
}
