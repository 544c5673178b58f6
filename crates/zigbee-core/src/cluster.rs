//! Service cluster: one cluster id, one side, bound to a device

use crate::attribute::{AttributeValue, RequestContext, SubscriptionParameters};
use crate::cache::AttributeCache;
use crate::config::ClusterConfig;
use crate::direction::DirectionValidator;
use crate::hooks::ClusterHooks;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, RwLock};
use zcl_protocol::{FrameType, Side, ZclError, ZclFrame, ZclFrameListener, ZigbeeDevice};

/// First transaction sequence number handed out
pub const INITIAL_SEQUENCE: u8 = 30;

/// Notifications towards the application layer
#[derive(Debug, Clone)]
pub enum ClusterEvent {
    /// A reported attribute value was accepted
    AttributeChanged {
        cluster_id: u16,
        attr_id: u16,
        name: &'static str,
        value: AttributeValue,
    },
    /// A cluster-specific frame arrived while the endpoint was marked
    /// unavailable; the device has likely come back
    Announcement { cluster_id: u16 },
}

/// Protocol engine for one cluster on one side of a device link
pub struct ServiceCluster {
    cluster_id: u16,
    profile_id: Option<u16>,
    side: Side,
    check_direction: AtomicBool,
    sequence: AtomicU8,
    pub(crate) cache: AttributeCache,
    pub(crate) hooks: Arc<dyn ClusterHooks>,
    device: RwLock<Option<Arc<dyn ZigbeeDevice>>>,
    endpoint_available: AtomicBool,
    subscriptions: DashMap<String, Option<SubscriptionParameters>>,
    event_tx: broadcast::Sender<ClusterEvent>,
}

impl ServiceCluster {
    #[must_use]
    pub fn new(config: &ClusterConfig, hooks: Arc<dyn ClusterHooks>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            cluster_id: config.cluster_id,
            profile_id: config.profile_id,
            side: config.side,
            check_direction: AtomicBool::new(config.check_direction),
            sequence: AtomicU8::new(INITIAL_SEQUENCE),
            cache: AttributeCache::new(),
            hooks,
            device: RwLock::new(None),
            endpoint_available: AtomicBool::new(true),
            subscriptions: DashMap::new(),
            event_tx,
        }
    }

    #[must_use]
    pub fn cluster_id(&self) -> u16 {
        self.cluster_id
    }

    #[must_use]
    pub fn profile_id(&self) -> Option<u16> {
        self.profile_id
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn hooks(&self) -> &Arc<dyn ClusterHooks> {
        &self.hooks
    }

    #[must_use]
    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    #[must_use]
    pub fn check_direction(&self) -> bool {
        self.check_direction.load(Ordering::Relaxed)
    }

    pub fn set_check_direction(&self, enabled: bool) {
        self.check_direction.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn direction_validator(&self) -> DirectionValidator {
        DirectionValidator::new(self.check_direction(), self.side)
    }

    #[must_use]
    pub fn is_endpoint_available(&self) -> bool {
        self.endpoint_available.load(Ordering::Relaxed)
    }

    pub fn set_endpoint_available(&self, available: bool) {
        self.endpoint_available.store(available, Ordering::Relaxed);
    }

    /// Take the next transaction sequence number (wraps after 255)
    pub fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Empty general frame travelling away from this side
    #[must_use]
    pub fn create_outgoing_frame(&self, command_id: u8, capacity: usize) -> ZclFrame {
        let mut frame = ZclFrame::new(capacity);
        frame.set_frame_type(FrameType::General);
        frame.set_direction(self.side.outgoing_direction());
        frame.set_command_id(command_id);
        frame
    }

    /// Bind to `device` and start receiving its frames for this cluster
    ///
    /// The device only holds a weak handle to the cluster, so dropping the
    /// last `Arc` stops frame delivery even without `detach`.
    pub async fn attach(self: &Arc<Self>, device: Arc<dyn ZigbeeDevice>) {
        let mut guard = self.device.write().await;
        if let Some(previous) = guard.take() {
            previous.remove_listener(self.cluster_id, self.side);
        }
        let listener: Arc<dyn ZclFrameListener> = Arc::new(WeakListener(Arc::downgrade(self)));
        device.set_listener(self.cluster_id, self.side, listener);
        *guard = Some(device);
        tracing::info!(
            "Service cluster {:#06x} ({:?}) attached",
            self.cluster_id,
            self.side
        );
    }

    /// Unbind from the current device, if any
    pub async fn detach(&self) {
        if let Some(device) = self.device.write().await.take() {
            device.remove_listener(self.cluster_id, self.side);
            tracing::info!(
                "Service cluster {:#06x} ({:?}) detached",
                self.cluster_id,
                self.side
            );
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.device.read().await.is_some()
    }

    pub(crate) async fn device(&self) -> Result<Arc<dyn ZigbeeDevice>, ZclError> {
        self.device.read().await.clone().ok_or(ZclError::NotAttached)
    }

    /// Stamp a fresh sequence number, send and wait for the reply
    pub(crate) async fn invoke_frame(&self, mut frame: ZclFrame) -> Result<ZclFrame, ZclError> {
        let device = self.device().await?;
        frame.shrink();
        frame.set_sequence(self.next_sequence());
        tracing::debug!(
            "Invoking command {:#04x} on cluster {:#06x}, seq={}",
            frame.command_id(),
            self.cluster_id,
            frame.sequence()
        );

        let response = device
            .invoke(self.profile_id, self.cluster_id, frame)
            .await?
            .ok_or(ZclError::Timeout)?;

        self.direction_validator().check_response(&response)?;
        Ok(response)
    }

    /// Stamp a fresh sequence number and send without waiting
    pub(crate) async fn post_frame(&self, mut frame: ZclFrame) -> Result<(), ZclError> {
        let device = self.device().await?;
        frame.shrink();
        frame.set_sequence(self.next_sequence());
        let command_id = frame.command_id();
        if device.post(self.profile_id, self.cluster_id, frame).await {
            Ok(())
        } else {
            Err(ZclError::Transport(format!(
                "device rejected command {command_id:#04x} for cluster {:#06x}",
                self.cluster_id
            )))
        }
    }

    /// Post a response frame as is; failures are only logged
    pub(crate) async fn send_response(&self, cluster_id: u16, frame: ZclFrame) {
        let device = match self.device().await {
            Ok(device) => device,
            Err(_) => {
                tracing::warn!(
                    "Dropping response {:#04x} for cluster {:#06x}: not attached",
                    frame.command_id(),
                    cluster_id
                );
                return;
            }
        };
        let command_id = frame.command_id();
        if !device.post(self.profile_id, cluster_id, frame).await {
            tracing::warn!(
                "Failed to post response {:#04x} for cluster {:#06x}",
                command_id,
                cluster_id
            );
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClusterEvent> {
        self.event_tx.subscribe()
    }

    /// Returns false when nobody is listening
    pub(crate) fn emit(&self, event: ClusterEvent) -> bool {
        self.event_tx.send(event).is_ok()
    }

    /// Cached value honoring the context's max age; `None` without a max age
    #[must_use]
    pub fn check_cache(&self, attr_id: u16, ctx: &RequestContext) -> Option<AttributeValue> {
        let max_age = ctx.max_age?;
        self.cache.get_valid(attr_id, max_age)
    }

    pub(crate) fn record_subscription(&self, name: &str, params: Option<SubscriptionParameters>) {
        self.subscriptions.insert(name.to_string(), params);
    }

    /// Parameters last requested for `name`; `Some(None)` means reporting was disabled
    #[must_use]
    pub fn subscription(&self, name: &str) -> Option<Option<SubscriptionParameters>> {
        self.subscriptions.get(name).map(|entry| *entry.value())
    }
}

#[async_trait]
impl ZclFrameListener for ServiceCluster {
    async fn notify_zcl_frame(&self, cluster_id: u16, frame: ZclFrame) -> Result<bool, ZclError> {
        self.on_incoming_frame(cluster_id, frame).await
    }
}

/// Listener registered with the device on behalf of a cluster
struct WeakListener(Weak<ServiceCluster>);

#[async_trait]
impl ZclFrameListener for WeakListener {
    async fn notify_zcl_frame(&self, cluster_id: u16, frame: ZclFrame) -> Result<bool, ZclError> {
        match self.0.upgrade() {
            Some(cluster) => cluster.on_incoming_frame(cluster_id, frame).await,
            None => {
                tracing::debug!("Cluster {:#06x} dropped, ignoring frame", cluster_id);
                Ok(false)
            }
        }
    }
}
