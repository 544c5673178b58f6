//! Channel-backed ZigBee device transport
//!
//! Outgoing frames are handed to whatever drives the radio through an
//! `mpsc` channel; frames coming back from the radio are fed in with
//! `deliver()`. Replies are matched to pending `invoke` calls by cluster id
//! and transaction sequence number, everything else goes to the listener
//! registered for the receiving side.

use crate::commands::{Direction, Side};
use crate::device::{ZclFrameListener, ZigbeeDevice};
use crate::frame::ZclFrame;
use crate::types::ZclError;

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frame queued for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub profile_id: Option<u16>,
    pub cluster_id: u16,
    pub data: Vec<u8>,
}

/// Pending request waiting for response
struct PendingRequest {
    /// Direction the request travelled in; the reply travels the other way
    sent_direction: Direction,
    response_tx: oneshot::Sender<ZclFrame>,
}

/// Device transport backed by in-process channels
pub struct ChannelTransport {
    /// Channel to the radio driver
    outbound_tx: mpsc::Sender<OutgoingFrame>,
    /// Pending invokes keyed by (cluster id, sequence)
    pending: Arc<Mutex<HashMap<(u16, u8), PendingRequest>>>,
    /// Listener of record per (cluster id, side)
    listeners: DashMap<(u16, Side), Arc<dyn ZclFrameListener>>,
    /// How long `invoke` waits for a reply
    timeout: Duration,
}

impl ChannelTransport {
    /// Create a transport and the receiving end of its outbound queue
    #[must_use]
    pub fn new(timeout: Duration) -> (Self, mpsc::Receiver<OutgoingFrame>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        let transport = Self {
            outbound_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            listeners: DashMap::new(),
            timeout,
        };
        (transport, outbound_rx)
    }

    /// Feed a frame received from the radio
    ///
    /// Returns whether the frame was consumed, either as a reply or by a listener.
    #[allow(clippy::missing_errors_doc)]
    pub async fn deliver(&self, cluster_id: u16, data: &[u8]) -> Result<bool, ZclError> {
        let frame = ZclFrame::parse(data)?;
        tracing::debug!(
            "Received frame: cluster={:#06x} seq={} cmd={:#04x} payload_len={}",
            cluster_id,
            frame.sequence(),
            frame.command_id(),
            frame.payload_size()
        );

        // Check if this is a response to a pending request
        let key = (cluster_id, frame.sequence());
        let mut pending_guard = self.pending.lock().await;
        let is_reply = pending_guard
            .get(&key)
            .is_some_and(|req| frame.direction() == req.sent_direction.reversed());
        if is_reply {
            if let Some(req) = pending_guard.remove(&key) {
                drop(pending_guard);
                let _ = req.response_tx.send(frame);
                return Ok(true);
            }
        }
        drop(pending_guard);

        let side = Side::receiving(frame.direction());
        let listener = self
            .listener(cluster_id, side)
            .or_else(|| self.listener(cluster_id, other_side(side)));

        match listener {
            Some(listener) => listener.notify_zcl_frame(cluster_id, frame).await,
            None => {
                tracing::debug!("No listener for cluster {:#06x}, dropping frame", cluster_id);
                Ok(false)
            }
        }
    }

    fn listener(&self, cluster_id: u16, side: Side) -> Option<Arc<dyn ZclFrameListener>> {
        self.listeners
            .get(&(cluster_id, side))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of invokes still waiting for a reply
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn other_side(side: Side) -> Side {
    match side {
        Side::Client => Side::Server,
        Side::Server => Side::Client,
    }
}

#[async_trait]
impl ZigbeeDevice for ChannelTransport {
    async fn invoke(
        &self,
        profile_id: Option<u16>,
        cluster_id: u16,
        frame: ZclFrame,
    ) -> Result<Option<ZclFrame>, ZclError> {
        let key = (cluster_id, frame.sequence());
        let sent_direction = frame.direction();
        let data = frame.serialize();

        // Set up response channel
        let (response_tx, response_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                key,
                PendingRequest {
                    sent_direction,
                    response_tx,
                },
            );
        }

        tracing::debug!("Sending raw data: {:02X?}", &data);

        if self
            .outbound_tx
            .send(OutgoingFrame {
                profile_id,
                cluster_id,
                data,
            })
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&key);
            return Err(ZclError::Transport("transport not connected".to_string()));
        }

        // Wait for response with timeout
        match tokio::time::timeout(self.timeout, response_rx).await {
            Ok(Ok(response)) => Ok(Some(response)),
            Ok(Err(_)) => Ok(None),
            Err(_) => {
                // Remove pending request on timeout
                self.pending.lock().await.remove(&key);
                tracing::debug!(
                    "No reply for cluster {:#06x} seq {} within {:?}",
                    cluster_id,
                    key.1,
                    self.timeout
                );
                Ok(None)
            }
        }
    }

    async fn post(&self, profile_id: Option<u16>, cluster_id: u16, frame: ZclFrame) -> bool {
        let outgoing = OutgoingFrame {
            profile_id,
            cluster_id,
            data: frame.serialize(),
        };
        match self.outbound_tx.send(outgoing).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Post to cluster {:#06x} rejected: transport closed", cluster_id);
                false
            }
        }
    }

    fn set_listener(&self, cluster_id: u16, side: Side, listener: Arc<dyn ZclFrameListener>) {
        if self.listeners.insert((cluster_id, side), listener).is_some() {
            tracing::warn!(
                "Replaced listener for cluster {:#06x} ({:?} side)",
                cluster_id,
                side
            );
        }
    }

    fn remove_listener(&self, cluster_id: u16, side: Side) {
        self.listeners.remove(&(cluster_id, side));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingListener {
        frames: StdMutex<Vec<(u16, u8)>>,
    }

    #[async_trait]
    impl ZclFrameListener for RecordingListener {
        async fn notify_zcl_frame(
            &self,
            cluster_id: u16,
            frame: ZclFrame,
        ) -> Result<bool, ZclError> {
            self.frames
                .lock()
                .unwrap()
                .push((cluster_id, frame.command_id()));
            Ok(true)
        }
    }

    fn request(sequence: u8) -> ZclFrame {
        let mut frame = ZclFrame::new(2);
        frame.set_sequence(sequence);
        frame.append_u16(0x0020).unwrap();
        frame
    }

    #[tokio::test]
    async fn test_invoke_correlates_reply() {
        let (transport, mut rx) = ChannelTransport::new(DEFAULT_TIMEOUT);
        let transport = Arc::new(transport);

        let radio = Arc::clone(&transport);
        tokio::spawn(async move {
            let sent = rx.recv().await.unwrap();
            assert_eq!(sent.cluster_id, 0x0006);
            assert_eq!(sent.profile_id, Some(0x0104));
            // echo the sequence number back in a ReadAttributesResponse
            let reply = [0x18, sent.data[1], 0x01, 0x20, 0x00, 0x86];
            assert!(radio.deliver(0x0006, &reply).await.unwrap());
        });

        let reply = transport
            .invoke(Some(0x0104), 0x0006, request(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.sequence(), 30);
        assert_eq!(reply.command_id(), 0x01);
        assert_eq!(transport.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_times_out() {
        let (transport, _rx) = ChannelTransport::new(Duration::from_millis(50));
        let reply = transport.invoke(None, 0x0006, request(1)).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(transport.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let (transport, rx) = ChannelTransport::new(DEFAULT_TIMEOUT);
        drop(rx);
        assert!(matches!(
            transport.invoke(None, 0x0006, request(1)).await,
            Err(ZclError::Transport(_))
        ));
        assert!(!transport.post(None, 0x0006, request(2)).await);
    }

    #[tokio::test]
    async fn test_unsolicited_frame_routed_by_side() {
        let (transport, _rx) = ChannelTransport::new(DEFAULT_TIMEOUT);
        let client = Arc::new(RecordingListener::default());
        let server = Arc::new(RecordingListener::default());
        transport.set_listener(0x0402, Side::Client, client.clone());
        transport.set_listener(0x0402, Side::Server, server.clone());

        // server-to-client report goes to the client side
        assert!(transport
            .deliver(0x0402, &[0x18, 0x05, 0x0A, 0x00, 0x00, 0x29, 0x10, 0x00])
            .await
            .unwrap());
        // client-to-server read goes to the server side
        assert!(transport
            .deliver(0x0402, &[0x00, 0x06, 0x00, 0x00, 0x00])
            .await
            .unwrap());

        assert_eq!(*client.frames.lock().unwrap(), vec![(0x0402, 0x0A)]);
        assert_eq!(*server.frames.lock().unwrap(), vec![(0x0402, 0x00)]);

        transport.remove_listener(0x0402, Side::Client);
        transport.remove_listener(0x0402, Side::Server);
        assert!(!transport
            .deliver(0x0402, &[0x18, 0x07, 0x0A])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_same_direction_frame_is_not_a_reply() {
        let (transport, mut rx) = ChannelTransport::new(DEFAULT_TIMEOUT);
        let transport = Arc::new(transport);
        let server = Arc::new(RecordingListener::default());
        transport.set_listener(0x0006, Side::Server, server.clone());

        let radio = Arc::clone(&transport);
        let peer_listener = Arc::clone(&server);
        tokio::spawn(async move {
            let sent = rx.recv().await.unwrap();
            // peer's own ReadAttributes reusing our sequence number
            let request = [0x00, sent.data[1], 0x00, 0x00, 0x00];
            assert!(radio.deliver(0x0006, &request).await.unwrap());
            assert_eq!(*peer_listener.frames.lock().unwrap(), vec![(0x0006, 0x00)]);
            let reply = [0x18, sent.data[1], 0x01, 0x20, 0x00, 0x86];
            assert!(radio.deliver(0x0006, &reply).await.unwrap());
        });

        let reply = transport
            .invoke(None, 0x0006, request(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.direction(), Direction::ServerToClient);
        assert_eq!(reply.command_id(), 0x01);
        assert_eq!(*server.frames.lock().unwrap(), vec![(0x0006, 0x00)]);
        assert_eq!(transport.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_deliver_rejects_garbage() {
        let (transport, _rx) = ChannelTransport::new(DEFAULT_TIMEOUT);
        assert!(matches!(
            transport.deliver(0x0006, &[0x00]).await,
            Err(ZclError::MalformedMessage(_))
        ));
    }
}
