//! In-process notification fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use onandhome_core::{NotificationType, OrderId, ProductId};

/// Destination prefix for per-user queues.
pub const USER_DESTINATION_PREFIX: &str = "/user/";
/// Suffix of a per-user queue destination.
pub const USER_QUEUE_SUFFIX: &str = "/queue/notifications";
/// Admin broadcast topic.
pub const ADMIN_TOPIC: &str = "/topic/admin-notifications";

/// Number of envelopes a slow subscriber may fall behind before it skips.
const CHANNEL_CAPACITY: usize = 256;

/// Who an envelope is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One user, by login id.
    User(String),
    /// Every connected admin.
    Admins,
}

impl Target {
    /// The STOMP destination subscribers use for this target.
    #[must_use]
    pub fn destination(&self) -> String {
        match self {
            Self::User(login_id) => {
                format!("{USER_DESTINATION_PREFIX}{login_id}{USER_QUEUE_SUFFIX}")
            }
            Self::Admins => ADMIN_TOPIC.to_string(),
        }
    }
}

/// JSON body of a pushed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub timestamp: DateTime<Utc>,
}

impl PushMessage {
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            order_id: None,
            reference_id: None,
            product_id: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub const fn order(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    #[must_use]
    pub const fn reference(mut self, id: i32) -> Self {
        self.reference_id = Some(id);
        self
    }

    #[must_use]
    pub const fn product(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }
}

/// An addressed push.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub target: Target,
    pub payload: PushMessage,
}

/// Broadcast hub shared by every WebSocket session.
///
/// Each session subscribes and filters envelopes against its own
/// subscriptions. Senders never wait on receivers.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Arc<Envelope>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// A new receiver that sees every envelope sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Envelope>> {
        self.sender.subscribe()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Push to one user's queue. Returns how many sessions received it.
    pub fn send_to_user(&self, login_id: &str, payload: PushMessage) -> usize {
        self.publish(Envelope {
            target: Target::User(login_id.to_string()),
            payload,
        })
    }

    /// Push to the admin topic. Returns how many sessions received it.
    pub fn send_to_admins(&self, payload: PushMessage) -> usize {
        self.publish(Envelope {
            target: Target::Admins,
            payload,
        })
    }

    fn publish(&self, envelope: Envelope) -> usize {
        let destination = envelope.target.destination();
        match self.sender.send(Arc::new(envelope)) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(%destination, "No WebSocket sessions connected, push dropped");
                0
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message() -> PushMessage {
        PushMessage::new(NotificationType::Order, "주문 완료", "TV")
    }

    #[test]
    fn test_destinations() {
        assert_eq!(
            Target::User("shopper_01".into()).destination(),
            "/user/shopper_01/queue/notifications"
        );
        assert_eq!(Target::Admins.destination(), "/topic/admin-notifications");
    }

    #[test]
    fn test_send_without_sessions_is_not_an_error() {
        let hub = NotificationHub::new();
        assert_eq!(hub.send_to_user("nobody", message()), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_the_envelope() {
        let hub = NotificationHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.send_to_admins(message()), 2);

        assert_eq!(first.recv().await.unwrap().target, Target::Admins);
        assert_eq!(second.recv().await.unwrap().target, Target::Admins);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_instead_of_blocking() {
        let hub = NotificationHub::new();
        let mut slow = hub.subscribe();

        for _ in 0..CHANNEL_CAPACITY + 10 {
            hub.send_to_user("shopper_01", message());
        }

        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(10))
        ));
        assert!(slow.recv().await.is_ok());
    }

    #[test]
    fn test_payload_json_shape() {
        let json = serde_json::to_value(message().order(OrderId::new(9))).unwrap();
        assert_eq!(json["type"], "ORDER");
        assert_eq!(json["orderId"], 9);
        assert!(json.get("productId").is_none());
        assert!(json.get("timestamp").is_some());
    }
}
