//! Per-connection STOMP session state.
//!
//! The session turns inbound frames into outbound frames and decides which
//! hub envelopes reach this connection. It does no I/O, so the WebSocket
//! handler owns the socket and timers.

use std::collections::HashMap;
use std::time::Duration;

use onandhome_core::UserRole;

use super::hub::{ADMIN_TOPIC, Envelope, Target};
use super::stomp::{Command, Frame, HeartBeat};
use crate::services::auth::{Claims, TokenKind, TokenService};

/// Heart-beat intervals this server offers, in milliseconds.
pub const SERVER_HEARTBEAT: HeartBeat = HeartBeat::new(10_000, 10_000);

/// The authenticated party behind a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub login_id: String,
    pub role: UserRole,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            login_id: claims.user_id,
            role: claims.role,
        }
    }
}

/// What the handler should do after a frame was processed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Frames to write, in order.
    pub replies: Vec<Frame>,
    /// Negotiated heart-beats, set once on CONNECT.
    pub heartbeat: Option<(Option<Duration>, Option<Duration>)>,
    /// Close the connection after writing the replies.
    pub close: bool,
}

impl Outcome {
    fn reply(frame: Frame) -> Self {
        Self {
            replies: vec![frame],
            ..Self::default()
        }
    }

    fn fatal(frame: Frame) -> Self {
        Self {
            replies: vec![frame],
            close: true,
            ..Self::default()
        }
    }
}

/// STOMP session for one WebSocket connection.
#[derive(Debug)]
pub struct Session {
    principal: Option<Principal>,
    connected: bool,
    /// Subscription id to destination.
    subscriptions: HashMap<String, String>,
    next_message_id: u64,
}

impl Session {
    /// Start a session, optionally pre-authenticated from the handshake.
    #[must_use]
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal,
            connected: false,
            subscriptions: HashMap::new(),
            next_message_id: 0,
        }
    }

    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Process one inbound frame.
    pub fn handle(&mut self, frame: &Frame, tokens: &TokenService) -> Outcome {
        match frame.command {
            Command::Connect | Command::Stomp => self.connect(frame, tokens),
            _ if !self.connected => Outcome::fatal(Frame::error(
                "Not connected",
                "CONNECT must be the first frame",
            )),
            Command::Subscribe => self.subscribe(frame),
            Command::Unsubscribe => {
                if let Some(id) = frame.get("id") {
                    self.subscriptions.remove(id);
                }
                receipt(frame)
            }
            Command::Disconnect => Outcome {
                replies: frame.receipt_for().into_iter().collect(),
                close: true,
                ..Outcome::default()
            },
            // Clients never publish to this server; acknowledge and drop.
            Command::Send
            | Command::Ack
            | Command::Nack
            | Command::Begin
            | Command::Commit
            | Command::Abort => receipt(frame),
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                Outcome::fatal(Frame::error(
                    "Unexpected frame",
                    &format!("{} is a server frame", frame.command),
                ))
            }
        }
    }

    fn connect(&mut self, frame: &Frame, tokens: &TokenService) -> Outcome {
        if self.connected {
            return Outcome::fatal(Frame::error("Already connected", ""));
        }

        if let Some(versions) = frame.get("accept-version") {
            if !versions.split(',').any(|v| v.trim() == "1.2") {
                return Outcome::fatal(
                    Frame::error("Unsupported protocol version", "Supported versions are 1.2")
                        .header("version", "1.2"),
                );
            }
        }

        let bearer = frame
            .get("Authorization")
            .or_else(|| frame.get("authorization"))
            .and_then(|value| value.strip_prefix("Bearer "))
            .or_else(|| frame.get("token"));
        if let Some(token) = bearer {
            match tokens.verify(token, TokenKind::Access) {
                Ok(claims) => self.principal = Some(claims.into()),
                Err(e) => return Outcome::fatal(Frame::error("Unauthorized", &e.to_string())),
            }
        }
        if self.principal.is_none() {
            return Outcome::fatal(Frame::error(
                "Unauthorized",
                "Authentication required",
            ));
        }

        let client = match HeartBeat::parse(frame.get("heart-beat")) {
            Ok(heartbeat) => heartbeat,
            Err(e) => return Outcome::fatal(Frame::error("Bad heart-beat", &e.to_string())),
        };

        self.connected = true;
        let mut connected = Frame::new(Command::Connected)
            .header("version", "1.2")
            .header("heart-beat", SERVER_HEARTBEAT.header_value())
            .header("server", concat!("onandhome/", env!("CARGO_PKG_VERSION")));
        if let Some(principal) = &self.principal {
            connected = connected.header("user-name", principal.login_id.clone());
        }

        Outcome {
            replies: vec![connected],
            heartbeat: Some(SERVER_HEARTBEAT.negotiate(client)),
            close: false,
        }
    }

    fn subscribe(&mut self, frame: &Frame) -> Outcome {
        let (Some(id), Some(destination)) = (frame.get("id"), frame.get("destination")) else {
            return Outcome::fatal(Frame::error(
                "Invalid SUBSCRIBE",
                "id and destination headers are required",
            ));
        };

        if !self.may_subscribe(destination) {
            tracing::warn!(destination, "Rejected STOMP subscription");
            return Outcome::fatal(Frame::error(
                "Forbidden",
                &format!("Cannot subscribe to {destination}"),
            ));
        }

        self.subscriptions
            .insert(id.to_string(), destination.to_string());
        receipt(frame)
    }

    fn may_subscribe(&self, destination: &str) -> bool {
        let Some(principal) = &self.principal else {
            return false;
        };
        if destination == ADMIN_TOPIC {
            return principal.role.is_admin();
        }
        destination == Target::User(principal.login_id.clone()).destination()
    }

    /// MESSAGE frames for an envelope, one per matching subscription.
    pub fn deliver(&mut self, envelope: &Envelope) -> Vec<Frame> {
        if !self.connected {
            return Vec::new();
        }
        let destination = envelope.target.destination();
        let mut matching: Vec<&String> = self
            .subscriptions
            .iter()
            .filter(|(_, subscribed)| **subscribed == destination)
            .map(|(id, _)| id)
            .collect();
        if matching.is_empty() {
            return Vec::new();
        }
        matching.sort();

        let Ok(body) = serde_json::to_string(&envelope.payload) else {
            return Vec::new();
        };

        let mut frames = Vec::with_capacity(matching.len());
        for id in matching {
            self.next_message_id += 1;
            frames.push(
                Frame::new(Command::Message)
                    .header("subscription", id.clone())
                    .header("message-id", self.next_message_id.to_string())
                    .header("destination", destination.clone())
                    .header("content-type", "application/json")
                    .body(body.clone()),
            );
        }
        frames
    }
}

fn receipt(frame: &Frame) -> Outcome {
    frame
        .receipt_for()
        .map_or_else(Outcome::default, Outcome::reply)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::realtime::hub::PushMessage;
    use onandhome_core::{NotificationType, UserId};

    fn tokens() -> TokenService {
        TokenService::new(&test_config().jwt)
    }

    fn token_for(login_id: &str, role: UserRole) -> String {
        let now = chrono::Utc::now().timestamp();
        tokens().sign(&Claims {
            id: UserId::new(1),
            user_id: login_id.to_string(),
            role,
            marketing_consent: false,
            typ: TokenKind::Access,
            iat: now,
            exp: now + 600,
        })
    }

    fn connect_frame(token: &str) -> Frame {
        Frame::new(Command::Connect)
            .header("accept-version", "1.1,1.2")
            .header("heart-beat", "4000,4000")
            .header("Authorization", format!("Bearer {token}"))
    }

    fn connected(login_id: &str, role: UserRole) -> Session {
        let mut session = Session::new(None);
        let outcome = session.handle(&connect_frame(&token_for(login_id, role)), &tokens());
        assert_eq!(outcome.replies[0].command, Command::Connected);
        session
    }

    fn subscribe(id: &str, destination: &str) -> Frame {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("receipt", format!("r-{id}"))
    }

    #[test]
    fn test_connect_negotiates_heartbeat() {
        let mut session = Session::new(None);
        let outcome = session.handle(
            &connect_frame(&token_for("shopper_01", UserRole::User)),
            &tokens(),
        );

        let reply = &outcome.replies[0];
        assert_eq!(reply.get("version"), Some("1.2"));
        assert_eq!(reply.get("heart-beat"), Some("10000,10000"));
        assert_eq!(reply.get("user-name"), Some("shopper_01"));
        assert_eq!(
            outcome.heartbeat,
            Some((Some(Duration::from_secs(10)), Some(Duration::from_secs(10))))
        );
        assert!(!outcome.close);
    }

    #[test]
    fn test_connect_without_credentials_is_rejected() {
        let mut session = Session::new(None);
        let outcome = session.handle(&Frame::new(Command::Connect), &tokens());
        assert_eq!(outcome.replies[0].command, Command::Error);
        assert!(outcome.close);
    }

    #[test]
    fn test_handshake_principal_is_enough() {
        let mut session = Session::new(Some(Principal {
            login_id: "shopper_01".into(),
            role: UserRole::User,
        }));
        let outcome = session.handle(&Frame::new(Command::Stomp), &tokens());
        assert_eq!(outcome.replies[0].command, Command::Connected);
        assert_eq!(outcome.heartbeat, Some((None, None)));
    }

    #[test]
    fn test_frames_before_connect_are_rejected() {
        let mut session = Session::new(None);
        let outcome = session.handle(&subscribe("0", ADMIN_TOPIC), &tokens());
        assert!(outcome.close);
    }

    #[test]
    fn test_user_may_only_subscribe_to_own_queue() {
        let mut session = connected("shopper_01", UserRole::User);

        let own = session.handle(
            &subscribe("0", "/user/shopper_01/queue/notifications"),
            &tokens(),
        );
        assert_eq!(own.replies[0].command, Command::Receipt);
        assert_eq!(own.replies[0].get("receipt-id"), Some("r-0"));

        let other = session.handle(
            &subscribe("1", "/user/someone/queue/notifications"),
            &tokens(),
        );
        assert_eq!(other.replies[0].command, Command::Error);

        let mut session = connected("shopper_01", UserRole::User);
        let admin = session.handle(&subscribe("2", ADMIN_TOPIC), &tokens());
        assert_eq!(admin.replies[0].command, Command::Error);
    }

    #[test]
    fn test_admin_receives_admin_topic() {
        let mut session = connected("admin", UserRole::Admin);
        session.handle(&subscribe("sub-1", ADMIN_TOPIC), &tokens());

        let envelope = Envelope {
            target: Target::Admins,
            payload: PushMessage::new(NotificationType::AdminOrder, "새 주문 등록", "TV"),
        };
        let frames = session.deliver(&envelope);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("subscription"), Some("sub-1"));
        assert_eq!(frames[0].get("destination"), Some(ADMIN_TOPIC));
        assert!(frames[0].body.contains("\"ADMIN_ORDER\""));
    }

    #[test]
    fn test_other_users_envelopes_are_filtered() {
        let mut session = connected("shopper_01", UserRole::User);
        session.handle(
            &subscribe("0", "/user/shopper_01/queue/notifications"),
            &tokens(),
        );

        let theirs = Envelope {
            target: Target::User("someone".into()),
            payload: PushMessage::new(NotificationType::Order, "주문 완료", "TV"),
        };
        assert!(session.deliver(&theirs).is_empty());

        let mine = Envelope {
            target: Target::User("shopper_01".into()),
            ..theirs
        };
        assert_eq!(session.deliver(&mine).len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut session = connected("admin", UserRole::Admin);
        session.handle(&subscribe("0", ADMIN_TOPIC), &tokens());
        session.handle(&Frame::new(Command::Unsubscribe).header("id", "0"), &tokens());

        assert_eq!(session.subscription_count(), 0);
    }

    #[test]
    fn test_send_is_ignored_with_receipt() {
        let mut session = connected("shopper_01", UserRole::User);
        let outcome = session.handle(
            &Frame::new(Command::Send)
                .header("destination", "/app/hello")
                .header("receipt", "77")
                .body("hi"),
            &tokens(),
        );
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(outcome.replies[0].get("receipt-id"), Some("77"));
        assert!(!outcome.close);
    }

    #[test]
    fn test_disconnect_answers_receipt_and_closes() {
        let mut session = connected("shopper_01", UserRole::User);
        let outcome = session.handle(
            &Frame::new(Command::Disconnect).header("receipt", "bye"),
            &tokens(),
        );
        assert_eq!(outcome.replies[0].command, Command::Receipt);
        assert!(outcome.close);
    }
}
