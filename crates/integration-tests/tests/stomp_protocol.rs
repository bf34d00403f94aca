//! STOMP sessions driven with real tokens and hub envelopes.
//!
//! The session is pure, so a full CONNECT, SUBSCRIBE, MESSAGE exchange runs
//! without a socket.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;

use onandhome_core::{NotificationType, OrderId, UserId, UserRole};
use onandhome_server::config::JwtConfig;
use onandhome_server::realtime::hub::ADMIN_TOPIC;
use onandhome_server::realtime::session::Session;
use onandhome_server::realtime::stomp::{Command, Frame, parse_frames};
use onandhome_server::realtime::{NotificationHub, PushMessage, Target};
use onandhome_server::services::auth::{Claims, TokenKind, TokenService};

fn token_service() -> TokenService {
    TokenService::new(&JwtConfig {
        secret: SecretString::from("integration-test-secret-at-least-32-bytes!!"),
        access_ttl: Duration::from_secs(600),
        refresh_ttl: Duration::from_secs(3_600),
    })
}

fn token_for(tokens: &TokenService, login_id: &str, role: UserRole) -> String {
    let now = Utc::now().timestamp();
    tokens.sign(&Claims {
        id: UserId::new(7),
        user_id: login_id.to_string(),
        role,
        marketing_consent: true,
        typ: TokenKind::Access,
        iat: now,
        exp: now + 600,
    })
}

fn connect(token: &str, heart_beat: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", "1.1,1.2")
        .header("host", "localhost")
        .header("heart-beat", heart_beat)
        .header("Authorization", format!("Bearer {token}"))
}

fn subscribe(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
        .header("receipt", format!("r-{id}"))
}

#[test]
fn test_user_receives_own_notification_only() {
    let tokens = token_service();
    let hub = NotificationHub::new();
    let mut rx = hub.subscribe();
    let mut session = Session::new(None);

    let outcome = session.handle(&connect(&token_for(&tokens, "shopper_01", UserRole::User), "0,0"), &tokens);
    assert_eq!(outcome.replies[0].command, Command::Connected);
    assert_eq!(outcome.replies[0].get("user-name"), Some("shopper_01"));
    assert!(!outcome.close);

    let own = Target::User("shopper_01".to_string()).destination();
    let outcome = session.handle(&subscribe("sub-0", &own), &tokens);
    assert_eq!(outcome.replies[0].command, Command::Receipt);
    assert_eq!(outcome.replies[0].get("receipt-id"), Some("r-sub-0"));

    hub.send_to_user(
        "shopper_01",
        PushMessage::new(NotificationType::Order, "주문 완료", "TV 주문이 완료되었습니다.")
            .order(OrderId::new(42)),
    );
    hub.send_to_user(
        "someone_else",
        PushMessage::new(NotificationType::Order, "주문 완료", "다른 회원"),
    );

    let first = rx.try_recv().unwrap();
    let frames = session.deliver(&first);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].get("destination"), Some(own.as_str()));
    let body: serde_json::Value = serde_json::from_str(&frames[0].body).unwrap();
    assert_eq!(body["type"], "ORDER");
    assert_eq!(body["orderId"], 42);

    let second = rx.try_recv().unwrap();
    assert!(session.deliver(&second).is_empty());
}

#[test]
fn test_admin_topic_is_forbidden_to_shoppers() {
    let tokens = token_service();
    let mut session = Session::new(None);
    session.handle(&connect(&token_for(&tokens, "shopper_01", UserRole::User), "0,0"), &tokens);

    let outcome = session.handle(&subscribe("admin", ADMIN_TOPIC), &tokens);
    assert!(outcome.close);
    assert_eq!(outcome.replies[0].command, Command::Error);
}

#[test]
fn test_admin_receives_admin_broadcast() {
    let tokens = token_service();
    let hub = NotificationHub::new();
    let mut rx = hub.subscribe();
    let mut session = Session::new(None);

    session.handle(&connect(&token_for(&tokens, "admin01", UserRole::Admin), "0,0"), &tokens);
    session.handle(&subscribe("feed", ADMIN_TOPIC), &tokens);

    hub.send_to_admins(PushMessage::new(
        NotificationType::AdminOrder,
        "신규 주문",
        "새 주문이 접수되었습니다.",
    ));
    let frames = session.deliver(&rx.try_recv().unwrap());
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].get("subscription"), Some("feed"));
}

#[test]
fn test_connect_without_token_is_rejected() {
    let tokens = token_service();
    let mut session = Session::new(None);
    let outcome = session.handle(
        &Frame::new(Command::Connect).header("accept-version", "1.2"),
        &tokens,
    );
    assert!(outcome.close);
    assert_eq!(outcome.replies[0].command, Command::Error);
}

#[test]
fn test_refresh_token_cannot_open_session() {
    let tokens = token_service();
    let now = Utc::now().timestamp();
    let refresh = tokens.sign(&Claims {
        id: UserId::new(1),
        user_id: "shopper_01".to_string(),
        role: UserRole::User,
        marketing_consent: false,
        typ: TokenKind::Refresh,
        iat: now,
        exp: now + 600,
    });

    let mut session = Session::new(None);
    let outcome = session.handle(&connect(&refresh, "0,0"), &tokens);
    assert!(outcome.close);
}

#[test]
fn test_heartbeat_negotiation_uses_slower_side() {
    let tokens = token_service();
    let mut session = Session::new(None);
    let outcome = session.handle(
        &connect(&token_for(&tokens, "shopper_01", UserRole::User), "20000,4000"),
        &tokens,
    );

    let (outgoing, incoming) = outcome.heartbeat.unwrap();
    assert_eq!(outgoing, Some(Duration::from_millis(10_000)));
    assert_eq!(incoming, Some(Duration::from_millis(20_000)));
}

#[test]
fn test_wire_text_round_trips_through_session() {
    let tokens = token_service();
    let token = token_for(&tokens, "shopper_01", UserRole::User);
    let wire = format!(
        "{}{}",
        connect(&token, "0,0").encode(),
        subscribe("sub-0", "/user/shopper_01/queue/notifications").encode()
    );

    let frames = parse_frames(&wire).unwrap();
    assert_eq!(frames.len(), 2);

    let mut session = Session::new(None);
    for frame in &frames {
        assert!(!session.handle(frame, &tokens).close);
    }
    assert_eq!(session.subscription_count(), 1);
}
