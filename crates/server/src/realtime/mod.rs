//! Realtime notification push.
//!
//! Services publish to the [`NotificationHub`]. Each `/ws` connection runs a
//! STOMP [`session::Session`] that forwards the envelopes matching its
//! subscriptions.

pub mod hub;
pub mod session;
pub mod stomp;

pub use hub::{Envelope, NotificationHub, PushMessage, Target};
