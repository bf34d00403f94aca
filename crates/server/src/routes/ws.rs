//! `/ws`: STOMP 1.2 over a native WebSocket.
//!
//! One task per connection multiplexes three sources: inbound frames, hub
//! envelopes and the negotiated heart-beat timers.

use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::middleware::OptionalAuth;
use crate::realtime::session::{Principal, Session};
use crate::realtime::stomp::{Frame, parse_frames};
use crate::state::AppState;

/// A client is dropped after this many missed heart-beat periods.
const MISSED_BEATS_ALLOWED: u32 = 2;

/// Upgrade to a STOMP session. A `token` query parameter authenticates
/// up front, otherwise the CONNECT frame must carry one.
///
/// GET /ws
pub async fn upgrade(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ws: WebSocketUpgrade,
) -> Response {
    let principal = user.map(|user| Principal {
        login_id: user.login_id,
        role: user.role,
    });
    ws.on_upgrade(move |socket| run(socket, state, principal))
}

async fn run(socket: WebSocket, state: AppState, principal: Option<Principal>) {
    let (mut sink, mut stream) = socket.split();
    let mut hub = state.hub().subscribe();
    let mut session = Session::new(principal);

    let mut send_beat: Option<Interval> = None;
    let mut watchdog: Option<(Interval, Duration)> = None;
    let mut last_seen = Instant::now();

    tracing::debug!(sessions = state.hub().session_count(), "WebSocket opened");

    'conn: loop {
        tokio::select! {
            inbound = stream.next() => {
                let Some(Ok(message)) = inbound else { break };
                last_seen = Instant::now();

                let text = match &message {
                    Message::Text(text) => text.as_str(),
                    Message::Binary(bytes) => match std::str::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            let _ = send(&mut sink, &[Frame::error("Invalid frame", "frames must be UTF-8")]).await;
                            break;
                        }
                    },
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => continue,
                };

                let frames = match parse_frames(text) {
                    Ok(frames) => frames,
                    Err(e) => {
                        tracing::debug!(error = %e, "Malformed STOMP frame");
                        let _ = send(&mut sink, &[Frame::error("Malformed frame", &e.to_string())]).await;
                        break;
                    }
                };

                for frame in &frames {
                    let outcome = session.handle(frame, state.tokens());
                    if let Some((outgoing, incoming)) = outcome.heartbeat {
                        send_beat = outgoing.map(interval);
                        watchdog = incoming.map(|period| (interval(period), period));
                    }
                    if send(&mut sink, &outcome.replies).await.is_err() || outcome.close {
                        break 'conn;
                    }
                }
            }

            envelope = hub.recv() => match envelope {
                Ok(envelope) => {
                    let frames = session.deliver(&envelope);
                    if send(&mut sink, &frames).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket session lagged, notifications skipped");
                }
                Err(RecvError::Closed) => break,
            },

            () = tick(send_beat.as_mut()) => {
                if sink.send(Message::Text("\n".into())).await.is_err() {
                    break;
                }
            }

            () = tick(watchdog.as_mut().map(|(timer, _)| timer)) => {
                let Some((_, period)) = &watchdog else { continue };
                if last_seen.elapsed() > *period * MISSED_BEATS_ALLOWED {
                    tracing::debug!("STOMP client missed heart-beats, closing");
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
    tracing::debug!(
        user = session.principal().map_or("-", |p| p.login_id.as_str()),
        "WebSocket closed"
    );
}

/// A heart-beat timer whose first tick is one period away.
fn interval(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Wait for the next tick, or forever when the timer is disabled.
async fn tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    frames: &[Frame],
) -> Result<(), axum::Error> {
    for frame in frames {
        sink.send(Message::Text(frame.encode().into())).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interval_skips_immediate_tick() {
        let period = Duration::from_millis(30);
        let mut timer = interval(period);
        let started = Instant::now();
        timer.tick().await;
        assert!(started.elapsed() >= period);
    }

    #[tokio::test]
    async fn test_disabled_timer_never_fires() {
        let fired = tokio::time::timeout(Duration::from_millis(50), tick(None)).await;
        assert!(fired.is_err());
    }
}
