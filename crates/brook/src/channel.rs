//! Real-time channel session.
//!
//! A session unites one persistent socket with an event stream. The state
//! machine is `Connecting -> Open -> (receiving | Errored) -> Closed`; there
//! is no reconnect logic, so a failed session stays failed and the caller
//! decides whether to open a new one via
//! [`Channel::connect`](crate::resources::Channel::connect).

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use brook_common::error::{ClientError, EncodeError, Result, TransportError};
use brook_common::websocket::{StreamError, WebSocketConnection, WsMessage, WsSink};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Pause between the transport's open signal and the `Connected` event.
///
/// The backend accepts the socket before the server-side subscription is
/// fully registered; messages sent during that window are dropped. The
/// delay absorbs that race.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Channel session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Socket opened, settling delay still running.
    Connecting = 0,
    /// `Connected` has been emitted; frames flow.
    Open = 1,
    /// The transport failed. Terminal.
    Errored = 2,
    /// The peer closed the socket. Terminal.
    Closed = 3,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ChannelState::Connecting,
            1 => ChannelState::Open,
            2 => ChannelState::Errored,
            _ => ChannelState::Closed,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn get(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ChannelState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Transition Connecting -> Open; false if the session already moved on.
    fn open_if_connecting(&self) -> bool {
        self.0
            .compare_exchange(
                ChannelState::Connecting as u8,
                ChannelState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Failures surfaced on the event stream.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChannelError {
    /// An inbound frame was not valid JSON.
    #[error("Invalid message")]
    InvalidMessage,

    /// The backend reported an error payload (`err` field).
    #[error("channel error: {0}")]
    Server(Value),

    /// The underlying transport failed. The session is degraded.
    #[error("WS error: {0}")]
    Transport(#[source] StreamError),
}

/// Events observed on a channel session.
#[derive(Debug)]
pub enum ChannelEvent {
    /// The session is ready; emitted once, after the settling delay.
    Connected,
    /// The `message` field of an inbound frame.
    Message(Value),
    /// A malformed frame, a backend error payload, or a transport failure.
    Error(ChannelError),
}

/// A stateful wrapper around one persistent channel connection.
///
/// Owns the socket for its entire lifetime; two sessions never share one
/// transport handle.
pub struct ChannelSession {
    tx: WsSink,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    state: StateCell,
}

impl ChannelSession {
    pub(crate) fn start(conn: WebSocketConnection) -> Self {
        let (tx, mut rx) = conn.split();
        let (event_tx, events) = mpsc::unbounded_channel();
        let state = StateCell::default();

        // Settling timer: the transport is open, but the Connected event is
        // held back until the backend subscription has had time to register.
        let timer_events = event_tx.clone();
        let timer_state = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            if timer_state.open_if_connecting() {
                let _ = timer_events.send(ChannelEvent::Connected);
            }
        });

        // Frame pump: emits events in transport delivery order. Frames that
        // arrive before Connected are still delivered.
        let pump_state = state.clone();
        tokio::spawn(async move {
            while let Some(item) = rx.next().await {
                match item {
                    Ok(WsMessage::Close(_)) => {
                        pump_state.set(ChannelState::Closed);
                        break;
                    }
                    Ok(frame) => {
                        if event_tx.send(interpret_frame(&frame)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        pump_state.set(ChannelState::Errored);
                        if event_tx
                            .send(ChannelEvent::Error(ChannelError::Transport(err)))
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            if pump_state.get() != ChannelState::Errored {
                pump_state.set(ChannelState::Closed);
            }
        });

        Self { tx, events, state }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Receive the next event; `None` once the session has fully shut down.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Send `{to, data}` to the channel. No acknowledgment is awaited;
    /// delivery confirmation, if needed, comes back on the message stream.
    ///
    /// # Panics
    ///
    /// Panics when `to` is empty: the recipient is a precondition of the
    /// wire format, not a runtime condition.
    pub async fn send(&mut self, to: &str, data: &Value) -> Result<()> {
        assert!(!to.is_empty(), "\"to\" parameter is required");

        let frame = serde_json::to_string(&json!({"to": to, "data": data}))
            .map_err(EncodeError::from)?;

        self.tx
            .send(WsMessage::Text(frame))
            .await
            .map_err(|e| ClientError::Transport(TransportError::Other(Box::new(e))))
    }
}

/// Map one inbound frame to its event.
///
/// Unparseable frames degrade to an error event without a state transition;
/// frames carrying `err` surface that payload; everything else is a message.
fn interpret_frame(frame: &WsMessage) -> ChannelEvent {
    let parsed: Option<Value> = match frame {
        WsMessage::Text(text) => serde_json::from_str(text).ok(),
        WsMessage::Binary(bytes) => serde_json::from_slice(bytes).ok(),
        WsMessage::Close(_) => None,
    };

    match parsed {
        None => ChannelEvent::Error(ChannelError::InvalidMessage),
        Some(json) => match json.get("err") {
            Some(err) if !err.is_null() => {
                ChannelEvent::Error(ChannelError::Server(err.clone()))
            }
            _ => ChannelEvent::Message(json.get("message").cloned().unwrap_or(Value::Null)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_frames_map_to_error_events() {
        let event = interpret_frame(&WsMessage::Text("not json".to_owned()));
        assert!(matches!(
            event,
            ChannelEvent::Error(ChannelError::InvalidMessage)
        ));
    }

    #[test]
    fn err_field_maps_to_server_error() {
        let event = interpret_frame(&WsMessage::Text(r#"{"err":"denied"}"#.to_owned()));
        match event {
            ChannelEvent::Error(ChannelError::Server(err)) => assert_eq!(err, json!("denied")),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn message_field_is_extracted() {
        let event =
            interpret_frame(&WsMessage::Text(r#"{"message":{"data":{"a":1}}}"#.to_owned()));
        match event {
            ChannelEvent::Message(message) => assert_eq!(message, json!({"data": {"a": 1}})),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn state_cell_opens_only_from_connecting() {
        let cell = StateCell::default();
        assert!(cell.open_if_connecting());
        assert_eq!(cell.get(), ChannelState::Open);

        cell.set(ChannelState::Errored);
        assert!(!cell.open_if_connecting());
        assert_eq!(cell.get(), ChannelState::Errored);
    }
}
