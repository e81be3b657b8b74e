//! WebSocket endpoint for live notifications
//!
//! The credential token travels as a query parameter and is verified before
//! the connection is registered. A failed handshake closes with a policy
//! violation code and never touches the registry.
//!
//! Heartbeats originate from the registry's sweep task; this handler turns
//! them into protocol pings and reports pongs back.

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::caller_from_token;
use crate::api::server::ApiState;
use crate::core::constants::WS_CLOSE_POLICY_VIOLATION;
use crate::domain::access::Caller;
use crate::domain::realtime::ConnectionEvent;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn ws_handler(
    State(state): State<ApiState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn close_policy_violation(mut socket: WebSocket, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: WS_CLOSE_POLICY_VIOLATION,
            reason: reason.into(),
        })))
        .await;
}

/// Resolve the caller from the handshake token. The error string is the
/// close reason sent back on the policy-violation frame.
fn authenticate(token: Option<&str>, signing_key: &[u8]) -> Result<Caller, &'static str> {
    match token {
        None => Err("Authentication required"),
        Some(token) => caller_from_token(token, signing_key).map_err(|_| "Invalid token"),
    }
}

async fn handle_socket(socket: WebSocket, state: ApiState, token: Option<String>) {
    // Registration happens only past this point; a rejected handshake never
    // touches the registry
    let caller = match authenticate(token.as_deref(), &state.signing_key) {
        Ok(caller) => caller,
        Err(reason) => {
            close_policy_violation(socket, reason).await;
            return;
        }
    };

    let (connection_id, mut events) = state.registry.register(&caller.user_id);
    let (mut sink, mut stream) = socket.split();

    let _ = sink
        .send(Message::Text(json!({"type": "connected"}).to_string().into()))
        .await;

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let outcome = match event {
                ConnectionEvent::Deliver(frame) => sink.send(Message::Text(frame.into())).await,
                ConnectionEvent::Ping => sink.send(Message::Ping(Bytes::new())).await,
                ConnectionEvent::Terminate => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if outcome.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Pong(_) => state.registry.mark_alive(&caller.user_id, connection_id),
            Message::Close(_) => break,
            // Inbound application messages are not part of the protocol
            _ => {}
        }
    }

    state.registry.unregister(&caller.user_id, connection_id);
    writer.abort();
    tracing::debug!(user_id = %caller.user_id, connection_id, "WebSocket closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::auth::create_session_token;
    use crate::data::types::UserRole;
    use crate::domain::realtime::ConnectionRegistry;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_handshake_rejects_missing_token() {
        let reason = authenticate(None, KEY).unwrap_err();
        assert_eq!(reason, "Authentication required");
    }

    #[test]
    fn test_handshake_rejects_invalid_token_without_registering() {
        let registry = ConnectionRegistry::new(Duration::from_secs(30));

        let reason = authenticate(Some("not-a-jwt"), KEY).unwrap_err();
        assert_eq!(reason, "Invalid token");

        assert!(!registry.is_connected("u1"));
        assert_eq!(registry.connection_count("u1"), 0);
    }

    #[test]
    fn test_handshake_rejects_token_signed_with_other_key() {
        let token = create_session_token(KEY, "u1", "u@example.com", UserRole::Submitter).unwrap();
        let other_key = b"ffffffffffffffffffffffffffffffff";
        assert_eq!(
            authenticate(Some(&token), other_key).unwrap_err(),
            "Invalid token"
        );
    }

    #[test]
    fn test_handshake_accepts_valid_token() {
        let token = create_session_token(KEY, "u1", "u@example.com", UserRole::Reviewer).unwrap();
        let caller = authenticate(Some(&token), KEY).unwrap();
        assert_eq!(caller.user_id, "u1");
        assert_eq!(caller.email, "u@example.com");
    }
}
