//! Inbound webhook: receives gateway events and feeds the aggregator.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::ConversationId;
use crate::buffer::Aggregator;
use crate::error::Error;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fields burstbot needs from a gateway event.
#[derive(Debug, PartialEq)]
struct InboundEvent {
    conversation_id: String,
    text: String,
}

/// Pull the conversation id and message text out of an Evolution webhook
/// payload.
///
/// Returns `None` for events missing either field and for group chats
/// (`remoteJid` containing `@g.us`), which are acknowledged but never
/// answered.
fn extract_event(payload: &Value) -> Option<InboundEvent> {
    let data = payload.get("data")?;
    let conversation_id = data.get("key")?.get("remoteJid")?.as_str()?;
    let text = data.get("message")?.get("conversation")?.as_str()?;

    if conversation_id.is_empty() || text.is_empty() || conversation_id.contains("@g.us") {
        return None;
    }

    Some(InboundEvent {
        conversation_id: conversation_id.to_string(),
        text: text.to_string(),
    })
}

/// Accept a gateway event and buffer its message fragment.
///
/// Store failures answer 503 so a gateway that honors status codes can
/// redeliver; everything else answers 200 to keep the gateway quiet.
async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let event_id = uuid::Uuid::new_v4();

    let Some(event) = extract_event(&payload) else {
        tracing::debug!(%event_id, "ignoring webhook event without an answerable message");
        return (StatusCode::OK, Json(json!({ "status": "ok" })));
    };

    let conversation_id = ConversationId::from(event.conversation_id);
    match state.aggregator.submit(&conversation_id, &event.text).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(error @ Error::Store(_)) => {
            tracing::error!(
                %event_id,
                conversation_id = %conversation_id,
                %error,
                "failed to buffer fragment"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "retry" })),
            )
        }
        Err(error) => {
            tracing::warn!(
                %event_id,
                conversation_id = %conversation_id,
                %error,
                "rejected webhook event"
            );
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_payload(remote_jid: &str, text: &str) -> Value {
        json!({
            "event": "messages.upsert",
            "data": {
                "key": { "remoteJid": remote_jid, "fromMe": false },
                "message": { "conversation": text }
            }
        })
    }

    #[test]
    fn extracts_conversation_and_text() {
        let payload = event_payload("5511999999999@s.whatsapp.net", "hello");
        assert_eq!(
            extract_event(&payload),
            Some(InboundEvent {
                conversation_id: "5511999999999@s.whatsapp.net".into(),
                text: "hello".into(),
            })
        );
    }

    #[test]
    fn group_chats_are_filtered() {
        let payload = event_payload("12036302@g.us", "hello group");
        assert_eq!(extract_event(&payload), None);
    }

    #[test]
    fn events_without_a_message_are_ignored() {
        assert_eq!(extract_event(&json!({})), None);
        assert_eq!(
            extract_event(&json!({ "data": { "key": { "remoteJid": "x" } } })),
            None
        );
        assert_eq!(extract_event(&event_payload("x", "")), None);
        assert_eq!(extract_event(&event_payload("", "hello")), None);
    }
}
