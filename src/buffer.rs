//! Per-conversation debounced message aggregation.
//!
//! Inbound fragments are appended to a shared expiring buffer and a
//! per-conversation debounce timer is (re)armed on every append. When a
//! conversation stays quiet for the configured period, the timer drains the
//! buffer, joins the fragments into one aggregated turn, and hands it to
//! the answerer exactly once per burst.

pub mod debounce;
pub mod store;

pub use debounce::DebounceScheduler;
pub use store::{BufferStore, RedisBufferStore};

use std::sync::Arc;
use std::time::Duration;

use crate::ConversationId;
use crate::error::{Error, Result};

/// Suffix appended to the conversation id to derive the buffer key.
const BUFFER_KEY_SUFFIX: &str = ":buffer";

pub(crate) fn buffer_key(conversation_id: &ConversationId) -> String {
    format!("{conversation_id}{BUFFER_KEY_SUFFIX}")
}

/// Entry point for inbound message fragments.
///
/// Constructed once at startup and shared with the webhook layer. The
/// store, scheduler, answerer, and notifier are injected; the aggregator
/// holds no per-conversation state of its own.
pub struct Aggregator {
    store: Arc<dyn BufferStore>,
    scheduler: Arc<DebounceScheduler>,
    buffer_ttl: Duration,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn BufferStore>,
        scheduler: Arc<DebounceScheduler>,
        buffer_ttl: Duration,
    ) -> Self {
        Self {
            store,
            scheduler,
            buffer_ttl,
        }
    }

    /// Append a fragment to the conversation's buffer and re-arm its
    /// debounce timer.
    ///
    /// A store failure here is transient from the caller's point of view;
    /// the webhook layer decides whether the gateway should redeliver.
    #[tracing::instrument(skip(self, fragment), fields(conversation_id = %conversation_id))]
    pub async fn submit(&self, conversation_id: &ConversationId, fragment: &str) -> Result<()> {
        if conversation_id.as_str().is_empty() {
            return Err(Error::InvalidInput("empty conversation id"));
        }
        if fragment.is_empty() {
            return Err(Error::InvalidInput("empty fragment"));
        }

        let key = buffer_key(conversation_id);
        self.store.append(&key, fragment).await?;
        self.store.set_expiry(&key, self.buffer_ttl).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            fragment_len = fragment.len(),
            "buffered fragment"
        );

        self.scheduler.arm(conversation_id.clone()).await;
        Ok(())
    }
}
