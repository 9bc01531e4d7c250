//! Burstbot: a WhatsApp assistant that answers coalesced message bursts.
//!
//! Inbound gateway events land on the webhook, fragments are buffered per
//! conversation in a shared Redis store, and a per-conversation debounce
//! timer flushes each burst to the answerer exactly once when the
//! conversation goes quiet. The reply is delivered back through the
//! messaging gateway.

pub mod answer;
pub mod buffer;
pub mod config;
pub mod error;
pub mod notify;
pub mod server;

pub use error::{Error, Result};

use std::fmt;
use std::sync::Arc;

/// Opaque, stable identifier for a chat thread.
///
/// Group-chat identifiers are filtered out by the webhook layer before they
/// reach the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(Arc<str>);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
pub(crate) mod test_support;
