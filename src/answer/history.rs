//! Per-session chat history in Redis.
//!
//! Each session keeps a list of serialized turn records under
//! `{session_id}:history`, trimmed to a configured number of exchanges and
//! refreshed with a TTL on every write so idle sessions age out.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::error::Result;

const HISTORY_KEY_SUFFIX: &str = ":history";

/// One stored chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl TurnRecord {
    fn now(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            at: Utc::now(),
        }
    }
}

/// Session-scoped chat history over the shared Redis connection.
#[derive(Clone)]
pub struct SessionHistory {
    connection: ConnectionManager,
    ttl_seconds: u64,
    max_turns: usize,
}

impl SessionHistory {
    pub fn new(connection: ConnectionManager, ttl_seconds: u64, max_turns: usize) -> Self {
        Self {
            connection,
            ttl_seconds,
            max_turns,
        }
    }

    fn key(session_id: &str) -> String {
        format!("{session_id}{HISTORY_KEY_SUFFIX}")
    }

    /// Load the stored turns for a session, oldest first. Records that fail
    /// to parse are skipped.
    pub async fn load(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut connection = self.connection.clone();
        let raw: Vec<String> = connection.lrange(Self::key(session_id), 0, -1).await?;
        Ok(raw.iter().filter_map(|record| parse_record(record)).collect())
    }

    /// Append a user/assistant exchange, trim to the retention cap, and
    /// refresh the key's expiry.
    pub async fn record_exchange(&self, session_id: &str, user_text: &str, reply: &str) -> Result<()> {
        let key = Self::key(session_id);
        let records = [
            TurnRecord::now("user", user_text),
            TurnRecord::now("assistant", reply),
        ];

        let mut connection = self.connection.clone();
        for record in &records {
            let serialized = serde_json::to_string(record)?;
            let _: i64 = connection.rpush(&key, serialized).await?;
        }

        // Two records per exchange; keep the most recent exchanges only.
        let keep = (self.max_turns * 2) as isize;
        let _: () = connection.ltrim(&key, -keep, -1).await?;
        let _: bool = connection.expire(&key, self.ttl_seconds as i64).await?;
        Ok(())
    }
}

fn parse_record(raw: &str) -> Option<ChatMessage> {
    match serde_json::from_str::<TurnRecord>(raw) {
        Ok(record) => Some(ChatMessage {
            role: record.role,
            content: record.content,
        }),
        Err(error) => {
            tracing::warn!(%error, "skipping unparseable history record");
            None
        }
    }
}
