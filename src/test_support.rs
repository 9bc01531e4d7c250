//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::answer::Answerer;
use crate::buffer::BufferStore;
use crate::error::{Error, Result};
use crate::notify::Notifier;

/// In-memory buffer store. Expiry is accepted and ignored.
#[derive(Default)]
pub struct MemoryBufferStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryBufferStore {
    pub fn contains(&self, key: &str) -> bool {
        self.lists.lock().unwrap().contains_key(key)
    }

    pub fn entry(&self, key: &str) -> Option<Vec<String>> {
        self.lists.lock().unwrap().get(key).cloned()
    }

    /// Pre-populate a key, bypassing the aggregator.
    pub fn seed(&self, key: &str, values: &[&str]) {
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(key.to_string()).or_default();
        list.extend(values.iter().map(|value| value.to_string()));
    }
}

#[async_trait]
impl BufferStore for MemoryBufferStore {
    async fn append(&self, key: &str, value: &str) -> Result<()> {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn set_expiry(&self, _key: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lists.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Store delegating to [`MemoryBufferStore`], with individually failable
/// reads and deletes for flush error-path tests.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryBufferStore,
    fail_read: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn fail_reads(&self) {
        self.fail_read.store(true, Ordering::Relaxed);
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::Relaxed);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    pub fn seed(&self, key: &str, values: &[&str]) {
        self.inner.seed(key, values);
    }
}

#[async_trait]
impl BufferStore for FlakyStore {
    async fn append(&self, key: &str, value: &str) -> Result<()> {
        self.inner.append(key, value).await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        self.inner.set_expiry(key, ttl).await
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        if self.fail_read.load(Ordering::Relaxed) {
            return Err(Error::Store("read failed".into()));
        }
        self.inner.read_all(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::Relaxed) {
            return Err(Error::Store("delete failed".into()));
        }
        self.inner.delete(key).await
    }
}

/// Store whose every operation fails, for error-path tests.
pub struct DownStore;

#[async_trait]
impl BufferStore for DownStore {
    async fn append(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Store("store down".into()))
    }

    async fn set_expiry(&self, _key: &str, _ttl: Duration) -> Result<()> {
        Err(Error::Store("store down".into()))
    }

    async fn read_all(&self, _key: &str) -> Result<Vec<String>> {
        Err(Error::Store("store down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::Store("store down".into()))
    }
}

/// Answerer that records calls and returns a canned reply.
pub struct RecordingAnswerer {
    calls: Mutex<Vec<(String, String)>>,
    reply: String,
    fail: bool,
}

impl RecordingAnswerer {
    pub fn replying(reply: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: reply.to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: String::new(),
            fail: true,
        }
    }

    /// `(text, session_id)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Answerer for RecordingAnswerer {
    async fn answer(&self, text: &str, session_id: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), session_id.to_string()));
        if self.fail {
            Err(Error::Answer("answer failed".into()))
        } else {
            Ok(self.reply.clone())
        }
    }
}

/// Notifier that records deliveries.
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// `(destination, text)` pairs in delivery order.
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, destination: &str, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Notify("gateway down".into()));
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}
