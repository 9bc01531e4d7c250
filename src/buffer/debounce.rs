//! Debounce scheduler: one cancellable timer per conversation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::ConversationId;
use crate::answer::Answerer;
use crate::buffer::{BufferStore, buffer_key};
use crate::notify::Notifier;

struct TimerSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Per-conversation debounce timers over the shared buffer store.
///
/// `arm` cancels and replaces the live timer for a conversation inside a
/// single critical section on the timer table, so two near-simultaneous
/// fragments cannot both fire. A timer that wakes re-checks its generation
/// under the same lock and removes its own entry before flushing; once
/// removed it can no longer be aborted, which makes an in-flight flush
/// uncancellable. A timer whose generation no longer matches was rearmed
/// while it waited for the lock and exits without flushing.
///
/// Timers for different conversations share nothing beyond the store and
/// never block each other.
pub struct DebounceScheduler {
    quiet_period: Duration,
    timers: Mutex<HashMap<ConversationId, TimerSlot>>,
    generations: AtomicU64,
    cancellations: AtomicU64,
    store: Arc<dyn BufferStore>,
    answerer: Arc<dyn Answerer>,
    notifier: Arc<dyn Notifier>,
}

impl DebounceScheduler {
    pub fn new(
        quiet_period: Duration,
        store: Arc<dyn BufferStore>,
        answerer: Arc<dyn Answerer>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            quiet_period,
            timers: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            store,
            answerer,
            notifier,
        })
    }

    /// Start (or restart) the quiet-period timer for a conversation.
    ///
    /// Any previously armed timer for the same conversation is cancelled
    /// first; cancel-then-replace happens under one table lock.
    pub async fn arm(self: &Arc<Self>, conversation_id: ConversationId) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let scheduler = Arc::clone(self);
        let timer_id = conversation_id.clone();

        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.remove(&conversation_id) {
            previous.handle.abort();
            self.cancellations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(conversation_id = %conversation_id, "debounce timer rearmed");
        } else {
            tracing::debug!(conversation_id = %conversation_id, "debounce timer armed");
        }

        let handle = tokio::spawn(async move {
            scheduler.run_timer(timer_id, generation).await;
        });
        timers.insert(conversation_id, TimerSlot { generation, handle });
    }

    async fn run_timer(self: Arc<Self>, conversation_id: ConversationId, generation: u64) {
        tokio::time::sleep(self.quiet_period).await;

        {
            let mut timers = self.timers.lock().await;
            match timers.get(&conversation_id) {
                Some(slot) if slot.generation == generation => {
                    timers.remove(&conversation_id);
                }
                // A newer timer replaced this one while it waited for the
                // lock; the newer timer owns the flush.
                _ => return,
            }
        }

        self.flush(&conversation_id).await;
    }

    /// Drain the buffered fragments for a conversation and hand the
    /// aggregated turn to the answerer, then deliver the reply.
    ///
    /// The store entry is deleted at the end of the attempt whether or not
    /// the answerer or notifier succeeded; a failed burst is consumed and
    /// the user retries by sending a new message. If the read itself fails
    /// the flush aborts and the entry lives until its TTL expires.
    async fn flush(&self, conversation_id: &ConversationId) {
        let key = buffer_key(conversation_id);

        let fragments = match self.store.read_all(&key).await {
            Ok(fragments) => fragments,
            Err(error) => {
                tracing::error!(
                    conversation_id = %conversation_id,
                    %error,
                    "failed to read buffered fragments, aborting flush"
                );
                return;
            }
        };

        let aggregated = fragments.join(" ").trim().to_string();

        if aggregated.is_empty() {
            // Stale fire against an already-drained buffer; cleanup only.
            tracing::debug!(conversation_id = %conversation_id, "flush found no buffered fragments");
        } else {
            tracing::info!(
                conversation_id = %conversation_id,
                fragment_count = fragments.len(),
                "flushing aggregated turn"
            );

            match self
                .answerer
                .answer(&aggregated, conversation_id.as_str())
                .await
            {
                Ok(reply) => {
                    if let Err(error) = self
                        .notifier
                        .notify(conversation_id.as_str(), &reply)
                        .await
                    {
                        tracing::error!(
                            conversation_id = %conversation_id,
                            %error,
                            "reply generated but not delivered"
                        );
                    }
                }
                Err(error) => {
                    tracing::error!(
                        conversation_id = %conversation_id,
                        %error,
                        "answer failed, burst dropped"
                    );
                }
            }
        }

        if let Err(error) = self.store.delete(&key).await {
            tracing::warn!(
                conversation_id = %conversation_id,
                %error,
                "failed to delete buffer entry, leaving it to expire"
            );
        }
    }

    /// Cancel every live timer. Buffered fragments survive in the store
    /// until their TTL expires; there is no reconciliation sweep.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        let cancelled = timers.len();
        for (_, slot) in timers.drain() {
            slot.handle.abort();
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "cancelled live debounce timers on shutdown");
        }
    }

    /// Number of timers cancelled by rearms since startup.
    pub fn cancellation_count(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    /// Number of currently armed timers.
    pub async fn armed_count(&self) -> usize {
        self.timers.lock().await.len()
    }
}
