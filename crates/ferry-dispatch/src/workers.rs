//! One worker task per conversation.
//!
//! Messages of a conversation are dispatched strictly in arrival order, one
//! at a time; different conversations proceed in parallel. The inbound
//! reader only enqueues, so a slow provider call never holds it up.
//!
//! A worker that has been idle for the configured timeout retires, and the
//! next message for that conversation starts a new one. A panic inside a
//! dispatch loses that one turn; the worker keeps serving the conversation.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ferry_channels::RawMessage;

use crate::dispatcher::Dispatcher;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// The sending half of a worker's queue. `generation` tells a retiring
/// worker whether the map entry is still its own.
struct Queue {
    tx: mpsc::UnboundedSender<RawMessage>,
    generation: u64,
}

pub struct ConversationWorkers {
    dispatcher: Arc<Dispatcher>,
    queues: Arc<DashMap<String, Queue>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
    idle_timeout: Duration,
    generations: AtomicU64,
}

impl ConversationWorkers {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            dispatcher,
            queues: Arc::new(DashMap::new()),
            handles: Mutex::new(Vec::new()),
            shutdown,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            generations: AtomicU64::new(0),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Number of conversations that currently have a worker.
    pub fn active_conversations(&self) -> usize {
        self.queues.len()
    }

    /// Queue `raw` on its conversation's worker, starting one if needed.
    pub fn submit(&self, raw: RawMessage) {
        if *self.shutdown.borrow() {
            debug!(id = raw.id, "shutting down, message dropped");
            return;
        }

        let conversation = raw.room_id.clone();
        // the entry guard stays held across the send so a retiring worker
        // cannot remove the queue between our lookup and the send
        let mut queue = self
            .queues
            .entry(conversation.clone())
            .or_insert_with(|| self.spawn_worker(&conversation));
        if let Err(mpsc::error::SendError(raw)) = queue.tx.send(raw) {
            warn!(conversation = %conversation, "worker gone, starting a new one");
            *queue = self.spawn_worker(&conversation);
            if let Err(e) = queue.tx.send(raw) {
                warn!(conversation = %conversation, id = e.0.id, "message dropped");
            }
        }
    }

    /// Feed every inbound message to [`submit`](Self::submit) until the
    /// channel closes or [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self, mut inbound: mpsc::Receiver<RawMessage>) {
        let mut stop = self.shutdown.subscribe();
        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                msg = inbound.recv() => match msg {
                    Some(raw) => self.submit(raw),
                    None => break,
                },
            }
        }
        debug!("inbound reader stopped");
    }

    /// Let every worker finish its queue, then wait for them to exit. Call
    /// once nothing will be submitted any more.
    pub async fn drain(&self) {
        // dropping the senders ends each worker after its last queued message
        self.queues.clear();
        let count = self.join_all().await;
        info!(workers = count, "conversation queues drained");
    }

    /// Stop starting queued messages, let in-flight ones finish, and wait
    /// for every worker to exit.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.queues.clear();
        let count = self.join_all().await;
        info!(workers = count, "conversation workers stopped");
    }

    async fn join_all(&self) -> usize {
        let handles = match self.handles.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "conversation worker failed");
            }
        }
        count
    }

    fn spawn_worker(&self, conversation: &str) -> Queue {
        let (tx, mut rx) = mpsc::unbounded_channel::<RawMessage>();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let dispatcher = Arc::clone(&self.dispatcher);
        let queues = Arc::clone(&self.queues);
        let mut stop = self.shutdown.subscribe();
        let idle_timeout = self.idle_timeout;
        let conversation = conversation.to_string();

        let handle = tokio::spawn(async move {
            debug!(conversation = %conversation, generation, "worker started");
            loop {
                if *stop.borrow() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    msg = rx.recv() => match msg {
                        Some(raw) => dispatch_guarded(&dispatcher, &conversation, raw).await,
                        None => break,
                    },
                    _ = tokio::time::sleep(idle_timeout) => {
                        // submit sends while holding this shard, so an empty
                        // queue here stays empty until the entry is gone
                        let retired = queues
                            .remove_if(&conversation, |_, q| {
                                q.generation == generation && rx.is_empty()
                            })
                            .is_some();
                        if retired {
                            debug!(conversation = %conversation, "worker idle, retiring");
                            break;
                        }
                    }
                }
            }
            debug!(conversation = %conversation, generation, "worker exited");
        });

        match self.handles.lock() {
            Ok(mut handles) => {
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
            }
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
        Queue { tx, generation }
    }
}

/// Run one dispatch. A panic is logged and costs only this turn.
async fn dispatch_guarded(dispatcher: &Dispatcher, conversation: &str, raw: RawMessage) {
    let id = raw.id;
    match AssertUnwindSafe(dispatcher.dispatch(raw)).catch_unwind().await {
        Ok(outcome) => debug!(conversation, id, ?outcome, "dispatched"),
        Err(panic) => warn!(
            conversation,
            id,
            reason = panic_message(panic.as_ref()),
            "dispatch panicked, turn dropped"
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
