// Fan-out of per-tick snapshots to every listener attached to a session.
//
// The listener list is copy-on-write: attach/detach swap in a new list under a short lock, and
// `broadcast` delivers from the list it saw without holding the lock. Every listener owns a
// bounded queue so a stalled socket only loses its own frames.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

pub type ListenerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerRole {
    Player,
    Spectator,
}

impl ListenerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ListenerRole::Player => "player",
            ListenerRole::Spectator => "spectator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The channel was closed because its session ended.
    Closed,
    CapacityExceeded { limit: usize },
}

struct Listener<T> {
    id: ListenerId,
    role: ListenerRole,
    tx: mpsc::Sender<T>,
}

/// Receiving end handed to an attached listener.
pub struct Subscription<T> {
    pub id: ListenerId,
    pub role: ListenerRole,
    rx: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next frame, or `None` once the channel is closed or this listener was detached.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

pub struct BroadcastChannel<T> {
    listeners: Mutex<Arc<Vec<Listener<T>>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    max_spectators: usize,
    queue_capacity: usize,
    dropped_frames: AtomicU64,
}

impl<T: Clone> BroadcastChannel<T> {
    pub fn new(max_spectators: usize, queue_capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            max_spectators,
            queue_capacity: queue_capacity.max(1),
            dropped_frames: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Vec<Listener<T>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Arc<Vec<Listener<T>>> {
        self.lock().clone()
    }

    pub fn attach(&self, role: ListenerRole) -> Result<Subscription<T>, AttachError> {
        let mut guard = self.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(AttachError::Closed);
        }

        if role == ListenerRole::Spectator {
            let spectators = guard
                .iter()
                .filter(|listener| listener.role == ListenerRole::Spectator)
                .count();
            if spectators >= self.max_spectators {
                return Err(AttachError::CapacityExceeded {
                    limit: self.max_spectators,
                });
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut next: Vec<Listener<T>> = guard
            .iter()
            .map(|listener| Listener {
                id: listener.id,
                role: listener.role,
                tx: listener.tx.clone(),
            })
            .collect();
        next.push(Listener { id, role, tx });
        *guard = Arc::new(next);

        debug!(listener_id = id, role = role.as_str(), "listener attached");
        Ok(Subscription { id, role, rx })
    }

    /// Returns false when `id` was not attached.
    pub fn detach(&self, id: ListenerId) -> bool {
        self.retain(|listener| listener.id != id) > 0
    }

    fn retain(&self, keep: impl Fn(&Listener<T>) -> bool) -> usize {
        let mut guard = self.lock();
        let before = guard.len();
        let next: Vec<Listener<T>> = guard
            .iter()
            .filter(|&listener| keep(listener))
            .map(|listener| Listener {
                id: listener.id,
                role: listener.role,
                tx: listener.tx.clone(),
            })
            .collect();
        let removed = before - next.len();
        if removed > 0 {
            *guard = Arc::new(next);
        }
        removed
    }

    /// Offers `value` to every listener and returns how many accepted it.
    pub fn broadcast(&self, value: &T) -> usize {
        let listeners = self.current();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for listener in listeners.iter() {
            match listener.tx.try_send(value.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let total = self.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(
                        listener_id = listener.id,
                        dropped_total = total,
                        "listener queue full; frame dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => gone.push(listener.id),
            }
        }

        if !gone.is_empty() {
            let removed = self.retain(|listener| !gone.contains(&listener.id));
            debug!(removed, "pruned closed listeners");
        }

        delivered
    }

    /// Drops every listener and refuses new ones; pending subscriptions drain and then end.
    pub fn close(&self) {
        let mut guard = self.lock();
        self.closed.store(true, Ordering::Release);
        *guard = Arc::new(Vec::new());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn listener_count(&self) -> usize {
        self.current().len()
    }

    pub fn spectator_count(&self) -> usize {
        self.current()
            .iter()
            .filter(|listener| listener.role == ListenerRole::Spectator)
            .count()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}
