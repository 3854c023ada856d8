// Session orchestration: creating, looking up and tearing down game sessions.

use super::broadcast::{AttachError, BroadcastChannel, ListenerId, ListenerRole, Subscription};
use super::engine::SimulationEngine;
use super::session::{SessionCommand, SessionId, session_task};
use crate::domain::{
    AdminError, CommunicationMode, EnemyId, EnemyKind, EntityListing, InputCommand, ItemId,
    ItemKind, LevelLayout, Snapshot, TrackId, Tuning,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock, mpsc, oneshot, watch};
use tracing::info;

/// Shared configuration for spawning session drivers.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for queued inputs and admin requests.
    pub command_channel_capacity: usize,
    /// Per-listener snapshot queue length.
    pub listener_queue_capacity: usize,
    /// Fixed tick interval for the session loop.
    pub tick_interval: Duration,
    pub max_spectators: usize,
    pub tuning: Tuning,
}

/// Errors returned by registry and session operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    NotFound,
    CapacityExceeded { limit: usize },
    /// The session driver has stopped.
    Closed,
    Rejected(AdminError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "session not found"),
            SessionError::CapacityExceeded { limit } => {
                write!(f, "spectator limit of {limit} reached")
            }
            SessionError::Closed => write!(f, "session closed"),
            SessionError::Rejected(err) => write!(f, "{err}"),
        }
    }
}

impl From<AdminError> for SessionError {
    fn from(err: AdminError) -> Self {
        SessionError::Rejected(err)
    }
}

impl From<AttachError> for SessionError {
    fn from(err: AttachError) -> Self {
        match err {
            AttachError::Closed => SessionError::Closed,
            AttachError::CapacityExceeded { limit } => SessionError::CapacityExceeded { limit },
        }
    }
}

/// Summary row for session listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub name: Arc<str>,
    pub level: u32,
    pub score: u32,
    pub lives: u32,
    pub spectators: usize,
}

/// Cloneable access to one running session.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// Display name supplied by the player that created the session.
    pub name: Arc<str>,
    command_tx: mpsc::Sender<SessionCommand>,
    listeners: Arc<BroadcastChannel<Arc<Snapshot>>>,
    latest_rx: watch::Receiver<Arc<Snapshot>>,
    shutdown: Arc<Notify>,
}

impl SessionHandle {
    pub async fn send_input(&self, command: InputCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(SessionCommand::Input(command))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Non-blocking variant for the socket loop; `Ok(false)` means the queue was full.
    pub fn try_send_input(&self, command: InputCommand) -> Result<bool, SessionError> {
        match self.command_tx.try_send(SessionCommand::Input(command)) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SessionError::Closed),
        }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> SessionCommand,
    ) -> Result<R, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(build(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn spawn_enemy(
        &self,
        kind: EnemyKind,
        track: TrackId,
        height: f32,
    ) -> Result<EnemyId, SessionError> {
        let result = self
            .request(|reply| SessionCommand::SpawnEnemy {
                kind,
                track,
                height,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn despawn_enemy(&self, id: EnemyId) -> Result<(), SessionError> {
        let result = self
            .request(|reply| SessionCommand::DespawnEnemy { id, reply })
            .await?;
        Ok(result?)
    }

    pub async fn spawn_item(
        &self,
        kind: ItemKind,
        track: TrackId,
        height: f32,
        points: Option<u32>,
    ) -> Result<ItemId, SessionError> {
        let result = self
            .request(|reply| SessionCommand::SpawnItem {
                kind,
                track,
                height,
                points,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn despawn_item_at(
        &self,
        track: TrackId,
        height: f32,
    ) -> Result<ItemId, SessionError> {
        let result = self
            .request(|reply| SessionCommand::DespawnItemAt {
                track,
                height,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn despawn_item(&self, id: ItemId) -> Result<(), SessionError> {
        let result = self
            .request(|reply| SessionCommand::DespawnItem { id, reply })
            .await?;
        Ok(result?)
    }

    pub async fn set_mode(&self, mode: CommunicationMode) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetMode { mode, reply })
            .await
    }

    pub async fn listing(&self) -> Result<EntityListing, SessionError> {
        self.request(|reply| SessionCommand::Listing { reply }).await
    }

    /// Most recent snapshot published by the driver.
    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        // Clone out of the borrow so the watch lock is not held.
        self.latest_rx.borrow().clone()
    }

    pub fn attach(&self, role: ListenerRole) -> Result<Subscription<Arc<Snapshot>>, SessionError> {
        Ok(self.listeners.attach(role)?)
    }

    pub fn detach(&self, id: ListenerId) -> bool {
        self.listeners.detach(id)
    }

    pub fn summary(&self) -> SessionSummary {
        let latest = self.latest_snapshot();
        SessionSummary {
            session_id: self.session_id,
            name: self.name.clone(),
            level: latest.level,
            score: latest.player.score,
            lives: latest.player.lives,
            spectators: self.listeners.spectator_count(),
        }
    }

    fn stop(&self) {
        self.shutdown.notify_one();
        self.listeners.close();
    }
}

/// Thread-safe registry for active sessions.
pub struct SessionRegistry {
    /// Settings applied to newly created sessions.
    settings: SessionSettings,
    next_id: AtomicU64,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            next_id: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Creates a session at level 1 and spawns its driver.
    pub async fn create_session(&self, name: &str) -> SessionHandle {
        let session_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let engine = SimulationEngine::new(LevelLayout::jungle(), self.settings.tuning);

        // Channel wiring for the session driver.
        let (command_tx, command_rx) = mpsc::channel(self.settings.command_channel_capacity);
        let listeners = Arc::new(BroadcastChannel::new(
            self.settings.max_spectators,
            self.settings.listener_queue_capacity,
        ));
        let (latest_tx, latest_rx) = watch::channel(Arc::new(engine.snapshot()));
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(session_task(
            session_id,
            engine,
            command_rx,
            listeners.clone(),
            latest_tx,
            self.settings.tick_interval,
            shutdown.clone(),
        ));

        let handle = SessionHandle {
            session_id,
            name: Arc::from(name),
            command_tx,
            listeners,
            latest_rx,
            shutdown,
        };

        self.sessions
            .write()
            .await
            .insert(session_id, handle.clone());
        info!(session_id, name, "session created");
        handle
    }

    pub async fn get_session(&self, session_id: SessionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).cloned()
    }

    /// Stops the driver and closes every listener of the session.
    pub async fn remove_session(&self, session_id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(SessionError::NotFound)?;
        handle.stop();
        info!(session_id, "session removed");
        Ok(())
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> =
            sessions.values().map(SessionHandle::summary).collect();
        summaries.sort_by_key(|summary| summary.session_id);
        summaries
    }

    pub async fn attach_spectator(
        &self,
        session_id: SessionId,
    ) -> Result<(SessionHandle, Subscription<Arc<Snapshot>>), SessionError> {
        let handle = self
            .get_session(session_id)
            .await
            .ok_or(SessionError::NotFound)?;
        let subscription = handle.attach(ListenerRole::Spectator)?;
        info!(session_id, listener_id = subscription.id, "spectator attached");
        Ok((handle, subscription))
    }
}
