// Per-session tick driver. One task owns the engine, so commands and ticks never interleave.

use super::broadcast::BroadcastChannel;
use super::engine::SimulationEngine;
use crate::domain::{
    AdminError, CommunicationMode, EnemyId, EnemyKind, EntityListing, InputCommand, ItemId,
    ItemKind, Snapshot, TrackId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tracing::{debug, info};

pub type SessionId = u64;

/// Requests queued for a session's driver; applied between ticks in arrival order.
#[derive(Debug)]
pub enum SessionCommand {
    Input(InputCommand),
    SpawnEnemy {
        kind: EnemyKind,
        track: TrackId,
        height: f32,
        reply: oneshot::Sender<Result<EnemyId, AdminError>>,
    },
    DespawnEnemy {
        id: EnemyId,
        reply: oneshot::Sender<Result<(), AdminError>>,
    },
    SpawnItem {
        kind: ItemKind,
        track: TrackId,
        height: f32,
        points: Option<u32>,
        reply: oneshot::Sender<Result<ItemId, AdminError>>,
    },
    DespawnItemAt {
        track: TrackId,
        height: f32,
        reply: oneshot::Sender<Result<ItemId, AdminError>>,
    },
    DespawnItem {
        id: ItemId,
        reply: oneshot::Sender<Result<(), AdminError>>,
    },
    SetMode {
        mode: CommunicationMode,
        reply: oneshot::Sender<()>,
    },
    Listing {
        reply: oneshot::Sender<EntityListing>,
    },
}

fn apply_command(engine: &mut SimulationEngine, command: SessionCommand) {
    // A dropped reply receiver just means the caller gave up waiting.
    match command {
        SessionCommand::Input(input) => engine.handle_input(input),
        SessionCommand::SpawnEnemy {
            kind,
            track,
            height,
            reply,
        } => {
            let _ = reply.send(engine.spawn_enemy(kind, track, height));
        }
        SessionCommand::DespawnEnemy { id, reply } => {
            let _ = reply.send(engine.despawn_enemy(id));
        }
        SessionCommand::SpawnItem {
            kind,
            track,
            height,
            points,
            reply,
        } => {
            let _ = reply.send(engine.spawn_item(kind, track, height, points));
        }
        SessionCommand::DespawnItemAt {
            track,
            height,
            reply,
        } => {
            let _ = reply.send(engine.despawn_item_at(track, height));
        }
        SessionCommand::DespawnItem { id, reply } => {
            let _ = reply.send(engine.despawn_item(id));
        }
        SessionCommand::SetMode { mode, reply } => {
            engine.set_mode(mode);
            let _ = reply.send(());
        }
        SessionCommand::Listing { reply } => {
            let _ = reply.send(engine.listing());
        }
    }
}

pub async fn session_task(
    session_id: SessionId,
    mut engine: SimulationEngine,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    listeners: Arc<BroadcastChannel<Arc<Snapshot>>>,
    latest_tx: watch::Sender<Arc<Snapshot>>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    info!(session_id, "session started");

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(command) = command_rx.try_recv() {
            apply_command(&mut engine, command);
        }

        let snapshot = Arc::new(engine.tick(tick_interval));
        latest_tx.send_replace(snapshot.clone());
        let delivered = listeners.broadcast(&snapshot);

        if snapshot.tick % 600 == 0 {
            debug!(
                session_id,
                tick = snapshot.tick,
                listeners = delivered,
                dropped_frames = listeners.dropped_frames(),
                "session heartbeat"
            );
        }
    }

    listeners.close();
    let state = engine.state();
    info!(
        session_id,
        level = state.level,
        score = state.player.score,
        ticks = state.tick,
        "session stopped"
    );
}
