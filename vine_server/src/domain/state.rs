// Domain-level session state and the input/snapshot types around it.

use super::entities::{Enemy, EnemyId, EnemyKind, Item, ItemId, ItemKind};
use super::geometry::{Rect, Vec2};
use super::layout::{LevelLayout, TrackId};
use super::movement::HazardPatrol;
use std::time::Duration;

/// Discrete player command parsed by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Stop,
}

/// Encoding listeners should use for this session's snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommunicationMode {
    /// Line-oriented frames (`PLAYER 0 x=.. y=..`).
    Text,
    #[default]
    Json,
}

pub struct PlayerState {
    pub position: Vec2,
    pub velocity: Vec2,

    // Pending intent written by input handling, consumed by the tick.
    pub intent_x: f32,
    pub climb_intent: f32,

    pub on_track: bool,
    pub jumping: bool,

    pub lives: u32,
    pub score: u32,
    pub just_gained_life: bool,
    /// Session clock value at which the grace period ends.
    pub invincible_until: Option<Duration>,
}

impl PlayerState {
    pub fn new(start: Vec2, lives: u32) -> Self {
        Self {
            position: start,
            velocity: Vec2::ZERO,
            intent_x: 0.0,
            climb_intent: 0.0,
            on_track: false,
            jumping: false,
            lives,
            score: 0,
            just_gained_life: false,
            invincible_until: None,
        }
    }

    /// Puts the player back at `start` with no motion.
    pub fn reposition(&mut self, start: Vec2) {
        self.position = start;
        self.velocity = Vec2::ZERO;
        self.intent_x = 0.0;
        self.climb_intent = 0.0;
        self.on_track = false;
        self.jumping = false;
    }
}

/// Everything one game instance owns. Mutated only by its engine.
pub struct SessionState {
    pub player: PlayerState,
    pub enemies: Vec<Enemy>,
    pub items: Vec<Item>,
    pub layout: LevelLayout,
    pub hazard: HazardPatrol,

    pub level: u32,
    pub speed_multiplier: f32,
    pub won: bool,
    /// Clock value at which the next level starts after a win.
    pub reinit_at: Option<Duration>,

    /// Sum of all tick durations so far.
    pub clock: Duration,
    pub tick: u64,
    pub mode: CommunicationMode,

    next_enemy_id: EnemyId,
    next_item_id: ItemId,
}

impl SessionState {
    pub fn new(layout: LevelLayout, start_lives: u32) -> Self {
        Self {
            player: PlayerState::new(layout.player_start, start_lives),
            enemies: Vec::new(),
            items: Vec::new(),
            hazard: HazardPatrol::new(layout.hazard),
            layout,
            level: 1,
            speed_multiplier: 1.0,
            won: false,
            reinit_at: None,
            clock: Duration::ZERO,
            tick: 0,
            mode: CommunicationMode::default(),
            next_enemy_id: 1,
            next_item_id: 1,
        }
    }

    /// Hands out the next enemy id; ids are never reused within a session.
    pub fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }

    pub fn allocate_item_id(&mut self) -> ItemId {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    pub fn is_invincible(&self) -> bool {
        self.player.invincible_until.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub lives: u32,
    pub score: u32,
    pub on_track: bool,
    pub jumping: bool,
    pub just_gained_life: bool,
    pub invincible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub active: bool,
    pub track: Option<TrackId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub points: u32,
    pub track: Option<TrackId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardSnapshot {
    pub x: f32,
    pub y: f32,
    pub moving_right: bool,
}

/// Immutable point-in-time view of a session, ready for any encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    pub player: PlayerSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    /// Active items only.
    pub items: Vec<ItemSnapshot>,
    pub hazard: HazardSnapshot,
    pub cage: Rect,
    pub level: u32,
    pub won: bool,
    pub speed_multiplier: f32,
    pub mode: CommunicationMode,
}

/// Administrative view of the entities a session currently tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityListing {
    pub enemies: Vec<EnemySnapshot>,
    pub items: Vec<ItemSnapshot>,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(p: &PlayerState) -> Self {
        Self {
            x: p.position.x,
            y: p.position.y,
            vx: p.velocity.x,
            vy: p.velocity.y,
            lives: p.lives,
            score: p.score,
            on_track: p.on_track,
            jumping: p.jumping,
            just_gained_life: p.just_gained_life,
            invincible: p.invincible_until.is_some(),
        }
    }
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.id,
            kind: e.kind,
            x: e.position.x,
            y: e.position.y,
            active: e.active,
            track: e.track,
        }
    }
}

impl From<&Item> for ItemSnapshot {
    fn from(i: &Item) -> Self {
        Self {
            id: i.id,
            kind: i.kind,
            x: i.position.x,
            y: i.position.y,
            points: i.points,
            track: i.track,
        }
    }
}

impl From<&HazardPatrol> for HazardSnapshot {
    fn from(h: &HazardPatrol) -> Self {
        Self {
            x: h.position.x,
            y: h.position.y,
            moving_right: h.moving_right,
        }
    }
}

impl From<&SessionState> for Snapshot {
    fn from(s: &SessionState) -> Self {
        Self {
            tick: s.tick,
            player: PlayerSnapshot::from(&s.player),
            enemies: s.enemies.iter().map(EnemySnapshot::from).collect(),
            items: s
                .items
                .iter()
                .filter(|i| i.active)
                .map(ItemSnapshot::from)
                .collect(),
            hazard: HazardSnapshot::from(&s.hazard),
            cage: s.layout.cage,
            level: s.level,
            won: s.won,
            speed_multiplier: s.speed_multiplier,
            mode: s.mode,
        }
    }
}

impl From<&SessionState> for EntityListing {
    fn from(s: &SessionState) -> Self {
        Self {
            enemies: s.enemies.iter().map(EnemySnapshot::from).collect(),
            items: s
                .items
                .iter()
                .filter(|i| i.active)
                .map(ItemSnapshot::from)
                .collect(),
        }
    }
}
