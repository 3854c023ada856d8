// Domain-level simulation entities.

use super::geometry::{Rect, Vec2};
use super::layout::TrackId;
use super::movement::{Motion, MovementPolicy};

pub type EnemyId = u64;
pub type ItemId = u64;

/// Enemy kind, fixed at creation. Also decides the movement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    /// Red: climbs up and down a single vine.
    Patroller,
    /// Blue: drops down and leaves the stage.
    Faller,
}

impl EnemyKind {
    pub fn label(self) -> &'static str {
        match self {
            EnemyKind::Patroller => "RED",
            EnemyKind::Faller => "BLUE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Banana,
    Orange,
    Cherry,
}

impl ItemKind {
    pub fn points(self) -> u32 {
        match self {
            ItemKind::Banana => 70,
            ItemKind::Orange => 100,
            ItemKind::Cherry => 50,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Banana => "BANANA",
            ItemKind::Orange => "ORANGE",
            ItemKind::Cherry => "CHERRY",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub position: Vec2,
    pub size: Vec2,
    /// Effective per-tick speed (base speed times the level multiplier).
    pub speed: f32,
    pub base_speed: f32,
    pub direction: i8,
    pub active: bool,
    pub track: Option<TrackId>,
    pub policy: MovementPolicy,
}

impl Enemy {
    pub fn bounds(&self) -> Rect {
        Rect::at(self.position, self.size.x, self.size.y)
    }

    pub fn apply_speed_multiplier(&mut self, multiplier: f32) {
        self.speed = self.base_speed * multiplier;
    }

    /// Runs one tick of this enemy's policy. No-op once inactive.
    pub fn advance(&mut self) {
        if !self.active {
            return;
        }

        let motion = Motion {
            position: self.position,
            direction: self.direction,
            active: self.active,
        };
        let (policy, next) = self.policy.step(motion, self.speed);
        self.policy = policy;
        self.position = next.position;
        self.direction = next.direction;
        self.active = next.active;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub position: Vec2,
    pub size: Vec2,
    pub points: u32,
    pub active: bool,
    pub track: Option<TrackId>,
}

impl Item {
    pub fn bounds(&self) -> Rect {
        Rect::at(self.position, self.size.x, self.size.y)
    }
}
