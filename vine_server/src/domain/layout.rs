// Static level description: vines, platforms, goal cage and the level-init spawn plan.
// Built once per level instance and never mutated afterwards.

use super::entities::{EnemyKind, ItemKind};
use super::geometry::{Rect, Vec2};

/// Index of a track within its layout.
pub type TrackId = usize;

/// A climbable vine between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub start: Vec2,
    pub end: Vec2,
}

impl Track {
    /// Horizontal centre of the vine; vines are vertical so both endpoints share it.
    pub fn center_x(&self) -> f32 {
        (self.start.x + self.end.x) / 2.0
    }

    pub fn top(&self) -> f32 {
        self.start.y.min(self.end.y)
    }

    pub fn bottom(&self) -> f32 {
        self.start.y.max(self.end.y)
    }

    pub fn contains_height(&self, y: f32) -> bool {
        y >= self.top() && y <= self.bottom()
    }
}

/// Horizontal route walked by the secondary hazard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardRoute {
    pub y: f32,
    pub min_x: f32,
    pub max_x: f32,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
}

/// Where an entity appears: an absolute position, optionally tied to a vine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSlot {
    pub position: Vec2,
    pub track: Option<TrackId>,
}

impl SpawnSlot {
    pub fn free(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            track: None,
        }
    }

    pub fn on_track(track: TrackId, x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            track: Some(track),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpawnPlan {
    pub enemies: Vec<(EnemyKind, SpawnSlot)>,
    pub items: Vec<(ItemKind, SpawnSlot)>,
}

#[derive(Debug, Clone)]
pub struct LevelLayout {
    pub width: f32,
    pub height: f32,
    pub player_start: Vec2,
    pub tracks: Vec<Track>,
    pub platforms: Vec<Rect>,
    pub cage: Rect,
    pub hazard: HazardRoute,
    pub spawns: SpawnPlan,
}

impl LevelLayout {
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// The canonical jungle stage.
    pub fn jungle() -> Self {
        let tracks = [
            (160.0, 120.0, 525.0),
            (240.0, 120.0, 525.0),
            (400.0, 220.0, 525.0),
            (480.0, 220.0, 525.0),
            (640.0, 120.0, 525.0),
            (720.0, 120.0, 525.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(id, (x, top, bottom))| Track {
            id,
            start: Vec2::new(x, top),
            end: Vec2::new(x, bottom),
        })
        .collect();

        let platforms = vec![
            // ground
            Rect::new(100.0, 525.0, 760.0, 15.0),
            Rect::new(150.0, 420.0, 600.0, 10.0),
            Rect::new(250.0, 320.0, 400.0, 10.0),
            Rect::new(100.0, 220.0, 500.0, 10.0),
            // top ledge next to the cage
            Rect::new(0.0, 120.0, 300.0, 10.0),
        ];

        let spawns = SpawnPlan {
            enemies: vec![
                // Spawned left of its vine; settles onto x = 240 before patrolling.
                (EnemyKind::Patroller, SpawnSlot::on_track(1, 228.0, 400.0)),
                (EnemyKind::Patroller, SpawnSlot::on_track(4, 640.0, 300.0)),
                (EnemyKind::Faller, SpawnSlot::free(400.0, 200.0)),
            ],
            items: vec![
                (ItemKind::Banana, SpawnSlot::free(420.0, 340.0)),
                (ItemKind::Orange, SpawnSlot::on_track(4, 660.0, 240.0)),
                (ItemKind::Cherry, SpawnSlot::free(220.0, 440.0)),
            ],
        };

        Self {
            width: 960.0,
            height: 540.0,
            player_start: Vec2::new(200.0, 497.0),
            tracks,
            platforms,
            cage: Rect::new(150.0, 80.0, 60.0, 40.0),
            hazard: HazardRoute {
                y: 107.0,
                min_x: 140.0,
                max_x: 420.0,
                speed: 1.0,
                width: 40.0,
                height: 40.0,
            },
            spawns,
        }
    }
}
