// Gameplay tuning. Keep this separate from runtime/server configuration (tick rates, buffer
// sizes, etc.). All speeds are pixels per tick.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Player bounding box.
    pub width: f32,
    pub height: f32,

    /// Lateral speed set by LEFT/RIGHT.
    pub speed_x: f32,

    /// Climb speed set by UP/DOWN while gripping a vine.
    pub climb_speed: f32,

    /// Initial upward speed of a jump.
    pub jump_velocity: f32,

    /// Downward acceleration added every airborne tick, and its cap.
    pub gravity: f32,
    pub max_fall_speed: f32,

    /// Horizontal speed factor while gripping a vine.
    pub track_damping: f32,

    /// Max distance between a vine and the player's centre to grip it.
    pub track_grab_tolerance: f32,

    /// How far below a platform top the player's feet may be and still land.
    pub landing_tolerance: f32,

    /// Falling below this top-edge y with no platform in `abyss_window` kills the player.
    pub abyss_y: f32,
    pub abyss_window: f32,

    pub start_lives: u32,
    pub max_lives: u32,

    /// Grace period after a non-fatal death.
    pub invincibility: Duration,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            width: 24.0,
            height: 28.0,
            speed_x: 4.0,
            climb_speed: 3.0,
            jump_velocity: 5.0,
            gravity: 0.25,
            max_fall_speed: 8.0,
            track_damping: 0.40,
            track_grab_tolerance: 15.0,
            landing_tolerance: 10.0,
            abyss_y: 500.0,
            abyss_window: 60.0,
            start_lives: 3,
            max_lives: 5,
            invincibility: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    /// Enemy bounding box.
    pub width: f32,
    pub height: f32,

    pub patroller_speed: f32,
    /// Horizontal step used while a patroller settles onto its vine.
    pub settle_speed: f32,
    pub settle_epsilon: f32,
    /// Patrol bounds for patrollers spawned without a vine.
    pub default_min_y: f32,
    pub default_max_y: f32,
    /// Inset from the vine's top end / bottom end for patrollers on a vine.
    pub track_top_margin: f32,
    pub track_bottom_margin: f32,

    pub faller_speed: f32,
    /// Fallers deactivate once they reach this y.
    pub faller_floor: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            width: 30.0,
            height: 30.0,
            patroller_speed: 1.2,
            settle_speed: 2.0,
            settle_epsilon: 0.5,
            default_min_y: 150.0,
            default_max_y: 520.0,
            track_top_margin: 15.0,
            track_bottom_margin: 30.0,
            faller_speed: 1.2,
            faller_floor: 550.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ItemTuning {
    pub width: f32,
    pub height: f32,
    /// Inclusive range accepted for admin point overrides.
    pub min_points: u32,
    pub max_points: u32,
    /// Max distance from the requested slot for position-based despawn.
    pub despawn_tolerance: f32,
}

impl Default for ItemTuning {
    fn default() -> Self {
        Self {
            width: 20.0,
            height: 20.0,
            min_points: 1,
            max_points: 10_000,
            despawn_tolerance: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LevelTuning {
    pub victory_bonus: u32,
    /// Awarded instead of an extra life when lives are already at the max.
    pub max_lives_bonus: u32,
    pub speed_increment: f32,
    /// Pause between reaching the cage and the next level starting.
    pub settle_delay: Duration,
}

impl Default for LevelTuning {
    fn default() -> Self {
        Self {
            victory_bonus: 1000,
            max_lives_bonus: 500,
            speed_increment: 0.2,
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Bundle handed to the engine at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub item: ItemTuning,
    pub level: LevelTuning,
}
