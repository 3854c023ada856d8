// Enemy movement policies. Each variant is a pure step function over the enemy's kinematic
// state; none of them look at the player.

use super::geometry::Vec2;
use super::layout::HazardRoute;

/// Kinematic state a policy reads and produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec2,
    /// +1 descending, -1 ascending.
    pub direction: i8,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolPhase {
    /// Drifting horizontally toward the vine centre.
    Settling,
    Patrolling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patrol {
    pub phase: PatrolPhase,
    pub min_y: f32,
    pub max_y: f32,
    pub center_x: f32,
    pub settle_speed: f32,
    pub settle_epsilon: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementPolicy {
    /// Bounces between two y bounds on a fixed x.
    Patroller(Patrol),
    /// Descends until `floor`, then deactivates.
    Faller { floor: f32 },
}

impl MovementPolicy {
    /// Builds a patroller, starting in the settling phase when spawned off-centre.
    pub fn patroller(
        spawn_x: f32,
        center_x: f32,
        min_y: f32,
        max_y: f32,
        settle_speed: f32,
        settle_epsilon: f32,
    ) -> Self {
        let phase = if (spawn_x - center_x).abs() < settle_epsilon {
            PatrolPhase::Patrolling
        } else {
            PatrolPhase::Settling
        };
        MovementPolicy::Patroller(Patrol {
            phase,
            min_y,
            max_y,
            center_x,
            settle_speed,
            settle_epsilon,
        })
    }

    /// Advances one tick. Inactive motion is returned untouched.
    pub fn step(self, motion: Motion, speed: f32) -> (Self, Motion) {
        if !motion.active {
            return (self, motion);
        }

        match self {
            MovementPolicy::Patroller(patrol) => {
                let (patrol, motion) = step_patrol(patrol, motion, speed);
                (MovementPolicy::Patroller(patrol), motion)
            }
            MovementPolicy::Faller { floor } => (self, step_faller(floor, motion, speed)),
        }
    }
}

fn step_patrol(mut patrol: Patrol, mut motion: Motion, speed: f32) -> (Patrol, Motion) {
    if patrol.phase == PatrolPhase::Settling {
        let dx = patrol.center_x - motion.position.x;
        let step = patrol.settle_speed.min(dx.abs());
        motion.position.x += step * dx.signum();

        if (patrol.center_x - motion.position.x).abs() < patrol.settle_epsilon {
            motion.position.x = patrol.center_x;
            motion.direction = 1;
            patrol.phase = PatrolPhase::Patrolling;
        }
        return (patrol, motion);
    }

    motion.position.y += speed * f32::from(motion.direction);

    if motion.position.y <= patrol.min_y {
        motion.position.y = patrol.min_y;
        motion.direction = 1;
    } else if motion.position.y >= patrol.max_y {
        motion.position.y = patrol.max_y;
        motion.direction = -1;
    }

    (patrol, motion)
}

fn step_faller(floor: f32, mut motion: Motion, speed: f32) -> Motion {
    motion.position.y += speed;
    if motion.position.y >= floor {
        motion.position.y = floor;
        motion.active = false;
    }
    motion
}

/// Secondary hazard pacing the top ledge next to the cage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardPatrol {
    pub route: HazardRoute,
    pub position: Vec2,
    pub moving_right: bool,
}

impl HazardPatrol {
    pub fn new(route: HazardRoute) -> Self {
        Self {
            route,
            position: Vec2::new(route.min_x, route.y),
            moving_right: true,
        }
    }

    pub fn advance(&mut self, speed_multiplier: f32) {
        let speed = self.route.speed * speed_multiplier;
        if self.moving_right {
            self.position.x += speed;
            if self.position.x >= self.route.max_x {
                self.position.x = self.route.max_x;
                self.moving_right = false;
            }
        } else {
            self.position.x -= speed;
            if self.position.x <= self.route.min_x {
                self.position.x = self.route.min_x;
                self.moving_right = true;
            }
        }
    }
}
