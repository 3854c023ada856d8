// Domain-level errors for administrative mutations.
use super::entities::{EnemyId, ItemId};

#[derive(Debug, Clone, PartialEq)]
pub enum AdminError {
    InvalidTrack { track: usize },
    HeightOutOfRange { track: usize, height: f32 },
    InvalidPoints { points: u32 },
    EnemyNotFound { id: EnemyId },
    ItemNotFound { id: ItemId },
    NoItemAt { track: usize, height: f32 },
}

impl AdminError {
    /// True for lookups that matched nothing (as opposed to rejected input).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AdminError::EnemyNotFound { .. }
                | AdminError::ItemNotFound { .. }
                | AdminError::NoItemAt { .. }
        )
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminError::InvalidTrack { track } => write!(f, "track {track} does not exist"),
            AdminError::HeightOutOfRange { track, height } => {
                write!(f, "height {height} is outside track {track}")
            }
            AdminError::InvalidPoints { points } => write!(f, "points {points} out of range"),
            AdminError::EnemyNotFound { id } => write!(f, "enemy {id} not found"),
            AdminError::ItemNotFound { id } => write!(f, "item {id} not found"),
            AdminError::NoItemAt { track, height } => {
                write!(f, "no item on track {track} at height {height}")
            }
        }
    }
}
