// Domain layer: core simulation types and rules.

pub mod entities;
pub mod errors;
pub mod factory;
pub mod geometry;
pub mod layout;
pub mod movement;
pub mod state;
pub mod tuning;

pub use entities::{Enemy, EnemyId, EnemyKind, Item, ItemId, ItemKind};
pub use errors::AdminError;
pub use factory::{EntityFactory, StandardFactory};
pub use geometry::{Rect, Vec2, overlaps};
pub use layout::{LevelLayout, SpawnSlot, Track, TrackId};
pub use state::{CommunicationMode, EntityListing, InputCommand, SessionState, Snapshot};
pub use tuning::Tuning;
