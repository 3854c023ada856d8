// Network adapters split by player/spectator sockets vs admin HTTP routes.

pub mod admin;
pub mod client;

pub use admin::{
    despawn_enemy_handler, despawn_item_at_handler, despawn_item_handler, list_entities_handler,
    list_sessions_handler, set_mode_handler, spawn_enemy_handler, spawn_item_handler,
};
pub use client::ws_handler;
