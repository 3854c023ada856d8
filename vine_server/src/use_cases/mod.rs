// Use cases layer: the simulation engine and the session workflows around it.

pub mod broadcast;
pub mod engine;
pub mod registry;
pub mod session;

pub use broadcast::{AttachError, BroadcastChannel, ListenerId, ListenerRole, Subscription};
pub use engine::SimulationEngine;
pub use registry::{
    SessionError, SessionHandle, SessionRegistry, SessionSettings, SessionSummary,
};
pub use session::{SessionCommand, SessionId};
