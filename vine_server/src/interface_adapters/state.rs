use crate::use_cases::SessionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Every running session; shared by socket and admin handlers.
    pub registry: Arc<SessionRegistry>,
}
