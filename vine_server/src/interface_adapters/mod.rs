// Interface adapters: wire protocol, WebSocket sessions and admin routes.

pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
