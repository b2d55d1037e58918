//! WebSocket support for the realtime chat relay
//!
//! # Architecture
//!
//! - **Connection**: One socket plus the chat rooms it joined
//! - **Room**: Chat-keyed pub/sub for broadcasting events
//! - **State**: [`RelayHub`], the connection table and rooms shared with REST handlers
//! - **Relay**: The message send pipeline
//! - **Auto-response**: Delayed first reply on behalf of an administrator
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: Type-safe event definitions for client/server communication

pub mod auto_response;
pub mod connection;
pub mod events;
pub mod handler;
pub mod relay;
pub mod room;
pub mod state;

pub use auto_response::AutoResponder;
pub use handler::ws_handler;
pub use relay::{MessageRelay, PolicyViolation, RelayError};
pub use state::{RelayHub, RelayStats};
