//! Realtime Gateway
//!
//! Push channels over WebSocket: `forum`, `thread-{id}` and the private
//! `user-{id}` inbox channel.

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use gateway::{channel_access, ChannelAccess, ChannelEvent, Gateway};
pub use handler::realtime_handler;
pub use messages::{ClientMessage, ServerMessage};
pub use session::SessionState;
