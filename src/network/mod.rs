//! Network Layer
//!
//! WebSocket front end for the arcade. All game logic runs through
//! [`crate::arcade::Arcade`].

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ErrorCode, ErrorReply, ServerMessage};
pub use server::{handle_client_message, ArcadeServer, ServerError};
