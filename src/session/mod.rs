//! Session client and its front-end channels

pub mod action_channel;
pub mod client;
pub mod command_router;

pub use action_channel::{ActionChannel, ClientAction, ClientEvent, StatusReport};
pub use client::SessionClient;
pub use command_router::CommandRouter;
