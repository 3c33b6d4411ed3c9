//! # Arena Client Library
//!
//! Headless client for the arena server: resolves and connects with a
//! bounded timeout, performs the name handshake, and keeps a local
//! [`game::WorldView`] in sync with the server's newline-delimited JSON
//! broadcasts. Steering commands travel the other way as `command` frames.
//!
//! Rendering and input mapping are deliberately not part of this crate;
//! consumers read the view and decide how to present it.

pub mod game;
pub mod network;
