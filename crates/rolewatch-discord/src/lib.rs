//! Discord adapter (gateway websocket + REST).
//!
//! Implements the event source over the Discord gateway and the
//! `rolewatch-core` `DirectMessenger` port over the Discord REST API.

pub mod cache;
pub mod gateway;
pub mod rest;
pub mod wire;

pub use gateway::DiscordGateway;
pub use rest::DiscordRest;
