//! Core domain + application logic for the role-watch notifier.
//!
//! This crate is platform-agnostic. The Discord gateway and REST API live
//! behind ports (traits) implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod notifier;

pub use errors::{Error, Result};
