//! Core logic for the Telegram group message cleaner.
//!
//! This crate is framework-agnostic. The Telegram session and the terminal live
//! behind ports (traits) implemented in the adapter and binary crates.

pub mod config;
pub mod deleter;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod logging;
pub mod ports;
pub mod ranking;
pub mod selection;
pub mod throttled;
pub mod workflow;

pub use errors::{Error, Result};
