//! Adapters exposing the engine through the host's updater hooks
//!
//! # Modules
//!
//! - [`updater`]: Update transient merge and plugin details record

pub mod updater;
