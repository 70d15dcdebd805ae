//! Project collaboration invites: library crate.
//!
//! The binary (`collabd`) and the integration tests in `tests/` both build
//! on these modules.

pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod errors;
pub mod invites;
pub mod membership;
pub mod models;
pub mod notification;
pub mod store;
