//! Rialto - a small wiki built on a minimal routing and templating layer
//!
//! Requests are matched against an ordered route table, path captures are
//! resolved into stored entities, and handlers return responses that are
//! rendered as templated HTML, redirects, JSON or raw bytes.

pub mod config;
pub mod errors;
pub mod logger;
pub mod rest;
pub mod server;
pub mod store;
pub mod wiki;

// Re-export commonly used items
pub use config::Config;
pub use errors::WikiError;
pub use logger::Logger;
pub use server::{AppState, app};
pub use store::{EntityStore, MemoryStore};
pub use wiki::Wiki;
