// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Resolution, validation and scheduling for socketry
//!
//! This crate turns declared modules into wiring plans: it binds sockets
//! to beans, rejects eager construction cycles and schedules module builds
//! across a workspace whose modules depend on each other.

pub mod config;
pub mod resolve;
pub mod resolved;
pub mod store;

pub use config::BuildConfig;
pub use resolve::*;
pub use resolved::ResolvedModule;
pub use store::{CompiledModuleStore, EmptyStore, InMemoryStore};
