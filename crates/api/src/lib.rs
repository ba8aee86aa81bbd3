//! Coursepath API server library.
//!
//! The binary in `main.rs` only wires configuration, the pool and the
//! background repair task around [`router::build_app_router`].

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
