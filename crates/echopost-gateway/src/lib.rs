//! # EchoPost Gateway
//!
//! Minimal HTTP surface for process supervisors: an unauthenticated
//! liveness route. Not part of the core logic.

pub mod server;

pub use server::{build_router, run};
