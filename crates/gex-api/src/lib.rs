//! Gremlin Explorer API - HTTP server
//!
//! Splits a submission into statements, runs them against the graph
//! endpoint in order and returns one entry per statement.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_router, ApiDoc};
