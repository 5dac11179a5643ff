//! API handlers

pub mod gremlin;
pub mod health;
