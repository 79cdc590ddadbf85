//! Klyra parking API server library.
//!
//! Exposes config, state, the parking engine, routes and background
//! monitors so the binary and integration tests share one wiring.

pub mod auth;
pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
