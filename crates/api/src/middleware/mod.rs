//! Request extractors for authentication and role checks.
//!
//! - [`auth::AuthUser`] -- the caller behind a Bearer token.
//! - [`rbac::RequireAdmin`] -- operators only.
//! - [`rbac::RequireSensor`] -- sensor gateways (or operators).

pub mod auth;
pub mod rbac;
