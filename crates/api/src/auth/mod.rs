//! Bearer-token authentication.
//!
//! Tokens are issued by the account service; this server only validates
//! them. See [`jwt`].

pub mod jwt;
