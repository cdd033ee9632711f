//! # og_core
//!
//! Core authentication domain logic for OnlyGames: password hashing, token
//! issuance and verification, the authorization gate, and the credential
//! store boundary.

pub mod auth;
pub mod config;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
