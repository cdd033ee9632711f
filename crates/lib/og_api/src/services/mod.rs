//! Service layer between handlers and `og_core`.

pub mod auth;
