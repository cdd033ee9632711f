//! # og_client
//!
//! Client-side session lifecycle for the OnlyGames auth API: when a token
//! is stored, refreshed or discarded, and how requests react to an expired
//! one.

pub mod error;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use error::{SessionError, StoreError, TransportError};
pub use session::{DEFAULT_REFRESH_INTERVAL, RefreshTask, Session, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
pub use transport::{AuthTransport, DEFAULT_NETWORK_TIMEOUT, HttpTransport};
