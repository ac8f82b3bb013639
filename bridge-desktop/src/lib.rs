//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` using the `keyring` crate
//! - `SecureStore` kept in process memory, for ephemeral sessions and tests
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{KeyringSecureStore, ReqwestHttpClient};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let secure_store = KeyringSecureStore::new();
//! ```

mod http;
mod memory_store;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use memory_store::InMemorySecureStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
