//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `lyrics-workspace` and
//! enable `desktop-shims` to get `core-service` with the reqwest HTTP client
//! and keyring secure store wired in.

#[cfg(feature = "desktop-shims")]
pub use core_service;
