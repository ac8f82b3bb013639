//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the auth, lyrics and service
//! crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
