//! # Authentication Module
//!
//! PKCE login and credential lifecycle for a single OAuth provider.
//!
//! ## Overview
//!
//! - [`CredentialVault`] persists the credential and the pending PKCE
//!   verifier through the host's secure store
//! - [`OAuthFlowController`] runs the authorization-code flow with a one-shot
//!   callback listener and a login timeout
//! - [`TokenLifecycleManager`] checks expiry, refreshes inline and signs out
//!   when a refresh is rejected
//!
//! Auth state transitions are published on the core event bus as
//! `CoreEvent::Auth`.

pub mod error;
mod listener;
pub mod manager;
pub mod oauth;
pub mod pkce;
pub mod types;
pub mod vault;

pub use error::{AuthError, Result};
pub use manager::TokenLifecycleManager;
pub use oauth::{extract_authorization_code, OAuthConfig, OAuthFlowController, TokenEndpoint};
pub use types::{
    AuthorizationUrl, CallbackOutcome, Credential, FlowState, PendingAuthorization, VaultKey,
};
pub use vault::CredentialVault;
