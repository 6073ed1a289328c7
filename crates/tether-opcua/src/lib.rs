// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session establishment and resilience layer for OPC UA clients.
//!
//! This crate negotiates a secure application-level session over an
//! already-established secure channel, derives and protects user
//! credentials according to the server's advertised security policies, and
//! recovers sessions (and their subscriptions, via republish) after a
//! transport interruption.
//!
//! The secure channel itself, message encoding, the address space and the
//! subscription engine are external collaborators reached through traits;
//! see the [`service`] module.
//!
//! # Features
//!
//! - Endpoint negotiation with strict and relaxed matching
//! - Session create / activate / close lifecycle
//! - Anonymous and username/password identity tokens, with nonce-based
//!   password encryption
//! - Concurrent per-session recovery after channel re-establishment
//!
//! # Error Handling
//!
//! This crate provides a comprehensive error hierarchy through the
//! [`error`] module:
//!
//! ```text
//! UaError
//! ├── Channel       - Secure channel availability and transactions
//! ├── Endpoint      - Endpoint negotiation failures
//! ├── Session       - Session lifecycle errors
//! ├── Identity      - Identity token derivation errors
//! └── Configuration - Invalid settings
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_opcua::{Client, ClientConfig, IdentityInfo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .application_name("Boiler HMI")
//!         .username("operator", "secret")
//!         .build()?;
//!
//!     let client = Arc::new(Client::new(config, channel, certificates, registry));
//!     client.set_server_endpoints(discovered_endpoints).await;
//!
//!     let session = client.create_session().await?;
//!     client.activate_session(&session).await?;
//!
//!     // The session is now usable for application requests.
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod security;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use error::{
    ChannelError, ConfigurationError, EndpointError, ErrorCode, ErrorSeverity, IdentityError,
    SessionError, UaError, UaResult,
};

pub use types::{
    ClientConfig, ClientConfigBuilder, EndpointDescription, IdentityInfo, SecurityMode,
    SecurityPolicy, StatusCode, UserTokenKind, UserTokenPolicy,
};

pub use security::{
    generate_nonce, validate_server_nonce, CryptoProvider, PolicyRegistry, PrivateKey,
    MIN_NONCE_LENGTH,
};

pub use service::{
    ActivateSessionRequest, ActivateSessionResponse, ApplicationDescription, CertificateStore,
    CloseSessionRequest, CloseSessionResponse, CreateSessionRequest, CreateSessionResponse,
    EmptyCertificateStore, IdentityToken, PublishEngine, RequestHeader, SecureChannel,
    ServiceRequest, ServiceResponse, SignatureData,
};

pub use client::{
    derive_identity_token, resolve_endpoint, resume_sessions, Client, ClientId, ReconnectReport,
    Session, SessionState, SessionStats,
};
