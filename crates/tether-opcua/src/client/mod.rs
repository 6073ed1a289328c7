// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session-layer client implementation.
//!
//! This module owns the client-side session machinery:
//!
//! - **Endpoint Negotiation**: strict and relaxed matching against the
//!   server's advertised endpoints
//! - **Session Management**: the create → activate → close lifecycle
//! - **Identity Derivation**: anonymous and username/password tokens
//! - **Recovery**: re-activation and republish after channel loss
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Client                                 │
//! │        (session collection, lifecycle orchestration)            │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                    │                      │
//!            ▼                    ▼                      ▼
//! ┌──────────────────┐ ┌───────────────────┐ ┌─────────────────────┐
//! │ resolve_endpoint │ │ derive_identity_  │ │  resume_sessions    │
//! │  (negotiation)   │ │ token (factory)   │ │  (recovery pass)    │
//! └──────────────────┘ └───────────────────┘ └─────────────────────┘
//!            │                    │                      │
//!            └────────────────────┼──────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       SecureChannel                             │
//! │              (external transport, one per client)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_opcua::client::{resume_sessions, Client};
//! use tether_opcua::types::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .application_name("Boiler HMI")
//!     .build()?;
//!
//! let client = Arc::new(Client::new(config, channel, certificates, registry));
//! client.set_server_endpoints(discovered).await;
//!
//! let session = client.create_session().await?;
//! client.activate_session(&session).await?;
//!
//! // ... channel drops and comes back ...
//! client.suspend_sessions().await;
//! let report = resume_sessions(&client, &publish).await;
//! report.into_result()?;
//! ```

mod endpoint;
mod identity;
mod manager;
mod reconnect;
mod session;

pub use endpoint::resolve_endpoint;
pub use identity::derive_identity_token;
pub use manager::Client;
pub use reconnect::{resume_sessions, ReconnectReport};
pub use session::{ClientId, Session, SessionState, SessionStats};
