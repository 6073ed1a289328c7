// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session records and the session state machine.
//!
//! A [`Session`] is one authenticated application-level conversation with a
//! server. It is created by a successful CreateSession exchange, becomes
//! usable after ActivateSession, survives channel loss in the `Suspended`
//! state, and ends with CloseSession.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::service::SignatureData;
use crate::types::EndpointDescription;

// =============================================================================
// SessionState
// =============================================================================

/// State of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists yet.
    #[default]
    Unestablished,

    /// CreateSession succeeded; the session is not yet authenticated.
    Created,

    /// ActivateSession succeeded; the session is usable.
    Active,

    /// The transport channel was lost; the session awaits re-activation.
    Suspended,

    /// The session is closed. Terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` if the session is active and ready for use.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the session can be re-activated.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Created | Self::Active | Self::Suspended)
    }

    /// Returns `true` if the session is closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unestablished => write!(f, "Unestablished"),
            Self::Created => write!(f, "Created"),
            Self::Active => write!(f, "Active"),
            Self::Suspended => write!(f, "Suspended"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// =============================================================================
// ClientId
// =============================================================================

/// Identity of a client instance, used for session ownership bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generates a fresh client id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns a short prefix for session names and logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Authenticated server-side state of a session.
#[derive(Debug, Clone)]
struct SessionStateData {
    /// Lifecycle state.
    lifecycle: SessionState,

    /// Server-assigned session identifier.
    session_id: String,

    /// Opaque authentication token tagging subsequent requests.
    authentication_token: String,

    /// Server-revised session timeout.
    revised_timeout: Duration,

    /// Latest server nonce (empty = absent).
    server_nonce: Vec<u8>,

    /// Server certificate (DER).
    server_certificate: Option<Vec<u8>>,

    /// Server's signature from the create exchange.
    server_signature: SignatureData,

    /// The endpoint this session was negotiated against.
    endpoint: EndpointDescription,

    /// The client currently owning this session.
    owner: ClientId,
}

/// One application-level session.
///
/// All state transitions on a session are serialized through its transition
/// lock; concurrent activation and close on the same session cannot
/// interleave. Reads see a consistent snapshot via the inner `RwLock`.
pub struct Session {
    /// Client-generated name, unique within the owning client.
    name: String,

    /// Serializes create/activate/reactivate/close on this session.
    transition: Mutex<()>,

    /// Shared session state.
    state: RwLock<SessionStateData>,
}

impl Session {
    /// Builds a session record from a successful create exchange.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn created(
        name: String,
        session_id: String,
        authentication_token: String,
        revised_timeout: Duration,
        server_nonce: Vec<u8>,
        server_certificate: Option<Vec<u8>>,
        server_signature: SignatureData,
        endpoint: EndpointDescription,
        owner: ClientId,
    ) -> Self {
        Self {
            name,
            transition: Mutex::new(()),
            state: RwLock::new(SessionStateData {
                lifecycle: SessionState::Created,
                session_id,
                authentication_token,
                revised_timeout,
                server_nonce,
                server_certificate,
                server_signature,
                endpoint,
                owner,
            }),
        }
    }

    /// Returns the session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state.
    pub async fn lifecycle(&self) -> SessionState {
        self.state.read().await.lifecycle
    }

    /// Returns the server-assigned session id.
    pub async fn session_id(&self) -> String {
        self.state.read().await.session_id.clone()
    }

    /// Returns the authentication token.
    pub async fn authentication_token(&self) -> String {
        self.state.read().await.authentication_token.clone()
    }

    /// Returns the server-revised session timeout.
    pub async fn revised_timeout(&self) -> Duration {
        self.state.read().await.revised_timeout
    }

    /// Returns the latest server nonce (empty = absent).
    pub async fn server_nonce(&self) -> Vec<u8> {
        self.state.read().await.server_nonce.clone()
    }

    /// Returns the server certificate, when one was provided.
    pub async fn server_certificate(&self) -> Option<Vec<u8>> {
        self.state.read().await.server_certificate.clone()
    }

    /// Returns the server's create-exchange signature.
    pub async fn server_signature(&self) -> SignatureData {
        self.state.read().await.server_signature.clone()
    }

    /// Returns the endpoint this session was negotiated against.
    pub async fn endpoint(&self) -> EndpointDescription {
        self.state.read().await.endpoint.clone()
    }

    /// Returns the id of the client currently owning this session.
    pub async fn owner(&self) -> ClientId {
        self.state.read().await.owner
    }

    /// Acquires the transition lock.
    ///
    /// Held for the whole of any lifecycle transition on this session.
    pub(crate) async fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().await
    }

    /// Commits a successful activation: the fresh server nonce is swapped
    /// in and the session becomes active. Called only after the exchange
    /// and nonce validation both succeeded.
    pub(crate) async fn commit_activated(&self, server_nonce: Vec<u8>) {
        let mut state = self.state.write().await;
        state.server_nonce = server_nonce;
        state.lifecycle = SessionState::Active;
    }

    /// Transfers ownership to another client.
    pub(crate) async fn set_owner(&self, owner: ClientId) {
        self.state.write().await.owner = owner;
    }

    /// Marks the session suspended after channel loss.
    pub(crate) async fn mark_suspended(&self) {
        let mut state = self.state.write().await;
        if state.lifecycle == SessionState::Active {
            state.lifecycle = SessionState::Suspended;
        }
    }

    /// Marks the session closed.
    pub(crate) async fn mark_closed(&self) {
        self.state.write().await.lifecycle = SessionState::Closed;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("name", &self.name).finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Statistics for session lifecycle operations.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Number of sessions created.
    creations: AtomicU64,

    /// Number of session activations (including re-activations).
    activations: AtomicU64,

    /// Number of sessions adopted from another client.
    reactivations: AtomicU64,

    /// Number of sessions closed.
    closes: AtomicU64,

    /// Number of failed lifecycle operations.
    failures: AtomicU64,
}

impl SessionStats {
    /// Creates new session statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a session creation.
    pub fn record_creation(&self) {
        self.creations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session activation.
    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session adoption.
    pub fn record_reactivation(&self) {
        self.reactivations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session close.
    pub fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed lifecycle operation.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of sessions created.
    pub fn creations(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    /// Returns the number of activations.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Returns the number of adoptions.
    pub fn reactivations(&self) -> u64 {
        self.reactivations.load(Ordering::Relaxed)
    }

    /// Returns the number of closes.
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }

    /// Returns the number of failures.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SecurityMode, SecurityPolicy};

    fn endpoint() -> EndpointDescription {
        EndpointDescription::new(
            "opc.tcp://localhost:4840",
            SecurityMode::None,
            &SecurityPolicy::None,
        )
    }

    fn session(owner: ClientId) -> Session {
        Session::created(
            "session-1".to_string(),
            "ns=1;i=42".to_string(),
            "auth-token".to_string(),
            Duration::from_secs(20),
            vec![1u8; 32],
            None,
            SignatureData::null(),
            endpoint(),
            owner,
        )
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::Active.is_active());
        assert!(!SessionState::Created.is_active());

        assert!(SessionState::Created.is_recoverable());
        assert!(SessionState::Active.is_recoverable());
        assert!(SessionState::Suspended.is_recoverable());
        assert!(!SessionState::Closed.is_recoverable());
        assert!(!SessionState::Unestablished.is_recoverable());

        assert!(SessionState::Closed.is_closed());
        assert_eq!(SessionState::default(), SessionState::Unestablished);
    }

    #[tokio::test]
    async fn test_session_lifecycle_transitions() {
        let owner = ClientId::generate();
        let session = session(owner);

        assert_eq!(session.lifecycle().await, SessionState::Created);
        assert_eq!(session.owner().await, owner);

        session.commit_activated(vec![2u8; 32]).await;
        assert_eq!(session.lifecycle().await, SessionState::Active);
        assert_eq!(session.server_nonce().await, vec![2u8; 32]);

        session.mark_suspended().await;
        assert_eq!(session.lifecycle().await, SessionState::Suspended);

        session.commit_activated(vec![3u8; 32]).await;
        assert_eq!(session.lifecycle().await, SessionState::Active);

        session.mark_closed().await;
        assert_eq!(session.lifecycle().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_suspend_only_touches_active_sessions() {
        let session = session(ClientId::generate());

        // A created-but-never-activated session stays created.
        session.mark_suspended().await;
        assert_eq!(session.lifecycle().await, SessionState::Created);
    }

    #[tokio::test]
    async fn test_ownership_transfer() {
        let first = ClientId::generate();
        let second = ClientId::generate();
        let session = session(first);

        session.set_owner(second).await;
        assert_eq!(session.owner().await, second);
    }

    #[test]
    fn test_client_id_short() {
        let id = ClientId::generate();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_session_stats() {
        let stats = SessionStats::new();

        stats.record_creation();
        stats.record_activation();
        stats.record_activation();
        stats.record_reactivation();
        stats.record_close();
        stats.record_failure();

        assert_eq!(stats.creations(), 1);
        assert_eq!(stats.activations(), 2);
        assert_eq!(stats.reactivations(), 1);
        assert_eq!(stats.closes(), 1);
        assert_eq!(stats.failures(), 1);
    }
}
