// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle management.
//!
//! The [`Client`] owns a collection of sessions established over one secure
//! channel and drives their lifecycle: endpoint negotiation, CreateSession,
//! ActivateSession, adoption of sessions from another client, and
//! CloseSession.
//!
//! Authenticated state is always computed into a local value first and
//! committed to the shared session record only after the exchange and the
//! nonce validation both succeed; a failed operation leaves the record
//! exactly as it was.

use std::collections::HashMap;
use std::process::Command;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::endpoint::resolve_endpoint;
use crate::client::identity::derive_identity_token;
use crate::client::session::{ClientId, Session, SessionStats};
use crate::error::{ChannelError, SessionError, UaError, UaResult};
use crate::security::{activation_signature_payload, generate_nonce, validate_server_nonce, PolicyRegistry};
use crate::service::{
    ActivateSessionRequest, ApplicationDescription, CertificateStore, CloseSessionRequest,
    CreateSessionRequest, RequestHeader, SecureChannel, ServiceRequest, ServiceResponse,
    SignatureData,
};
use crate::types::{ClientConfig, EndpointDescription, SecurityPolicy, StatusCode};

/// Returns the machine's short host name for synthesized application URIs.
fn host_name() -> String {
    Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

// =============================================================================
// Client
// =============================================================================

/// A session-layer client bound to one secure channel.
///
/// Multiple sessions can be established from the same client; their
/// recovery after channel loss runs concurrently, while each individual
/// session's transitions stay serialized.
pub struct Client {
    /// Client instance identity, used for session ownership.
    id: ClientId,

    /// Configuration.
    config: ClientConfig,

    /// The secure channel sessions ride on.
    channel: Arc<dyn SecureChannel>,

    /// Certificate and key material.
    certificates: Arc<dyn CertificateStore>,

    /// Security policy registry.
    registry: PolicyRegistry,

    /// The endpoint chosen by negotiation, once resolved.
    endpoint: RwLock<Option<EndpointDescription>>,

    /// Endpoints the server is known to advertise.
    known_endpoints: RwLock<Vec<EndpointDescription>>,

    /// Sessions owned by this client, keyed by session name.
    sessions: RwLock<HashMap<String, Arc<Session>>>,

    /// Counter for generated session names.
    session_counter: AtomicU64,

    /// Counter for request handles.
    request_handle: AtomicU32,

    /// Lifecycle statistics.
    stats: SessionStats,
}

impl Client {
    /// Creates a new client on the given channel.
    pub fn new(
        config: ClientConfig,
        channel: Arc<dyn SecureChannel>,
        certificates: Arc<dyn CertificateStore>,
        registry: PolicyRegistry,
    ) -> Self {
        Self {
            id: ClientId::generate(),
            config,
            channel,
            certificates,
            registry,
            endpoint: RwLock::new(None),
            known_endpoints: RwLock::new(Vec::new()),
            sessions: RwLock::new(HashMap::new()),
            session_counter: AtomicU64::new(0),
            request_handle: AtomicU32::new(0),
            stats: SessionStats::new(),
        }
    }

    /// Returns this client's identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the channel's endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        self.channel.endpoint_url()
    }

    /// Returns the lifecycle statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Seeds the advertised endpoint list (normally from discovery).
    pub async fn set_server_endpoints(&self, endpoints: Vec<EndpointDescription>) {
        *self.known_endpoints.write().await = endpoints;
    }

    /// Returns a snapshot of the sessions this client owns.
    pub async fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Returns the number of sessions this client owns.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Looks up a session by name.
    pub async fn session(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(name).cloned()
    }

    // =========================================================================
    // Endpoint Negotiation
    // =========================================================================

    /// Resolves the endpoint to establish sessions against and stores it.
    ///
    /// Uses the channel's URL and the configured security mode/policy; see
    /// [`resolve_endpoint`] for the strict and relaxed match semantics.
    pub async fn negotiate_endpoint(&self) -> UaResult<EndpointDescription> {
        let known = self.known_endpoints.read().await;
        let resolved = resolve_endpoint(
            &known,
            self.channel.endpoint_url(),
            self.config.security_mode,
            &self.config.security_policy,
            self.config.endpoint_must_exist,
        )?
        .clone();
        drop(known);

        *self.endpoint.write().await = Some(resolved.clone());
        Ok(resolved)
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Creates a new session.
    ///
    /// Negotiates an endpoint first when none is resolved yet. The returned
    /// session is created but not yet authenticated; call
    /// [`activate_session`](Self::activate_session) next.
    pub async fn create_session(&self) -> UaResult<Arc<Session>> {
        if !self.channel.is_open() {
            return Err(UaError::channel(ChannelError::NotOpen));
        }

        let resolved_endpoint = self.endpoint.read().await.clone();
        let endpoint = match resolved_endpoint {
            Some(endpoint) => endpoint,
            None => self.negotiate_endpoint().await?,
        };

        let session_name = self.next_session_name();
        let client_nonce = generate_nonce();
        let request = CreateSessionRequest {
            header: RequestHeader::new(self.next_request_handle()),
            client_description: self.application_description(),
            server_uri: String::new(),
            endpoint_url: endpoint.endpoint_url.clone(),
            session_name: session_name.clone(),
            client_nonce,
            client_certificate: self.certificates.client_certificate(),
            requested_session_timeout: self.config.session_timeout,
            max_response_message_size: self.config.max_response_size,
        };

        let response = match self
            .channel
            .perform_transaction(ServiceRequest::CreateSession(request))
            .await?
        {
            ServiceResponse::CreateSession(response) => response,
            other => return Err(unexpected_response("CreateSession", &other, self.channel.endpoint_url())),
        };

        if response.service_result == StatusCode::BAD_TOO_MANY_SESSIONS {
            self.stats.record_failure();
            return Err(UaError::session(SessionError::TooManySessions));
        }
        if !response.service_result.is_good() {
            self.stats.record_failure();
            return Err(UaError::session(SessionError::creation_rejected(
                response.service_result,
            )));
        }

        if !validate_server_nonce(&response.server_nonce) {
            self.stats.record_failure();
            return Err(UaError::invalid_server_nonce(response.server_nonce.len()));
        }

        // The response's endpoint list is fresher than anything discovery
        // produced earlier.
        if !response.server_endpoints.is_empty() {
            *self.known_endpoints.write().await = response.server_endpoints.clone();
        }

        let session_id = response.session_id.clone();
        let revised_timeout = response.revised_session_timeout;
        let server_certificate = response
            .server_certificate
            .or_else(|| endpoint.server_certificate.clone());

        let session = Arc::new(Session::created(
            session_name.clone(),
            response.session_id,
            response.authentication_token,
            revised_timeout,
            response.server_nonce,
            server_certificate,
            response.server_signature,
            endpoint,
            self.id,
        ));

        self.sessions
            .write()
            .await
            .insert(session_name.clone(), Arc::clone(&session));
        self.stats.record_creation();

        tracing::info!(
            session_name = %session_name,
            session_id = %session_id,
            revised_timeout_ms = revised_timeout.as_millis() as u64,
            "Session created"
        );

        Ok(session)
    }

    /// Activates a session owned by this client.
    ///
    /// Builds the activation proof (signature over server certificate and
    /// nonce) and the identity token from the configured identity, then
    /// commits the fresh server nonce on success.
    pub async fn activate_session(&self, session: &Arc<Session>) -> UaResult<()> {
        let _guard = session.begin_transition().await;

        if session.owner().await != self.id {
            return Err(UaError::session(SessionError::wrong_owner(session.name())));
        }

        self.activate_locked(session).await
    }

    /// Adopts a session from another client and re-activates it here.
    ///
    /// Valid only when `current_owner` actually owns the session and both
    /// clients target the same endpoint URL; a URL mismatch is a contract
    /// violation, not a recoverable condition. On success the session moves
    /// atomically from the old owner's collection into this client's; on
    /// failure ownership is untouched.
    pub async fn reactivate_session(
        &self,
        session: &Arc<Session>,
        current_owner: &Client,
    ) -> UaResult<()> {
        if current_owner.id == self.id {
            return Err(UaError::session(SessionError::wrong_owner(session.name())));
        }

        let _guard = session.begin_transition().await;

        if session.owner().await != current_owner.id {
            return Err(UaError::session(SessionError::wrong_owner(session.name())));
        }

        if current_owner.channel.endpoint_url() != self.channel.endpoint_url() {
            return Err(UaError::endpoint_mismatch(self.channel.endpoint_url()));
        }

        self.activate_locked(session).await?;

        // Relocate between the two collections without a window where the
        // session is in neither or both. Lock order is by client id.
        let name = session.name().to_string();
        {
            let (mut first, mut second) = if self.id < current_owner.id {
                let a = self.sessions.write().await;
                let b = current_owner.sessions.write().await;
                (a, b)
            } else {
                let b = current_owner.sessions.write().await;
                let a = self.sessions.write().await;
                (a, b)
            };
            second.remove(&name);
            first.insert(name.clone(), Arc::clone(session));
        }
        session.set_owner(self.id).await;
        self.stats.record_reactivation();

        tracing::info!(
            session_name = %name,
            previous_owner = %current_owner.id,
            new_owner = %self.id,
            "Session adopted"
        );

        Ok(())
    }

    /// Runs the activation exchange. Caller holds the transition lock.
    async fn activate_locked(&self, session: &Arc<Session>) -> UaResult<()> {
        if !self.channel.is_open() {
            return Err(UaError::channel(ChannelError::NotOpen));
        }

        let endpoint = session.endpoint().await;
        let server_nonce = session.server_nonce().await;
        let channel_policy = self.channel.security_policy();

        let client_signature = self
            .activation_signature(session, &server_nonce, &channel_policy)
            .await?;

        let token = derive_identity_token(
            &endpoint,
            &channel_policy,
            &self.config.identity,
            &server_nonce,
            &self.registry,
        )?;

        let request = ActivateSessionRequest {
            header: RequestHeader::new(self.next_request_handle()),
            authentication_token: session.authentication_token().await,
            client_signature,
            client_software_certificates: Vec::new(),
            locale_ids: Vec::new(),
            user_identity_token: token,
            user_token_signature: SignatureData::null(),
        };

        let response = match self
            .channel
            .perform_transaction(ServiceRequest::ActivateSession(request))
            .await
        {
            Ok(ServiceResponse::ActivateSession(response)) => response,
            Ok(other) => {
                self.stats.record_failure();
                return Err(unexpected_response("ActivateSession", &other, self.channel.endpoint_url()));
            }
            Err(error) => {
                self.stats.record_failure();
                return Err(error);
            }
        };

        if !response.service_result.is_good() {
            self.stats.record_failure();
            return Err(UaError::session(SessionError::activation_rejected(
                response.service_result,
            )));
        }

        // The exchange succeeded, but a short nonce still poisons the
        // session: it must not be used.
        if !validate_server_nonce(&response.server_nonce) {
            self.stats.record_failure();
            return Err(UaError::invalid_server_nonce(response.server_nonce.len()));
        }

        session.commit_activated(response.server_nonce).await;
        self.stats.record_activation();

        tracing::info!(
            session_name = %session.name(),
            "Session activated"
        );

        Ok(())
    }

    /// Closes a session and removes it from this client's collection.
    ///
    /// The removal is authoritative locally: it happens even when the
    /// server's answer is bad or the exchange itself fails. Closing a
    /// session this client no longer holds fails cleanly with a not-found
    /// error.
    pub async fn close_session(
        &self,
        session: &Arc<Session>,
        delete_subscriptions: bool,
    ) -> UaResult<StatusCode> {
        if !self.channel.is_open() {
            return Err(UaError::channel(ChannelError::NotOpen));
        }

        let _guard = session.begin_transition().await;

        let name = session.name().to_string();
        if !self.sessions.read().await.contains_key(&name) {
            return Err(UaError::session(SessionError::not_found(name)));
        }

        let request = CloseSessionRequest {
            header: RequestHeader::new(self.next_request_handle()),
            authentication_token: session.authentication_token().await,
            delete_subscriptions,
        };

        let result = self
            .channel
            .perform_transaction(ServiceRequest::CloseSession(request))
            .await;

        self.sessions.write().await.remove(&name);
        session.mark_closed().await;
        self.stats.record_close();

        tracing::info!(session_name = %name, "Session closed");

        match result {
            Ok(ServiceResponse::CloseSession(response)) => Ok(response.service_result),
            Ok(other) => Err(unexpected_response("CloseSession", &other, self.channel.endpoint_url())),
            Err(error) => Err(error),
        }
    }

    /// Marks every active session suspended after channel loss.
    pub async fn suspend_sessions(&self) {
        let sessions = self.sessions().await;
        for session in &sessions {
            session.mark_suspended().await;
        }

        tracing::warn!(
            sessions = sessions.len(),
            "Channel lost; sessions suspended"
        );
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Builds the client signature for an activation exchange.
    ///
    /// Unsecured channels send the null signature.
    async fn activation_signature(
        &self,
        session: &Arc<Session>,
        server_nonce: &[u8],
        channel_policy: &SecurityPolicy,
    ) -> UaResult<SignatureData> {
        if *channel_policy == SecurityPolicy::None {
            return Ok(SignatureData::null());
        }

        let resolved = self.registry.resolve_policy(channel_policy.clone());
        let server_certificate = session.server_certificate().await.unwrap_or_default();
        let payload = activation_signature_payload(&server_certificate, server_nonce);
        let key = self.certificates.private_key()?;
        let signature = resolved.compute_signature(&key, &payload)?;

        // compute_signature succeeding implies the algorithm exists.
        Ok(SignatureData::new(
            resolved.signature_algorithm().unwrap_or_default(),
            signature,
        ))
    }

    /// Builds the application description sent in CreateSession.
    fn application_description(&self) -> ApplicationDescription {
        let application_uri = self
            .certificates
            .application_uri()
            .or_else(|| self.config.application_uri.clone())
            .unwrap_or_else(|| {
                format!(
                    "urn:{}:{}",
                    host_name(),
                    self.config.application_name.replace(' ', "")
                )
            });

        let product_uri = self
            .config
            .product_uri
            .clone()
            .unwrap_or_else(|| {
                format!("urn:tether:{}", self.config.application_name.replace(' ', ""))
            });

        ApplicationDescription {
            application_uri,
            product_uri,
            application_name: self.config.application_name.clone(),
        }
    }

    /// Generates the next session name.
    fn next_session_name(&self) -> String {
        let n = self.session_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-session-{}", self.id.short(), n)
    }

    /// Returns the next request handle.
    fn next_request_handle(&self) -> u32 {
        self.request_handle.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("endpoint_url", &self.channel.endpoint_url())
            .finish()
    }
}

/// Maps a response of the wrong service type onto a channel error.
fn unexpected_response(expected: &str, got: &ServiceResponse, endpoint_url: &str) -> UaError {
    let got = match got {
        ServiceResponse::CreateSession(_) => "CreateSession",
        ServiceResponse::ActivateSession(_) => "ActivateSession",
        ServiceResponse::CloseSession(_) => "CloseSession",
    };
    UaError::channel(ChannelError::transaction_failed(
        endpoint_url,
        format!("expected {expected} response, got {got}"),
    ))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::EmptyCertificateStore;
    use crate::types::SecurityMode;
    use async_trait::async_trait;

    /// Channel that is never open; lifecycle calls must fail fast.
    struct ClosedChannel;

    #[async_trait]
    impl SecureChannel for ClosedChannel {
        fn endpoint_url(&self) -> &str {
            "opc.tcp://plant-floor:4840"
        }

        fn security_mode(&self) -> SecurityMode {
            SecurityMode::None
        }

        fn security_policy(&self) -> SecurityPolicy {
            SecurityPolicy::None
        }

        fn is_open(&self) -> bool {
            false
        }

        async fn perform_transaction(
            &self,
            _request: ServiceRequest,
        ) -> UaResult<ServiceResponse> {
            unreachable!("closed channel never transacts")
        }
    }

    struct NoCrypto;

    impl crate::security::CryptoProvider for NoCrypto {
        fn asymmetric_sign(
            &self,
            _policy: &SecurityPolicy,
            _key: &crate::security::PrivateKey,
            data: &[u8],
        ) -> UaResult<Vec<u8>> {
            Ok(data.to_vec())
        }

        fn asymmetric_encrypt(
            &self,
            _policy: &SecurityPolicy,
            _certificate_der: &[u8],
            plaintext: &[u8],
        ) -> UaResult<Vec<u8>> {
            Ok(plaintext.to_vec())
        }
    }

    fn client() -> Client {
        Client::new(
            ClientConfig::builder()
                .application_name("Unit Test Client")
                .build()
                .unwrap(),
            Arc::new(ClosedChannel),
            Arc::new(EmptyCertificateStore),
            PolicyRegistry::new(Arc::new(NoCrypto)),
        )
    }

    #[test]
    fn test_session_names_are_unique_and_monotonic() {
        let client = client();

        let first = client.next_session_name();
        let second = client.next_session_name();

        assert_ne!(first, second);
        assert!(first.ends_with("-session-1"));
        assert!(second.ends_with("-session-2"));
        assert!(first.starts_with(&client.id().short()));
    }

    #[test]
    fn test_application_description_synthesis() {
        let client = client();
        let description = client.application_description();

        // No certificate and no configured URI: synthesized from host and
        // application name, whitespace stripped.
        assert!(description.application_uri.starts_with("urn:"));
        assert!(description.application_uri.ends_with(":UnitTestClient"));
        assert_eq!(description.application_name, "Unit Test Client");
    }

    #[test]
    fn test_configured_application_uri_wins() {
        let client = Client::new(
            ClientConfig::builder()
                .application_name("Unit Test Client")
                .application_uri("urn:configured:client")
                .build()
                .unwrap(),
            Arc::new(ClosedChannel),
            Arc::new(EmptyCertificateStore),
            PolicyRegistry::new(Arc::new(NoCrypto)),
        );

        assert_eq!(
            client.application_description().application_uri,
            "urn:configured:client"
        );
    }

    #[tokio::test]
    async fn test_create_requires_open_channel() {
        let client = client();
        client
            .set_server_endpoints(vec![EndpointDescription::new(
                "opc.tcp://plant-floor:4840",
                SecurityMode::None,
                &SecurityPolicy::None,
            )])
            .await;

        let result = client.create_session().await;
        assert!(matches!(
            result,
            Err(UaError::Channel(ChannelError::NotOpen))
        ));
    }

    #[tokio::test]
    async fn test_negotiation_without_endpoints_fails() {
        let client = client();
        assert!(client.negotiate_endpoint().await.is_err());
    }
}
