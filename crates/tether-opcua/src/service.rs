// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Abstract session services and collaborator seams.
//!
//! The session layer talks to the outside world through the traits defined
//! here: the [`SecureChannel`] that carries request/response round trips,
//! the [`CertificateStore`] that owns key material, and the
//! [`PublishEngine`] that replays missed notifications after recovery.
//!
//! Service messages are plain structs; encoding them onto the wire is the
//! transport's concern, not ours.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::UaResult;
use crate::security::PrivateKey;
use crate::types::{EndpointDescription, SecurityMode, SecurityPolicy, StatusCode};

// =============================================================================
// RequestHeader
// =============================================================================

/// Common header carried by every service request.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    /// Client timestamp at request creation.
    pub timestamp: DateTime<Utc>,

    /// Client-assigned handle correlating request and response.
    pub request_handle: u32,
}

impl RequestHeader {
    /// Creates a header stamped with the current time.
    pub fn new(request_handle: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            request_handle,
        }
    }
}

// =============================================================================
// ApplicationDescription
// =============================================================================

/// Describes the client application to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescription {
    /// Globally unique application URI.
    pub application_uri: String,

    /// Product URI.
    pub product_uri: String,

    /// Human-readable application name.
    pub application_name: String,
}

// =============================================================================
// SignatureData
// =============================================================================

/// A signature together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureData {
    /// Signature algorithm URI; absent for the null signature.
    pub algorithm: Option<String>,

    /// Signature bytes; empty for the null signature.
    pub signature: Vec<u8>,
}

impl SignatureData {
    /// Creates a signature value.
    pub fn new(algorithm: impl Into<String>, signature: Vec<u8>) -> Self {
        Self {
            algorithm: Some(algorithm.into()),
            signature,
        }
    }

    /// The null signature, sent when the channel has no security.
    pub fn null() -> Self {
        Self::default()
    }

    /// Returns `true` if this is the null signature.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.algorithm.is_none() && self.signature.is_empty()
    }
}

// =============================================================================
// IdentityToken
// =============================================================================

/// User identity token presented at session activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityToken {
    /// Anonymous identity.
    Anonymous {
        /// The endpoint token policy this token satisfies.
        policy_id: String,
    },

    /// Username with an encrypted password.
    UserName {
        /// The user name, in the clear.
        user_name: String,
        /// Password blob encrypted with the server's public key.
        password: Vec<u8>,
        /// URI of the encryption algorithm that protected the password.
        encryption_algorithm: String,
        /// The endpoint token policy this token satisfies.
        policy_id: String,
    },
}

impl IdentityToken {
    /// Returns the policy id this token was derived against.
    pub fn policy_id(&self) -> &str {
        match self {
            Self::Anonymous { policy_id } => policy_id,
            Self::UserName { policy_id, .. } => policy_id,
        }
    }

    /// Returns `true` for the anonymous token.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous { .. })
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous { policy_id } => write!(f, "Anonymous(policy {})", policy_id),
            Self::UserName { user_name, .. } => write!(f, "UserName({})", user_name),
        }
    }
}

// =============================================================================
// CreateSession
// =============================================================================

/// Request to create a session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    /// Common request header.
    pub header: RequestHeader,

    /// Client application description.
    pub client_description: ApplicationDescription,

    /// URI of the server the client believes it is talking to.
    pub server_uri: String,

    /// The endpoint URL the channel is connected to.
    pub endpoint_url: String,

    /// Client-chosen session name, unique within the client.
    pub session_name: String,

    /// Fresh client nonce (32 bytes).
    pub client_nonce: Vec<u8>,

    /// Client certificate (DER), when one is configured.
    pub client_certificate: Option<Vec<u8>>,

    /// Requested session timeout; the server may revise it.
    pub requested_session_timeout: Duration,

    /// Maximum response message size the client accepts (0 = no limit).
    pub max_response_message_size: u32,
}

/// Response to a CreateSession request.
#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    /// Server-assigned session identifier.
    pub session_id: String,

    /// Opaque token tagging all subsequent requests on this session.
    pub authentication_token: String,

    /// Server-revised session timeout.
    pub revised_session_timeout: Duration,

    /// Server nonce for the activation signature.
    pub server_nonce: Vec<u8>,

    /// Server certificate (DER).
    pub server_certificate: Option<Vec<u8>>,

    /// Server's signature over client certificate and nonce.
    pub server_signature: SignatureData,

    /// The endpoints the server advertises, echoed for consistency checks.
    pub server_endpoints: Vec<EndpointDescription>,

    /// Service result.
    pub service_result: StatusCode,
}

// =============================================================================
// ActivateSession
// =============================================================================

/// Request to activate (or re-activate) a session.
#[derive(Debug, Clone)]
pub struct ActivateSessionRequest {
    /// Common request header.
    pub header: RequestHeader,

    /// Authentication token of the session being activated.
    pub authentication_token: String,

    /// Signature over (server certificate ‖ server nonce) with the client's
    /// private key.
    pub client_signature: SignatureData,

    /// Software certificates; empty in the minimum conformant request.
    pub client_software_certificates: Vec<Vec<u8>>,

    /// Locale ids; empty in the minimum conformant request.
    pub locale_ids: Vec<String>,

    /// The user identity token.
    pub user_identity_token: IdentityToken,

    /// Signature produced with the identity token's own credentials;
    /// null for the token kinds supported here.
    pub user_token_signature: SignatureData,
}

/// Response to an ActivateSession request.
#[derive(Debug, Clone)]
pub struct ActivateSessionResponse {
    /// Fresh server nonce for the next activation.
    pub server_nonce: Vec<u8>,

    /// Service result.
    pub service_result: StatusCode,
}

// =============================================================================
// CloseSession
// =============================================================================

/// Request to close a session.
#[derive(Debug, Clone)]
pub struct CloseSessionRequest {
    /// Common request header.
    pub header: RequestHeader,

    /// Authentication token of the session being closed.
    pub authentication_token: String,

    /// Whether the server should delete the session's subscriptions.
    pub delete_subscriptions: bool,
}

/// Response to a CloseSession request.
#[derive(Debug, Clone)]
pub struct CloseSessionResponse {
    /// Service result.
    pub service_result: StatusCode,
}

// =============================================================================
// ServiceRequest / ServiceResponse
// =============================================================================

/// A session-service request submitted to the secure channel.
#[derive(Debug, Clone)]
pub enum ServiceRequest {
    /// CreateSession service.
    CreateSession(CreateSessionRequest),

    /// ActivateSession service.
    ActivateSession(ActivateSessionRequest),

    /// CloseSession service.
    CloseSession(CloseSessionRequest),
}

impl ServiceRequest {
    /// Returns the service name for logging.
    pub const fn service_name(&self) -> &'static str {
        match self {
            Self::CreateSession(_) => "CreateSession",
            Self::ActivateSession(_) => "ActivateSession",
            Self::CloseSession(_) => "CloseSession",
        }
    }
}

/// A session-service response received from the secure channel.
#[derive(Debug, Clone)]
pub enum ServiceResponse {
    /// CreateSession service.
    CreateSession(CreateSessionResponse),

    /// ActivateSession service.
    ActivateSession(ActivateSessionResponse),

    /// CloseSession service.
    CloseSession(CloseSessionResponse),
}

// =============================================================================
// SecureChannel Trait
// =============================================================================

/// The secure channel the session layer rides on.
///
/// Channel establishment, reconnection and message framing are the
/// transport's responsibility; the session layer only needs the channel's
/// identity, its readiness, and a way to run one request/response round
/// trip. A round trip fails (rather than hangs) when the channel is lost
/// mid-flight.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; independent sessions run their
/// round trips concurrently on the same channel.
#[async_trait]
pub trait SecureChannel: Send + Sync {
    /// Returns the endpoint URL this channel is connected to.
    fn endpoint_url(&self) -> &str;

    /// Returns the channel's message security mode.
    fn security_mode(&self) -> SecurityMode;

    /// Returns the channel's negotiated security policy.
    fn security_policy(&self) -> SecurityPolicy;

    /// Returns `true` if the channel is currently open.
    fn is_open(&self) -> bool;

    /// Performs one request/response round trip.
    async fn perform_transaction(&self, request: ServiceRequest) -> UaResult<ServiceResponse>;
}

// =============================================================================
// CertificateStore Trait
// =============================================================================

/// Holds the client's certificate and private key.
///
/// Loading and validation happen elsewhere; the session layer only reads.
pub trait CertificateStore: Send + Sync {
    /// Returns the client certificate (DER), when one is configured.
    fn client_certificate(&self) -> Option<Vec<u8>>;

    /// Returns the client's private key.
    fn private_key(&self) -> UaResult<PrivateKey>;

    /// Returns the application URI from the certificate's subject
    /// alternative name, when a certificate is configured.
    fn application_uri(&self) -> Option<String>;
}

/// A certificate store with no certificate, for anonymous clients on
/// unsecured channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCertificateStore;

impl CertificateStore for EmptyCertificateStore {
    fn client_certificate(&self) -> Option<Vec<u8>> {
        None
    }

    fn private_key(&self) -> UaResult<PrivateKey> {
        Ok(PrivateKey::from_der(Vec::new()))
    }

    fn application_uri(&self) -> Option<String> {
        None
    }
}

// =============================================================================
// PublishEngine Trait
// =============================================================================

/// The subscription engine's recovery surface.
///
/// After a session is re-activated the orchestrator asks the engine to
/// replay notifications the client missed during the outage.
#[async_trait]
pub trait PublishEngine: Send + Sync {
    /// Requests republish of missed notifications for the given session.
    async fn republish(&self, session_id: &str) -> UaResult<()>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_data() {
        let null = SignatureData::null();
        assert!(null.is_null());

        let signed = SignatureData::new("http://www.w3.org/2000/09/xmldsig#rsa-sha1", vec![1, 2]);
        assert!(!signed.is_null());
    }

    #[test]
    fn test_identity_token_policy_id() {
        let token = IdentityToken::Anonymous {
            policy_id: "anon".to_string(),
        };
        assert_eq!(token.policy_id(), "anon");
        assert!(token.is_anonymous());

        let token = IdentityToken::UserName {
            user_name: "operator".to_string(),
            password: vec![1, 2, 3],
            encryption_algorithm: "http://www.w3.org/2001/04/xmlenc#rsa-oaep".to_string(),
            policy_id: "user_pw".to_string(),
        };
        assert_eq!(token.policy_id(), "user_pw");
        assert!(!token.is_anonymous());

        // Password bytes never appear in display output.
        assert_eq!(format!("{}", token), "UserName(operator)");
    }

    #[test]
    fn test_service_names() {
        let request = ServiceRequest::CloseSession(CloseSessionRequest {
            header: RequestHeader::new(1),
            authentication_token: "tok".to_string(),
            delete_subscriptions: true,
        });
        assert_eq!(request.service_name(), "CloseSession");
    }
}
