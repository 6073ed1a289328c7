// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core protocol types for the session layer.
//!
//! This module defines the security vocabulary (modes, policies, status
//! codes), the endpoint model advertised by servers, the user identity
//! configuration, and the client configuration with its builder.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, UaError};

// =============================================================================
// SecurityMode
// =============================================================================

/// OPC UA message security mode.
///
/// Defines the level of security applied to messages exchanged
/// between client and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No security (messages are neither signed nor encrypted).
    #[default]
    None,

    /// Messages are signed but not encrypted.
    Sign,

    /// Messages are signed and encrypted (most secure).
    SignAndEncrypt,
}

impl SecurityMode {
    /// Returns the OPC UA security mode value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Sign => 2,
            Self::SignAndEncrypt => 3,
        }
    }

    /// Creates from OPC UA security mode value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::None),
            2 => Some(Self::Sign),
            3 => Some(Self::SignAndEncrypt),
            _ => Option::None,
        }
    }

    /// Returns `true` if this mode provides message signing.
    #[inline]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Sign | Self::SignAndEncrypt)
    }

    /// Returns `true` if this mode provides message encryption.
    #[inline]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self, Self::SignAndEncrypt)
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityMode {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" | "nosecurity" => Ok(Self::None),
            "sign" | "signed" => Ok(Self::Sign),
            "signandencrypt" | "signencrypt" | "encrypted" => Ok(Self::SignAndEncrypt),
            _ => Err(UaError::configuration(
                ConfigurationError::invalid_security_mode(s),
            )),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// OPC UA security policy.
///
/// Defines the cryptographic algorithms used for securing messages and
/// user credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security policy (use with SecurityMode::None).
    #[default]
    None,

    /// Basic128Rsa15 (deprecated, for legacy systems).
    Basic128Rsa15,

    /// Basic256 (deprecated, for legacy systems).
    Basic256,

    /// Basic256Sha256 (recommended minimum).
    Basic256Sha256,

    /// Aes128Sha256RsaOaep.
    Aes128Sha256RsaOaep,

    /// Aes256Sha256RsaPss (most secure).
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the OPC UA policy URI.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Returns the asymmetric signature algorithm URI for this policy.
    ///
    /// `None` for the null policy, which cannot sign anything.
    pub const fn asymmetric_signature_algorithm(&self) -> Option<&'static str> {
        match self {
            Self::None => Option::None,
            Self::Basic128Rsa15 | Self::Basic256 => {
                Some("http://www.w3.org/2000/09/xmldsig#rsa-sha1")
            }
            Self::Basic256Sha256 | Self::Aes128Sha256RsaOaep => {
                Some("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256")
            }
            Self::Aes256Sha256RsaPss => {
                Some("http://opcfoundation.org/UA/security/rsa-pss-sha2-256")
            }
        }
    }

    /// Returns the asymmetric encryption algorithm URI for this policy.
    ///
    /// `None` for the null policy, which cannot encrypt anything.
    pub const fn asymmetric_encryption_algorithm(&self) -> Option<&'static str> {
        match self {
            Self::None => Option::None,
            Self::Basic128Rsa15 => Some("http://www.w3.org/2001/04/xmlenc#rsa-1_5"),
            Self::Basic256 | Self::Basic256Sha256 | Self::Aes128Sha256RsaOaep => {
                Some("http://www.w3.org/2001/04/xmlenc#rsa-oaep")
            }
            Self::Aes256Sha256RsaPss => {
                Some("http://opcfoundation.org/UA/security/rsa-oaep-sha2-256")
            }
        }
    }

    /// Returns `true` if this policy is deprecated.
    #[inline]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::Basic128Rsa15 | Self::Basic256)
    }

    /// Returns `true` if certificates are required for this policy.
    #[inline]
    pub const fn requires_certificates(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Creates from URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            s if s.ends_with("#None") => Some(Self::None),
            s if s.ends_with("#Basic128Rsa15") => Some(Self::Basic128Rsa15),
            s if s.ends_with("#Basic256") => Some(Self::Basic256),
            s if s.ends_with("#Basic256Sha256") => Some(Self::Basic256Sha256),
            s if s.contains("Aes128_Sha256_RsaOaep") => Some(Self::Aes128Sha256RsaOaep),
            s if s.contains("Aes256_Sha256_RsaPss") => Some(Self::Aes256Sha256RsaPss),
            _ => Option::None,
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Try URI first
        if let Some(policy) = Self::from_uri(s) {
            return Ok(policy);
        }

        // Try name matching
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "basic128rsa15" | "basic128" => Ok(Self::Basic128Rsa15),
            "basic256" => Ok(Self::Basic256),
            "basic256sha256" => Ok(Self::Basic256Sha256),
            "aes128sha256rsaoaep" | "aes128" => Ok(Self::Aes128Sha256RsaOaep),
            "aes256sha256rsapss" | "aes256" => Ok(Self::Aes256Sha256RsaPss),
            _ => Err(UaError::configuration(
                ConfigurationError::invalid_security_policy(s),
            )),
        }
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA service result code.
///
/// The top two bits carry the severity (good / uncertain / bad); the rest
/// identifies the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// The operation succeeded.
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);

    /// The server has reached its session limit.
    pub const BAD_TOO_MANY_SESSIONS: StatusCode = StatusCode(0x8056_0000);

    /// The session id is not valid.
    pub const BAD_SESSION_ID_INVALID: StatusCode = StatusCode(0x8025_0000);

    /// The session was closed by the server.
    pub const BAD_SESSION_CLOSED: StatusCode = StatusCode(0x8026_0000);

    /// The session has not been activated.
    pub const BAD_SESSION_NOT_ACTIVATED: StatusCode = StatusCode(0x8027_0000);

    /// The user identity token is not valid.
    pub const BAD_IDENTITY_TOKEN_INVALID: StatusCode = StatusCode(0x8020_0000);

    /// The user identity token was rejected.
    pub const BAD_IDENTITY_TOKEN_REJECTED: StatusCode = StatusCode(0x8021_0000);

    /// The user does not have permission to perform the operation.
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);

    /// The nonce is too short or has been used before.
    pub const BAD_NONCE_INVALID: StatusCode = StatusCode(0x8024_0000);

    /// The security policy does not meet the server's requirements.
    pub const BAD_SECURITY_POLICY_REJECTED: StatusCode = StatusCode(0x8055_0000);

    /// The secure channel has been closed.
    pub const BAD_SECURE_CHANNEL_CLOSED: StatusCode = StatusCode(0x8086_0000);

    /// An unexpected error occurred.
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0x4000_0000 != 0 && self.0 & 0x8000_0000 == 0
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        StatusCode(value)
    }
}

// =============================================================================
// UserTokenKind
// =============================================================================

/// Kind of user identity token accepted by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserTokenKind {
    /// Anonymous authentication.
    #[default]
    Anonymous,

    /// Username and password authentication.
    UserName,

    /// X.509 certificate authentication.
    Certificate,

    /// Issued token (e.g., Kerberos, OAuth).
    IssuedToken,
}

impl UserTokenKind {
    /// Returns the type name.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::UserName => "UserName",
            Self::Certificate => "Certificate",
            Self::IssuedToken => "IssuedToken",
        }
    }
}

impl fmt::Display for UserTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

// =============================================================================
// UserTokenPolicy
// =============================================================================

/// A user identity token policy advertised by a server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTokenPolicy {
    /// Server-assigned policy identifier, echoed back in identity tokens.
    pub policy_id: String,

    /// The kind of token this policy accepts.
    pub token_kind: UserTokenKind,

    /// Security policy URI overriding the channel policy for this token,
    /// if the server requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy_uri: Option<String>,
}

impl UserTokenPolicy {
    /// Creates an anonymous token policy.
    pub fn anonymous(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            token_kind: UserTokenKind::Anonymous,
            security_policy_uri: None,
        }
    }

    /// Creates a username/password token policy.
    pub fn user_name(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            token_kind: UserTokenKind::UserName,
            security_policy_uri: None,
        }
    }

    /// Sets a token-specific security policy URI.
    pub fn with_security_policy(mut self, uri: impl Into<String>) -> Self {
        self.security_policy_uri = Some(uri.into());
        self
    }
}

// =============================================================================
// EndpointDescription
// =============================================================================

/// A server-advertised endpoint.
///
/// Combines the endpoint address with the security mode/policy pair the
/// server accepts on it and the user token policies usable over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// Endpoint URL (e.g., "opc.tcp://plant-floor:4840").
    pub endpoint_url: String,

    /// Message security mode for this endpoint.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Security policy URI for this endpoint.
    pub security_policy_uri: String,

    /// User identity token policies accepted on this endpoint.
    #[serde(default)]
    pub user_identity_tokens: Vec<UserTokenPolicy>,

    /// The server's certificate (DER), when security is in use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_certificate: Option<Vec<u8>>,
}

impl EndpointDescription {
    /// Creates a new endpoint description.
    pub fn new(
        endpoint_url: impl Into<String>,
        security_mode: SecurityMode,
        security_policy: &SecurityPolicy,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            security_mode,
            security_policy_uri: security_policy.uri().to_string(),
            user_identity_tokens: Vec::new(),
            server_certificate: None,
        }
    }

    /// Adds a user token policy.
    pub fn with_token_policy(mut self, policy: UserTokenPolicy) -> Self {
        self.user_identity_tokens.push(policy);
        self
    }

    /// Sets the server certificate.
    pub fn with_server_certificate(mut self, der: Vec<u8>) -> Self {
        self.server_certificate = Some(der);
        self
    }

    /// Returns the parsed security policy of this endpoint, if recognized.
    pub fn security_policy(&self) -> Option<SecurityPolicy> {
        SecurityPolicy::from_uri(&self.security_policy_uri)
    }

    /// Looks up the first token policy of the given kind.
    ///
    /// Servers advertise at most one usable policy per token kind; additional
    /// entries of the same kind are ignored.
    pub fn find_token_policy(&self, kind: UserTokenKind) -> Option<&UserTokenPolicy> {
        self.user_identity_tokens
            .iter()
            .find(|p| p.token_kind == kind)
    }

    /// Returns `true` if this endpoint matches the given mode and policy.
    pub fn matches_security(&self, mode: SecurityMode, policy: &SecurityPolicy) -> bool {
        self.security_mode == mode && self.security_policy_uri == policy.uri()
    }
}

// =============================================================================
// IdentityInfo
// =============================================================================

/// End-user identity configuration.
///
/// Both fields absent means anonymous authentication; both present means
/// username/password. A half-specified identity is rejected at token
/// derivation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IdentityInfo {
    /// User name, when authenticating with credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Password, when authenticating with credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl IdentityInfo {
    /// Creates an anonymous identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a username/password identity.
    pub fn user_name(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
            password: Some(password.into()),
        }
    }

    /// Returns `true` if neither user name nor password is present.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.user_name.is_none() && self.password.is_none()
    }

    /// Returns `true` if both user name and password are present.
    #[inline]
    pub fn is_user_name(&self) -> bool {
        self.user_name.is_some() && self.password.is_some()
    }
}

impl fmt::Display for IdentityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_name, &self.password) {
            (None, None) => write!(f, "Anonymous"),
            (Some(user), Some(_)) => write!(f, "UserName({})", user),
            _ => write!(f, "Invalid"),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Session-layer client configuration.
///
/// # Examples
///
/// ```
/// use tether_opcua::types::{ClientConfig, SecurityMode, SecurityPolicy, IdentityInfo};
///
/// // Simple anonymous connection
/// let config = ClientConfig::builder()
///     .application_name("Boiler HMI")
///     .build()
///     .unwrap();
///
/// // Credentials over a secured channel
/// let config = ClientConfig::builder()
///     .application_name("Boiler HMI")
///     .security_mode(SecurityMode::SignAndEncrypt)
///     .security_policy(SecurityPolicy::Basic256Sha256)
///     .identity(IdentityInfo::user_name("operator", "secret"))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application name (used in the application description and in
    /// synthesized application URIs).
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Application URI. When absent it is derived from the client
    /// certificate's subject alternative name, or synthesized from the host
    /// name and application name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_uri: Option<String>,

    /// Product URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uri: Option<String>,

    /// Requested security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Requested security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,

    /// End-user identity presented at session activation.
    #[serde(default)]
    pub identity: IdentityInfo,

    /// Requested session timeout (the server may revise it).
    #[serde(default = "default_session_timeout")]
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Maximum response message size accepted from the server
    /// (0 = no limit).
    #[serde(default)]
    pub max_response_size: u32,

    /// Whether the negotiated endpoint must exist verbatim in the server's
    /// advertised list (URL, mode and policy all matching).
    ///
    /// Setting this to `false` relaxes the match to mode/policy only,
    /// ignoring the URL. That tolerates servers reached by IP address whose
    /// certificate names a host, at the cost of weakening the
    /// certificate-hostname consistency check. Leave it `true` unless the
    /// deployment requires the relaxation.
    #[serde(default = "default_endpoint_must_exist")]
    pub endpoint_must_exist: bool,
}

fn default_application_name() -> String {
    "Tether OPC UA Client".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_millis(20_000)
}

fn default_endpoint_must_exist() -> bool {
    true
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), UaError> {
        if self.application_name.is_empty() {
            return Err(UaError::configuration(ConfigurationError::missing_field(
                "application_name",
            )));
        }

        // Mode and policy must agree on whether security is in use.
        if self.security_mode != SecurityMode::None && self.security_policy == SecurityPolicy::None
        {
            return Err(UaError::configuration(ConfigurationError::invalid_security(
                "Security mode requires a security policy other than None",
            )));
        }

        if self.security_mode == SecurityMode::None && self.security_policy != SecurityPolicy::None
        {
            return Err(UaError::configuration(ConfigurationError::invalid_security(
                "Security policy requires a security mode other than None",
            )));
        }

        if self.session_timeout.is_zero() {
            return Err(UaError::configuration(ConfigurationError::invalid_timeout(
                self.session_timeout,
                "Session timeout must be greater than 0",
            )));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_uri: None,
            product_uri: None,
            security_mode: SecurityMode::default(),
            security_policy: SecurityPolicy::default(),
            identity: IdentityInfo::default(),
            session_timeout: default_session_timeout(),
            max_response_size: 0,
            endpoint_must_exist: default_endpoint_must_exist(),
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    application_name: Option<String>,
    application_uri: Option<String>,
    product_uri: Option<String>,
    security_mode: Option<SecurityMode>,
    security_policy: Option<SecurityPolicy>,
    identity: Option<IdentityInfo>,
    session_timeout: Option<Duration>,
    max_response_size: Option<u32>,
    endpoint_must_exist: Option<bool>,
}

impl ClientConfigBuilder {
    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the application URI.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.application_uri = Some(uri.into());
        self
    }

    /// Sets the product URI.
    pub fn product_uri(mut self, uri: impl Into<String>) -> Self {
        self.product_uri = Some(uri.into());
        self
    }

    /// Sets the requested security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = Some(mode);
        self
    }

    /// Sets the requested security policy.
    pub fn security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy = Some(policy);
        self
    }

    /// Sets the end-user identity.
    pub fn identity(mut self, identity: IdentityInfo) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets username/password credentials.
    pub fn username(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.identity = Some(IdentityInfo::user_name(user_name, password));
        self
    }

    /// Sets the requested session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Sets the maximum accepted response size.
    pub fn max_response_size(mut self, size: u32) -> Self {
        self.max_response_size = Some(size);
        self
    }

    /// Sets whether the negotiated endpoint must exist verbatim.
    ///
    /// See [`ClientConfig::endpoint_must_exist`] for the trust implications
    /// of relaxing this.
    pub fn endpoint_must_exist(mut self, must_exist: bool) -> Self {
        self.endpoint_must_exist = Some(must_exist);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ClientConfig, UaError> {
        let config = ClientConfig {
            application_name: self
                .application_name
                .unwrap_or_else(default_application_name),
            application_uri: self.application_uri,
            product_uri: self.product_uri,
            security_mode: self.security_mode.unwrap_or_default(),
            security_policy: self.security_policy.unwrap_or_default(),
            identity: self.identity.unwrap_or_default(),
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
            max_response_size: self.max_response_size.unwrap_or(0),
            endpoint_must_exist: self.endpoint_must_exist.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_mode() {
        assert!(SecurityMode::Sign.is_signed());
        assert!(SecurityMode::SignAndEncrypt.is_signed());
        assert!(SecurityMode::SignAndEncrypt.is_encrypted());
        assert!(!SecurityMode::None.is_signed());

        assert_eq!(SecurityMode::from_value(3), Some(SecurityMode::SignAndEncrypt));
        assert_eq!(SecurityMode::from_value(9), None);

        assert_eq!("sign".parse::<SecurityMode>().unwrap(), SecurityMode::Sign);
        assert!("bogus".parse::<SecurityMode>().is_err());
    }

    #[test]
    fn test_security_policy_uris() {
        assert_eq!(
            SecurityPolicy::from_uri(SecurityPolicy::Basic256Sha256.uri()),
            Some(SecurityPolicy::Basic256Sha256)
        );
        assert_eq!(SecurityPolicy::from_uri("urn:unknown"), None);

        assert!(SecurityPolicy::None.asymmetric_encryption_algorithm().is_none());
        assert!(SecurityPolicy::None.asymmetric_signature_algorithm().is_none());
        assert_eq!(
            SecurityPolicy::Basic128Rsa15.asymmetric_encryption_algorithm(),
            Some("http://www.w3.org/2001/04/xmlenc#rsa-1_5")
        );
        assert_eq!(
            SecurityPolicy::Basic256Sha256.asymmetric_signature_algorithm(),
            Some("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256")
        );
    }

    #[test]
    fn test_status_code() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_TOO_MANY_SESSIONS.is_bad());
        assert!(!StatusCode::BAD_TOO_MANY_SESSIONS.is_good());
        assert!(StatusCode(0x4000_0000).is_uncertain());
        assert_eq!(format!("{}", StatusCode::BAD_NONCE_INVALID), "0x80240000");
    }

    #[test]
    fn test_identity_info_classification() {
        assert!(IdentityInfo::anonymous().is_anonymous());
        assert!(IdentityInfo::user_name("operator", "secret").is_user_name());

        let half = IdentityInfo {
            user_name: Some("operator".to_string()),
            password: None,
        };
        assert!(!half.is_anonymous());
        assert!(!half.is_user_name());
    }

    #[test]
    fn test_endpoint_token_lookup() {
        let endpoint = EndpointDescription::new(
            "opc.tcp://localhost:4840",
            SecurityMode::None,
            &SecurityPolicy::None,
        )
        .with_token_policy(UserTokenPolicy::anonymous("anon"))
        .with_token_policy(UserTokenPolicy::user_name("user_pw"));

        assert_eq!(
            endpoint
                .find_token_policy(UserTokenKind::Anonymous)
                .map(|p| p.policy_id.as_str()),
            Some("anon")
        );
        assert_eq!(
            endpoint
                .find_token_policy(UserTokenKind::UserName)
                .map(|p| p.policy_id.as_str()),
            Some("user_pw")
        );
        assert!(endpoint.find_token_policy(UserTokenKind::Certificate).is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::builder().build().unwrap();

        assert_eq!(config.session_timeout, Duration::from_millis(20_000));
        assert!(config.endpoint_must_exist);
        assert!(config.identity.is_anonymous());
        assert_eq!(config.security_mode, SecurityMode::None);
    }

    #[test]
    fn test_config_validation() {
        // Mode without policy
        let result = ClientConfig::builder()
            .security_mode(SecurityMode::Sign)
            .build();
        assert!(result.is_err());

        // Policy without mode
        let result = ClientConfig::builder()
            .security_policy(SecurityPolicy::Basic256Sha256)
            .build();
        assert!(result.is_err());

        // Zero timeout
        let result = ClientConfig::builder()
            .session_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ClientConfig::builder()
            .application_name("Press Line 3")
            .security_mode(SecurityMode::SignAndEncrypt)
            .security_policy(SecurityPolicy::Basic256Sha256)
            .username("operator", "secret")
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: ClientConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.application_name, "Press Line 3");
        assert_eq!(restored.security_mode, SecurityMode::SignAndEncrypt);
        assert!(restored.identity.is_user_name());
        assert_eq!(restored.session_timeout, config.session_timeout);
    }
}
