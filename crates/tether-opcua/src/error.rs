// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session-layer error types with comprehensive diagnostics.
//!
//! This module provides a rich error type hierarchy for session
//! establishment and recovery, designed for:
//!
//! - **Extensibility**: Easy to add new error variants
//! - **Diagnostics**: Detailed error information for debugging
//! - **Recovery**: Hints for error recovery strategies
//!
//! # Error Categories
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
//! # Examples
//!
//! ```
//! use tether_opcua::error::{UaError, ChannelError, ErrorSeverity};
//!
//! let error = UaError::channel(ChannelError::NotOpen);
//!
//! assert!(error.is_retryable());
//! for hint in error.recovery_hints() {
//!     println!("Hint: {}", hint);
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::StatusCode;

/// Result alias for session-layer operations.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// UaError - Main Error Type
// =============================================================================

/// The main error type for session-layer operations.
///
/// This enum categorizes errors by their domain, making it easy to handle
/// specific error types while maintaining a unified interface.
#[derive(Debug, Error)]
pub enum UaError {
    /// Secure channel errors.
    #[error("{0}")]
    Channel(#[from] ChannelError),

    /// Endpoint negotiation errors.
    #[error("{0}")]
    Endpoint(#[from] EndpointError),

    /// Session lifecycle errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Identity token derivation errors.
    #[error("{0}")]
    Identity(#[from] IdentityError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl UaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a channel error.
    #[inline]
    pub fn channel(error: ChannelError) -> Self {
        Self::Channel(error)
    }

    /// Creates an endpoint error.
    #[inline]
    pub fn endpoint(error: EndpointError) -> Self {
        Self::Endpoint(error)
    }

    /// Creates a session error.
    #[inline]
    pub fn session(error: SessionError) -> Self {
        Self::Session(error)
    }

    /// Creates an identity error.
    #[inline]
    pub fn identity(error: IdentityError) -> Self {
        Self::Identity(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a channel-not-open error.
    pub fn no_channel() -> Self {
        Self::Channel(ChannelError::NotOpen)
    }

    /// Creates an endpoint mismatch error.
    pub fn endpoint_mismatch(endpoint_url: impl Into<String>) -> Self {
        Self::Endpoint(EndpointError::mismatch(endpoint_url))
    }

    /// Creates an invalid server nonce error.
    pub fn invalid_server_nonce(length: usize) -> Self {
        Self::Session(SessionError::InvalidServerNonce { length })
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable.
    ///
    /// Retryable errors are transient conditions that a later reconnection
    /// pass may clear. Nothing in this layer retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Channel(e) => e.is_retryable(),
            Self::Endpoint(_) => false,
            Self::Session(e) => e.is_retryable(),
            Self::Identity(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Returns the suggested retry delay for this error.
    ///
    /// Returns `None` if the error is not retryable.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::Channel(e) => e.suggested_retry_delay(),
            Self::Session(e) => e.suggested_retry_delay(),
            _ => None,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Channel(e) => e.severity(),
            Self::Endpoint(e) => e.severity(),
            Self::Session(e) => e.severity(),
            Self::Identity(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel",
            Self::Endpoint(_) => "endpoint",
            Self::Session(_) => "session",
            Self::Identity(_) => "identity",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Channel(e) => e.error_code(),
            Self::Endpoint(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Identity(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Channel(e) => e.recovery_hints(),
            Self::Endpoint(e) => e.recovery_hints(),
            Self::Session(e) => e.recovery_hints(),
            Self::Identity(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Channel(e) => e.user_message(),
            Self::Endpoint(e) => e.user_message(),
            Self::Session(e) => e.user_message(),
            Self::Identity(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let level = self.tracing_level();
        let code = self.error_code();

        match level {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ChannelError
// =============================================================================

/// Secure channel errors.
///
/// The channel itself (connect, reconnect, framing) lives below this layer;
/// these variants cover its availability as seen from session operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No secure channel is currently open.
    #[error("Secure channel is not open")]
    NotOpen,

    /// A message transaction failed at the transport level.
    #[error("Transaction failed on channel to '{endpoint_url}': {message}")]
    TransactionFailed {
        /// Channel endpoint URL.
        endpoint_url: String,
        /// Error message.
        message: String,
    },

    /// The channel was lost while a request was in flight.
    #[error("Secure channel lost while '{operation}' was in flight")]
    LostInFlight {
        /// The operation that was interrupted.
        operation: &'static str,
    },
}

impl ChannelError {
    /// Creates a transaction failed error.
    pub fn transaction_failed(
        endpoint_url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TransactionFailed {
            endpoint_url: endpoint_url.into(),
            message: message.into(),
        }
    }

    /// Creates a lost-in-flight error.
    pub fn lost_in_flight(operation: &'static str) -> Self {
        Self::LostInFlight { operation }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        // Channel loss is exactly what a reconnection pass recovers from.
        true
    }

    /// Returns the suggested retry delay.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::NotOpen => Some(Duration::from_secs(1)),
            Self::TransactionFailed { .. } => Some(Duration::from_millis(500)),
            Self::LostInFlight { .. } => Some(Duration::from_secs(1)),
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotOpen => ErrorCode::new(1, 1),
            Self::TransactionFailed { .. } => ErrorCode::new(1, 2),
            Self::LostInFlight { .. } => ErrorCode::new(1, 3),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NotOpen => vec![
                "Wait for the transport layer to re-establish the channel",
                "Check network connectivity to the server",
            ],
            Self::TransactionFailed { .. } => vec![
                "Check server availability",
                "Inspect transport-layer logs for the underlying failure",
            ],
            Self::LostInFlight { .. } => vec![
                "The session will be re-activated on the next reconnection pass",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotOpen => "보안 채널이 연결되어 있지 않습니다".to_string(),
            Self::TransactionFailed { .. } => "요청 처리 중 통신 오류가 발생했습니다".to_string(),
            Self::LostInFlight { .. } => "요청 중 연결이 끊어졌습니다".to_string(),
        }
    }
}

// =============================================================================
// EndpointError
// =============================================================================

/// Endpoint negotiation errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// No advertised endpoint matched the requested URL, security mode and
    /// policy.
    #[error("No endpoint matching '{endpoint_url}' with the requested security settings")]
    Mismatch {
        /// The URL that was requested.
        endpoint_url: String,
    },

    /// The server advertised no endpoints at all.
    #[error("Server advertised no endpoints")]
    NoneAdvertised,
}

impl EndpointError {
    /// Creates an endpoint mismatch error.
    pub fn mismatch(endpoint_url: impl Into<String>) -> Self {
        Self::Mismatch {
            endpoint_url: endpoint_url.into(),
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Mismatch { .. } => ErrorCode::new(2, 1),
            Self::NoneAdvertised => ErrorCode::new(2, 2),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Mismatch { .. } => vec![
                "Check the endpoint URL, security mode and policy against the server's advertised endpoints",
                "Relax the match with endpoint_must_exist = false if the server is reached by IP address",
            ],
            Self::NoneAdvertised => vec![
                "Verify the discovery endpoint",
                "Check server configuration",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Mismatch { .. } => "일치하는 엔드포인트를 찾을 수 없습니다".to_string(),
            Self::NoneAdvertised => "서버가 엔드포인트를 제공하지 않습니다".to_string(),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server has reached its session limit.
    #[error("Maximum number of sessions exceeded on server")]
    TooManySessions,

    /// The server rejected session creation.
    #[error("Session creation rejected by server (status {status})")]
    CreationRejected {
        /// The service result returned by the server.
        status: StatusCode,
    },

    /// The server rejected session activation.
    #[error("Session activation rejected by server (status {status})")]
    ActivationRejected {
        /// The service result returned by the server.
        status: StatusCode,
    },

    /// The server returned a nonce shorter than the minimum.
    #[error("Server nonce is {length} bytes, expected at least 32 or none")]
    InvalidServerNonce {
        /// Length of the offending nonce.
        length: usize,
    },

    /// The session is not present in its client's collection.
    #[error("Session '{name}' not found in the client's session collection")]
    NotFound {
        /// Session name.
        name: String,
    },

    /// The session is owned by an unexpected client.
    #[error("Session '{name}' is owned by another client")]
    WrongOwner {
        /// Session name.
        name: String,
    },
}

impl SessionError {
    /// Creates a creation rejected error.
    pub fn creation_rejected(status: StatusCode) -> Self {
        Self::CreationRejected { status }
    }

    /// Creates an activation rejected error.
    pub fn activation_rejected(status: StatusCode) -> Self {
        Self::ActivationRejected { status }
    }

    /// Creates a session not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a wrong owner error.
    pub fn wrong_owner(name: impl Into<String>) -> Self {
        Self::WrongOwner { name: name.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManySessions | Self::ActivationRejected { .. }
        )
    }

    /// Returns the suggested retry delay.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::TooManySessions => Some(Duration::from_secs(5)),
            Self::ActivationRejected { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TooManySessions => ErrorSeverity::Warning,
            Self::InvalidServerNonce { .. } => ErrorSeverity::Critical,
            Self::NotFound { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TooManySessions => ErrorCode::new(3, 1),
            Self::CreationRejected { .. } => ErrorCode::new(3, 2),
            Self::ActivationRejected { .. } => ErrorCode::new(3, 3),
            Self::InvalidServerNonce { .. } => ErrorCode::new(3, 4),
            Self::NotFound { .. } => ErrorCode::new(3, 5),
            Self::WrongOwner { .. } => ErrorCode::new(3, 6),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::TooManySessions => vec![
                "Close unused sessions",
                "Check server session limits",
                "Contact server administrator",
            ],
            Self::CreationRejected { .. } => vec![
                "Inspect the status code against the server logs",
                "Verify the application description and certificate",
            ],
            Self::ActivationRejected { .. } => vec![
                "Verify user credentials",
                "Check security policy compatibility",
                "Ensure the client certificate is trusted by the server",
            ],
            Self::InvalidServerNonce { .. } => vec![
                "The session must not be used; create a new one",
                "Report the server's nonce handling to its vendor",
            ],
            Self::NotFound { .. } => vec!["The session was already closed or never created"],
            Self::WrongOwner { .. } => vec![
                "Reactivate the session onto this client before using it",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::TooManySessions => "서버 세션 한도 초과".to_string(),
            Self::CreationRejected { status } => {
                format!("세션 생성이 거부되었습니다 (상태 {})", status)
            }
            Self::ActivationRejected { status } => {
                format!("세션 활성화가 거부되었습니다 (상태 {})", status)
            }
            Self::InvalidServerNonce { .. } => "서버 논스가 유효하지 않습니다".to_string(),
            Self::NotFound { .. } => "세션을 찾을 수 없습니다".to_string(),
            Self::WrongOwner { .. } => "세션이 다른 클라이언트에 속해 있습니다".to_string(),
        }
    }
}

// =============================================================================
// IdentityError
// =============================================================================

/// Identity token derivation errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity info is neither anonymous nor complete credentials.
    #[error("Identity info must carry either no credentials or both user name and password")]
    InvalidIdentityInfo,

    /// The endpoint advertises no token policy for the requested kind.
    #[error("Endpoint advertises no '{token_kind}' token policy")]
    NoMatchingTokenPolicy {
        /// The token kind that was looked up.
        token_kind: &'static str,
    },

    /// The effective security policy cannot protect the token.
    #[error("Security policy '{policy_uri}' cannot be used for identity tokens")]
    UnsupportedSecurityPolicy {
        /// The offending policy URI.
        policy_uri: String,
    },

    /// The server certificate needed for password encryption is missing.
    #[error("Endpoint carries no server certificate to encrypt credentials with")]
    MissingServerCertificate,
}

impl IdentityError {
    /// Creates a no-matching-token-policy error.
    pub fn no_matching_token_policy(token_kind: &'static str) -> Self {
        Self::NoMatchingTokenPolicy { token_kind }
    }

    /// Creates an unsupported security policy error.
    pub fn unsupported_security_policy(policy_uri: impl Into<String>) -> Self {
        Self::UnsupportedSecurityPolicy {
            policy_uri: policy_uri.into(),
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidIdentityInfo => ErrorSeverity::Error,
            Self::NoMatchingTokenPolicy { .. } => ErrorSeverity::Error,
            Self::UnsupportedSecurityPolicy { .. } => ErrorSeverity::Error,
            Self::MissingServerCertificate => ErrorSeverity::Critical,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidIdentityInfo => ErrorCode::new(4, 1),
            Self::NoMatchingTokenPolicy { .. } => ErrorCode::new(4, 2),
            Self::UnsupportedSecurityPolicy { .. } => ErrorCode::new(4, 3),
            Self::MissingServerCertificate => ErrorCode::new(4, 4),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidIdentityInfo => vec![
                "Provide both user name and password, or neither",
            ],
            Self::NoMatchingTokenPolicy { .. } => vec![
                "Check the token kinds the endpoint advertises",
                "Pick an endpoint that accepts the configured identity",
            ],
            Self::UnsupportedSecurityPolicy { .. } => vec![
                "Check the token policy's security policy URI",
                "Use a policy with asymmetric encryption support (Basic256Sha256 recommended)",
            ],
            Self::MissingServerCertificate => vec![
                "Re-run endpoint discovery to obtain the server certificate",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidIdentityInfo => "사용자 인증 정보가 올바르지 않습니다".to_string(),
            Self::NoMatchingTokenPolicy { .. } => "일치하는 토큰 정책이 없습니다".to_string(),
            Self::UnsupportedSecurityPolicy { policy_uri } => {
                format!("지원되지 않는 보안 정책: {}", policy_uri)
            }
            Self::MissingServerCertificate => "서버 인증서가 없습니다".to_string(),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required field is missing.
    #[error("Missing required configuration field: {field}")]
    MissingField {
        /// The missing field.
        field: &'static str,
    },

    /// The security mode string is not recognized.
    #[error("Invalid security mode: '{value}'")]
    InvalidSecurityMode {
        /// The offending value.
        value: String,
    },

    /// The security policy string is not recognized.
    #[error("Invalid security policy: '{value}'")]
    InvalidSecurityPolicy {
        /// The offending value.
        value: String,
    },

    /// Mode and policy disagree on whether security is in use.
    #[error("Invalid security configuration: {message}")]
    InvalidSecurity {
        /// Explanation.
        message: String,
    },

    /// A timeout value is out of range.
    #[error("Invalid timeout {timeout:?}: {message}")]
    InvalidTimeout {
        /// The offending timeout.
        timeout: Duration,
        /// Explanation.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates a missing field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid security mode error.
    pub fn invalid_security_mode(value: impl Into<String>) -> Self {
        Self::InvalidSecurityMode {
            value: value.into(),
        }
    }

    /// Creates an invalid security policy error.
    pub fn invalid_security_policy(value: impl Into<String>) -> Self {
        Self::InvalidSecurityPolicy {
            value: value.into(),
        }
    }

    /// Creates an invalid security combination error.
    pub fn invalid_security(message: impl Into<String>) -> Self {
        Self::InvalidSecurity {
            message: message.into(),
        }
    }

    /// Creates an invalid timeout error.
    pub fn invalid_timeout(timeout: Duration, message: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            timeout,
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::new(5, 1),
            Self::InvalidSecurityMode { .. } => ErrorCode::new(5, 2),
            Self::InvalidSecurityPolicy { .. } => ErrorCode::new(5, 3),
            Self::InvalidSecurity { .. } => ErrorCode::new(5, 4),
            Self::InvalidTimeout { .. } => ErrorCode::new(5, 5),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::MissingField { .. } => vec!["Add the missing field to the configuration"],
            Self::InvalidSecurityMode { .. } => {
                vec!["Use one of: none, sign, sign_and_encrypt"]
            }
            Self::InvalidSecurityPolicy { .. } => {
                vec!["Use a known policy name or its full URI"]
            }
            Self::InvalidSecurity { .. } => vec![
                "Set mode and policy together (both None, or both secured)",
            ],
            Self::InvalidTimeout { .. } => vec!["Use a timeout greater than zero"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField { field } => format!("필수 설정 누락: {}", field),
            Self::InvalidSecurityMode { value } => {
                format!("유효하지 않은 보안 모드: {}", value)
            }
            Self::InvalidSecurityPolicy { value } => {
                format!("유효하지 않은 보안 정책: {}", value)
            }
            Self::InvalidSecurity { .. } => "보안 설정이 올바르지 않습니다".to_string(),
            Self::InvalidTimeout { .. } => "유효하지 않은 타임아웃 값입니다".to_string(),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity classification for errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, operation may proceed.
    Info,

    /// Degraded but recoverable.
    Warning,

    /// Operation failed.
    Error,

    /// Operation failed and the affected object must not be used.
    Critical,
}

impl ErrorSeverity {
    /// Converts to the corresponding tracing level.
    pub fn to_tracing_level(&self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Compact error identifier: a domain and a code within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Error domain (1 = channel, 2 = endpoint, 3 = session, 4 = identity,
    /// 5 = configuration).
    pub domain: u8,

    /// Code within the domain.
    pub code: u16,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(domain: u8, code: u16) -> Self {
        Self { domain, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:01}{:03}", self.domain, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique_per_domain() {
        assert_eq!(ChannelError::NotOpen.error_code(), ErrorCode::new(1, 1));
        assert_eq!(
            EndpointError::mismatch("opc.tcp://x").error_code(),
            ErrorCode::new(2, 1)
        );
        assert_eq!(
            SessionError::TooManySessions.error_code(),
            ErrorCode::new(3, 1)
        );
        assert_eq!(
            IdentityError::InvalidIdentityInfo.error_code(),
            ErrorCode::new(4, 1)
        );
        assert_eq!(format!("{}", ErrorCode::new(3, 4)), "E3004");
    }

    #[test]
    fn test_retryability() {
        assert!(UaError::no_channel().is_retryable());
        assert!(UaError::session(SessionError::TooManySessions).is_retryable());
        assert!(!UaError::endpoint(EndpointError::mismatch("opc.tcp://x")).is_retryable());
        assert!(!UaError::identity(IdentityError::InvalidIdentityInfo).is_retryable());
        assert!(!UaError::session(SessionError::InvalidServerNonce { length: 4 }).is_retryable());
    }

    #[test]
    fn test_severity() {
        assert_eq!(
            UaError::session(SessionError::InvalidServerNonce { length: 4 }).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(UaError::no_channel().severity(), ErrorSeverity::Warning);
        assert_eq!(
            UaError::configuration(ConfigurationError::missing_field("endpoint")).severity(),
            ErrorSeverity::Critical
        );
        assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
    }

    #[test]
    fn test_display_messages() {
        let error = UaError::session(SessionError::creation_rejected(
            StatusCode::BAD_SECURITY_POLICY_REJECTED,
        ));
        let text = format!("{}", error);
        assert!(text.contains("0x80550000"));

        let error = UaError::identity(IdentityError::no_matching_token_policy("UserName"));
        assert!(format!("{}", error).contains("UserName"));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(UaError::no_channel().category(), "channel");
        assert_eq!(
            UaError::session(SessionError::TooManySessions).category(),
            "session"
        );
        assert_eq!(
            UaError::identity(IdentityError::InvalidIdentityInfo).category(),
            "identity"
        );
    }

    #[test]
    fn test_recovery_hints_nonempty() {
        let errors: Vec<UaError> = vec![
            UaError::no_channel(),
            UaError::endpoint_mismatch("opc.tcp://plant:4840"),
            UaError::session(SessionError::TooManySessions),
            UaError::invalid_server_nonce(7),
            UaError::identity(IdentityError::InvalidIdentityInfo),
            UaError::configuration(ConfigurationError::missing_field("application_name")),
        ];

        for error in errors {
            assert!(!error.recovery_hints().is_empty(), "{error}");
            assert!(!error.user_message().is_empty(), "{error}");
        }
    }
}
