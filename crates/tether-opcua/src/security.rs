// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Security policy resolution and credential protection.
//!
//! This module maps security policy URIs to their cryptographic algorithm
//! sets and exposes the two operations the session layer needs from them:
//! signing the activation proof and encrypting user credentials. The
//! primitives themselves live behind the [`CryptoProvider`] seam; production
//! deployments plug in their crypto stack, tests plug in a reversible
//! double.
//!
//! Nonce rules live here too: a server nonce is acceptable when absent or at
//! least [`MIN_NONCE_LENGTH`] bytes long. Anything shorter invalidates the
//! session that received it.

use std::sync::Arc;

use rand::RngCore;

use crate::error::{IdentityError, UaError, UaResult};
use crate::types::SecurityPolicy;

/// Minimum accepted server nonce length in bytes.
pub const MIN_NONCE_LENGTH: usize = 32;

// =============================================================================
// Nonce Handling
// =============================================================================

/// Generates a fresh client nonce.
pub fn generate_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; MIN_NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Validates a server nonce.
///
/// An empty (absent) nonce is accepted; a present nonce must be at least
/// [`MIN_NONCE_LENGTH`] bytes.
#[inline]
pub fn validate_server_nonce(nonce: &[u8]) -> bool {
    nonce.is_empty() || nonce.len() >= MIN_NONCE_LENGTH
}

// =============================================================================
// Credential Layout
// =============================================================================

/// Builds the plaintext password blob for a username token.
///
/// Layout: a 4-byte little-endian length covering password and nonce,
/// followed by the password bytes, followed by the server nonce.
pub fn password_plaintext(password: &str, server_nonce: &[u8]) -> Vec<u8> {
    let password = password.as_bytes();
    let length = (password.len() + server_nonce.len()) as u32;

    let mut blob = Vec::with_capacity(4 + password.len() + server_nonce.len());
    blob.extend_from_slice(&length.to_le_bytes());
    blob.extend_from_slice(password);
    blob.extend_from_slice(server_nonce);
    blob
}

/// Builds the data a client signs to prove possession of its private key:
/// the server certificate followed by the server nonce.
pub fn activation_signature_payload(server_certificate: &[u8], server_nonce: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(server_certificate.len() + server_nonce.len());
    payload.extend_from_slice(server_certificate);
    payload.extend_from_slice(server_nonce);
    payload
}

// =============================================================================
// PrivateKey
// =============================================================================

/// An opaque private key handle.
///
/// The session layer never inspects key material; it hands the bytes to the
/// [`CryptoProvider`] unchanged.
#[derive(Clone)]
pub struct PrivateKey {
    der: Vec<u8>,
}

impl PrivateKey {
    /// Wraps DER-encoded key material.
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// Returns the raw key bytes.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never reaches logs.
        f.debug_struct("PrivateKey")
            .field("len", &self.der.len())
            .finish()
    }
}

// =============================================================================
// CryptoProvider
// =============================================================================

/// Cryptographic primitive provider.
///
/// Implementations supply the asymmetric operations for each supported
/// security policy. The session layer decides *what* to sign or encrypt;
/// the provider decides *how*.
pub trait CryptoProvider: Send + Sync {
    /// Signs `data` with the client's private key using the policy's
    /// asymmetric signature algorithm.
    fn asymmetric_sign(
        &self,
        policy: &SecurityPolicy,
        key: &PrivateKey,
        data: &[u8],
    ) -> UaResult<Vec<u8>>;

    /// Encrypts `plaintext` with the public key of the given certificate
    /// using the policy's asymmetric encryption algorithm.
    fn asymmetric_encrypt(
        &self,
        policy: &SecurityPolicy,
        certificate_der: &[u8],
        plaintext: &[u8],
    ) -> UaResult<Vec<u8>>;
}

// =============================================================================
// PolicyRegistry
// =============================================================================

/// Resolves security policy URIs to usable algorithm sets.
#[derive(Clone)]
pub struct PolicyRegistry {
    provider: Arc<dyn CryptoProvider>,
}

impl PolicyRegistry {
    /// Creates a registry backed by the given provider.
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Resolves a policy URI.
    ///
    /// Unknown URIs fail with `UnsupportedSecurityPolicy`.
    pub fn resolve(&self, policy_uri: &str) -> UaResult<ResolvedPolicy<'_>> {
        let policy = SecurityPolicy::from_uri(policy_uri).ok_or_else(|| {
            UaError::identity(IdentityError::unsupported_security_policy(policy_uri))
        })?;
        Ok(self.resolve_policy(policy))
    }

    /// Resolves an already-parsed policy.
    pub fn resolve_policy(&self, policy: SecurityPolicy) -> ResolvedPolicy<'_> {
        ResolvedPolicy {
            policy,
            provider: self.provider.as_ref(),
        }
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry").finish()
    }
}

// =============================================================================
// ResolvedPolicy
// =============================================================================

/// A security policy bound to the registry's crypto provider.
pub struct ResolvedPolicy<'a> {
    policy: SecurityPolicy,
    provider: &'a dyn CryptoProvider,
}

impl ResolvedPolicy<'_> {
    /// Returns the underlying policy.
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Returns the asymmetric signature algorithm URI, when the policy has
    /// one.
    pub fn signature_algorithm(&self) -> Option<&'static str> {
        self.policy.asymmetric_signature_algorithm()
    }

    /// Returns the asymmetric encryption algorithm URI, when the policy has
    /// one.
    pub fn encryption_algorithm(&self) -> Option<&'static str> {
        self.policy.asymmetric_encryption_algorithm()
    }

    /// Returns `true` if the policy can encrypt credentials.
    #[inline]
    pub fn supports_asymmetric_encryption(&self) -> bool {
        self.encryption_algorithm().is_some()
    }

    /// Signs `data` with the client's private key.
    ///
    /// Fails with `UnsupportedSecurityPolicy` for the null policy, which has
    /// no signature algorithm.
    pub fn compute_signature(&self, key: &PrivateKey, data: &[u8]) -> UaResult<Vec<u8>> {
        if self.signature_algorithm().is_none() {
            return Err(UaError::identity(
                IdentityError::unsupported_security_policy(self.policy.uri()),
            ));
        }
        self.provider.asymmetric_sign(&self.policy, key, data)
    }

    /// Encrypts `plaintext` with the certificate's public key.
    ///
    /// Fails with `UnsupportedSecurityPolicy` for the null policy, which has
    /// no encryption algorithm.
    pub fn asymmetric_encrypt(
        &self,
        certificate_der: &[u8],
        plaintext: &[u8],
    ) -> UaResult<Vec<u8>> {
        if self.encryption_algorithm().is_none() {
            return Err(UaError::identity(
                IdentityError::unsupported_security_policy(self.policy.uri()),
            ));
        }
        self.provider
            .asymmetric_encrypt(&self.policy, certificate_der, plaintext)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Reversible test double: signing tags the data, encryption XORs with
    /// a key derived from the certificate bytes.
    struct XorCrypto;

    impl CryptoProvider for XorCrypto {
        fn asymmetric_sign(
            &self,
            _policy: &SecurityPolicy,
            key: &PrivateKey,
            data: &[u8],
        ) -> UaResult<Vec<u8>> {
            let mut signature = key.as_der().to_vec();
            signature.extend_from_slice(data);
            Ok(signature)
        }

        fn asymmetric_encrypt(
            &self,
            _policy: &SecurityPolicy,
            certificate_der: &[u8],
            plaintext: &[u8],
        ) -> UaResult<Vec<u8>> {
            Ok(plaintext
                .iter()
                .enumerate()
                .map(|(i, b)| b ^ certificate_der[i % certificate_der.len()])
                .collect())
        }
    }

    fn registry() -> PolicyRegistry {
        PolicyRegistry::new(Arc::new(XorCrypto))
    }

    #[test]
    fn test_nonce_generation() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), MIN_NONCE_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_nonce_validation() {
        assert!(validate_server_nonce(&[]));
        assert!(validate_server_nonce(&[0u8; 32]));
        assert!(validate_server_nonce(&[0u8; 64]));
        assert!(!validate_server_nonce(&[0u8; 31]));
        assert!(!validate_server_nonce(&[0u8; 1]));
    }

    #[test]
    fn test_password_plaintext_layout() {
        let nonce = [7u8; 32];
        let blob = password_plaintext("secret", &nonce);

        let expected_len = ("secret".len() + nonce.len()) as u32;
        assert_eq!(&blob[..4], &expected_len.to_le_bytes());
        assert_eq!(&blob[4..10], b"secret");
        assert_eq!(&blob[10..], &nonce);
    }

    #[test]
    fn test_registry_resolution() {
        let registry = registry();

        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic128Rsa15,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
            SecurityPolicy::Aes128Sha256RsaOaep,
            SecurityPolicy::Aes256Sha256RsaPss,
        ] {
            let resolved = registry.resolve(policy.uri()).unwrap();
            assert_eq!(resolved.policy(), &policy);
        }

        assert!(registry.resolve("urn:not-a-policy").is_err());
    }

    #[test]
    fn test_null_policy_has_no_algorithms() {
        let registry = registry();
        let resolved = registry.resolve_policy(SecurityPolicy::None);

        assert!(!resolved.supports_asymmetric_encryption());
        assert!(resolved
            .compute_signature(&PrivateKey::from_der(vec![1]), b"data")
            .is_err());
        assert!(resolved.asymmetric_encrypt(b"cert", b"data").is_err());
    }

    #[test]
    fn test_encrypt_round_trip() {
        let registry = registry();
        let resolved = registry.resolve_policy(SecurityPolicy::Basic256Sha256);

        let cert = b"certificate-bytes";
        let plaintext = password_plaintext("secret", &[9u8; 32]);
        let encrypted = resolved.asymmetric_encrypt(cert, &plaintext).unwrap();
        assert_ne!(encrypted, plaintext);

        // XOR twice restores the plaintext.
        let decrypted: Vec<u8> = encrypted
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ cert[i % cert.len()])
            .collect();
        assert_eq!(decrypted, plaintext);
    }
}
