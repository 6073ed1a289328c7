// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity token derivation.
//!
//! Turns the configured [`IdentityInfo`] into the [`IdentityToken`] the
//! server expects, honoring the endpoint's advertised token policies and
//! the effective security policy. Passwords are encrypted against the
//! server certificate with the policy's asymmetric encryption algorithm;
//! they never leave this module in the clear.

use crate::error::{IdentityError, UaError, UaResult};
use crate::security::{password_plaintext, PolicyRegistry};
use crate::service::IdentityToken;
use crate::types::{EndpointDescription, IdentityInfo, SecurityPolicy, UserTokenKind};

/// Derives the identity token for a session activation.
///
/// Classification of `identity`: no credentials means anonymous, full
/// credentials mean username/password, anything in between is rejected.
///
/// For username tokens the effective security policy is the token policy's
/// own URI when it names one (an unknown URI is an error, not a fallback),
/// otherwise the channel's negotiated policy.
pub fn derive_identity_token(
    endpoint: &EndpointDescription,
    channel_policy: &SecurityPolicy,
    identity: &IdentityInfo,
    server_nonce: &[u8],
    registry: &PolicyRegistry,
) -> UaResult<IdentityToken> {
    if identity.is_anonymous() {
        return derive_anonymous(endpoint);
    }

    if identity.is_user_name() {
        return derive_user_name(endpoint, channel_policy, identity, server_nonce, registry);
    }

    Err(UaError::identity(IdentityError::InvalidIdentityInfo))
}

fn derive_anonymous(endpoint: &EndpointDescription) -> UaResult<IdentityToken> {
    let policy = endpoint
        .find_token_policy(UserTokenKind::Anonymous)
        .ok_or_else(|| {
            UaError::identity(IdentityError::no_matching_token_policy(
                UserTokenKind::Anonymous.type_name(),
            ))
        })?;

    Ok(IdentityToken::Anonymous {
        policy_id: policy.policy_id.clone(),
    })
}

fn derive_user_name(
    endpoint: &EndpointDescription,
    channel_policy: &SecurityPolicy,
    identity: &IdentityInfo,
    server_nonce: &[u8],
    registry: &PolicyRegistry,
) -> UaResult<IdentityToken> {
    let token_policy = endpoint
        .find_token_policy(UserTokenKind::UserName)
        .ok_or_else(|| {
            UaError::identity(IdentityError::no_matching_token_policy(
                UserTokenKind::UserName.type_name(),
            ))
        })?;

    // Token-specific policy wins over the channel policy; an unknown URI is
    // an error in its own right.
    let resolved = match &token_policy.security_policy_uri {
        Some(uri) => registry.resolve(uri)?,
        None => registry.resolve_policy(channel_policy.clone()),
    };

    if !resolved.supports_asymmetric_encryption() {
        return Err(UaError::identity(
            IdentityError::unsupported_security_policy(resolved.policy().uri()),
        ));
    }

    let server_certificate = endpoint
        .server_certificate
        .as_deref()
        .ok_or_else(|| UaError::identity(IdentityError::MissingServerCertificate))?;

    // Classification guarantees both fields are present here.
    let user_name = identity.user_name.clone().unwrap_or_default();
    let password = identity.password.as_deref().unwrap_or_default();

    let plaintext = password_plaintext(password, server_nonce);
    let encrypted = resolved.asymmetric_encrypt(server_certificate, &plaintext)?;

    // supports_asymmetric_encryption() above guarantees the URI exists.
    let encryption_algorithm = resolved
        .encryption_algorithm()
        .unwrap_or_default()
        .to_string();

    Ok(IdentityToken::UserName {
        user_name,
        password: encrypted,
        encryption_algorithm,
        policy_id: token_policy.policy_id.clone(),
    })
}

// =============================================================================
// Tests
// =============================================================================
