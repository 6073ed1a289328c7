// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint negotiation.
//!
//! Picks the server endpoint matching the active channel's URL and the
//! requested security settings. The strict match is the default; the
//! relaxed fallback ignores the URL and is an explicit trust relaxation
//! (see [`resolve_endpoint`]).

use crate::error::{EndpointError, UaError, UaResult};
use crate::types::{EndpointDescription, SecurityMode, SecurityPolicy};

/// Compares endpoint URLs, ignoring a trailing slash.
fn urls_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Resolves the endpoint to establish sessions against.
///
/// With `must_exist = true` (the default) the endpoint has to be advertised
/// for `channel_url` with exactly the requested mode and policy; anything
/// else fails with an endpoint mismatch.
///
/// With `must_exist = false`, when no exact match exists, the first endpoint
/// matching mode and policy on *any* URL is used instead. This tolerates
/// servers reached by IP address whose certificate names a host, but it
/// weakens the certificate-hostname consistency check; callers opt in
/// knowingly.
pub fn resolve_endpoint<'a>(
    endpoints: &'a [EndpointDescription],
    channel_url: &str,
    mode: SecurityMode,
    policy: &SecurityPolicy,
    must_exist: bool,
) -> UaResult<&'a EndpointDescription> {
    if endpoints.is_empty() {
        return Err(UaError::endpoint(EndpointError::NoneAdvertised));
    }

    let exact = endpoints
        .iter()
        .find(|e| urls_match(&e.endpoint_url, channel_url) && e.matches_security(mode, policy));

    if let Some(endpoint) = exact {
        tracing::debug!(
            endpoint_url = %endpoint.endpoint_url,
            security_mode = %mode,
            security_policy = %policy,
            "Endpoint resolved"
        );
        return Ok(endpoint);
    }

    if must_exist {
        return Err(UaError::endpoint_mismatch(channel_url));
    }

    let fallback = endpoints
        .iter()
        .find(|e| e.matches_security(mode, policy))
        .ok_or_else(|| UaError::endpoint_mismatch(channel_url))?;

    tracing::warn!(
        requested_url = channel_url,
        endpoint_url = %fallback.endpoint_url,
        "No exact endpoint match; falling back to a mode/policy match on a different URL"
    );

    Ok(fallback)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<EndpointDescription> {
        vec![
            EndpointDescription::new(
                "opc.tcp://plant-floor:4840",
                SecurityMode::None,
                &SecurityPolicy::None,
            ),
            EndpointDescription::new(
                "opc.tcp://plant-floor:4840",
                SecurityMode::SignAndEncrypt,
                &SecurityPolicy::Basic256Sha256,
            ),
        ]
    }

    #[test]
    fn test_strict_match() {
        let endpoints = endpoints();

        let resolved = resolve_endpoint(
            &endpoints,
            "opc.tcp://plant-floor:4840",
            SecurityMode::SignAndEncrypt,
            &SecurityPolicy::Basic256Sha256,
            true,
        )
        .unwrap();

        assert_eq!(resolved.security_mode, SecurityMode::SignAndEncrypt);
    }

    #[test]
    fn test_strict_mismatch_fails() {
        let endpoints = endpoints();

        // Same security settings, different URL.
        let result = resolve_endpoint(
            &endpoints,
            "opc.tcp://192.168.0.17:4840",
            SecurityMode::None,
            &SecurityPolicy::None,
            true,
        );
        assert!(matches!(
            result,
            Err(UaError::Endpoint(EndpointError::Mismatch { .. }))
        ));

        // Same URL, security settings the server does not offer.
        let result = resolve_endpoint(
            &endpoints,
            "opc.tcp://plant-floor:4840",
            SecurityMode::Sign,
            &SecurityPolicy::Basic256,
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_relaxed_fallback_ignores_url() {
        let endpoints = endpoints();

        let resolved = resolve_endpoint(
            &endpoints,
            "opc.tcp://192.168.0.17:4840",
            SecurityMode::None,
            &SecurityPolicy::None,
            false,
        )
        .unwrap();

        assert_eq!(resolved.endpoint_url, "opc.tcp://plant-floor:4840");
    }

    #[test]
    fn test_relaxed_still_requires_security_match() {
        let endpoints = endpoints();

        let result = resolve_endpoint(
            &endpoints,
            "opc.tcp://192.168.0.17:4840",
            SecurityMode::Sign,
            &SecurityPolicy::Basic128Rsa15,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_endpoint_list() {
        let result = resolve_endpoint(
            &[],
            "opc.tcp://plant-floor:4840",
            SecurityMode::None,
            &SecurityPolicy::None,
            true,
        );
        assert!(matches!(
            result,
            Err(UaError::Endpoint(EndpointError::NoneAdvertised))
        ));
    }

    #[test]
    fn test_trailing_slash_tolerated() {
        let endpoints = endpoints();

        let resolved = resolve_endpoint(
            &endpoints,
            "opc.tcp://plant-floor:4840/",
            SecurityMode::None,
            &SecurityPolicy::None,
            true,
        );
        assert!(resolved.is_ok());
    }
}
