// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session recovery after channel re-establishment.
//!
//! Triggered exactly once per transport reconnect, not per session. Every
//! recoverable session the client owns is re-activated in place (its
//! identity is preserved) and, on success, the publish engine is asked to
//! republish the notifications missed during the outage.
//!
//! Sessions recover independently: one session's failure never aborts its
//! siblings. Reconnects are rare and coarse-grained, and clients hold few
//! sessions, so a fan-out-and-join keeps total recovery latency at the
//! slowest single session rather than the sum.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::client::manager::Client;
use crate::client::session::Session;
use crate::error::{UaError, UaResult};
use crate::service::PublishEngine;

// =============================================================================
// ReconnectReport
// =============================================================================

/// Outcome of one recovery pass.
#[derive(Debug)]
pub struct ReconnectReport {
    /// Number of sessions attempted.
    attempted: usize,

    /// Names of sessions that re-activated and republished.
    recovered: Vec<String>,

    /// Per-session failures, in session order.
    failures: Vec<(String, UaError)>,
}

impl ReconnectReport {
    /// Returns the number of sessions attempted.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Returns the names of recovered sessions.
    pub fn recovered(&self) -> &[String] {
        &self.recovered
    }

    /// Returns the recorded failures.
    pub fn failures(&self) -> &[(String, UaError)] {
        &self.failures
    }

    /// Returns `true` if every attempted session recovered.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Reduces the report to a single result: the first recorded error, if
    /// any. All sessions were attempted regardless.
    pub fn into_result(mut self) -> UaResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.failures.remove(0).1)
        }
    }
}

// =============================================================================
// Recovery Pass
// =============================================================================

/// Re-activates every recoverable session of `client` and requests
/// republish for each success.
///
/// Runs the per-session sequences concurrently and joins them all; errors
/// are recorded per session, never short-circuited. The report lists
/// outcomes in session order, so "first error" is deterministic.
pub async fn resume_sessions(
    client: &Arc<Client>,
    publish: &Arc<dyn PublishEngine>,
) -> ReconnectReport {
    let sessions: Vec<Arc<Session>> = {
        let mut all = client.sessions().await;
        let mut recoverable = Vec::with_capacity(all.len());
        for session in all.drain(..) {
            if session.lifecycle().await.is_recoverable() {
                recoverable.push(session);
            }
        }
        recoverable
    };

    let attempted = sessions.len();
    tracing::info!(
        sessions = attempted,
        endpoint_url = client.endpoint_url(),
        "Channel re-established; resuming sessions"
    );

    let mut tasks = JoinSet::new();
    for (index, session) in sessions.into_iter().enumerate() {
        let client = Arc::clone(client);
        let publish = Arc::clone(publish);
        tasks.spawn(async move {
            let outcome = recover_one(&client, &publish, &session).await;
            (index, session.name().to_string(), outcome)
        });
    }

    let mut outcomes: Vec<Option<(String, UaResult<()>)>> = Vec::new();
    outcomes.resize_with(attempted, || None);
    while let Some(joined) = tasks.join_next().await {
        // Recovery tasks don't panic; a join error would mean the runtime is
        // shutting down, in which case an empty slot is reported as skipped.
        if let Ok((index, name, outcome)) = joined {
            outcomes[index] = Some((name, outcome));
        }
    }

    let mut recovered = Vec::new();
    let mut failures = Vec::new();
    for slot in outcomes.into_iter().flatten() {
        match slot {
            (name, Ok(())) => recovered.push(name),
            (name, Err(error)) => {
                error.log("session recovery");
                failures.push((name, error));
            }
        }
    }

    tracing::info!(
        attempted,
        recovered = recovered.len(),
        failed = failures.len(),
        "Session recovery pass finished"
    );

    ReconnectReport {
        attempted,
        recovered,
        failures,
    }
}

/// One session's recovery sequence: re-activate, then republish.
async fn recover_one(
    client: &Arc<Client>,
    publish: &Arc<dyn PublishEngine>,
    session: &Arc<Session>,
) -> UaResult<()> {
    client.activate_session(session).await?;

    let session_id = session.session_id().await;
    publish.republish(&session_id).await?;

    tracing::debug!(
        session_name = %session.name(),
        "Session re-activated and republished"
    );

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::PolicyRegistry;
    use crate::service::{
        EmptyCertificateStore, SecureChannel, ServiceRequest, ServiceResponse,
    };
    use crate::types::{ClientConfig, SecurityMode, SecurityPolicy};
    use async_trait::async_trait;

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
        ) -> crate::error::UaResult<ServiceResponse> {
            unreachable!()
        }
    }

    struct NoCrypto;

    impl crate::security::CryptoProvider for NoCrypto {
        fn asymmetric_sign(
            &self,
            _policy: &SecurityPolicy,
            _key: &crate::security::PrivateKey,
            data: &[u8],
        ) -> crate::error::UaResult<Vec<u8>> {
            Ok(data.to_vec())
        }

        fn asymmetric_encrypt(
            &self,
            _policy: &SecurityPolicy,
            _certificate_der: &[u8],
            plaintext: &[u8],
        ) -> crate::error::UaResult<Vec<u8>> {
            Ok(plaintext.to_vec())
        }
    }

    struct NoopPublish;

    #[async_trait]
    impl PublishEngine for NoopPublish {
        async fn republish(&self, _session_id: &str) -> crate::error::UaResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_client_reports_complete() {
        let client = Arc::new(Client::new(
            ClientConfig::default(),
            Arc::new(ClosedChannel),
            Arc::new(EmptyCertificateStore),
            PolicyRegistry::new(Arc::new(NoCrypto)),
        ));
        let publish: Arc<dyn PublishEngine> = Arc::new(NoopPublish);

        let report = resume_sessions(&client, &publish).await;

        assert_eq!(report.attempted(), 0);
        assert!(report.is_complete());
        assert!(report.into_result().is_ok());
    }
}
