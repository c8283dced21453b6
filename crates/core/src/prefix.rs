//! Prefix guard: enforces the exact-prefix cache contract per run.
//!
//! Every outgoing request is fingerprinted with SHA-256: the preamble, the
//! serialized tool catalog, and each message. A request must carry the same
//! preamble and catalog as the first one of the run, and must start with
//! exactly the messages of the previous request. Anything else means the
//! backend would recompute from the point of divergence onward.

use sha2::{Digest, Sha256};
use tracing::{trace, warn};

use crate::error::InvariantViolation;
use crate::message::Message;
use crate::provider::{ProviderRequest, ToolDefinition};

type Fingerprint = [u8; 32];

fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Sha256::digest(bytes).into()
}

fn message_fingerprint(message: &Message) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(message.id.as_bytes());
    hasher.update(serde_json::to_vec(&message.role).unwrap_or_default());
    hasher.update(serde_json::to_vec(&message.content).unwrap_or_default());
    hasher.finalize().into()
}

fn catalog_fingerprint(tools: &[ToolDefinition]) -> Fingerprint {
    fingerprint(&serde_json::to_vec(tools).unwrap_or_default())
}

/// How much of a request the backend can serve from its prefix cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixReport {
    /// Messages identical to the previous request's leading messages
    pub reused_messages: usize,
    /// Messages appended since the previous request
    pub new_messages: usize,
    /// Whether this was the first request checked by this guard
    pub first_request: bool,
}

/// Run-scoped checker for preamble, catalog and message-prefix stability.
#[derive(Debug, Default)]
pub struct PrefixGuard {
    preamble: Option<Fingerprint>,
    catalog: Option<Fingerprint>,
    messages: Vec<Fingerprint>,
    requests: u64,
}

impl PrefixGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests accepted so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Validate `request` against the previous one and remember it.
    ///
    /// On error nothing is recorded, so the guard still describes the
    /// last request that actually went out.
    pub fn check(
        &mut self,
        request: &ProviderRequest,
    ) -> Result<PrefixReport, InvariantViolation> {
        let preamble = fingerprint(request.preamble.as_bytes());
        let catalog = catalog_fingerprint(&request.tools);
        let current: Vec<Fingerprint> = request
            .messages
            .iter()
            .map(|m| message_fingerprint(m))
            .collect();

        if let Err(violation) = self.compare(&preamble, &catalog, &current) {
            warn!(
                requests = self.requests,
                messages = current.len(),
                error = %violation,
                "Request rejected: not an extension of the previous one"
            );
            return Err(violation);
        }

        let report = PrefixReport {
            reused_messages: self.messages.len(),
            new_messages: current.len() - self.messages.len(),
            first_request: self.requests == 0,
        };
        trace!(
            reused = report.reused_messages,
            appended = report.new_messages,
            "Prefix check passed"
        );

        self.preamble = Some(preamble);
        self.catalog = Some(catalog);
        self.messages = current;
        self.requests += 1;
        Ok(report)
    }

    fn compare(
        &self,
        preamble: &Fingerprint,
        catalog: &Fingerprint,
        current: &[Fingerprint],
    ) -> Result<(), InvariantViolation> {
        if self.preamble.is_some_and(|expected| &expected != preamble) {
            return Err(InvariantViolation::PreambleChanged);
        }
        if self.catalog.is_some_and(|expected| &expected != catalog) {
            return Err(InvariantViolation::CatalogChanged);
        }
        if current.len() < self.messages.len() {
            return Err(InvariantViolation::PrefixDiverged {
                position: current.len(),
            });
        }
        match self
            .messages
            .iter()
            .zip(current)
            .position(|(prev, now)| prev != now)
        {
            Some(position) => Err(InvariantViolation::PrefixDiverged { position }),
            None => Ok(()),
        }
    }
}
