//! Custodial signer access.
//!
//! [`ExternalSigner`] is the contract a signer service implements: it
//! authenticates a user and signs transactions without ever exposing key
//! material. [`SignerGateway`] owns the session on top of it: the
//! `Disconnected -> Connecting -> Connected` state machine, signature
//! verification and merging, and connect/disconnect notifications.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::SecretString;
use sol_ledger::{AccountId, Signature, TransactionEnvelope};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{ExternalSignerError, SignerError};

/// How a user proves who they are to the signer service.
#[derive(Debug)]
pub enum Credentials {
    /// Email login; the service completes it out of band (magic link).
    Email(SecretString),
    /// A token issued by a social identity provider.
    SocialToken {
        provider: String,
        token: SecretString,
    },
}

impl Credentials {
    pub fn email(address: impl Into<String>) -> Self {
        Credentials::Email(SecretString::from(address.into()))
    }

    pub fn social(provider: impl Into<String>, token: impl Into<String>) -> Self {
        Credentials::SocialToken {
            provider: provider.into(),
            token: SecretString::from(token.into()),
        }
    }
}

/// What the service reports about a freshly authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub public_key: AccountId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOptions {
    /// Fail unless every required signer's slot can be filled.
    pub require_all_signatures: bool,
    /// Check each returned signature against the message before use.
    pub verify_signatures: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            require_all_signatures: false,
            verify_signatures: true,
        }
    }
}

/// One signer slot as returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry {
    pub public_key: AccountId,
    pub signature: Option<Signature>,
}

#[async_trait]
pub trait ExternalSigner: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionMetadata, ExternalSignerError>;

    /// Sign `envelope`'s message. Returns one entry per signer slot the
    /// service knows about; slots it cannot fill carry `None`.
    async fn sign_transaction(
        &self,
        envelope: &TransactionEnvelope,
        options: SignOptions,
    ) -> Result<Vec<SignatureEntry>, ExternalSignerError>;

    async fn logout(&self) -> Result<(), ExternalSignerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    Disconnected,
    Connecting,
    Connected { public_key: AccountId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerEvent {
    Connect { public_key: AccountId },
    Disconnect,
}

const EVENT_CAPACITY: usize = 16;

struct Session {
    state: SignerState,
    /// Incremented by every `connect`; identifies which attempt owns
    /// `Connecting`.
    attempt: u64,
}

/// The process's one signer session.
///
/// Share it behind an `Arc`; every method takes `&self`. The state lock is
/// never held across an await. `authenticate` and `sign_transaction` calls
/// reach the backend one at a time.
pub struct SignerGateway {
    backend: Arc<dyn ExternalSigner>,
    session: Mutex<Session>,
    in_flight: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SignerEvent>,
}

/// Puts the gateway back to `Disconnected` if a `connect` future is dropped
/// or fails while its attempt still owns `Connecting`.
struct ConnectingGuard<'a> {
    session: &'a Mutex<Session>,
    attempt: u64,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut session = self.session.lock();
            if session.state == SignerState::Connecting && session.attempt == self.attempt {
                session.state = SignerState::Disconnected;
            }
        }
    }
}

impl SignerGateway {
    pub fn new(backend: Arc<dyn ExternalSigner>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            session: Mutex::new(Session {
                state: SignerState::Disconnected,
                attempt: 0,
            }),
            in_flight: tokio::sync::Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignerEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SignerState {
        self.session.lock().state
    }

    pub fn public_key(&self) -> Option<AccountId> {
        match self.session.lock().state {
            SignerState::Connected { public_key } => Some(public_key),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// Authenticate with the signer service.
    ///
    /// Only valid from `Disconnected`. A rejection leaves the gateway
    /// `Disconnected`. If [`disconnect`](Self::disconnect) runs while this
    /// is pending, the fresh backend session is logged out again and the
    /// call fails with `Auth("connect cancelled")`.
    pub async fn connect(&self, credentials: &Credentials) -> Result<AccountId, SignerError> {
        let attempt = {
            let mut session = self.session.lock();
            match session.state {
                SignerState::Disconnected => {
                    session.state = SignerState::Connecting;
                    session.attempt += 1;
                    session.attempt
                }
                SignerState::Connecting => {
                    return Err(SignerError::Auth("a connect is already in progress".into()))
                }
                SignerState::Connected { public_key } => {
                    return Err(SignerError::Auth(format!(
                        "already connected as {public_key}"
                    )))
                }
            }
        };
        let mut guard = ConnectingGuard {
            session: &self.session,
            attempt,
            armed: true,
        };

        let _permit = self.in_flight.lock().await;
        let metadata = self
            .backend
            .authenticate(credentials)
            .await
            .map_err(|e| SignerError::Auth(e.to_string()))?;

        guard.armed = false;
        let public_key = metadata.public_key;
        let owned = {
            let mut session = self.session.lock();
            let owned = session.state == SignerState::Connecting && session.attempt == attempt;
            if owned {
                session.state = SignerState::Connected { public_key };
            }
            owned
        };

        if !owned {
            info!(%public_key, "connect cancelled");
            if let Err(e) = self.backend.logout().await {
                warn!(error = %e, "signer logout failed");
            }
            return Err(SignerError::Auth("connect cancelled".into()));
        }

        info!(%public_key, "signer connected");
        let _ = self.events.send(SignerEvent::Connect { public_key });
        Ok(public_key)
    }

    /// Log out and drop the session. A failed logout is logged; the local
    /// session is dropped regardless.
    ///
    /// While `Connecting`, the pending connect is cancelled instead: the
    /// gateway returns to `Disconnected` at once and no event is sent.
    pub async fn disconnect(&self) {
        {
            let mut session = self.session.lock();
            match session.state {
                SignerState::Disconnected => return,
                SignerState::Connecting => {
                    session.state = SignerState::Disconnected;
                    debug!("pending connect cancelled by disconnect");
                    return;
                }
                SignerState::Connected { .. } => {}
            }
        }
        if let Err(e) = self.backend.logout().await {
            warn!(error = %e, "signer logout failed");
        }
        self.end_session();
    }

    /// Request the fee payer's signature and merge it into `envelope`.
    ///
    /// Existing slots are overwritten, never duplicated, so signing the same
    /// envelope twice is harmless. Nothing is merged unless every returned
    /// signature verifies. Concurrent calls queue for the backend.
    pub async fn sign<'a>(
        &self,
        envelope: &'a mut TransactionEnvelope,
    ) -> Result<&'a mut TransactionEnvelope, SignerError> {
        let _permit = self.in_flight.lock().await;
        let public_key = self
            .public_key()
            .ok_or_else(|| SignerError::Auth("signer is not connected".into()))?;

        if envelope.fee_payer() != &public_key {
            return Err(SignerError::Signing(format!(
                "fee payer {} is not the connected signer {public_key}",
                envelope.fee_payer()
            )));
        }

        let message = envelope
            .message_bytes()
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        let options = SignOptions::default();

        let entries = match self.backend.sign_transaction(envelope, options).await {
            Ok(entries) => entries,
            Err(ExternalSignerError::Unauthorized(reason)) => {
                warn!(%public_key, %reason, "signer session invalidated");
                self.end_session();
                return Err(SignerError::Auth(reason));
            }
            Err(e) => return Err(SignerError::Signing(e.to_string())),
        };

        if self.public_key() != Some(public_key) {
            return Err(SignerError::Auth("session ended while signing".into()));
        }

        let mut accepted = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(signature) = entry.signature else {
                continue;
            };
            if !envelope.is_signer(&entry.public_key) {
                debug!(signer = %entry.public_key, "ignoring signature for a non-signer");
                continue;
            }
            if options.verify_signatures && !signature.verify(&entry.public_key, &message) {
                return Err(SignerError::Signing(format!(
                    "signature for {} does not verify",
                    entry.public_key
                )));
            }
            accepted.push((entry.public_key, signature));
        }

        if !accepted.iter().any(|(key, _)| key == &public_key) {
            return Err(SignerError::Signing(format!(
                "signer returned no signature for fee payer {public_key}"
            )));
        }

        for (key, signature) in accepted {
            envelope
                .add_signature(&key, signature)
                .map_err(|e| SignerError::Signing(e.to_string()))?;
        }

        Ok(envelope)
    }

    /// Sign each envelope independently, in order. One result per envelope.
    pub async fn sign_batch(
        &self,
        envelopes: &mut [TransactionEnvelope],
    ) -> Vec<Result<(), SignerError>> {
        let mut results = Vec::with_capacity(envelopes.len());
        for envelope in envelopes.iter_mut() {
            results.push(self.sign(envelope).await.map(|_| ()));
        }
        results
    }

    fn end_session(&self) {
        let previous = std::mem::replace(&mut self.session.lock().state, SignerState::Disconnected);
        if let SignerState::Connected { public_key } = previous {
            info!(%public_key, "signer disconnected");
            let _ = self.events.send(SignerEvent::Disconnect);
        }
    }
}
