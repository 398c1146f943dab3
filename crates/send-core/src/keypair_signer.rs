//! An [`ExternalSigner`] backed by an in-process ed25519 keypair.
//!
//! Stands in for the custodial service on devnet and in tests. It accepts one
//! configured email (and optionally one social login) and signs only while a
//! session is open.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use sol_ledger::{AccountId, Signature, TransactionEnvelope};
use zeroize::Zeroize;

use crate::error::ExternalSignerError;
use crate::signer::{Credentials, ExternalSigner, SessionMetadata, SignOptions, SignatureEntry};

pub struct KeypairSigner {
    key: SigningKey,
    email: String,
    social: Option<(String, SecretString)>,
    session_open: Mutex<bool>,
}

impl KeypairSigner {
    /// Build from a 32-byte ed25519 seed. The caller's copy is wiped.
    pub fn from_seed(mut seed: [u8; 32], email: impl Into<String>) -> Self {
        let key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self::with_key(key, email)
    }

    /// Fresh random keypair.
    pub fn generate(email: impl Into<String>) -> Self {
        Self::with_key(SigningKey::generate(&mut rand::rngs::OsRng), email)
    }

    fn with_key(key: SigningKey, email: impl Into<String>) -> Self {
        Self {
            key,
            email: email.into(),
            social: None,
            session_open: Mutex::new(false),
        }
    }

    /// Also accept `token` issued by `provider`.
    pub fn with_social_login(mut self, provider: impl Into<String>, token: SecretString) -> Self {
        self.social = Some((provider.into(), token));
        self
    }

    pub fn public_key(&self) -> AccountId {
        AccountId::new(self.key.verifying_key().to_bytes())
    }

    fn open_session(&self, email: Option<String>) -> SessionMetadata {
        *self.session_open.lock() = true;
        SessionMetadata {
            public_key: self.public_key(),
            email,
        }
    }
}

#[async_trait]
impl ExternalSigner for KeypairSigner {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionMetadata, ExternalSignerError> {
        match credentials {
            Credentials::Email(email) => {
                let email = email.expose_secret().trim();
                if !email.eq_ignore_ascii_case(&self.email) {
                    return Err(ExternalSignerError::Rejected(
                        "no account for this email".into(),
                    ));
                }
                Ok(self.open_session(Some(self.email.clone())))
            }
            Credentials::SocialToken { provider, token } => match &self.social {
                Some((known_provider, known_token))
                    if known_provider == provider
                        && known_token.expose_secret() == token.expose_secret() =>
                {
                    Ok(self.open_session(None))
                }
                _ => Err(ExternalSignerError::Rejected(format!(
                    "{provider} login was not accepted"
                ))),
            },
        }
    }

    async fn sign_transaction(
        &self,
        envelope: &TransactionEnvelope,
        options: SignOptions,
    ) -> Result<Vec<SignatureEntry>, ExternalSignerError> {
        if !*self.session_open.lock() {
            return Err(ExternalSignerError::Unauthorized("no open session".into()));
        }

        let own_key = self.public_key();
        if !envelope.is_signer(&own_key) {
            return Err(ExternalSignerError::Rejected(format!(
                "{own_key} is not a signer of this transaction"
            )));
        }
        if options.require_all_signatures
            && envelope.signer_slots().any(|key| key != &own_key && envelope.signature(key).is_none())
        {
            return Err(ExternalSignerError::Rejected(
                "other required signatures are missing".into(),
            ));
        }

        let message = envelope
            .message_bytes()
            .map_err(|e| ExternalSignerError::Service(e.to_string()))?;
        let signature = Signature::new(self.key.sign(&message).to_bytes());

        Ok(envelope
            .signer_slots()
            .map(|key| SignatureEntry {
                public_key: *key,
                signature: if key == &own_key {
                    Some(signature)
                } else {
                    envelope.signature(key).copied()
                },
            })
            .collect())
    }

    async fn logout(&self) -> Result<(), ExternalSignerError> {
        *self.session_open.lock() = false;
        Ok(())
    }
}
