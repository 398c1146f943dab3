use std::fmt;
use std::sync::Arc;

use sol_ledger::TransactionEnvelope;
use tracing::{debug, warn};

use crate::error::{RpcError, SendError};
use crate::rpc::LedgerRpc;

/// The ledger's identifier for a broadcast transaction (the fee payer's
/// signature, Base58).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broadcasts signed envelopes. One attempt per call; nothing is retried.
pub struct SubmissionClient {
    rpc: Arc<dyn LedgerRpc>,
}

impl SubmissionClient {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    /// Serialize `envelope` and broadcast it.
    ///
    /// Every required signature must be present. A ledger rejection carries
    /// its reason verbatim along with any program logs. A transport failure
    /// after the payload was handed off is reported as possibly landed.
    pub async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmissionId, SendError> {
        let signed = envelope.finalize().map_err(|e| SendError::Submission {
            reason: e.to_string(),
            logs: Vec::new(),
            may_have_landed: false,
        })?;

        debug!(bytes = signed.as_bytes().len(), "broadcasting transaction");

        let id = self
            .rpc
            .send_raw_transaction(signed.as_bytes())
            .await
            .map_err(submission_error)?;

        if id.is_empty() {
            return Err(SendError::Submission {
                reason: "ledger returned an empty transaction id".into(),
                logs: Vec::new(),
                may_have_landed: true,
            });
        }

        let expected = signed.signature().to_string();
        if id != expected {
            warn!(returned = %id, %expected, "transaction id differs from the fee payer signature");
        }

        Ok(SubmissionId(id))
    }
}

fn submission_error(err: RpcError) -> SendError {
    match err {
        RpcError::Response { message, data, .. } => {
            let logs = data
                .as_ref()
                .and_then(|d| d.get("logs"))
                .and_then(|l| l.as_array())
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|line| line.as_str().map(str::to_owned))
                        .collect()
                })
                .unwrap_or_default();
            warn!(reason = %message, "ledger rejected transaction");
            SendError::Submission {
                reason: message,
                logs,
                may_have_landed: false,
            }
        }
        other @ (RpcError::Transport { .. } | RpcError::Malformed { .. }) => {
            warn!(error = %other, "broadcast outcome unknown");
            SendError::Submission {
                reason: other.to_string(),
                logs: Vec::new(),
                may_have_landed: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use parking_lot::Mutex;
    use serde_json::json;
    use sol_ledger::{system_transfer, AccountId, Blockhash, Signature};

    use super::*;
    use crate::error::Stage;
    use crate::rpc::{AccountInfo, Commitment, LatestBlockhash};

    enum Answer {
        Echo,
        Id(&'static str),
        Fail(fn() -> RpcError),
    }

    struct Broadcaster {
        answer: Answer,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl LedgerRpc for Broadcaster {
        async fn get_latest_blockhash(&self, _: Commitment) -> Result<LatestBlockhash, RpcError> {
            unreachable!()
        }

        async fn get_account_info(
            &self,
            _: &AccountId,
            _: Commitment,
        ) -> Result<Option<AccountInfo>, RpcError> {
            unreachable!()
        }

        async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
            self.sent.lock().push(wire.to_vec());
            match &self.answer {
                // Signature count is 1, so the fee payer signature follows it.
                Answer::Echo => Ok(bs58_signature(&wire[1..65])),
                Answer::Id(id) => Ok(id.to_string()),
                Answer::Fail(make) => Err(make()),
            }
        }
    }

    fn bs58_signature(bytes: &[u8]) -> String {
        Signature::from_slice(bytes).unwrap().to_string()
    }

    fn client(answer: Answer) -> (SubmissionClient, Arc<Broadcaster>) {
        let rpc = Arc::new(Broadcaster {
            answer,
            sent: Mutex::new(Vec::new()),
        });
        (SubmissionClient::new(rpc.clone()), rpc)
    }

    fn signed_envelope() -> TransactionEnvelope {
        let key = SigningKey::from_bytes(&[5; 32]);
        let payer = AccountId::new(key.verifying_key().to_bytes());
        let ix = system_transfer(&payer, &AccountId::new([6; 32]), 42).unwrap();
        let mut env = TransactionEnvelope::new(payer, Blockhash::new([1; 32]), vec![ix]).unwrap();
        let sig = key.sign(&env.message_bytes().unwrap());
        env.add_signature(&payer, Signature::new(sig.to_bytes())).unwrap();
        env
    }

    #[tokio::test]
    async fn returns_the_ledger_id() {
        let (client, rpc) = client(Answer::Echo);
        let env = signed_envelope();

        let id = client.submit(&env).await.unwrap();

        let expected = env.finalize().unwrap();
        assert_eq!(id.as_str(), expected.signature().to_string());
        assert_eq!(rpc.sent.lock().as_slice(), &[expected.as_bytes().to_vec()]);
    }

    #[tokio::test]
    async fn unsigned_envelope_is_never_sent() {
        let (client, rpc) = client(Answer::Echo);
        let payer = AccountId::new([9; 32]);
        let ix = system_transfer(&payer, &AccountId::new([6; 32]), 42).unwrap();
        let env = TransactionEnvelope::new(payer, Blockhash::new([1; 32]), vec![ix]).unwrap();

        let err = client.submit(&env).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Submit);
        assert!(!err.may_have_landed());
        assert!(rpc.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn rejection_keeps_reason_and_logs() {
        let (client, _) = client(Answer::Fail(|| RpcError::Response {
            method: "sendTransaction",
            code: -32002,
            message: "Transaction simulation failed: Blockhash not found".into(),
            data: Some(json!({ "logs": ["Program 11111111111111111111111111111111 invoke [1]"] })),
        }));

        let err = client.submit(&signed_envelope()).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "submit: Transaction simulation failed: Blockhash not found"
        );
        assert!(!err.may_have_landed());
        match err {
            SendError::Submission { logs, .. } => {
                assert_eq!(logs, vec!["Program 11111111111111111111111111111111 invoke [1]"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_may_have_landed() {
        let (client, _) = client(Answer::Fail(|| RpcError::Transport {
            method: "sendTransaction",
            message: "operation timed out".into(),
        }));

        let err = client.submit(&signed_envelope()).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Submit);
        assert!(err.may_have_landed());
    }

    #[tokio::test]
    async fn empty_id_is_an_error() {
        let (client, _) = client(Answer::Id(""));
        let err = client.submit(&signed_envelope()).await.unwrap_err();
        assert!(err.may_have_landed());
    }

    #[tokio::test]
    async fn unexpected_id_is_still_returned() {
        let (client, _) = client(Answer::Id("someOtherId"));
        let id = client.submit(&signed_envelope()).await.unwrap();
        assert_eq!(id.to_string(), "someOtherId");
    }
}
