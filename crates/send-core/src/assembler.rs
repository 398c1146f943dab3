use std::sync::Arc;

use sol_ledger::{AccountId, Instruction, TransactionEnvelope};
use tracing::debug;

use crate::error::{SendError, Stage};
use crate::rpc::{LedgerRpc, COMMITMENT};

/// Wraps instructions into an unsigned envelope anchored to a fresh
/// blockhash.
pub struct TransactionAssembler {
    rpc: Arc<dyn LedgerRpc>,
}

impl TransactionAssembler {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    /// One `getLatestBlockhash` read per call. The envelope carries
    /// `instructions` in order, no signatures, and the blockhash's
    /// `last_valid_block_height`.
    ///
    /// An expired blockhash cannot be refreshed in place; callers start over
    /// from here with a new envelope.
    pub async fn assemble(
        &self,
        instructions: Vec<Instruction>,
        fee_payer: &AccountId,
    ) -> Result<TransactionEnvelope, SendError> {
        if instructions.is_empty() {
            return Err(SendError::Build("no instructions to assemble".into()));
        }

        let latest = self
            .rpc
            .get_latest_blockhash(COMMITMENT)
            .await
            .map_err(|e| e.at(Stage::FetchBlockhash))?;

        debug!(
            blockhash = %latest.blockhash,
            last_valid_block_height = latest.last_valid_block_height,
            "fetched blockhash"
        );

        Ok(
            TransactionEnvelope::new(*fee_payer, latest.blockhash, instructions)?
                .with_last_valid_block_height(latest.last_valid_block_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use sol_ledger::{system_transfer, Blockhash};

    use super::*;
    use crate::error::RpcError;
    use crate::rpc::{AccountInfo, Commitment, LatestBlockhash};

    struct Blockhashes {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LedgerRpc for Blockhashes {
        async fn get_latest_blockhash(
            &self,
            commitment: Commitment,
        ) -> Result<LatestBlockhash, RpcError> {
            assert_eq!(commitment, Commitment::Finalized);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RpcError::Response {
                    method: "getLatestBlockhash",
                    code: -32005,
                    message: "Node is unhealthy".into(),
                    data: None,
                });
            }
            Ok(LatestBlockhash {
                blockhash: Blockhash::new([7; 32]),
                last_valid_block_height: 150,
            })
        }

        async fn get_account_info(
            &self,
            _: &AccountId,
            _: Commitment,
        ) -> Result<Option<AccountInfo>, RpcError> {
            unreachable!("assembler never reads accounts")
        }

        async fn send_raw_transaction(&self, _: &[u8]) -> Result<String, RpcError> {
            unreachable!("assembler never submits")
        }
    }

    fn assembler(fail: bool) -> (TransactionAssembler, Arc<Blockhashes>) {
        let rpc = Arc::new(Blockhashes {
            fail,
            calls: AtomicUsize::new(0),
        });
        (TransactionAssembler::new(rpc.clone()), rpc)
    }

    const PAYER: AccountId = AccountId::new([1; 32]);
    const DEST: AccountId = AccountId::new([2; 32]);

    #[tokio::test]
    async fn envelope_is_anchored_and_unsigned() {
        let (assembler, rpc) = assembler(false);
        let ix = system_transfer(&PAYER, &DEST, 10).unwrap();

        let envelope = assembler.assemble(vec![ix.clone()], &PAYER).await.unwrap();

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
        assert_eq!(envelope.fee_payer(), &PAYER);
        assert_eq!(envelope.recent_blockhash(), &Blockhash::new([7; 32]));
        assert_eq!(envelope.last_valid_block_height(), Some(150));
        assert!(envelope.is_expired_at(151));
        assert_eq!(envelope.instructions(), &[ix]);
        assert_eq!(envelope.missing_signers(), vec![PAYER]);
        assert!(!envelope.is_fully_signed());
    }

    #[tokio::test]
    async fn empty_input_fails_without_network() {
        let (assembler, rpc) = assembler(false);
        let err = assembler.assemble(vec![], &PAYER).await.unwrap_err();

        assert!(matches!(err, SendError::Build(_)));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blockhash_failure_is_labeled() {
        let (assembler, _) = assembler(true);
        let ix = system_transfer(&PAYER, &DEST, 10).unwrap();

        let err = assembler.assemble(vec![ix], &PAYER).await.unwrap_err();
        assert_eq!(err.stage(), Stage::FetchBlockhash);
        assert!(err.to_string().contains("Node is unhealthy"));
    }
}
