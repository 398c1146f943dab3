//! End-to-end send: validate, resolve, build, assemble, sign, submit.

use std::sync::Arc;

use sol_ledger::{format_amount, Instruction};
use tracing::{info, instrument};

use crate::assembler::TransactionAssembler;
use crate::assets::{Asset, AssetKind};
use crate::builder::TransferInstructionBuilder;
use crate::config::SendConfig;
use crate::error::{RpcError, SendError};
use crate::request::TransferRequest;
use crate::resolver::TokenAccountResolver;
use crate::rpc::{HttpLedgerRpc, LedgerRpc};
use crate::signer::SignerGateway;
use crate::submit::{SubmissionClient, SubmissionId};

/// What a successful send produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub submission_id: SubmissionId,
    pub symbol: &'static str,
    pub base_units: u64,
    /// The instructions that were signed and broadcast, in order.
    pub instructions: Vec<Instruction>,
}

pub struct TransferService {
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<SignerGateway>,
    assembler: TransactionAssembler,
    submitter: SubmissionClient,
}

impl TransferService {
    pub fn new(rpc: Arc<dyn LedgerRpc>, signer: Arc<SignerGateway>) -> Self {
        Self {
            assembler: TransactionAssembler::new(rpc.clone()),
            submitter: SubmissionClient::new(rpc.clone()),
            rpc,
            signer,
        }
    }

    /// Service talking to the HTTP endpoint named in `config`.
    pub fn from_config(config: &SendConfig, signer: Arc<SignerGateway>) -> Result<Self, RpcError> {
        let rpc = HttpLedgerRpc::from_config(config)?;
        Ok(Self::new(Arc::new(rpc), signer))
    }

    pub fn signer(&self) -> &Arc<SignerGateway> {
        &self.signer
    }

    /// Send `amount` (decimal text) of `asset` from the connected signer to
    /// `destination` (Base58).
    ///
    /// Address and amount are checked before any network access. One
    /// attempt; nothing is retried.
    pub async fn send(
        &self,
        asset: &Asset,
        amount: &str,
        destination: &str,
    ) -> Result<SendReceipt, SendError> {
        let request = TransferRequest::parse(*asset, amount, destination)?;
        self.send_request(&request).await
    }

    #[instrument(skip_all, fields(symbol = request.asset.symbol, destination = %request.destination))]
    pub async fn send_request(&self, request: &TransferRequest) -> Result<SendReceipt, SendError> {
        let sender = self
            .signer
            .public_key()
            .ok_or_else(|| SendError::Auth("signer is not connected".into()))?;

        if request.destination == sender {
            return Err(SendError::InvalidAddress(
                "destination is the sending account".into(),
            ));
        }

        let destination_token_account = match request.asset.kind {
            AssetKind::Native => None,
            AssetKind::Token { mint } => {
                let mut resolver = TokenAccountResolver::new(self.rpc.clone());
                Some(resolver.resolve(&request.destination, &mint).await?)
            }
        };

        let instructions = TransferInstructionBuilder::build(
            request,
            &sender,
            destination_token_account.as_ref(),
        )?;

        let mut envelope = self
            .assembler
            .assemble(instructions.clone(), &sender)
            .await?;

        info!(
            amount = %format_amount(request.base_units, request.asset.decimals),
            instructions = instructions.len(),
            "signing"
        );
        self.signer.sign(&mut envelope).await?;

        info!("sending");
        let submission_id = self.submitter.submit(&envelope).await?;
        info!(signature = %submission_id, "submitted");

        Ok(SendReceipt {
            submission_id,
            symbol: request.asset.symbol,
            base_units: request.base_units,
            instructions,
        })
    }
}
