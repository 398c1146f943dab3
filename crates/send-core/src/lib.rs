//! Send SOL and SPL tokens through a custodial signer.
//!
//! One send runs a fixed pipeline:
//!
//! 1. [`TransferRequest`] validates the destination and scales the amount.
//! 2. [`TokenAccountResolver`] finds the destination's token account
//!    (token sends only).
//! 3. [`TransferInstructionBuilder`] picks the instructions.
//! 4. [`TransactionAssembler`] anchors them to a fresh blockhash.
//! 5. [`SignerGateway`] has the external signer sign the envelope in place.
//! 6. [`SubmissionClient`] broadcasts it.
//!
//! [`TransferService`] runs all six. Ledger access goes through the
//! [`LedgerRpc`] trait and signing through [`ExternalSigner`], so both can
//! be swapped for in-memory versions.

pub mod assembler;
pub mod assets;
pub mod builder;
pub mod config;
pub mod error;
pub mod keypair_signer;
pub mod logging;
pub mod request;
pub mod resolver;
pub mod rpc;
pub mod service;
pub mod signer;
pub mod submit;

pub use assembler::TransactionAssembler;
pub use assets::{Asset, AssetKind, BTC, SOL, USDC};
pub use builder::TransferInstructionBuilder;
pub use config::SendConfig;
pub use error::{ConfigError, ExternalSignerError, RpcError, SendError, SignerError, Stage};
pub use keypair_signer::KeypairSigner;
pub use logging::init_logging;
pub use request::TransferRequest;
pub use resolver::{ResolvedAccount, TokenAccountResolver};
pub use rpc::{Commitment, HttpLedgerRpc, LedgerRpc, COMMITMENT};
pub use service::{SendReceipt, TransferService};
pub use signer::{
    Credentials, ExternalSigner, SessionMetadata, SignOptions, SignatureEntry, SignerEvent,
    SignerGateway, SignerState,
};
pub use submit::{SubmissionClient, SubmissionId};
