//! Solana ledger primitives for the token sender.
//!
//! This crate handles account ids, amount scaling, System / SPL Token /
//! Associated Token Account instructions, and the transaction envelope with
//! its wire format, all without pulling in `solana-sdk` (which drags in
//! hundreds of transitive dependencies).
//!
//! Instead we implement Solana's compact binary wire format by hand, using
//! `ed25519-dalek` for signature verification, `curve25519-dalek` for the
//! program-derived-address curve check, and `bs58` for Base58 encoding.
//! Nothing in here performs I/O.

pub mod address;
pub mod amount;
pub mod error;
pub mod instruction;
pub mod spl_token;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::AccountId;
pub use amount::{format_amount, parse_amount};
pub use error::SolError;
pub use instruction::{system_transfer, AccountMeta, Instruction, SYSTEM_PROGRAM_ID};
pub use spl_token::{
    create_associated_token_account, derive_associated_token_address, find_program_address,
    transfer_checked, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    compile_message, encode_compact_u16, Blockhash, CompiledInstruction, CompiledMessage,
    Signature, SignedTransaction, TransactionEnvelope,
};
