//! Solana transaction envelope, wire format and signature slots.
//!
//! We build Solana transactions entirely by hand, no `solana-sdk` dependency.
//! The wire format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};

use crate::address::AccountId;
use crate::error::SolError;
use crate::instruction::Instruction;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Blockhash and signatures
// ---------------------------------------------------------------------------

/// A recent blockhash: the 32-byte anchor tying a transaction to recent
/// ledger state. It expires after a ledger-defined window.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Blockhash {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SolError::SerializationError(format!("blockhash decode failed: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::SerializationError(format!("blockhash must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

/// A 64-byte Ed25519 transaction signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SolError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            SolError::SignatureError(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Check this signature over `message` against `signer`'s public key.
    pub fn verify(&self, signer: &AccountId, message: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        key.verify_strict(message, &DalekSignature::from_bytes(&self.0))
            .is_ok()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

// ---------------------------------------------------------------------------
// Compiled message
// ---------------------------------------------------------------------------

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMessage {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<AccountId>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

impl CompiledMessage {
    /// The accounts whose signatures the ledger requires, in slot order.
    pub fn signers(&self) -> &[AccountId] {
        &self.account_keys[..usize::from(self.num_required_signatures)]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&compact_len(self.instructions.len(), "instructions")?);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

/// Compile instructions into a message with a single fee payer.
///
/// Accounts referenced by several instructions are merged (signer and
/// writable flags OR-ed together). The fee payer is always a writable signer
/// at index 0.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &AccountId,
    recent_blockhash: &Blockhash,
) -> Result<CompiledMessage, SolError> {
    struct AccountEntry {
        pubkey: AccountId,
        is_signer: bool,
        is_writable: bool,
    }

    // Instruction account lists are tiny, a linear scan beats hashing here.
    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: AccountId, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in ix.accounts() {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program IDs are non-signer, read-only accounts.
        upsert(*ix.program_id(), false, false);
    }

    // `sort_by_key` is stable, so the fee payer (inserted first, rank 0)
    // stays at index 0.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > 256 {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts for u8 indices: {}",
            entries.len()
        )));
    }

    // 256 keys fit u8 indices but not a u8 count; the header counts are checked.
    let count = |what: &str, pred: fn(&AccountEntry) -> bool| -> Result<u8, SolError> {
        let n = entries.iter().filter(|e| pred(e)).count();
        u8::try_from(n).map_err(|_| {
            SolError::TransactionBuildError(format!("too many {what} for the message header: {n}"))
        })
    };
    let num_required_signatures = count("signers", |e| e.is_signer)?;
    let num_readonly_signed = count("read-only signers", |e| e.is_signer && !e.is_writable)?;
    let num_readonly_unsigned = count("read-only accounts", |e| !e.is_signer && !e.is_writable)?;

    let account_keys: Vec<AccountId> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &AccountId| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError(format!("{key} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts()
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<u8>, SolError>>()?;

        compiled.push(CompiledInstruction {
            program_id_index: index_of(ix.program_id())?,
            account_indices,
            data: ix.data().to_vec(),
        });
    }

    Ok(CompiledMessage {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A transaction being assembled and signed.
///
/// The instruction list and fee payer are fixed at construction; only the
/// signature slots change afterwards. One slot exists per required signer,
/// absent until a signature is merged in. [`TransactionEnvelope::finalize`]
/// produces the immutable wire form.
#[derive(Debug, Clone)]
pub struct TransactionEnvelope {
    fee_payer: AccountId,
    instructions: Vec<Instruction>,
    message: CompiledMessage,
    signatures: Vec<(AccountId, Option<Signature>)>,
    last_valid_block_height: Option<u64>,
}

impl TransactionEnvelope {
    /// Fails if `instructions` is empty: an envelope must carry at least one
    /// instruction before it can be handed to a signer.
    pub fn new(
        fee_payer: AccountId,
        recent_blockhash: Blockhash,
        instructions: Vec<Instruction>,
    ) -> Result<Self, SolError> {
        if instructions.is_empty() {
            return Err(SolError::TransactionBuildError(
                "transaction has no instructions".into(),
            ));
        }

        let message = compile_message(&instructions, &fee_payer, &recent_blockhash)?;
        let signatures = message.signers().iter().map(|k| (*k, None)).collect();

        Ok(Self {
            fee_payer,
            instructions,
            message,
            signatures,
            last_valid_block_height: None,
        })
    }

    /// Record the last block height at which the blockhash is still accepted.
    pub fn with_last_valid_block_height(mut self, height: u64) -> Self {
        self.last_valid_block_height = Some(height);
        self
    }

    pub fn last_valid_block_height(&self) -> Option<u64> {
        self.last_valid_block_height
    }

    /// True once the ledger has moved past the blockhash's validity window.
    /// An envelope without a recorded height never reports expiry.
    pub fn is_expired_at(&self, current_block_height: u64) -> bool {
        self.last_valid_block_height
            .is_some_and(|last| current_block_height > last)
    }

    pub fn fee_payer(&self) -> &AccountId {
        &self.fee_payer
    }

    pub fn recent_blockhash(&self) -> &Blockhash {
        &self.message.recent_blockhash
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn message(&self) -> &CompiledMessage {
        &self.message
    }

    /// The bytes a signer must sign.
    pub fn message_bytes(&self) -> Result<Vec<u8>, SolError> {
        self.message.serialize()
    }

    /// Required signers in slot order.
    pub fn signer_slots(&self) -> impl Iterator<Item = &AccountId> {
        self.signatures.iter().map(|(k, _)| k)
    }

    pub fn is_signer(&self, key: &AccountId) -> bool {
        self.signatures.iter().any(|(k, _)| k == key)
    }

    pub fn signature(&self, key: &AccountId) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, sig)| sig.as_ref())
    }

    /// Put `signature` into `signer`'s slot, replacing any earlier value.
    ///
    /// Fails if `signer` is not one of the required signers.
    pub fn add_signature(&mut self, signer: &AccountId, signature: Signature) -> Result<(), SolError> {
        let slot = self
            .signatures
            .iter_mut()
            .find(|(k, _)| k == signer)
            .ok_or_else(|| {
                SolError::SignatureError(format!("{signer} is not a required signer"))
            })?;
        slot.1 = Some(signature);
        Ok(())
    }

    pub fn missing_signers(&self) -> Vec<AccountId> {
        self.signatures
            .iter()
            .filter(|(_, sig)| sig.is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.iter().all(|(_, sig)| sig.is_some())
    }

    /// Serialize into the ledger wire format.
    ///
    /// Every signer slot must be filled; the ledger rejects anything less.
    pub fn finalize(&self) -> Result<SignedTransaction, SolError> {
        let mut signatures = Vec::with_capacity(self.signatures.len());
        for (key, sig) in &self.signatures {
            let sig = sig.ok_or_else(|| SolError::MissingSignature(key.to_string()))?;
            signatures.push(sig);
        }

        let message_bytes = self.message.serialize()?;

        let mut wire = Vec::with_capacity(3 + 64 * signatures.len() + message_bytes.len());
        wire.extend_from_slice(&compact_len(signatures.len(), "signatures")?);
        for sig in &signatures {
            wire.extend_from_slice(sig.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        Ok(SignedTransaction {
            wire,
            signature: signatures[0],
        })
    }
}

/// A finalized, fully signed transaction in wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    wire: Vec<u8>,
    signature: Signature,
}

impl SignedTransaction {
    pub fn as_bytes(&self) -> &[u8] {
        &self.wire
    }

    /// The fee payer's signature, which the ledger uses as the transaction id.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}
