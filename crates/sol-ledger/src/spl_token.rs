//! SPL Token operations for Solana.
//!
//! Implements associated token account (ATA) address derivation, the ATA
//! creation instruction, and the SPL Token `TransferChecked` instruction
//! without pulling in the `solana-sdk` or the `spl-token` crates.

use sha2::{Digest, Sha256};

use crate::address::AccountId;
use crate::error::SolError;
use crate::instruction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: AccountId = AccountId::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: AccountId = AccountId::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// SPL Token `TransferChecked` instruction tag.
const TRANSFER_CHECKED_TAG: u8 = 12;

/// Associated Token Account program `Create` instruction tag.
const CREATE_ATA_TAG: u8 = 0;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Build an SPL Token `TransferChecked` instruction.
///
/// Moves `amount` base units of `mint` from `source` to `destination`
/// (both token accounts). `decimals` is embedded so the token program rejects
/// the transfer if it disagrees with the mint's actual precision.
///
/// # Wire format
///
/// Tag 12, then u64 LE amount, then u8 decimals. Total data: 10 bytes.
/// Accounts: source (writable), mint, destination (writable), authority (signer).
pub fn transfer_checked(
    source: &AccountId,
    mint: &AccountId,
    destination: &AccountId,
    authority: &AccountId,
    amount: u64,
    decimals: u8,
) -> Result<Instruction, SolError> {
    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED_TAG);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable(*source),
            AccountMeta::readonly(*mint),
            AccountMeta::writable(*destination),
            AccountMeta::readonly_signer(*authority),
        ],
        data,
    )
}

/// Build the instruction creating `owner`'s associated token account for
/// `mint`, funded by `payer`.
///
/// `associated_account` must be `derive_associated_token_address(owner, mint)`;
/// the program rejects anything else.
pub fn create_associated_token_account(
    payer: &AccountId,
    associated_account: &AccountId,
    owner: &AccountId,
    mint: &AccountId,
) -> Result<Instruction, SolError> {
    Instruction::new(
        ASSOCIATED_TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable_signer(*payer),
            AccountMeta::writable(*associated_account),
            AccountMeta::readonly(*owner),
            AccountMeta::readonly(*mint),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
            AccountMeta::readonly(TOKEN_PROGRAM_ID),
        ],
        vec![CREATE_ATA_TAG],
    )
}

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[wallet_address, token_program_id, mint_address]`
/// derived from the Associated Token Account program.
///
/// Deterministic: the same inputs always yield the same address.
pub fn derive_associated_token_address(
    wallet: &AccountId,
    mint: &AccountId,
) -> Result<AccountId, SolError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &AccountId,
) -> Result<(AccountId, u8), SolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &AccountId,
) -> Option<AccountId> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(AccountId::new(hash))
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
