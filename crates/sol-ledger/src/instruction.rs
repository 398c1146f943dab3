//! Ledger instructions and the System Program transfer.

use crate::address::AccountId;
use crate::error::SolError;

// ---------------------------------------------------------------------------
// Solana System Program
// ---------------------------------------------------------------------------

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: AccountId = AccountId::new([0u8; 32]);

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: AccountId,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable_signer(pubkey: AccountId) -> Self {
        Self {
            pubkey,
            is_signer: true,
            is_writable: true,
        }
    }

    pub fn readonly_signer(pubkey: AccountId) -> Self {
        Self {
            pubkey,
            is_signer: true,
            is_writable: false,
        }
    }

    pub fn writable(pubkey: AccountId) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: AccountId) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// A ledger instruction (before it is compiled into a transaction).
///
/// Immutable once constructed. Within one instruction an account may only be
/// listed more than once if every listing carries the same flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    program_id: AccountId,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl Instruction {
    pub fn new(
        program_id: AccountId,
        accounts: Vec<AccountMeta>,
        data: Vec<u8>,
    ) -> Result<Self, SolError> {
        for (i, meta) in accounts.iter().enumerate() {
            let conflict = accounts[..i].iter().any(|earlier| {
                earlier.pubkey == meta.pubkey
                    && (earlier.is_signer != meta.is_signer
                        || earlier.is_writable != meta.is_writable)
            });
            if conflict {
                return Err(SolError::InvalidInstruction(format!(
                    "account {} listed with conflicting signer/writable flags",
                    meta.pubkey
                )));
            }
        }

        Ok(Self {
            program_id,
            accounts,
            data,
        })
    }

    pub fn program_id(&self) -> &AccountId {
        &self.program_id
    }

    pub fn accounts(&self) -> &[AccountMeta] {
        &self.accounts
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Build a System Program `Transfer` instruction moving `lamports` from
/// `from` to `to`. `from` must sign.
pub fn system_transfer(
    from: &AccountId,
    to: &AccountId,
    lamports: u64,
) -> Result<Instruction, SolError> {
    // Instruction data: u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![AccountMeta::writable_signer(*from), AccountMeta::writable(*to)],
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_is_all_ones_in_base58() {
        assert_eq!(
            SYSTEM_PROGRAM_ID.to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn sol_transfer_instruction_data_is_12_bytes() {
        let from = AccountId::new([1u8; 32]);
        let to = AccountId::new([2u8; 32]);
        let ix = system_transfer(&from, &to, 1_000_000).unwrap();
        // 4 bytes instruction index + 8 bytes lamports = 12.
        assert_eq!(ix.data().len(), 12);
        assert_eq!(&ix.data()[..4], &[2, 0, 0, 0]);
        assert_eq!(&ix.data()[4..], &1_000_000u64.to_le_bytes());
    }

    #[test]
    fn sol_transfer_has_correct_accounts() {
        let from = AccountId::new([0xAA; 32]);
        let to = AccountId::new([0xBB; 32]);
        let ix = system_transfer(&from, &to, 500).unwrap();

        assert_eq!(ix.program_id(), &SYSTEM_PROGRAM_ID);
        assert_eq!(
            ix.accounts(),
            &[AccountMeta::writable_signer(from), AccountMeta::writable(to)]
        );
    }

    #[test]
    fn zero_lamports_is_a_valid_instruction() {
        let from = AccountId::new([1u8; 32]);
        let to = AccountId::new([2u8; 32]);
        let ix = system_transfer(&from, &to, 0).unwrap();
        assert_eq!(&ix.data()[4..], &[0u8; 8]);
    }

    #[test]
    fn self_transfer_has_conflicting_flags() {
        let key = AccountId::new([0xAA; 32]);
        let err = system_transfer(&key, &key, 100).unwrap_err();
        assert!(matches!(err, SolError::InvalidInstruction(_)));
    }

    #[test]
    fn identical_duplicate_listing_is_allowed() {
        let key = AccountId::new([9u8; 32]);
        let ix = Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![AccountMeta::readonly(key), AccountMeta::readonly(key)],
            vec![],
        );
        assert!(ix.is_ok());
    }

    #[test]
    fn conflicting_signer_flag_is_rejected() {
        let key = AccountId::new([9u8; 32]);
        let ix = Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![AccountMeta::readonly(key), AccountMeta::readonly_signer(key)],
            vec![],
        );
        assert!(ix.is_err());
    }
}
