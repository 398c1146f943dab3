//! Instruction selection for a transfer.

use sol_ledger::{
    create_associated_token_account, derive_associated_token_address, system_transfer,
    transfer_checked, AccountId, Instruction,
};

use crate::assets::AssetKind;
use crate::error::SendError;
use crate::request::TransferRequest;
use crate::resolver::ResolvedAccount;

pub struct TransferInstructionBuilder;

impl TransferInstructionBuilder {
    /// Build the ordered instruction list for `request`, paid and signed by
    /// `sender`.
    ///
    /// Native assets produce a single system transfer. Token assets need the
    /// destination's associated token account, as resolved for this request:
    /// when it does not exist a creation instruction (payer `sender`, owner
    /// the destination) comes first, then exactly one checked transfer.
    ///
    /// The returned list is never empty.
    pub fn build(
        request: &TransferRequest,
        sender: &AccountId,
        destination_token_account: Option<&ResolvedAccount>,
    ) -> Result<Vec<Instruction>, SendError> {
        match request.asset.kind {
            AssetKind::Native => Ok(vec![system_transfer(
                sender,
                &request.destination,
                request.base_units,
            )?]),
            AssetKind::Token { mint } => {
                let destination = destination_token_account.ok_or_else(|| {
                    SendError::Build(format!(
                        "{} transfer needs the destination token account resolved first",
                        request.asset.symbol
                    ))
                })?;
                Self::token_transfer(request, &mint, sender, destination)
            }
        }
    }

    fn token_transfer(
        request: &TransferRequest,
        mint: &AccountId,
        sender: &AccountId,
        destination: &ResolvedAccount,
    ) -> Result<Vec<Instruction>, SendError> {
        let expected = derive_associated_token_address(&request.destination, mint)?;
        if destination.address != expected {
            return Err(SendError::Build(format!(
                "resolved token account {} is not the associated account {expected} of {}",
                destination.address, request.destination
            )));
        }

        let source = derive_associated_token_address(sender, mint)?;

        let mut instructions = Vec::with_capacity(2);
        if !destination.exists {
            instructions.push(create_associated_token_account(
                sender,
                &destination.address,
                &request.destination,
                mint,
            )?);
        }
        instructions.push(transfer_checked(
            &source,
            mint,
            &destination.address,
            sender,
            request.base_units,
            request.asset.decimals,
        )?);

        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use sol_ledger::{ASSOCIATED_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};

    use super::*;
    use crate::assets::{SOL, USDC};

    const SENDER: AccountId = AccountId::new([0x01; 32]);
    const DEST: AccountId = AccountId::new([0x02; 32]);

    fn usdc_mint() -> AccountId {
        *USDC.mint().unwrap()
    }

    fn dest_ata(exists: bool) -> ResolvedAccount {
        ResolvedAccount {
            address: derive_associated_token_address(&DEST, &usdc_mint()).unwrap(),
            exists,
        }
    }

    #[test]
    fn native_is_one_system_transfer() {
        let req = TransferRequest::new(SOL, 1_500_000_000, DEST);
        let ixs = TransferInstructionBuilder::build(&req, &SENDER, None).unwrap();

        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].program_id(), &SYSTEM_PROGRAM_ID);
        assert_eq!(ixs[0].accounts()[0].pubkey, SENDER);
        assert_eq!(ixs[0].accounts()[1].pubkey, DEST);
        assert_eq!(&ixs[0].data()[4..], &1_500_000_000u64.to_le_bytes());
    }

    #[test]
    fn existing_token_account_is_one_checked_transfer() {
        let req = TransferRequest::new(USDC, 2_500_000, DEST);
        let ixs = TransferInstructionBuilder::build(&req, &SENDER, Some(&dest_ata(true))).unwrap();

        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].program_id(), &TOKEN_PROGRAM_ID);
        assert_eq!(ixs[0].data()[0], 12);
        assert_eq!(&ixs[0].data()[1..9], &2_500_000u64.to_le_bytes());
        assert_eq!(ixs[0].data()[9], 6);
    }

    #[test]
    fn missing_token_account_is_created_first() {
        let req = TransferRequest::new(USDC, 1_000_000, DEST);
        let ata = dest_ata(false);
        let ixs = TransferInstructionBuilder::build(&req, &SENDER, Some(&ata)).unwrap();

        assert_eq!(ixs.len(), 2);

        let create = &ixs[0];
        assert_eq!(create.program_id(), &ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(create.accounts()[0].pubkey, SENDER);
        assert!(create.accounts()[0].is_signer);
        assert_eq!(create.accounts()[1].pubkey, ata.address);
        assert_eq!(create.accounts()[2].pubkey, DEST);
        assert_eq!(create.accounts()[3].pubkey, usdc_mint());

        let transfer = &ixs[1];
        assert_eq!(transfer.program_id(), &TOKEN_PROGRAM_ID);
        let source = derive_associated_token_address(&SENDER, &usdc_mint()).unwrap();
        let keys: Vec<_> = transfer.accounts().iter().map(|m| m.pubkey).collect();
        assert_eq!(keys, vec![source, usdc_mint(), ata.address, SENDER]);
    }

    #[test]
    fn token_without_resolution_is_rejected() {
        let req = TransferRequest::new(USDC, 1, DEST);
        let err = TransferInstructionBuilder::build(&req, &SENDER, None).unwrap_err();
        assert!(matches!(err, SendError::Build(_)));
    }

    #[test]
    fn mismatched_token_account_is_rejected() {
        let req = TransferRequest::new(USDC, 1, DEST);
        let wrong = ResolvedAccount {
            address: AccountId::new([0x99; 32]),
            exists: true,
        };
        let err = TransferInstructionBuilder::build(&req, &SENDER, Some(&wrong)).unwrap_err();
        assert!(matches!(err, SendError::Build(_)));
    }
}
