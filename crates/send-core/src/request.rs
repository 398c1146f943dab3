use sol_ledger::{parse_amount, AccountId};

use crate::assets::Asset;
use crate::error::SendError;

/// One user-initiated transfer, validated.
///
/// Building a request performs every check that needs no network access:
/// the destination must parse as an address and the amount must scale to a
/// non-negative `u64` number of base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset: Asset,
    /// Amount in base units (`amount * 10^decimals`, truncated toward zero).
    pub base_units: u64,
    pub destination: AccountId,
}

impl TransferRequest {
    pub fn new(asset: Asset, base_units: u64, destination: AccountId) -> Self {
        Self {
            asset,
            base_units,
            destination,
        }
    }

    /// Parse user input: decimal amount text and a Base58 destination.
    pub fn parse(asset: Asset, amount: &str, destination: &str) -> Result<Self, SendError> {
        let destination = AccountId::parse(destination)?;
        let base_units = parse_amount(amount, asset.decimals)?;
        Ok(Self::new(asset, base_units, destination))
    }
}
