//! Associated token account resolution.

use std::collections::HashMap;
use std::sync::Arc;

use sol_ledger::{derive_associated_token_address, AccountId};
use tracing::debug;

use crate::error::{RpcError, SendError, Stage};
use crate::rpc::{LedgerRpc, COMMITMENT};

/// A derived token account together with whether it existed when checked.
///
/// `exists` is a point-in-time snapshot, not a guarantee: the account may be
/// created or closed by someone else before the transaction lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub address: AccountId,
    pub exists: bool,
}

/// Resolves associated token accounts for one send.
///
/// Existence answers are memoized for the lifetime of the resolver only.
/// Create a fresh resolver per request so an answer never outlives it.
pub struct TokenAccountResolver {
    rpc: Arc<dyn LedgerRpc>,
    seen: HashMap<AccountId, bool>,
}

impl TokenAccountResolver {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            rpc,
            seen: HashMap::new(),
        }
    }

    /// Derive the associated token account of `owner` for `mint`. Pure.
    pub fn derive_associated_account(
        owner: &AccountId,
        mint: &AccountId,
    ) -> Result<AccountId, SendError> {
        Ok(derive_associated_token_address(owner, mint)?)
    }

    /// Whether `account` exists on-ledger at `finalized` commitment.
    ///
    /// A missing account is `Ok(false)`. Any other failure is returned as is;
    /// it is never read as "does not exist".
    pub async fn exists(&mut self, account: &AccountId) -> Result<bool, RpcError> {
        if let Some(&known) = self.seen.get(account) {
            return Ok(known);
        }

        let exists = self
            .rpc
            .get_account_info(account, COMMITMENT)
            .await?
            .is_some();

        debug!(%account, exists, "checked account");
        self.seen.insert(*account, exists);
        Ok(exists)
    }

    /// Derive `owner`'s token account for `mint` and check it exists.
    pub async fn resolve(
        &mut self,
        owner: &AccountId,
        mint: &AccountId,
    ) -> Result<ResolvedAccount, SendError> {
        let address = Self::derive_associated_account(owner, mint)?;
        let exists = self
            .exists(&address)
            .await
            .map_err(|e| e.at(Stage::ResolveAccounts))?;
        Ok(ResolvedAccount { address, exists })
    }
}
