//! Ledger JSON-RPC access.
//!
//! [`LedgerRpc`] is the seam the pipeline talks to; [`HttpLedgerRpc`] is the
//! production implementation over HTTP. Only three methods are needed:
//! `getLatestBlockhash`, `getAccountInfo` and `sendTransaction`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sol_ledger::{AccountId, Blockhash};
use tracing::debug;

use crate::config::SendConfig;
use crate::error::RpcError;

/// Ledger commitment level. Every read and every preflight runs at
/// `finalized`; no weaker level is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Finalized => "finalized",
        }
    }
}

/// The only commitment the pipeline uses.
pub const COMMITMENT: Commitment = Commitment::Finalized;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Blockhash,
    /// Last block height at which a transaction using this blockhash is
    /// still accepted.
    pub last_valid_block_height: u64,
}

/// Account metadata. Data bytes are never fetched; the pipeline only cares
/// whether the account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: AccountId,
    pub executable: bool,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError>;

    /// `Ok(None)` when the account does not exist.
    async fn get_account_info(
        &self,
        account: &AccountId,
        commitment: Commitment,
    ) -> Result<Option<AccountInfo>, RpcError>;

    /// Broadcast a wire-format transaction; returns the ledger's transaction
    /// signature.
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;
}

// ---------------------------------------------------------------------------
// JSON-RPC wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    lamports: u64,
    owner: String,
    executable: bool,
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct HttpLedgerRpc {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpLedgerRpc {
    /// `timeout` bounds every request; it is the only timeout in the
    /// pipeline.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                method: "client",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &SendConfig) -> Result<Self, RpcError> {
        Self::new(config.rpc_url.clone(), config.rpc_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, url = %self.url, "rpc request");

        let transport = |e: reqwest::Error| RpcError::Transport {
            method,
            message: e.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        let parsed: JsonRpcResponse<T> =
            response.json().await.map_err(|e| RpcError::Malformed {
                method,
                message: e.to_string(),
            })?;

        if let Some(err) = parsed.error {
            debug!(method, id, code = err.code, message = %err.message, "rpc error");
            return Err(RpcError::Response {
                method,
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }

        parsed.result.ok_or(RpcError::Malformed {
            method,
            message: "response has neither result nor error".into(),
        })
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError> {
        const METHOD: &str = "getLatestBlockhash";

        let res: WithContext<BlockhashValue> = self
            .call(METHOD, json!([{ "commitment": commitment.as_str() }]))
            .await?;

        let blockhash = res.value.blockhash.parse::<Blockhash>().map_err(|e| RpcError::Malformed {
            method: METHOD,
            message: format!("{e}"),
        })?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: res.value.last_valid_block_height,
        })
    }

    async fn get_account_info(
        &self,
        account: &AccountId,
        commitment: Commitment,
    ) -> Result<Option<AccountInfo>, RpcError> {
        const METHOD: &str = "getAccountInfo";

        let res: WithContext<Option<AccountValue>> = self
            .call(
                METHOD,
                json!([
                    account.to_string(),
                    {
                        "commitment": commitment.as_str(),
                        "encoding": "base64",
                        "dataSlice": { "offset": 0, "length": 0 },
                    }
                ]),
            )
            .await?;

        res.value
            .map(|value| {
                let owner = AccountId::parse(&value.owner).map_err(|e| RpcError::Malformed {
                    method: METHOD,
                    message: format!("account owner: {e}"),
                })?;
                Ok(AccountInfo {
                    lamports: value.lamports,
                    owner,
                    executable: value.executable,
                })
            })
            .transpose()
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(wire);
        self.call(
            "sendTransaction",
            json!([
                encoded,
                {
                    "encoding": "base64",
                    "preflightCommitment": COMMITMENT.as_str(),
                }
            ]),
        )
        .await
    }
}
