use std::fmt;

use sol_ledger::SolError;
use thiserror::Error;

/// The pipeline step at which a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    ResolveAccounts,
    BuildInstructions,
    FetchBlockhash,
    Sign,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "validate",
            Stage::ResolveAccounts => "resolve accounts",
            Stage::BuildInstructions => "build instructions",
            Stage::FetchBlockhash => "fetch blockhash",
            Stage::Sign => "sign",
            Stage::Submit => "submit",
        })
    }
}

/// Errors surfaced by a send. Every message is prefixed with its stage.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("validate: invalid address: {0}")]
    InvalidAddress(String),

    #[error("validate: invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{stage}: rpc error: {source}")]
    Rpc {
        stage: Stage,
        #[source]
        source: RpcError,
    },

    #[error("build instructions: {0}")]
    Build(String),

    #[error("sign: auth error: {0}")]
    Auth(String),

    #[error("sign: signing error: {0}")]
    Signing(String),

    #[error("submit: {reason}")]
    Submission {
        /// The ledger's rejection reason, verbatim.
        reason: String,
        /// Program logs attached to a preflight rejection, if any.
        logs: Vec<String>,
        may_have_landed: bool,
    },
}

impl SendError {
    pub fn stage(&self) -> Stage {
        match self {
            SendError::InvalidAddress(_) | SendError::InvalidAmount(_) => Stage::Validate,
            SendError::Rpc { stage, .. } => *stage,
            SendError::Build(_) => Stage::BuildInstructions,
            SendError::Auth(_) | SendError::Signing(_) => Stage::Sign,
            SendError::Submission { .. } => Stage::Submit,
        }
    }

    /// Whether the transaction might have reached the ledger despite the
    /// error. Only a submission whose outcome is unknown (the payload left
    /// this process but no verdict came back) answers `true`.
    pub fn may_have_landed(&self) -> bool {
        matches!(
            self,
            SendError::Submission {
                may_have_landed: true,
                ..
            }
        )
    }
}

impl From<SolError> for SendError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::InvalidAddress(msg) => SendError::InvalidAddress(msg),
            SolError::InvalidAmount(msg) => SendError::InvalidAmount(msg),
            other => SendError::Build(other.to_string()),
        }
    }
}

impl From<SignerError> for SendError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Auth(msg) => SendError::Auth(msg),
            SignerError::Signing(msg) => SendError::Signing(msg),
        }
    }
}

/// Ledger RPC failures.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced an HTTP response (connect failure,
    /// timeout, TLS) or the response status was not 2xx.
    #[error("transport error calling {method}: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("{method} failed with code {code}: {message}")]
    Response {
        method: &'static str,
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("malformed {method} response: {message}")]
    Malformed {
        method: &'static str,
        message: String,
    },
}

impl RpcError {
    pub fn at(self, stage: Stage) -> SendError {
        SendError::Rpc {
            stage,
            source: self,
        }
    }
}

/// Signer gateway failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("auth error: {0}")]
    Auth(String),

    #[error("signing error: {0}")]
    Signing(String),
}

/// What an external signer service can answer instead of signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExternalSignerError {
    /// The service refused this request (bad credentials, user declined,
    /// unsupported transaction).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The session behind the request is no longer valid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("service error: {0}")]
    Service(String),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Validation(String),
}
