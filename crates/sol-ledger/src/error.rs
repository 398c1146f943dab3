use thiserror::Error;

/// Solana ledger primitive errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("missing signature for {0}")]
    MissingSignature(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let cases = [
            (SolError::InvalidAddress("bad decode".into()), "invalid address: bad decode"),
            (SolError::InvalidAmount("negative".into()), "invalid amount: negative"),
            (
                SolError::InvalidInstruction("conflicting flags".into()),
                "invalid instruction: conflicting flags",
            ),
            (
                SolError::MissingSignature("11111111111111111111111111111111".into()),
                "missing signature for 11111111111111111111111111111111",
            ),
            (
                SolError::SerializationError("too many accounts".into()),
                "serialization error: too many accounts",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn boxes_as_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(SolError::SignatureError("slot taken".into()));
        assert_eq!(err.to_string(), "signature error: slot taken");
    }
}
