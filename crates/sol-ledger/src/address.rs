//! Solana account identifiers.
//!
//! An account id is a 32-byte value, usually an Ed25519 public key or a
//! program-derived address. Its text form is plain Base58 of the raw bytes;
//! there is no checksum or hashing step (unlike Bitcoin or Ethereum).

use std::fmt;
use std::str::FromStr;

use crate::error::SolError;

/// A 32-byte ledger account identifier.
///
/// Two ids are equal iff their byte representations are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// Wrap raw bytes. Every 32-byte value is a syntactically valid id.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a Base58 address string.
    ///
    /// Fails with [`SolError::InvalidAddress`] if the text is not Base58 or
    /// does not decode to exactly 32 bytes. Pure; never touches the network.
    pub fn parse(text: &str) -> Result<Self, SolError> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for AccountId {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}
