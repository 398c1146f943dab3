//! Static asset registry.
//!
//! Each entry is one sendable asset. Adding an asset means adding an entry;
//! nothing else in the pipeline hard-codes the list.

use sol_ledger::AccountId;

/// How value of an asset moves on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The ledger's native coin, moved by the System Program. No token
    /// program or mint is involved.
    Native,
    /// An SPL token identified by its mint.
    Token { mint: AccountId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub symbol: &'static str,
    pub kind: AssetKind,
    pub decimals: u8,
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self.kind, AssetKind::Native)
    }

    pub fn mint(&self) -> Option<&AccountId> {
        match &self.kind {
            AssetKind::Native => None,
            AssetKind::Token { mint } => Some(mint),
        }
    }
}

pub const SOL: Asset = Asset {
    symbol: "SOL",
    kind: AssetKind::Native,
    decimals: 9,
};

/// Devnet USDC: `8zGuJQqwhZafTah7Uc7Z4tXRnguqkn5KLFAP8oV6PHe2`
pub const USDC: Asset = Asset {
    symbol: "USDC",
    kind: AssetKind::Token {
        mint: AccountId::new([
            0x76, 0xad, 0xe5, 0x0d, 0xd4, 0x7c, 0xea, 0xa5, 0xd1, 0x20, 0x1e, 0xa0, 0x83, 0x31,
            0x79, 0x7f, 0x6a, 0x7b, 0x1e, 0xf8, 0x0e, 0x6a, 0x7a, 0x8e, 0x93, 0x74, 0x3d, 0xee,
            0x6a, 0xc2, 0x91, 0xe3,
        ]),
    },
    decimals: 6,
};

/// Devnet wrapped BTC: `3BZPwbcqB5kKScF3TEXxwNfx5ipV13kbRVDvfVp5c6fv`
pub const BTC: Asset = Asset {
    symbol: "BTC",
    kind: AssetKind::Token {
        mint: AccountId::new([
            0x20, 0x6b, 0xcf, 0xcb, 0x66, 0xca, 0x24, 0x7e, 0x61, 0x2d, 0xe6, 0xc2, 0x78, 0x20,
            0x65, 0x37, 0x9a, 0xb3, 0xd7, 0xd3, 0xbc, 0x50, 0x5f, 0xb4, 0xce, 0x7b, 0xe6, 0x12,
            0x76, 0x52, 0xc5, 0x9d,
        ]),
    },
    decimals: 6,
};

/// Every sendable asset, in display order.
pub const REGISTRY: &[Asset] = &[SOL, USDC, BTC];

/// Look up an asset by symbol, ignoring ASCII case.
pub fn find(symbol: &str) -> Option<&'static Asset> {
    REGISTRY
        .iter()
        .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
}
