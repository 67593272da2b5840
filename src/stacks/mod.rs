// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Chain-native pieces: the c32 address encoding, address derivation, and
//! the transaction wire codec with its signature machinery.

pub mod address;
pub mod c32;
pub mod transaction;

pub use address::StacksAddress;
pub use transaction::{
    presign_hash, recover_public_key, verify_signature, AnchorMode, AuthFlag, MessageSignature,
    PostConditionMode, Principal, SpendingCondition, StacksTransaction, TransactionAuth,
    TransactionPayload, Txid,
};

use std::{fmt, str::FromStr};
use thiserror::Error;

/// Version byte for mainnet single-sig addresses ('P').
pub const C32_VERSION_MAINNET_SINGLESIG: u8 = 0x16;
/// Version byte for testnet single-sig addresses ('T').
pub const C32_VERSION_TESTNET_SINGLESIG: u8 = 0x1a;

pub const CHAIN_ID_MAINNET: u32 = 0x0000_0001;
pub const CHAIN_ID_TESTNET: u32 = 0x8000_0000;

pub const TRANSACTION_VERSION_MAINNET: u8 = 0x00;
pub const TRANSACTION_VERSION_TESTNET: u8 = 0x80;

/// Structural errors raised by the wire codec and address codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{0}")]
    Deserialize(String),
    #[error("{0}")]
    Signing(String),
}

/// Which chain flavor this process serves, fixed at startup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainNetwork {
    Mainnet,
    Testnet,
}

impl ChainNetwork {
    pub fn transaction_version(self) -> u8 {
        match self {
            ChainNetwork::Mainnet => TRANSACTION_VERSION_MAINNET,
            ChainNetwork::Testnet => TRANSACTION_VERSION_TESTNET,
        }
    }

    pub fn chain_id(self) -> u32 {
        match self {
            ChainNetwork::Mainnet => CHAIN_ID_MAINNET,
            ChainNetwork::Testnet => CHAIN_ID_TESTNET,
        }
    }

    pub fn address_version(self) -> u8 {
        match self {
            ChainNetwork::Mainnet => C32_VERSION_MAINNET_SINGLESIG,
            ChainNetwork::Testnet => C32_VERSION_TESTNET_SINGLESIG,
        }
    }

    pub fn from_transaction_version(version: u8) -> Option<ChainNetwork> {
        match version {
            TRANSACTION_VERSION_MAINNET => Some(ChainNetwork::Mainnet),
            TRANSACTION_VERSION_TESTNET => Some(ChainNetwork::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for ChainNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainNetwork::Mainnet => f.write_str("mainnet"),
            ChainNetwork::Testnet => f.write_str("testnet"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown network {0:?}, expected \"mainnet\" or \"testnet\"")]
pub struct ParseNetworkError(String);

impl FromStr for ChainNetwork {
    type Err = ParseNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(ChainNetwork::Mainnet),
            "testnet" => Ok(ChainNetwork::Testnet),
            other => Err(ParseNetworkError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn network_parsing() {
        assert_eq!(
            " mainnet ".parse::<ChainNetwork>().unwrap(),
            ChainNetwork::Mainnet
        );
        assert_eq!(
            "Testnet".parse::<ChainNetwork>().unwrap(),
            ChainNetwork::Testnet
        );
        assert!("devnet".parse::<ChainNetwork>().is_err());
    }

    #[test]
    fn network_constants() {
        assert_eq!(ChainNetwork::Mainnet.transaction_version(), 0x00);
        assert_eq!(ChainNetwork::Testnet.transaction_version(), 0x80);
        assert_eq!(ChainNetwork::Mainnet.chain_id(), 0x0000_0001);
        assert_eq!(ChainNetwork::Testnet.chain_id(), 0x8000_0000);
        assert_eq!(
            ChainNetwork::from_transaction_version(0x80),
            Some(ChainNetwork::Testnet)
        );
        assert_eq!(ChainNetwork::from_transaction_version(0x42), None);
    }
}
