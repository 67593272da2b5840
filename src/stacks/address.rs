// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Stacks addresses for single-signature standard accounts: a network
//! version byte plus the hash160 of a compressed secp256k1 public key.

use crate::stacks::{
    c32::{c32_address, c32_address_decode},
    ChainNetwork, CodecError,
};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StacksAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> Self {
        StacksAddress { version, hash160 }
    }

    /// Derive the single-sig address of a compressed public key:
    /// `hash160 = ripemd160(sha256(key))` under the network's version byte.
    /// Deterministic; the same key always produces the same address.
    pub fn from_public_key(network: ChainNetwork, public_key: &[u8; 33]) -> Self {
        let sha = Sha256::digest(public_key);
        let digest = Ripemd160::digest(sha);

        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(&digest);
        StacksAddress {
            version: network.address_version(),
            hash160,
        }
    }

    /// Whether the version byte belongs to the given network.
    pub fn is_valid_for(&self, network: ChainNetwork) -> bool {
        self.version == network.address_version()
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = c32_address(self.version, &self.hash160).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for StacksAddress {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, hash160) = c32_address_decode(s)?;
        Ok(StacksAddress { version, hash160 })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derives_known_testnet_address() {
        let key: [u8; 33] = {
            let bytes =
                hex::decode("025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51")
                    .unwrap();
            let mut buf = [0u8; 33];
            buf.copy_from_slice(&bytes);
            buf
        };

        let address = StacksAddress::from_public_key(ChainNetwork::Testnet, &key);
        assert_eq!(
            address.to_string(),
            "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM"
        );
        assert!(address.is_valid_for(ChainNetwork::Testnet));
        assert!(!address.is_valid_for(ChainNetwork::Mainnet));
    }

    #[test]
    fn derivation_is_deterministic() {
        let key = [2u8; 33];
        let first = StacksAddress::from_public_key(ChainNetwork::Mainnet, &key);
        let second = StacksAddress::from_public_key(ChainNetwork::Mainnet, &key);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn round_trips_through_string_form() {
        let key = [3u8; 33];
        let address = StacksAddress::from_public_key(ChainNetwork::Mainnet, &key);
        let parsed: StacksAddress = address.to_string().parse().unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn mainnet_and_testnet_versions_differ() {
        let key = [5u8; 33];
        let mainnet = StacksAddress::from_public_key(ChainNetwork::Mainnet, &key);
        let testnet = StacksAddress::from_public_key(ChainNetwork::Testnet, &key);
        assert_eq!(mainnet.hash160, testnet.hash160);
        assert_ne!(mainnet.version, testnet.version);
        assert!(mainnet.to_string().starts_with("SP"));
        assert!(testnet.to_string().starts_with("ST"));
    }
}
