// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

use crate::{
    common::BLOCKCHAIN,
    error::{ApiError, ApiResult},
    stacks::{ChainNetwork, StacksAddress, Txid},
};
use serde::{Deserialize, Serialize};

/// Account identifier: a c32check-encoded Stacks address, optionally with a
/// contract suffix for contract principals.
///
/// [API Spec](https://www.rosetta-api.org/docs/models/AccountIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<SubAccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AccountIdentifier {
    pub fn new(address: String) -> Self {
        AccountIdentifier {
            address,
            sub_account: None,
            metadata: None,
        }
    }

    /// Decode and checksum-verify the address, requiring the given network's
    /// version byte.
    pub fn stacks_address(&self, network: ChainNetwork) -> ApiResult<StacksAddress> {
        let address: StacksAddress = self
            .address
            .parse()
            .map_err(|_| ApiError::InvalidAccount)?;
        if !address.is_valid_for(network) {
            return Err(ApiError::InvalidAccount);
        }
        Ok(address)
    }
}

impl From<StacksAddress> for AccountIdentifier {
    fn from(address: StacksAddress) -> Self {
        AccountIdentifier::new(address.to_string())
    }
}

/// [API Spec](https://www.rosetta-api.org/docs/models/SubAccountIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubAccountIdentifier {
    pub address: String,
}

/// Identifier for this deployment: the blockchain constant plus the chain
/// flavor the process was started with.
///
/// [API Spec](https://www.rosetta-api.org/docs/models/NetworkIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_network_identifier: Option<SubNetworkIdentifier>,
}

impl From<ChainNetwork> for NetworkIdentifier {
    fn from(network: ChainNetwork) -> Self {
        NetworkIdentifier {
            blockchain: BLOCKCHAIN.to_string(),
            network: network.to_string(),
            sub_network_identifier: None,
        }
    }
}

/// [API Spec](https://www.rosetta-api.org/docs/models/SubNetworkIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubNetworkIdentifier {
    pub network: String,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/BlockIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlockIdentifier {
    pub index: u64,
    pub hash: String,
}

/// Block lookup by height, by hash, or neither (the chain tip).
///
/// [API Spec](https://www.rosetta-api.org/docs/models/PartialBlockIdentifier.html)
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PartialBlockIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/OperationIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OperationIdentifier {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_index: Option<u64>,
}

impl OperationIdentifier {
    pub fn new(index: u64) -> Self {
        OperationIdentifier {
            index,
            network_index: None,
        }
    }
}

/// [API Spec](https://www.rosetta-api.org/docs/models/TransactionIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

impl From<Txid> for TransactionIdentifier {
    fn from(txid: Txid) -> Self {
        TransactionIdentifier {
            hash: txid.to_string(),
        }
    }
}
