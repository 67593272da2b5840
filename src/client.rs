// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Thin typed client for the stacks-node RPC endpoints the server needs:
//! account state for nonces, the transfer fee rate, node info, and
//! transaction broadcast.

use crate::{common::strip_hex_prefix, error::ApiError};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub type NodeResult<T> = Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node rejected the transaction: {reason}")]
    Rejected { reason: String },
    #[error("unexpected node response: {0}")]
    Unexpected(String),
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Transport(inner) => ApiError::NodeUnreachable(Some(inner.to_string())),
            NodeError::Rejected { reason } => {
                let lowered = reason.to_lowercase();
                if lowered.contains("notenoughfunds") || lowered.contains("insufficient funds") {
                    ApiError::InsufficientFunds(Some(reason))
                } else {
                    ApiError::InvalidTransactionString(Some(reason))
                }
            }
            NodeError::Unexpected(details) => ApiError::UnknownError(Some(details)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountEntry {
    pub nonce: u64,
    /// Hex-encoded with a `0x` prefix on the wire.
    pub balance: String,
}

impl AccountEntry {
    pub fn balance_microstx(&self) -> NodeResult<u128> {
        u128::from_str_radix(strip_hex_prefix(&self.balance), 16)
            .map_err(|e| NodeError::Unexpected(format!("bad balance {:?}: {}", self.balance, e)))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodeInfo {
    pub server_version: String,
    pub stacks_tip_height: u64,
}

#[derive(Debug, Deserialize)]
struct BroadcastRejection {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NodeClient {
    inner: reqwest::Client,
    base_url: Url,
}

impl NodeClient {
    pub fn new(base_url: Url) -> Self {
        Self::new_with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn new_with_timeout(base_url: Url, timeout: Duration) -> Self {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with these options");
        NodeClient { inner, base_url }
    }

    fn build_url(&self, path: &str) -> NodeResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| NodeError::Unexpected(format!("bad url path {:?}: {}", path, e)))
    }

    /// `GET /v2/info`: node software version and chain tip.
    pub async fn get_info(&self) -> NodeResult<NodeInfo> {
        let url = self.build_url("v2/info")?;
        let response = self.inner.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// `GET /v2/accounts/{address}`: nonce and balance for an account.
    pub async fn get_account(&self, address: &str) -> NodeResult<AccountEntry> {
        let url = self.build_url(&format!("v2/accounts/{}?proof=0", address))?;
        let response = self.inner.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// `GET /v2/fees/transfer`: the current fee rate in microSTX per byte.
    pub async fn get_fee_rate(&self) -> NodeResult<u64> {
        let url = self.build_url("v2/fees/transfer")?;
        let response = self.inner.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// `POST /v2/transactions`: broadcast raw transaction bytes; returns the
    /// txid the node assigned, or the node's rejection reason.
    pub async fn broadcast_transaction(&self, tx: &[u8]) -> NodeResult<String> {
        let url = self.build_url("v2/transactions")?;
        let response = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(tx.to_vec())
            .send()
            .await?;

        if response.status().is_success() {
            let txid: String = response.json().await?;
            Ok(format!("0x{}", strip_hex_prefix(&txid)))
        } else {
            let body = response.text().await?;
            match serde_json::from_str::<BroadcastRejection>(&body) {
                Ok(rejection) => Err(NodeError::Rejected {
                    reason: rejection.reason.unwrap_or(rejection.error),
                }),
                Err(_) => Err(NodeError::Unexpected(body)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_hex_balances() {
        let entry = AccountEntry {
            nonce: 3,
            balance: "0x0000000000000000000000000001e240".to_string(),
        };
        assert_eq!(entry.balance_microstx().unwrap(), 123_456);

        let bad = AccountEntry {
            nonce: 0,
            balance: "0xnope".to_string(),
        };
        assert!(bad.balance_microstx().is_err());
    }

    #[test]
    fn rejection_maps_to_catalog_kinds() {
        let rejected: ApiError = NodeError::Rejected {
            reason: "NotEnoughFunds: balance 0".to_string(),
        }
        .into();
        assert_eq!(rejected.code(), 602);

        let rejected: ApiError = NodeError::Rejected {
            reason: "BadNonce".to_string(),
        }
        .into();
        assert_eq!(rejected.code(), 628);

        let unexpected: ApiError = NodeError::Unexpected("boom".to_string()).into();
        assert_eq!(unexpected.code(), 612);
    }
}
