// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Rosetta Account API
//!
//! See: [Account API Spec](https://www.rosetta-api.org/docs/AccountApi.html)

use crate::{
    common::{check_network, handle_request, native_coin, with_context},
    error::{ApiError, ApiResult},
    storage::BlockEntry,
    types::*,
    RosettaContext,
};
use tracing::debug;
use warp::Filter;

pub fn balance_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "account" / "balance")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(account_balance))
}

/// Balance at a block, defaulting to the chain tip.  Unknown accounts read
/// as zero with sequence zero rather than erroring, matching how the chain
/// treats never-used addresses.
///
/// [API Spec](https://www.rosetta-api.org/docs/AccountApi.html#accountbalance)
async fn account_balance(
    request: AccountBalanceRequest,
    server_context: RosettaContext,
) -> ApiResult<AccountBalanceResponse> {
    debug!("/account/balance {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let account = request
        .account_identifier
        .ok_or(ApiError::EmptyAccountIdentifier)?;
    let address = account.stacks_address(server_context.network)?;

    let store = server_context.store()?;
    let block = resolve_block(&server_context, request.block_identifier.as_ref()).await?;

    let entry = store
        .account_balance(&address.to_string(), Some(block.height))
        .await?
        .unwrap_or(crate::storage::BalanceEntry {
            balance: 0,
            nonce: 0,
        });

    Ok(AccountBalanceResponse {
        block_identifier: BlockIdentifier {
            index: block.height,
            hash: block.hash,
        },
        balances: vec![Amount {
            value: entry.balance.to_string(),
            currency: native_coin(),
        }],
        metadata: Some(AccountBalanceMetadata {
            sequence_number: entry.nonce,
        }),
    })
}

/// Resolve a partial block identifier against the store: by height, by
/// hash, or the current tip when neither is given.  When both are given
/// they must name the same block.
pub async fn resolve_block(
    server_context: &RosettaContext,
    identifier: Option<&PartialBlockIdentifier>,
) -> ApiResult<BlockEntry> {
    let store = server_context.store()?;

    let block = match identifier {
        Some(PartialBlockIdentifier {
            index: Some(height),
            hash,
        }) => {
            let block = store
                .block_by_height(*height)
                .await?
                .ok_or(ApiError::BlockNotFound)?;
            if let Some(hash) = hash {
                if &block.hash != hash {
                    return Err(ApiError::InvalidBlockIdentifier);
                }
            }
            block
        }
        Some(PartialBlockIdentifier {
            index: None,
            hash: Some(hash),
        }) => store
            .block_by_hash(hash)
            .await?
            .ok_or(ApiError::BlockNotFound)?,
        _ => store
            .current_block()
            .await?
            .ok_or(ApiError::BlockNotFound)?,
    };
    Ok(block)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        stacks::{ChainNetwork, StacksAddress},
        storage::{BalanceEntry, BlockEntry, MemoryStore},
    };
    use std::sync::Arc;

    fn seeded_context() -> (RosettaContext, StacksAddress) {
        let address = StacksAddress::from_public_key(ChainNetwork::Testnet, &[9u8; 33]);
        let store = MemoryStore::new();
        store.insert_block(
            BlockEntry {
                height: 1,
                hash: "0xbb01".to_string(),
                parent_hash: "0xbb00".to_string(),
                timestamp_ms: 500,
            },
            vec![],
        );
        store.set_balance(
            &address.to_string(),
            BalanceEntry {
                balance: 2_000_000,
                nonce: 5,
            },
        );
        (
            RosettaContext::new(ChainNetwork::Testnet, None, Some(Arc::new(store)), None),
            address,
        )
    }

    fn network() -> Option<NetworkIdentifier> {
        Some(NetworkIdentifier::from(ChainNetwork::Testnet))
    }

    #[tokio::test]
    async fn reads_balance_at_tip() {
        let (context, address) = seeded_context();
        let response = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: Some(AccountIdentifier::from(address)),
                block_identifier: None,
            },
            context,
        )
        .await
        .unwrap();

        assert_eq!(response.block_identifier.index, 1);
        assert_eq!(response.balances.len(), 1);
        assert_eq!(response.balances[0].value, "2000000");
        assert_eq!(response.balances[0].currency, native_coin());
        assert_eq!(response.metadata.unwrap().sequence_number, 5);
    }

    #[tokio::test]
    async fn unknown_account_reads_zero() {
        let (context, _) = seeded_context();
        let other = StacksAddress::from_public_key(ChainNetwork::Testnet, &[8u8; 33]);
        let response = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: Some(AccountIdentifier::from(other)),
                block_identifier: None,
            },
            context,
        )
        .await
        .unwrap();
        assert_eq!(response.balances[0].value, "0");
    }

    #[tokio::test]
    async fn missing_account_identifier_is_an_error() {
        let (context, _) = seeded_context();
        let error = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: None,
                block_identifier: None,
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 614);
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let (context, _) = seeded_context();
        let mainnet = StacksAddress::from_public_key(ChainNetwork::Mainnet, &[9u8; 33]);
        let error = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: Some(AccountIdentifier::from(mainnet)),
                block_identifier: None,
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 601);
    }

    #[tokio::test]
    async fn unknown_block_is_retriable_not_found() {
        let (context, address) = seeded_context();
        let error = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: Some(AccountIdentifier::from(address)),
                block_identifier: Some(PartialBlockIdentifier {
                    index: Some(99),
                    hash: None,
                }),
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 605);
        assert!(error.retriable());
    }

    #[tokio::test]
    async fn conflicting_block_identifier_is_rejected() {
        let (context, address) = seeded_context();
        let error = account_balance(
            AccountBalanceRequest {
                network_identifier: network(),
                account_identifier: Some(AccountIdentifier::from(address)),
                block_identifier: Some(PartialBlockIdentifier {
                    index: Some(1),
                    hash: Some("0xmismatch".to_string()),
                }),
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 615);
    }
}
