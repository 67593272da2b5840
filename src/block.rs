// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Rosetta Block API
//!
//! Blocks come out of the datastore as rows carrying raw transaction bytes;
//! the wire codec decodes them and the operation mapper renders each into
//! its operation list with status `success`.

use crate::{
    account::resolve_block,
    common::{check_network, handle_request, with_context},
    error::{ApiError, ApiResult},
    stacks::StacksTransaction,
    storage::TxEntry,
    types::*,
    RosettaContext,
};
use tracing::debug;
use warp::Filter;

pub fn block_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "block")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(block))
}

pub fn block_transaction_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "block" / "transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(block_transaction))
}

/// Decode a stored transaction row into its Rosetta rendering.
pub fn render_transaction(entry: &TxEntry, status: &str) -> ApiResult<Transaction> {
    let tx = StacksTransaction::deserialize(&entry.raw)?;
    Ok(Transaction {
        transaction_identifier: TransactionIdentifier {
            hash: entry.txid.clone(),
        },
        operations: operations_from_transaction(&tx, Some(status))?,
    })
}

/// Retrieve a block by height or hash, defaulting to the chain tip.
///
/// [API Spec](https://www.rosetta-api.org/docs/BlockApi.html#block)
async fn block(request: BlockRequest, server_context: RosettaContext) -> ApiResult<BlockResponse> {
    debug!("/block {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let store = server_context.store()?;
    let block = resolve_block(&server_context, request.block_identifier.as_ref()).await?;

    let mut transactions = Vec::new();
    for entry in store.block_transactions(&block.hash).await? {
        transactions.push(render_transaction(&entry, "success")?);
    }

    // The genesis block is its own parent, per the Rosetta convention.
    let parent_block_identifier = if block.height <= 1 {
        BlockIdentifier {
            index: block.height,
            hash: block.hash.clone(),
        }
    } else {
        BlockIdentifier {
            index: block.height - 1,
            hash: block.parent_hash.clone(),
        }
    };

    Ok(BlockResponse {
        block: Some(Block {
            block_identifier: BlockIdentifier {
                index: block.height,
                hash: block.hash,
            },
            parent_block_identifier,
            timestamp: block.timestamp_ms,
            transactions,
        }),
    })
}

/// Retrieve one transaction out of a block.
///
/// [API Spec](https://www.rosetta-api.org/docs/BlockApi.html#blocktransaction)
async fn block_transaction(
    request: BlockTransactionRequest,
    server_context: RosettaContext,
) -> ApiResult<BlockTransactionResponse> {
    debug!("/block/transaction {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let store = server_context.store()?;
    let entry = store
        .transaction(&request.transaction_identifier.hash)
        .await?
        .ok_or(ApiError::TransactionNotFound)?;

    // The row must actually sit in the named block.
    if entry.block_hash.as_deref() != Some(request.block_identifier.hash.as_str())
        || entry.block_height != Some(request.block_identifier.index)
    {
        return Err(ApiError::TransactionNotFound);
    }

    Ok(BlockTransactionResponse {
        transaction: render_transaction(&entry, "success")?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        stacks::{ChainNetwork, Principal, StacksAddress},
        storage::{BlockEntry, MemoryStore},
    };
    use std::sync::Arc;

    fn transfer_entry(nonce: u64) -> TxEntry {
        let sender = StacksAddress::from_public_key(ChainNetwork::Testnet, &[4u8; 33]);
        let recipient = StacksAddress::from_public_key(ChainNetwork::Testnet, &[5u8; 33]);
        let tx = StacksTransaction::new_token_transfer(
            ChainNetwork::Testnet,
            &sender,
            Principal::Standard(recipient),
            1_000,
            25,
            nonce,
            [0u8; 34],
        );
        TxEntry {
            txid: tx.txid().to_string(),
            block_hash: None,
            block_height: None,
            raw: tx.serialize(),
        }
    }

    fn seeded_context() -> (RosettaContext, TxEntry) {
        let entry = transfer_entry(0);
        let store = MemoryStore::new();
        store.insert_block(
            BlockEntry {
                height: 1,
                hash: "0xcc01".to_string(),
                parent_hash: "0xcc00".to_string(),
                timestamp_ms: 100,
            },
            vec![],
        );
        store.insert_block(
            BlockEntry {
                height: 2,
                hash: "0xcc02".to_string(),
                parent_hash: "0xcc01".to_string(),
                timestamp_ms: 200,
            },
            vec![entry.clone()],
        );
        (
            RosettaContext::new(ChainNetwork::Testnet, None, Some(Arc::new(store)), None),
            entry,
        )
    }

    fn network() -> Option<NetworkIdentifier> {
        Some(NetworkIdentifier::from(ChainNetwork::Testnet))
    }

    #[tokio::test]
    async fn block_by_height_renders_operations() {
        let (context, entry) = seeded_context();
        let response = block(
            BlockRequest {
                network_identifier: network(),
                block_identifier: Some(PartialBlockIdentifier {
                    index: Some(2),
                    hash: None,
                }),
            },
            context,
        )
        .await
        .unwrap();

        let block = response.block.unwrap();
        assert_eq!(block.block_identifier.index, 2);
        assert_eq!(block.parent_block_identifier.index, 1);
        assert_eq!(block.parent_block_identifier.hash, "0xcc01");
        assert_eq!(block.timestamp, 200);
        assert_eq!(block.transactions.len(), 1);

        let tx = &block.transactions[0];
        assert_eq!(tx.transaction_identifier.hash, entry.txid);
        assert_eq!(tx.operations.len(), 3);
        for operation in &tx.operations {
            assert_eq!(operation.status.as_deref(), Some("success"));
        }
    }

    #[tokio::test]
    async fn block_by_hash_and_tip_agree() {
        let (context, _) = seeded_context();
        let by_hash = block(
            BlockRequest {
                network_identifier: network(),
                block_identifier: Some(PartialBlockIdentifier {
                    index: None,
                    hash: Some("0xcc02".to_string()),
                }),
            },
            context.clone(),
        )
        .await
        .unwrap();
        let tip = block(
            BlockRequest {
                network_identifier: network(),
                block_identifier: None,
            },
            context,
        )
        .await
        .unwrap();
        assert_eq!(
            by_hash.block.unwrap().block_identifier,
            tip.block.unwrap().block_identifier
        );
    }

    #[tokio::test]
    async fn genesis_is_its_own_parent() {
        let (context, _) = seeded_context();
        let response = block(
            BlockRequest {
                network_identifier: network(),
                block_identifier: Some(PartialBlockIdentifier {
                    index: Some(1),
                    hash: None,
                }),
            },
            context,
        )
        .await
        .unwrap();
        let block = response.block.unwrap();
        assert_eq!(block.block_identifier, block.parent_block_identifier);
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let (context, _) = seeded_context();
        let error = block(
            BlockRequest {
                network_identifier: network(),
                block_identifier: Some(PartialBlockIdentifier {
                    index: Some(40),
                    hash: None,
                }),
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 605);
    }

    #[tokio::test]
    async fn block_transaction_lookup() {
        let (context, entry) = seeded_context();
        let response = block_transaction(
            BlockTransactionRequest {
                network_identifier: network(),
                block_identifier: BlockIdentifier {
                    index: 2,
                    hash: "0xcc02".to_string(),
                },
                transaction_identifier: TransactionIdentifier {
                    hash: entry.txid.clone(),
                },
            },
            context,
        )
        .await
        .unwrap();
        assert_eq!(response.transaction.transaction_identifier.hash, entry.txid);
    }

    #[tokio::test]
    async fn block_transaction_wrong_block_is_not_found() {
        let (context, entry) = seeded_context();
        let error = block_transaction(
            BlockTransactionRequest {
                network_identifier: network(),
                block_identifier: BlockIdentifier {
                    index: 1,
                    hash: "0xcc01".to_string(),
                },
                transaction_identifier: TransactionIdentifier { hash: entry.txid },
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 607);
    }
}
