// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Rosetta Mempool API
//!
//! See: [Mempool API Spec](https://www.rosetta-api.org/docs/MempoolApi.html)

use crate::{
    block::render_transaction,
    common::{check_network, handle_request, with_context},
    error::{ApiError, ApiResult},
    types::*,
    RosettaContext,
};
use tracing::debug;
use warp::Filter;

const DEFAULT_MEMPOOL_LIMIT: u64 = 20;

pub fn mempool_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "mempool")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(mempool))
}

pub fn mempool_transaction_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "mempool" / "transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(mempool_transaction))
}

/// Pending transaction ids, paged through request metadata.
///
/// [API Spec](https://www.rosetta-api.org/docs/MempoolApi.html#mempool)
async fn mempool(
    request: MempoolRequest,
    server_context: RosettaContext,
) -> ApiResult<MempoolResponse> {
    debug!("/mempool {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let limit = request
        .metadata
        .as_ref()
        .and_then(|m| m.limit)
        .unwrap_or(DEFAULT_MEMPOOL_LIMIT);
    let offset = request.metadata.as_ref().and_then(|m| m.offset).unwrap_or(0);

    let store = server_context.store()?;
    let transaction_identifiers = store
        .mempool_transactions(limit, offset)
        .await?
        .into_iter()
        .map(|hash| TransactionIdentifier { hash })
        .collect();

    Ok(MempoolResponse {
        transaction_identifiers,
    })
}

/// A pending transaction decoded into operations with status `pending`.
///
/// [API Spec](https://www.rosetta-api.org/docs/MempoolApi.html#mempooltransaction)
async fn mempool_transaction(
    request: MempoolTransactionRequest,
    server_context: RosettaContext,
) -> ApiResult<MempoolTransactionResponse> {
    debug!("/mempool/transaction {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let store = server_context.store()?;
    let entry = store
        .mempool_transaction(&request.transaction_identifier.hash)
        .await?
        .ok_or(ApiError::TransactionNotFound)?;

    Ok(MempoolTransactionResponse {
        transaction: render_transaction(&entry, "pending")?,
    })
}
