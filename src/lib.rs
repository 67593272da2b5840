// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Rosetta API server for the Stacks blockchain.
//!
//! Exposes the Rosetta Data API over a read-only datastore projection and
//! the full Construction flow against the chain's wire format.  Every
//! endpoint is stateless; only `/construction/metadata` and
//! `/construction/submit` reach out to a stacks-node.

pub mod account;
pub mod block;
pub mod client;
pub mod common;
pub mod construction;
pub mod error;
pub mod mempool;
pub mod network;
pub mod stacks;
pub mod storage;
pub mod types;

use crate::{
    client::NodeClient,
    error::{ApiError, ApiResult},
    stacks::ChainNetwork,
    storage::ChainStore,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use warp::Filter;

/// Everything a handler needs: the configured chain, an optional node
/// client, and an optional datastore.  Cloning is cheap; handlers hold no
/// other state.
#[derive(Clone)]
pub struct RosettaContext {
    pub network: ChainNetwork,
    pub node_version: String,
    node: Option<NodeClient>,
    store: Option<Arc<dyn ChainStore>>,
}

impl RosettaContext {
    pub fn new(
        network: ChainNetwork,
        node: Option<NodeClient>,
        store: Option<Arc<dyn ChainStore>>,
        node_version: Option<String>,
    ) -> Self {
        RosettaContext {
            network,
            node_version: node_version.unwrap_or_else(|| "unknown".to_string()),
            node,
            store,
        }
    }

    /// A context with no node and no datastore: construction-only, offline.
    pub fn offline(network: ChainNetwork) -> Self {
        RosettaContext::new(network, None, None, None)
    }

    pub fn node_client(&self) -> ApiResult<&NodeClient> {
        self.node.as_ref().ok_or(ApiError::NodeUnreachable(Some(
            "server is running in offline mode".to_string(),
        )))
    }

    pub fn store(&self) -> ApiResult<&Arc<dyn ChainStore>> {
        self.store.as_ref().ok_or(ApiError::UnknownError(Some(
            "no datastore configured".to_string(),
        )))
    }
}

/// All routes under `/rosetta/v1`.
pub fn routes(
    context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    network::list_route(context.clone())
        .or(network::options_route(context.clone()))
        .or(network::status_route(context.clone()))
        .or(block::block_route(context.clone()))
        .or(block::block_transaction_route(context.clone()))
        .or(account::balance_route(context.clone()))
        .or(mempool::mempool_route(context.clone()))
        .or(mempool::mempool_transaction_route(context.clone()))
        .or(construction::derive_route(context.clone()))
        .or(construction::preprocess_route(context.clone()))
        .or(construction::metadata_route(context.clone()))
        .or(construction::payloads_route(context.clone()))
        .or(construction::parse_route(context.clone()))
        .or(construction::combine_route(context.clone()))
        .or(construction::hash_route(context.clone()))
        .or(construction::submit_route(context))
}

/// Bind and serve until the process is stopped.
pub async fn bootstrap(context: RosettaContext, listen_address: SocketAddr) {
    info!(
        %listen_address,
        network = %context.network,
        "starting rosetta server"
    );
    warp::serve(routes(context)).run(listen_address).await
}
