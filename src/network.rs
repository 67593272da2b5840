// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Rosetta Network API
//!
//! See: [Network API Spec](https://www.rosetta-api.org/docs/NetworkApi.html)

use crate::{
    common::{check_network, handle_request, with_context, ROSETTA_VERSION},
    error::{ApiError, ApiResult},
    types::*,
    RosettaContext,
};
use tracing::debug;
use warp::Filter;

pub fn list_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "network" / "list")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(network_list))
}

pub fn options_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "network" / "options")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(network_options))
}

pub fn status_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "network" / "status")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(network_status))
}

/// The one network this deployment serves.
///
/// [API Spec](https://www.rosetta-api.org/docs/NetworkApi.html#networklist)
async fn network_list(
    request: MetadataRequest,
    server_context: RosettaContext,
) -> ApiResult<NetworkListResponse> {
    debug!("/network/list {:?}", request);

    Ok(NetworkListResponse {
        network_identifiers: vec![server_context.network.into()],
    })
}

/// Version and capability advertisement, including the full error catalog.
///
/// [API Spec](https://www.rosetta-api.org/docs/NetworkApi.html#networkoptions)
async fn network_options(
    request: NetworkRequest,
    server_context: RosettaContext,
) -> ApiResult<NetworkOptionsResponse> {
    debug!("/network/options {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    Ok(NetworkOptionsResponse {
        version: Version {
            rosetta_version: ROSETTA_VERSION.to_string(),
            node_version: server_context.node_version.clone(),
            middleware_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        allow: Allow {
            operation_statuses: all_operation_statuses(),
            operation_types: all_operation_types(),
            errors: ApiError::all().iter().map(Error::from).collect(),
            historical_balance_lookup: true,
        },
    })
}

/// Chain tip and genesis from the datastore.
///
/// [API Spec](https://www.rosetta-api.org/docs/NetworkApi.html#networkstatus)
async fn network_status(
    request: NetworkRequest,
    server_context: RosettaContext,
) -> ApiResult<NetworkStatusResponse> {
    debug!("/network/status {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let store = server_context.store()?;
    let current = store
        .current_block()
        .await?
        .ok_or(ApiError::BlockNotFound)?;
    // Stacks block heights start at 1.
    let genesis = store
        .block_by_height(1)
        .await?
        .ok_or(ApiError::BlockNotFound)?;

    Ok(NetworkStatusResponse {
        current_block_identifier: BlockIdentifier {
            index: current.height,
            hash: current.hash,
        },
        current_block_timestamp: current.timestamp_ms,
        genesis_block_identifier: BlockIdentifier {
            index: genesis.height,
            hash: genesis.hash,
        },
        peers: vec![],
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        stacks::ChainNetwork,
        storage::{BlockEntry, MemoryStore},
    };
    use std::sync::Arc;

    fn network() -> Option<NetworkIdentifier> {
        Some(NetworkIdentifier::from(ChainNetwork::Testnet))
    }

    #[tokio::test]
    async fn list_reports_the_configured_network() {
        let context = RosettaContext::offline(ChainNetwork::Testnet);
        let response = network_list(MetadataRequest { metadata: None }, context)
            .await
            .unwrap();
        assert_eq!(response.network_identifiers.len(), 1);
        assert_eq!(response.network_identifiers[0].blockchain, "stacks");
        assert_eq!(response.network_identifiers[0].network, "testnet");
    }

    #[tokio::test]
    async fn options_advertises_catalog_and_statuses() {
        let context = RosettaContext::offline(ChainNetwork::Testnet);
        let response = network_options(
            NetworkRequest {
                network_identifier: network(),
            },
            context,
        )
        .await
        .unwrap();

        assert_eq!(response.version.rosetta_version, "1.4.6");
        assert!(response.allow.historical_balance_lookup);

        let statuses: Vec<(&str, bool)> = response
            .allow
            .operation_statuses
            .iter()
            .map(|s| (s.status.as_str(), s.successful))
            .collect();
        assert!(statuses.contains(&("success", true)));
        assert!(statuses.contains(&("pending", true)));
        assert!(statuses.contains(&("abort_by_response", false)));
        assert!(statuses.contains(&("abort_by_post_condition", false)));

        assert_eq!(response.allow.operation_types.len(), 6);
        assert!(response
            .allow
            .operation_types
            .contains(&"token_transfer".to_string()));

        assert_eq!(response.allow.errors.len(), 39);
        assert_eq!(response.allow.errors[0].code, 601);
        assert_eq!(response.allow.errors[38].code, 639);
    }

    #[tokio::test]
    async fn status_reads_tip_and_genesis() {
        let store = MemoryStore::new();
        store.insert_block(
            BlockEntry {
                height: 1,
                hash: "0xaa01".to_string(),
                parent_hash: "0xaa00".to_string(),
                timestamp_ms: 1_000,
            },
            vec![],
        );
        store.insert_block(
            BlockEntry {
                height: 2,
                hash: "0xaa02".to_string(),
                parent_hash: "0xaa01".to_string(),
                timestamp_ms: 2_000,
            },
            vec![],
        );
        let context =
            RosettaContext::new(ChainNetwork::Testnet, None, Some(Arc::new(store)), None);

        let response = network_status(
            NetworkRequest {
                network_identifier: network(),
            },
            context,
        )
        .await
        .unwrap();

        assert_eq!(response.current_block_identifier.index, 2);
        assert_eq!(response.current_block_identifier.hash, "0xaa02");
        assert_eq!(response.current_block_timestamp, 2_000);
        assert_eq!(response.genesis_block_identifier.index, 1);
        assert!(response.peers.is_empty());
    }

    #[tokio::test]
    async fn status_without_a_store_fails() {
        let context = RosettaContext::offline(ChainNetwork::Testnet);
        let error = network_status(
            NetworkRequest {
                network_identifier: network(),
            },
            context,
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 612);
    }
}
