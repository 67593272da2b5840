// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

use crate::{
    error::ApiError,
    stacks::ChainNetwork,
    types::{Currency, NetworkIdentifier},
    RosettaContext,
};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::{convert::Infallible, future::Future};
use warp::Filter;

pub const BLOCKCHAIN: &str = "stacks";
pub const ROSETTA_VERSION: &str = "1.4.6";
pub const CURRENCY_SYMBOL: &str = "STX";
pub const CURRENCY_DECIMALS: u32 = 6;

/// Estimated wire size of a single-signature token transfer, used for fee
/// suggestion.
pub const TOKEN_TRANSFER_TX_SIZE: u64 = 180;

pub fn native_coin() -> Currency {
    Currency {
        symbol: CURRENCY_SYMBOL.to_string(),
        decimals: CURRENCY_DECIMALS,
    }
}

/// Guard run before any endpoint logic: the identifier must be present, name
/// this blockchain, and match the configured chain.
pub fn check_network(
    network_identifier: Option<&NetworkIdentifier>,
    server_context: &RosettaContext,
) -> Result<(), ApiError> {
    let network_identifier = network_identifier.ok_or(ApiError::EmptyNetworkIdentifier)?;
    if network_identifier.blockchain != BLOCKCHAIN {
        return Err(ApiError::InvalidBlockchain);
    }
    let network: ChainNetwork = network_identifier
        .network
        .parse()
        .map_err(|_| ApiError::InvalidNetwork)?;
    if network != server_context.network {
        return Err(ApiError::InvalidNetwork);
    }
    Ok(())
}

pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Decode hex with or without a `0x` prefix; an odd digit count is an error.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(strip_hex_prefix(s))
}

/// All hex in responses carries the `0x` prefix.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Attaches RosettaContext to warp paths
pub fn with_context(
    context: RosettaContext,
) -> impl Filter<Extract = (RosettaContext,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// Adapts an `ApiResult` handler into a warp reply, turning errors into
/// their catalog JSON bodies with the right status code.
pub fn handle_request<F, R, Req, Resp>(
    handler: F,
) -> impl Fn(
    Req,
    RosettaContext,
) -> BoxFuture<'static, Result<warp::reply::WithStatus<warp::reply::Json>, Infallible>>
       + Clone
where
    F: FnOnce(Req, RosettaContext) -> R + Clone + Copy + Send + 'static,
    R: Future<Output = Result<Resp, ApiError>> + Send,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize,
{
    move |request, context| {
        let fut = async move {
            match handler(request, context).await {
                Ok(response) => Ok(warp::reply::with_status(
                    warp::reply::json(&response),
                    warp::http::StatusCode::OK,
                )),
                Err(api_error) => {
                    let status = api_error.status_code();
                    Ok(warp::reply::with_status(
                        warp::reply::json(&api_error.into_error()),
                        status,
                    ))
                }
            }
        };
        Box::pin(fut)
    }
}
