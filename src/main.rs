// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use clap::Parser;
use stacks_rosetta::{client::NodeClient, stacks::ChainNetwork, RosettaContext};
use std::net::SocketAddr;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Stacks Rosetta API Server
///
/// Provides an implementation of [Rosetta](https://www.rosetta-api.org/docs/Reference.html)
/// for the Stacks blockchain.
#[derive(Debug, Parser)]
#[clap(name = "stacks-rosetta", author, version, propagate_version = true)]
enum CommandArgs {
    /// Run against a stacks-node RPC endpoint
    Online(OnlineArgs),
    /// Run without any node connection; construction-only
    Offline(OfflineArgs),
}

#[derive(Debug, Parser)]
struct OfflineArgs {
    /// Listen address for the server. e.g. 0.0.0.0:3999
    #[clap(long, default_value = "0.0.0.0:3999")]
    listen_address: SocketAddr,
    /// Chain to serve; the network in every request must match
    #[clap(long, default_value = "testnet")]
    chain: ChainNetwork,
}

#[derive(Debug, Parser)]
struct OnlineArgs {
    #[clap(flatten)]
    offline_args: OfflineArgs,
    /// URL for the stacks-node RPC. e.g. http://localhost:20443
    #[clap(long, default_value = "http://localhost:20443")]
    node_url: Url,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = CommandArgs::parse();
    let (listen_address, context) = match args {
        CommandArgs::Offline(args) => (
            args.listen_address,
            RosettaContext::offline(args.chain),
        ),
        CommandArgs::Online(args) => {
            let node = NodeClient::new(args.node_url.clone());
            let node_version = match node.get_info().await {
                Ok(info) => Some(info.server_version),
                Err(err) => {
                    warn!(%err, url = %args.node_url, "could not reach the node at startup");
                    None
                }
            };
            (
                args.offline_args.listen_address,
                RosettaContext::new(
                    args.offline_args.chain,
                    Some(node),
                    None,
                    node_version,
                ),
            )
        }
    };

    stacks_rosetta::bootstrap(context, listen_address).await;
    Ok(())
}
