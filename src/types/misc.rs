// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// [API Spec](https://www.rosetta-api.org/docs/models/Error.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Error {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// Status of an operation, with whether it counts as successful.
///
/// [API Spec](https://www.rosetta-api.org/docs/models/OperationStatus.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OperationStatus {
    pub status: String,
    pub successful: bool,
}

impl OperationStatus {
    pub fn new(status: &str, successful: bool) -> Self {
        OperationStatus {
            status: status.to_string(),
            successful,
        }
    }
}

/// All operation statuses the server emits.
///
/// `pending` is reported as successful for wire compatibility with existing
/// deployments, even though it is not a terminal status.
pub fn all_operation_statuses() -> Vec<OperationStatus> {
    vec![
        OperationStatus::new("success", true),
        OperationStatus::new("pending", true),
        OperationStatus::new("abort_by_response", false),
        OperationStatus::new("abort_by_post_condition", false),
    ]
}

/// [API Spec](https://www.rosetta-api.org/docs/models/Version.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Version {
    /// Rosetta spec version, hardcoded.
    pub rosetta_version: String,
    /// Version reported by the backing node.
    pub node_version: String,
    /// Version of this software.
    pub middleware_version: String,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/Allow.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Allow {
    pub operation_statuses: Vec<OperationStatus>,
    pub operation_types: Vec<String>,
    pub errors: Vec<Error>,
    pub historical_balance_lookup: bool,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/Peer.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Peer {
    pub peer_id: String,
}
