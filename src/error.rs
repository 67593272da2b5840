// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! The fixed Rosetta error catalog.
//!
//! Every kind owns a stable code in the dense 601–639 range; codes MUST NOT
//! change once assigned, since clients key their handling on them.  The
//! `retriable` flag marks lookup failures and upstream unavailability where
//! re-sending the identical request may succeed.

use crate::{stacks::CodecError, types};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use warp::{http::StatusCode, reply::Reply};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug, Deserialize, Serialize, Error)]
pub enum ApiError {
    #[error("Invalid account")]
    InvalidAccount,
    #[error("Insufficient funds")]
    InsufficientFunds(Option<String>),
    #[error("Account is empty")]
    AccountEmpty,
    #[error("Invalid block index")]
    InvalidBlockIndex,
    #[error("Block not found")]
    BlockNotFound,
    #[error("Invalid block hash")]
    InvalidBlockHash,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Invalid transaction hash")]
    InvalidTransactionHash,
    #[error("Invalid params")]
    InvalidParams(Option<String>),
    #[error("Invalid network")]
    InvalidNetwork,
    #[error("Invalid blockchain")]
    InvalidBlockchain,
    #[error("Unknown error")]
    UnknownError(Option<String>),
    #[error("Network identifier required")]
    EmptyNetworkIdentifier,
    #[error("Account identifier required")]
    EmptyAccountIdentifier,
    #[error("Invalid block identifier")]
    InvalidBlockIdentifier,
    #[error("Block identifier required")]
    EmptyBlockIdentifier,
    #[error("Invalid sender address")]
    InvalidSender,
    #[error("Invalid recipient address")]
    InvalidRecipient,
    #[error("Invalid curve type")]
    InvalidCurveType,
    #[error("Invalid public key")]
    InvalidPublicKey(Option<String>),
    #[error("Invalid operation")]
    InvalidOperation(Option<String>),
    #[error("Invalid fee")]
    InvalidFee,
    #[error("Public key required")]
    EmptyPublicKey,
    #[error("Invalid transaction type")]
    InvalidTransactionType,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Nonce required")]
    MissingNonce,
    #[error("Sender address required")]
    MissingSenderAddress,
    #[error("Invalid transaction string")]
    InvalidTransactionString(Option<String>),
    #[error("Transaction is not signed")]
    TransactionNotSigned,
    #[error("Need exactly one public key")]
    NeedOnePublicKey,
    #[error("Public key not provided")]
    MissingPublicKey,
    #[error("Invalid signature recovery id")]
    InvalidRecoveryId,
    #[error("Node is unreachable")]
    NodeUnreachable(Option<String>),
    #[error("Transaction broadcast failed")]
    BroadcastFailed(Option<String>),
    #[error("Signature does not verify against the public key")]
    SignatureNotVerified,
    #[error("Invalid memo")]
    InvalidMemo(Option<String>),
    #[error("Need exactly one signature")]
    NeedOnlyOneSignature,
    #[error("Signature type is not supported")]
    SignatureTypeNotSupported,
    #[error("Transaction size required")]
    MissingTransactionSize,
}

impl ApiError {
    /// Every kind, in catalog order, for /network/options.
    pub fn all() -> Vec<ApiError> {
        use ApiError::*;
        vec![
            InvalidAccount,
            InsufficientFunds(None),
            AccountEmpty,
            InvalidBlockIndex,
            BlockNotFound,
            InvalidBlockHash,
            TransactionNotFound,
            InvalidTransactionHash,
            InvalidParams(None),
            InvalidNetwork,
            InvalidBlockchain,
            UnknownError(None),
            EmptyNetworkIdentifier,
            EmptyAccountIdentifier,
            InvalidBlockIdentifier,
            EmptyBlockIdentifier,
            InvalidSender,
            InvalidRecipient,
            InvalidCurveType,
            InvalidPublicKey(None),
            InvalidOperation(None),
            InvalidFee,
            EmptyPublicKey,
            InvalidTransactionType,
            InvalidSignature,
            MissingNonce,
            MissingSenderAddress,
            InvalidTransactionString(None),
            TransactionNotSigned,
            NeedOnePublicKey,
            MissingPublicKey,
            InvalidRecoveryId,
            NodeUnreachable(None),
            BroadcastFailed(None),
            SignatureNotVerified,
            InvalidMemo(None),
            NeedOnlyOneSignature,
            SignatureTypeNotSupported,
            MissingTransactionSize,
        ]
    }

    pub fn code(&self) -> u32 {
        use ApiError::*;
        match self {
            InvalidAccount => 601,
            InsufficientFunds(_) => 602,
            AccountEmpty => 603,
            InvalidBlockIndex => 604,
            BlockNotFound => 605,
            InvalidBlockHash => 606,
            TransactionNotFound => 607,
            InvalidTransactionHash => 608,
            InvalidParams(_) => 609,
            InvalidNetwork => 610,
            InvalidBlockchain => 611,
            UnknownError(_) => 612,
            EmptyNetworkIdentifier => 613,
            EmptyAccountIdentifier => 614,
            InvalidBlockIdentifier => 615,
            EmptyBlockIdentifier => 616,
            InvalidSender => 617,
            InvalidRecipient => 618,
            InvalidCurveType => 619,
            InvalidPublicKey(_) => 620,
            InvalidOperation(_) => 621,
            InvalidFee => 622,
            EmptyPublicKey => 623,
            InvalidTransactionType => 624,
            InvalidSignature => 625,
            MissingNonce => 626,
            MissingSenderAddress => 627,
            InvalidTransactionString(_) => 628,
            TransactionNotSigned => 629,
            NeedOnePublicKey => 630,
            MissingPublicKey => 631,
            InvalidRecoveryId => 632,
            NodeUnreachable(_) => 633,
            BroadcastFailed(_) => 634,
            SignatureNotVerified => 635,
            InvalidMemo(_) => 636,
            NeedOnlyOneSignature => 637,
            SignatureTypeNotSupported => 638,
            MissingTransactionSize => 639,
        }
    }

    /// Lookup failures and upstream unavailability are worth re-sending;
    /// validation failures are not.
    pub fn retriable(&self) -> bool {
        matches!(
            self,
            ApiError::BlockNotFound
                | ApiError::TransactionNotFound
                | ApiError::UnknownError(_)
                | ApiError::NodeUnreachable(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownError(_) | ApiError::NodeUnreachable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    fn details(&self) -> Option<&String> {
        use ApiError::*;
        match self {
            InsufficientFunds(details)
            | InvalidParams(details)
            | UnknownError(details)
            | InvalidPublicKey(details)
            | InvalidOperation(details)
            | InvalidTransactionString(details)
            | NodeUnreachable(details)
            | BroadcastFailed(details)
            | InvalidMemo(details) => details.as_ref(),
            _ => None,
        }
    }

    pub fn into_error(self) -> types::Error {
        (&self).into()
    }

    pub fn invalid_transaction_string<E: std::fmt::Display>(err: E) -> ApiError {
        ApiError::InvalidTransactionString(Some(err.to_string()))
    }

    pub fn invalid_operation(reason: &str) -> ApiError {
        ApiError::InvalidOperation(Some(reason.to_string()))
    }
}

impl From<&ApiError> for types::Error {
    fn from(error: &ApiError) -> Self {
        let details = error.details().map(|message| {
            let mut map = BTreeMap::new();
            map.insert("message".to_string(), message.clone());
            map
        });
        types::Error {
            code: error.code(),
            message: error.message(),
            retriable: error.retriable(),
            details,
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::InvalidTransactionString(Some(err.to_string()))
    }
}

impl From<hex::FromHexError> for ApiError {
    fn from(err: hex::FromHexError) -> Self {
        ApiError::InvalidTransactionString(Some(err.to_string()))
    }
}

impl warp::reject::Reject for ApiError {}

impl Reply for ApiError {
    fn into_response(self) -> warp::reply::Response {
        let status = self.status_code();
        warp::reply::with_status(warp::reply::json(&self.into_error()), status).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_dense_and_stable() {
        let all = ApiError::all();
        assert_eq!(all.len(), 39);
        for (offset, error) in all.iter().enumerate() {
            assert_eq!(error.code(), 601 + offset as u32);
        }
    }

    #[test]
    fn pinned_codes() {
        assert_eq!(ApiError::InvalidNetwork.code(), 610);
        assert_eq!(ApiError::InvalidBlockchain.code(), 611);
        assert_eq!(ApiError::EmptyNetworkIdentifier.code(), 613);
        assert_eq!(ApiError::InvalidCurveType.code(), 619);
        assert_eq!(ApiError::InvalidTransactionString(None).code(), 628);
        assert_eq!(ApiError::TransactionNotSigned.code(), 629);
        assert_eq!(ApiError::SignatureNotVerified.code(), 635);
        assert_eq!(ApiError::NeedOnlyOneSignature.code(), 637);
        assert_eq!(ApiError::SignatureTypeNotSupported.code(), 638);
        assert_eq!(ApiError::MissingTransactionSize.code(), 639);
    }

    #[test]
    fn retriable_kinds() {
        assert!(ApiError::BlockNotFound.retriable());
        assert!(ApiError::TransactionNotFound.retriable());
        assert!(ApiError::UnknownError(None).retriable());
        assert!(!ApiError::InvalidOperation(None).retriable());
        assert!(!ApiError::SignatureNotVerified.retriable());
    }

    #[test]
    fn renders_details_map() {
        let error = ApiError::UnknownError(Some("node exploded".to_string())).into_error();
        assert_eq!(error.code, 612);
        assert!(error.retriable);
        assert_eq!(
            error.details.unwrap().get("message").unwrap(),
            "node exploded"
        );

        let bare = ApiError::InvalidSender.into_error();
        assert!(bare.details.is_none());
    }
}
