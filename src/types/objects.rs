// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Rosetta object models plus the mapping between operation lists and
//! chain-native transactions.
//!
//! The forward direction distills a balanced debit/credit operation pair
//! into an [`InternalOperation`]; the reverse direction renders a parsed
//! transaction back into the canonical operation ordering (fee first, then
//! the transfer legs).

use crate::{
    common::native_coin,
    error::{ApiError, ApiResult},
    types::{AccountIdentifier, OperationIdentifier},
    stacks::{transaction::MEMO_LEN, StacksTransaction, TransactionPayload, Txid},
};
use serde::{Deserialize, Serialize};

/// [API Spec](https://www.rosetta-api.org/docs/models/Currency.html)
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/Amount.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Amount {
    /// Signed decimal string; negative is a debit.
    pub value: String,
    pub currency: Currency,
}

impl Amount {
    pub fn credit(value: u64) -> Amount {
        Amount {
            value: value.to_string(),
            currency: native_coin(),
        }
    }

    pub fn debit(value: u64) -> Amount {
        let value = if value == 0 {
            "0".to_string()
        } else {
            format!("-{}", value)
        };
        Amount {
            value,
            currency: native_coin(),
        }
    }
}

/// [API Spec](https://www.rosetta-api.org/docs/models/CurveType.html)
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    Secp256k1,
    Edwards25519,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/PublicKey.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: CurveType,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/SignatureType.html)
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Ecdsa,
    EcdsaRecovery,
    Ed25519,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/SigningPayload.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SigningPayload {
    /// Deprecated in favor of account_identifier but still emitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<AccountIdentifier>,
    pub hex_bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<SignatureType>,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/Signature.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: SignatureType,
    pub hex_bytes: String,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/CoinAction.html)
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinAction {
    CoinCreated,
    CoinSpent,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/CoinIdentifier.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoinIdentifier {
    pub identifier: String,
}

/// [API Spec](https://www.rosetta-api.org/docs/models/CoinChange.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

impl CoinChange {
    fn spent(txid: &Txid, index: u64) -> CoinChange {
        CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{}:{}", txid, index),
            },
            coin_action: CoinAction::CoinSpent,
        }
    }

    fn created(txid: &Txid, index: u64) -> CoinChange {
        CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{}:{}", txid, index),
            },
            coin_action: CoinAction::CoinCreated,
        }
    }
}

pub const OPERATION_TYPE_TOKEN_TRANSFER: &str = "token_transfer";
pub const OPERATION_TYPE_FEE: &str = "fee";

/// All operation types the server emits, for /network/options.
pub fn all_operation_types() -> Vec<String> {
    vec![
        "token_transfer".to_string(),
        "contract_call".to_string(),
        "smart_contract".to_string(),
        "coinbase".to_string(),
        "poison_microblock".to_string(),
        "fee".to_string(),
    ]
}

/// A single credit or debit atom.
///
/// Status must be populated for mined transactions and absent for anything
/// still being constructed or parsed.
///
/// [API Spec](https://www.rosetta-api.org/docs/models/Operation.html)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_operations: Option<Vec<OperationIdentifier>>,
    #[serde(rename = "type")]
    pub operation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    fn new(index: u64, operation_type: &str, status: Option<&str>) -> Operation {
        Operation {
            operation_identifier: OperationIdentifier::new(index),
            related_operations: None,
            operation_type: operation_type.to_string(),
            status: status.map(|s| s.to_string()),
            account: None,
            amount: None,
            coin_change: None,
            metadata: None,
        }
    }

    pub fn fee(index: u64, account: AccountIdentifier, fee: u64, status: Option<&str>) -> Operation {
        let mut op = Operation::new(index, OPERATION_TYPE_FEE, status);
        op.account = Some(account);
        op.amount = Some(Amount::debit(fee));
        op
    }

    pub fn transfer_debit(
        index: u64,
        account: AccountIdentifier,
        amount: u64,
        txid: &Txid,
        status: Option<&str>,
    ) -> Operation {
        let mut op = Operation::new(index, OPERATION_TYPE_TOKEN_TRANSFER, status);
        op.account = Some(account);
        op.amount = Some(Amount::debit(amount));
        op.coin_change = Some(CoinChange::spent(txid, index));
        op
    }

    pub fn transfer_credit(
        index: u64,
        account: AccountIdentifier,
        amount: u64,
        related_to: u64,
        txid: &Txid,
        status: Option<&str>,
    ) -> Operation {
        let mut op = Operation::new(index, OPERATION_TYPE_TOKEN_TRANSFER, status);
        op.account = Some(account);
        op.amount = Some(Amount::credit(amount));
        op.related_operations = Some(vec![OperationIdentifier::new(related_to)]);
        op.coin_change = Some(CoinChange::created(txid, index));
        op
    }

    fn typed(index: u64, operation_type: &str, account: AccountIdentifier, status: Option<&str>) -> Operation {
        let mut op = Operation::new(index, operation_type, status);
        op.account = Some(account);
        op
    }
}

/// The semantic transfer a balanced operation pair describes.  Only token
/// transfers participate in construction; the other payload kinds are
/// parse-only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InternalOperation {
    TokenTransfer {
        sender: String,
        recipient: String,
        amount: u64,
        memo: Option<String>,
    },
}

impl InternalOperation {
    /// Forward mapping: exactly one debit and one credit of equal magnitude,
    /// both `token_transfer` in the native currency.
    pub fn extract(operations: &[Operation]) -> ApiResult<InternalOperation> {
        if operations.len() != 2 {
            return Err(ApiError::invalid_operation(
                "expected exactly one debit and one credit operation",
            ));
        }

        let mut debit = None;
        let mut credit = None;
        for operation in operations {
            if operation.operation_type != OPERATION_TYPE_TOKEN_TRANSFER {
                return Err(ApiError::invalid_operation(
                    "only token_transfer operations are supported",
                ));
            }
            let amount = operation
                .amount
                .as_ref()
                .ok_or_else(|| ApiError::invalid_operation("operation amount is required"))?;
            if amount.currency != native_coin() {
                return Err(ApiError::invalid_operation("unsupported currency"));
            }
            let value: i128 = amount
                .value
                .parse()
                .map_err(|_| ApiError::invalid_operation("amount is not an integer"))?;
            let account = operation
                .account
                .as_ref()
                .ok_or_else(|| ApiError::invalid_operation("operation account is required"))?;

            if value < 0 {
                if debit.replace((account, value, operation)).is_some() {
                    return Err(ApiError::invalid_operation("more than one debit operation"));
                }
            } else if value > 0 {
                if credit.replace((account, value, operation)).is_some() {
                    return Err(ApiError::invalid_operation("more than one credit operation"));
                }
            } else {
                return Err(ApiError::invalid_operation("zero-valued operation"));
            }
        }

        let (debit_account, debit_value, _) =
            debit.ok_or_else(|| ApiError::invalid_operation("debit operation is required"))?;
        let (credit_account, credit_value, credit_op) =
            credit.ok_or_else(|| ApiError::invalid_operation("credit operation is required"))?;

        if debit_value.checked_add(credit_value) != Some(0) {
            return Err(ApiError::invalid_operation(
                "debit and credit amounts do not balance",
            ));
        }
        let amount = u64::try_from(credit_value)
            .map_err(|_| ApiError::invalid_operation("amount out of range"))?;

        let memo = credit_op
            .metadata
            .as_ref()
            .and_then(|m| m.get("memo"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string());

        Ok(InternalOperation::TokenTransfer {
            sender: debit_account.address.clone(),
            recipient: credit_account.address.clone(),
            amount,
            memo,
        })
    }

    pub fn sender(&self) -> &str {
        match self {
            InternalOperation::TokenTransfer { sender, .. } => sender,
        }
    }
}

/// Render a memo string into the fixed-size wire buffer.
pub fn memo_bytes(memo: Option<&str>) -> ApiResult<[u8; MEMO_LEN]> {
    let mut buf = [0u8; MEMO_LEN];
    if let Some(memo) = memo {
        let bytes = memo.as_bytes();
        if bytes.len() > MEMO_LEN {
            return Err(ApiError::InvalidMemo(Some(format!(
                "memo is {} bytes, maximum is {}",
                bytes.len(),
                MEMO_LEN
            ))));
        }
        buf[..bytes.len()].copy_from_slice(bytes);
    }
    Ok(buf)
}

/// Reverse mapping: a parsed transaction back into its operation list.
///
/// Token transfers produce the canonical fee / debit / credit triple; other
/// recognized payloads produce their fee (where one is paid) plus a single
/// typed operation at the origin account.
pub fn operations_from_transaction(
    tx: &StacksTransaction,
    status: Option<&str>,
) -> ApiResult<Vec<Operation>> {
    let txid = tx.txid();
    let sender = AccountIdentifier::from(tx.origin_address());
    let fee = tx.fee();

    let operations = match &tx.payload {
        TransactionPayload::TokenTransfer {
            recipient,
            amount,
            memo,
        } => {
            let mut credit = Operation::transfer_credit(
                2,
                AccountIdentifier::new(recipient.to_string()),
                *amount,
                1,
                &txid,
                status,
            );
            let trimmed: Vec<u8> = memo.iter().copied().take_while(|b| *b != 0).collect();
            if !trimmed.is_empty() {
                credit.metadata = Some(serde_json::json!({
                    "memo": String::from_utf8_lossy(&trimmed),
                }));
            }

            vec![
                Operation::fee(0, sender.clone(), fee, status),
                Operation::transfer_debit(1, sender, *amount, &txid, status),
                credit,
            ]
        }
        TransactionPayload::ContractCall { .. } | TransactionPayload::SmartContract { .. } => {
            vec![
                Operation::fee(0, sender.clone(), fee, status),
                Operation::typed(1, tx.payload.operation_type(), sender, status),
            ]
        }
        TransactionPayload::PoisonMicroblock { .. } | TransactionPayload::Coinbase { .. } => {
            vec![Operation::typed(
                0,
                tx.payload.operation_type(),
                sender,
                status,
            )]
        }
    };

    Ok(operations)
}
