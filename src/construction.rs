// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Construction APIs
//!
//! The construction flow breaks transaction building into stateless steps a
//! wallet drives in sequence:
//!
//! * Preprocess (based on operations) gathers what metadata must fetch
//! * Metadata fetches on-chain information, e.g. the account nonce
//! * Payloads generates an unsigned transaction and the digest to sign
//! * The wallet signs the digest outside this server
//! * Combine injects the signature into the unsigned transaction
//! * Submit broadcasts the signed transaction to the node
//!
//! Derive (address from public key) and Hash (txid of a signed blob) round
//! out the set.  Every endpoint is a pure function of its request; only
//! metadata and submit talk to the node.

use crate::{
    common::{
        check_network, decode_hex, encode_hex, handle_request, with_context,
        TOKEN_TRANSFER_TX_SIZE,
    },
    error::{ApiError, ApiResult},
    types::*,
    RosettaContext,
};
use crate::stacks::{
    recover_public_key, transaction::SIGNATURE_LEN, verify_signature, MessageSignature, Principal,
    StacksAddress, StacksTransaction,
};
use tracing::debug;
use warp::Filter;

pub fn combine_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "combine")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_combine))
}

pub fn derive_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "derive")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_derive))
}

pub fn hash_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "hash")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_hash))
}

pub fn metadata_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "metadata")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_metadata))
}

pub fn parse_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "parse")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_parse))
}

pub fn payloads_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "payloads")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_payloads))
}

pub fn preprocess_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "preprocess")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_preprocess))
}

pub fn submit_route(
    server_context: RosettaContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rosetta" / "v1" / "construction" / "submit")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server_context))
        .and_then(handle_request(construction_submit))
}

/// Parse a hex public key as a 33-byte compressed secp256k1 point.
fn decode_public_key(public_key: &PublicKey) -> ApiResult<[u8; 33]> {
    if public_key.curve_type != CurveType::Secp256k1 {
        return Err(ApiError::InvalidCurveType);
    }
    let bytes = decode_hex(&public_key.hex_bytes)
        .map_err(|e| ApiError::InvalidPublicKey(Some(e.to_string())))?;
    if bytes.len() != 33 {
        return Err(ApiError::InvalidPublicKey(Some(format!(
            "public key has {} bytes, expected 33",
            bytes.len()
        ))));
    }
    let key = secp256k1::PublicKey::from_slice(&bytes)
        .map_err(|e| ApiError::InvalidPublicKey(Some(e.to_string())))?;
    Ok(key.serialize())
}

/// Construction derive command (OFFLINE)
///
/// Derive an account address from a public key.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionderive)
async fn construction_derive(
    request: ConstructionDeriveRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionDeriveResponse> {
    debug!("/construction/derive {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let key = decode_public_key(&request.public_key)?;
    let address = StacksAddress::from_public_key(server_context.network, &key);

    Ok(ConstructionDeriveResponse {
        account_identifier: address.into(),
    })
}

/// Construction preprocess command (OFFLINE)
///
/// Distill the operation list into the options metadata will need.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionpreprocess)
async fn construction_preprocess(
    request: ConstructionPreprocessRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionPreprocessResponse> {
    debug!("/construction/preprocess {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let InternalOperation::TokenTransfer {
        sender,
        recipient,
        amount,
        memo,
    } = InternalOperation::extract(&request.operations)?;

    let max_fee = request
        .max_fee
        .as_ref()
        .and_then(|fees| fees.first())
        .map(|fee| fee.value.clone());

    let required_public_keys = vec![AccountIdentifier::new(sender.clone())];

    Ok(ConstructionPreprocessResponse {
        options: MetadataOptions {
            sender_address: Some(sender),
            operation_type: OPERATION_TYPE_TOKEN_TRANSFER.to_string(),
            token_transfer_recipient_address: recipient,
            amount: amount.to_string(),
            symbol: crate::common::CURRENCY_SYMBOL.to_string(),
            decimals: crate::common::CURRENCY_DECIMALS,
            memo,
            max_fee,
            suggested_fee_multiplier: request.suggested_fee_multiplier,
            size: Some(TOKEN_TRANSFER_TX_SIZE),
        },
        required_public_keys,
    })
}

/// Construction metadata command (ONLINE)
///
/// Fetch the sender's nonce and a fee suggestion from the node.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionmetadata)
async fn construction_metadata(
    request: ConstructionMetadataRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionMetadataResponse> {
    debug!("/construction/metadata {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let options = request.options;
    if options.operation_type != OPERATION_TYPE_TOKEN_TRANSFER {
        return Err(ApiError::InvalidTransactionType);
    }

    let sender_address = options
        .sender_address
        .as_deref()
        .ok_or(ApiError::MissingSenderAddress)?;
    let sender: StacksAddress = sender_address
        .parse()
        .map_err(|_| ApiError::InvalidSender)?;
    if !sender.is_valid_for(server_context.network) {
        return Err(ApiError::InvalidSender);
    }

    let recipient: Principal = options
        .token_transfer_recipient_address
        .parse()
        .map_err(|_| ApiError::InvalidRecipient)?;
    if !recipient.address().is_valid_for(server_context.network) {
        return Err(ApiError::InvalidRecipient);
    }

    // An offered public key must re-derive the sender address.
    if let Some(key) = request.public_keys.as_ref().and_then(|keys| keys.first()) {
        let key = decode_public_key(key)?;
        let derived = StacksAddress::from_public_key(server_context.network, &key);
        if derived != sender {
            return Err(ApiError::InvalidPublicKey(Some(
                "public key does not match the sender address".to_string(),
            )));
        }
    }

    let size = options.size.ok_or(ApiError::MissingTransactionSize)?;

    let node = server_context.node_client()?;
    let account = node.get_account(sender_address).await?;
    let fee_rate = node.get_fee_rate().await?;

    // Treat the multiplier as a rational >= 1 and round the fee up.
    let multiplier = options
        .suggested_fee_multiplier
        .unwrap_or(1.0)
        .max(1.0);
    let mut fee = ((fee_rate.saturating_mul(size)) as f64 * multiplier).ceil() as u64;
    if let Some(max_fee) = options.max_fee.as_deref() {
        let max_fee: u64 = max_fee.parse().map_err(|_| ApiError::InvalidFee)?;
        fee = fee.min(max_fee);
    }

    let recent_block_hash = match server_context.store() {
        Ok(store) => store.current_block().await?.map(|block| block.hash),
        Err(_) => None,
    };

    Ok(ConstructionMetadataResponse {
        metadata: ConstructionMetadata {
            account_sequence: account.nonce,
            recent_block_hash,
            fee: fee.to_string(),
            memo: options.memo,
        },
        suggested_fee: vec![Amount::credit(fee)],
    })
}

/// Construction payloads command (OFFLINE)
///
/// Build the unsigned transaction and the presign digest for the wallet.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionpayloads)
async fn construction_payloads(
    request: ConstructionPayloadsRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionPayloadsResponse> {
    debug!("/construction/payloads {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let InternalOperation::TokenTransfer {
        sender,
        recipient,
        amount,
        memo,
    } = InternalOperation::extract(&request.operations)?;

    let public_key = match request.public_keys.len() {
        0 => return Err(ApiError::EmptyPublicKey),
        1 => decode_public_key(&request.public_keys[0])?,
        _ => return Err(ApiError::NeedOnePublicKey),
    };

    let sender_address: StacksAddress =
        sender.parse().map_err(|_| ApiError::InvalidSender)?;
    if !sender_address.is_valid_for(server_context.network) {
        return Err(ApiError::InvalidSender);
    }
    let derived = StacksAddress::from_public_key(server_context.network, &public_key);
    if derived != sender_address {
        return Err(ApiError::InvalidPublicKey(Some(
            "public key does not match the sender address".to_string(),
        )));
    }

    let recipient: Principal = recipient.parse().map_err(|_| ApiError::InvalidRecipient)?;
    if !recipient.address().is_valid_for(server_context.network) {
        return Err(ApiError::InvalidRecipient);
    }

    let metadata = request
        .metadata
        .as_ref()
        .ok_or_else(|| ApiError::InvalidParams(Some("metadata with fee is required".to_string())))?;
    let fee: u64 = metadata.fee.parse().map_err(|_| ApiError::InvalidFee)?;
    let nonce = metadata
        .nonce
        .or(metadata.account_sequence)
        .ok_or(ApiError::MissingNonce)?;
    let memo = memo_bytes(metadata.memo.as_deref().or(memo.as_deref()))?;

    let unsigned_tx = StacksTransaction::new_token_transfer(
        server_context.network,
        &sender_address,
        recipient,
        amount,
        fee,
        nonce,
        memo,
    );

    let presign = unsigned_tx.origin_presign_hash();
    let payload = SigningPayload {
        address: Some(sender.clone()),
        account_identifier: Some(AccountIdentifier::new(sender)),
        hex_bytes: presign.to_string(),
        signature_type: Some(SignatureType::EcdsaRecovery),
    };

    Ok(ConstructionPayloadsResponse {
        unsigned_transaction: encode_hex(&unsigned_tx.serialize()),
        payloads: vec![payload],
    })
}

/// Construction parse command (OFFLINE)
///
/// Recover the operations a transaction encodes, for wallet-side
/// verification of construction.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionparse)
async fn construction_parse(
    request: ConstructionParseRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionParseResponse> {
    debug!("/construction/parse {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let bytes = decode_hex(&request.transaction)?;
    let tx = StacksTransaction::deserialize(&bytes)?;

    let account_identifier_signers = if request.signed {
        if !tx.is_signed() {
            return Err(ApiError::TransactionNotSigned);
        }
        // The signer is whoever's key the signature recovers to.
        let presign = tx.origin_presign_hash();
        let recovered = recover_public_key(&presign, &tx.auth.origin().signature)
            .map_err(|_| ApiError::InvalidSignature)?;
        let signer = StacksAddress::from_public_key(server_context.network, &recovered);
        Some(vec![AccountIdentifier::from(signer)])
    } else {
        None
    };

    Ok(ConstructionParseResponse {
        operations: operations_from_transaction(&tx, None)?,
        account_identifier_signers,
    })
}

/// The wire order is `recovery ‖ r ‖ s`, but many wallets emit
/// `r ‖ s ‖ recovery`.  Collect every reading whose recovery byte is valid
/// and let verification pick the right one.
fn signature_candidates(bytes: &[u8]) -> Vec<MessageSignature> {
    let mut candidates = Vec::with_capacity(2);
    if bytes[0] <= 1 {
        let mut wire = [0u8; SIGNATURE_LEN];
        wire.copy_from_slice(bytes);
        candidates.push(MessageSignature(wire));
    }
    if bytes[SIGNATURE_LEN - 1] <= 1 {
        let mut wire = [0u8; SIGNATURE_LEN];
        wire[0] = bytes[SIGNATURE_LEN - 1];
        wire[1..].copy_from_slice(&bytes[..SIGNATURE_LEN - 1]);
        candidates.push(MessageSignature(wire));
    }
    candidates
}

/// Construction combine command (OFFLINE)
///
/// Inject a wallet's signature into an unsigned transaction.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructioncombine)
async fn construction_combine(
    request: ConstructionCombineRequest,
    server_context: RosettaContext,
) -> ApiResult<ConstructionCombineResponse> {
    debug!("/construction/combine {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let bytes = decode_hex(&request.unsigned_transaction)?;
    let mut tx = StacksTransaction::deserialize(&bytes)?;

    // Single signer only; multi-sig is out of scope.
    if request.signatures.len() != 1 {
        return Err(ApiError::NeedOnlyOneSignature);
    }
    let signature = &request.signatures[0];

    if signature.signature_type != SignatureType::EcdsaRecovery {
        return Err(ApiError::SignatureTypeNotSupported);
    }

    let signature_bytes =
        decode_hex(&signature.hex_bytes).map_err(|_| ApiError::InvalidSignature)?;
    if signature_bytes.len() != SIGNATURE_LEN {
        return Err(ApiError::InvalidSignature);
    }

    let claimed_key = decode_public_key(&signature.public_key)?;
    let presign = tx.origin_presign_hash();

    let verified = signature_candidates(&signature_bytes)
        .into_iter()
        .find(|candidate| verify_signature(&presign, candidate, &claimed_key))
        .ok_or(ApiError::SignatureNotVerified)?;

    tx.set_origin_signature(verified);

    Ok(ConstructionCombineResponse {
        signed_transaction: encode_hex(&tx.serialize()),
    })
}

/// Construction hash command (OFFLINE)
///
/// The txid of a signed transaction, for mempool lookup.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionhash)
async fn construction_hash(
    request: ConstructionHashRequest,
    server_context: RosettaContext,
) -> ApiResult<TransactionIdentifierResponse> {
    debug!("/construction/hash {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let bytes = decode_hex(&request.signed_transaction)?;
    let tx = StacksTransaction::deserialize(&bytes)?;
    if !tx.is_signed() {
        return Err(ApiError::TransactionNotSigned);
    }

    Ok(TransactionIdentifierResponse {
        transaction_identifier: tx.txid().into(),
    })
}

/// Construction submit command (ONLINE)
///
/// Broadcast a signed transaction to the node.
///
/// [API Spec](https://www.rosetta-api.org/docs/ConstructionApi.html#constructionsubmit)
async fn construction_submit(
    request: ConstructionSubmitRequest,
    server_context: RosettaContext,
) -> ApiResult<TransactionIdentifierResponse> {
    debug!("/construction/submit {:?}", request);
    check_network(request.network_identifier.as_ref(), &server_context)?;

    let bytes = decode_hex(&request.signed_transaction)?;
    let tx = StacksTransaction::deserialize(&bytes)?;
    if !tx.is_signed() {
        return Err(ApiError::TransactionNotSigned);
    }

    let node = server_context.node_client()?;
    let txid = node.broadcast_transaction(&bytes).await?;

    Ok(TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier { hash: txid },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stacks::ChainNetwork;
    use once_cell::sync::Lazy;
    use secp256k1::{Message, Secp256k1, SecretKey};

    static SECP: Lazy<Secp256k1<secp256k1::All>> = Lazy::new(Secp256k1::new);

    fn testnet_context() -> RosettaContext {
        RosettaContext::offline(ChainNetwork::Testnet)
    }

    fn network() -> Option<NetworkIdentifier> {
        Some(NetworkIdentifier::from(ChainNetwork::Testnet))
    }

    fn key_pair(seed: u8) -> (SecretKey, PublicKey, StacksAddress) {
        let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
        let compressed = secret.public_key(&SECP).serialize();
        let address = StacksAddress::from_public_key(ChainNetwork::Testnet, &compressed);
        let public = PublicKey {
            hex_bytes: hex::encode(compressed),
            curve_type: CurveType::Secp256k1,
        };
        (secret, public, address)
    }

    fn transfer_operations(sender: &StacksAddress, recipient: &StacksAddress) -> Vec<Operation> {
        serde_json::from_value(serde_json::json!([
            {
                "operation_identifier": { "index": 0 },
                "type": "token_transfer",
                "account": { "address": sender.to_string() },
                "amount": { "value": "-500000", "currency": { "symbol": "STX", "decimals": 6 } }
            },
            {
                "operation_identifier": { "index": 1 },
                "type": "token_transfer",
                "account": { "address": recipient.to_string() },
                "amount": { "value": "500000", "currency": { "symbol": "STX", "decimals": 6 } }
            }
        ]))
        .unwrap()
    }

    fn payloads_request(
        sender_key: &PublicKey,
        sender: &StacksAddress,
        recipient: &StacksAddress,
    ) -> ConstructionPayloadsRequest {
        ConstructionPayloadsRequest {
            network_identifier: network(),
            operations: transfer_operations(sender, recipient),
            metadata: Some(PayloadsMetadata {
                account_sequence: Some(4),
                recent_block_hash: None,
                fee: "180".to_string(),
                nonce: None,
                memo: None,
            }),
            public_keys: vec![sender_key.clone()],
        }
    }

    fn sign_presign_hex(secret: &SecretKey, presign_hex: &str) -> String {
        let digest = decode_hex(presign_hex).unwrap();
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&digest);
        let (recovery_id, compact) = SECP
            .sign_ecdsa_recoverable(&Message::from_digest(buf), secret)
            .serialize_compact();
        let mut wire = [0u8; SIGNATURE_LEN];
        wire[0] = recovery_id.to_i32() as u8;
        wire[1..].copy_from_slice(&compact);
        hex::encode(wire)
    }

    fn combine_request(
        unsigned_transaction: &str,
        payload: &SigningPayload,
        public_key: &PublicKey,
        signature_hex: &str,
    ) -> ConstructionCombineRequest {
        ConstructionCombineRequest {
            network_identifier: network(),
            unsigned_transaction: unsigned_transaction.to_string(),
            signatures: vec![Signature {
                signing_payload: payload.clone(),
                public_key: public_key.clone(),
                signature_type: SignatureType::EcdsaRecovery,
                hex_bytes: signature_hex.to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn derive_returns_c32_address() {
        let request = ConstructionDeriveRequest {
            network_identifier: network(),
            public_key: PublicKey {
                hex_bytes: "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51"
                    .to_string(),
                curve_type: CurveType::Secp256k1,
            },
        };
        let response = construction_derive(request, testnet_context()).await.unwrap();
        assert_eq!(
            response.account_identifier.address,
            "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM"
        );
    }

    #[tokio::test]
    async fn derive_rejects_wrong_curve() {
        let request = ConstructionDeriveRequest {
            network_identifier: network(),
            public_key: PublicKey {
                hex_bytes: "00".repeat(32),
                curve_type: CurveType::Edwards25519,
            },
        };
        let error = construction_derive(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 619);
    }

    #[tokio::test]
    async fn derive_rejects_bad_points() {
        for hex_bytes in [
            "02deadbeef".to_string(), // truncated
            "ff".repeat(33),          // not a valid compressed point
        ] {
            let request = ConstructionDeriveRequest {
                network_identifier: network(),
                public_key: PublicKey {
                    hex_bytes,
                    curve_type: CurveType::Secp256k1,
                },
            };
            let error = construction_derive(request, testnet_context())
                .await
                .unwrap_err();
            assert_eq!(error.code(), 620);
        }
    }

    #[tokio::test]
    async fn derive_rejects_missing_network() {
        let request = ConstructionDeriveRequest {
            network_identifier: None,
            public_key: PublicKey {
                hex_bytes: "02".to_string(),
                curve_type: CurveType::Secp256k1,
            },
        };
        let error = construction_derive(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 613);
    }

    #[tokio::test]
    async fn preprocess_distills_options() {
        let (_, _, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let request = ConstructionPreprocessRequest {
            network_identifier: network(),
            operations: transfer_operations(&sender, &recipient),
            metadata: None,
            max_fee: Some(vec![Amount {
                value: "12380898".to_string(),
                currency: crate::common::native_coin(),
            }]),
            suggested_fee_multiplier: Some(1.0),
        };

        let response = construction_preprocess(request, testnet_context())
            .await
            .unwrap();

        let options = &response.options;
        assert_eq!(options.sender_address.as_deref(), Some(sender.to_string().as_str()));
        assert_eq!(
            options.token_transfer_recipient_address,
            recipient.to_string()
        );
        assert_eq!(options.amount, "500000");
        assert_eq!(options.size, Some(180));
        assert_eq!(options.max_fee.as_deref(), Some("12380898"));
        assert_eq!(options.suggested_fee_multiplier, Some(1.0));
        assert_eq!(
            response.required_public_keys,
            vec![AccountIdentifier::new(sender.to_string())]
        );
    }

    #[tokio::test]
    async fn preprocess_rejects_imbalance() {
        let (_, _, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);
        let mut operations = transfer_operations(&sender, &recipient);
        operations[1].amount.as_mut().unwrap().value = "400000".to_string();

        let request = ConstructionPreprocessRequest {
            network_identifier: network(),
            operations,
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        };
        let error = construction_preprocess(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 621);
    }

    #[tokio::test]
    async fn payloads_then_parse_round_trips_operations() {
        let (_, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let response = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();

        assert!(response.unsigned_transaction.starts_with("0x"));
        assert_eq!(response.payloads.len(), 1);
        let payload = &response.payloads[0];
        assert_eq!(payload.address.as_deref(), Some(sender.to_string().as_str()));
        assert_eq!(payload.signature_type, Some(SignatureType::EcdsaRecovery));
        // 32-byte digest rendered as 0x + 64 chars.
        assert_eq!(payload.hex_bytes.len(), 66);

        let parse = construction_parse(
            ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: response.unsigned_transaction.clone(),
            },
            testnet_context(),
        )
        .await
        .unwrap();

        assert!(parse.account_identifier_signers.is_none());
        assert_eq!(parse.operations.len(), 3);
        assert_eq!(parse.operations[0].operation_type, "fee");
        assert_eq!(parse.operations[0].amount.as_ref().unwrap().value, "-180");
        assert_eq!(parse.operations[1].operation_type, "token_transfer");
        assert_eq!(
            parse.operations[1].account.as_ref().unwrap().address,
            sender.to_string()
        );
        assert_eq!(parse.operations[1].amount.as_ref().unwrap().value, "-500000");
        assert_eq!(
            parse.operations[2].account.as_ref().unwrap().address,
            recipient.to_string()
        );
        assert_eq!(parse.operations[2].amount.as_ref().unwrap().value, "500000");
        for operation in &parse.operations {
            assert!(operation.status.is_none());
        }
    }

    #[tokio::test]
    async fn payloads_public_key_count_is_enforced() {
        let (_, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let mut request = payloads_request(&sender_key, &sender, &recipient);
        request.public_keys.clear();
        let error = construction_payloads(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 623);

        let mut request = payloads_request(&sender_key, &sender, &recipient);
        request.public_keys.push(sender_key.clone());
        let error = construction_payloads(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 630);
    }

    #[tokio::test]
    async fn payloads_requires_nonce_source() {
        let (_, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let mut request = payloads_request(&sender_key, &sender, &recipient);
        request.metadata.as_mut().unwrap().account_sequence = None;
        let error = construction_payloads(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 626);
    }

    #[tokio::test]
    async fn payloads_rejects_mismatched_key() {
        let (_, _, sender) = key_pair(0x11);
        let (_, other_key, _) = key_pair(0x33);
        let (_, _, recipient) = key_pair(0x22);

        let error = construction_payloads(
            payloads_request(&other_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 620);
    }

    #[tokio::test]
    async fn sign_combine_parse_chain() {
        let (sender_secret, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];

        let signature_hex = sign_presign_hex(&sender_secret, &payload.hex_bytes);
        let combined = construction_combine(
            combine_request(
                &payloads.unsigned_transaction,
                payload,
                &sender_key,
                &signature_hex,
            ),
            testnet_context(),
        )
        .await
        .unwrap();

        let parse = construction_parse(
            ConstructionParseRequest {
                network_identifier: network(),
                signed: true,
                transaction: combined.signed_transaction.clone(),
            },
            testnet_context(),
        )
        .await
        .unwrap();

        assert_eq!(
            parse.account_identifier_signers,
            Some(vec![AccountIdentifier::new(sender.to_string())])
        );

        // The signed blob hashes cleanly.
        let hash = construction_hash(
            ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction.clone(),
            },
            testnet_context(),
        )
        .await
        .unwrap();
        assert!(hash.transaction_identifier.hash.starts_with("0x"));
        assert_eq!(hash.transaction_identifier.hash.len(), 66);
    }

    #[tokio::test]
    async fn combine_accepts_rotated_signature_order() {
        let (sender_secret, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];

        // Re-order the wire signature into r ‖ s ‖ recovery.
        let wire = decode_hex(&sign_presign_hex(&sender_secret, &payload.hex_bytes)).unwrap();
        let mut rotated = wire[1..].to_vec();
        rotated.push(wire[0]);

        let combined = construction_combine(
            combine_request(
                &payloads.unsigned_transaction,
                payload,
                &sender_key,
                &hex::encode(rotated),
            ),
            testnet_context(),
        )
        .await
        .unwrap();

        // Both orderings must produce the same signed transaction.
        let canonical = construction_combine(
            combine_request(
                &payloads.unsigned_transaction,
                payload,
                &sender_key,
                &sign_presign_hex(&sender_secret, &payload.hex_bytes),
            ),
            testnet_context(),
        )
        .await
        .unwrap();
        assert_eq!(combined.signed_transaction, canonical.signed_transaction);
    }

    #[tokio::test]
    async fn combine_rejects_two_signatures() {
        let (sender_secret, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];
        let signature_hex = sign_presign_hex(&sender_secret, &payload.hex_bytes);

        let mut request = combine_request(
            &payloads.unsigned_transaction,
            payload,
            &sender_key,
            &signature_hex,
        );
        request.signatures.push(request.signatures[0].clone());

        let error = construction_combine(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 637);
    }

    #[tokio::test]
    async fn combine_rejects_wrong_signer() {
        let (_, sender_key, sender) = key_pair(0x11);
        let (other_secret, _, _) = key_pair(0x33);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];

        // Signed by the wrong key: recovery succeeds but the key differs.
        let signature_hex = sign_presign_hex(&other_secret, &payload.hex_bytes);
        let error = construction_combine(
            combine_request(
                &payloads.unsigned_transaction,
                payload,
                &sender_key,
                &signature_hex,
            ),
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 635);
    }

    #[tokio::test]
    async fn combine_rejects_malformed_signatures() {
        let (sender_secret, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];
        let good = sign_presign_hex(&sender_secret, &payload.hex_bytes);

        // Wrong length.
        let error = construction_combine(
            combine_request(&payloads.unsigned_transaction, payload, &sender_key, "0badc0de"),
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 625);

        // Wrong declared type.
        let mut request =
            combine_request(&payloads.unsigned_transaction, payload, &sender_key, &good);
        request.signatures[0].signature_type = SignatureType::Ed25519;
        let error = construction_combine(request, testnet_context())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 638);
    }

    #[tokio::test]
    async fn hash_rejects_odd_length_hex() {
        let error = construction_hash(
            ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: "0x80800000000400539886f96611ba3ba6cef9618f8c78118b37c5be0".to_string(),
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 628);
    }

    #[tokio::test]
    async fn hash_rejects_unsigned_transaction() {
        let (_, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);
        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();

        let error = construction_hash(
            ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: payloads.unsigned_transaction,
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 629);
    }

    #[tokio::test]
    async fn hash_accepts_unprefixed_hex() {
        let (sender_secret, sender_key, sender) = key_pair(0x11);
        let (_, _, recipient) = key_pair(0x22);

        let payloads = construction_payloads(
            payloads_request(&sender_key, &sender, &recipient),
            testnet_context(),
        )
        .await
        .unwrap();
        let payload = &payloads.payloads[0];
        let combined = construction_combine(
            combine_request(
                &payloads.unsigned_transaction,
                payload,
                &sender_key,
                &sign_presign_hex(&sender_secret, &payload.hex_bytes),
            ),
            testnet_context(),
        )
        .await
        .unwrap();

        let with_prefix = construction_hash(
            ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction.clone(),
            },
            testnet_context(),
        )
        .await
        .unwrap();
        let without_prefix = construction_hash(
            ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: combined.signed_transaction[2..].to_string(),
            },
            testnet_context(),
        )
        .await
        .unwrap();
        assert_eq!(
            with_prefix.transaction_identifier,
            without_prefix.transaction_identifier
        );
    }

    #[tokio::test]
    async fn metadata_and_submit_need_a_node() {
        let options = MetadataOptions {
            sender_address: Some(key_pair(0x11).2.to_string()),
            operation_type: "token_transfer".to_string(),
            token_transfer_recipient_address: key_pair(0x22).2.to_string(),
            amount: "500000".to_string(),
            symbol: "STX".to_string(),
            decimals: 6,
            memo: None,
            max_fee: None,
            suggested_fee_multiplier: None,
            size: Some(180),
        };
        let error = construction_metadata(
            ConstructionMetadataRequest {
                network_identifier: network(),
                options,
                public_keys: None,
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 633);
    }

    #[tokio::test]
    async fn metadata_requires_size() {
        let options = MetadataOptions {
            sender_address: Some(key_pair(0x11).2.to_string()),
            operation_type: "token_transfer".to_string(),
            token_transfer_recipient_address: key_pair(0x22).2.to_string(),
            amount: "500000".to_string(),
            symbol: "STX".to_string(),
            decimals: 6,
            memo: None,
            max_fee: None,
            suggested_fee_multiplier: None,
            size: None,
        };
        let error = construction_metadata(
            ConstructionMetadataRequest {
                network_identifier: network(),
                options,
                public_keys: None,
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 639);
    }

    #[tokio::test]
    async fn metadata_validates_addresses() {
        let mainnet_sender = {
            let secret = SecretKey::from_slice(&[0x11u8; 32]).unwrap();
            let key = secret.public_key(&SECP).serialize();
            StacksAddress::from_public_key(ChainNetwork::Mainnet, &key)
        };
        let options = MetadataOptions {
            sender_address: Some(mainnet_sender.to_string()),
            operation_type: "token_transfer".to_string(),
            token_transfer_recipient_address: key_pair(0x22).2.to_string(),
            amount: "500000".to_string(),
            symbol: "STX".to_string(),
            decimals: 6,
            memo: None,
            max_fee: None,
            suggested_fee_multiplier: None,
            size: Some(180),
        };
        let error = construction_metadata(
            ConstructionMetadataRequest {
                network_identifier: network(),
                options: options.clone(),
                public_keys: None,
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 617);

        let mut bad_recipient = options;
        bad_recipient.sender_address = Some(key_pair(0x11).2.to_string());
        bad_recipient.token_transfer_recipient_address = "garbage".to_string();
        let error = construction_metadata(
            ConstructionMetadataRequest {
                network_identifier: network(),
                options: bad_recipient,
                public_keys: None,
            },
            testnet_context(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code(), 618);
    }
}
