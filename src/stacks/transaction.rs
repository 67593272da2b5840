// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Transaction wire codec.
//!
//! The on-wire layout is
//! `version ‖ chain_id ‖ auth ‖ anchor_mode ‖ post_condition_mode ‖
//! post_conditions ‖ payload`, with all integers big-endian.  Signing works
//! over a rolling hash: the initial sighash is the txid of the transaction
//! with its spending condition cleared, and the value a wallet actually
//! signs binds that hash to the auth flag, fee, and nonce.
//!
//! Only single-signature standard spending conditions are fully modeled;
//! multi-sig hash modes are rejected at parse time.  Non-transfer payloads
//! are recognized structurally but not interpreted.

use crate::stacks::{ChainNetwork, CodecError, StacksAddress};
use once_cell::sync::Lazy;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, Secp256k1,
};
use sha2::{Digest, Sha512_256};
use std::{fmt, str::FromStr};

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub const MEMO_LEN: usize = 34;
pub const SIGNATURE_LEN: usize = 65;
const MICROBLOCK_HEADER_LEN: usize = 1 + 2 + 32 + 32 + SIGNATURE_LEN;
const MAX_STRING_LEN: usize = 128;
const MAX_CLARITY_DEPTH: u32 = 64;

/// A SHA-512/256 digest: both the transaction id and every sighash in the
/// signing chain.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub fn from_data(data: &[u8]) -> Txid {
        let digest = Sha512_256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Txid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A recoverable ECDSA signature in wire order: `recovery ‖ r ‖ s`.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct MessageSignature(pub [u8; SIGNATURE_LEN]);

impl MessageSignature {
    pub fn empty() -> MessageSignature {
        MessageSignature([0u8; SIGNATURE_LEN])
    }

    pub fn from_slice(bytes: &[u8]) -> Result<MessageSignature, CodecError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(CodecError::Deserialize(format!(
                "signature has {} bytes, expected {}",
                bytes.len(),
                SIGNATURE_LEN
            )));
        }
        let mut buf = [0u8; SIGNATURE_LEN];
        buf.copy_from_slice(bytes);
        Ok(MessageSignature(buf))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// The recovery byte must be 0 or 1 for compressed-key recovery.
    pub fn has_valid_recovery_byte(&self) -> bool {
        self.0[0] <= 1
    }
}

impl fmt::Debug for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageSignature(0x{})", hex::encode(self.0))
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthFlag {
    Standard = 0x04,
    Sponsored = 0x05,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnchorMode {
    OnChainOnly = 1,
    OffChainOnly = 2,
    Any = 3,
}

impl AnchorMode {
    fn from_u8(value: u8) -> Option<AnchorMode> {
        match value {
            1 => Some(AnchorMode::OnChainOnly),
            2 => Some(AnchorMode::OffChainOnly),
            3 => Some(AnchorMode::Any),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PostConditionMode {
    Allow = 1,
    Deny = 2,
}

impl PostConditionMode {
    fn from_u8(value: u8) -> Option<PostConditionMode> {
        match value {
            1 => Some(PostConditionMode::Allow),
            2 => Some(PostConditionMode::Deny),
            _ => None,
        }
    }
}

const HASH_MODE_P2PKH: u8 = 0x00;
const KEY_ENCODING_COMPRESSED: u8 = 0x00;
const KEY_ENCODING_UNCOMPRESSED: u8 = 0x01;

/// Single-signature standard spending condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpendingCondition {
    pub signer: [u8; 20],
    pub nonce: u64,
    pub fee: u64,
    pub key_encoding: u8,
    pub signature: MessageSignature,
}

impl SpendingCondition {
    pub fn new(signer: [u8; 20], nonce: u64, fee: u64) -> SpendingCondition {
        SpendingCondition {
            signer,
            nonce,
            fee,
            key_encoding: KEY_ENCODING_COMPRESSED,
            signature: MessageSignature::empty(),
        }
    }

    /// The sentinel form committed to by the initial sighash.
    fn cleared(&self) -> SpendingCondition {
        SpendingCondition {
            signer: self.signer,
            nonce: 0,
            fee: 0,
            key_encoding: self.key_encoding,
            signature: MessageSignature::empty(),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(HASH_MODE_P2PKH);
        out.extend_from_slice(&self.signer);
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.fee.to_be_bytes());
        out.push(self.key_encoding);
        out.extend_from_slice(&self.signature.0);
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<SpendingCondition, CodecError> {
        let hash_mode = cur.read_u8()?;
        if hash_mode != HASH_MODE_P2PKH {
            return Err(CodecError::Deserialize(format!(
                "unsupported spending condition hash mode {:#04x}",
                hash_mode
            )));
        }

        let mut signer = [0u8; 20];
        signer.copy_from_slice(cur.read_bytes(20)?);
        let nonce = cur.read_u64()?;
        let fee = cur.read_u64()?;

        let key_encoding = cur.read_u8()?;
        if key_encoding != KEY_ENCODING_COMPRESSED && key_encoding != KEY_ENCODING_UNCOMPRESSED {
            return Err(CodecError::Deserialize(format!(
                "unknown key encoding {:#04x}",
                key_encoding
            )));
        }

        let signature = MessageSignature::from_slice(cur.read_bytes(SIGNATURE_LEN)?)?;

        Ok(SpendingCondition {
            signer,
            nonce,
            fee,
            key_encoding,
            signature,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransactionAuth {
    Standard(SpendingCondition),
    Sponsored(SpendingCondition, SpendingCondition),
}

impl TransactionAuth {
    pub fn origin(&self) -> &SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    pub fn origin_mut(&mut self) -> &mut SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    pub fn flag(&self) -> AuthFlag {
        match self {
            TransactionAuth::Standard(_) => AuthFlag::Standard,
            TransactionAuth::Sponsored(..) => AuthFlag::Sponsored,
        }
    }

    /// Sentinel form used for the initial sighash: origin cleared, and for
    /// sponsored transactions a fully zeroed sponsor placeholder.
    fn into_initial_sighash_auth(&self) -> TransactionAuth {
        match self {
            TransactionAuth::Standard(origin) => TransactionAuth::Standard(origin.cleared()),
            TransactionAuth::Sponsored(origin, _) => TransactionAuth::Sponsored(
                origin.cleared(),
                SpendingCondition::new([0u8; 20], 0, 0),
            ),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.flag() as u8);
        match self {
            TransactionAuth::Standard(origin) => origin.write(out),
            TransactionAuth::Sponsored(origin, sponsor) => {
                origin.write(out);
                sponsor.write(out);
            }
        }
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<TransactionAuth, CodecError> {
        let flag = cur.read_u8()?;
        match flag {
            x if x == AuthFlag::Standard as u8 => {
                Ok(TransactionAuth::Standard(SpendingCondition::read(cur)?))
            }
            x if x == AuthFlag::Sponsored as u8 => Ok(TransactionAuth::Sponsored(
                SpendingCondition::read(cur)?,
                SpendingCondition::read(cur)?,
            )),
            _ => Err(CodecError::Deserialize(format!(
                "unrecognized auth flag {:#04x}",
                flag
            ))),
        }
    }
}

const PRINCIPAL_STANDARD: u8 = 0x05;
const PRINCIPAL_CONTRACT: u8 = 0x06;

/// A standard (account) or contract principal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Principal {
    Standard(StacksAddress),
    Contract(StacksAddress, String),
}

impl Principal {
    pub fn address(&self) -> &StacksAddress {
        match self {
            Principal::Standard(address) => address,
            Principal::Contract(address, _) => address,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Principal::Standard(address) => {
                out.push(PRINCIPAL_STANDARD);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
            }
            Principal::Contract(address, name) => {
                out.push(PRINCIPAL_CONTRACT);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
                write_short_string(out, name);
            }
        }
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<Principal, CodecError> {
        let tag = cur.read_u8()?;
        let address = read_raw_address(cur)?;
        match tag {
            PRINCIPAL_STANDARD => Ok(Principal::Standard(address)),
            PRINCIPAL_CONTRACT => {
                let name = read_short_string(cur)?;
                Ok(Principal::Contract(address, name))
            }
            _ => Err(CodecError::Deserialize(format!(
                "unknown principal tag {:#04x}",
                tag
            ))),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Standard(address) => write!(f, "{}", address),
            Principal::Contract(address, name) => write!(f, "{}.{}", address, name),
        }
    }
}

impl FromStr for Principal {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            None => Ok(Principal::Standard(s.parse()?)),
            Some((address, name)) => {
                validate_short_string(name)?;
                Ok(Principal::Contract(address.parse()?, name.to_string()))
            }
        }
    }
}

/// An uninterpreted but structurally validated Clarity value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClarityValue(pub Vec<u8>);

const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;
const PAYLOAD_SMART_CONTRACT: u8 = 0x01;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;
const PAYLOAD_POISON_MICROBLOCK: u8 = 0x03;
const PAYLOAD_COINBASE: u8 = 0x04;
const PAYLOAD_COINBASE_TO_ALT_RECIPIENT: u8 = 0x05;
const PAYLOAD_VERSIONED_SMART_CONTRACT: u8 = 0x06;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransactionPayload {
    TokenTransfer {
        recipient: Principal,
        amount: u64,
        memo: [u8; MEMO_LEN],
    },
    ContractCall {
        address: StacksAddress,
        contract_name: String,
        function_name: String,
        function_args: Vec<ClarityValue>,
    },
    SmartContract {
        name: String,
        code: Vec<u8>,
        clarity_version: Option<u8>,
    },
    PoisonMicroblock {
        header_1: Vec<u8>,
        header_2: Vec<u8>,
    },
    Coinbase {
        payload: [u8; 32],
        recipient: Option<Principal>,
    },
}

impl TransactionPayload {
    /// The Rosetta operation type this payload maps to.
    pub fn operation_type(&self) -> &'static str {
        match self {
            TransactionPayload::TokenTransfer { .. } => "token_transfer",
            TransactionPayload::ContractCall { .. } => "contract_call",
            TransactionPayload::SmartContract { .. } => "smart_contract",
            TransactionPayload::PoisonMicroblock { .. } => "poison_microblock",
            TransactionPayload::Coinbase { .. } => "coinbase",
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            TransactionPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            } => {
                out.push(PAYLOAD_TOKEN_TRANSFER);
                recipient.write(out);
                out.extend_from_slice(&amount.to_be_bytes());
                out.extend_from_slice(memo);
            }
            TransactionPayload::ContractCall {
                address,
                contract_name,
                function_name,
                function_args,
            } => {
                out.push(PAYLOAD_CONTRACT_CALL);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
                write_short_string(out, contract_name);
                write_short_string(out, function_name);
                out.extend_from_slice(&(function_args.len() as u32).to_be_bytes());
                for arg in function_args {
                    out.extend_from_slice(&arg.0);
                }
            }
            TransactionPayload::SmartContract {
                name,
                code,
                clarity_version,
            } => {
                match clarity_version {
                    Some(version) => {
                        out.push(PAYLOAD_VERSIONED_SMART_CONTRACT);
                        out.push(*version);
                    }
                    None => out.push(PAYLOAD_SMART_CONTRACT),
                }
                write_short_string(out, name);
                out.extend_from_slice(&(code.len() as u32).to_be_bytes());
                out.extend_from_slice(code);
            }
            TransactionPayload::PoisonMicroblock { header_1, header_2 } => {
                out.push(PAYLOAD_POISON_MICROBLOCK);
                out.extend_from_slice(header_1);
                out.extend_from_slice(header_2);
            }
            TransactionPayload::Coinbase { payload, recipient } => match recipient {
                None => {
                    out.push(PAYLOAD_COINBASE);
                    out.extend_from_slice(payload);
                }
                Some(principal) => {
                    out.push(PAYLOAD_COINBASE_TO_ALT_RECIPIENT);
                    out.extend_from_slice(payload);
                    principal.write(out);
                }
            },
        }
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<TransactionPayload, CodecError> {
        let tag = cur.read_u8()?;
        match tag {
            PAYLOAD_TOKEN_TRANSFER => {
                let recipient = Principal::read(cur)?;
                let amount = cur.read_u64()?;
                let mut memo = [0u8; MEMO_LEN];
                memo.copy_from_slice(cur.read_bytes(MEMO_LEN)?);
                Ok(TransactionPayload::TokenTransfer {
                    recipient,
                    amount,
                    memo,
                })
            }
            PAYLOAD_CONTRACT_CALL => {
                let address = read_raw_address(cur)?;
                let contract_name = read_short_string(cur)?;
                let function_name = read_short_string(cur)?;
                let arg_count = cur.read_u32()?;
                let mut function_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    function_args.push(read_clarity_value(cur)?);
                }
                Ok(TransactionPayload::ContractCall {
                    address,
                    contract_name,
                    function_name,
                    function_args,
                })
            }
            PAYLOAD_SMART_CONTRACT => {
                let name = read_short_string(cur)?;
                let code = read_long_bytes(cur)?;
                Ok(TransactionPayload::SmartContract {
                    name,
                    code,
                    clarity_version: None,
                })
            }
            PAYLOAD_VERSIONED_SMART_CONTRACT => {
                let clarity_version = cur.read_u8()?;
                let name = read_short_string(cur)?;
                let code = read_long_bytes(cur)?;
                Ok(TransactionPayload::SmartContract {
                    name,
                    code,
                    clarity_version: Some(clarity_version),
                })
            }
            PAYLOAD_POISON_MICROBLOCK => Ok(TransactionPayload::PoisonMicroblock {
                header_1: cur.read_bytes(MICROBLOCK_HEADER_LEN)?.to_vec(),
                header_2: cur.read_bytes(MICROBLOCK_HEADER_LEN)?.to_vec(),
            }),
            PAYLOAD_COINBASE => {
                let mut payload = [0u8; 32];
                payload.copy_from_slice(cur.read_bytes(32)?);
                Ok(TransactionPayload::Coinbase {
                    payload,
                    recipient: None,
                })
            }
            PAYLOAD_COINBASE_TO_ALT_RECIPIENT => {
                let mut payload = [0u8; 32];
                payload.copy_from_slice(cur.read_bytes(32)?);
                let recipient = Principal::read(cur)?;
                Ok(TransactionPayload::Coinbase {
                    payload,
                    recipient: Some(recipient),
                })
            }
            _ => Err(CodecError::Deserialize(format!(
                "unknown payload tag {:#04x}",
                tag
            ))),
        }
    }
}

const POST_CONDITION_PRINCIPAL_ORIGIN: u8 = 0x01;
const POST_CONDITION_PRINCIPAL_STANDARD: u8 = 0x02;
const POST_CONDITION_PRINCIPAL_CONTRACT: u8 = 0x03;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PostConditionPrincipal {
    Origin,
    Standard(StacksAddress),
    Contract(StacksAddress, String),
}

impl PostConditionPrincipal {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            PostConditionPrincipal::Origin => out.push(POST_CONDITION_PRINCIPAL_ORIGIN),
            PostConditionPrincipal::Standard(address) => {
                out.push(POST_CONDITION_PRINCIPAL_STANDARD);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
            }
            PostConditionPrincipal::Contract(address, name) => {
                out.push(POST_CONDITION_PRINCIPAL_CONTRACT);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
                write_short_string(out, name);
            }
        }
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<PostConditionPrincipal, CodecError> {
        let tag = cur.read_u8()?;
        match tag {
            POST_CONDITION_PRINCIPAL_ORIGIN => Ok(PostConditionPrincipal::Origin),
            POST_CONDITION_PRINCIPAL_STANDARD => {
                Ok(PostConditionPrincipal::Standard(read_raw_address(cur)?))
            }
            POST_CONDITION_PRINCIPAL_CONTRACT => {
                let address = read_raw_address(cur)?;
                let name = read_short_string(cur)?;
                Ok(PostConditionPrincipal::Contract(address, name))
            }
            _ => Err(CodecError::Deserialize(format!(
                "unknown post-condition principal tag {:#04x}",
                tag
            ))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetInfo {
    pub contract_address: StacksAddress,
    pub contract_name: String,
    pub asset_name: String,
}

impl AssetInfo {
    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.contract_address.version);
        out.extend_from_slice(&self.contract_address.hash160);
        write_short_string(out, &self.contract_name);
        write_short_string(out, &self.asset_name);
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<AssetInfo, CodecError> {
        Ok(AssetInfo {
            contract_address: read_raw_address(cur)?,
            contract_name: read_short_string(cur)?,
            asset_name: read_short_string(cur)?,
        })
    }
}

const ASSET_ID_STX: u8 = 0x00;
const ASSET_ID_FUNGIBLE: u8 = 0x01;
const ASSET_ID_NONFUNGIBLE: u8 = 0x02;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PostCondition {
    Stx {
        principal: PostConditionPrincipal,
        condition_code: u8,
        amount: u64,
    },
    Fungible {
        principal: PostConditionPrincipal,
        asset: AssetInfo,
        condition_code: u8,
        amount: u64,
    },
    Nonfungible {
        principal: PostConditionPrincipal,
        asset: AssetInfo,
        asset_value: ClarityValue,
        condition_code: u8,
    },
}

fn check_fungible_code(code: u8) -> Result<u8, CodecError> {
    if (0x01..=0x05).contains(&code) {
        Ok(code)
    } else {
        Err(CodecError::Deserialize(format!(
            "unknown fungible condition code {:#04x}",
            code
        )))
    }
}

fn check_nonfungible_code(code: u8) -> Result<u8, CodecError> {
    if code == 0x10 || code == 0x11 {
        Ok(code)
    } else {
        Err(CodecError::Deserialize(format!(
            "unknown non-fungible condition code {:#04x}",
            code
        )))
    }
}

impl PostCondition {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            PostCondition::Stx {
                principal,
                condition_code,
                amount,
            } => {
                out.push(ASSET_ID_STX);
                principal.write(out);
                out.push(*condition_code);
                out.extend_from_slice(&amount.to_be_bytes());
            }
            PostCondition::Fungible {
                principal,
                asset,
                condition_code,
                amount,
            } => {
                out.push(ASSET_ID_FUNGIBLE);
                principal.write(out);
                asset.write(out);
                out.push(*condition_code);
                out.extend_from_slice(&amount.to_be_bytes());
            }
            PostCondition::Nonfungible {
                principal,
                asset,
                asset_value,
                condition_code,
            } => {
                out.push(ASSET_ID_NONFUNGIBLE);
                principal.write(out);
                asset.write(out);
                out.extend_from_slice(&asset_value.0);
                out.push(*condition_code);
            }
        }
    }

    fn read(cur: &mut ByteCursor<'_>) -> Result<PostCondition, CodecError> {
        let tag = cur.read_u8()?;
        match tag {
            ASSET_ID_STX => Ok(PostCondition::Stx {
                principal: PostConditionPrincipal::read(cur)?,
                condition_code: check_fungible_code(cur.read_u8()?)?,
                amount: cur.read_u64()?,
            }),
            ASSET_ID_FUNGIBLE => Ok(PostCondition::Fungible {
                principal: PostConditionPrincipal::read(cur)?,
                asset: AssetInfo::read(cur)?,
                condition_code: check_fungible_code(cur.read_u8()?)?,
                amount: cur.read_u64()?,
            }),
            ASSET_ID_NONFUNGIBLE => Ok(PostCondition::Nonfungible {
                principal: PostConditionPrincipal::read(cur)?,
                asset: AssetInfo::read(cur)?,
                asset_value: read_clarity_value(cur)?,
                condition_code: check_nonfungible_code(cur.read_u8()?)?,
            }),
            _ => Err(CodecError::Deserialize(format!(
                "unknown post-condition asset tag {:#04x}",
                tag
            ))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StacksTransaction {
    pub version: u8,
    pub chain_id: u32,
    pub auth: TransactionAuth,
    pub anchor_mode: AnchorMode,
    pub post_condition_mode: PostConditionMode,
    pub post_conditions: Vec<PostCondition>,
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    /// Build an unsigned single-sig token transfer with an empty signature
    /// slot, ready for the presign hash.
    pub fn new_token_transfer(
        network: ChainNetwork,
        sender: &StacksAddress,
        recipient: Principal,
        amount: u64,
        fee: u64,
        nonce: u64,
        memo: [u8; MEMO_LEN],
    ) -> StacksTransaction {
        StacksTransaction {
            version: network.transaction_version(),
            chain_id: network.chain_id(),
            auth: TransactionAuth::Standard(SpendingCondition::new(sender.hash160, nonce, fee)),
            anchor_mode: AnchorMode::Any,
            post_condition_mode: PostConditionMode::Deny,
            post_conditions: vec![],
            payload: TransactionPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            },
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.push(self.version);
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        self.auth.write(&mut out);
        out.push(self.anchor_mode as u8);
        out.push(self.post_condition_mode as u8);
        out.extend_from_slice(&(self.post_conditions.len() as u32).to_be_bytes());
        for condition in &self.post_conditions {
            condition.write(&mut out);
        }
        self.payload.write(&mut out);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<StacksTransaction, CodecError> {
        let mut cur = ByteCursor::new(bytes);

        let version = cur.read_u8()?;
        if ChainNetwork::from_transaction_version(version).is_none() {
            return Err(CodecError::Deserialize(format!(
                "unknown transaction version {:#04x}",
                version
            )));
        }

        let chain_id = cur.read_u32()?;
        let auth = TransactionAuth::read(&mut cur)?;

        let anchor_mode_u8 = cur.read_u8()?;
        let anchor_mode = AnchorMode::from_u8(anchor_mode_u8).ok_or_else(|| {
            CodecError::Deserialize(format!("invalid anchor mode {:#04x}", anchor_mode_u8))
        })?;

        let mode_u8 = cur.read_u8()?;
        let post_condition_mode = PostConditionMode::from_u8(mode_u8).ok_or_else(|| {
            CodecError::Deserialize(format!("invalid post-condition mode {:#04x}", mode_u8))
        })?;

        let condition_count = cur.read_u32()?;
        let mut post_conditions = Vec::with_capacity(condition_count.min(64) as usize);
        for _ in 0..condition_count {
            post_conditions.push(PostCondition::read(&mut cur)?);
        }

        let payload = TransactionPayload::read(&mut cur)?;

        if cur.remaining() != 0 {
            return Err(CodecError::Deserialize(format!(
                "{} trailing bytes after transaction",
                cur.remaining()
            )));
        }

        Ok(StacksTransaction {
            version,
            chain_id,
            auth,
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        })
    }

    /// The transaction id: SHA-512/256 over the full serialization.
    pub fn txid(&self) -> Txid {
        Txid::from_data(&self.serialize())
    }

    /// True iff the origin signature slot is populated with a plausible
    /// recoverable signature.
    pub fn is_signed(&self) -> bool {
        let signature = &self.auth.origin().signature;
        !signature.is_empty() && signature.has_valid_recovery_byte()
    }

    /// The txid of the transaction with its spending condition cleared; the
    /// root of the signing chain.
    pub fn initial_sighash(&self) -> Txid {
        let mut tx = self.clone();
        tx.auth = tx.auth.into_initial_sighash_auth();
        tx.txid()
    }

    /// The digest the origin key signs: the initial sighash bound to the
    /// auth flag and the origin's fee and nonce.
    pub fn origin_presign_hash(&self) -> Txid {
        let origin = self.auth.origin();
        presign_hash(
            &self.initial_sighash(),
            AuthFlag::Standard,
            origin.fee,
            origin.nonce,
        )
    }

    pub fn set_origin_signature(&mut self, signature: MessageSignature) {
        self.auth.origin_mut().signature = signature;
    }

    /// The origin account address under this transaction's network version.
    pub fn origin_address(&self) -> StacksAddress {
        let network = ChainNetwork::from_transaction_version(self.version)
            .expect("transaction version was validated at construction");
        StacksAddress::new(network.address_version(), self.auth.origin().signer)
    }

    pub fn fee(&self) -> u64 {
        self.auth.origin().fee
    }

    pub fn nonce(&self) -> u64 {
        self.auth.origin().nonce
    }
}

/// Bind a sighash to the auth flag, fee, and nonce the signer commits to.
pub fn presign_hash(sighash: &Txid, flag: AuthFlag, fee: u64, nonce: u64) -> Txid {
    let mut data = Vec::with_capacity(32 + 1 + 8 + 8);
    data.extend_from_slice(sighash.as_bytes());
    data.push(flag as u8);
    data.extend_from_slice(&fee.to_be_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());
    Txid::from_data(&data)
}

/// Recover the compressed public key that produced a wire-order signature
/// over the given presign hash.
pub fn recover_public_key(
    presign: &Txid,
    signature: &MessageSignature,
) -> Result<[u8; 33], CodecError> {
    let recovery_id = RecoveryId::from_i32(signature.0[0] as i32)
        .map_err(|e| CodecError::Signing(format!("invalid recovery byte: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&signature.0[1..], recovery_id)
        .map_err(|e| CodecError::Signing(format!("malformed signature: {}", e)))?;
    let message = Message::from_digest(*presign.as_bytes());

    let public_key = SECP
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| CodecError::Signing(format!("signature recovery failed: {}", e)))?;
    Ok(public_key.serialize())
}

/// True iff the signature recovers to exactly the expected compressed key.
pub fn verify_signature(
    presign: &Txid,
    signature: &MessageSignature,
    expected_public_key: &[u8; 33],
) -> bool {
    matches!(recover_public_key(presign, signature), Ok(key) if key == *expected_public_key)
}

struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Deserialize(
                "unexpected end of transaction bytes".to_string(),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(buf))
    }
}

fn read_raw_address(cur: &mut ByteCursor<'_>) -> Result<StacksAddress, CodecError> {
    let version = cur.read_u8()?;
    // c32 has exactly 32 version characters.
    if version >= 32 {
        return Err(CodecError::Deserialize(format!(
            "address version {} out of range",
            version
        )));
    }
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(cur.read_bytes(20)?);
    Ok(StacksAddress::new(version, hash160))
}

fn validate_short_string(s: &str) -> Result<(), CodecError> {
    if s.is_empty() || s.len() > MAX_STRING_LEN {
        return Err(CodecError::Deserialize(format!(
            "name length {} out of range",
            s.len()
        )));
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'?' || b == b'!')
    {
        return Err(CodecError::Deserialize(format!(
            "name {:?} contains invalid characters",
            s
        )));
    }
    Ok(())
}

fn write_short_string(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

fn read_short_string(cur: &mut ByteCursor<'_>) -> Result<String, CodecError> {
    let len = cur.read_u8()? as usize;
    let bytes = cur.read_bytes(len)?;
    let s = std::str::from_utf8(bytes)
        .map_err(|_| CodecError::Deserialize("name is not valid UTF-8".to_string()))?
        .to_string();
    validate_short_string(&s)?;
    Ok(s)
}

fn read_long_bytes(cur: &mut ByteCursor<'_>) -> Result<Vec<u8>, CodecError> {
    let len = cur.read_u32()? as usize;
    Ok(cur.read_bytes(len)?.to_vec())
}

/// Walk a serialized Clarity value without interpreting it, capturing the
/// raw bytes.  Used for contract-call arguments and NFT post-conditions.
fn read_clarity_value(cur: &mut ByteCursor<'_>) -> Result<ClarityValue, CodecError> {
    let start = cur.pos;
    skip_clarity_value(cur, 0)?;
    Ok(ClarityValue(cur.buf[start..cur.pos].to_vec()))
}

fn skip_clarity_value(cur: &mut ByteCursor<'_>, depth: u32) -> Result<(), CodecError> {
    if depth > MAX_CLARITY_DEPTH {
        return Err(CodecError::Deserialize(
            "clarity value nests too deeply".to_string(),
        ));
    }

    let tag = cur.read_u8()?;
    match tag {
        // int, uint
        0x00 | 0x01 => {
            cur.read_bytes(16)?;
        }
        // buffer
        0x02 => {
            let len = cur.read_u32()? as usize;
            cur.read_bytes(len)?;
        }
        // bool true / false, none
        0x03 | 0x04 | 0x09 => {}
        // standard principal
        0x05 => {
            cur.read_bytes(21)?;
        }
        // contract principal
        0x06 => {
            cur.read_bytes(21)?;
            read_short_string(cur)?;
        }
        // response ok / err, some
        0x07 | 0x08 | 0x0a => skip_clarity_value(cur, depth + 1)?,
        // list
        0x0b => {
            let count = cur.read_u32()?;
            for _ in 0..count {
                skip_clarity_value(cur, depth + 1)?;
            }
        }
        // tuple
        0x0c => {
            let count = cur.read_u32()?;
            for _ in 0..count {
                read_short_string(cur)?;
                skip_clarity_value(cur, depth + 1)?;
            }
        }
        // string-ascii, string-utf8
        0x0d | 0x0e => {
            let len = cur.read_u32()? as usize;
            cur.read_bytes(len)?;
        }
        _ => {
            return Err(CodecError::Deserialize(format!(
                "unknown clarity value tag {:#04x}",
                tag
            )))
        }
    }
    Ok(())
}
