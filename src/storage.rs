// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Read-only projection of the block/transaction datastore backing the data
//! endpoints.  The core never writes through this interface; rows are owned
//! by whatever indexer populates the store.

use crate::error::ApiResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockEntry {
    pub height: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Milliseconds since the epoch.
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxEntry {
    /// `0x`-prefixed transaction id.
    pub txid: String,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    /// Raw wire-format transaction bytes.
    pub raw: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalanceEntry {
    pub balance: u128,
    pub nonce: u64,
}

/// The datastore contract.  Lookups that find nothing return `Ok(None)`;
/// errors are reserved for the store itself failing.
#[async_trait]
pub trait ChainStore: Send + Sync {
    async fn block_by_height(&self, height: u64) -> ApiResult<Option<BlockEntry>>;
    async fn block_by_hash(&self, hash: &str) -> ApiResult<Option<BlockEntry>>;
    async fn current_block(&self) -> ApiResult<Option<BlockEntry>>;
    async fn block_transactions(&self, block_hash: &str) -> ApiResult<Vec<TxEntry>>;
    async fn transaction(&self, txid: &str) -> ApiResult<Option<TxEntry>>;
    async fn mempool_transactions(&self, limit: u64, offset: u64) -> ApiResult<Vec<String>>;
    async fn mempool_transaction(&self, txid: &str) -> ApiResult<Option<TxEntry>>;
    async fn account_balance(
        &self,
        address: &str,
        at_height: Option<u64>,
    ) -> ApiResult<Option<BalanceEntry>>;
}

/// In-memory store used by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    blocks: BTreeMap<u64, BlockEntry>,
    transactions: BTreeMap<String, TxEntry>,
    mempool: Vec<TxEntry>,
    balances: BTreeMap<String, BalanceEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn insert_block(&self, block: BlockEntry, transactions: Vec<TxEntry>) {
        let mut inner = self.inner.write().unwrap();
        for mut tx in transactions {
            tx.block_hash = Some(block.hash.clone());
            tx.block_height = Some(block.height);
            inner.transactions.insert(tx.txid.clone(), tx);
        }
        inner.blocks.insert(block.height, block);
    }

    pub fn insert_mempool_tx(&self, tx: TxEntry) {
        self.inner.write().unwrap().mempool.push(tx);
    }

    pub fn set_balance(&self, address: &str, entry: BalanceEntry) {
        self.inner
            .write()
            .unwrap()
            .balances
            .insert(address.to_string(), entry);
    }
}

#[async_trait]
impl ChainStore for MemoryStore {
    async fn block_by_height(&self, height: u64) -> ApiResult<Option<BlockEntry>> {
        Ok(self.inner.read().unwrap().blocks.get(&height).cloned())
    }

    async fn block_by_hash(&self, hash: &str) -> ApiResult<Option<BlockEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .blocks
            .values()
            .find(|b| b.hash == hash)
            .cloned())
    }

    async fn current_block(&self) -> ApiResult<Option<BlockEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .blocks
            .values()
            .next_back()
            .cloned())
    }

    async fn block_transactions(&self, block_hash: &str) -> ApiResult<Vec<TxEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .transactions
            .values()
            .filter(|tx| tx.block_hash.as_deref() == Some(block_hash))
            .cloned()
            .collect())
    }

    async fn transaction(&self, txid: &str) -> ApiResult<Option<TxEntry>> {
        Ok(self.inner.read().unwrap().transactions.get(txid).cloned())
    }

    async fn mempool_transactions(&self, limit: u64, offset: u64) -> ApiResult<Vec<String>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .mempool
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|tx| tx.txid.clone())
            .collect())
    }

    async fn mempool_transaction(&self, txid: &str) -> ApiResult<Option<TxEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .mempool
            .iter()
            .find(|tx| tx.txid == txid)
            .cloned())
    }

    async fn account_balance(
        &self,
        address: &str,
        _at_height: Option<u64>,
    ) -> ApiResult<Option<BalanceEntry>> {
        Ok(self.inner.read().unwrap().balances.get(address).cloned())
    }
}
