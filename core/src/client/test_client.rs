// Copyright 2018-2019 Vesper Project.
// This file is part of Vesper.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Programmable stand-in for the external execution engine, used by tests
//! across the workspace.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use parking_lot::RwLock;
use rlp::Encodable;
use vtypes::transaction::Error as TransactionError;
use vtypes::{BlockNumber, Bytes};

use crate::account_provider::{SignError, Signer};
use crate::block::Block;
use crate::blockchain_info::BlockChainInfo;
use crate::client::{ChainEngine, StateInfo};
use crate::error::{BlockError, CallError, Error};
use crate::header::Header;
use crate::miner::MemPool;
use crate::transaction::{SignedTransaction, Transaction, UnverifiedTransaction, UNSIGNED_SENDER};
use crate::types::BlockId;

/// Test engine. Chain layout, account state and contract-call answers are
/// all scripted by the test.
pub struct TestChainEngine {
    /// Blocks by hash.
    pub blocks: RwLock<HashMap<H256, Block>>,
    /// Canonical numbering.
    pub numbers: RwLock<HashMap<BlockNumber, H256>>,
    /// Genesis block hash.
    pub genesis_hash: H256,
    /// Canonical tip.
    pub best_hash: RwLock<H256>,
    /// Accumulated score.
    pub total_score: RwLock<U256>,
    /// Account balances.
    pub balances: RwLock<HashMap<Address, U256>>,
    /// Account nonces.
    pub nonces: RwLock<HashMap<Address, U256>>,
    /// Deployed code.
    pub code: RwLock<HashMap<Address, Bytes>>,
    /// Scripted contract-call answers, keyed by (callee, calldata).
    pub calls: RwLock<HashMap<(Address, Bytes), Bytes>>,
    /// Scripted sender recovery.
    pub senders: RwLock<HashMap<H256, Address>>,
    /// Blocks whose bodies fail verification with a transaction error.
    pub bad_tx_blocks: RwLock<HashMap<H256, TransactionError>>,
    /// Blocks whose bodies fail verification outright.
    pub bad_blocks: RwLock<HashSet<H256>>,
    /// Blocks the engine refuses without an error.
    pub rejected_blocks: RwLock<HashSet<H256>>,
    /// Transactions failing validation.
    pub invalid_transactions: RwLock<HashMap<H256, TransactionError>>,
    /// Times `process_time_queue` ran.
    pub time_queue_ticks: AtomicUsize,
    /// Times a head candidate was built.
    pub candidate_builds: AtomicUsize,
    pow_valid: AtomicBool,
}

impl Default for TestChainEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TestChainEngine {
    pub fn new() -> Self {
        let mut genesis = Header::new();
        genesis.set_number(0);
        genesis.set_score(1.into());
        let genesis = Block {
            header: genesis,
            transactions: vec![],
        };
        let genesis_hash = genesis.header.hash();

        let engine = Self {
            blocks: RwLock::new(HashMap::new()),
            numbers: RwLock::new(HashMap::new()),
            genesis_hash,
            best_hash: RwLock::new(genesis_hash),
            total_score: RwLock::new(1.into()),
            balances: RwLock::new(HashMap::new()),
            nonces: RwLock::new(HashMap::new()),
            code: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
            senders: RwLock::new(HashMap::new()),
            bad_tx_blocks: RwLock::new(HashMap::new()),
            bad_blocks: RwLock::new(HashSet::new()),
            rejected_blocks: RwLock::new(HashSet::new()),
            invalid_transactions: RwLock::new(HashMap::new()),
            time_queue_ticks: AtomicUsize::new(0),
            candidate_builds: AtomicUsize::new(0),
            pow_valid: AtomicBool::new(true),
        };
        engine.blocks.write().insert(genesis_hash, genesis);
        engine.numbers.write().insert(0, genesis_hash);
        engine
    }

    /// The canonical tip block.
    pub fn best_block(&self) -> Block {
        let best = *self.best_hash.read();
        self.blocks.read().get(&best).expect("the best block always exists").clone()
    }

    /// Builds a child of the current head carrying `transactions` and makes
    /// it canonical. Returns the new block.
    pub fn push_block(&self, transactions: Vec<UnverifiedTransaction>) -> Block {
        let parent = self.best_block();
        let mut header = Header::new();
        header.set_parent_hash(parent.header.hash());
        header.set_number(parent.header.number() + 1);
        header.set_score(1.into());
        header.set_timestamp(parent.header.timestamp() + 10);
        let block = Block {
            header,
            transactions,
        };
        self.add_block(&block).expect("pushing on top of the head never fails");
        block
    }

    /// Extends the canonical chain with `count` empty blocks.
    pub fn add_blocks(&self, count: usize) {
        for _ in 0..count {
            self.push_block(vec![]);
        }
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.write().insert(address, balance);
    }

    pub fn set_nonce(&self, address: Address, nonce: U256) {
        self.nonces.write().insert(address, nonce);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.code.write().insert(address, code);
    }

    /// Scripts the answer of a read-only contract call.
    pub fn script_call(&self, to: Address, data: Bytes, ret: Bytes) {
        self.calls.write().insert((to, data), ret);
    }

    pub fn set_pow_invalid(&self) {
        self.pow_valid.store(false, Ordering::SeqCst);
    }

    fn resolve_hash(&self, id: BlockId) -> Option<H256> {
        match id {
            BlockId::Hash(hash) => {
                if self.blocks.read().contains_key(&hash) {
                    Some(hash)
                } else {
                    None
                }
            }
            BlockId::Number(number) => self.numbers.read().get(&number).cloned(),
            BlockId::Earliest => Some(self.genesis_hash),
            BlockId::Latest => Some(*self.best_hash.read()),
        }
    }

    fn state_snapshot(&self, block_number: BlockNumber) -> TestState {
        TestState {
            block_number,
            balances: self.balances.read().clone(),
            nonces: self.nonces.read().clone(),
            code: self.code.read().clone(),
            calls: self.calls.read().clone(),
        }
    }
}

impl ChainEngine for TestChainEngine {
    fn chain_info(&self) -> BlockChainInfo {
        let best = self.best_block();
        BlockChainInfo {
            total_score: *self.total_score.read(),
            best_block_hash: best.header.hash(),
            best_block_number: best.header.number(),
            genesis_hash: self.genesis_hash,
        }
    }

    fn add_block(&self, block: &Block) -> Result<bool, Error> {
        let hash = block.header.hash();
        if self.rejected_blocks.read().contains(&hash) {
            return Ok(false)
        }
        let parent = *block.header.parent_hash();
        if !self.has_block(&parent) {
            return Err(BlockError::UnknownParent(parent).into())
        }

        let extends_head = parent == *self.best_hash.read();
        self.blocks.write().insert(hash, block.clone());
        if extends_head {
            self.numbers.write().insert(block.header.number(), hash);
            *self.best_hash.write() = hash;
            let mut score = self.total_score.write();
            *score = *score + *block.header.score();
        }
        Ok(true)
    }

    fn has_block(&self, hash: &H256) -> bool {
        self.blocks.read().contains_key(hash)
    }

    fn block(&self, id: BlockId) -> Option<Block> {
        self.resolve_hash(id).and_then(|hash| self.blocks.read().get(&hash).cloned())
    }

    fn block_header(&self, id: BlockId) -> Option<Header> {
        self.block(id).map(|block| block.header)
    }

    fn block_hash(&self, id: BlockId) -> Option<H256> {
        self.resolve_hash(id)
    }

    fn state_at(&self, id: BlockId) -> Option<Box<dyn StateInfo>> {
        let header = self.block_header(id)?;
        Some(Box::new(self.state_snapshot(header.number())))
    }

    fn process_time_queue(&self) {
        self.time_queue_ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn check_pow(&self, _header: &Header) -> bool {
        self.pow_valid.load(Ordering::SeqCst)
    }

    fn verify_block(&self, block: &Block) -> Result<(), Error> {
        let hash = block.header.hash();
        if let Some(err) = self.bad_tx_blocks.read().get(&hash) {
            return Err(Error::Transaction(err.clone()))
        }
        if self.bad_blocks.read().contains(&hash) {
            return Err(BlockError::VerificationFailed("scripted failure".into()).into())
        }
        Ok(())
    }

    fn validate_transaction(
        &self,
        tx: &UnverifiedTransaction,
        _state: &dyn StateInfo,
    ) -> Result<SignedTransaction, TransactionError> {
        if let Some(err) = self.invalid_transactions.read().get(&tx.hash()) {
            return Err(err.clone())
        }
        let sender = if tx.is_unsigned() {
            UNSIGNED_SENDER
        } else {
            self.senders
                .read()
                .get(&tx.hash())
                .cloned()
                .unwrap_or_else(|| From::from(keccak(&*tx.rlp_bytes())))
        };
        Ok(SignedTransaction::new(tx.clone(), sender))
    }

    fn make_head_candidate(
        &self,
        pool: &mut MemPool,
        timestamp: u64,
        author: &Address,
    ) -> Result<(Block, Box<dyn StateInfo>), Error> {
        self.candidate_builds.fetch_add(1, Ordering::SeqCst);
        let parent = self.best_block();
        let mut header = Header::new();
        header.set_parent_hash(parent.header.hash());
        header.set_number(parent.header.number() + 1);
        header.set_timestamp(timestamp);
        header.set_author(*author);
        header.set_score(1.into());

        let transactions = pool.pending().into_iter().map(Into::into).collect();
        pool.clear();

        let state = self.state_snapshot(parent.header.number() + 1);
        Ok((
            Block {
                header,
                transactions,
            },
            Box::new(state),
        ))
    }

    fn validation_code(&self, address: &Address) -> Bytes {
        let mut code = vec![0x61, 0x00, 0x57];
        code.extend_from_slice(address.as_ref());
        code
    }
}

/// Snapshot state handed out by the test engine.
pub struct TestState {
    block_number: BlockNumber,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, U256>,
    code: HashMap<Address, Bytes>,
    calls: HashMap<(Address, Bytes), Bytes>,
}

impl StateInfo for TestState {
    fn block_number(&self) -> BlockNumber {
        self.block_number
    }

    fn nonce(&self, address: &Address) -> U256 {
        self.nonces.get(address).cloned().unwrap_or_else(U256::zero)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).cloned().unwrap_or_else(U256::zero)
    }

    fn code(&self, address: &Address) -> Option<Bytes> {
        self.code.get(address).cloned()
    }

    fn call_contract(&self, to: &Address, data: &[u8]) -> Result<Bytes, CallError> {
        self.calls.get(&(*to, data.to_vec())).cloned().ok_or(CallError::Reverted)
    }
}

/// Signer double: attaches fake signatures that the test engine treats as
/// valid for `address`.
pub struct TestSigner {
    address: Address,
}

impl TestSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
        }
    }
}

impl Signer for TestSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_tx(&self, tx: Transaction) -> Result<SignedTransaction, SignError> {
        Ok(tx.fake_sign(self.address))
    }

    fn sign_message(&self, hash: &H256) -> Result<Bytes, SignError> {
        let mut preimage = AsRef::<[u8]>::as_ref(hash).to_vec();
        preimage.extend_from_slice(self.address.as_ref());
        let word = keccak(&preimage);
        let mut signature = AsRef::<[u8]>::as_ref(&word).to_vec();
        signature.extend_from_slice(word.as_ref());
        signature.push(27);
        Ok(signature)
    }
}
