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

mod broadcast_filter;
mod chain_notify;
mod config;
mod importer;
mod queue;
pub mod test_client;

pub use self::broadcast_filter::BroadcastFilter;
pub use self::chain_notify::ChainNotify;
pub use self::config::{ChainConfig, PruningMode};
pub use self::importer::Importer;
pub use self::queue::BlockQueue;

use ethereum_types::{Address, H256, U256};
use vnetwork::PeerId;
use vtypes::transaction::Error as TransactionError;
use vtypes::{BlockNumber, Bytes};

use crate::block::Block;
use crate::blockchain_info::BlockChainInfo;
use crate::error::{CallError, Error};
use crate::header::Header;
use crate::miner::MemPool;
use crate::transaction::{SignedTransaction, UnverifiedTransaction};
use crate::types::BlockId;

/// Read-only view of one account state, detached from the live chain.
/// Obtained from [`ChainEngine::state_at`]; also the post-state half of a
/// head candidate.
pub trait StateInfo: Send {
    /// Height this state was computed at.
    fn block_number(&self) -> BlockNumber;

    /// Nonce of the account.
    fn nonce(&self, address: &Address) -> U256;

    /// Balance of the account.
    fn balance(&self, address: &Address) -> U256;

    /// Code deployed at the address, if any.
    fn code(&self, address: &Address) -> Option<Bytes>;

    /// Execute a read-only contract call against an ephemeral clone of this
    /// state. Nothing is committed.
    fn call_contract(&self, to: &Address, data: &[u8]) -> Result<Bytes, CallError>;
}

/// The external block/state/EVM execution engine. The client core drives it
/// but never reimplements it; everything behind this trait (transaction
/// application, state roots, PoW rules, the block builder) lives outside
/// this workspace.
pub trait ChainEngine: Send + Sync {
    /// Canonical chain snapshot.
    fn chain_info(&self) -> BlockChainInfo;

    /// Hand a verified block to the engine. `Ok(true)` means the block was
    /// accepted; whether it extended the canonical head is visible through
    /// `chain_info`.
    fn add_block(&self, block: &Block) -> Result<bool, Error>;

    /// The block is on some known chain.
    fn has_block(&self, hash: &H256) -> bool;

    /// Full block lookup.
    fn block(&self, id: BlockId) -> Option<Block>;

    /// Header lookup.
    fn block_header(&self, id: BlockId) -> Option<Header>;

    /// Hash lookup.
    fn block_hash(&self, id: BlockId) -> Option<H256>;

    /// State at the given block, or the head state for `BlockId::Latest`.
    /// Used both for account queries and as the base of contract views.
    fn state_at(&self, id: BlockId) -> Option<Box<dyn StateInfo>>;

    /// Apply queued time-dependent transitions. Driven by the periodic
    /// time-queue task.
    fn process_time_queue(&self);

    /// Check the proof-of-work seal of a header.
    fn check_pow(&self, header: &Header) -> bool;

    /// Stateful verification of a block body before import; transaction
    /// errors map onto telemetry tags.
    fn verify_block(&self, block: &Block) -> Result<(), Error>;

    /// Validate a wire transaction against a state and recover its sender.
    fn validate_transaction(
        &self,
        tx: &UnverifiedTransaction,
        state: &dyn StateInfo,
    ) -> Result<SignedTransaction, TransactionError>;

    /// Build a proposal block on top of the current head out of the given
    /// pool. The builder consumes pool entries, which is why it receives a
    /// copy. Returns the block and its post-state.
    fn make_head_candidate(
        &self,
        pool: &mut MemPool,
        timestamp: u64,
        author: &Address,
    ) -> Result<(Block, Box<dyn StateInfo>), Error>;

    /// EVM template of the signature-validation contract identifying
    /// `address` on the finality contract.
    fn validation_code(&self, address: &Address) -> Bytes;
}

/// Live view of the external block download planner.
pub trait SyncProvider: Send + Sync {
    /// A sync round is in progress; local state is considered stale.
    fn is_syncing(&self) -> bool;
}

/// Gossip fan-out half of the wire protocol, implemented by the sync
/// extension and registered with the chain service.
pub trait Broadcaster: Send + Sync {
    /// Send transactions to every peer except `exclude`.
    fn broadcast_transactions(&self, txs: &[UnverifiedTransaction], exclude: Option<PeerId>);

    /// Announce a new block to every peer except `exclude`.
    fn broadcast_new_block(&self, block: &Block, total_score: U256, exclude: Option<PeerId>);
}
