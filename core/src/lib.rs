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

extern crate ethereum_types;
extern crate keccak_hash;
extern crate kvdb;
#[macro_use]
extern crate log;
extern crate lru_cache;
extern crate parking_lot;
extern crate rlp;
#[macro_use]
extern crate serde_derive;
extern crate time;
#[macro_use]
extern crate vesper_logger as vlogger;
extern crate vesper_network as vnetwork;
extern crate vesper_types as vtypes;

#[cfg(test)]
extern crate kvdb_memorydb;
#[cfg(test)]
extern crate rand;

mod account_provider;
mod block;
mod blockchain_info;
mod client;
mod db;
mod error;
mod header;
mod miner;
mod sentry;
mod service;
mod transaction;
mod types;

pub use crate::account_provider::{AccountProvider, SignError, Signer};
pub use crate::block::{Block, TransientBlock};
pub use crate::blockchain_info::BlockChainInfo;
pub use crate::client::{
    BroadcastFilter, Broadcaster, ChainConfig, ChainEngine, ChainNotify, PruningMode, StateInfo, SyncProvider,
};
pub use crate::client::test_client;
pub use crate::db::check_startup_stamps;
pub use crate::error::{BlockError, CallError, Error, ImportError, StartupError};
pub use crate::header::{Header, Seal};
pub use crate::miner::MemPool;
pub use crate::sentry::{InvalidReason, NullSentry, Sentry};
pub use crate::service::ChainService;
pub use crate::transaction::{
    contract_address, vote_selector, Action, SignedTransaction, Transaction, UnverifiedTransaction, UNSIGNED_SENDER,
};
pub use crate::types::BlockId;

pub use vtypes::BlockNumber;
