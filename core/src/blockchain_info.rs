// Copyright 2018 Vesper Project.
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

use ethereum_types::{H256, U256};
use vtypes::BlockNumber;

/// Snapshot of the canonical chain as reported by the execution engine.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockChainInfo {
    /// Accumulated proof-of-work score of the canonical chain.
    pub total_score: U256,
    /// Hash of the canonical tip.
    pub best_block_hash: H256,
    /// Number of the canonical tip.
    pub best_block_number: BlockNumber,
    /// Hash of the genesis block.
    pub genesis_hash: H256,
}
