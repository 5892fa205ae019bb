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

mod challenge;
mod extension;
mod headers;
pub mod message;

pub use self::extension::BlockSyncExtension;

use ethereum_types::{H256, U256};
use vcore::{Header, SyncProvider, UnverifiedTransaction};
use vnetwork::PeerId;
use vtypes::BlockNumber;

/// The external block download planner. The extension feeds it peer state
/// and responses; it decides what to request and imports what it completes.
pub trait Synchronizer: SyncProvider {
    /// A peer passed the fork-identity challenge and advertised this head.
    fn receive_status(&self, peer: PeerId, best_hash: H256, total_score: U256);

    /// A peer announced block hashes without the full blocks.
    fn receive_new_block_hashes(&self, peer: PeerId, hashes: Vec<(H256, BlockNumber)>);

    /// Headers answering one of the synchronizer's own requests.
    fn receive_headers(&self, peer: PeerId, headers: Vec<Header>);

    /// Bodies answering one of the synchronizer's own requests.
    fn receive_bodies(&self, peer: PeerId, bodies: Vec<Vec<UnverifiedTransaction>>);
}
