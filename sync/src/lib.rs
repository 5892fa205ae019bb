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
#[macro_use]
extern crate log;
extern crate parking_lot;
extern crate rlp;
extern crate vesper_core as vcore;
#[macro_use]
extern crate vesper_logger as vlogger;
extern crate vesper_network as vnetwork;
extern crate vesper_types as vtypes;

#[cfg(test)]
extern crate kvdb_memorydb;

mod block;

pub use crate::block::{BlockSyncExtension, Synchronizer};
pub use crate::block::message::{Message, PROTOCOL_VERSION};
