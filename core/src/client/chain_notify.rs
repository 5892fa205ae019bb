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

use crate::block::Block;

/// Represents what has to be handled by an actor listening to chain events.
/// Listeners are called in registration order, outside the admission lock.
pub trait ChainNotify: Send + Sync {
    /// Fires when a block became the new canonical head.
    fn new_head(&self, _block: &Block) {
        // does nothing by default
    }
}
