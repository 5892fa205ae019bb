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

//! Interfaces between subprotocol extensions and the p2p transport.
//!
//! The transport itself (socket handling, framing, encryption, peer
//! discovery) lives outside this workspace; extensions see connected peers
//! only through the [`Api`] handed to them on initialization and the
//! callbacks of [`NetworkExtension`].

mod extension;

pub use crate::extension::{Api, DisconnectReason, NetworkExtension, PeerId, TimerToken};
