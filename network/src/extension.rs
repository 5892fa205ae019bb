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

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Token identifying a connected peer within the transport.
pub type PeerId = usize;

/// Token identifying a timer registered through [`Api::set_timer`].
pub type TimerToken = usize;

/// Reason attached to a locally initiated disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer speaks no protocol version we can use.
    UselessPeer,
    /// The peer violated the subprotocol (wrong network, wrong genesis,
    /// failed fork-identity challenge, malformed message).
    SubprotocolError,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisconnectReason::UselessPeer => f.write_str("useless peer"),
            DisconnectReason::SubprotocolError => f.write_str("subprotocol error"),
        }
    }
}

/// Transport-side surface an extension may call.
pub trait Api: Send + Sync {
    /// Send a subprotocol message to a peer.
    fn send(&self, peer: &PeerId, data: &[u8]);

    /// Drop the connection to a peer.
    fn disconnect(&self, peer: &PeerId, reason: DisconnectReason);

    /// Arrange for `NetworkExtension::on_timeout` to fire every `interval`.
    fn set_timer(&self, token: TimerToken, interval: Duration);
}

/// Extension-side callbacks invoked by the transport.
///
/// All callbacks are invoked from transport threads; implementations guard
/// their own state.
pub trait NetworkExtension: Send + Sync {
    /// Name under which the subprotocol is negotiated.
    fn name(&self) -> &'static str;

    /// Called once before any peer events, with the transport handle.
    fn on_initialize(&self, api: Arc<dyn Api>);

    /// A peer finished negotiating this subprotocol.
    fn on_peer_added(&self, peer: &PeerId);

    /// A peer disconnected or was dropped.
    fn on_peer_removed(&self, peer: &PeerId);

    /// A subprotocol message arrived from a peer.
    fn on_message(&self, peer: &PeerId, data: &[u8]);

    /// A timer registered through [`Api::set_timer`] fired.
    fn on_timeout(&self, _token: TimerToken) {}
}
