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

use std::cmp;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ethereum_types::{H256, U256};
use parking_lot::{Mutex, RwLock};
use rlp::{Encodable, Rlp};
use vcore::{Block, BlockId, Broadcaster, ChainService, Header, TransientBlock, UnverifiedTransaction};
use vnetwork::{Api, DisconnectReason, NetworkExtension, PeerId, TimerToken};
use vtypes::BlockNumber;

use super::challenge::{self, DaoChallenge};
use super::headers;
use super::message::{
    HashOrNumber, Message, MAX_BODIES_TO_SEND, MAX_HEADERS_TO_SEND, MAX_NEW_BLOCK_HASHES, PROTOCOL_VERSION,
};
use super::Synchronizer;

const EXTENSION_NAME: &str = "block-propagation";
const CHALLENGE_TIMER_TOKEN: TimerToken = 0;
const CHALLENGE_TIMER_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
struct Peer {
    total_score: U256,
    best_hash: H256,
}

/// The block-propagation wire extension: exchanges statuses, answers header
/// and body queries, routes gossip, and runs the fork-identity challenge
/// against every new peer.
pub struct BlockSyncExtension {
    service: Arc<ChainService>,
    synchronizer: Arc<dyn Synchronizer>,
    peers: RwLock<HashMap<PeerId, Peer>>,
    challenges: Mutex<HashMap<PeerId, DaoChallenge>>,
    api: Mutex<Option<Arc<dyn Api>>>,
}

impl BlockSyncExtension {
    pub fn new(service: Arc<ChainService>, synchronizer: Arc<dyn Synchronizer>) -> Arc<Self> {
        Arc::new(Self {
            service,
            synchronizer,
            peers: RwLock::new(HashMap::new()),
            challenges: Mutex::new(HashMap::new()),
            api: Mutex::new(None),
        })
    }

    fn send(&self, peer: &PeerId, message: Message) {
        if let Some(api) = self.api.lock().as_ref() {
            api.send(peer, &message.rlp_bytes());
        }
    }

    fn disconnect(&self, peer: &PeerId, reason: DisconnectReason) {
        self.peers.write().remove(peer);
        self.challenges.lock().remove(peer);
        if let Some(api) = self.api.lock().as_ref() {
            api.disconnect(peer, reason);
        }
    }

    fn on_status(
        &self,
        peer: &PeerId,
        protocol_version: u8,
        network_id: u64,
        total_score: U256,
        best_hash: H256,
        genesis_hash: H256,
    ) {
        if protocol_version != PROTOCOL_VERSION {
            vdebug!(SYNC, "peer #{} speaks protocol {}, ours is {}", peer, protocol_version, PROTOCOL_VERSION);
            self.disconnect(peer, DisconnectReason::UselessPeer);
            return
        }
        let local_network = self.service.common_params().network_id;
        if network_id != local_network {
            vinfo!(SYNC, "peer #{} is on network {}, expected {}", peer, network_id, local_network);
            self.disconnect(peer, DisconnectReason::SubprotocolError);
            return
        }
        let genesis = self.service.engine().chain_info().genesis_hash;
        if genesis_hash != genesis {
            vwarn!(SYNC, "genesis mismatch with peer #{}: got {:#x}", peer, genesis_hash);
            self.disconnect(peer, DisconnectReason::SubprotocolError);
            return
        }

        self.peers.write().insert(*peer, Peer {
            total_score,
            best_hash,
        });

        // The claimed head is held back from the synchronizer until the
        // peer proves its fork identity.
        self.challenges.lock().insert(*peer, DaoChallenge::new(best_hash, total_score));
        let fork_number = self.service.common_params().dao_fork_blknum;
        self.send(peer, Message::GetBlockHeaders {
            origin: HashOrNumber::Number(fork_number),
            max_headers: 1,
            skip: 0,
            reverse: false,
        });
    }

    fn on_get_block_headers(&self, peer: &PeerId, origin: HashOrNumber, max_headers: u64, skip: u64, reverse: bool) {
        if !self.peers.read().contains_key(peer) {
            vinfo!(SYNC, "header request from unknown peer #{}", peer);
            return
        }

        let params = self.service.common_params();
        if challenge::is_dao_challenge(params, origin, max_headers, skip, reverse) {
            // Fork-identity challenge: answer directly, no walk. Peers
            // without history must be answerable, and an empty answer is a
            // valid "I do not have that block yet".
            vdebug!(SYNC, "answering fork identity challenge of peer #{}", peer);
            let headers =
                self.service.engine().block_header(BlockId::Number(params.dao_fork_blknum)).into_iter().collect();
            self.send(peer, Message::BlockHeaders(headers));
            return
        }

        let max_headers = cmp::min(max_headers, MAX_HEADERS_TO_SEND);
        let headers = headers::query_headers(&**self.service.engine(), origin, max_headers, skip, reverse);
        vdebug!(SYNC, "sending {} headers to peer #{}", headers.len(), peer);
        self.send(peer, Message::BlockHeaders(headers));
    }

    fn on_block_headers(&self, peer: &PeerId, headers: Vec<Header>) {
        let pending_challenge = self.challenges.lock().remove(peer);
        if let Some(outstanding) = pending_challenge {
            if challenge::accepts_answer(self.service.common_params(), &headers) {
                vdebug!(SYNC, "peer #{} passed the fork identity challenge", peer);
                self.synchronizer.receive_status(*peer, outstanding.best_hash, outstanding.total_score);
                let pending = self.service.pending_transactions();
                if !pending.is_empty() {
                    vdebug!(SYNC, "sending {} pending transactions to peer #{}", pending.len(), peer);
                    self.send(peer, Message::Transactions(pending));
                }
            } else {
                vinfo!(SYNC, "peer #{} failed the fork identity challenge", peer);
                self.disconnect(peer, DisconnectReason::SubprotocolError);
            }
            return
        }

        self.synchronizer.receive_headers(*peer, headers);
    }

    fn on_get_block_bodies(&self, peer: &PeerId, hashes: Vec<H256>) {
        if !self.peers.read().contains_key(peer) {
            return
        }
        let mut bodies = Vec::new();
        for hash in hashes.iter().take(MAX_BODIES_TO_SEND) {
            // Unknown hashes are skipped silently.
            if let Some(block) = self.service.engine().block(BlockId::Hash(*hash)) {
                bodies.push(block.transactions);
            }
        }
        vdebug!(SYNC, "sending {} bodies to peer #{}", bodies.len(), peer);
        self.send(peer, Message::BlockBodies(bodies));
    }

    fn on_transactions(&self, peer: &PeerId, transactions: Vec<UnverifiedTransaction>) {
        vdebug!(SYNC, "{} transactions from peer #{}", transactions.len(), peer);
        for tx in transactions {
            self.service.add_transaction(tx, Some(*peer), false, false);
        }
    }

    fn on_new_block_hashes(&self, peer: &PeerId, hashes: Vec<(H256, BlockNumber)>) {
        if hashes.len() > MAX_NEW_BLOCK_HASHES {
            vwarn!(SYNC, "peer #{} announced {} block hashes, dropping the announcement", peer, hashes.len());
            return
        }
        let unknown: Vec<(H256, BlockNumber)> =
            hashes.into_iter().filter(|(hash, _)| !self.service.knows_block(hash)).collect();
        if !unknown.is_empty() {
            self.synchronizer.receive_new_block_hashes(*peer, unknown);
        }
    }

    fn on_new_block(&self, peer: &PeerId, block: Vec<u8>, total_score: U256) {
        let t_block = match TransientBlock::new(block, Some(Instant::now())) {
            Ok(t_block) => t_block,
            Err(err) => {
                vinfo!(SYNC, "undecodable new block from peer #{}: {}", peer, err);
                self.disconnect(peer, DisconnectReason::SubprotocolError);
                return
            }
        };
        if let Some(entry) = self.peers.write().get_mut(peer) {
            entry.total_score = total_score;
            entry.best_hash = t_block.hash();
        }
        vdebug!(SYNC, "new block {} from peer #{}", t_block, peer);
        self.service.queue_block(t_block, *peer);
    }
}

impl NetworkExtension for BlockSyncExtension {
    fn name(&self) -> &'static str {
        EXTENSION_NAME
    }

    fn on_initialize(&self, api: Arc<dyn Api>) {
        api.set_timer(CHALLENGE_TIMER_TOKEN, CHALLENGE_TIMER_INTERVAL);
        *self.api.lock() = Some(api);
    }

    fn on_peer_added(&self, peer: &PeerId) {
        let info = self.service.engine().chain_info();
        self.send(peer, Message::Status {
            protocol_version: PROTOCOL_VERSION,
            network_id: self.service.common_params().network_id,
            total_score: info.total_score,
            best_hash: info.best_block_hash,
            genesis_hash: info.genesis_hash,
        });
    }

    fn on_peer_removed(&self, peer: &PeerId) {
        self.peers.write().remove(peer);
        self.challenges.lock().remove(peer);
    }

    fn on_message(&self, peer: &PeerId, data: &[u8]) {
        let message = match Rlp::new(data).as_val() {
            Ok(message) => message,
            Err(err) => {
                vinfo!(SYNC, "invalid message from peer #{}: {}", peer, err);
                return
            }
        };
        match message {
            Message::Status {
                protocol_version,
                network_id,
                total_score,
                best_hash,
                genesis_hash,
            } => self.on_status(peer, protocol_version, network_id, total_score, best_hash, genesis_hash),
            Message::NewBlockHashes(hashes) => self.on_new_block_hashes(peer, hashes),
            Message::Transactions(transactions) => self.on_transactions(peer, transactions),
            Message::GetBlockHeaders {
                origin,
                max_headers,
                skip,
                reverse,
            } => self.on_get_block_headers(peer, origin, max_headers, skip, reverse),
            Message::BlockHeaders(headers) => self.on_block_headers(peer, headers),
            Message::GetBlockBodies(hashes) => self.on_get_block_bodies(peer, hashes),
            Message::BlockBodies(bodies) => {
                if !bodies.is_empty() {
                    self.synchronizer.receive_bodies(*peer, bodies);
                }
            }
            Message::NewBlock {
                block,
                total_score,
            } => self.on_new_block(peer, block, total_score),
        }
    }

    fn on_timeout(&self, timer: TimerToken) {
        debug_assert_eq!(timer, CHALLENGE_TIMER_TOKEN);
        let now = Instant::now();
        let expired: Vec<PeerId> =
            self.challenges.lock().iter().filter(|(_, c)| c.expired(now)).map(|(peer, _)| *peer).collect();
        for peer in expired {
            vinfo!(SYNC, "fork identity challenge timed out for peer #{}", peer);
            self.disconnect(&peer, DisconnectReason::SubprotocolError);
        }
    }
}

impl Broadcaster for BlockSyncExtension {
    fn broadcast_transactions(&self, txs: &[UnverifiedTransaction], exclude: Option<PeerId>) {
        let data = Message::Transactions(txs.to_vec()).rlp_bytes();
        if let Some(api) = self.api.lock().as_ref() {
            for peer in self.peers.read().keys() {
                if Some(*peer) != exclude {
                    api.send(peer, &data);
                }
            }
        }
    }

    fn broadcast_new_block(&self, block: &Block, total_score: U256, exclude: Option<PeerId>) {
        let data = Message::NewBlock {
            block: block.rlp_bytes(),
            total_score,
        }
        .rlp_bytes();
        if let Some(api) = self.api.lock().as_ref() {
            for peer in self.peers.read().keys() {
                if Some(*peer) != exclude {
                    api.send(peer, &data);
                }
            }
        }
    }
}
