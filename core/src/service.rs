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

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use ethereum_types::{Address, H256, U256};
use kvdb::KeyValueDB;
use parking_lot::{Mutex, RwLock};
use time::get_time;
use vnetwork::PeerId;
use vtypes::CommonParams;

use crate::block::{Block, TransientBlock};
use crate::client::{
    Broadcaster, BroadcastFilter, ChainConfig, ChainEngine, ChainNotify, Importer, StateInfo, SyncProvider,
};
use crate::db;
use crate::error::Error;
use crate::miner::MemPool;
use crate::sentry::Sentry;
use crate::transaction::UnverifiedTransaction;

/// Interval of the periodic time-queue task.
const PROCESS_TIME_QUEUE_PERIOD: Duration = Duration::from_secs(5);
/// Window of block processing latency samples kept for the stats line.
const PROCESSING_TIME_SAMPLES: usize = 1000;

struct HeadCandidate {
    block: Block,
    state: Box<dyn StateInfo>,
}

/// Manages the chain and requests to it: serialized block import,
/// transaction admission, the head-candidate cache and gossip entry points.
/// The chain itself lives in the external execution engine.
pub struct ChainService {
    pub(crate) engine: Arc<dyn ChainEngine>,
    params: CommonParams,
    min_gas_price: U256,
    coinbase: Address,
    pub(crate) importer: Importer,
    /// The pool mutex doubles as the admission lock: the importer holds it
    /// for a whole drain.
    pub(crate) mem_pool: Mutex<MemPool>,
    head_candidate: Mutex<Option<HeadCandidate>>,
    candidate_dirty: AtomicBool,
    broadcast_filter: Mutex<BroadcastFilter>,
    notify: RwLock<Vec<std::sync::Weak<dyn ChainNotify>>>,
    broadcaster: RwLock<Weak<dyn Broadcaster>>,
    sync: RwLock<Weak<dyn SyncProvider>>,
    pub(crate) sentry: Arc<dyn Sentry>,
    authoring: AtomicBool,
    processing_times: Mutex<VecDeque<Duration>>,
    self_ref: RwLock<Weak<ChainService>>,
    stop: AtomicBool,
}

impl ChainService {
    /// Checks the startup stamps of the data directory and assembles the
    /// service. Stamp violations are fatal.
    pub fn new(
        engine: Arc<dyn ChainEngine>,
        database: &dyn KeyValueDB,
        config: ChainConfig,
        params: CommonParams,
        coinbase: Address,
        sentry: Arc<dyn Sentry>,
    ) -> Result<Arc<Self>, Error> {
        db::check_startup_stamps(database, &config)?;
        vinfo!(CHAIN, "initializing chain service at block #{}", engine.chain_info().best_block_number);

        let service = Arc::new(Self {
            engine,
            params,
            min_gas_price: config.min_gas_price.into(),
            coinbase,
            importer: Importer::new(config.queue_size),
            mem_pool: Mutex::new(MemPool::new()),
            head_candidate: Mutex::new(None),
            candidate_dirty: AtomicBool::new(true),
            broadcast_filter: Mutex::new(BroadcastFilter::new()),
            notify: RwLock::new(Vec::new()),
            broadcaster: RwLock::new(Weak::<NeverBroadcast>::new() as Weak<dyn Broadcaster>),
            sync: RwLock::new(Weak::<NeverSync>::new() as Weak<dyn SyncProvider>),
            sentry,
            authoring: AtomicBool::new(false),
            processing_times: Mutex::new(VecDeque::with_capacity(PROCESSING_TIME_SAMPLES)),
            self_ref: RwLock::new(Weak::new()),
            stop: AtomicBool::new(false),
        });
        *service.self_ref.write() = Arc::downgrade(&service);
        Ok(service)
    }

    pub fn engine(&self) -> &Arc<dyn ChainEngine> {
        &self.engine
    }

    pub fn common_params(&self) -> &CommonParams {
        &self.params
    }

    pub fn coinbase(&self) -> &Address {
        &self.coinbase
    }

    /// Adds a new-head listener. Listeners fire in registration order.
    pub fn add_notify(&self, target: &Arc<dyn ChainNotify>) {
        self.notify.write().push(Arc::downgrade(target));
    }

    pub fn set_broadcaster(&self, broadcaster: &Arc<dyn Broadcaster>) {
        *self.broadcaster.write() = Arc::downgrade(broadcaster);
    }

    pub fn set_sync(&self, sync: &Arc<dyn SyncProvider>) {
        *self.sync.write() = Arc::downgrade(sync);
    }

    /// Block production is active: a mining worker or the validator service
    /// is running. Remote transactions are only kept in the pool while this
    /// is set.
    pub fn set_authoring(&self, authoring: bool) {
        self.authoring.store(authoring, Ordering::SeqCst);
    }

    pub fn is_authoring(&self) -> bool {
        self.authoring.load(Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.read().upgrade().map_or(false, |sync| sync.is_syncing())
    }

    /// Spawns the periodic task driving the engine's time queue.
    pub fn start_time_queue(&self) {
        let service = match self.self_ref.read().upgrade() {
            Some(service) => service,
            None => return,
        };
        let spawned = thread::Builder::new().name("time queue".into()).spawn(move || {
            while !service.stop.load(Ordering::SeqCst) {
                thread::sleep(PROCESS_TIME_QUEUE_PERIOD);
                if service.stop.load(Ordering::SeqCst) {
                    break
                }
                service.engine.process_time_queue();
            }
            vdebug!(SHUTDOWN, "time queue task stopped");
        });
        if spawned.is_err() {
            verror!(IO, "failed to spawn the time queue task");
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Appends a block to the import queue (blocking while it is full) and
    /// schedules a drain unless one is already running.
    pub fn queue_block(&self, block: TransientBlock, peer: PeerId) {
        self.importer.queue().put(block, peer);
        if self.importer.try_activate() {
            let service = match self.self_ref.read().upgrade() {
                Some(service) => service,
                None => {
                    self.importer.deactivate();
                    return
                }
            };
            let spawned = thread::Builder::new().name("block import".into()).spawn(move || {
                service.importer.import_queued_blocks(&service);
            });
            if spawned.is_err() {
                verror!(IO, "failed to spawn the block import task");
                self.importer.deactivate();
            }
        }
    }

    /// A locally sealed block enters the chain directly.
    pub fn add_mined_block(&self, block: Block) -> bool {
        let head_before = self.engine.chain_info().best_block_hash;
        match self.engine.add_block(&block) {
            Ok(true) => {
                if self.engine.chain_info().best_block_hash == head_before {
                    vdebug!(CHAIN, "mined block #{} did not become the head", block.header.number());
                    return false
                }
                {
                    let mut pool = self.mem_pool.lock();
                    pool.remove_included(&block.transactions);
                    self.candidate_dirty.store(true, Ordering::SeqCst);
                }
                let total_score = self.engine.chain_info().total_score;
                self.broadcast_new_block(&block, total_score, None);
                self.notify_new_head(&block);
                true
            }
            Ok(false) => {
                vdebug!(CHAIN, "failed to add mined block #{}", block.header.number());
                false
            }
            Err(err) => {
                vwarn!(CHAIN, "mined block rejected: {}", err);
                false
            }
        }
    }

    /// The block is on chain, queued, or being imported right now.
    pub fn knows_block(&self, hash: &H256) -> bool {
        self.engine.has_block(hash) || self.importer.queue().contains(hash)
    }

    /// Transaction admission. `origin` is the gossiping peer, absent for
    /// locally minted transactions; `force_broadcast` pushes a local
    /// transaction out even while syncing; `force` overrides same-nonce
    /// replacement rules in the pool.
    pub fn add_transaction(
        &self,
        tx: UnverifiedTransaction,
        origin: Option<PeerId>,
        force_broadcast: bool,
        force: bool,
    ) {
        if self.is_syncing() {
            if force_broadcast && origin.is_none() {
                vdebug!(OWN_TX, "force broadcasting unvalidated transaction {:#x}", tx.hash());
                self.broadcast_transaction(&tx, origin);
            }
            // State is stale; the transaction cannot be evaluated.
            return
        }

        if self.broadcast_filter.lock().contains(&tx.hash()) {
            vdebug!(EXTERNAL_TX, "discarding known transaction {:#x}", tx.hash());
            return
        }

        // Validation runs against the head-candidate post-state.
        let signed = {
            let mut slot = self.head_candidate.lock();
            if let Err(err) = self.rebuild_candidate(&mut slot) {
                vwarn!(CHAIN, "cannot validate transaction, head candidate unavailable: {}", err);
                return
            }
            let candidate = slot.as_ref().expect("rebuild_candidate fills the slot");
            match self.engine.validate_transaction(&tx, &*candidate.state) {
                Ok(signed) => signed,
                Err(err) => {
                    vdebug!(EXTERNAL_TX, "invalid transaction {:#x}: {}", tx.hash(), err);
                    return
                }
            }
        };

        // Valid transactions propagate regardless of local admission policy.
        self.broadcast_transaction(&tx, origin);

        if origin.is_some() && !self.is_authoring() {
            vdebug!(EXTERNAL_TX, "not authoring, transaction {:#x} not kept", tx.hash());
            return
        }

        if signed.gas_price >= self.min_gas_price || tx.is_casper_vote(&self.params.casper_address) {
            let mut pool = self.mem_pool.lock();
            if pool.add(signed, force) {
                self.candidate_dirty.store(true, Ordering::SeqCst);
            }
        } else {
            vinfo!(EXTERNAL_TX, "gas price {} below the floor, ignoring {:#x}", signed.gas_price, tx.hash());
        }
    }

    /// Relays a transaction to peers unless it was relayed recently.
    pub fn broadcast_transaction(&self, tx: &UnverifiedTransaction, origin: Option<PeerId>) {
        if self.broadcast_filter.lock().observe(tx.hash()) {
            vdebug!(CHAIN, "broadcasting transaction {:#x}", tx.hash());
            if let Some(broadcaster) = self.broadcaster.read().upgrade() {
                broadcaster.broadcast_transactions(std::slice::from_ref(tx), origin);
            }
        } else {
            vdebug!(CHAIN, "transaction {:#x} was already broadcast", tx.hash());
        }
    }

    /// Announces a block to peers unless it was announced recently.
    pub fn broadcast_new_block(&self, block: &Block, total_score: U256, origin: Option<PeerId>) {
        if self.broadcast_filter.lock().observe(block.header.hash()) {
            vdebug!(CHAIN, "broadcasting new block #{}", block.header.number());
            if let Some(broadcaster) = self.broadcaster.read().upgrade() {
                broadcaster.broadcast_new_block(block, total_score, origin);
            }
        } else {
            vdebug!(CHAIN, "block #{} was already broadcast", block.header.number());
        }
    }

    /// The pending transaction set, pool order.
    pub fn pending_transactions(&self) -> Vec<UnverifiedTransaction> {
        self.mem_pool.lock().pending().into_iter().map(Into::into).collect()
    }

    /// The proposal block built over the current head, rebuilt lazily after
    /// every pool or head change.
    pub fn head_candidate(&self) -> Option<Block> {
        let mut slot = self.head_candidate.lock();
        match self.rebuild_candidate(&mut slot) {
            Ok(()) => slot.as_ref().map(|candidate| candidate.block.clone()),
            Err(err) => {
                vwarn!(CHAIN, "head candidate rebuild failed: {}", err);
                None
            }
        }
    }

    fn rebuild_candidate(&self, slot: &mut Option<HeadCandidate>) -> Result<(), Error> {
        let dirty = self.candidate_dirty.swap(false, Ordering::SeqCst);
        if slot.is_some() && !dirty {
            return Ok(())
        }

        // The builder consumes transactions, so it works on a copy.
        let mut pool_copy = self.mem_pool.lock().clone();
        let timestamp = (get_time().sec - 1) as u64;
        let (block, state) = self.engine.make_head_candidate(&mut pool_copy, timestamp, &self.coinbase)?;
        *slot = Some(HeadCandidate {
            block,
            state,
        });
        Ok(())
    }

    pub(crate) fn mark_candidate_dirty(&self) {
        self.candidate_dirty.store(true, Ordering::SeqCst);
    }

    pub(crate) fn notify_new_head(&self, block: &Block) {
        let listeners: Vec<_> = self.notify.read().iter().filter_map(std::sync::Weak::upgrade).collect();
        vdebug!(CHAIN, "new head #{}, notifying {} listeners", block.header.number(), listeners.len());
        for listener in listeners {
            listener.new_head(block);
        }
    }

    pub(crate) fn record_processing_time(&self, elapsed: Duration) {
        let mut times = self.processing_times.lock();
        if times.len() == PROCESSING_TIME_SAMPLES {
            times.pop_front();
        }
        times.push_back(elapsed);

        let mut sorted: Vec<Duration> = times.iter().cloned().collect();
        sorted.sort();
        let avg = sorted.iter().sum::<Duration>() / sorted.len() as u32;
        let median = sorted[sorted.len() / 2];
        vinfo!(
            CLIENT,
            "block processing time: last {:?} avg {:?} median {:?} min {:?} max {:?}",
            elapsed,
            avg,
            median,
            sorted[0],
            sorted[sorted.len() - 1]
        );
    }
}

// Placeholder targets for the empty Weak slots; never instantiated.
struct NeverBroadcast;
impl Broadcaster for NeverBroadcast {
    fn broadcast_transactions(&self, _txs: &[UnverifiedTransaction], _exclude: Option<PeerId>) {}
    fn broadcast_new_block(&self, _block: &Block, _total_score: U256, _exclude: Option<PeerId>) {}
}

struct NeverSync;
impl SyncProvider for NeverSync {
    fn is_syncing(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use ethereum_types::H160;
    use kvdb_memorydb;
    use vtypes::transaction::Error as TransactionError;
    use vtypes::util::Mismatch;
    use vtypes::BlockNumber;

    use super::*;
    use crate::client::test_client::TestChainEngine;
    use crate::header::Header;
    use crate::sentry::{InvalidReason, NullSentry};
    use crate::transaction::{vote_selector, Action, Transaction};

    #[derive(Default)]
    struct RecordingBroadcaster {
        txs: Mutex<Vec<(H256, Option<PeerId>)>>,
        blocks: Mutex<Vec<(H256, U256)>>,
    }

    impl Broadcaster for RecordingBroadcaster {
        fn broadcast_transactions(&self, txs: &[UnverifiedTransaction], exclude: Option<PeerId>) {
            let mut log = self.txs.lock();
            for tx in txs {
                log.push((tx.hash(), exclude));
            }
        }

        fn broadcast_new_block(&self, block: &Block, total_score: U256, _exclude: Option<PeerId>) {
            self.blocks.lock().push((block.header.hash(), total_score));
        }
    }

    struct StaticSync(bool);

    impl SyncProvider for StaticSync {
        fn is_syncing(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingSentry {
        reasons: Mutex<Vec<InvalidReason>>,
    }

    impl Sentry for CountingSentry {
        fn warn_invalid(&self, _block: &TransientBlock, reason: InvalidReason) {
            self.reasons.lock().push(reason);
        }
    }

    #[derive(Default)]
    struct HeadRecorder {
        heads: Mutex<Vec<BlockNumber>>,
    }

    impl ChainNotify for HeadRecorder {
        fn new_head(&self, block: &Block) {
            self.heads.lock().push(block.header.number());
        }
    }

    fn new_service(engine: &Arc<TestChainEngine>, sentry: Arc<dyn Sentry>) -> Arc<ChainService> {
        let db = kvdb_memorydb::create(0);
        ChainService::new(
            Arc::clone(engine) as Arc<dyn ChainEngine>,
            &db,
            ChainConfig::default(),
            CommonParams::default(),
            Address::random(),
            sentry,
        )
        .unwrap()
    }

    fn priced_tx(gas_price: u64) -> UnverifiedTransaction {
        Transaction {
            nonce: 0.into(),
            gas_price: gas_price.into(),
            gas: 21_000.into(),
            action: Action::Call(Address::random()),
            value: 1.into(),
            data: vec![],
        }
        .fake_sign(Address::random())
        .into()
    }

    fn vote_tx(params: &CommonParams) -> UnverifiedTransaction {
        let mut data = vote_selector().to_vec();
        data.extend_from_slice(b"vote");
        Transaction {
            nonce: 0.into(),
            gas_price: 0.into(),
            gas: 1_000_000.into(),
            action: Action::Call(params.casper_address),
            value: 0.into(),
            data,
        }
        .null_sign()
        .into()
    }

    fn child_of(parent: &Block, transactions: Vec<UnverifiedTransaction>) -> Block {
        let mut header = Header::new();
        header.set_parent_hash(parent.header.hash());
        header.set_number(parent.header.number() + 1);
        header.set_score(1.into());
        Block {
            header,
            transactions,
        }
    }

    fn drain(service: &Arc<ChainService>) {
        assert!(service.importer.try_activate());
        service.importer.import_queued_blocks(service);
    }

    #[test]
    fn local_transaction_is_broadcast_and_pooled() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));

        let tx = priced_tx(200_000_000_000);
        service.add_transaction(tx.clone(), None, false, false);

        assert_eq!(broadcaster.txs.lock().len(), 1);
        assert_eq!(service.pending_transactions(), vec![tx]);
    }

    #[test]
    fn remote_transaction_needs_authoring_to_stay() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));

        service.add_transaction(priced_tx(200_000_000_000), Some(7), false, false);
        assert_eq!(broadcaster.txs.lock().len(), 1, "valid transactions propagate regardless");
        assert!(service.pending_transactions().is_empty());

        service.set_authoring(true);
        service.add_transaction(priced_tx(200_000_000_000), Some(7), false, false);
        assert_eq!(service.pending_transactions().len(), 1);
    }

    #[test]
    fn syncing_drops_remote_and_force_broadcasts_local() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));
        let sync = Arc::new(StaticSync(true)) as Arc<dyn SyncProvider>;
        service.set_sync(&sync);

        service.add_transaction(priced_tx(200_000_000_000), Some(3), false, false);
        assert!(broadcaster.txs.lock().is_empty());

        service.add_transaction(priced_tx(200_000_000_000), None, true, false);
        assert_eq!(broadcaster.txs.lock().len(), 1, "local force_broadcast skips validation");
        assert!(service.pending_transactions().is_empty());
    }

    #[test]
    fn known_transaction_is_dropped_early() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));

        let tx = priced_tx(200_000_000_000);
        service.add_transaction(tx.clone(), None, false, false);
        service.add_transaction(tx, None, false, false);

        assert_eq!(broadcaster.txs.lock().len(), 1);
        assert_eq!(service.pending_transactions().len(), 1);
    }

    #[test]
    fn invalid_transaction_is_not_broadcast() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));

        let tx = priced_tx(200_000_000_000);
        engine.invalid_transactions.write().insert(
            tx.hash(),
            TransactionError::InvalidNonce(Mismatch {
                expected: 1.into(),
                found: 0.into(),
            }),
        );
        service.add_transaction(tx, None, false, false);

        assert!(broadcaster.txs.lock().is_empty());
        assert!(service.pending_transactions().is_empty());
    }

    #[test]
    fn gas_price_floor_spares_casper_votes() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));

        // 1 gwei: broadcastable but not poolable.
        service.add_transaction(priced_tx(1_000_000_000), None, false, false);
        assert!(service.pending_transactions().is_empty());

        let vote = vote_tx(service.common_params());
        service.add_transaction(vote.clone(), None, false, false);
        assert_eq!(service.pending_transactions(), vec![vote]);
    }

    #[test]
    fn head_candidate_is_rebuilt_lazily() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));

        let first = service.head_candidate().unwrap();
        assert!(first.transactions.is_empty());
        service.head_candidate().unwrap();
        assert_eq!(engine.candidate_builds.load(std::sync::atomic::Ordering::SeqCst), 1);

        let tx = priced_tx(200_000_000_000);
        service.add_transaction(tx.clone(), None, false, false);
        let rebuilt = service.head_candidate().unwrap();
        assert_eq!(rebuilt.transactions, vec![tx]);
        // The pool change marked the cache dirty exactly once.
        assert_eq!(engine.candidate_builds.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn import_extends_head_subtracts_pool_and_notifies() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let recorder = Arc::new(HeadRecorder::default());
        service.add_notify(&(Arc::clone(&recorder) as Arc<dyn ChainNotify>));

        let tx = priced_tx(200_000_000_000);
        service.add_transaction(tx.clone(), None, false, false);
        assert_eq!(service.pending_transactions().len(), 1);

        let b1 = child_of(&engine.best_block(), vec![tx]);
        let b2 = child_of(&b1, vec![]);
        service.importer.queue().put(TransientBlock::from(&b1), 1);
        service.importer.queue().put(TransientBlock::from(&b2), 2);
        assert!(service.knows_block(&b1.header.hash()), "queued blocks are known");
        drain(&service);

        assert_eq!(engine.chain_info().best_block_hash, b2.header.hash());
        assert!(service.pending_transactions().is_empty(), "included transactions leave the pool");
        assert_eq!(*recorder.heads.lock(), vec![1, 2]);
        assert!(service.importer.queue().is_empty());
    }

    #[test]
    fn known_and_orphan_blocks_are_skipped() {
        let engine = Arc::new(TestChainEngine::new());
        let sentry = Arc::new(CountingSentry::default());
        let service = new_service(&engine, Arc::clone(&sentry) as Arc<dyn Sentry>);

        // Already on chain.
        let known = engine.push_block(vec![]);
        service.importer.queue().put(TransientBlock::from(&known), 1);

        // Parent unknown.
        let mut header = Header::new();
        header.set_parent_hash(H256::random());
        header.set_number(99);
        let orphan = Block {
            header,
            transactions: vec![],
        };
        service.importer.queue().put(TransientBlock::from(&orphan), 1);

        drain(&service);
        assert_eq!(engine.chain_info().best_block_number, 1);
        assert!(sentry.reasons.lock().is_empty(), "known/orphan blocks are not telemetry events");
    }

    #[test]
    fn invalid_blocks_are_reported_and_do_not_stop_the_drain() {
        let engine = Arc::new(TestChainEngine::new());
        let sentry = Arc::new(CountingSentry::default());
        let service = new_service(&engine, Arc::clone(&sentry) as Arc<dyn Sentry>);

        let bad = child_of(&engine.best_block(), vec![]);
        engine.bad_tx_blocks.write().insert(
            bad.header.hash(),
            TransactionError::NotEnoughCash(Mismatch {
                expected: 10.into(),
                found: 1.into(),
            }),
        );
        let good = child_of(&engine.best_block(), vec![]);

        service.importer.queue().put(TransientBlock::from(&bad), 1);
        service.importer.queue().put(TransientBlock::from(&good), 1);
        drain(&service);

        assert_eq!(*sentry.reasons.lock(), vec![InvalidReason::NotEnoughCash]);
        assert_eq!(engine.chain_info().best_block_hash, good.header.hash());
    }

    #[test]
    fn processing_latency_is_recorded_for_timestamped_blocks() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));

        let block = child_of(&engine.best_block(), vec![]);
        let transient = TransientBlock::new(block.rlp_bytes(), Some(Instant::now())).unwrap();
        service.importer.queue().put(transient, 1);
        drain(&service);

        assert_eq!(service.processing_times.lock().len(), 1);
    }

    #[test]
    fn add_mined_block_broadcasts_and_notifies() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(&(Arc::clone(&broadcaster) as Arc<dyn Broadcaster>));
        let recorder = Arc::new(HeadRecorder::default());
        service.add_notify(&(Arc::clone(&recorder) as Arc<dyn ChainNotify>));

        let tx = priced_tx(200_000_000_000);
        service.add_transaction(tx.clone(), None, false, false);
        let block = child_of(&engine.best_block(), vec![tx]);

        assert!(service.add_mined_block(block.clone()));
        assert!(service.pending_transactions().is_empty());
        assert_eq!(broadcaster.blocks.lock().len(), 1);
        assert_eq!(*recorder.heads.lock(), vec![1]);
    }

    #[test]
    fn queue_block_drains_in_the_background() {
        let engine = Arc::new(TestChainEngine::new());
        let service = new_service(&engine, Arc::new(NullSentry));

        let block = child_of(&engine.best_block(), vec![]);
        service.queue_block(TransientBlock::from(&block), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.chain_info().best_block_hash != block.header.hash() {
            assert!(Instant::now() < deadline, "background import did not finish");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn unsigned_sender_constant_matches_wire_shape() {
        assert_eq!(crate::transaction::UNSIGNED_SENDER, H160([0xff; 20]));
    }
}
