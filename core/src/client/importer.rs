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

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::client::queue::BlockQueue;
use crate::error::Error;
use crate::sentry::InvalidReason;
use crate::service::ChainService;

/// Owns the import queue and guarantees a single drain task at a time.
pub struct Importer {
    queue: BlockQueue,
    active: AtomicBool,
}

impl Importer {
    pub fn new(queue_size: usize) -> Self {
        Self {
            queue: BlockQueue::new(queue_size),
            active: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &BlockQueue {
        &self.queue
    }

    /// Claims the importer role. Returns true iff the caller must run (or
    /// schedule) the drain; the flag is released as the drain's last act.
    pub fn try_activate(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Drains the queue. Per-block failures are reported and skipped; the
    /// loop only ends when the queue is empty. The admission lock is held
    /// across the whole drain so transaction insertion cannot interleave
    /// with head movement.
    pub fn import_queued_blocks(&self, service: &ChainService) {
        loop {
            let mut new_heads = Vec::new();
            {
                let mut pool = service.mem_pool.lock();
                while let Some((t_block, peer)) = self.queue.peek() {
                    thread::yield_now();

                    if service.engine.has_block(&t_block.hash()) {
                        vwarn!(CLIENT, "known block {}", t_block);
                        self.queue.pop();
                        continue
                    }
                    if !service.engine.has_block(t_block.header().parent_hash()) {
                        vwarn!(
                            CLIENT,
                            "missing parent {:#x} for block {} from peer #{}",
                            t_block.header().parent_hash(),
                            t_block,
                            peer
                        );
                        self.queue.pop();
                        continue
                    }
                    let block = match t_block.to_block() {
                        Ok(block) => block,
                        Err(err) => {
                            vwarn!(CLIENT, "undecodable block {} from peer #{}: {}", t_block, peer, err);
                            service.sentry.warn_invalid(&t_block, InvalidReason::OtherBlockError);
                            self.queue.pop();
                            continue
                        }
                    };
                    if let Err(err) = service.engine.verify_block(&block) {
                        let reason = match &err {
                            Error::Transaction(tx_err) => InvalidReason::from(tx_err),
                            _ => InvalidReason::OtherBlockError,
                        };
                        vwarn!(CLIENT, "invalid block {} from peer #{}: {}", t_block, peer, err);
                        service.sentry.warn_invalid(&t_block, reason);
                        self.queue.pop();
                        continue
                    }

                    let head_before = service.engine.chain_info().best_block_hash;
                    match service.engine.add_block(&block) {
                        Ok(true) => {
                            if service.engine.chain_info().best_block_hash != head_before {
                                pool.remove_included(&block.transactions);
                                if service.is_authoring() {
                                    // Subtraction is idempotent.
                                    pool.remove_included(&block.transactions);
                                }
                                service.mark_candidate_dirty();
                                vinfo!(
                                    CLIENT,
                                    "added block {} with {} transactions, gas used {}",
                                    t_block,
                                    block.transactions.len(),
                                    block.header.gas_used()
                                );
                                new_heads.push(block);
                            } else {
                                vdebug!(CLIENT, "added non-head block {}", t_block);
                            }
                            if let Some(received_at) = t_block.received_at() {
                                service.record_processing_time(received_at.elapsed());
                            }
                        }
                        Ok(false) => vwarn!(CLIENT, "could not add block {}", t_block),
                        Err(err) => vwarn!(CLIENT, "block import failed for {}: {}", t_block, err),
                    }

                    // Popped only now: knows_block sees in-flight blocks.
                    self.queue.pop();
                }
            }
            self.deactivate();

            // Listeners run outside the admission lock so they can admit
            // transactions of their own.
            for block in &new_heads {
                service.notify_new_head(block);
            }

            if self.queue.is_empty() || !self.try_activate() {
                break
            }
        }
    }
}
