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

use ethereum_types::H256;
use parking_lot::{Condvar, Mutex};
use vnetwork::PeerId;

use crate::block::TransientBlock;

/// Bounded FIFO feeding the import pipeline. Producers block while the
/// queue is full; the importer peeks before popping so that in-flight
/// blocks still count as known.
pub struct BlockQueue {
    deque: Mutex<VecDeque<(TransientBlock, PeerId)>>,
    slot_freed: Condvar,
    capacity: usize,
}

impl BlockQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            deque: Mutex::new(VecDeque::with_capacity(capacity)),
            slot_freed: Condvar::new(),
            capacity,
        }
    }

    /// Appends a block, blocking while the queue is at capacity.
    pub fn put(&self, block: TransientBlock, peer: PeerId) {
        let mut deque = self.deque.lock();
        while deque.len() >= self.capacity {
            self.slot_freed.wait(&mut deque);
        }
        deque.push_back((block, peer));
    }

    /// The front item, left in place.
    pub fn peek(&self) -> Option<(TransientBlock, PeerId)> {
        self.deque.lock().front().cloned()
    }

    /// Removes the front item and wakes one blocked producer.
    pub fn pop(&self) -> Option<(TransientBlock, PeerId)> {
        let item = self.deque.lock().pop_front();
        if item.is_some() {
            self.slot_freed.notify_one();
        }
        item
    }

    /// A block with this hash is queued or being processed.
    pub fn contains(&self, hash: &H256) -> bool {
        self.deque.lock().iter().any(|(block, _)| block.hash() == *hash)
    }

    pub fn len(&self) -> usize {
        self.deque.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::header::Header;

    fn block(number: u64) -> TransientBlock {
        let mut header = Header::new();
        header.set_number(number);
        let block = crate::block::Block {
            header,
            transactions: vec![],
        };
        TransientBlock::from(&block)
    }

    #[test]
    fn fifo_and_membership() {
        let queue = BlockQueue::new(8);
        let first = block(1);
        let second = block(2);
        queue.put(first.clone(), 0);
        queue.put(second.clone(), 1);

        assert!(queue.contains(&first.hash()));
        assert_eq!(queue.peek().unwrap().0.hash(), first.hash());
        // Peeking does not remove.
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().0.hash(), first.hash());
        assert_eq!(queue.pop().unwrap().0.hash(), second.hash());
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_blocks_the_producer() {
        let queue = Arc::new(BlockQueue::new(2));
        queue.put(block(1), 0);
        queue.put(block(2), 0);

        let parked = Arc::new(AtomicBool::new(true));
        let handle = {
            let queue = Arc::clone(&queue);
            let parked = Arc::clone(&parked);
            thread::spawn(move || {
                queue.put(block(3), 0);
                parked.store(false, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(parked.load(Ordering::SeqCst), "producer should be blocked on a full queue");

        queue.pop();
        handle.join().unwrap();
        assert!(!parked.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 2);
    }
}
