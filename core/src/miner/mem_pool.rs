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

use std::collections::{BTreeMap, HashMap, HashSet};

use ethereum_types::{Address, H256, U256};

use crate::transaction::{SignedTransaction, UnverifiedTransaction, UNSIGNED_SENDER};

#[derive(Clone, Debug)]
struct PoolEntry {
    tx: SignedTransaction,
    insertion_id: u64,
}

/// The pending transaction pool. Transactions of one sender are kept in
/// nonce order; across senders the pool orders by gas price, earliest
/// insertion breaking ties. Unsigned Casper votes all share the null sender
/// and a zero nonce, so they bypass the per-sender rows and are kept in
/// arrival order.
#[derive(Clone, Debug, Default)]
pub struct MemPool {
    rows: HashMap<Address, BTreeMap<U256, PoolEntry>>,
    votes: Vec<PoolEntry>,
    hashes: HashSet<H256>,
    next_insertion_id: u64,
}

impl MemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn contains(&self, hash: &H256) -> bool {
        self.hashes.contains(hash)
    }

    /// Inserts a transaction. Re-adding a pending transaction is a no-op; a
    /// same-nonce replacement must raise the gas price unless `force` is
    /// set. Returns true iff the pool changed.
    pub fn add(&mut self, tx: SignedTransaction, force: bool) -> bool {
        if self.hashes.contains(&tx.hash()) {
            return false
        }

        let insertion_id = self.next_insertion_id;
        let entry = PoolEntry {
            tx,
            insertion_id,
        };

        if *entry.tx.sender() == UNSIGNED_SENDER {
            self.hashes.insert(entry.tx.hash());
            self.votes.push(entry);
            self.next_insertion_id += 1;
            return true
        }

        let row = self.rows.entry(*entry.tx.sender()).or_insert_with(BTreeMap::new);
        if let Some(old) = row.get(&entry.tx.nonce) {
            if !force && old.tx.gas_price >= entry.tx.gas_price {
                return false
            }
            self.hashes.remove(&old.tx.hash());
        }
        self.hashes.insert(entry.tx.hash());
        row.insert(entry.tx.nonce, entry);
        self.next_insertion_id += 1;
        true
    }

    /// Drops every transaction included in a block. Subtracting transactions
    /// that are not pending is a no-op, so the operation is idempotent.
    pub fn remove_included(&mut self, txs: &[UnverifiedTransaction]) {
        let included: HashSet<H256> = txs.iter().map(UnverifiedTransaction::hash).collect();
        if included.is_empty() {
            return
        }

        for row in self.rows.values_mut() {
            let gone: Vec<U256> =
                row.iter().filter(|(_, entry)| included.contains(&entry.tx.hash())).map(|(nonce, _)| *nonce).collect();
            for nonce in gone {
                row.remove(&nonce);
            }
        }
        self.rows.retain(|_, row| !row.is_empty());
        self.votes.retain(|entry| !included.contains(&entry.tx.hash()));
        for hash in included {
            self.hashes.remove(&hash);
        }
    }

    /// All pending transactions, per-sender nonce order preserved, senders
    /// merged by gas price.
    pub fn pending(&self) -> Vec<SignedTransaction> {
        let mut queues: Vec<Vec<&PoolEntry>> = self
            .rows
            .values()
            .map(|row| row.values().rev().collect()) // reversed; pop() yields lowest nonce first
            .collect();
        if !self.votes.is_empty() {
            queues.push(self.votes.iter().rev().collect());
        }

        let mut pending = Vec::with_capacity(self.len());
        loop {
            let best = queues
                .iter()
                .enumerate()
                .filter_map(|(index, queue)| queue.last().map(|entry| (index, entry)))
                .max_by(|(_, a), (_, b)| {
                    a.tx.gas_price.cmp(&b.tx.gas_price).then(b.insertion_id.cmp(&a.insertion_id))
                })
                .map(|(index, _)| index);
            match best {
                Some(index) => {
                    let entry = queues[index].pop().expect("queue with a last element cannot be empty");
                    pending.push(entry.tx.clone());
                }
                None => break,
            }
        }
        pending
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.votes.clear();
        self.hashes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Action, Transaction};

    fn tx(sender: Address, nonce: u64, gas_price: u64) -> SignedTransaction {
        Transaction {
            nonce: nonce.into(),
            gas_price: gas_price.into(),
            gas: 21_000.into(),
            action: Action::Call(Address::random()),
            value: nonce.into(),
            data: vec![],
        }
        .fake_sign(sender)
    }

    fn vote(payload: u8) -> SignedTransaction {
        Transaction {
            nonce: 0.into(),
            gas_price: 0.into(),
            gas: 1_000_000.into(),
            action: Action::Call(Address::random()),
            value: 0.into(),
            data: vec![payload],
        }
        .null_sign()
    }

    #[test]
    fn sender_nonces_stay_ordered() {
        let sender = Address::random();
        let mut pool = MemPool::new();
        // The lower nonce pays less, yet must come out first.
        assert!(pool.add(tx(sender, 1, 500), false));
        assert!(pool.add(tx(sender, 0, 100), false));

        let nonces: Vec<U256> = pool.pending().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![U256::zero(), U256::one()]);
    }

    #[test]
    fn senders_merge_by_gas_price() {
        let cheap = Address::random();
        let rich = Address::random();
        let mut pool = MemPool::new();
        pool.add(tx(cheap, 0, 100), false);
        pool.add(tx(rich, 0, 900), false);
        pool.add(tx(rich, 1, 900), false);

        let senders: Vec<Address> = pool.pending().iter().map(|tx| *tx.sender()).collect();
        assert_eq!(senders, vec![rich, rich, cheap]);
    }

    #[test]
    fn re_adding_is_idempotent() {
        let sender = Address::random();
        let transaction = tx(sender, 0, 100);
        let mut pool = MemPool::new();
        assert!(pool.add(transaction.clone(), false));
        assert!(!pool.add(transaction, false));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn same_nonce_needs_higher_price_or_force() {
        let sender = Address::random();
        let mut pool = MemPool::new();
        pool.add(tx(sender, 0, 500), false);

        assert!(!pool.add(tx(sender, 0, 400), false));
        assert_eq!(pool.pending()[0].gas_price, 500.into());

        assert!(pool.add(tx(sender, 0, 600), false));
        assert_eq!(pool.pending()[0].gas_price, 600.into());
        assert_eq!(pool.len(), 1);

        assert!(pool.add(tx(sender, 0, 100), true));
        assert_eq!(pool.pending()[0].gas_price, 100.into());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn votes_share_the_null_sender() {
        let mut pool = MemPool::new();
        assert!(pool.add(vote(1), false));
        assert!(pool.add(vote(2), false));
        assert_eq!(pool.len(), 2);

        let data: Vec<u8> = pool.pending().iter().map(|tx| tx.data[0]).collect();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn included_transactions_are_subtracted_idempotently() {
        let sender = Address::random();
        let keep = tx(sender, 2, 100);
        let mined = vec![tx(sender, 0, 100), tx(sender, 1, 100)];
        let mut pool = MemPool::new();
        for transaction in mined.iter().chain(Some(&keep)) {
            pool.add(transaction.clone(), false);
        }

        let mined: Vec<UnverifiedTransaction> = mined.into_iter().map(Into::into).collect();
        pool.remove_included(&mined);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&keep.hash()));

        // Subtracting the same block again changes nothing.
        pool.remove_included(&mined);
        assert_eq!(pool.len(), 1);
    }
}
