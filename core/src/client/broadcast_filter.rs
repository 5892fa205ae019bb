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

use ethereum_types::H256;
use lru_cache::LruCache;

const FILTER_CAPACITY: usize = 128;

/// Bounded recency set suppressing re-gossip of items already relayed.
/// Best effort only: evicting a busy entry costs at most one duplicate
/// broadcast, and hash collisions merely suppress one relay.
pub struct BroadcastFilter {
    items: LruCache<H256, ()>,
}

impl BroadcastFilter {
    pub fn new() -> Self {
        Self::with_capacity(FILTER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: LruCache::new(capacity),
        }
    }

    /// Records `hash` and returns true iff it was previously unknown. A hit
    /// is promoted to most-recently-used; insertion past capacity evicts
    /// the least-recently-used entry.
    pub fn observe(&mut self, hash: H256) -> bool {
        if self.items.get_mut(&hash).is_some() {
            return false
        }
        self.items.insert(hash, ());
        true
    }

    /// Membership check, also refreshing the entry.
    pub fn contains(&mut self, hash: &H256) -> bool {
        self.items.get_mut(hash).is_some()
    }
}

impl Default for BroadcastFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_exactly_once_within_window() {
        let mut filter = BroadcastFilter::new();
        let hash = H256::random();
        assert!(filter.observe(hash));
        assert!(!filter.observe(hash));
        assert!(filter.contains(&hash));
    }

    #[test]
    fn oldest_entry_is_evicted_past_capacity() {
        let mut filter = BroadcastFilter::with_capacity(3);
        let hashes: Vec<H256> = (0..4).map(|_| H256::random()).collect();
        for hash in &hashes[..3] {
            filter.observe(*hash);
        }
        filter.observe(hashes[3]);

        assert!(!filter.contains(&hashes[0]));
        assert!(filter.contains(&hashes[1]));
    }

    #[test]
    fn hit_promotes_to_most_recently_used() {
        let mut filter = BroadcastFilter::with_capacity(3);
        let hashes: Vec<H256> = (0..4).map(|_| H256::random()).collect();
        for hash in &hashes[..3] {
            filter.observe(*hash);
        }

        // Touch the oldest entry, then overflow; the second-oldest goes.
        assert!(!filter.observe(hashes[0]));
        filter.observe(hashes[3]);

        assert!(filter.contains(&hashes[0]));
        assert!(!filter.contains(&hashes[1]));
    }
}
