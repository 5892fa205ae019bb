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

use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use parking_lot::RwLock;
use rlp::{Decodable, DecoderError, Encodable, RlpStream, Rlp};
use time::get_time;
use vtypes::{BlockNumber, Bytes};

/// Semantic boolean for when a seal is included.
pub enum Seal {
    /// The seal fields are included.
    With,
    /// The seal fields are not included.
    Without,
}

/// A block header.
#[derive(Debug)]
pub struct Header {
    /// Parent hash.
    parent_hash: H256,
    /// Block timestamp.
    timestamp: u64,
    /// Block number.
    number: BlockNumber,
    /// Block author (coinbase).
    author: Address,

    /// Block extra data.
    extra_data: Bytes,

    /// Transactions root.
    transactions_root: H256,
    /// State root.
    state_root: H256,

    /// Proof-of-work score of the block.
    score: U256,
    /// Gas limit of the block.
    gas_limit: U256,
    /// Gas spent by the block's transactions.
    gas_used: U256,
    /// Vector of post-RLP-encoded seal fields.
    seal: Vec<Bytes>,

    /// Memoized hash of the RLP representation including the seal fields.
    hash: RwLock<Option<H256>>,
}

impl Clone for Header {
    fn clone(&self) -> Self {
        Header {
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            number: self.number,
            author: self.author,
            extra_data: self.extra_data.clone(),
            transactions_root: self.transactions_root,
            state_root: self.state_root,
            score: self.score,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            seal: self.seal.clone(),
            hash: RwLock::new(*self.hash.read()),
        }
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.parent_hash == other.parent_hash
            && self.timestamp == other.timestamp
            && self.number == other.number
            && self.author == other.author
            && self.extra_data == other.extra_data
            && self.transactions_root == other.transactions_root
            && self.state_root == other.state_root
            && self.score == other.score
            && self.gas_limit == other.gas_limit
            && self.gas_used == other.gas_used
            && self.seal == other.seal
            && *self.hash.read() == *other.hash.read()
    }
}

impl Default for Header {
    fn default() -> Self {
        Header {
            parent_hash: H256::default(),
            timestamp: 0,
            number: 0,
            author: Address::default(),
            extra_data: vec![],

            transactions_root: H256::default(),
            state_root: H256::default(),

            score: U256::default(),
            gas_limit: U256::default(),
            gas_used: U256::default(),
            seal: vec![],
            hash: RwLock::new(None),
        }
    }
}

impl Header {
    /// Create a new, default-valued, header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parent_hash field of the header.
    pub fn parent_hash(&self) -> &H256 {
        &self.parent_hash
    }
    /// Get the timestamp field of the header.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
    /// Get the number field of the header.
    pub fn number(&self) -> BlockNumber {
        self.number
    }
    /// Get the author field of the header.
    pub fn author(&self) -> &Address {
        &self.author
    }
    /// Get the extra data field of the header.
    pub fn extra_data(&self) -> &Bytes {
        &self.extra_data
    }
    /// Get the state root field of the header.
    pub fn state_root(&self) -> &H256 {
        &self.state_root
    }
    /// Get the transactions root field of the header.
    pub fn transactions_root(&self) -> &H256 {
        &self.transactions_root
    }
    /// Get the score field of the header.
    pub fn score(&self) -> &U256 {
        &self.score
    }
    /// Get the gas limit field of the header.
    pub fn gas_limit(&self) -> &U256 {
        &self.gas_limit
    }
    /// Get the gas used field of the header.
    pub fn gas_used(&self) -> &U256 {
        &self.gas_used
    }
    /// Get the seal field of the header.
    pub fn seal(&self) -> &[Bytes] {
        &self.seal
    }

    /// Set the parent hash field of the header.
    pub fn set_parent_hash(&mut self, a: H256) {
        self.parent_hash = a;
        self.note_dirty();
    }
    /// Set the timestamp field of the header.
    pub fn set_timestamp(&mut self, a: u64) {
        self.timestamp = a;
        self.note_dirty();
    }
    /// Set the timestamp field of the header to the current time.
    pub fn set_timestamp_now(&mut self, but_later_than: u64) {
        self.timestamp = cmp::max(get_time().sec as u64, but_later_than + 1);
        self.note_dirty();
    }
    /// Set the number field of the header.
    pub fn set_number(&mut self, a: BlockNumber) {
        self.number = a;
        self.note_dirty();
    }
    /// Set the author field of the header.
    pub fn set_author(&mut self, a: Address) {
        self.author = a;
        self.note_dirty();
    }
    /// Set the extra data field of the header.
    pub fn set_extra_data(&mut self, a: Bytes) {
        self.extra_data = a;
        self.note_dirty();
    }
    /// Set the state root field of the header.
    pub fn set_state_root(&mut self, a: H256) {
        self.state_root = a;
        self.note_dirty();
    }
    /// Set the transactions root field of the header.
    pub fn set_transactions_root(&mut self, a: H256) {
        self.transactions_root = a;
        self.note_dirty();
    }
    /// Set the score field of the header.
    pub fn set_score(&mut self, a: U256) {
        self.score = a;
        self.note_dirty();
    }
    /// Set the gas limit field of the header.
    pub fn set_gas_limit(&mut self, a: U256) {
        self.gas_limit = a;
        self.note_dirty();
    }
    /// Set the gas used field of the header.
    pub fn set_gas_used(&mut self, a: U256) {
        self.gas_used = a;
        self.note_dirty();
    }
    /// Set the seal field of the header.
    pub fn set_seal(&mut self, a: Vec<Bytes>) {
        self.seal = a;
        self.note_dirty();
    }

    /// Get the hash of this header (keccak of the RLP with seal).
    pub fn hash(&self) -> H256 {
        let mut hash = self.hash.write();
        match &mut *hash {
            &mut Some(ref h) => *h,
            hash @ &mut None => {
                let h = keccak(&self.rlp(Seal::With));
                *hash = Some(h);
                h
            }
        }
    }

    /// Place this header into an RLP stream `s`, optionally `with_seal`.
    pub fn stream_rlp(&self, s: &mut RlpStream, with_seal: Seal) {
        let seal_fields = match with_seal {
            Seal::With => self.seal.len(),
            Seal::Without => 0,
        };
        s.begin_list(10 + seal_fields);
        s.append(&self.parent_hash);
        s.append(&self.author);
        s.append(&self.state_root);
        s.append(&self.transactions_root);
        s.append(&self.score);
        s.append(&self.number);
        s.append(&self.gas_limit);
        s.append(&self.gas_used);
        s.append(&self.timestamp);
        s.append(&self.extra_data);
        if let Seal::With = with_seal {
            for b in &self.seal {
                s.append_raw(b, 1);
            }
        }
    }

    /// Get the RLP of this header, optionally `with_seal`.
    pub fn rlp(&self, with_seal: Seal) -> Bytes {
        let mut s = RlpStream::new();
        self.stream_rlp(&mut s, with_seal);
        s.out()
    }

    /// Note that some fields have changed. Resets the memoized hash.
    pub fn note_dirty(&self) {
        *self.hash.write() = None;
    }
}

impl Decodable for Header {
    fn decode(r: &Rlp) -> Result<Self, DecoderError> {
        let mut header = Header {
            parent_hash: r.val_at(0)?,
            author: r.val_at(1)?,
            state_root: r.val_at(2)?,
            transactions_root: r.val_at(3)?,
            score: r.val_at(4)?,
            number: r.val_at(5)?,
            gas_limit: r.val_at(6)?,
            gas_used: r.val_at(7)?,
            timestamp: cmp::min(r.val_at::<U256>(8)?, u64::max_value().into()).as_u64(),
            extra_data: r.val_at(9)?,
            seal: vec![],
            hash: RwLock::new(Some(keccak(r.as_raw()))),
        };

        for i in 10..r.item_count()? {
            header.seal.push(r.at(i)?.as_raw().to_vec())
        }

        Ok(header)
    }
}

impl Encodable for Header {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.stream_rlp(s, Seal::With);
    }
}

#[cfg(test)]
mod tests {
    use rlp;

    use super::*;

    #[test]
    fn roundtrip_without_seal() {
        let mut header = Header::new();
        header.set_parent_hash(H256::random());
        header.set_number(42);
        header.set_score(1_000_000.into());
        header.set_timestamp(1_500_000_000);
        header.set_extra_data(b"dao-hard-fork".to_vec());

        let encoded = header.rlp(Seal::With);
        let decoded: Header = Rlp::new(&encoded).as_val().unwrap();
        assert_eq!(header, decoded);
        assert_eq!(header.hash(), decoded.hash());
    }

    #[test]
    fn hash_changes_with_fields() {
        let mut header = Header::new();
        let hash_before = header.hash();
        header.set_number(1);
        assert_ne!(hash_before, header.hash());
    }

    #[test]
    fn seal_fields_survive_roundtrip() {
        let mut header = Header::new();
        header.set_seal(vec![rlp::encode(&H256::random()).to_vec(), rlp::encode(&10u64).to_vec()]);

        let encoded = header.rlp(Seal::With);
        let decoded: Header = Rlp::new(&encoded).as_val().unwrap();
        assert_eq!(header.seal(), decoded.seal());
    }
}
