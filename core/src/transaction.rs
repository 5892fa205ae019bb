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

use std::ops::Deref;

use ethereum_types::{Address, H160, H256, U256};
use keccak_hash::keccak;
use rlp::{Decodable, DecoderError, Encodable, RlpStream, Rlp};
use vtypes::Bytes;

/// Fake sender carried by unsigned Casper vote transactions. Votes prove
/// themselves through the validation-code contract, not through a signature.
pub const UNSIGNED_SENDER: Address = H160([0xff; 20]);

/// Four-byte ABI selector of the Casper `vote(bytes)` entry point.
pub fn vote_selector() -> [u8; 4] {
    let hash = keccak("vote(bytes)");
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Address of a contract created by `sender` at `nonce`.
pub fn contract_address(sender: &Address, nonce: &U256) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(nonce);
    From::from(keccak(stream.as_raw()))
}

/// Transaction destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a contract.
    Create,
    /// Call a contract or transfer to an account.
    Call(Address),
}

/// An unsigned transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Nonce.
    pub nonce: U256,
    /// Gas price.
    pub gas_price: U256,
    /// Gas paid up front for transaction execution.
    pub gas: U256,
    /// Action.
    pub action: Action,
    /// Transferred value.
    pub value: U256,
    /// Transaction data.
    pub data: Bytes,
}

impl Transaction {
    fn stream_rlp(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas);
        match self.action {
            Action::Create => s.append_empty_data(),
            Action::Call(ref to) => s.append(to),
        };
        s.append(&self.value);
        s.append(&self.data);
    }

    /// Attach a pretend signature recovering to `sender`. Only for tests and
    /// engine doubles; the signature itself is garbage.
    pub fn fake_sign(self, sender: Address) -> SignedTransaction {
        SignedTransaction {
            transaction: UnverifiedTransaction {
                unsigned: self,
                v: 27,
                r: U256::one(),
                s: U256::one(),
                hash: H256::zero(),
            }
            .compute_hash(),
            sender,
        }
    }

    /// Wrap as an unsigned transaction with the null sender. This is the
    /// shape Casper vote transactions travel in.
    pub fn null_sign(self) -> SignedTransaction {
        SignedTransaction {
            transaction: UnverifiedTransaction {
                unsigned: self,
                v: 0,
                r: U256::zero(),
                s: U256::zero(),
                hash: H256::zero(),
            }
            .compute_hash(),
            sender: UNSIGNED_SENDER,
        }
    }
}

/// A transaction as received from the wire: body plus signature words,
/// sender not yet recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedTransaction {
    /// Plain transaction.
    unsigned: Transaction,
    /// The V field of the signature.
    v: u64,
    /// The R field of the signature.
    r: U256,
    /// The S field of the signature.
    s: U256,
    /// Memoized hash of the RLP representation.
    hash: H256,
}

impl Deref for UnverifiedTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.unsigned
    }
}

impl UnverifiedTransaction {
    fn compute_hash(mut self) -> UnverifiedTransaction {
        let hash = keccak(&*self.rlp_bytes());
        self.hash = hash;
        self
    }

    /// Get the hash of this transaction (keccak of the RLP).
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Signature words are all zero; the sender is the null sender.
    pub fn is_unsigned(&self) -> bool {
        self.r.is_zero() && self.s.is_zero()
    }

    /// Recognizes an unsigned Casper vote: destined for the finality
    /// contract, carrying the `vote(bytes)` selector, null sender.
    pub fn is_casper_vote(&self, casper_address: &Address) -> bool {
        self.action == Action::Call(*casper_address)
            && self.data.len() >= 4
            && self.data[0..4] == vote_selector()
            && self.is_unsigned()
    }
}

impl Encodable for UnverifiedTransaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        self.unsigned.stream_rlp(s);
        s.append(&self.v);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for UnverifiedTransaction {
    fn decode(d: &Rlp) -> Result<Self, DecoderError> {
        if d.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen)
        }
        let hash = keccak(d.as_raw());
        Ok(UnverifiedTransaction {
            unsigned: Transaction {
                nonce: d.val_at(0)?,
                gas_price: d.val_at(1)?,
                gas: d.val_at(2)?,
                action: {
                    let to = d.at(3)?;
                    if to.is_empty() {
                        Action::Create
                    } else {
                        Action::Call(to.as_val()?)
                    }
                },
                value: d.val_at(4)?,
                data: d.val_at(5)?,
            },
            v: d.val_at(6)?,
            r: d.val_at(7)?,
            s: d.val_at(8)?,
            hash,
        })
    }
}

/// A transaction with a known sender. The sender comes either from signing
/// (local transactions) or from signature recovery inside the execution
/// engine (remote transactions); this module never recovers it itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: UnverifiedTransaction,
    sender: Address,
}

impl Deref for SignedTransaction {
    type Target = UnverifiedTransaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl From<SignedTransaction> for UnverifiedTransaction {
    fn from(tx: SignedTransaction) -> Self {
        tx.transaction
    }
}

impl SignedTransaction {
    /// Pair an already-verified transaction with its recovered sender.
    pub fn new(transaction: UnverifiedTransaction, sender: Address) -> Self {
        Self {
            transaction,
            sender,
        }
    }

    /// Returns the transaction sender.
    pub fn sender(&self) -> &Address {
        &self.sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_contract_address() {
        let sender: Address = "6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        let expected: Address = "cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d".parse().unwrap();
        assert_eq!(contract_address(&sender, &U256::zero()), expected);
    }

    #[test]
    fn nonce_changes_contract_address() {
        let sender = Address::random();
        assert_ne!(contract_address(&sender, &U256::zero()), contract_address(&sender, &U256::one()));
    }

    #[test]
    fn unverified_roundtrip() {
        let tx = Transaction {
            nonce: 3.into(),
            gas_price: 110_000_000_000u64.into(),
            gas: 21_000.into(),
            action: Action::Call(Address::random()),
            value: 5.into(),
            data: b"payload".to_vec(),
        }
        .fake_sign(Address::random());

        let encoded = tx.rlp_bytes();
        let decoded: UnverifiedTransaction = Rlp::new(&encoded).as_val().unwrap();
        assert_eq!(*tx, decoded);
        assert_eq!(tx.hash(), decoded.hash());
    }

    #[test]
    fn vote_recognition() {
        let casper = Address::random();
        let mut data = vote_selector().to_vec();
        data.extend_from_slice(b"vote payload");

        let vote = Transaction {
            nonce: U256::zero(),
            gas_price: U256::zero(),
            gas: 1_000_000.into(),
            action: Action::Call(casper),
            value: U256::zero(),
            data,
        }
        .null_sign();

        assert!(vote.is_unsigned());
        assert_eq!(*vote.sender(), UNSIGNED_SENDER);
        assert!(vote.is_casper_vote(&casper));
        assert!(!vote.is_casper_vote(&Address::random()));

        let signed = Transaction {
            nonce: U256::zero(),
            gas_price: U256::zero(),
            gas: 1_000_000.into(),
            action: Action::Call(casper),
            value: U256::zero(),
            data: vote_selector().to_vec(),
        }
        .fake_sign(Address::random());
        assert!(!signed.is_casper_vote(&casper));
    }
}
