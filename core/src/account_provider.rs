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

use ethereum_types::{Address, H256};
use vtypes::Bytes;

use crate::transaction::{SignedTransaction, Transaction};

/// Signing error
#[derive(Debug, Clone, PartialEq)]
pub enum SignError {
    /// Account is not unlocked.
    NotUnlocked,
    /// Account does not exist.
    NotFound,
    /// Keystore error.
    Keystore(String),
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            SignError::NotUnlocked => write!(f, "Account is locked"),
            SignError::NotFound => write!(f, "Account does not exist"),
            SignError::Keystore(err) => write!(f, "{}", err),
        }
    }
}

/// A single unlocked account. The keystore and the signature scheme live
/// outside this workspace; the validator only needs these two operations.
pub trait Signer: Send + Sync {
    /// The address this signer signs for.
    fn address(&self) -> Address;

    /// Sign a transaction, recovering a sender-carrying transaction.
    fn sign_tx(&self, tx: Transaction) -> Result<SignedTransaction, SignError>;

    /// Produce a 65-byte recoverable signature over a message hash.
    fn sign_message(&self, hash: &H256) -> Result<Bytes, SignError>;
}

/// Lookup of local accounts by address.
pub trait AccountProvider: Send + Sync {
    fn find(&self, address: &Address) -> Option<Arc<dyn Signer>>;
}
