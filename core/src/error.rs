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

use std::fmt;

use ethereum_types::H256;
use vtypes::transaction::Error as TransactionError;
use vtypes::util::Mismatch;

use crate::account_provider::SignError;

/// Import to the block queue result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImportError {
    /// Already in the block chain.
    AlreadyInChain,
    /// Already in the block queue.
    AlreadyQueued,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ImportError::AlreadyInChain => "block already in chain",
            ImportError::AlreadyQueued => "block already in the block queue",
        };

        f.write_fmt(format_args!("Block import error ({})", msg))
    }
}

/// Errors concerning block processing.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockError {
    /// Parent given is unknown.
    UnknownParent(H256),
    /// Proof-of-work aspect of the seal is invalid.
    InvalidProofOfWork,
    /// The execution engine rejected the block body.
    VerificationFailed(String),
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::BlockError::*;

        let msg: String = match self {
            UnknownParent(hash) => format!("Unknown parent: {}", hash),
            InvalidProofOfWork => "Invalid proof of work.".into(),
            VerificationFailed(reason) => format!("Verification failed: {}", reason),
        };

        f.write_fmt(format_args!("Block error ({})", msg))
    }
}

/// Violations of the one-way stamps binding a data directory to its first
/// configuration. These are fatal at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupError {
    /// The directory was initialized with the other retention mode.
    PruningModeChanged(Mismatch<String>),
    /// The directory belongs to another network.
    NetworkIdMismatch(Mismatch<String>),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::StartupError::*;

        let msg = match self {
            PruningModeChanged(mis) => format!(
                "The database was initialized as \"{}\" and can not be reopened as \"{}\". \
                 Please choose a different data directory.",
                mis.expected, mis.found
            ),
            NetworkIdMismatch(mis) => format!(
                "The database was initialized with network id {} and can not be used when \
                 connecting to network id {}. Please choose a different data directory.",
                mis.expected, mis.found
            ),
        };

        f.write_fmt(format_args!("Startup error ({})", msg))
    }
}

/// Failure of a read-only contract call against an ephemeral state.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// The contract reverted or threw.
    Reverted,
    /// The call could not be executed at all.
    Failed(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallError::Reverted => f.write_str("Contract call reverted"),
            CallError::Failed(reason) => f.write_fmt(format_args!("Contract call failed ({})", reason)),
        }
    }
}

/// General error type which should be capable of representing all errors in
/// the client core.
#[derive(Debug)]
pub enum Error {
    /// Error concerning block processing.
    Block(BlockError),
    /// Error raised by the key-value store.
    Database(String),
    /// Error raised by the external execution engine.
    Engine(String),
    /// Error concerning block import.
    Import(ImportError),
    /// RLP decoding error.
    Rlp(rlp::DecoderError),
    /// Account signing error.
    Sign(SignError),
    /// One-way startup stamp violation; fatal.
    Startup(StartupError),
    /// Error concerning transaction processing.
    Transaction(TransactionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Block(err) => err.fmt(f),
            Error::Database(err) => f.write_fmt(format_args!("Database error ({})", err)),
            Error::Engine(err) => f.write_fmt(format_args!("Engine error ({})", err)),
            Error::Import(err) => err.fmt(f),
            Error::Rlp(err) => err.fmt(f),
            Error::Sign(err) => err.fmt(f),
            Error::Startup(err) => err.fmt(f),
            Error::Transaction(err) => err.fmt(f),
        }
    }
}

impl From<BlockError> for Error {
    fn from(err: BlockError) -> Error {
        Error::Block(err)
    }
}

impl From<ImportError> for Error {
    fn from(err: ImportError) -> Error {
        Error::Import(err)
    }
}

impl From<rlp::DecoderError> for Error {
    fn from(err: rlp::DecoderError) -> Error {
        Error::Rlp(err)
    }
}

impl From<SignError> for Error {
    fn from(err: SignError) -> Error {
        Error::Sign(err)
    }
}

impl From<StartupError> for Error {
    fn from(err: StartupError) -> Error {
        Error::Startup(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Error {
        Error::Transaction(err)
    }
}
