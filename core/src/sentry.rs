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

use vtypes::transaction::Error as TransactionError;

use crate::block::TransientBlock;

/// Tag attached to an invalid-block report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    InvalidNonce,
    NotEnoughCash,
    OutOfGasBase,
    OtherTransactionError,
    OtherBlockError,
}

impl InvalidReason {
    pub fn tag(&self) -> &'static str {
        match self {
            InvalidReason::InvalidNonce => "InvalidNonce",
            InvalidReason::NotEnoughCash => "NotEnoughCash",
            InvalidReason::OutOfGasBase => "OutOfGasBase",
            InvalidReason::OtherTransactionError => "other_transaction_error",
            InvalidReason::OtherBlockError => "other_block_error",
        }
    }
}

impl From<&TransactionError> for InvalidReason {
    fn from(err: &TransactionError) -> Self {
        match err {
            TransactionError::InvalidNonce(_) => InvalidReason::InvalidNonce,
            TransactionError::NotEnoughCash(_) => InvalidReason::NotEnoughCash,
            TransactionError::OutOfGasBase(_) => InvalidReason::OutOfGasBase,
            _ => InvalidReason::OtherTransactionError,
        }
    }
}

/// Sink for reports about invalid blocks received from peers.
pub trait Sentry: Send + Sync {
    fn warn_invalid(&self, block: &TransientBlock, reason: InvalidReason);
}

/// Discards all reports.
pub struct NullSentry;

impl Sentry for NullSentry {
    fn warn_invalid(&self, _block: &TransientBlock, _reason: InvalidReason) {}
}
