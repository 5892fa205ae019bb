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

use ethereum_types::U256;

use crate::util::Mismatch;

/// Errors concerning transaction processing. The first three variants carry
/// the telemetry tag of the same name; everything else is reported under a
/// generic transaction-error tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transaction nonce does not match the account nonce.
    InvalidNonce(Mismatch<U256>),
    /// Sender balance cannot cover value plus gas.
    NotEnoughCash(Mismatch<U256>),
    /// Supplied start gas is below the intrinsic gas of the transaction.
    OutOfGasBase(Mismatch<U256>),
    /// Signature is malformed or recovery failed.
    InvalidSignature(String),
    /// Gas price is below the local admission floor.
    InsufficientGasPrice(Mismatch<U256>),
    /// Anything the execution engine rejects without a closer kind.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;

        let msg: String = match self {
            InvalidNonce(mis) => format!("Invalid nonce: {}", mis),
            NotEnoughCash(mis) => format!("Cost exceeds sender balance. {}", mis),
            OutOfGasBase(mis) => format!("Intrinsic gas not covered. {}", mis),
            InvalidSignature(err) => format!("Invalid signature: {}", err),
            InsufficientGasPrice(mis) => format!("Insufficient gas price. {}", mis),
            Other(err) => err.clone(),
        };

        f.write_fmt(format_args!("Transaction error ({})", msg))
    }
}
