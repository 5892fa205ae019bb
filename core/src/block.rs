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
use std::time::Instant;

use ethereum_types::H256;
use rlp::{Decodable, DecoderError, Encodable, RlpStream, Rlp};
use vtypes::Bytes;

use crate::header::Header;
use crate::transaction::UnverifiedTransaction;

/// A fully decoded block: header plus transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The header of this block.
    pub header: Header,
    /// The transactions in this block.
    pub transactions: Vec<UnverifiedTransaction>,
}

impl Block {
    /// Get the RLP of this block.
    pub fn rlp_bytes(&self) -> Bytes {
        let mut s = RlpStream::new_list(2);
        s.append(&self.header);
        s.append_list(&self.transactions);
        s.out()
    }
}

impl Encodable for Block {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.header);
        s.append_list(&self.transactions);
    }
}

impl Decodable for Block {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen)
        }
        Ok(Block {
            header: rlp.val_at(0)?,
            transactions: rlp.at(1)?.as_list()?,
        })
    }
}

/// A block as it travels through the import queue: header decoded, body
/// still raw. Keeping the body raw defers transaction deserialization to
/// the importer, which reports failures through the telemetry sink instead
/// of dropping the message silently.
#[derive(Debug, Clone)]
pub struct TransientBlock {
    header: Header,
    bytes: Bytes,
    received_at: Option<Instant>,
}

impl TransientBlock {
    /// Wrap the raw RLP of a block. Fails if the header cannot be decoded;
    /// body errors surface later in `to_block`.
    pub fn new(bytes: Bytes, received_at: Option<Instant>) -> Result<Self, DecoderError> {
        let header = Rlp::new(&bytes).at(0)?.as_val()?;
        Ok(TransientBlock {
            header,
            bytes,
            received_at,
        })
    }

    /// Hash of the block.
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// The decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// When the enclosing `NewBlock` message was received, if it came from
    /// the wire.
    pub fn received_at(&self) -> Option<Instant> {
        self.received_at
    }

    /// Deserialize the full block.
    pub fn to_block(&self) -> Result<Block, DecoderError> {
        Rlp::new(&self.bytes).as_val()
    }
}

impl From<&Block> for TransientBlock {
    fn from(block: &Block) -> Self {
        TransientBlock {
            header: block.header.clone(),
            bytes: block.rlp_bytes(),
            received_at: None,
        }
    }
}

impl fmt::Display for TransientBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!("#{} ({:#x})", self.header.number(), self.header.hash()))
    }
}
