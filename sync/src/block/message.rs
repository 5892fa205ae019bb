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

use ethereum_types::{H256, U256};
use rlp::{Decodable, DecoderError, Encodable, RlpStream, Rlp};
use vcore::{Header, UnverifiedTransaction};
use vtypes::{BlockNumber, Bytes};

/// Version of the block-propagation subprotocol spoken here.
pub const PROTOCOL_VERSION: u8 = 63;
/// Cap on headers in one `BlockHeaders` response.
pub const MAX_HEADERS_TO_SEND: u64 = 192;
/// Cap on bodies in one `BlockBodies` response.
pub const MAX_BODIES_TO_SEND: usize = 128;
/// Cap on hashes accepted in one `NewBlockHashes` announcement.
pub const MAX_NEW_BLOCK_HASHES: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(u8)]
pub enum MessageID {
    Status = 0x00,
    NewBlockHashes = 0x01,
    Transactions = 0x02,
    GetBlockHeaders = 0x03,
    BlockHeaders = 0x04,
    GetBlockBodies = 0x05,
    BlockBodies = 0x06,
    NewBlock = 0x07,
}

impl Encodable for MessageID {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&(*self as u8));
    }
}

impl Decodable for MessageID {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        match rlp.as_val()? {
            0x00u8 => Ok(MessageID::Status),
            0x01 => Ok(MessageID::NewBlockHashes),
            0x02 => Ok(MessageID::Transactions),
            0x03 => Ok(MessageID::GetBlockHeaders),
            0x04 => Ok(MessageID::BlockHeaders),
            0x05 => Ok(MessageID::GetBlockBodies),
            0x06 => Ok(MessageID::BlockBodies),
            0x07 => Ok(MessageID::NewBlock),
            _ => Err(DecoderError::Custom("Unexpected message id")),
        }
    }
}

/// A `GetBlockHeaders` origin: either a concrete hash or a chain height.
/// On the wire the two are told apart by payload size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HashOrNumber {
    Hash(H256),
    Number(BlockNumber),
}

impl Encodable for HashOrNumber {
    fn rlp_append(&self, s: &mut RlpStream) {
        match self {
            HashOrNumber::Hash(hash) => s.append(hash),
            HashOrNumber::Number(number) => s.append(number),
        };
    }
}

impl Decodable for HashOrNumber {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.data()?.len() == 32 {
            Ok(HashOrNumber::Hash(rlp.as_val()?))
        } else {
            Ok(HashOrNumber::Number(rlp.as_val()?))
        }
    }
}

/// The block-propagation wire protocol.
#[derive(Debug, PartialEq)]
pub enum Message {
    Status {
        protocol_version: u8,
        network_id: u64,
        total_score: U256,
        best_hash: H256,
        genesis_hash: H256,
    },
    NewBlockHashes(Vec<(H256, BlockNumber)>),
    Transactions(Vec<UnverifiedTransaction>),
    GetBlockHeaders {
        origin: HashOrNumber,
        max_headers: u64,
        skip: u64,
        reverse: bool,
    },
    BlockHeaders(Vec<Header>),
    GetBlockBodies(Vec<H256>),
    BlockBodies(Vec<Vec<UnverifiedTransaction>>),
    /// The raw RLP of the block plus the advertised chain score.
    NewBlock {
        block: Bytes,
        total_score: U256,
    },
}

impl Message {
    pub fn id(&self) -> MessageID {
        match self {
            Message::Status {
                ..
            } => MessageID::Status,
            Message::NewBlockHashes(..) => MessageID::NewBlockHashes,
            Message::Transactions(..) => MessageID::Transactions,
            Message::GetBlockHeaders {
                ..
            } => MessageID::GetBlockHeaders,
            Message::BlockHeaders(..) => MessageID::BlockHeaders,
            Message::GetBlockBodies(..) => MessageID::GetBlockBodies,
            Message::BlockBodies(..) => MessageID::BlockBodies,
            Message::NewBlock {
                ..
            } => MessageID::NewBlock,
        }
    }
}

impl Encodable for Message {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.id());
        match self {
            Message::Status {
                protocol_version,
                network_id,
                total_score,
                best_hash,
                genesis_hash,
            } => {
                s.begin_list(5);
                s.append(protocol_version);
                s.append(network_id);
                s.append(total_score);
                s.append(best_hash);
                s.append(genesis_hash);
            }
            Message::NewBlockHashes(hashes) => {
                s.begin_list(hashes.len());
                for (hash, number) in hashes {
                    s.begin_list(2);
                    s.append(hash);
                    s.append(number);
                }
            }
            Message::Transactions(transactions) => {
                s.append_list(transactions);
            }
            Message::GetBlockHeaders {
                origin,
                max_headers,
                skip,
                reverse,
            } => {
                s.begin_list(4);
                s.append(origin);
                s.append(max_headers);
                s.append(skip);
                s.append(reverse);
            }
            Message::BlockHeaders(headers) => {
                s.append_list(headers);
            }
            Message::GetBlockBodies(hashes) => {
                s.append_list(hashes);
            }
            Message::BlockBodies(bodies) => {
                s.begin_list(bodies.len());
                for body in bodies {
                    s.append_list(body);
                }
            }
            Message::NewBlock {
                block,
                total_score,
            } => {
                s.begin_list(2);
                s.append_raw(block, 1);
                s.append(total_score);
            }
        }
    }
}

impl Decodable for Message {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen)
        }
        let id: MessageID = rlp.val_at(0)?;
        let message = rlp.at(1)?;
        match id {
            MessageID::Status => {
                if message.item_count()? != 5 {
                    return Err(DecoderError::RlpIncorrectListLen)
                }
                Ok(Message::Status {
                    protocol_version: message.val_at(0)?,
                    network_id: message.val_at(1)?,
                    total_score: message.val_at(2)?,
                    best_hash: message.val_at(3)?,
                    genesis_hash: message.val_at(4)?,
                })
            }
            MessageID::NewBlockHashes => {
                let mut hashes = Vec::with_capacity(message.item_count()?);
                for item in message.iter() {
                    hashes.push((item.val_at(0)?, item.val_at(1)?));
                }
                Ok(Message::NewBlockHashes(hashes))
            }
            MessageID::Transactions => Ok(Message::Transactions(message.as_list()?)),
            MessageID::GetBlockHeaders => {
                if message.item_count()? != 4 {
                    return Err(DecoderError::RlpIncorrectListLen)
                }
                Ok(Message::GetBlockHeaders {
                    origin: message.val_at(0)?,
                    max_headers: message.val_at(1)?,
                    skip: message.val_at(2)?,
                    reverse: message.val_at(3)?,
                })
            }
            MessageID::BlockHeaders => Ok(Message::BlockHeaders(message.as_list()?)),
            MessageID::GetBlockBodies => Ok(Message::GetBlockBodies(message.as_list()?)),
            MessageID::BlockBodies => {
                let mut bodies = Vec::with_capacity(message.item_count()?);
                for item in message.iter() {
                    bodies.push(item.as_list()?);
                }
                Ok(Message::BlockBodies(bodies))
            }
            MessageID::NewBlock => {
                if message.item_count()? != 2 {
                    return Err(DecoderError::RlpIncorrectListLen)
                }
                Ok(Message::NewBlock {
                    block: message.at(0)?.as_raw().to_vec(),
                    total_score: message.val_at(1)?,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rlp::Encodable;
    use vcore::{Action, Block, Transaction};

    use super::*;

    fn roundtrip(message: Message) {
        let encoded = message.rlp_bytes();
        let decoded: Message = Rlp::new(&encoded).as_val().unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn status_roundtrip() {
        roundtrip(Message::Status {
            protocol_version: PROTOCOL_VERSION,
            network_id: 1,
            total_score: 1_000_000.into(),
            best_hash: H256::random(),
            genesis_hash: H256::random(),
        });
    }

    #[test]
    fn get_headers_origin_forms() {
        roundtrip(Message::GetBlockHeaders {
            origin: HashOrNumber::Hash(H256::random()),
            max_headers: 128,
            skip: 7,
            reverse: true,
        });
        roundtrip(Message::GetBlockHeaders {
            origin: HashOrNumber::Number(1_920_000),
            max_headers: 1,
            skip: 0,
            reverse: false,
        });
    }

    #[test]
    fn new_block_keeps_raw_block_rlp() {
        let block = Block {
            header: Default::default(),
            transactions: vec![Transaction {
                nonce: 1.into(),
                gas_price: 2.into(),
                gas: 21_000.into(),
                action: Action::Create,
                value: 0.into(),
                data: vec![1, 2, 3],
            }
            .fake_sign(Default::default())
            .into()],
        };
        let message = Message::NewBlock {
            block: block.rlp_bytes(),
            total_score: 42.into(),
        };
        let encoded = message.rlp_bytes();
        match Rlp::new(&encoded).as_val().unwrap() {
            Message::NewBlock {
                block: raw,
                total_score,
            } => {
                assert_eq!(total_score, 42.into());
                let decoded: Block = Rlp::new(&raw).as_val().unwrap();
                assert_eq!(decoded, block);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn bodies_roundtrip() {
        let body = vec![
            Transaction {
                nonce: 0.into(),
                gas_price: 100.into(),
                gas: 21_000.into(),
                action: Action::Create,
                value: 0.into(),
                data: vec![],
            }
            .fake_sign(Default::default())
            .into(),
        ];
        roundtrip(Message::BlockBodies(vec![body, vec![]]));
        roundtrip(Message::NewBlockHashes(vec![(H256::random(), 9)]));
    }
}
