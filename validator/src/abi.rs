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

//! Just enough contract ABI to call the finality contract: a four-byte
//! selector followed by 32-byte head words, dynamic bytes in the tail.

use ethereum_types::{Address, U256};
use keccak_hash::keccak;
use vtypes::Bytes;

const WORD: usize = 32;

/// A call argument.
pub enum Token {
    Address(Address),
    Uint(U256),
    Bytes(Bytes),
}

/// Encodes `signature(args…)` call data.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let selector = keccak(signature);
    let mut call = selector[0..4].to_vec();
    call.extend(encode_tokens(tokens));
    call
}

/// First word of a return value as an unsigned integer.
pub fn decode_u256(ret: &[u8]) -> Option<U256> {
    if ret.len() < WORD {
        return None
    }
    Some(U256::from_big_endian(&ret[0..WORD]))
}

fn encode_tokens(tokens: &[Token]) -> Bytes {
    let head_len = WORD * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => {
                head.extend_from_slice(&[0u8; 12]);
                head.extend_from_slice(address.as_ref());
            }
            Token::Uint(value) => {
                head.extend_from_slice(&uint_word(value));
            }
            Token::Bytes(bytes) => {
                head.extend_from_slice(&uint_word(&U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(&U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend(tail);
    head
}

fn uint_word(value: &U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vector() {
        // The canonical ERC-20 transfer selector.
        let call = encode_call("transfer(address,uint256)", &[]);
        assert_eq!(call, vec![0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn static_arguments_form_the_head() {
        let address: Address = "00000000000000000000000000000000000000aa".parse().unwrap();
        let call = encode_call("validator_indexes(address)", &[Token::Address(address)]);
        assert_eq!(call.len(), 4 + 32);
        assert_eq!(&call[4..16], &[0u8; 12][..]);
        assert_eq!(call[35], 0xaa);
    }

    #[test]
    fn dynamic_bytes_are_offset_and_padded() {
        let payload = vec![0xde, 0xad, 0xbe, 0xef];
        let call = encode_call("vote(bytes)", &[Token::Bytes(payload.clone())]);

        // selector + offset word + length word + one padded data word
        assert_eq!(call.len(), 4 + 32 + 32 + 32);
        let offset = decode_u256(&call[4..36]).unwrap();
        assert_eq!(offset, 32.into());
        let length = decode_u256(&call[36..68]).unwrap();
        assert_eq!(length, 4.into());
        assert_eq!(&call[68..72], payload.as_slice());
        assert_eq!(&call[72..100], &[0u8; 28][..]);
    }

    #[test]
    fn short_return_data_is_unknown() {
        assert_eq!(decode_u256(&[]), None);
        assert_eq!(decode_u256(&[1, 2, 3]), None);

        let word = uint_word(&7.into());
        assert_eq!(decode_u256(&word), Some(7.into()));
    }
}
