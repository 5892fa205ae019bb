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

//! Resolution of peer `GetBlockHeaders` queries against the local chain.

use ethereum_types::H256;
use vcore::{BlockId, ChainEngine, Header};
use vtypes::BlockNumber;

use super::message::HashOrNumber;

/// Walks the chain answering a header query. The walk stops at genesis,
/// at the first unknown block, and at `max_headers` items; an unknown
/// origin yields an empty response.
pub fn query_headers(
    engine: &dyn ChainEngine,
    origin: HashOrNumber,
    max_headers: u64,
    skip: u64,
    reverse: bool,
) -> Vec<Header> {
    match origin {
        HashOrNumber::Hash(hash) => query_by_hash(engine, hash, max_headers, skip, reverse),
        HashOrNumber::Number(number) => query_by_number(engine, number, max_headers, skip, reverse),
    }
}

fn query_by_hash(engine: &dyn ChainEngine, origin: H256, max_headers: u64, skip: u64, reverse: bool) -> Vec<Header> {
    let mut headers = Vec::new();
    let mut origin_hash = origin;
    loop {
        let header = match engine.block_header(BlockId::Hash(origin_hash)) {
            Some(header) => header,
            None => break,
        };
        if header.number() == 0 {
            break
        }
        let number = header.number();
        headers.push(header);
        if headers.len() as u64 >= max_headers {
            break
        }

        if reverse {
            // Follow prevhash skip+1 times.
            let mut unknown = false;
            for _ in 0..=skip {
                match engine.block_header(BlockId::Hash(origin_hash)) {
                    Some(header) => origin_hash = *header.parent_hash(),
                    None => {
                        unknown = true;
                        break
                    }
                }
            }
            if unknown {
                break
            }
        } else {
            // Jump forward, then verify that walking the parent chain back
            // from the jumped block lands on the origin; a mismatch means
            // the origin is not an ancestor on this chain.
            let jumped = match engine.block_hash(BlockId::Number(number + skip + 1)) {
                Some(hash) => hash,
                None => break,
            };
            if ancestor_hash(engine, jumped, skip + 1) == Some(origin_hash) {
                origin_hash = jumped;
            } else {
                break
            }
        }
    }
    headers
}

fn query_by_number(
    engine: &dyn ChainEngine,
    origin: BlockNumber,
    max_headers: u64,
    skip: u64,
    reverse: bool,
) -> Vec<Header> {
    let mut headers = Vec::new();
    let mut number = origin;
    loop {
        if number == 0 {
            break
        }
        let header = match engine.block_header(BlockId::Number(number)) {
            Some(header) => header,
            None => break,
        };
        headers.push(header);
        if headers.len() as u64 >= max_headers {
            break
        }

        if reverse {
            if number >= skip + 1 {
                number -= skip + 1;
            } else {
                break
            }
        } else {
            number += skip + 1;
        }
    }
    headers
}

/// Hash of the header `steps` generations above `from`, if the whole chain
/// segment is known.
fn ancestor_hash(engine: &dyn ChainEngine, from: H256, steps: u64) -> Option<H256> {
    let mut current = engine.block_header(BlockId::Hash(from))?;
    for _ in 0..steps {
        current = engine.block_header(BlockId::Hash(*current.parent_hash()))?;
    }
    Some(current.hash())
}

#[cfg(test)]
mod tests {
    use vcore::test_client::TestChainEngine;
    use vcore::Block;

    use super::*;

    fn numbers(headers: &[Header]) -> Vec<BlockNumber> {
        headers.iter().map(Header::number).collect()
    }

    fn engine_with_chain(length: usize) -> TestChainEngine {
        let engine = TestChainEngine::new();
        engine.add_blocks(length);
        engine
    }

    #[test]
    fn number_mode_forward_with_skip() {
        let engine = engine_with_chain(20);
        let headers = query_headers(&engine, HashOrNumber::Number(5), 3, 1, false);
        assert_eq!(numbers(&headers), vec![5, 7, 9]);
    }

    #[test]
    fn number_mode_forward_stops_at_first_unknown() {
        let engine = engine_with_chain(20);
        let headers = query_headers(&engine, HashOrNumber::Number(18), 5, 0, false);
        assert_eq!(numbers(&headers), vec![18, 19, 20]);
    }

    #[test]
    fn number_mode_reverse_stops_instead_of_underflowing() {
        let engine = engine_with_chain(20);
        let headers = query_headers(&engine, HashOrNumber::Number(2), 5, 2, true);
        assert_eq!(numbers(&headers), vec![2]);
    }

    #[test]
    fn genesis_origin_yields_nothing() {
        let engine = engine_with_chain(20);
        assert!(query_headers(&engine, HashOrNumber::Number(0), 5, 0, false).is_empty());

        let genesis = engine.block_hash(BlockId::Number(0)).unwrap();
        assert!(query_headers(&engine, HashOrNumber::Hash(genesis), 5, 0, true).is_empty());
    }

    #[test]
    fn unknown_origin_yields_nothing() {
        let engine = engine_with_chain(20);
        assert!(query_headers(&engine, HashOrNumber::Number(999), 5, 0, false).is_empty());
        assert!(query_headers(&engine, HashOrNumber::Hash(H256::random()), 5, 0, true).is_empty());
    }

    #[test]
    fn hash_mode_reverse_walks_prevhashes() {
        let engine = engine_with_chain(20);
        let origin = engine.block_hash(BlockId::Number(10)).unwrap();
        let headers = query_headers(&engine, HashOrNumber::Hash(origin), 3, 0, true);
        assert_eq!(numbers(&headers), vec![10, 9, 8]);
    }

    #[test]
    fn hash_mode_reverse_stops_at_genesis() {
        let engine = engine_with_chain(20);
        let origin = engine.block_hash(BlockId::Number(2)).unwrap();
        let headers = query_headers(&engine, HashOrNumber::Hash(origin), 5, 0, true);
        assert_eq!(numbers(&headers), vec![2, 1]);
    }

    #[test]
    fn hash_mode_forward_follows_canonical_chain() {
        let engine = engine_with_chain(20);
        let origin = engine.block_hash(BlockId::Number(5)).unwrap();
        let headers = query_headers(&engine, HashOrNumber::Hash(origin), 3, 1, false);
        assert_eq!(numbers(&headers), vec![5, 7, 9]);
    }

    #[test]
    fn hash_mode_forward_rejects_non_ancestor_origin() {
        let engine = engine_with_chain(20);

        // A known block at height 5 on a side chain: child of canonical 4,
        // but not the canonical 5.
        let parent = engine.block(BlockId::Number(4)).unwrap();
        let mut header = vcore::Header::new();
        header.set_parent_hash(parent.header.hash());
        header.set_number(5);
        header.set_score(1.into());
        header.set_extra_data(b"fork".to_vec());
        let fork = Block {
            header,
            transactions: vec![],
        };
        engine.add_block(&fork).unwrap();
        assert_ne!(engine.block_hash(BlockId::Number(5)).unwrap(), fork.header.hash());

        let headers = query_headers(&engine, HashOrNumber::Hash(fork.header.hash()), 3, 0, false);
        assert_eq!(numbers(&headers), vec![5], "the skip-back guard must stop the walk");
    }
}
