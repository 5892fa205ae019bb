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

//! The fork-identity handshake: every peer is asked for the fork block
//! right after `Status`, and is kept only if it either does not have that
//! block at all or agrees on its hash and extra-data.

use std::time::{Duration, Instant};

use ethereum_types::{H256, U256};
use vcore::Header;
use vtypes::CommonParams;

use super::message::HashOrNumber;

/// How long a peer may take to answer the challenge.
pub const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(8);

/// One outstanding challenge. The status data it carries is released to
/// the synchronizer only after the peer passes.
pub struct DaoChallenge {
    /// Head hash the peer claimed in its status.
    pub best_hash: H256,
    /// Total score the peer claimed in its status.
    pub total_score: U256,
    /// When the challenge lapses.
    pub expires_at: Instant,
}

impl DaoChallenge {
    pub fn new(best_hash: H256, total_score: U256) -> Self {
        Self {
            best_hash,
            total_score,
            expires_at: Instant::now() + CHALLENGE_TIMEOUT,
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A header request asking exactly for the fork block, as fresh peers do.
pub fn is_dao_challenge(params: &CommonParams, origin: HashOrNumber, max_headers: u64, skip: u64, reverse: bool) -> bool {
    origin == HashOrNumber::Number(params.dao_fork_blknum) && max_headers == 1 && skip == 0 && !reverse
}

/// Verdict on a challenge answer: peers without the fork block pass, peers
/// with it must agree on hash and extra-data.
pub fn accepts_answer(params: &CommonParams, headers: &[Header]) -> bool {
    match headers.first() {
        None => true,
        Some(header) => {
            header.hash() == params.dao_fork_blkhash && *header.extra_data() == params.dao_fork_blkextra
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_matching(header: &Header) -> CommonParams {
        let mut params = CommonParams::default();
        params.dao_fork_blknum = header.number();
        params.dao_fork_blkhash = header.hash();
        params.dao_fork_blkextra = header.extra_data().clone();
        params
    }

    fn fork_header() -> Header {
        let mut header = Header::new();
        header.set_number(1_920_000);
        header.set_extra_data(b"dao-hard-fork".to_vec());
        header
    }

    #[test]
    fn empty_answer_is_accepted() {
        assert!(accepts_answer(&CommonParams::default(), &[]));
    }

    #[test]
    fn matching_header_is_accepted() {
        let header = fork_header();
        let params = params_matching(&header);
        assert!(accepts_answer(&params, &[header]));
    }

    #[test]
    fn hash_disagreement_is_rejected() {
        let header = fork_header();
        let mut params = params_matching(&header);
        params.dao_fork_blkhash = H256::random();
        assert!(!accepts_answer(&params, &[header]));
    }

    #[test]
    fn extra_data_disagreement_is_rejected() {
        let header = fork_header();
        let params = params_matching(&header);
        let mut withheld = fork_header();
        withheld.set_extra_data(b"no-fork".to_vec());
        assert!(!accepts_answer(&params, &[withheld]));
    }

    #[test]
    fn challenge_pattern_recognition() {
        let params = CommonParams::default();
        let fork_number = HashOrNumber::Number(params.dao_fork_blknum);

        assert!(is_dao_challenge(&params, fork_number, 1, 0, false));
        assert!(!is_dao_challenge(&params, fork_number, 2, 0, false));
        assert!(!is_dao_challenge(&params, fork_number, 1, 1, false));
        assert!(!is_dao_challenge(&params, fork_number, 1, 0, true));
        assert!(!is_dao_challenge(&params, HashOrNumber::Number(1), 1, 0, false));
        assert!(!is_dao_challenge(&params, HashOrNumber::Hash(H256::random()), 1, 0, false));
    }

    #[test]
    fn challenges_lapse_after_the_timeout() {
        let challenge = DaoChallenge::new(H256::random(), 1.into());
        let now = Instant::now();
        assert!(!challenge.expired(now));
        assert!(challenge.expired(now + CHALLENGE_TIMEOUT + Duration::from_millis(1)));
    }
}
