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

//! Read-only projection of the finality contract, executed against an
//! ephemeral clone of a chain state. Every accessor degrades a failed or
//! nonsensical contract call to `None`; the state machine treats that as
//! "unknown" and never crashes on it.

use ethereum_types::{Address, U256};
use vcore::StateInfo;

use crate::abi::{self, Token};

pub struct CasperView<'a> {
    state: &'a dyn StateInfo,
    address: Address,
}

impl<'a> CasperView<'a> {
    pub fn new(state: &'a dyn StateInfo, address: Address) -> Self {
        Self {
            state,
            address,
        }
    }

    pub fn current_epoch(&self) -> Option<u64> {
        self.call_u64("current_epoch()", &[])
    }

    pub fn expected_source_epoch(&self) -> Option<u64> {
        self.call_u64("expected_source_epoch()", &[])
    }

    pub fn recommended_source_epoch(&self) -> Option<u64> {
        self.call_u64("recommended_source_epoch()", &[])
    }

    /// Index of the validator depositing from `address`; zero means none.
    pub fn validator_indexes(&self, address: &Address) -> Option<u64> {
        self.call_u64("validator_indexes(address)", &[Token::Address(*address)])
    }

    pub fn validator_start_dynasty(&self, index: u64) -> Option<u64> {
        self.call_u64("validators__start_dynasty(uint256)", &[Token::Uint(index.into())])
    }

    pub fn validator_end_dynasty(&self, index: u64) -> Option<u64> {
        self.call_u64("validators__end_dynasty(uint256)", &[Token::Uint(index.into())])
    }

    pub fn dynasty_in_epoch(&self, epoch: u64) -> Option<u64> {
        self.call_u64("dynasty_in_epoch(uint256)", &[Token::Uint(epoch.into())])
    }

    pub fn dynasty_start_epoch(&self, dynasty: u64) -> Option<u64> {
        self.call_u64("dynasty_start_epoch(uint256)", &[Token::Uint(dynasty.into())])
    }

    pub fn withdrawal_delay(&self) -> Option<u64> {
        self.call_u64("withdrawal_delay()", &[])
    }

    pub fn deposit_scale_factor(&self, epoch: u64) -> Option<U256> {
        self.call_u256("deposit_scale_factor(uint256)", &[Token::Uint(epoch.into())])
    }

    pub fn votes_cur_dyn(&self, epoch: u64, source_epoch: u64) -> Option<U256> {
        self.call_u256("votes__cur_dyn_votes(uint256,uint256)", &[
            Token::Uint(epoch.into()),
            Token::Uint(source_epoch.into()),
        ])
    }

    pub fn votes_prev_dyn(&self, epoch: u64, source_epoch: u64) -> Option<U256> {
        self.call_u256("votes__prev_dyn_votes(uint256,uint256)", &[
            Token::Uint(epoch.into()),
            Token::Uint(source_epoch.into()),
        ])
    }

    pub fn total_curdyn_deposits(&self) -> Option<U256> {
        self.call_u256("total_curdyn_deposits()", &[])
    }

    pub fn total_prevdyn_deposits(&self) -> Option<U256> {
        self.call_u256("total_prevdyn_deposits()", &[])
    }

    pub fn last_finalized_epoch(&self) -> Option<u64> {
        self.call_u64("last_finalized_epoch()", &[])
    }

    pub fn last_justified_epoch(&self) -> Option<u64> {
        self.call_u64("last_justified_epoch()", &[])
    }

    fn call_u256(&self, signature: &str, args: &[Token]) -> Option<U256> {
        let data = abi::encode_call(signature, args);
        match self.state.call_contract(&self.address, &data) {
            Ok(ret) => abi::decode_u256(&ret),
            Err(err) => {
                vtrace!(CASPER, "casper call {} failed: {}", signature, err);
                None
            }
        }
    }

    fn call_u64(&self, signature: &str, args: &[Token]) -> Option<u64> {
        let value = self.call_u256(signature, args)?;
        if value > U256::from(u64::max_value()) {
            vtrace!(CASPER, "casper call {} returned an implausible value", signature);
            return None
        }
        Some(value.low_u64())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vcore::test_client::TestChainEngine;
    use vcore::{BlockId, ChainEngine};

    use super::*;

    fn word(value: U256) -> Vec<u8> {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        word.to_vec()
    }

    #[test]
    fn scripted_calls_resolve_and_missing_calls_are_unknown() {
        let engine = Arc::new(TestChainEngine::new());
        let casper = Address::random();
        engine.script_call(casper, abi::encode_call("current_epoch()", &[]), word(7.into()));

        let state = engine.state_at(BlockId::Latest).unwrap();
        let view = CasperView::new(&*state, casper);
        assert_eq!(view.current_epoch(), Some(7));
        assert_eq!(view.expected_source_epoch(), None, "unscripted calls surface as unknown");
    }

    #[test]
    fn implausible_integers_are_unknown() {
        let engine = Arc::new(TestChainEngine::new());
        let casper = Address::random();
        engine.script_call(casper, abi::encode_call("current_epoch()", &[]), word(U256::max_value()));
        engine.script_call(casper, abi::encode_call("total_curdyn_deposits()", &[]), word(U256::max_value()));

        let state = engine.state_at(BlockId::Latest).unwrap();
        let view = CasperView::new(&*state, casper);
        assert_eq!(view.current_epoch(), None);
        assert_eq!(view.total_curdyn_deposits(), Some(U256::max_value()), "u256 reads are not clamped");
    }

    #[test]
    fn arguments_select_distinct_slots() {
        let engine = Arc::new(TestChainEngine::new());
        let casper = Address::random();
        engine.script_call(
            casper,
            abi::encode_call("dynasty_in_epoch(uint256)", &[Token::Uint(1.into())]),
            word(10.into()),
        );
        engine.script_call(
            casper,
            abi::encode_call("dynasty_in_epoch(uint256)", &[Token::Uint(2.into())]),
            word(11.into()),
        );

        let state = engine.state_at(BlockId::Latest).unwrap();
        let view = CasperView::new(&*state, casper);
        assert_eq!(view.dynasty_in_epoch(1), Some(10));
        assert_eq!(view.dynasty_in_epoch(2), Some(11));
        assert_eq!(view.dynasty_in_epoch(3), None);
    }
}
