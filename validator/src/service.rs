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

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ethereum_types::{Address, H256, U256};
use parking_lot::Mutex;
use vcore::{
    contract_address, AccountProvider, Action, Block, BlockId, ChainEngine, ChainNotify, ChainService, Error,
    SignError, Signer, StateInfo, Transaction, UnverifiedTransaction,
};
use vtypes::Bytes;

use crate::abi::{self, Token};
use crate::casper::CasperView;
use crate::config::ValidatorConfig;
use crate::message;

/// Minimum wall-clock distance between two logout broadcasts.
const LOGOUT_BROADCAST_COOLDOWN: Duration = Duration::from_secs(60);
/// Gas price of signed validator transactions: 110 gwei.
const VALIDATOR_TX_GAS_PRICE: u64 = 110_000_000_000;
/// Start gas of signed validator transactions.
const VALIDATOR_TX_GAS: u64 = 3_141_592;
/// Start gas of unsigned vote transactions.
const VOTE_TX_GAS: u64 = 1_000_000;

/// Lifecycle position of the local validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidatorState {
    /// No on-chain validator record is believed to exist.
    Uninitiated,
    /// Validation-code deployment broadcast; waiting for its inclusion.
    WaitingForValcode,
    /// Deposit broadcast; waiting for inclusion and dynasty activation.
    WaitingForLogin,
    /// Active; votes once per epoch.
    Voting,
    /// Logout broadcast pending; still votes until the dynasty ends.
    WaitingForLogOut,
    /// Logged out; waiting until the deposit becomes withdrawable.
    WaitingForWithdrawable,
    /// Withdraw broadcast; waiting for the record to be deleted.
    WaitingForWithdrawn,
    /// Terminal idle state.
    LoggedOut,
}

impl fmt::Display for ValidatorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValidatorState::Uninitiated => "uninitiated",
            ValidatorState::WaitingForValcode => "waiting_for_valcode",
            ValidatorState::WaitingForLogin => "waiting_for_login",
            ValidatorState::Voting => "voting",
            ValidatorState::WaitingForLogOut => "waiting_for_log_out",
            ValidatorState::WaitingForWithdrawable => "waiting_for_withdrawable",
            ValidatorState::WaitingForWithdrawn => "waiting_for_withdrawn",
            ValidatorState::LoggedOut => "logged_out",
        };
        f.write_str(name)
    }
}

/// Locally memoized slashing guards.
// TODO: persist votes and the latest epochs across restarts; with an
// in-memory-only record a restarted validator can emit a vote surrounding
// one cast before the restart.
struct VoteMemory {
    votes: HashMap<u64, Bytes>,
    latest_target_epoch: i64,
    latest_source_epoch: i64,
}

impl VoteMemory {
    fn new() -> Self {
        Self {
            votes: HashMap::new(),
            latest_target_epoch: -1,
            latest_source_epoch: -1,
        }
    }
}

/// Drives one validator identity through the finality-gadget lifecycle,
/// ticked by every new chain head.
pub struct ValidatorService {
    chain: Arc<ChainService>,
    engine: Arc<dyn ChainEngine>,
    signer: Arc<dyn Signer>,
    epoch_length: u64,
    casper_address: Address,
    should_logout: bool,
    deposit_size: Mutex<Option<U256>>,
    state: Mutex<ValidatorState>,
    valcode_address: Mutex<Option<Address>>,
    votes: Mutex<VoteMemory>,
    last_logout_broadcast: Mutex<Option<Instant>>,
}

impl ValidatorService {
    /// Looks up the validator identity, registers for new-head events and
    /// enables local transaction authoring on the chain service.
    pub fn new(
        chain: Arc<ChainService>,
        accounts: &dyn AccountProvider,
        config: ValidatorConfig,
    ) -> Result<Arc<Self>, Error> {
        let signer = accounts.find(&config.address).ok_or(SignError::NotFound)?;
        let (epoch_length, casper_address) = {
            let params = chain.common_params();
            (params.epoch_length, params.casper_address)
        };
        let service = Arc::new(Self {
            engine: Arc::clone(chain.engine()),
            signer,
            epoch_length,
            casper_address,
            should_logout: config.should_logout,
            deposit_size: Mutex::new(config.deposit_size.filter(|size| !size.is_zero())),
            state: Mutex::new(ValidatorState::Uninitiated),
            valcode_address: Mutex::new(None),
            votes: Mutex::new(VoteMemory::new()),
            last_logout_broadcast: Mutex::new(None),
            chain,
        });

        vinfo!(VALIDATOR, "validator enabled for {:#x}", config.address);
        let listener: Arc<dyn ChainNotify> = Arc::clone(&service) as Arc<dyn ChainNotify>;
        service.chain.add_notify(&listener);
        service.chain.set_authoring(true);
        Ok(service)
    }

    pub fn state(&self) -> ValidatorState {
        *self.state.lock()
    }

    /// Address of the deployed (or in-flight) validation-code contract.
    pub fn valcode_address(&self) -> Option<Address> {
        *self.valcode_address.lock()
    }

    fn dispatch(&self, state: ValidatorState, casper: &CasperView, head_state: &dyn StateInfo) -> ValidatorState {
        match state {
            ValidatorState::Uninitiated | ValidatorState::WaitingForLogin | ValidatorState::LoggedOut => {
                self.check_logged_in(state, casper, head_state)
            }
            ValidatorState::WaitingForValcode => self.check_valcode(state, head_state),
            ValidatorState::Voting => {
                if let Err(err) = self.vote(casper, head_state) {
                    verror!(VALIDATOR, "{}", err);
                }
                ValidatorState::Voting
            }
            ValidatorState::WaitingForLogOut => self.vote_then_logout(state, casper, head_state),
            ValidatorState::WaitingForWithdrawable => self.check_withdrawable(state, casper, head_state),
            ValidatorState::WaitingForWithdrawn => self.check_withdrawn(state, casper),
        }
    }

    fn check_logged_in(
        &self,
        current: ValidatorState,
        casper: &CasperView,
        head_state: &dyn StateInfo,
    ) -> ValidatorState {
        let index = match self.validator_index(casper) {
            None => {
                // No record yet: deploy validation code iff a deposit is
                // configured, otherwise there is nothing to do.
                let deposit_configured = self.deposit_size.lock().is_some();
                if !deposit_configured {
                    return current
                }
                return match self.broadcast_valcode_tx(head_state) {
                    Ok(()) => ValidatorState::WaitingForValcode,
                    Err(err) => {
                        vwarn!(VALIDATOR, "cannot deploy validation code: {}", err);
                        current
                    }
                }
            }
            Some(index) => index,
        };

        let current_epoch = match casper.current_epoch() {
            Some(epoch) => epoch,
            None => return current,
        };
        if !self.is_logged_in(casper, current_epoch, index) {
            return current
        }
        if self.should_logout {
            ValidatorState::WaitingForLogOut
        } else {
            ValidatorState::Voting
        }
    }

    fn check_valcode(&self, current: ValidatorState, head_state: &dyn StateInfo) -> ValidatorState {
        let valcode = match *self.valcode_address.lock() {
            Some(address) => address,
            None => {
                vwarn!(VALIDATOR, "no validation code address on record");
                return current
            }
        };
        if head_state.code(&valcode).map_or(true, |code| code.is_empty()) {
            // Deployment not included yet.
            return current
        }
        let deposit = match *self.deposit_size.lock() {
            Some(deposit) => deposit,
            None => return current,
        };
        if head_state.balance(&self.signer.address()) < deposit {
            vinfo!(VALIDATOR, "cannot login as validator: balance below the deposit");
            return current
        }
        match self.broadcast_deposit_tx(valcode, deposit, head_state) {
            Ok(()) => ValidatorState::WaitingForLogin,
            Err(err) => {
                vwarn!(VALIDATOR, "cannot deposit: {}", err);
                current
            }
        }
    }

    fn vote_then_logout(
        &self,
        current: ValidatorState,
        casper: &CasperView,
        head_state: &dyn StateInfo,
    ) -> ValidatorState {
        let epoch = head_state.block_number() / self.epoch_length;
        let index = match self.validator_index(casper) {
            Some(index) => index,
            None => {
                vinfo!(VALIDATOR, "validator record gone, treating as logged out");
                return ValidatorState::WaitingForWithdrawable
            }
        };
        if !self.is_logged_in(casper, epoch, index) {
            vinfo!(VALIDATOR, "validator logged out");
            return ValidatorState::WaitingForWithdrawable
        }

        // Still in the dynasty: keep voting, then push the logout.
        let mut logout_nonce = head_state.nonce(&self.signer.address());
        match self.vote(casper, head_state) {
            Ok(true) => logout_nonce = logout_nonce + U256::one(),
            Ok(false) => {}
            Err(err) => {
                verror!(VALIDATOR, "{}", err);
                return current
            }
        }
        self.broadcast_logout_tx(index, logout_nonce, head_state);
        current
    }

    /// The vote procedure. `Ok(true)` iff a vote was broadcast; `Err` only
    /// for the cannot-vote-while-logged-out assertion, which the caller
    /// treats as fatal for this tick.
    fn vote(&self, casper: &CasperView, head_state: &dyn StateInfo) -> Result<bool, String> {
        vdebug!(VALIDATOR, "attempting to vote");
        let epoch = head_state.block_number() / self.epoch_length;

        let mut memory = self.votes.lock();
        if memory.votes.contains_key(&epoch) {
            // One vote per target epoch, ever.
            return Ok(false)
        }
        let index = match self.validator_index(casper) {
            Some(index) => index,
            None => return Err("cannot vote: validator has no index".into()),
        };
        if !self.is_logged_in(casper, epoch, index) {
            return Err("cannot vote: validator not logged in".into())
        }
        if head_state.block_number() % self.epoch_length <= self.epoch_length / 4 {
            // Wait until a quarter into the epoch.
            return Ok(false)
        }
        if epoch == 0 {
            // There is no justified target to build on yet.
            return Ok(false)
        }
        let target_hash = match self.epoch_blockhash(epoch) {
            Some(hash) => hash,
            None => return Ok(false),
        };
        let source_epoch = match casper.recommended_source_epoch() {
            Some(epoch) => epoch,
            None => return Ok(false),
        };
        if (epoch as i64) < memory.latest_target_epoch || (source_epoch as i64) < memory.latest_source_epoch {
            // Casting this vote could surround an earlier one.
            return Ok(false)
        }

        let vote_msg = message::mk_vote(index, target_hash, epoch, source_epoch, &*self.signer)
            .map_err(|err| format!("cannot sign vote: {}", err))?;
        memory.votes.insert(epoch, vote_msg.clone());
        memory.latest_target_epoch = epoch as i64;
        memory.latest_source_epoch = source_epoch as i64;
        drop(memory);

        let vote_tx = self.mk_vote_tx(&vote_msg);
        self.chain.add_transaction(vote_tx, None, true, false);
        vinfo!(
            VALIDATOR,
            "vote cast: validator {} epoch {} source epoch {} target {:#x}",
            index,
            epoch,
            source_epoch,
            target_hash
        );
        Ok(true)
    }

    fn check_withdrawable(
        &self,
        current: ValidatorState,
        casper: &CasperView,
        head_state: &dyn StateInfo,
    ) -> ValidatorState {
        let index = match self.validator_index(casper) {
            Some(index) => index,
            None => {
                vinfo!(VALIDATOR, "validator record already deleted");
                return ValidatorState::LoggedOut
            }
        };
        let end_epoch = casper.validator_end_dynasty(index).and_then(|end| casper.dynasty_start_epoch(end + 1));
        let withdrawable = match (end_epoch, casper.current_epoch(), casper.withdrawal_delay()) {
            (Some(end_epoch), Some(current_epoch), Some(delay)) => current_epoch >= end_epoch + delay,
            _ => false,
        };
        if !withdrawable {
            return current
        }
        match self.broadcast_withdraw_tx(index, head_state) {
            Ok(()) => ValidatorState::WaitingForWithdrawn,
            Err(err) => {
                vwarn!(VALIDATOR, "cannot withdraw: {}", err);
                current
            }
        }
    }

    fn check_withdrawn(&self, current: ValidatorState, casper: &CasperView) -> ValidatorState {
        if self.validator_index(casper).is_none() {
            ValidatorState::LoggedOut
        } else {
            current
        }
    }

    /// Index of the local validator; zero and call failures both mean "no
    /// record".
    fn validator_index(&self, casper: &CasperView) -> Option<u64> {
        casper.validator_indexes(&self.signer.address()).filter(|index| *index != 0)
    }

    /// Active in the current or previous dynasty of `target_epoch`, lower
    /// bound inclusive, upper bound exclusive.
    fn is_logged_in(&self, casper: &CasperView, target_epoch: u64, index: u64) -> bool {
        let (start, end, current) = match (
            casper.validator_start_dynasty(index),
            casper.validator_end_dynasty(index),
            casper.dynasty_in_epoch(target_epoch),
        ) {
            (Some(start), Some(end), Some(current)) => (start, end, current),
            _ => return false,
        };
        let in_current = start <= current && current < end;
        let in_prev = current > 0 && start <= current - 1 && current - 1 < end;
        in_current || in_prev
    }

    /// Hash identifying `epoch` in vote messages: the hash of the last
    /// block before the epoch began, the zero sentinel for epoch zero.
    fn epoch_blockhash(&self, epoch: u64) -> Option<H256> {
        if epoch == 0 {
            return Some(H256::zero())
        }
        self.engine.block_hash(BlockId::Number(epoch * self.epoch_length - 1))
    }

    fn broadcast_valcode_tx(&self, head_state: &dyn StateInfo) -> Result<(), SignError> {
        let address = self.signer.address();
        let nonce = head_state.nonce(&address);
        let code = self.engine.validation_code(&address);
        let tx = self.signer.sign_tx(self.mk_transaction(nonce, Action::Create, U256::zero(), code))?;
        *self.valcode_address.lock() = Some(contract_address(&address, &nonce));
        vinfo!(VALIDATOR, "broadcasting validation code transaction with nonce {}", nonce);
        self.chain.add_transaction(tx.into(), None, true, false);
        Ok(())
    }

    fn broadcast_deposit_tx(
        &self,
        valcode: Address,
        deposit: U256,
        head_state: &dyn StateInfo,
    ) -> Result<(), SignError> {
        let data = abi::encode_call("deposit(address,address)", &[
            Token::Address(valcode),
            Token::Address(self.signer.address()),
        ]);
        let nonce = head_state.nonce(&self.signer.address());
        let tx = self.signer.sign_tx(self.mk_transaction(nonce, Action::Call(self.casper_address), deposit, data))?;
        // The deposit is consumed: a repeated pass must not deposit twice.
        *self.deposit_size.lock() = None;
        vinfo!(VALIDATOR, "broadcasting deposit transaction with nonce {}", nonce);
        self.chain.add_transaction(tx.into(), None, true, false);
        Ok(())
    }

    fn broadcast_logout_tx(&self, index: u64, nonce: U256, head_state: &dyn StateInfo) {
        {
            let mut last = self.last_logout_broadcast.lock();
            if let Some(at) = *last {
                if at.elapsed() < LOGOUT_BROADCAST_COOLDOWN {
                    return
                }
            }
            *last = Some(Instant::now());
        }

        let epoch = head_state.block_number() / self.epoch_length;
        let logout_msg = match message::mk_logout(index, epoch, &*self.signer) {
            Ok(msg) => msg,
            Err(err) => {
                vwarn!(VALIDATOR, "cannot sign logout: {}", err);
                return
            }
        };
        let data = abi::encode_call("logout(bytes)", &[Token::Bytes(logout_msg)]);
        let tx = match self.signer.sign_tx(self.mk_transaction(
            nonce,
            Action::Call(self.casper_address),
            U256::zero(),
            data,
        )) {
            Ok(tx) => tx,
            Err(err) => {
                vwarn!(VALIDATOR, "cannot sign logout transaction: {}", err);
                return
            }
        };
        vinfo!(VALIDATOR, "broadcasting logout transaction with nonce {}", nonce);
        self.chain.add_transaction(tx.into(), None, true, false);
    }

    fn broadcast_withdraw_tx(&self, index: u64, head_state: &dyn StateInfo) -> Result<(), SignError> {
        let data = abi::encode_call("withdraw(uint256)", &[Token::Uint(index.into())]);
        let nonce = head_state.nonce(&self.signer.address());
        let tx =
            self.signer.sign_tx(self.mk_transaction(nonce, Action::Call(self.casper_address), U256::zero(), data))?;
        vinfo!(VALIDATOR, "broadcasting withdraw transaction with nonce {}", nonce);
        self.chain.add_transaction(tx.into(), None, true, false);
        Ok(())
    }

    fn mk_transaction(&self, nonce: U256, action: Action, value: U256, data: Bytes) -> Transaction {
        Transaction {
            nonce,
            gas_price: VALIDATOR_TX_GAS_PRICE.into(),
            gas: VALIDATOR_TX_GAS.into(),
            action,
            value,
            data,
        }
    }

    fn mk_vote_tx(&self, vote_msg: &Bytes) -> UnverifiedTransaction {
        let data = abi::encode_call("vote(bytes)", &[Token::Bytes(vote_msg.clone())]);
        Transaction {
            nonce: U256::zero(),
            gas_price: U256::zero(),
            gas: VOTE_TX_GAS.into(),
            action: Action::Call(self.casper_address),
            value: U256::zero(),
            data,
        }
        .null_sign()
        .into()
    }

    fn log_casper_info(&self, casper: &CasperView) {
        let (current_epoch, expected_source) = match (casper.current_epoch(), casper.expected_source_epoch()) {
            (Some(epoch), Some(source)) => (epoch, source),
            _ => {
                vdebug!(CASPER, "casper status unavailable");
                return
            }
        };
        let scale = casper.deposit_scale_factor(current_epoch).unwrap_or_default();
        let cur_deposits = casper.total_curdyn_deposits().unwrap_or_default();
        let prev_deposits = casper.total_prevdyn_deposits().unwrap_or_default();
        let cur_votes =
            casper.votes_cur_dyn(current_epoch, expected_source).unwrap_or_default().saturating_mul(scale);
        let prev_votes =
            casper.votes_prev_dyn(current_epoch, expected_source).unwrap_or_default().saturating_mul(scale);
        let pct = |votes: U256, deposits: U256| {
            if deposits.is_zero() {
                U256::zero()
            } else {
                votes * U256::from(100) / deposits
            }
        };
        vinfo!(
            CASPER,
            "casper status: epoch {}, {} / {} voted from current dynasty ({} %), {} / {} from previous ({} %), \
             last finalized {:?} justified {:?} expected source {}",
            current_epoch,
            cur_votes,
            cur_deposits,
            pct(cur_votes, cur_deposits),
            prev_votes,
            prev_deposits,
            pct(prev_votes, prev_deposits),
            casper.last_finalized_epoch(),
            casper.last_justified_epoch(),
            expected_source
        );
    }
}

impl ChainNotify for ValidatorService {
    fn new_head(&self, _block: &Block) {
        if self.chain.is_syncing() {
            return
        }
        let head_state = match self.engine.state_at(BlockId::Latest) {
            Some(state) => state,
            None => {
                vwarn!(VALIDATOR, "no head state available");
                return
            }
        };
        let casper = CasperView::new(&*head_state, self.casper_address);
        self.log_casper_info(&casper);

        let current = *self.state.lock();
        let next = self.dispatch(current, &casper, &*head_state);
        if next != current {
            vinfo!(VALIDATOR, "changing validator state from {} to {}", current, next);
            *self.state.lock() = next;
        }
    }
}
