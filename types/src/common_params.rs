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

use ethereum_types::{Address, H256};

use crate::{BlockNumber, Bytes};

/// Chain-level parameters shared by the chain service, the sync extension
/// and the validator service. These come from the `eth.block.*` section of
/// the node configuration and are forwarded verbatim to the execution
/// engine; the fields below are the ones the client core reads itself.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonParams {
    /// Network identity, checked against remote `Status` messages and
    /// stamped into the database on first start.
    pub network_id: u64,
    /// Number of consecutive block heights forming one Casper epoch.
    pub epoch_length: u64,
    /// Epochs a logged-out validator waits past its end epoch before the
    /// deposit becomes withdrawable.
    pub withdrawal_delay: u64,
    pub base_interest_factor: f64,
    pub base_penalty_factor: f64,
    /// Address of the Casper finality contract.
    pub casper_address: Address,
    /// Height of the fork-identity block every new peer is challenged on.
    pub dao_fork_blknum: BlockNumber,
    /// Expected hash of the fork-identity block.
    pub dao_fork_blkhash: H256,
    /// Expected extra-data of the fork-identity block.
    pub dao_fork_blkextra: Bytes,
}

impl Default for CommonParams {
    fn default() -> Self {
        Self {
            network_id: 0,
            epoch_length: 50,
            withdrawal_delay: 5,
            base_interest_factor: 0.1,
            base_penalty_factor: 0.0001,
            casper_address: "bd832b0cd3291c39ef67691858f35c71dfb3bf21"
                .parse()
                .expect("built-in casper address is well-formed"),
            dao_fork_blknum: 1_920_000,
            dao_fork_blkhash: "4985f5ca3d2afbec36529aa96f74de3cc10a2a4a6c44f2157a57d2c6059a11bb"
                .parse()
                .expect("built-in fork hash is well-formed"),
            dao_fork_blkextra: b"dao-hard-fork".to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fork_identity_is_complete() {
        let params = CommonParams::default();
        assert_ne!(params.dao_fork_blkhash, H256::zero());
        assert_eq!(params.dao_fork_blkextra, b"dao-hard-fork".to_vec());
        assert_ne!(params.casper_address, Address::zero());
    }
}
