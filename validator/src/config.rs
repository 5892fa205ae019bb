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

use ethereum_types::{Address, U256};
use serde::{Deserialize, Deserializer};

/// Validator service configuration, the `validate` section of the node
/// config file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    /// The local validator identity; must be present in the keystore.
    #[serde(deserialize_with = "address_from_hex")]
    pub address: Address,
    /// Deposit in wei. Absent or zero means "never deposit".
    #[serde(default, deserialize_with = "u256_from_dec")]
    pub deposit_size: Option<U256>,
    /// Steer the machine into the logout sequence once logged in.
    #[serde(default)]
    pub should_logout: bool,
}

fn address_from_hex<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>, {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim_start_matches("0x");
    raw.parse().map_err(|_| serde::de::Error::custom("malformed validator address"))
}

fn u256_from_dec<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>, {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => U256::from_dec_str(&raw)
            .map(Some)
            .map_err(|_| serde::de::Error::custom("malformed deposit size")),
    }
}
