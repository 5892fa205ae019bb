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

/// Retention mode requested for the data directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruningMode {
    /// Keep all historical state.
    Off,
    /// Drop state older than the given number of blocks.
    Ttl(u64),
}

/// Chain service configuration, the `eth` section of the node config file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Peer filter; also stamped into the data directory.
    #[serde(default)]
    pub network_id: u64,
    /// −1 keeps all state; a non-negative value is a pruning TTL in blocks.
    /// Whichever mode first touches a data directory owns it for good.
    #[serde(default = "default_pruning")]
    pub pruning: i64,
    /// Admission floor in wei per gas.
    #[serde(default = "default_min_gas_price")]
    pub min_gas_price: u64,
    /// Capacity of the block import queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_pruning() -> i64 {
    -1
}

fn default_min_gas_price() -> u64 {
    // 100 gwei
    100_000_000_000
}

fn default_queue_size() -> usize {
    1024
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network_id: 0,
            pruning: default_pruning(),
            min_gas_price: default_min_gas_price(),
            queue_size: default_queue_size(),
        }
    }
}

impl ChainConfig {
    pub fn pruning_mode(&self) -> PruningMode {
        if self.pruning < 0 {
            PruningMode::Off
        } else {
            PruningMode::Ttl(self.pruning as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pruning_mode_from_knob() {
        assert_eq!(ChainConfig::default().pruning_mode(), PruningMode::Off);

        let mut config = ChainConfig::default();
        config.pruning = 0;
        assert_eq!(config.pruning_mode(), PruningMode::Ttl(0));
        config.pruning = 600;
        assert_eq!(config.pruning_mode(), PruningMode::Ttl(600));
    }

    #[test]
    fn default_floor_is_100_gwei() {
        assert_eq!(ChainConfig::default().min_gas_price, 100 * 1_000_000_000);
    }
}
