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

use kvdb::{DBTransaction, KeyValueDB};
use vtypes::util::Mismatch;

use crate::client::{ChainConfig, PruningMode};
use crate::error::{Error, StartupError};

/// Key under which the network identity is stamped on first start.
const NETWORK_ID_KEY: &[u8] = b"network_id";
/// One-way latch marking a data directory as pruning.
const PRUNING_KEY: &[u8] = b"I am pruning";
/// One-way latch marking a data directory as non-pruning.
const NOT_PRUNING_KEY: &[u8] = b"I am not pruning";

fn get(db: &dyn KeyValueDB, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    db.get(None, key).map(|value| value.map(|v| v.to_vec())).map_err(|err| Error::Database(err.to_string()))
}

/// Checks a data directory against the configuration it was first opened
/// with and stamps a fresh one. The retention mode is a one-way latch:
/// reopening a pruning directory as non-pruning (or the reverse) is fatal,
/// as is reopening it under a different network id.
pub fn check_startup_stamps(db: &dyn KeyValueDB, config: &ChainConfig) -> Result<(), Error> {
    let mut batch = DBTransaction::new();

    match config.pruning_mode() {
        PruningMode::Ttl(_) => {
            if get(db, NOT_PRUNING_KEY)?.is_some() {
                return Err(StartupError::PruningModeChanged(Mismatch {
                    expected: "not pruning".into(),
                    found: "pruning".into(),
                })
                .into())
            }
            batch.put(None, PRUNING_KEY, b"1");
        }
        PruningMode::Off => {
            if get(db, PRUNING_KEY)?.is_some() {
                return Err(StartupError::PruningModeChanged(Mismatch {
                    expected: "pruning".into(),
                    found: "not pruning".into(),
                })
                .into())
            }
            batch.put(None, NOT_PRUNING_KEY, b"1");
        }
    }

    let local_id = config.network_id.to_string();
    match get(db, NETWORK_ID_KEY)? {
        Some(recorded) => {
            if recorded != local_id.as_bytes() {
                return Err(StartupError::NetworkIdMismatch(Mismatch {
                    expected: String::from_utf8_lossy(&recorded).into_owned(),
                    found: local_id,
                })
                .into())
            }
        }
        None => {
            batch.put(None, NETWORK_ID_KEY, local_id.as_bytes());
        }
    }

    db.write(batch).map_err(|err| Error::Database(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use kvdb_memorydb;

    use super::*;

    fn config(network_id: u64, pruning: i64) -> ChainConfig {
        ChainConfig {
            network_id,
            pruning,
            ..Default::default()
        }
    }

    #[test]
    fn fresh_directory_is_stamped() {
        let db = kvdb_memorydb::create(0);
        check_startup_stamps(&db, &config(17, -1)).unwrap();

        assert!(db.get(None, NOT_PRUNING_KEY).unwrap().is_some());
        assert!(db.get(None, PRUNING_KEY).unwrap().is_none());
        assert_eq!(db.get(None, NETWORK_ID_KEY).unwrap().unwrap().to_vec(), b"17".to_vec());
    }

    #[test]
    fn reopening_with_same_mode_is_fine() {
        let db = kvdb_memorydb::create(0);
        check_startup_stamps(&db, &config(17, 250)).unwrap();
        check_startup_stamps(&db, &config(17, 500)).unwrap();
    }

    #[test]
    fn switching_retention_mode_is_fatal() {
        let db = kvdb_memorydb::create(0);
        check_startup_stamps(&db, &config(17, -1)).unwrap();

        match check_startup_stamps(&db, &config(17, 250)) {
            Err(Error::Startup(StartupError::PruningModeChanged(_))) => {}
            other => panic!("expected a pruning latch violation, got {:?}", other),
        }
    }

    #[test]
    fn switching_network_id_is_fatal() {
        let db = kvdb_memorydb::create(0);
        check_startup_stamps(&db, &config(17, -1)).unwrap();

        match check_startup_stamps(&db, &config(42, -1)) {
            Err(Error::Startup(StartupError::NetworkIdMismatch(mis))) => {
                assert_eq!(mis.expected, "17");
                assert_eq!(mis.found, "42");
            }
            other => panic!("expected a network id violation, got {:?}", other),
        }
    }
}
