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

//! Casper message envelopes: an RLP list of the claim, signed over the
//! keccak of its unsigned encoding, with the signature appended.

use ethereum_types::H256;
use keccak_hash::keccak;
use rlp::RlpStream;
use vcore::{SignError, Signer};
use vtypes::Bytes;

/// A vote claim: `[validator_index, target_hash, target_epoch,
/// source_epoch, signature]`.
pub fn mk_vote(
    validator_index: u64,
    target_hash: H256,
    target_epoch: u64,
    source_epoch: u64,
    signer: &dyn Signer,
) -> Result<Bytes, SignError> {
    let mut unsigned = RlpStream::new_list(4);
    unsigned.append(&validator_index).append(&target_hash).append(&target_epoch).append(&source_epoch);
    let signature = signer.sign_message(&keccak(unsigned.as_raw()))?;

    let mut signed = RlpStream::new_list(5);
    signed.append(&validator_index).append(&target_hash).append(&target_epoch).append(&source_epoch);
    signed.append(&signature);
    Ok(signed.out())
}

/// A logout claim: `[validator_index, epoch, signature]`.
pub fn mk_logout(validator_index: u64, epoch: u64, signer: &dyn Signer) -> Result<Bytes, SignError> {
    let mut unsigned = RlpStream::new_list(2);
    unsigned.append(&validator_index).append(&epoch);
    let signature = signer.sign_message(&keccak(unsigned.as_raw()))?;

    let mut signed = RlpStream::new_list(3);
    signed.append(&validator_index).append(&epoch);
    signed.append(&signature);
    Ok(signed.out())
}

#[cfg(test)]
mod tests {
    use ethereum_types::Address;
    use rlp::Rlp;
    use vcore::test_client::TestSigner;

    use super::*;

    #[test]
    fn vote_envelope_carries_the_claim_and_signature() {
        let signer = TestSigner::new(Address::random());
        let target = H256::random();
        let vote = mk_vote(3, target, 7, 5, &signer).unwrap();

        let rlp = Rlp::new(&vote);
        assert_eq!(rlp.item_count().unwrap(), 5);
        assert_eq!(rlp.val_at::<u64>(0).unwrap(), 3);
        assert_eq!(rlp.val_at::<H256>(1).unwrap(), target);
        assert_eq!(rlp.val_at::<u64>(2).unwrap(), 7);
        assert_eq!(rlp.val_at::<u64>(3).unwrap(), 5);
        assert_eq!(rlp.val_at::<Bytes>(4).unwrap().len(), 65);
    }

    #[test]
    fn signature_covers_the_claim() {
        let signer = TestSigner::new(Address::random());
        let target = H256::random();
        let one = mk_vote(3, target, 7, 5, &signer).unwrap();
        let other = mk_vote(3, target, 8, 5, &signer).unwrap();

        let sig_one = Rlp::new(&one).val_at::<Bytes>(4).unwrap();
        let sig_other = Rlp::new(&other).val_at::<Bytes>(4).unwrap();
        assert_ne!(sig_one, sig_other);
    }

    #[test]
    fn logout_envelope_shape() {
        let signer = TestSigner::new(Address::random());
        let logout = mk_logout(3, 9, &signer).unwrap();

        let rlp = Rlp::new(&logout);
        assert_eq!(rlp.item_count().unwrap(), 3);
        assert_eq!(rlp.val_at::<u64>(0).unwrap(), 3);
        assert_eq!(rlp.val_at::<u64>(1).unwrap(), 9);
    }
}
