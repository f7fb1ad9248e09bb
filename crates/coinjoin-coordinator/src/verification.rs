//! secp256k1 ownership and witness checks for p2wpkh and p2tr key spends

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{ecdsa, schnorr, Message, Secp256k1, VerifyOnly, XOnlyPublicKey};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::{CompressedPublicKey, OutPoint, Script, ScriptBuf, Transaction, TxOut, Witness};
use sha2::{Digest, Sha256};

use crate::coin::{Coin, OwnershipProof, ScriptType};
use crate::external::{OwnershipVerifier, WitnessValidator};
use crate::parameters::RoundId;

const OWNERSHIP_TAG: &[u8] = b"coinjoin.ownership-proof.v1";

/// message an ownership proof signs: `sha256(tag ‖ round id ‖ outpoint)`
pub fn ownership_message(round_id: &RoundId, outpoint: &OutPoint) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(OWNERSHIP_TAG);
    hasher.update(round_id.as_bytes());
    hasher.update(serialize(outpoint));
    hasher.finalize().into()
}

/// p2wpkh: 33-byte compressed key followed by a DER ecdsa signature.
/// p2tr: 64-byte bip340 signature by the output key.
pub struct Secp256k1OwnershipVerifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1OwnershipVerifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for Secp256k1OwnershipVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnershipVerifier for Secp256k1OwnershipVerifier {
    fn verify(&self, coin: &Coin, proof: &OwnershipProof, round_id: &RoundId) -> bool {
        let message = Message::from_digest(ownership_message(round_id, &coin.outpoint));
        let proof = proof.as_ref();

        match coin.script_type() {
            Some(ScriptType::P2wpkh) => {
                if proof.len() <= 33 {
                    return false;
                }
                let Ok(key) = CompressedPublicKey::from_slice(&proof[..33]) else {
                    return false;
                };
                if ScriptBuf::new_p2wpkh(&key.wpubkey_hash()) != *coin.script_pubkey() {
                    return false;
                }
                let Ok(signature) = ecdsa::Signature::from_der(&proof[33..]) else {
                    return false;
                };
                self.secp.verify_ecdsa(&message, &signature, &key.0).is_ok()
            }
            Some(ScriptType::P2tr) => {
                let Some(key) = taproot_output_key(coin.script_pubkey()) else {
                    return false;
                };
                let Ok(signature) = schnorr::Signature::from_slice(proof) else {
                    return false;
                };
                self.secp.verify_schnorr(&signature, &message, &key).is_ok()
            }
            None => false,
        }
    }
}

/// checks bip143 (p2wpkh, SIGHASH_ALL) and bip341 key-path (SIGHASH_DEFAULT
/// or SIGHASH_ALL) witnesses
pub struct Secp256k1WitnessValidator {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1WitnessValidator {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    fn validate_p2wpkh(
        &self,
        transaction: &Transaction,
        input_index: usize,
        prevout: &TxOut,
        witness: &Witness,
    ) -> Option<()> {
        if witness.len() != 2 {
            return None;
        }
        let signature = bitcoin::ecdsa::Signature::from_slice(witness.nth(0)?).ok()?;
        if signature.sighash_type != EcdsaSighashType::All {
            return None;
        }
        let key = CompressedPublicKey::from_slice(witness.nth(1)?).ok()?;
        if ScriptBuf::new_p2wpkh(&key.wpubkey_hash()) != prevout.script_pubkey {
            return None;
        }
        let sighash = SighashCache::new(transaction)
            .p2wpkh_signature_hash(
                input_index,
                &prevout.script_pubkey,
                prevout.value,
                EcdsaSighashType::All,
            )
            .ok()?;
        let message = Message::from_digest(sighash.to_byte_array());
        self.secp
            .verify_ecdsa(&message, &signature.signature, &key.0)
            .ok()
    }

    fn validate_p2tr(
        &self,
        transaction: &Transaction,
        input_index: usize,
        prevouts: &[TxOut],
        witness: &Witness,
    ) -> Option<()> {
        if witness.len() != 1 {
            return None;
        }
        let key = taproot_output_key(&prevouts.get(input_index)?.script_pubkey)?;
        let signature = bitcoin::taproot::Signature::from_slice(witness.nth(0)?).ok()?;
        if !matches!(
            signature.sighash_type,
            TapSighashType::Default | TapSighashType::All
        ) {
            return None;
        }
        let sighash = SighashCache::new(transaction)
            .taproot_key_spend_signature_hash(
                input_index,
                &Prevouts::All(prevouts),
                signature.sighash_type,
            )
            .ok()?;
        let message = Message::from_digest(sighash.to_byte_array());
        self.secp
            .verify_schnorr(&signature.signature, &message, &key)
            .ok()
    }
}

impl Default for Secp256k1WitnessValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl WitnessValidator for Secp256k1WitnessValidator {
    fn validate(
        &self,
        transaction: &Transaction,
        input_index: usize,
        prevouts: &[TxOut],
        witness: &Witness,
    ) -> bool {
        let Some(prevout) = prevouts.get(input_index) else {
            return false;
        };
        if prevouts.len() != transaction.input.len() {
            return false;
        }
        let valid = match ScriptType::from_script(&prevout.script_pubkey) {
            Some(ScriptType::P2wpkh) => {
                self.validate_p2wpkh(transaction, input_index, prevout, witness)
            }
            Some(ScriptType::P2tr) => self.validate_p2tr(transaction, input_index, prevouts, witness),
            None => None,
        };
        valid.is_some()
    }
}

fn taproot_output_key(script: &Script) -> Option<XOnlyPublicKey> {
    if !script.is_p2tr() {
        return None;
    }
    XOnlyPublicKey::from_slice(&script.as_bytes()[2..34]).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bitcoin::key::TweakedPublicKey;
    use bitcoin::secp256k1::{Keypair, PublicKey, SecretKey};
    use bitcoin::{Amount, Txid};

    pub(crate) fn p2wpkh_key(n: u8) -> (SecretKey, CompressedPublicKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[n; 32]).unwrap();
        (sk, CompressedPublicKey(PublicKey::from_secret_key(&secp, &sk)))
    }

    pub(crate) fn p2wpkh_ownership_proof(
        sk: &SecretKey,
        key: &CompressedPublicKey,
        round_id: &RoundId,
        outpoint: &OutPoint,
    ) -> OwnershipProof {
        let secp = Secp256k1::new();
        let message = Message::from_digest(ownership_message(round_id, outpoint));
        let signature = secp.sign_ecdsa(&message, sk);
        let mut proof = key.to_bytes().to_vec();
        proof.extend_from_slice(&signature.serialize_der());
        OwnershipProof(proof)
    }

    fn outpoint(n: u8) -> OutPoint {
        OutPoint::new(Txid::from_byte_array([n; 32]), 0)
    }

    pub(crate) fn taproot_coin(keypair: &Keypair, n: u8) -> Coin {
        let (xonly, _) = keypair.x_only_public_key();
        let script = ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(xonly));
        Coin::new(outpoint(n), Amount::from_sat(100_000), script)
    }

    #[test]
    fn test_p2wpkh_ownership() {
        let verifier = Secp256k1OwnershipVerifier::new();
        let (sk, key) = p2wpkh_key(3);
        let coin = Coin::new(
            outpoint(1),
            Amount::from_sat(100_000),
            ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
        );
        let round = RoundId([9; 32]);
        let proof = p2wpkh_ownership_proof(&sk, &key, &round, &coin.outpoint);

        assert!(verifier.verify(&coin, &proof, &round));
        // bound to the round
        assert!(!verifier.verify(&coin, &proof, &RoundId([8; 32])));

        // a key that does not own the script
        let (other_sk, other_key) = p2wpkh_key(4);
        let stolen = p2wpkh_ownership_proof(&other_sk, &other_key, &round, &coin.outpoint);
        assert!(!verifier.verify(&coin, &stolen, &round));

        assert!(!verifier.verify(&coin, &OwnershipProof(vec![2; 20]), &round));
    }

    #[test]
    fn test_p2tr_ownership() {
        let secp = Secp256k1::new();
        let verifier = Secp256k1OwnershipVerifier::new();
        let keypair = Keypair::from_seckey_slice(&secp, &[5; 32]).unwrap();
        let coin = taproot_coin(&keypair, 2);
        let round = RoundId([1; 32]);

        let message = Message::from_digest(ownership_message(&round, &coin.outpoint));
        let signature = secp.sign_schnorr_no_aux_rand(&message, &keypair);
        let proof = OwnershipProof(signature.serialize().to_vec());

        assert!(verifier.verify(&coin, &proof, &round));
        assert!(!verifier.verify(&coin, &proof, &RoundId([2; 32])));
    }

    #[test]
    fn test_witnesses() {
        let secp = Secp256k1::new();
        let validator = Secp256k1WitnessValidator::new();

        let (sk, key) = p2wpkh_key(7);
        let wpkh_prevout = TxOut {
            value: Amount::from_sat(200_000),
            script_pubkey: ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
        };
        let keypair = Keypair::from_seckey_slice(&secp, &[8; 32]).unwrap();
        let tr_prevout = taproot_coin(&keypair, 3).txout;
        let prevouts = vec![wpkh_prevout.clone(), tr_prevout];

        let transaction = Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: [outpoint(1), outpoint(2)]
                .iter()
                .map(|o| bitcoin::TxIn {
                    previous_output: *o,
                    ..Default::default()
                })
                .collect(),
            output: vec![TxOut {
                value: Amount::from_sat(290_000),
                script_pubkey: wpkh_prevout.script_pubkey.clone(),
            }],
        };

        let mut cache = SighashCache::new(&transaction);
        let sighash = cache
            .p2wpkh_signature_hash(0, &wpkh_prevout.script_pubkey, wpkh_prevout.value, EcdsaSighashType::All)
            .unwrap();
        let signature = bitcoin::ecdsa::Signature {
            signature: secp.sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), &sk),
            sighash_type: EcdsaSighashType::All,
        };
        let wpkh_witness = Witness::p2wpkh(&signature, &key.0);
        assert!(validator.validate(&transaction, 0, &prevouts, &wpkh_witness));
        // right signature, wrong input
        assert!(!validator.validate(&transaction, 1, &prevouts, &wpkh_witness));

        let sighash = cache
            .taproot_key_spend_signature_hash(1, &Prevouts::All(&prevouts[..]), TapSighashType::Default)
            .unwrap();
        let signature = bitcoin::taproot::Signature {
            signature: secp.sign_schnorr_no_aux_rand(&Message::from_digest(sighash.to_byte_array()), &keypair),
            sighash_type: TapSighashType::Default,
        };
        let tr_witness = Witness::p2tr_key_spend(&signature);
        assert!(validator.validate(&transaction, 1, &prevouts, &tr_witness));
        assert!(!validator.validate(&transaction, 1, &prevouts[..1], &tr_witness));

        // signing a different transaction does not carry over
        let mut other = transaction.clone();
        other.output[0].value = Amount::from_sat(1);
        assert!(!validator.validate(&other, 0, &prevouts, &wpkh_witness));
    }
}
