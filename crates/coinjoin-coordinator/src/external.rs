//! collaborators the arena calls out to

use bitcoin::{Transaction, TxOut, Witness};

use crate::coin::{Coin, OwnershipProof};
use crate::parameters::RoundId;

/// checks that whoever registers a coin controls its key, for this round only
pub trait OwnershipVerifier: Send + Sync {
    fn verify(&self, coin: &Coin, proof: &OwnershipProof, round_id: &RoundId) -> bool;
}

/// checks a witness for one input of the unsigned coinjoin
pub trait WitnessValidator: Send + Sync {
    fn validate(
        &self,
        transaction: &Transaction,
        input_index: usize,
        prevouts: &[TxOut],
        witness: &Witness,
    ) -> bool;
}

/// receives fully signed coinjoins; must hand off without blocking
pub trait TransactionBroadcaster: Send + Sync {
    fn broadcast(&self, transaction: &Transaction);
}
