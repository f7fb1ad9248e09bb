//! registered inputs

use core::fmt;

use tokio::time::Instant;

use crate::coin::{Coin, OwnershipProof, ScriptType};

/// secret handle an alice uses for every later call
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliceId(pub [u8; 32]);

impl AliceId {
    pub fn random<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for AliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for AliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AliceId({})", self)
    }
}

#[derive(Clone, Debug)]
pub struct Alice {
    pub id: AliceId,
    pub coin: Coin,
    pub script_type: ScriptType,
    pub ownership_proof: OwnershipProof,
    pub registered_at: Instant,
    /// keep-alive deadline while the round is still registering inputs
    pub deadline: Instant,
    pub confirmed: bool,
    pub ready_to_sign: bool,
    /// amount credential value granted at confirmation
    pub amount_credential_value: i64,
    /// vsize credential value granted at confirmation
    pub vsize_credential_value: i64,
}

impl Alice {
    pub fn outpoint(&self) -> bitcoin::OutPoint {
        self.coin.outpoint
    }
}
