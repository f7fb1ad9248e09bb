//! coins, script types and their virtual sizes

use bitcoin::{Amount, OutPoint, Script, ScriptBuf, TxOut};

/// shared transaction overhead: version, locktime, counts and segwit marker
pub const SHARED_OVERHEAD_VSIZE: u64 = 11;

/// script types a round accepts for inputs and outputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptType {
    P2wpkh,
    P2tr,
}

impl ScriptType {
    pub fn from_script(script: &Script) -> Option<Self> {
        if script.is_p2wpkh() {
            Some(Self::P2wpkh)
        } else if script.is_p2tr() {
            Some(Self::P2tr)
        } else {
            None
        }
    }

    /// spent input, witness included
    pub fn input_vsize(&self) -> u64 {
        match self {
            Self::P2wpkh => 68,
            Self::P2tr => 58,
        }
    }

    pub fn output_vsize(&self) -> u64 {
        match self {
            Self::P2wpkh => 31,
            Self::P2tr => 43,
        }
    }
}

/// an unspent output offered as a round input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub txout: TxOut,
}

impl Coin {
    pub fn new(outpoint: OutPoint, amount: Amount, script_pubkey: ScriptBuf) -> Self {
        Self {
            outpoint,
            txout: TxOut {
                value: amount,
                script_pubkey,
            },
        }
    }

    pub fn amount(&self) -> Amount {
        self.txout.value
    }

    pub fn script_pubkey(&self) -> &Script {
        &self.txout.script_pubkey
    }

    pub fn script_type(&self) -> Option<ScriptType> {
        ScriptType::from_script(&self.txout.script_pubkey)
    }
}

/// proof that the registrant controls the coin's key, bound to one round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipProof(pub Vec<u8>);

impl AsRef<[u8]> for OwnershipProof {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::key::TweakedPublicKey;
    use bitcoin::secp256k1::XOnlyPublicKey;
    use bitcoin::WPubkeyHash;

    #[test]
    fn test_script_types() {
        let p2wpkh = ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([7; 20]));
        assert_eq!(ScriptType::from_script(&p2wpkh), Some(ScriptType::P2wpkh));

        let key = XOnlyPublicKey::from_slice(&[
            0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87,
            0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b,
            0x16, 0xf8, 0x17, 0x98,
        ])
        .unwrap();
        let p2tr = ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(key));
        assert_eq!(ScriptType::from_script(&p2tr), Some(ScriptType::P2tr));

        assert_eq!(ScriptType::from_script(&ScriptBuf::new()), None);
    }
}
