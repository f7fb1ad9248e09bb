//! registered outputs

use bitcoin::{Amount, ScriptBuf, TxOut};
use wabisabi::SerialNumber;

use crate::coin::ScriptType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bob {
    pub script_pubkey: ScriptBuf,
    pub script_type: ScriptType,
    pub amount: Amount,
    /// serial numbers of the amount and vsize credentials redeemed for it
    pub redeemed: Vec<SerialNumber>,
}

impl Bob {
    pub fn txout(&self) -> TxOut {
        TxOut {
            value: self.amount,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}
