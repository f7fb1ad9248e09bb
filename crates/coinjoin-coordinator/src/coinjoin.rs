//! assembly of the joint transaction and witness collection

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::alice::Alice;
use crate::bob::Bob;
use crate::coin::{ScriptType, SHARED_OVERHEAD_VSIZE};
use crate::parameters::{estimated_vsize, RoundParameters};
use crate::phase::EndRoundState;

/// unsigned coinjoin plus the witnesses collected so far
#[derive(Clone, Debug)]
pub struct CoinjoinState {
    transaction: Transaction,
    prevouts: Vec<TxOut>,
    witnesses: Vec<Option<Witness>>,
    estimated_vsize: u64,
}

impl CoinjoinState {
    /// build the transaction from confirmed alices and registered bobs
    ///
    /// inputs are ordered by outpoint, outputs by value (largest first) then
    /// script. collected coordination fees go to the coordinator script when
    /// what is left after paying for that output and the shared overhead is
    /// above dust. participants only ever pay for their own inputs and
    /// outputs, so the fee check covers the overhead only when the coordinator
    /// output exists.
    pub(crate) fn construct(
        parameters: &RoundParameters,
        alices: &[Alice],
        bobs: &[Bob],
    ) -> Result<Self, EndRoundState> {
        if bobs.is_empty() {
            return Err(EndRoundState::NoOutputs);
        }

        let mut inputs: Vec<&Alice> = alices.iter().collect();
        inputs.sort_by_key(|a| a.outpoint());

        let mut outputs: Vec<(TxOut, ScriptType)> =
            bobs.iter().map(|b| (b.txout(), b.script_type)).collect();

        let collected: u64 = alices
            .iter()
            .map(|a| parameters.coordination_fee_rate.fee(a.coin.amount()).to_sat())
            .sum();
        let coordinator = coordinator_output(parameters, collected);
        // nobody is charged for the shared overhead unless the coordinator
        // output pays for it
        let unpaid_overhead = if coordinator.is_some() {
            0
        } else {
            SHARED_OVERHEAD_VSIZE
        };
        outputs.extend(coordinator);
        outputs.sort_by(|(a, _), (b, _)| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.script_pubkey.as_bytes().cmp(b.script_pubkey.as_bytes()))
        });

        let input_types: Vec<ScriptType> = inputs.iter().map(|a| a.script_type).collect();
        let output_types: Vec<ScriptType> = outputs.iter().map(|(_, t)| *t).collect();
        let vsize = estimated_vsize(&input_types, &output_types);

        let total_in: u64 = inputs.iter().map(|a| a.coin.amount().to_sat()).sum();
        let total_out: u64 = outputs.iter().map(|(o, _)| o.value.to_sat()).sum();
        let fee = match total_in.checked_sub(total_out) {
            Some(fee) => fee,
            None => return Err(EndRoundState::InvariantViolation),
        };
        if Amount::from_sat(fee) < parameters.mining_fee(vsize - unpaid_overhead) {
            return Err(EndRoundState::NotEnoughFees);
        }

        let transaction = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs
                .iter()
                .map(|a| TxIn {
                    previous_output: a.outpoint(),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs.into_iter().map(|(o, _)| o).collect(),
        };

        Ok(Self {
            prevouts: inputs.iter().map(|a| a.coin.txout.clone()).collect(),
            witnesses: vec![None; transaction.input.len()],
            transaction,
            estimated_vsize: vsize,
        })
    }

    pub fn unsigned_transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// spent outputs, in input order
    pub fn prevouts(&self) -> &[TxOut] {
        &self.prevouts
    }

    pub fn estimated_vsize(&self) -> u64 {
        self.estimated_vsize
    }

    pub fn fee(&self) -> Amount {
        let total_in: u64 = self.prevouts.iter().map(|o| o.value.to_sat()).sum();
        let total_out: u64 = self.transaction.output.iter().map(|o| o.value.to_sat()).sum();
        Amount::from_sat(total_in.saturating_sub(total_out))
    }

    pub fn input_index(&self, outpoint: &OutPoint) -> Option<usize> {
        self.transaction
            .input
            .iter()
            .position(|i| i.previous_output == *outpoint)
    }

    pub fn is_signed(&self, index: usize) -> bool {
        matches!(self.witnesses.get(index), Some(Some(_)))
    }

    pub(crate) fn add_witness(&mut self, index: usize, witness: Witness) {
        if let Some(slot) = self.witnesses.get_mut(index) {
            *slot = Some(witness);
        }
    }

    pub fn is_fully_signed(&self) -> bool {
        self.witnesses.iter().all(Option::is_some)
    }

    pub fn unsigned_inputs(&self) -> Vec<OutPoint> {
        self.transaction
            .input
            .iter()
            .zip(&self.witnesses)
            .filter(|(_, w)| w.is_none())
            .map(|(i, _)| i.previous_output)
            .collect()
    }

    /// the transaction with every collected witness in place
    pub fn signed_transaction(&self) -> Transaction {
        let mut transaction = self.transaction.clone();
        for (input, witness) in transaction.input.iter_mut().zip(&self.witnesses) {
            if let Some(witness) = witness {
                input.witness = witness.clone();
            }
        }
        transaction
    }
}

fn coordinator_output(parameters: &RoundParameters, collected: u64) -> Option<(TxOut, ScriptType)> {
    let script_type = ScriptType::from_script(&parameters.coordinator_script)?;
    let cost = parameters
        .mining_fee(script_type.output_vsize() + SHARED_OVERHEAD_VSIZE)
        .to_sat();
    let value = collected.checked_sub(cost)?;
    let value = Amount::from_sat(value);
    if value < parameters.coordinator_script.minimal_non_dust() {
        return None;
    }
    Some((
        TxOut {
            value,
            script_pubkey: parameters.coordinator_script.clone(),
        },
        script_type,
    ))
}
