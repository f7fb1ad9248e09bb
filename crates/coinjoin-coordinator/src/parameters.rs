//! immutable per-round parameters and round ids

use core::fmt;
use std::time::Duration;

use bitcoin::{Amount, FeeRate, OutPoint, ScriptBuf};
use sha2::{Digest, Sha256};

use crate::coin::{Coin, ScriptType, SHARED_OVERHEAD_VSIZE};
use crate::config::RoundConfig;
use crate::error::{ArenaError, Result};

/// domain separator for round id derivation
const ROUND_ID_DOMAIN: &[u8] = b"coinjoin.round-id.v1";

/// round identifier: hash of parameters, a random salt and the round it
/// retries, if any
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(pub [u8; 32]);

impl RoundId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// credential transcript context for one issuer of this round
    pub fn credential_context(&self, domain: &[u8]) -> Vec<u8> {
        let mut context = Vec::with_capacity(32 + domain.len());
        context.extend_from_slice(&self.0);
        context.extend_from_slice(domain);
        context
    }

    pub fn amount_context(&self) -> Vec<u8> {
        self.credential_context(b"amount")
    }

    pub fn vsize_context(&self) -> Vec<u8> {
        self.credential_context(b"vsize")
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoundId({})", hex::encode(&self.0[..8]))
    }
}

/// inclusive amount bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountRange {
    pub min: Amount,
    pub max: Amount,
}

impl AmountRange {
    pub fn contains(&self, amount: Amount) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// coordination fee in parts per million of each input's amount, waived for
/// small inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinationFeeRate {
    pub ppm: u64,
    pub plebs_dont_pay_threshold: Amount,
}

impl CoordinationFeeRate {
    pub fn fee(&self, amount: Amount) -> Amount {
        if amount <= self.plebs_dont_pay_threshold {
            return Amount::ZERO;
        }
        let fee = u128::from(amount.to_sat()) * u128::from(self.ppm) / 1_000_000;
        Amount::from_sat(fee as u64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTimeouts {
    pub input_registration: Duration,
    /// also the keep-alive window of alices during input registration
    pub connection_confirmation: Duration,
    pub output_registration: Duration,
    pub transaction_signing: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundParameters {
    pub mining_fee_rate: FeeRate,
    pub coordination_fee_rate: CoordinationFeeRate,
    pub allowed_input_amounts: AmountRange,
    pub allowed_output_amounts: AmountRange,
    /// advisory ceiling published to clients for coin selection; the round
    /// itself only enforces `allowed_input_amounts`
    pub max_suggested_amount: Amount,
    pub max_vsize_allocation_per_alice: u64,
    pub min_input_count: usize,
    pub max_input_count: usize,
    pub max_confirmation_restarts: u32,
    pub timeouts: PhaseTimeouts,
    pub coordinator_script: ScriptBuf,
}

impl RoundParameters {
    pub fn from_config(config: &RoundConfig) -> Result<Self> {
        let mining_fee_rate = FeeRate::from_sat_per_vb(config.mining_fee_rate_sat_vb)
            .ok_or_else(|| ArenaError::Config("mining fee rate overflows".into()))?;
        let script = hex::decode(&config.coordinator_script)
            .map_err(|e| ArenaError::Config(format!("coordinator_script: {}", e)))?;

        let parameters = Self {
            mining_fee_rate,
            coordination_fee_rate: CoordinationFeeRate {
                ppm: config.coordination_fee_ppm,
                plebs_dont_pay_threshold: Amount::from_sat(config.plebs_dont_pay_threshold_sat),
            },
            allowed_input_amounts: AmountRange {
                min: Amount::from_sat(config.min_input_amount_sat),
                max: Amount::from_sat(config.max_input_amount_sat),
            },
            allowed_output_amounts: AmountRange {
                min: Amount::from_sat(config.min_output_amount_sat),
                max: Amount::from_sat(config.max_output_amount_sat),
            },
            max_suggested_amount: Amount::from_sat(config.max_suggested_amount_sat),
            max_vsize_allocation_per_alice: config.max_vsize_allocation_per_alice,
            min_input_count: config.min_input_count,
            max_input_count: config.max_input_count,
            max_confirmation_restarts: config.max_confirmation_restarts,
            timeouts: PhaseTimeouts {
                input_registration: Duration::from_secs(config.input_registration_timeout_secs),
                connection_confirmation: Duration::from_secs(
                    config.connection_confirmation_timeout_secs,
                ),
                output_registration: Duration::from_secs(config.output_registration_timeout_secs),
                transaction_signing: Duration::from_secs(config.transaction_signing_timeout_secs),
            },
            coordinator_script: ScriptBuf::from_bytes(script),
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(ArenaError::Config(msg.to_string()));

        if self.allowed_input_amounts.min > self.allowed_input_amounts.max {
            return fail("input amount range is empty");
        }
        if self.allowed_output_amounts.min > self.allowed_output_amounts.max {
            return fail("output amount range is empty");
        }
        if self.allowed_input_amounts.max > Amount::MAX_MONEY {
            return fail("maximum input amount exceeds the money supply");
        }
        if self.allowed_output_amounts.max > Amount::MAX_MONEY {
            return fail("maximum output amount exceeds the money supply");
        }
        if self.max_suggested_amount > self.allowed_input_amounts.max {
            return fail("max suggested amount exceeds maximum input amount");
        }
        if self.coordination_fee_rate.ppm > 1_000_000 {
            return fail("coordination fee above 100%");
        }
        if self.min_input_count == 0 || self.min_input_count > self.max_input_count {
            return fail("input count bounds are inconsistent");
        }
        let largest_input = ScriptType::P2wpkh
            .input_vsize()
            .max(ScriptType::P2tr.input_vsize());
        if self.max_vsize_allocation_per_alice < largest_input {
            return fail("vsize allocation does not cover a single input");
        }
        if ScriptType::from_script(&self.coordinator_script).is_none() {
            return fail("coordinator script must be p2wpkh or p2tr");
        }
        Ok(())
    }

    /// same parameters with a different input registration window
    pub fn for_blame_round(&self, input_registration_timeout: Duration) -> Self {
        let mut parameters = self.clone();
        parameters.timeouts.input_registration = input_registration_timeout;
        parameters
    }

    /// largest value an amount credential can carry
    pub fn max_amount_credential_value(&self) -> u64 {
        self.allowed_input_amounts.max.to_sat()
    }

    pub fn max_vsize_credential_value(&self) -> u64 {
        self.max_vsize_allocation_per_alice
    }

    pub fn mining_fee(&self, vsize: u64) -> Amount {
        self.mining_fee_rate.fee_vb(vsize).unwrap_or(Amount::MAX_MONEY)
    }

    /// `amount − mining fee − coordination fee`; negative when uneconomical
    pub fn effective_value(&self, coin: &Coin, script_type: ScriptType) -> i64 {
        let amount = coin.amount().to_sat() as i64;
        let mining = self.mining_fee(script_type.input_vsize()).to_sat() as i64;
        let coordination = self.coordination_fee_rate.fee(coin.amount()).to_sat() as i64;
        amount - mining - coordination
    }

    /// vsize budget left to an alice after paying for her own input
    pub fn vsize_credential_value(&self, script_type: ScriptType) -> i64 {
        self.max_vsize_allocation_per_alice as i64 - script_type.input_vsize() as i64
    }

    /// amount credentials an output consumes: its value plus its mining fee
    ///
    /// `None` when the cost does not fit a credential delta
    pub fn output_cost(&self, amount: Amount, script_type: ScriptType) -> Option<i64> {
        let fee = self.mining_fee(script_type.output_vsize());
        let cost = amount.checked_add(fee)?;
        i64::try_from(cost.to_sat()).ok()
    }

    pub(crate) fn round_id(&self, salt: &[u8; 32], blame_of: Option<&RoundId>) -> RoundId {
        let mut hasher = Sha256::new();
        hasher.update(ROUND_ID_DOMAIN);
        hasher.update(self.mining_fee_rate.to_sat_per_kwu().to_le_bytes());
        hasher.update(self.coordination_fee_rate.ppm.to_le_bytes());
        hasher.update(self.coordination_fee_rate.plebs_dont_pay_threshold.to_sat().to_le_bytes());
        for range in [self.allowed_input_amounts, self.allowed_output_amounts] {
            hasher.update(range.min.to_sat().to_le_bytes());
            hasher.update(range.max.to_sat().to_le_bytes());
        }
        hasher.update(self.max_suggested_amount.to_sat().to_le_bytes());
        hasher.update(self.max_vsize_allocation_per_alice.to_le_bytes());
        hasher.update((self.min_input_count as u64).to_le_bytes());
        hasher.update((self.max_input_count as u64).to_le_bytes());
        hasher.update(self.max_confirmation_restarts.to_le_bytes());
        for timeout in [
            self.timeouts.input_registration,
            self.timeouts.connection_confirmation,
            self.timeouts.output_registration,
            self.timeouts.transaction_signing,
        ] {
            hasher.update(timeout.as_secs().to_le_bytes());
        }
        hasher.update((self.coordinator_script.len() as u64).to_le_bytes());
        hasher.update(self.coordinator_script.as_bytes());
        hasher.update(salt);
        match blame_of {
            Some(original) => {
                hasher.update([1u8]);
                hasher.update(original.0);
            }
            None => hasher.update([0u8]),
        }
        RoundId(hasher.finalize().into())
    }
}

/// sorted view of a set of outpoints, for logging and events
pub(crate) fn sorted_outpoints<'a>(outpoints: impl IntoIterator<Item = &'a OutPoint>) -> Vec<OutPoint> {
    let mut sorted: Vec<OutPoint> = outpoints.into_iter().copied().collect();
    sorted.sort();
    sorted
}

/// vsize of the full transaction for the given inputs and outputs
pub(crate) fn estimated_vsize(inputs: &[ScriptType], outputs: &[ScriptType]) -> u64 {
    SHARED_OVERHEAD_VSIZE
        + inputs.iter().map(|t| t.input_vsize()).sum::<u64>()
        + outputs.iter().map(|t| t.output_vsize()).sum::<u64>()
}
