//! coordinator configuration, loaded from TOML
//!
//! ```toml
//! tick_interval_secs = 1
//! blame_input_registration_timeout_secs = 180
//! ban_duration_secs = 86400
//! ended_round_retention_secs = 600
//!
//! [round]
//! mining_fee_rate_sat_vb = 2
//! coordination_fee_ppm = 3000
//! plebs_dont_pay_threshold_sat = 1000000
//! min_input_amount_sat = 5000
//! max_input_amount_sat = 4300000000000
//! min_output_amount_sat = 5000
//! max_output_amount_sat = 4300000000000
//! max_suggested_amount_sat = 10000000000
//! max_vsize_allocation_per_alice = 255
//! min_input_count = 5
//! max_input_count = 100
//! max_confirmation_restarts = 1
//! input_registration_timeout_secs = 3600
//! connection_confirmation_timeout_secs = 60
//! output_registration_timeout_secs = 60
//! transaction_signing_timeout_secs = 60
//! coordinator_script = "0014..."
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ArenaError, Result};

fn default_tick_interval() -> u64 {
    1
}

fn default_ended_round_retention() -> u64 {
    600
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArenaConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// input registration window of blame rounds
    pub blame_input_registration_timeout_secs: u64,

    /// how long inputs that stalled a round stay out of standard rounds
    pub ban_duration_secs: u64,

    /// how long ended rounds stay queryable
    #[serde(default = "default_ended_round_retention")]
    pub ended_round_retention_secs: u64,

    /// template for standard rounds
    pub round: RoundConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RoundConfig {
    pub mining_fee_rate_sat_vb: u64,
    pub coordination_fee_ppm: u64,
    pub plebs_dont_pay_threshold_sat: u64,
    pub min_input_amount_sat: u64,
    pub max_input_amount_sat: u64,
    pub min_output_amount_sat: u64,
    pub max_output_amount_sat: u64,
    pub max_suggested_amount_sat: u64,
    pub max_vsize_allocation_per_alice: u64,
    pub min_input_count: usize,
    pub max_input_count: usize,
    /// how often a round may fall back to input registration after dropping
    /// unconfirmed alices; no default on purpose
    pub max_confirmation_restarts: u32,
    pub input_registration_timeout_secs: u64,
    pub connection_confirmation_timeout_secs: u64,
    pub output_registration_timeout_secs: u64,
    pub transaction_signing_timeout_secs: u64,
    /// hex-encoded scriptPubKey receiving coordination fees
    pub coordinator_script: String,
}

impl ArenaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ArenaError::Config(e.to_string()))?;
        if config.tick_interval_secs == 0 {
            return Err(ArenaError::Config("tick_interval_secs must be positive".into()));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ArenaError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn blame_input_registration_timeout(&self) -> Duration {
        Duration::from_secs(self.blame_input_registration_timeout_secs)
    }

    pub fn ban_duration(&self) -> Duration {
        Duration::from_secs(self.ban_duration_secs)
    }

    pub fn ended_round_retention(&self) -> Duration {
        Duration::from_secs(self.ended_round_retention_secs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EXAMPLE: &str = r#"
        blame_input_registration_timeout_secs = 120
        ban_duration_secs = 86400

        [round]
        mining_fee_rate_sat_vb = 1
        coordination_fee_ppm = 20000
        plebs_dont_pay_threshold_sat = 1000000
        min_input_amount_sat = 5000
        max_input_amount_sat = 100000000
        min_output_amount_sat = 5000
        max_output_amount_sat = 100000000
        max_suggested_amount_sat = 100000000
        max_vsize_allocation_per_alice = 255
        min_input_count = 2
        max_input_count = 10
        max_confirmation_restarts = 1
        input_registration_timeout_secs = 600
        connection_confirmation_timeout_secs = 60
        output_registration_timeout_secs = 60
        transaction_signing_timeout_secs = 60
        coordinator_script = "00140101010101010101010101010101010101010101"
    "#;

    #[test]
    fn test_parse_example() {
        let config = ArenaConfig::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.ended_round_retention_secs, 600);
        assert_eq!(config.round.max_confirmation_restarts, 1);
        assert_eq!(config.round.coordination_fee_ppm, 20_000);
    }

    #[test]
    fn test_daemon_config_parses() {
        let config =
            ArenaConfig::from_toml_str(include_str!("../../bin/coordinatord/coordinator.toml"))
                .unwrap();
        crate::parameters::RoundParameters::from_config(&config.round).unwrap();
    }

    #[test]
    fn test_confirmation_restarts_required() {
        let without = EXAMPLE.replace("max_confirmation_restarts = 1", "");
        assert!(matches!(
            ArenaConfig::from_toml_str(&without),
            Err(ArenaError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let extra = format!("{}\nsurprise = true\n", EXAMPLE);
        assert!(ArenaConfig::from_toml_str(&extra).is_err());
    }
}
