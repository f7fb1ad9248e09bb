//! round phases, end states and the events the arena reports

use core::fmt;

use bitcoin::{OutPoint, Transaction};

use crate::parameters::RoundId;

/// phases in the order a round moves through them
///
/// a round only ever moves forward, except for the explicit restart from
/// `ConnectionConfirmation` back to `InputRegistration` after unresponsive
/// alices were dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    InputRegistration,
    ConnectionConfirmation,
    OutputRegistration,
    TransactionSigning,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InputRegistration => "input-registration",
            Self::ConnectionConfirmation => "connection-confirmation",
            Self::OutputRegistration => "output-registration",
            Self::TransactionSigning => "transaction-signing",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// why a round ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndRoundState {
    Succeeded,
    NotEnoughInputs,
    NotAllAlicesConfirmed,
    NotAllAlicesSigned,
    NoOutputs,
    NotEnoughFees,
    /// an issuer or value-conservation invariant broke; never retried
    InvariantViolation,
}

impl EndRoundState {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for EndRoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::NotEnoughInputs => "not-enough-inputs",
            Self::NotAllAlicesConfirmed => "not-all-alices-confirmed",
            Self::NotAllAlicesSigned => "not-all-alices-signed",
            Self::NoOutputs => "no-outputs",
            Self::NotEnoughFees => "not-enough-fees",
            Self::InvariantViolation => "invariant-violation",
        };
        f.write_str(name)
    }
}

/// what happened during a tick or a mutating call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaEvent {
    RoundCreated {
        round_id: RoundId,
        blame_of: Option<RoundId>,
    },
    PhaseChanged {
        round_id: RoundId,
        from: Phase,
        to: Phase,
    },
    /// alices removed without penalty (keep-alive lapsed) or for not
    /// confirming in time
    InputsDropped {
        round_id: RoundId,
        inputs: Vec<OutPoint>,
    },
    InputsBanned {
        round_id: RoundId,
        inputs: Vec<OutPoint>,
    },
    RoundEnded {
        round_id: RoundId,
        end_state: EndRoundState,
    },
    TransactionFinalized {
        round_id: RoundId,
        transaction: Transaction,
    },
}

impl ArenaEvent {
    pub fn round_id(&self) -> &RoundId {
        match self {
            Self::RoundCreated { round_id, .. }
            | Self::PhaseChanged { round_id, .. }
            | Self::InputsDropped { round_id, .. }
            | Self::InputsBanned { round_id, .. }
            | Self::RoundEnded { round_id, .. }
            | Self::TransactionFinalized { round_id, .. } => round_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let phases = [
            Phase::InputRegistration,
            Phase::ConnectionConfirmation,
            Phase::OutputRegistration,
            Phase::TransactionSigning,
            Phase::Ended,
        ];
        assert!(phases.windows(2).all(|w| w[0] < w[1]));
    }
}
