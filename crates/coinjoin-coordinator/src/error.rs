//! arena errors and their stable reason codes

use bitcoin::OutPoint;
use thiserror::Error;
use wabisabi::CredentialError;

use crate::alice::AliceId;
use crate::parameters::RoundId;
use crate::phase::Phase;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("round is in {actual}, expected {expected}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("round has ended")]
    RoundEnded,

    #[error("phase deadline has passed")]
    DeadlinePassed,

    #[error("round is full")]
    RoundFull,

    #[error("script type not allowed")]
    ScriptNotAllowed,

    #[error("input amount {0} sat outside the allowed range")]
    InputAmountOutOfRange(u64),

    #[error("output amount {0} sat outside the allowed range")]
    OutputAmountOutOfRange(u64),

    #[error("output amount {0} sat is dust")]
    DustOutput(u64),

    #[error("input {0} is worth less than its fees")]
    UneconomicalInput(OutPoint),

    #[error("input {0} already registered")]
    InputAlreadyRegistered(OutPoint),

    #[error("input {0} is banned")]
    InputBanned(OutPoint),

    #[error("input {0} is not admitted to this blame round")]
    InputNotAdmitted(OutPoint),

    #[error("output script already registered")]
    ScriptAlreadyRegistered,

    #[error("ownership proof does not verify")]
    WrongOwnershipProof,

    #[error("alice not found: {0}")]
    AliceNotFound(AliceId),

    #[error("alice already confirmed")]
    AliceAlreadyConfirmed,

    #[error("alice has not confirmed")]
    AliceNotConfirmed,

    #[error("alice already signed")]
    AliceAlreadySigned,

    #[error("incorrect requested delta: expected {expected}, got {got}")]
    IncorrectRequestedDelta { expected: i64, got: i64 },

    #[error("witness does not verify")]
    InvalidWitness,

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("invariant violated, round {0} ended")]
    InvariantViolation(RoundId),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArenaError>;

/// stable, transport-friendly reason codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    RoundNotFound,
    WrongPhase,
    RoundEnded,
    DeadlinePassed,
    RoundFull,
    ScriptNotAllowed,
    InputAmountOutOfRange,
    OutputAmountOutOfRange,
    DustOutput,
    UneconomicalInput,
    InputAlreadyRegistered,
    InputBanned,
    InputNotAdmitted,
    ScriptAlreadyRegistered,
    WrongOwnershipProof,
    AliceNotFound,
    AliceAlreadyConfirmed,
    AliceNotConfirmed,
    AliceAlreadySigned,
    IncorrectRequestedDelta,
    InvalidWitness,
    InvalidCredentialRequest,
    CredentialAlreadySpent,
    CredentialValueOutOfRange,
    InvariantViolation,
    InvalidConfiguration,
}

impl ArenaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoundNotFound(_) => ErrorCode::RoundNotFound,
            Self::WrongPhase { .. } => ErrorCode::WrongPhase,
            Self::RoundEnded => ErrorCode::RoundEnded,
            Self::DeadlinePassed => ErrorCode::DeadlinePassed,
            Self::RoundFull => ErrorCode::RoundFull,
            Self::ScriptNotAllowed => ErrorCode::ScriptNotAllowed,
            Self::InputAmountOutOfRange(_) => ErrorCode::InputAmountOutOfRange,
            Self::OutputAmountOutOfRange(_) => ErrorCode::OutputAmountOutOfRange,
            Self::DustOutput(_) => ErrorCode::DustOutput,
            Self::UneconomicalInput(_) => ErrorCode::UneconomicalInput,
            Self::InputAlreadyRegistered(_) => ErrorCode::InputAlreadyRegistered,
            Self::InputBanned(_) => ErrorCode::InputBanned,
            Self::InputNotAdmitted(_) => ErrorCode::InputNotAdmitted,
            Self::ScriptAlreadyRegistered => ErrorCode::ScriptAlreadyRegistered,
            Self::WrongOwnershipProof => ErrorCode::WrongOwnershipProof,
            Self::AliceNotFound(_) => ErrorCode::AliceNotFound,
            Self::AliceAlreadyConfirmed => ErrorCode::AliceAlreadyConfirmed,
            Self::AliceNotConfirmed => ErrorCode::AliceNotConfirmed,
            Self::AliceAlreadySigned => ErrorCode::AliceAlreadySigned,
            Self::IncorrectRequestedDelta { .. } => ErrorCode::IncorrectRequestedDelta,
            Self::InvalidWitness => ErrorCode::InvalidWitness,
            Self::Credential(e) => match e {
                CredentialError::SerialNumberAlreadyUsed | CredentialError::DuplicateSerialNumber => {
                    ErrorCode::CredentialAlreadySpent
                }
                CredentialError::ValueOutOfRange { .. } => ErrorCode::CredentialValueOutOfRange,
                CredentialError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
                _ => ErrorCode::InvalidCredentialRequest,
            },
            Self::InvariantViolation(_) => ErrorCode::InvariantViolation,
            Self::Config(_) => ErrorCode::InvalidConfiguration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_codes() {
        assert_eq!(
            ArenaError::from(CredentialError::SerialNumberAlreadyUsed).code(),
            ErrorCode::CredentialAlreadySpent
        );
        assert_eq!(
            ArenaError::from(CredentialError::InvalidProof).code(),
            ErrorCode::InvalidCredentialRequest
        );
    }
}
