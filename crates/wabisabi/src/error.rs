//! credential protocol errors

use thiserror::Error;

pub type Result<T> = core::result::Result<T, CredentialError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("expected {expected} presented credentials, got {got}")]
    InvalidPresentedCount { expected: usize, got: usize },

    #[error("expected {expected} requested credentials, got {got}")]
    InvalidRequestedCount { expected: usize, got: usize },

    #[error("expected {expected} bit commitments per requested credential, got {got}")]
    InvalidBitCommitmentCount { expected: usize, got: usize },

    #[error("serial number presented twice in one request")]
    DuplicateSerialNumber,

    #[error("credential already spent")]
    SerialNumberAlreadyUsed,

    #[error("credential request proof verification failed")]
    InvalidProof,

    #[error("issuance proof verification failed")]
    InvalidIssuanceProof,

    #[error("credential value {value} exceeds maximum {max}")]
    ValueOutOfRange { value: u64, max: u64 },

    #[error("balance delta does not fit in 64 bits")]
    DeltaOverflow,

    #[error("invalid maximum credential value: {0}")]
    InvalidMaxValue(u64),

    #[error("response does not match the request it answers")]
    ResponseMismatch,

    #[error("verified request belongs to a different issuer")]
    IssuerMismatch,

    #[error("issuer balance would become negative: {balance} + {delta}")]
    InvariantViolation { balance: i128, delta: i64 },
}
