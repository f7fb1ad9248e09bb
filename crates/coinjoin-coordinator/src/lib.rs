//! coinjoin coordinator
//!
//! rounds move through input registration, connection confirmation, output
//! registration and transaction signing. alices register coins and receive
//! zero credentials, exchange them for real credentials worth their input's
//! effective value, and bobs redeem those credentials for outputs without
//! revealing which input paid for them.
//!
//! ```text
//!  InputRegistration ──▶ ConnectionConfirmation ──▶ OutputRegistration ──▶ TransactionSigning ──▶ Ended
//!          ▲                      │
//!          └──── restart ─────────┘  (unconfirmed alices dropped)
//! ```
//!
//! the [`Arena`] owns all rounds and is the only entry point; its
//! [`Arena::tick`] enforces every deadline. stalled rounds ban their culprits
//! and spawn blame rounds that admit only the named inputs.

pub mod alice;
pub mod arena;
pub mod bob;
pub mod coin;
pub mod coinjoin;
pub mod config;
pub mod error;
pub mod external;
pub mod idempotency;
pub mod parameters;
pub mod phase;
pub mod prison;
pub mod round;
pub mod verification;


pub use alice::{Alice, AliceId};
pub use arena::{Applied, Arena};
pub use bob::Bob;
pub use coin::{Coin, OwnershipProof, ScriptType};
pub use coinjoin::CoinjoinState;
pub use config::{ArenaConfig, RoundConfig};
pub use error::{ArenaError, ErrorCode, Result};
pub use external::{OwnershipVerifier, TransactionBroadcaster, WitnessValidator};
pub use idempotency::IdempotencyCache;
pub use parameters::{AmountRange, CoordinationFeeRate, PhaseTimeouts, RoundId, RoundParameters};
pub use phase::{ArenaEvent, EndRoundState, Phase};
pub use prison::{Offence, Prison};
pub use round::{
    ConnectionConfirmationResponse, InputRegistrationResponse, OutputRegistrationResponse, Round,
    RoundState,
};
pub use verification::{ownership_message, Secp256k1OwnershipVerifier, Secp256k1WitnessValidator};
