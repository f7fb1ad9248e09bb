//! Keyed-verification anonymous credentials (WabiSabi)
//!
//! Participants of a coinjoin round turn registered input value into
//! credentials, and later redeem them for outputs, without the coordinator
//! learning which input paid for which output.
//!
//! # Protocol
//!
//! ```text
//! client                                         issuer
//!   | -- zero request (k attributes, Ma = r·Gh) --> |
//!   | <-- k MACs + issuance proofs ---------------- |
//!   |                                               |
//!   | -- real request --------------------------->  |  check serials unused
//!   |    k presentations (Ca, Cx0, Cx1, CV, S)      |  verify show proofs
//!   |    k attributes Ma' + bit commitments         |  verify Σ presented + Δ = Σ requested
//!   |    public delta Δ                             |  verify each value in [0, 2ⁿ)
//!   | <-- k MACs + issuance proofs ---------------- |  record serials, balance += Δ
//! ```
//!
//! The issuer never sees a value. Range and balance are enforced by the
//! proofs, double spending by the serial number set.
//!
//! # Example
//!
//! ```ignore
//! let mut issuer = CredentialIssuer::new(CredentialIssuerSecretKey::random(&mut rng), b"round", 1 << 20)?;
//! let client = CredentialClient::new(*issuer.parameters(), b"round", 1 << 20)?;
//!
//! let (request, validation) = client.create_zero_request(&mut rng);
//! let response = issuer.request_zero_credentials(&request, &mut rng)?;
//! let zero = client.handle_response(&response, &validation)?;
//!
//! let (request, validation) = client.create_request(&[600, 400], &zero, &mut rng)?;
//! let response = issuer.request_real_credentials(&request, &mut rng)?;
//! let real = client.handle_response(&response, &validation)?;
//! ```

mod client;
mod credential;
mod error;
mod generators;
pub mod group;
mod issuer;
mod keys;
mod mac;
pub mod proof;
mod request;
mod serials;
mod statements;
pub mod transcript;

#[cfg(all(test, feature = "ristretto255"))]
mod tests;

pub use client::CredentialClient;
pub use credential::{Credential, CredentialPresentation};
pub use error::{CredentialError, Result};
pub use generators::Generators;
pub use group::{GroupElement, GroupScalar};
pub use issuer::{CredentialIssuer, VerifiedRequest};
pub use keys::{CredentialIssuerParameters, CredentialIssuerSecretKey};
pub use mac::Mac;
pub use request::{
    CredentialsResponse, CredentialsResponseValidation, IssuanceRequest, RealCredentialsRequest,
    ZeroCredentialsRequest,
};
pub use serials::{SerialNumber, SerialNumberSet};

#[cfg(feature = "ristretto255")]
pub use group::ristretto::Element;

/// credentials presented and requested per request
pub const CREDENTIAL_COUNT: usize = 2;

/// widest supported range proof
pub const MAX_RANGE_WIDTH: usize = 63;

/// bit width of the range proof for a requested maximum value
///
/// the enforced maximum becomes `2^width − 1`
pub fn range_width_for(max_value: u64) -> Result<usize> {
    let width = (u64::BITS - max_value.leading_zeros()) as usize;
    if width == 0 || width > MAX_RANGE_WIDTH {
        return Err(CredentialError::InvalidMaxValue(max_value));
    }
    Ok(width)
}
