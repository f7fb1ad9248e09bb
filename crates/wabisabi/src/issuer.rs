//! credential issuer
//!
//! one issuer per round and domain (amount, vsize). the issuer never learns
//! credential values: it checks proofs, records serial numbers and keeps the
//! running sum of the public deltas it accepted.

use std::collections::HashSet;

use crate::error::{CredentialError, Result};
use crate::generators::Generators;
use crate::group::GroupElement;
use crate::keys::{CredentialIssuerParameters, CredentialIssuerSecretKey};
use crate::mac::Mac;
use crate::proof::{self, Statement};
use crate::request::{
    issuance_transcript, real_request_transcript, zero_request_transcript, CredentialsResponse,
    IssuanceRequest, RealCredentialsRequest, ZeroCredentialsRequest,
};
use crate::serials::{SerialNumber, SerialNumberSet};
use crate::statements;
use crate::{range_width_for, CREDENTIAL_COUNT};

/// a real request that passed verification, waiting to be committed
#[derive(Debug)]
pub struct VerifiedRequest<'a, P: GroupElement> {
    issuer: CredentialIssuerParameters<P>,
    request: &'a RealCredentialsRequest<P>,
    serials: Vec<SerialNumber>,
}

impl<P: GroupElement> VerifiedRequest<'_, P> {
    pub fn delta(&self) -> i64 {
        self.request.delta
    }
}

pub struct CredentialIssuer<P: GroupElement> {
    secret_key: CredentialIssuerSecretKey<P>,
    parameters: CredentialIssuerParameters<P>,
    generators: Generators<P>,
    context: Vec<u8>,
    range_width: usize,
    serial_numbers: SerialNumberSet,
    /// Σ accepted deltas: the value currently held by clients
    balance: i128,
}

impl<P: GroupElement> CredentialIssuer<P> {
    /// `max_value` is rounded up to `2^n − 1` for the smallest fitting `n`
    pub fn new(
        secret_key: CredentialIssuerSecretKey<P>,
        context: &[u8],
        max_value: u64,
    ) -> Result<Self> {
        let range_width = range_width_for(max_value)?;
        let generators = Generators::derive();
        let parameters = secret_key.compute_parameters(&generators);
        Ok(Self {
            secret_key,
            parameters,
            generators,
            context: context.to_vec(),
            range_width,
            serial_numbers: SerialNumberSet::new(),
            balance: 0,
        })
    }

    pub fn parameters(&self) -> &CredentialIssuerParameters<P> {
        &self.parameters
    }

    pub fn context(&self) -> &[u8] {
        &self.context
    }

    pub fn range_width(&self) -> usize {
        self.range_width
    }

    pub fn max_credential_value(&self) -> u64 {
        (1u64 << self.range_width) - 1
    }

    pub fn balance(&self) -> i128 {
        self.balance
    }

    pub fn spent_count(&self) -> usize {
        self.serial_numbers.len()
    }

    pub fn is_spent(&self, serial: &SerialNumber) -> bool {
        self.serial_numbers.contains(serial)
    }

    /// issue `k` credentials of value zero
    pub fn request_zero_credentials<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        request: &ZeroCredentialsRequest<P>,
        rng: &mut R,
    ) -> Result<CredentialsResponse<P>> {
        if request.requested.len() != CREDENTIAL_COUNT {
            return Err(CredentialError::InvalidRequestedCount {
                expected: CREDENTIAL_COUNT,
                got: request.requested.len(),
            });
        }
        for requested in &request.requested {
            if !requested.bit_commitments.is_empty() {
                return Err(CredentialError::InvalidBitCommitmentCount {
                    expected: 0,
                    got: requested.bit_commitments.len(),
                });
            }
        }

        let checks: Vec<Statement<P>> = request
            .requested
            .iter()
            .map(|r| statements::zero_statement(&self.generators, &r.ma))
            .collect();
        let mut transcript =
            zero_request_transcript(&self.context, &self.parameters, &request.requested);
        if !proof::verify(&mut transcript, &checks, &request.proofs) {
            return Err(CredentialError::InvalidProof);
        }

        Ok(self.issue(&request.requested, rng))
    }

    /// spend `k` presented credentials and issue `k` new ones whose values
    /// sum to `Σ presented + delta`
    ///
    /// nothing is mutated unless every check passes. a request that would
    /// drive the balance negative returns [`CredentialError::InvariantViolation`].
    pub fn request_real_credentials<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        request: &RealCredentialsRequest<P>,
        rng: &mut R,
    ) -> Result<CredentialsResponse<P>> {
        let verified = self.verify_real_request(request)?;
        self.issue_verified(verified, rng)
    }

    /// run every check of [`Self::request_real_credentials`] without
    /// touching issuer state
    ///
    /// callers holding two issuers verify both requests first, then commit
    /// both with [`Self::issue_verified`].
    pub fn verify_real_request<'a>(
        &self,
        request: &'a RealCredentialsRequest<P>,
    ) -> Result<VerifiedRequest<'a, P>> {
        if request.presented.len() != CREDENTIAL_COUNT {
            return Err(CredentialError::InvalidPresentedCount {
                expected: CREDENTIAL_COUNT,
                got: request.presented.len(),
            });
        }
        if request.requested.len() != CREDENTIAL_COUNT {
            return Err(CredentialError::InvalidRequestedCount {
                expected: CREDENTIAL_COUNT,
                got: request.requested.len(),
            });
        }
        for requested in &request.requested {
            if requested.bit_commitments.len() != self.range_width {
                return Err(CredentialError::InvalidBitCommitmentCount {
                    expected: self.range_width,
                    got: requested.bit_commitments.len(),
                });
            }
        }

        let serials = request.serial_numbers();
        let mut seen = HashSet::with_capacity(serials.len());
        for serial in &serials {
            if !seen.insert(*serial) {
                return Err(CredentialError::DuplicateSerialNumber);
            }
            if self.serial_numbers.contains(serial) {
                return Err(CredentialError::SerialNumberAlreadyUsed);
            }
        }

        let mut checks = Vec::with_capacity(2 * CREDENTIAL_COUNT + 1);
        for presentation in &request.presented {
            let z = self.secret_key.presentation_z(
                &self.generators,
                &presentation.cx0,
                &presentation.cx1,
                &presentation.ca,
                &presentation.cv,
            );
            checks.push(statements::presentation_statement(
                &self.generators,
                &self.parameters,
                presentation,
                &z,
            ));
        }
        let presented_ca: Vec<P> = request.presented.iter().map(|p| p.ca).collect();
        let requested_ma: Vec<P> = request.requested.iter().map(|r| r.ma).collect();
        let commitment = statements::balance_commitment(
            &self.generators,
            &presented_ca,
            &requested_ma,
            request.delta,
        );
        checks.push(statements::balance_statement(&self.generators, commitment));
        for requested in &request.requested {
            checks.push(statements::range_statement(
                &self.generators,
                &requested.ma,
                &requested.bit_commitments,
            ));
        }

        let mut transcript = real_request_transcript(
            &self.context,
            &self.parameters,
            request.delta,
            &request.presented,
            &request.requested,
        );
        if !proof::verify(&mut transcript, &checks, &request.proofs) {
            return Err(CredentialError::InvalidProof);
        }

        self.check_balance(request.delta)?;

        Ok(VerifiedRequest {
            issuer: self.parameters,
            request,
            serials,
        })
    }

    /// commit a request accepted by [`Self::verify_real_request`]
    ///
    /// serials and balance are checked again, so a request verified against
    /// an older state cannot slip through.
    pub fn issue_verified<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        verified: VerifiedRequest<'_, P>,
        rng: &mut R,
    ) -> Result<CredentialsResponse<P>> {
        if verified.issuer != self.parameters {
            return Err(CredentialError::IssuerMismatch);
        }
        if verified
            .serials
            .iter()
            .any(|s| self.serial_numbers.contains(s))
        {
            return Err(CredentialError::SerialNumberAlreadyUsed);
        }
        let balance = self.check_balance(verified.request.delta)?;

        for serial in verified.serials {
            self.serial_numbers.insert(serial);
        }
        self.balance = balance;

        Ok(self.issue(&verified.request.requested, rng))
    }

    fn check_balance(&self, delta: i64) -> Result<i128> {
        let balance = self.balance + i128::from(delta);
        if balance < 0 {
            return Err(CredentialError::InvariantViolation {
                balance: self.balance,
                delta,
            });
        }
        Ok(balance)
    }

    fn issue<R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        requested: &[IssuanceRequest<P>],
        rng: &mut R,
    ) -> CredentialsResponse<P> {
        let attributes: Vec<P> = requested.iter().map(|r| r.ma).collect();
        let macs: Vec<Mac<P>> = attributes
            .iter()
            .map(|ma| self.secret_key.compute_mac(&self.generators, ma, rng))
            .collect();
        let knowledge: Vec<_> = attributes
            .iter()
            .zip(&macs)
            .map(|(ma, mac)| {
                statements::issuance_knowledge(
                    &self.generators,
                    &self.parameters,
                    &self.secret_key,
                    mac,
                    ma,
                )
            })
            .collect();

        let mut transcript =
            issuance_transcript(&self.context, &self.parameters, &attributes, &macs);
        let proofs = proof::prove(&mut transcript, &knowledge, rng);
        CredentialsResponse { macs, proofs }
    }
}

impl<P: GroupElement> core::fmt::Debug for CredentialIssuer<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("range_width", &self.range_width)
            .field("spent", &self.serial_numbers.len())
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}
