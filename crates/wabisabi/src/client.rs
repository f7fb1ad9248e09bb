//! credential client
//!
//! builds requests for an issuer whose public parameters it knows and turns
//! verified responses into credentials

use crate::credential::Credential;
use crate::error::{CredentialError, Result};
use crate::generators::Generators;
use crate::group::{GroupElement, GroupScalar};
use crate::keys::CredentialIssuerParameters;
use crate::proof::{self, Knowledge, Statement};
use crate::request::{
    issuance_transcript, real_request_transcript, zero_request_transcript, CredentialsResponse,
    CredentialsResponseValidation, IssuanceRequest, RealCredentialsRequest, RequestedCredential,
    ZeroCredentialsRequest,
};
use crate::statements;
use crate::{range_width_for, CREDENTIAL_COUNT};

#[derive(Clone, Debug)]
pub struct CredentialClient<P: GroupElement> {
    parameters: CredentialIssuerParameters<P>,
    generators: Generators<P>,
    context: Vec<u8>,
    range_width: usize,
}

impl<P: GroupElement> CredentialClient<P> {
    pub fn new(
        parameters: CredentialIssuerParameters<P>,
        context: &[u8],
        max_value: u64,
    ) -> Result<Self> {
        Ok(Self {
            parameters,
            generators: Generators::derive(),
            context: context.to_vec(),
            range_width: range_width_for(max_value)?,
        })
    }

    pub fn max_credential_value(&self) -> u64 {
        (1u64 << self.range_width) - 1
    }

    pub fn create_zero_request<R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        rng: &mut R,
    ) -> (ZeroCredentialsRequest<P>, CredentialsResponseValidation<P>) {
        let mut requested = Vec::with_capacity(CREDENTIAL_COUNT);
        let mut issuance = Vec::with_capacity(CREDENTIAL_COUNT);
        let mut knowledge = Vec::with_capacity(CREDENTIAL_COUNT);
        for _ in 0..CREDENTIAL_COUNT {
            let randomness = P::Scalar::random(rng);
            let ma = self.generators.gh.mul_scalar(&randomness);
            knowledge.push(statements::zero_knowledge(&self.generators, &ma, randomness));
            requested.push(RequestedCredential {
                value: 0,
                randomness,
                ma,
            });
            issuance.push(IssuanceRequest {
                ma,
                bit_commitments: Vec::new(),
            });
        }

        let mut transcript = zero_request_transcript(&self.context, &self.parameters, &issuance);
        let proofs = proof::prove(&mut transcript, &knowledge, rng);

        (
            ZeroCredentialsRequest {
                requested: issuance,
                proofs,
            },
            CredentialsResponseValidation {
                requested,
                presented: Vec::new(),
            },
        )
    }

    /// present `presented` and request credentials worth `amounts`; the
    /// public delta is `Σ amounts − Σ presented`
    pub fn create_request<R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        amounts: &[u64],
        presented: &[Credential<P>],
        rng: &mut R,
    ) -> Result<(RealCredentialsRequest<P>, CredentialsResponseValidation<P>)> {
        if amounts.len() != CREDENTIAL_COUNT {
            return Err(CredentialError::InvalidRequestedCount {
                expected: CREDENTIAL_COUNT,
                got: amounts.len(),
            });
        }
        if presented.len() != CREDENTIAL_COUNT {
            return Err(CredentialError::InvalidPresentedCount {
                expected: CREDENTIAL_COUNT,
                got: presented.len(),
            });
        }
        let max = self.max_credential_value();
        if let Some(&value) = amounts.iter().find(|&&a| a > max) {
            return Err(CredentialError::ValueOutOfRange { value, max });
        }

        let requested_sum: i128 = amounts.iter().map(|&a| i128::from(a)).sum();
        let presented_sum: i128 = presented.iter().map(|c| i128::from(c.value())).sum();
        let delta =
            i64::try_from(requested_sum - presented_sum).map_err(|_| CredentialError::DeltaOverflow)?;

        let scalars: Vec<P::Scalar> = amounts.iter().map(|&a| P::Scalar::from_u64(a)).collect();
        Ok(self.real_request_from_scalars(&scalars, amounts, presented, delta, rng))
    }

    /// build a real request for arbitrary requested scalars; out-of-range
    /// scalars produce a request whose range proof does not verify
    pub(crate) fn real_request_from_scalars<R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        scalars: &[P::Scalar],
        values: &[u64],
        presented: &[Credential<P>],
        delta: i64,
        rng: &mut R,
    ) -> (RealCredentialsRequest<P>, CredentialsResponseValidation<P>) {
        let mut knowledge: Vec<Knowledge<P>> = Vec::with_capacity(2 * CREDENTIAL_COUNT + 1);
        let mut presentations = Vec::with_capacity(presented.len());
        let mut z_sum = P::Scalar::zero();
        let mut randomness_delta = P::Scalar::zero();

        for credential in presented {
            let z = P::Scalar::random(rng);
            let presentation = credential.present(&self.generators, z);
            knowledge.push(statements::presentation_knowledge(
                &self.generators,
                &self.parameters,
                &presentation,
                z,
                credential.mac().t,
                credential.value(),
                *credential.randomness(),
            ));
            z_sum = z_sum.add(&z);
            randomness_delta = randomness_delta.add(credential.randomness());
            presentations.push(presentation);
        }

        let mut requested = Vec::with_capacity(scalars.len());
        let mut issuance = Vec::with_capacity(scalars.len());
        let mut range_knowledge = Vec::with_capacity(scalars.len());
        for (scalar, &value) in scalars.iter().zip(values) {
            let randomness = P::Scalar::random(rng);
            let ma = P::multiscalar_mul(
                &[*scalar, randomness],
                &[self.generators.gg, self.generators.gh],
            );
            let (bit_commitments, range) = statements::range_knowledge(
                &self.generators,
                &ma,
                scalar,
                &randomness,
                self.range_width,
                rng,
            );
            randomness_delta = randomness_delta.sub(&randomness);
            range_knowledge.push(range);
            requested.push(RequestedCredential {
                value,
                randomness,
                ma,
            });
            issuance.push(IssuanceRequest { ma, bit_commitments });
        }

        let presented_ca: Vec<P> = presentations.iter().map(|p| p.ca).collect();
        let requested_ma: Vec<P> = issuance.iter().map(|r| r.ma).collect();
        let commitment =
            statements::balance_commitment(&self.generators, &presented_ca, &requested_ma, delta);
        knowledge.push(statements::balance_knowledge(
            &self.generators,
            commitment,
            z_sum,
            randomness_delta,
        ));
        knowledge.extend(range_knowledge);

        let mut transcript = real_request_transcript(
            &self.context,
            &self.parameters,
            delta,
            &presentations,
            &issuance,
        );
        let proofs = proof::prove(&mut transcript, &knowledge, rng);

        (
            RealCredentialsRequest {
                delta,
                presented: presentations,
                requested: issuance,
                proofs,
            },
            CredentialsResponseValidation {
                requested,
                presented: presented.to_vec(),
            },
        )
    }

    /// verify the issuance proofs and unwrap the new credentials
    pub fn handle_response(
        &self,
        response: &CredentialsResponse<P>,
        validation: &CredentialsResponseValidation<P>,
    ) -> Result<Vec<Credential<P>>> {
        let expected = validation.requested.len();
        if response.macs.len() != expected || response.proofs.len() != expected {
            return Err(CredentialError::ResponseMismatch);
        }

        let attributes: Vec<P> = validation.requested.iter().map(|r| r.ma).collect();
        let checks: Vec<Statement<P>> = attributes
            .iter()
            .zip(&response.macs)
            .map(|(ma, mac)| {
                statements::issuance_statement(&self.generators, &self.parameters, mac, ma)
            })
            .collect();
        let mut transcript =
            issuance_transcript(&self.context, &self.parameters, &attributes, &response.macs);
        if !proof::verify(&mut transcript, &checks, &response.proofs) {
            return Err(CredentialError::InvalidIssuanceProof);
        }

        Ok(validation
            .requested
            .iter()
            .zip(&response.macs)
            .map(|(r, mac)| Credential::new(r.value, r.randomness, *mac))
            .collect())
    }
}
