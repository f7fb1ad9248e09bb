//! messages exchanged between credential client and issuer

use crate::credential::{Credential, CredentialPresentation};
use crate::mac::Mac;
use crate::proof::Proof;
use crate::serials::SerialNumber;
use crate::group::GroupElement;
use crate::keys::CredentialIssuerParameters;
use crate::transcript::CredentialTranscript;

/// one requested credential: its attribute commitment and the bit
/// commitments backing its range proof (empty for zero requests)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuanceRequest<P: GroupElement> {
    pub ma: P,
    pub bit_commitments: Vec<P>,
}

/// request for credentials of value zero, presenting nothing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZeroCredentialsRequest<P: GroupElement> {
    pub requested: Vec<IssuanceRequest<P>>,
    pub proofs: Vec<Proof<P>>,
}

/// present `k` credentials and request `k` new ones, with
/// `Σ presented + delta = Σ requested`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealCredentialsRequest<P: GroupElement> {
    pub delta: i64,
    pub presented: Vec<CredentialPresentation<P>>,
    pub requested: Vec<IssuanceRequest<P>>,
    pub proofs: Vec<Proof<P>>,
}

impl<P: GroupElement> RealCredentialsRequest<P> {
    /// serial numbers this request would spend
    pub fn serial_numbers(&self) -> Vec<SerialNumber> {
        self.presented.iter().map(|p| p.serial_number()).collect()
    }
}

/// issuer answer: one MAC per requested credential plus issuance proofs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialsResponse<P: GroupElement> {
    pub macs: Vec<Mac<P>>,
    pub proofs: Vec<Proof<P>>,
}

/// client-side secrets kept between sending a request and handling its
/// response
#[derive(Clone)]
pub struct CredentialsResponseValidation<P: GroupElement> {
    pub(crate) requested: Vec<RequestedCredential<P>>,
    pub(crate) presented: Vec<Credential<P>>,
}

impl<P: GroupElement> CredentialsResponseValidation<P> {
    /// values the response will carry, in request order
    pub fn requested_values(&self) -> Vec<u64> {
        self.requested.iter().map(|r| r.value).collect()
    }

    /// credentials the request spends
    pub fn presented(&self) -> &[Credential<P>] {
        &self.presented
    }
}

impl<P: GroupElement> core::fmt::Debug for CredentialsResponseValidation<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialsResponseValidation")
            .field("requested", &self.requested_values())
            .field("presented", &self.presented.len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RequestedCredential<P: GroupElement> {
    pub value: u64,
    pub randomness: P::Scalar,
    pub ma: P,
}

// transcripts are rebuilt identically on both sides of the exchange

pub(crate) fn zero_request_transcript<P: GroupElement>(
    context: &[u8],
    parameters: &CredentialIssuerParameters<P>,
    requested: &[IssuanceRequest<P>],
) -> CredentialTranscript {
    let mut transcript = CredentialTranscript::new(context);
    transcript.bind_issuer(parameters);
    transcript.append_label(b"zero-request");
    for request in requested {
        transcript.append_element(b"ma", &request.ma);
    }
    transcript
}

pub(crate) fn real_request_transcript<P: GroupElement>(
    context: &[u8],
    parameters: &CredentialIssuerParameters<P>,
    delta: i64,
    presented: &[CredentialPresentation<P>],
    requested: &[IssuanceRequest<P>],
) -> CredentialTranscript {
    let mut transcript = CredentialTranscript::new(context);
    transcript.bind_issuer(parameters);
    transcript.append_label(b"real-request");
    transcript.append_i64(b"delta", delta);
    for presentation in presented {
        transcript.append_elements(b"presentation", &presentation.elements());
    }
    for request in requested {
        transcript.append_element(b"ma", &request.ma);
        transcript.append_elements(b"bit", &request.bit_commitments);
    }
    transcript
}

pub(crate) fn issuance_transcript<P: GroupElement>(
    context: &[u8],
    parameters: &CredentialIssuerParameters<P>,
    attributes: &[P],
    macs: &[Mac<P>],
) -> CredentialTranscript {
    let mut transcript = CredentialTranscript::new(context);
    transcript.bind_issuer(parameters);
    transcript.append_label(b"issuance");
    for (ma, mac) in attributes.iter().zip(macs) {
        transcript.append_element(b"ma", ma);
        transcript.append_scalar(b"t", &mac.t);
        transcript.append_element(b"v", &mac.v);
    }
    transcript
}
