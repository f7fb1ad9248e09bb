//! merlin-backed transcript for the credential proof system
//!
//! every request is bound to the issuer parameters and to the round context
//! before any statement is committed, so a proof cannot be replayed in a
//! different round or against a different issuer

use merlin::Transcript;

use crate::group::{GroupElement, GroupScalar};
use crate::keys::CredentialIssuerParameters;

/// domain separator for the whole protocol
const PROTOCOL_DOMAIN: &[u8] = b"wabisabi.credentials.v1";

/// transcript wrapper with typed append helpers
#[derive(Clone)]
pub struct CredentialTranscript {
    inner: Transcript,
}

impl CredentialTranscript {
    /// create a transcript for one request/response exchange
    pub fn new(context: &[u8]) -> Self {
        let mut inner = Transcript::new(PROTOCOL_DOMAIN);
        inner.append_message(b"context", context);
        Self { inner }
    }

    /// bind the issuer's public parameters
    pub fn bind_issuer<P: GroupElement>(&mut self, parameters: &CredentialIssuerParameters<P>) {
        self.append_element(b"cw", &parameters.cw);
        self.append_element(b"i", &parameters.i);
    }

    pub fn append_label(&mut self, label: &'static [u8]) {
        self.inner.append_message(b"dom-sep", label);
    }

    pub fn append_u64(&mut self, label: &'static [u8], value: u64) {
        self.inner.append_u64(label, value);
    }

    pub fn append_i64(&mut self, label: &'static [u8], value: i64) {
        self.inner.append_message(label, &value.to_le_bytes());
    }

    pub fn append_scalar<S: GroupScalar>(&mut self, label: &'static [u8], scalar: &S) {
        self.inner.append_message(label, &scalar.to_bytes());
    }

    pub fn append_element<P: GroupElement>(&mut self, label: &'static [u8], element: &P) {
        self.inner.append_message(label, &element.compress());
    }

    pub fn append_elements<P: GroupElement>(&mut self, label: &'static [u8], elements: &[P]) {
        self.inner.append_u64(b"len", elements.len() as u64);
        for element in elements {
            self.inner.append_message(label, &element.compress());
        }
    }

    /// derive a challenge scalar from the current state
    pub fn challenge_scalar<S: GroupScalar>(&mut self, label: &'static [u8]) -> S {
        let mut wide = [0u8; 64];
        self.inner.challenge_bytes(label, &mut wide);
        S::from_bytes_wide(&wide)
    }

    /// derive proof nonces bound to the transcript, the secret witness and
    /// fresh randomness
    pub fn witness_nonces<S: GroupScalar, R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        witness: &[S],
        rng: &mut R,
    ) -> Vec<S> {
        let mut builder = self.inner.build_rng();
        for w in witness {
            builder = builder.rekey_with_witness_bytes(b"witness", &w.to_bytes());
        }
        let mut nonce_rng = builder.finalize(rng);
        witness.iter().map(|_| S::random(&mut nonce_rng)).collect()
    }
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use curve25519_dalek::scalar::Scalar;

    #[test]
    fn test_transcript_determinism() {
        let mut t1 = CredentialTranscript::new(b"round-1");
        let mut t2 = CredentialTranscript::new(b"round-1");

        t1.append_element(b"p", &RistrettoPoint::generator());
        t2.append_element(b"p", &RistrettoPoint::generator());

        let c1: Scalar = t1.challenge_scalar(b"c");
        let c2: Scalar = t2.challenge_scalar(b"c");
        assert_eq!(c1, c2, "same inputs should produce same challenges");
    }

    #[test]
    fn test_transcript_context_binding() {
        let mut t1 = CredentialTranscript::new(b"round-1");
        let mut t2 = CredentialTranscript::new(b"round-2");

        let c1: Scalar = t1.challenge_scalar(b"c");
        let c2: Scalar = t2.challenge_scalar(b"c");
        assert_ne!(c1, c2, "different rounds should produce different challenges");
    }

    #[test]
    fn test_signed_values_are_distinct() {
        let mut t1 = CredentialTranscript::new(b"ctx");
        let mut t2 = CredentialTranscript::new(b"ctx");
        t1.append_i64(b"delta", 5);
        t2.append_i64(b"delta", -5);

        let c1: Scalar = t1.challenge_scalar(b"c");
        let c2: Scalar = t2.challenge_scalar(b"c");
        assert_ne!(c1, c2);
    }
}
