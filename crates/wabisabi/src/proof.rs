//! linear-relation knowledge proofs
//!
//! a statement is a set of equations `P_e = Σ w_i · G_{e,i}` over one shared
//! witness vector `w`. equations are sparse: each lists only the witness
//! indices it touches, which keeps range proofs linear in the bit width.
//!
//! all statements of one request are proven together:
//!
//! ```text
//! transcript ← statements
//! transcript ← R_e = Σ k_i · G_{e,i}       (per equation, per statement)
//! c          ← transcript
//! s_i        = k_i + c · w_i               (per witness, per statement)
//! verify:      Σ s_i · G_{e,i} == R_e + c · P_e
//! ```

use crate::group::{GroupElement, GroupScalar};
use crate::transcript::CredentialTranscript;

/// one linear equation over the witness vector
#[derive(Clone, Debug)]
pub struct Equation<P: GroupElement> {
    pub public: P,
    pub terms: Vec<(usize, P)>,
}

impl<P: GroupElement> Equation<P> {
    pub fn new(public: P, terms: Vec<(usize, P)>) -> Self {
        Self { public, terms }
    }

    /// evaluate the right hand side for a given witness
    fn evaluate(&self, witness: &[P::Scalar]) -> P {
        let scalars: Vec<P::Scalar> = self.terms.iter().map(|(i, _)| witness[*i]).collect();
        let generators: Vec<P> = self.terms.iter().map(|(_, g)| *g).collect();
        P::multiscalar_mul(&scalars, &generators)
    }
}

/// a conjunction of equations sharing one witness vector
#[derive(Clone, Debug)]
pub struct Statement<P: GroupElement> {
    pub equations: Vec<Equation<P>>,
    pub witness_len: usize,
}

impl<P: GroupElement> Statement<P> {
    pub fn new(witness_len: usize, equations: Vec<Equation<P>>) -> Self {
        debug_assert!(equations
            .iter()
            .all(|eq| eq.terms.iter().all(|(i, _)| *i < witness_len)));
        Self {
            equations,
            witness_len,
        }
    }

    fn commit(&self, transcript: &mut CredentialTranscript) {
        transcript.append_label(b"statement");
        transcript.append_u64(b"witness-len", self.witness_len as u64);
        for eq in &self.equations {
            transcript.append_element(b"public", &eq.public);
            transcript.append_u64(b"terms", eq.terms.len() as u64);
            for (index, generator) in &eq.terms {
                transcript.append_u64(b"index", *index as u64);
                transcript.append_element(b"generator", generator);
            }
        }
    }
}

/// a statement together with a witness that satisfies it
#[derive(Clone, Debug)]
pub struct Knowledge<P: GroupElement> {
    pub statement: Statement<P>,
    pub witness: Vec<P::Scalar>,
}

impl<P: GroupElement> Knowledge<P> {
    pub fn new(statement: Statement<P>, witness: Vec<P::Scalar>) -> Self {
        debug_assert_eq!(statement.witness_len, witness.len());
        Self { statement, witness }
    }

    /// whether the witness actually satisfies every equation
    pub fn is_satisfied(&self) -> bool {
        self.statement
            .equations
            .iter()
            .all(|eq| eq.evaluate(&self.witness) == eq.public)
    }
}

/// non-interactive proof for one statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof<P: GroupElement> {
    /// one nonce commitment per equation
    pub nonces: Vec<P>,
    /// one response per witness element
    pub responses: Vec<P::Scalar>,
}

/// prove every piece of knowledge under a single challenge
pub fn prove<P, R>(
    transcript: &mut CredentialTranscript,
    knowledge: &[Knowledge<P>],
    rng: &mut R,
) -> Vec<Proof<P>>
where
    P: GroupElement,
    R: rand_core::RngCore + rand_core::CryptoRng,
{
    for k in knowledge {
        k.statement.commit(transcript);
    }

    let mut secret_nonces = Vec::with_capacity(knowledge.len());
    let mut public_nonces = Vec::with_capacity(knowledge.len());
    for k in knowledge {
        let nonces: Vec<P::Scalar> = transcript.witness_nonces(&k.witness, rng);
        let commitments: Vec<P> = k
            .statement
            .equations
            .iter()
            .map(|eq| eq.evaluate(&nonces))
            .collect();
        transcript.append_elements(b"nonce", &commitments);
        secret_nonces.push(nonces);
        public_nonces.push(commitments);
    }

    let challenge: P::Scalar = transcript.challenge_scalar(b"challenge");

    knowledge
        .iter()
        .zip(secret_nonces)
        .zip(public_nonces)
        .map(|((k, mut nonces), commitments)| {
            let responses = nonces
                .iter()
                .zip(&k.witness)
                .map(|(n, w)| n.add(&challenge.mul(w)))
                .collect();
            for n in nonces.iter_mut() {
                zeroize::Zeroize::zeroize(n);
            }
            Proof {
                nonces: commitments,
                responses,
            }
        })
        .collect()
}

/// verify proofs produced by [`prove`] for the same statements in the same order
pub fn verify<P: GroupElement>(
    transcript: &mut CredentialTranscript,
    statements: &[Statement<P>],
    proofs: &[Proof<P>],
) -> bool {
    if statements.len() != proofs.len() {
        return false;
    }
    for (statement, proof) in statements.iter().zip(proofs) {
        if proof.nonces.len() != statement.equations.len()
            || proof.responses.len() != statement.witness_len
        {
            return false;
        }
    }

    for statement in statements {
        statement.commit(transcript);
    }
    for proof in proofs {
        transcript.append_elements(b"nonce", &proof.nonces);
    }

    let challenge: P::Scalar = transcript.challenge_scalar(b"challenge");
    let minus_challenge = challenge.neg();
    let minus_one = P::Scalar::one().neg();

    statements.iter().zip(proofs).all(|(statement, proof)| {
        statement
            .equations
            .iter()
            .zip(&proof.nonces)
            .all(|(eq, nonce)| {
                // Σ s_i·G_i − c·P − R == 0
                let mut scalars: Vec<P::Scalar> =
                    eq.terms.iter().map(|(i, _)| proof.responses[*i]).collect();
                let mut elements: Vec<P> = eq.terms.iter().map(|(_, g)| *g).collect();
                scalars.push(minus_challenge);
                elements.push(eq.public);
                scalars.push(minus_one);
                elements.push(*nonce);
                P::multiscalar_mul(&scalars, &elements).is_identity()
            })
    })
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use curve25519_dalek::scalar::Scalar;
    use rand::rngs::OsRng;

    fn random_scalar() -> Scalar {
        <Scalar as GroupScalar>::random(&mut OsRng)
    }

    /// P = x·G, Q = x·H (discrete log equality)
    fn dleq(x: Scalar) -> Knowledge<RistrettoPoint> {
        let g = RistrettoPoint::hash_from_label(b"test/g");
        let h = RistrettoPoint::hash_from_label(b"test/h");
        let statement = Statement::new(
            1,
            vec![
                Equation::new(g.mul_scalar(&x), vec![(0, g)]),
                Equation::new(h.mul_scalar(&x), vec![(0, h)]),
            ],
        );
        Knowledge::new(statement, vec![x])
    }

    #[test]
    fn test_prove_verify_dleq() {
        let knowledge = dleq(random_scalar());
        assert!(knowledge.is_satisfied());

        let mut pt = CredentialTranscript::new(b"test");
        let proofs = prove(&mut pt, &[knowledge.clone()], &mut OsRng);

        let mut vt = CredentialTranscript::new(b"test");
        assert!(verify(&mut vt, &[knowledge.statement], &proofs));
    }

    #[test]
    fn test_wrong_witness_fails() {
        let mut knowledge = dleq(random_scalar());
        knowledge.witness = vec![random_scalar()];
        assert!(!knowledge.is_satisfied());

        let mut pt = CredentialTranscript::new(b"test");
        let proofs = prove(&mut pt, &[knowledge.clone()], &mut OsRng);

        let mut vt = CredentialTranscript::new(b"test");
        assert!(!verify(&mut vt, &[knowledge.statement], &proofs));
    }

    #[test]
    fn test_context_mismatch_fails() {
        let knowledge = dleq(random_scalar());

        let mut pt = CredentialTranscript::new(b"round-a");
        let proofs = prove(&mut pt, &[knowledge.clone()], &mut OsRng);

        let mut vt = CredentialTranscript::new(b"round-b");
        assert!(!verify(&mut vt, &[knowledge.statement], &proofs));
    }

    #[test]
    fn test_multiple_statements_share_challenge() {
        let a = dleq(random_scalar());
        let b = dleq(random_scalar());

        let mut pt = CredentialTranscript::new(b"test");
        let proofs = prove(&mut pt, &[a.clone(), b.clone()], &mut OsRng);

        // swapping proofs between statements must fail
        let mut vt = CredentialTranscript::new(b"test");
        let swapped = vec![proofs[1].clone(), proofs[0].clone()];
        assert!(!verify(&mut vt, &[a.statement.clone(), b.statement.clone()], &swapped));

        let mut vt = CredentialTranscript::new(b"test");
        assert!(verify(&mut vt, &[a.statement, b.statement], &proofs));
    }

    #[test]
    fn test_malformed_proof_shape_rejected() {
        let knowledge = dleq(random_scalar());

        let mut pt = CredentialTranscript::new(b"test");
        let mut proofs = prove(&mut pt, &[knowledge.clone()], &mut OsRng);
        proofs[0].responses.push(Scalar::ONE);

        let mut vt = CredentialTranscript::new(b"test");
        assert!(!verify(&mut vt, &[knowledge.statement], &proofs));
    }
}
