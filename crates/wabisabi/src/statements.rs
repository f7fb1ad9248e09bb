//! the concrete statements of the credential protocol
//!
//! each statement has a verifier-side constructor (public data only) and a
//! prover-side constructor that pairs it with the witness

use crate::credential::CredentialPresentation;
use crate::generators::Generators;
use crate::group::{GroupElement, GroupScalar};
use crate::keys::{CredentialIssuerParameters, CredentialIssuerSecretKey};
use crate::mac::Mac;
use crate::proof::{Equation, Knowledge, Statement};

// ============================================================================
// Issuance: the issuer MAC'd `ma` with the key behind its public parameters
// ============================================================================

/// witness `[w, w', x0, x1, ya]`
pub(crate) fn issuance_statement<P: GroupElement>(
    generators: &Generators<P>,
    parameters: &CredentialIssuerParameters<P>,
    mac: &Mac<P>,
    ma: &P,
) -> Statement<P> {
    let u = Generators::<P>::mac_base(&mac.t);
    Statement::new(
        5,
        vec![
            // Cw = w·Gw + w'·Gwp
            Equation::new(parameters.cw, vec![(0, generators.gw), (1, generators.gwp)]),
            // GV − I = x0·Gx0 + x1·Gx1 + ya·Ga
            Equation::new(
                generators.gv.sub(&parameters.i),
                vec![(2, generators.gx0), (3, generators.gx1), (4, generators.ga)],
            ),
            // V = w·Gw + x0·U + x1·(t·U) + ya·Ma
            Equation::new(
                mac.v,
                vec![
                    (0, generators.gw),
                    (2, u),
                    (3, u.mul_scalar(&mac.t)),
                    (4, *ma),
                ],
            ),
        ],
    )
}

pub(crate) fn issuance_knowledge<P: GroupElement>(
    generators: &Generators<P>,
    parameters: &CredentialIssuerParameters<P>,
    secret_key: &CredentialIssuerSecretKey<P>,
    mac: &Mac<P>,
    ma: &P,
) -> Knowledge<P> {
    Knowledge::new(
        issuance_statement(generators, parameters, mac, ma),
        vec![
            secret_key.w,
            secret_key.wp,
            secret_key.x0,
            secret_key.x1,
            secret_key.ya,
        ],
    )
}

// ============================================================================
// Presentation: the presented credential carries a valid MAC and its serial
// number belongs to it
// ============================================================================

/// witness `[z, −t·z, t, value, r]`
pub(crate) fn presentation_statement<P: GroupElement>(
    generators: &Generators<P>,
    parameters: &CredentialIssuerParameters<P>,
    presentation: &CredentialPresentation<P>,
    z: &P,
) -> Statement<P> {
    Statement::new(
        5,
        vec![
            // Z = z·I
            Equation::new(*z, vec![(0, parameters.i)]),
            // Cx1 = z·Gx1 + (−tz)·Gx0 + t·Cx0
            Equation::new(
                presentation.cx1,
                vec![(0, generators.gx1), (1, generators.gx0), (2, presentation.cx0)],
            ),
            // S = r·Gs
            Equation::new(presentation.s, vec![(4, generators.gs)]),
            // Ca = z·Ga + value·Gg + r·Gh
            Equation::new(
                presentation.ca,
                vec![(0, generators.ga), (3, generators.gg), (4, generators.gh)],
            ),
        ],
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn presentation_knowledge<P: GroupElement>(
    generators: &Generators<P>,
    parameters: &CredentialIssuerParameters<P>,
    presentation: &CredentialPresentation<P>,
    z: P::Scalar,
    t: P::Scalar,
    value: u64,
    randomness: P::Scalar,
) -> Knowledge<P> {
    let big_z = parameters.i.mul_scalar(&z);
    Knowledge::new(
        presentation_statement(generators, parameters, presentation, &big_z),
        vec![z, t.mul(&z).neg(), t, P::Scalar::from_u64(value), randomness],
    )
}

// ============================================================================
// Balance: Σ presented + Δ = Σ requested
// ============================================================================

/// public point `Σ Ca − Σ Ma' + Δ·Gg`
pub(crate) fn balance_commitment<P: GroupElement>(
    generators: &Generators<P>,
    presented: &[P],
    requested: &[P],
    delta: i64,
) -> P {
    let presented_sum = presented.iter().fold(P::identity(), |acc, ca| acc.add(ca));
    let requested_sum = requested.iter().fold(P::identity(), |acc, ma| acc.add(ma));
    presented_sum
        .sub(&requested_sum)
        .add(&generators.gg.mul_scalar(&P::Scalar::from_i64(delta)))
}

/// witness `[Σz, Σr − Σr']`
pub(crate) fn balance_statement<P: GroupElement>(
    generators: &Generators<P>,
    commitment: P,
) -> Statement<P> {
    Statement::new(
        2,
        vec![Equation::new(commitment, vec![(0, generators.ga), (1, generators.gh)])],
    )
}

pub(crate) fn balance_knowledge<P: GroupElement>(
    generators: &Generators<P>,
    commitment: P,
    z_sum: P::Scalar,
    randomness_delta: P::Scalar,
) -> Knowledge<P> {
    Knowledge::new(
        balance_statement(generators, commitment),
        vec![z_sum, randomness_delta],
    )
}

// ============================================================================
// Range: requested value lies in [0, 2^width)
// ============================================================================
//
// bit commitments B_i = b_i·Gg + r_i·Gh, with b_i ∈ {0,1} shown through
// B_i = b_i·B_i + r_i(1 − b_i)·Gh, and Ma − Σ 2^i·B_i = r_Δ·Gh tying the bits
// to the requested attribute.

/// witness `[r_Δ, b_0..b_n, r_0..r_n, (r_i(1 − b_i))_0..n]`
pub(crate) fn range_statement<P: GroupElement>(
    generators: &Generators<P>,
    ma: &P,
    bit_commitments: &[P],
) -> Statement<P> {
    let n = bit_commitments.len();
    let powers: Vec<P::Scalar> = (0..n).map(|i| P::Scalar::from_u64(1u64 << i)).collect();
    let weighted_bits = P::multiscalar_mul(&powers, bit_commitments);

    let mut equations = Vec::with_capacity(1 + 2 * n);
    equations.push(Equation::new(ma.sub(&weighted_bits), vec![(0, generators.gh)]));
    for (i, b) in bit_commitments.iter().enumerate() {
        equations.push(Equation::new(
            *b,
            vec![(1 + i, generators.gg), (1 + n + i, generators.gh)],
        ));
        equations.push(Equation::new(*b, vec![(1 + i, *b), (1 + 2 * n + i, generators.gh)]));
    }

    Statement::new(1 + 3 * n, equations)
}

/// commit to the low `width` bits of `value` and build the range witness.
/// a value outside the range still yields a (false) knowledge; the proof
/// produced from it will not verify.
pub(crate) fn range_knowledge<P: GroupElement, R: rand_core::RngCore + rand_core::CryptoRng>(
    generators: &Generators<P>,
    ma: &P,
    value: &P::Scalar,
    randomness: &P::Scalar,
    width: usize,
    rng: &mut R,
) -> (Vec<P>, Knowledge<P>) {
    let value_bytes = value.to_bytes();
    let bits: Vec<P::Scalar> = (0..width)
        .map(|i| {
            let bit = (value_bytes[i / 8] >> (i % 8)) & 1;
            P::Scalar::from_u64(bit as u64)
        })
        .collect();
    let bit_randomness: Vec<P::Scalar> = (0..width).map(|_| P::Scalar::random(rng)).collect();

    let bit_commitments: Vec<P> = bits
        .iter()
        .zip(&bit_randomness)
        .map(|(b, r)| P::multiscalar_mul(&[*b, *r], &[generators.gg, generators.gh]))
        .collect();

    let weighted_randomness = bit_randomness
        .iter()
        .enumerate()
        .fold(P::Scalar::zero(), |acc, (i, r)| {
            acc.add(&P::Scalar::from_u64(1u64 << i).mul(r))
        });

    let one = P::Scalar::one();
    let mut witness = Vec::with_capacity(1 + 3 * width);
    witness.push(randomness.sub(&weighted_randomness));
    witness.extend(bits.iter().copied());
    witness.extend(bit_randomness.iter().copied());
    witness.extend(
        bits.iter()
            .zip(&bit_randomness)
            .map(|(b, r)| r.mul(&one.sub(b))),
    );

    let statement = range_statement(generators, ma, &bit_commitments);
    (bit_commitments, Knowledge::new(statement, witness))
}

// ============================================================================
// Zero: requested attribute commits to value zero
// ============================================================================

/// witness `[r]`
pub(crate) fn zero_statement<P: GroupElement>(generators: &Generators<P>, ma: &P) -> Statement<P> {
    Statement::new(1, vec![Equation::new(*ma, vec![(0, generators.gh)])])
}

pub(crate) fn zero_knowledge<P: GroupElement>(
    generators: &Generators<P>,
    ma: &P,
    randomness: P::Scalar,
) -> Knowledge<P> {
    Knowledge::new(zero_statement(generators, ma), vec![randomness])
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use curve25519_dalek::scalar::Scalar;
    use rand::rngs::OsRng;

    fn attribute(generators: &Generators<RistrettoPoint>, value: Scalar, r: Scalar) -> RistrettoPoint {
        RistrettoPoint::multiscalar_mul(&[value, r], &[generators.gg, generators.gh])
    }

    #[test]
    fn test_range_knowledge_satisfied_in_range() {
        let generators = Generators::<RistrettoPoint>::derive();
        let r = <Scalar as GroupScalar>::random(&mut OsRng);
        let value = Scalar::from(200u64);
        let ma = attribute(&generators, value, r);

        let (bits, knowledge) = range_knowledge(&generators, &ma, &value, &r, 8, &mut OsRng);
        assert_eq!(bits.len(), 8);
        assert!(knowledge.is_satisfied());
    }

    #[test]
    fn test_range_knowledge_unsatisfied_out_of_range() {
        let generators = Generators::<RistrettoPoint>::derive();
        let r = <Scalar as GroupScalar>::random(&mut OsRng);
        let value = Scalar::from(256u64);
        let ma = attribute(&generators, value, r);

        let (_, knowledge) = range_knowledge(&generators, &ma, &value, &r, 8, &mut OsRng);
        assert!(!knowledge.is_satisfied());
    }

    #[test]
    fn test_range_knowledge_unsatisfied_for_negative() {
        let generators = Generators::<RistrettoPoint>::derive();
        let r = <Scalar as GroupScalar>::random(&mut OsRng);
        let value = <Scalar as GroupScalar>::from_i64(-1);
        let ma = attribute(&generators, value, r);

        let (_, knowledge) = range_knowledge(&generators, &ma, &value, &r, 16, &mut OsRng);
        assert!(!knowledge.is_satisfied());
    }

    #[test]
    fn test_balance_knowledge_satisfied() {
        let generators = Generators::<RistrettoPoint>::derive();
        let mut rng = OsRng;
        let z = <Scalar as GroupScalar>::random(&mut rng);
        let r_in = <Scalar as GroupScalar>::random(&mut rng);
        let r_out = <Scalar as GroupScalar>::random(&mut rng);

        // present 10, request 7 with Δ = −3
        let ca = generators.ga.mul_scalar(&z).add(&attribute(&generators, Scalar::from(10u64), r_in));
        let ma = attribute(&generators, Scalar::from(7u64), r_out);
        let commitment = balance_commitment(&generators, &[ca], &[ma], -3);

        let knowledge = balance_knowledge(&generators, commitment, z, r_in - r_out);
        assert!(knowledge.is_satisfied());

        let inflated = balance_commitment(&generators, &[ca], &[ma], -2);
        let knowledge = balance_knowledge(&generators, inflated, z, r_in - r_out);
        assert!(!knowledge.is_satisfied());
    }
}
