//! issuer key material
//!
//! secret key `(w, w', x0, x1, ya)`, public parameters
//! `Cw = w·Gw + w'·Gwp` and `I = GV − (x0·Gx0 + x1·Gx1 + ya·Ga)`

use zeroize::Zeroize;

use crate::generators::Generators;
use crate::group::{GroupElement, GroupScalar};
use crate::mac::Mac;

/// issuer secret key, one per round and credential domain
pub struct CredentialIssuerSecretKey<P: GroupElement> {
    pub(crate) w: P::Scalar,
    pub(crate) wp: P::Scalar,
    pub(crate) x0: P::Scalar,
    pub(crate) x1: P::Scalar,
    pub(crate) ya: P::Scalar,
}

impl<P: GroupElement> CredentialIssuerSecretKey<P> {
    pub fn random<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self {
        Self {
            w: P::Scalar::random(rng),
            wp: P::Scalar::random(rng),
            x0: P::Scalar::random(rng),
            x1: P::Scalar::random(rng),
            ya: P::Scalar::random(rng),
        }
    }

    pub fn compute_parameters(&self, generators: &Generators<P>) -> CredentialIssuerParameters<P> {
        let cw = P::multiscalar_mul(&[self.w, self.wp], &[generators.gw, generators.gwp]);
        let i = generators.gv.sub(&P::multiscalar_mul(
            &[self.x0, self.x1, self.ya],
            &[generators.gx0, generators.gx1, generators.ga],
        ));
        CredentialIssuerParameters { cw, i }
    }

    /// MAC an attribute commitment `ma`
    pub fn compute_mac<R: rand_core::RngCore + rand_core::CryptoRng>(
        &self,
        generators: &Generators<P>,
        ma: &P,
        rng: &mut R,
    ) -> Mac<P> {
        let t = P::Scalar::random(rng);
        let u = Generators::<P>::mac_base(&t);
        // V = w·Gw + (x0 + x1·t)·U + ya·Ma
        let v = P::multiscalar_mul(
            &[self.w, self.x0.add(&self.x1.mul(&t)), self.ya],
            &[generators.gw, u, *ma],
        );
        Mac { t, v }
    }

    /// the issuer-side half of presentation verification:
    /// `Z = CV − (w·Gw + x0·Cx0 + x1·Cx1 + ya·Ca)`
    pub(crate) fn presentation_z(&self, generators: &Generators<P>, cx0: &P, cx1: &P, ca: &P, cv: &P) -> P {
        cv.sub(&P::multiscalar_mul(
            &[self.w, self.x0, self.x1, self.ya],
            &[generators.gw, *cx0, *cx1, *ca],
        ))
    }
}

impl<P: GroupElement> Zeroize for CredentialIssuerSecretKey<P> {
    fn zeroize(&mut self) {
        self.w.zeroize();
        self.wp.zeroize();
        self.x0.zeroize();
        self.x1.zeroize();
        self.ya.zeroize();
    }
}

impl<P: GroupElement> Drop for CredentialIssuerSecretKey<P> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<P: GroupElement> core::fmt::Debug for CredentialIssuerSecretKey<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CredentialIssuerSecretKey(..)")
    }
}

/// public issuer parameters handed to clients
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialIssuerParameters<P: GroupElement> {
    pub cw: P,
    pub i: P,
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use rand::rngs::OsRng;

    #[test]
    fn test_parameters_differ_per_key() {
        let generators = Generators::<RistrettoPoint>::derive();
        let a = CredentialIssuerSecretKey::<RistrettoPoint>::random(&mut OsRng);
        let b = CredentialIssuerSecretKey::<RistrettoPoint>::random(&mut OsRng);
        assert_ne!(a.compute_parameters(&generators), b.compute_parameters(&generators));
    }

    #[test]
    fn test_debug_hides_secret() {
        let sk = CredentialIssuerSecretKey::<RistrettoPoint>::random(&mut OsRng);
        assert_eq!(format!("{:?}", sk), "CredentialIssuerSecretKey(..)");
    }
}
