//! client-held credentials and their randomized presentations

use crate::generators::Generators;
use crate::group::{GroupElement, GroupScalar};
use crate::mac::Mac;
use crate::serials::SerialNumber;

/// a MAC'd attribute `Ma = value·Gg + randomness·Gh`
///
/// a credential with `value == 0` is a zero credential; it is worthless but
/// indistinguishable from a real one once presented
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Credential<P: GroupElement> {
    value: u64,
    randomness: P::Scalar,
    mac: Mac<P>,
}

impl<P: GroupElement> Credential<P> {
    pub(crate) fn new(value: u64, randomness: P::Scalar, mac: Mac<P>) -> Self {
        Self {
            value,
            randomness,
            mac,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn mac(&self) -> &Mac<P> {
        &self.mac
    }

    pub(crate) fn randomness(&self) -> &P::Scalar {
        &self.randomness
    }

    /// attribute commitment this credential was issued for
    pub fn attribute(&self, generators: &Generators<P>) -> P {
        P::multiscalar_mul(
            &[P::Scalar::from_u64(self.value), self.randomness],
            &[generators.gg, generators.gh],
        )
    }

    /// serial number revealed when this credential is presented
    pub fn serial_number(&self, generators: &Generators<P>) -> SerialNumber {
        SerialNumber::from_element(&generators.gs.mul_scalar(&self.randomness))
    }

    /// randomize the credential for presentation; returns the presentation
    /// and the blinding scalar `z` the prover needs for its proof
    pub(crate) fn present(
        &self,
        generators: &Generators<P>,
        z: P::Scalar,
    ) -> CredentialPresentation<P> {
        let t = self.mac.t;
        let u = Generators::<P>::mac_base(&t);
        let ma = self.attribute(generators);

        CredentialPresentation {
            ca: generators.ga.mul_scalar(&z).add(&ma),
            cx0: generators.gx0.mul_scalar(&z).add(&u),
            cx1: P::multiscalar_mul(&[z, t], &[generators.gx1, u]),
            cv: generators.gv.mul_scalar(&z).add(&self.mac.v),
            s: generators.gs.mul_scalar(&self.randomness),
        }
    }
}

/// randomized credential as seen by the issuer
///
/// ```text
/// Ca  = z·Ga  + Ma
/// Cx0 = z·Gx0 + U
/// Cx1 = z·Gx1 + t·U
/// CV  = z·GV  + V
/// S   = r·Gs
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialPresentation<P: GroupElement> {
    pub ca: P,
    pub cx0: P,
    pub cx1: P,
    pub cv: P,
    pub s: P,
}

impl<P: GroupElement> CredentialPresentation<P> {
    pub fn serial_number(&self) -> SerialNumber {
        SerialNumber::from_element(&self.s)
    }

    pub(crate) fn elements(&self) -> [P; 5] {
        [self.ca, self.cx0, self.cx1, self.cv, self.s]
    }
}
