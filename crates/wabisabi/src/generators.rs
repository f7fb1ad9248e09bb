//! nothing-up-my-sleeve generators
//!
//! each generator is hashed from its own label so nobody knows a discrete log
//! relation between any two of them

use crate::group::GroupElement;

/// the fixed generator set of the credential scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generators<P: GroupElement> {
    /// issuer key commitment (w)
    pub gw: P,
    /// issuer key commitment blinding (w')
    pub gwp: P,
    /// mac key x0
    pub gx0: P,
    /// mac key x1
    pub gx1: P,
    /// mac verification base
    pub gv: P,
    /// attribute value
    pub gg: P,
    /// attribute randomness
    pub gh: P,
    /// attribute randomization
    pub ga: P,
    /// serial numbers
    pub gs: P,
}

impl<P: GroupElement> Generators<P> {
    pub fn derive() -> Self {
        Self {
            gw: P::hash_from_label(b"wabisabi/generator/Gw"),
            gwp: P::hash_from_label(b"wabisabi/generator/Gwp"),
            gx0: P::hash_from_label(b"wabisabi/generator/Gx0"),
            gx1: P::hash_from_label(b"wabisabi/generator/Gx1"),
            gv: P::hash_from_label(b"wabisabi/generator/GV"),
            gg: P::hash_from_label(b"wabisabi/generator/Gg"),
            gh: P::hash_from_label(b"wabisabi/generator/Gh"),
            ga: P::hash_from_label(b"wabisabi/generator/Ga"),
            gs: P::hash_from_label(b"wabisabi/generator/Gs"),
        }
    }

    /// per-mac base point U derived from the mac's t value
    pub fn mac_base(t: &P::Scalar) -> P {
        use crate::group::GroupScalar;

        let mut label = Vec::with_capacity(48);
        label.extend_from_slice(b"wabisabi/mac/U/");
        label.extend_from_slice(&t.to_bytes());
        P::hash_from_label(&label)
    }
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;

    #[test]
    fn test_generators_distinct() {
        let g = Generators::<RistrettoPoint>::derive();
        let all = [g.gw, g.gwp, g.gx0, g.gx1, g.gv, g.gg, g.gh, g.ga, g.gs];
        for (i, a) in all.iter().enumerate() {
            assert!(!a.is_identity());
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
