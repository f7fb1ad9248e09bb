//! algebraic MAC over an attribute commitment
//!
//! `(t, V)` with `V = w·Gw + (x0 + x1·t)·U + ya·Ma` and `U = H(t)`. only the
//! issuer can check a MAC directly; clients learn it is well formed from the
//! issuance proof that accompanies it.

use crate::group::GroupElement;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mac<P: GroupElement> {
    pub t: P::Scalar,
    pub v: P,
}
