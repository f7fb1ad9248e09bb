//! Group abstraction for the credential protocol
//!
//! The issuer, client and proof system only ever talk to these traits, so the
//! prime-order group backing the credentials can be swapped without touching
//! protocol code:
//! - ristretto255 (default)

use core::fmt::Debug;
use zeroize::Zeroize;

/// Scalar field element trait
pub trait GroupScalar: Copy + Debug + PartialEq + Eq + Send + Sync + Zeroize + 'static {
    /// The zero element
    fn zero() -> Self;

    /// The one element
    fn one() -> Self;

    /// Create from u64
    fn from_u64(v: u64) -> Self;

    /// Create from a signed value, mapping negatives to the field negation
    fn from_i64(v: i64) -> Self {
        let magnitude = Self::from_u64(v.unsigned_abs());
        if v < 0 {
            magnitude.neg()
        } else {
            magnitude
        }
    }

    /// Addition
    fn add(&self, other: &Self) -> Self;

    /// Subtraction
    fn sub(&self, other: &Self) -> Self;

    /// Multiplication
    fn mul(&self, other: &Self) -> Self;

    /// Negation
    fn neg(&self) -> Self;

    /// Generate random scalar
    fn random<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self;

    /// Create from 64-byte wide hash output (reduction mod order)
    fn from_bytes_wide(bytes: &[u8; 64]) -> Self;

    /// Serialize to bytes
    fn to_bytes(&self) -> [u8; 32];

    /// Deserialize from canonical bytes
    fn from_canonical_bytes(bytes: &[u8; 32]) -> Option<Self>;
}

/// Group element trait
pub trait GroupElement: Copy + Debug + PartialEq + Eq + Send + Sync + 'static {
    type Scalar: GroupScalar;

    /// The identity element
    fn identity() -> Self;

    /// The conventional base point
    fn generator() -> Self;

    /// Nothing-up-my-sleeve element derived from a label
    fn hash_from_label(label: &[u8]) -> Self;

    /// Scalar multiplication
    fn mul_scalar(&self, scalar: &Self::Scalar) -> Self;

    /// Addition
    fn add(&self, other: &Self) -> Self;

    /// Subtraction
    fn sub(&self, other: &Self) -> Self;

    /// Multiscalar multiplication
    fn multiscalar_mul(scalars: &[Self::Scalar], elements: &[Self]) -> Self;

    /// Compress to 32 bytes
    fn compress(&self) -> [u8; 32];

    /// Decompress from 32 bytes
    fn decompress(bytes: &[u8; 32]) -> Option<Self>;

    fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

// ============================================================================
// Ristretto255 implementation
// ============================================================================

#[cfg(feature = "ristretto255")]
pub mod ristretto {
    use super::*;
    use curve25519_dalek::{
        constants::RISTRETTO_BASEPOINT_POINT,
        ristretto::{CompressedRistretto, RistrettoPoint},
        scalar::Scalar,
        traits::{Identity, VartimeMultiscalarMul},
    };
    use sha2::Sha512;

    impl GroupScalar for Scalar {
        fn zero() -> Self {
            Scalar::ZERO
        }

        fn one() -> Self {
            Scalar::ONE
        }

        fn from_u64(v: u64) -> Self {
            Scalar::from(v)
        }

        fn add(&self, other: &Self) -> Self {
            self + other
        }

        fn sub(&self, other: &Self) -> Self {
            self - other
        }

        fn mul(&self, other: &Self) -> Self {
            self * other
        }

        fn neg(&self) -> Self {
            -self
        }

        fn random<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self {
            Scalar::random(rng)
        }

        fn from_bytes_wide(bytes: &[u8; 64]) -> Self {
            Scalar::from_bytes_mod_order_wide(bytes)
        }

        fn to_bytes(&self) -> [u8; 32] {
            Scalar::to_bytes(self)
        }

        fn from_canonical_bytes(bytes: &[u8; 32]) -> Option<Self> {
            Scalar::from_canonical_bytes(*bytes).into()
        }
    }

    impl GroupElement for RistrettoPoint {
        type Scalar = Scalar;

        fn identity() -> Self {
            <RistrettoPoint as Identity>::identity()
        }

        fn generator() -> Self {
            RISTRETTO_BASEPOINT_POINT
        }

        fn hash_from_label(label: &[u8]) -> Self {
            RistrettoPoint::hash_from_bytes::<Sha512>(label)
        }

        fn mul_scalar(&self, scalar: &Self::Scalar) -> Self {
            self * scalar
        }

        fn add(&self, other: &Self) -> Self {
            self + other
        }

        fn sub(&self, other: &Self) -> Self {
            self - other
        }

        // verification inputs are public, so variable time is fine here
        fn multiscalar_mul(scalars: &[Self::Scalar], elements: &[Self]) -> Self {
            <RistrettoPoint as VartimeMultiscalarMul>::vartime_multiscalar_mul(scalars, elements)
        }

        fn compress(&self) -> [u8; 32] {
            RistrettoPoint::compress(self).to_bytes()
        }

        fn decompress(bytes: &[u8; 32]) -> Option<Self> {
            CompressedRistretto::from_slice(bytes).ok()?.decompress()
        }
    }

    /// Default element type used by the coordinator
    pub type Element = RistrettoPoint;
}
