//! serial numbers for preventing double-spends
//!
//! presenting a credential reveals `S = r·Gs`, where `r` is the randomness of
//! the credential's attribute commitment. the issuer records every serial it
//! accepts; a second presentation of the same credential reveals the same `S`
//! and is rejected.

use std::collections::HashSet;

use crate::group::GroupElement;

/// serial number of a presented credential (compressed `S`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(pub [u8; 32]);

impl SerialNumber {
    pub fn from_element<P: GroupElement>(s: &P) -> Self {
        Self(s.compress())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for SerialNumber {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// serial number set - tracks spent credentials within one issuer
#[derive(Clone, Debug, Default)]
pub struct SerialNumberSet {
    serials: HashSet<SerialNumber>,
}

impl SerialNumberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// check if serial exists (credential already spent)
    pub fn contains(&self, serial: &SerialNumber) -> bool {
        self.serials.contains(serial)
    }

    /// insert serial (mark credential as spent)
    /// returns false if already exists (double-spend attempt)
    pub fn insert(&mut self, serial: SerialNumber) -> bool {
        self.serials.insert(serial)
    }

    /// number of spent credentials
    pub fn len(&self) -> usize {
        self.serials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_number_set() {
        let mut set = SerialNumberSet::new();
        let serial = SerialNumber([1u8; 32]);

        assert!(!set.contains(&serial));
        assert!(set.insert(serial));
        assert!(set.contains(&serial));
        assert!(!set.insert(serial)); // double-spend rejected
        assert_eq!(set.len(), 1);
    }
}
