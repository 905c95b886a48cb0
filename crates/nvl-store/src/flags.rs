use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Creation flags of a [`Store`](crate::Store), fixed for its lifetime.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NvFlags(u8);

impl NvFlags {
    /// No flags.
    pub const NONE: NvFlags = NvFlags(0);
    /// Compare keys without regard to ASCII case.
    pub const IGNORE_CASE: NvFlags = NvFlags(0x01);
    /// Allow several entries with the same key.
    pub const NO_UNIQUE: NvFlags = NvFlags(0x02);

    /// Every flag a caller may set.
    pub const PUBLIC_MASK: u8 = 0x03;

    /// Build flags from raw bits, rejecting unknown bits.
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits & !Self::PUBLIC_MASK == 0).then_some(NvFlags(bits))
    }

    /// Build flags from raw bits, dropping unknown bits.
    pub fn from_bits_truncate(bits: u8) -> Self {
        NvFlags(bits & Self::PUBLIC_MASK)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: NvFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn ignore_case(self) -> bool {
        self.contains(Self::IGNORE_CASE)
    }

    pub fn no_unique(self) -> bool {
        self.contains(Self::NO_UNIQUE)
    }
}

impl BitOr for NvFlags {
    type Output = NvFlags;

    fn bitor(self, rhs: NvFlags) -> NvFlags {
        NvFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for NvFlags {
    fn bitor_assign(&mut self, rhs: NvFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for NvFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.ignore_case() {
            names.push("IGNORE_CASE");
        }
        if self.no_unique() {
            names.push("NO_UNIQUE");
        }
        if names.is_empty() {
            f.write_str("NvFlags(NONE)")
        } else {
            write!(f, "NvFlags({})", names.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_and_query() {
        let flags = NvFlags::IGNORE_CASE | NvFlags::NO_UNIQUE;
        assert!(flags.ignore_case());
        assert!(flags.no_unique());
        assert_eq!(flags.bits(), 0x03);
        assert!(!NvFlags::NONE.ignore_case());
    }

    #[test]
    fn unknown_bits_rejected() {
        assert_eq!(NvFlags::from_bits(0x01), Some(NvFlags::IGNORE_CASE));
        assert!(NvFlags::from_bits(0x80).is_none());
        assert_eq!(NvFlags::from_bits_truncate(0x81), NvFlags::IGNORE_CASE);
    }

    #[test]
    fn debug_lists_names() {
        assert_eq!(format!("{:?}", NvFlags::NONE), "NvFlags(NONE)");
        assert_eq!(
            format!("{:?}", NvFlags::IGNORE_CASE | NvFlags::NO_UNIQUE),
            "NvFlags(IGNORE_CASE | NO_UNIQUE)"
        );
    }
}
