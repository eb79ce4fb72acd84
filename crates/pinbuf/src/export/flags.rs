// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host access-mode request flags.
//!
//! Bit values follow the CPython buffer protocol (`PyBUF_*`), so a host
//! bridge can pass its request word through unchanged.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

const C_ORDER: u32 = 0x0020;
const F_ORDER: u32 = 0x0040;
const ANY_ORDER: u32 = 0x0080;

/// Access mode requested by the host when it asks for a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct AccessFlags(pub u32);

impl AccessFlags {
    /// Read-only, no format, no shape requirements.
    pub const SIMPLE: Self = Self(0x0000);

    /// Write access (never granted)
    pub const WRITABLE: Self = Self(0x0001);

    /// Request the element format string
    pub const FORMAT: Self = Self(0x0004);

    pub const ND: Self = Self(0x0008);

    pub const STRIDES: Self = Self(0x0010 | Self::ND.0);

    pub const C_CONTIGUOUS: Self = Self(C_ORDER | Self::STRIDES.0);

    /// Reverse (Fortran) order (never granted)
    pub const F_CONTIGUOUS: Self = Self(F_ORDER | Self::STRIDES.0);

    pub const ANY_CONTIGUOUS: Self = Self(ANY_ORDER | Self::STRIDES.0);

    /// Bits that are rejected whatever else is requested.
    const UNSUPPORTED: u32 = Self::WRITABLE.0 | F_ORDER;

    #[must_use]
    pub const fn empty() -> Self {
        Self::SIMPLE
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// All bits of `flag` are set.
    #[must_use]
    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Satisfiable by a read-only, forward-contiguous, 1-D export.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        (self.0 & Self::UNSUPPORTED) == 0
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_flags_contain_their_parts() {
        assert!(AccessFlags::C_CONTIGUOUS.contains(AccessFlags::STRIDES));
        assert!(AccessFlags::STRIDES.contains(AccessFlags::ND));
        assert!(!AccessFlags::ND.contains(AccessFlags::STRIDES));
        assert!(AccessFlags::SIMPLE.contains(AccessFlags::empty()));
    }

    #[test]
    fn test_supported_modes() {
        for flags in [
            AccessFlags::SIMPLE,
            AccessFlags::FORMAT,
            AccessFlags::ND,
            AccessFlags::STRIDES | AccessFlags::FORMAT,
            AccessFlags::C_CONTIGUOUS,
            AccessFlags::ANY_CONTIGUOUS | AccessFlags::FORMAT,
        ] {
            assert!(flags.is_supported(), "{flags} should be supported");
        }
    }

    #[test]
    fn test_rejected_modes() {
        for flags in [
            AccessFlags::WRITABLE,
            AccessFlags::F_CONTIGUOUS,
            AccessFlags::WRITABLE | AccessFlags::C_CONTIGUOUS,
            AccessFlags::F_CONTIGUOUS | AccessFlags::FORMAT,
        ] {
            assert!(!flags.is_supported(), "{flags} should be rejected");
        }
    }

    #[test]
    fn test_bits_match_host_protocol() {
        assert_eq!(AccessFlags::STRIDES.bits(), 0x18);
        assert_eq!(AccessFlags::C_CONTIGUOUS.bits(), 0x38);
        assert_eq!(AccessFlags::F_CONTIGUOUS.bits(), 0x58);
        assert_eq!(AccessFlags::ANY_CONTIGUOUS.bits(), 0x98);
        let mut flags = AccessFlags::FORMAT;
        flags |= AccessFlags::ND;
        assert_eq!(flags, AccessFlags::from_bits(0x0c));
    }
}
