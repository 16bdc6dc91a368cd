use checksums::{StrongKind, WeakKind};

/// Magic number opening a delta stream.
pub const DELTA_MAGIC: u32 = 0x7273_0236;

/// Magic number opening a signature file.
///
/// The value selects both the weak (rolling) and strong checksum algorithm
/// used for every block in the signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigMagic {
    /// MD4 strong sums with the Fletcher-style rollsum.
    Md4Rollsum,
    /// BLAKE2b strong sums with the Fletcher-style rollsum.
    Blake2Rollsum,
    /// MD4 strong sums with the RabinKarp rolling hash.
    Md4RabinKarp,
    /// BLAKE2b strong sums with the RabinKarp rolling hash.
    Blake2RabinKarp,
}

impl SigMagic {
    /// The recommended magic for newly generated signatures.
    pub const RECOMMENDED: Self = Self::Blake2RabinKarp;

    /// Returns the 4-byte wire value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Md4Rollsum => 0x7273_0136,
            Self::Blake2Rollsum => 0x7273_0137,
            Self::Md4RabinKarp => 0x7273_0146,
            Self::Blake2RabinKarp => 0x7273_0147,
        }
    }

    /// Parses a 4-byte wire value, returning `None` for unknown magics.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x7273_0136 => Some(Self::Md4Rollsum),
            0x7273_0137 => Some(Self::Blake2Rollsum),
            0x7273_0146 => Some(Self::Md4RabinKarp),
            0x7273_0147 => Some(Self::Blake2RabinKarp),
            _ => None,
        }
    }

    /// The rolling checksum algorithm this magic selects.
    #[must_use]
    pub const fn weak_kind(self) -> WeakKind {
        match self {
            Self::Md4Rollsum | Self::Blake2Rollsum => WeakKind::Rollsum,
            Self::Md4RabinKarp | Self::Blake2RabinKarp => WeakKind::RabinKarp,
        }
    }

    /// The strong checksum algorithm this magic selects.
    #[must_use]
    pub const fn strong_kind(self) -> StrongKind {
        match self {
            Self::Md4Rollsum | Self::Md4RabinKarp => StrongKind::Md4,
            Self::Blake2Rollsum | Self::Blake2RabinKarp => StrongKind::Blake2,
        }
    }

    /// The longest strong-sum truncation this magic permits.
    #[must_use]
    pub const fn max_strong_len(self) -> usize {
        self.strong_kind().digest_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for magic in [
            SigMagic::Md4Rollsum,
            SigMagic::Blake2Rollsum,
            SigMagic::Md4RabinKarp,
            SigMagic::Blake2RabinKarp,
        ] {
            assert_eq!(SigMagic::from_u32(magic.as_u32()), Some(magic));
        }
    }

    #[test]
    fn unknown_magic_is_rejected() {
        assert_eq!(SigMagic::from_u32(DELTA_MAGIC), None);
        assert_eq!(SigMagic::from_u32(0), None);
    }

    #[test]
    fn kinds_follow_the_magic() {
        assert_eq!(SigMagic::Md4Rollsum.weak_kind(), WeakKind::Rollsum);
        assert_eq!(SigMagic::Md4Rollsum.strong_kind(), StrongKind::Md4);
        assert_eq!(SigMagic::Blake2RabinKarp.weak_kind(), WeakKind::RabinKarp);
        assert_eq!(SigMagic::Blake2RabinKarp.strong_kind(), StrongKind::Blake2);
        assert_eq!(SigMagic::Md4RabinKarp.max_strong_len(), 16);
        assert_eq!(SigMagic::Blake2Rollsum.max_strong_len(), 32);
    }
}
