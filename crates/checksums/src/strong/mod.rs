//! Strong checksums used to confirm weak-sum matches.
//!
//! Two algorithms exist on the wire: MD4 (16 bytes, the legacy default) and
//! BLAKE2b-256 (32 bytes, the default for new signatures). Signatures may
//! truncate either digest to a configured prefix length, so both are
//! computed in full and cut down by the caller.

mod blake2b;
mod md4;

pub use blake2b::Blake2b256;
pub use md4::Md4;

/// The longest strong sum any supported algorithm produces, in bytes.
pub const MAX_STRONG_LEN: usize = 32;

/// Which strong checksum algorithm a signature uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrongKind {
    /// MD4, 16-byte digests.
    Md4,
    /// BLAKE2b-256, 32-byte digests.
    Blake2,
}

impl StrongKind {
    /// Full digest length of this algorithm in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md4 => 16,
            Self::Blake2 => 32,
        }
    }
}

/// Computes the strong sum of a block.
///
/// The result is zero-padded to [`MAX_STRONG_LEN`]; only the first
/// [`StrongKind::digest_len`] bytes are meaningful.
#[must_use]
pub fn calc_strong_sum(kind: StrongKind, data: &[u8]) -> [u8; MAX_STRONG_LEN] {
    let mut out = [0u8; MAX_STRONG_LEN];
    match kind {
        StrongKind::Md4 => out[..16].copy_from_slice(&Md4::digest(data)),
        StrongKind::Blake2 => out.copy_from_slice(&Blake2b256::digest(data)),
    }
    out
}
