use protocol::SigMagic;

use crate::SignatureError;

/// Block length used when the basis size is unknown.
pub const DEFAULT_BLOCK_LEN: usize = 2048;

/// Conservative minimum strong-sum length used when the basis size is
/// unknown.
pub const DEFAULT_MIN_STRONG_LEN: usize = 12;

/// How the caller wants the strong-sum truncation chosen.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrongLen {
    /// Use the full digest for the selected algorithm.
    Max,
    /// Use the smallest length that keeps collisions negligible for the
    /// given basis size.
    Min,
    /// Use exactly this many bytes.
    Exact(usize),
}

/// Validated signature parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SigParams {
    /// Algorithm pair for the signature.
    pub magic: SigMagic,
    /// Uniform block length; the final basis block may be short.
    pub block_len: usize,
    /// Strong-sum truncation in bytes.
    pub strong_len: usize,
}

/// Floor of the base-2 logarithm.
fn ln2(value: u64) -> u64 {
    debug_assert!(value > 0);
    u64::from(63 - value.leading_zeros())
}

/// Fills in defaults and validates signature parameters.
///
/// The recommended block length is the square root of the basis size,
/// rounded down to a multiple of 128 with a floor of 256: a reasonable
/// compromise between signature size, delta size, and scan cost. The
/// minimum strong length is sized so that even a worst-case scan (every
/// byte offset compared against every block) keeps the collision chance
/// around 2^-32, counting the weak sum as 16 bits of the margin.
pub fn sig_args(
    old_fsize: Option<u64>,
    magic: Option<SigMagic>,
    block_len: Option<usize>,
    strong_len: StrongLen,
) -> Result<SigParams, SignatureError> {
    let magic = magic.unwrap_or(SigMagic::RECOMMENDED);
    let max_strong_len = magic.max_strong_len();

    let rec_block_len = match old_fsize {
        None => DEFAULT_BLOCK_LEN,
        Some(size) if size <= 256 * 256 => 256,
        Some(size) => (size.isqrt() as usize) & !127,
    };
    let block_len = match block_len {
        None => rec_block_len,
        Some(0) => {
            return Err(SignatureError::Param("block length must be non-zero".into()));
        }
        Some(len) => len,
    };

    let min_strong_len = match old_fsize {
        None => DEFAULT_MIN_STRONG_LEN,
        Some(size) => {
            2 + (ln2(size + (1 << 24)) + ln2(size / block_len as u64 + 1) + 7) as usize / 8
        }
    };
    let strong_len = match strong_len {
        StrongLen::Max => max_strong_len,
        StrongLen::Min => min_strong_len,
        StrongLen::Exact(0) => {
            return Err(SignatureError::Param(
                "strong sum length must be non-zero".into(),
            ));
        }
        StrongLen::Exact(len) if len > max_strong_len => {
            return Err(SignatureError::Param(format!(
                "strong sum length {len} exceeds the {max_strong_len}-byte maximum for {magic:?}"
            )));
        }
        StrongLen::Exact(len) => {
            if old_fsize.is_some() && len < min_strong_len {
                tracing::warn!(
                    strong_len = len,
                    min_strong_len,
                    "strong sum length is below the recommended minimum"
                );
            }
            len
        }
    };

    Ok(SigParams {
        magic,
        block_len,
        strong_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_size_uses_conservative_defaults() {
        let params = sig_args(None, None, None, StrongLen::Min).unwrap();
        assert_eq!(params.magic, SigMagic::Blake2RabinKarp);
        assert_eq!(params.block_len, DEFAULT_BLOCK_LEN);
        assert_eq!(params.strong_len, DEFAULT_MIN_STRONG_LEN);
    }

    #[test]
    fn small_bases_get_the_floor_block_length() {
        let params = sig_args(Some(1000), None, None, StrongLen::Max).unwrap();
        assert_eq!(params.block_len, 256);
        assert_eq!(params.strong_len, 32);
    }

    #[test]
    fn block_length_tracks_the_square_root() {
        let params = sig_args(Some(1 << 30), None, None, StrongLen::Max).unwrap();
        // sqrt(2^30) = 32768, already a multiple of 128.
        assert_eq!(params.block_len, 32768);

        let params = sig_args(Some(100_000_000), None, None, StrongLen::Max).unwrap();
        // sqrt(1e8) = 10000, rounded down to a multiple of 128.
        assert_eq!(params.block_len, 9984);
    }

    #[test]
    fn minimum_strong_length_grows_with_the_basis() {
        let small = sig_args(Some(1 << 20), None, None, StrongLen::Min).unwrap();
        let large = sig_args(Some(1 << 40), None, None, StrongLen::Min).unwrap();
        assert!(small.strong_len >= 5);
        assert!(large.strong_len > small.strong_len);
        assert!(large.strong_len <= 32);
    }

    #[test]
    fn oversized_strong_length_is_rejected() {
        let err = sig_args(
            None,
            Some(SigMagic::Md4RabinKarp),
            None,
            StrongLen::Exact(17),
        )
        .unwrap_err();
        assert!(matches!(err, SignatureError::Param(_)));
    }

    #[test]
    fn zero_block_length_is_rejected() {
        let err = sig_args(None, None, Some(0), StrongLen::Max).unwrap_err();
        assert!(matches!(err, SignatureError::Param(_)));
    }
}
