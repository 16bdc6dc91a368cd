use std::fmt;

use checksums::{MAX_STRONG_LEN, StrongKind, WeakKind, calc_strong_sum, mix32};
use protocol::SigMagic;

use crate::SignatureError;
use crate::args::SigParams;
use crate::hashtable::HashIndex;

/// Checksums of one basis block.
#[derive(Clone, Copy)]
struct BlockSig {
    /// Weak sum as stored on the wire (un-mixed for rollsum signatures).
    weak: u32,
    /// Strong sum, zero-padded past the signature's truncation.
    strong: [u8; MAX_STRONG_LEN],
}

/// Result of probing a signature for a block match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lookup {
    /// Byte offset of the matching block in the basis, if any.
    pub offset: Option<u64>,
    /// Candidates whose weak sum matched but whose strong sum did not.
    pub strong_misses: u32,
}

/// The ordered block checksums of one basis, plus the weak-sum index built
/// over them.
///
/// Blocks are appended in basis order while a signature is loaded or
/// generated. [`build_hash_table`](Self::build_hash_table) then freezes the
/// signature; a frozen signature is immutable and safe to share between
/// delta jobs.
pub struct Signature {
    magic: SigMagic,
    block_len: usize,
    strong_len: usize,
    blocks: Vec<BlockSig>,
    index: Option<HashIndex>,
}

impl Signature {
    /// Creates an empty signature with the given parameters.
    #[must_use]
    pub fn new(params: SigParams) -> Self {
        Self {
            magic: params.magic,
            block_len: params.block_len,
            strong_len: params.strong_len,
            blocks: Vec::new(),
            index: None,
        }
    }

    /// Creates an empty signature preallocated for `expected_blocks`.
    pub fn with_capacity(
        params: SigParams,
        expected_blocks: usize,
    ) -> Result<Self, SignatureError> {
        let mut sig = Self::new(params);
        sig.blocks
            .try_reserve(expected_blocks)
            .map_err(|_| SignatureError::Mem("signature block array"))?;
        Ok(sig)
    }

    /// The algorithm pair of this signature.
    #[must_use]
    pub const fn magic(&self) -> SigMagic {
        self.magic
    }

    /// Uniform block length; the final basis block may be short.
    #[must_use]
    pub const fn block_len(&self) -> usize {
        self.block_len
    }

    /// Strong-sum truncation in bytes.
    #[must_use]
    pub const fn strong_len(&self) -> usize {
        self.strong_len
    }

    /// The rolling checksum algorithm blocks were summed with.
    #[must_use]
    pub const fn weak_kind(&self) -> WeakKind {
        self.magic.weak_kind()
    }

    /// The strong checksum algorithm blocks were summed with.
    #[must_use]
    pub const fn strong_kind(&self) -> StrongKind {
        self.magic.strong_kind()
    }

    /// Number of blocks appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if no blocks have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True once [`build_hash_table`](Self::build_hash_table) has run.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// The hash-table key for a stored weak sum.
    fn table_key(&self, weak: u32) -> u32 {
        match self.weak_kind() {
            WeakKind::Rollsum => mix32(weak),
            WeakKind::RabinKarp => weak,
        }
    }

    /// Appends the checksums of the next basis block.
    ///
    /// `strong` carries at least [`strong_len`](Self::strong_len) bytes;
    /// anything beyond the truncation is ignored. Fails with
    /// [`SignatureError::Frozen`] once the hash table has been built.
    pub fn append_block(&mut self, weak: u32, strong: &[u8]) -> Result<(), SignatureError> {
        if self.index.is_some() {
            return Err(SignatureError::Frozen);
        }
        self.blocks
            .try_reserve(1)
            .map_err(|_| SignatureError::Mem("signature block array"))?;
        let mut block = BlockSig {
            weak,
            strong: [0; MAX_STRONG_LEN],
        };
        block.strong[..self.strong_len].copy_from_slice(&strong[..self.strong_len]);
        self.blocks.push(block);
        Ok(())
    }

    /// Builds the weak-sum index, freezing the signature.
    ///
    /// Exact (weak, strong) duplicates are dropped so that probes always
    /// resolve to the first block inserted with a given pair. Calling this
    /// again on an indexed signature is a no-op.
    pub fn build_hash_table(&mut self) -> Result<(), SignatureError> {
        if self.index.is_some() {
            return Ok(());
        }
        let mut index = HashIndex::with_capacity(self.blocks.len())?;
        for i in 0..self.blocks.len() {
            let key = self.table_key(self.blocks[i].weak);
            let strong = &self.blocks[i].strong[..self.strong_len];
            let duplicate = index
                .candidates(key)
                .any(|idx| &self.blocks[idx as usize].strong[..self.strong_len] == strong);
            if !duplicate {
                index.insert(key, i as u32);
            }
        }
        tracing::debug!(blocks = self.blocks.len(), "built signature hash table");
        self.index = Some(index);
        Ok(())
    }

    /// Looks up a block whose weak and strong sums match `window`.
    ///
    /// `weak` is the scanner's digest (already mixed for rollsum
    /// signatures). The strong sum of `window` is computed lazily, at most
    /// once, and only when a weak candidate exists. The returned offset is
    /// the block index times the block length; for a short final block the
    /// caller uses the window length, not the block length, as the match
    /// length.
    ///
    /// `prefer` is a basis offset the caller would like the match to land
    /// on, typically the extension point of a pending copy run. The index
    /// dedups identical blocks, so without the hint repeated content would
    /// always resolve to the first duplicate and adjacent matches could
    /// never coalesce. The hinted block is checked against the window sums
    /// before the index is probed.
    #[must_use]
    pub fn find_match(&self, weak: u32, window: &[u8], prefer: Option<u64>) -> Lookup {
        let mut lookup = Lookup {
            offset: None,
            strong_misses: 0,
        };
        let Some(index) = &self.index else {
            debug_assert!(false, "find_match before build_hash_table");
            return lookup;
        };
        let mut strong: Option<[u8; MAX_STRONG_LEN]> = None;
        let mut strong_of_window =
            |window: &[u8]| *strong.get_or_insert_with(|| calc_strong_sum(self.strong_kind(), window));

        if let Some(pos) = prefer {
            if pos % self.block_len as u64 == 0 {
                if let Ok(idx) = usize::try_from(pos / self.block_len as u64) {
                    if let Some(block) = self.blocks.get(idx) {
                        if self.table_key(block.weak) == weak
                            && block.strong[..self.strong_len]
                                == strong_of_window(window)[..self.strong_len]
                        {
                            lookup.offset = Some(pos);
                            return lookup;
                        }
                    }
                }
            }
        }

        for idx in index.candidates(weak) {
            let sum = strong_of_window(window);
            if self.blocks[idx as usize].strong[..self.strong_len] == sum[..self.strong_len] {
                lookup.offset = Some(u64::from(idx) * self.block_len as u64);
                return lookup;
            }
            lookup.strong_misses += 1;
        }
        lookup
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("magic", &self.magic)
            .field("block_len", &self.block_len)
            .field("strong_len", &self.strong_len)
            .field("blocks", &self.blocks.len())
            .field("indexed", &self.index.is_some())
            .finish()
    }
}
