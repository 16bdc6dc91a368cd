use std::fmt;

/// Counters accumulated by a job over its lifetime.
///
/// Which fields move depends on the operation: delta jobs count commands
/// and matches, signature jobs count blocks, every job counts the bytes
/// that passed through its buffers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// LITERAL commands emitted or interpreted.
    pub lit_cmds: u64,
    /// Payload bytes carried by those literals.
    pub lit_bytes: u64,
    /// Command-header bytes spent on literals.
    pub lit_cmdbytes: u64,
    /// COPY commands emitted or interpreted.
    pub copy_cmds: u64,
    /// Basis bytes covered by those copies.
    pub copy_bytes: u64,
    /// Command-header bytes spent on copies.
    pub copy_cmdbytes: u64,
    /// Block matches found by the delta scanner.
    pub matches: u64,
    /// Weak-sum hits rejected by the strong sum.
    pub false_matches: u64,
    /// Blocks written or loaded by the signature jobs.
    pub sig_blocks: u64,
    /// Block length of the signature involved, if any.
    pub block_len: usize,
    /// Total input bytes consumed.
    pub in_bytes: u64,
    /// Total output bytes produced.
    pub out_bytes: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| {
            if first {
                first = false;
                Ok(())
            } else {
                f.write_str(" ")
            }
        };
        if self.lit_cmds > 0 {
            sep(f)?;
            write!(
                f,
                "literal[{} cmds, {} bytes, {} cmdbytes]",
                self.lit_cmds, self.lit_bytes, self.lit_cmdbytes
            )?;
        }
        if self.copy_cmds > 0 || self.false_matches > 0 {
            sep(f)?;
            write!(
                f,
                "copy[{} cmds, {} bytes, {} cmdbytes, {} false]",
                self.copy_cmds, self.copy_bytes, self.copy_cmdbytes, self.false_matches
            )?;
        }
        if self.sig_blocks > 0 {
            sep(f)?;
            write!(
                f,
                "signature[{} blocks, {} bytes per block]",
                self.sig_blocks, self.block_len
            )?;
        }
        sep(f)?;
        write!(f, "in[{} bytes] out[{} bytes]", self.in_bytes, self.out_bytes)
    }
}
