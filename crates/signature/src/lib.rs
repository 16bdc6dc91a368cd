#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` holds the in-memory form of a basis signature: an ordered
//! collection of per-block checksums plus a hash index over the weak sums.
//! The delta scanner probes the index with a rolling digest and falls back
//! to a strong-sum comparison to confirm candidates.
//!
//! # Lifecycle
//!
//! A [`Signature`] is append-only while records are loaded. Once every
//! block is in, [`Signature::build_hash_table`] freezes it and builds the
//! index; only then can [`Signature::find_match`] be used. A built
//! signature is immutable and may be shared by several delta jobs.
//!
//! # Parameters
//!
//! [`sig_args`] derives the recommended block length and strong-sum
//! truncation from the basis size, mirroring the defaults used by the
//! whole-file helpers and the command-line tool.

mod args;
mod hashtable;
mod sumset;

use thiserror::Error;

pub use args::{DEFAULT_BLOCK_LEN, DEFAULT_MIN_STRONG_LEN, SigParams, StrongLen, sig_args};
pub use sumset::{Lookup, Signature};

/// Failure while building or validating a signature.
#[derive(Clone, Debug, Error)]
pub enum SignatureError {
    /// A magic value did not name any supported algorithm pair.
    #[error("invalid signature magic {0:#010x}")]
    BadMagic(u32),
    /// A parameter was out of range for the selected magic.
    #[error("{0}")]
    Param(String),
    /// Allocating space for the named structure failed.
    #[error("allocation failed for {0}")]
    Mem(&'static str),
    /// A block was appended after the hash table was built.
    #[error("signature is frozen once its hash table is built")]
    Frozen,
}
