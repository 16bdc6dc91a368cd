#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the weak (rolling) and strong checksum primitives used
//! by the delta engine. Weak sums identify candidate blocks with an O(1)
//! sliding-window update; strong sums confirm candidates and reject
//! collisions.
//!
//! # Design
//!
//! The crate offers two modules:
//!
//! - [`rolling`] implements the two interchangeable weak checksums: the
//!   Fletcher-style [`rolling::Rollsum`] kept for compatibility with older
//!   signatures, and the multiplicative [`rolling::RabinKarp`] used by new
//!   ones. Both are wrapped by the [`WeakSum`] sum type so the scanner stays
//!   algorithm-agnostic.
//! - [`strong`] exposes one-shot MD4 and BLAKE2b-256 digests. Strong sums are
//!   always computed over a single contiguous block, so no streaming state is
//!   carried between calls.
//!
//! # Invariants
//!
//! - A [`WeakSum`] digest always describes exactly the bytes currently in the
//!   window; `update`, `rotate`, `rollin`, and `rollout` keep the window
//!   length consistent.
//! - Rollsum digests are scrambled through [`mix32`] before use as hash keys;
//!   the raw digest is what appears in signature files.

pub mod rolling;
pub mod strong;

pub use rolling::{RabinKarp, Rollsum, WeakKind, WeakSum, calc_weak_sum, mix32};
pub use strong::{MAX_STRONG_LEN, StrongKind, calc_strong_sum};
