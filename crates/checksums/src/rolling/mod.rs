//! Rolling weak checksums for block matching.
//!
//! A rolling checksum hashes a sliding window of bytes and supports shifting
//! that window one byte at a time in O(1). Two algorithms are provided behind
//! the [`WeakSum`] wrapper:
//!
//! - [`Rollsum`], a Fletcher-style two-component sum. Cheap but with poor
//!   high-bit distribution, which is why its digest is passed through
//!   [`mix32`] before keying a hash table.
//! - [`RabinKarp`], a multiplicative hash with better statistical behaviour.
//!   Its digest is used verbatim.
//!
//! The operational interface is identical for both: `update` folds a slice
//! into the window, `rotate` slides the window one byte, `rollin`/`rollout`
//! grow and shrink it, and `digest` produces the 32-bit lookup value.

mod rabinkarp;
mod rollsum;
mod weak;

pub use rabinkarp::RabinKarp;
pub use rollsum::Rollsum;
pub use weak::{WeakKind, WeakSum, calc_weak_sum, mix32};
