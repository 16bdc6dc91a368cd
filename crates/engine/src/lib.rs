#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` drives the three streaming operations of the delta algorithm:
//! generating a signature from a basis stream, generating a delta from a
//! signature and a new stream, and applying a delta back onto a basis. A
//! fourth job parses a signature file into the in-memory form the delta
//! scanner searches.
//!
//! # Design
//!
//! Every operation is a *job*: a resumable state machine stepped by
//! [`StreamJob::iter`] with a caller-owned [`Buffers`] window. A step
//! consumes whatever input it can, produces whatever output fits, and
//! returns [`JobStatus::Blocked`] when it needs more of either. The library
//! performs no I/O of its own; the [`whole`] module layers convenience
//! helpers over `std::io` streams for callers that just want to convert
//! whole files.
//!
//! Internally a job owns two small buffers. The *scoop* accumulates enough
//! lookahead for the delta scanner to index into a full block plus one
//! maximum-size command. The *tube* holds output the job has committed to
//! emit: a few command bytes, optionally followed by an instruction to copy
//! payload straight from the scoop. Every state drains the tube before doing
//! anything else, which is what makes each emission point resumable under
//! output back-pressure.
//!
//! # Example
//!
//! ```
//! use engine::{Buffers, DeltaJob, JobStatus, StreamJob};
//!
//! // No signature bound: the delta degenerates to literal commands.
//! let mut job = DeltaJob::new(None).unwrap();
//! let mut out = [0u8; 64];
//! let mut buffers = Buffers::new(b"hello", &mut out, true);
//! assert_eq!(job.iter(&mut buffers).unwrap(), JobStatus::Done);
//! assert!(buffers.produced() > 0);
//! ```

mod buffers;
mod delta;
mod emit;
mod generate;
mod job;
mod loadsig;
mod patch;
mod scoop;
mod stats;
mod tube;
pub mod whole;

pub use buffers::Buffers;
pub use delta::DeltaJob;
pub use generate::SigJob;
pub use job::{JobError, JobStatus, MAX_DELTA_CMD, StreamJob};
pub use loadsig::LoadSigJob;
pub use patch::{BasisRead, PatchJob, SeekBasis};
pub use stats::Stats;
