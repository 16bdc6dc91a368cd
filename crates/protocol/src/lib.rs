#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` defines the on-wire vocabulary shared by the signature and
//! delta formats: the magic numbers that open each file, the variable-width
//! big-endian integers both formats are built from, and the delta command
//! opcodes together with the prototype table the patch interpreter decodes
//! them with.
//!
//! The crate is deliberately free of any streaming or buffering concerns;
//! everything here operates on in-memory byte slices and is infallible or
//! returns a plain value. Framing and back-pressure live in the engine.

mod command;
mod magic;
mod netint;

pub use command::{CommandKind, OP_END, Prototype, copy_opcode, literal_opcode, prototype};
pub use magic::{DELTA_MAGIC, SigMagic};
pub use netint::{MAX_INT_BYTES, get_netint, int_len, put_netint};
