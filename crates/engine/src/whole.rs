//! Whole-file convenience drivers.
//!
//! These helpers wrap the streaming jobs for callers that just want to
//! convert complete `std::io` streams: allocate a pair of buffers, loop the
//! job until it finishes, write what it produces. Buffer sizes default to
//! values matched to each operation's access pattern and can be overridden
//! for testing or tuning.

use std::io::{Read, Write};

use signature::{Signature, StrongLen, sig_args};
use thiserror::Error;

use crate::buffers::Buffers;
use crate::delta::DeltaJob;
use crate::generate::SigJob;
use crate::job::{JobError, JobStatus, MAX_DELTA_CMD, StreamJob};
use crate::loadsig::LoadSigJob;
use crate::patch::{BasisRead, PatchJob};
use crate::stats::Stats;

/// Failure of a whole-file helper: either the job itself or the
/// surrounding file I/O.
#[derive(Debug, Error)]
pub enum WholeError {
    /// The streaming job failed.
    #[error(transparent)]
    Job(#[from] JobError),
    /// Reading the input or writing the output failed.
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Optional overrides for the driver's buffer sizes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufSizes {
    /// Input buffer size; `None` uses the operation's default.
    pub input: Option<usize>,
    /// Output buffer size; `None` uses the operation's default.
    pub output: Option<usize>,
}

/// Drives a job over a reader and an optional writer until it completes.
pub fn run_job<J: StreamJob>(
    job: &mut J,
    input: &mut impl Read,
    mut output: Option<&mut dyn Write>,
    inbuflen: usize,
    outbuflen: usize,
) -> Result<(), WholeError> {
    let mut inbuf = vec![0u8; inbuflen.max(1)];
    let mut outbuf = vec![0u8; outbuflen.max(1)];
    let mut start = 0;
    let mut end = 0;
    let mut eof = false;

    loop {
        if start == end && !eof {
            start = 0;
            end = loop {
                match input.read(&mut inbuf) {
                    Ok(n) => break n,
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(err) => return Err(err.into()),
                }
            };
            if end == 0 {
                eof = true;
            }
        }

        let mut buffers = Buffers::new(&inbuf[start..end], &mut outbuf, eof);
        let status = job.iter(&mut buffers)?;
        start += buffers.consumed();
        let produced = buffers.produced();
        if produced > 0 {
            if let Some(writer) = output.as_deref_mut() {
                writer.write_all(&outbuf[..produced])?;
            }
        }
        if status == JobStatus::Done {
            if let Some(writer) = output.as_deref_mut() {
                writer.flush()?;
            }
            return Ok(());
        }
    }
}

/// Computes the signature of `basis` and writes it to `sig_out`.
///
/// `old_fsize` is the basis size when known; it drives the default block
/// and strong-sum lengths exactly as the command-line tool does.
pub fn signature_file(
    basis: &mut impl Read,
    sig_out: &mut impl Write,
    old_fsize: Option<u64>,
    magic: Option<protocol::SigMagic>,
    block_len: Option<usize>,
    strong_len: StrongLen,
    bufs: BufSizes,
) -> Result<Stats, WholeError> {
    let params = sig_args(old_fsize, magic, block_len, strong_len).map_err(JobError::from)?;
    let mut job = SigJob::from_params(params);
    // Room for four blocks in, a header plus four records out.
    let inbuflen = bufs.input.unwrap_or(4 * params.block_len);
    let outbuflen = bufs.output.unwrap_or(12 + 4 * (4 + params.strong_len));
    run_job(&mut job, basis, Some(sig_out), inbuflen, outbuflen)?;
    Ok(job.stats().clone())
}

/// Parses a signature stream into memory. The hash table is *not* built;
/// call [`Signature::build_hash_table`] before generating deltas.
pub fn loadsig_file(
    sig_in: &mut impl Read,
    sig_fsize: Option<u64>,
    bufs: BufSizes,
) -> Result<(Signature, Stats), WholeError> {
    let mut job = LoadSigJob::new(sig_fsize);
    let inbuflen = bufs.input.unwrap_or(1024 * 16);
    run_job(&mut job, sig_in, None, inbuflen, 0)?;
    let stats = job.stats().clone();
    let sig = job.into_signature()?;
    Ok((sig, stats))
}

/// Computes the delta from `sig` to `new` and writes it to `delta_out`.
pub fn delta_file(
    sig: &Signature,
    new: &mut impl Read,
    delta_out: &mut impl Write,
    bufs: BufSizes,
) -> Result<Stats, WholeError> {
    let mut job = DeltaJob::new(Some(sig))?;
    let inbuflen = bufs.input.unwrap_or(4 * (MAX_DELTA_CMD + sig.block_len()));
    let outbuflen = bufs.output.unwrap_or(4 * MAX_DELTA_CMD);
    run_job(&mut job, new, Some(delta_out), inbuflen, outbuflen)?;
    Ok(job.stats().clone())
}

/// Applies `delta` to `basis` and writes the reconstructed stream to
/// `new_out`.
pub fn patch_file(
    basis: impl BasisRead,
    delta: &mut impl Read,
    new_out: &mut impl Write,
    bufs: BufSizes,
) -> Result<Stats, WholeError> {
    let mut job = PatchJob::new(basis);
    let inbuflen = bufs.input.unwrap_or(MAX_DELTA_CMD);
    let outbuflen = bufs.output.unwrap_or(4 * MAX_DELTA_CMD);
    run_job(&mut job, delta, Some(new_out), inbuflen, outbuflen)?;
    Ok(job.stats().clone())
}
