use std::io;
use std::sync::Arc;

use signature::SignatureError;
use thiserror::Error;

use crate::buffers::Buffers;
use crate::stats::Stats;

/// Longest encoding of a single delta command, including its opcode and
/// operands. Buffer sizing throughout the engine is derived from this.
pub const MAX_DELTA_CMD: usize = 1 << 16;

/// Outcome of a successful [`StreamJob::iter`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
    /// The whole operation has finished; further calls keep returning this.
    Done,
    /// Progress stopped for more input or output room; call again with
    /// fresh buffers.
    Blocked,
}

/// Failure of a streaming job.
///
/// Errors are sticky: once a step fails, every subsequent `iter` call on
/// the same job returns the same error.
#[derive(Clone, Debug, Error)]
pub enum JobError {
    /// A 4-byte stream header did not match any known magic.
    #[error("unrecognized stream magic {found:#010x}")]
    BadMagic {
        /// The value actually read.
        found: u32,
    },
    /// The stream violates the format in a way that cannot be resynced.
    #[error("corrupt stream: {0}")]
    Corrupt(String),
    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    Param(String),
    /// An internal allocation failed.
    #[error("allocation failed")]
    Mem,
    /// The caller signalled end of input before the operation could finish.
    #[error("unexpected end of input")]
    InputEnded,
    /// The basis read callback reported an I/O failure.
    #[error("basis read failed: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for JobError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<SignatureError> for JobError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::BadMagic(found) => Self::BadMagic { found },
            SignatureError::Mem(_) => Self::Mem,
            other => Self::Param(other.to_string()),
        }
    }
}

/// Result of one internal state transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
    /// The state machine moved; step again immediately.
    Running,
    /// Out of input or output room; yield to the caller.
    Blocked,
    /// The operation has completed.
    Done,
}

pub(crate) type StepResult = Result<Flow, JobError>;

/// State shared by every job: accumulated statistics and the sticky error.
#[derive(Debug, Default)]
pub(crate) struct JobCore {
    pub(crate) stats: Stats,
    pub(crate) failed: Option<JobError>,
}

/// Implemented by each job kind; provides the per-step transition that the
/// blanket [`StreamJob`] driver loops over.
pub(crate) trait StepJob {
    fn step(&mut self, buffers: &mut Buffers<'_>) -> StepResult;
    fn core(&self) -> &JobCore;
    fn core_mut(&mut self) -> &mut JobCore;
}

/// A resumable streaming operation driven by caller-supplied buffers.
pub trait StreamJob {
    /// Runs the job until it completes or blocks on the given buffers.
    ///
    /// The job consumes input from and produces output into `buffers`;
    /// inspect [`Buffers::consumed`] and [`Buffers::produced`] afterwards.
    fn iter(&mut self, buffers: &mut Buffers<'_>) -> Result<JobStatus, JobError>;

    /// Statistics accumulated so far.
    fn stats(&self) -> &Stats;
}

impl<T: StepJob> StreamJob for T {
    fn iter(&mut self, buffers: &mut Buffers<'_>) -> Result<JobStatus, JobError> {
        if let Some(err) = &self.core().failed {
            return Err(err.clone());
        }
        let consumed_before = buffers.consumed();
        let produced_before = buffers.produced();
        let result = loop {
            match self.step(buffers) {
                Ok(Flow::Running) => {}
                Ok(Flow::Blocked) => break Ok(JobStatus::Blocked),
                Ok(Flow::Done) => break Ok(JobStatus::Done),
                Err(err) => {
                    self.core_mut().failed = Some(err.clone());
                    break Err(err);
                }
            }
        };
        let stats = &mut self.core_mut().stats;
        stats.in_bytes += (buffers.consumed() - consumed_before) as u64;
        stats.out_bytes += (buffers.produced() - produced_before) as u64;
        result
    }

    fn stats(&self) -> &Stats {
        &self.core().stats
    }
}
