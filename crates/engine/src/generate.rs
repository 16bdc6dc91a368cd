//! Streaming signature generation.
//!
//! Reads the basis a block at a time, emitting the 12-byte header followed
//! by one record per block: the raw weak sum and the truncated strong sum.
//! The final block may be short; its record is indistinguishable from a
//! full block's on the wire.

use checksums::{calc_strong_sum, calc_weak_sum};
use protocol::put_netint;
use signature::{SigParams, StrongLen, sig_args};

use crate::buffers::Buffers;
use crate::job::{Flow, JobCore, JobError, StepJob, StepResult};
use crate::scoop::{Scoop, Shortfall};
use crate::tube::Tube;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SigState {
    /// Emit magic, block length, and strong length.
    Header,
    /// Sum and emit one block per step.
    Generate,
    /// Push the last tube bytes out.
    Drain,
    /// Terminal.
    Done,
}

/// Streaming job that computes the signature of a basis stream.
///
/// The job validates and defaults its parameters the same way the
/// whole-file helpers do; pass explicit values to pin any of them.
#[derive(Debug)]
pub struct SigJob {
    params: SigParams,
    state: SigState,
    scoop: Scoop,
    tube: Tube,
    core: JobCore,
}

impl SigJob {
    /// Creates a signature job, deriving defaults for any unspecified
    /// parameter.
    pub fn new(
        magic: Option<protocol::SigMagic>,
        block_len: Option<usize>,
        strong_len: StrongLen,
    ) -> Result<Self, JobError> {
        let params = sig_args(None, magic, block_len, strong_len)?;
        Ok(Self::from_params(params))
    }

    /// Creates a signature job from already-validated parameters.
    #[must_use]
    pub fn from_params(params: SigParams) -> Self {
        let mut core = JobCore::default();
        core.stats.block_len = params.block_len;
        Self {
            params,
            state: SigState::Header,
            scoop: Scoop::new(),
            tube: Tube::new(),
            core,
        }
    }

    /// The parameters this job emits signatures with.
    #[must_use]
    pub const fn params(&self) -> SigParams {
        self.params
    }

    fn catchup(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        match self.tube.catchup(&mut self.scoop, buffers) {
            Ok(()) => Ok(Flow::Running),
            Err(Shortfall::Blocked) => Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => Err(JobError::InputEnded),
        }
    }

    /// Sums `len` bytes at the head of the scoop and queues their record.
    fn emit_block(&mut self, len: usize) {
        let weak;
        let strong;
        {
            let block = &self.scoop.data()[..len];
            weak = calc_weak_sum(self.params.magic.weak_kind(), block);
            strong = calc_strong_sum(self.params.magic.strong_kind(), block);
        }
        let mut buf = [0u8; 4];
        put_netint(u64::from(weak), 4, &mut buf);
        self.tube.write(&buf);
        self.tube.write(&strong[..self.params.strong_len]);
        self.scoop.advance(len);
        self.core.stats.sig_blocks += 1;
    }
}

impl StepJob for SigJob {
    fn step(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        let flow = self.catchup(buffers)?;
        if flow != Flow::Running {
            return Ok(flow);
        }
        match self.state {
            SigState::Header => {
                tracing::debug!(
                    magic = ?self.params.magic,
                    block_len = self.params.block_len,
                    strong_len = self.params.strong_len,
                    "emitting signature header"
                );
                let mut buf = [0u8; 12];
                put_netint(u64::from(self.params.magic.as_u32()), 4, &mut buf[0..]);
                put_netint(self.params.block_len as u64, 4, &mut buf[4..]);
                put_netint(self.params.strong_len as u64, 4, &mut buf[8..]);
                self.tube.write(&buf);
                self.state = SigState::Generate;
                Ok(Flow::Running)
            }
            SigState::Generate => {
                match self.scoop.readahead(buffers, self.params.block_len) {
                    Ok(()) => {
                        self.emit_block(self.params.block_len);
                        Ok(Flow::Running)
                    }
                    Err(Shortfall::Blocked) => Ok(Flow::Blocked),
                    Err(Shortfall::InputEnded) => {
                        // Accept whatever is left as the short final block.
                        let rest = self.scoop.avail(buffers);
                        if rest == 0 {
                            self.state = SigState::Drain;
                            return Ok(Flow::Running);
                        }
                        match self.scoop.readahead(buffers, rest) {
                            Ok(()) => {}
                            Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
                            Err(Shortfall::InputEnded) => return Err(JobError::InputEnded),
                        }
                        tracing::trace!(len = rest, "got short final block");
                        self.emit_block(rest);
                        Ok(Flow::Running)
                    }
                }
            }
            SigState::Drain => {
                self.state = SigState::Done;
                Ok(Flow::Running)
            }
            SigState::Done => Ok(Flow::Done),
        }
    }

    fn core(&self) -> &JobCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut JobCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, StreamJob};
    use protocol::SigMagic;

    fn run_all(job: &mut SigJob, input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 12 + (input.len() / 16 + 2) * 36];
        let mut buffers = Buffers::new(input, &mut out, true);
        assert_eq!(job.iter(&mut buffers).unwrap(), JobStatus::Done);
        let n = buffers.produced();
        out.truncate(n);
        out
    }

    #[test]
    fn empty_basis_produces_just_the_header() {
        let mut job = SigJob::new(
            Some(SigMagic::Blake2RabinKarp),
            Some(2048),
            StrongLen::Max,
        )
        .unwrap();
        let sig = run_all(&mut job, b"");
        assert_eq!(sig.len(), 12);
        assert_eq!(&sig[0..4], &[0x72, 0x73, 0x01, 0x47]);
        assert_eq!(&sig[4..8], &[0x00, 0x00, 0x08, 0x00]);
        assert_eq!(&sig[8..12], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(job.stats().sig_blocks, 0);
    }

    #[test]
    fn records_are_weak_then_truncated_strong() {
        let params = sig_args(
            None,
            Some(SigMagic::Md4RabinKarp),
            Some(4),
            StrongLen::Exact(8),
        )
        .unwrap();
        let mut job = SigJob::from_params(params);
        let sig = run_all(&mut job, b"abcdEFGH");
        assert_eq!(sig.len(), 12 + 2 * (4 + 8));
        assert_eq!(job.stats().sig_blocks, 2);

        let weak = calc_weak_sum(checksums::WeakKind::RabinKarp, b"abcd");
        assert_eq!(&sig[12..16], &weak.to_be_bytes());
        let strong = calc_strong_sum(checksums::StrongKind::Md4, b"abcd");
        assert_eq!(&sig[16..24], &strong[..8]);
    }

    #[test]
    fn short_final_block_is_summed_over_its_own_bytes() {
        let params = sig_args(
            None,
            Some(SigMagic::Blake2RabinKarp),
            Some(4),
            StrongLen::Exact(4),
        )
        .unwrap();
        let mut job = SigJob::from_params(params);
        let sig = run_all(&mut job, b"abcdef");
        assert_eq!(job.stats().sig_blocks, 2);
        let weak_tail = calc_weak_sum(checksums::WeakKind::RabinKarp, b"ef");
        assert_eq!(&sig[20..24], &weak_tail.to_be_bytes());
    }

    #[test]
    fn identical_input_yields_identical_signatures() {
        let input: Vec<u8> = (0u32..5000).map(|i| (i * 7 % 256) as u8).collect();
        let make = || {
            let mut job =
                SigJob::new(Some(SigMagic::Blake2Rollsum), Some(512), StrongLen::Max).unwrap();
            run_all(&mut job, &input)
        };
        assert_eq!(make(), make());
    }
}
