//! Streaming delta generation.
//!
//! The scanner walks the new stream a byte at a time, keeping a rolling
//! checksum of the window starting at the scan position. On a weak+strong
//! hit it starts (or extends) a pending COPY of basis bytes; on a miss it
//! grows a pending LITERAL run. Either pending run is only committed to the
//! tube when a boundary forces it: the next event cannot extend it, the run
//! reaches the command size cap, or the input ends.
//!
//! Because output can block at any byte, every commit point is re-entrant:
//! states drain the tube before scanning, payload bytes stay in the scoop
//! until the tube has copied them out, and an event that cannot commit its
//! predecessor is left unconsumed so the same window probes again on the
//! next iteration.

use checksums::WeakSum;
use signature::Signature;

use crate::buffers::Buffers;
use crate::emit;
use crate::job::{Flow, JobCore, JobError, MAX_DELTA_CMD, StepJob, StepResult};
use crate::scoop::{Scoop, Shortfall};
use crate::tube::Tube;

/// Cap on a single command's payload: a miss run is flushed before
/// exceeding it, and a match run is emitted as consecutive COPY commands of
/// at most this length.
const MAX_DATA_LEN: usize = MAX_DELTA_CMD - 3;

/// Worst-case encoded size of one COPY command.
const MAX_COPY_CMD: usize = 17;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DeltaState {
    /// Emit the delta magic.
    Header,
    /// Scan whole blocks against the signature.
    Scan,
    /// Input has ended; scan out the remaining partial window.
    Flush,
    /// No signature: pass input through as literals.
    Slack,
    /// Emit the END command.
    End,
    /// Push the last tube bytes out.
    Drain,
    /// Terminal.
    Done,
}

/// Streaming job that turns a new stream into a delta against a signature.
///
/// With no signature bound (or an empty one) the job emits a *slack delta*:
/// literal commands only, no matching. A non-empty signature must have its
/// hash table built before the job is created over it.
#[derive(Debug)]
pub struct DeltaJob<'a> {
    sig: Option<&'a Signature>,
    state: DeltaState,
    weak: WeakSum,
    /// Bytes at the head of the scoop that have been scanned but not yet
    /// dropped: a pending literal run when `basis_len` is zero, the bytes
    /// of the pending match otherwise.
    scan_pos: usize,
    /// Basis offset of the pending COPY run.
    basis_pos: u64,
    /// Remaining length of the pending COPY run; zero means no pending
    /// match.
    basis_len: u64,
    scoop: Scoop,
    tube: Tube,
    core: JobCore,
}

impl<'a> DeltaJob<'a> {
    /// Creates a delta job over a built signature, or a slack-delta job if
    /// `sig` is `None` or empty.
    pub fn new(sig: Option<&'a Signature>) -> Result<Self, JobError> {
        let sig = match sig {
            Some(sig) if sig.is_empty() => {
                tracing::debug!("empty signature, generating slack delta");
                None
            }
            Some(sig) if !sig.is_indexed() => {
                return Err(JobError::Param(
                    "signature hash table must be built before delta generation".into(),
                ));
            }
            other => other,
        };
        let weak = WeakSum::new(sig.map_or(checksums::WeakKind::RabinKarp, Signature::weak_kind));
        let mut core = JobCore::default();
        if let Some(sig) = sig {
            core.stats.block_len = sig.block_len();
        }
        Ok(Self {
            sig,
            state: DeltaState::Header,
            weak,
            scan_pos: 0,
            basis_pos: 0,
            basis_len: 0,
            scoop: Scoop::new(),
            tube: Tube::new(),
            core,
        })
    }

    /// Drains the tube, mapping back-pressure to a yield.
    fn catchup(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        match self.tube.catchup(&mut self.scoop, buffers) {
            Ok(()) => Ok(Flow::Running),
            Err(Shortfall::Blocked) => Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => Err(JobError::InputEnded),
        }
    }

    /// Commits the pending match or literal run, if any.
    ///
    /// Returns [`Flow::Blocked`] when the output cannot take the whole
    /// commitment yet; the pending state is left to resume, and callers
    /// must not consume new scan events until a retry completes.
    fn append_flush(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        if self.basis_len > 0 {
            // A run that grew past the cap is emitted as consecutive COPY
            // commands. The tube is drained between chunks, so the pending
            // (pos, len) pair doubles as the resume cursor.
            while self.basis_len > 0 {
                if self.tube.write_room() < MAX_COPY_CMD {
                    let flow = self.catchup(buffers)?;
                    if flow != Flow::Running {
                        return Ok(flow);
                    }
                }
                let n = self.basis_len.min(MAX_DATA_LEN as u64);
                tracing::trace!(pos = self.basis_pos, len = n, "committing match run");
                let cmd_bytes = emit::copy_cmd(&mut self.tube, self.basis_pos, n);
                self.core.stats.copy_cmds += 1;
                self.core.stats.copy_bytes += n;
                self.core.stats.copy_cmdbytes += cmd_bytes as u64;
                self.basis_pos += n;
                self.basis_len -= n;
            }
            // Only now can the matched bytes leave the scoop.
            self.process_match(buffers)
        } else if self.scan_pos > 0 {
            tracing::trace!(len = self.scan_pos, "committing literal run");
            let len = self.scan_pos as u64;
            let cmd_bytes = emit::literal_cmd(&mut self.tube, len);
            self.core.stats.lit_cmds += 1;
            self.core.stats.lit_bytes += len;
            self.core.stats.lit_cmdbytes += cmd_bytes as u64;
            self.tube.copy(self.scan_pos);
            self.scan_pos = 0;
            self.catchup(buffers)
        } else {
            Ok(Flow::Running)
        }
    }

    /// Drops consumed match bytes from the scoop and drains the tube.
    fn process_match(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        self.scoop.advance(self.scan_pos);
        self.scan_pos = 0;
        self.catchup(buffers)
    }

    /// The scan loop shared by [`DeltaState::Scan`] and
    /// [`DeltaState::Flush`]; `flushing` relaxes the window requirement so
    /// the final partial block drains out.
    fn scan_body(&mut self, buffers: &mut Buffers<'_>, flushing: bool) -> StepResult {
        let Some(sig) = self.sig else {
            return Err(JobError::Param("scan state requires a signature".into()));
        };
        let block_len = sig.block_len();

        let flow = self.catchup(buffers)?;
        if flow != Flow::Running {
            return Ok(flow);
        }

        // Keep at least a block plus one maximum command ahead of the scan
        // position, except at EOF where whatever remains must do.
        let min_len = block_len + MAX_DELTA_CMD;
        let mut want = self.scoop.avail(buffers);
        if want < min_len && !buffers.eof_in() {
            want = min_len;
        }
        match self.scoop.readahead(buffers, want) {
            Ok(()) => {}
            Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => return Err(JobError::InputEnded),
        }

        loop {
            let avail = self.scoop.buffered();
            let scannable = if flushing {
                self.scan_pos < avail
            } else {
                self.scan_pos + block_len < avail
            };
            if !scannable {
                break;
            }

            // Probe the signature at the scan position, computing the
            // window sum from scratch only when the window is empty.
            let window_len = if self.weak.count() == 0 {
                let len = (avail - self.scan_pos).min(block_len);
                self.weak
                    .update(&self.scoop.data()[self.scan_pos..self.scan_pos + len]);
                len
            } else {
                self.weak.count()
            };
            let prefer = (self.basis_len > 0).then(|| self.basis_pos + self.basis_len);
            let lookup = sig.find_match(
                self.weak.digest(),
                &self.scoop.data()[self.scan_pos..self.scan_pos + window_len],
                prefer,
            );
            self.core.stats.false_matches += u64::from(lookup.strong_misses);

            let flow = if let Some(pos) = lookup.offset {
                let extendable = self.basis_len > 0
                    && self.basis_pos + self.basis_len == pos
                    && self.basis_len < MAX_DATA_LEN as u64;
                if !extendable {
                    let flow = self.append_flush(buffers)?;
                    if flow == Flow::Blocked {
                        // The match was not consumed; the identical window
                        // probes again once the tube drains.
                        return Ok(Flow::Blocked);
                    }
                    self.basis_pos = pos;
                    self.basis_len = 0;
                }
                self.core.stats.matches += 1;
                self.basis_len += window_len as u64;
                self.scan_pos += window_len;
                self.weak.reset();
                self.process_match(buffers)?
            } else {
                if self.basis_len > 0 || self.scan_pos >= MAX_DATA_LEN {
                    let flow = self.append_flush(buffers)?;
                    if flow == Flow::Blocked {
                        // The miss byte stays unconsumed; the rolling
                        // window is untouched for the retry.
                        return Ok(Flow::Blocked);
                    }
                }
                if flushing {
                    // Past EOF there is no incoming byte; shrink the window.
                    self.weak.rollout(self.scoop.data()[self.scan_pos]);
                } else {
                    let outgoing = self.scoop.data()[self.scan_pos];
                    let incoming = self.scoop.data()[self.scan_pos + block_len];
                    self.weak.rotate(outgoing, incoming);
                }
                self.scan_pos += 1;
                Flow::Running
            };
            if flow == Flow::Blocked {
                return Ok(Flow::Blocked);
            }
        }

        if flushing {
            let flow = self.append_flush(buffers)?;
            if flow != Flow::Running {
                return Ok(flow);
            }
            self.state = DeltaState::End;
            Ok(Flow::Running)
        } else if buffers.eof_in() {
            self.state = DeltaState::Flush;
            Ok(Flow::Running)
        } else {
            Ok(Flow::Blocked)
        }
    }

    /// Degenerate delta with no signature: input passes through as literal
    /// commands, one per contiguous chunk up to the command cap.
    fn slack_body(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        let flow = self.catchup(buffers)?;
        if flow != Flow::Running {
            return Ok(flow);
        }
        let len = self.scoop.contiguous_len(buffers).min(MAX_DATA_LEN);
        if len > 0 {
            let cmd_bytes = emit::literal_cmd(&mut self.tube, len as u64);
            self.core.stats.lit_cmds += 1;
            self.core.stats.lit_bytes += len as u64;
            self.core.stats.lit_cmdbytes += cmd_bytes as u64;
            self.tube.copy(len);
            return self.catchup(buffers);
        }
        if self.scoop.at_eof(buffers) {
            self.state = DeltaState::End;
            return Ok(Flow::Running);
        }
        Ok(Flow::Blocked)
    }
}

impl StepJob for DeltaJob<'_> {
    fn step(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        match self.state {
            DeltaState::Header => {
                let flow = self.catchup(buffers)?;
                if flow != Flow::Running {
                    return Ok(flow);
                }
                emit::delta_header(&mut self.tube);
                self.state = if self.sig.is_some() {
                    DeltaState::Scan
                } else {
                    tracing::debug!("no signature bound, using slack deltas");
                    DeltaState::Slack
                };
                Ok(Flow::Running)
            }
            DeltaState::Scan => self.scan_body(buffers, false),
            DeltaState::Flush => self.scan_body(buffers, true),
            DeltaState::Slack => self.slack_body(buffers),
            DeltaState::End => {
                let flow = self.catchup(buffers)?;
                if flow != Flow::Running {
                    return Ok(flow);
                }
                emit::end_cmd(&mut self.tube);
                self.state = DeltaState::Drain;
                Ok(Flow::Running)
            }
            DeltaState::Drain => {
                let flow = self.catchup(buffers)?;
                if flow != Flow::Running {
                    return Ok(flow);
                }
                self.state = DeltaState::Done;
                Ok(Flow::Running)
            }
            DeltaState::Done => Ok(Flow::Done),
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

    fn run_all(job: &mut DeltaJob<'_>, input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; input.len() + 64];
        let mut buffers = Buffers::new(input, &mut out, true);
        assert_eq!(job.iter(&mut buffers).unwrap(), JobStatus::Done);
        let n = buffers.produced();
        out.truncate(n);
        out
    }

    #[test]
    fn slack_delta_is_header_literal_end() {
        let mut job = DeltaJob::new(None).unwrap();
        let delta = run_all(&mut job, b"hello world");
        assert_eq!(&delta[..4], &[0x72, 0x73, 0x02, 0x36]);
        assert_eq!(delta[4], 0x0b);
        assert_eq!(&delta[5..16], b"hello world");
        assert_eq!(delta[16], 0x00);
        assert_eq!(job.stats().lit_cmds, 1);
        assert_eq!(job.stats().lit_bytes, 11);
    }

    #[test]
    fn slack_delta_of_empty_input_is_header_end() {
        let mut job = DeltaJob::new(None).unwrap();
        let delta = run_all(&mut job, b"");
        assert_eq!(delta, [0x72, 0x73, 0x02, 0x36, 0x00]);
    }

    #[test]
    fn slack_delta_emits_one_literal_per_chunk() {
        let mut job = DeltaJob::new(None).unwrap();
        let mut out = vec![0u8; 64];

        let mut buffers = Buffers::new(b"abc", &mut out, false);
        assert_eq!(job.iter(&mut buffers).unwrap(), JobStatus::Blocked);
        let first = buffers.produced();

        let mut buffers = Buffers::new(b"defg", &mut out[first..], true);
        assert_eq!(job.iter(&mut buffers).unwrap(), JobStatus::Done);
        let total = first + buffers.produced();

        assert_eq!(
            &out[..total],
            &[0x72, 0x73, 0x02, 0x36, 0x03, b'a', b'b', b'c', 0x04, b'd', b'e', b'f', b'g', 0x00]
        );
    }

    #[test]
    fn unbuilt_signature_is_rejected() {
        use signature::{Signature, StrongLen, sig_args};

        let params = sig_args(None, None, None, StrongLen::Max).unwrap();
        let mut sig = Signature::new(params);
        sig.append_block(1, &[0u8; 32]).unwrap();
        assert!(matches!(DeltaJob::new(Some(&sig)), Err(JobError::Param(_))));
    }
}
