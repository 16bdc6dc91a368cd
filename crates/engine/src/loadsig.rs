//! Streaming signature parsing.
//!
//! Reads a signature file into the in-memory [`Signature`] the delta
//! scanner searches. Weak sums are stored as read; the mix applied to
//! rollsum keys happens when the hash table is built, not here. Building
//! the hash table itself is the caller's step, once the loaded signature
//! has been taken out of the job.

use protocol::SigMagic;
use signature::{SigParams, Signature, StrongLen, sig_args};

use crate::buffers::Buffers;
use crate::job::{Flow, JobCore, JobError, StepJob, StepResult};
use crate::scoop::{Scoop, Shortfall};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoadState {
    /// Read and validate the magic.
    Magic,
    /// Read the block length.
    BlockLen,
    /// Read the strong-sum length and create the signature.
    StrongLen,
    /// Read the next record's weak sum, or finish at a record boundary.
    Weak,
    /// Read the record's strong sum and append the block.
    Strong,
    /// Terminal.
    Done,
}

/// Streaming job that parses a signature file.
///
/// Drive it to completion, then take the result with
/// [`into_signature`](Self::into_signature) and build its hash table before
/// handing it to a delta job.
#[derive(Debug)]
pub struct LoadSigJob {
    state: LoadState,
    sig: Option<Signature>,
    magic: Option<SigMagic>,
    block_len: usize,
    weak: u32,
    /// Size of the signature file when known, used to preallocate the
    /// block array.
    sig_fsize: Option<u64>,
    scoop: Scoop,
    core: JobCore,
}

impl LoadSigJob {
    /// Creates a load job. `sig_fsize` is the signature file's size when
    /// known; it only affects preallocation.
    #[must_use]
    pub fn new(sig_fsize: Option<u64>) -> Self {
        Self {
            state: LoadState::Magic,
            sig: None,
            magic: None,
            block_len: 0,
            weak: 0,
            sig_fsize,
            scoop: Scoop::new(),
            core: JobCore::default(),
        }
    }

    /// Takes the loaded signature out of a completed job.
    pub fn into_signature(self) -> Result<Signature, JobError> {
        if self.state != LoadState::Done {
            return Err(JobError::Param(
                "signature load has not completed".into(),
            ));
        }
        self.sig
            .ok_or_else(|| JobError::Param("signature load produced nothing".into()))
    }

    fn read_u32(&mut self, buffers: &mut Buffers<'_>) -> Result<u32, StepFault> {
        match self.scoop.read_netint(buffers, 4) {
            Ok(value) => Ok(value as u32),
            Err(Shortfall::Blocked) => Err(StepFault::Yield),
            Err(Shortfall::InputEnded) => Err(StepFault::Ended),
        }
    }
}

/// Local control-flow for the header reads.
enum StepFault {
    Yield,
    Ended,
}

impl StepJob for LoadSigJob {
    fn step(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        match self.state {
            LoadState::Magic => {
                let raw = match self.read_u32(buffers) {
                    Ok(value) => value,
                    Err(StepFault::Yield) => return Ok(Flow::Blocked),
                    Err(StepFault::Ended) => return Err(JobError::InputEnded),
                };
                let Some(magic) = SigMagic::from_u32(raw) else {
                    tracing::error!(found = raw, "wrong magic number for signature");
                    return Err(JobError::BadMagic { found: raw });
                };
                tracing::trace!(?magic, "got signature magic");
                self.magic = Some(magic);
                self.state = LoadState::BlockLen;
                Ok(Flow::Running)
            }
            LoadState::BlockLen => {
                let block_len = match self.read_u32(buffers) {
                    Ok(value) => value,
                    Err(StepFault::Yield) => return Ok(Flow::Blocked),
                    Err(StepFault::Ended) => return Err(JobError::InputEnded),
                };
                if block_len == 0 {
                    return Err(JobError::Corrupt("signature block length is zero".into()));
                }
                self.block_len = block_len as usize;
                self.core.stats.block_len = self.block_len;
                self.state = LoadState::StrongLen;
                Ok(Flow::Running)
            }
            LoadState::StrongLen => {
                let strong_len = match self.read_u32(buffers) {
                    Ok(value) => value,
                    Err(StepFault::Yield) => return Ok(Flow::Blocked),
                    Err(StepFault::Ended) => return Err(JobError::InputEnded),
                } as usize;
                let magic = self.magic.expect("magic read before strong length");
                if strong_len == 0 || strong_len > magic.max_strong_len() {
                    tracing::error!(strong_len, "implausible strong sum length");
                    return Err(JobError::Corrupt(format!(
                        "strong sum length {strong_len} is implausible"
                    )));
                }
                let params = sig_args(
                    None,
                    Some(magic),
                    Some(self.block_len),
                    StrongLen::Exact(strong_len),
                )?;
                let sig = self.make_signature(params)?;
                tracing::trace!(
                    block_len = self.block_len,
                    strong_len,
                    "allocated signature"
                );
                self.sig = Some(sig);
                self.state = LoadState::Weak;
                Ok(Flow::Running)
            }
            LoadState::Weak => {
                self.weak = match self.read_u32(buffers) {
                    Ok(value) => value,
                    Err(StepFault::Yield) => return Ok(Flow::Blocked),
                    Err(StepFault::Ended) => {
                        // A record boundary is the normal end of the file;
                        // anything else means the stream was cut off.
                        if self.scoop.avail(buffers) == 0 {
                            self.state = LoadState::Done;
                            return Ok(Flow::Running);
                        }
                        return Err(JobError::Corrupt(
                            "signature ends inside a block record".into(),
                        ));
                    }
                };
                self.state = LoadState::Strong;
                Ok(Flow::Running)
            }
            LoadState::Strong => {
                let sig = self.sig.as_mut().expect("signature exists in record states");
                let strong_len = sig.strong_len();
                match self.scoop.readahead(buffers, strong_len) {
                    Ok(()) => {}
                    Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
                    Err(Shortfall::InputEnded) => {
                        return Err(JobError::Corrupt(
                            "signature ends inside a strong sum".into(),
                        ));
                    }
                }
                sig.append_block(self.weak, &self.scoop.data()[..strong_len])?;
                self.scoop.advance(strong_len);
                self.core.stats.sig_blocks += 1;
                self.state = LoadState::Weak;
                Ok(Flow::Running)
            }
            LoadState::Done => Ok(Flow::Done),
        }
    }

    fn core(&self) -> &JobCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut JobCore {
        &mut self.core
    }
}

impl LoadSigJob {
    /// Creates the signature, preallocated from the file size when known.
    fn make_signature(&self, params: SigParams) -> Result<Signature, JobError> {
        let expected = self.sig_fsize.map_or(0, |fsize| {
            let record = 4 + params.strong_len as u64;
            (fsize.saturating_sub(12) / record) as usize
        });
        if expected > 0 {
            Ok(Signature::with_capacity(params, expected)?)
        } else {
            Ok(Signature::new(params))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, StreamJob};

    fn load_all(data: &[u8]) -> Result<Signature, JobError> {
        let mut job = LoadSigJob::new(Some(data.len() as u64));
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(data, &mut out, true);
        let status = job.iter(&mut buffers)?;
        assert_eq!(status, JobStatus::Done);
        job.into_signature()
    }

    fn sample_sig() -> Vec<u8> {
        // Header: BLAKE2+RabinKarp, block_len 16, strong_len 4.
        let mut data = vec![
            0x72, 0x73, 0x01, 0x47, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x04,
        ];
        data.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 1, 2, 3, 4]);
        data.extend_from_slice(&[0x11, 0x22, 0x33, 0x44, 5, 6, 7, 8]);
        data
    }

    #[test]
    fn loads_header_and_records() {
        let sig = load_all(&sample_sig()).unwrap();
        assert_eq!(sig.magic(), SigMagic::Blake2RabinKarp);
        assert_eq!(sig.block_len(), 16);
        assert_eq!(sig.strong_len(), 4);
        assert_eq!(sig.len(), 2);
        assert!(!sig.is_indexed());
    }

    #[test]
    fn empty_record_section_is_a_valid_signature() {
        let sig = load_all(&sample_sig()[..12]).unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn byte_at_a_time_input_loads_identically() {
        let data = sample_sig();
        let mut job = LoadSigJob::new(None);
        let mut out = [0u8; 0];
        for (i, byte) in data.iter().enumerate() {
            let eof = i == data.len() - 1;
            let mut buffers = Buffers::new(std::slice::from_ref(byte), &mut out, eof);
            job.iter(&mut buffers).unwrap();
        }
        let sig = job.into_signature().unwrap();
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = sample_sig();
        data[2] = 0x02;
        assert!(matches!(
            load_all(&data),
            Err(JobError::BadMagic { .. })
        ));
    }

    #[test]
    fn zero_block_length_is_corrupt() {
        let mut data = sample_sig();
        data[4..8].copy_from_slice(&[0; 4]);
        assert!(matches!(load_all(&data), Err(JobError::Corrupt(_))));
    }

    #[test]
    fn oversized_strong_length_is_corrupt() {
        let mut data = sample_sig();
        data[8..12].copy_from_slice(&[0, 0, 0, 33]);
        assert!(matches!(load_all(&data), Err(JobError::Corrupt(_))));
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let data = sample_sig();
        assert!(matches!(
            load_all(&data[..data.len() - 6]),
            Err(JobError::Corrupt(_))
        ));
    }

    #[test]
    fn truncated_header_is_input_ended() {
        let data = sample_sig();
        assert!(matches!(load_all(&data[..6]), Err(JobError::InputEnded)));
    }
}
