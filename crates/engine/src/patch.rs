//! Streaming delta application.
//!
//! A small command-decoding state machine: read an opcode, read its
//! operands, dispatch. LITERAL payloads pass from the delta stream through
//! the tube to the output; COPY commands pull basis bytes through the
//! caller's [`BasisRead`] implementation directly into the output window.

use std::io::{self, Read, Seek, SeekFrom};

use protocol::{CommandKind, DELTA_MAGIC, Prototype, prototype};

use crate::buffers::Buffers;
use crate::job::{Flow, JobCore, JobError, StepJob, StepResult};
use crate::scoop::{Scoop, Shortfall};
use crate::tube::Tube;

/// Random-access reader over the basis the delta was computed against.
///
/// Implementations may return fewer bytes than requested; the patch job
/// retries with an advanced position. Returning `Ok(0)` while bytes are
/// still owed means the basis is shorter than the delta expects, which
/// fails the patch with [`JobError::InputEnded`].
pub trait BasisRead {
    /// Reads up to `buf.len()` bytes of the basis starting at byte `pos`.
    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl BasisRead for &[u8] {
    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(pos) = usize::try_from(pos) else {
            return Ok(0);
        };
        if pos >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - pos);
        buf[..n].copy_from_slice(&self[pos..pos + n]);
        Ok(n)
    }
}

/// Adapter exposing any seekable reader as a [`BasisRead`].
#[derive(Debug)]
pub struct SeekBasis<R> {
    inner: R,
}

impl<R: Read + Seek> SeekBasis<R> {
    /// Wraps a seekable reader, typically an open basis file.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BasisRead for SeekBasis<R> {
    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.seek(SeekFrom::Start(pos))?;
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PatchState {
    /// Check the 4-byte delta magic.
    Header,
    /// Read the next opcode byte.
    CmdByte,
    /// Read the operands the opcode calls for.
    Params,
    /// Dispatch the decoded command.
    Run,
    /// Feed basis bytes to the output for a COPY.
    Copying,
    /// Terminal.
    Done,
}

/// Streaming job that applies a delta to a basis, reproducing the new file.
#[derive(Debug)]
pub struct PatchJob<B> {
    basis: B,
    state: PatchState,
    op: u8,
    cmd: &'static Prototype,
    param1: u64,
    param2: u64,
    /// Basis cursor of the COPY currently being satisfied.
    basis_pos: u64,
    /// Bytes of that COPY not yet produced.
    basis_len: u64,
    scoop: Scoop,
    tube: Tube,
    core: JobCore,
}

impl<B: BasisRead> PatchJob<B> {
    /// Creates a patch job reading basis bytes through `basis`.
    pub fn new(basis: B) -> Self {
        Self {
            basis,
            state: PatchState::Header,
            op: 0,
            cmd: prototype(0),
            param1: 0,
            param2: 0,
            basis_pos: 0,
            basis_len: 0,
            scoop: Scoop::new(),
            tube: Tube::new(),
            core: JobCore::default(),
        }
    }

    /// Returns the basis reader.
    pub fn into_basis(self) -> B {
        self.basis
    }

    fn catchup(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        match self.tube.catchup(&mut self.scoop, buffers) {
            Ok(()) => Ok(Flow::Running),
            Err(Shortfall::Blocked) => Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => Err(JobError::InputEnded),
        }
    }

    fn step_header(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        let found = match self.scoop.read_netint(buffers, 4) {
            Ok(value) => value as u32,
            Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => return Err(JobError::InputEnded),
        };
        if found != DELTA_MAGIC {
            tracing::error!(found, expected = DELTA_MAGIC, "delta magic mismatch");
            return Err(JobError::BadMagic { found });
        }
        self.state = PatchState::CmdByte;
        Ok(Flow::Running)
    }

    fn step_cmdbyte(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        self.op = match self.scoop.read_netint(buffers, 1) {
            Ok(value) => value as u8,
            Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => return Err(JobError::InputEnded),
        };
        self.cmd = prototype(self.op);
        tracing::trace!(
            op = format_args!("{:#04x}", self.op),
            kind = ?self.cmd.kind,
            len_1 = self.cmd.len_1,
            len_2 = self.cmd.len_2,
            "got command"
        );
        if self.cmd.len_1 > 0 {
            self.state = PatchState::Params;
        } else {
            self.param1 = u64::from(self.cmd.immediate);
            self.state = PatchState::Run;
        }
        Ok(Flow::Running)
    }

    fn step_params(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        let len_1 = usize::from(self.cmd.len_1);
        let len_2 = usize::from(self.cmd.len_2);
        match self.scoop.readahead(buffers, len_1 + len_2) {
            Ok(()) => {}
            Err(Shortfall::Blocked) => return Ok(Flow::Blocked),
            Err(Shortfall::InputEnded) => return Err(JobError::InputEnded),
        }
        self.param1 = protocol::get_netint(&self.scoop.data()[..len_1]);
        if len_2 > 0 {
            self.param2 = protocol::get_netint(&self.scoop.data()[len_1..len_1 + len_2]);
        }
        self.scoop.advance(len_1 + len_2);
        self.state = PatchState::Run;
        Ok(Flow::Running)
    }

    fn step_run(&mut self) -> StepResult {
        tracing::trace!(op = format_args!("{:#04x}", self.op), "running command");
        match self.cmd.kind {
            CommandKind::Literal => {
                let len = self.param1;
                let Ok(len_usize) = usize::try_from(len) else {
                    return Err(JobError::Corrupt(format!(
                        "LITERAL length {len} is unrepresentable"
                    )));
                };
                if len == 0 {
                    return Err(JobError::Corrupt("zero-length LITERAL command".into()));
                }
                self.core.stats.lit_cmds += 1;
                self.core.stats.lit_bytes += len;
                self.core.stats.lit_cmdbytes += 1 + u64::from(self.cmd.len_1);
                self.tube.copy(len_usize);
                self.state = PatchState::CmdByte;
                Ok(Flow::Running)
            }
            CommandKind::Copy => {
                let (pos, len) = (self.param1, self.param2);
                if len == 0 {
                    return Err(JobError::Corrupt("zero-length COPY command".into()));
                }
                self.core.stats.copy_cmds += 1;
                self.core.stats.copy_bytes += len;
                self.core.stats.copy_cmdbytes +=
                    1 + u64::from(self.cmd.len_1) + u64::from(self.cmd.len_2);
                self.basis_pos = pos;
                self.basis_len = len;
                self.state = PatchState::Copying;
                Ok(Flow::Running)
            }
            CommandKind::End => {
                self.state = PatchState::Done;
                Ok(Flow::Running)
            }
            CommandKind::Reserved => {
                tracing::error!(op = format_args!("{:#04x}", self.op), "bogus command");
                Err(JobError::Corrupt(format!(
                    "unknown opcode {:#04x}",
                    self.op
                )))
            }
        }
    }

    fn step_copying(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        if buffers.avail_out() == 0 {
            return Ok(Flow::Blocked);
        }
        let want = usize::try_from(self.basis_len.min(buffers.avail_out() as u64))
            .unwrap_or(usize::MAX);
        tracing::trace!(
            pos = self.basis_pos,
            want,
            "requesting basis bytes from callback"
        );
        let pos = self.basis_pos;
        let got = {
            let window = buffers.out_spare();
            self.basis.read_at(pos, &mut window[..want])?
        };
        if got == 0 {
            tracing::error!(pos, "basis ended short of the copy request");
            return Err(JobError::InputEnded);
        }
        // The callback cannot legally return more than requested; the
        // sub-slice above enforces that.
        buffers.commit_out(got);
        self.basis_pos += got as u64;
        self.basis_len -= got as u64;
        if self.basis_len == 0 {
            self.state = PatchState::CmdByte;
        }
        Ok(Flow::Running)
    }
}

impl<B: BasisRead> StepJob for PatchJob<B> {
    fn step(&mut self, buffers: &mut Buffers<'_>) -> StepResult {
        let flow = self.catchup(buffers)?;
        if flow != Flow::Running {
            return Ok(flow);
        }
        match self.state {
            PatchState::Header => self.step_header(buffers),
            PatchState::CmdByte => self.step_cmdbyte(buffers),
            PatchState::Params => self.step_params(buffers),
            PatchState::Run => self.step_run(),
            PatchState::Copying => self.step_copying(buffers),
            PatchState::Done => Ok(Flow::Done),
        }
    }

    fn core(&self) -> &JobCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut JobCore {
        &mut self.core
    }
}
