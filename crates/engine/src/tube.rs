use crate::buffers::Buffers;
use crate::scoop::{Scoop, Shortfall};

/// Size of the tube's literal buffer. Holds a signature record (4-byte weak
/// sum plus a 32-byte strong sum) or two maximal COPY commands.
pub(crate) const TUBE_BUF_LEN: usize = 36;

/// Pending output the job has committed to emit.
///
/// A tube can hold a few literal bytes (command headers, checksums) and an
/// instruction to copy payload through from the scoop, in that order and at
/// most one of each. [`catchup`](Self::catchup) moves whatever fits into the
/// output window; states call it before doing anything else so that every
/// emission point tolerates output back-pressure.
#[derive(Debug)]
pub(crate) struct Tube {
    write_buf: [u8; TUBE_BUF_LEN],
    write_len: usize,
    copy_len: usize,
}

impl Tube {
    pub(crate) fn new() -> Self {
        Self {
            write_buf: [0; TUBE_BUF_LEN],
            write_len: 0,
            copy_len: 0,
        }
    }

    /// True once the previous command has finished all its output.
    pub(crate) fn is_idle(&self) -> bool {
        self.write_len == 0 && self.copy_len == 0
    }

    /// Free space left in the literal buffer.
    pub(crate) fn write_room(&self) -> usize {
        TUBE_BUF_LEN - self.write_len
    }

    /// Queues literal bytes for output.
    ///
    /// # Panics
    ///
    /// Panics if a copy is already pending (writes must precede copies) or
    /// the bytes do not fit; callers size their emissions so neither occurs.
    pub(crate) fn write(&mut self, data: &[u8]) {
        assert_eq!(self.copy_len, 0);
        assert!(data.len() <= TUBE_BUF_LEN - self.write_len);
        self.write_buf[self.write_len..self.write_len + data.len()].copy_from_slice(data);
        self.write_len += data.len();
    }

    /// Queues a request to copy `len` payload bytes through from the scoop
    /// (or directly from the input once the scoop is empty) to the output.
    ///
    /// # Panics
    ///
    /// Panics if a copy is already pending.
    pub(crate) fn copy(&mut self, len: usize) {
        assert_eq!(self.copy_len, 0);
        self.copy_len = len;
    }

    /// Moves whatever fits from the tube into the output window.
    ///
    /// Returns `Ok(())` once the tube is idle, [`Shortfall::Blocked`] while
    /// output remains queued, or [`Shortfall::InputEnded`] if a copy can
    /// never be satisfied because input already hit EOF.
    pub(crate) fn catchup(
        &mut self,
        scoop: &mut Scoop,
        buffers: &mut Buffers<'_>,
    ) -> Result<(), Shortfall> {
        if self.write_len > 0 {
            let sent = buffers.put_out(&self.write_buf[..self.write_len]);
            if sent > 0 {
                self.write_buf.copy_within(sent..self.write_len, 0);
                self.write_len -= sent;
            }
            if self.write_len > 0 {
                return Err(Shortfall::Blocked);
            }
        }
        if self.copy_len > 0 {
            loop {
                let room = buffers.avail_out();
                if room == 0 {
                    break;
                }
                if scoop.buffered() > 0 {
                    let n = self.copy_len.min(scoop.buffered()).min(room);
                    let sent = buffers.put_out(&scoop.data()[..n]);
                    scoop.advance(sent);
                    self.copy_len -= sent;
                } else {
                    let n = self.copy_len.min(buffers.avail_in()).min(room);
                    if n == 0 {
                        break;
                    }
                    self.copy_len -= buffers.copy_through(n);
                }
                if self.copy_len == 0 {
                    break;
                }
            }
            if self.copy_len > 0 {
                return Err(if scoop.at_eof(buffers) {
                    tracing::error!("input ended with {} copy bytes outstanding", self.copy_len);
                    Shortfall::InputEnded
                } else {
                    Shortfall::Blocked
                });
            }
        }
        Ok(())
    }
}
