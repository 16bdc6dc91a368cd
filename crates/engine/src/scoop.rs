use protocol::get_netint;

use crate::buffers::Buffers;

/// Why a scoop or tube operation could not complete.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Shortfall {
    /// More input or output room may arrive; retry with fresh buffers.
    Blocked,
    /// The caller promised end of input and the bytes will never arrive.
    InputEnded,
}

/// Lookahead buffer between the caller's input window and a job's scanner.
///
/// Input bytes are absorbed into the scoop so the scanner can index into a
/// contiguous region that survives across `iter` calls. Bytes stay in the
/// scoop until [`advance`](Self::advance) drops them, which keeps pending
/// literal payloads pinned while the tube drains them under back-pressure.
#[derive(Debug, Default)]
pub(crate) struct Scoop {
    buf: Vec<u8>,
    head: usize,
    len: usize,
}

impl Scoop {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held in the scoop itself.
    pub(crate) fn buffered(&self) -> usize {
        self.len
    }

    /// Bytes readable in total: scoop contents plus unread caller input.
    pub(crate) fn avail(&self, buffers: &Buffers<'_>) -> usize {
        self.len + buffers.avail_in()
    }

    /// True once every byte has been consumed and the caller promised EOF.
    pub(crate) fn at_eof(&self, buffers: &Buffers<'_>) -> bool {
        self.avail(buffers) == 0 && buffers.eof_in()
    }

    /// The buffered bytes, in order.
    pub(crate) fn data(&self) -> &[u8] {
        &self.buf[self.head..self.head + self.len]
    }

    /// Length of the next contiguous run without pulling more input: the
    /// scoop contents if any, else the caller's input window.
    pub(crate) fn contiguous_len(&self, buffers: &Buffers<'_>) -> usize {
        if self.len > 0 {
            self.len
        } else {
            buffers.avail_in()
        }
    }

    /// Absorbs caller input until the scoop holds `want` bytes or the input
    /// window runs dry.
    fn fill(&mut self, buffers: &mut Buffers<'_>, want: usize) {
        if self.len >= want {
            return;
        }
        let take = (want - self.len).min(buffers.avail_in());
        if take == 0 {
            return;
        }
        if self.head + self.len + take > self.buf.len() {
            self.buf.copy_within(self.head..self.head + self.len, 0);
            self.head = 0;
            if self.len + take > self.buf.len() {
                self.buf.resize(self.len + take, 0);
            }
        }
        let dst = self.head + self.len;
        let src = buffers.take_in(take);
        self.buf[dst..dst + take].copy_from_slice(src);
        self.len += take;
    }

    /// Ensures the next `want` bytes are addressable through
    /// [`data`](Self::data).
    ///
    /// Whatever input is available is absorbed either way, so a short read
    /// still makes progress before reporting [`Shortfall::Blocked`].
    pub(crate) fn readahead(
        &mut self,
        buffers: &mut Buffers<'_>,
        want: usize,
    ) -> Result<(), Shortfall> {
        self.fill(buffers, want);
        if self.len >= want {
            Ok(())
        } else if buffers.eof_in() {
            Err(Shortfall::InputEnded)
        } else {
            Err(Shortfall::Blocked)
        }
    }

    /// Drops `n` bytes from the head of the scoop.
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.head += n;
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
    }

    /// Reads a `len`-byte big-endian integer and consumes it.
    pub(crate) fn read_netint(
        &mut self,
        buffers: &mut Buffers<'_>,
        len: usize,
    ) -> Result<u64, Shortfall> {
        self.readahead(buffers, len)?;
        let value = get_netint(&self.data()[..len]);
        self.advance(len);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readahead_absorbs_partial_input_before_blocking() {
        let mut scoop = Scoop::new();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"abc", &mut out, false);
        assert_eq!(scoop.readahead(&mut buffers, 5), Err(Shortfall::Blocked));
        assert_eq!(scoop.buffered(), 3);
        assert_eq!(buffers.avail_in(), 0);

        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"de", &mut out, false);
        assert_eq!(scoop.readahead(&mut buffers, 5), Ok(()));
        assert_eq!(scoop.data(), b"abcde");
    }

    #[test]
    fn readahead_reports_input_ended_at_eof() {
        let mut scoop = Scoop::new();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"xy", &mut out, true);
        assert_eq!(scoop.readahead(&mut buffers, 3), Err(Shortfall::InputEnded));
        // The two bytes are still there for a shorter request.
        assert_eq!(scoop.readahead(&mut buffers, 2), Ok(()));
    }

    #[test]
    fn advance_drops_from_the_head() {
        let mut scoop = Scoop::new();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"abcdef", &mut out, true);
        scoop.readahead(&mut buffers, 6).unwrap();
        scoop.advance(4);
        assert_eq!(scoop.data(), b"ef");
        scoop.advance(2);
        assert_eq!(scoop.buffered(), 0);
        assert!(scoop.at_eof(&buffers));
    }

    #[test]
    fn read_netint_consumes_exactly_its_bytes() {
        let mut scoop = Scoop::new();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(&[0x12, 0x34, 0x56, 0x78, 0x9a], &mut out, true);
        assert_eq!(scoop.read_netint(&mut buffers, 4), Ok(0x12345678));
        assert_eq!(scoop.read_netint(&mut buffers, 1), Ok(0x9a));
        assert_eq!(
            scoop.read_netint(&mut buffers, 1),
            Err(Shortfall::InputEnded)
        );
    }

    #[test]
    fn fill_compacts_before_growing() {
        let mut scoop = Scoop::new();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"abcdefgh", &mut out, false);
        scoop.readahead(&mut buffers, 8).unwrap();
        scoop.advance(6);
        let cap_before = scoop.buf.len();
        let mut out = [0u8; 0];
        let mut buffers = Buffers::new(b"ijklmn", &mut out, false);
        scoop.readahead(&mut buffers, 8).unwrap();
        assert_eq!(scoop.data(), b"ghijklmn");
        assert_eq!(scoop.buf.len(), cap_before);
    }
}
