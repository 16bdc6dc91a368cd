/// Caller-owned input and output windows for one [`iter`] call.
///
/// The caller decides how much input to offer and how much output room to
/// provide; the job advances through both and never grows or frees either.
/// After the call, [`consumed`](Self::consumed) and
/// [`produced`](Self::produced) report how far each window moved.
///
/// `eof_in` is the caller's promise that no input will follow the current
/// window. It may be set on an empty window.
///
/// [`iter`]: crate::StreamJob::iter
#[derive(Debug)]
pub struct Buffers<'a> {
    input: &'a [u8],
    output: &'a mut [u8],
    in_pos: usize,
    out_pos: usize,
    eof_in: bool,
}

impl<'a> Buffers<'a> {
    /// Wraps an unread input window and a free output window.
    #[must_use]
    pub fn new(input: &'a [u8], output: &'a mut [u8], eof_in: bool) -> Self {
        Self {
            input,
            output,
            in_pos: 0,
            out_pos: 0,
            eof_in,
        }
    }

    /// Bytes of input not yet consumed.
    #[must_use]
    pub fn avail_in(&self) -> usize {
        self.input.len() - self.in_pos
    }

    /// Bytes of output room not yet filled.
    #[must_use]
    pub fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Whether the caller has promised that no more input follows.
    #[must_use]
    pub const fn eof_in(&self) -> bool {
        self.eof_in
    }

    /// Total input consumed so far through this window.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.in_pos
    }

    /// Total output produced so far into this window.
    #[must_use]
    pub const fn produced(&self) -> usize {
        self.out_pos
    }

    /// Consumes and returns the next `n` input bytes.
    pub(crate) fn take_in(&mut self, n: usize) -> &[u8] {
        let taken = &self.input[self.in_pos..self.in_pos + n];
        self.in_pos += n;
        taken
    }

    /// Copies as much of `data` as fits into the output window, returning
    /// the number of bytes written.
    pub(crate) fn put_out(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.avail_out());
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(&data[..n]);
        self.out_pos += n;
        n
    }

    /// The unfilled tail of the output window, for callees that write into
    /// it directly. Pair with [`commit_out`](Self::commit_out).
    pub(crate) fn out_spare(&mut self) -> &mut [u8] {
        &mut self.output[self.out_pos..]
    }

    /// Marks `n` bytes of [`out_spare`](Self::out_spare) as filled.
    pub(crate) fn commit_out(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.out_pos += n;
    }

    /// Copies up to `n` bytes straight from input to output, returning the
    /// number moved.
    pub(crate) fn copy_through(&mut self, n: usize) -> usize {
        let n = n.min(self.avail_in()).min(self.avail_out());
        let src = &self.input[self.in_pos..self.in_pos + n];
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(src);
        self.in_pos += n;
        self.out_pos += n;
        n
    }
}
