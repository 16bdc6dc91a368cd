//! Encoding of delta commands into the tube.

use protocol::{DELTA_MAGIC, copy_opcode, int_len, literal_opcode, put_netint};

use crate::tube::Tube;

/// Queues the 4-byte delta magic.
pub(crate) fn delta_header(tube: &mut Tube) {
    tracing::trace!("emit DELTA magic");
    let mut buf = [0u8; 4];
    put_netint(u64::from(DELTA_MAGIC), 4, &mut buf);
    tube.write(&buf);
}

/// Queues a LITERAL command header for `len` payload bytes, returning the
/// number of command bytes emitted.
pub(crate) fn literal_cmd(tube: &mut Tube, len: u64) -> usize {
    let param_len = if len <= 64 { 0 } else { int_len(len) };
    let op = literal_opcode(len, param_len);
    tracing::trace!(len, cmd_byte = op, "emit LITERAL");
    let mut buf = [0u8; 9];
    buf[0] = op;
    put_netint(len, param_len, &mut buf[1..]);
    tube.write(&buf[..1 + param_len]);
    1 + param_len
}

/// Queues a COPY command for `len` basis bytes at `pos`, returning the
/// number of command bytes emitted.
pub(crate) fn copy_cmd(tube: &mut Tube, pos: u64, len: u64) -> usize {
    let pos_bytes = int_len(pos);
    let len_bytes = int_len(len);
    let op = copy_opcode(pos_bytes, len_bytes);
    tracing::trace!(pos, len, cmd_byte = op, "emit COPY");
    let mut buf = [0u8; 17];
    buf[0] = op;
    put_netint(pos, pos_bytes, &mut buf[1..]);
    put_netint(len, len_bytes, &mut buf[1 + pos_bytes..]);
    tube.write(&buf[..1 + pos_bytes + len_bytes]);
    1 + pos_bytes + len_bytes
}

/// Queues the 1-byte END command.
pub(crate) fn end_cmd(tube: &mut Tube) {
    tracing::trace!("emit END");
    tube.write(&[protocol::OP_END]);
}
