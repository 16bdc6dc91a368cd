//! Delta command opcodes and the decode prototype table.
//!
//! A delta stream is a sequence of commands. Each command is one opcode byte
//! followed by zero, one, or two big-endian operands whose widths are fixed
//! by the opcode:
//!
//! - `0x00` is END.
//! - `0x01..=0x40` are LITERAL commands whose length equals the opcode.
//! - `0x41..=0x44` are LITERAL commands with a 1/2/4/8-byte length operand.
//! - `0x45..=0x54` are COPY commands; the base opcode selects the position
//!   width (1, 2, 4, 8 bytes) and the offset within each group of four
//!   selects the length width.
//! - Everything above `0x54` is reserved.

/// The END opcode terminating a delta stream.
pub const OP_END: u8 = 0x00;

const OP_LITERAL_N1: u8 = 0x41;
const OP_COPY_N1_N1: u8 = 0x45;

/// Operand widths in ascending opcode order.
const WIDTHS: [u8; 4] = [1, 2, 4, 8];

/// What a decoded command does.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandKind {
    /// Copy the next `param1` bytes of the delta stream to the output.
    Literal,
    /// Copy `param2` basis bytes starting at offset `param1` to the output.
    Copy,
    /// End of the delta stream.
    End,
    /// Opcode with no assigned meaning; decoding one is an error.
    Reserved,
}

/// Decode shape of one opcode: its kind, operand widths, and the inline
/// value used when both widths are zero.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Prototype {
    /// What the command does.
    pub kind: CommandKind,
    /// Width of the first operand in bytes, or 0 if absent.
    pub len_1: u8,
    /// Width of the second operand in bytes, or 0 if absent.
    pub len_2: u8,
    /// Value used as `param1` when there are no operand bytes.
    pub immediate: u8,
}

const fn build_prototab() -> [Prototype; 256] {
    let reserved = Prototype {
        kind: CommandKind::Reserved,
        len_1: 0,
        len_2: 0,
        immediate: 0,
    };
    let mut tab = [reserved; 256];

    tab[OP_END as usize] = Prototype {
        kind: CommandKind::End,
        len_1: 0,
        len_2: 0,
        immediate: 0,
    };

    // Inline-length literals: the opcode is the length.
    let mut op = 0x01;
    while op <= 0x40 {
        tab[op] = Prototype {
            kind: CommandKind::Literal,
            len_1: 0,
            len_2: 0,
            immediate: op as u8,
        };
        op += 1;
    }

    // Literals with an explicit length operand.
    let mut i = 0;
    while i < 4 {
        tab[OP_LITERAL_N1 as usize + i] = Prototype {
            kind: CommandKind::Literal,
            len_1: WIDTHS[i],
            len_2: 0,
            immediate: 0,
        };
        i += 1;
    }

    // Copies: position width ascends per group of four, length width within.
    let mut pos = 0;
    while pos < 4 {
        let mut len = 0;
        while len < 4 {
            tab[OP_COPY_N1_N1 as usize + pos * 4 + len] = Prototype {
                kind: CommandKind::Copy,
                len_1: WIDTHS[pos],
                len_2: WIDTHS[len],
                immediate: 0,
            };
            len += 1;
        }
        pos += 1;
    }

    tab
}

static PROTOTAB: [Prototype; 256] = build_prototab();

/// Returns the decode prototype for an opcode byte.
#[must_use]
#[inline]
pub fn prototype(op: u8) -> &'static Prototype {
    &PROTOTAB[op as usize]
}

/// Returns the opcode for a LITERAL command of `param_len` operand bytes
/// (0 for the inline form, where the caller uses the length itself).
#[must_use]
pub fn literal_opcode(len: u64, param_len: usize) -> u8 {
    match param_len {
        0 => len as u8,
        1 => OP_LITERAL_N1,
        2 => OP_LITERAL_N1 + 1,
        4 => OP_LITERAL_N1 + 2,
        8 => OP_LITERAL_N1 + 3,
        _ => unreachable!("unsupported literal operand width"),
    }
}

/// Returns the opcode for a COPY command with the given operand widths.
#[must_use]
pub fn copy_opcode(pos_bytes: usize, len_bytes: usize) -> u8 {
    let pos_group = match pos_bytes {
        1 => 0,
        2 => 1,
        4 => 2,
        8 => 3,
        _ => unreachable!("unsupported copy position width"),
    };
    let len_offset = match len_bytes {
        1 => 0,
        2 => 1,
        4 => 2,
        8 => 3,
        _ => unreachable!("unsupported copy length width"),
    };
    OP_COPY_N1_N1 + pos_group * 4 + len_offset
}
