//! Single-bit instruction fields shared by the ARM and Thumb decoders.

use std::fmt::Display;

/// Transfer size of a single data transfer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReadWriteKind {
    /// Word is a u32 value.
    #[default]
    Word,

    /// Byte is a u8 value.
    Byte,
}

impl From<bool> for ReadWriteKind {
    fn from(value: bool) -> Self {
        if value { Self::Byte } else { Self::Word }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStoreKind {
    Store,
    Load,
}

impl From<bool> for LoadStoreKind {
    fn from(b: bool) -> Self {
        if b { Self::Load } else { Self::Store }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    /// Add offset after transfer.
    Post,

    /// Add offset before transfer.
    Pre,
}

impl From<bool> for Indexing {
    fn from(state: bool) -> Self {
        if state { Self::Pre } else { Self::Post }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offsetting {
    /// Subtract the offset from base.
    Down,

    /// Add the offset to base.
    Up,
}

impl Offsetting {
    #[must_use]
    pub const fn apply(self, base: u32, offset: u32) -> u32 {
        match self {
            Self::Down => base.wrapping_sub(offset),
            Self::Up => base.wrapping_add(offset),
        }
    }
}

impl From<bool> for Offsetting {
    fn from(state: bool) -> Self {
        if state { Self::Up } else { Self::Down }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OperandKind {
    Immediate,
    Register,
}

impl From<bool> for OperandKind {
    fn from(b: bool) -> Self {
        if b { Self::Immediate } else { Self::Register }
    }
}

/// Barrel shifter operation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl From<u32> for ShiftKind {
    fn from(op_code: u32) -> Self {
        match op_code & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

impl From<u16> for ShiftKind {
    fn from(op_code: u16) -> Self {
        u32::from(op_code).into()
    }
}

impl Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lsl => f.write_str("LSL"),
            Self::Lsr => f.write_str("LSR"),
            Self::Asr => f.write_str("ASR"),
            Self::Ror => f.write_str("ROR"),
        }
    }
}

/// The SH field of halfword and signed data transfers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HalfwordTransferKind {
    UnsignedHalfwords,
    SignedByte,
    SignedHalfwords,
}

impl From<u32> for HalfwordTransferKind {
    fn from(value: u32) -> Self {
        match value & 0b11 {
            0b10 => Self::SignedByte,
            0b11 => Self::SignedHalfwords,
            // 0b00 encodes SWP and never reaches this point.
            _ => Self::UnsignedHalfwords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_offsetting_wraps() {
        assert_eq!(Offsetting::Down.apply(0, 4), 0xFFFF_FFFC);
        assert_eq!(Offsetting::Up.apply(0xFFFF_FFFC, 8), 4);
    }

    #[test]
    fn check_shift_kind() {
        assert_eq!(ShiftKind::from(0b10_u32), ShiftKind::Asr);
        assert_eq!(ShiftKind::from(0b111_u16), ShiftKind::Ror);
    }
}
