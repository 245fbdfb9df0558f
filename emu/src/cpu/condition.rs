//! # Conditional Execution
//!
//! Every ARM instruction carries a 4-bit condition in bits 31-28 and is only
//! executed when the CPSR flags satisfy it; otherwise it behaves as a NOP.
//! In Thumb state only the conditional branch (format 16) carries a condition.
//!
//! ```text
//! ┌──────┬────────┬──────────────────────┬─────────────────┐
//! │ Code │ Suffix │ Meaning              │ Flags           │
//! ├──────┼────────┼──────────────────────┼─────────────────┤
//! │ 0000 │   EQ   │ equal                │ Z=1             │
//! │ 0001 │   NE   │ not equal            │ Z=0             │
//! │ 0010 │   CS   │ unsigned >=          │ C=1             │
//! │ 0011 │   CC   │ unsigned <           │ C=0             │
//! │ 0100 │   MI   │ negative             │ N=1             │
//! │ 0101 │   PL   │ positive or zero     │ N=0             │
//! │ 0110 │   VS   │ overflow             │ V=1             │
//! │ 0111 │   VC   │ no overflow          │ V=0             │
//! │ 1000 │   HI   │ unsigned >           │ C=1 and Z=0     │
//! │ 1001 │   LS   │ unsigned <=          │ C=0 or Z=1      │
//! │ 1010 │   GE   │ signed >=            │ N=V             │
//! │ 1011 │   LT   │ signed <             │ N!=V            │
//! │ 1100 │   GT   │ signed >             │ Z=0 and N=V     │
//! │ 1101 │   LE   │ signed <=            │ Z=1 or N!=V     │
//! │ 1110 │   AL   │ always               │ -               │
//! │ 1111 │   NV   │ never (reserved)     │ -               │
//! └──────┴────────┴──────────────────────┴─────────────────┘
//! ```
//!
//! The evaluation itself lives in [`Psr::can_execute`](super::psr::Psr::can_execute).

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Condition codes for ARM conditional execution.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Condition {
    /// Equal (Z=1)
    EQ = 0x0,
    /// Not equal (Z=0)
    NE = 0x1,
    /// Carry set, unsigned higher or same (C=1)
    CS = 0x2,
    /// Carry clear, unsigned lower (C=0)
    CC = 0x3,
    /// Minus, negative (N=1)
    MI = 0x4,
    /// Plus, positive or zero (N=0)
    PL = 0x5,
    /// Overflow (V=1)
    VS = 0x6,
    /// No overflow (V=0)
    VC = 0x7,
    /// Unsigned higher (C=1 and Z=0)
    HI = 0x8,
    /// Unsigned lower or same (C=0 or Z=1)
    LS = 0x9,
    /// Signed greater or equal (N=V)
    GE = 0xA,
    /// Signed less than (N!=V)
    LT = 0xB,
    /// Signed greater than (Z=0 and N=V)
    GT = 0xC,
    /// Signed less or equal (Z=1 or N!=V)
    LE = 0xD,
    /// Always
    AL = 0xE,
    /// Never. Reserved on ARMv4, the instruction is skipped.
    NV = 0xF,
}

impl From<u8> for Condition {
    fn from(value: u8) -> Self {
        match value & 0xF {
            0x0 => Self::EQ,
            0x1 => Self::NE,
            0x2 => Self::CS,
            0x3 => Self::CC,
            0x4 => Self::MI,
            0x5 => Self::PL,
            0x6 => Self::VS,
            0x7 => Self::VC,
            0x8 => Self::HI,
            0x9 => Self::LS,
            0xA => Self::GE,
            0xB => Self::LT,
            0xC => Self::GT,
            0xD => Self::LE,
            0xE => Self::AL,
            _ => Self::NV,
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // AL is the implicit suffix.
        match self {
            Self::AL => Ok(()),
            other => write!(f, "{other:?}"),
        }
    }
}
