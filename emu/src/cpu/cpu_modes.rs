//! # Processor Modes
//!
//! The ARM7TDMI has seven operating modes. Every mode except User and System
//! owns a private copy of R13 (SP), R14 (LR) and an SPSR; FIQ additionally owns
//! R8-R12 so that fast interrupt handlers need not save them.
//!
//! ```text
//! ┌────────────┬────────┬──────────────────────────────┐
//! │ Mode       │ M[4:0] │ Banked registers             │
//! ├────────────┼────────┼──────────────────────────────┤
//! │ User       │ 10000  │ (none, shares with System)   │
//! │ FIQ        │ 10001  │ R8-R14, SPSR                 │
//! │ IRQ        │ 10010  │ R13-R14, SPSR                │
//! │ Supervisor │ 10011  │ R13-R14, SPSR                │
//! │ Abort      │ 10111  │ R13-R14, SPSR                │
//! │ Undefined  │ 11011  │ R13-R14, SPSR                │
//! │ System     │ 11111  │ (none, shares with User)     │
//! └────────────┴────────┴──────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Number of distinct register banks (User and System share one).
pub const BANK_COUNT: usize = 6;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Mode {
    /// The normal ARM program execution state.
    User = 0b10000,

    /// Designed to support a data transfer or channel process.
    Fiq = 0b10001,

    /// Used for general-purpose interrupt handling.
    Irq = 0b10010,

    /// Protected mode for the operating system
    Supervisor = 0b10011,

    /// Entered after a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when an undefined instruction is executed
    Undefined = 0b11011,

    /// A privileged user mode for the operating system.
    System = 0b11111,
}

impl Mode {
    /// Index of the register bank this mode reads its private registers from.
    #[must_use]
    pub const fn bank_index(self) -> usize {
        match self {
            Self::User | Self::System => 0,
            Self::Fiq => 1,
            Self::Irq => 2,
            Self::Supervisor => 3,
            Self::Abort => 4,
            Self::Undefined => 5,
        }
    }

    /// User and System have no SPSR.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }

    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(format!("Unexpected value for Mode: 0b{n:05b}")),
        }
    }
}
