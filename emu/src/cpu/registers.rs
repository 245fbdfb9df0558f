//! # ARM7TDMI Register File
//!
//! The 16 general-purpose registers visible at any time.
//!
//! - **R0-R12**: General purpose
//! - **R13 (SP)**: Stack pointer (by convention)
//! - **R14 (LR)**: Link register (return address)
//! - **R15 (PC)**: Program counter, reads as the executing instruction
//!   + 8 (ARM) or + 4 (Thumb) because of the prefetch pipeline
//!
//! For the per-mode copies see [`register_bank`](super::register_bank).

use serde::{Deserialize, Serialize};

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index.
pub const REG_PROGRAM_COUNTER: usize = 0xF;

/// The 16 registers visible in the current mode.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers([u32; 16]);

impl Registers {
    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.0[REG_PROGRAM_COUNTER]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[REG_PROGRAM_COUNTER] = new_value;
    }

    pub const fn advance_program_counter(&mut self, bytes: u32) {
        self.0[REG_PROGRAM_COUNTER] = self.0[REG_PROGRAM_COUNTER].wrapping_add(bytes);
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        debug_assert!(reg <= 15, "Invalid register index: {reg} (0x{reg:X})");
        self.0[reg & 0xF] = new_value;
    }

    #[must_use]
    pub const fn register_at(&self, reg: usize) -> u32 {
        self.0[reg & 0xF]
    }

    /// R8-R12, the registers FIQ mode swaps out.
    #[must_use]
    pub fn high_registers(&self) -> [u32; 5] {
        let mut high = [0; 5];
        high.copy_from_slice(&self.0[8..=12]);
        high
    }

    pub fn set_high_registers(&mut self, values: [u32; 5]) {
        self.0[8..=12].copy_from_slice(&values);
    }
}
