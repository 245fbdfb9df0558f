//! # Banked Registers
//!
//! Storage for the registers that are swapped out when the CPU changes mode.
//! See [`cpu_modes`](super::cpu_modes) for the banking table.
//!
//! There are six banks, User and System share one. Each bank keeps R13, R14 and
//! the SPSR of its mode. R8-R12 exist twice: once for FIQ and once for every
//! other mode.

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::{BANK_COUNT, Mode};
use crate::cpu::psr::Psr;
use crate::cpu::registers::{REG_LR, REG_SP, Registers};

/// Private registers of a single bank.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankedRegisters {
    pub sp: u32,
    pub lr: u32,
    pub spsr: Psr,
}

/// Storage for banked registers across all CPU modes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBank {
    banks: [BankedRegisters; BANK_COUNT],

    /// R8-R12 of every mode but FIQ, valid while FIQ is current.
    high_user: [u32; 5],

    /// R8-R12 of FIQ mode, valid while FIQ is not current.
    high_fiq: [u32; 5],
}

impl RegisterBank {
    /// Saves the live registers of `mode` into its bank.
    pub fn store(&mut self, mode: Mode, registers: &Registers, spsr: Psr) {
        let bank = &mut self.banks[mode.bank_index()];
        bank.sp = registers.register_at(REG_SP);
        bank.lr = registers.register_at(REG_LR);
        bank.spsr = spsr;

        if mode == Mode::Fiq {
            self.high_fiq = registers.high_registers();
        } else {
            self.high_user = registers.high_registers();
        }
    }

    /// Loads the banked registers of `mode` into the live file and returns its SPSR.
    pub fn restore(&self, mode: Mode, registers: &mut Registers) -> Psr {
        let bank = &self.banks[mode.bank_index()];
        registers.set_register_at(REG_SP, bank.sp);
        registers.set_register_at(REG_LR, bank.lr);

        if mode == Mode::Fiq {
            registers.set_high_registers(self.high_fiq);
        } else {
            registers.set_high_registers(self.high_user);
        }

        bank.spsr
    }

    /// The User mode copy of R8-R14, as seen from `current` mode.
    ///
    /// Returns `None` when the register is live in `current` mode.
    #[must_use]
    pub fn user_register(&self, current: Mode, reg: usize) -> Option<u32> {
        match reg {
            8..=12 if current == Mode::Fiq => Some(self.high_user[reg - 8]),
            REG_SP if current.bank_index() != 0 => Some(self.banks[0].sp),
            REG_LR if current.bank_index() != 0 => Some(self.banks[0].lr),
            _ => None,
        }
    }

    /// Writes the User mode copy of R8-R14 while `current` mode is live.
    ///
    /// Returns `false` when the register is live in `current` mode and
    /// must be written to the register file instead.
    pub fn set_user_register(&mut self, current: Mode, reg: usize, value: u32) -> bool {
        match reg {
            8..=12 if current == Mode::Fiq => self.high_user[reg - 8] = value,
            REG_SP if current.bank_index() != 0 => self.banks[0].sp = value,
            REG_LR if current.bank_index() != 0 => self.banks[0].lr = value,
            _ => return false,
        }
        true
    }

    #[must_use]
    pub fn bank(&self, mode: Mode) -> &BankedRegisters {
        &self.banks[mode.bank_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_store_and_restore_irq() {
        let mut bank = RegisterBank::default();
        let mut registers = Registers::default();
        registers.set_register_at(REG_SP, 0x0300_7FA0);
        registers.set_register_at(REG_LR, 0x0800_0100);
        registers.set_register_at(8, 0xAA);

        bank.store(Mode::Irq, &registers, Psr::from(Mode::User));
        assert_eq!(bank.bank(Mode::Irq).sp, 0x0300_7FA0);

        let mut other = Registers::default();
        let spsr = bank.restore(Mode::Irq, &mut other);
        assert_eq!(spsr, Psr::from(Mode::User));
        assert_eq!(other.register_at(REG_SP), 0x0300_7FA0);
        assert_eq!(other.register_at(REG_LR), 0x0800_0100);
        assert_eq!(other.register_at(8), 0xAA);
    }

    #[test]
    fn check_user_view_from_fiq() {
        let mut bank = RegisterBank::default();
        let mut registers = Registers::default();
        registers.set_register_at(10, 10);
        registers.set_register_at(REG_SP, 0x100);
        bank.store(Mode::User, &registers, Psr::default());

        assert_eq!(bank.user_register(Mode::Fiq, 10), Some(10));
        assert_eq!(bank.user_register(Mode::Fiq, REG_SP), Some(0x100));
        assert_eq!(bank.user_register(Mode::Irq, 10), None);
        assert_eq!(bank.user_register(Mode::System, REG_SP), None);

        assert!(bank.set_user_register(Mode::Supervisor, REG_LR, 0x200));
        assert!(!bank.set_user_register(Mode::User, REG_LR, 0x200));
        assert_eq!(bank.bank(Mode::User).lr, 0x200);
    }
}
