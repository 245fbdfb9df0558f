//! # Exceptions
//!
//! Every exception is the same register transform with different constants:
//!
//! | Exception      | Vector | Mode       | Masks  | Link register        |
//! |----------------|--------|------------|--------|----------------------|
//! | Reset          | 0x00   | Supervisor | I, F   | next instruction     |
//! | Undefined      | 0x04   | Undefined  | I      | next instruction     |
//! | SWI            | 0x08   | Supervisor | I      | next instruction     |
//! | Prefetch Abort | 0x0C   | Abort      | I      | current + width      |
//! | Data Abort     | 0x10   | Abort      | I      | current instruction  |
//! | IRQ            | 0x18   | IRQ        | I      | current + 4          |
//! | FIQ            | 0x1C   | FIQ        | I, F   | current + 4          |
//!
//! The handler always runs in ARM state with the previous CPSR in its SPSR.

use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::CpuState;
use crate::cpu::registers::REG_LR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Reset,
    Undefined,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    Irq,
    Fiq,
}

impl ExceptionType {
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::Undefined => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::Undefined => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Reset and FIQ mask FIQ as well as IRQ.
    #[must_use]
    pub const fn masks_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }
}

/// Asynchronous exception lines sampled by the CPU before each fetch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterruptLines {
    pub reset: bool,
    pub fiq: bool,
    pub irq: bool,
}

impl Arm7tdmi {
    /// Enters the handler for `kind`.
    ///
    /// PC is left on the vector itself; the pipeline refill at the end of
    /// the step moves it ahead of the first handler instruction.
    pub fn exception(&mut self, kind: ExceptionType) {
        let width = self.cpsr.cpu_state().instruction_width();
        let current = self.current_instruction();

        let return_address = match kind {
            ExceptionType::DataAbort => current,
            ExceptionType::PrefetchAbort => current.wrapping_add(width),
            ExceptionType::Irq | ExceptionType::Fiq => current.wrapping_add(4),
            ExceptionType::Reset | ExceptionType::Undefined | ExceptionType::SoftwareInterrupt => {
                self.next_instruction()
            }
        };

        tracing::trace!(
            "{kind:?} exception at 0x{current:08X}, return address 0x{return_address:08X}"
        );

        let previous = self.cpsr;
        let mut status = previous;
        status.set_mode(kind.mode());
        status.set_cpu_state(CpuState::Arm);
        status.set_irq_disable(true);
        if kind.masks_fiq() {
            status.set_fiq_disable(true);
        }

        self.load_status(status);
        self.spsr = previous;
        self.registers.set_register_at(REG_LR, return_address);
        self.registers.set_program_counter(kind.vector());
        self.flush_pipeline();
    }

    /// The asynchronous exception to take before the next fetch, if any.
    ///
    /// Reset wins over FIQ, which wins over IRQ. Only IRQ and FIQ can be
    /// masked.
    #[must_use]
    pub fn pending_exception(&self, lines: InterruptLines) -> Option<ExceptionType> {
        if lines.reset {
            Some(ExceptionType::Reset)
        } else if lines.fiq && !self.cpsr.fiq_disable() {
            Some(ExceptionType::Fiq)
        } else if lines.irq && !self.cpsr.irq_disable() {
            Some(ExceptionType::Irq)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::psr::Psr;
    use crate::cpu::registers::REG_SP;
    use pretty_assertions::assert_eq;

    fn cpu_in(mode: Mode, state: CpuState, executing: u32) -> Arm7tdmi {
        let mut cpu = Arm7tdmi::default();
        let mut status = Psr::from(mode);
        status.set_cpu_state(state);
        cpu.load_status(status);
        cpu.registers
            .set_program_counter(executing.wrapping_add(state.pipeline_offset()));
        cpu
    }

    #[test]
    fn check_vectors_and_modes() {
        let cases = [
            (ExceptionType::Reset, 0x00, Mode::Supervisor),
            (ExceptionType::Undefined, 0x04, Mode::Undefined),
            (ExceptionType::SoftwareInterrupt, 0x08, Mode::Supervisor),
            (ExceptionType::PrefetchAbort, 0x0C, Mode::Abort),
            (ExceptionType::DataAbort, 0x10, Mode::Abort),
            (ExceptionType::Irq, 0x18, Mode::Irq),
            (ExceptionType::Fiq, 0x1C, Mode::Fiq),
        ];

        for (kind, vector, mode) in cases {
            let mut cpu = cpu_in(Mode::User, CpuState::Thumb, 0x0800_0100);
            cpu.cpsr.set_carry_flag(true);
            let before = cpu.cpsr;

            cpu.exception(kind);

            assert_eq!(cpu.registers.program_counter(), vector);
            assert_eq!(cpu.cpsr.mode(), mode);
            assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
            assert!(cpu.cpsr.irq_disable());
            assert_eq!(cpu.cpsr.fiq_disable(), kind.masks_fiq());
            assert!(cpu.cpsr.carry_flag());
            assert_eq!(cpu.spsr, before);
        }
    }

    #[test]
    fn check_return_addresses_in_arm_state() {
        let cases = [
            (ExceptionType::DataAbort, 0x100),
            (ExceptionType::PrefetchAbort, 0x104),
            (ExceptionType::SoftwareInterrupt, 0x104),
            (ExceptionType::Undefined, 0x104),
            (ExceptionType::Irq, 0x104),
            (ExceptionType::Fiq, 0x104),
        ];

        for (kind, link) in cases {
            let mut cpu = cpu_in(Mode::System, CpuState::Arm, 0x100);
            cpu.exception(kind);
            assert_eq!(cpu.registers.register_at(REG_LR), link, "{kind:?}");
        }
    }

    #[test]
    fn check_return_addresses_in_thumb_state() {
        let cases = [
            (ExceptionType::DataAbort, 0x100),
            (ExceptionType::PrefetchAbort, 0x102),
            (ExceptionType::SoftwareInterrupt, 0x102),
            (ExceptionType::Irq, 0x104),
        ];

        for (kind, link) in cases {
            let mut cpu = cpu_in(Mode::System, CpuState::Thumb, 0x100);
            cpu.exception(kind);
            assert_eq!(cpu.registers.register_at(REG_LR), link, "{kind:?}");
        }
    }

    #[test]
    fn check_exception_keeps_caller_bank() {
        let mut cpu = cpu_in(Mode::System, CpuState::Arm, 0x100);
        cpu.registers.set_register_at(REG_SP, 0x0300_7F00);
        cpu.registers.set_register_at(REG_LR, 0x1234);

        cpu.exception(ExceptionType::Irq);
        assert_eq!(cpu.register_bank.bank(Mode::User).sp, 0x0300_7F00);
        assert_eq!(cpu.register_bank.bank(Mode::User).lr, 0x1234);

        // Return to the caller the way a handler does.
        let spsr = cpu.spsr;
        cpu.load_status(spsr);
        assert_eq!(cpu.registers.register_at(REG_SP), 0x0300_7F00);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x1234);
    }

    #[test]
    fn check_pending_priority() {
        let mut cpu = cpu_in(Mode::System, CpuState::Arm, 0x100);
        let all = InterruptLines {
            reset: true,
            fiq: true,
            irq: true,
        };
        assert_eq!(cpu.pending_exception(all), Some(ExceptionType::Reset));

        let no_reset = InterruptLines {
            reset: false,
            ..all
        };
        assert_eq!(cpu.pending_exception(no_reset), Some(ExceptionType::Fiq));

        cpu.cpsr.set_fiq_disable(true);
        assert_eq!(cpu.pending_exception(no_reset), Some(ExceptionType::Irq));

        cpu.cpsr.set_irq_disable(true);
        assert_eq!(cpu.pending_exception(no_reset), None);
        assert_eq!(cpu.pending_exception(all), Some(ExceptionType::Reset));
    }
}
