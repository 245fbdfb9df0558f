//! # ARM7TDMI
//!
//! The CPU core: register file, status registers and the fetch/execute loop.
//!
//! ## Pipeline
//!
//! The hardware fetches two instructions ahead of the one it executes, so R15
//! reads as the executing address + 8 in ARM state and + 4 in Thumb state.
//! The emulation keeps that value in R15 for the whole step instead of
//! modelling the fetch and decode stages:
//!
//! ```text
//! step start   R15 = next + offset        fetch at R15 - offset
//! execute      R15 = current + offset     what the instruction reads
//! step end     R15 += width               or refill after a redirect
//! ```
//!
//! An instruction that redirects the program counter writes the
//! architectural target and flags the pipeline. The step then refills it by
//! adding the offset of the (possibly new) state, which costs 2 cycles.
//!
//! ## Cycles
//!
//! [`Arm7tdmi::step`] returns the cycles spent: 1 for the instruction plus one
//! per data access, 2 per refill, 1 per register-specified shift and 1-4 for
//! the multiplier.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::bus::MemoryBus;
use crate::cpu::arm::instructions::ArmModeInstruction;
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::exception::{ExceptionType, InterruptLines};
use crate::cpu::psr::{CpuState, Psr};
use crate::cpu::register_bank::RegisterBank;
use crate::cpu::registers::{REG_PROGRAM_COUNTER, Registers};
use crate::cpu::thumb::mode::ThumbModeOpcode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arm7tdmi {
    pub cpsr: Psr,

    /// SPSR of the current mode. Meaningless in User and System mode.
    pub spsr: Psr,

    pub registers: Registers,
    pub register_bank: RegisterBank,

    /// Extra cycles accumulated by the step in progress.
    #[serde(skip)]
    cycles: u32,

    #[serde(skip)]
    pipeline_flushed: bool,
}

impl Default for Arm7tdmi {
    fn default() -> Self {
        Self::new()
    }
}

impl Arm7tdmi {
    /// A CPU that just went through reset: Supervisor mode, ARM state,
    /// IRQ and FIQ masked, about to execute the instruction at 0x00.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            cpsr: Psr::from(Mode::Supervisor),
            spsr: Psr::default(),
            registers: Registers::default(),
            register_bank: RegisterBank::default(),
            cycles: 0,
            pipeline_flushed: false,
        };

        cpu.exception(ExceptionType::Reset);
        cpu.refill_pipeline();
        cpu.cycles = 0;
        cpu.pipeline_flushed = false;

        cpu
    }

    /// Switches to `new_status`, moving banked registers if the bank changes.
    ///
    /// The outgoing mode's SP, LR and SPSR (plus R8-R12 when leaving or
    /// entering FIQ) are saved before the incoming ones are loaded.
    pub fn load_status(&mut self, new_status: Psr) {
        let old_mode = self.cpsr.mode();
        let new_mode = new_status.mode();

        if old_mode.bank_index() != new_mode.bank_index() {
            self.register_bank
                .store(old_mode, &self.registers, self.spsr);
            self.spsr = self.register_bank.restore(new_mode, &mut self.registers);
        }

        self.cpsr = new_status;
    }

    /// Address of the instruction being executed.
    #[must_use]
    pub fn current_instruction(&self) -> u32 {
        self.registers
            .program_counter()
            .wrapping_sub(self.cpsr.cpu_state().pipeline_offset())
    }

    /// Address of the instruction after the one being executed.
    #[must_use]
    pub fn next_instruction(&self) -> u32 {
        self.registers
            .program_counter()
            .wrapping_sub(self.cpsr.cpu_state().instruction_width())
    }

    /// Marks the program counter as redirected by the instruction in progress.
    pub fn flush_pipeline(&mut self) {
        self.pipeline_flushed = true;
    }

    fn refill_pipeline(&mut self) {
        let state = self.cpsr.cpu_state();
        let target = self.registers.program_counter() & !(state.instruction_width() - 1);
        self.registers
            .set_program_counter(target.wrapping_add(state.pipeline_offset()));
        self.cycles += 2;
    }

    /// Runs one instruction, or enters a pending asynchronous exception, and
    /// returns the cycles it took.
    pub fn step(&mut self, bus: &mut dyn MemoryBus, lines: InterruptLines) -> u32 {
        self.cycles = 0;
        self.pipeline_flushed = false;

        if let Some(kind) = self.pending_exception(lines) {
            self.exception(kind);
        } else {
            self.fetch_and_execute(bus);
        }

        if self.pipeline_flushed {
            self.refill_pipeline();
        } else {
            let width = self.cpsr.cpu_state().instruction_width();
            self.registers.advance_program_counter(width);
        }

        1 + self.cycles
    }

    fn fetch_and_execute(&mut self, bus: &mut dyn MemoryBus) {
        let state = self.cpsr.cpu_state();
        let pc = self.registers.program_counter() & !(state.instruction_width() - 1);
        self.registers.set_program_counter(pc);

        let address = pc.wrapping_sub(state.pipeline_offset());
        match state {
            CpuState::Arm => match bus.load32(address) {
                Some(op_code) => self.execute_arm(bus, ArmModeOpcode::from(op_code)),
                None => self.prefetch_abort(address),
            },
            CpuState::Thumb => match bus.load16(address) {
                Some(op_code) => self.execute_thumb(bus, ThumbModeOpcode::from(op_code)),
                None => self.prefetch_abort(address),
            },
        }
    }

    fn prefetch_abort(&mut self, address: u32) {
        tracing::debug!("prefetch abort at 0x{address:08X}");
        self.exception(ExceptionType::PrefetchAbort);
    }

    pub(crate) fn data_abort(&mut self, address: u32) {
        tracing::debug!(
            "data abort at 0x{address:08X} (instruction 0x{:08X})",
            self.current_instruction()
        );
        self.exception(ExceptionType::DataAbort);
    }

    pub(crate) fn undefined_instruction(&mut self, raw: u32) {
        tracing::debug!(
            "undefined instruction 0x{raw:08X} at 0x{:08X}",
            self.current_instruction()
        );
        self.exception(ExceptionType::Undefined);
    }

    pub fn execute_arm(&mut self, bus: &mut dyn MemoryBus, op_code: ArmModeOpcode) {
        #[cfg(feature = "disassembler")]
        tracing::trace!("0x{:08X}: {op_code}", self.current_instruction());

        if !self.cpsr.can_execute(op_code.condition) {
            return;
        }

        match op_code.instruction {
            ArmModeInstruction::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => self.data_processing(alu_instruction, set_conditions, rn, destination, op2),
            ArmModeInstruction::Multiply {
                variant,
                set_conditions,
                destination,
                accumulate,
                rs,
                rm,
            } => self.multiply(variant, set_conditions, destination, accumulate, rs, rm),
            ArmModeInstruction::MultiplyLong {
                variant,
                set_conditions,
                destination_hi,
                destination_lo,
                rs,
                rm,
            } => self.multiply_long(
                variant,
                set_conditions,
                destination_hi,
                destination_lo,
                rs,
                rm,
            ),
            ArmModeInstruction::PsrTransfer { psr_kind, kind } => {
                self.psr_transfer(psr_kind, kind);
            }
            ArmModeInstruction::SingleDataSwap {
                quantity,
                rn,
                rd,
                rm,
            } => self.single_data_swap(bus, quantity, rn, rd, rm),
            ArmModeInstruction::BranchAndExchange { register } => {
                self.branch_and_exchange(register);
            }
            ArmModeInstruction::HalfwordDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store,
                offset,
                base_register,
                source_destination_register,
                transfer_kind,
            } => self.halfword_data_transfer(
                bus,
                indexing,
                offsetting,
                write_back,
                load_store,
                offset,
                base_register,
                source_destination_register,
                transfer_kind,
            ),
            ArmModeInstruction::SingleDataTransfer {
                load_store,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            } => self.single_data_transfer(
                bus,
                load_store,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            ),
            ArmModeInstruction::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => self.block_data_transfer(
                bus,
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            ),
            ArmModeInstruction::Branch { link, offset } => self.branch(link, offset),
            ArmModeInstruction::SoftwareInterrupt { .. } => {
                self.exception(ExceptionType::SoftwareInterrupt);
            }
            ArmModeInstruction::Undefined => self.undefined_instruction(op_code.raw),
        }
    }

    pub fn execute_thumb(&mut self, bus: &mut dyn MemoryBus, op_code: ThumbModeOpcode) {
        #[cfg(feature = "disassembler")]
        tracing::trace!("0x{:08X}: {op_code}", self.current_instruction());

        self.execute_thumb_instruction(bus, op_code);
    }

    /// Writes a register, flagging the pipeline when it is the PC.
    pub(crate) fn write_register(&mut self, reg: usize, value: u32) {
        self.registers.set_register_at(reg, value);
        if reg == REG_PROGRAM_COUNTER {
            self.flush_pipeline();
        }
    }

    /// Loads SPSR into CPSR, the exception return path.
    ///
    /// User and System mode have no SPSR and keep their status.
    pub(crate) fn restore_saved_status(&mut self) {
        if self.cpsr.mode().has_spsr() {
            let spsr = self.spsr;
            self.load_status(spsr);
        }
    }

    pub(crate) fn add_cycles(&mut self, cycles: u32) {
        self.cycles += cycles;
    }

    /// Word load, unaligned addresses rotate the aligned word.
    pub(crate) fn read_word(&mut self, bus: &mut dyn MemoryBus, address: u32) -> Option<u32> {
        self.cycles += 1;
        let value = bus.load32(address & !3)?;
        Some(value.rotate_right((address & 3) * 8))
    }

    /// Unsigned halfword load, an odd address rotates the aligned halfword.
    pub(crate) fn read_halfword(&mut self, bus: &mut dyn MemoryBus, address: u32) -> Option<u32> {
        self.cycles += 1;
        let value = u32::from(bus.load16(address & !1)?);
        Some(value.rotate_right((address & 1) * 8))
    }

    /// Signed halfword load, an odd address loads a signed byte instead.
    pub(crate) fn read_signed_halfword(
        &mut self,
        bus: &mut dyn MemoryBus,
        address: u32,
    ) -> Option<u32> {
        if address.get_bit(0) {
            return self.read_signed_byte(bus, address);
        }
        self.cycles += 1;
        Some(u32::from(bus.load16(address)?).sign_extended(16))
    }

    pub(crate) fn read_byte(&mut self, bus: &mut dyn MemoryBus, address: u32) -> Option<u32> {
        self.cycles += 1;
        bus.load8(address).map(u32::from)
    }

    pub(crate) fn read_signed_byte(&mut self, bus: &mut dyn MemoryBus, address: u32) -> Option<u32> {
        self.cycles += 1;
        Some(u32::from(bus.load8(address)?).sign_extended(8))
    }

    pub(crate) fn write_word(&mut self, bus: &mut dyn MemoryBus, address: u32, value: u32) -> bool {
        self.cycles += 1;
        bus.store32(address & !3, value)
    }

    pub(crate) fn write_halfword(
        &mut self,
        bus: &mut dyn MemoryBus,
        address: u32,
        value: u16,
    ) -> bool {
        self.cycles += 1;
        bus.store16(address & !1, value)
    }

    pub(crate) fn write_byte(&mut self, bus: &mut dyn MemoryBus, address: u32, value: u8) -> bool {
        self.cycles += 1;
        bus.store8(address, value)
    }
}
