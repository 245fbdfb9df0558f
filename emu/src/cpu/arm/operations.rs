//! Execution of decoded ARM instructions.
//!
//! R15 reads as the executing instruction + 8 everywhere below, except where
//! noted: register-specified shifts and stored PC values see + 12.

use crate::bitwise::Bits;
use crate::bus::MemoryBus;
use crate::cpu::arm::alu_instruction::{
    AluInstructionKind, AluSecondOperandInfo, ArithmeticOpResult, ArmModeAluInstruction, PsrKind,
    PsrOpKind, ShiftOperator, add_with_carry, shift, shift_immediate, sub_with_carry,
};
use crate::cpu::arm::instructions::{
    ArmModeMultiplyLongVariant, ArmModeMultiplyVariant, HalfwordDataTransferOffsetKind,
    SingleDataTransferOffsetInfo,
};
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, ReadWriteKind,
};
use crate::cpu::psr::CpuState;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};

/// Cycles the multiplier spends on `operand`, by its significant bytes.
///
/// Signed multiplies also terminate early on leading ones.
pub(crate) fn multiplier_cycles(operand: u32, signed: bool) -> u32 {
    [0xFFFF_FF00, 0xFFFF_0000, 0xFF00_0000]
        .into_iter()
        .position(|mask| operand & mask == 0 || (signed && operand & mask == mask))
        .map_or(4, |index| index as u32 + 1)
}

impl Arm7tdmi {
    /// Evaluates operand 2 through the barrel shifter.
    ///
    /// The carry is the shifter carry out, used by logical operations.
    pub(crate) fn second_operand(&mut self, op2: AluSecondOperandInfo) -> ArithmeticOpResult {
        let carry = self.cpsr.carry_flag();
        match op2 {
            AluSecondOperandInfo::Immediate { base, shift } => {
                let result = base.rotate_right(shift);
                ArithmeticOpResult {
                    result,
                    carry: if shift == 0 { carry } else { result.get_bit(31) },
                    ..Default::default()
                }
            }
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => shift_immediate(shift_kind, amount, self.registers.register_at(register), carry),
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => {
                self.add_cycles(1);
                let amount = self.registers.register_at(rs) & 0xFF;
                let mut value = self.registers.register_at(register);
                if register == REG_PROGRAM_COUNTER {
                    value = value.wrapping_add(4);
                }
                shift(shift_kind, amount, value, carry)
            }
        }
    }

    pub fn data_processing(
        &mut self,
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: usize,
        destination: usize,
        op2: AluSecondOperandInfo,
    ) {
        let shifted = self.second_operand(op2);
        let mut first = self.registers.register_at(rn);
        if rn == REG_PROGRAM_COUNTER
            && matches!(
                op2,
                AluSecondOperandInfo::Register {
                    shift_op: ShiftOperator::Register(_),
                    ..
                }
            )
        {
            first = first.wrapping_add(4);
        }

        let second = shifted.result;
        let carry = self.cpsr.carry_flag();
        // With Rd = R15 the S bit restores the SPSR instead.
        let restores_status = set_conditions
            && destination == REG_PROGRAM_COUNTER
            && !alu_instruction.is_test();
        let set_flags = set_conditions && !restores_status;

        let result = match alu_instruction {
            ArmModeAluInstruction::And | ArmModeAluInstruction::Tst => first & second,
            ArmModeAluInstruction::Eor | ArmModeAluInstruction::Teq => first ^ second,
            ArmModeAluInstruction::Orr => first | second,
            ArmModeAluInstruction::Mov => second,
            ArmModeAluInstruction::Bic => first & !second,
            ArmModeAluInstruction::Mvn => !second,
            ArmModeAluInstruction::Sub | ArmModeAluInstruction::Cmp => {
                self.arithmetic(sub_with_carry(first, second, true), set_flags)
            }
            ArmModeAluInstruction::Rsb => {
                self.arithmetic(sub_with_carry(second, first, true), set_flags)
            }
            ArmModeAluInstruction::Add | ArmModeAluInstruction::Cmn => {
                self.arithmetic(add_with_carry(first, second, false), set_flags)
            }
            ArmModeAluInstruction::Adc => {
                self.arithmetic(add_with_carry(first, second, carry), set_flags)
            }
            ArmModeAluInstruction::Sbc => {
                self.arithmetic(sub_with_carry(first, second, carry), set_flags)
            }
            ArmModeAluInstruction::Rsc => {
                self.arithmetic(sub_with_carry(second, first, carry), set_flags)
            }
        };

        if restores_status {
            self.restore_saved_status();
        } else if set_flags && alu_instruction.kind() == AluInstructionKind::Logical {
            self.cpsr.set_sign_and_zero(result);
            self.cpsr.set_carry_flag(shifted.carry);
        }

        if !alu_instruction.is_test() {
            self.write_register(destination, result);
        }
    }

    /// Applies the flags of an arithmetic result and returns its value.
    fn arithmetic(&mut self, op_result: ArithmeticOpResult, set_flags: bool) -> u32 {
        if set_flags {
            self.cpsr.set_flags(&op_result);
        }
        op_result.result
    }

    pub fn psr_transfer(&mut self, psr_kind: PsrKind, kind: PsrOpKind) {
        let has_spsr = self.cpsr.mode().has_spsr();
        match kind {
            PsrOpKind::Mrs {
                destination_register,
            } => {
                let value = match psr_kind {
                    PsrKind::Spsr if has_spsr => self.spsr,
                    _ => self.cpsr,
                };
                self.write_register(destination_register, value.into());
            }
            PsrOpKind::Msr {
                field_mask,
                operand,
            } => {
                let value = self.second_operand(operand).result;
                match psr_kind {
                    PsrKind::Cpsr => {
                        let mut mask = if self.cpsr.mode().is_privileged() {
                            field_mask
                        } else {
                            field_mask & 0xFF00_0000
                        };
                        // The T bit only changes through BX and exception returns.
                        mask &= !(1 << 5);

                        let mut status = self.cpsr;
                        status.merge(value, mask);
                        self.load_status(status);
                    }
                    PsrKind::Spsr if has_spsr => self.spsr.merge(value, field_mask),
                    PsrKind::Spsr => {
                        tracing::debug!("MSR to SPSR in {:?} mode ignored", self.cpsr.mode());
                    }
                }
            }
        }
    }

    pub fn multiply(
        &mut self,
        variant: ArmModeMultiplyVariant,
        set_conditions: bool,
        destination: usize,
        accumulate: usize,
        rs: usize,
        rm: usize,
    ) {
        let operand = self.registers.register_at(rs);
        let mut result = self.registers.register_at(rm).wrapping_mul(operand);
        if variant == ArmModeMultiplyVariant::Mla {
            result = result.wrapping_add(self.registers.register_at(accumulate));
            self.add_cycles(1);
        }
        self.add_cycles(multiplier_cycles(operand, true));

        if set_conditions {
            self.cpsr.set_sign_and_zero(result);
        }
        self.write_register(destination, result);
    }

    pub fn multiply_long(
        &mut self,
        variant: ArmModeMultiplyLongVariant,
        set_conditions: bool,
        destination_hi: usize,
        destination_lo: usize,
        rs: usize,
        rm: usize,
    ) {
        let first = self.registers.register_at(rm);
        let second = self.registers.register_at(rs);

        let mut result = if variant.is_signed() {
            (i64::from(first as i32) * i64::from(second as i32)) as u64
        } else {
            u64::from(first) * u64::from(second)
        };
        if variant.accumulates() {
            let hi = u64::from(self.registers.register_at(destination_hi));
            let lo = u64::from(self.registers.register_at(destination_lo));
            result = result.wrapping_add((hi << 32) | lo);
            self.add_cycles(1);
        }
        self.add_cycles(1 + multiplier_cycles(second, variant.is_signed()));

        if set_conditions {
            self.cpsr.set_sign_flag(result.get_bit(63));
            self.cpsr.set_zero_flag(result == 0);
        }
        self.write_register(destination_lo, result as u32);
        self.write_register(destination_hi, (result >> 32) as u32);
    }

    pub fn single_data_swap(
        &mut self,
        bus: &mut dyn MemoryBus,
        quantity: ReadWriteKind,
        rn: usize,
        rd: usize,
        rm: usize,
    ) {
        let address = self.registers.register_at(rn);
        let source = self.registers.register_at(rm);

        let old = match quantity {
            ReadWriteKind::Byte => self.read_byte(bus, address),
            ReadWriteKind::Word => self.read_word(bus, address),
        };
        let Some(old) = old else {
            self.data_abort(address);
            return;
        };

        let stored = match quantity {
            ReadWriteKind::Byte => self.write_byte(bus, address, source as u8),
            ReadWriteKind::Word => self.write_word(bus, address, source),
        };
        if !stored {
            self.data_abort(address);
            return;
        }
        self.write_register(rd, old);
    }

    pub fn branch_and_exchange(&mut self, register: usize) {
        let target = self.registers.register_at(register);

        let mut status = self.cpsr;
        status.set_cpu_state(if target.get_bit(0) {
            CpuState::Thumb
        } else {
            CpuState::Arm
        });
        self.load_status(status);

        self.registers.set_program_counter(target & !1);
        self.flush_pipeline();
    }

    /// B and BL. `offset` is relative to R15.
    pub fn branch(&mut self, link: bool, offset: u32) {
        let pc = self.registers.program_counter();
        if link {
            self.registers.set_register_at(REG_LR, pc.wrapping_sub(4));
        }
        self.registers.set_program_counter(pc.wrapping_add(offset));
        self.flush_pipeline();
    }

    /// Base register update shared by all single transfers.
    fn transfer_address(
        &self,
        base_register: usize,
        indexing: Indexing,
        offsetting: Offsetting,
        offset: u32,
    ) -> (u32, u32) {
        let base = self.registers.register_at(base_register);
        let offset_address = offsetting.apply(base, offset);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };
        (address, offset_address)
    }

    /// Value of `rd` as seen by a store: R15 reads one word further ahead.
    fn stored_register(&self, rd: usize) -> u32 {
        let value = self.registers.register_at(rd);
        if rd == REG_PROGRAM_COUNTER {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn halfword_data_transfer(
        &mut self,
        bus: &mut dyn MemoryBus,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store: LoadStoreKind,
        offset: HalfwordDataTransferOffsetKind,
        base_register: usize,
        source_destination_register: usize,
        transfer_kind: HalfwordTransferKind,
    ) {
        let offset = match offset {
            HalfwordDataTransferOffsetKind::Immediate { offset } => offset,
            HalfwordDataTransferOffsetKind::Register { register } => {
                self.registers.register_at(register)
            }
        };
        let (address, offset_address) =
            self.transfer_address(base_register, indexing, offsetting, offset);
        // Post-indexed transfers always write back.
        let write_back = write_back || indexing == Indexing::Post;

        match load_store {
            LoadStoreKind::Load => {
                let value = match transfer_kind {
                    HalfwordTransferKind::UnsignedHalfwords => self.read_halfword(bus, address),
                    HalfwordTransferKind::SignedByte => self.read_signed_byte(bus, address),
                    HalfwordTransferKind::SignedHalfwords => {
                        self.read_signed_halfword(bus, address)
                    }
                };
                let Some(value) = value else {
                    self.data_abort(address);
                    return;
                };
                if write_back {
                    self.write_register(base_register, offset_address);
                }
                self.write_register(source_destination_register, value);
            }
            LoadStoreKind::Store => {
                let value = self.stored_register(source_destination_register);
                if !self.write_halfword(bus, address, value as u16) {
                    self.data_abort(address);
                    return;
                }
                if write_back {
                    self.write_register(base_register, offset_address);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn single_data_transfer(
        &mut self,
        bus: &mut dyn MemoryBus,
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: usize,
        base_register: usize,
        offset_info: SingleDataTransferOffsetInfo,
    ) {
        let offset = match offset_info {
            SingleDataTransferOffsetInfo::Immediate { offset } => offset,
            SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => {
                shift_immediate(
                    shift_kind,
                    shift_amount,
                    self.registers.register_at(reg_offset),
                    self.cpsr.carry_flag(),
                )
                .result
            }
        };
        let (address, offset_address) =
            self.transfer_address(base_register, indexing, offsetting, offset);
        let write_back = write_back || indexing == Indexing::Post;

        match load_store {
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Word => self.read_word(bus, address),
                    ReadWriteKind::Byte => self.read_byte(bus, address),
                };
                let Some(value) = value else {
                    self.data_abort(address);
                    return;
                };
                if write_back {
                    self.write_register(base_register, offset_address);
                }
                self.write_register(rd, value);
            }
            LoadStoreKind::Store => {
                let value = self.stored_register(rd);
                let stored = match quantity {
                    ReadWriteKind::Word => self.write_word(bus, address, value),
                    ReadWriteKind::Byte => self.write_byte(bus, address, value as u8),
                };
                if !stored {
                    self.data_abort(address);
                    return;
                }
                if write_back {
                    self.write_register(base_register, offset_address);
                }
            }
        }
    }

    /// LDM and STM.
    ///
    /// Registers always go to ascending addresses starting at the lowest one,
    /// whatever the addressing mode. An empty list transfers R15 and moves the
    /// base by 0x40.
    #[allow(clippy::too_many_arguments)]
    pub fn block_data_transfer(
        &mut self,
        bus: &mut dyn MemoryBus,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u16,
    ) {
        let base = self.registers.register_at(rn);
        let (register_list, transfer_size) = if register_list == 0 {
            (1 << REG_PROGRAM_COUNTER, 0x40)
        } else {
            (register_list, register_list.count_ones() * 4)
        };

        let mut address = match (offsetting, indexing) {
            (Offsetting::Up, Indexing::Post) => base,
            (Offsetting::Up, Indexing::Pre) => base.wrapping_add(4),
            (Offsetting::Down, Indexing::Post) => base.wrapping_sub(transfer_size).wrapping_add(4),
            (Offsetting::Down, Indexing::Pre) => base.wrapping_sub(transfer_size),
        };
        let final_base = offsetting.apply(base, transfer_size);

        let loads_pc = register_list.get_bit(REG_PROGRAM_COUNTER as u8);
        // With S set and no PC load, the User bank is transferred.
        let user_bank = load_psr && !(load_store == LoadStoreKind::Load && loads_pc);
        let mode = self.cpsr.mode();
        let registers = (0..16).filter(|reg| register_list.get_bit(*reg as u8));

        match load_store {
            LoadStoreKind::Store => {
                let first_register = register_list.trailing_zeros() as usize;
                for reg in registers {
                    let value = if reg == rn && write_back && reg != first_register {
                        final_base
                    } else if user_bank {
                        self.register_bank
                            .user_register(mode, reg)
                            .unwrap_or_else(|| self.stored_register(reg))
                    } else {
                        self.stored_register(reg)
                    };

                    if !self.write_word(bus, address, value) {
                        self.data_abort(address);
                        return;
                    }
                    address = address.wrapping_add(4);
                }

                if write_back {
                    self.write_register(rn, final_base);
                }
            }
            LoadStoreKind::Load => {
                // A loaded base overrides the write back.
                if write_back {
                    self.write_register(rn, final_base);
                }

                for reg in registers {
                    let Some(value) = self.read_word(bus, address & !3) else {
                        self.data_abort(address);
                        return;
                    };
                    if !(user_bank && self.register_bank.set_user_register(mode, reg, value)) {
                        self.write_register(reg, value);
                    }
                    address = address.wrapping_add(4);
                }

                if load_psr && loads_pc {
                    self.restore_saved_status();
                }
            }
        }
    }
}
