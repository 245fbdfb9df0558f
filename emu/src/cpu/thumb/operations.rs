//! Execution of decoded Thumb instructions.
//!
//! R15 reads as the executing instruction + 4. PC-relative addressing clears
//! bit 1 first so the base is word aligned.

use crate::bitwise::Bits;
use crate::bus::MemoryBus;
use crate::cpu::arm::alu_instruction::{
    ArithmeticOpResult, add_with_carry, shift, shift_immediate, sub_with_carry,
};
use crate::cpu::arm::operations::multiplier_cycles;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::condition::Condition;
use crate::cpu::exception::ExceptionType;
use crate::cpu::flags::{Indexing, LoadStoreKind, OperandKind, Offsetting, ReadWriteKind, ShiftKind};
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER, REG_SP};
use crate::cpu::thumb::alu_instructions::{
    ThumbHighRegisterOperation, ThumbImmediateOperation, ThumbModeAluInstruction,
    ThumbSignExtendedTransfer,
};
use crate::cpu::thumb::instruction::ThumbModeInstruction;
use crate::cpu::thumb::mode::ThumbModeOpcode;

impl Arm7tdmi {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute_thumb_instruction(
        &mut self,
        bus: &mut dyn MemoryBus,
        op_code: ThumbModeOpcode,
    ) {
        match op_code.instruction {
            ThumbModeInstruction::MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => self.move_shifted_reg(
                shift_operation,
                offset5,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::AddSubtract {
                operand_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => self.add_subtract(
                operand_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => self.move_compare_add_sub_imm(operation, destination_register, offset),
            ThumbModeInstruction::AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => self.alu_op(alu_operation, source_register, destination_register),
            ThumbModeInstruction::HiRegisterOpBx {
                register_operation,
                source_register,
                destination_register,
            } => self.hi_reg_operation_branch_ex(
                register_operation,
                source_register,
                destination_register,
            ),
            ThumbModeInstruction::PcRelativeLoad {
                destination_register,
                offset,
            } => self.pc_relative_load(bus, destination_register, offset),
            ThumbModeInstruction::LoadStoreRegisterOffset {
                load_store,
                quantity,
                offset_register,
                base_register,
                destination_register,
            } => {
                let address = self
                    .registers
                    .register_at(base_register)
                    .wrapping_add(self.registers.register_at(offset_register));
                self.load_store(bus, load_store, quantity, address, destination_register);
            }
            ThumbModeInstruction::LoadStoreSignExtByteHalfword {
                transfer,
                offset_register,
                base_register,
                destination_register,
            } => self.load_store_sign_extend_byte_halfword(
                bus,
                transfer,
                offset_register,
                base_register,
                destination_register,
            ),
            ThumbModeInstruction::LoadStoreImmOffset {
                load_store,
                quantity,
                offset,
                base_register,
                destination_register,
            } => {
                let address = self
                    .registers
                    .register_at(base_register)
                    .wrapping_add(offset);
                self.load_store(bus, load_store, quantity, address, destination_register);
            }
            ThumbModeInstruction::LoadStoreHalfword {
                load_store,
                offset,
                base_register,
                source_destination_register,
            } => {
                let transfer = match load_store {
                    LoadStoreKind::Load => ThumbSignExtendedTransfer::Ldrh,
                    LoadStoreKind::Store => ThumbSignExtendedTransfer::Strh,
                };
                let address = self
                    .registers
                    .register_at(base_register)
                    .wrapping_add(offset);
                self.halfword_transfer(bus, transfer, address, source_destination_register);
            }
            ThumbModeInstruction::SpRelativeLoadStore {
                load_store,
                destination_register,
                offset,
            } => {
                let address = self.registers.register_at(REG_SP).wrapping_add(offset);
                self.load_store(
                    bus,
                    load_store,
                    ReadWriteKind::Word,
                    address,
                    destination_register,
                );
            }
            ThumbModeInstruction::LoadAddress {
                sp,
                destination_register,
                offset,
            } => self.load_address(sp, destination_register, offset),
            ThumbModeInstruction::AddOffsetSp { subtract, offset } => {
                self.add_offset_sp(subtract, offset);
            }
            ThumbModeInstruction::PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => self.push_pop_register(bus, load_store, pc_lr, register_list),
            ThumbModeInstruction::MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => self.block_data_transfer(
                bus,
                Indexing::Post,
                Offsetting::Up,
                false,
                true,
                load_store,
                base_register,
                register_list,
            ),
            ThumbModeInstruction::CondBranch { condition, offset } => {
                self.cond_branch(condition, offset);
            }
            ThumbModeInstruction::Swi { .. } => self.exception(ExceptionType::SoftwareInterrupt),
            ThumbModeInstruction::UncondBranch { offset } => self.branch(false, offset),
            ThumbModeInstruction::LongBranchLink { h, offset } => {
                self.long_branch_link(h, offset);
            }
            ThumbModeInstruction::Undefined => self.undefined_instruction(u32::from(op_code.raw)),
        }
    }

    fn set_logical_flags(&mut self, result: u32) {
        self.cpsr.set_sign_and_zero(result);
    }

    fn set_shift_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.cpsr.set_sign_and_zero(op_result.result);
        self.cpsr.set_carry_flag(op_result.carry);
    }

    pub fn move_shifted_reg(
        &mut self,
        shift_operation: ShiftKind,
        offset5: u32,
        source_register: usize,
        destination_register: usize,
    ) {
        let source = self.registers.register_at(source_register);
        let op_result = shift_immediate(shift_operation, offset5, source, self.cpsr.carry_flag());
        self.set_shift_flags(&op_result);
        self.registers
            .set_register_at(destination_register, op_result.result);
    }

    pub fn add_subtract(
        &mut self,
        operand_kind: OperandKind,
        subtract: bool,
        rn_offset3: u32,
        source_register: usize,
        destination_register: usize,
    ) {
        let first = self.registers.register_at(source_register);
        let second = match operand_kind {
            OperandKind::Immediate => rn_offset3,
            OperandKind::Register => self.registers.register_at(rn_offset3 as usize),
        };

        let op_result = if subtract {
            sub_with_carry(first, second, true)
        } else {
            add_with_carry(first, second, false)
        };
        self.cpsr.set_flags(&op_result);
        self.registers
            .set_register_at(destination_register, op_result.result);
    }

    pub fn move_compare_add_sub_imm(
        &mut self,
        operation: ThumbImmediateOperation,
        destination_register: usize,
        offset: u32,
    ) {
        let rd = self.registers.register_at(destination_register);
        let op_result = match operation {
            // MOV leaves C and V alone.
            ThumbImmediateOperation::Mov => {
                self.set_logical_flags(offset);
                self.registers.set_register_at(destination_register, offset);
                return;
            }
            ThumbImmediateOperation::Cmp | ThumbImmediateOperation::Sub => {
                sub_with_carry(rd, offset, true)
            }
            ThumbImmediateOperation::Add => add_with_carry(rd, offset, false),
        };

        self.cpsr.set_flags(&op_result);
        if operation != ThumbImmediateOperation::Cmp {
            self.registers
                .set_register_at(destination_register, op_result.result);
        }
    }

    pub fn alu_op(
        &mut self,
        alu_operation: ThumbModeAluInstruction,
        source_register: usize,
        destination_register: usize,
    ) {
        let rd = self.registers.register_at(destination_register);
        let rs = self.registers.register_at(source_register);
        let carry = self.cpsr.carry_flag();

        let result = match alu_operation {
            ThumbModeAluInstruction::And | ThumbModeAluInstruction::Tst => {
                let result = rd & rs;
                self.set_logical_flags(result);
                result
            }
            ThumbModeAluInstruction::Eor => {
                let result = rd ^ rs;
                self.set_logical_flags(result);
                result
            }
            ThumbModeAluInstruction::Orr => {
                let result = rd | rs;
                self.set_logical_flags(result);
                result
            }
            ThumbModeAluInstruction::Bic => {
                let result = rd & !rs;
                self.set_logical_flags(result);
                result
            }
            ThumbModeAluInstruction::Mvn => {
                let result = !rs;
                self.set_logical_flags(result);
                result
            }
            ThumbModeAluInstruction::Lsl
            | ThumbModeAluInstruction::Lsr
            | ThumbModeAluInstruction::Asr
            | ThumbModeAluInstruction::Ror => {
                let kind = match alu_operation {
                    ThumbModeAluInstruction::Lsl => ShiftKind::Lsl,
                    ThumbModeAluInstruction::Lsr => ShiftKind::Lsr,
                    ThumbModeAluInstruction::Asr => ShiftKind::Asr,
                    _ => ShiftKind::Ror,
                };
                self.add_cycles(1);
                let op_result = shift(kind, rs & 0xFF, rd, carry);
                self.set_shift_flags(&op_result);
                op_result.result
            }
            ThumbModeAluInstruction::Adc => self.thumb_arithmetic(add_with_carry(rd, rs, carry)),
            ThumbModeAluInstruction::Sbc => self.thumb_arithmetic(sub_with_carry(rd, rs, carry)),
            ThumbModeAluInstruction::Neg => self.thumb_arithmetic(sub_with_carry(0, rs, true)),
            ThumbModeAluInstruction::Cmp => self.thumb_arithmetic(sub_with_carry(rd, rs, true)),
            ThumbModeAluInstruction::Cmn => self.thumb_arithmetic(add_with_carry(rd, rs, false)),
            ThumbModeAluInstruction::Mul => {
                self.add_cycles(multiplier_cycles(rd, true));
                let result = rd.wrapping_mul(rs);
                self.set_logical_flags(result);
                result
            }
        };

        if !matches!(
            alu_operation,
            ThumbModeAluInstruction::Tst | ThumbModeAluInstruction::Cmp | ThumbModeAluInstruction::Cmn
        ) {
            self.registers
                .set_register_at(destination_register, result);
        }
    }

    fn thumb_arithmetic(&mut self, op_result: ArithmeticOpResult) -> u32 {
        self.cpsr.set_flags(&op_result);
        op_result.result
    }

    /// Format 5. Only CMP sets flags; ADD and MOV to R15 branch.
    pub fn hi_reg_operation_branch_ex(
        &mut self,
        register_operation: ThumbHighRegisterOperation,
        source_register: usize,
        destination_register: usize,
    ) {
        let rs = self.registers.register_at(source_register);
        let rd = self.registers.register_at(destination_register);

        match register_operation {
            ThumbHighRegisterOperation::Add => {
                self.write_register(destination_register, rd.wrapping_add(rs));
            }
            ThumbHighRegisterOperation::Cmp => {
                self.cpsr.set_flags(&sub_with_carry(rd, rs, true));
            }
            ThumbHighRegisterOperation::Mov => self.write_register(destination_register, rs),
            ThumbHighRegisterOperation::Bx => self.branch_and_exchange(source_register),
        }
    }

    pub fn pc_relative_load(
        &mut self,
        bus: &mut dyn MemoryBus,
        destination_register: usize,
        offset: u32,
    ) {
        let address = (self.registers.program_counter() & !2).wrapping_add(offset);
        match self.read_word(bus, address) {
            Some(value) => self
                .registers
                .set_register_at(destination_register, value),
            None => self.data_abort(address),
        }
    }

    /// Word and byte transfers of formats 7, 9 and 11.
    fn load_store(
        &mut self,
        bus: &mut dyn MemoryBus,
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        address: u32,
        rd: usize,
    ) {
        match load_store {
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Word => self.read_word(bus, address),
                    ReadWriteKind::Byte => self.read_byte(bus, address),
                };
                match value {
                    Some(value) => self.registers.set_register_at(rd, value),
                    None => self.data_abort(address),
                }
            }
            LoadStoreKind::Store => {
                let value = self.registers.register_at(rd);
                let stored = match quantity {
                    ReadWriteKind::Word => self.write_word(bus, address, value),
                    ReadWriteKind::Byte => self.write_byte(bus, address, value as u8),
                };
                if !stored {
                    self.data_abort(address);
                }
            }
        }
    }

    pub fn load_store_sign_extend_byte_halfword(
        &mut self,
        bus: &mut dyn MemoryBus,
        transfer: ThumbSignExtendedTransfer,
        offset_register: usize,
        base_register: usize,
        destination_register: usize,
    ) {
        let address = self
            .registers
            .register_at(base_register)
            .wrapping_add(self.registers.register_at(offset_register));
        self.halfword_transfer(bus, transfer, address, destination_register);
    }

    fn halfword_transfer(
        &mut self,
        bus: &mut dyn MemoryBus,
        transfer: ThumbSignExtendedTransfer,
        address: u32,
        rd: usize,
    ) {
        let value = match transfer {
            ThumbSignExtendedTransfer::Strh => {
                let value = self.registers.register_at(rd) as u16;
                if !self.write_halfword(bus, address, value) {
                    self.data_abort(address);
                }
                return;
            }
            ThumbSignExtendedTransfer::Ldrh => self.read_halfword(bus, address),
            ThumbSignExtendedTransfer::Ldsb => self.read_signed_byte(bus, address),
            ThumbSignExtendedTransfer::Ldsh => self.read_signed_halfword(bus, address),
        };

        match value {
            Some(value) => self.registers.set_register_at(rd, value),
            None => self.data_abort(address),
        }
    }

    pub fn load_address(&mut self, sp: bool, destination_register: usize, offset: u32) {
        let base = if sp {
            self.registers.register_at(REG_SP)
        } else {
            self.registers.program_counter() & !2
        };
        self.registers
            .set_register_at(destination_register, base.wrapping_add(offset));
    }

    pub fn add_offset_sp(&mut self, subtract: bool, offset: u32) {
        let sp = self.registers.register_at(REG_SP);
        let sp = if subtract {
            sp.wrapping_sub(offset)
        } else {
            sp.wrapping_add(offset)
        };
        self.registers.set_register_at(REG_SP, sp);
    }

    /// PUSH is STMDB SP! with LR, POP is LDMIA SP! with PC.
    pub fn push_pop_register(
        &mut self,
        bus: &mut dyn MemoryBus,
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u16,
    ) {
        match load_store {
            LoadStoreKind::Store => {
                let mut register_list = register_list;
                register_list.set_bit(REG_LR as u8, pc_lr);
                self.block_data_transfer(
                    bus,
                    Indexing::Pre,
                    Offsetting::Down,
                    false,
                    true,
                    load_store,
                    REG_SP,
                    register_list,
                );
            }
            LoadStoreKind::Load => {
                let mut register_list = register_list;
                register_list.set_bit(REG_PROGRAM_COUNTER as u8, pc_lr);
                self.block_data_transfer(
                    bus,
                    Indexing::Post,
                    Offsetting::Up,
                    false,
                    true,
                    load_store,
                    REG_SP,
                    register_list,
                );
            }
        }
    }

    pub fn cond_branch(&mut self, condition: Condition, offset: u32) {
        if self.cpsr.can_execute(condition) {
            self.branch(false, offset);
        }
    }

    /// BL in two halves. The first parks the high part of the target in LR,
    /// the second jumps and links.
    pub fn long_branch_link(&mut self, h: bool, offset: u32) {
        let pc = self.registers.program_counter();
        if h {
            let target = self
                .registers
                .register_at(REG_LR)
                .wrapping_add(offset << 1);
            let return_address = self.next_instruction() | 1;
            self.registers.set_register_at(REG_LR, return_address);
            self.registers.set_program_counter(target);
            self.flush_pipeline();
        } else {
            let high = (offset << 12).sign_extended(23);
            self.registers
                .set_register_at(REG_LR, pc.wrapping_add(high));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::arm7tdmi::test_bus::TestBus;
    use crate::cpu::cpu_modes::Mode;
    use crate::cpu::exception::InterruptLines;
    use crate::cpu::psr::{CpuState, Psr};
    use pretty_assertions::assert_eq;

    /// A Thumb System mode CPU about to execute at 0x100.
    fn cpu() -> Arm7tdmi {
        let mut cpu = Arm7tdmi::new();
        let mut status = Psr::from(Mode::System);
        status.set_irq_disable(true);
        status.set_fiq_disable(true);
        status.set_cpu_state(CpuState::Thumb);
        cpu.load_status(status);
        cpu.registers.set_program_counter(0x104);
        cpu
    }

    /// Thumb code placed at 0x100.
    fn thumb_bus(program: &[u16]) -> TestBus {
        let mut bus = TestBus(vec![0; 0x1000]);
        for (index, op_code) in program.iter().enumerate() {
            let start = 0x100 + index * 2;
            bus.0[start..start + 2].copy_from_slice(&op_code.to_le_bytes());
        }
        bus
    }

    fn execute(cpu: &mut Arm7tdmi, bus: &mut TestBus, op_code: u16) {
        cpu.execute_thumb(bus, ThumbModeOpcode::from(op_code));
    }

    #[test]
    fn check_move_shifted_register() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        cpu.registers.set_register_at(2, 0x1000_0001);

        // LSL R1, R2, #4
        execute(&mut cpu, &mut bus, 0x0111);
        assert_eq!(cpu.registers.register_at(1), 0x10);
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());

        // LSR R0, R1, #32
        cpu.registers.set_register_at(1, 0x8000_0000);
        execute(&mut cpu, &mut bus, 0x0808);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_add_subtract_and_immediates() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);

        // SUB R0, R1, #3
        cpu.registers.set_register_at(1, 3);
        execute(&mut cpu, &mut bus, 0x1EC8);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        // MOV R0, #0 keeps the carry.
        cpu.registers.set_register_at(0, 7);
        execute(&mut cpu, &mut bus, 0x2000);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        // CMP R3, #255
        cpu.registers.set_register_at(3, 0x100);
        execute(&mut cpu, &mut bus, 0x2BFF);
        assert_eq!(cpu.registers.register_at(3), 0x100);
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_alu_operations() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);

        // NEG R0, R1
        cpu.registers.set_register_at(1, 1);
        execute(&mut cpu, &mut bus, 0x4248);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFFF);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());

        // MUL R0, R1
        cpu.registers.set_register_at(0, 6);
        cpu.registers.set_register_at(1, 7);
        execute(&mut cpu, &mut bus, 0x4348);
        assert_eq!(cpu.registers.register_at(0), 42);

        // LSL R0, R1 with a shift of 33.
        cpu.registers.set_register_at(1, 33);
        execute(&mut cpu, &mut bus, 0x4088);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.carry_flag());

        // TST R0, R1 leaves R0.
        cpu.registers.set_register_at(0, 0b1010);
        cpu.registers.set_register_at(1, 0b0101);
        execute(&mut cpu, &mut bus, 0x4208);
        assert_eq!(cpu.registers.register_at(0), 0b1010);
        assert!(cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_hi_register_operations() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        cpu.cpsr.set_zero_flag(true);

        // ADD R1, R8
        cpu.registers.set_register_at(1, 1);
        cpu.registers.set_register_at(8, 0xFFFF_FFFF);
        execute(&mut cpu, &mut bus, 0x4441);
        assert_eq!(cpu.registers.register_at(1), 0);
        assert!(cpu.cpsr.zero_flag());

        // BX R0 to Thumb, then to ARM.
        cpu.registers.set_register_at(0, 0x201);
        execute(&mut cpu, &mut bus, 0x4700);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
        assert_eq!(cpu.registers.program_counter(), 0x200);

        cpu.registers.set_register_at(0, 0x300);
        execute(&mut cpu, &mut bus, 0x4700);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), 0x300);
    }

    #[test]
    fn check_pc_relative_addressing() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        bus.0[0x108..0x10C].copy_from_slice(&0xCAFE_F00D_u32.to_le_bytes());
        // Executing at 0x102.
        cpu.registers.set_program_counter(0x106);

        // LDR R1, [PC, #4]
        execute(&mut cpu, &mut bus, 0x4901);
        assert_eq!(cpu.registers.register_at(1), 0xCAFE_F00D);

        // ADD R0, PC, #4
        execute(&mut cpu, &mut bus, 0xA001);
        assert_eq!(cpu.registers.register_at(0), 0x108);

        // ADD SP, #-8
        cpu.registers.set_register_at(REG_SP, 0x800);
        execute(&mut cpu, &mut bus, 0xB082);
        assert_eq!(cpu.registers.register_at(REG_SP), 0x7F8);
    }

    #[test]
    fn check_loads_and_stores() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        cpu.registers.set_register_at(0, 0x1122_3344);
        cpu.registers.set_register_at(1, 0x400);

        // STR R0, [R1, #4] ; LDRB R2, [R1, #4]
        execute(&mut cpu, &mut bus, 0x6048);
        execute(&mut cpu, &mut bus, 0x790A);
        assert_eq!(cpu.registers.register_at(2), 0x44);

        // LDSH R0, [R1, R2] with a negative halfword.
        cpu.registers.set_register_at(2, 0x10);
        bus.0[0x410..0x412].copy_from_slice(&0x8000_u16.to_le_bytes());
        execute(&mut cpu, &mut bus, 0x5E88);
        assert_eq!(cpu.registers.register_at(0), 0xFFFF_8000);

        // STRH R0, [R1, #2]
        execute(&mut cpu, &mut bus, 0x8048);
        assert_eq!(&bus.0[0x402..0x404], &[0x00, 0x80]);

        // STR R0, [SP, #8]
        cpu.registers.set_register_at(REG_SP, 0x500);
        execute(&mut cpu, &mut bus, 0x9002);
        assert_eq!(&bus.0[0x508..0x50C], &0xFFFF_8000_u32.to_le_bytes());
    }

    #[test]
    fn check_push_pop_through_step() {
        // PUSH {R0, LR} ; POP {R1, PC}
        let mut bus = thumb_bus(&[0xB501, 0xBD02]);
        let mut cpu = cpu();
        cpu.registers.set_register_at(REG_SP, 0x800);
        cpu.registers.set_register_at(0, 0x11);
        cpu.registers.set_register_at(REG_LR, 0x301);

        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 3);
        assert_eq!(cpu.registers.register_at(REG_SP), 0x7F8);
        assert_eq!(&bus.0[0x7F8..0x7FC], &0x11_u32.to_le_bytes());
        assert_eq!(&bus.0[0x7FC..0x800], &0x301_u32.to_le_bytes());

        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 5);
        assert_eq!(cpu.registers.register_at(1), 0x11);
        assert_eq!(cpu.registers.register_at(REG_SP), 0x800);
        assert_eq!(cpu.current_instruction(), 0x300);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
    }

    #[test]
    fn check_multiple_load_store() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        cpu.registers.set_register_at(0, 0x600);
        cpu.registers.set_register_at(1, 1);
        cpu.registers.set_register_at(2, 2);

        // STMIA R0!, {R1, R2}
        execute(&mut cpu, &mut bus, 0xC006);
        assert_eq!(cpu.registers.register_at(0), 0x608);
        assert_eq!(&bus.0[0x600..0x608], &[1, 0, 0, 0, 2, 0, 0, 0]);

        // LDMIA R0!, {R3, R4} from 0x600.
        cpu.registers.set_register_at(0, 0x600);
        execute(&mut cpu, &mut bus, 0xC818);
        assert_eq!(cpu.registers.register_at(3), 1);
        assert_eq!(cpu.registers.register_at(4), 2);
        assert_eq!(cpu.registers.register_at(0), 0x608);
    }

    #[test]
    fn check_branches_through_step() {
        // BEQ .
        let mut bus = thumb_bus(&[0xD0FE]);
        let mut cpu = cpu();
        cpu.cpsr.set_zero_flag(true);
        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 3);
        assert_eq!(cpu.current_instruction(), 0x100);

        cpu.cpsr.set_zero_flag(false);
        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 1);
        assert_eq!(cpu.current_instruction(), 0x102);
    }

    #[test]
    fn check_long_branch_link() {
        // BL to 0x10C
        let mut bus = thumb_bus(&[0xF000, 0xF804]);
        let mut cpu = cpu();

        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 1);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x104);

        assert_eq!(cpu.step(&mut bus, InterruptLines::default()), 3);
        assert_eq!(cpu.current_instruction(), 0x10C);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x105);
    }

    #[test]
    fn check_swi_and_undefined() {
        let mut bus = thumb_bus(&[0xDF00]);
        let mut cpu = cpu();
        cpu.step(&mut bus, InterruptLines::default());
        assert_eq!(cpu.cpsr.mode(), Mode::Supervisor);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x102);
        assert_eq!(cpu.current_instruction(), 0x08);

        let mut bus = thumb_bus(&[0xDE00]);
        let mut cpu = self::cpu();
        cpu.step(&mut bus, InterruptLines::default());
        assert_eq!(cpu.cpsr.mode(), Mode::Undefined);
        assert_eq!(cpu.current_instruction(), 0x04);
    }

    #[test]
    fn check_data_abort_keeps_registers() {
        let mut cpu = cpu();
        let mut bus = thumb_bus(&[]);
        cpu.registers.set_register_at(1, 0x10_0000);
        cpu.registers.set_register_at(0, 0x55);

        // LDR R0, [R1, #4]
        execute(&mut cpu, &mut bus, 0x6848);
        assert_eq!(cpu.cpsr.mode(), Mode::Abort);
        assert_eq!(cpu.registers.register_at(0), 0x55);
        assert_eq!(cpu.registers.register_at(REG_LR), 0x100);
    }
}
