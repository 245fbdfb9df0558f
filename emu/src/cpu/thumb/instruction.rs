//! # Thumb Instruction Decoding
//!
//! Thumb instructions are grouped into 19 formats, identified by their high bits:
//!
//! ```text
//! Format 1:  000 xx          Move shifted register
//! Format 2:  00011           Add/subtract
//! Format 3:  001 xx          Move/compare/add/subtract immediate
//! Format 4:  010000          ALU operations
//! Format 5:  010001          Hi register operations / BX
//! Format 6:  01001           PC-relative load
//! Format 7:  0101 xx0        Load/store with register offset
//! Format 8:  0101 xx1        Load/store sign-extended byte/halfword
//! Format 9:  011 xx          Load/store with immediate offset
//! Format 10: 1000 x          Load/store halfword
//! Format 11: 1001 x          SP-relative load/store
//! Format 12: 1010 x          Load address
//! Format 13: 10110000        Add offset to stack pointer
//! Format 14: 1011 x10x       Push/pop registers
//! Format 15: 1100 x          Multiple load/store
//! Format 16: 1101 xxxx       Conditional branch
//! Format 17: 11011111        Software interrupt
//! Format 18: 11100           Unconditional branch
//! Format 19: 1111 x          Long branch with link
//! ```
//!
//! Anything else, including a conditional branch with the AL condition,
//! decodes to [`ThumbModeInstruction::Undefined`].
//!
//! ## Long Branch (BL)
//!
//! BL spans ±4MB with two 16-bit halves:
//!
//! ```text
//! First:  1111 0xxx xxxx xxxx  ; LR = PC + (offset_hi << 12)
//! Second: 1111 1xxx xxxx xxxx  ; PC = LR + (offset_lo << 1), LR = next | 1
//! ```

use std::fmt::Display;

use crate::bitwise::Bits;
use crate::cpu::condition::Condition;
use crate::cpu::flags::{LoadStoreKind, OperandKind, ReadWriteKind, ShiftKind};
use crate::cpu::thumb::alu_instructions::{
    ThumbHighRegisterOperation, ThumbImmediateOperation, ThumbModeAluInstruction,
    ThumbSignExtendedTransfer,
};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ThumbModeInstruction {
    MoveShiftedRegister {
        shift_operation: ShiftKind,
        offset5: u32,
        source_register: usize,
        destination_register: usize,
    },
    AddSubtract {
        operand_kind: OperandKind,
        subtract: bool,
        rn_offset3: u32,
        source_register: usize,
        destination_register: usize,
    },
    MoveCompareAddSubtractImm {
        operation: ThumbImmediateOperation,
        destination_register: usize,
        offset: u32,
    },
    AluOp {
        alu_operation: ThumbModeAluInstruction,
        source_register: usize,
        destination_register: usize,
    },
    HiRegisterOpBx {
        register_operation: ThumbHighRegisterOperation,
        source_register: usize,
        destination_register: usize,
    },
    PcRelativeLoad {
        destination_register: usize,
        offset: u32,
    },
    LoadStoreRegisterOffset {
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        offset_register: usize,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreSignExtByteHalfword {
        transfer: ThumbSignExtendedTransfer,
        offset_register: usize,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreImmOffset {
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        /// Already scaled to bytes.
        offset: u32,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreHalfword {
        load_store: LoadStoreKind,
        offset: u32,
        base_register: usize,
        source_destination_register: usize,
    },
    SpRelativeLoadStore {
        load_store: LoadStoreKind,
        destination_register: usize,
        offset: u32,
    },
    LoadAddress {
        sp: bool,
        destination_register: usize,
        offset: u32,
    },
    AddOffsetSp {
        subtract: bool,
        offset: u32,
    },
    PushPopReg {
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u16,
    },
    MultipleLoadStore {
        load_store: LoadStoreKind,
        base_register: usize,
        register_list: u16,
    },
    CondBranch {
        condition: Condition,
        /// Signed byte offset from R15.
        offset: u32,
    },
    Swi {
        comment: u8,
    },
    UncondBranch {
        /// Signed byte offset from R15.
        offset: u32,
    },
    LongBranchLink {
        /// Set on the second half.
        h: bool,
        offset: u32,
    },
    Undefined,
}

const fn low_register(op_code: u16, lowest_bit: u16) -> usize {
    ((op_code >> lowest_bit) & 0b111) as usize
}

impl From<u16> for ThumbModeInstruction {
    #[allow(clippy::too_many_lines)]
    fn from(op_code: u16) -> Self {
        if op_code.get_bits(11..=15) == 0b00011 {
            Self::AddSubtract {
                operand_kind: op_code.get_bit(10).into(),
                subtract: op_code.get_bit(9),
                rn_offset3: op_code.get_bits(6..=8).into(),
                source_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(13..=15) == 0b000 {
            Self::MoveShiftedRegister {
                shift_operation: op_code.get_bits(11..=12).into(),
                offset5: op_code.get_bits(6..=10).into(),
                source_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(13..=15) == 0b001 {
            Self::MoveCompareAddSubtractImm {
                operation: op_code.get_bits(11..=12).into(),
                destination_register: low_register(op_code, 8),
                offset: op_code.get_bits(0..=7).into(),
            }
        } else if op_code.get_bits(10..=15) == 0b01_0000 {
            Self::AluOp {
                alu_operation: op_code.get_bits(6..=9).into(),
                source_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(10..=15) == 0b01_0001 {
            // H1 and H2 extend Rd and Rs to the full register set.
            let destination_register =
                low_register(op_code, 0) | (usize::from(op_code.get_bit(7)) << 3);
            Self::HiRegisterOpBx {
                register_operation: op_code.get_bits(8..=9).into(),
                source_register: op_code.get_bits(3..=6) as usize,
                destination_register,
            }
        } else if op_code.get_bits(11..=15) == 0b01001 {
            Self::PcRelativeLoad {
                destination_register: low_register(op_code, 8),
                offset: u32::from(op_code.get_bits(0..=7)) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b0101 && !op_code.get_bit(9) {
            Self::LoadStoreRegisterOffset {
                load_store: op_code.get_bit(11).into(),
                quantity: op_code.get_bit(10).into(),
                offset_register: low_register(op_code, 6),
                base_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(12..=15) == 0b0101 {
            let transfer = match (op_code.get_bit(10), op_code.get_bit(11)) {
                (false, false) => ThumbSignExtendedTransfer::Strh,
                (false, true) => ThumbSignExtendedTransfer::Ldrh,
                (true, false) => ThumbSignExtendedTransfer::Ldsb,
                (true, true) => ThumbSignExtendedTransfer::Ldsh,
            };
            Self::LoadStoreSignExtByteHalfword {
                transfer,
                offset_register: low_register(op_code, 6),
                base_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(13..=15) == 0b011 {
            let quantity: ReadWriteKind = op_code.get_bit(12).into();
            let offset5 = u32::from(op_code.get_bits(6..=10));
            Self::LoadStoreImmOffset {
                load_store: op_code.get_bit(11).into(),
                quantity,
                offset: match quantity {
                    ReadWriteKind::Word => offset5 << 2,
                    ReadWriteKind::Byte => offset5,
                },
                base_register: low_register(op_code, 3),
                destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(12..=15) == 0b1000 {
            Self::LoadStoreHalfword {
                load_store: op_code.get_bit(11).into(),
                offset: u32::from(op_code.get_bits(6..=10)) << 1,
                base_register: low_register(op_code, 3),
                source_destination_register: low_register(op_code, 0),
            }
        } else if op_code.get_bits(12..=15) == 0b1001 {
            Self::SpRelativeLoadStore {
                load_store: op_code.get_bit(11).into(),
                destination_register: low_register(op_code, 8),
                offset: u32::from(op_code.get_bits(0..=7)) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b1010 {
            Self::LoadAddress {
                sp: op_code.get_bit(11),
                destination_register: low_register(op_code, 8),
                offset: u32::from(op_code.get_bits(0..=7)) << 2,
            }
        } else if op_code.get_bits(8..=15) == 0b1011_0000 {
            Self::AddOffsetSp {
                subtract: op_code.get_bit(7),
                offset: u32::from(op_code.get_bits(0..=6)) << 2,
            }
        } else if op_code.get_bits(12..=15) == 0b1011 && op_code.get_bits(9..=10) == 0b10 {
            Self::PushPopReg {
                load_store: op_code.get_bit(11).into(),
                pc_lr: op_code.get_bit(8),
                register_list: op_code.get_bits(0..=7),
            }
        } else if op_code.get_bits(12..=15) == 0b1100 {
            Self::MultipleLoadStore {
                load_store: op_code.get_bit(11).into(),
                base_register: low_register(op_code, 8),
                register_list: op_code.get_bits(0..=7),
            }
        } else if op_code.get_bits(8..=15) == 0b1101_1111 {
            Self::Swi {
                comment: op_code.get_bits(0..=7) as u8,
            }
        } else if op_code.get_bits(12..=15) == 0b1101 && op_code.get_bits(8..=11) != 0b1110 {
            Self::CondBranch {
                condition: Condition::from(op_code.get_bits(8..=11) as u8),
                offset: (u32::from(op_code.get_bits(0..=7)) << 1).sign_extended(9),
            }
        } else if op_code.get_bits(11..=15) == 0b11100 {
            Self::UncondBranch {
                offset: (u32::from(op_code.get_bits(0..=10)) << 1).sign_extended(12),
            }
        } else if op_code.get_bits(12..=15) == 0b1111 {
            Self::LongBranchLink {
                h: op_code.get_bit(11),
                offset: op_code.get_bits(0..=10).into(),
            }
        } else {
            Self::Undefined
        }
    }
}

fn register_list_string(register_list: u16, extra: Option<&str>) -> String {
    (0..8)
        .filter(|reg| register_list.get_bit(*reg))
        .map(|reg| format!("R{reg}"))
        .chain(extra.map(str::to_owned))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for ThumbModeInstruction {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => write!(
                f,
                "{shift_operation} R{destination_register}, R{source_register}, #{offset5}"
            ),
            Self::AddSubtract {
                operand_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => {
                let mnemonic = if *subtract { "SUB" } else { "ADD" };
                match operand_kind {
                    OperandKind::Immediate => write!(
                        f,
                        "{mnemonic} R{destination_register}, R{source_register}, #{rn_offset3}"
                    ),
                    OperandKind::Register => write!(
                        f,
                        "{mnemonic} R{destination_register}, R{source_register}, R{rn_offset3}"
                    ),
                }
            }
            Self::MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => write!(f, "{operation} R{destination_register}, #{offset}"),
            Self::AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => write!(f, "{alu_operation} R{destination_register}, R{source_register}"),
            Self::HiRegisterOpBx {
                register_operation: ThumbHighRegisterOperation::Bx,
                source_register,
                ..
            } => write!(f, "BX R{source_register}"),
            Self::HiRegisterOpBx {
                register_operation,
                source_register,
                destination_register,
            } => write!(
                f,
                "{register_operation} R{destination_register}, R{source_register}"
            ),
            Self::PcRelativeLoad {
                destination_register,
                offset,
            } => write!(f, "LDR R{destination_register}, [PC, #{offset}]"),
            Self::LoadStoreRegisterOffset {
                load_store,
                quantity,
                offset_register,
                base_register,
                destination_register,
            } => {
                let mnemonic = match (load_store, quantity) {
                    (LoadStoreKind::Load, ReadWriteKind::Byte) => "LDRB",
                    (LoadStoreKind::Load, ReadWriteKind::Word) => "LDR",
                    (LoadStoreKind::Store, ReadWriteKind::Byte) => "STRB",
                    (LoadStoreKind::Store, ReadWriteKind::Word) => "STR",
                };
                write!(
                    f,
                    "{mnemonic} R{destination_register}, [R{base_register}, R{offset_register}]"
                )
            }
            Self::LoadStoreSignExtByteHalfword {
                transfer,
                offset_register,
                base_register,
                destination_register,
            } => write!(
                f,
                "{transfer} R{destination_register}, [R{base_register}, R{offset_register}]"
            ),
            Self::LoadStoreImmOffset {
                load_store,
                quantity,
                offset,
                base_register,
                destination_register,
            } => {
                let mnemonic = match (load_store, quantity) {
                    (LoadStoreKind::Load, ReadWriteKind::Byte) => "LDRB",
                    (LoadStoreKind::Load, ReadWriteKind::Word) => "LDR",
                    (LoadStoreKind::Store, ReadWriteKind::Byte) => "STRB",
                    (LoadStoreKind::Store, ReadWriteKind::Word) => "STR",
                };
                write!(
                    f,
                    "{mnemonic} R{destination_register}, [R{base_register}, #{offset}]"
                )
            }
            Self::LoadStoreHalfword {
                load_store,
                offset,
                base_register,
                source_destination_register,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "LDRH",
                    LoadStoreKind::Store => "STRH",
                };
                write!(
                    f,
                    "{mnemonic} R{source_destination_register}, [R{base_register}, #{offset}]"
                )
            }
            Self::SpRelativeLoadStore {
                load_store,
                destination_register,
                offset,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "LDR",
                    LoadStoreKind::Store => "STR",
                };
                write!(f, "{mnemonic} R{destination_register}, [SP, #{offset}]")
            }
            Self::LoadAddress {
                sp,
                destination_register,
                offset,
            } => {
                let base = if *sp { "SP" } else { "PC" };
                write!(f, "ADD R{destination_register}, {base}, #{offset}")
            }
            Self::AddOffsetSp { subtract, offset } => {
                let sign = if *subtract { "-" } else { "" };
                write!(f, "ADD SP, #{sign}{offset}")
            }
            Self::PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => match load_store {
                LoadStoreKind::Store => {
                    let list = register_list_string(*register_list, pc_lr.then_some("LR"));
                    write!(f, "PUSH {{{list}}}")
                }
                LoadStoreKind::Load => {
                    let list = register_list_string(*register_list, pc_lr.then_some("PC"));
                    write!(f, "POP {{{list}}}")
                }
            },
            Self::MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "LDMIA",
                    LoadStoreKind::Store => "STMIA",
                };
                let list = register_list_string(*register_list, None);
                write!(f, "{mnemonic} R{base_register}!, {{{list}}}")
            }
            Self::CondBranch { condition, offset } => {
                write!(f, "B{condition} #{}", *offset as i32)
            }
            Self::Swi { comment } => write!(f, "SWI 0x{comment:02X}"),
            Self::UncondBranch { offset } => write!(f, "B #{}", *offset as i32),
            Self::LongBranchLink { h, offset } => {
                let half = if *h { "lo" } else { "hi" };
                write!(f, "BL {half} #0x{offset:03X}")
            }
            Self::Undefined => f.write_str("UNDEFINED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_multiple_load_store() {
        let output = ThumbModeInstruction::from(0b1100_1001_1010_0000);
        assert_eq!(
            ThumbModeInstruction::MultipleLoadStore {
                load_store: LoadStoreKind::Load,
                base_register: 1,
                register_list: 160,
            },
            output
        );
        assert_eq!("LDMIA R1!, {R5, R7}", output.to_string());
    }

    #[test]
    fn decode_pc_relative_load() {
        let output = ThumbModeInstruction::from(0b0100_1001_0101_1000);
        assert_eq!(
            ThumbModeInstruction::PcRelativeLoad {
                destination_register: 1,
                offset: 352,
            },
            output
        );
        assert_eq!("LDR R1, [PC, #352]", output.to_string());
    }

    #[test]
    fn decode_load_store_register_offset() {
        let output = ThumbModeInstruction::from(0b0101_00_0_000_001_010);
        assert_eq!(
            ThumbModeInstruction::LoadStoreRegisterOffset {
                load_store: LoadStoreKind::Store,
                quantity: ReadWriteKind::Word,
                offset_register: 0,
                base_register: 1,
                destination_register: 2,
            },
            output
        );
        assert_eq!("STR R2, [R1, R0]", output.to_string());
    }

    #[test]
    fn decode_branches() {
        let output = ThumbModeInstruction::from(0b1110_0001_0010_1111);
        assert_eq!(ThumbModeInstruction::UncondBranch { offset: 606 }, output);
        assert_eq!("B #606", output.to_string());

        // B . (offset -4)
        assert_eq!(
            ThumbModeInstruction::from(0xE7FE),
            ThumbModeInstruction::UncondBranch {
                offset: (-4_i32) as u32
            }
        );

        let output = ThumbModeInstruction::from(0xD0FE);
        assert_eq!(
            ThumbModeInstruction::CondBranch {
                condition: Condition::EQ,
                offset: (-4_i32) as u32,
            },
            output
        );
        assert_eq!("BEQ #-4", output.to_string());

        assert_eq!(ThumbModeInstruction::from(0xDE00), ThumbModeInstruction::Undefined);
        assert_eq!(
            ThumbModeInstruction::from(0xDF2A),
            ThumbModeInstruction::Swi { comment: 0x2A }
        );
    }

    #[test]
    fn decode_hi_reg_operation() {
        let output = ThumbModeInstruction::from(0b0100_0111_0111_0000);
        assert_eq!(
            ThumbModeInstruction::HiRegisterOpBx {
                register_operation: ThumbHighRegisterOperation::Bx,
                source_register: 14,
                destination_register: 0,
            },
            output
        );
        assert_eq!("BX R14", output.to_string());

        let output = ThumbModeInstruction::from(0b010001_00_0_1_000_001);
        assert_eq!(
            ThumbModeInstruction::HiRegisterOpBx {
                register_operation: ThumbHighRegisterOperation::Add,
                source_register: 8,
                destination_register: 1,
            },
            output
        );
        assert_eq!("ADD R1, R8", output.to_string());
    }

    #[test]
    fn decode_push_pop_register() {
        let output = ThumbModeInstruction::from(0b1011_0101_1111_0000);
        assert_eq!(
            ThumbModeInstruction::PushPopReg {
                load_store: LoadStoreKind::Store,
                pc_lr: true,
                register_list: 240,
            },
            output
        );
        assert_eq!("PUSH {R4, R5, R6, R7, LR}", output.to_string());
    }

    #[test]
    fn decode_shifts_and_immediates() {
        // LSL R1, R2, #4
        assert_eq!(
            ThumbModeInstruction::from(0x0111),
            ThumbModeInstruction::MoveShiftedRegister {
                shift_operation: ShiftKind::Lsl,
                offset5: 4,
                source_register: 2,
                destination_register: 1,
            }
        );
        // SUB R0, R1, #3
        assert_eq!(
            ThumbModeInstruction::from(0x1EC8),
            ThumbModeInstruction::AddSubtract {
                operand_kind: OperandKind::Immediate,
                subtract: true,
                rn_offset3: 3,
                source_register: 1,
                destination_register: 0,
            }
        );
        // CMP R3, #0xFF
        assert_eq!(ThumbModeInstruction::from(0x2BFF).to_string(), "CMP R3, #255");
        // ADD SP, #-8
        assert_eq!(
            ThumbModeInstruction::from(0xB082),
            ThumbModeInstruction::AddOffsetSp {
                subtract: true,
                offset: 8,
            }
        );
    }

    #[test]
    fn decode_loads_and_stores() {
        // LDR R0, [R1, #4]
        assert_eq!(
            ThumbModeInstruction::from(0x6848),
            ThumbModeInstruction::LoadStoreImmOffset {
                load_store: LoadStoreKind::Load,
                quantity: ReadWriteKind::Word,
                offset: 4,
                base_register: 1,
                destination_register: 0,
            }
        );
        // LDSH R0, [R1, R2]
        assert_eq!(ThumbModeInstruction::from(0x5E88).to_string(), "LDSH R0, [R1, R2]");
        // STRH R0, [R1, #2]
        assert_eq!(ThumbModeInstruction::from(0x8048).to_string(), "STRH R0, [R1, #2]");
        // STR R0, [SP, #8]
        assert_eq!(ThumbModeInstruction::from(0x9002).to_string(), "STR R0, [SP, #8]");
        // ADD R0, PC, #4
        assert_eq!(ThumbModeInstruction::from(0xA001).to_string(), "ADD R0, PC, #4");
    }

    #[test]
    fn decode_long_branch_link() {
        assert_eq!(
            ThumbModeInstruction::from(0xF000),
            ThumbModeInstruction::LongBranchLink {
                h: false,
                offset: 0
            }
        );
        assert_eq!(
            ThumbModeInstruction::from(0xF804),
            ThumbModeInstruction::LongBranchLink { h: true, offset: 4 }
        );
        // BLX suffix does not exist on ARMv4T.
        assert_eq!(ThumbModeInstruction::from(0xE800), ThumbModeInstruction::Undefined);
    }
}
