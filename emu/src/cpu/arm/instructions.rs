//! # ARM Instruction Decoding
//!
//! Turns a 32-bit opcode into an [`ArmModeInstruction`]. The condition field
//! is split off by [`ArmModeOpcode`](super::mode::ArmModeOpcode).
//!
//! ```text
//! 31-28  27-25  24-0
//! [Cond] [Fmt]  [Instruction-specific]
//!
//!  000 + special patterns  →  BX, Multiply, Multiply Long, SWP, halfword transfers
//!  00x                     →  PSR transfer (TST..CMN with S=0), Data Processing
//!  011 + bit 4             →  Undefined
//!  01x                     →  Single Data Transfer
//!  100                     →  Block Data Transfer
//!  101                     →  Branch
//!  110, 1110               →  Coprocessor (absent, Undefined)
//!  1111                    →  Software Interrupt
//! ```
//!
//! Patterns overlap, the decoder tests them in this order:
//!
//! 1. Branch and Exchange
//! 2. Multiply
//! 3. Multiply Long
//! 4. Single Data Swap
//! 5. Halfword Data Transfer
//! 6. PSR Transfer
//! 7. Data Processing
//! 8. Undefined
//! 9. Single Data Transfer
//! 10. Block Data Transfer
//! 11. Branch
//! 12. Coprocessor
//! 13. Software Interrupt

use std::fmt::Display;

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::{
    AluSecondOperandInfo, ArmModeAluInstruction, PsrKind, PsrOpKind, ShiftOperator,
};
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, ReadWriteKind, ShiftKind,
};

/// Offset of a single data transfer (LDR/STR).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SingleDataTransferOffsetInfo {
    Immediate {
        offset: u32,
    },
    RegisterImmediate {
        shift_amount: u32,
        shift_kind: ShiftKind,
        reg_offset: usize,
    },
}

impl Display for SingleDataTransferOffsetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { offset } => write!(f, "#0x{offset:X}"),
            Self::RegisterImmediate {
                shift_amount: 0,
                shift_kind: ShiftKind::Lsl,
                reg_offset,
            } => write!(f, "R{reg_offset}"),
            Self::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => write!(f, "R{reg_offset}, {shift_kind} #{shift_amount}"),
        }
    }
}

/// Offset of a halfword or signed data transfer (LDRH/STRH/LDRSB/LDRSH).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HalfwordDataTransferOffsetKind {
    Immediate { offset: u32 },
    Register { register: usize },
}

impl Display for HalfwordDataTransferOffsetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { offset } => write!(f, "#0x{offset:X}"),
            Self::Register { register } => write!(f, "R{register}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmModeMultiplyVariant {
    Mul,
    Mla,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmModeMultiplyLongVariant {
    Umull,
    Umlal,
    Smull,
    Smlal,
}

impl ArmModeMultiplyLongVariant {
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Smull | Self::Smlal)
    }

    #[must_use]
    pub const fn accumulates(self) -> bool {
        matches!(self, Self::Umlal | Self::Smlal)
    }
}

impl Display for ArmModeMultiplyLongVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Umull => f.write_str("UMULL"),
            Self::Umlal => f.write_str("UMLAL"),
            Self::Smull => f.write_str("SMULL"),
            Self::Smlal => f.write_str("SMLAL"),
        }
    }
}

/// A decoded ARM instruction without its condition.
///
/// | Variant                | Example Instructions | Description                  |
/// |------------------------|----------------------|------------------------------|
/// | `DataProcessing`       | AND, ADD, CMP, MOV   | ALU operations               |
/// | `Multiply`             | MUL, MLA             | 32-bit multiply              |
/// | `MultiplyLong`         | UMULL, SMLAL         | 64-bit multiply              |
/// | `PsrTransfer`          | MRS, MSR             | Status register access       |
/// | `SingleDataSwap`       | SWP, SWPB            | Atomic memory swap           |
/// | `BranchAndExchange`    | BX                   | Branch + possible ARM↔Thumb  |
/// | `HalfwordDataTransfer` | LDRH, STRH, LDRSB    | 16-bit and signed transfers  |
/// | `SingleDataTransfer`   | LDR, STR, LDRB       | 32-bit and byte transfers    |
/// | `BlockDataTransfer`    | LDM, STM             | Register list transfers      |
/// | `Branch`               | B, BL                | Branch (and link)            |
/// | `SoftwareInterrupt`    | SWI                  | BIOS call                    |
/// | `Undefined`            | -                    | Undefined exception          |
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ArmModeInstruction {
    DataProcessing {
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: usize,
        destination: usize,
        op2: AluSecondOperandInfo,
    },
    Multiply {
        variant: ArmModeMultiplyVariant,
        set_conditions: bool,
        destination: usize,
        accumulate: usize,
        rs: usize,
        rm: usize,
    },
    MultiplyLong {
        variant: ArmModeMultiplyLongVariant,
        set_conditions: bool,
        destination_hi: usize,
        destination_lo: usize,
        rs: usize,
        rm: usize,
    },
    PsrTransfer {
        psr_kind: PsrKind,
        kind: PsrOpKind,
    },
    SingleDataSwap {
        quantity: ReadWriteKind,
        rn: usize,
        rd: usize,
        rm: usize,
    },
    BranchAndExchange {
        register: usize,
    },
    HalfwordDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store: LoadStoreKind,
        offset: HalfwordDataTransferOffsetKind,
        base_register: usize,
        source_destination_register: usize,
        transfer_kind: HalfwordTransferKind,
    },
    SingleDataTransfer {
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: usize,
        base_register: usize,
        offset_info: SingleDataTransferOffsetInfo,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u16,
    },
    Branch {
        link: bool,
        /// Signed byte offset from R15.
        offset: u32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Undefined,
}

const fn register(op_code: u32, lowest_bit: u32) -> usize {
    ((op_code >> lowest_bit) & 0xF) as usize
}

/// Operand 2 of data processing and MSR.
fn alu_operand(op_code: u32) -> AluSecondOperandInfo {
    if op_code.get_bit(25) {
        AluSecondOperandInfo::Immediate {
            base: op_code.get_bits(0..=7),
            shift: op_code.get_bits(8..=11) * 2,
        }
    } else {
        let shift_op = if op_code.get_bit(4) {
            ShiftOperator::Register(register(op_code, 8))
        } else {
            ShiftOperator::Immediate(op_code.get_bits(7..=11))
        };

        AluSecondOperandInfo::Register {
            shift_op,
            shift_kind: op_code.get_bits(5..=6).into(),
            register: register(op_code, 0),
        }
    }
}

fn decode_psr_transfer(op_code: u32) -> ArmModeInstruction {
    let psr_kind = PsrKind::from(op_code.get_bit(22));

    if op_code.get_bit(21) {
        // Bits 16-19 select the control, extension, status and flags bytes.
        let field_mask = (0..4).fold(0, |mask, field| {
            if op_code.get_bit(16 + field) {
                mask | (0xFF << (u32::from(field) * 8))
            } else {
                mask
            }
        });
        let operand = if op_code.get_bit(25) {
            alu_operand(op_code)
        } else {
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Lsl,
                register: register(op_code, 0),
            }
        };

        ArmModeInstruction::PsrTransfer {
            psr_kind,
            kind: PsrOpKind::Msr {
                field_mask,
                operand,
            },
        }
    } else if op_code.get_bit(25) {
        ArmModeInstruction::Undefined
    } else {
        ArmModeInstruction::PsrTransfer {
            psr_kind,
            kind: PsrOpKind::Mrs {
                destination_register: register(op_code, 12),
            },
        }
    }
}

impl From<u32> for ArmModeInstruction {
    fn from(op_code: u32) -> Self {
        if op_code.get_bits(4..=27) == 0x12_FFF1 {
            Self::BranchAndExchange {
                register: register(op_code, 0),
            }
        } else if op_code.get_bits(22..=27) == 0 && op_code.get_bits(4..=7) == 0b1001 {
            Self::Multiply {
                variant: if op_code.get_bit(21) {
                    ArmModeMultiplyVariant::Mla
                } else {
                    ArmModeMultiplyVariant::Mul
                },
                set_conditions: op_code.get_bit(20),
                destination: register(op_code, 16),
                accumulate: register(op_code, 12),
                rs: register(op_code, 8),
                rm: register(op_code, 0),
            }
        } else if op_code.get_bits(23..=27) == 0b0_0001 && op_code.get_bits(4..=7) == 0b1001 {
            let variant = match (op_code.get_bit(22), op_code.get_bit(21)) {
                (false, false) => ArmModeMultiplyLongVariant::Umull,
                (false, true) => ArmModeMultiplyLongVariant::Umlal,
                (true, false) => ArmModeMultiplyLongVariant::Smull,
                (true, true) => ArmModeMultiplyLongVariant::Smlal,
            };
            Self::MultiplyLong {
                variant,
                set_conditions: op_code.get_bit(20),
                destination_hi: register(op_code, 16),
                destination_lo: register(op_code, 12),
                rs: register(op_code, 8),
                rm: register(op_code, 0),
            }
        } else if op_code.get_bits(23..=27) == 0b0_0010
            && op_code.get_bits(20..=21) == 0
            && op_code.get_bits(4..=11) == 0b0000_1001
        {
            Self::SingleDataSwap {
                quantity: op_code.get_bit(22).into(),
                rn: register(op_code, 16),
                rd: register(op_code, 12),
                rm: register(op_code, 0),
            }
        } else if op_code.get_bits(25..=27) == 0
            && op_code.get_bit(7)
            && op_code.get_bit(4)
            && op_code.get_bits(5..=6) != 0
        {
            let offset = if op_code.get_bit(22) {
                HalfwordDataTransferOffsetKind::Immediate {
                    offset: (op_code.get_bits(8..=11) << 4) | op_code.get_bits(0..=3),
                }
            } else {
                HalfwordDataTransferOffsetKind::Register {
                    register: register(op_code, 0),
                }
            };
            Self::HalfwordDataTransfer {
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                write_back: op_code.get_bit(21),
                load_store: op_code.get_bit(20).into(),
                offset,
                base_register: register(op_code, 16),
                source_destination_register: register(op_code, 12),
                transfer_kind: op_code.get_bits(5..=6).into(),
            }
        } else if op_code.get_bits(26..=27) == 0
            && op_code.get_bits(23..=24) == 0b10
            && !op_code.get_bit(20)
        {
            decode_psr_transfer(op_code)
        } else if op_code.get_bits(26..=27) == 0 {
            Self::DataProcessing {
                alu_instruction: op_code.get_bits(21..=24).into(),
                set_conditions: op_code.get_bit(20),
                rn: register(op_code, 16),
                destination: register(op_code, 12),
                op2: alu_operand(op_code),
            }
        } else if op_code.get_bits(25..=27) == 0b011 && op_code.get_bit(4) {
            Self::Undefined
        } else if op_code.get_bits(26..=27) == 0b01 {
            // Here the I bit selects a register offset.
            let offset_info = if op_code.get_bit(25) {
                SingleDataTransferOffsetInfo::RegisterImmediate {
                    shift_amount: op_code.get_bits(7..=11),
                    shift_kind: op_code.get_bits(5..=6).into(),
                    reg_offset: register(op_code, 0),
                }
            } else {
                SingleDataTransferOffsetInfo::Immediate {
                    offset: op_code.get_bits(0..=11),
                }
            };
            Self::SingleDataTransfer {
                load_store: op_code.get_bit(20).into(),
                quantity: op_code.get_bit(22).into(),
                write_back: op_code.get_bit(21),
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                rd: register(op_code, 12),
                base_register: register(op_code, 16),
                offset_info,
            }
        } else if op_code.get_bits(25..=27) == 0b100 {
            Self::BlockDataTransfer {
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                load_psr: op_code.get_bit(22),
                write_back: op_code.get_bit(21),
                load_store: op_code.get_bit(20).into(),
                rn: register(op_code, 16),
                register_list: op_code.get_bits(0..=15) as u16,
            }
        } else if op_code.get_bits(25..=27) == 0b101 {
            Self::Branch {
                link: op_code.get_bit(24),
                offset: (op_code.get_bits(0..=23) << 2).sign_extended(26),
            }
        } else if op_code.get_bits(24..=27) == 0b1111 {
            Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=23),
            }
        } else {
            // Coprocessor transfers and operations: no coprocessor is attached.
            Self::Undefined
        }
    }
}

fn register_list_string(register_list: u16) -> String {
    (0..16)
        .filter(|reg| register_list.get_bit(*reg))
        .map(|reg| format!("R{reg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn address_string(
    base_register: usize,
    indexing: Indexing,
    offsetting: Offsetting,
    write_back: bool,
    offset: &dyn Display,
) -> String {
    let sign = match offsetting {
        Offsetting::Up => "",
        Offsetting::Down => "-",
    };
    match indexing {
        Indexing::Pre => {
            let bang = if write_back { "!" } else { "" };
            format!("[R{base_register}, {sign}{offset}]{bang}")
        }
        Indexing::Post => format!("[R{base_register}], {sign}{offset}"),
    }
}

impl Display for ArmModeInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                if alu_instruction.is_test() {
                    write!(f, "{alu_instruction} R{rn}, {op2}")
                } else if matches!(
                    alu_instruction,
                    ArmModeAluInstruction::Mov | ArmModeAluInstruction::Mvn
                ) {
                    write!(f, "{alu_instruction}{set_string} R{destination}, {op2}")
                } else {
                    write!(f, "{alu_instruction}{set_string} R{destination}, R{rn}, {op2}")
                }
            }
            Self::Multiply {
                variant,
                set_conditions,
                destination,
                accumulate,
                rs,
                rm,
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                match variant {
                    ArmModeMultiplyVariant::Mul => {
                        write!(f, "MUL{set_string} R{destination}, R{rm}, R{rs}")
                    }
                    ArmModeMultiplyVariant::Mla => write!(
                        f,
                        "MLA{set_string} R{destination}, R{rm}, R{rs}, R{accumulate}"
                    ),
                }
            }
            Self::MultiplyLong {
                variant,
                set_conditions,
                destination_hi,
                destination_lo,
                rs,
                rm,
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                write!(
                    f,
                    "{variant}{set_string} R{destination_lo}, R{destination_hi}, R{rm}, R{rs}"
                )
            }
            Self::PsrTransfer { psr_kind, kind } => match kind {
                PsrOpKind::Mrs {
                    destination_register,
                } => write!(f, "MRS R{destination_register}, {psr_kind}"),
                PsrOpKind::Msr {
                    field_mask,
                    operand,
                } => write!(f, "MSR {psr_kind} (mask 0x{field_mask:08X}), {operand}"),
            },
            Self::SingleDataSwap {
                quantity,
                rn,
                rd,
                rm,
            } => {
                let suffix = if *quantity == ReadWriteKind::Byte { "B" } else { "" };
                write!(f, "SWP{suffix} R{rd}, R{rm}, [R{rn}]")
            }
            Self::BranchAndExchange { register } => write!(f, "BX R{register}"),
            Self::HalfwordDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store,
                offset,
                base_register,
                source_destination_register,
                transfer_kind,
            } => {
                let mnemonic = match (load_store, transfer_kind) {
                    (LoadStoreKind::Store, _) => "STRH",
                    (LoadStoreKind::Load, HalfwordTransferKind::UnsignedHalfwords) => "LDRH",
                    (LoadStoreKind::Load, HalfwordTransferKind::SignedByte) => "LDRSB",
                    (LoadStoreKind::Load, HalfwordTransferKind::SignedHalfwords) => "LDRSH",
                };
                let address =
                    address_string(*base_register, *indexing, *offsetting, *write_back, offset);
                write!(f, "{mnemonic} R{source_destination_register}, {address}")
            }
            Self::SingleDataTransfer {
                load_store,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "LDR",
                    LoadStoreKind::Store => "STR",
                };
                let suffix = if *quantity == ReadWriteKind::Byte { "B" } else { "" };
                let address = address_string(
                    *base_register,
                    *indexing,
                    *offsetting,
                    *write_back,
                    offset_info,
                );
                write!(f, "{mnemonic}{suffix} R{rd}, {address}")
            }
            Self::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "LDM",
                    LoadStoreKind::Store => "STM",
                };
                let mode = match (offsetting, indexing) {
                    (Offsetting::Up, Indexing::Post) => "IA",
                    (Offsetting::Up, Indexing::Pre) => "IB",
                    (Offsetting::Down, Indexing::Post) => "DA",
                    (Offsetting::Down, Indexing::Pre) => "DB",
                };
                let bang = if *write_back { "!" } else { "" };
                let hat = if *load_psr { "^" } else { "" };
                let registers = register_list_string(*register_list);
                write!(f, "{mnemonic}{mode} R{rn}{bang}, {{{registers}}}{hat}")
            }
            Self::Branch { link, offset } => {
                let mnemonic = if *link { "BL" } else { "B" };
                write!(f, "{mnemonic} #{}", *offset as i32)
            }
            Self::SoftwareInterrupt { comment } => write!(f, "SWI 0x{comment:06X}"),
            Self::Undefined => f.write_str("UNDEFINED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_data_processing() {
        // ADD R0, R1, R2, LSL #3
        let instruction = ArmModeInstruction::from(0xE081_0182);
        assert_eq!(
            instruction,
            ArmModeInstruction::DataProcessing {
                alu_instruction: ArmModeAluInstruction::Add,
                set_conditions: false,
                rn: 1,
                destination: 0,
                op2: AluSecondOperandInfo::Register {
                    shift_op: ShiftOperator::Immediate(3),
                    shift_kind: ShiftKind::Lsl,
                    register: 2,
                },
            }
        );
        assert_eq!(instruction.to_string(), "ADD R0, R1, R2, LSL #3");

        // MOVS R0, #0x3F000000 (0x3F ROR 8)
        let instruction = ArmModeInstruction::from(0xE3B0_043F);
        assert_eq!(instruction.to_string(), "MOVS R0, #0x3F000000");

        // CMP R1, R2, LSR R3
        let instruction = ArmModeInstruction::from(0xE151_0332);
        assert_eq!(instruction.to_string(), "CMP R1, R2, LSR R3");
    }

    #[test]
    fn decode_branch_and_exchange() {
        assert_eq!(
            ArmModeInstruction::from(0xE12F_FF1E),
            ArmModeInstruction::BranchAndExchange { register: 14 }
        );
    }

    #[test]
    fn decode_branch() {
        // B #-8 (branch to self)
        assert_eq!(
            ArmModeInstruction::from(0xEAFF_FFFE),
            ArmModeInstruction::Branch {
                link: false,
                offset: (-8_i32) as u32,
            }
        );
        // BL #+0x100
        assert_eq!(
            ArmModeInstruction::from(0xEB00_0040),
            ArmModeInstruction::Branch {
                link: true,
                offset: 0x100,
            }
        );
    }

    #[test]
    fn decode_multiplies() {
        // MLA R0, R1, R2, R3
        assert_eq!(
            ArmModeInstruction::from(0xE020_3291),
            ArmModeInstruction::Multiply {
                variant: ArmModeMultiplyVariant::Mla,
                set_conditions: false,
                destination: 0,
                accumulate: 3,
                rs: 2,
                rm: 1,
            }
        );
        // SMULLS R0, R1, R2, R3
        let instruction = ArmModeInstruction::from(0xE0D1_0392);
        assert_eq!(
            instruction,
            ArmModeInstruction::MultiplyLong {
                variant: ArmModeMultiplyLongVariant::Smull,
                set_conditions: true,
                destination_hi: 1,
                destination_lo: 0,
                rs: 3,
                rm: 2,
            }
        );
        assert_eq!(instruction.to_string(), "SMULLS R0, R1, R2, R3");
    }

    #[test]
    fn decode_swap_and_halfwords() {
        // SWPB R0, R1, [R2]
        assert_eq!(
            ArmModeInstruction::from(0xE142_0091),
            ArmModeInstruction::SingleDataSwap {
                quantity: ReadWriteKind::Byte,
                rn: 2,
                rd: 0,
                rm: 1,
            }
        );

        // LDRH R0, [R1, #0x12]
        let instruction = ArmModeInstruction::from(0xE1D1_01B2);
        assert_eq!(
            instruction,
            ArmModeInstruction::HalfwordDataTransfer {
                indexing: Indexing::Pre,
                offsetting: Offsetting::Up,
                write_back: false,
                load_store: LoadStoreKind::Load,
                offset: HalfwordDataTransferOffsetKind::Immediate { offset: 0x12 },
                base_register: 1,
                source_destination_register: 0,
                transfer_kind: HalfwordTransferKind::UnsignedHalfwords,
            }
        );
        assert_eq!(instruction.to_string(), "LDRH R0, [R1, #0x12]");

        // LDRSB R2, [R3], -R4
        assert_eq!(
            ArmModeInstruction::from(0xE013_20D4).to_string(),
            "LDRSB R2, [R3], -R4"
        );
    }

    #[test]
    fn decode_psr_transfers() {
        // MRS R0, CPSR
        assert_eq!(
            ArmModeInstruction::from(0xE10F_0000),
            ArmModeInstruction::PsrTransfer {
                psr_kind: PsrKind::Cpsr,
                kind: PsrOpKind::Mrs {
                    destination_register: 0
                },
            }
        );
        // MSR CPSR_fc, R0
        assert_eq!(
            ArmModeInstruction::from(0xE129_F000),
            ArmModeInstruction::PsrTransfer {
                psr_kind: PsrKind::Cpsr,
                kind: PsrOpKind::Msr {
                    field_mask: 0xFF00_00FF,
                    operand: AluSecondOperandInfo::Register {
                        shift_op: ShiftOperator::Immediate(0),
                        shift_kind: ShiftKind::Lsl,
                        register: 0,
                    },
                },
            }
        );
        // MSR SPSR_f, #0xF0000000
        assert_eq!(
            ArmModeInstruction::from(0xE368_F20F),
            ArmModeInstruction::PsrTransfer {
                psr_kind: PsrKind::Spsr,
                kind: PsrOpKind::Msr {
                    field_mask: 0xFF00_0000,
                    operand: AluSecondOperandInfo::Immediate { base: 0xF, shift: 4 },
                },
            }
        );
    }

    #[test]
    fn decode_transfers() {
        // LDR R0, [R1, #4]!
        let instruction = ArmModeInstruction::from(0xE5B1_0004);
        assert_eq!(
            instruction,
            ArmModeInstruction::SingleDataTransfer {
                load_store: LoadStoreKind::Load,
                quantity: ReadWriteKind::Word,
                write_back: true,
                indexing: Indexing::Pre,
                offsetting: Offsetting::Up,
                rd: 0,
                base_register: 1,
                offset_info: SingleDataTransferOffsetInfo::Immediate { offset: 4 },
            }
        );
        assert_eq!(instruction.to_string(), "LDR R0, [R1, #0x4]!");

        // STMDB SP!, {R0-R3, LR}
        let instruction = ArmModeInstruction::from(0xE92D_400F);
        assert_eq!(
            instruction,
            ArmModeInstruction::BlockDataTransfer {
                indexing: Indexing::Pre,
                offsetting: Offsetting::Down,
                load_psr: false,
                write_back: true,
                load_store: LoadStoreKind::Store,
                rn: 13,
                register_list: 0x400F,
            }
        );
        assert_eq!(
            instruction.to_string(),
            "STMDB R13!, {R0, R1, R2, R3, R14}"
        );
    }

    #[test]
    fn decode_undefined_and_swi() {
        // Register offset single data transfer space with bit 4 set.
        assert_eq!(ArmModeInstruction::from(0xE600_0010), ArmModeInstruction::Undefined);
        // Coprocessor data operation.
        assert_eq!(ArmModeInstruction::from(0xEE00_0000), ArmModeInstruction::Undefined);
        // Coprocessor data transfer.
        assert_eq!(ArmModeInstruction::from(0xEC00_0000), ArmModeInstruction::Undefined);
        assert_eq!(
            ArmModeInstruction::from(0xEF00_0005),
            ArmModeInstruction::SoftwareInterrupt { comment: 5 }
        );
    }
}
