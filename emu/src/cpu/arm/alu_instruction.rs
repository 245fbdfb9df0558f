//! ALU opcodes, operand 2 encodings and the barrel shifter.

use std::fmt::Display;

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArmModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for ArmModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

#[derive(Eq, PartialEq, Debug)]
pub enum AluInstructionKind {
    Logical,
    Arithmetic,
}

impl ArmModeAluInstruction {
    #[must_use]
    pub const fn kind(self) -> AluInstructionKind {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match self {
            And | Eor | Tst | Teq | Orr | Mov | Bic | Mvn => AluInstructionKind::Logical,
            Sub | Rsb | Add | Adc | Sbc | Rsc | Cmp | Cmn => AluInstructionKind::Arithmetic,
        }
    }

    /// TST, TEQ, CMP and CMN only update the flags.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }
}

impl From<u32> for ArmModeAluInstruction {
    fn from(alu_op_code: u32) -> Self {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match alu_op_code & 0xF {
            0x0 => And,
            0x1 => Eor,
            0x2 => Sub,
            0x3 => Rsb,
            0x4 => Add,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Rsc,
            0x8 => Tst,
            0x9 => Teq,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mov,
            0xE => Bic,
            _ => Mvn,
        }
    }
}

/// Where the shift amount of a register operand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOperator {
    Immediate(u32),
    Register(usize),
}

/// Operand 2 of a data processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluSecondOperandInfo {
    Register {
        shift_op: ShiftOperator,
        shift_kind: ShiftKind,
        register: usize,
    },
    /// An 8-bit value rotated right by twice the 4-bit rotate field.
    Immediate { base: u32, shift: u32 },
}

impl Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { base, shift } => write!(f, "#0x{:X}", base.rotate_right(*shift)),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Lsl,
                register,
            } => write!(f, "R{register}"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} #{amount}"),
            Self::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} R{rs}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(value: bool) -> Self {
        if value { Self::Spsr } else { Self::Cpsr }
    }
}

impl Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => f.write_str("CPSR"),
            Self::Spsr => f.write_str("SPSR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrOpKind {
    /// Transfer PSR contents to a register.
    Mrs { destination_register: usize },
    /// Transfer a register or immediate to the PSR fields selected by `field_mask`.
    Msr {
        field_mask: u32,
        operand: AluSecondOperandInfo,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

/// `first + second + carry_in`, with the flags an ADD/ADC produces.
///
/// Subtraction is `add_with_carry(a, !b, !borrow)`, which gives the ARM
/// "carry means no borrow" convention for free.
#[must_use]
pub fn add_with_carry(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = u64::from(first_op) + u64::from(second_op) + u64::from(carry_in);
    let result = wide as u32;

    // Overflow only occurs when operands have the same sign and result has the opposite one.
    let overflow = (!(first_op ^ second_op) & (first_op ^ result)).get_bit(31);

    ArithmeticOpResult {
        result,
        carry: wide > u64::from(u32::MAX),
        overflow,
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

#[must_use]
pub fn sub_with_carry(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    add_with_carry(first_op, !second_op, carry_in)
}

/// Barrel shifter with a shift amount taken from a register (bottom byte).
///
/// An amount of zero leaves the value and the carry untouched.
#[must_use]
pub fn shift(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ArithmeticOpResult {
    let (result, carry) = match (kind, shift_amount) {
        (_, 0) => (rm, carry),
        (ShiftKind::Lsl, 1..=31) => (rm << shift_amount, rm.get_bit((32 - shift_amount) as u8)),
        (ShiftKind::Lsl, 32) => (0, rm.get_bit(0)),
        (ShiftKind::Lsl, _) => (0, false),
        (ShiftKind::Lsr, 1..=31) => (rm >> shift_amount, rm.get_bit((shift_amount - 1) as u8)),
        (ShiftKind::Lsr, 32) => (0, rm.get_bit(31)),
        (ShiftKind::Lsr, _) => (0, false),
        (ShiftKind::Asr, 1..=31) => (
            ((rm as i32) >> shift_amount) as u32,
            rm.get_bit((shift_amount - 1) as u8),
        ),
        (ShiftKind::Asr, _) => (((rm as i32) >> 31) as u32, rm.get_bit(31)),
        (ShiftKind::Ror, _) => {
            let amount = shift_amount & 31;
            if amount == 0 {
                (rm, rm.get_bit(31))
            } else {
                (rm.rotate_right(amount), rm.get_bit((amount - 1) as u8))
            }
        }
    };

    ArithmeticOpResult {
        result,
        carry,
        ..Default::default()
    }
}

/// Barrel shifter with a 5-bit immediate amount.
///
/// LSR #0 and ASR #0 encode a shift by 32, ROR #0 encodes RRX.
#[must_use]
pub fn shift_immediate(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ArithmeticOpResult {
    match (kind, shift_amount) {
        (ShiftKind::Lsl, _) => shift(kind, shift_amount, rm, carry),
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => shift(kind, 32, rm, carry),
        (ShiftKind::Ror, 0) => ArithmeticOpResult {
            result: (u32::from(carry) << 31) | (rm >> 1),
            carry: rm.get_bit(0),
            ..Default::default()
        },
        _ => shift(kind, shift_amount, rm, carry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_kind() {
        assert_eq!(
            ArmModeAluInstruction::from(9).kind(),
            AluInstructionKind::Logical
        );
        assert_eq!(
            ArmModeAluInstruction::from(2).kind(),
            AluInstructionKind::Arithmetic
        );
        assert!(ArmModeAluInstruction::Cmn.is_test());
        assert_eq!(ArmModeAluInstruction::Mvn.to_string(), "MVN");
    }

    #[test]
    fn check_add_with_carry() {
        let r = add_with_carry(0xFFFF_FFFF, 1, false);
        assert_eq!(r.result, 0);
        assert!(r.carry);
        assert!(r.zero);
        assert!(!r.overflow);

        let r = add_with_carry(0x7FFF_FFFF, 0, true);
        assert_eq!(r.result, 0x8000_0000);
        assert!(r.overflow);
        assert!(r.sign);
        assert!(!r.carry);
    }

    #[test]
    fn check_sub_carry_means_no_borrow() {
        let r = sub_with_carry(5, 3, true);
        assert_eq!(r.result, 2);
        assert!(r.carry);

        let r = sub_with_carry(3, 5, true);
        assert_eq!(r.result, 0xFFFF_FFFE);
        assert!(!r.carry);
        assert!(r.sign);

        let r = sub_with_carry(0x8000_0000, 1, true);
        assert!(r.overflow);

        // SBC with carry clear subtracts one more.
        let r = sub_with_carry(5, 3, false);
        assert_eq!(r.result, 1);
    }

    #[test]
    fn check_register_shifts() {
        assert!(shift(ShiftKind::Lsl, 0, 0x1234, true).carry);
        assert_eq!(shift(ShiftKind::Lsl, 32, 1, false).result, 0);
        assert!(shift(ShiftKind::Lsl, 32, 1, false).carry);
        assert!(!shift(ShiftKind::Lsr, 33, 0xFFFF_FFFF, true).carry);
        assert_eq!(shift(ShiftKind::Asr, 40, 0x8000_0000, false).result, 0xFFFF_FFFF);
        assert_eq!(shift(ShiftKind::Ror, 4, 0x0000_00F1, false).result, 0x1000_000F);
        let r = shift(ShiftKind::Ror, 32, 0x8000_0000, false);
        assert_eq!(r.result, 0x8000_0000);
        assert!(r.carry);
    }

    #[test]
    fn check_immediate_shifts() {
        let r = shift_immediate(ShiftKind::Lsr, 0, 0x8000_0000, false);
        assert_eq!(r.result, 0);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Asr, 0, 0x8000_0000, false);
        assert_eq!(r.result, 0xFFFF_FFFF);

        let r = shift_immediate(ShiftKind::Ror, 0, 0b11, true);
        assert_eq!(r.result, 0x8000_0001);
        assert!(r.carry);
    }
}
