use std::fmt::Display;

/// Format 4 operations, `Rd = Rd op Rs`.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThumbModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Lsl = 0x2,
    Lsr = 0x3,
    Asr = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Ror = 0x7,
    Tst = 0x8,
    Neg = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mul = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl From<u16> for ThumbModeAluInstruction {
    fn from(alu_op_code: u16) -> Self {
        use ThumbModeAluInstruction::{
            Adc, And, Asr, Bic, Cmn, Cmp, Eor, Lsl, Lsr, Mul, Mvn, Neg, Orr, Ror, Sbc, Tst,
        };
        match alu_op_code & 0xF {
            0x0 => And,
            0x1 => Eor,
            0x2 => Lsl,
            0x3 => Lsr,
            0x4 => Asr,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Ror,
            0x8 => Tst,
            0x9 => Neg,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mul,
            0xE => Bic,
            _ => Mvn,
        }
    }
}

impl Display for ThumbModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

/// Format 5 operations on the full register set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbHighRegisterOperation {
    Add,
    Cmp,
    Mov,
    Bx,
}

impl From<u16> for ThumbHighRegisterOperation {
    fn from(op_code: u16) -> Self {
        match op_code & 0b11 {
            0b00 => Self::Add,
            0b01 => Self::Cmp,
            0b10 => Self::Mov,
            _ => Self::Bx,
        }
    }
}

impl Display for ThumbHighRegisterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("ADD"),
            Self::Cmp => f.write_str("CMP"),
            Self::Mov => f.write_str("MOV"),
            Self::Bx => f.write_str("BX"),
        }
    }
}

/// Format 3 operations with an 8-bit immediate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbImmediateOperation {
    Mov,
    Cmp,
    Add,
    Sub,
}

impl From<u16> for ThumbImmediateOperation {
    fn from(op_code: u16) -> Self {
        match op_code & 0b11 {
            0b00 => Self::Mov,
            0b01 => Self::Cmp,
            0b10 => Self::Add,
            _ => Self::Sub,
        }
    }
}

impl Display for ThumbImmediateOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mov => f.write_str("MOV"),
            Self::Cmp => f.write_str("CMP"),
            Self::Add => f.write_str("ADD"),
            Self::Sub => f.write_str("SUB"),
        }
    }
}

/// Format 8 transfers, selected by the H and S bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbSignExtendedTransfer {
    Strh,
    Ldrh,
    Ldsb,
    Ldsh,
}

impl Display for ThumbSignExtendedTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_alu_names() {
        assert_eq!(ThumbModeAluInstruction::from(0xD).to_string(), "MUL");
        assert_eq!(ThumbModeAluInstruction::from(0x19), ThumbModeAluInstruction::Neg);
        assert_eq!(ThumbHighRegisterOperation::from(3), ThumbHighRegisterOperation::Bx);
        assert_eq!(ThumbSignExtendedTransfer::Ldsh.to_string(), "LDSH");
    }
}
