use crate::cpu::thumb::instruction::ThumbModeInstruction;

/// A fetched Thumb opcode and its decoding.
#[derive(Copy, Clone)]
pub struct ThumbModeOpcode {
    pub instruction: ThumbModeInstruction,
    pub raw: u16,
}

impl From<u16> for ThumbModeOpcode {
    fn from(op_code: u16) -> Self {
        Self {
            instruction: ThumbModeInstruction::from(op_code),
            raw: op_code,
        }
    }
}

impl std::ops::Deref for ThumbModeOpcode {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl std::fmt::Display for ThumbModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}      {}", self.raw, self.instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_display() {
        let opcode = ThumbModeOpcode::from(0xB5F0);
        assert_eq!(*opcode, 0xB5F0);
        assert_eq!(opcode.to_string(), "B5F0      PUSH {R4, R5, R6, R7, LR}");
    }
}
