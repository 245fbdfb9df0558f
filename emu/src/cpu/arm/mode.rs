use crate::bitwise::Bits;
use crate::cpu::arm::instructions::ArmModeInstruction;
use crate::cpu::condition::Condition;

/// A fetched ARM opcode: the decoded instruction plus its condition.
pub struct ArmModeOpcode {
    pub instruction: ArmModeInstruction,
    pub condition: Condition,
    pub raw: u32,
}

impl From<u32> for ArmModeOpcode {
    fn from(op_code: u32) -> Self {
        Self {
            instruction: ArmModeInstruction::from(op_code),
            condition: Condition::from(op_code.get_bits(28..=31) as u8),
            raw: op_code,
        }
    }
}

impl std::ops::Deref for ArmModeOpcode {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl std::fmt::Display for ArmModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}  {}", self.raw, self.instruction)?;
        if self.condition != Condition::AL {
            write!(f, " ({})", self.condition)?;
        }
        Ok(())
    }
}
