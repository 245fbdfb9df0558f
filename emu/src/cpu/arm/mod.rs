//! # ARM state (32-bit instructions)
//!
//! Every instruction carries a condition in bits 28-31, checked against the
//! CPSR flags before anything else happens. The rest of the word is decoded
//! by [`instructions`] into one [`ArmModeInstruction`](instructions::ArmModeInstruction)
//! variant per format and executed by [`operations`].
//!
//! | Format                  | Instructions                         |
//! |-------------------------|--------------------------------------|
//! | Data processing         | AND..MVN, operand 2 through the shifter |
//! | PSR transfer            | MRS, MSR                             |
//! | Multiply (long)         | MUL, MLA, UMULL, UMLAL, SMULL, SMLAL |
//! | Single data swap        | SWP, SWPB                            |
//! | Branch and exchange     | BX                                   |
//! | Halfword transfer       | LDRH, STRH, LDRSB, LDRSH             |
//! | Single data transfer    | LDR, STR, LDRB, STRB                 |
//! | Block data transfer     | LDM, STM                             |
//! | Branch                  | B, BL                                |
//! | Software interrupt      | SWI                                  |
//! | Coprocessor, undefined  | Undefined instruction trap           |
//!
//! A shift amount taken from a register costs one extra cycle, and makes a
//! PC operand read 4 bytes further ahead.

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::similar_names)]
pub mod instructions;

#[allow(clippy::cast_possible_truncation)]
pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::similar_names)]
pub mod operations;
