//! # Thumb state (16-bit instructions)
//!
//! Nineteen formats, see [`instruction`]. Only conditional branches are
//! conditional. Most formats reach just R0-R7. Execution reuses the ARM ALU
//! and block transfer paths.

pub mod alu_instructions;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod instruction;
pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod operations;
