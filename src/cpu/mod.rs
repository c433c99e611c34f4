//! CPU model for the EDU-16.
//!
//! - 65536 sixteen-bit memory words
//! - 8 registers: ZX (constant zero), PC, R2-R5, SP, LP
//! - single-word instructions, total decode (unclaimed words are data)

pub mod decode;
pub mod execute;
pub mod registers;

pub use decode::{decode, encode, AluOp, BranchKind, EncodeError, Instruction};
pub use execute::{ExecCpu, MEMORY_WORDS};
pub use registers::{Register, RegisterSnapshot, REGISTER_COUNT};
