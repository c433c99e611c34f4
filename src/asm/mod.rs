//! Assembler and disassembler for EDU-16 programs.
//!
//! - A simple two-pass assembler (text -> program image)
//! - A disassembler (image -> one display line per word)

pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
