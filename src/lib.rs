//! # EDU-16 Workbench
//!
//! An interactive workbench for the EDU-16, a 16-bit educational CPU:
//! edit assembly source, see it compiled and disassembled, and
//! single-step the machine while inspecting and poking registers.
//!
//! The heart of the crate is [`workbench::Workbench`], a synchronous
//! session controller that keeps the compiled image, its disassembly, and
//! a live execution session consistent with the program text. The CPU
//! model and assembler live in [`cpu`] and [`asm`] and plug into the
//! controller through the contracts in [`workbench::toolchain`].

pub mod asm;
pub mod cpu;
pub mod workbench;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use asm::{assemble, disassemble, AssemblerError};
pub use cpu::{ExecCpu, Instruction, Register, RegisterSnapshot};
pub use workbench::{ExecPhase, NativeToolchain, StageFailure, Toolchain, Topic, Workbench};

#[cfg(feature = "tui")]
pub use tui::run_workbench;
