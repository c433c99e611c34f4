//! Collaborator contracts for the workbench controller.
//!
//! The controller does not care what the compiler, disassembler, or CPU
//! actually are; it talks to them through these traits. [`NativeToolchain`]
//! wires them to this crate's own assembler and [`ExecCpu`]. Tests (and
//! embeddings of foreign engines) substitute their own.

use crate::asm;
use crate::cpu::{ExecCpu, RegisterSnapshot};
use thiserror::Error;

/// A failed collaborator call, split into the two tiers the controller
/// handles differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    /// Expected failure with a user-facing explanation (bad syntax,
    /// invalid program). Surfaced verbatim, prefixed, in diagnostics.
    #[error("{0}")]
    Diagnostic(String),

    /// Unexpected fault inside the collaborator. Never shown to the user;
    /// logged on the operator channel only.
    #[error("internal fault: {0}")]
    Internal(String),
}

/// One CPU engine instance, exclusively owned by the execution session.
pub trait Engine {
    /// Discard all state and reload from a fresh program image.
    fn reinitialize(&mut self, image: &[u16]);

    /// Advance exactly one instruction; a no-op while not continuable.
    fn single_step(&mut self);

    /// Whether another step would execute anything.
    fn is_continuable(&self) -> bool;

    /// A fresh snapshot of the mutable registers.
    fn read_registers(&self) -> RegisterSnapshot;

    /// Write a register by debug-interface index (0..=7). The engine
    /// enforces register-specific rules (the zero register stays zero)
    /// and word-width wraparound.
    fn write_register(&mut self, index: u8, value: u16);
}

/// The compiler, disassembler, and engine factory a workbench runs on.
pub trait Toolchain {
    /// Engine type this toolchain boots.
    type Engine: Engine;

    /// Compile program text into an image of 16-bit words.
    fn compile(&self, source: &str) -> Result<Vec<u16>, StageFailure>;

    /// Render an image as display lines, index-aligned with its words.
    fn disassemble(&self, image: &[u16]) -> Result<Vec<String>, StageFailure>;

    /// Construct a new engine loaded with `image`.
    fn boot(&self, image: &[u16]) -> Self::Engine;
}

impl Engine for ExecCpu {
    fn reinitialize(&mut self, image: &[u16]) {
        ExecCpu::reinitialize(self, image);
    }

    fn single_step(&mut self) {
        ExecCpu::single_step(self);
    }

    fn is_continuable(&self) -> bool {
        ExecCpu::is_continuable(self)
    }

    fn read_registers(&self) -> RegisterSnapshot {
        self.snapshot()
    }

    fn write_register(&mut self, index: u8, value: u16) {
        ExecCpu::write_register(self, index, value);
    }
}

/// The crate's own assembler, disassembler, and CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToolchain;

impl Toolchain for NativeToolchain {
    type Engine = ExecCpu;

    fn compile(&self, source: &str) -> Result<Vec<u16>, StageFailure> {
        // Everything the assembler reports is caused by the source text,
        // so it is all user-facing.
        asm::assemble(source).map_err(|e| StageFailure::Diagnostic(e.to_string()))
    }

    fn disassemble(&self, image: &[u16]) -> Result<Vec<String>, StageFailure> {
        // Decoding is total; the native disassembler cannot fail.
        Ok(asm::disassemble(image))
    }

    fn boot(&self, image: &[u16]) -> ExecCpu {
        ExecCpu::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_compile_reports_diagnostics() {
        let err = NativeToolchain.compile("FROB r2").unwrap_err();
        match err {
            StageFailure::Diagnostic(msg) => assert!(msg.contains("FROB")),
            StageFailure::Internal(_) => panic!("assembler faults are user-facing"),
        }
    }

    #[test]
    fn test_native_boot_loads_image() {
        let image = NativeToolchain.compile("LCONST r2 5\nHALT\n").unwrap();
        let engine = NativeToolchain.boot(&image);
        assert!(engine.is_continuable());
        assert_eq!(engine.read_registers().pc, 0);
    }
}
