//! The interactive session controller.
//!
//! This module keeps a program text and its three derived artifacts (the
//! compiled image, its disassembly, and a live execution session)
//! consistent under a synchronous, ordered update pipeline, including
//! partial-failure handling when compilation or disassembly fails.

pub mod controller;
pub mod toolchain;

pub use controller::{ExecPhase, Observer, Topic, Workbench, DEFAULT_PROGRAM};
pub use toolchain::{Engine, NativeToolchain, StageFailure, Toolchain};
