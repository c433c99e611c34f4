//! TUI front-end for the workbench.
//!
//! A terminal view over the session controller:
//! - disassembly with the PC line highlighted (or the diagnostic)
//! - register state with phase and stale markers
//! - step/reset/reload controls
//!
//! The view only reads the controller's public state and re-renders.

mod app;
mod ui;

pub use app::{run_workbench, WorkbenchApp};
