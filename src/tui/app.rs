//! Workbench TUI state and key handling.

use crate::workbench::Workbench;
use std::path::PathBuf;

/// Interactive workbench state: the controller plus view concerns.
pub struct WorkbenchApp {
    /// The session controller being driven.
    pub bench: Workbench,
    /// Where the program text comes from; `e` re-reads it.
    pub source_path: PathBuf,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Disassembly view scroll offset.
    pub disasm_scroll: usize,
}

impl WorkbenchApp {
    /// Create a workbench loaded from a source file.
    pub fn new(source_path: PathBuf, source: &str) -> Self {
        let mut bench = Workbench::new();
        bench.set_program(source);

        let status = match bench.compile_diagnostic() {
            None => format!(
                "Compiled {} words. s: step, x: reset, e: reload, q: quit.",
                bench.artifact().len()
            ),
            Some(diag) => diag.to_string(),
        };

        Self {
            bench,
            source_path,
            should_quit: false,
            status,
            disasm_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let was_continuable = self.bench.is_continuable();
        self.bench.step();

        let regs = self.bench.registers();
        self.status = if was_continuable {
            format!("Stepped. PC={:#06x}", regs.pc)
        } else {
            "Halted; step is a no-op. Reset with 'x'.".to_string()
        };
    }

    /// Rebuild the engine from the current image.
    pub fn reset(&mut self) {
        if self.bench.compile_diagnostic().is_some() {
            self.status = "Cannot reset: current text does not compile.".to_string();
            return;
        }
        self.bench.reset();
        self.status = "Reset. Ready.".to_string();
    }

    /// Re-read the source file and push it through the pipeline.
    pub fn reload(&mut self) {
        match std::fs::read_to_string(&self.source_path) {
            Ok(source) => {
                self.bench.set_program(source);
                self.status = match self.bench.compile_diagnostic() {
                    None => format!("Reloaded: {} words.", self.bench.artifact().len()),
                    Some(diag) => diag.to_string(),
                };
            }
            Err(e) => {
                self.status = format!("Reload failed: {e}");
            }
        }
    }

    /// The disassembly line index at PC, if PC is inside the image.
    pub fn current_line(&self) -> Option<usize> {
        let pc = self.bench.registers().pc as usize;
        (pc < self.bench.disassembly().len()).then_some(pc)
    }
}

/// Run the interactive workbench on a source file.
pub fn run_workbench(source_path: PathBuf) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let source = std::fs::read_to_string(&source_path)?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = WorkbenchApp::new(source_path, &source);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => app.step(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('e') => app.reload(),
                        KeyCode::Up => {
                            app.disasm_scroll = app.disasm_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.disasm_scroll + 1 < app.bench.disassembly().len() {
                                app.disasm_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
