//! The workbench controller: one program text and its derived artifacts.
//!
//! A [`Workbench`] keeps three things consistent with the current program
//! text: the compiled image, its disassembly, and a live CPU execution
//! session. Updates run through a fixed, synchronous pipeline rather than
//! a generic event bus, so the order never depends on who subscribed
//! first:
//!
//! ```text
//! set_program
//!   -> notify ProgramUpdate
//!   -> compile stage          -> notify Compile
//!   -> disassembly stage      -> notify Disassembly
//!   -> engine reset (success only) -> notify Exec
//! ```
//!
//! Every notification is delivered to completion before `set_program`
//! returns. Observers carry no payload; they re-read public state.

use crate::workbench::toolchain::{Engine, NativeToolchain, StageFailure, Toolchain};
use crate::cpu::RegisterSnapshot;

/// Placeholder shown when the compiler failed without a user-facing reason.
const COMPILE_PLACEHOLDER: &str = "Failed to compile";
/// Placeholder shown when the disassembler failed without a reason.
const DISASM_PLACEHOLDER: &str = "Failed to disassemble";

/// The sample program a fresh workbench starts with: ADD or AND two
/// operands, selected by r4, and store the result after the code.
pub const DEFAULT_PROGRAM: &str = "\
# Combine two operands with ADD or AND, selected by r4.
LCONST r2 0b1101    # operand 1
LCONST r3 0b1011    # operand 2

LCONST r4 0         # 0 selects ADD, anything else selects AND

JNE r4 DO_AND

ADD r2 r2 r3
JMP FIN

DO_AND:
AND r2 r2 r3

FIN:
STORE r2 pc 2
HALT
0
";

/// Notification topics, delivered in the pipeline order documented on
/// [`Workbench`]. No payload: observers re-read current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// The program text changed.
    ProgramUpdate,
    /// The compile stage ran (successfully or not).
    Compile,
    /// The disassembly stage ran (successfully or not).
    Disassembly,
    /// The execution session changed (reset, step, or register write).
    Exec,
}

/// Where the execution session is in its reset/step lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPhase {
    /// Just reset; nothing stepped yet.
    Fresh,
    /// At least one step since reset, engine still continuable.
    Running,
    /// Engine reported not continuable. Terminal until the next reset.
    Halted,
}

/// An observer callback. Receives the workbench read-only plus the topic
/// that fired.
pub type Observer<T> = Box<dyn FnMut(&Workbench<T>, Topic)>;

/// The execution side of a workbench: one exclusively owned engine plus
/// the latest snapshot read from it.
struct ExecutionSession<E> {
    engine: E,
    snapshot: RegisterSnapshot,
    continuable: bool,
    phase: ExecPhase,
    /// Set when a failed compile left this session showing results of an
    /// older program; cleared by the next successful reset.
    stale: bool,
}

impl<E: Engine> ExecutionSession<E> {
    fn new(engine: E) -> Self {
        let snapshot = engine.read_registers();
        let continuable = engine.is_continuable();
        Self {
            engine,
            snapshot,
            continuable,
            phase: ExecPhase::Fresh,
            stale: false,
        }
    }

    /// Re-read snapshot and continuable flag from the engine. Called after
    /// every mutating engine call; the snapshot is never computed here.
    fn refresh(&mut self) {
        self.snapshot = self.engine.read_registers();
        self.continuable = self.engine.is_continuable();
    }

    fn reset(&mut self, image: &[u16]) {
        self.engine.reinitialize(image);
        self.refresh();
        self.phase = ExecPhase::Fresh;
        self.stale = false;
    }

    fn step(&mut self) {
        if self.continuable {
            self.engine.single_step();
            self.refresh();
            self.phase = if self.continuable {
                ExecPhase::Running
            } else {
                ExecPhase::Halted
            };
        } else {
            // No engine mutation, but the classification still settles.
            self.phase = ExecPhase::Halted;
        }
    }

    fn set_register(&mut self, index: u8, value: u16) {
        self.engine.write_register(index, value);
        // The write may have moved PC onto or off a halt word, so the
        // continuable flag is re-read too. The phase is not: register
        // writes never change the lifecycle classification.
        self.refresh();
    }
}

/// Interactive session controller for one program and one CPU engine.
///
/// See the module docs for the update pipeline. All methods are
/// synchronous; by the time any of them returns, every downstream effect
/// (including observer notification) has completed.
pub struct Workbench<T: Toolchain = NativeToolchain> {
    toolchain: T,
    program: String,

    compiled: Vec<u16>,
    compile_diagnostic: Option<String>,

    disassembled: Vec<String>,
    disassembly_diagnostic: Option<String>,

    exec: ExecutionSession<T::Engine>,
    observers: Vec<Observer<T>>,
}

impl Workbench<NativeToolchain> {
    /// A workbench on the native toolchain, loaded with
    /// [`DEFAULT_PROGRAM`] and already compiled, disassembled, and reset.
    pub fn new() -> Self {
        Self::with_toolchain(NativeToolchain)
    }
}

impl Default for Workbench<NativeToolchain> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Toolchain> Workbench<T> {
    /// A workbench on an arbitrary toolchain, seeded with the default
    /// sample program.
    pub fn with_toolchain(toolchain: T) -> Self {
        let engine = toolchain.boot(&[]);
        let mut bench = Self {
            toolchain,
            program: String::new(),
            compiled: Vec::new(),
            compile_diagnostic: None,
            disassembled: Vec::new(),
            disassembly_diagnostic: None,
            exec: ExecutionSession::new(engine),
            observers: Vec::new(),
        };
        bench.set_program(DEFAULT_PROGRAM);
        bench
    }

    /// Register an observer. Observers run synchronously, in registration
    /// order, after each pipeline stage and each execution change.
    pub fn observe(&mut self, observer: impl FnMut(&Workbench<T>, Topic) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replace the program text and run the full pipeline. Accepts any
    /// text; validation happens in the compile stage.
    pub fn set_program(&mut self, text: impl Into<String>) {
        self.program = text.into();
        self.notify(Topic::ProgramUpdate);

        self.recompile();
        if self.compile_diagnostic.is_some() {
            // The session keeps showing the previous program's state;
            // mark it so views can say so.
            self.exec.stale = true;
        }
        self.notify(Topic::Compile);

        self.disassemble();
        self.notify(Topic::Disassembly);

        if self.compile_diagnostic.is_none() {
            self.exec.reset(&self.compiled);
            self.notify(Topic::Exec);
        }
    }

    /// Rebuild the engine from the current image. A no-op while the
    /// current text does not compile (the stale session stays).
    pub fn reset(&mut self) {
        if self.compile_diagnostic.is_none() {
            self.exec.reset(&self.compiled);
            self.notify(Topic::Exec);
        }
    }

    /// Advance one instruction if the engine is continuable; otherwise
    /// only settle the phase. Notifies `Exec` either way so views can
    /// re-render the halted indicator.
    pub fn step(&mut self) {
        self.exec.step();
        self.notify(Topic::Exec);
    }

    /// Write a register by debug-interface index (0..=7) and re-read the
    /// snapshot. Permitted regardless of halted state; the engine decides
    /// what the write means (the zero register stays zero).
    pub fn set_register(&mut self, index: u8, value: u16) {
        self.exec.set_register(index, value);
        self.notify(Topic::Exec);
    }

    // ---- compile stage ----

    fn recompile(&mut self) {
        // Optimistic reset: no stale artifact is observable even if a
        // consumer inspects state mid-pipeline.
        self.compiled = Vec::new();
        self.compile_diagnostic = Some(COMPILE_PLACEHOLDER.to_string());

        match self.toolchain.compile(&self.program) {
            Ok(image) => {
                self.compiled = image;
                self.compile_diagnostic = None;
            }
            Err(StageFailure::Diagnostic(reason)) => {
                self.compile_diagnostic = Some(format!("{COMPILE_PLACEHOLDER}: {reason}"));
            }
            Err(StageFailure::Internal(fault)) => {
                // Operator-only; the user keeps the generic placeholder.
                tracing::error!(%fault, "compiler reported an internal fault");
            }
        }
    }

    // ---- disassembly stage ----

    fn disassemble(&mut self) {
        self.disassembled = Vec::new();
        self.disassembly_diagnostic = Some(DISASM_PLACEHOLDER.to_string());

        // A compile failure propagates verbatim; the disassembler is not
        // consulted about an image that does not exist.
        if let Some(compile_diag) = &self.compile_diagnostic {
            self.disassembly_diagnostic =
                Some(format!("{DISASM_PLACEHOLDER}: {compile_diag}"));
            return;
        }

        match self.toolchain.disassemble(&self.compiled) {
            Ok(lines) => {
                self.disassembled = lines;
                self.disassembly_diagnostic = None;
            }
            Err(StageFailure::Diagnostic(reason)) => {
                self.disassembly_diagnostic =
                    Some(format!("{DISASM_PLACEHOLDER}: {reason}"));
            }
            Err(StageFailure::Internal(fault)) => {
                tracing::error!(%fault, "disassembler reported an internal fault");
            }
        }
    }

    // ---- notification ----

    fn notify(&mut self, topic: Topic) {
        // Observers receive `&self`, so none of them can mutate the
        // workbench or the observer list mid-delivery.
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer(self, topic);
        }
        self.observers = observers;
    }

    // ---- public state ----

    /// The current program text.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The compiled image; empty when the last compile failed.
    pub fn artifact(&self) -> &[u16] {
        &self.compiled
    }

    /// The user-facing compile diagnostic, if the last compile failed.
    pub fn compile_diagnostic(&self) -> Option<&str> {
        self.compile_diagnostic.as_deref()
    }

    /// Display lines, index-aligned with [`Self::artifact`]; empty when
    /// disassembly did not run or failed.
    pub fn disassembly(&self) -> &[String] {
        &self.disassembled
    }

    /// The user-facing disassembly diagnostic. On a compile failure this
    /// embeds the compile diagnostic text.
    pub fn disassembly_diagnostic(&self) -> Option<&str> {
        self.disassembly_diagnostic.as_deref()
    }

    /// The latest register snapshot, read from the engine after its most
    /// recent mutation.
    pub fn registers(&self) -> RegisterSnapshot {
        self.exec.snapshot
    }

    /// Whether the engine would execute anything on the next step.
    pub fn is_continuable(&self) -> bool {
        self.exec.continuable
    }

    /// The execution session's lifecycle phase.
    pub fn phase(&self) -> ExecPhase {
        self.exec.phase
    }

    /// Whether the execution session still shows a previously compiled
    /// program because the current text failed to compile.
    pub fn is_stale(&self) -> bool {
        self.exec.stale
    }
}

impl<T: Toolchain> std::fmt::Debug for Workbench<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("program_len", &self.program.len())
            .field("artifact_words", &self.compiled.len())
            .field("compile_diagnostic", &self.compile_diagnostic)
            .field("phase", &self.exec.phase)
            .field("stale", &self.exec.stale)
            .finish()
    }
}
