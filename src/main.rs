//! EDU-16 Workbench - CLI entry point
//!
//! Commands:
//! - `edu16 asm <source>` - assemble to a word-per-line image
//! - `edu16 disasm <image>` - disassemble an image
//! - `edu16 run <source>` - assemble and run to halt
//! - `edu16 bench <source>` - interactive workbench (feature "tui")

use clap::{Parser, Subcommand};
use edu16::{ExecPhase, Register, Workbench};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edu16")]
#[command(version = "0.1.0")]
#[command(about = "An interactive workbench for the EDU-16, a 16-bit educational CPU")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble source to a word-per-line image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a word-per-line image
    Disasm {
        /// Path to the image file
        image: PathBuf,
    },
    /// Assemble a program and run it until it halts
    Run {
        /// Path to the source file
        source: PathBuf,
        /// Maximum number of steps to run
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Print each executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final register snapshot as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Interactive terminal workbench
    Bench {
        /// Path to the source file
        source: PathBuf,
    },
}

fn main() {
    // Operator-only channel: internal faults and traces go to stderr,
    // controlled by RUST_LOG. User-facing output stays on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Asm { source, output } => assemble_file(&source, output.as_deref()),
        Commands::Disasm { image } => disassemble_file(&image),
        Commands::Run { source, max_cycles, trace, json } => {
            run_program(&source, max_cycles, trace, json);
        }
        Commands::Bench { source } => bench(source),
    }
}

fn read_source(path: &std::path::Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn assemble_file(source: &std::path::Path, output: Option<&std::path::Path>) {
    let image = match edu16::assemble(&read_source(source)) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Assembly error: {e}");
            std::process::exit(1);
        }
    };

    let mut text = String::new();
    for word in &image {
        text.push_str(&format!("0x{word:04x}\n"));
    }

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                std::process::exit(1);
            }
            println!("Assembled {} words to {}", image.len(), path.display());
        }
        None => print!("{text}"),
    }
}

/// Parse a word-per-line image file (`0x` hex or decimal, `#` comments).
fn load_image(path: &std::path::Path) -> Vec<u16> {
    let mut image = Vec::new();
    for (line_num, line) in read_source(path).lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let parsed = match line.strip_prefix("0x").or_else(|| line.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => line.parse::<u16>(),
        };
        match parsed {
            Ok(word) => image.push(word),
            Err(_) => {
                eprintln!("Bad word on line {}: '{}'", line_num + 1, line);
                std::process::exit(1);
            }
        }
    }
    image
}

fn disassemble_file(path: &std::path::Path) {
    let image = load_image(path);
    for (addr, line) in edu16::disassemble(&image).iter().enumerate() {
        println!("{addr:04x}: {line}");
    }
}

fn run_program(source: &std::path::Path, max_cycles: u64, trace: bool, json: bool) {
    let mut bench = Workbench::new();
    bench.set_program(read_source(source));

    if let Some(diag) = bench.compile_diagnostic() {
        eprintln!("{diag}");
        std::process::exit(1);
    }

    let mut steps = 0u64;
    while bench.is_continuable() && steps < max_cycles {
        if trace {
            let pc = bench.registers().pc as usize;
            let line = bench
                .disassembly()
                .get(pc)
                .map_or("<outside image>", String::as_str);
            println!("{pc:04x}: {line}");
        }
        bench.step();
        steps += 1;
    }

    if bench.phase() != ExecPhase::Halted && bench.is_continuable() {
        eprintln!("Stopped after {steps} steps without halting");
    }

    let regs = bench.registers();
    if json {
        // Serialization of a plain snapshot struct cannot fail.
        match serde_json::to_string_pretty(&regs) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Failed to serialize snapshot: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Halted after {steps} steps");
        for reg in [
            Register::PC,
            Register::R2,
            Register::R3,
            Register::R4,
            Register::R5,
            Register::SP,
            Register::LP,
        ] {
            println!("  {}: {:#06x} ({})", reg, regs.get(reg), regs.get(reg));
        }
    }
}

#[cfg(feature = "tui")]
fn bench(source: PathBuf) {
    if let Err(e) = edu16::run_workbench(source) {
        eprintln!("Workbench error: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn bench(_source: PathBuf) {
    eprintln!("This build has no TUI; rebuild with the 'tui' feature.");
    std::process::exit(1);
}
