//! Two-pass assembler for EDU-16 source.
//!
//! Syntax:
//! ```text
//! # comment
//! LABEL:            # define a label (value = current address)
//!     LCONST r2 5   # load a small constant
//!     ADD r2 r2 r3  # dst a b
//!     MOV r4 r2     # sugar for ADD r4 r2 zx
//!     LOAD r5 sp -1 # dst base offset (offset optional, default 0)
//!     JEQ r4 LABEL  # branch to label or absolute address
//!     HALT
//!     0x1F          # bare number: raw data word
//! ```
//!
//! Mnemonics and register names are case-insensitive. One source
//! instruction always assembles to exactly one word.

use crate::cpu::decode::{
    encode, AluOp, BranchKind, Instruction, BRANCH_MAX, JMP_MAX, LCONST_MAX, OFFSET_MAX,
    OFFSET_MIN,
};
use crate::cpu::registers::Register;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source text into a program image.
pub fn assemble(source: &str) -> Result<Vec<u16>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Which field of an emitted word a label fixup patches.
#[derive(Debug, Clone, Copy)]
enum FixupKind {
    /// 12-bit JMP target.
    Jmp,
    /// 9-bit conditional branch target.
    Branch,
}

impl FixupKind {
    fn max(self) -> u16 {
        match self {
            FixupKind::Jmp => JMP_MAX,
            FixupKind::Branch => BRANCH_MAX,
        }
    }
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> word address).
    symbols: HashMap<String, u16>,
    /// Forward references: (output index, label, source line, field kind).
    pending: Vec<(usize, String, usize, FixupKind)>,
    /// Output words.
    output: Vec<u16>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u16>, AssemblerError> {
        // Pass 1: collect labels and emit words (targets still zeroed).
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: patch label references.
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Strip comments first; '#' may appear anywhere on the line.
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition, possibly with an instruction after it.
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "empty label name".into(),
                });
            }
            let addr = self.output.len() as u16;
            if self.symbols.insert(label.clone(), addr).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = line[colon_idx + 1..].trim();
            if rest.is_empty() {
                return Ok(());
            }
            return self.process_instruction(rest, line_num);
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = parts[0].to_uppercase();
        let operands = &parts[1..];

        // A bare number is a raw data word.
        if let Some(value) = parse_number(&mnemonic) {
            if operands.is_empty() {
                let word = to_word(value, line_num)?;
                self.output.push(word);
                return Ok(());
            }
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unexpected operands after data word '{mnemonic}'"),
            });
        }

        let instr = self.parse_instruction(&mnemonic, operands, line_num)?;
        // Field ranges were validated against the source, so encoding
        // cannot fail here.
        let word = encode(&instr).map_err(|e| AssemblerError::SyntaxError {
            line: line_num,
            message: e.to_string(),
        })?;
        self.output.push(word);
        Ok(())
    }

    fn parse_instruction(
        &mut self,
        mnemonic: &str,
        operands: &[&str],
        line_num: usize,
    ) -> Result<Instruction, AssemblerError> {
        let mut ops = Operands::new(mnemonic, operands, line_num);

        let instr = match mnemonic {
            "NOP" => Instruction::Nop,
            "HALT" | "HLT" => Instruction::Halt,

            "ADD" | "SUB" | "AND" | "OR" | "XOR" => {
                let op = match mnemonic {
                    "ADD" => AluOp::Add,
                    "SUB" => AluOp::Sub,
                    "AND" => AluOp::And,
                    "OR" => AluOp::Or,
                    _ => AluOp::Xor,
                };
                let dst = ops.register()?;
                let a = ops.register()?;
                let b = ops.register()?;
                Instruction::Alu { op, dst, a, b }
            }

            "MOV" => {
                let dst = ops.register()?;
                let src = ops.register()?;
                Instruction::Alu { op: AluOp::Add, dst, a: src, b: Register::ZX }
            }

            "LCONST" => {
                let dst = ops.register()?;
                let value = ops.number()?;
                if value < 0 || value > i64::from(LCONST_MAX) {
                    return Err(AssemblerError::ValueOutOfRange {
                        line: line_num,
                        value,
                        limit: format!("0..={LCONST_MAX}"),
                    });
                }
                Instruction::Lconst { dst, value: value as u16 }
            }

            "LOAD" => {
                let dst = ops.register()?;
                let base = ops.register()?;
                let offset = ops.offset()?;
                Instruction::Load { dst, base, offset }
            }

            "STORE" => {
                let src = ops.register()?;
                let base = ops.register()?;
                let offset = ops.offset()?;
                Instruction::Store { src, base, offset }
            }

            "JMP" => {
                let target = self.target(&mut ops, FixupKind::Jmp)?;
                Instruction::Jmp { target }
            }

            "JEQ" | "JNE" | "JGT" | "JLT" => {
                let kind = match mnemonic {
                    "JEQ" => BranchKind::Eq,
                    "JNE" => BranchKind::Ne,
                    "JGT" => BranchKind::Gt,
                    _ => BranchKind::Lt,
                };
                let cond = ops.register()?;
                let target = self.target(&mut ops, FixupKind::Branch)?;
                Instruction::Branch { kind, cond, target }
            }

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic: mnemonic.to_string(),
                })
            }
        };

        ops.finish()?;
        Ok(instr)
    }

    /// Parse a jump/branch target: a number, or a label left for pass 2.
    fn target(&mut self, ops: &mut Operands<'_>, kind: FixupKind) -> Result<u16, AssemblerError> {
        let (raw, line_num) = ops.raw()?;
        if let Some(value) = parse_number(raw) {
            if value < 0 || value > i64::from(kind.max()) {
                return Err(AssemblerError::ValueOutOfRange {
                    line: line_num,
                    value,
                    limit: format!("0..={}", kind.max()),
                });
            }
            return Ok(value as u16);
        }
        // The target field is the low bits and stays 0 until pass 2.
        self.pending
            .push((self.output.len(), raw.to_uppercase(), line_num, kind));
        Ok(0)
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num, kind) in &self.pending {
            let addr = *self.symbols.get(label).ok_or_else(|| {
                AssemblerError::UndefinedLabel { line: *line_num, label: label.clone() }
            })?;
            if addr > kind.max() {
                return Err(AssemblerError::ValueOutOfRange {
                    line: *line_num,
                    value: i64::from(addr),
                    limit: format!("0..={}", kind.max()),
                });
            }
            self.output[*out_idx] |= addr;
        }
        Ok(())
    }
}

/// Cursor over one instruction's operand list.
struct Operands<'a> {
    mnemonic: &'a str,
    operands: &'a [&'a str],
    next: usize,
    line_num: usize,
}

impl<'a> Operands<'a> {
    fn new(mnemonic: &'a str, operands: &'a [&'a str], line_num: usize) -> Self {
        Self { mnemonic, operands, next: 0, line_num }
    }

    fn raw(&mut self) -> Result<(&'a str, usize), AssemblerError> {
        let op = self.operands.get(self.next).ok_or(AssemblerError::MissingOperand {
            line: self.line_num,
            mnemonic: self.mnemonic.to_string(),
        })?;
        self.next += 1;
        Ok((op, self.line_num))
    }

    fn register(&mut self) -> Result<Register, AssemblerError> {
        let (raw, line) = self.raw()?;
        Register::parse(raw).ok_or_else(|| AssemblerError::UnknownRegister {
            line,
            name: raw.to_string(),
        })
    }

    fn number(&mut self) -> Result<i64, AssemblerError> {
        let (raw, line) = self.raw()?;
        parse_number(raw).ok_or_else(|| AssemblerError::SyntaxError {
            line,
            message: format!("expected a number, found '{raw}'"),
        })
    }

    /// Optional trailing memory offset, default 0.
    fn offset(&mut self) -> Result<i8, AssemblerError> {
        if self.next >= self.operands.len() {
            return Ok(0);
        }
        let value = self.number()?;
        if value < i64::from(OFFSET_MIN) || value > i64::from(OFFSET_MAX) {
            return Err(AssemblerError::ValueOutOfRange {
                line: self.line_num,
                value,
                limit: format!("{OFFSET_MIN}..={OFFSET_MAX}"),
            });
        }
        Ok(value as i8)
    }

    fn finish(&self) -> Result<(), AssemblerError> {
        if self.next < self.operands.len() {
            return Err(AssemblerError::SyntaxError {
                line: self.line_num,
                message: format!(
                    "too many operands for {}: '{}'",
                    self.mnemonic,
                    self.operands[self.next..].join(" ")
                ),
            });
        }
        Ok(())
    }
}

/// Parse a decimal, `0x` hex, or `0b` binary literal. Returns `None` for
/// anything that is not a number (e.g. a label).
fn parse_number(raw: &str) -> Option<i64> {
    let (neg, raw) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = raw.strip_prefix("0b").or_else(|| raw.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
        raw.parse::<i64>().ok()?
    } else {
        return None;
    };
    Some(if neg { -value } else { value })
}

/// Narrow a raw data value to one word; negatives wrap two's-complement.
fn to_word(value: i64, line_num: usize) -> Result<u16, AssemblerError> {
    if value < i64::from(i16::MIN) || value > i64::from(u16::MAX) {
        return Err(AssemblerError::ValueOutOfRange {
            line: line_num,
            value,
            limit: format!("{}..={}", i16::MIN, u16::MAX),
        });
    }
    Ok(value as u16)
}

/// Errors that can occur during assembly. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("unknown register on line {line}: {name}")]
    UnknownRegister { line: usize, name: String },

    #[error("missing operand on line {line} for {mnemonic}")]
    MissingOperand { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label redefined on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value} (allowed {limit})")]
    ValueOutOfRange { line: usize, value: i64, limit: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            # four instructions, four words
            LCONST r2 5
            LCONST r3 3
            ADD r2 r2 r3
            HALT
        "#;

        let words = assemble(source).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(
            decode(words[2]),
            Instruction::Alu {
                op: AluOp::Add,
                dst: Register::R2,
                a: Register::R2,
                b: Register::R3,
            }
        );
        assert_eq!(decode(words[3]), Instruction::Halt);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
            JEQ r4 DO_AND
            ADD r2 r2 r3
            JMP FIN
        DO_AND:
            AND r2 r2 r3
        FIN:
            HALT
        "#;

        let words = assemble(source).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(
            decode(words[0]),
            Instruction::Branch { kind: BranchKind::Eq, cond: Register::R4, target: 3 }
        );
        assert_eq!(decode(words[2]), Instruction::Jmp { target: 4 });
    }

    #[test]
    fn test_assemble_data_words() {
        let words = assemble("42\n0x1F\n0b101\n-1\n").unwrap();
        assert_eq!(words, vec![42, 0x1F, 0b101, 0xFFFF]);
    }

    #[test]
    fn test_mov_is_add_zx() {
        let words = assemble("MOV r4 r2").unwrap();
        assert_eq!(
            decode(words[0]),
            Instruction::Alu {
                op: AluOp::Add,
                dst: Register::R4,
                a: Register::R2,
                b: Register::ZX,
            }
        );
    }

    #[test]
    fn test_optional_store_offset() {
        let words = assemble("STORE r2 pc 2\nSTORE r2 sp\n").unwrap();
        assert_eq!(
            decode(words[0]),
            Instruction::Store { src: Register::R2, base: Register::PC, offset: 2 }
        );
        assert_eq!(
            decode(words[1]),
            Instruction::Store { src: Register::R2, base: Register::SP, offset: 0 }
        );
    }

    #[test]
    fn test_undefined_label() {
        let err = assemble("JMP NOWHERE\nHALT\n").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UndefinedLabel { line: 1, label: "NOWHERE".into() }
        );
    }

    #[test]
    fn test_duplicate_label() {
        let err = assemble("A:\nNOP\nA:\nHALT\n").unwrap_err();
        assert_eq!(err, AssemblerError::DuplicateLabel { line: 3, label: "A".into() });
    }

    #[test]
    fn test_constant_out_of_range() {
        let err = assemble("LCONST r2 512").unwrap_err();
        assert!(matches!(err, AssemblerError::ValueOutOfRange { line: 1, value: 512, .. }));
    }

    #[test]
    fn test_unknown_mnemonic_and_register() {
        assert!(matches!(
            assemble("FROB r2").unwrap_err(),
            AssemblerError::UnknownMnemonic { line: 1, .. }
        ));
        assert!(matches!(
            assemble("ADD r2 r2 r9").unwrap_err(),
            AssemblerError::UnknownRegister { line: 1, .. }
        ));
    }

    #[test]
    fn test_case_insensitive() {
        let upper = assemble("lconst R2 5\nhalt\n").unwrap();
        let lower = assemble("LCONST r2 5\nHALT\n").unwrap();
        assert_eq!(upper, lower);
    }
}
