//! Instruction encoding for the EDU-16.
//!
//! Every instruction is one 16-bit word; the top nibble selects the
//! operation group:
//!
//! ```text
//! 0x0000        NOP
//! 0x1000        HALT
//! 0x2...        ALU    func[11:9] dst[8:6] a[5:3] b[2:0]
//! 0x3...        LCONST dst[11:9] imm[8:0]
//! 0x4...        LOAD   dst[11:9] base[8:6] off[5:0] (signed)
//! 0x5...        STORE  src[11:9] base[8:6] off[5:0] (signed)
//! 0x6...        JMP    target[11:0]
//! 0x7..0xA...   JEQ/JNE/JGT/JLT cond[11:9] target[8:0]
//! ```
//!
//! Decoding is total: any word that matches no pattern above decodes to
//! [`Instruction::Word`], a raw data word. Programs freely intermix code
//! and data, so "failed to decode" is not a meaningful condition here.

use crate::cpu::registers::Register;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest immediate an LCONST can carry (9 bits).
pub const LCONST_MAX: u16 = 0x1FF;

/// Largest absolute address a JMP can carry (12 bits).
pub const JMP_MAX: u16 = 0xFFF;

/// Largest absolute address a conditional branch can carry (9 bits).
pub const BRANCH_MAX: u16 = 0x1FF;

/// Memory offset range for LOAD/STORE (signed 6 bits).
pub const OFFSET_MIN: i8 = -32;
/// See [`OFFSET_MIN`].
pub const OFFSET_MAX: i8 = 31;

/// ALU function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    /// dst := a + b (wrapping)
    Add = 0,
    /// dst := a - b (wrapping)
    Sub = 1,
    /// dst := a & b
    And = 2,
    /// dst := a | b
    Or = 3,
    /// dst := a ^ b
    Xor = 4,
}

impl AluOp {
    fn from_bits(bits: u16) -> Option<AluOp> {
        match bits & 0b111 {
            0 => Some(AluOp::Add),
            1 => Some(AluOp::Sub),
            2 => Some(AluOp::And),
            3 => Some(AluOp::Or),
            4 => Some(AluOp::Xor),
            _ => None,
        }
    }

    /// The assembly mnemonic for this function.
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::And => "AND",
            AluOp::Or => "OR",
            AluOp::Xor => "XOR",
        }
    }
}

/// Branch condition, always tested against register value vs zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    /// Taken when the register reads 0.
    Eq,
    /// Taken when the register reads non-zero.
    Ne,
    /// Taken when the register, read as two's complement, is positive.
    Gt,
    /// Taken when the register, read as two's complement, is negative.
    Lt,
}

impl BranchKind {
    fn opcode(self) -> u16 {
        match self {
            BranchKind::Eq => 0x7,
            BranchKind::Ne => 0x8,
            BranchKind::Gt => 0x9,
            BranchKind::Lt => 0xA,
        }
    }

    /// The assembly mnemonic for this condition.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BranchKind::Eq => "JEQ",
            BranchKind::Ne => "JNE",
            BranchKind::Gt => "JGT",
            BranchKind::Lt => "JLT",
        }
    }
}

/// A decoded EDU-16 instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Do nothing.
    Nop,
    /// Stop the machine. The word at PC being HALT is what the engine's
    /// continuable flag reports on.
    Halt,
    /// Three-register ALU operation.
    Alu {
        /// Function selector.
        op: AluOp,
        /// Destination register.
        dst: Register,
        /// Left operand.
        a: Register,
        /// Right operand.
        b: Register,
    },
    /// Load a small constant: dst := value.
    Lconst {
        /// Destination register.
        dst: Register,
        /// Unsigned immediate, 0..=[`LCONST_MAX`].
        value: u16,
    },
    /// Memory read: dst := mem[base + offset].
    Load {
        /// Destination register.
        dst: Register,
        /// Address base register.
        base: Register,
        /// Signed word offset.
        offset: i8,
    },
    /// Memory write: mem[base + offset] := src.
    Store {
        /// Source register.
        src: Register,
        /// Address base register.
        base: Register,
        /// Signed word offset.
        offset: i8,
    },
    /// Unconditional absolute jump.
    Jmp {
        /// Target address, 0..=[`JMP_MAX`].
        target: u16,
    },
    /// Conditional absolute jump.
    Branch {
        /// Condition to test.
        kind: BranchKind,
        /// Register the condition reads.
        cond: Register,
        /// Target address, 0..=[`BRANCH_MAX`].
        target: u16,
    },
    /// A raw data word (or an encoding no instruction claims).
    Word(u16),
}

/// Errors from encoding an instruction whose fields are out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("constant {0} does not fit in {LCONST_MAX} (9 bits)")]
    ConstantTooWide(u16),

    #[error("jump target {0} does not fit in {JMP_MAX} (12 bits)")]
    JumpTargetTooFar(u16),

    #[error("branch target {0} does not fit in {BRANCH_MAX} (9 bits)")]
    BranchTargetTooFar(u16),

    #[error("memory offset {0} outside {OFFSET_MIN}..={OFFSET_MAX}")]
    OffsetTooWide(i8),
}

/// Decode one word. Total: unclaimed encodings come back as
/// [`Instruction::Word`].
pub fn decode(word: u16) -> Instruction {
    let opcode = word >> 12;
    match opcode {
        0x0 if word == 0x0000 => Instruction::Nop,
        0x1 if word == 0x1000 => Instruction::Halt,
        0x2 => match AluOp::from_bits(word >> 9) {
            Some(op) => Instruction::Alu {
                op,
                dst: Register::from_bits(word >> 6),
                a: Register::from_bits(word >> 3),
                b: Register::from_bits(word),
            },
            None => Instruction::Word(word),
        },
        0x3 => Instruction::Lconst {
            dst: Register::from_bits(word >> 9),
            value: word & 0x1FF,
        },
        0x4 => Instruction::Load {
            dst: Register::from_bits(word >> 9),
            base: Register::from_bits(word >> 6),
            offset: decode_offset(word),
        },
        0x5 => Instruction::Store {
            src: Register::from_bits(word >> 9),
            base: Register::from_bits(word >> 6),
            offset: decode_offset(word),
        },
        0x6 => Instruction::Jmp { target: word & 0xFFF },
        0x7..=0xA => {
            let kind = match opcode {
                0x7 => BranchKind::Eq,
                0x8 => BranchKind::Ne,
                0x9 => BranchKind::Gt,
                _ => BranchKind::Lt,
            };
            Instruction::Branch {
                kind,
                cond: Register::from_bits(word >> 9),
                target: word & 0x1FF,
            }
        }
        _ => Instruction::Word(word),
    }
}

/// Encode one instruction to its word, validating field ranges.
pub fn encode(instr: &Instruction) -> Result<u16, EncodeError> {
    match *instr {
        Instruction::Nop => Ok(0x0000),
        Instruction::Halt => Ok(0x1000),
        Instruction::Alu { op, dst, a, b } => Ok(0x2000
            | ((op as u16) << 9)
            | (u16::from(dst.index()) << 6)
            | (u16::from(a.index()) << 3)
            | u16::from(b.index())),
        Instruction::Lconst { dst, value } => {
            if value > LCONST_MAX {
                return Err(EncodeError::ConstantTooWide(value));
            }
            Ok(0x3000 | (u16::from(dst.index()) << 9) | value)
        }
        Instruction::Load { dst, base, offset } => Ok(0x4000
            | (u16::from(dst.index()) << 9)
            | (u16::from(base.index()) << 6)
            | encode_offset(offset)?),
        Instruction::Store { src, base, offset } => Ok(0x5000
            | (u16::from(src.index()) << 9)
            | (u16::from(base.index()) << 6)
            | encode_offset(offset)?),
        Instruction::Jmp { target } => {
            if target > JMP_MAX {
                return Err(EncodeError::JumpTargetTooFar(target));
            }
            Ok(0x6000 | target)
        }
        Instruction::Branch { kind, cond, target } => {
            if target > BRANCH_MAX {
                return Err(EncodeError::BranchTargetTooFar(target));
            }
            Ok((kind.opcode() << 12) | (u16::from(cond.index()) << 9) | target)
        }
        Instruction::Word(raw) => Ok(raw),
    }
}

fn decode_offset(word: u16) -> i8 {
    let bits = (word & 0x3F) as i8;
    // Sign-extend the 6-bit field.
    (bits << 2) >> 2
}

fn encode_offset(offset: i8) -> Result<u16, EncodeError> {
    if !(OFFSET_MIN..=OFFSET_MAX).contains(&offset) {
        return Err(EncodeError::OffsetTooWide(offset));
    }
    Ok((offset as u16) & 0x3F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_and_halt() {
        assert_eq!(decode(0x0000), Instruction::Nop);
        assert_eq!(decode(0x1000), Instruction::Halt);
        assert_eq!(encode(&Instruction::Halt).unwrap(), 0x1000);
    }

    #[test]
    fn test_alu_fields() {
        let instr = Instruction::Alu {
            op: AluOp::Add,
            dst: Register::R2,
            a: Register::R2,
            b: Register::R3,
        };
        let word = encode(&instr).unwrap();
        assert_eq!(decode(word), instr);
    }

    #[test]
    fn test_lconst_range() {
        let ok = Instruction::Lconst { dst: Register::R4, value: 511 };
        assert_eq!(decode(encode(&ok).unwrap()), ok);

        let wide = Instruction::Lconst { dst: Register::R4, value: 512 };
        assert_eq!(encode(&wide), Err(EncodeError::ConstantTooWide(512)));
    }

    #[test]
    fn test_negative_offset() {
        let instr = Instruction::Load {
            dst: Register::R5,
            base: Register::SP,
            offset: -3,
        };
        assert_eq!(decode(encode(&instr).unwrap()), instr);

        let instr = Instruction::Store {
            src: Register::R2,
            base: Register::PC,
            offset: 2,
        };
        assert_eq!(decode(encode(&instr).unwrap()), instr);
    }

    #[test]
    fn test_branch_kinds() {
        for kind in [BranchKind::Eq, BranchKind::Ne, BranchKind::Gt, BranchKind::Lt] {
            let instr = Instruction::Branch { kind, cond: Register::R4, target: 6 };
            assert_eq!(decode(encode(&instr).unwrap()), instr);
        }
    }

    #[test]
    fn test_unclaimed_words_are_data() {
        // Non-zero low bits under the NOP/HALT nibbles, ALU func 5..7,
        // and the 0xB..0xF groups are all plain data.
        for raw in [0x0001, 0x1001, 0x2A00, 0xB000, 0xFFFF] {
            assert_eq!(decode(raw), Instruction::Word(raw));
            assert_eq!(encode(&Instruction::Word(raw)).unwrap(), raw);
        }
    }
}
