//! Disassembler for EDU-16 program images.
//!
//! Produces one display line per word, index-aligned with the image, so a
//! front-end can highlight the line at PC directly. Raw data words render
//! as hex literals, which the assembler accepts back as data.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single word to a display line.
pub fn disassemble_word(word: u16) -> String {
    match decode(word) {
        Instruction::Nop => "NOP".to_string(),
        Instruction::Halt => "HALT".to_string(),
        Instruction::Alu { op, dst, a, b } => {
            format!("{} {} {} {}", op.mnemonic(), dst, a, b)
        }
        Instruction::Lconst { dst, value } => format!("LCONST {dst} {value}"),
        Instruction::Load { dst, base, offset } => format!("LOAD {dst} {base} {offset}"),
        Instruction::Store { src, base, offset } => format!("STORE {src} {base} {offset}"),
        Instruction::Jmp { target } => format!("JMP {target}"),
        Instruction::Branch { kind, cond, target } => {
            format!("{} {} {}", kind.mnemonic(), cond, target)
        }
        Instruction::Word(raw) => format!("0x{raw:04x}"),
    }
}

/// Disassemble a whole image, one line per word.
pub fn disassemble(image: &[u16]) -> Vec<String> {
    image.iter().copied().map(disassemble_word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assembler::assemble;
    use crate::cpu::decode::encode;
    use crate::cpu::registers::Register;
    use crate::cpu::decode::AluOp;

    #[test]
    fn test_line_per_word() {
        let image = assemble("LCONST r2 5\nLCONST r3 3\nADD r2 r2 r3\nHALT\n").unwrap();
        let lines = disassemble(&image);
        assert_eq!(
            lines,
            vec!["LCONST r2 5", "LCONST r3 3", "ADD r2 r2 r3", "HALT"]
        );
    }

    #[test]
    fn test_data_renders_as_hex() {
        assert_eq!(disassemble_word(0xBEEF), "0xbeef");
        // ...and assembles back to the same word.
        assert_eq!(assemble("0xbeef").unwrap(), vec![0xBEEF]);
    }

    #[test]
    fn test_store_with_offset() {
        let word = encode(&Instruction::Store {
            src: Register::R2,
            base: Register::PC,
            offset: 2,
        })
        .unwrap();
        assert_eq!(disassemble_word(word), "STORE r2 pc 2");
    }

    #[test]
    fn test_alu_line() {
        let word = encode(&Instruction::Alu {
            op: AluOp::Xor,
            dst: Register::R4,
            a: Register::R4,
            b: Register::R5,
        })
        .unwrap();
        assert_eq!(disassemble_word(word), "XOR r4 r4 r5");
    }
}
