//! Execution engine for the EDU-16.
//!
//! Implements the fetch-decode-execute cycle over a flat 65536-word memory.
//! The engine is deliberately front-end-agnostic: it exposes single-step,
//! a continuable flag, register snapshots, and indexed register writes,
//! and nothing else.

use crate::cpu::decode::{decode, AluOp, BranchKind, Instruction};
use crate::cpu::registers::{Register, RegisterSnapshot};
use serde::{Deserialize, Serialize};

/// Words of addressable memory.
pub const MEMORY_WORDS: usize = 1 << 16;

/// The EDU-16 CPU with its memory.
///
/// Construction loads a program image at address 0 and zero-fills the rest;
/// there is no other way to get code into the machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct ExecCpu {
    pc: u16,
    /// R2-R5, SP, LP in index order; ZX and PC live outside this file.
    regs: [u16; 6],
    mem: Vec<u16>,
    /// Set when the executing instruction wrote PC, suppressing the
    /// automatic increment for that step.
    jumped: bool,
}

impl ExecCpu {
    /// Build a CPU with `image` loaded at address 0.
    pub fn new(image: &[u16]) -> Self {
        let mut mem = image.to_vec();
        mem.truncate(MEMORY_WORDS);
        mem.resize(MEMORY_WORDS, 0);
        Self {
            pc: 0,
            regs: [0; 6],
            mem,
            jumped: false,
        }
    }

    /// Discard all state and reload from a fresh image.
    pub fn reinitialize(&mut self, image: &[u16]) {
        *self = ExecCpu::new(image);
    }

    /// Read one register. ZX reads 0.
    pub fn get_reg(&self, reg: Register) -> u16 {
        match reg {
            Register::ZX => 0,
            Register::PC => self.pc,
            Register::R2 => self.regs[0],
            Register::R3 => self.regs[1],
            Register::R4 => self.regs[2],
            Register::R5 => self.regs[3],
            Register::SP => self.regs[4],
            Register::LP => self.regs[5],
        }
    }

    /// Write one register. Writes to ZX are discarded; writes to PC
    /// redirect the next fetch.
    pub fn set_reg(&mut self, reg: Register, val: u16) {
        match reg {
            Register::ZX => (),
            Register::PC => {
                self.jumped = true;
                self.pc = val;
            }
            Register::R2 => self.regs[0] = val,
            Register::R3 => self.regs[1] = val,
            Register::R4 => self.regs[2] = val,
            Register::R5 => self.regs[3] = val,
            Register::SP => self.regs[4] = val,
            Register::LP => self.regs[5] = val,
        }
    }

    /// Write a register by its debug-interface index. Out-of-range indices
    /// are discarded like ZX writes; the debug surface has no error path.
    pub fn write_register(&mut self, index: u8, value: u16) {
        if let Some(reg) = Register::from_index(index) {
            self.set_reg(reg, value);
        }
    }

    /// Read a memory word.
    pub fn get_mem(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    /// Write a memory word.
    pub fn set_mem(&mut self, addr: u16, val: u16) {
        self.mem[addr as usize] = val;
    }

    /// A fresh snapshot of the mutable registers.
    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            pc: self.pc,
            r2: self.regs[0],
            r3: self.regs[1],
            r4: self.regs[2],
            r5: self.regs[3],
            sp: self.regs[4],
            lp: self.regs[5],
        }
    }

    /// Whether another step would execute anything: the machine is
    /// continuable until the word at PC decodes to HALT.
    pub fn is_continuable(&self) -> bool {
        !matches!(decode(self.get_mem(self.pc)), Instruction::Halt)
    }

    /// Execute exactly one instruction. A no-op when the machine is not
    /// continuable.
    pub fn single_step(&mut self) {
        if !self.is_continuable() {
            return;
        }

        let word = self.get_mem(self.pc);
        self.jumped = false;

        self.execute(decode(word));

        if !self.jumped {
            self.pc = self.pc.wrapping_add(1);
        }
    }

    fn execute(&mut self, instr: Instruction) {
        match instr {
            // Raw data executes as a no-op, same as NOP. HALT never reaches
            // here: the continuable check fences it off.
            Instruction::Nop | Instruction::Halt | Instruction::Word(_) => (),

            Instruction::Alu { op, dst, a, b } => {
                let a = self.get_reg(a);
                let b = self.get_reg(b);
                let result = match op {
                    AluOp::Add => a.wrapping_add(b),
                    AluOp::Sub => a.wrapping_sub(b),
                    AluOp::And => a & b,
                    AluOp::Or => a | b,
                    AluOp::Xor => a ^ b,
                };
                self.set_reg(dst, result);
            }

            Instruction::Lconst { dst, value } => self.set_reg(dst, value),

            Instruction::Load { dst, base, offset } => {
                let addr = self.effective_address(base, offset);
                let val = self.get_mem(addr);
                self.set_reg(dst, val);
            }

            Instruction::Store { src, base, offset } => {
                let addr = self.effective_address(base, offset);
                let val = self.get_reg(src);
                self.set_mem(addr, val);
            }

            Instruction::Jmp { target } => self.set_reg(Register::PC, target),

            Instruction::Branch { kind, cond, target } => {
                let val = self.get_reg(cond);
                let taken = match kind {
                    BranchKind::Eq => val == 0,
                    BranchKind::Ne => val != 0,
                    BranchKind::Gt => (val as i16) > 0,
                    BranchKind::Lt => (val as i16) < 0,
                };
                if taken {
                    self.set_reg(Register::PC, target);
                }
            }
        }
    }

    fn effective_address(&self, base: Register, offset: i8) -> u16 {
        self.get_reg(base).wrapping_add(i16::from(offset) as u16)
    }
}

impl std::fmt::Debug for ExecCpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCpu")
            .field("pc", &self.pc)
            .field("regs", &self.regs)
            .field("continuable", &self.is_continuable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;

    fn image(instrs: &[Instruction]) -> Vec<u16> {
        instrs.iter().map(|i| encode(i).unwrap()).collect()
    }

    fn run_to_halt(cpu: &mut ExecCpu, cap: usize) -> usize {
        let mut steps = 0;
        while cpu.is_continuable() && steps < cap {
            cpu.single_step();
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_lconst_add_halt() {
        let mut cpu = ExecCpu::new(&image(&[
            Instruction::Lconst { dst: Register::R2, value: 5 },
            Instruction::Lconst { dst: Register::R3, value: 3 },
            Instruction::Alu {
                op: AluOp::Add,
                dst: Register::R2,
                a: Register::R2,
                b: Register::R3,
            },
            Instruction::Halt,
        ]));

        assert_eq!(run_to_halt(&mut cpu, 100), 3);
        assert_eq!(cpu.get_reg(Register::R2), 8);
        assert_eq!(cpu.get_reg(Register::PC), 3);
        assert!(!cpu.is_continuable());
    }

    #[test]
    fn test_step_at_halt_is_noop() {
        let mut cpu = ExecCpu::new(&image(&[Instruction::Halt]));
        assert!(!cpu.is_continuable());

        let before = cpu.snapshot();
        cpu.single_step();
        assert_eq!(cpu.snapshot(), before);
    }

    #[test]
    fn test_zero_register_pinned() {
        let mut cpu = ExecCpu::new(&[]);
        cpu.write_register(0, 0xBEEF);
        assert_eq!(cpu.get_reg(Register::ZX), 0);

        // Out-of-range debug index is discarded too.
        let before = cpu.snapshot();
        cpu.write_register(9, 1);
        assert_eq!(cpu.snapshot(), before);
    }

    #[test]
    fn test_pc_write_redirects_fetch() {
        let mut cpu = ExecCpu::new(&image(&[
            Instruction::Jmp { target: 2 },
            Instruction::Lconst { dst: Register::R2, value: 1 }, // skipped
            Instruction::Halt,
        ]));
        assert_eq!(run_to_halt(&mut cpu, 100), 1);
        assert_eq!(cpu.get_reg(Register::R2), 0);
        assert_eq!(cpu.get_reg(Register::PC), 2);
    }

    #[test]
    fn test_branch_selects_path() {
        // r4 = 0 takes the JEQ to the AND at 5; the ADD path is skipped.
        let program = image(&[
            Instruction::Lconst { dst: Register::R2, value: 0b1101 },
            Instruction::Lconst { dst: Register::R3, value: 0b1011 },
            Instruction::Branch { kind: BranchKind::Eq, cond: Register::R4, target: 5 },
            Instruction::Alu {
                op: AluOp::Add,
                dst: Register::R2,
                a: Register::R2,
                b: Register::R3,
            },
            Instruction::Jmp { target: 6 },
            Instruction::Alu {
                op: AluOp::And,
                dst: Register::R2,
                a: Register::R2,
                b: Register::R3,
            },
            Instruction::Halt,
        ]);

        let mut cpu = ExecCpu::new(&program);
        run_to_halt(&mut cpu, 100);
        assert_eq!(cpu.get_reg(Register::R2), 0b1001);

        // Flip the selector: r4 != 0 falls through to the ADD.
        let mut cpu = ExecCpu::new(&program);
        cpu.write_register(4, 1);
        run_to_halt(&mut cpu, 100);
        assert_eq!(cpu.get_reg(Register::R2), 0b1101 + 0b1011);
    }

    #[test]
    fn test_store_load_roundtrip() {
        let mut cpu = ExecCpu::new(&image(&[
            Instruction::Lconst { dst: Register::R2, value: 42 },
            Instruction::Lconst { dst: Register::SP, value: 100 },
            Instruction::Store { src: Register::R2, base: Register::SP, offset: -1 },
            Instruction::Load { dst: Register::R5, base: Register::SP, offset: -1 },
            Instruction::Halt,
        ]));
        run_to_halt(&mut cpu, 100);
        assert_eq!(cpu.get_mem(99), 42);
        assert_eq!(cpu.get_reg(Register::R5), 42);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let mut cpu = ExecCpu::new(&image(&[
            Instruction::Lconst { dst: Register::R2, value: 1 },
            Instruction::Alu {
                op: AluOp::Sub,
                dst: Register::R3,
                a: Register::ZX,
                b: Register::R2,
            },
            Instruction::Halt,
        ]));
        run_to_halt(&mut cpu, 100);
        assert_eq!(cpu.get_reg(Register::R3), 0xFFFF);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_zero_register_always_reads_zero(value: u16) {
                let mut cpu = ExecCpu::new(&[]);
                cpu.write_register(0, value);
                prop_assert_eq!(cpu.get_reg(Register::ZX), 0);
            }

            #[test]
            fn prop_step_at_halt_never_mutates(r2: u16, sp: u16) {
                let mut cpu = ExecCpu::new(&image(&[Instruction::Halt]));
                cpu.write_register(2, r2);
                cpu.write_register(6, sp);
                let before = cpu.snapshot();
                cpu.single_step();
                cpu.single_step();
                prop_assert_eq!(cpu.snapshot(), before);
            }

            #[test]
            fn prop_add_wraps_to_word_width(a: u16, b: u16) {
                let mut cpu = ExecCpu::new(&image(&[
                    Instruction::Alu {
                        op: AluOp::Add,
                        dst: Register::R4,
                        a: Register::R2,
                        b: Register::R3,
                    },
                    Instruction::Halt,
                ]));
                cpu.write_register(2, a);
                cpu.write_register(3, b);
                cpu.single_step();
                prop_assert_eq!(cpu.get_reg(Register::R4), a.wrapping_add(b));
            }
        }
    }

    #[test]
    fn test_reinitialize_discards_state() {
        let mut cpu = ExecCpu::new(&image(&[
            Instruction::Lconst { dst: Register::R2, value: 7 },
            Instruction::Halt,
        ]));
        run_to_halt(&mut cpu, 100);
        assert_eq!(cpu.get_reg(Register::R2), 7);

        cpu.reinitialize(&image(&[Instruction::Halt]));
        assert_eq!(cpu.get_reg(Register::R2), 0);
        assert_eq!(cpu.get_reg(Register::PC), 0);
        assert!(!cpu.is_continuable());
    }
}
