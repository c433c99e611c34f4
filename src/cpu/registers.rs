//! EDU-16 registers.
//!
//! The EDU-16 has 8 architecturally visible 16-bit registers:
//! - ZX: hardwired zero (reads 0, writes discarded)
//! - PC: program counter
//! - R2-R5: general purpose
//! - SP: stack pointer
//! - LP: link pointer
//!
//! The numeric indices below are part of the machine's debug interface and
//! must match what front-ends use when poking registers by number.

use serde::{Deserialize, Serialize};

/// Number of architecturally visible registers.
pub const REGISTER_COUNT: u8 = 8;

/// An EDU-16 register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    /// Constant zero.
    ZX = 0,
    /// Program counter.
    PC = 1,
    /// General purpose.
    R2 = 2,
    /// General purpose.
    R3 = 3,
    /// General purpose.
    R4 = 4,
    /// General purpose.
    R5 = 5,
    /// Stack pointer.
    SP = 6,
    /// Link pointer.
    LP = 7,
}

impl Register {
    /// All registers, in index order.
    pub const ALL: [Register; 8] = [
        Register::ZX,
        Register::PC,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::SP,
        Register::LP,
    ];

    /// Look up a register by its debug-interface index (0..=7).
    pub fn from_index(index: u8) -> Option<Register> {
        Register::ALL.get(index as usize).copied()
    }

    /// The debug-interface index of this register.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Decode a 3-bit register field from an instruction word.
    pub(crate) fn from_bits(bits: u16) -> Register {
        // A 3-bit field covers the full register set, so this cannot miss.
        Register::ALL[(bits & 0b111) as usize]
    }

    /// Parse an assembly-source register name (case-insensitive).
    pub fn parse(name: &str) -> Option<Register> {
        match name.to_ascii_lowercase().as_str() {
            "zx" | "r0" => Some(Register::ZX),
            "pc" => Some(Register::PC),
            "r2" => Some(Register::R2),
            "r3" => Some(Register::R3),
            "r4" => Some(Register::R4),
            "r5" => Some(Register::R5),
            "sp" => Some(Register::SP),
            "lp" => Some(Register::LP),
            _ => None,
        }
    }

    /// The assembly-source name of this register.
    pub fn name(self) -> &'static str {
        match self {
            Register::ZX => "zx",
            Register::PC => "pc",
            Register::R2 => "r2",
            Register::R3 => "r3",
            Register::R4 => "r4",
            Register::R5 => "r5",
            Register::SP => "sp",
            Register::LP => "lp",
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A point-in-time read of the mutable register set.
///
/// ZX is omitted: it always reads 0. Snapshots are produced by the engine
/// and never computed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    /// Program counter.
    pub pc: u16,
    /// General purpose.
    pub r2: u16,
    /// General purpose.
    pub r3: u16,
    /// General purpose.
    pub r4: u16,
    /// General purpose.
    pub r5: u16,
    /// Stack pointer.
    pub sp: u16,
    /// Link pointer.
    pub lp: u16,
}

impl RegisterSnapshot {
    /// Read one register from the snapshot; ZX reads 0.
    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::ZX => 0,
            Register::PC => self.pc,
            Register::R2 => self.r2,
            Register::R3 => self.r3,
            Register::R4 => self.r4,
            Register::R5 => self.r5,
            Register::SP => self.sp,
            Register::LP => self.lp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for reg in Register::ALL {
            assert_eq!(Register::from_index(reg.index()), Some(reg));
        }
        assert_eq!(Register::from_index(8), None);
    }

    #[test]
    fn test_index_convention() {
        // Fixed by the debug interface: 0=ZX, 1=PC, 2-5 general, 6=SP, 7=LP.
        assert_eq!(Register::ZX.index(), 0);
        assert_eq!(Register::PC.index(), 1);
        assert_eq!(Register::SP.index(), 6);
        assert_eq!(Register::LP.index(), 7);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Register::parse("R2"), Some(Register::R2));
        assert_eq!(Register::parse("pc"), Some(Register::PC));
        assert_eq!(Register::parse("r0"), Some(Register::ZX));
        assert_eq!(Register::parse("r9"), None);
    }

    #[test]
    fn test_snapshot_zx_reads_zero() {
        let snap = RegisterSnapshot { pc: 3, r2: 8, ..Default::default() };
        assert_eq!(snap.get(Register::ZX), 0);
        assert_eq!(snap.get(Register::R2), 8);
    }
}
