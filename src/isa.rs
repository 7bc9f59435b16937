/// Instruction set of the modeled in-order core.
///
/// The memory model hands out `RawInstruction` records exactly as they sit in
/// instruction memory: a numeric opcode, three operand fields and a flag telling
/// whether the second source field is an immediate. The schedulers decode each
/// record into an `Op` before executing it. Unknown opcodes decode to `None` and
/// are executed as a bare PC advance.
use serde::{Deserialize, Serialize};

/// Number of architectural registers per hardware thread.
pub const REGS_COUNT: usize = 8;

/// Register file of one hardware thread.
pub type RegisterFile = [i32; REGS_COUNT];

/// The closed set of opcodes understood by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opcode {
    Nop,
    Add,
    Sub,
    Addi,
    Subi,
    Load,
    Store,
    Halt,
}

impl Opcode {
    /// Numeric encoding used in instruction memory.
    pub fn code(self) -> u32 {
        match self {
            Opcode::Nop   => 0,
            Opcode::Add   => 1,
            Opcode::Sub   => 2,
            Opcode::Addi  => 3,
            Opcode::Subi  => 4,
            Opcode::Load  => 5,
            Opcode::Store => 6,
            Opcode::Halt  => 7,
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Opcode::Nop,
            1 => Opcode::Add,
            2 => Opcode::Sub,
            3 => Opcode::Addi,
            4 => Opcode::Subi,
            5 => Opcode::Load,
            6 => Opcode::Store,
            7 => Opcode::Halt,
            other => return Err(other),
        })
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Nop   => write!(f, "NOP"),
            Opcode::Add   => write!(f, "ADD"),
            Opcode::Sub   => write!(f, "SUB"),
            Opcode::Addi  => write!(f, "ADDI"),
            Opcode::Subi  => write!(f, "SUBI"),
            Opcode::Load  => write!(f, "LOAD"),
            Opcode::Store => write!(f, "STORE"),
            Opcode::Halt  => write!(f, "HALT"),
        }
    }
}

/// An instruction record as stored in instruction memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstruction {
    /// Numeric opcode; see `Opcode::code`
    pub opcode: u32,
    /// Destination register (base address register for STORE)
    #[serde(default)]
    pub dst: usize,
    /// First source register (value register for STORE)
    #[serde(default)]
    pub src1: usize,
    /// Second source: register index or immediate, depending on `imm`
    #[serde(default)]
    pub src2: i32,
    /// Whether `src2` is an immediate. Only LOAD and STORE consult it.
    #[serde(default)]
    pub imm: bool,
}

impl RawInstruction {
    fn encode(op: Opcode, dst: usize, src1: usize, src2: i32, imm: bool) -> Self {
        RawInstruction { opcode: op.code(), dst, src1, src2, imm }
    }

    pub fn nop() -> Self {
        Self::encode(Opcode::Nop, 0, 0, 0, false)
    }

    pub fn add(dst: usize, src1: usize, src2: usize) -> Self {
        Self::encode(Opcode::Add, dst, src1, src2 as i32, false)
    }

    pub fn sub(dst: usize, src1: usize, src2: usize) -> Self {
        Self::encode(Opcode::Sub, dst, src1, src2 as i32, false)
    }

    pub fn addi(dst: usize, src1: usize, imm: i32) -> Self {
        Self::encode(Opcode::Addi, dst, src1, imm, true)
    }

    pub fn subi(dst: usize, src1: usize, imm: i32) -> Self {
        Self::encode(Opcode::Subi, dst, src1, imm, true)
    }

    /// `reg[dst] = mem[reg[base] + offset]`
    pub fn load(dst: usize, base: usize, offset: Operand) -> Self {
        let (src2, imm) = offset.encode();
        Self::encode(Opcode::Load, dst, base, src2, imm)
    }

    /// `mem[reg[base] + offset] = reg[src]`
    pub fn store(src: usize, base: usize, offset: Operand) -> Self {
        let (src2, imm) = offset.encode();
        Self::encode(Opcode::Store, base, src, src2, imm)
    }

    pub fn halt() -> Self {
        Self::encode(Opcode::Halt, 0, 0, 0, false)
    }

    /// Record with an opcode outside the known set.
    pub fn unknown(code: u32) -> Self {
        RawInstruction { opcode: code, dst: 0, src1: 0, src2: 0, imm: false }
    }
}

/// Second operand of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(usize),
    Imm(i32),
}

impl Operand {
    fn encode(self) -> (i32, bool) {
        match self {
            Operand::Reg(r) => (r as i32, false),
            Operand::Imm(v) => (v, true),
        }
    }

    /// Resolve against a register file.
    pub fn value(self, regs: &RegisterFile) -> i32 {
        match self {
            Operand::Reg(r) => regs[r],
            Operand::Imm(v) => v,
        }
    }
}

/// A decoded instruction. Every scheduler matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Add { dst: usize, src1: usize, src2: usize },
    Sub { dst: usize, src1: usize, src2: usize },
    Addi { dst: usize, src1: usize, imm: i32 },
    Subi { dst: usize, src1: usize, imm: i32 },
    Load { dst: usize, base: usize, offset: Operand },
    Store { src: usize, base: usize, offset: Operand },
    Halt,
}

impl Op {
    /// Decode a raw record. Returns `None` for an unrecognized opcode.
    pub fn decode(raw: &RawInstruction) -> Option<Op> {
        let opcode = Opcode::try_from(raw.opcode).ok()?;
        let offset = if raw.imm {
            Operand::Imm(raw.src2)
        } else {
            Operand::Reg(raw.src2 as usize)
        };
        Some(match opcode {
            Opcode::Nop   => Op::Nop,
            Opcode::Add   => Op::Add { dst: raw.dst, src1: raw.src1, src2: raw.src2 as usize },
            Opcode::Sub   => Op::Sub { dst: raw.dst, src1: raw.src1, src2: raw.src2 as usize },
            Opcode::Addi  => Op::Addi { dst: raw.dst, src1: raw.src1, imm: raw.src2 },
            Opcode::Subi  => Op::Subi { dst: raw.dst, src1: raw.src1, imm: raw.src2 },
            Opcode::Load  => Op::Load { dst: raw.dst, base: raw.src1, offset },
            Opcode::Store => Op::Store { src: raw.src1, base: raw.dst, offset },
            Opcode::Halt  => Op::Halt,
        })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Op::Nop          => Opcode::Nop,
            Op::Add { .. }   => Opcode::Add,
            Op::Sub { .. }   => Opcode::Sub,
            Op::Addi { .. }  => Opcode::Addi,
            Op::Subi { .. }  => Opcode::Subi,
            Op::Load { .. }  => Opcode::Load,
            Op::Store { .. } => Opcode::Store,
            Op::Halt         => Opcode::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_codes_round_trip() {
        for code in 0..8 {
            let op = Opcode::try_from(code).unwrap();
            assert_eq!(op.code(), code);
        }
        assert_eq!(Opcode::try_from(8), Err(8));
    }

    #[test]
    fn store_swaps_base_and_value_fields() {
        let raw = RawInstruction::store(3, 5, Operand::Imm(-4));
        assert_eq!(raw.dst, 5);
        assert_eq!(raw.src1, 3);
        assert_eq!(
            Op::decode(&raw),
            Some(Op::Store { src: 3, base: 5, offset: Operand::Imm(-4) })
        );
    }

    #[test]
    fn add_ignores_immediate_flag() {
        let mut raw = RawInstruction::add(1, 2, 3);
        raw.imm = true;
        assert_eq!(Op::decode(&raw), Some(Op::Add { dst: 1, src1: 2, src2: 3 }));
    }

    #[test]
    fn unknown_opcode_does_not_decode() {
        assert_eq!(Op::decode(&RawInstruction::unknown(42)), None);
    }

    #[test]
    fn raw_instruction_deserializes_with_defaults() {
        let raw: RawInstruction = serde_json::from_str(r#"{"opcode": 7}"#).unwrap();
        assert_eq!(raw, RawInstruction::halt());
    }
}
