use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrMode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Immediate,
    Relative,
    Implicit,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

impl AddrMode {
    /// Number of operand bytes following the opcode byte.
    pub fn size(&self) -> u8 {
        match self {
            Self::Absolute => 2,
            Self::AbsoluteX => 2,
            Self::AbsoluteY => 2,
            Self::ZeroPage => 1,
            Self::ZeroPageX => 1,
            Self::ZeroPageY => 1,
            Self::Immediate => 1,
            Self::Relative => 1,
            Self::Implicit => 0,
            Self::Indirect => 2,
            Self::IndexedIndirect => 1,
            Self::IndirectIndexed => 1,
        }
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absolute => "absolute",
            Self::AbsoluteX => "absolute,x",
            Self::AbsoluteY => "absolute,y",
            Self::ZeroPage => "zero page",
            Self::ZeroPageX => "zero page,x",
            Self::ZeroPageY => "zero page,y",
            Self::Immediate => "immediate",
            Self::Relative => "relative",
            Self::Implicit => "implied",
            Self::Indirect => "indirect",
            Self::IndexedIndirect => "(indirect,x)",
            Self::IndirectIndexed => "(indirect),y",
        };
        f.write_str(name)
    }
}
