use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::addr::*;
use crate::error::Error;

// (opcode byte, opcode, addr mode, base cycles, extra cycle on page crossed)
// Ref: http://www.obelisk.me.uk/6502/reference.html
const SPEC_TABLE: &[(u8, Opcode, AddrMode, u8, bool)] = {
    use super::addr::AddrMode::*;
    use Opcode::*;
    &[
        // ADC
        (0x69, ADC, Immediate, 2, false),
        (0x65, ADC, ZeroPage, 3, false),
        (0x75, ADC, ZeroPageX, 4, false),
        (0x6D, ADC, Absolute, 4, false),
        (0x7D, ADC, AbsoluteX, 4, true),
        (0x79, ADC, AbsoluteY, 4, true),
        (0x61, ADC, IndexedIndirect, 6, false),
        (0x71, ADC, IndirectIndexed, 5, true),
        // AND
        (0x29, AND, Immediate, 2, false),
        (0x25, AND, ZeroPage, 3, false),
        (0x35, AND, ZeroPageX, 4, false),
        (0x2D, AND, Absolute, 4, false),
        (0x3D, AND, AbsoluteX, 4, true),
        (0x39, AND, AbsoluteY, 4, true),
        (0x21, AND, IndexedIndirect, 6, false),
        (0x31, AND, IndirectIndexed, 5, true),
        // ASL
        (0x0A, ASL, Implicit, 2, false),
        (0x06, ASL, ZeroPage, 5, false),
        (0x16, ASL, ZeroPageX, 6, false),
        (0x0E, ASL, Absolute, 6, false),
        (0x1E, ASL, AbsoluteX, 7, false),
        // BCC
        (0x90, BCC, Relative, 2, true),
        // BCS
        (0xB0, BCS, Relative, 2, true),
        // BEQ
        (0xF0, BEQ, Relative, 2, true),
        // BIT
        (0x24, BIT, ZeroPage, 3, false),
        (0x2C, BIT, Absolute, 4, false),
        // BMI
        (0x30, BMI, Relative, 2, true),
        // BNE
        (0xD0, BNE, Relative, 2, true),
        // BPL
        (0x10, BPL, Relative, 2, true),
        // BRK
        (0x00, BRK, Implicit, 7, false),
        // BVC
        (0x50, BVC, Relative, 2, true),
        // BVS
        (0x70, BVS, Relative, 2, true),
        // CLC
        (0x18, CLC, Implicit, 2, false),
        // CLD
        (0xD8, CLD, Implicit, 2, false),
        // CLI
        (0x58, CLI, Implicit, 2, false),
        // CLV
        (0xB8, CLV, Implicit, 2, false),
        // CMP
        (0xC9, CMP, Immediate, 2, false),
        (0xC5, CMP, ZeroPage, 3, false),
        (0xD5, CMP, ZeroPageX, 4, false),
        (0xCD, CMP, Absolute, 4, false),
        (0xDD, CMP, AbsoluteX, 4, true),
        (0xD9, CMP, AbsoluteY, 4, true),
        (0xC1, CMP, IndexedIndirect, 6, false),
        (0xD1, CMP, IndirectIndexed, 5, true),
        // CPX
        (0xE0, CPX, Immediate, 2, false),
        (0xE4, CPX, ZeroPage, 3, false),
        (0xEC, CPX, Absolute, 4, false),
        // CPY
        (0xC0, CPY, Immediate, 2, false),
        (0xC4, CPY, ZeroPage, 3, false),
        (0xCC, CPY, Absolute, 4, false),
        // DEC
        (0xC6, DEC, ZeroPage, 5, false),
        (0xD6, DEC, ZeroPageX, 6, false),
        (0xCE, DEC, Absolute, 6, false),
        (0xDE, DEC, AbsoluteX, 7, false),
        // DEX
        (0xCA, DEX, Implicit, 2, false),
        // DEY
        (0x88, DEY, Implicit, 2, false),
        // EOR
        (0x49, EOR, Immediate, 2, false),
        (0x45, EOR, ZeroPage, 3, false),
        (0x55, EOR, ZeroPageX, 4, false),
        (0x4D, EOR, Absolute, 4, false),
        (0x5D, EOR, AbsoluteX, 4, true),
        (0x59, EOR, AbsoluteY, 4, true),
        (0x41, EOR, IndexedIndirect, 6, false),
        (0x51, EOR, IndirectIndexed, 5, true),
        // INC
        (0xE6, INC, ZeroPage, 5, false),
        (0xF6, INC, ZeroPageX, 6, false),
        (0xEE, INC, Absolute, 6, false),
        (0xFE, INC, AbsoluteX, 7, false),
        // INX
        (0xE8, INX, Implicit, 2, false),
        // INY
        (0xC8, INY, Implicit, 2, false),
        // JMP
        (0x4C, JMP, Absolute, 3, false),
        (0x6C, JMP, Indirect, 5, false),
        // JSR
        (0x20, JSR, Absolute, 6, false),
        // LDA
        (0xA9, LDA, Immediate, 2, false),
        (0xA5, LDA, ZeroPage, 3, false),
        (0xB5, LDA, ZeroPageX, 4, false),
        (0xAD, LDA, Absolute, 4, false),
        (0xBD, LDA, AbsoluteX, 4, true),
        (0xB9, LDA, AbsoluteY, 4, true),
        (0xA1, LDA, IndexedIndirect, 6, false),
        (0xB1, LDA, IndirectIndexed, 5, true),
        // LDX
        (0xA2, LDX, Immediate, 2, false),
        (0xA6, LDX, ZeroPage, 3, false),
        (0xB6, LDX, ZeroPageY, 4, false),
        (0xAE, LDX, Absolute, 4, false),
        (0xBE, LDX, AbsoluteY, 4, true),
        // LDY
        (0xA0, LDY, Immediate, 2, false),
        (0xA4, LDY, ZeroPage, 3, false),
        (0xB4, LDY, ZeroPageX, 4, false),
        (0xAC, LDY, Absolute, 4, false),
        (0xBC, LDY, AbsoluteX, 4, true),
        // LSR
        (0x4A, LSR, Implicit, 2, false),
        (0x46, LSR, ZeroPage, 5, false),
        (0x56, LSR, ZeroPageX, 6, false),
        (0x4E, LSR, Absolute, 6, false),
        (0x5E, LSR, AbsoluteX, 7, false),
        // NOP
        (0xEA, NOP, Implicit, 2, false),
        // ORA
        (0x09, ORA, Immediate, 2, false),
        (0x05, ORA, ZeroPage, 3, false),
        (0x15, ORA, ZeroPageX, 4, false),
        (0x0D, ORA, Absolute, 4, false),
        (0x1D, ORA, AbsoluteX, 4, true),
        (0x19, ORA, AbsoluteY, 4, true),
        (0x01, ORA, IndexedIndirect, 6, false),
        (0x11, ORA, IndirectIndexed, 5, true),
        // PHA
        (0x48, PHA, Implicit, 3, false),
        // PHP
        (0x08, PHP, Implicit, 3, false),
        // PLA
        (0x68, PLA, Implicit, 4, false),
        // PLP
        (0x28, PLP, Implicit, 4, false),
        // ROL
        (0x2A, ROL, Implicit, 2, false),
        (0x26, ROL, ZeroPage, 5, false),
        (0x36, ROL, ZeroPageX, 6, false),
        (0x2E, ROL, Absolute, 6, false),
        (0x3E, ROL, AbsoluteX, 7, false),
        // ROR
        (0x6A, ROR, Implicit, 2, false),
        (0x66, ROR, ZeroPage, 5, false),
        (0x76, ROR, ZeroPageX, 6, false),
        (0x6E, ROR, Absolute, 6, false),
        (0x7E, ROR, AbsoluteX, 7, false),
        // RTI
        (0x40, RTI, Implicit, 6, false),
        // RTS
        (0x60, RTS, Implicit, 6, false),
        // SBC
        (0xE9, SBC, Immediate, 2, false),
        (0xE5, SBC, ZeroPage, 3, false),
        (0xF5, SBC, ZeroPageX, 4, false),
        (0xED, SBC, Absolute, 4, false),
        (0xFD, SBC, AbsoluteX, 4, true),
        (0xF9, SBC, AbsoluteY, 4, true),
        (0xE1, SBC, IndexedIndirect, 6, false),
        (0xF1, SBC, IndirectIndexed, 5, true),
        // SEC
        (0x38, SEC, Implicit, 2, false),
        // SED
        (0xF8, SED, Implicit, 2, false),
        // SEI
        (0x78, SEI, Implicit, 2, false),
        // STA
        (0x85, STA, ZeroPage, 3, false),
        (0x95, STA, ZeroPageX, 4, false),
        (0x8D, STA, Absolute, 4, false),
        (0x9D, STA, AbsoluteX, 5, false),
        (0x99, STA, AbsoluteY, 5, false),
        (0x81, STA, IndexedIndirect, 6, false),
        (0x91, STA, IndirectIndexed, 6, false),
        // STX
        (0x86, STX, ZeroPage, 3, false),
        (0x96, STX, ZeroPageY, 4, false),
        (0x8E, STX, Absolute, 4, false),
        // STY
        (0x84, STY, ZeroPage, 3, false),
        (0x94, STY, ZeroPageX, 4, false),
        (0x8C, STY, Absolute, 4, false),
        // TAX
        (0xAA, TAX, Implicit, 2, false),
        // TAY
        (0xA8, TAY, Implicit, 2, false),
        // TSX
        (0xBA, TSX, Implicit, 2, false),
        // TXA
        (0x8A, TXA, Implicit, 2, false),
        // TXS
        (0x9A, TXS, Implicit, 2, false),
        // TYA
        (0x98, TYA, Implicit, 2, false),
    ]
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PLA,
    PLP,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
}

impl FromStr for Opcode {
    type Err = Error;

    /// Mnemonics are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Opcode::*;
        let opcode = match &s.to_ascii_lowercase()[..] {
            "adc" => ADC,
            "and" => AND,
            "asl" => ASL,
            "bcc" => BCC,
            "bcs" => BCS,
            "beq" => BEQ,
            "bit" => BIT,
            "bmi" => BMI,
            "bne" => BNE,
            "bpl" => BPL,
            "brk" => BRK,
            "bvc" => BVC,
            "bvs" => BVS,
            "clc" => CLC,
            "cld" => CLD,
            "cli" => CLI,
            "clv" => CLV,
            "cmp" => CMP,
            "cpx" => CPX,
            "cpy" => CPY,
            "dec" => DEC,
            "dex" => DEX,
            "dey" => DEY,
            "eor" => EOR,
            "inc" => INC,
            "inx" => INX,
            "iny" => INY,
            "jmp" => JMP,
            "jsr" => JSR,
            "lda" => LDA,
            "ldx" => LDX,
            "ldy" => LDY,
            "lsr" => LSR,
            "nop" => NOP,
            "ora" => ORA,
            "pha" => PHA,
            "php" => PHP,
            "pla" => PLA,
            "plp" => PLP,
            "rol" => ROL,
            "ror" => ROR,
            "rti" => RTI,
            "rts" => RTS,
            "sbc" => SBC,
            "sec" => SEC,
            "sed" => SED,
            "sei" => SEI,
            "sta" => STA,
            "stx" => STX,
            "sty" => STY,
            "tax" => TAX,
            "tay" => TAY,
            "tsx" => TSX,
            "txa" => TXA,
            "txs" => TXS,
            "tya" => TYA,
            _ => {
                return Err(Error::InvalidInstruction {
                    mnemonic: s.to_string(),
                })
            }
        };
        Ok(opcode)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{:?}", self).to_lowercase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub opcode_byte: u8,
    pub opcode: Opcode,
    pub addr_mode: AddrMode,
    pub base_cycles: u8,
    pub inc_cycle_on_page_crossed: bool,
}

impl Spec {
    /// Total instruction length, opcode byte included.
    pub fn length(&self) -> usize {
        1 + self.addr_mode.size() as usize
    }
}

/// Immutable lookup of opcode encodings, keyed by mnemonic and addressing mode.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    specs: HashMap<(Opcode, AddrMode), Spec>,
}

impl OpcodeTable {
    /// The official NMOS 6502 instruction set.
    pub fn mos6502() -> OpcodeTable {
        let mut specs = HashMap::with_capacity(SPEC_TABLE.len());
        for (opcode_byte, opcode, addr_mode, base_cycles, inc_cycle_on_page_crossed) in SPEC_TABLE
        {
            specs.insert(
                (*opcode, *addr_mode),
                Spec {
                    opcode_byte: *opcode_byte,
                    opcode: *opcode,
                    addr_mode: *addr_mode,
                    base_cycles: *base_cycles,
                    inc_cycle_on_page_crossed: *inc_cycle_on_page_crossed,
                },
            );
        }
        OpcodeTable { specs }
    }

    /// Unknown mnemonics and known mnemonics used in an illegal mode are
    /// reported as different errors.
    pub fn lookup(&self, mnemonic: &str, addr_mode: AddrMode) -> Result<Spec, Error> {
        let opcode: Opcode = mnemonic.parse()?;
        self.specs
            .get(&(opcode, addr_mode))
            .copied()
            .ok_or(Error::InvalidAddressingMode {
                mnemonic: opcode.to_string(),
                mode: addr_mode,
            })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OpcodeTable::mos6502()
    }
}

#[cfg(test)]
mod test {
    use itertools::izip;

    use super::*;

    #[test]
    fn test_lookup_official_opcodes() {
        let table = OpcodeTable::mos6502();
        let mnemonics = vec!["lda", "LDA", "sta", "jmp", "bne", "sei", "ldx"];
        let modes = vec![
            AddrMode::Immediate,
            AddrMode::AbsoluteX,
            AddrMode::IndirectIndexed,
            AddrMode::Indirect,
            AddrMode::Relative,
            AddrMode::Implicit,
            AddrMode::ZeroPageY,
        ];
        let expected: Vec<(u8, usize, u8, bool)> = vec![
            (0xA9, 2, 2, false),
            (0xBD, 3, 4, true),
            (0x91, 2, 6, false),
            (0x6C, 3, 5, false),
            (0xD0, 2, 2, true),
            (0x78, 1, 2, false),
            (0xB6, 2, 4, false),
        ];
        for (mnemonic, mode, (byte, len, cycles, penalty)) in izip!(mnemonics, modes, expected) {
            let spec = table.lookup(mnemonic, mode).unwrap();
            assert_eq!(spec.opcode_byte, byte);
            assert_eq!(spec.length(), len);
            assert_eq!(spec.base_cycles, cycles);
            assert_eq!(spec.inc_cycle_on_page_crossed, penalty);
        }
    }

    #[test]
    fn test_unknown_mnemonic_and_illegal_mode_are_distinct() {
        let table = OpcodeTable::mos6502();
        assert!(matches!(
            table.lookup("xyz", AddrMode::Implicit),
            Err(Error::InvalidInstruction { .. })
        ));
        assert!(matches!(
            table.lookup("sta", AddrMode::Immediate),
            Err(Error::InvalidAddressingMode {
                mode: AddrMode::Immediate,
                ..
            })
        ));
    }

    #[test]
    fn test_table_has_every_official_encoding() {
        assert_eq!(OpcodeTable::mos6502().len(), 151);
    }
}
