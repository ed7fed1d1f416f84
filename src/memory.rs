use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const PRG_ROM_PAGE_SIZE: usize = 16384;
pub const CHR_ROM_PAGE_SIZE: usize = 8192;

/*
  CPU view of one PRG bank          PPU view of one CHR bank
  _______________ $10000            _______________ $2000
 | PRG-ROM       |                 |               |
 | Mirror        |                 | Pattern       |
 |_ _ _ _ _ _ _ _| $C000           | Tables        |
 | PRG-ROM       |                 |               |
 | Bank          |                 |               |
 |_______________| $8000           |_______________| $0000
*/
const PRG_ROM_START: u32 = 0x8000;
const PRG_ROM_MIRROR_START: u32 = 0xC000;
const PRG_ROM_END: u32 = 0xFFFF;
const CHR_ROM_END: u32 = 0x1FFF;

/// The two kinds of bank a program can write into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Prog,
    Char,
}

impl Segment {
    pub fn bank_size(&self) -> usize {
        match self {
            Segment::Prog => PRG_ROM_PAGE_SIZE,
            Segment::Char => CHR_ROM_PAGE_SIZE,
        }
    }

    /// First CPU/PPU visible address of a bank in this segment.
    pub fn base_address(&self) -> u32 {
        match self {
            Segment::Prog => PRG_ROM_START,
            Segment::Char => 0,
        }
    }
}

impl FromStr for Segment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match &s.to_ascii_lowercase()[..] {
            "prog" => Ok(Segment::Prog),
            "char" => Ok(Segment::Char),
            _ => Err(Error::Syntax {
                line: format!("{} is not a valid segment, try prog or char", s),
            }),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Prog => f.write_str("prog"),
            Segment::Char => f.write_str("char"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankKind {
    Prog,
    Char,
    /// Untyped flat space, used to lay out the final ROM image.
    Rom,
}

impl fmt::Display for BankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankKind::Prog => f.write_str("prog"),
            BankKind::Char => f.write_str("char"),
            BankKind::Rom => f.write_str("rom"),
        }
    }
}

impl From<Segment> for BankKind {
    fn from(segment: Segment) -> Self {
        match segment {
            Segment::Prog => BankKind::Prog,
            Segment::Char => BankKind::Char,
        }
    }
}

/// A zero-initialised, fixed-size block of ROM addressed the way the
/// console sees it.
#[derive(Debug, Clone)]
pub struct MemoryBank {
    kind: BankKind,
    memory: Vec<u8>,
    bytes_written: usize,
}

impl MemoryBank {
    pub fn new(size: usize, kind: BankKind) -> MemoryBank {
        MemoryBank {
            kind,
            memory: vec![0; size],
            bytes_written: 0,
        }
    }

    pub fn for_segment(segment: Segment) -> MemoryBank {
        MemoryBank::new(segment.bank_size(), segment.into())
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn read(&self, addr: u32, count: usize) -> Result<&[u8]> {
        let range = self.checked_range(addr, count)?;
        Ok(&self.memory[range])
    }

    /// Writes `bytes` at `addr` and returns how many were written.
    pub fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<usize> {
        self.patch(addr, bytes)?;
        self.bytes_written += bytes.len();
        Ok(bytes.len())
    }

    /// Overwrites bytes that were already counted by an earlier `write`.
    pub fn patch(&mut self, addr: u32, bytes: &[u8]) -> Result<()> {
        let range = self.checked_range(addr, bytes.len())?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn usage_info(&self) -> String {
        let percent_used = self.bytes_written as f64 / self.memory.len() as f64 * 100.0;
        format!(
            "(${:04X} / ${:04X}) {:.2}%",
            self.bytes_written,
            self.memory.len(),
            percent_used
        )
    }

    fn checked_range(&self, addr: u32, count: usize) -> Result<Range<usize>> {
        if count == 0 {
            return Ok(0..0);
        }
        let last_addr = addr
            .checked_add(count as u32 - 1)
            .ok_or(Error::AddressOutOfRange {
                address: addr as i64 + count as i64 - 1,
            })?;
        let from = self.normalize_address(addr)?;
        let to = self.normalize_address(last_addr)?;
        // a run that crosses from $BFFF into the mirror wraps around
        if to < from || to - from + 1 != count || to >= self.memory.len() {
            return Err(Error::AccessOutOfBounds {
                address: last_addr,
                kind: self.kind.to_string(),
            });
        }
        Ok(from..to + 1)
    }

    fn normalize_address(&self, addr: u32) -> Result<usize> {
        match self.kind {
            // if PRGROM is 16KB
            //     CPU Address Bus          PRG ROM
            //     0x8000 -> 0xBFFF: Map    0x0000 -> 0x3FFF
            //     0xC000 -> 0xFFFF: Mirror 0x0000 -> 0x3FFF
            BankKind::Prog => {
                if (PRG_ROM_START..PRG_ROM_MIRROR_START).contains(&addr) {
                    Ok((addr - PRG_ROM_START) as usize)
                } else if (PRG_ROM_MIRROR_START..=PRG_ROM_END).contains(&addr) {
                    Ok((addr - PRG_ROM_MIRROR_START) as usize)
                } else {
                    Err(Error::AccessOutsideProgRom { address: addr })
                }
            }
            BankKind::Char => {
                if addr <= CHR_ROM_END {
                    Ok(addr as usize)
                } else {
                    Err(Error::AccessOutsideCharRom { address: addr })
                }
            }
            BankKind::Rom => {
                if (addr as usize) < self.memory.len() {
                    Ok(addr as usize)
                } else {
                    Err(Error::AccessOutOfBounds {
                        address: addr,
                        kind: self.kind.to_string(),
                    })
                }
            }
        }
    }
}

/// Every PRG and CHR bank of the cartridge being built, in bank order.
#[derive(Debug, Clone)]
pub struct VirtualMemory {
    prog: Vec<MemoryBank>,
    char: Vec<MemoryBank>,
}

impl VirtualMemory {
    /// Starts with a single empty PRG bank and no CHR banks.
    pub fn new() -> VirtualMemory {
        VirtualMemory {
            prog: vec![MemoryBank::for_segment(Segment::Prog)],
            char: Vec::new(),
        }
    }

    pub fn banks(&self, segment: Segment) -> &[MemoryBank] {
        match segment {
            Segment::Prog => &self.prog,
            Segment::Char => &self.char,
        }
    }

    /// Returns the bank, creating it and any missing lower banks first.
    pub fn bank_mut(&mut self, segment: Segment, index: usize) -> &mut MemoryBank {
        let banks = match segment {
            Segment::Prog => &mut self.prog,
            Segment::Char => &mut self.char,
        };
        while banks.len() <= index {
            banks.push(MemoryBank::for_segment(segment));
        }
        &mut banks[index]
    }

    /// Lays out `header` followed by every PRG bank then every CHR bank.
    pub fn emit(&self, header: &[u8]) -> Result<Vec<u8>> {
        let rom_size = header.len()
            + PRG_ROM_PAGE_SIZE * self.prog.len()
            + CHR_ROM_PAGE_SIZE * self.char.len();
        let mut rom = MemoryBank::new(rom_size, BankKind::Rom);

        let mut offset = rom.write(0, header)?;
        for segment in [Segment::Prog, Segment::Char] {
            for bank in self.banks(segment) {
                let contents = bank.read(segment.base_address(), segment.bank_size())?;
                offset += rom.write(offset as u32, contents)?;
            }
        }
        Ok(rom.memory)
    }
}

impl Default for VirtualMemory {
    fn default() -> Self {
        VirtualMemory::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_banks_are_zeroed() {
        let prog = MemoryBank::for_segment(Segment::Prog);
        let chr = MemoryBank::for_segment(Segment::Char);
        assert_eq!(prog.size(), 0x4000);
        assert_eq!(chr.size(), 0x2000);
        assert!(prog.as_bytes().iter().all(|b| *b == 0));
        assert!(chr.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_prog_rom_is_mirrored() {
        let mut bank = MemoryBank::for_segment(Segment::Prog);
        bank.write(0xC100, b"hi there").unwrap();
        assert_eq!(bank.read(0xC100, 8).unwrap(), b"hi there");
        assert_eq!(bank.read(0x8100, 8).unwrap(), b"hi there");

        bank.write(0x8000, &[0xDE, 0xAD]).unwrap();
        assert_eq!(bank.read(0xC000, 2).unwrap(), &[0xDE, 0xAD]);
    }

    #[test]
    fn test_vectors_at_the_top_of_prog_rom() {
        let mut bank = MemoryBank::for_segment(Segment::Prog);
        for addr in [0xFFFAu32, 0xFFFC, 0xFFFE] {
            bank.write(addr, &[0xDE, 0xAD]).unwrap();
        }
        assert_eq!(
            bank.read(0xBFFA, 6).unwrap(),
            &[0xDE, 0xAD, 0xDE, 0xAD, 0xDE, 0xAD]
        );
        assert_eq!(bank.bytes_written(), 6);
    }

    #[test]
    fn test_prog_rom_access_outside_window() {
        let bank = MemoryBank::for_segment(Segment::Prog);
        assert!(matches!(
            bank.read(0x0, 0x10),
            Err(Error::AccessOutsideProgRom { address: 0 })
        ));
        assert!(matches!(
            bank.read(0xFFFF, 0x10),
            Err(Error::AccessOutsideProgRom { .. })
        ));
    }

    #[test]
    fn test_write_across_mirror_boundary_is_out_of_bounds() {
        let mut bank = MemoryBank::for_segment(Segment::Prog);
        assert!(matches!(
            bank.write(0xBFFF, &[1, 2]),
            Err(Error::AccessOutOfBounds { address: 0xC000, .. })
        ));
        assert_eq!(bank.bytes_written(), 0);
    }

    #[test]
    fn test_char_rom_has_no_mirror() {
        let mut bank = MemoryBank::for_segment(Segment::Char);
        bank.write(0x100, b"tiles").unwrap();
        assert_eq!(bank.read(0x100, 5).unwrap(), b"tiles");
        assert!(matches!(
            bank.read(0x8001, 10),
            Err(Error::AccessOutsideCharRom { address: 0x8001 })
        ));
        assert!(matches!(
            bank.write(0x1FFF, &[1, 2]),
            Err(Error::AccessOutsideCharRom { address: 0x2000 })
        ));
    }

    #[test]
    fn test_patch_does_not_count_towards_usage() {
        let mut bank = MemoryBank::for_segment(Segment::Char);
        bank.write(0, &[0; 0x20]).unwrap();
        bank.patch(0, &[1, 2, 3]).unwrap();
        assert_eq!(bank.bytes_written(), 0x20);
        assert_eq!(bank.usage_info(), "($0020 / $2000) 0.39%");
    }

    #[test]
    fn test_selecting_a_bank_fills_the_gap() {
        let mut memory = VirtualMemory::new();
        memory.bank_mut(Segment::Char, 2).write(0, &[7]).unwrap();
        assert_eq!(memory.banks(Segment::Prog).len(), 1);
        assert_eq!(memory.banks(Segment::Char).len(), 3);
        assert_eq!(memory.banks(Segment::Char)[2].as_bytes()[0], 7);
    }

    #[test]
    fn test_emit_lays_out_header_prog_then_char() {
        let mut memory = VirtualMemory::new();
        memory.bank_mut(Segment::Prog, 0).write(0xFFFF, &[0xAA]).unwrap();
        memory.bank_mut(Segment::Char, 0).write(0x0000, &[0xBB]).unwrap();
        let rom = memory.emit(&[0x4E; 16]).unwrap();
        assert_eq!(rom.len(), 16 + 0x4000 + 0x2000);
        assert_eq!(rom[15], 0x4E);
        assert_eq!(rom[16 + 0x3FFF], 0xAA);
        assert_eq!(rom[16 + 0x4000], 0xBB);
    }
}
