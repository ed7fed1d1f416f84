pub mod assembler;
pub mod cartridge;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod parser;
pub mod source;
pub mod symbol_table;

pub use assembler::Assembler;
pub use error::{AssemblyError, Error};

use cpu::OpcodeTable;
use source::MemoryLoader;

/// Assembles a complete program held in memory. `.inc` and `.incbin`
/// fail with [`Error::FileNotFound`]; use [`Assembler`] with a loader
/// for those.
pub fn assemble(asm: &str) -> Result<Vec<u8>, AssemblyError> {
    let mut assembler = Assembler::new(OpcodeTable::mos6502(), Box::new(MemoryLoader::new()));
    assembler.assemble("<source>", asm)
}
