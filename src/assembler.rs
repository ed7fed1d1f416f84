//! Drives decoded lines against the assembler state and emits the ROM.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::cartridge::InesHeader;
use crate::cpu::OpcodeTable;
use crate::error::{AssemblyError, Error, Result, SourceLine};
use crate::memory::{Segment, VirtualMemory};
use crate::parser::{Instruction, LineDecoder, Operand, SourceUnit, PLACEHOLDER};
use crate::source::{IncludePath, SourceLoader};
use crate::symbol_table::{scope_label, SymbolRef, SymbolTable};

/// How deep `.inc` files may nest.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Where the next byte goes, and which scope names resolve against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerState {
    pub program_counter: u32,
    pub segment: Segment,
    pub bank: usize,
    pub scope_stack: Vec<String>,
}

/// What a resolved value turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Instruction(Instruction),
    Word,
    Byte,
}

impl Encoding {
    fn encode(&self, value: i64, pc: u32) -> Result<Vec<u8>> {
        match self {
            Encoding::Instruction(instruction) => instruction.encode(value, pc),
            Encoding::Word => {
                let word =
                    u16::try_from(value).map_err(|_| Error::AddressOutOfRange { address: value })?;
                Ok(word.to_le_bytes().to_vec())
            }
            Encoding::Byte => {
                let byte = u8::try_from(value).map_err(|_| Error::ByteTooLarge { value })?;
                Ok(vec![byte])
            }
        }
    }

    fn placeholder(&self) -> Vec<u8> {
        match self {
            Encoding::Instruction(instruction) => instruction.placeholder(),
            Encoding::Word => PLACEHOLDER.to_vec(),
            Encoding::Byte => PLACEHOLDER[..1].to_vec(),
        }
    }
}

/// A write that waits for a symbol defined later in the source.
///
/// Holds the state from just before its placeholder was written, so
/// replaying it patches the same bytes and resolves names in the same
/// scope, whatever the assembler is doing by then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise {
    pub state: AssemblerState,
    pub symbol: SymbolRef,
    pub encoding: Encoding,
    pub origin: SourceLine,
}

pub struct Assembler {
    opcodes: OpcodeTable,
    loader: Box<dyn SourceLoader>,
    symbol_table: SymbolTable,
    memory: VirtualMemory,
    ines_header: Option<InesHeader>,
    program_counter: u32,
    segment: Segment,
    bank: usize,
    promises: Vec<Promise>,
    include_depth: usize,
}

impl Assembler {
    pub fn new(opcodes: OpcodeTable, loader: Box<dyn SourceLoader>) -> Assembler {
        Assembler {
            opcodes,
            loader,
            symbol_table: SymbolTable::new(),
            memory: VirtualMemory::new(),
            ines_header: None,
            program_counter: 0,
            segment: Segment::Prog,
            bank: 0,
            promises: Vec::new(),
            include_depth: 0,
        }
    }

    /// Runs both passes over `source` and returns the ROM image.
    pub fn assemble(
        &mut self,
        file: &str,
        source: &str,
    ) -> std::result::Result<Vec<u8>, AssemblyError> {
        self.assemble_source(file, source)?;
        self.fulfill_promises()?;
        self.emit_rom()
    }

    /// Executes every line of `source`; forward references are queued,
    /// not resolved.
    pub fn assemble_source(
        &mut self,
        file: &str,
        source: &str,
    ) -> std::result::Result<(), AssemblyError> {
        if self.include_depth == 0 {
            info!("Assembling {}", file);
        }
        for (i, text) in source.lines().enumerate() {
            let line = SourceLine {
                file: file.to_string(),
                number: i + 1,
                text: text.to_string(),
            };
            self.assemble_line(&line)?;
        }
        Ok(())
    }

    pub fn assemble_line(&mut self, line: &SourceLine) -> std::result::Result<(), AssemblyError> {
        let result = match LineDecoder::new(&self.opcodes).decode(&line.text) {
            Ok(Some(unit)) => self.execute(unit, line),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        result.map_err(|e| AssemblyError::at(line.clone(), e))
    }

    /// Replays queued promises, newest first. A symbol that is still
    /// undefined now is an error.
    pub fn fulfill_promises(&mut self) -> std::result::Result<(), AssemblyError> {
        info!("Resolving {} forward references", self.promises.len());
        while let Some(promise) = self.promises.pop() {
            self.fulfill(&promise)
                .map_err(|e| AssemblyError::at(promise.origin.clone(), e))?;
        }
        Ok(())
    }

    /// iNES header, then every PRG bank, then every CHR bank.
    pub fn emit_rom(&self) -> std::result::Result<Vec<u8>, AssemblyError> {
        let header = self.ines_header.as_ref().ok_or(Error::InesHeaderMissing)?;
        let prog_banks = self.memory.banks(Segment::Prog).len();
        let char_banks = self.memory.banks(Segment::Char).len();
        if usize::from(header.prog) != prog_banks || usize::from(header.char) != char_banks {
            warn!(
                "iNES header declares {} PROG and {} CHAR banks, but {} PROG and {} CHAR banks were used",
                header.prog, header.char, prog_banks, char_banks
            );
        }
        Ok(self.memory.emit(&header.to_bytes())?)
    }

    /// One line per bank, e.g. `PROG ROM bank 0: ($0010 / $4000) 0.10%`.
    pub fn bank_usage(&self) -> Vec<String> {
        let mut report = vec!["iNES 1.0 Header: $10 bytes".to_string()];
        for (segment, name) in [(Segment::Prog, "PROG"), (Segment::Char, "CHAR")] {
            for (number, bank) in self.memory.banks(segment).iter().enumerate() {
                report.push(format!("{} ROM bank {}: {}", name, number, bank.usage_info()));
            }
        }
        report
    }

    pub fn log_bank_usage(&self) {
        info!("ROM Structure");
        for line in self.bank_usage() {
            info!("  {}", line);
        }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn memory(&self) -> &VirtualMemory {
        &self.memory
    }

    pub fn pending_promises(&self) -> &[Promise] {
        &self.promises
    }

    pub fn state(&self) -> AssemblerState {
        AssemblerState {
            program_counter: self.program_counter,
            segment: self.segment,
            bank: self.bank,
            scope_stack: self.symbol_table.scope_stack().to_vec(),
        }
    }

    fn execute(&mut self, unit: SourceUnit, line: &SourceLine) -> Result<()> {
        match unit {
            SourceUnit::Label(name) => {
                let address = self.address()?;
                self.symbol_table.define_symbol(&name, address)
            }
            SourceUnit::Instruction(instruction) => {
                self.symbol_table
                    .add_cycles(u64::from(instruction.spec.base_cycles));
                let operand = instruction.operand.clone();
                self.emit(&operand, Encoding::Instruction(instruction), line)
            }
            SourceUnit::InesHeader(header) => {
                if self.ines_header.is_some() {
                    return Err(Error::InesHeaderAlreadySet);
                }
                self.ines_header = Some(header);
                Ok(())
            }
            SourceUnit::Org(address) => {
                self.program_counter = u32::from(address);
                Ok(())
            }
            SourceUnit::Segment { segment, bank } => {
                self.memory.bank_mut(segment, bank);
                self.segment = segment;
                self.bank = bank;
                debug!("Switched to {} bank {}", segment, bank);
                Ok(())
            }
            SourceUnit::IncBin(path) => {
                let bytes = self.loader.load_binary(&path)?;
                debug!("Including {} bytes from {}", bytes.len(), path);
                self.write_memory(&bytes)
            }
            SourceUnit::Include(path) => self.include(&path),
            SourceUnit::DefineWord(operand) => self.emit(&operand, Encoding::Word, line),
            SourceUnit::Bytes(operands) => operands
                .iter()
                .try_for_each(|operand| self.emit(operand, Encoding::Byte, line)),
            SourceUnit::Ascii(text) => self.write_memory(text.as_bytes()),
            SourceUnit::EnterScope(name) => {
                let address = self.address()?;
                let entered = self.symbol_table.enter_scope(name.as_deref())?;
                if name.is_some() {
                    self.symbol_table
                        .define_symbol(&scope_label(&entered), address)?;
                }
                debug!("Entered scope {}", self.symbol_table.scope_stack().join("."));
                Ok(())
            }
            SourceUnit::ExitScope => {
                let exited = self.symbol_table.exit_scope()?;
                debug!("Exited scope {}", exited);
                Ok(())
            }
            SourceUnit::ReserveSpace { name, size } => {
                let address = self.address()?;
                self.symbol_table.define_symbol(&name, address)?;
                let end = u64::from(address) + size as u64;
                if end > 0xFFFF {
                    return Err(Error::AddressOutOfRange {
                        address: end as i64,
                    });
                }
                self.program_counter = end as u32;
                Ok(())
            }
        }
    }

    // Writes a resolved operand now, or a placeholder plus a promise.
    fn emit(&mut self, operand: &Operand, encoding: Encoding, line: &SourceLine) -> Result<()> {
        let value = match operand {
            Operand::None => 0,
            Operand::Value(value) => i64::from(*value),
            Operand::Symbol(symbol) => match self.symbol_table.resolve(symbol) {
                Ok(value) => value,
                Err(e) if e.is_undefined_symbol() => {
                    let placeholder = encoding.placeholder();
                    let promise = Promise {
                        state: self.state(),
                        symbol: symbol.clone(),
                        encoding,
                        origin: line.clone(),
                    };
                    debug!(
                        "Deferring {} at ${:04X} ({} {})",
                        symbol, promise.state.program_counter, promise.state.segment, promise.state.bank
                    );
                    self.promises.push(promise);
                    return self.write_memory(&placeholder);
                }
                Err(e) => return Err(e),
            },
        };
        let bytes = encoding.encode(value, self.program_counter)?;
        self.write_memory(&bytes)
    }

    fn fulfill(&mut self, promise: &Promise) -> Result<()> {
        let state = &promise.state;
        let value = self
            .symbol_table
            .resolve_in(&state.scope_stack, &promise.symbol)?;
        let bytes = promise.encoding.encode(value, state.program_counter)?;
        trace!(
            "Patching ${:04X}: {}",
            state.program_counter,
            bytes.iter().map(|b| format!("{:02X}", b)).join(" ")
        );
        self.memory
            .bank_mut(state.segment, state.bank)
            .patch(state.program_counter, &bytes)
    }

    fn include(&mut self, path: &IncludePath) -> Result<()> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeDepthExceeded {
                depth: MAX_INCLUDE_DEPTH,
            });
        }
        let source = self.loader.load_source(path)?;
        debug!("Including {}", path.name());
        self.include_depth += 1;
        let result = self.assemble_source(path.name(), &source);
        self.include_depth -= 1;
        result.map_err(|e| Error::Included(Box::new(e)))
    }

    fn write_memory(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self
            .memory
            .bank_mut(self.segment, self.bank)
            .write(self.program_counter, bytes)?;
        trace!(
            "${:04X}: {}",
            self.program_counter,
            bytes.iter().map(|b| format!("{:02X}", b)).join(" ")
        );
        self.program_counter += written as u32;
        Ok(())
    }

    // The program counter as an address a symbol can hold.
    fn address(&self) -> Result<u16> {
        u16::try_from(self.program_counter).map_err(|_| Error::AddressOutOfRange {
            address: i64::from(self.program_counter),
        })
    }
}
