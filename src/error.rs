//! Error types for the assembler

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::AddrMode;

/// Everything that can abort an assembly.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error: {line}")]
    Syntax { line: String },

    #[error("Invalid instruction: {mnemonic}")]
    InvalidInstruction { mnemonic: String },

    #[error("{mnemonic} cannot be used in {mode} mode")]
    InvalidAddressingMode { mnemonic: String, mode: AddrMode },

    #[error("Address ${address:04X} is out of range")]
    AddressOutOfRange { address: i64 },

    #[error("Branch target is {displacement} bytes away, outside -128..=127")]
    BranchOutOfRange { displacement: i64 },

    #[error("For {mnemonic} in {mode} mode, only 8-bit values are allowed, got ${value:X}")]
    ArgumentTooLarge {
        mnemonic: String,
        mode: AddrMode,
        value: i64,
    },

    #[error("Value ${value:X} is too large for one byte")]
    ByteTooLarge { value: i64 },

    #[error("Undefined symbol: {name}")]
    UndefinedSymbol { name: String },

    #[error("Symbol {name} is already defined in this scope")]
    SymbolRedefined { name: String },

    #[error("Invalid expression: {expression}")]
    InvalidExpression { expression: String },

    #[error("Invalid scope: {message}")]
    InvalidScope { message: String },

    #[error("You cannot exit global scope")]
    CantExitScope,

    #[error("Address ${address:04X} is out of bounds in this {kind} bank")]
    AccessOutOfBounds { address: u32, kind: String },

    #[error("Address ${address:04X} is outside PROG ROM")]
    AccessOutsideProgRom { address: u32 },

    #[error("Address ${address:04X} is outside CHAR ROM")]
    AccessOutsideCharRom { address: u32 },

    #[error("The iNES header has already been set")]
    InesHeaderAlreadySet,

    #[error("No iNES header was set, add an .ines directive")]
    InesHeaderMissing,

    #[error("Invalid iNES header: {message}")]
    InvalidInesHeader { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(".inc nested deeper than {depth} files")]
    IncludeDepthExceeded { depth: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Included(Box<AssemblyError>),
}

impl Error {
    pub fn is_undefined_symbol(&self) -> bool {
        matches!(self, Error::UndefinedSymbol { .. })
    }
}

/// Result type for assembler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Where a source line came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub file: String,
    /// 1-based
    pub number: usize,
    pub text: String,
}

/// An [`Error`] together with the line that caused it, if any.
#[derive(Debug)]
pub struct AssemblyError {
    pub location: Option<SourceLine>,
    pub error: Error,
}

impl AssemblyError {
    pub fn at(location: SourceLine, error: Error) -> AssemblyError {
        // errors raised inside an included file are already located there
        match error {
            Error::Included(inner) => *inner,
            error => AssemblyError {
                location: Some(location),
                error,
            },
        }
    }
}

impl From<Error> for AssemblyError {
    fn from(error: Error) -> Self {
        match error {
            Error::Included(inner) => *inner,
            error => AssemblyError {
                location: None,
                error,
            },
        }
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}\n  --> {}:{}\n   | {}",
                self.error,
                loc.file,
                loc.number,
                loc.text.trim()
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        // the message already includes `error`
        std::error::Error::source(&self.error)
    }
}
