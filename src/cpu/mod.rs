pub mod addr;
pub mod spec;

pub use addr::AddrMode;
pub use spec::{Opcode, OpcodeTable, Spec};
