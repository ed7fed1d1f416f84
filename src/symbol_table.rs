//! Scoped symbol table for labels, scopes and reserved space.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

pub const GLOBAL_SCOPE: &str = "global";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    fn symbol(&self) -> char {
        match self {
            ArithmeticOp::Add => '+',
            ArithmeticOp::Sub => '-',
            ArithmeticOp::Mul => '*',
            ArithmeticOp::Div => '/',
        }
    }
}

/// Picks one byte out of a resolved 16-bit value (`#<label`, `#>label`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteSelector {
    Low,
    High,
}

impl ByteSelector {
    pub fn apply(&self, value: i64) -> i64 {
        match self {
            ByteSelector::Low => value & 0xFF,
            ByteSelector::High => (value & 0xFF00) >> 8,
        }
    }
}

/// A reference to a symbol as written in an operand, e.g. `>sprites.table+2`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub name: String,
    pub arithmetic: Option<(ArithmeticOp, i64)>,
    pub selector: Option<ByteSelector>,
}

impl SymbolRef {
    /// Splits a trailing `<op><integer>` suffix off `text`.
    pub fn parse(text: &str) -> Result<SymbolRef> {
        lazy_static! {
            static ref ARITHMETIC_RE: Regex = Regex::new(r"^(.+?)([+\-*/])(\d+)$").unwrap();
        }
        let cap = match ARITHMETIC_RE.captures(text) {
            Some(cap) => cap,
            None => {
                return Ok(SymbolRef {
                    name: text.to_string(),
                    arithmetic: None,
                    selector: None,
                })
            }
        };
        let op = match &cap[2] {
            "+" => ArithmeticOp::Add,
            "-" => ArithmeticOp::Sub,
            "*" => ArithmeticOp::Mul,
            _ => ArithmeticOp::Div,
        };
        let argument: i64 = cap[3].parse().map_err(|_| Error::InvalidExpression {
            expression: text.to_string(),
        })?;
        Ok(SymbolRef {
            name: cap[1].to_string(),
            arithmetic: Some((op, argument)),
            selector: None,
        })
    }

    pub fn with_selector(mut self, selector: Option<ByteSelector>) -> SymbolRef {
        self.selector = selector;
        self
    }

    fn apply_arithmetic(&self, value: i64) -> Result<i64> {
        let (op, argument) = match self.arithmetic {
            Some(arithmetic) => arithmetic,
            None => return Ok(value),
        };
        let result = match op {
            ArithmeticOp::Add => value.checked_add(argument),
            ArithmeticOp::Sub => value.checked_sub(argument),
            ArithmeticOp::Mul => value.checked_mul(argument),
            ArithmeticOp::Div => value.checked_div(argument),
        };
        result.ok_or_else(|| Error::InvalidExpression {
            expression: self.to_string(),
        })
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector {
            Some(ByteSelector::Low) => f.write_str("<")?,
            Some(ByteSelector::High) => f.write_str(">")?,
            None => {}
        }
        f.write_str(&self.name)?;
        if let Some((op, argument)) = self.arithmetic {
            write!(f, "{}{}", op.symbol(), argument)?;
        }
        Ok(())
    }
}

/// Name under which a scope's own address is stored inside that scope.
/// The leading `-` cannot appear in source identifiers.
pub fn scope_label(name: &str) -> String {
    format!("-{}", name)
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Scope {
    #[serde(serialize_with = "serialize_hex_values")]
    symbols: BTreeMap<String, u16>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    scopes: BTreeMap<String, Scope>,
}

impl Scope {
    // plain bindings win over scope labels
    fn lookup(&self, name: &str, label: &str) -> Option<u16> {
        self.symbols
            .get(name)
            .or_else(|| self.symbols.get(label))
            .or_else(|| self.scopes.get(name).and_then(|s| s.symbols.get(label)))
            .copied()
    }
}

fn serialize_hex_values<S>(
    symbols: &BTreeMap<String, u16>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(
        symbols
            .iter()
            .map(|(name, value)| (name, format!("0x{:04X}", value))),
    )
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    root: Scope,
    scope_stack: Vec<String>,
    anonymous_scope_number: usize,
    subroutine_cycles: BTreeMap<String, u64>,
}

impl SymbolTable {
    /// Starts out in the global scope.
    pub fn new() -> SymbolTable {
        SymbolTable {
            root: Scope::default(),
            scope_stack: vec![GLOBAL_SCOPE.to_string()],
            anonymous_scope_number: 0,
            subroutine_cycles: BTreeMap::new(),
        }
    }

    pub fn scope_stack(&self) -> &[String] {
        &self.scope_stack
    }

    /// Creates a child of the current scope and makes it current. Returns
    /// the scope's name, which is generated when `name` is `None`.
    pub fn enter_scope(&mut self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.generate_name(),
        };
        let scope = self.current_scope_mut()?;
        if scope.scopes.contains_key(&name) {
            return Err(Error::InvalidScope {
                message: format!("Scope: {} already exists", name),
            });
        }
        scope.scopes.insert(name.clone(), Scope::default());
        self.scope_stack.push(name.clone());
        Ok(name)
    }

    pub fn exit_scope(&mut self) -> Result<String> {
        if self.scope_stack.len() == 1 {
            return Err(Error::CantExitScope);
        }
        self.scope_stack.pop().ok_or(Error::CantExitScope)
    }

    pub fn define_symbol(&mut self, name: &str, value: u16) -> Result<()> {
        let scope = self.current_scope_mut()?;
        if scope.symbols.contains_key(name) {
            return Err(Error::SymbolRedefined {
                name: name.to_string(),
            });
        }
        scope.symbols.insert(name.to_string(), value);
        Ok(())
    }

    /// Resolves `name`, which may carry an arithmetic suffix, from the
    /// current scope.
    pub fn resolve_symbol(&self, name: &str) -> Result<i64> {
        self.resolve(&SymbolRef::parse(name)?)
    }

    pub fn resolve(&self, symbol: &SymbolRef) -> Result<i64> {
        self.resolve_in(&self.scope_stack, symbol)
    }

    /// Resolves `symbol` as if `scope_stack` were the active scope stack.
    /// Byte selectors are left for the caller to apply.
    pub fn resolve_in(&self, scope_stack: &[String], symbol: &SymbolRef) -> Result<i64> {
        let value = if symbol.name.contains('.') {
            self.resolve_dotted(&symbol.name)
        } else {
            self.resolve_scoped(scope_stack, &symbol.name)
        };
        match value {
            Some(value) => symbol.apply_arithmetic(i64::from(value)),
            None => Err(Error::UndefinedSymbol {
                name: symbol.name.clone(),
            }),
        }
    }

    /// Adds to the running total of the enclosing top level scope, if any.
    pub fn add_cycles(&mut self, cycles: u64) {
        if let Some(top_level) = self.scope_stack.get(1) {
            *self
                .subroutine_cycles
                .entry(top_level.clone())
                .or_insert(0) += cycles;
        }
    }

    pub fn subroutine_cycles(&self) -> &BTreeMap<String, u64> {
        &self.subroutine_cycles
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        let mut tree = BTreeMap::new();
        tree.insert(GLOBAL_SCOPE, &self.root);
        serde_json::to_string_pretty(&tree)
    }

    pub fn export_cycle_count_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.subroutine_cycles)
    }

    // Walk outwards from the innermost scope; the first hit shadows the rest.
    fn resolve_scoped(&self, scope_stack: &[String], name: &str) -> Option<u16> {
        let label = scope_label(name);
        (1..=scope_stack.len()).rev().find_map(|depth| {
            self.retrieve_scope(&scope_stack[..depth])
                .and_then(|scope| scope.lookup(name, &label))
        })
    }

    // Absolute path from the root, a leading `global` is optional.
    fn resolve_dotted(&self, name: &str) -> Option<u16> {
        let mut path: Vec<&str> = name.split('.').collect();
        let symbol = path.pop()?;
        let scope = self.retrieve_scope(&path[..])?;
        scope.lookup(symbol, &scope_label(symbol))
    }

    fn retrieve_scope<S: AsRef<str>>(&self, path: &[S]) -> Option<&Scope> {
        let path = match path.first() {
            Some(first) if first.as_ref() == GLOBAL_SCOPE => &path[1..],
            _ => path,
        };
        path.iter()
            .try_fold(&self.root, |scope, segment| scope.scopes.get(segment.as_ref()))
    }

    fn current_scope_mut(&mut self) -> Result<&mut Scope> {
        let mut scope = &mut self.root;
        for segment in &self.scope_stack[1..] {
            scope = scope
                .scopes
                .get_mut(segment)
                .ok_or_else(|| Error::InvalidScope {
                    message: format!(
                        "Resolving scope: {} failed at {}",
                        self.scope_stack.join("."),
                        segment
                    ),
                })?;
        }
        Ok(scope)
    }

    fn generate_name(&mut self) -> String {
        self.anonymous_scope_number += 1;
        format!("anonymous_{}", self.anonymous_scope_number)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}
