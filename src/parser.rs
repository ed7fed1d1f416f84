//! Line decoder: turns one line of source into a [`SourceUnit`].
//!
//! Grammars are tried in a fixed order and the first match wins: labels,
//! then directives, then the addressing modes of an instruction.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::cartridge::InesHeader;
use crate::cpu::{AddrMode, Opcode, OpcodeTable, Spec};
use crate::error::{Error, Result};
use crate::memory::Segment;
use crate::source::IncludePath;
use crate::symbol_table::{ByteSelector, SymbolRef};

/// Placeholder operand written while a symbol is still unresolved.
pub const PLACEHOLDER: [u8; 2] = [0xDE, 0xAD];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Value(u16),
    Symbol(SymbolRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub spec: Spec,
    pub operand: Operand,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        self.spec.opcode
    }

    pub fn mode(&self) -> AddrMode {
        self.spec.addr_mode
    }

    pub fn length(&self) -> usize {
        self.spec.length()
    }

    /// Opcode followed by filler, as long as the final encoding.
    pub fn placeholder(&self) -> Vec<u8> {
        let filler = [self.spec.opcode_byte, PLACEHOLDER[0], PLACEHOLDER[1]];
        filler[..self.length()].to_vec()
    }

    /// Encodes the instruction at `pc` with `value` as its operand.
    ///
    /// For a symbolic operand `value` is the resolved symbol; any byte
    /// selector is applied here. Relative operands become the signed
    /// distance from the end of the branch.
    pub fn encode(&self, value: i64, pc: u32) -> Result<Vec<u8>> {
        let value = match &self.operand {
            Operand::Symbol(SymbolRef {
                selector: Some(selector),
                ..
            }) => {
                if !(0..=0xFFFF).contains(&value) {
                    return Err(Error::AddressOutOfRange { address: value });
                }
                selector.apply(value)
            }
            _ => value,
        };
        let mut bytes = vec![self.spec.opcode_byte];
        match self.mode() {
            AddrMode::Implicit => {}
            AddrMode::Relative => {
                let displacement = value - i64::from(pc) - 2;
                let offset = i8::try_from(displacement)
                    .map_err(|_| Error::BranchOutOfRange { displacement })?;
                bytes.push(offset as u8);
            }
            mode if mode.size() == 1 => {
                if value < 0 {
                    return Err(Error::AddressOutOfRange { address: value });
                }
                let byte = u8::try_from(value).map_err(|_| Error::ArgumentTooLarge {
                    mnemonic: self.opcode().to_string(),
                    mode,
                    value,
                })?;
                bytes.push(byte);
            }
            _ => {
                let word =
                    u16::try_from(value).map_err(|_| Error::AddressOutOfRange { address: value })?;
                bytes.extend_from_slice(&word.to_le_bytes());
            }
        }
        Ok(bytes)
    }
}

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUnit {
    Label(String),
    Instruction(Instruction),
    InesHeader(InesHeader),
    Org(u16),
    Segment { segment: Segment, bank: usize },
    IncBin(String),
    Include(IncludePath),
    DefineWord(Operand),
    Bytes(Vec<Operand>),
    Ascii(String),
    EnterScope(Option<String>),
    ExitScope,
    ReserveSpace { name: String, size: usize },
}

/// Drops a trailing `;` comment, unless the `;` is inside double quotes,
/// and surrounding whitespace.
pub fn sanitize_line(line: &str) -> &str {
    let mut in_quotes = false;
    let end = line
        .char_indices()
        .find_map(|(i, c)| match c {
            '"' => {
                in_quotes = !in_quotes;
                None
            }
            ';' if !in_quotes => Some(i),
            _ => None,
        })
        .unwrap_or(line.len());
    line[..end].trim()
}

const MNEMONIC: &str = r"(?P<mnemonic>[A-Za-z]{3})";
const BRANCHES: &str = r"(?P<mnemonic>(?i:bpl|bmi|bvc|bvs|bcc|bcs|bne|beq))";
const NUM8: &str = r"(?:\$(?P<hex>[A-Fa-f0-9]{1,2})|%(?P<bin>[01]{1,8}))";
const NUM16: &str = r"(?:\$(?P<hex>[A-Fa-f0-9]{3,4})|%(?P<bin>[01]{9,16}))";
const SYM: &str = r"(?P<sym>[a-zA-Z_][a-zA-Z\d_\.]*(?:[+\-*/]\d+)?)";
const SELECTOR: &str = r"(?P<sel>[<>]?)";
const X_REG: &str = r"\s?,\s?[Xx]";
const Y_REG: &str = r"\s?,\s?[Yy]";
const ZERO_PAGE: &str = r"\s+(?i:zp)";

struct ModeGrammar {
    mode: AddrMode,
    literal: Option<Regex>,
    symbolic: Option<Regex>,
}

fn mode_grammar(mode: AddrMode, literal: Option<String>, symbolic: Option<String>) -> ModeGrammar {
    let anchored = |pattern: String| Regex::new(&format!("^{}$", pattern)).unwrap();
    ModeGrammar {
        mode,
        literal: literal.map(anchored),
        symbolic: symbolic.map(anchored),
    }
}

struct DirectiveGrammar {
    pattern: Regex,
    build: fn(&Captures) -> Result<SourceUnit>,
}

fn directive(pattern: &str, build: fn(&Captures) -> Result<SourceUnit>) -> DirectiveGrammar {
    DirectiveGrammar {
        pattern: Regex::new(pattern).unwrap(),
        build,
    }
}

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*):$").unwrap();

    static ref DIRECTIVES: Vec<DirectiveGrammar> = vec![
        directive(r"^\.ines (.+)$", ines_header),
        directive(r"^\.org\s+\$([0-9A-Fa-f]{1,4})$", org),
        directive(r"(?i)^\.segment (prog|char) (\d+)$", segment),
        directive(r#"^\.incbin "([^"]+)"$"#, incbin),
        directive(r"^\.inc <([^>]+)>$", include_system),
        directive(r#"^\.inc "([^"]+)"$"#, include_project),
        directive(r"^\.dw\s+\$([0-9A-Fa-f]{1,4})$", define_hex_word),
        directive(r"^\.dw\s+%([01]{1,16})$", define_binary_word),
        directive(r"^\.dw\s+([a-zA-Z_][a-zA-Z\d_\.]*(?:[+\-*/]\d+)?)$", define_symbolic_word),
        directive(r"^\.bytes\s+(.+)$", bytes),
        directive(r#"^\.ascii\s+"([^"]+)"$"#, ascii),
        directive(r"^\.scope$", enter_anonymous_scope),
        directive(r"^\.scope\s+([a-zA-Z_][a-zA-Z0-9_]*)$", enter_scope),
        directive(r"^\.$", exit_scope),
        directive(r"^\.space\s+([a-zA-Z_][a-zA-Z0-9_]*)\s+(\d+)$", reserve_space),
    ];

    static ref MODES: Vec<ModeGrammar> = {
        use AddrMode::*;
        let f = |pattern: String| Some(pattern);
        vec![
            mode_grammar(Relative, None, f(format!(r"{}\s+{}", BRANCHES, SYM))),
            mode_grammar(
                Immediate,
                f(format!(r"{}\s+#{}", MNEMONIC, NUM8)),
                f(format!(r"{}\s+#{}{}", MNEMONIC, SELECTOR, SYM)),
            ),
            mode_grammar(Implicit, f(MNEMONIC.to_string()), None),
            mode_grammar(
                ZeroPage,
                f(format!(r"{}\s+{}", MNEMONIC, NUM8)),
                f(format!(r"{}\s+{}{}", MNEMONIC, SYM, ZERO_PAGE)),
            ),
            mode_grammar(
                ZeroPageX,
                f(format!(r"{}\s+{}{}", MNEMONIC, NUM8, X_REG)),
                f(format!(r"{}\s+{}{}{}", MNEMONIC, SYM, X_REG, ZERO_PAGE)),
            ),
            mode_grammar(
                ZeroPageY,
                f(format!(r"{}\s+{}{}", MNEMONIC, NUM8, Y_REG)),
                f(format!(r"{}\s+{}{}{}", MNEMONIC, SYM, Y_REG, ZERO_PAGE)),
            ),
            mode_grammar(
                Absolute,
                f(format!(r"{}\s+{}", MNEMONIC, NUM16)),
                f(format!(r"{}\s+{}", MNEMONIC, SYM)),
            ),
            mode_grammar(
                AbsoluteX,
                f(format!(r"{}\s+{}{}", MNEMONIC, NUM16, X_REG)),
                f(format!(r"{}\s+{}{}", MNEMONIC, SYM, X_REG)),
            ),
            mode_grammar(
                AbsoluteY,
                f(format!(r"{}\s+{}{}", MNEMONIC, NUM16, Y_REG)),
                f(format!(r"{}\s+{}{}", MNEMONIC, SYM, Y_REG)),
            ),
            mode_grammar(
                Indirect,
                f(format!(r"{}\s+\({}\)", MNEMONIC, NUM16)),
                f(format!(r"{}\s+\({}\)", MNEMONIC, SYM)),
            ),
            mode_grammar(
                IndexedIndirect,
                f(format!(r"{}\s+\({}{}\)", MNEMONIC, NUM8, X_REG)),
                f(format!(r"{}\s+\({}{}\)", MNEMONIC, SYM, X_REG)),
            ),
            mode_grammar(
                IndirectIndexed,
                f(format!(r"{}\s+\({}\){}", MNEMONIC, NUM8, Y_REG)),
                f(format!(r"{}\s+\({}\){}", MNEMONIC, SYM, Y_REG)),
            ),
        ]
    };
}

fn syntax_error(caps: &Captures) -> Error {
    Error::Syntax {
        line: caps[0].to_string(),
    }
}

fn parse_radix(digits: &str, radix: u32, caps: &Captures) -> Result<u16> {
    u16::from_str_radix(digits, radix).map_err(|_| syntax_error(caps))
}

// Value of a `$hex` or `%binary` literal captured as `hex` / `bin`.
fn literal_value(caps: &Captures) -> Result<u16> {
    match (caps.name("hex"), caps.name("bin")) {
        (Some(hex), _) => parse_radix(hex.as_str(), 16, caps),
        (_, Some(bin)) => parse_radix(bin.as_str(), 2, caps),
        _ => Err(syntax_error(caps)),
    }
}

fn ines_header(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::InesHeader(InesHeader::from_json(&caps[1])?))
}

fn org(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::Org(parse_radix(&caps[1], 16, caps)?))
}

fn segment(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::Segment {
        segment: caps[1].parse()?,
        bank: caps[2].parse().map_err(|_| syntax_error(caps))?,
    })
}

fn incbin(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::IncBin(caps[1].to_string()))
}

fn include_system(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::Include(IncludePath::System(caps[1].to_string())))
}

fn include_project(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::Include(IncludePath::Project(caps[1].to_string())))
}

fn define_hex_word(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::DefineWord(Operand::Value(parse_radix(
        &caps[1], 16, caps,
    )?)))
}

fn define_binary_word(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::DefineWord(Operand::Value(parse_radix(
        &caps[1], 2, caps,
    )?)))
}

fn define_symbolic_word(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::DefineWord(Operand::Symbol(SymbolRef::parse(
        &caps[1],
    )?)))
}

fn bytes(caps: &Captures) -> Result<SourceUnit> {
    lazy_static! {
        static ref BYTE_RE: Regex = Regex::new(
            r"^(?:\$(?P<hex>[A-Fa-f0-9]{1,4})|%(?P<bin>[01]{1,16})|(?P<sym>[a-zA-Z_][a-zA-Z\d_\.]*(?:[+\-*/]\d+)?))$"
        )
        .unwrap();
    }
    caps[1]
        .split(',')
        .map(|element| {
            let element_caps = BYTE_RE
                .captures(element.trim())
                .ok_or_else(|| syntax_error(caps))?;
            if let Some(sym) = element_caps.name("sym") {
                return Ok(Operand::Symbol(SymbolRef::parse(sym.as_str())?));
            }
            let value = literal_value(&element_caps)?;
            if value > 0xFF {
                return Err(Error::ByteTooLarge {
                    value: i64::from(value),
                });
            }
            Ok(Operand::Value(value))
        })
        .collect::<Result<Vec<_>>>()
        .map(SourceUnit::Bytes)
}

fn ascii(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::Ascii(caps[1].to_string()))
}

fn enter_anonymous_scope(_caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::EnterScope(None))
}

fn enter_scope(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::EnterScope(Some(caps[1].to_string())))
}

fn exit_scope(_caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::ExitScope)
}

fn reserve_space(caps: &Captures) -> Result<SourceUnit> {
    Ok(SourceUnit::ReserveSpace {
        name: caps[1].to_string(),
        size: caps[2].parse().map_err(|_| syntax_error(caps))?,
    })
}

/// Decodes lines against an opcode table supplied by the caller.
pub struct LineDecoder<'a> {
    opcodes: &'a OpcodeTable,
}

impl<'a> LineDecoder<'a> {
    pub fn new(opcodes: &'a OpcodeTable) -> Self {
        LineDecoder { opcodes }
    }

    /// `Ok(None)` for lines holding nothing but whitespace or a comment.
    pub fn decode(&self, line: &str) -> Result<Option<SourceUnit>> {
        let line = sanitize_line(line);
        if line.is_empty() {
            return Ok(None);
        }
        if let Some(cap) = LABEL_RE.captures(line) {
            return Ok(Some(SourceUnit::Label(cap[1].to_string())));
        }
        if line.starts_with('.') {
            return self.decode_directive(line).map(Some);
        }
        self.decode_instruction(line)
            .map(|i| Some(SourceUnit::Instruction(i)))
    }

    fn decode_directive(&self, line: &str) -> Result<SourceUnit> {
        for grammar in DIRECTIVES.iter() {
            if let Some(caps) = grammar.pattern.captures(line) {
                return (grammar.build)(&caps);
            }
        }
        Err(Error::Syntax {
            line: line.to_string(),
        })
    }

    fn decode_instruction(&self, line: &str) -> Result<Instruction> {
        for grammar in MODES.iter() {
            if let Some(caps) = grammar.literal.as_ref().and_then(|re| re.captures(line)) {
                let operand = match grammar.mode {
                    AddrMode::Implicit => Operand::None,
                    _ => Operand::Value(literal_value(&caps)?),
                };
                return self.instruction(&caps["mnemonic"], grammar.mode, operand);
            }
            if let Some(caps) = grammar.symbolic.as_ref().and_then(|re| re.captures(line)) {
                let selector = match caps.name("sel").map(|m| m.as_str()) {
                    Some("<") => Some(ByteSelector::Low),
                    Some(">") => Some(ByteSelector::High),
                    _ => None,
                };
                let symbol = SymbolRef::parse(&caps["sym"])?.with_selector(selector);
                return self.instruction(&caps["mnemonic"], grammar.mode, Operand::Symbol(symbol));
            }
        }
        Err(Error::Syntax {
            line: line.to_string(),
        })
    }

    fn instruction(&self, mnemonic: &str, mode: AddrMode, operand: Operand) -> Result<Instruction> {
        let spec = self.opcodes.lookup(mnemonic, mode)?;
        Ok(Instruction { spec, operand })
    }
}

#[cfg(test)]
mod test {
    use itertools::izip;

    use super::*;
    use crate::symbol_table::ArithmeticOp;

    fn decode(line: &str) -> Result<Option<SourceUnit>> {
        let table = OpcodeTable::mos6502();
        LineDecoder::new(&table).decode(line)
    }

    fn decode_instruction(line: &str) -> Instruction {
        match decode(line) {
            Ok(Some(SourceUnit::Instruction(i))) => i,
            other => panic!("{} decoded to {:?}", line, other),
        }
    }

    fn symbol(name: &str) -> Operand {
        Operand::Symbol(SymbolRef::parse(name).unwrap())
    }

    #[test]
    fn test_sanitize_line() {
        let lines = vec![
            "  ldy #$01",
            "  ;;; a comment",
            "  Lda #$03 ; a comment",
            r#".ascii "a;b" ; trailing"#,
        ];
        let expected = vec!["ldy #$01", "", "Lda #$03", r#".ascii "a;b""#];
        for (line, sanitized) in izip!(lines, expected) {
            assert_eq!(sanitize_line(line), sanitized);
        }
        assert_eq!(decode("   ; nothing here").unwrap(), None);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(
            decode("forward_symbol:").unwrap(),
            Some(SourceUnit::Label("forward_symbol".to_string()))
        );
        assert!(matches!(decode("1abel:"), Err(Error::Syntax { .. })));
        assert!(matches!(decode("a.b:"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_parse_instruction_modes() {
        use AddrMode::*;

        let codes = vec![
            "sei",
            "LDY #$01",
            "lda #%00001111",
            "lda #<sprites",
            "STA $01",
            "lda $20,X",
            "ldx $20 , y",
            "stx $0704",
            "lda $0200,x",
            "lda $1234,Y",
            "JMP ($00f0)",
            "lda ($20,x)",
            "LDA ($01),Y",
            "bne forward_symbol",
            "lda counter zp",
            "lda table,x ZP",
            "jmp main",
            "sta buffer+2,y",
            "jmp (vector)",
            "lda (pointer),y",
        ];
        let modes = vec![
            Implicit,
            Immediate,
            Immediate,
            Immediate,
            ZeroPage,
            ZeroPageX,
            ZeroPageY,
            Absolute,
            AbsoluteX,
            AbsoluteY,
            Indirect,
            IndexedIndirect,
            IndirectIndexed,
            Relative,
            ZeroPage,
            ZeroPageX,
            Absolute,
            AbsoluteY,
            Indirect,
            IndirectIndexed,
        ];
        let operands = vec![
            Operand::None,
            Operand::Value(0x01),
            Operand::Value(0x0F),
            Operand::Symbol(
                SymbolRef::parse("sprites")
                    .unwrap()
                    .with_selector(Some(ByteSelector::Low)),
            ),
            Operand::Value(0x01),
            Operand::Value(0x20),
            Operand::Value(0x20),
            Operand::Value(0x0704),
            Operand::Value(0x0200),
            Operand::Value(0x1234),
            Operand::Value(0x00F0),
            Operand::Value(0x20),
            Operand::Value(0x01),
            symbol("forward_symbol"),
            symbol("counter"),
            symbol("table"),
            symbol("main"),
            symbol("buffer+2"),
            symbol("vector"),
            symbol("pointer"),
        ];
        for (code, mode, operand) in izip!(codes, modes, operands) {
            let instruction = decode_instruction(code);
            assert_eq!(instruction.mode(), mode, "{}", code);
            assert_eq!(instruction.operand, operand, "{}", code);
        }
    }

    #[test]
    fn test_instruction_errors() {
        assert!(matches!(
            decode("xyz #$10"),
            Err(Error::InvalidInstruction { .. })
        ));
        assert!(matches!(
            decode("sta #$10"),
            Err(Error::InvalidAddressingMode { .. })
        ));
        // branches never take a literal target
        assert!(matches!(
            decode("bne $10"),
            Err(Error::InvalidAddressingMode {
                mode: AddrMode::ZeroPage,
                ..
            })
        ));
        assert!(matches!(decode("lda #$100"), Err(Error::Syntax { .. })));
        assert!(matches!(decode("lda $12345"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_parse_directives() {
        let lines = vec![
            ".org $8000",
            ".segment PROG 1",
            ".segment char 0",
            r#".incbin "sprites.chr""#,
            ".inc <nes.sym>",
            r#".inc "lib/util.asm""#,
            ".dw $fffa",
            ".dw %0000000100000010",
            ".dw reset",
            ".bytes $01, %11, palette.bg",
            r#".ascii "HELLO""#,
            ".scope",
            ".scope main",
            ".",
            ".space buffer 16",
        ];
        let units = vec![
            SourceUnit::Org(0x8000),
            SourceUnit::Segment {
                segment: Segment::Prog,
                bank: 1,
            },
            SourceUnit::Segment {
                segment: Segment::Char,
                bank: 0,
            },
            SourceUnit::IncBin("sprites.chr".to_string()),
            SourceUnit::Include(IncludePath::System("nes.sym".to_string())),
            SourceUnit::Include(IncludePath::Project("lib/util.asm".to_string())),
            SourceUnit::DefineWord(Operand::Value(0xFFFA)),
            SourceUnit::DefineWord(Operand::Value(0x0102)),
            SourceUnit::DefineWord(symbol("reset")),
            SourceUnit::Bytes(vec![
                Operand::Value(0x01),
                Operand::Value(0x03),
                symbol("palette.bg"),
            ]),
            SourceUnit::Ascii("HELLO".to_string()),
            SourceUnit::EnterScope(None),
            SourceUnit::EnterScope(Some("main".to_string())),
            SourceUnit::ExitScope,
            SourceUnit::ReserveSpace {
                name: "buffer".to_string(),
                size: 16,
            },
        ];
        for (line, unit) in izip!(lines, units) {
            assert_eq!(decode(line).unwrap(), Some(unit), "{}", line);
        }
    }

    #[test]
    fn test_parse_ines_directive() {
        let unit = decode(r#".ines {"prog":1,"char":0,"mapper":0,"mirror":0}"#).unwrap();
        assert_eq!(unit, Some(SourceUnit::InesHeader(InesHeader::default())));
        assert!(matches!(
            decode(r#".ines {"prog":0}"#),
            Err(Error::InvalidInesHeader { .. })
        ));
    }

    #[test]
    fn test_directive_errors() {
        assert!(matches!(
            decode(".bytes $01, $100"),
            Err(Error::ByteTooLarge { value: 0x100 })
        ));
        assert!(matches!(decode(".bytes $01,,$02"), Err(Error::Syntax { .. })));
        assert!(matches!(decode(".org 8000"), Err(Error::Syntax { .. })));
        assert!(matches!(decode(".scope a.b"), Err(Error::Syntax { .. })));
        assert!(matches!(decode(".dw #<reset"), Err(Error::Syntax { .. })));
        assert!(matches!(decode(".macro foo"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_arithmetic_suffix_in_operand() {
        let instruction = decode_instruction("lda sprite*2,x");
        assert_eq!(
            instruction.operand,
            Operand::Symbol(SymbolRef {
                name: "sprite".to_string(),
                arithmetic: Some((ArithmeticOp::Mul, 2)),
                selector: None,
            })
        );
    }

    #[test]
    fn test_encode_is_little_endian() {
        let instruction = decode_instruction("jmp $1234");
        assert_eq!(instruction.encode(0x1234, 0x8000).unwrap(), vec![0x4C, 0x34, 0x12]);
        assert_eq!(instruction.placeholder(), vec![0x4C, 0xDE, 0xAD]);
        assert_eq!(decode_instruction("rts").placeholder(), vec![0x60]);
    }

    #[test]
    fn test_encode_relative() {
        let instruction = decode_instruction("bne forward_symbol");
        assert_eq!(instruction.encode(0x8009, 0x8004).unwrap(), vec![0xD0, 0x03]);
        assert_eq!(instruction.encode(0x8000, 0x8004).unwrap(), vec![0xD0, 0xFA]);
        assert!(matches!(
            instruction.encode(0x8100, 0x8000),
            Err(Error::BranchOutOfRange { displacement: 0xFE })
        ));
    }

    #[test]
    fn test_encode_selectors_and_range() {
        let low = decode_instruction("lda #<table");
        let high = decode_instruction("lda #>table");
        assert_eq!(low.encode(0xC123, 0).unwrap(), vec![0xA9, 0x23]);
        assert_eq!(high.encode(0xC123, 0).unwrap(), vec![0xA9, 0xC1]);

        let plain = decode_instruction("lda #table");
        assert!(matches!(
            plain.encode(0x1FF, 0),
            Err(Error::ArgumentTooLarge {
                mode: AddrMode::Immediate,
                value: 0x1FF,
                ..
            })
        ));
        // selectors pick bytes out of a 16-bit address
        for value in [-300i64, 0xFFFF * 1000] {
            assert!(matches!(
                high.encode(value, 0),
                Err(Error::AddressOutOfRange { address }) if address == value
            ));
            assert!(matches!(
                low.encode(value, 0),
                Err(Error::AddressOutOfRange { .. })
            ));
        }

        let zero_page = decode_instruction("sta counter zp");
        assert!(matches!(
            zero_page.encode(0x100, 0),
            Err(Error::ArgumentTooLarge { .. })
        ));
    }
}
