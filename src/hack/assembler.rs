use std::collections::HashMap;

use phf::phf_map;
use thiserror::Error;

/// Computation field, `a` bit included (`a c1 .. c6`).
static COMP: phf::Map<&'static str, u16> = phf_map! {
    "0" => 0b0101010,
    "1" => 0b0111111,
    "-1" => 0b0111010,
    "D" => 0b0001100,
    "A" => 0b0110000,
    "!D" => 0b0001101,
    "!A" => 0b0110001,
    "-D" => 0b0001111,
    "-A" => 0b0110011,
    "D+1" => 0b0011111,
    "A+1" => 0b0110111,
    "D-1" => 0b0001110,
    "A-1" => 0b0110010,
    "D+A" => 0b0000010,
    "A+D" => 0b0000010,
    "D-A" => 0b0010011,
    "A-D" => 0b0000111,
    "D&A" => 0b0000000,
    "A&D" => 0b0000000,
    "D|A" => 0b0010101,
    "A|D" => 0b0010101,
    "M" => 0b1110000,
    "!M" => 0b1110001,
    "-M" => 0b1110011,
    "M+1" => 0b1110111,
    "M-1" => 0b1110010,
    "D+M" => 0b1000010,
    "M+D" => 0b1000010,
    "D-M" => 0b1010011,
    "M-D" => 0b1000111,
    "D&M" => 0b1000000,
    "M&D" => 0b1000000,
    "D|M" => 0b1010101,
    "M|D" => 0b1010101,
};

static JUMP: phf::Map<&'static str, u16> = phf_map! {
    "JGT" => 0b001,
    "JEQ" => 0b010,
    "JGE" => 0b011,
    "JLT" => 0b100,
    "JNE" => 0b101,
    "JLE" => 0b110,
    "JMP" => 0b111,
};

static PREDEFINED: phf::Map<&'static str, u16> = phf_map! {
    "SP" => 0,
    "LCL" => 1,
    "ARG" => 2,
    "THIS" => 3,
    "THAT" => 4,
    "R0" => 0,
    "R1" => 1,
    "R2" => 2,
    "R3" => 3,
    "R4" => 4,
    "R5" => 5,
    "R6" => 6,
    "R7" => 7,
    "R8" => 8,
    "R9" => 9,
    "R10" => 10,
    "R11" => 11,
    "R12" => 12,
    "R13" => 13,
    "R14" => 14,
    "R15" => 15,
    "SCREEN" => 16384,
    "KBD" => 24576,
};

const FIRST_VARIABLE: u16 = 16;
const MAX_ADDRESS: u16 = 32767;
pub const ROM_SIZE: usize = 32768;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: invalid instruction `{text}`")]
    InvalidInstruction { line: usize, text: String },

    #[error("line {line}: label `{label}` is already defined")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: constant `{value}` is out of range")]
    InvalidConstant { line: usize, value: String },

    #[error("line {line}: `{symbol}` resolves to {address}, beyond the addressable range")]
    SymbolOutOfRange {
        line: usize,
        symbol: String,
        address: usize,
    },

    #[error("program has {size} instructions but ROM holds {max}", max = ROM_SIZE)]
    ProgramTooLarge { size: usize },
}

/// Assembled machine words, one per ROM address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub rom: Vec<u16>,
}

enum Line<'a> {
    Label(&'a str),
    Address(&'a str),
    Compute(&'a str),
}

fn classify(raw: &str) -> Option<Line<'_>> {
    let code = match raw.find("//") {
        Some(i) => &raw[..i],
        None => raw,
    }
    .trim();
    if code.is_empty() {
        None
    } else if let Some(label) = code.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(Line::Label(label))
    } else if let Some(value) = code.strip_prefix('@') {
        Some(Line::Address(value))
    } else {
        Some(Line::Compute(code))
    }
}

fn is_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || "_.$:".contains(c))
        && chars.all(|c| c.is_ascii_alphanumeric() || "_.$:".contains(c))
}

fn encode_dest(dest: &str) -> Option<u16> {
    let mut bits = 0;
    for c in dest.chars() {
        let bit = match c {
            'A' => 0b100,
            'D' => 0b010,
            'M' => 0b001,
            _ => return None,
        };
        if bits & bit != 0 {
            return None;
        }
        bits |= bit;
    }
    Some(bits)
}

/// `dest=comp;jump`, either side optional.
fn encode_compute(code: &str) -> Option<u16> {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    let (dest, rest) = match code.split_once('=') {
        Some((dest, rest)) => (encode_dest(dest)?, rest),
        None => (0, code.as_str()),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, *JUMP.get(jump)?),
        None => (rest, 0),
    };
    let comp = *COMP.get(comp)?;
    Some(0b111 << 13 | comp << 6 | dest << 3 | jump)
}

/// Two-pass assembly: the first pass binds labels to ROM addresses, the
/// second encodes instructions and allocates variables from RAM 16 upward.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let mut symbols: HashMap<String, usize> = HashMap::new();
    let mut address = 0usize;
    for (i, raw) in source.lines().enumerate() {
        match classify(raw) {
            Some(Line::Label(label)) => {
                if !is_symbol(label) || PREDEFINED.contains_key(label) {
                    return Err(AsmError::InvalidInstruction {
                        line: i + 1,
                        text: raw.trim().to_string(),
                    });
                }
                if symbols.insert(label.to_string(), address).is_some() {
                    return Err(AsmError::DuplicateLabel {
                        line: i + 1,
                        label: label.to_string(),
                    });
                }
            }
            Some(_) => address += 1,
            None => {}
        }
    }
    if address > ROM_SIZE {
        return Err(AsmError::ProgramTooLarge { size: address });
    }

    let mut next_variable = usize::from(FIRST_VARIABLE);
    let mut rom = Vec::with_capacity(address);
    for (i, raw) in source.lines().enumerate() {
        let invalid = || AsmError::InvalidInstruction {
            line: i + 1,
            text: raw.trim().to_string(),
        };
        match classify(raw) {
            Some(Line::Address(value)) if value.starts_with(|c: char| c.is_ascii_digit()) => {
                match value.parse::<u16>() {
                    Ok(n) if n <= MAX_ADDRESS => rom.push(n),
                    _ => {
                        return Err(AsmError::InvalidConstant {
                            line: i + 1,
                            value: value.to_string(),
                        })
                    }
                }
            }
            Some(Line::Address(symbol)) => {
                if !is_symbol(symbol) {
                    return Err(invalid());
                }
                let n = match PREDEFINED.get(symbol) {
                    Some(n) => usize::from(*n),
                    None => *symbols.entry(symbol.to_string()).or_insert_with(|| {
                        let n = next_variable;
                        next_variable += 1;
                        n
                    }),
                };
                // bit 15 would turn the word into a compute instruction
                match u16::try_from(n) {
                    Ok(word) if word <= MAX_ADDRESS => rom.push(word),
                    _ => {
                        return Err(AsmError::SymbolOutOfRange {
                            line: i + 1,
                            symbol: symbol.to_string(),
                            address: n,
                        })
                    }
                }
            }
            Some(Line::Compute(code)) => rom.push(encode_compute(code).ok_or_else(invalid)?),
            Some(Line::Label(_)) | None => {}
        }
    }
    Ok(Program { rom })
}
