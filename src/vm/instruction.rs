use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(Segment::Constant),
            "argument" => Ok(Segment::Argument),
            "local" => Ok(Segment::Local),
            "static" => Ok(Segment::Static),
            "this" => Ok(Segment::This),
            "that" => Ok(Segment::That),
            "pointer" => Ok(Segment::Pointer),
            "temp" => Ok(Segment::Temp),
            _ => Err(ParseError::UnknownSegment(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }

    fn from_command(s: &str) -> Option<Self> {
        match s {
            "add" => Some(ArithmeticOp::Add),
            "sub" => Some(ArithmeticOp::Sub),
            "neg" => Some(ArithmeticOp::Neg),
            "eq" => Some(ArithmeticOp::Eq),
            "gt" => Some(ArithmeticOp::Gt),
            "lt" => Some(ArithmeticOp::Lt),
            "and" => Some(ArithmeticOp::And),
            "or" => Some(ArithmeticOp::Or),
            "not" => Some(ArithmeticOp::Not),
            _ => None,
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of VM code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(segment, index) => write!(f, "push {segment} {index}"),
            Instruction::Pop(segment, index) => write!(f, "pop {segment} {index}"),
            Instruction::Arithmetic(op) => write!(f, "{op}"),
            Instruction::Label(label) => write!(f, "label {label}"),
            Instruction::Goto(label) => write!(f, "goto {label}"),
            Instruction::IfGoto(label) => write!(f, "if-goto {label}"),
            Instruction::Call(name, n_args) => write!(f, "call {name} {n_args}"),
            Instruction::Function(name, n_locals) => write!(f, "function {name} {n_locals}"),
            Instruction::Return => f.write_str("return"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("unknown segment `{0}`")]
    UnknownSegment(String),

    #[error("`{0}` is missing an operand")]
    MissingOperand(String),

    #[error("unexpected operand `{operand}` after `{command}`")]
    ExtraOperand { command: String, operand: String },

    #[error("invalid operand `{operand}` for `{command}`: {reason}")]
    InvalidOperand {
        command: String,
        operand: String,
        reason: String,
    },
}

const MAX_CONSTANT: u16 = 32767;

impl Instruction {
    /// Parses one line of VM text. Blank lines and `//` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Instruction>, ParseError> {
        let code = match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        };
        let mut words = code.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };

        let instruction = match command {
            "push" | "pop" => {
                let segment: Segment = next_operand(command, &mut words)?.parse()?;
                let index = parse_index(command, next_operand(command, &mut words)?)?;
                validate_access(command, segment, index)?;
                if command == "push" {
                    Instruction::Push(segment, index)
                } else {
                    Instruction::Pop(segment, index)
                }
            }
            "label" => Instruction::Label(next_operand(command, &mut words)?.to_string()),
            "goto" => Instruction::Goto(next_operand(command, &mut words)?.to_string()),
            "if-goto" => Instruction::IfGoto(next_operand(command, &mut words)?.to_string()),
            "call" | "function" => {
                let name = next_operand(command, &mut words)?.to_string();
                let count = parse_index(command, next_operand(command, &mut words)?)?;
                if command == "call" {
                    Instruction::Call(name, count)
                } else {
                    Instruction::Function(name, count)
                }
            }
            "return" => Instruction::Return,
            _ => match ArithmeticOp::from_command(command) {
                Some(op) => Instruction::Arithmetic(op),
                None => return Err(ParseError::UnknownCommand(command.to_string())),
            },
        };

        if let Some(extra) = words.next() {
            return Err(ParseError::ExtraOperand {
                command: command.to_string(),
                operand: extra.to_string(),
            });
        }
        Ok(Some(instruction))
    }

    /// Rejects segment accesses the machine cannot express.
    pub fn validate(&self) -> Result<(), ParseError> {
        match self {
            Instruction::Push(segment, index) => validate_access("push", *segment, *index),
            Instruction::Pop(segment, index) => validate_access("pop", *segment, *index),
            _ => Ok(()),
        }
    }
}

fn next_operand<'a>(
    command: &str,
    words: &mut impl Iterator<Item = &'a str>,
) -> Result<&'a str, ParseError> {
    words
        .next()
        .ok_or_else(|| ParseError::MissingOperand(command.to_string()))
}

fn parse_index(command: &str, operand: &str) -> Result<u16, ParseError> {
    operand.parse().map_err(|_| ParseError::InvalidOperand {
        command: command.to_string(),
        operand: operand.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

fn validate_access(command: &str, segment: Segment, index: u16) -> Result<(), ParseError> {
    let reason = match segment {
        Segment::Constant if command == "pop" => Some("cannot pop into the constant segment"),
        Segment::Constant if index > MAX_CONSTANT => Some("constant exceeds 32767"),
        Segment::Pointer if index > 1 => Some("pointer index must be 0 or 1"),
        Segment::Temp if index > 7 => Some("temp index must be in 0..=7"),
        _ => None,
    };
    match reason {
        Some(reason) => Err(ParseError::InvalidOperand {
            command: command.to_string(),
            operand: format!("{segment} {index}"),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
