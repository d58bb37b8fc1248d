use std::io::{self, Write};

use log::{debug, trace};
use thiserror::Error;

use super::{flow, stack, LabelCounters};
use crate::vm::{Instruction, ParseError};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{unit}.vm:{line}: {source}")]
    Parse {
        unit: String,
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Annotate the output with the unit name and the source instruction.
    pub comments: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self { comments: true }
    }
}

/// Lowers VM instructions to Hack assembly. One translator serves one
/// output file, so labels it synthesizes stay unique across all units.
pub struct Translator {
    options: TranslateOptions,
    counters: LabelCounters,
    current_function: Option<String>,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self {
            options,
            counters: LabelCounters::new(),
            current_function: None,
        }
    }

    /// `SP = 256` followed by `call Sys.init 0`.
    pub fn bootstrap(&mut self) -> String {
        let k = self.counters.next_call();
        let call = flow::call("Sys.init", 0, &format!("Bootstrap$ret.{}", k));
        let mut asm = String::new();
        if self.options.comments {
            asm.push_str("// bootstrap\n");
        }
        asm.push_str(&flow::init_stack());
        asm.push('\n');
        asm.push_str(&call);
        asm.push('\n');
        asm
    }

    /// Labels and return addresses are scoped by the enclosing function, or
    /// by the unit for code that precedes any `function`.
    fn scope<'a>(&'a self, unit: &'a str) -> &'a str {
        self.current_function.as_deref().unwrap_or(unit)
    }

    pub fn translate(&mut self, unit: &str, instruction: &Instruction) -> Result<String, ParseError> {
        instruction.validate()?;
        let asm = match instruction {
            Instruction::Push(segment, index) => stack::push(*segment, *index, unit),
            Instruction::Pop(segment, index) => stack::pop(*segment, *index, unit),
            Instruction::Arithmetic(op) => stack::arithmetic(*op, &mut self.counters),
            Instruction::Label(label) => flow::label(self.scope(unit), label),
            Instruction::Goto(label) => flow::goto(self.scope(unit), label),
            Instruction::IfGoto(label) => flow::if_goto(self.scope(unit), label),
            Instruction::Function(name, n_locals) => {
                self.current_function = Some(name.clone());
                flow::function(name, *n_locals)
            }
            Instruction::Call(name, n_args) => {
                let k = self.counters.next_call();
                let return_label = format!("{}$ret.{}", self.scope(unit), k);
                flow::call(name, *n_args, &return_label)
            }
            Instruction::Return => flow::return_(),
        };
        trace!("{} -> {} lines", instruction, asm.lines().count());
        Ok(asm)
    }

    pub fn translate_unit<W: Write>(
        &mut self,
        unit: &str,
        source: &str,
        out: &mut W,
    ) -> Result<(), TranslateError> {
        debug!("translating unit {}", unit);
        self.current_function = None;
        if self.options.comments {
            writeln!(out, "// {}.vm", unit)?;
        }

        let parse_error = |line: usize, source: ParseError| TranslateError::Parse {
            unit: unit.to_string(),
            line,
            source,
        };
        for (i, line) in source.lines().enumerate() {
            let Some(instruction) = Instruction::parse_line(line).map_err(|e| parse_error(i + 1, e))?
            else {
                continue;
            };
            let asm = self
                .translate(unit, &instruction)
                .map_err(|e| parse_error(i + 1, e))?;
            if self.options.comments {
                writeln!(out, "{} // {}", asm, instruction)?;
            } else {
                writeln!(out, "{}", asm)?;
            }
        }
        Ok(())
    }
}
