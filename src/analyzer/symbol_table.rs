use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::vm::Segment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// The VM segment a variable of this kind lives in.
    pub fn segment(&self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Local => "local",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarType {
    Int,
    Char,
    Boolean,
    Class(String),
}

impl VarType {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            VarType::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => f.write_str("int"),
            VarType::Char => f.write_str("char"),
            VarType::Boolean => f.write_str("boolean"),
            VarType::Class(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub kind: Kind,
    pub ty: VarType,
    pub index: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefineError {
    #[error("`{name}` is already declared as {kind} {index}")]
    Duplicate { name: String, kind: Kind, index: u16 },

    #[error("too many {kind} variables")]
    TooMany { kind: Kind },
}

#[derive(Clone, Debug, Default)]
struct Counters {
    statics: u16,
    fields: u16,
    arguments: u16,
    locals: u16,
}

impl Counters {
    fn get_mut(&mut self, kind: Kind) -> &mut u16 {
        match kind {
            Kind::Static => &mut self.statics,
            Kind::Field => &mut self.fields,
            Kind::Argument => &mut self.arguments,
            Kind::Local => &mut self.locals,
        }
    }
}

/// Maps identifiers to `(kind, type, index)`; each kind has its own running index.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    table: HashMap<String, Symbol>,
    counters: Counters,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry and resets all counters to zero.
    pub fn start_subroutine(&mut self) {
        self.table.clear();
        self.counters = Counters::default();
    }

    pub fn define(&mut self, name: &str, kind: Kind, ty: VarType) -> Result<u16, DefineError> {
        if let Some(existing) = self.table.get(name) {
            return Err(DefineError::Duplicate {
                name: name.to_string(),
                kind: existing.kind,
                index: existing.index,
            });
        }

        let counter = self.counters.get_mut(kind);
        let index = *counter;
        *counter = index
            .checked_add(1)
            .ok_or(DefineError::TooMany { kind })?;
        self.table
            .insert(name.to_string(), Symbol { kind, ty, index });
        Ok(index)
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static => self.counters.statics,
            Kind::Field => self.counters.fields,
            Kind::Argument => self.counters.arguments,
            Kind::Local => self.counters.locals,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.get(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&VarType> {
        self.get(name).map(|s| &s.ty)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.get(name).map(|s| s.index)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
