use std::fmt;

use thiserror::Error;

/// 1-based source location of a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{pos}: lexical error: {message}")]
    Lexical { pos: Position, message: String },

    #[error("{pos}: syntax error: expected {expected}, found {found}")]
    Syntax {
        pos: Position,
        expected: String,
        found: String,
    },

    #[error("{pos}: semantic error: {message}")]
    Semantic { pos: Position, message: String },

    #[error("failed to write vm code: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexical(pos: Position, message: impl Into<String>) -> Self {
        Self::Lexical {
            pos,
            message: message.into(),
        }
    }

    pub fn syntax(pos: Position, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn semantic(pos: Position, message: impl Into<String>) -> Self {
        Self::Semantic {
            pos,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> Option<Position> {
        match self {
            CompileError::Lexical { pos, .. }
            | CompileError::Syntax { pos, .. }
            | CompileError::Semantic { pos, .. } => Some(*pos),
            CompileError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_category() {
        let err = CompileError::syntax(Position::new(3, 7), "';'", "'}'");
        assert_eq!(
            err.to_string(),
            "3:7: syntax error: expected ';', found '}'"
        );
        assert_eq!(err.pos(), Some(Position::new(3, 7)));
    }
}
