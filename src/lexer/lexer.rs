use std::iter::FusedIterator;

use crate::error::{CompileError, CompileResult, Position};

use super::{
    token::{Token, SYMBOLS},
    TokenKind,
};

const MAX_INT: u16 = 32767;

/// Lazy tokenizer: tokens are scanned one at a time from the current position.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    failed: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            failed: false,
        }
    }

    pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
        Lexer::new(source).collect()
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> CompileResult<()> {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Skips `/* ... */` and `/** ... */`; the comment ends at the first `*/`.
    fn skip_block_comment(&mut self) -> CompileResult<()> {
        let start = self.pos();
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => (),
                None => {
                    return Err(CompileError::lexical(start, "unterminated block comment"));
                }
            }
        }
    }

    /// Reports whether any token remains. Skips whitespace and comments but
    /// never consumes a token.
    pub fn has_more_tokens(&mut self) -> CompileResult<bool> {
        self.skip_trivia()?;
        Ok(self.peek().is_some())
    }

    pub fn advance(&mut self) -> CompileResult<Token> {
        self.skip_trivia()?;
        let pos = self.pos();
        let Some(c) = self.peek() else {
            return Err(CompileError::lexical(pos, "unexpected end of input"));
        };

        let kind = if SYMBOLS.contains(&c) {
            self.bump();
            TokenKind::Symbol(c)
        } else if c == '"' {
            self.read_string(pos)?
        } else if c.is_ascii_digit() {
            self.read_integer(pos)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.read_word()
        } else {
            return Err(CompileError::lexical(
                pos,
                format!("unexpected character {:?}", c),
            ));
        };

        Ok(Token { kind, pos })
    }

    fn read_string(&mut self, start: Position) -> CompileResult<TokenKind> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::StringConst(s)),
                Some(c) => s.push(c),
                None => return Err(CompileError::lexical(start, "unterminated string constant")),
            }
        }
    }

    fn read_integer(&mut self, start: Position) -> CompileResult<TokenKind> {
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            digits.push(c);
            self.bump();
        }
        match digits.parse::<u16>() {
            Ok(value) if value <= MAX_INT => Ok(TokenKind::IntConst(value)),
            _ => Err(CompileError::lexical(
                start,
                format!("integer constant {} is out of range 0..={}", digits, MAX_INT),
            )),
        }
    }

    fn read_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self
            .peek()
            .filter(|&c| c.is_ascii_alphanumeric() || c == '_')
        {
            word.push(c);
            self.bump();
        }
        TokenKind::from_word(&word)
    }
}

impl Iterator for Lexer {
    type Item = CompileResult<Token>;

    /// Ends after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match self.has_more_tokens() {
            Ok(true) => self.advance(),
            Ok(false) => return None,
            Err(e) => Err(e),
        };
        self.failed = item.is_err();
        Some(item)
    }
}

impl FusedIterator for Lexer {}
