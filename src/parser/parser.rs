use std::io::Write;

use log::debug;

use crate::{
    analyzer::{Kind, Scopes, Symbol, VarType},
    codegen::{LabelGenerator, VmWriter},
    error::{CompileError, CompileResult, Position},
    lexer::{Keyword, Lexer, Token, TokenKind},
    vm::Segment,
};

use super::signatures::{ClassSubroutines, Subroutine, SubroutineKind};

/// Adds one to a count that must stay within a VM operand.
pub(super) fn increment(count: u16, what: &str, pos: Position) -> CompileResult<u16> {
    count
        .checked_add(1)
        .ok_or_else(|| CompileError::semantic(pos, format!("too many {}", what)))
}

/// Single-pass compilation engine: parses one class and writes its VM code
/// while parsing. Only the current token is held as lookahead.
pub struct Parser<W: Write> {
    pub(super) lexer: Lexer,
    pub(super) current: Option<Token>,
    pub(super) writer: VmWriter<W>,
    pub(super) scopes: Scopes,
    pub(super) labels: LabelGenerator,
    pub(super) class_name: String,
    pub(super) subroutine: Option<Subroutine>,
    pub(super) subroutines: ClassSubroutines,
}

impl<W: Write> Parser<W> {
    pub fn new(source: &str, out: W) -> Self {
        Self {
            lexer: Lexer::new(source),
            current: None,
            writer: VmWriter::new(out),
            scopes: Scopes::new(),
            labels: LabelGenerator::new(),
            class_name: String::new(),
            subroutine: None,
            subroutines: ClassSubroutines::default(),
        }
    }

    /// Compiles the single class of a translation unit and hands back the
    /// output sink. Any error aborts the whole unit.
    pub fn compile_class(mut self) -> CompileResult<W> {
        self.advance()?;
        self.parse_class()?;
        if let Some(token) = &self.current {
            return Err(CompileError::syntax(
                token.pos,
                "end of input",
                token.kind.to_string(),
            ));
        }
        self.subroutines.check(&self.class_name)?;
        Ok(self.writer.into_inner()?)
    }

    pub(super) fn advance(&mut self) -> CompileResult<()> {
        self.current = if self.lexer.has_more_tokens()? {
            Some(self.lexer.advance()?)
        } else {
            None
        };
        Ok(())
    }

    pub(super) fn pos(&self) -> Position {
        match &self.current {
            Some(token) => token.pos,
            None => self.lexer.pos(),
        }
    }

    pub(super) fn found(&self) -> String {
        match &self.current {
            Some(token) => token.kind.to_string(),
            None => "end of input".to_string(),
        }
    }

    pub(super) fn unexpected<T>(&self, expected: &str) -> CompileResult<T> {
        Err(CompileError::syntax(self.pos(), expected, self.found()))
    }

    pub(super) fn is_symbol(&self, c: char) -> bool {
        matches!(&self.current, Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == c)
    }

    pub(super) fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.current, Some(Token { kind: TokenKind::Keyword(k), .. }) if *k == kw)
    }

    pub(super) fn current_keyword(&self) -> Option<Keyword> {
        match &self.current {
            Some(Token {
                kind: TokenKind::Keyword(kw),
                ..
            }) => Some(*kw),
            _ => None,
        }
    }

    pub(super) fn consume_symbol(&mut self, c: char) -> CompileResult<bool> {
        if !self.is_symbol(c) {
            return Ok(false);
        }
        self.advance()?;
        Ok(true)
    }

    pub(super) fn consume_keyword(&mut self, kw: Keyword) -> CompileResult<bool> {
        if !self.is_keyword(kw) {
            return Ok(false);
        }
        self.advance()?;
        Ok(true)
    }

    pub(super) fn expect_symbol(&mut self, c: char) -> CompileResult<()> {
        if self.consume_symbol(c)? {
            Ok(())
        } else {
            self.unexpected(&format!("'{}'", c))
        }
    }

    pub(super) fn expect_keyword(&mut self, kw: Keyword) -> CompileResult<()> {
        if self.consume_keyword(kw)? {
            Ok(())
        } else {
            self.unexpected(&format!("'{}'", kw))
        }
    }

    pub(super) fn expect_identifier(&mut self) -> CompileResult<(String, Position)> {
        if let Some(Token {
            kind: TokenKind::Identifier(name),
            pos,
        }) = &self.current
        {
            let ident = (name.clone(), *pos);
            self.advance()?;
            return Ok(ident);
        }
        self.unexpected("identifier")
    }

    pub(super) fn in_function(&self) -> bool {
        matches!(
            &self.subroutine,
            Some(Subroutine {
                kind: SubroutineKind::Function,
                ..
            })
        )
    }

    /// Looks up a variable that is about to be read or written.
    pub(super) fn lookup_var(&self, name: &str, pos: Position) -> CompileResult<Symbol> {
        let Some(symbol) = self.scopes.resolve(name).symbol().cloned() else {
            return Err(CompileError::semantic(
                pos,
                format!("undefined variable `{}`", name),
            ));
        };
        if symbol.kind == Kind::Field && self.in_function() {
            return Err(CompileError::semantic(
                pos,
                format!("field `{}` cannot be used inside a function", name),
            ));
        }
        Ok(symbol)
    }

    pub(super) fn push_symbol(&mut self, symbol: &Symbol) -> CompileResult<()> {
        Ok(self.writer.write_push(symbol.kind.segment(), symbol.index)?)
    }

    pub(super) fn pop_symbol(&mut self, symbol: &Symbol) -> CompileResult<()> {
        Ok(self.writer.write_pop(symbol.kind.segment(), symbol.index)?)
    }

    /// class = "class" className "{" classVarDec* subroutineDec* "}"
    fn parse_class(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Class)?;
        let (name, _) = self.expect_identifier()?;
        debug!("compiling class {}", name);
        self.class_name = name;
        self.expect_symbol('{')?;

        while matches!(
            self.current_keyword(),
            Some(Keyword::Static | Keyword::Field)
        ) {
            self.parse_class_var_dec()?;
        }

        while let Some(kind) = self
            .current_keyword()
            .and_then(SubroutineKind::from_keyword)
        {
            self.parse_subroutine_dec(kind)?;
        }

        self.expect_symbol('}')
    }

    /// type = "int" | "char" | "boolean" | className
    fn parse_type(&mut self) -> CompileResult<VarType> {
        let ty = match &self.current {
            Some(Token {
                kind: TokenKind::Keyword(Keyword::Int),
                ..
            }) => VarType::Int,
            Some(Token {
                kind: TokenKind::Keyword(Keyword::Char),
                ..
            }) => VarType::Char,
            Some(Token {
                kind: TokenKind::Keyword(Keyword::Boolean),
                ..
            }) => VarType::Boolean,
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => VarType::Class(name.clone()),
            _ => return self.unexpected("type"),
        };
        self.advance()?;
        Ok(ty)
    }

    /// classVarDec = ("static" | "field") type varName ("," varName)* ";"
    fn parse_class_var_dec(&mut self) -> CompileResult<()> {
        let kind = if self.consume_keyword(Keyword::Static)? {
            Kind::Static
        } else {
            self.expect_keyword(Keyword::Field)?;
            Kind::Field
        };
        let ty = self.parse_type()?;

        loop {
            let (name, pos) = self.expect_identifier()?;
            self.scopes
                .define_class_var(&name, kind, ty.clone())
                .map_err(|e| CompileError::semantic(pos, e.to_string()))?;
            if !self.consume_symbol(',')? {
                break;
            }
        }
        self.expect_symbol(';')
    }

    /// subroutineDec = ("constructor" | "function" | "method") ("void" | type)
    ///                 subroutineName "(" parameterList ")" subroutineBody
    fn parse_subroutine_dec(&mut self, kind: SubroutineKind) -> CompileResult<()> {
        self.advance()?;
        let type_pos = self.pos();
        let return_type = if self.consume_keyword(Keyword::Void)? {
            None
        } else {
            Some(self.parse_type()?)
        };
        let (name, name_pos) = self.expect_identifier()?;

        if kind == SubroutineKind::Constructor
            && return_type.as_ref().and_then(VarType::class_name) != Some(self.class_name.as_str())
        {
            return Err(CompileError::semantic(
                type_pos,
                format!(
                    "constructor `{}` must return `{}`",
                    name, self.class_name
                ),
            ));
        }

        self.scopes.start_subroutine();
        if kind == SubroutineKind::Method {
            let receiver = VarType::Class(self.class_name.clone());
            self.scopes
                .define_subroutine_var("this", Kind::Argument, receiver)
                .map_err(|e| CompileError::semantic(name_pos, e.to_string()))?;
        }

        self.expect_symbol('(')?;
        let n_params = self.parse_parameter_list()?;
        self.expect_symbol(')')?;

        self.subroutines.declare(&name, kind, n_params, name_pos)?;
        self.subroutine = Some(Subroutine {
            kind,
            name,
            return_type,
        });
        self.parse_subroutine_body()?;
        self.subroutine = None;
        Ok(())
    }

    /// parameterList = ((type varName) ("," type varName)*)?
    fn parse_parameter_list(&mut self) -> CompileResult<u16> {
        if self.is_symbol(')') {
            return Ok(0);
        }

        let mut n_params = 0;
        loop {
            let ty = self.parse_type()?;
            let (name, pos) = self.expect_identifier()?;
            self.scopes
                .define_subroutine_var(&name, Kind::Argument, ty)
                .map_err(|e| CompileError::semantic(pos, e.to_string()))?;
            n_params = increment(n_params, "parameters", pos)?;
            if !self.consume_symbol(',')? {
                break;
            }
        }
        Ok(n_params)
    }

    /// subroutineBody = "{" varDec* statements "}"
    fn parse_subroutine_body(&mut self) -> CompileResult<()> {
        self.expect_symbol('{')?;
        while self.is_keyword(Keyword::Var) {
            self.parse_var_dec()?;
        }

        let Some(Subroutine { kind, name, .. }) = self.subroutine.clone() else {
            unreachable!("subroutine body outside of a subroutine declaration");
        };
        let full_name = format!("{}.{}", self.class_name, name);
        let n_locals = self.scopes.var_count(Kind::Local);
        debug!("{} {} with {} local(s)", kind, full_name, n_locals);
        self.writer.write_function(&full_name, n_locals)?;

        match kind {
            SubroutineKind::Constructor => {
                let n_fields = self.scopes.var_count(Kind::Field);
                self.writer.write_push(Segment::Constant, n_fields)?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Method => {
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Function => (),
        }

        self.parse_statements()?;
        self.expect_symbol('}')
    }

    /// varDec = "var" type varName ("," varName)* ";"
    fn parse_var_dec(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.parse_type()?;
        loop {
            let (name, pos) = self.expect_identifier()?;
            self.scopes
                .define_subroutine_var(&name, Kind::Local, ty.clone())
                .map_err(|e| CompileError::semantic(pos, e.to_string()))?;
            if !self.consume_symbol(',')? {
                break;
            }
        }
        self.expect_symbol(';')
    }
}
