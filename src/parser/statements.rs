use std::io::Write;

use crate::{
    error::{CompileError, CompileResult},
    lexer::Keyword,
    vm::{ArithmeticOp, Segment},
};

use super::Parser;

impl<W: Write> Parser<W> {
    /// statements = statement*
    pub(super) fn parse_statements(&mut self) -> CompileResult<()> {
        loop {
            match self.current_keyword() {
                Some(Keyword::Let) => self.parse_let()?,
                Some(Keyword::If) => self.parse_if()?,
                Some(Keyword::While) => self.parse_while()?,
                Some(Keyword::Do) => self.parse_do()?,
                Some(Keyword::Return) => self.parse_return()?,
                _ => return Ok(()),
            }
        }
    }

    /// let = "let" varName ("[" expression "]")? "=" expression ";"
    fn parse_let(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Let)?;
        let (name, pos) = self.expect_identifier()?;
        let target = self.lookup_var(&name, pos)?;

        if self.consume_symbol('[')? {
            self.push_symbol(&target)?;
            self.parse_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(ArithmeticOp::Add)?;

            self.expect_symbol('=')?;
            self.parse_expression()?;
            self.expect_symbol(';')?;

            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.expect_symbol('=')?;
            self.parse_expression()?;
            self.expect_symbol(';')?;
            self.pop_symbol(&target)?;
        }
        Ok(())
    }

    /// if = "if" "(" expression ")" "{" statements "}" ("else" "{" statements "}")?
    fn parse_if(&mut self) -> CompileResult<()> {
        let (false_label, end_label) = self.labels.new_if();

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.parse_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(ArithmeticOp::Not)?;
        self.writer.write_if(&false_label)?;

        self.parse_block()?;

        if self.consume_keyword(Keyword::Else)? {
            self.writer.write_goto(&end_label)?;
            self.writer.write_label(&false_label)?;
            self.parse_block()?;
            self.writer.write_label(&end_label)?;
        } else {
            self.writer.write_label(&false_label)?;
        }
        Ok(())
    }

    /// while = "while" "(" expression ")" "{" statements "}"
    fn parse_while(&mut self) -> CompileResult<()> {
        let (top_label, end_label) = self.labels.new_while();

        self.expect_keyword(Keyword::While)?;
        self.writer.write_label(&top_label)?;
        self.expect_symbol('(')?;
        self.parse_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(ArithmeticOp::Not)?;
        self.writer.write_if(&end_label)?;

        self.parse_block()?;

        self.writer.write_goto(&top_label)?;
        self.writer.write_label(&end_label)?;
        Ok(())
    }

    /// do = "do" subroutineCall ";"
    fn parse_do(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Do)?;
        let (name, pos) = self.expect_identifier()?;
        self.parse_call(name, pos)?;
        self.expect_symbol(';')?;
        // every call leaves one value behind
        self.writer.write_pop(Segment::Temp, 0)?;
        Ok(())
    }

    /// return = "return" expression? ";"
    fn parse_return(&mut self) -> CompileResult<()> {
        let pos = self.pos();
        self.expect_keyword(Keyword::Return)?;
        let returns_void = self
            .subroutine
            .as_ref()
            .map_or(true, |s| s.return_type.is_none());

        if self.is_symbol(';') {
            if !returns_void {
                return Err(CompileError::semantic(
                    pos,
                    "missing return value in a non-void subroutine",
                ));
            }
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            if returns_void {
                return Err(CompileError::semantic(
                    pos,
                    "a void subroutine cannot return a value",
                ));
            }
            self.parse_expression()?;
        }

        self.expect_symbol(';')?;
        self.writer.write_return()?;
        Ok(())
    }

    fn parse_block(&mut self) -> CompileResult<()> {
        self.expect_symbol('{')?;
        self.parse_statements()?;
        self.expect_symbol('}')
    }
}
