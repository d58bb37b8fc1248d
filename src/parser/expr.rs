use std::io::Write;

use crate::{
    analyzer::Resolution,
    error::{CompileError, CompileResult, Position},
    lexer::{Keyword, Token, TokenKind},
    vm::{ArithmeticOp, Segment},
};

use super::{
    parser::increment,
    signatures::{CallForm, PendingCall},
    Parser,
};

const BINARY_OPS: [char; 9] = ['+', '-', '*', '/', '&', '|', '<', '>', '='];

impl<W: Write> Parser<W> {
    /// expression = term (op term)*
    ///
    /// Operators apply strictly left to right; there is no precedence.
    pub(super) fn parse_expression(&mut self) -> CompileResult<()> {
        self.parse_term()?;
        while let Some(op) = self.current_binary_op() {
            self.advance()?;
            self.parse_term()?;
            self.write_binary_op(op)?;
        }
        Ok(())
    }

    fn current_binary_op(&self) -> Option<char> {
        match &self.current {
            Some(Token {
                kind: TokenKind::Symbol(c),
                ..
            }) if BINARY_OPS.contains(c) => Some(*c),
            _ => None,
        }
    }

    fn write_binary_op(&mut self, op: char) -> CompileResult<()> {
        match op {
            '+' => self.writer.write_arithmetic(ArithmeticOp::Add)?,
            '-' => self.writer.write_arithmetic(ArithmeticOp::Sub)?,
            '*' => self.writer.write_call("Math.multiply", 2)?,
            '/' => self.writer.write_call("Math.divide", 2)?,
            '&' => self.writer.write_arithmetic(ArithmeticOp::And)?,
            '|' => self.writer.write_arithmetic(ArithmeticOp::Or)?,
            '<' => self.writer.write_arithmetic(ArithmeticOp::Lt)?,
            '>' => self.writer.write_arithmetic(ArithmeticOp::Gt)?,
            '=' => self.writer.write_arithmetic(ArithmeticOp::Eq)?,
            _ => unreachable!("not a binary operator: {}", op),
        }
        Ok(())
    }

    /// term = integerConstant | stringConstant | keywordConstant
    ///      | varName | varName "[" expression "]" | subroutineCall
    ///      | "(" expression ")" | ("-" | "~") term
    fn parse_term(&mut self) -> CompileResult<()> {
        let Some(Token { kind, pos }) = self.current.clone() else {
            return self.unexpected("term");
        };

        match kind {
            TokenKind::IntConst(n) => {
                self.advance()?;
                self.writer.write_push(Segment::Constant, n)?;
            }
            TokenKind::StringConst(s) => {
                self.advance()?;
                self.write_string(&s, pos)?;
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                self.writer.write_push(Segment::Constant, 1)?;
                self.writer.write_arithmetic(ArithmeticOp::Neg)?;
            }
            TokenKind::Keyword(Keyword::False | Keyword::Null) => {
                self.advance()?;
                self.writer.write_push(Segment::Constant, 0)?;
            }
            TokenKind::Keyword(Keyword::This) => {
                if self.in_function() {
                    return Err(CompileError::semantic(
                        pos,
                        "`this` cannot be used inside a function",
                    ));
                }
                self.advance()?;
                self.writer.write_push(Segment::Pointer, 0)?;
            }
            TokenKind::Symbol('(') => {
                self.advance()?;
                self.parse_expression()?;
                self.expect_symbol(')')?;
            }
            TokenKind::Symbol('-') => {
                self.advance()?;
                self.parse_term()?;
                self.writer.write_arithmetic(ArithmeticOp::Neg)?;
            }
            TokenKind::Symbol('~') => {
                self.advance()?;
                self.parse_term()?;
                self.writer.write_arithmetic(ArithmeticOp::Not)?;
            }
            TokenKind::Identifier(name) => {
                self.advance()?;
                self.parse_identifier_term(name, pos)?;
            }
            _ => return self.unexpected("term"),
        }
        Ok(())
    }

    /// Decided by the token after the identifier: `[` indexes an array,
    /// `(` or `.` is a call, anything else reads the variable.
    fn parse_identifier_term(&mut self, name: String, pos: Position) -> CompileResult<()> {
        if self.consume_symbol('[')? {
            let base = self.lookup_var(&name, pos)?;
            self.push_symbol(&base)?;
            self.parse_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(ArithmeticOp::Add)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::That, 0)?;
            Ok(())
        } else if self.is_symbol('(') || self.is_symbol('.') {
            self.parse_call(name, pos)
        } else {
            let symbol = self.lookup_var(&name, pos)?;
            self.push_symbol(&symbol)
        }
    }

    /// subroutineCall = subroutineName "(" expressionList ")"
    ///                | (className | varName) "." subroutineName "(" expressionList ")"
    pub(super) fn parse_call(&mut self, name: String, pos: Position) -> CompileResult<()> {
        if self.consume_symbol('(')? {
            if self.in_function() {
                return Err(CompileError::semantic(
                    pos,
                    format!("method `{}` cannot be called from a function without a receiver", name),
                ));
            }
            self.writer.write_push(Segment::Pointer, 0)?;
            let n_args = self.parse_expression_list()?;
            self.expect_symbol(')')?;
            let target = format!("{}.{}", self.class_name, name);
            self.writer
                .write_call(&target, increment(n_args, "arguments", pos)?)?;
            self.subroutines.record_call(PendingCall {
                name,
                form: CallForm::Receiver,
                n_args,
                pos,
            });
            return Ok(());
        }

        if !self.consume_symbol('.')? {
            return self.unexpected("'(' or '.'");
        }
        let (sub_name, _) = self.expect_identifier()?;
        self.expect_symbol('(')?;

        let receiver = match self.scopes.resolve(&name) {
            Resolution::NotFound => None,
            _ => Some(self.lookup_var(&name, pos)?),
        };

        match receiver {
            Some(symbol) => {
                let Some(class) = symbol.ty.class_name().map(str::to_string) else {
                    return Err(CompileError::semantic(
                        pos,
                        format!(
                            "cannot call `{}` on `{}` of type {}",
                            sub_name, name, symbol.ty
                        ),
                    ));
                };
                self.push_symbol(&symbol)?;
                let n_args = self.parse_expression_list()?;
                self.expect_symbol(')')?;
                self.writer
                    .write_call(
                        &format!("{}.{}", class, sub_name),
                        increment(n_args, "arguments", pos)?,
                    )?;
                if class == self.class_name {
                    self.subroutines.record_call(PendingCall {
                        name: sub_name,
                        form: CallForm::Receiver,
                        n_args,
                        pos,
                    });
                }
            }
            None => {
                let n_args = self.parse_expression_list()?;
                self.expect_symbol(')')?;
                self.writer
                    .write_call(&format!("{}.{}", name, sub_name), n_args)?;
                if name == self.class_name {
                    self.subroutines.record_call(PendingCall {
                        name: sub_name,
                        form: CallForm::Static,
                        n_args,
                        pos,
                    });
                }
            }
        }
        Ok(())
    }

    /// expressionList = (expression ("," expression)*)?
    fn parse_expression_list(&mut self) -> CompileResult<u16> {
        if self.is_symbol(')') {
            return Ok(0);
        }

        let pos = self.pos();
        let mut n_args = 1;
        self.parse_expression()?;
        while self.consume_symbol(',')? {
            self.parse_expression()?;
            n_args = increment(n_args, "arguments", pos)?;
        }
        Ok(n_args)
    }

    /// `String.new(len)` followed by one `appendChar` per character.
    fn write_string(&mut self, s: &str, pos: Position) -> CompileResult<()> {
        let codes = s
            .chars()
            .map(|c| match u16::try_from(u32::from(c)) {
                Ok(code) if code <= 32767 => Ok(code),
                _ => Err(CompileError::semantic(
                    pos,
                    format!("character {:?} cannot be stored in a string constant", c),
                )),
            })
            .collect::<CompileResult<Vec<u16>>>()?;
        let len = u16::try_from(codes.len())
            .ok()
            .filter(|&len| len <= 32767)
            .ok_or_else(|| CompileError::semantic(pos, "string constant is too long"))?;

        self.writer.write_push(Segment::Constant, len)?;
        self.writer.write_call("String.new", 1)?;
        for code in codes {
            self.writer.write_push(Segment::Constant, code)?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::CompileError, parser::Parser};

    fn compile_body(body: &str) -> Result<String, CompileError> {
        let source = format!(
            "class Main {{ field int f; static Array arr; method int run(int a, Main m) {{ var int x; {} }} }}",
            body
        );
        let out = Parser::new(&source, Vec::new()).compile_class()?;
        let vm = String::from_utf8(out).unwrap();
        Ok(vm
            .lines()
            .skip(3)
            .map(|l| format!("{}\n", l))
            .collect())
    }

    #[test]
    fn left_to_right_without_precedence() {
        assert_eq!(
            compile_body("return 1 + 2 * 3;").unwrap(),
            "push constant 1\n\
             push constant 2\n\
             add\n\
             push constant 3\n\
             call Math.multiply 2\n\
             return\n"
        );
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            compile_body("return 1 - (2 / x);").unwrap(),
            "push constant 1\n\
             push constant 2\n\
             push local 0\n\
             call Math.divide 2\n\
             sub\n\
             return\n"
        );
    }

    #[test]
    fn keyword_constants_and_unary_ops() {
        assert_eq!(
            compile_body("return ~true & (-a = null) | false;").unwrap(),
            "push constant 1\n\
             neg\n\
             not\n\
             push argument 1\n\
             neg\n\
             push constant 0\n\
             eq\n\
             and\n\
             push constant 0\n\
             or\n\
             return\n"
        );
    }

    #[test]
    fn variables_resolve_to_segments() {
        assert_eq!(
            compile_body("return f + arr + a + m + x;").unwrap(),
            "push this 0\n\
             push static 0\n\
             add\n\
             push argument 1\n\
             add\n\
             push argument 2\n\
             add\n\
             push local 0\n\
             add\n\
             return\n"
        );
    }

    #[test]
    fn array_read() {
        assert_eq!(
            compile_body("return arr[x + 1];").unwrap(),
            "push static 0\n\
             push local 0\n\
             push constant 1\n\
             add\n\
             add\n\
             pop pointer 1\n\
             push that 0\n\
             return\n"
        );
    }

    #[test]
    fn array_write_evaluates_target_before_value() {
        assert_eq!(
            compile_body("let arr[a] = x; return 0;").unwrap(),
            "push static 0\n\
             push argument 1\n\
             add\n\
             push local 0\n\
             pop temp 0\n\
             pop pointer 1\n\
             push temp 0\n\
             pop that 0\n\
             push constant 0\n\
             return\n"
        );
    }

    #[test]
    fn string_constant() {
        assert_eq!(
            compile_body("do Output.printString(\"Hi\"); return 0;").unwrap(),
            "push constant 2\n\
             call String.new 1\n\
             push constant 72\n\
             call String.appendChar 2\n\
             push constant 105\n\
             call String.appendChar 2\n\
             call Output.printString 1\n\
             pop temp 0\n\
             push constant 0\n\
             return\n"
        );
    }

    #[test]
    fn call_forms() {
        assert_eq!(
            compile_body("do run(1, m); do m.run(2, this); do Math.max(a, 3); return 0;")
                .unwrap(),
            "push pointer 0\n\
             push constant 1\n\
             push argument 2\n\
             call Main.run 3\n\
             pop temp 0\n\
             push argument 2\n\
             push constant 2\n\
             push pointer 0\n\
             call Main.run 3\n\
             pop temp 0\n\
             push argument 1\n\
             push constant 3\n\
             call Math.max 2\n\
             pop temp 0\n\
             push constant 0\n\
             return\n"
        );
    }

    #[test]
    fn undefined_variable() {
        let err = compile_body("return y;").unwrap_err();
        assert!(err.to_string().contains("undefined variable `y`"));
    }

    #[test]
    fn method_call_on_primitive() {
        let err = compile_body("do x.foo(); return 0;").unwrap_err();
        assert!(err.to_string().contains("of type int"));
    }

    #[test]
    fn argument_count_mismatch_in_own_class() {
        let err = compile_body("do run(1); return 0;").unwrap_err();
        assert!(err.to_string().contains("expects 2 argument(s), got 1"));
    }

    #[test]
    fn argument_count_is_bounded() {
        let args = vec!["1"; 65536].join(",");
        let err = compile_body(&format!("do Output.print({}); return 0;", args)).unwrap_err();
        assert!(err.to_string().contains("too many arguments"));
    }

    #[test]
    fn missing_operand() {
        assert!(matches!(
            compile_body("return 1 + ;"),
            Err(CompileError::Syntax { .. })
        ));
    }

    #[test]
    fn missing_semicolon() {
        let err = compile_body("let x = 1 return x;").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected ';', found 'return'"));
    }
}
