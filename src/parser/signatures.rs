use std::collections::HashMap;
use std::fmt;

use crate::{
    analyzer::VarType,
    error::{CompileError, CompileResult, Position},
    lexer::Keyword,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

impl SubroutineKind {
    pub fn from_keyword(kw: Keyword) -> Option<Self> {
        match kw {
            Keyword::Constructor => Some(SubroutineKind::Constructor),
            Keyword::Function => Some(SubroutineKind::Function),
            Keyword::Method => Some(SubroutineKind::Method),
            _ => None,
        }
    }
}

impl fmt::Display for SubroutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubroutineKind::Constructor => "constructor",
            SubroutineKind::Function => "function",
            SubroutineKind::Method => "method",
        };
        f.write_str(s)
    }
}

/// The subroutine whose body is being compiled.
#[derive(Clone, Debug)]
pub(super) struct Subroutine {
    pub kind: SubroutineKind,
    pub name: String,
    /// `None` for `void`.
    pub return_type: Option<VarType>,
}

#[derive(Clone, Debug)]
struct Signature {
    kind: SubroutineKind,
    n_params: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CallForm {
    /// `f(...)` or `var.f(...)`: a receiver is pushed first.
    Receiver,
    /// `Class.f(...)`: no receiver.
    Static,
}

#[derive(Clone, Debug)]
pub(super) struct PendingCall {
    pub name: String,
    pub form: CallForm,
    pub n_args: u16,
    pub pos: Position,
}

/// Subroutines declared by the class being compiled, and the calls into
/// that class that can only be checked once every declaration has been seen.
#[derive(Debug, Default)]
pub(super) struct ClassSubroutines {
    declared: HashMap<String, Signature>,
    calls: Vec<PendingCall>,
}

impl ClassSubroutines {
    pub fn declare(
        &mut self,
        name: &str,
        kind: SubroutineKind,
        n_params: u16,
        pos: Position,
    ) -> CompileResult<()> {
        if self.declared.contains_key(name) {
            return Err(CompileError::semantic(
                pos,
                format!("subroutine `{}` is already declared", name),
            ));
        }
        self.declared
            .insert(name.to_string(), Signature { kind, n_params });
        Ok(())
    }

    pub fn record_call(&mut self, call: PendingCall) {
        self.calls.push(call);
    }

    pub fn check(&self, class_name: &str) -> CompileResult<()> {
        for call in &self.calls {
            let full_name = format!("{}.{}", class_name, call.name);
            let Some(sig) = self.declared.get(&call.name) else {
                return Err(CompileError::semantic(
                    call.pos,
                    format!("`{}` is not declared", full_name),
                ));
            };

            match (call.form, sig.kind) {
                (CallForm::Receiver, SubroutineKind::Method)
                | (CallForm::Static, SubroutineKind::Function | SubroutineKind::Constructor) => (),
                (CallForm::Receiver, kind) => {
                    return Err(CompileError::semantic(
                        call.pos,
                        format!("`{}` is a {}, not a method", full_name, kind),
                    ));
                }
                (CallForm::Static, SubroutineKind::Method) => {
                    return Err(CompileError::semantic(
                        call.pos,
                        format!("`{}` is a method and needs a receiver", full_name),
                    ));
                }
            }

            if call.n_args != sig.n_params {
                return Err(CompileError::semantic(
                    call.pos,
                    format!(
                        "`{}` expects {} argument(s), got {}",
                        full_name, sig.n_params, call.n_args
                    ),
                ));
            }
        }
        Ok(())
    }
}
