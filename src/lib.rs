pub mod analyzer;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod hack;
pub mod lexer;
pub mod parser;
pub mod translator;
pub mod vm;

use error::CompileResult;
use parser::Parser;
use translator::{TranslateError, TranslateOptions, Translator};

/// Compiles the source of one Jack class to VM code.
pub fn compile(source: &str) -> CompileResult<String> {
    let parser = Parser::new(source, Vec::new());
    let vm = parser.compile_class()?;
    Ok(String::from_utf8_lossy(&vm).into_owned())
}

/// Translates named VM units into one assembly listing, in the given order.
pub fn translate(
    units: &[(&str, &str)],
    bootstrap: bool,
    options: TranslateOptions,
) -> Result<String, TranslateError> {
    let mut translator = Translator::new(options);
    let mut asm = Vec::new();
    if bootstrap {
        asm.extend_from_slice(translator.bootstrap().as_bytes());
    }
    for (unit, source) in units {
        translator.translate_unit(unit, source, &mut asm)?;
    }
    Ok(String::from_utf8_lossy(&asm).into_owned())
}
