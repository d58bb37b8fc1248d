mod expr;
mod parser;
mod signatures;
mod statements;

pub use parser::*;
pub use signatures::SubroutineKind;
