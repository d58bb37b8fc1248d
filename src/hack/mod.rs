//! Hack assembler and CPU, used to execute translated programs.

mod assembler;
mod cpu;

pub use assembler::*;
pub use cpu::*;
