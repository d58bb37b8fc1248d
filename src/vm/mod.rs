mod instruction;

pub use instruction::*;
