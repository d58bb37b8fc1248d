mod scopes;
mod symbol_table;

pub use scopes::*;
pub use symbol_table::*;
