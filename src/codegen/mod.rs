mod labels;
mod vm_writer;

pub use labels::*;
pub use vm_writer::*;
