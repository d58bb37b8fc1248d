//! Hack snippets for program flow and the function-call protocol.

use super::stack::{POP_D, PUSH_D};

/// Labels are scoped to the function that declares them.
pub(super) fn scoped_label(function: &str, label: &str) -> String {
    format!("{}${}", function, label)
}

pub(super) fn label(function: &str, label: &str) -> String {
    format!("({})", scoped_label(function, label))
}

pub(super) fn goto(function: &str, label: &str) -> String {
    format!("@{}\n0;JMP", scoped_label(function, label))
}

pub(super) fn if_goto(function: &str, label: &str) -> String {
    format!("{}\n@{}\nD;JNE", POP_D, scoped_label(function, label))
}

/// Entry label followed by one zero-initialized slot per local.
pub(super) fn function(name: &str, n_locals: u16) -> String {
    let mut lines = vec![format!("({})", name)];
    for _ in 0..n_locals {
        lines.push("@SP\nA=M\nM=0\n@SP\nM=M+1".to_string());
    }
    lines.join("\n")
}

/// Saves the caller's frame, repositions ARG and LCL, and jumps to `name`.
pub(super) fn call(name: &str, n_args: u16, return_label: &str) -> String {
    let mut lines = vec![format!("@{}\nD=A\n{}", return_label, PUSH_D)];
    for register in ["LCL", "ARG", "THIS", "THAT"] {
        lines.push(format!("@{}\nD=M\n{}", register, PUSH_D));
    }
    lines.push(format!(
        "@SP\nD=M\n@{}\nD=D-A\n@ARG\nM=D",
        u32::from(n_args) + 5
    ));
    lines.push("@SP\nD=M\n@LCL\nM=D".to_string());
    lines.push(format!("@{}\n0;JMP", name));
    lines.push(format!("({})", return_label));
    lines.join("\n")
}

/// Copies the return value to `*ARG`, restores the caller's frame and jumps
/// back. R13 holds the frame base, R14 the return address.
pub(super) fn return_() -> String {
    let mut lines = vec![
        "@LCL\nD=M\n@R13\nM=D".to_string(),
        "@5\nA=D-A\nD=M\n@R14\nM=D".to_string(),
        format!("{}\n@ARG\nA=M\nM=D", POP_D),
        "@ARG\nD=M+1\n@SP\nM=D".to_string(),
    ];
    for register in ["THAT", "THIS", "ARG", "LCL"] {
        lines.push(format!("@R13\nAM=M-1\nD=M\n@{}\nM=D", register));
    }
    lines.push("@R14\nA=M\n0;JMP".to_string());
    lines.join("\n")
}

/// `SP = 256`; the caller then emits `call Sys.init 0`.
pub(super) fn init_stack() -> String {
    "@256\nD=A\n@SP\nM=D".to_string()
}
