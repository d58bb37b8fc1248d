//! Hack snippets for stack access and arithmetic.
//!
//! Each function returns newline-separated assembly without a trailing newline.

use crate::vm::{ArithmeticOp, Segment};

use super::LabelCounters;

const TEMP_BASE: u16 = 5;

/// `*SP = D; SP++`
pub(super) const PUSH_D: &str = "@SP\nA=M\nM=D\n@SP\nM=M+1";

/// `SP--; D = *SP`
pub(super) const POP_D: &str = "@SP\nAM=M-1\nD=M";

fn base_register(segment: Segment) -> Option<&'static str> {
    match segment {
        Segment::Local => Some("LCL"),
        Segment::Argument => Some("ARG"),
        Segment::This => Some("THIS"),
        Segment::That => Some("THAT"),
        _ => None,
    }
}

fn pointer_register(index: u16) -> &'static str {
    if index == 0 {
        "THIS"
    } else {
        "THAT"
    }
}

/// Statics are named per unit so different units never share a cell.
fn static_symbol(unit: &str, index: u16) -> String {
    format!("{}.{}", unit, index)
}

pub(super) fn push(segment: Segment, index: u16, unit: &str) -> String {
    let load = match segment {
        Segment::Constant => format!("@{}\nD=A", index),
        Segment::Local | Segment::Argument | Segment::This | Segment::That => format!(
            "@{}\nD=A\n@{}\nA=D+M\nD=M",
            index,
            base_register(segment).unwrap_or_default()
        ),
        Segment::Temp => format!("@{}\nD=M", TEMP_BASE + index),
        Segment::Static => format!("@{}\nD=M", static_symbol(unit, index)),
        Segment::Pointer => format!("@{}\nD=M", pointer_register(index)),
    };
    format!("{}\n{}", load, PUSH_D)
}

pub(super) fn pop(segment: Segment, index: u16, unit: &str) -> String {
    match segment {
        Segment::Local | Segment::Argument | Segment::This | Segment::That => format!(
            "@{}\nD=A\n@{}\nD=D+M\n@R13\nM=D\n{}\n@R13\nA=M\nM=D",
            index,
            base_register(segment).unwrap_or_default(),
            POP_D
        ),
        Segment::Temp => format!("{}\n@{}\nM=D", POP_D, TEMP_BASE + index),
        Segment::Static => format!("{}\n@{}\nM=D", POP_D, static_symbol(unit, index)),
        Segment::Pointer => format!("{}\n@{}\nM=D", POP_D, pointer_register(index)),
        Segment::Constant => unreachable!("pop constant is rejected by Instruction::validate"),
    }
}

pub(super) fn arithmetic(op: ArithmeticOp, counters: &mut LabelCounters) -> String {
    match op {
        ArithmeticOp::Add => binary("D+M"),
        ArithmeticOp::Sub => binary("M-D"),
        ArithmeticOp::And => binary("D&M"),
        ArithmeticOp::Or => binary("D|M"),
        ArithmeticOp::Neg => unary("-M"),
        ArithmeticOp::Not => unary("!M"),
        ArithmeticOp::Eq => eq(counters.next_eq()),
        ArithmeticOp::Gt => compare("GT", counters.next_gt(), "JGT"),
        ArithmeticOp::Lt => compare("LT", counters.next_lt(), "JLT"),
    }
}

/// `x op y`, where `D` holds `y` and `M` holds `x`; the result replaces `x`.
fn binary(comp: &str) -> String {
    format!("{}\nA=A-1\nM={}", POP_D, comp)
}

fn unary(comp: &str) -> String {
    format!("@SP\nA=M-1\nM={}", comp)
}

fn eq(n: usize) -> String {
    format!(
        "{pop}\nA=A-1\nD=M-D\nM=-1\n@EQ_TRUE{n}\nD;JEQ\n@SP\nA=M-1\nM=0\n(EQ_TRUE{n})",
        pop = POP_D,
        n = n
    )
}

/// Signed `gt` / `lt` that cannot overflow: operands of opposite signs are
/// decided by their signs alone, and only same-sign operands are subtracted.
fn compare(prefix: &str, n: usize, jump: &str) -> String {
    // result when x < 0 <= y, and when y < 0 <= x
    let (x_neg, x_nonneg) = if prefix == "GT" { ("0", "-1") } else { ("-1", "0") };
    let x_nonneg_label = format!("{}_X_NONNEG{}", prefix, n);
    let calc_label = format!("{}_CALC{}", prefix, n);
    let end_label = format!("{}_END{}", prefix, n);

    [
        POP_D.to_string(),
        "@R13\nM=D".to_string(),
        "@SP\nA=M-1\nD=M".to_string(),
        format!("@{}\nD;JGE", x_nonneg_label),
        format!("@R13\nD=M\n@{}\nD;JLT", calc_label),
        format!("@SP\nA=M-1\nM={}\n@{}\n0;JMP", x_neg, end_label),
        format!("({})", x_nonneg_label),
        format!("@R13\nD=M\n@{}\nD;JGE", calc_label),
        format!("@SP\nA=M-1\nM={}\n@{}\n0;JMP", x_nonneg, end_label),
        format!("({})", calc_label),
        "@R13\nD=M\n@SP\nA=M-1\nD=M-D\nM=-1".to_string(),
        format!("@{}\nD;{}", end_label, jump),
        "@SP\nA=M-1\nM=0".to_string(),
        format!("({})", end_label),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant() {
        assert_eq!(
            push(Segment::Constant, 7, "Main"),
            "@7\nD=A\n@SP\nA=M\nM=D\n@SP\nM=M+1"
        );
    }

    #[test]
    fn statics_are_named_per_unit() {
        assert!(push(Segment::Static, 3, "Foo").starts_with("@Foo.3\nD=M"));
        assert!(pop(Segment::Static, 3, "Bar").ends_with("@Bar.3\nM=D"));
    }

    #[test]
    fn pointer_and_temp_addresses() {
        assert!(push(Segment::Pointer, 0, "X").starts_with("@THIS\n"));
        assert!(pop(Segment::Pointer, 1, "X").ends_with("@THAT\nM=D"));
        assert!(push(Segment::Temp, 2, "X").starts_with("@7\nD=M"));
    }

    #[test]
    fn base_segments_use_r13() {
        assert_eq!(
            pop(Segment::Local, 2, "X"),
            "@2\nD=A\n@LCL\nD=D+M\n@R13\nM=D\n@SP\nAM=M-1\nD=M\n@R13\nA=M\nM=D"
        );
    }

    #[test]
    fn comparison_labels_are_unique() {
        let mut counters = LabelCounters::new();
        let first = arithmetic(ArithmeticOp::Eq, &mut counters);
        let second = arithmetic(ArithmeticOp::Eq, &mut counters);
        assert!(first.contains("(EQ_TRUE0)"));
        assert!(second.contains("(EQ_TRUE1)"));

        let gt = arithmetic(ArithmeticOp::Gt, &mut counters);
        let lt = arithmetic(ArithmeticOp::Lt, &mut counters);
        assert!(gt.contains("(GT_END0)") && gt.contains("(GT_CALC0)"));
        assert!(lt.contains("(LT_X_NONNEG0)") && lt.contains("D;JLT"));
        assert!(arithmetic(ArithmeticOp::Gt, &mut counters).contains("(GT_END1)"));
    }
}
