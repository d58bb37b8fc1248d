use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use insta::assert_snapshot;
use jackc::driver::{self, BootstrapMode};
use jackc::error::CompileError;
use jackc::hack::{assemble, Cpu};
use jackc::translator::TranslateOptions;

fn compile(source: &str) -> String {
    jackc::compile(source).unwrap()
}

fn quiet() -> TranslateOptions {
    TranslateOptions { comments: false }
}

/// Assembles and runs `asm` with the stack pointer at 256.
fn run_asm(asm: &str, cycles: u64) -> Cpu {
    let mut cpu = Cpu::new(assemble(asm).unwrap());
    cpu.ram_mut()[0] = 256;
    cpu.run(cycles).unwrap();
    cpu
}

fn push_value(value: i32) -> String {
    match value {
        -32768 => "push constant 32767\nneg\npush constant 1\nsub".to_string(),
        v if v < 0 => format!("push constant {}\nneg", -v),
        v => format!("push constant {}", v),
    }
}

fn evaluate(x: i32, op: &str, y: i32) -> i16 {
    let vm = format!("{}\n{}\n{}\n", push_value(x), push_value(y), op);
    let asm = jackc::translate(&[("Test", vm.as_str())], false, quiet()).unwrap();
    let cpu = run_asm(&asm, 1_000);
    assert!(cpu.is_halted());
    assert_eq!(cpu.ram()[0], 257, "{x} {op} {y} must leave one value");
    cpu.stack_top().unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jackc_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn method_binds_receiver_before_field_access() {
    let vm = compile(
        "class Point {
            field int x;
            method int get() { return x; }
        }",
    );
    assert_snapshot!(vm, @r"
    function Point.get 0
    push argument 0
    pop pointer 0
    push this 0
    return
    ");
}

#[test]
fn if_else_keeps_both_branches() {
    let vm = compile(
        "class Main {
            function int pick() {
                if (false) { return 1; } else { return 2; }
            }
        }",
    );
    assert_snapshot!(vm, @r"
    function Main.pick 0
    push constant 0
    not
    if-goto IF_FALSE0
    push constant 1
    return
    goto IF_END0
    label IF_FALSE0
    push constant 2
    return
    label IF_END0
    ");
}

#[test]
fn constructor_allocates_every_field() {
    let vm = compile(
        "class Pair {
            field int a, b;
            static int count;
            constructor Pair new(int x, int y) {
                var int unused;
                let a = x;
                let b = y;
                return this;
            }
        }",
    );
    assert_snapshot!(vm, @r"
    function Pair.new 1
    push constant 2
    call Memory.alloc 1
    pop pointer 0
    push argument 0
    pop this 0
    push argument 1
    pop this 1
    push pointer 0
    return
    ");
}

#[test]
fn local_count_matches_var_declarations() {
    let vm = compile(
        "class Main {
            field int ignored;
            function void main() {
                var int a, b;
                var Array c;
                var boolean d;
                return;
            }
        }",
    );
    assert_eq!(vm.lines().next(), Some("function Main.main 4"));
}

#[test]
fn nested_control_flow_labels_are_distinct() {
    let vm = compile(
        "class Main {
            function void main() {
                var int i;
                while (i < 10) {
                    if (i = 3) { let i = i + 2; } else { let i = i + 1; }
                    while (false) { }
                }
                if (true) { }
                return;
            }
            function void other() {
                if (true) { }
                return;
            }
        }",
    );
    let labels: Vec<&str> = vm
        .lines()
        .filter_map(|line| line.strip_prefix("label "))
        .collect();
    let unique: HashSet<&str> = labels.iter().copied().collect();
    assert_eq!(labels.len(), 8);
    assert_eq!(unique.len(), labels.len());
}

#[test]
fn while_loop_layout() {
    let vm = compile(
        "class Main {
            function void count(int n) {
                while (n > 0) {
                    let n = n - 1;
                }
                return;
            }
        }",
    );
    assert_snapshot!(vm, @r"
    function Main.count 0
    label WHILE_EXP0
    push argument 0
    push constant 0
    gt
    not
    if-goto WHILE_END0
    push argument 0
    push constant 1
    sub
    pop argument 0
    goto WHILE_EXP0
    label WHILE_END0
    push constant 0
    return
    ");
}

#[test]
fn if_without_else_has_a_single_label() {
    let vm = compile(
        "class Main {
            function int clamp(int n) {
                if (n < 0) {
                    let n = 0;
                }
                return n;
            }
        }",
    );
    assert_snapshot!(vm, @r"
    function Main.clamp 0
    push argument 0
    push constant 0
    lt
    not
    if-goto IF_FALSE0
    push constant 0
    pop argument 0
    label IF_FALSE0
    push argument 0
    return
    ");
}

fn semantic_error(source: &str) -> String {
    match jackc::compile(source) {
        Err(err @ CompileError::Semantic { .. }) => err.to_string(),
        other => panic!("expected a semantic error, got {other:?}"),
    }
}

#[test]
fn return_must_match_declared_type() {
    let err = semantic_error("class Main { function int f() { return; } }");
    assert!(err.contains("missing return value"));

    let err = semantic_error("class Main { function void f() { return 1; } }");
    assert!(err.contains("void subroutine cannot return a value"));
}

#[test]
fn functions_have_no_receiver() {
    let err = semantic_error("class Main { function Main f() { return this; } }");
    assert!(err.contains("`this` cannot be used inside a function"));

    let err = semantic_error(
        "class Main { field int x; function int f() { return x; } }",
    );
    assert!(err.contains("field `x` cannot be used inside a function"));

    let err = semantic_error(
        "class Main {
            method void m() { return; }
            function void f() { do m(); return; }
        }",
    );
    assert!(err.contains("cannot be called from a function without a receiver"));
}

#[test]
fn method_called_through_class_name() {
    let err = semantic_error(
        "class Main {
            method void m() { return; }
            function void f() { do Main.m(); return; }
        }",
    );
    assert!(err.contains("`Main.m` is a method and needs a receiver"));
}

#[test]
fn compile_errors_carry_positions() {
    let err = jackc::compile("class Main {\n  function void main() {\n    let x = 1;\n  }\n}")
        .unwrap_err();
    assert_eq!(err.pos().map(|p| p.line), Some(3));

    let err = jackc::compile("class Main { /* never closed").unwrap_err();
    assert!(err.to_string().contains("lexical error"));
}

#[test]
fn seven_plus_eight_round_trip() {
    let test = "function Test.run 0\npush constant 7\npush constant 8\nadd\nreturn\n";
    let sys = "function Sys.init 0\ncall Test.run 0\nlabel END\ngoto END\n";
    let asm = jackc::translate(&[("Sys", sys), ("Test", test)], true, quiet()).unwrap();

    let mut cpu = Cpu::new(assemble(&asm).unwrap());
    cpu.run(10_000).unwrap();
    assert_eq!(cpu.ram()[0], 262);
    assert_eq!(cpu.ram()[261], 15);
    assert_eq!(cpu.stack_top(), Some(15));
}

#[test]
fn comparisons_survive_overflow() {
    let cases = [
        (-32767, "gt", 2, 0),
        (2, "gt", -32767, -1),
        (32767, "lt", -2, 0),
        (-2, "lt", 32767, -1),
        (-32768, "lt", 1, -1),
        (1, "gt", -32768, -1),
        (5, "gt", 3, -1),
        (3, "gt", 5, 0),
        (4, "gt", 4, 0),
        (4, "lt", 4, 0),
        (-3, "lt", -2, -1),
        (-3, "gt", -2, 0),
        (4, "eq", 4, -1),
        (4, "eq", 5, 0),
    ];
    for (x, op, y, expected) in cases {
        assert_eq!(evaluate(x, op, y), expected, "{x} {op} {y}");
    }
}

#[test]
fn arithmetic_and_logic_on_the_emulator() {
    assert_eq!(evaluate(9, "sub", 12), -3);
    assert_eq!(evaluate(32767, "add", 1), -32768);
    assert_eq!(evaluate(12, "and", 10), 8);
    assert_eq!(evaluate(12, "or", 3), 15);
}

#[test]
fn eq_labels_unique_across_units() {
    let unit = "push constant 1\npush constant 1\neq\n";
    let asm = jackc::translate(&[("A", unit), ("B", unit)], false, quiet()).unwrap();
    assert_eq!(asm.matches("(EQ_TRUE0)").count(), 1);
    assert_eq!(asm.matches("(EQ_TRUE1)").count(), 1);
    assert!(assemble(&asm).is_ok());
}

#[test]
fn statics_are_private_to_their_unit() {
    let a = "push constant 3\npop static 0\n";
    let b = "push constant 4\npop static 0\npush static 0\n";
    let asm = jackc::translate(&[("A", a), ("B", b)], false, quiet()).unwrap();
    let cpu = run_asm(&asm, 1_000);
    assert_eq!(cpu.ram()[16], 3);
    assert_eq!(cpu.ram()[17], 4);
    assert_eq!(cpu.stack_top(), Some(4));
}

#[test]
fn translate_reports_unit_and_line() {
    let err = jackc::translate(&[("Main", "push constant 1\npop constant 0\n")], false, quiet())
        .unwrap_err();
    assert!(err.to_string().starts_with("Main.vm:2:"));
}

#[test]
fn build_runs_a_compiled_program() {
    let dir = temp_dir("build");
    fs::write(
        dir.join("Main.jack"),
        "class Main {
            function int sum(int n) {
                var int i, total;
                let i = 1;
                let total = 0;
                while (~(i > n)) {
                    let total = total + i;
                    let i = i + 1;
                }
                return total;
            }
        }",
    )
    .unwrap();
    fs::write(
        dir.join("Sys.jack"),
        "class Sys {
            static int result;
            function void init() {
                let result = Main.sum(10);
                while (true) { }
                return;
            }
        }",
    )
    .unwrap();

    let output = driver::build(&dir, BootstrapMode::Auto, TranslateOptions::default()).unwrap();
    assert!(dir.join("Main.vm").is_file());
    assert!(dir.join("Sys.vm").is_file());
    let canonical = fs::canonicalize(&dir).unwrap();
    let name = canonical.file_name().unwrap().to_str().unwrap();
    assert_eq!(output, canonical.join(format!("{name}.asm")));

    let asm = fs::read_to_string(&output).unwrap();
    assert!(asm.starts_with("// bootstrap\n"));
    let mut cpu = Cpu::new(assemble(&asm).unwrap());
    cpu.run(20_000).unwrap();
    assert_eq!(cpu.ram()[16], 55);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_compile_writes_nothing() {
    let dir = temp_dir("failed");
    let source = dir.join("Broken.jack");
    fs::write(&source, "class Broken { function void f() { return } }").unwrap();

    assert!(driver::compile_path(&source).is_err());
    assert!(!dir.join("Broken.vm").exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn single_vm_file_without_sys_skips_bootstrap() {
    let dir = temp_dir("single");
    let source = dir.join("Prog.vm");
    fs::write(&source, "push constant 2\npush constant 3\nadd\n").unwrap();

    let output = driver::translate_path(&source, BootstrapMode::Auto, quiet()).unwrap();
    assert_eq!(output, dir.join("Prog.asm"));
    let asm = fs::read_to_string(&output).unwrap();
    assert!(asm.starts_with("@2\n"));
    assert_eq!(run_asm(&asm, 1_000).stack_top(), Some(5));

    fs::remove_dir_all(&dir).unwrap();
}
