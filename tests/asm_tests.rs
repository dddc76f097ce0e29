//! End-to-end scenarios: assemble source text, execute it on the core,
//! observe registers, flags, memory and ports.

use otto85::runtime::DEFAULT_ORIGIN;
use otto85::{assemble, AsmOutput, Cpu, Flag};

fn run_program(src: &str) -> (Cpu, AsmOutput) {
    let out = assemble(src, "test.asm").expect("assembly failed");
    let mut cpu = Cpu::default();
    cpu.load(out.image.as_bytes(), DEFAULT_ORIGIN);
    cpu.run_to_halt(100_000).expect("runtime fault");
    assert!(cpu.halted(), "program did not halt");
    (cpu, out)
}

#[test]
fn add_two_bytes() {
    let (cpu, out) = run_program(
        "\
ORG 0800H
MVI A, 07h
MVI B, 05h
ADD B
HLT
",
    );
    assert_eq!(cpu.a(), 0x0C);
    assert!(!cpu.flag(Flag::Z));
    assert!(!cpu.flag(Flag::S));
    assert!(cpu.flag(Flag::P));
    assert!(!cpu.flag(Flag::Cy));
    assert!(!cpu.flag(Flag::Ac));
    assert_eq!(
        &out.image.as_bytes()[0x0800..0x0806],
        [0x3E, 0x07, 0x06, 0x05, 0x80, 0x76]
    );
}

#[test]
fn zero_flag_on_subtract() {
    let (cpu, _) = run_program("ORG 0800H\nMVI A, 42h\nSUI 42h\nHLT\n");
    assert_eq!(cpu.a(), 0x00);
    assert!(cpu.flag(Flag::Z));
    assert!(!cpu.flag(Flag::S));
    assert!(cpu.flag(Flag::P));
    assert!(!cpu.flag(Flag::Cy));
}

#[test]
fn carry_on_add_overflow() {
    let (cpu, _) = run_program("ORG 0800H\nMVI A, 0F0h\nADI 20h\nHLT\n");
    assert_eq!(cpu.a(), 0x10);
    assert!(cpu.flag(Flag::Cy));
    assert!(!cpu.flag(Flag::Ac));
}

#[test]
fn call_ret_preserves_pc_and_sp() {
    let (cpu, out) = run_program(
        "\
ORG 0800H
LXI SP, 2000h
CALL SUB
HLT
SUB:
RET
",
    );
    // PC rests on the byte after HLT, SP back where LXI left it
    assert_eq!(cpu.sp(), 0x2000);
    assert_eq!(cpu.pc(), 0x0807);
    assert_eq!(out.labels["SUB"], 0x0807);
}

#[test]
fn conditional_jump_taken() {
    let (cpu, _) = run_program(
        "\
ORG 0800H
MVI A, 0
CPI 1
JC TARGET
HLT
TARGET:
MVI A, 9
HLT
",
    );
    assert_eq!(cpu.a(), 9);
}

#[test]
fn conditional_jump_not_taken() {
    let (cpu, _) = run_program(
        "\
ORG 0800H
MVI A, 2
CPI 1
JC TARGET
HLT
TARGET:
MVI A, 9
HLT
",
    );
    assert_eq!(cpu.a(), 2);
}

#[test]
fn io_round_trip() {
    let (cpu, _) = run_program(
        "\
ORG 0800H
MVI A, 5Ah
OUT 10h
MVI A, 0
IN 10h
HLT
",
    );
    assert_eq!(cpu.a(), 0x5A);
    assert_eq!(cpu.io().latch(0x10), 0x5A);
}

#[test]
fn operand_classes_rejected() {
    for bad in [
        "MOV M, M\n",
        "LDAX H\n",
        "STAX H\n",
        "PUSH SP\n",
        "POP SP\n",
        "LXI PSW, 0\n",
    ] {
        assert!(assemble(bad, "bad.asm").is_err(), "{bad:?} should not assemble");
    }
}

#[test]
fn flag_determinism() {
    // Same source, two fresh machines, byte-identical outcomes
    let src = "\
ORG 0800H
LXI SP, 2000h
MVI A, 0C3h
MVI B, 77h
ADD B
DAA
RAL
CMP B
PUSH PSW
HLT
";
    let (one, _) = run_program(src);
    let (two, _) = run_program(src);
    assert_eq!(one.a(), two.a());
    assert_eq!(one.flags(), two.flags());
    assert_eq!(one.sp(), two.sp());
    assert_eq!(
        one.memory_slice(0x1FF0..0x2000),
        two.memory_slice(0x1FF0..0x2000)
    );
}

#[test]
fn loop_with_counter() {
    // Sum 1..=5 into A via a DCR/JNZ loop
    let (cpu, _) = run_program(
        "\
ORG 0800H
MVI A, 0
MVI B, 5
LOOP:
ADD B
DCR B
JNZ LOOP
HLT
",
    );
    assert_eq!(cpu.a(), 15);
}

#[test]
fn data_directives_feed_execution() {
    let (cpu, _) = run_program(
        "\
ORG 0900h
VALUE:
DB 2Ah
ORG 0800h
LDA VALUE
HLT
",
    );
    assert_eq!(cpu.a(), 0x2A);
}

#[test]
fn image_save_and_reload() {
    let out = assemble("ORG 0800h\nMVI A, 1\nHLT\n", "t.asm").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.bin");
    out.image.save(&path).unwrap();

    let reloaded = otto85::Image::from_file(&path).unwrap();
    assert_eq!(reloaded.as_bytes().len(), 0x10000);
    assert_eq!(reloaded.as_bytes(), out.image.as_bytes());
}
