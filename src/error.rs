//! Diagnostic constructors for the assembler.
//!
//! The assembler stops at the first error, so each of these builds a
//! complete report with the offending span attached to a copy of the
//! source.

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::span::Span;

fn source(src: &str, path: &str) -> NamedSource<String> {
    NamedSource::new(path, src.to_string())
}

// Lexer errors

pub fn lex_unknown(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unknown",
        help = "only mnemonics, registers, labels, literals and `;` comments are allowed",
        labels = vec![LabeledSpan::at(span, "unknown token")],
        "Encountered an unknown token",
    )
    .with_source_code(source(src, path))
}

pub fn lex_bad_literal(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_lit",
        help = "valid forms are 123, 1Ah, 0x1A, $1A, 1011b, 17q and 'X'",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid numeric literal",
    )
    .with_source_code(source(src, path))
}

pub fn lit_too_large(span: Span, src: &str, path: &str, max: u16) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::range",
        help = format!("this operand accepts values from 0 to {max}"),
        labels = vec![LabeledSpan::at(span, "out-of-range literal")],
        "Literal does not fit in the operand width",
    )
    .with_source_code(source(src, path))
}

// Parser errors

pub fn parse_unexpected(span: Span, src: &str, path: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_token",
        help = "check the operands allowed for this instruction",
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Expected {expected}",
    )
    .with_source_code(source(src, path))
}

pub fn parse_eof(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_eof",
        help = "you may be missing operands in your last statement",
        labels = vec![LabeledSpan::at(span, "unexpected end of file")],
        "Unexpected end of file",
    )
    .with_source_code(source(src, path))
}

pub fn parse_unknown_mnemonic(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::mnemonic",
        help = "check the 8085 mnemonic listing; directives are ORG, DB, DW and EQU",
        labels = vec![LabeledSpan::at(span, "not a mnemonic or directive")],
        "Unknown mnemonic or directive",
    )
    .with_source_code(source(src, path))
}

// Directive errors

pub fn dir_malformed(span: Span, src: &str, path: &str, dir: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::dir",
        help = format!("usage: {dir} {expected}"),
        labels = vec![LabeledSpan::at(span, "malformed directive")],
        "Malformed {dir} directive",
    )
    .with_source_code(source(src, path))
}

// Label errors

pub fn label_duplicate(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "label::duplicate",
        help = "labels and EQU names may only be defined once per file",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label definition",
    )
    .with_source_code(source(src, path))
}

pub fn label_undefined(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "label::undefined",
        help = "labels are declared with `NAME:` and are case-sensitive",
        labels = vec![LabeledSpan::at(span, "undefined label")],
        "Label is not defined anywhere in the file",
    )
    .with_source_code(source(src, path))
}

// Operand errors

pub fn operand_bad_register(span: Span, src: &str, path: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::register",
        help = format!("this instruction accepts {expected}"),
        labels = vec![LabeledSpan::at(span, "register not allowed here")],
        "Register not admissible for this instruction",
    )
    .with_source_code(source(src, path))
}

pub fn operand_mov_mm(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::mov_mm",
        help = "memory-to-memory moves do not exist on the 8085; that slot is HLT",
        labels = vec![LabeledSpan::at(span, "M,M operand pair")],
        "MOV M,M is invalid",
    )
    .with_source_code(source(src, path))
}

pub fn operand_rst_range(span: Span, src: &str, path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::rst",
        help = "RST takes a vector number from 0 to 7",
        labels = vec![LabeledSpan::at(span, "invalid restart vector")],
        "RST vector out of range",
    )
    .with_source_code(source(src, path))
}

// Internal table inconsistency. Not a user error; points at a bug in the
// opcode table itself.

pub fn encoding_inconsistency(opcode: u8, mnemonic: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "encode::table",
        "Internal opcode table inconsistency: computed {opcode:#04X} for {mnemonic}",
    )
}
