//! The 8085 instruction table.
//!
//! One static array of 256 slots keyed by opcode value. Each filled slot
//! carries everything both halves of the toolchain need: the assembler
//! selects opcodes by mnemonic + operand shape and verifies the result
//! against the slot, and the emulator dispatches through the slot's decode
//! fn. Keeping encode and decode data side by side makes the pairing a
//! structural invariant instead of a convention between two tables.
//!
//! The set is the full 8085 one plus the undocumented `DSUB` (0x08) and the
//! 8085-specific `RIM`/`SIM`. The remaining illegal slots (0x10, 0x18,
//! 0x28, 0x38, 0xCB, 0xD9, 0xDD, 0xED, 0xFD) stay empty.

use crate::runtime::exec;
use crate::runtime::Cpu;
use crate::symbol::PairAdmit;

/// Decode fn: executes the already-fetched opcode and returns its cycle
/// cost. PC has been advanced past the whole instruction by the caller.
pub type ExecFn = fn(&mut Cpu, u8) -> u8;

/// What the operand list of a mnemonic looks like in source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandShape {
    None,
    /// Single register B..A or M. ALU-row opcodes place it in the low
    /// three bits (stride 1); the INR/DCR column places it at bits 3..5
    /// (stride 8).
    Reg { stride: u8 },
    /// Register pair with a per-mnemonic admissibility mask
    Pair(PairAdmit),
    /// 8-bit immediate (also used for IN/OUT port numbers)
    Imm8,
    /// 16-bit address: a label or a numeric literal
    Addr,
    /// Restart vector 0..=7
    Rst,
    /// MOV dst,src — M,M excluded
    MovRegReg,
    /// MVI reg, imm8
    RegImm8,
    /// LXI pair, imm16
    PairImm16(PairAdmit),
}

#[derive(Clone, Copy)]
pub struct Slot {
    pub mnemonic: &'static str,
    pub len: u8,
    /// Base cycle cost; conditional flow reports the taken cost itself
    pub cycles: u8,
    pub shape: OperandShape,
    pub exec: ExecFn,
}

const fn s(
    mnemonic: &'static str,
    len: u8,
    cycles: u8,
    shape: OperandShape,
    exec: ExecFn,
) -> Option<Slot> {
    Some(Slot {
        mnemonic,
        len,
        cycles,
        shape,
        exec,
    })
}

const E: Option<Slot> = None;

use OperandShape as Sh;

#[rustfmt::skip]
pub static TABLE: [Option<Slot>; 256] = [
    /* 0x00 */ s("NOP",  1,  4, Sh::None,                   exec::nop),
    /* 0x01 */ s("LXI",  3, 10, Sh::PairImm16(PairAdmit::BDHSp), exec::lxi),
    /* 0x02 */ s("STAX", 1,  7, Sh::Pair(PairAdmit::BD),        exec::stax),
    /* 0x03 */ s("INX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::inx),
    /* 0x04 */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x05 */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x06 */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x07 */ s("RLC",  1,  4, Sh::None,                   exec::rlc),
    /* 0x08 */ s("DSUB", 1, 10, Sh::None,                   exec::dsub),
    /* 0x09 */ s("DAD",  1, 10, Sh::Pair(PairAdmit::BDHSp),     exec::dad),
    /* 0x0A */ s("LDAX", 1,  7, Sh::Pair(PairAdmit::BD),        exec::ldax),
    /* 0x0B */ s("DCX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::dcx),
    /* 0x0C */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x0D */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x0E */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x0F */ s("RRC",  1,  4, Sh::None,                   exec::rrc),
    /* 0x10 */ E,
    /* 0x11 */ s("LXI",  3, 10, Sh::PairImm16(PairAdmit::BDHSp), exec::lxi),
    /* 0x12 */ s("STAX", 1,  7, Sh::Pair(PairAdmit::BD),        exec::stax),
    /* 0x13 */ s("INX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::inx),
    /* 0x14 */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x15 */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x16 */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x17 */ s("RAL",  1,  4, Sh::None,                   exec::ral),
    /* 0x18 */ E,
    /* 0x19 */ s("DAD",  1, 10, Sh::Pair(PairAdmit::BDHSp),     exec::dad),
    /* 0x1A */ s("LDAX", 1,  7, Sh::Pair(PairAdmit::BD),        exec::ldax),
    /* 0x1B */ s("DCX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::dcx),
    /* 0x1C */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x1D */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x1E */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x1F */ s("RAR",  1,  4, Sh::None,                   exec::rar),
    /* 0x20 */ s("RIM",  1,  4, Sh::None,                   exec::rim),
    /* 0x21 */ s("LXI",  3, 10, Sh::PairImm16(PairAdmit::BDHSp), exec::lxi),
    /* 0x22 */ s("SHLD", 3, 16, Sh::Addr,                       exec::shld),
    /* 0x23 */ s("INX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::inx),
    /* 0x24 */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x25 */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x26 */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x27 */ s("DAA",  1,  4, Sh::None,                   exec::daa),
    /* 0x28 */ E,
    /* 0x29 */ s("DAD",  1, 10, Sh::Pair(PairAdmit::BDHSp),     exec::dad),
    /* 0x2A */ s("LHLD", 3, 16, Sh::Addr,                       exec::lhld),
    /* 0x2B */ s("DCX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::dcx),
    /* 0x2C */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x2D */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x2E */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x2F */ s("CMA",  1,  4, Sh::None,                   exec::cma),
    /* 0x30 */ s("SIM",  1,  4, Sh::None,                   exec::sim),
    /* 0x31 */ s("LXI",  3, 10, Sh::PairImm16(PairAdmit::BDHSp), exec::lxi),
    /* 0x32 */ s("STA",  3, 13, Sh::Addr,                       exec::sta),
    /* 0x33 */ s("INX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::inx),
    /* 0x34 */ s("INR",  1, 10, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x35 */ s("DCR",  1, 10, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x36 */ s("MVI",  2, 10, Sh::RegImm8,                    exec::mvi),
    /* 0x37 */ s("STC",  1,  4, Sh::None,                   exec::stc),
    /* 0x38 */ E,
    /* 0x39 */ s("DAD",  1, 10, Sh::Pair(PairAdmit::BDHSp),     exec::dad),
    /* 0x3A */ s("LDA",  3, 13, Sh::Addr,                       exec::lda),
    /* 0x3B */ s("DCX",  1,  6, Sh::Pair(PairAdmit::BDHSp),     exec::dcx),
    /* 0x3C */ s("INR",  1,  4, Sh::Reg { stride: 8 },          exec::inr),
    /* 0x3D */ s("DCR",  1,  4, Sh::Reg { stride: 8 },          exec::dcr),
    /* 0x3E */ s("MVI",  2,  7, Sh::RegImm8,                    exec::mvi),
    /* 0x3F */ s("CMC",  1,  4, Sh::None,                   exec::cmc),
    /* 0x40 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x41 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x42 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x43 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x44 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x45 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x46 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x47 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x48 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x49 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x4A */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x4B */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x4C */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x4D */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x4E */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x4F */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x50 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x51 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x52 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x53 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x54 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x55 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x56 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x57 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x58 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x59 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x5A */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x5B */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x5C */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x5D */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x5E */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x5F */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x60 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x61 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x62 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x63 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x64 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x65 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x66 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x67 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x68 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x69 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x6A */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x6B */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x6C */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x6D */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x6E */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x6F */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x70 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x71 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x72 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x73 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x74 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x75 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x76 */ s("HLT",  1,  5, Sh::None,                   exec::hlt),
    /* 0x77 */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x78 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x79 */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x7A */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x7B */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x7C */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x7D */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x7E */ s("MOV",  1,  7, Sh::MovRegReg,                  exec::mov),
    /* 0x7F */ s("MOV",  1,  4, Sh::MovRegReg,                  exec::mov),
    /* 0x80 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x81 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x82 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x83 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x84 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x85 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x86 */ s("ADD",  1,  7, Sh::Reg { stride: 1 },          exec::add),
    /* 0x87 */ s("ADD",  1,  4, Sh::Reg { stride: 1 },          exec::add),
    /* 0x88 */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x89 */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8A */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8B */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8C */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8D */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8E */ s("ADC",  1,  7, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x8F */ s("ADC",  1,  4, Sh::Reg { stride: 1 },          exec::adc),
    /* 0x90 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x91 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x92 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x93 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x94 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x95 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x96 */ s("SUB",  1,  7, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x97 */ s("SUB",  1,  4, Sh::Reg { stride: 1 },          exec::sub),
    /* 0x98 */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x99 */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9A */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9B */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9C */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9D */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9E */ s("SBB",  1,  7, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0x9F */ s("SBB",  1,  4, Sh::Reg { stride: 1 },          exec::sbb),
    /* 0xA0 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA1 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA2 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA3 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA4 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA5 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA6 */ s("ANA",  1,  7, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA7 */ s("ANA",  1,  4, Sh::Reg { stride: 1 },          exec::ana),
    /* 0xA8 */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xA9 */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAA */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAB */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAC */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAD */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAE */ s("XRA",  1,  7, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xAF */ s("XRA",  1,  4, Sh::Reg { stride: 1 },          exec::xra),
    /* 0xB0 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB1 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB2 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB3 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB4 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB5 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB6 */ s("ORA",  1,  7, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB7 */ s("ORA",  1,  4, Sh::Reg { stride: 1 },          exec::ora),
    /* 0xB8 */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xB9 */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBA */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBB */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBC */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBD */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBE */ s("CMP",  1,  7, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xBF */ s("CMP",  1,  4, Sh::Reg { stride: 1 },          exec::cmp),
    /* 0xC0 */ s("RNZ",  1,  6, Sh::None,                   exec::rcond),
    /* 0xC1 */ s("POP",  1, 10, Sh::Pair(PairAdmit::BDHPsw),    exec::pop),
    /* 0xC2 */ s("JNZ",  3,  7, Sh::Addr,                       exec::jcond),
    /* 0xC3 */ s("JMP",  3, 10, Sh::Addr,                       exec::jmp),
    /* 0xC4 */ s("CNZ",  3,  9, Sh::Addr,                       exec::ccond),
    /* 0xC5 */ s("PUSH", 1, 12, Sh::Pair(PairAdmit::BDHPsw),    exec::push),
    /* 0xC6 */ s("ADI",  2,  7, Sh::Imm8,                       exec::adi),
    /* 0xC7 */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xC8 */ s("RZ",   1,  6, Sh::None,                   exec::rcond),
    /* 0xC9 */ s("RET",  1, 10, Sh::None,                   exec::ret),
    /* 0xCA */ s("JZ",   3,  7, Sh::Addr,                       exec::jcond),
    /* 0xCB */ E,
    /* 0xCC */ s("CZ",   3,  9, Sh::Addr,                       exec::ccond),
    /* 0xCD */ s("CALL", 3, 18, Sh::Addr,                       exec::call),
    /* 0xCE */ s("ACI",  2,  7, Sh::Imm8,                       exec::aci),
    /* 0xCF */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xD0 */ s("RNC",  1,  6, Sh::None,                   exec::rcond),
    /* 0xD1 */ s("POP",  1, 10, Sh::Pair(PairAdmit::BDHPsw),    exec::pop),
    /* 0xD2 */ s("JNC",  3,  7, Sh::Addr,                       exec::jcond),
    /* 0xD3 */ s("OUT",  2, 10, Sh::Imm8,                       exec::out),
    /* 0xD4 */ s("CNC",  3,  9, Sh::Addr,                       exec::ccond),
    /* 0xD5 */ s("PUSH", 1, 12, Sh::Pair(PairAdmit::BDHPsw),    exec::push),
    /* 0xD6 */ s("SUI",  2,  7, Sh::Imm8,                       exec::sui),
    /* 0xD7 */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xD8 */ s("RC",   1,  6, Sh::None,                   exec::rcond),
    /* 0xD9 */ E,
    /* 0xDA */ s("JC",   3,  7, Sh::Addr,                       exec::jcond),
    /* 0xDB */ s("IN",   2, 10, Sh::Imm8,                       exec::input),
    /* 0xDC */ s("CC",   3,  9, Sh::Addr,                       exec::ccond),
    /* 0xDD */ E,
    /* 0xDE */ s("SBI",  2,  7, Sh::Imm8,                       exec::sbi),
    /* 0xDF */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xE0 */ s("RPO",  1,  6, Sh::None,                   exec::rcond),
    /* 0xE1 */ s("POP",  1, 10, Sh::Pair(PairAdmit::BDHPsw),    exec::pop),
    /* 0xE2 */ s("JPO",  3,  7, Sh::Addr,                       exec::jcond),
    /* 0xE3 */ s("XTHL", 1, 16, Sh::None,                   exec::xthl),
    /* 0xE4 */ s("CPO",  3,  9, Sh::Addr,                       exec::ccond),
    /* 0xE5 */ s("PUSH", 1, 12, Sh::Pair(PairAdmit::BDHPsw),    exec::push),
    /* 0xE6 */ s("ANI",  2,  7, Sh::Imm8,                       exec::ani),
    /* 0xE7 */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xE8 */ s("RPE",  1,  6, Sh::None,                   exec::rcond),
    /* 0xE9 */ s("PCHL", 1,  6, Sh::None,                   exec::pchl),
    /* 0xEA */ s("JPE",  3,  7, Sh::Addr,                       exec::jcond),
    /* 0xEB */ s("XCHG", 1,  4, Sh::None,                   exec::xchg),
    /* 0xEC */ s("CPE",  3,  9, Sh::Addr,                       exec::ccond),
    /* 0xED */ E,
    /* 0xEE */ s("XRI",  2,  7, Sh::Imm8,                       exec::xri),
    /* 0xEF */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xF0 */ s("RP",   1,  6, Sh::None,                   exec::rcond),
    /* 0xF1 */ s("POP",  1, 10, Sh::Pair(PairAdmit::BDHPsw),    exec::pop),
    /* 0xF2 */ s("JP",   3,  7, Sh::Addr,                       exec::jcond),
    /* 0xF3 */ s("DI",   1,  4, Sh::None,                   exec::di),
    /* 0xF4 */ s("CP",   3,  9, Sh::Addr,                       exec::ccond),
    /* 0xF5 */ s("PUSH", 1, 12, Sh::Pair(PairAdmit::BDHPsw),    exec::push),
    /* 0xF6 */ s("ORI",  2,  7, Sh::Imm8,                       exec::ori),
    /* 0xF7 */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
    /* 0xF8 */ s("RM",   1,  6, Sh::None,                   exec::rcond),
    /* 0xF9 */ s("SPHL", 1,  6, Sh::None,                   exec::sphl),
    /* 0xFA */ s("JM",   3,  7, Sh::Addr,                       exec::jcond),
    /* 0xFB */ s("EI",   1,  4, Sh::None,                   exec::ei),
    /* 0xFC */ s("CM",   3,  9, Sh::Addr,                       exec::ccond),
    /* 0xFD */ E,
    /* 0xFE */ s("CPI",  2,  7, Sh::Imm8,                       exec::cpi),
    /* 0xFF */ s("RST",  1, 12, Sh::Rst,                    exec::rst),
];

/// Slot for an opcode byte, if the 8085 defines one.
pub fn slot(opcode: u8) -> Option<&'static Slot> {
    TABLE[opcode as usize].as_ref()
}

/// Byte length of the instruction starting with `opcode`; illegal bytes
/// size as 1 so the disassembler can resynchronise.
pub fn length(opcode: u8) -> u8 {
    slot(opcode).map(|s| s.len).unwrap_or(1)
}

#[cfg(test)]
mod test {
    use super::*;

    const ILLEGAL: [u8; 9] = [0x10, 0x18, 0x28, 0x38, 0xCB, 0xD9, 0xDD, 0xED, 0xFD];

    #[test]
    fn illegal_slots_are_empty() {
        for op in ILLEGAL {
            assert!(slot(op).is_none(), "{op:#04X} should be empty");
        }
        let filled = TABLE.iter().filter(|s| s.is_some()).count();
        assert_eq!(filled, 256 - ILLEGAL.len());
    }

    #[test]
    fn canonical_encodings() {
        assert_eq!(slot(0x1F).unwrap().mnemonic, "RAR");
        assert_eq!(slot(0xBD).unwrap().mnemonic, "CMP"); // CMP L
        assert_eq!(slot(0xBE).unwrap().mnemonic, "CMP"); // CMP M
        assert_eq!(slot(0x08).unwrap().mnemonic, "DSUB");
        assert_eq!(slot(0x20).unwrap().mnemonic, "RIM");
        assert_eq!(slot(0x30).unwrap().mnemonic, "SIM");
        assert_eq!(slot(0x76).unwrap().mnemonic, "HLT");
    }

    #[test]
    fn cycle_counts_at_least_four() {
        for slot in TABLE.iter().flatten() {
            assert!(slot.cycles >= 4, "{} under 4 cycles", slot.mnemonic);
        }
    }

    #[test]
    fn lengths_match_shapes() {
        for slot in TABLE.iter().flatten() {
            let expected = match slot.shape {
                OperandShape::Addr | OperandShape::PairImm16(_) => 3,
                OperandShape::Imm8 | OperandShape::RegImm8 => 2,
                _ => 1,
            };
            assert_eq!(slot.len, expected, "{} length", slot.mnemonic);
        }
    }
}
