use core::fmt::{self, Write};

use log::debug;

use crate::decode::{self, Descriptor};
use crate::instructions::{
    Condition, Direction, IndexRegister, IndexRegisterHalf, Instruction, InterruptMode, LoadTarget, Register, RegisterPair,
    SpecialRegister, Target,
};
use crate::memory::Memory;
use crate::state::{Z80, Z80Error};

#[derive(Clone, Default)]
pub struct Z80Debugger {
    pub(crate) skip_breakpoint: usize,
    pub(crate) breakpoints: Vec<u16>,
}

impl Z80Debugger {
    /// Stop before the instruction at `pc` if it has a breakpoint
    ///
    /// The next check after a hit lets the same address through, so that stepping again
    /// resumes instead of stopping on the same breakpoint forever.
    pub fn check_breakpoints(&mut self, pc: u16) -> Result<(), Z80Error> {
        for breakpoint in &self.breakpoints {
            if *breakpoint == pc {
                if self.skip_breakpoint > 0 {
                    self.skip_breakpoint -= 1;
                    return Ok(());
                } else {
                    debug!("breakpoint reached at {:#06x}", pc);
                    self.skip_breakpoint = 1;
                    return Err(Z80Error::Breakpoint(pc));
                }
            }
        }
        Ok(())
    }
}

impl Z80 {
    pub fn add_breakpoint(&mut self, addr: u16) {
        if !self.debugger.breakpoints.contains(&addr) {
            self.debugger.breakpoints.push(addr);
        }
    }

    pub fn remove_breakpoint(&mut self, addr: u16) {
        self.debugger.breakpoints.retain(|breakpoint| *breakpoint != addr);
    }

    pub fn clear_breakpoints(&mut self) {
        self.debugger.breakpoints.clear();
        self.debugger.skip_breakpoint = 0;
    }

    pub fn dump_state<W, M>(&self, writer: &mut W, memory: &mut M) -> Result<(), fmt::Error>
    where
        W: Write,
        M: Memory,
    {
        let state = &self.state;
        writeln!(writer, "Status: {:?}", state.status)?;
        writeln!(writer, "PC: {:#06x}", state.pc.get())?;
        writeln!(writer, "SP: {:#06x}", state.sp.get())?;
        writeln!(writer, "IX: {:#06x}", state.ix.get())?;
        writeln!(writer, "IY: {:#06x}", state.iy.get())?;

        let rows = [
            ((Register::A, state.shadow.af.high()), (Register::F, state.shadow.af.low())),
            ((Register::B, state.shadow.bc.high()), (Register::C, state.shadow.bc.low())),
            ((Register::D, state.shadow.de.high()), (Register::E, state.shadow.de.low())),
            ((Register::H, state.shadow.hl.high()), (Register::L, state.shadow.hl.low())),
        ];
        for ((high, shadow_high), (low, shadow_low)) in rows {
            writeln!(
                writer,
                "{:?}: {:#04x}    {:?}:  {:#04x}           {:?}': {:#04x}    {:?}':  {:#04x}",
                high,
                state.get_register(high),
                low,
                state.get_register(low),
                high,
                shadow_high,
                low,
                shadow_low,
            )?;
        }

        writeln!(writer, "I: {:#04x}    R:  {:#04x}", state.i(), state.r())?;
        writeln!(
            writer,
            "IM: {:?}  IFF1: {:?}  IFF2: {:?}  Pending: {:?}",
            state.interrupts.mode, state.interrupts.iff1, state.interrupts.iff2, state.interrupts.pending
        )?;
        writeln!(writer, "Clock: {}", self.clock.ticks())?;

        let current = disassemble(memory, state.pc.get());
        writeln!(writer, "Current Instruction: {}", current)?;
        writeln!(
            writer,
            "Previous Instruction: {:#06x}: {:?} (clock {})",
            self.previous_cycle.pc, self.previous_cycle.instruction, self.previous_cycle.current_clock
        )?;
        writeln!(writer)?;
        Ok(())
    }
}

/// One decoded instruction, rendered in Zilog syntax
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disassembly {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = String::new();
        for byte in &self.bytes {
            write!(bytes, "{:02x} ", byte)?;
        }
        write!(f, "{:#06x}: {:<12} {}", self.addr, bytes, self.text)
    }
}

/// Decode and render the instruction at `addr` without executing it
pub fn disassemble<M: Memory>(memory: &mut M, addr: u16) -> Disassembly {
    let descriptor = decode::lookup(memory, addr);
    let bytes: Vec<u8> = (0..descriptor.length)
        .map(|offset| memory.read_byte(addr.wrapping_add(offset)))
        .collect();
    let text = format_instruction(&descriptor, addr, &bytes);

    Disassembly {
        addr,
        bytes,
        text,
    }
}

/// Render `count` consecutive instructions starting at `start`
pub fn dump_disassembly<W, M>(writer: &mut W, memory: &mut M, start: u16, count: usize) -> Result<(), fmt::Error>
where
    W: Write,
    M: Memory,
{
    let mut next = start;
    for _ in 0..count {
        let disassembly = disassemble(memory, next);
        writeln!(writer, "{}", disassembly)?;
        next = next.wrapping_add(disassembly.bytes.len() as u16);
    }
    Ok(())
}

struct Operands {
    next_pc: u16,
    displacement: i8,
    byte: u8,
    word: u16,
}

impl Operands {
    fn from_bytes(addr: u16, bytes: &[u8]) -> Self {
        let len = bytes.len();
        let byte_at = |i: usize| bytes.get(i).copied().unwrap_or(0);
        Self {
            next_pc: addr.wrapping_add(len as u16),
            displacement: byte_at(2) as i8,
            byte: byte_at(len.saturating_sub(1)),
            word: if len >= 2 {
                u16::from_le_bytes([byte_at(len - 2), byte_at(len - 1)])
            } else {
                0
            },
        }
    }

    fn relative(&self) -> u16 {
        self.next_pc.wrapping_add(self.byte as i8 as i16 as u16)
    }
}

fn format_instruction(descriptor: &Descriptor, addr: u16, bytes: &[u8]) -> String {
    let ops = Operands::from_bytes(addr, bytes);
    let target = |target: Target| format_target(target, &ops);

    match descriptor.instruction {
        Instruction::ADCa(t) => format!("ADC A,{}", target(t)),
        Instruction::ADC16(dest, src) => format!("ADC {},{}", format_pair(dest), format_pair(src)),
        Instruction::ADDa(t) => format!("ADD A,{}", target(t)),
        Instruction::ADD16(dest, src) => format!("ADD {},{}", format_pair(dest), format_pair(src)),
        Instruction::AND(t) => format!("AND {}", target(t)),
        Instruction::BIT(bit, t) => format!("BIT {},{}", bit, target(t)),
        Instruction::CALL => format!("CALL {:#06x}", ops.word),
        Instruction::CALLcc(cond) => format!("CALL {},{:#06x}", format_condition(cond), ops.word),
        Instruction::CCF => "CCF".to_string(),
        Instruction::CP(t) => format!("CP {}", target(t)),
        Instruction::CPD => "CPD".to_string(),
        Instruction::CPDR => "CPDR".to_string(),
        Instruction::CPI => "CPI".to_string(),
        Instruction::CPIR => "CPIR".to_string(),
        Instruction::CPL => "CPL".to_string(),
        Instruction::DAA => "DAA".to_string(),
        Instruction::DEC16(rp) => format!("DEC {}", format_pair(rp)),
        Instruction::DEC8(t) => format!("DEC {}", target(t)),
        Instruction::DI => "DI".to_string(),
        Instruction::DJNZ => format!("DJNZ {:#06x}", ops.relative()),
        Instruction::EI => "EI".to_string(),
        Instruction::EXX => "EXX".to_string(),
        Instruction::EXafaf => "EX AF,AF'".to_string(),
        Instruction::EXhlde => "EX DE,HL".to_string(),
        Instruction::EXsp(rp) => format!("EX (SP),{}", format_pair(rp)),
        Instruction::HALT => "HALT".to_string(),
        Instruction::IM(mode) => match mode {
            InterruptMode::Unknown(mode) => format!("IM ?{}", mode),
            mode => format!("IM {}", u8::from(mode)),
        },
        Instruction::INC16(rp) => format!("INC {}", format_pair(rp)),
        Instruction::INC8(t) => format!("INC {}", target(t)),
        Instruction::IND => "IND".to_string(),
        Instruction::INDR => "INDR".to_string(),
        Instruction::INI => "INI".to_string(),
        Instruction::INIR => "INIR".to_string(),
        Instruction::INic(reg) => format!("IN {:?},(C)", reg),
        Instruction::INicz => "IN (C)".to_string(),
        Instruction::INx => format!("IN A,({:#04x})", ops.byte),
        Instruction::JP => format!("JP {:#06x}", ops.word),
        Instruction::JPIndirect(rp) => format!("JP ({})", format_pair(rp)),
        Instruction::JPcc(cond) => format!("JP {},{:#06x}", format_condition(cond), ops.word),
        Instruction::JR => format!("JR {:#06x}", ops.relative()),
        Instruction::JRcc(cond) => format!("JR {},{:#06x}", format_condition(cond), ops.relative()),
        Instruction::LD(dest, src) => format!("LD {},{}", format_load_target(dest, &ops), format_load_target(src, &ops)),
        Instruction::LDsr(special_reg, dir) => {
            let special_reg = match special_reg {
                SpecialRegister::I => "I",
                SpecialRegister::R => "R",
            };
            match dir {
                Direction::FromAcc => format!("LD {},A", special_reg),
                Direction::ToAcc => format!("LD A,{}", special_reg),
            }
        },
        Instruction::LDD => "LDD".to_string(),
        Instruction::LDDR => "LDDR".to_string(),
        Instruction::LDI => "LDI".to_string(),
        Instruction::LDIR => "LDIR".to_string(),
        Instruction::NEG => "NEG".to_string(),
        Instruction::NOP => "NOP".to_string(),
        Instruction::OR(t) => format!("OR {}", target(t)),
        Instruction::OTDR => "OTDR".to_string(),
        Instruction::OTIR => "OTIR".to_string(),
        Instruction::OUTD => "OUTD".to_string(),
        Instruction::OUTI => "OUTI".to_string(),
        Instruction::OUTic(reg) => format!("OUT (C),{:?}", reg),
        Instruction::OUTicz => "OUT (C),0".to_string(),
        Instruction::OUTx => format!("OUT ({:#04x}),A", ops.byte),
        Instruction::POP(rp) => format!("POP {}", format_pair(rp)),
        Instruction::PUSH(rp) => format!("PUSH {}", format_pair(rp)),
        Instruction::RES(bit, t, copy) => with_copy(format!("RES {},{}", bit, target(t)), copy),
        Instruction::RET => "RET".to_string(),
        Instruction::RETI => "RETI".to_string(),
        Instruction::RETN => "RETN".to_string(),
        Instruction::RETcc(cond) => format!("RET {}", format_condition(cond)),
        Instruction::RL(t, copy) => with_copy(format!("RL {}", target(t)), copy),
        Instruction::RLA => "RLA".to_string(),
        Instruction::RLC(t, copy) => with_copy(format!("RLC {}", target(t)), copy),
        Instruction::RLCA => "RLCA".to_string(),
        Instruction::RLD => "RLD".to_string(),
        Instruction::RR(t, copy) => with_copy(format!("RR {}", target(t)), copy),
        Instruction::RRA => "RRA".to_string(),
        Instruction::RRC(t, copy) => with_copy(format!("RRC {}", target(t)), copy),
        Instruction::RRCA => "RRCA".to_string(),
        Instruction::RRD => "RRD".to_string(),
        Instruction::RST(addr) => format!("RST {:#04x}", addr),
        Instruction::SBCa(t) => format!("SBC A,{}", target(t)),
        Instruction::SBC16(dest, src) => format!("SBC {},{}", format_pair(dest), format_pair(src)),
        Instruction::SCF => "SCF".to_string(),
        Instruction::SET(bit, t, copy) => with_copy(format!("SET {},{}", bit, target(t)), copy),
        Instruction::SLA(t, copy) => with_copy(format!("SLA {}", target(t)), copy),
        Instruction::SLL(t, copy) => with_copy(format!("SLL {}", target(t)), copy),
        Instruction::SRA(t, copy) => with_copy(format!("SRA {}", target(t)), copy),
        Instruction::SRL(t, copy) => with_copy(format!("SRL {}", target(t)), copy),
        Instruction::SUB(t) => format!("SUB {}", target(t)),
        Instruction::XOR(t) => format!("XOR {}", target(t)),
    }
}

fn with_copy(text: String, copy: Option<Register>) -> String {
    match copy {
        Some(reg) => format!("{},{:?}", text, reg),
        None => text,
    }
}

fn format_target(target: Target, ops: &Operands) -> String {
    match target {
        Target::DirectReg(reg) => format!("{:?}", reg),
        Target::DirectRegHalf(reg) => format_half(reg).to_string(),
        Target::IndirectReg(rp) => format!("({})", format_pair(rp)),
        Target::IndirectOffset(index_reg) => format_indexed(index_reg, ops.displacement),
        Target::Immediate => format!("{:#04x}", ops.byte),
    }
}

fn format_load_target(target: LoadTarget, ops: &Operands) -> String {
    match target {
        LoadTarget::DirectRegByte(reg) => format!("{:?}", reg),
        LoadTarget::DirectRegHalfByte(reg) => format_half(reg).to_string(),
        LoadTarget::DirectRegWord(rp) => format_pair(rp).to_string(),
        LoadTarget::IndirectRegByte(rp) => format!("({})", format_pair(rp)),
        LoadTarget::IndirectOffsetByte(index_reg) => format_indexed(index_reg, ops.displacement),
        LoadTarget::IndirectByte | LoadTarget::IndirectWord => format!("({:#06x})", ops.word),
        LoadTarget::ImmediateByte => format!("{:#04x}", ops.byte),
        LoadTarget::ImmediateWord => format!("{:#06x}", ops.word),
    }
}

fn format_indexed(index_reg: IndexRegister, displacement: i8) -> String {
    let name = format_pair(index_reg.into());
    if displacement < 0 {
        format!("({}-{:#04x})", name, displacement.unsigned_abs())
    } else {
        format!("({}+{:#04x})", name, displacement)
    }
}

fn format_pair(rp: RegisterPair) -> &'static str {
    match rp {
        RegisterPair::BC => "BC",
        RegisterPair::DE => "DE",
        RegisterPair::HL => "HL",
        RegisterPair::AF => "AF",
        RegisterPair::SP => "SP",
        RegisterPair::IX => "IX",
        RegisterPair::IY => "IY",
    }
}

fn format_half(reg: IndexRegisterHalf) -> &'static str {
    match reg {
        IndexRegisterHalf::IXH => "IXH",
        IndexRegisterHalf::IXL => "IXL",
        IndexRegisterHalf::IYH => "IYH",
        IndexRegisterHalf::IYL => "IYL",
    }
}

fn format_condition(cond: Condition) -> &'static str {
    match cond {
        Condition::NotZero => "NZ",
        Condition::Zero => "Z",
        Condition::NotCarry => "NC",
        Condition::Carry => "C",
        Condition::ParityOdd => "PO",
        Condition::ParityEven => "PE",
        Condition::Positive => "P",
        Condition::Negative => "M",
    }
}
