use lazy_static::lazy_static;

use crate::instructions::{
    Direction, Condition, Register, RegisterPair, IndexRegister, IndexRegisterHalf, SpecialRegister, InterruptMode, Target,
    LoadTarget, UndocumentedCopy, Instruction,
};
use crate::memory::Memory;
use crate::timing::Z80InstructionCycles;

/// Everything needed to execute an opcode, fixed when the tables are built
///
/// `length` counts every byte of the instruction including prefixes, displacement and
/// immediate data. `refresh` is how much the fetch advances the R register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub instruction: Instruction,
    pub length: u16,
    pub cycles: Z80InstructionCycles,
    pub refresh: u8,
}

impl Descriptor {
    fn new(instruction: Instruction, length: u16, refresh: u8) -> Self {
        Self::with_extra(instruction, length, refresh, 0)
    }

    fn with_extra(instruction: Instruction, length: u16, refresh: u8, extra: u16) -> Self {
        Self {
            instruction,
            length,
            cycles: Z80InstructionCycles::from_instruction(&instruction, extra),
            refresh,
        }
    }

    /// The same operation behind a `DD` or `FD` that has no effect on it
    fn behind_ignored_prefix(self) -> Self {
        Self {
            length: self.length + 1,
            cycles: Z80InstructionCycles::from_instruction(&self.instruction, 4),
            refresh: 2,
            ..self
        }
    }
}

type DecodeTable = [Descriptor; 256];

struct DecodeTables {
    main: DecodeTable,
    cb: DecodeTable,
    ed: DecodeTable,
    dd: DecodeTable,
    fd: DecodeTable,
    ddcb: DecodeTable,
    fdcb: DecodeTable,
}

impl DecodeTables {
    fn build() -> Self {
        Self {
            main: core::array::from_fn(|ins| decode_main(ins as u8)),
            cb: core::array::from_fn(|ins| decode_prefix_cb(ins as u8)),
            ed: core::array::from_fn(|ins| decode_prefix_ed(ins as u8)),
            dd: core::array::from_fn(|ins| decode_prefix_dd_fd(ins as u8, IndexRegister::IX)),
            fd: core::array::from_fn(|ins| decode_prefix_dd_fd(ins as u8, IndexRegister::IY)),
            ddcb: core::array::from_fn(|ins| decode_sub_prefix_cb(ins as u8, IndexRegister::IX)),
            fdcb: core::array::from_fn(|ins| decode_sub_prefix_cb(ins as u8, IndexRegister::IY)),
        }
    }
}

lazy_static! {
    static ref TABLES: DecodeTables = DecodeTables::build();
}

/// Build the tables now rather than on the first fetch
pub fn initialize() {
    lazy_static::initialize(&TABLES);
}

/// Find the descriptor for the instruction starting at `pc`
///
/// Reads up to four bytes: the opcode, the byte after a prefix, and for `DD CB`/`FD CB`
/// the opcode that follows the displacement.
pub fn lookup<M: Memory>(memory: &mut M, pc: u16) -> Descriptor {
    let tables = &*TABLES;
    let ins = memory.read_byte(pc);
    match ins {
        0xCB => tables.cb[memory.read_byte(pc.wrapping_add(1)) as usize],
        0xED => tables.ed[memory.read_byte(pc.wrapping_add(1)) as usize],
        0xDD => lookup_indexed(memory, pc, &tables.dd, &tables.ddcb),
        0xFD => lookup_indexed(memory, pc, &tables.fd, &tables.fdcb),
        _ => tables.main[ins as usize],
    }
}

fn lookup_indexed<M: Memory>(memory: &mut M, pc: u16, table: &DecodeTable, bit_table: &DecodeTable) -> Descriptor {
    let ins = memory.read_byte(pc.wrapping_add(1));
    if ins == 0xCB {
        bit_table[memory.read_byte(pc.wrapping_add(3)) as usize]
    } else {
        table[ins as usize]
    }
}

fn decode_main(ins: u8) -> Descriptor {
    let (instruction, length) = match get_ins_x(ins) {
        0 => match get_ins_z(ins) {
            0 => match get_ins_y(ins) {
                0 => (Instruction::NOP, 1),
                1 => (Instruction::EXafaf, 1),
                2 => (Instruction::DJNZ, 2),
                3 => (Instruction::JR, 2),
                y => (Instruction::JRcc(get_condition(y - 4)), 2),
            },
            1 => {
                if get_ins_q(ins) == 0 {
                    (
                        Instruction::LD(LoadTarget::DirectRegWord(get_register_pair(get_ins_p(ins))), LoadTarget::ImmediateWord),
                        3,
                    )
                } else {
                    (Instruction::ADD16(RegisterPair::HL, get_register_pair(get_ins_p(ins))), 1)
                }
            },
            2 => {
                if (ins & 0x20) == 0 {
                    let target = match (ins & 0x10) != 0 {
                        false => LoadTarget::IndirectRegByte(RegisterPair::BC),
                        true => LoadTarget::IndirectRegByte(RegisterPair::DE),
                    };

                    match get_ins_q(ins) != 0 {
                        false => (Instruction::LD(target, LoadTarget::DirectRegByte(Register::A)), 1),
                        true => (Instruction::LD(LoadTarget::DirectRegByte(Register::A), target), 1),
                    }
                } else {
                    let instruction = match get_ins_y(ins) & 0x03 {
                        0 => Instruction::LD(LoadTarget::IndirectWord, LoadTarget::DirectRegWord(RegisterPair::HL)),
                        1 => Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::HL), LoadTarget::IndirectWord),
                        2 => Instruction::LD(LoadTarget::IndirectByte, LoadTarget::DirectRegByte(Register::A)),
                        _ => Instruction::LD(LoadTarget::DirectRegByte(Register::A), LoadTarget::IndirectByte),
                    };
                    (instruction, 3)
                }
            },
            3 => {
                if get_ins_q(ins) == 0 {
                    (Instruction::INC16(get_register_pair(get_ins_p(ins))), 1)
                } else {
                    (Instruction::DEC16(get_register_pair(get_ins_p(ins))), 1)
                }
            },
            4 => (Instruction::INC8(get_register(get_ins_y(ins))), 1),
            5 => (Instruction::DEC8(get_register(get_ins_y(ins))), 1),
            6 => (Instruction::LD(to_load_target(get_register(get_ins_y(ins))), LoadTarget::ImmediateByte), 2),
            _ => match get_ins_y(ins) {
                0 => (Instruction::RLCA, 1),
                1 => (Instruction::RRCA, 1),
                2 => (Instruction::RLA, 1),
                3 => (Instruction::RRA, 1),
                4 => (Instruction::DAA, 1),
                5 => (Instruction::CPL, 1),
                6 => (Instruction::SCF, 1),
                _ => (Instruction::CCF, 1),
            },
        },
        1 => {
            if ins == 0x76 {
                (Instruction::HALT, 1)
            } else {
                (
                    Instruction::LD(
                        to_load_target(get_register(get_ins_y(ins))),
                        to_load_target(get_register(get_ins_z(ins))),
                    ),
                    1,
                )
            }
        },
        2 => (get_alu_instruction(get_ins_y(ins), get_register(get_ins_z(ins))), 1),
        _ => match get_ins_z(ins) {
            0 => (Instruction::RETcc(get_condition(get_ins_y(ins))), 1),
            1 => {
                if get_ins_q(ins) == 0 {
                    (Instruction::POP(get_register_pair_alt(get_ins_p(ins))), 1)
                } else {
                    match get_ins_p(ins) {
                        0 => (Instruction::RET, 1),
                        1 => (Instruction::EXX, 1),
                        2 => (Instruction::JPIndirect(RegisterPair::HL), 1),
                        _ => (
                            Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::SP), LoadTarget::DirectRegWord(RegisterPair::HL)),
                            1,
                        ),
                    }
                }
            },
            2 => (Instruction::JPcc(get_condition(get_ins_y(ins))), 3),
            3 => match get_ins_y(ins) {
                0 => (Instruction::JP, 3),
                // CB is resolved by lookup, this entry is never executed
                1 => (Instruction::NOP, 1),
                2 => (Instruction::OUTx, 2),
                3 => (Instruction::INx, 2),
                4 => (Instruction::EXsp(RegisterPair::HL), 1),
                5 => (Instruction::EXhlde, 1),
                6 => (Instruction::DI, 1),
                _ => (Instruction::EI, 1),
            },
            4 => (Instruction::CALLcc(get_condition(get_ins_y(ins))), 3),
            5 => {
                if get_ins_q(ins) == 0 {
                    (Instruction::PUSH(get_register_pair_alt(get_ins_p(ins))), 1)
                } else {
                    match get_ins_p(ins) {
                        0 => (Instruction::CALL, 3),
                        // DD, ED and FD are resolved by lookup
                        _ => (Instruction::NOP, 1),
                    }
                }
            },
            6 => (get_alu_instruction(get_ins_y(ins), Target::Immediate), 2),
            _ => (Instruction::RST(get_ins_y(ins) * 8), 1),
        },
    };
    Descriptor::new(instruction, length, 1)
}

fn decode_prefix_cb(ins: u8) -> Descriptor {
    let target = get_register(get_ins_z(ins));
    let instruction = match get_ins_x(ins) {
        0 => get_rot_instruction(get_ins_y(ins), target, None),
        1 => Instruction::BIT(get_ins_y(ins), target),
        2 => Instruction::RES(get_ins_y(ins), target, None),
        _ => Instruction::SET(get_ins_y(ins), target, None),
    };
    Descriptor::new(instruction, 2, 2)
}

/// `DD CB d op` and `FD CB d op`, indexed by the final opcode byte
fn decode_sub_prefix_cb(ins: u8, index_reg: IndexRegister) -> Descriptor {
    let target = Target::IndirectOffset(index_reg);
    let opt_copy: UndocumentedCopy = get_byte_register(get_ins_z(ins));

    let instruction = match get_ins_x(ins) {
        0 => get_rot_instruction(get_ins_y(ins), target, opt_copy),
        1 => Instruction::BIT(get_ins_y(ins), target),
        2 => Instruction::RES(get_ins_y(ins), target, opt_copy),
        _ => Instruction::SET(get_ins_y(ins), target, opt_copy),
    };
    Descriptor::new(instruction, 4, 2)
}

fn decode_prefix_ed(ins: u8) -> Descriptor {
    // undefined opcodes are two byte, eight T-state no-ops
    let undefined = Descriptor::with_extra(Instruction::NOP, 2, 2, 4);

    match get_ins_x(ins) {
        1 => {
            let instruction = match get_ins_z(ins) {
                0 => match get_byte_register(get_ins_y(ins)) {
                    Some(reg) => Instruction::INic(reg),
                    None => Instruction::INicz,
                },
                1 => match get_byte_register(get_ins_y(ins)) {
                    Some(reg) => Instruction::OUTic(reg),
                    None => Instruction::OUTicz,
                },
                2 => {
                    if get_ins_q(ins) == 0 {
                        Instruction::SBC16(RegisterPair::HL, get_register_pair(get_ins_p(ins)))
                    } else {
                        Instruction::ADC16(RegisterPair::HL, get_register_pair(get_ins_p(ins)))
                    }
                },
                3 => {
                    let regpair = get_register_pair(get_ins_p(ins));
                    let instruction = if get_ins_q(ins) == 0 {
                        Instruction::LD(LoadTarget::IndirectWord, LoadTarget::DirectRegWord(regpair))
                    } else {
                        Instruction::LD(LoadTarget::DirectRegWord(regpair), LoadTarget::IndirectWord)
                    };
                    // the ED encoding of the HL load is slower than the unprefixed one
                    let extra = if regpair == RegisterPair::HL { 4 } else { 0 };
                    return Descriptor::with_extra(instruction, 4, 2, extra);
                },
                4 => Instruction::NEG,
                5 => {
                    if get_ins_y(ins) == 1 {
                        Instruction::RETI
                    } else {
                        Instruction::RETN
                    }
                },
                6 => match get_ins_y(ins) & 0x03 {
                    0 | 1 => Instruction::IM(InterruptMode::Mode0),
                    2 => Instruction::IM(InterruptMode::Mode1),
                    _ => Instruction::IM(InterruptMode::Mode2),
                },
                _ => match get_ins_y(ins) {
                    0 => Instruction::LDsr(SpecialRegister::I, Direction::FromAcc),
                    1 => Instruction::LDsr(SpecialRegister::R, Direction::FromAcc),
                    2 => Instruction::LDsr(SpecialRegister::I, Direction::ToAcc),
                    3 => Instruction::LDsr(SpecialRegister::R, Direction::ToAcc),
                    4 => Instruction::RRD,
                    5 => Instruction::RLD,
                    _ => return undefined,
                },
            };
            Descriptor::new(instruction, 2, 2)
        },
        2 => {
            let instruction = match ins {
                0xA0 => Instruction::LDI,
                0xA1 => Instruction::CPI,
                0xA2 => Instruction::INI,
                0xA3 => Instruction::OUTI,
                0xA8 => Instruction::LDD,
                0xA9 => Instruction::CPD,
                0xAA => Instruction::IND,
                0xAB => Instruction::OUTD,
                0xB0 => Instruction::LDIR,
                0xB1 => Instruction::CPIR,
                0xB2 => Instruction::INIR,
                0xB3 => Instruction::OTIR,
                0xB8 => Instruction::LDDR,
                0xB9 => Instruction::CPDR,
                0xBA => Instruction::INDR,
                0xBB => Instruction::OTDR,
                _ => return undefined,
            };
            Descriptor::new(instruction, 2, 2)
        },
        _ => undefined,
    }
}

fn decode_prefix_dd_fd(ins: u8, index_reg: IndexRegister) -> Descriptor {
    let index_pair: RegisterPair = index_reg.into();
    let half = |q: u8| Target::DirectRegHalf(get_index_register_half(index_reg, q));

    let substituted = match get_ins_x(ins) {
        0 => {
            if (ins & 0x0F) == 9 {
                Some((Instruction::ADD16(index_pair, get_register_pair_index(get_ins_p(ins), index_reg)), 2))
            } else {
                match ins {
                    0x21 => Some((Instruction::LD(LoadTarget::DirectRegWord(index_pair), LoadTarget::ImmediateWord), 4)),
                    0x22 => Some((Instruction::LD(LoadTarget::IndirectWord, LoadTarget::DirectRegWord(index_pair)), 4)),
                    0x2A => Some((Instruction::LD(LoadTarget::DirectRegWord(index_pair), LoadTarget::IndirectWord), 4)),
                    0x23 => Some((Instruction::INC16(index_pair), 2)),
                    0x2B => Some((Instruction::DEC16(index_pair), 2)),
                    0x24 | 0x2C => Some((Instruction::INC8(half(get_ins_q(ins))), 2)),
                    0x25 | 0x2D => Some((Instruction::DEC8(half(get_ins_q(ins))), 2)),
                    0x26 | 0x2E => Some((Instruction::LD(to_load_target(half(get_ins_q(ins))), LoadTarget::ImmediateByte), 3)),
                    0x34 => Some((Instruction::INC8(Target::IndirectOffset(index_reg)), 3)),
                    0x35 => Some((Instruction::DEC8(Target::IndirectOffset(index_reg)), 3)),
                    0x36 => Some((Instruction::LD(LoadTarget::IndirectOffsetByte(index_reg), LoadTarget::ImmediateByte), 4)),
                    _ => None,
                }
            }
        },
        1 => match (get_ins_y(ins), get_ins_z(ins)) {
            (6, 6) => None,
            // H and L keep their meaning next to a displaced operand
            (y, 6) => Some((
                Instruction::LD(to_load_target(get_register(y)), LoadTarget::IndirectOffsetByte(index_reg)),
                3,
            )),
            (6, z) => Some((
                Instruction::LD(LoadTarget::IndirectOffsetByte(index_reg), to_load_target(get_register(z))),
                3,
            )),
            (y, z) if matches!(y, 4 | 5) || matches!(z, 4 | 5) => Some((
                Instruction::LD(
                    to_load_target(get_index_target(index_reg, y)),
                    to_load_target(get_index_target(index_reg, z)),
                ),
                2,
            )),
            _ => None,
        },
        2 => match get_ins_z(ins) {
            6 => Some((get_alu_instruction(get_ins_y(ins), Target::IndirectOffset(index_reg)), 3)),
            z @ (4 | 5) => Some((get_alu_instruction(get_ins_y(ins), get_index_target(index_reg, z)), 2)),
            _ => None,
        },
        _ => match ins {
            // another prefix: this one is dropped and the next is decoded on the next step
            0xDD | 0xED | 0xFD => return Descriptor::new(Instruction::NOP, 1, 1),
            // resolved by lookup through the DD CB and FD CB tables
            0xCB => return Descriptor::new(Instruction::NOP, 1, 1),
            0xE1 => Some((Instruction::POP(index_pair), 2)),
            0xE3 => Some((Instruction::EXsp(index_pair), 2)),
            0xE5 => Some((Instruction::PUSH(index_pair), 2)),
            0xE9 => Some((Instruction::JPIndirect(index_pair), 2)),
            0xF9 => Some((
                Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::SP), LoadTarget::DirectRegWord(index_pair)),
                2,
            )),
            _ => None,
        },
    };

    match substituted {
        Some((instruction, length)) => Descriptor::new(instruction, length, 2),
        None => decode_main(ins).behind_ignored_prefix(),
    }
}

fn get_alu_instruction(alu: u8, target: Target) -> Instruction {
    match alu {
        0 => Instruction::ADDa(target),
        1 => Instruction::ADCa(target),
        2 => Instruction::SUB(target),
        3 => Instruction::SBCa(target),
        4 => Instruction::AND(target),
        5 => Instruction::XOR(target),
        6 => Instruction::OR(target),
        _ => Instruction::CP(target),
    }
}

fn get_rot_instruction(rot: u8, target: Target, opt_copy: UndocumentedCopy) -> Instruction {
    match rot {
        0 => Instruction::RLC(target, opt_copy),
        1 => Instruction::RRC(target, opt_copy),
        2 => Instruction::RL(target, opt_copy),
        3 => Instruction::RR(target, opt_copy),
        4 => Instruction::SLA(target, opt_copy),
        5 => Instruction::SRA(target, opt_copy),
        6 => Instruction::SLL(target, opt_copy),
        _ => Instruction::SRL(target, opt_copy),
    }
}

/// The 8-bit register selected by a 3-bit field, or `None` for the `(HL)` slot
fn get_byte_register(reg: u8) -> Option<Register> {
    match reg {
        0 => Some(Register::B),
        1 => Some(Register::C),
        2 => Some(Register::D),
        3 => Some(Register::E),
        4 => Some(Register::H),
        5 => Some(Register::L),
        6 => None,
        _ => Some(Register::A),
    }
}

fn get_register(reg: u8) -> Target {
    match get_byte_register(reg) {
        Some(reg) => Target::DirectReg(reg),
        None => Target::IndirectReg(RegisterPair::HL),
    }
}

/// Like `get_register` but with H and L replaced by the halves of the index register
fn get_index_target(index_reg: IndexRegister, reg: u8) -> Target {
    match reg {
        4 => Target::DirectRegHalf(get_index_register_half(index_reg, 0)),
        5 => Target::DirectRegHalf(get_index_register_half(index_reg, 1)),
        _ => get_register(reg),
    }
}

fn to_load_target(target: Target) -> LoadTarget {
    match target {
        Target::DirectReg(reg) => LoadTarget::DirectRegByte(reg),
        Target::DirectRegHalf(reg) => LoadTarget::DirectRegHalfByte(reg),
        Target::IndirectReg(reg) => LoadTarget::IndirectRegByte(reg),
        Target::IndirectOffset(reg) => LoadTarget::IndirectOffsetByte(reg),
        Target::Immediate => LoadTarget::ImmediateByte,
    }
}

fn get_register_pair(reg: u8) -> RegisterPair {
    match reg {
        0 => RegisterPair::BC,
        1 => RegisterPair::DE,
        2 => RegisterPair::HL,
        _ => RegisterPair::SP,
    }
}

fn get_register_pair_index(reg: u8, index_reg: IndexRegister) -> RegisterPair {
    match reg {
        0 => RegisterPair::BC,
        1 => RegisterPair::DE,
        2 => index_reg.into(),
        _ => RegisterPair::SP,
    }
}

fn get_register_pair_alt(reg: u8) -> RegisterPair {
    match reg {
        0 => RegisterPair::BC,
        1 => RegisterPair::DE,
        2 => RegisterPair::HL,
        _ => RegisterPair::AF,
    }
}

fn get_index_register_half(reg: IndexRegister, q: u8) -> IndexRegisterHalf {
    match (reg, q) {
        (IndexRegister::IX, 0) => IndexRegisterHalf::IXH,
        (IndexRegister::IX, _) => IndexRegisterHalf::IXL,
        (IndexRegister::IY, 0) => IndexRegisterHalf::IYH,
        (IndexRegister::IY, _) => IndexRegisterHalf::IYL,
    }
}

fn get_condition(cond: u8) -> Condition {
    match cond {
        0 => Condition::NotZero,
        1 => Condition::Zero,
        2 => Condition::NotCarry,
        3 => Condition::Carry,
        4 => Condition::ParityOdd,
        5 => Condition::ParityEven,
        6 => Condition::Positive,
        _ => Condition::Negative,
    }
}

/// Z80 Decode
///
/// Based on an algorithm described in a Romanian book called "Ghidul Programatorului ZX Spectrum"
/// ("The ZX Spectrum Programmer's Guide") via <http://www.z80.info/decoding.htm>
///
/// Instructions are broken up into x, y, and z parts, or alternatively into x, p, q, and z parts
/// +----------------------+
/// Bits : 7 6 5 4 3 2 1 0
///       | X |  Y  |  Z  |
///             P  Q
/// +----------------------+

fn get_ins_x(ins: u8) -> u8 {
    (ins >> 6) & 0x03
}

fn get_ins_y(ins: u8) -> u8 {
    (ins >> 3) & 0x07
}

fn get_ins_z(ins: u8) -> u8 {
    ins & 0x07
}

fn get_ins_p(ins: u8) -> u8 {
    (ins >> 4) & 0x03
}

fn get_ins_q(ins: u8) -> u8 {
    (ins >> 3) & 0x01
}
