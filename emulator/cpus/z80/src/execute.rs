use femtos::Duration;
use log::{debug, trace};

use crate::alu::{self, RotateType, FLAGS_NUMERIC, FLAGS_UNDOCUMENTED};
use crate::clock::{duration_to_cycles, Clock};
use crate::debugger::Z80Debugger;
use crate::decode;
use crate::instructions::{
    Condition, Direction, IndexRegister, Instruction, LoadTarget, Register, RegisterPair, Target, UndocumentedCopy,
};
use crate::memory::Memory;
use crate::ports::{InterruptRequest, PortMap};
use crate::state::{Flags, Status, Z80, Z80Error, Z80State};

/// What the dispatcher does with PC once an instruction has run
///
/// The `Repeat` forms leave PC alone, either because the instruction already wrote a new one
/// or because a block instruction goes around again. The `Slow` forms charge the taken or
/// repeating cost of the instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Next,
    NextSlow,
    Repeat,
    RepeatSlow,
}

impl Completion {
    fn advances_pc(self) -> bool {
        matches!(self, Completion::Next | Completion::NextSlow)
    }

    fn is_slow(self) -> bool {
        matches!(self, Completion::NextSlow | Completion::RepeatSlow)
    }

    fn taken_if(condition: bool) -> Completion {
        if condition {
            Completion::RepeatSlow
        } else {
            Completion::Next
        }
    }
}

/// A record of the last instruction executed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Z80Cycle {
    pub current_clock: u64,
    pub pc: u16,
    pub length: u16,
    pub instruction: Instruction,
    pub took_branch: bool,
}

impl Default for Z80Cycle {
    fn default() -> Self {
        Self::at_time(0)
    }
}

impl Z80Cycle {
    pub fn at_time(current_clock: u64) -> Self {
        Self {
            current_clock,
            pc: 0,
            length: 0,
            instruction: Instruction::NOP,
            took_branch: false,
        }
    }
}

/// A CPU bound to its memory and I/O for the duration of one step
pub struct Z80Executor<'a, M, P> {
    pub state: &'a mut Z80State,
    pub clock: &'a mut Clock,
    pub debugger: &'a mut Z80Debugger,
    pub memory: M,
    pub ports: P,
    pub cycle: Z80Cycle,
}

impl Z80 {
    pub fn begin<M, P>(&mut self, memory: M, ports: P) -> Z80Executor<'_, M, P>
    where
        M: Memory,
        P: PortMap,
    {
        let cycle = Z80Cycle::at_time(self.clock.ticks());
        Z80Executor {
            state: &mut self.state,
            clock: &mut self.clock,
            debugger: &mut self.debugger,
            memory,
            ports,
            cycle,
        }
    }

    /// Execute one instruction (or one idle tick while halted) and return the T-states it took
    pub fn step<M, P>(&mut self, memory: &mut M, ports: &mut P) -> Result<u32, Z80Error>
    where
        M: Memory + ?Sized,
        P: PortMap + ?Sized,
    {
        let mut executor = self.begin(memory, ports);
        let clocks = executor.step_one()?;
        let cycle = executor.end();
        self.previous_cycle = cycle;
        Ok(clocks)
    }

    /// Run whole instructions until at least `duration` of CPU time has elapsed
    pub fn run_for<M, P>(&mut self, memory: &mut M, ports: &mut P, duration: Duration) -> Result<u64, Z80Error>
    where
        M: Memory + ?Sized,
        P: PortMap + ?Sized,
    {
        let target = duration_to_cycles(duration, self.frequency);
        let start = self.clock.ticks();
        while self.clock.ticks() - start < target {
            self.step(memory, ports)?;
        }
        Ok(self.clock.ticks() - start)
    }

    /// Step until the CPU halts with interrupts disabled, which nothing can wake it from
    ///
    /// Returns the T-states executed, or `StepLimit` if `limit` steps go by first.
    pub fn run_until_halted<M, P>(&mut self, memory: &mut M, ports: &mut P, limit: u64) -> Result<u64, Z80Error>
    where
        M: Memory + ?Sized,
        P: PortMap + ?Sized,
    {
        let start = self.clock.ticks();
        for _ in 0..limit {
            if self.is_stopped() {
                return Ok(self.clock.ticks() - start);
            }
            self.step(memory, ports)?;
        }

        if self.is_stopped() {
            Ok(self.clock.ticks() - start)
        } else {
            Err(Z80Error::StepLimit(limit))
        }
    }

    /// Assert the interrupt line from the host for `duration` T-states
    pub fn request_interrupt(&mut self, duration: u32, vector: u8) {
        let request = InterruptRequest {
            duration,
            vector,
        };
        self.state.interrupts.request(self.clock.ticks(), request);
    }

    fn is_stopped(&self) -> bool {
        self.is_halted() && !self.state.interrupts.iff1
    }
}

impl<'a, M, P> Z80Executor<'a, M, P>
where
    M: Memory,
    P: PortMap,
{
    pub fn end(self) -> Z80Cycle {
        self.cycle
    }

    pub fn step_one(&mut self) -> Result<u32, Z80Error> {
        if self.state.status == Status::Running {
            self.debugger.check_breakpoints(self.state.pc.get())?;
        }

        let now = self.clock.ticks();
        if let Some(request) = self.ports.tick(now) {
            self.state.interrupts.request(now, request);
        }

        let clocks = match self.state.status {
            Status::Halted => {
                self.state.refresh(1);
                4
            },
            Status::Running => self.cycle_one(),
        };
        self.clock.advance(clocks);

        Ok(clocks + self.check_interrupts())
    }

    fn cycle_one(&mut self) -> u32 {
        let pc = self.state.pc.get();
        let descriptor = decode::lookup(&mut self.memory, pc);
        self.state.refresh(descriptor.refresh);

        self.cycle.pc = pc;
        self.cycle.length = descriptor.length;
        self.cycle.instruction = descriptor.instruction;
        trace!("{:#06x}: {:?}", pc, descriptor.instruction);

        let completion = self.execute_current();
        if completion.advances_pc() {
            self.state.pc.set(pc.wrapping_add(descriptor.length));
        }

        self.cycle.took_branch = completion.is_slow();
        descriptor.cycles.calculate_cycles(completion.is_slow()) as u32
    }

    fn check_interrupts(&mut self) -> u32 {
        let now = self.clock.ticks();
        let vector = match self.state.interrupts.poll(now) {
            Some(vector) => vector,
            None => return 0,
        };

        self.state.status = Status::Running;
        self.state.refresh(1);

        let return_addr = self.state.pc.get();
        self.push_word(return_addr);
        let (handler, clocks) = self
            .state
            .interrupts
            .handler_address(&mut self.memory, self.state.i(), vector);
        self.state.pc.set(handler);
        debug!(
            "interrupt accepted in {:?} with vector {:#04x}: {:#06x} -> {:#06x}",
            self.state.interrupts.mode, vector, return_addr, handler
        );

        self.clock.advance(clocks);
        clocks
    }

    fn execute_current(&mut self) -> Completion {
        match self.cycle.instruction {
            Instruction::ADCa(target) => {
                let src = self.get_target_value(target);
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::add_bytes(acc, src, self.state.get_flag(Flags::Carry));
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::ADC16(dest_pair, src_pair) => {
                let src = self.state.get_register_pair(src_pair);
                let dest = self.state.get_register_pair(dest_pair);
                let (result, flags) = alu::adc_words(dest, src, self.state.get_flag(Flags::Carry));
                self.state.set_register_pair(dest_pair, result);
                self.set_all_flags(flags);
            },
            Instruction::ADDa(target) => {
                let src = self.get_target_value(target);
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::add_bytes(acc, src, false);
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::ADD16(dest_pair, src_pair) => {
                let src = self.state.get_register_pair(src_pair);
                let dest = self.state.get_register_pair(dest_pair);
                let (result, flags) = alu::add_words(dest, src, self.state.get_flags());
                self.state.set_register_pair(dest_pair, result);
                self.set_all_flags(flags);
            },
            Instruction::AND(target) => {
                let value = self.get_target_value(target);
                let result = self.state.get_register(Register::A) & value;
                self.state.set_register(Register::A, result);
                self.set_all_flags(alu::logic_flags(result, false, true));
            },
            Instruction::BIT(bit, target) => {
                let value = self.get_target_value(target);
                let is_set = (value & (1 << bit)) != 0;
                // (IX+d) leaks the high byte of the computed address into F3/F5
                let undocumented = match target {
                    Target::IndirectOffset(index_reg) => (self.get_indexed_address(index_reg) >> 8) as u8,
                    _ => value,
                };
                let flags = alu::flag(Flags::Sign, bit == 7 && is_set)
                    | alu::flag(Flags::Zero, !is_set)
                    | alu::flag(Flags::Parity, !is_set)
                    | Flags::HalfCarry as u8
                    | (undocumented & FLAGS_UNDOCUMENTED)
                    | (self.state.get_flags() & Flags::Carry as u8);
                self.set_all_flags(flags);
            },
            Instruction::CALL => {
                let addr = self.get_operand_word();
                self.push_word(self.next_pc());
                self.state.pc.set(addr);
                return Completion::Repeat;
            },
            Instruction::CALLcc(cond) => {
                let taken = self.get_current_condition(cond);
                if taken {
                    let addr = self.get_operand_word();
                    self.push_word(self.next_pc());
                    self.state.pc.set(addr);
                }
                return Completion::taken_if(taken);
            },
            Instruction::CCF => {
                let carry = self.state.get_flag(Flags::Carry);
                let acc = self.state.get_register(Register::A);
                let flags = (self.state.get_flags() & (FLAGS_NUMERIC | Flags::Parity as u8))
                    | (acc & FLAGS_UNDOCUMENTED)
                    | alu::flag(Flags::HalfCarry, carry)
                    | alu::flag(Flags::Carry, !carry);
                self.set_all_flags(flags);
            },
            Instruction::CP(target) => {
                let src = self.get_target_value(target);
                let acc = self.state.get_register(Register::A);
                self.set_all_flags(alu::compare_bytes(acc, src));
            },
            Instruction::CPD | Instruction::CPDR | Instruction::CPI | Instruction::CPIR => {
                let diff = block_step(matches!(self.cycle.instruction, Instruction::CPI | Instruction::CPIR));
                let repeat = matches!(self.cycle.instruction, Instruction::CPIR | Instruction::CPDR);

                let hl = self.state.get_register_pair(RegisterPair::HL);
                let value = self.memory.read_byte(hl);
                let acc = self.state.get_register(Register::A);
                let (result, sub_flags) = alu::sub_bytes(acc, value, false);

                self.state.set_register_pair(RegisterPair::HL, hl.wrapping_add(diff));
                let count = self.state.get_register_pair(RegisterPair::BC).wrapping_sub(1);
                self.state.set_register_pair(RegisterPair::BC, count);

                let half_carry = (sub_flags & Flags::HalfCarry as u8) != 0;
                let n = result.wrapping_sub(half_carry as u8);
                let flags = (sub_flags & (FLAGS_NUMERIC | Flags::HalfCarry as u8))
                    | Flags::AddSubtract as u8
                    | block_undocumented_flags(n)
                    | alu::flag(Flags::Parity, count != 0)
                    | (self.state.get_flags() & Flags::Carry as u8);
                self.set_all_flags(flags);

                return Completion::taken_if(repeat && count != 0 && result != 0);
            },
            Instruction::CPL => {
                let result = !self.state.get_register(Register::A);
                self.state.set_register(Register::A, result);
                let flags = (self.state.get_flags() & (FLAGS_NUMERIC | Flags::Parity as u8 | Flags::Carry as u8))
                    | (result & FLAGS_UNDOCUMENTED)
                    | Flags::HalfCarry as u8
                    | Flags::AddSubtract as u8;
                self.set_all_flags(flags);
            },
            Instruction::DAA => {
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::decimal_adjust(acc, self.state.get_flags());
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::DEC16(regpair) => {
                let value = self.state.get_register_pair(regpair);
                self.state.set_register_pair(regpair, value.wrapping_sub(1));
            },
            Instruction::DEC8(target) => {
                let value = self.get_target_value(target);
                let (result, flags) = alu::dec_byte(value, self.state.get_flags());
                self.set_target_value(target, result);
                self.set_all_flags(flags);
            },
            Instruction::DI => {
                self.state.interrupts.disable();
            },
            Instruction::DJNZ => {
                let result = self.state.get_register(Register::B).wrapping_sub(1);
                self.state.set_register(Register::B, result);

                let taken = result != 0;
                if taken {
                    let target = self.get_relative_target();
                    self.state.pc.set(target);
                }
                return Completion::taken_if(taken);
            },
            Instruction::EI => {
                self.state.interrupts.enable();
            },
            Instruction::EXX => {
                self.state.exchange_general();
            },
            Instruction::EXafaf => {
                self.state.exchange_af();
            },
            Instruction::EXhlde => {
                let (hl, de) = (self.state.get_register_pair(RegisterPair::HL), self.state.get_register_pair(RegisterPair::DE));
                self.state.set_register_pair(RegisterPair::DE, hl);
                self.state.set_register_pair(RegisterPair::HL, de);
            },
            Instruction::EXsp(regpair) => {
                let reg_value = self.state.get_register_pair(regpair);
                let sp = self.state.sp.get();
                let sp_value = self.memory.read_word(sp);
                self.state.set_register_pair(regpair, sp_value);
                self.memory.write_word(sp, reg_value);
            },
            Instruction::HALT => {
                self.state.status = Status::Halted;
            },
            Instruction::IM(mode) => {
                self.state.interrupts.mode = mode;
            },
            Instruction::INC16(regpair) => {
                let value = self.state.get_register_pair(regpair);
                self.state.set_register_pair(regpair, value.wrapping_add(1));
            },
            Instruction::INC8(target) => {
                let value = self.get_target_value(target);
                let (result, flags) = alu::inc_byte(value, self.state.get_flags());
                self.set_target_value(target, result);
                self.set_all_flags(flags);
            },
            Instruction::IND | Instruction::INDR | Instruction::INI | Instruction::INIR => {
                let diff = block_step(matches!(self.cycle.instruction, Instruction::INI | Instruction::INIR));
                let repeat = matches!(self.cycle.instruction, Instruction::INIR | Instruction::INDR);

                let port = self.state.get_register(Register::C);
                let count = self.state.get_register(Register::B);
                let value = self.ports.read(port, count);

                let hl = self.state.get_register_pair(RegisterPair::HL);
                self.memory.write_byte(hl, value);
                self.state.set_register_pair(RegisterPair::HL, hl.wrapping_add(diff));

                let count = count.wrapping_sub(1);
                self.state.set_register(Register::B, count);

                let k = value as u16 + (port.wrapping_add(diff as u8)) as u16;
                self.set_all_flags(block_io_flags(value, k, count));

                return Completion::taken_if(repeat && count != 0);
            },
            Instruction::INic(reg) => {
                let value = self.port_in_c();
                self.state.set_register(reg, value);
                self.set_port_in_flags(value);
            },
            Instruction::INicz => {
                let value = self.port_in_c();
                self.set_port_in_flags(value);
            },
            Instruction::INx => {
                let port = self.get_operand_byte();
                let acc = self.state.get_register(Register::A);
                let value = self.ports.read(port, acc);
                self.state.set_register(Register::A, value);
            },
            Instruction::JP => {
                let addr = self.get_operand_word();
                self.state.pc.set(addr);
                return Completion::Repeat;
            },
            Instruction::JPIndirect(regpair) => {
                let addr = self.state.get_register_pair(regpair);
                self.state.pc.set(addr);
                return Completion::Repeat;
            },
            Instruction::JPcc(cond) => {
                if self.get_current_condition(cond) {
                    let addr = self.get_operand_word();
                    self.state.pc.set(addr);
                    return Completion::Repeat;
                }
            },
            Instruction::JR => {
                let target = self.get_relative_target();
                self.state.pc.set(target);
                return Completion::Repeat;
            },
            Instruction::JRcc(cond) => {
                let taken = self.get_current_condition(cond);
                if taken {
                    let target = self.get_relative_target();
                    self.state.pc.set(target);
                }
                return Completion::taken_if(taken);
            },
            Instruction::LD(dest, src) => {
                let src_value = self.get_load_target_value(src);
                self.set_load_target_value(dest, src_value);
            },
            Instruction::LDsr(special_reg, dir) => match dir {
                Direction::FromAcc => {
                    let acc = self.state.get_register(Register::A);
                    self.state.set_special_register(special_reg, acc);
                },
                Direction::ToAcc => {
                    let value = self.state.get_special_register(special_reg);
                    self.state.set_register(Register::A, value);
                    let flags = alu::numeric_flags(value)
                        | alu::flag(Flags::Parity, self.state.interrupts.iff2)
                        | (self.state.get_flags() & Flags::Carry as u8);
                    self.set_all_flags(flags);
                },
            },
            Instruction::LDD | Instruction::LDDR | Instruction::LDI | Instruction::LDIR => {
                let diff = block_step(matches!(self.cycle.instruction, Instruction::LDI | Instruction::LDIR));
                let repeat = matches!(self.cycle.instruction, Instruction::LDIR | Instruction::LDDR);

                let src = self.state.get_register_pair(RegisterPair::HL);
                let dest = self.state.get_register_pair(RegisterPair::DE);
                let value = self.memory.read_byte(src);
                self.memory.write_byte(dest, value);

                self.state.set_register_pair(RegisterPair::HL, src.wrapping_add(diff));
                self.state.set_register_pair(RegisterPair::DE, dest.wrapping_add(diff));
                let count = self.state.get_register_pair(RegisterPair::BC).wrapping_sub(1);
                self.state.set_register_pair(RegisterPair::BC, count);

                let n = value.wrapping_add(self.state.get_register(Register::A));
                let flags = (self.state.get_flags() & (FLAGS_NUMERIC | Flags::Carry as u8))
                    | block_undocumented_flags(n)
                    | alu::flag(Flags::Parity, count != 0);
                self.set_all_flags(flags);

                return Completion::taken_if(repeat && count != 0);
            },
            Instruction::NEG => {
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::sub_bytes(0, acc, false);
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::NOP => {},
            Instruction::OR(target) => {
                let value = self.get_target_value(target);
                let result = self.state.get_register(Register::A) | value;
                self.state.set_register(Register::A, result);
                self.set_all_flags(alu::logic_flags(result, false, false));
            },
            Instruction::OTDR | Instruction::OTIR | Instruction::OUTD | Instruction::OUTI => {
                let diff = block_step(matches!(self.cycle.instruction, Instruction::OUTI | Instruction::OTIR));
                let repeat = matches!(self.cycle.instruction, Instruction::OTIR | Instruction::OTDR);

                let hl = self.state.get_register_pair(RegisterPair::HL);
                let value = self.memory.read_byte(hl);

                // B is decremented before it goes out on the upper address lines
                let count = self.state.get_register(Register::B).wrapping_sub(1);
                self.state.set_register(Register::B, count);
                let port = self.state.get_register(Register::C);
                self.ports.write(port, count, value);

                self.state.set_register_pair(RegisterPair::HL, hl.wrapping_add(diff));

                let k = value as u16 + self.state.get_register(Register::L) as u16;
                self.set_all_flags(block_io_flags(value, k, count));

                return Completion::taken_if(repeat && count != 0);
            },
            Instruction::OUTic(reg) => {
                let value = self.state.get_register(reg);
                self.port_out_c(value);
            },
            Instruction::OUTicz => {
                self.port_out_c(0);
            },
            Instruction::OUTx => {
                let port = self.get_operand_byte();
                let acc = self.state.get_register(Register::A);
                self.ports.write(port, acc, acc);
            },
            Instruction::POP(regpair) => {
                let value = self.pop_word();
                self.state.set_register_pair(regpair, value);
            },
            Instruction::PUSH(regpair) => {
                let value = self.state.get_register_pair(regpair);
                self.push_word(value);
            },
            Instruction::RES(bit, target, opt_copy) => {
                let value = self.get_target_value(target) & !(1 << bit);
                self.set_bit_op_result(target, opt_copy, value);
            },
            Instruction::RET => {
                let addr = self.pop_word();
                self.state.pc.set(addr);
                return Completion::Repeat;
            },
            Instruction::RETI | Instruction::RETN => {
                let addr = self.pop_word();
                self.state.pc.set(addr);
                self.state.interrupts.restore();
                return Completion::Repeat;
            },
            Instruction::RETcc(cond) => {
                let taken = self.get_current_condition(cond);
                if taken {
                    let addr = self.pop_word();
                    self.state.pc.set(addr);
                }
                return Completion::taken_if(taken);
            },
            Instruction::RL(target, opt_copy) => {
                let value = self.get_target_value(target);
                let (result, out_bit) = alu::rotate_left(value, RotateType::Bit9, self.state.get_flag(Flags::Carry));
                self.set_shift_result(target, opt_copy, result, out_bit);
            },
            Instruction::RLA => {
                let value = self.state.get_register(Register::A);
                let (result, out_bit) = alu::rotate_left(value, RotateType::Bit9, self.state.get_flag(Flags::Carry));
                self.set_accumulator_rotate_result(result, out_bit);
            },
            Instruction::RLC(target, opt_copy) => {
                let value = self.get_target_value(target);
                let (result, out_bit) = alu::rotate_left(value, RotateType::Bit8, false);
                self.set_shift_result(target, opt_copy, result, out_bit);
            },
            Instruction::RLCA => {
                let value = self.state.get_register(Register::A);
                let (result, out_bit) = alu::rotate_left(value, RotateType::Bit8, false);
                self.set_accumulator_rotate_result(result, out_bit);
            },
            Instruction::RLD => {
                let hl = self.state.get_register_pair(RegisterPair::HL);
                let value = self.memory.read_byte(hl);
                let acc = self.state.get_register(Register::A);

                self.memory.write_byte(hl, (value << 4) | (acc & 0x0F));
                let result = (acc & 0xF0) | (value >> 4);
                self.state.set_register(Register::A, result);
                self.set_digit_rotate_flags(result);
            },
            Instruction::RR(target, opt_copy) => {
                let value = self.get_target_value(target);
                let (result, out_bit) = alu::rotate_right(value, RotateType::Bit9, self.state.get_flag(Flags::Carry));
                self.set_shift_result(target, opt_copy, result, out_bit);
            },
            Instruction::RRA => {
                let value = self.state.get_register(Register::A);
                let (result, out_bit) = alu::rotate_right(value, RotateType::Bit9, self.state.get_flag(Flags::Carry));
                self.set_accumulator_rotate_result(result, out_bit);
            },
            Instruction::RRC(target, opt_copy) => {
                let value = self.get_target_value(target);
                let (result, out_bit) = alu::rotate_right(value, RotateType::Bit8, false);
                self.set_shift_result(target, opt_copy, result, out_bit);
            },
            Instruction::RRCA => {
                let value = self.state.get_register(Register::A);
                let (result, out_bit) = alu::rotate_right(value, RotateType::Bit8, false);
                self.set_accumulator_rotate_result(result, out_bit);
            },
            Instruction::RRD => {
                let hl = self.state.get_register_pair(RegisterPair::HL);
                let value = self.memory.read_byte(hl);
                let acc = self.state.get_register(Register::A);

                self.memory.write_byte(hl, (acc << 4) | (value >> 4));
                let result = (acc & 0xF0) | (value & 0x0F);
                self.state.set_register(Register::A, result);
                self.set_digit_rotate_flags(result);
            },
            Instruction::RST(addr) => {
                self.push_word(self.next_pc());
                self.state.pc.set(addr as u16);
                return Completion::Repeat;
            },
            Instruction::SBCa(target) => {
                let src = self.get_target_value(target);
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::sub_bytes(acc, src, self.state.get_flag(Flags::Carry));
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::SBC16(dest_pair, src_pair) => {
                let src = self.state.get_register_pair(src_pair);
                let dest = self.state.get_register_pair(dest_pair);
                let (result, flags) = alu::sbc_words(dest, src, self.state.get_flag(Flags::Carry));
                self.state.set_register_pair(dest_pair, result);
                self.set_all_flags(flags);
            },
            Instruction::SCF => {
                let acc = self.state.get_register(Register::A);
                let flags = (self.state.get_flags() & (FLAGS_NUMERIC | Flags::Parity as u8))
                    | (acc & FLAGS_UNDOCUMENTED)
                    | Flags::Carry as u8;
                self.set_all_flags(flags);
            },
            Instruction::SET(bit, target, opt_copy) => {
                let value = self.get_target_value(target) | (1 << bit);
                self.set_bit_op_result(target, opt_copy, value);
            },
            Instruction::SLA(target, opt_copy) => {
                let value = self.get_target_value(target);
                self.set_shift_result(target, opt_copy, value << 1, (value & 0x80) != 0);
            },
            Instruction::SLL(target, opt_copy) => {
                let value = self.get_target_value(target);
                self.set_shift_result(target, opt_copy, (value << 1) | 0x01, (value & 0x80) != 0);
            },
            Instruction::SRA(target, opt_copy) => {
                let value = self.get_target_value(target);
                self.set_shift_result(target, opt_copy, (value >> 1) | (value & 0x80), (value & 0x01) != 0);
            },
            Instruction::SRL(target, opt_copy) => {
                let value = self.get_target_value(target);
                self.set_shift_result(target, opt_copy, value >> 1, (value & 0x01) != 0);
            },
            Instruction::SUB(target) => {
                let src = self.get_target_value(target);
                let acc = self.state.get_register(Register::A);
                let (result, flags) = alu::sub_bytes(acc, src, false);
                self.state.set_register(Register::A, result);
                self.set_all_flags(flags);
            },
            Instruction::XOR(target) => {
                let value = self.get_target_value(target);
                let result = self.state.get_register(Register::A) ^ value;
                self.state.set_register(Register::A, result);
                self.set_all_flags(alu::logic_flags(result, false, false));
            },
        }

        Completion::Next
    }

    fn set_shift_result(&mut self, target: Target, opt_copy: UndocumentedCopy, result: u8, out_bit: bool) {
        self.set_all_flags(alu::logic_flags(result, out_bit, false));
        self.set_bit_op_result(target, opt_copy, result);
    }

    fn set_bit_op_result(&mut self, target: Target, opt_copy: UndocumentedCopy, result: u8) {
        self.set_target_value(target, result);
        if let Some(reg) = opt_copy {
            self.state.set_register(reg, result);
        }
    }

    /// The accumulator-only rotates leave S, Z and P/V alone
    fn set_accumulator_rotate_result(&mut self, result: u8, out_bit: bool) {
        self.state.set_register(Register::A, result);
        let flags = (self.state.get_flags() & (FLAGS_NUMERIC | Flags::Parity as u8))
            | (result & FLAGS_UNDOCUMENTED)
            | alu::flag(Flags::Carry, out_bit);
        self.set_all_flags(flags);
    }

    fn set_digit_rotate_flags(&mut self, result: u8) {
        let carry = self.state.get_flags() & Flags::Carry as u8;
        self.set_all_flags(alu::logic_flags(result, false, false) | carry);
    }

    fn set_port_in_flags(&mut self, value: u8) {
        let carry = self.state.get_flags() & Flags::Carry as u8;
        self.set_all_flags(alu::logic_flags(value, false, false) | carry);
    }

    fn port_in_c(&mut self) -> u8 {
        let port = self.state.get_register(Register::C);
        let upper = self.state.get_register(Register::B);
        self.ports.read(port, upper)
    }

    fn port_out_c(&mut self, value: u8) {
        let port = self.state.get_register(Register::C);
        let upper = self.state.get_register(Register::B);
        self.ports.write(port, upper, value);
    }

    fn push_word(&mut self, value: u16) {
        let sp = self.state.sp.get().wrapping_sub(1);
        self.memory.write_byte(sp, (value >> 8) as u8);
        let sp = sp.wrapping_sub(1);
        self.memory.write_byte(sp, (value & 0x00FF) as u8);
        self.state.sp.set(sp);
    }

    fn pop_word(&mut self) -> u16 {
        let sp = self.state.sp.get();
        let value = self.memory.read_word(sp);
        self.state.sp.set(sp.wrapping_add(2));
        value
    }

    /// Address of the instruction that follows the current one
    #[inline]
    fn next_pc(&self) -> u16 {
        self.cycle.pc.wrapping_add(self.cycle.length)
    }

    /// Immediate byte operands are always the last byte of the instruction
    fn get_operand_byte(&mut self) -> u8 {
        let addr = self.cycle.pc.wrapping_add(self.cycle.length - 1);
        self.memory.read_byte(addr)
    }

    /// Immediate words and absolute addresses are always the last two bytes
    fn get_operand_word(&mut self) -> u16 {
        let addr = self.cycle.pc.wrapping_add(self.cycle.length - 2);
        self.memory.read_word(addr)
    }

    fn get_relative_target(&mut self) -> u16 {
        let offset = self.get_operand_byte() as i8;
        self.next_pc().wrapping_add(offset as i16 as u16)
    }

    /// `IX+d`/`IY+d`, where `d` always follows the prefix and opcode bytes
    fn get_indexed_address(&mut self, index_reg: IndexRegister) -> u16 {
        let offset = self.memory.read_byte(self.cycle.pc.wrapping_add(2)) as i8;
        self.state.get_index_register(index_reg).wrapping_add(offset as i16 as u16)
    }

    fn get_load_target_value(&mut self, target: LoadTarget) -> u16 {
        match target {
            LoadTarget::DirectRegByte(reg) => self.state.get_register(reg) as u16,
            LoadTarget::DirectRegHalfByte(reg) => self.state.get_index_register_half(reg) as u16,
            LoadTarget::DirectRegWord(regpair) => self.state.get_register_pair(regpair),
            LoadTarget::IndirectRegByte(regpair) => {
                let addr = self.state.get_register_pair(regpair);
                self.memory.read_byte(addr) as u16
            },
            LoadTarget::IndirectOffsetByte(index_reg) => {
                let addr = self.get_indexed_address(index_reg);
                self.memory.read_byte(addr) as u16
            },
            LoadTarget::IndirectByte => {
                let addr = self.get_operand_word();
                self.memory.read_byte(addr) as u16
            },
            LoadTarget::IndirectWord => {
                let addr = self.get_operand_word();
                self.memory.read_word(addr)
            },
            LoadTarget::ImmediateByte => self.get_operand_byte() as u16,
            LoadTarget::ImmediateWord => self.get_operand_word(),
        }
    }

    fn set_load_target_value(&mut self, target: LoadTarget, value: u16) {
        match target {
            LoadTarget::DirectRegByte(reg) => self.state.set_register(reg, value as u8),
            LoadTarget::DirectRegHalfByte(reg) => self.state.set_index_register_half(reg, value as u8),
            LoadTarget::DirectRegWord(regpair) => self.state.set_register_pair(regpair, value),
            LoadTarget::IndirectRegByte(regpair) => {
                let addr = self.state.get_register_pair(regpair);
                self.memory.write_byte(addr, value as u8);
            },
            LoadTarget::IndirectOffsetByte(index_reg) => {
                let addr = self.get_indexed_address(index_reg);
                self.memory.write_byte(addr, value as u8);
            },
            LoadTarget::IndirectByte => {
                let addr = self.get_operand_word();
                self.memory.write_byte(addr, value as u8);
            },
            LoadTarget::IndirectWord => {
                let addr = self.get_operand_word();
                self.memory.write_word(addr, value);
            },
            LoadTarget::ImmediateByte | LoadTarget::ImmediateWord => {
                unreachable!("immediate decoded as a load destination: {:?}", self.cycle.instruction)
            },
        }
    }

    fn get_target_value(&mut self, target: Target) -> u8 {
        match target {
            Target::DirectReg(reg) => self.state.get_register(reg),
            Target::DirectRegHalf(reg) => self.state.get_index_register_half(reg),
            Target::IndirectReg(regpair) => {
                let addr = self.state.get_register_pair(regpair);
                self.memory.read_byte(addr)
            },
            Target::IndirectOffset(index_reg) => {
                let addr = self.get_indexed_address(index_reg);
                self.memory.read_byte(addr)
            },
            Target::Immediate => self.get_operand_byte(),
        }
    }

    fn set_target_value(&mut self, target: Target, value: u8) {
        match target {
            Target::DirectReg(reg) => self.state.set_register(reg, value),
            Target::DirectRegHalf(reg) => self.state.set_index_register_half(reg, value),
            Target::IndirectReg(regpair) => {
                let addr = self.state.get_register_pair(regpair);
                self.memory.write_byte(addr, value);
            },
            Target::IndirectOffset(index_reg) => {
                let addr = self.get_indexed_address(index_reg);
                self.memory.write_byte(addr, value);
            },
            Target::Immediate => unreachable!("immediate decoded as a destination: {:?}", self.cycle.instruction),
        }
    }

    fn get_current_condition(&self, cond: Condition) -> bool {
        match cond {
            Condition::NotZero => !self.state.get_flag(Flags::Zero),
            Condition::Zero => self.state.get_flag(Flags::Zero),
            Condition::NotCarry => !self.state.get_flag(Flags::Carry),
            Condition::Carry => self.state.get_flag(Flags::Carry),
            Condition::ParityOdd => !self.state.get_flag(Flags::Parity),
            Condition::ParityEven => self.state.get_flag(Flags::Parity),
            Condition::Positive => !self.state.get_flag(Flags::Sign),
            Condition::Negative => self.state.get_flag(Flags::Sign),
        }
    }

    #[inline(always)]
    fn set_all_flags(&mut self, flags: u8) {
        self.state.set_flags(0xFF, flags);
    }
}

/// The pointer step of a block instruction, as a wrapping 16-bit addend
fn block_step(increment: bool) -> u16 {
    if increment {
        1
    } else {
        0xFFFF
    }
}

/// F3 and F5 of the block load and compare ops come from bits 3 and 1 of an internal sum
fn block_undocumented_flags(n: u8) -> u8 {
    (n & Flags::F3 as u8) | ((n & 0x02) << 4)
}

fn block_io_flags(value: u8, k: u16, count: u8) -> u8 {
    let overflow = k > 0xFF;
    alu::numeric_flags(count)
        | alu::flag(Flags::AddSubtract, (value & 0x80) != 0)
        | alu::flag(Flags::HalfCarry, overflow)
        | alu::flag(Flags::Carry, overflow)
        | alu::flag(Flags::Parity, alu::parity(((k & 0x07) as u8) ^ count))
}
