use femtos::Frequency;

use crate::clock::Clock;
use crate::debugger::Z80Debugger;
use crate::decode;
use crate::execute::Z80Cycle;
use crate::interrupts::InterruptController;
use crate::registers::{RegisterSet, WordRegister};

/// The ZX Spectrum 48K runs its Z80 at 3.5 MHz
pub const DEFAULT_FREQUENCY: Frequency = Frequency::from_hz(3_500_000);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

#[repr(u8)]
#[allow(dead_code)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Flags {
    Carry       = 0x01,
    AddSubtract = 0x02,
    Parity      = 0x04,
    F3          = 0x08,
    HalfCarry   = 0x10,
    F5          = 0x20,
    Zero        = 0x40,
    Sign        = 0x80,
}

/// Every register, flip-flop and mode of the CPU
///
/// All fields are public so that a snapshot loader can restore an arbitrary machine, and a
/// debugger can render it, without going through instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Z80State {
    pub status: Status,

    pub pc: WordRegister,
    pub sp: WordRegister,
    pub ix: WordRegister,
    pub iy: WordRegister,
    pub ir: WordRegister,

    pub main: RegisterSet,
    pub shadow: RegisterSet,

    pub interrupts: InterruptController,
}

impl Default for Z80State {
    fn default() -> Self {
        Self {
            status: Status::Running,

            pc: WordRegister::default(),
            sp: WordRegister::default(),
            ix: WordRegister::default(),
            iy: WordRegister::default(),
            ir: WordRegister::default(),

            main: RegisterSet::default(),
            shadow: RegisterSet::default(),

            interrupts: InterruptController::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Z80Error {
    #[error("breakpoint reached at {0:#06x}")]
    Breakpoint(u16),
    #[error("gave up after {0} instructions without halting")]
    StepLimit(u64),
}

#[derive(Clone)]
pub struct Z80 {
    pub frequency: Frequency,
    pub state: Z80State,
    pub clock: Clock,
    pub debugger: Z80Debugger,
    pub previous_cycle: Z80Cycle,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY)
    }
}

impl Z80 {
    pub fn new(frequency: Frequency) -> Self {
        decode::initialize();
        Self {
            frequency,
            state: Z80State::default(),
            clock: Clock::default(),
            debugger: Z80Debugger::default(),
            previous_cycle: Z80Cycle::default(),
        }
    }

    /// Put every register back to its power-on value; the clock keeps running
    pub fn reset(&mut self) {
        self.state = Z80State::default();
        self.previous_cycle = Z80Cycle::default();
    }

    pub fn is_halted(&self) -> bool {
        self.state.status == Status::Halted
    }
}
