mod alu;
mod clock;
mod debugger;
mod decode;
mod execute;
mod instructions;
mod interrupts;
mod memory;
mod ports;
mod registers;
mod state;
mod timing;

pub use crate::state::{Z80, Z80Error, Z80State, Status, Flags, DEFAULT_FREQUENCY};
pub use crate::clock::{Clock, duration_to_cycles};
pub use crate::debugger::{Z80Debugger, Disassembly, disassemble, dump_disassembly};
pub use crate::decode::{Descriptor, initialize, lookup};
pub use crate::execute::{Completion, Z80Cycle, Z80Executor};
pub use crate::instructions::{
    Direction, Condition, Register, RegisterPair, IndexRegister, IndexRegisterHalf, SpecialRegister, InterruptMode, Target,
    LoadTarget, UndocumentedCopy, Instruction,
};
pub use crate::interrupts::{InterruptController, PendingInterrupt, FIXED_VECTOR};
pub use crate::memory::{Memory, MemoryBlock};
pub use crate::ports::{InterruptRequest, IoPorts, PortDevice, PortMap, DEFAULT_INTERRUPT_DURATION, FLOATING_BUS};
pub use crate::registers::{RegisterSet, WordRegister};
pub use crate::timing::Z80InstructionCycles;
