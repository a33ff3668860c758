use log::debug;

use crate::instructions::InterruptMode;
use crate::memory::Memory;
use crate::ports::InterruptRequest;

/// Address of the fixed handler used by interrupt modes 0 and 1
pub const FIXED_VECTOR: u16 = 0x0038;

/// An interrupt line held by a device, visible until `deadline` on the CPU clock
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingInterrupt {
    pub deadline: u64,
    pub vector: u8,
}

/// The maskable interrupt logic: both enable flip-flops, the mode, and the request window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptController {
    pub iff1: bool,
    pub iff2: bool,
    pub mode: InterruptMode,
    pub pending: Option<PendingInterrupt>,
    /// Set by `EI` so that the instruction right after it always runs before an interrupt
    pub suppressed: bool,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self {
            iff1: false,
            iff2: false,
            mode: InterruptMode::Mode0,
            pending: None,
            suppressed: false,
        }
    }
}

impl InterruptController {
    /// Record a request raised at `now`, replacing any request still pending
    pub fn request(&mut self, now: u64, request: InterruptRequest) {
        self.pending = Some(PendingInterrupt {
            deadline: now + request.duration as u64,
            vector: request.vector,
        });
    }

    pub fn enable(&mut self) {
        self.iff1 = true;
        self.iff2 = true;
        self.suppressed = true;
    }

    pub fn disable(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
    }

    /// `RETN`/`RETI` put back the enable state saved when the interrupt was taken
    pub fn restore(&mut self) {
        self.iff1 = self.iff2;
    }

    /// Decide whether the pending request is taken after the instruction that just completed
    ///
    /// Returns the vector byte supplied by the device when the interrupt is accepted, in which
    /// case both flip-flops have already been cleared.
    pub fn poll(&mut self, now: u64) -> Option<u8> {
        let suppressed = core::mem::take(&mut self.suppressed);
        let pending = self.pending?;

        if now >= pending.deadline {
            debug!("interrupt request lapsed at {} (deadline {})", now, pending.deadline);
            self.pending = None;
            return None;
        }

        if suppressed || !self.iff1 {
            return None;
        }

        self.pending = None;
        self.disable();
        Some(pending.vector)
    }

    /// The handler address and the acknowledge cost in T-states for the current mode
    ///
    /// Panics if the mode isn't one the hardware can be put into.
    pub fn handler_address<M: Memory>(&self, memory: &mut M, i: u8, vector: u8) -> (u16, u32) {
        match self.mode {
            InterruptMode::Mode0 | InterruptMode::Mode1 => (FIXED_VECTOR, 13),
            InterruptMode::Mode2 => {
                let table_entry = ((i as u16) << 8) | vector as u16;
                (memory.read_word(table_entry), 19)
            },
            InterruptMode::Unknown(mode) => panic!("interrupt accepted in unsupported mode {}", mode),
        }
    }
}
