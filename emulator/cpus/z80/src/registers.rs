use crate::instructions::{Register, RegisterPair, IndexRegister, IndexRegisterHalf, SpecialRegister};
use crate::state::{Z80State, Flags};

/// A 16-bit register whose high and low bytes are individually addressable
///
/// Both halves alias the same storage, so writing either half is immediately visible through
/// the word value and vice versa.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WordRegister(u16);

impl WordRegister {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn set(&mut self, value: u16) {
        self.0 = value;
    }

    #[inline]
    pub fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn low(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub fn set_high(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16) << 8);
    }

    #[inline]
    pub fn set_low(&mut self, value: u8) {
        self.0 = (self.0 & 0xFF00) | (value as u16);
    }
}

impl From<u16> for WordRegister {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// The four pairs that have a shadow copy
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterSet {
    pub af: WordRegister,
    pub bc: WordRegister,
    pub de: WordRegister,
    pub hl: WordRegister,
}

impl Z80State {
    pub fn get_register(&self, reg: Register) -> u8 {
        let regs = &self.main;
        match reg {
            Register::B => regs.bc.high(),
            Register::C => regs.bc.low(),
            Register::D => regs.de.high(),
            Register::E => regs.de.low(),
            Register::H => regs.hl.high(),
            Register::L => regs.hl.low(),
            Register::A => regs.af.high(),
            Register::F => regs.af.low(),
        }
    }

    pub fn set_register(&mut self, reg: Register, value: u8) {
        let regs = &mut self.main;
        match reg {
            Register::B => regs.bc.set_high(value),
            Register::C => regs.bc.set_low(value),
            Register::D => regs.de.set_high(value),
            Register::E => regs.de.set_low(value),
            Register::H => regs.hl.set_high(value),
            Register::L => regs.hl.set_low(value),
            Register::A => regs.af.set_high(value),
            Register::F => regs.af.set_low(value),
        }
    }

    pub fn get_register_pair(&self, regpair: RegisterPair) -> u16 {
        match regpair {
            RegisterPair::BC => self.main.bc.get(),
            RegisterPair::DE => self.main.de.get(),
            RegisterPair::HL => self.main.hl.get(),
            RegisterPair::AF => self.main.af.get(),
            RegisterPair::SP => self.sp.get(),
            RegisterPair::IX => self.ix.get(),
            RegisterPair::IY => self.iy.get(),
        }
    }

    pub fn set_register_pair(&mut self, regpair: RegisterPair, value: u16) {
        match regpair {
            RegisterPair::BC => self.main.bc.set(value),
            RegisterPair::DE => self.main.de.set(value),
            RegisterPair::HL => self.main.hl.set(value),
            RegisterPair::AF => self.main.af.set(value),
            RegisterPair::SP => self.sp.set(value),
            RegisterPair::IX => self.ix.set(value),
            RegisterPair::IY => self.iy.set(value),
        }
    }

    pub fn get_index_register(&self, reg: IndexRegister) -> u16 {
        match reg {
            IndexRegister::IX => self.ix.get(),
            IndexRegister::IY => self.iy.get(),
        }
    }

    pub fn get_index_register_half(&self, reg: IndexRegisterHalf) -> u8 {
        match reg {
            IndexRegisterHalf::IXH => self.ix.high(),
            IndexRegisterHalf::IXL => self.ix.low(),
            IndexRegisterHalf::IYH => self.iy.high(),
            IndexRegisterHalf::IYL => self.iy.low(),
        }
    }

    pub fn set_index_register_half(&mut self, reg: IndexRegisterHalf, value: u8) {
        match reg {
            IndexRegisterHalf::IXH => self.ix.set_high(value),
            IndexRegisterHalf::IXL => self.ix.set_low(value),
            IndexRegisterHalf::IYH => self.iy.set_high(value),
            IndexRegisterHalf::IYL => self.iy.set_low(value),
        }
    }

    pub fn get_special_register(&self, reg: SpecialRegister) -> u8 {
        match reg {
            SpecialRegister::I => self.ir.high(),
            SpecialRegister::R => self.ir.low(),
        }
    }

    pub fn set_special_register(&mut self, reg: SpecialRegister, value: u8) {
        match reg {
            SpecialRegister::I => self.ir.set_high(value),
            SpecialRegister::R => self.ir.set_low(value),
        }
    }

    #[inline]
    pub fn i(&self) -> u8 {
        self.ir.high()
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.ir.low()
    }

    /// Advance the low 7 bits of the refresh register, leaving bit 7 as it was
    pub fn refresh(&mut self, delta: u8) {
        let r = self.ir.low();
        self.ir.set_low((r & 0x80) | (r.wrapping_add(delta) & 0x7F));
    }

    /// `EX AF,AF'`
    pub fn exchange_af(&mut self) {
        core::mem::swap(&mut self.main.af, &mut self.shadow.af);
    }

    /// `EXX`, which leaves AF alone
    pub fn exchange_general(&mut self) {
        core::mem::swap(&mut self.main.bc, &mut self.shadow.bc);
        core::mem::swap(&mut self.main.de, &mut self.shadow.de);
        core::mem::swap(&mut self.main.hl, &mut self.shadow.hl);
    }

    #[inline(always)]
    pub fn get_flags(&self) -> u8 {
        self.main.af.low()
    }

    #[inline(always)]
    pub fn get_flag(&self, flag: Flags) -> bool {
        self.get_flags() & (flag as u8) != 0
    }

    #[inline(always)]
    pub fn set_flag(&mut self, flag: Flags, value: bool) {
        let mut flags = self.get_flags() & !(flag as u8);
        if value {
            flags |= flag as u8;
        }
        self.main.af.set_low(flags);
    }

    /// Replace the bits selected by `mask` with the same bits of `values`
    #[inline(always)]
    pub fn set_flags(&mut self, mask: u8, values: u8) {
        let flags = (self.get_flags() & !mask) | (values & mask);
        self.main.af.set_low(flags);
    }
}
