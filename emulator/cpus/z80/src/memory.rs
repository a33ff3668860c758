/// Byte-addressable memory as seen by the CPU
///
/// Words are little-endian: the low byte lives at `addr` and the high byte at `addr + 1`,
/// wrapping at the top of the address space.
pub trait Memory {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    #[inline]
    fn read_word(&mut self, addr: u16) -> u16 {
        let low = self.read_byte(addr) as u16;
        let high = self.read_byte(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    #[inline]
    fn write_word(&mut self, addr: u16, value: u16) {
        self.write_byte(addr, value as u8);
        self.write_byte(addr.wrapping_add(1), (value >> 8) as u8);
    }
}

impl<M: Memory + ?Sized> Memory for &mut M {
    #[inline]
    fn read_byte(&mut self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }
}

/// A flat 64 KiB address space, optionally with a write-protected ROM at the bottom
#[derive(Clone)]
pub struct MemoryBlock {
    rom_size: usize,
    contents: Vec<u8>,
}

impl Default for MemoryBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlock {
    pub fn new() -> MemoryBlock {
        MemoryBlock {
            rom_size: 0,
            contents: vec![0; 0x1_0000],
        }
    }

    /// Load `rom` at address 0 and silently drop any writes that land inside it
    pub fn with_rom(rom: &[u8]) -> MemoryBlock {
        let mut memory = Self::new();
        memory.load_at(0, rom);
        memory.read_only(rom.len().min(0x1_0000));
        memory
    }

    /// Copy `data` into memory starting at `addr`, ignoring ROM protection
    pub fn load_at(&mut self, addr: u16, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            let addr = addr.wrapping_add(i as u16) as usize;
            self.contents[addr] = *byte;
        }
    }

    /// Protect the first `size` bytes from writes by the CPU
    pub fn read_only(&mut self, size: usize) {
        self.rom_size = size;
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl Memory for MemoryBlock {
    #[inline]
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.contents[addr as usize]
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, value: u8) {
        if (addr as usize) < self.rom_size {
            return;
        }
        self.contents[addr as usize] = value;
    }
}
