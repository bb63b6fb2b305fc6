//! 6504: the reduced-bus variant.
//!
//! Identical instruction set to the 6502; the package only bonds out 13
//! address lines, so every bus access masks the address before it leaves
//! the chip. Locations that differ only in the missing high bits alias the
//! same cell.

use emu_core::Bus;

use crate::Mos6502;
use crate::memory::MemoryAccess;

/// Strategy masking every access to a reduced bus width.
#[derive(Debug, Clone, Copy)]
pub struct MaskedAccess {
    mask: u16,
}

impl MaskedAccess {
    /// Create a strategy keeping only the address bits in `mask`.
    #[must_use]
    pub const fn new(mask: u16) -> Self {
        Self { mask }
    }
}

impl MemoryAccess for MaskedAccess {
    fn read<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(u32::from(adr & self.mask))
    }

    fn read_sync<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read_opcode(u32::from(adr & self.mask))
    }

    fn read_arg<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(u32::from(adr & self.mask))
    }

    fn write<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        bus.write(u32::from(adr & self.mask), val);
    }
}

/// The MOS 6504: a 6502 die in a 28-pin package with a 13-bit (8 KiB) bus.
pub type Mos6504 = Mos6502<MaskedAccess>;

impl Mos6504 {
    /// Create a 6504 core.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interface(MaskedAccess::new(0x1fff))
    }
}

impl Default for Mos6504 {
    fn default() -> Self {
        Self::new()
    }
}
