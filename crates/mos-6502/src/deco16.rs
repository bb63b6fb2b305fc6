//! DECO16: a 6502 fed scrambled opcodes.
//!
//! Opcode bytes — never operands — fetched from odd addresses have bits 5
//! and 6 swapped. The permutation is a pure function of address parity and
//! value, so the strategy carries no state at all.

use emu_core::Bus;

use crate::Mos6502;
use crate::memory::MemoryAccess;

/// Strategy descrambling opcode fetches from odd addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecryptAccess;

impl DecryptAccess {
    /// Create the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Swap bits 5 and 6.
const fn descramble(val: u8) -> u8 {
    (val & 0x9f) | ((val & 0x20) << 1) | ((val & 0x40) >> 1)
}

impl MemoryAccess for DecryptAccess {
    fn read<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(u32::from(adr))
    }

    fn read_sync<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        let v = bus.read_opcode(u32::from(adr));
        if adr & 1 != 0 { descramble(v) } else { v }
    }

    fn read_arg<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(u32::from(adr))
    }

    fn write<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        bus.write(u32::from(adr), val);
    }
}

/// The DECO16: a 6502 with encrypted opcode fetch.
pub type Deco16 = Mos6502<DecryptAccess>;

impl Deco16 {
    /// Create a DECO16 core.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interface(DecryptAccess::new())
    }
}

impl Default for Deco16 {
    fn default() -> Self {
        Self::new()
    }
}
