//! 6509: the banked variant, extending the logical address space to
//! 20 bits.
//!
//! Two 4-bit bank registers sit behind zero-page addresses 0 and 1.
//! Ordinary accesses are OR'd with the indirection bank; the two
//! shadow-indexed `(zp),Y` opcodes of the alternate opcode map go through
//! the second bank instead. The register cells are ghosts: accessing them
//! still moves data through banked memory like any other address, and
//! updates the bank register as a side effect.

use emu_core::Bus;

use crate::Mos6502;
use crate::memory::MemoryAccess;

/// Strategy OR-ing a bank register into the high-order address bits.
#[derive(Debug, Clone, Copy)]
pub struct BankedAccess {
    bank_i: u8,
    bank_y: u8,
}

impl BankedAccess {
    /// Create the strategy with both banks at their reset value ($F, the
    /// bank the boot ROM lives in).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bank_i: 0x0f,
            bank_y: 0x0f,
        }
    }

    /// Indirection bank (ghost cell $0000); drives all ordinary accesses.
    #[must_use]
    pub const fn bank_i(&self) -> u8 {
        self.bank_i
    }

    /// Y bank (ghost cell $0001); drives the shadow-indexed modes.
    #[must_use]
    pub const fn bank_y(&self) -> u8 {
        self.bank_y
    }

    /// Force both bank registers (save-state import).
    pub fn set_banks(&mut self, bank_i: u8, bank_y: u8) {
        self.bank_i = bank_i & 0x0f;
        self.bank_y = bank_y & 0x0f;
    }

    const fn in_bank_i(&self, adr: u16) -> u32 {
        adr as u32 | ((self.bank_i as u32) << 16)
    }

    const fn in_bank_y(&self, adr: u16) -> u32 {
        adr as u32 | ((self.bank_y as u32) << 16)
    }

    const fn ghost_read(&self, adr: u16, data: u8) -> u8 {
        match adr {
            0x0000 => self.bank_i,
            0x0001 => self.bank_y,
            _ => data,
        }
    }

    fn ghost_write(&mut self, adr: u16, val: u8) {
        match adr {
            0x0000 => self.bank_i = val & 0x0f,
            0x0001 => self.bank_y = val & 0x0f,
            _ => {}
        }
    }
}

impl Default for BankedAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccess for BankedAccess {
    fn read<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        let data = bus.read(self.in_bank_i(adr));
        self.ghost_read(adr, data)
    }

    fn read_sync<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read_opcode(self.in_bank_i(adr))
    }

    fn read_arg<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(self.in_bank_i(adr))
    }

    fn write<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        bus.write(self.in_bank_i(adr), val);
        self.ghost_write(adr, val);
    }

    fn read_9<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        let data = bus.read(self.in_bank_y(adr));
        self.ghost_read(adr, data)
    }

    fn write_9<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        bus.write(self.in_bank_y(adr), val);
        self.ghost_write(adr, val);
    }

    fn reset(&mut self) {
        self.bank_i = 0x0f;
        self.bank_y = 0x0f;
    }
}

/// The MOS 6509: a 6502 with 20-bit banked addressing.
pub type Mos6509 = Mos6502<BankedAccess>;

impl Mos6509 {
    /// Create a 6509 core. The alternate opcode map is selected for the
    /// lifetime of the core.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self::with_interface(BankedAccess::new());
        cpu.inst_state_base = 0x100;
        cpu
    }

    /// Indirection bank register.
    #[must_use]
    pub fn bank_i(&self) -> u8 {
        self.interface().bank_i()
    }

    /// Y bank register.
    #[must_use]
    pub fn bank_y(&self) -> u8 {
        self.interface().bank_y()
    }

    /// Force both bank registers (save-state import).
    pub fn set_banks(&mut self, bank_i: u8, bank_y: u8) {
        self.interface_mut().set_banks(bank_i, bank_y);
    }
}

impl Default for Mos6509 {
    fn default() -> Self {
        Self::new()
    }
}
