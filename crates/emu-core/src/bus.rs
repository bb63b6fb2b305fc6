//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device.
///
/// Addresses are `u32` so one trait serves every core width: a 13-bit 6504,
/// a 16-bit 6502, or a 20-bit banked 6509. Cores present fully translated
/// physical addresses; the bus never sees more bits than the core drives.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u32) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u32, value: u8);

    /// Read a byte from the opcode-decode address space.
    ///
    /// Machines with a distinct decrypted-opcode space (encrypted program
    /// ROMs) override this; everyone else gets the ordinary data space.
    /// Only opcode fetches are routed here — operand fetches always use
    /// [`Bus::read`].
    fn read_opcode(&mut self, address: u32) -> u8 {
        self.read(address)
    }
}

/// Flat RAM bus for tests and simple machines.
///
/// Backs the full address range with RAM and nothing else. `new()` gives
/// the common 64 KiB space; `with_address_bits` covers wider cores (the
/// banked 6509 drives 20 address lines).
pub struct SimpleBus {
    ram: Vec<u8>,
    mask: u32,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    /// Create a 64 KiB bus with all RAM zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_address_bits(16)
    }

    /// Create a bus spanning `2^bits` bytes. Addresses wrap at that size.
    #[must_use]
    pub fn with_address_bits(bits: u32) -> Self {
        let size = 1usize << bits;
        Self {
            ram: vec![0; size],
            mask: (size - 1) as u32,
        }
    }

    /// Copy `data` into RAM starting at `address`.
    pub fn load(&mut self, address: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            let addr = (address + i as u32) & self.mask;
            self.ram[addr as usize] = byte;
        }
    }

    /// Read a byte without going through the bus (no side effects).
    #[must_use]
    pub fn peek(&self, address: u32) -> u8 {
        self.ram[(address & self.mask) as usize]
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u32) -> u8 {
        self.ram[(address & self.mask) as usize]
    }

    fn write(&mut self, address: u32, value: u8) {
        self.ram[(address & self.mask) as usize] = value;
    }
}
