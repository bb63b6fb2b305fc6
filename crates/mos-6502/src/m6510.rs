//! 6510: a 6502 with a bidirectional I/O port on the die.
//!
//! The port is multiplexed onto addresses 0 (data direction) and 1 (data).
//! Reading an input-configured pin sees the externally driven level, a
//! pull-up, or — for pins left floating — the level the pin last drove,
//! held for a while by pin capacitance. Writes update the port and still
//! write through to the RAM underneath (only reads are overridden).

use emu_core::Bus;

use crate::Mos6502;
use crate::memory::MemoryAccess;

/// Strategy exposing the on-die port at addresses 0/1.
#[derive(Debug, Clone, Copy)]
pub struct PortAccess {
    dir: u8,
    port: u8,
    /// External level on input-configured pins.
    input: u8,
    /// Pins with pull-up resistors; read as 1 when inputs with no
    /// external drive.
    pullup: u8,
    /// Pins wired to nothing; they retain the last driven level when
    /// switched to input.
    floating: u8,
    /// Last level each pin actively drove.
    drive: u8,
}

impl PortAccess {
    /// Create the strategy with all pins configured as inputs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dir: 0,
            port: 0,
            input: 0,
            pullup: 0,
            floating: 0,
            drive: 0,
        }
    }

    /// Data direction register (address 0); 1 bits are outputs.
    #[must_use]
    pub const fn dir(&self) -> u8 {
        self.dir
    }

    /// Port output latch (address 1).
    #[must_use]
    pub const fn data(&self) -> u8 {
        self.port
    }

    /// What a read of address 1 returns right now.
    #[must_use]
    pub fn port_value(&self) -> u8 {
        let inputs = (self.drive & self.floating) | ((self.input | self.pullup) & !self.floating);
        (self.port & self.dir) | (inputs & !self.dir)
    }

    /// Externally driven level on input pins.
    pub fn set_input(&mut self, level: u8) {
        self.input = level;
    }

    /// Which pins have pull-up resistors.
    pub fn set_pullup(&mut self, pins: u8) {
        self.pullup = pins;
    }

    /// Which pins are left unconnected.
    pub fn set_floating(&mut self, pins: u8) {
        self.floating = pins;
    }

    /// Force the port registers (save-state import).
    pub fn set_port_state(&mut self, dir: u8, data: u8) {
        self.dir = dir;
        self.port = data;
        self.update_drive();
    }

    fn update_drive(&mut self) {
        self.drive = (self.port & self.dir) | (self.drive & !self.dir);
    }
}

impl Default for PortAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccess for PortAccess {
    fn read<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        // the port is internal: the cycle consumes time but the external
        // bus sees no access
        match adr {
            0x0000 => self.dir,
            0x0001 => self.port_value(),
            _ => bus.read(u32::from(adr)),
        }
    }

    fn read_sync<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read_opcode(u32::from(adr))
    }

    fn read_arg<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        bus.read(u32::from(adr))
    }

    fn write<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        bus.write(u32::from(adr), val);
        match adr {
            0x0000 => {
                self.dir = val;
                self.update_drive();
            }
            0x0001 => {
                self.port = val;
                self.update_drive();
            }
            _ => {}
        }
    }

    fn floating_bus(&self) -> u8 {
        0xee | (self.drive & self.floating)
    }

    fn reset(&mut self) {
        self.dir = 0;
        self.port = 0;
        self.drive = 0;
    }
}

/// The MOS 6510 (and its 8500/8502 siblings): a 6502 with the on-die port.
pub type Mos6510 = Mos6502<PortAccess>;

impl Mos6510 {
    /// Create a 6510 core.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interface(PortAccess::new())
    }

    /// Data direction register.
    #[must_use]
    pub fn port_dir(&self) -> u8 {
        self.interface().dir()
    }

    /// Port output latch.
    #[must_use]
    pub fn port_data(&self) -> u8 {
        self.interface().data()
    }
}

impl Default for Mos6510 {
    fn default() -> Self {
        Self::new()
    }
}
