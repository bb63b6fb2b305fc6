//! 6502 family execution engine.
//!
//! Execution is budget-driven: an external scheduler grants bus cycles via
//! [`Mos6502::execute_run`] and the core consumes exactly that many, even
//! if it has to stop mid-instruction, resuming where it left off on the
//! next call. Each instruction is a short micro-step state machine (see
//! `ops`); its final cycle prefetches the next opcode, which is also where
//! the interrupt lines are sampled.

use emu_core::{Bus, Cpu, Observable, Value};

use crate::flags::{C, D, I, N, V, Z};
use crate::memory::{DirectAccess, FlatAccess, MemoryAccess};
use crate::{Registers, Status};

/// Dispatch state for the reset microprogram. Construction and an external
/// reset request both enter here.
pub(crate) const STATE_RESET: u16 = 0xff00;

/// External input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// Maskable interrupt request. Level-sensitive.
    Irq,
    /// Second maskable interrupt request, wired-OR with the first.
    AuxIrq,
    /// Non-maskable interrupt. Edge-latched; stays pending until serviced
    /// regardless of later deassertion.
    Nmi,
    /// The SO pin: a rising edge sets the overflow flag, whatever the CPU
    /// is doing.
    SetOverflow,
}

/// Complete serializable processor state.
///
/// Every field is public so external save-state machinery can persist each
/// one individually; restoring resumes bit-identically, even when the save
/// landed in the middle of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub npc: u16,
    pub ppc: u16,
    pub p: u8,
    pub ir: u8,
    pub tmp: u16,
    pub tmp2: u8,
    pub inst_state: u16,
    pub inst_substate: u8,
    pub inst_state_base: u16,
    pub nmi_state: bool,
    pub irq_state: bool,
    pub aux_irq_state: bool,
    pub v_state: bool,
    pub irq_taken: bool,
    pub inhibit_interrupts: bool,
    pub sync: bool,
    pub cycles: u64,
}

/// The MOS 6502 CPU core.
///
/// Generic over the [`MemoryAccess`] strategy fixed at construction, so
/// every variant shares one copy of the instruction semantics and differs
/// only in how bus addresses are formed (plus, for the banked 6509, two
/// entries in an alternate opcode map).
pub struct Mos6502<M: MemoryAccess = DirectAccess> {
    /// CPU registers.
    pub regs: Registers,
    pub(crate) mintf: M,

    /// Temporary address register for addressing modes.
    pub(crate) tmp: u16,
    /// Temporary data/pointer register.
    pub(crate) tmp2: u8,

    /// Dispatch index of the instruction in flight (opcode | bank base),
    /// or [`STATE_RESET`].
    pub(crate) inst_state: u16,
    /// Bus cycles already executed within the current instruction;
    /// 0 means "at an instruction boundary".
    pub(crate) inst_substate: u8,
    /// Opcode-map offset, fixed at construction (0x100 on the 6509).
    pub(crate) inst_state_base: u16,

    /// Remaining cycle budget of the current `execute_run` call.
    icount: i32,

    pub(crate) nmi_state: bool,
    pub(crate) irq_state: bool,
    pub(crate) aux_irq_state: bool,
    pub(crate) v_state: bool,
    /// Set when prefetch substituted the interrupt entry for a fetched
    /// opcode; consumed by the BRK microprogram.
    pub(crate) irq_taken: bool,
    pub(crate) inhibit_interrupts: bool,
    pub(crate) sync: bool,

    cycles: u64,
    sync_handler: Option<Box<dyn FnMut(bool)>>,
    trace_hook: Option<Box<dyn FnMut(u16)>>,
}

impl Mos6502 {
    /// Create a core with the default memory-access strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interface(DirectAccess::new())
    }
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502<FlatAccess> {
    /// Create a core whose opcode fetches go through the ordinary data
    /// space instead of the machine's decode space.
    #[must_use]
    pub fn new_flat() -> Self {
        Self::with_interface(FlatAccess::new())
    }
}

impl<M: MemoryAccess> Mos6502<M> {
    /// Create a core around a specific memory-access strategy.
    pub fn with_interface(mintf: M) -> Self {
        Self {
            regs: Registers::new(),
            mintf,
            tmp: 0,
            tmp2: 0,
            inst_state: STATE_RESET,
            inst_substate: 0,
            inst_state_base: 0,
            icount: 0,
            nmi_state: false,
            irq_state: false,
            aux_irq_state: false,
            v_state: false,
            irq_taken: false,
            inhibit_interrupts: false,
            sync: false,
            cycles: 0,
            sync_handler: None,
            trace_hook: None,
        }
    }

    /// The memory-access strategy (bank registers, port state live here).
    pub fn interface(&self) -> &M {
        &self.mintf
    }

    /// Mutable access to the memory-access strategy.
    pub fn interface_mut(&mut self) -> &mut M {
        &mut self.mintf
    }

    /// Wire the sync output. Called with `true` at the start of each
    /// opcode-fetch cycle and `false` when the fetch completes, so external
    /// bus-arbitration logic can observe it.
    pub fn set_sync_handler(&mut self, handler: impl FnMut(bool) + 'static) {
        self.sync_handler = Some(Box::new(handler));
    }

    /// Hook invoked with NPC at every instruction boundary, before
    /// dispatch. Fires once per instruction, not once per resumed slice.
    pub fn set_trace_hook(&mut self, hook: impl FnMut(u16) + 'static) {
        self.trace_hook = Some(Box::new(hook));
    }

    /// Current state of the sync output line.
    #[must_use]
    pub const fn get_sync(&self) -> bool {
        self.sync
    }

    /// True once a KIL opcode has locked the processor. Only a reset
    /// revives it.
    #[must_use]
    pub fn is_jammed(&self) -> bool {
        self.inst_state != STATE_RESET
            && self.inst_substate == 5
            && matches!(
                self.inst_state & 0xff,
                0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xb2 | 0xd2 | 0xf2
            )
    }

    /// Total bus cycles executed since construction.
    #[must_use]
    pub const fn total_cycles(&self) -> u64 {
        self.cycles
    }

    // ------------------------------------------------------------------
    // External inputs
    // ------------------------------------------------------------------

    /// Drive an external input line.
    ///
    /// The IRQ lines are level-sensitive: an interrupt is pending exactly
    /// while one is asserted and I is clear. NMI latches on assertion and
    /// stays pending until serviced. A rising edge on SO sets V
    /// immediately, independent of instruction context.
    pub fn execute_set_input(&mut self, line: InputLine, asserted: bool) {
        match line {
            InputLine::Irq => self.irq_state = asserted,
            InputLine::AuxIrq => self.aux_irq_state = asserted,
            InputLine::Nmi => self.nmi_state = self.nmi_state || asserted,
            InputLine::SetOverflow => {
                if !self.v_state && asserted {
                    self.regs.p.set(V);
                }
                self.v_state = asserted;
            }
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Run for at most `budget` bus cycles; returns the cycles consumed.
    ///
    /// A partial instruction left over from the previous call is resumed
    /// before any new fetch. At each instruction boundary PPC latches NPC,
    /// the dispatch index is derived from the prefetched opcode OR'd with
    /// the opcode-bank base, and the trace hook fires.
    pub fn execute_run<B: Bus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        self.icount = budget as i32;
        if self.inst_substate != 0 {
            self.exec_full(bus);
        }
        while self.icount > 0 {
            if self.inst_state != STATE_RESET {
                self.regs.ppc = self.regs.npc;
                self.inst_state = u16::from(self.regs.ir) | self.inst_state_base;
                let npc = self.regs.npc;
                if let Some(hook) = self.trace_hook.as_mut() {
                    hook(npc);
                }
            }
            self.exec_full(bus);
        }
        budget - self.icount as u32
    }

    /// Execute the remaining cycles of the current instruction, stopping
    /// early if the budget runs out.
    fn exec_full<B: Bus>(&mut self, bus: &mut B) {
        while self.icount > 0 {
            self.exec_partial(bus);
            if self.inst_substate == 0 {
                break;
            }
        }
    }

    /// Execute exactly one bus cycle and advance the micro-state.
    fn exec_partial<B: Bus>(&mut self, bus: &mut B) {
        self.exec_step(bus);
        self.icount -= 1;
        self.cycles += 1;
    }

    // ------------------------------------------------------------------
    // Prefetch
    // ------------------------------------------------------------------

    /// Fetch the next opcode into IR, asserting the sync line for exactly
    /// this cycle, then sample the interrupt lines. A pending interrupt
    /// discards the fetched opcode, substitutes the interrupt entry opcode
    /// and leaves PC on the pre-empted instruction so resumption returns
    /// to it.
    pub(crate) fn prefetch<B: Bus>(&mut self, bus: &mut B) {
        self.prefetch_start(bus);
        if (self.nmi_state || ((self.irq_state || self.aux_irq_state) && !self.regs.p.is_set(I)))
            && !self.inhibit_interrupts
        {
            self.irq_taken = true;
            self.regs.ir = 0x00;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        self.inst_substate = 0;
    }

    /// Opcode fetch without interrupt sampling (reset tail, CLI shadow).
    pub(crate) fn prefetch_noirq<B: Bus>(&mut self, bus: &mut B) {
        self.prefetch_start(bus);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.inst_substate = 0;
    }

    fn prefetch_start<B: Bus>(&mut self, bus: &mut B) {
        self.sync = true;
        if let Some(cb) = self.sync_handler.as_mut() {
            cb(true);
        }
        self.regs.npc = self.regs.pc;
        self.regs.ir = self.mintf.read_sync(bus, self.regs.pc);
        self.sync = false;
        if let Some(cb) = self.sync_handler.as_mut() {
            cb(false);
        }
    }

    // ------------------------------------------------------------------
    // Bus access, routed through the strategy
    // ------------------------------------------------------------------

    /// Data read through the memory-access strategy. Public so variant
    /// handlers and collaborating devices can reach shadow ranges the same
    /// way the core does.
    pub fn read<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        self.mintf.read(bus, adr)
    }

    /// Data write through the memory-access strategy.
    pub fn write<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        self.mintf.write(bus, adr, val);
    }

    pub(crate) fn read_9<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        self.mintf.read_9(bus, adr)
    }

    pub(crate) fn write_9<B: Bus>(&mut self, bus: &mut B, adr: u16, val: u8) {
        self.mintf.write_9(bus, adr, val);
    }

    pub(crate) fn read_arg<B: Bus>(&mut self, bus: &mut B, adr: u16) -> u8 {
        self.mintf.read_arg(bus, adr)
    }

    pub(crate) fn read_pc<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let v = self.mintf.read_arg(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    pub(crate) fn read_pc_noinc<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.mintf.read_arg(bus, self.regs.pc)
    }

    // ------------------------------------------------------------------
    // Reset and state import/export
    // ------------------------------------------------------------------

    /// Request a reset: any in-flight instruction is discarded and the
    /// reset sequence runs on the next `execute_run`. Calling this twice
    /// is the same as calling it once.
    pub fn reset(&mut self) {
        self.inst_state = STATE_RESET;
        self.inst_substate = 0;
        self.nmi_state = false;
        self.irq_state = false;
        self.aux_irq_state = false;
        self.v_state = false;
        self.irq_taken = false;
        self.inhibit_interrupts = false;
        self.sync = false;
        if let Some(cb) = self.sync_handler.as_mut() {
            cb(false);
        }
        self.mintf.reset();
    }

    /// Debugger import path for PC. Forcing a new PC also clears any
    /// pending interrupt acknowledgement and re-issues a fresh opcode
    /// fetch so the visible state stays consistent.
    pub fn set_pc<B: Bus>(&mut self, bus: &mut B, pc: u16) {
        self.regs.pc = pc;
        self.irq_taken = false;
        self.prefetch(bus);
        self.regs.ppc = self.regs.npc;
        self.inst_state = u16::from(self.regs.ir) | self.inst_state_base;
    }

    /// Debugger import path for P; the two always-set bits are forced.
    pub fn set_p(&mut self, p: u8) {
        self.regs.p = Status::from_byte(p);
    }

    /// Export the complete processor state, including the resumable
    /// micro-state and pending-interrupt latches.
    #[must_use]
    pub fn save_state(&self) -> CpuState {
        CpuState {
            a: self.regs.a,
            x: self.regs.x,
            y: self.regs.y,
            s: self.regs.s,
            pc: self.regs.pc,
            npc: self.regs.npc,
            ppc: self.regs.ppc,
            p: self.regs.p.0,
            ir: self.regs.ir,
            tmp: self.tmp,
            tmp2: self.tmp2,
            inst_state: self.inst_state,
            inst_substate: self.inst_substate,
            inst_state_base: self.inst_state_base,
            nmi_state: self.nmi_state,
            irq_state: self.irq_state,
            aux_irq_state: self.aux_irq_state,
            v_state: self.v_state,
            irq_taken: self.irq_taken,
            inhibit_interrupts: self.inhibit_interrupts,
            sync: self.sync,
            cycles: self.cycles,
        }
    }

    /// Restore a previously exported state. Execution resumes exactly
    /// where the export happened, mid-instruction included.
    pub fn restore_state(&mut self, st: &CpuState) {
        self.regs.a = st.a;
        self.regs.x = st.x;
        self.regs.y = st.y;
        self.regs.s = st.s;
        self.regs.pc = st.pc;
        self.regs.npc = st.npc;
        self.regs.ppc = st.ppc;
        self.regs.p = Status(st.p);
        self.regs.ir = st.ir;
        self.tmp = st.tmp;
        self.tmp2 = st.tmp2;
        self.inst_state = st.inst_state;
        self.inst_substate = st.inst_substate;
        self.inst_state_base = st.inst_state_base;
        self.nmi_state = st.nmi_state;
        self.irq_state = st.irq_state;
        self.aux_irq_state = st.aux_irq_state;
        self.v_state = st.v_state;
        self.irq_taken = st.irq_taken;
        self.inhibit_interrupts = st.inhibit_interrupts;
        self.sync = st.sync;
        self.cycles = st.cycles;
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl<M: MemoryAccess> Cpu for Mos6502<M> {
    type Registers = Registers;

    fn run<B: Bus>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        self.execute_run(bus, cycles)
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.npc)
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.is_jammed()
    }

    fn reset(&mut self) {
        Self::reset(self);
    }
}

impl<M: MemoryAccess> Observable for Mos6502<M> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.npc.into()),
            "ppc" => Some(self.regs.ppc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "ir" => Some(self.regs.ir.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "sync" => Some(self.sync.into()),
            "cycle" => Some(Value::U64(self.cycles)),
            "halted" => Some(self.is_jammed().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "ppc", "a", "x", "y", "s", "p", "ir", "flags.c", "flags.z", "flags.i",
            "flags.d", "flags.v", "flags.n", "sync", "cycle", "halted",
        ]
    }
}
