//! Unit tests for 6502 instruction behavior.

use emu_core::{Bus, SimpleBus};
use mos_6502::{DirectAccess, Mos6502, flags};

/// Install the reset vector and run the 8-cycle reset sequence; leaves the
/// first opcode prefetched and the core at an instruction boundary.
fn boot(cpu: &mut Mos6502, bus: &mut SimpleBus, entry: u16) {
    bus.write(0xfffc, entry as u8);
    bus.write(0xfffd, (entry >> 8) as u8);
    let consumed = cpu.execute_run(bus, 8);
    assert_eq!(consumed, 8, "reset sequence is 8 cycles");
}

/// Load a program at $0200 and boot into it.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6502, program: &[u8]) {
    bus.load(0x0200, program);
    boot(cpu, bus, 0x0200);
}

fn at_boundary(cpu: &Mos6502) -> bool {
    cpu.save_state().inst_substate == 0
}

#[test]
fn test_stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();

    let program = [
        0xa9, 0x42, // LDA #$42
        0xa2, 0xff, // LDX #$FF
        0x9a, // TXS
        0x48, // PHA
        0xa9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    cpu.execute_run(&mut bus, 2 + 2 + 2 + 3 + 2 + 4);

    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xff, "SP should be back to $FF after PLA");
    assert_eq!(bus.peek(0x01ff), 0x42, "PHA went to the top of the stack");
}

#[test]
fn test_stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();

    let program = [
        0xa2, 0xff, // LDX #$FF
        0x9a, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    cpu.execute_run(&mut bus, 2 + 2 + 2 + 3 + 2 + 4);

    assert!(cpu.regs.p.is_set(flags::C), "PLP should restore carry flag");
    assert_eq!(cpu.regs.s, 0xff, "SP should be back to $FF");
    assert_eq!(
        bus.peek(0x01ff) & 0x30,
        0x30,
        "PHP pushes with break and unused set"
    );
}

#[test]
fn test_brk_stack_layout() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();

    // BRK vector to $0300
    bus.write(0xfffe, 0x00);
    bus.write(0xffff, 0x03);

    let program = [
        0xa2, 0xff, // LDX #$FF    @ $0200
        0x9a, // TXS         @ $0202
        0x58, // CLI         @ $0203
        0x00, // BRK         @ $0204
        0xea, // NOP padding @ $0205 (this byte is skipped)
    ];
    setup_program(&mut bus, &mut cpu, &program);

    cpu.execute_run(&mut bus, 2 + 2 + 2 + 7);

    assert_eq!(cpu.regs.npc, 0x0300, "PC should be at BRK vector target");
    assert_eq!(cpu.regs.s, 0xfc, "SP should be $FC after BRK");
    assert!(cpu.regs.p.is_set(flags::I), "I flag should be set after BRK");

    // Return address is PC after BRK's padding byte
    assert_eq!(bus.peek(0x01ff), 0x02, "pushed PCH");
    assert_eq!(bus.peek(0x01fe), 0x06, "pushed PCL");
    let pushed_p = bus.peek(0x01fd);
    assert_eq!(pushed_p & flags::B, flags::B, "software BRK pushes B set");
    assert_eq!(pushed_p & flags::I, 0, "I was clear when pushed");
}

#[test]
fn test_branch_timing() {
    // not taken: 2 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0xa9, 0x00, 0xd0, 0x10, 0xea]);
    cpu.execute_run(&mut bus, 2 + 2);
    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.npc, 0x0204, "BNE falls through when Z is set");

    // taken, same page: 3 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0xa9, 0x01, 0xd0, 0x02, 0xea, 0xea, 0xea]);
    cpu.execute_run(&mut bus, 2 + 3);
    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.npc, 0x0206, "BNE lands past the skipped bytes");

    // taken, page crossed: 4 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.load(0x02f0, &[0xa9, 0x01, 0xd0, 0x20]);
    boot(&mut cpu, &mut bus, 0x02f0);
    cpu.execute_run(&mut bus, 2 + 4);
    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.npc, 0x0314, "page-crossing branch target");
}

#[test]
fn test_inc_zeropage() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.write(0x0010, 0x7f);
    setup_program(&mut bus, &mut cpu, &[0xe6, 0x10]);

    cpu.execute_run(&mut bus, 5);

    assert!(at_boundary(&cpu));
    assert_eq!(bus.peek(0x0010), 0x80);
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::Z));
}

#[test]
fn test_jmp_indirect_page_wrap_bug() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();

    // pointer at $02FF: low byte at $02FF, high byte wraps to $0200
    bus.write(0x02ff, 0x34);
    bus.write(0x0200, 0x12);
    bus.write(0x0300, 0x99); // would be the high byte without the bug
    bus.load(0x0400, &[0x6c, 0xff, 0x02]);
    boot(&mut cpu, &mut bus, 0x0400);

    cpu.execute_run(&mut bus, 5);

    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.npc, 0x1234, "high byte comes from $0200, not $0300");
}

#[test]
fn test_adc_decimal_scenario() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();

    // SED; LDA #$50; ADC #$50 -> BCD 100: A=$00, carry out
    setup_program(&mut bus, &mut cpu, &[0xf8, 0xa9, 0x50, 0x69, 0x50]);
    cpu.execute_run(&mut bus, 2 + 2 + 2);

    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(
        !cpu.regs.p.is_set(flags::Z),
        "Z tracks the binary sum on NMOS silicon"
    );
}

#[test]
fn test_lax_loads_both_registers() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.write(0x0010, 0x5a);
    setup_program(&mut bus, &mut cpu, &[0xa7, 0x10]);

    cpu.execute_run(&mut bus, 3);

    assert_eq!(cpu.regs.a, 0x5a);
    assert_eq!(cpu.regs.x, 0x5a);
}

#[test]
fn test_slo_shifts_then_ors() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.write(0x0010, 0x81);
    setup_program(&mut bus, &mut cpu, &[0xa9, 0x01, 0x07, 0x10]);

    cpu.execute_run(&mut bus, 2 + 5);

    assert_eq!(bus.peek(0x0010), 0x02, "memory holds the shifted value");
    assert_eq!(cpu.regs.a, 0x03, "A ORs in the shifted value");
    assert!(cpu.regs.p.is_set(flags::C), "bit 7 went out to carry");
}

#[test]
fn test_dcp_decrements_then_compares() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.write(0x0010, 0x11);
    setup_program(&mut bus, &mut cpu, &[0xa9, 0x10, 0xc7, 0x10]);

    cpu.execute_run(&mut bus, 2 + 5);

    assert_eq!(bus.peek(0x0010), 0x10);
    assert!(cpu.regs.p.is_set(flags::Z), "A equals the decremented value");
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_sbx_masks_then_subtracts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0xa9, 0xff, 0xa2, 0x0f, 0xcb, 0x05]);

    cpu.execute_run(&mut bus, 2 + 2 + 2);

    assert_eq!(cpu.regs.x, 0x0a, "X = (A & X) - operand");
    assert!(cpu.regs.p.is_set(flags::C));
    assert_eq!(cpu.regs.a, 0xff, "A is not touched");
}

#[test]
fn test_anc_copies_sign_to_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0xa9, 0xf0, 0x0b, 0x80]);

    cpu.execute_run(&mut bus, 2 + 2);

    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_sax_stores_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0xa9, 0xcc, 0xa2, 0xaa, 0x87, 0x10]);

    cpu.execute_run(&mut bus, 2 + 2 + 3);

    assert_eq!(bus.peek(0x0010), 0x88);
}

#[test]
fn test_nop_variant_cycle_counts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    let program = [
        0x80, 0x00, // NOP #imm      2 cycles
        0x04, 0x10, // NOP zp        3 cycles
        0x14, 0x10, // NOP zp,X      4 cycles
        0x0c, 0x00, 0x03, // NOP abs 4 cycles
        0xea, // NOP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    cpu.execute_run(&mut bus, 2 + 3 + 4 + 4);

    assert!(at_boundary(&cpu));
    assert_eq!(cpu.regs.npc, 0x0209, "all four NOP variants retired");
}

#[test]
fn test_cpu_trait_drives_the_core_generically() {
    use emu_core::Cpu;

    fn step<C: Cpu>(cpu: &mut C, bus: &mut SimpleBus, cycles: u32) -> u32 {
        cpu.run(bus, cycles)
    }

    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    bus.load(0x0200, &[0xa9, 0x07]);
    bus.write(0xfffc, 0x00);
    bus.write(0xfffd, 0x02);

    assert_eq!(step(&mut cpu, &mut bus, 8 + 2), 10);
    assert_eq!(cpu.pc(), 0x0202);
    assert_eq!(cpu.registers().a, 0x07);
    assert!(!cpu.is_halted());

    Cpu::reset(&mut cpu);
    assert_eq!(step(&mut cpu, &mut bus, 8), 8);
    assert_eq!(cpu.pc(), 0x0200);
}

#[test]
fn test_kil_locks_until_reset() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::<DirectAccess>::new();
    setup_program(&mut bus, &mut cpu, &[0x02]);

    cpu.execute_run(&mut bus, 20);
    assert!(cpu.is_jammed(), "KIL wedges the core");

    let before = cpu.regs.npc;
    cpu.execute_run(&mut bus, 20);
    assert!(cpu.is_jammed());
    assert_eq!(cpu.regs.npc, before, "no progress while jammed");

    // only reset revives it
    cpu.reset();
    assert!(!cpu.is_jammed());
    boot(&mut cpu, &mut bus, 0x0200);
    assert_eq!(cpu.regs.npc, 0x0200);
}
