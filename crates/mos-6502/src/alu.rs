//! ALU and flag semantics.
//!
//! ADC, SBC and the ARR combination each have two numerically distinct
//! paths selected by the D flag. The decimal paths reproduce the silicon,
//! quirks included: Z always comes from the binary sum, N and V from the
//! intermediate nibble-adjusted value rather than the final one, and
//! invalid BCD inputs give the same "wrong" answers the hardware gives.

use crate::Mos6502;
use crate::flags::{C, D, N, V, Z};
use crate::memory::MemoryAccess;

impl<M: MemoryAccess> Mos6502<M> {
    pub(crate) fn set_nz(&mut self, v: u8) {
        self.regs.p.update_nz(v);
    }

    pub(crate) fn do_adc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_adc_d(val);
        } else {
            self.do_adc_nd(val);
        }
    }

    fn do_adc_d(&mut self, val: u8) {
        let a = self.regs.a;
        let c: u8 = if self.regs.p.is_set(C) { 1 } else { 0 };
        self.regs.p.clear(N | V | Z | C);
        let mut al = (a & 15) + (val & 15) + c;
        if al > 9 {
            al += 6;
        }
        let mut ah = (a >> 4) + (val >> 4) + u8::from(al > 15);
        if a.wrapping_add(val).wrapping_add(c) == 0 {
            self.regs.p.set(Z);
        } else if ah & 8 != 0 {
            self.regs.p.set(N);
        }
        if !(a ^ val) & (a ^ (ah << 4)) & 0x80 != 0 {
            self.regs.p.set(V);
        }
        if ah > 9 {
            ah += 6;
        }
        if ah > 15 {
            self.regs.p.set(C);
        }
        self.regs.a = (ah << 4) | (al & 15);
    }

    fn do_adc_nd(&mut self, val: u8) {
        let a = self.regs.a;
        let c = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(val) + c;
        self.regs.p.clear(N | V | Z | C);
        if sum as u8 == 0 {
            self.regs.p.set(Z);
        } else if sum & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if !(a ^ val) & (a ^ sum as u8) & 0x80 != 0 {
            self.regs.p.set(V);
        }
        if sum & 0xff00 != 0 {
            self.regs.p.set(C);
        }
        self.regs.a = sum as u8;
    }

    pub(crate) fn do_sbc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_sbc_d(val);
        } else {
            self.do_sbc_nd(val);
        }
    }

    fn do_sbc_d(&mut self, val: u8) {
        let a = self.regs.a;
        let c: u8 = if self.regs.p.is_set(C) { 0 } else { 1 };
        self.regs.p.clear(N | V | Z | C);
        let diff = u16::from(a)
            .wrapping_sub(u16::from(val))
            .wrapping_sub(u16::from(c));
        let mut al = (a & 15).wrapping_sub(val & 15).wrapping_sub(c);
        if (al as i8) < 0 {
            al = al.wrapping_sub(6);
        }
        let mut ah = (a >> 4)
            .wrapping_sub(val >> 4)
            .wrapping_sub(u8::from((al as i8) < 0));
        if diff as u8 == 0 {
            self.regs.p.set(Z);
        } else if diff & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if (a ^ val) & (a ^ diff as u8) & 0x80 != 0 {
            self.regs.p.set(V);
        }
        if diff & 0xff00 == 0 {
            self.regs.p.set(C);
        }
        if (ah as i8) < 0 {
            ah = ah.wrapping_sub(6);
        }
        self.regs.a = (ah << 4) | (al & 15);
    }

    fn do_sbc_nd(&mut self, val: u8) {
        let a = self.regs.a;
        let c: u8 = if self.regs.p.is_set(C) { 0 } else { 1 };
        let diff = u16::from(a)
            .wrapping_sub(u16::from(val))
            .wrapping_sub(u16::from(c));
        self.regs.p.clear(N | V | Z | C);
        if diff as u8 == 0 {
            self.regs.p.set(Z);
        } else if diff & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if (a ^ val) & (a ^ diff as u8) & 0x80 != 0 {
            self.regs.p.set(V);
        }
        if diff & 0xff00 == 0 {
            self.regs.p.set(C);
        }
        self.regs.a = diff as u8;
    }

    /// ARR: AND, then rotate right, with flag derivation all of its own.
    pub(crate) fn do_arr(&mut self, val: u8) {
        self.regs.a &= val;
        if self.regs.p.is_set(D) {
            self.do_arr_d();
        } else {
            self.do_arr_nd();
        }
    }

    fn do_arr_nd(&mut self) {
        let c = self.regs.p.is_set(C);
        self.regs.p.clear(N | V | Z | C);
        self.regs.a >>= 1;
        if c {
            self.regs.a |= 0x80;
        }
        if self.regs.a == 0 {
            self.regs.p.set(Z);
        } else if self.regs.a & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if self.regs.a & 0x40 != 0 {
            self.regs.p.set(V | C);
        }
        if self.regs.a & 0x20 != 0 {
            self.regs.p.0 ^= V;
        }
    }

    fn do_arr_d(&mut self) {
        // The adc/ror interleave gives an extremely weird result
        let c = self.regs.p.is_set(C);
        self.regs.p.clear(N | V | Z | C);
        let pre = self.regs.a;
        let mut a = pre >> 1;
        if c {
            a |= 0x80;
        }
        if a == 0 {
            self.regs.p.set(Z);
        } else if a & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if (a ^ pre) & 0x40 != 0 {
            self.regs.p.set(V);
        }
        if pre & 0x0f >= 0x05 {
            a = (a.wrapping_add(6) & 0x0f) | (a & 0xf0);
        }
        if pre & 0xf0 >= 0x50 {
            a = a.wrapping_add(0x60);
            self.regs.p.set(C);
        }
        self.regs.a = a;
    }

    pub(crate) fn compare(&mut self, v1: u8, v2: u8) {
        self.regs.p.clear(N | Z | C);
        let r = v1.wrapping_sub(v2);
        if r == 0 {
            self.regs.p.set(Z);
        } else if r & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if v1 >= v2 {
            self.regs.p.set(C);
        }
    }

    pub(crate) fn do_bit(&mut self, val: u8) {
        self.regs.p.clear(N | V | Z);
        if self.regs.a & val == 0 {
            self.regs.p.set(Z);
        }
        if val & 0x80 != 0 {
            self.regs.p.set(N);
        }
        if val & 0x40 != 0 {
            self.regs.p.set(V);
        }
    }

    pub(crate) fn do_asl(&mut self, v: u8) -> u8 {
        self.regs.p.set_if(C, v & 0x80 != 0);
        let r = v << 1;
        self.set_nz(r);
        r
    }

    pub(crate) fn do_lsr(&mut self, v: u8) -> u8 {
        self.regs.p.set_if(C, v & 0x01 != 0);
        let r = v >> 1;
        self.set_nz(r);
        r
    }

    pub(crate) fn do_rol(&mut self, v: u8) -> u8 {
        let c: u8 = if self.regs.p.is_set(C) { 1 } else { 0 };
        self.regs.p.set_if(C, v & 0x80 != 0);
        let r = (v << 1) | c;
        self.set_nz(r);
        r
    }

    pub(crate) fn do_ror(&mut self, v: u8) -> u8 {
        let c: u8 = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, v & 0x01 != 0);
        let r = (v >> 1) | c;
        self.set_nz(r);
        r
    }
}
