#![allow(dead_code)]
use picospec::clock::MonotonicClock;
use picospec::cpu::{Cpu, Io, Memory, Z80Registers};

/// One "instruction" of the scripted CPU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Nop(u32),
    Out(u16, u8),
    In(u16),
    Write(u16, u8),
    Read(u16),
}

/// A CPU replaying a script of bus accesses, then executing no-ops.
#[derive(Clone, Debug, Default)]
pub struct ScriptCpu {
    pub regs: Z80Registers,
    pub script: Vec<Op>,
    pub pos: usize,
    pub data: Vec<u8>,
    pub interrupts: u32,
    pub resets: u32,
    /// T-states of the no-op executed after the script ends, 4 if `None`.
    pub idle: Option<u32>,
}

impl ScriptCpu {
    pub fn with_script(script: Vec<Op>) -> Self {
        ScriptCpu { script, ..ScriptCpu::default() }
    }

    pub fn with_idle(mut self, tstates: u32) -> Self {
        self.idle = Some(tstates);
        self
    }
}

impl Cpu for ScriptCpu {
    fn reset(&mut self) {
        self.regs = Z80Registers::default();
        self.pos = 0;
        self.resets += 1;
    }

    fn step<B: Memory + Io>(&mut self, bus: &mut B) -> u32 {
        let op = self.script.get(self.pos).copied().unwrap_or(Op::Nop(self.idle.unwrap_or(4)));
        self.pos += 1;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        match op {
            Op::Nop(ts) => return ts,
            Op::Out(port, data) => bus.write_io(port, data),
            Op::In(port) => self.data.push(bus.read_io(port)),
            Op::Write(addr, data) => bus.write_mem(addr, data),
            Op::Read(addr) => self.data.push(bus.read_mem(addr)),
        }
        match op {
            Op::Out(..)|Op::In(..) => 11,
            _ => 7
        }
    }

    fn interrupt(&mut self) {
        self.interrupts += 1;
    }

    fn registers(&self) -> Z80Registers {
        self.regs
    }

    fn set_registers(&mut self, regs: &Z80Registers) {
        self.regs = *regs;
    }
}

/// A clock that only moves when waited on or advanced explicitly.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimClock {
    pub now: u64,
    pub waits: u32,
}

impl SimClock {
    pub fn advance(&mut self, nanos: u64) {
        self.now += nanos;
    }
}

impl MonotonicClock for SimClock {
    fn now_nanos(&self) -> u64 {
        self.now
    }

    fn wait_until(&mut self, deadline: u64) {
        self.waits += 1;
        if deadline > self.now {
            self.now = deadline;
        }
    }
}
