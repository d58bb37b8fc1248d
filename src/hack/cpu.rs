use log::trace;
use thiserror::Error;

use super::Program;

pub const RAM_SIZE: usize = 32768;
const SP: usize = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("pc {pc}: address {address} is outside RAM")]
    AddressOutOfRange { pc: usize, address: u16 },
}

/// Hack CPU with its ROM and data memory. Registers and memory cells hold
/// 16-bit two's-complement words.
pub struct Cpu {
    rom: Vec<u16>,
    ram: Vec<i16>,
    a: i16,
    d: i16,
    pc: usize,
}

impl Cpu {
    pub fn new(program: Program) -> Self {
        Self {
            rom: program.rom,
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn ram(&self) -> &[i16] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [i16] {
        &mut self.ram
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.rom.len()
    }

    /// Value below the stack pointer, if the stack is not empty.
    pub fn stack_top(&self) -> Option<i16> {
        let sp = self.ram[SP] as u16 as usize;
        if sp == 0 || sp > RAM_SIZE {
            None
        } else {
            Some(self.ram[sp - 1])
        }
    }

    fn address(&self) -> Result<usize, CpuError> {
        let address = self.a as u16;
        if usize::from(address) < RAM_SIZE {
            Ok(usize::from(address))
        } else {
            Err(CpuError::AddressOutOfRange {
                pc: self.pc,
                address,
            })
        }
    }

    /// The six control bits `zx nx zy ny f no`, applied to `x = D` and `y`.
    fn alu(x: i16, y: i16, control: u16) -> i16 {
        let bit = |n: u16| control & (1 << (5 - n)) != 0;
        let x = if bit(0) { 0 } else { x };
        let x = if bit(1) { !x } else { x };
        let y = if bit(2) { 0 } else { y };
        let y = if bit(3) { !y } else { y };
        let out = if bit(4) { x.wrapping_add(y) } else { x & y };
        if bit(5) {
            !out
        } else {
            out
        }
    }

    /// Executes one instruction. Returns `false` once the program counter has
    /// left ROM.
    pub fn step(&mut self) -> Result<bool, CpuError> {
        let Some(&instruction) = self.rom.get(self.pc) else {
            return Ok(false);
        };
        if instruction & 0x8000 == 0 {
            self.a = instruction as i16;
            self.pc += 1;
            return Ok(true);
        }

        let uses_memory = instruction & 0x1000 != 0;
        let control = (instruction >> 6) & 0b111111;
        let dest = (instruction >> 3) & 0b111;
        let jump = instruction & 0b111;

        let y = if uses_memory {
            self.ram[self.address()?]
        } else {
            self.a
        };
        let out = Self::alu(self.d, y, control);

        let target = self.a as u16 as usize;
        if dest & 0b001 != 0 {
            let address = self.address()?;
            self.ram[address] = out;
        }
        if dest & 0b100 != 0 {
            self.a = out;
        }
        if dest & 0b010 != 0 {
            self.d = out;
        }

        let taken = (jump & 0b100 != 0 && out < 0)
            || (jump & 0b010 != 0 && out == 0)
            || (jump & 0b001 != 0 && out > 0);
        self.pc = if taken { target } else { self.pc + 1 };
        Ok(true)
    }

    /// Runs until the program counter leaves ROM or `max_cycles` instructions
    /// have executed. Returns the number of executed instructions.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let mut cycles = 0;
        while cycles < max_cycles && self.step()? {
            cycles += 1;
        }
        trace!("stopped after {} cycles at pc {}", cycles, self.pc);
        Ok(cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hack::assemble;

    fn run(source: &str) -> Cpu {
        let mut cpu = Cpu::new(assemble(source).unwrap());
        cpu.run(10_000).unwrap();
        cpu
    }

    #[test]
    fn adds_two_constants() {
        let cpu = run("@2\nD=A\n@3\nD=D+A\n@0\nM=D");
        assert_eq!(cpu.ram()[0], 5);
        assert!(cpu.is_halted());
    }

    #[test]
    fn arithmetic_wraps() {
        let cpu = run("@32767\nD=A\nD=D+1\n@R1\nM=D\nM=!M\n@R2\nM=-1");
        assert_eq!(cpu.ram()[1], !i16::MIN);
        assert_eq!(cpu.ram()[2], -1);
    }

    #[test]
    fn jumps_use_previous_a() {
        // counts R0 down from 3 to 0
        let cpu = run("@3\nD=A\n@R0\nM=D\n(LOOP)\n@R0\nMD=M-1\n@LOOP\nD;JGT\n@R1\nM=1");
        assert_eq!(cpu.ram()[0], 0);
        assert_eq!(cpu.ram()[1], 1);
    }

    #[test]
    fn stops_at_cycle_budget() {
        let mut cpu = Cpu::new(assemble("(END)\n@END\n0;JMP").unwrap());
        assert_eq!(cpu.run(50), Ok(50));
        assert!(!cpu.is_halted());
    }

    #[test]
    fn stack_top_reads_below_sp() {
        let mut cpu = Cpu::new(Program::default());
        assert_eq!(cpu.stack_top(), None);
        cpu.ram_mut()[0] = 258;
        cpu.ram_mut()[257] = -4;
        assert_eq!(cpu.stack_top(), Some(-4));
    }
}
