use crate::bus::Bus;
use crate::cpu6507::Cpu6507;
use crate::opcode::{Instruction, Opcode, OPCODES};
use log::error;
use std::fs::File;
use std::io::{self, Write};

/// File that the trace is written to, in the working directory.
const DISAS_FILENAME: &str = "dis.asm";

/// Register snapshot taken before an instruction executes, so each record
/// can show the state delta.
pub(crate) struct CpuState {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    p: u8,
    pc: u16,
}

impl CpuState {
    pub fn record(cpu: &Cpu6507) -> Self {
        Self {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            sp: cpu.stack_pointer(),
            p: cpu.status(),
            pc: cpu.pc,
        }
    }
}

// N V B D I Z C, the order the columns print in
fn flag_bits(p: u8) -> [u8; 7] {
    [
        (p >> 7) & 1,
        (p >> 6) & 1,
        (p >> 4) & 1,
        (p >> 3) & 1,
        (p >> 2) & 1,
        (p >> 1) & 1,
        p & 1,
    ]
}

/// Writes one line-oriented record per executed instruction: mnemonic,
/// opcode, size, base cycles, operand, then old and new register state.
/// The format is informational and nothing parses it.
pub(crate) struct Disassembler {
    out: File,
}

impl Disassembler {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            out: File::create(DISAS_FILENAME)?,
        })
    }

    pub fn record(&mut self, cpu: &mut Cpu6507, old: &CpuState) {
        let opcode = cpu.read(old.pc);
        let Opcode(inst, mode, cycles, _) = OPCODES[opcode as usize];
        let size = mode.n_bytes();

        let mut operand: u16 = 0;
        for i in 0..size.saturating_sub(1) {
            operand |= (cpu.read(old.pc.wrapping_add(1 + i)) as u16) << (8 * i);
        }

        let name = match inst {
            Instruction::None => "vac".to_string(),
            _ => format!("{:?}", inst).to_lowercase(),
        };

        if let Err(e) = self.write_record(cpu, old, &name, opcode, size, cycles, operand) {
            error!("disassembler: {}", e);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_record(
        &mut self,
        cpu: &Cpu6507,
        old: &CpuState,
        name: &str,
        opcode: u8,
        size: u16,
        cycles: u64,
        operand: u16,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "{} (0x{:02x},{},{})\t0x{:04x}",
            name, opcode, size, cycles, operand
        )?;
        writeln!(self.out, "\tOLD STATE\t\t\tNEW STATE")?;
        writeln!(
            self.out,
            "\tA: 0x{:02x},{}\t\t\t0x{:02x},{}",
            old.a, old.a, cpu.a, cpu.a
        )?;
        writeln!(
            self.out,
            "\tX: 0x{:02x},{}\t\t\t0x{:02x},{}",
            old.x, old.x, cpu.x, cpu.x
        )?;
        writeln!(
            self.out,
            "\tY: 0x{:02x},{}\t\t\t0x{:02x},{}",
            old.y, old.y, cpu.y, cpu.y
        )?;
        writeln!(
            self.out,
            "\tS: 0x{:04x}\t\t\t0x{:04x}",
            old.sp,
            cpu.stack_pointer()
        )?;
        writeln!(self.out, "\tN V B D I Z C\t\t\tN V B D I Z C")?;
        let old_flags = flag_bits(old.p);
        let new_flags = flag_bits(cpu.status());
        writeln!(
            self.out,
            "\t{} {} {} {} {} {} {}\t\t\t{} {} {} {} {} {} {}",
            old_flags[0],
            old_flags[1],
            old_flags[2],
            old_flags[3],
            old_flags[4],
            old_flags[5],
            old_flags[6],
            new_flags[0],
            new_flags[1],
            new_flags[2],
            new_flags[3],
            new_flags[4],
            new_flags[5],
            new_flags[6],
        )?;
        writeln!(self.out, "\tPC: 0x{:04x}\t\t\t0x{:04x}", old.pc, cpu.pc)?;
        Ok(())
    }
}
