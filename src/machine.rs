//! Machine glue
//!
//! Owns the hart state and the address space, and drives the block
//! interpreter one block at a time.

use std::path::Path;

use crate::hart::{ExitReason, Hart};
use crate::interp::{exec_block, Trap};
use crate::mmu::{ElfError, Mmu};

#[derive(Debug, Default)]
pub struct Machine {
    pub hart: Hart,
    pub mmu: Mmu,
}

impl Machine {
    /// Load a guest program and point the hart at its entry
    pub fn load_program(path: &Path) -> Result<Self, ElfError> {
        let mut mmu = Mmu::default();
        mmu.load_elf(path)?;

        let mut hart = Hart::default();
        hart.pc = mmu.entry;

        Ok(Self { hart, mmu })
    }

    /// Run one straight-line block and report why it ended
    ///
    /// Every block exit publishes a reentry point, so the hart is
    /// always repositioned on it: a branch exit leaves the machine
    /// ready for the next step() call, and an ecall or ebreak leaves
    /// pc on the instruction after the trap, where a driver that
    /// services the event would resume.
    pub fn step(&mut self) -> Result<ExitReason, Trap> {
        self.hart.exit_reason = ExitReason::None;
        exec_block(&mut self.hart, &mut self.mmu)?;

        self.hart.pc = self.hart.reenter_pc;

        Ok(self.hart.exit_reason)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::mmu::Wordsize;

    const ENTRY: u64 = 0x1_0000;

    fn machine_with_program(words: &[u32]) -> Machine {
        let mut machine = Machine::default();
        for (n, word) in words.iter().enumerate() {
            machine.mmu.write(
                ENTRY + 4 * n as u64,
                u64::from(*word),
                Wordsize::Word,
            );
        }
        machine.hart.pc = ENTRY;
        machine
    }

    #[test]
    fn check_step_direct_branch_repositions() {
        // beq x0, x0, 8 is always taken
        let mut machine = machine_with_program(&[0x0000_0463]);
        let reason = machine.step().unwrap();
        assert_eq!(reason, ExitReason::DirectBranch);
        assert_eq!(machine.hart.pc, ENTRY + 8);
    }

    #[test]
    fn check_step_indirect_branch_repositions() {
        // jalr x0, x1, 0
        let mut machine = machine_with_program(&[0x0000_8067]);
        machine.hart.set_x(1, 0x2_0000);
        let reason = machine.step().unwrap();
        assert_eq!(reason, ExitReason::IndirectBranch);
        assert_eq!(machine.hart.pc, 0x2_0000);
        assert_eq!(machine.hart.pc, machine.hart.reenter_pc);
    }

    #[test]
    fn check_step_over_branch_to_ecall() {
        // beq x0, x0, 8; (skipped); ecall
        let mut machine =
            machine_with_program(&[0x0000_0463, 0x0000_0013, 0x0000_0073]);
        assert_eq!(machine.step().unwrap(), ExitReason::DirectBranch);
        assert_eq!(machine.step().unwrap(), ExitReason::Ecall);
        // pc rests after the ecall, where a syscall driver resumes
        assert_eq!(machine.hart.pc, ENTRY + 12);
    }

    #[test]
    fn check_step_decode_failure_is_fatal() {
        let mut machine = machine_with_program(&[0xffff_ffff]);
        assert!(machine.step().is_err());
    }
}
