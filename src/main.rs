use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use rv64emu::hart::ExitReason;
use rv64emu::machine::Machine;

/// Emulate a statically-linked 64-bit RISC-V program
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the guest ELF executable
    input: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut machine = match Machine::load_program(Path::new(&args.input)) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("error loading {}: {e}", args.input);
            return ExitCode::FAILURE;
        }
    };

    loop {
        match machine.step() {
            // Branch exits just mean the block ended; the hart is
            // already positioned on the next one
            Ok(ExitReason::DirectBranch | ExitReason::IndirectBranch) => (),
            Ok(ExitReason::Ecall) => return ExitCode::SUCCESS,
            Ok(ExitReason::Ebreak) => {
                eprintln!(
                    "guest stopped at a breakpoint (pc = 0x{:x})",
                    machine.hart.reenter_pc
                );
                return ExitCode::FAILURE;
            }
            Ok(ExitReason::None) => unreachable!("block ended without a reason"),
            Err(trap) => {
                eprintln!("fatal at pc = 0x{:x}: {trap}", machine.hart.pc);
                return ExitCode::FAILURE;
            }
        }
    }
}
