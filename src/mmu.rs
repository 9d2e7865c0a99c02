//! Guest address space and program loading
//!
//! The guest lives in a flat address space translated to the host
//! side by one additive offset; there are no page tables. The backing
//! store is a sparse byte map keyed by host address, so untouched
//! memory (including every BSS tail) reads as zero, and loads and
//! stores work at any alignment.
//!
//! Program loading parses a statically-linked 64-bit little-endian
//! RISC-V ELF and copies each PT_LOAD segment into guest memory,
//! tracking the highest page-rounded mapped address as the base of
//! the allocation arena.

use std::collections::HashMap;
use std::path::Path;

use elf::abi::{EM_RISCV, PT_LOAD};
use elf::endian::AnyEndian;
use elf::file::Class;
use elf::ElfBytes;
use thiserror::Error;

/// The fixed guest-to-host offset: host = guest + offset
pub const GUEST_MEMORY_OFFSET: u64 = 0x0000_8880_0000_0000;

const PAGE_SIZE: u64 = 4096;

pub fn to_host(guest_addr: u64) -> u64 {
    guest_addr.wrapping_add(GUEST_MEMORY_OFFSET)
}

pub fn to_guest(host_addr: u64) -> u64 {
    host_addr.wrapping_sub(GUEST_MEMORY_OFFSET)
}

fn round_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

fn round_up(value: u64, align: u64) -> u64 {
    (value.wrapping_add(align - 1)) & !(align - 1)
}

/// Word sizes defined in the RISC-V specification
#[derive(Debug, Clone, Copy)]
pub enum Wordsize {
    Byte,
    Halfword,
    Word,
    Doubleword,
}

impl Wordsize {
    fn width(&self) -> u64 {
        match self {
            Wordsize::Byte => 1,
            Wordsize::Halfword => 2,
            Wordsize::Word => 4,
            Wordsize::Doubleword => 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("could not read program file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse ELF container: {0}")]
    Parse(#[from] elf::ParseError),
    #[error("program is not a 64-bit ELF file")]
    NotElf64,
    #[error("program is not a RISC-V executable (e_machine = {0})")]
    NotRiscv(u16),
}

/// The guest address space
///
/// `entry` is the program entry point from the ELF header. The arena
/// fields record where loaded segments end: `host_alloc` is the
/// highest page-rounded mapped host address, `base` its guest image,
/// and `alloc` the current allocation cursor (they start equal).
#[derive(Debug, Default)]
pub struct Mmu {
    mem: HashMap<u64, u8>,
    pub entry: u64,
    pub host_alloc: u64,
    pub base: u64,
    pub alloc: u64,
}

impl Mmu {
    fn read_byte(&self, host_addr: u64) -> u8 {
        *self.mem.get(&host_addr).unwrap_or(&0)
    }

    fn write_byte(&mut self, host_addr: u64, value: u8) {
        if value == 0 {
            self.mem.remove(&host_addr);
        } else {
            self.mem.insert(host_addr, value);
        }
    }

    /// Load a raw little-endian bit pattern of the given width from a
    /// guest address. The result is zero-extended; the instruction
    /// semantics decide whether to sign-extend.
    pub fn read(&self, guest_addr: u64, word_size: Wordsize) -> u64 {
        let host_addr = to_host(guest_addr);
        let mut value = 0;
        for n in 0..word_size.width() {
            let byte_n = u64::from(self.read_byte(host_addr.wrapping_add(n)));
            value |= byte_n << (8 * n);
        }
        value
    }

    /// Store the low bytes of value at a guest address
    pub fn write(&mut self, guest_addr: u64, value: u64, word_size: Wordsize) {
        let host_addr = to_host(guest_addr);
        for n in 0..word_size.width() {
            let byte_n = (value >> (8 * n)) as u8;
            self.write_byte(host_addr.wrapping_add(n), byte_n);
        }
    }

    /// Copy one loadable segment into guest memory and push the
    /// allocation arena above it. The BSS tail (p_memsz beyond
    /// p_filesz) needs no explicit work: unmapped bytes read zero.
    fn load_segment(&mut self, vaddr: u64, mem_size: u64, file_data: &[u8]) {
        for (n, byte) in file_data.iter().enumerate() {
            self.write_byte(to_host(vaddr.wrapping_add(n as u64)), *byte);
        }

        let host_vaddr = to_host(vaddr);
        let aligned_addr = round_down(host_vaddr, PAGE_SIZE);
        let segment_end =
            aligned_addr + round_up(mem_size + (host_vaddr - aligned_addr), PAGE_SIZE);

        self.host_alloc = self.host_alloc.max(segment_end);
        self.base = to_guest(self.host_alloc);
        self.alloc = self.base;
    }

    /// Load a statically-linked 64-bit RISC-V ELF executable
    ///
    /// Validates the container (the magic is checked by the parser,
    /// the class and machine here), records the entry point, and
    /// copies every PT_LOAD segment.
    pub fn load_elf(&mut self, path: &Path) -> Result<(), ElfError> {
        let file_data = std::fs::read(path)?;
        let file = ElfBytes::<AnyEndian>::minimal_parse(file_data.as_slice())?;

        if file.ehdr.class != Class::ELF64 {
            return Err(ElfError::NotElf64);
        }
        if file.ehdr.e_machine != EM_RISCV {
            return Err(ElfError::NotRiscv(file.ehdr.e_machine));
        }

        self.entry = file.ehdr.e_entry;

        if let Some(segments) = file.segments() {
            for phdr in segments.iter() {
                if phdr.p_type == PT_LOAD {
                    let data = file.segment_data(&phdr)?;
                    let file_size =
                        (phdr.p_filesz as usize).min(data.len());
                    self.load_segment(
                        phdr.p_vaddr,
                        phdr.p_memsz,
                        &data[..file_size],
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn check_translation_round_trip() {
        let guest = 0x1_0000;
        assert_eq!(to_host(guest), 0x0000_8880_0001_0000);
        assert_eq!(to_guest(to_host(guest)), guest);
    }

    #[test]
    fn check_memory_zero_initialised() {
        let mmu = Mmu::default();
        for addr in (0..200).step_by(17) {
            assert_eq!(mmu.read(addr, Wordsize::Doubleword), 0);
        }
    }

    #[test]
    fn check_write_then_read_each_width() {
        let mut mmu = Mmu::default();
        mmu.write(0x100, 0xdead_beef_0102_0304, Wordsize::Doubleword);
        assert_eq!(mmu.read(0x100, Wordsize::Doubleword), 0xdead_beef_0102_0304);
        assert_eq!(mmu.read(0x100, Wordsize::Word), 0x0102_0304);
        assert_eq!(mmu.read(0x100, Wordsize::Halfword), 0x0304);
        assert_eq!(mmu.read(0x100, Wordsize::Byte), 0x04);
        assert_eq!(mmu.read(0x104, Wordsize::Word), 0xdead_beef);
    }

    #[test]
    fn check_store_masks_to_width() {
        let mut mmu = Mmu::default();
        mmu.write(0x40, 0x1234_5678, Wordsize::Byte);
        assert_eq!(mmu.read(0x40, Wordsize::Word), 0x78);
    }

    #[test]
    fn check_misaligned_access() {
        let mut mmu = Mmu::default();
        mmu.write(0x201, 0xaabb_ccdd, Wordsize::Word);
        assert_eq!(mmu.read(0x201, Wordsize::Word), 0xaabb_ccdd);
        assert_eq!(mmu.read(0x203, Wordsize::Halfword), 0xaabb);
    }

    #[test]
    fn check_load_segment_sets_arena() {
        let mut mmu = Mmu::default();
        let image = [0x13u8, 0x00, 0x00, 0x00];
        // 4 bytes of file data, 0x100 bytes of memory size
        mmu.load_segment(0x1_0100, 0x100, &image);

        assert_eq!(mmu.read(0x1_0100, Wordsize::Word), 0x13);
        // BSS tail reads zero
        assert_eq!(mmu.read(0x1_0104, Wordsize::Word), 0);

        // Arena starts at the next page boundary above the segment
        assert_eq!(mmu.host_alloc, to_host(0x1_1000));
        assert_eq!(mmu.base, 0x1_1000);
        assert_eq!(mmu.alloc, mmu.base);
    }

    #[test]
    fn check_load_segment_keeps_highest_end() {
        let mut mmu = Mmu::default();
        mmu.load_segment(0x1_0000, 0x1000, &[1, 2, 3]);
        mmu.load_segment(0x3_0000, 0x10, &[4]);
        mmu.load_segment(0x2_0000, 0x10, &[5]);

        assert_eq!(mmu.base, 0x3_1000);
        assert_eq!(mmu.alloc, mmu.base);
    }
}
